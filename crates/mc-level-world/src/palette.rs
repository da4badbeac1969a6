//! Paletted containers for block states and biomes.
//!
//! A container holds a fixed number of values. Storage picks one of three modes
//! from the number of distinct values seen so far:
//!
//! - **Single**: one value, zero bits per entry, no packed words.
//! - **Indirect**: a local palette in insertion order; entries are palette offsets.
//! - **Direct**: entries are global IDs; there is no local palette.
//!
//! The palette only grows. Overwriting every use of a value keeps it in the
//! palette and never narrows the entry width.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use bytes::{Buf, BufMut};
use mc_level_proto::codec::read_len;
use mc_level_proto::{ProtoDecode, ProtoEncode, VarInt};
use tracing::{debug, trace};

use crate::bit_storage::BitStorage;
use crate::error::WorldError;

/// A value that can live in a palette: anything with a global numeric ID.
pub trait PaletteValue: Copy + Eq + Hash + fmt::Debug {
    fn to_id(self) -> u32;
    fn from_id(id: u32) -> Self;
}

impl PaletteValue for u32 {
    fn to_id(self) -> u32 {
        self
    }

    fn from_id(id: u32) -> Self {
        id
    }
}

/// Sizing rules for one kind of container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Number of entries (4096 block states or 64 biome cells per section).
    pub volume: usize,
    /// Narrowest indirect width.
    pub min_bits: u8,
    /// Widest indirect width; anything wider switches to direct mode.
    pub max_indirect_bits: u8,
    /// Width of global IDs in direct mode.
    pub direct_bits: u8,
}

impl ContainerConfig {
    pub const fn block_states() -> Self {
        Self {
            volume: 16 * 16 * 16,
            min_bits: 4,
            max_indirect_bits: 8,
            direct_bits: 15,
        }
    }

    pub const fn biomes() -> Self {
        Self {
            volume: 4 * 4 * 4,
            min_bits: 1,
            max_indirect_bits: 3,
            direct_bits: 6,
        }
    }

    /// In-memory and wire width for a palette of `len` entries.
    pub fn bits_for(&self, len: usize) -> u8 {
        let bits = self.persisted_bits(len);
        if bits > self.max_indirect_bits {
            self.direct_bits
        } else {
            bits
        }
    }

    /// Width of palette offsets on disk, where palettes have no upper size limit.
    pub fn persisted_bits(&self, len: usize) -> u8 {
        if len <= 1 {
            0
        } else {
            ceil_log2(len).max(self.min_bits)
        }
    }
}

fn ceil_log2(n: usize) -> u8 {
    (usize::BITS - (n - 1).leading_zeros()) as u8
}

fn id_bits(id: u32) -> u8 {
    (u32::BITS - id.leading_zeros()) as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteContainer<T> {
    config: ContainerConfig,
    /// Local palette; empty in direct mode.
    palette: Vec<T>,
    storage: BitStorage,
}

impl<T: PaletteValue> PaletteContainer<T> {
    /// A container where every entry is `fill`.
    pub fn new(config: ContainerConfig, fill: T) -> Self {
        Self {
            config,
            palette: vec![fill],
            storage: BitStorage::new(0, config.volume),
        }
    }

    /// Wrap a persisted palette and its packed offsets.
    ///
    /// The width is derived from the palette length. The word count must match
    /// that width exactly and every offset must fall inside the palette.
    /// Palettes too large for indirect mode are expanded into direct mode.
    pub fn from_raw(
        config: ContainerConfig,
        palette: Vec<T>,
        data: Vec<u64>,
    ) -> Result<Self, WorldError> {
        if palette.is_empty() {
            return Err(WorldError::invalid("palette", "empty palette"));
        }
        let bits = config.persisted_bits(palette.len());
        let storage = BitStorage::from_words(bits, config.volume, data)?;
        check_indices(&storage, palette.len())?;

        if bits <= config.max_indirect_bits {
            return Ok(Self {
                config,
                palette,
                storage,
            });
        }

        let width = palette
            .iter()
            .map(|v| id_bits(v.to_id()))
            .max()
            .unwrap_or(0)
            .max(config.direct_bits);
        debug!(
            palette_len = palette.len(),
            bits = width,
            "persisted palette exceeds indirect range, expanding to direct"
        );
        let mut direct = BitStorage::new(width, config.volume);
        for i in 0..config.volume {
            direct.set(i, palette[storage.get(i) as usize].to_id());
        }
        Ok(Self {
            config,
            palette: Vec::new(),
            storage: direct,
        })
    }

    pub fn config(&self) -> ContainerConfig {
        self.config
    }

    pub fn bits_per_entry(&self) -> u8 {
        self.storage.bits()
    }

    pub fn is_direct(&self) -> bool {
        self.storage.bits() > self.config.max_indirect_bits
    }

    /// Local palette length. Direct containers have no local palette and report 0.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    pub fn get(&self, index: usize) -> T {
        let raw = self.storage.get(index);
        if self.is_direct() {
            T::from_id(raw)
        } else {
            self.palette[raw as usize]
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        assert!(
            index < self.config.volume,
            "index {index} out of bounds for {}",
            self.config.volume
        );
        if self.is_direct() {
            let id = value.to_id();
            if id_bits(id) > self.storage.bits() {
                self.storage = self.storage.resized(id_bits(id));
            }
            self.storage.set(index, id);
            return;
        }

        let offset = match self.palette.iter().position(|v| *v == value) {
            Some(offset) => offset,
            None => {
                self.palette.push(value);
                self.grow();
                if self.is_direct() {
                    self.set(index, value);
                    return;
                }
                self.palette.len() - 1
            }
        };
        self.storage.set(index, offset as u32);
    }

    /// Widen storage after the palette gained an entry.
    fn grow(&mut self) {
        let bits = self.config.bits_for(self.palette.len());
        if bits <= self.storage.bits() {
            return;
        }
        if bits > self.config.max_indirect_bits {
            let width = self
                .palette
                .iter()
                .map(|v| id_bits(v.to_id()))
                .max()
                .unwrap_or(0)
                .max(bits);
            debug!(palette_len = self.palette.len(), bits = width, "switching to direct");
            let mut direct = BitStorage::new(width, self.config.volume);
            for i in 0..self.config.volume {
                direct.set(i, self.palette[self.storage.get(i) as usize].to_id());
            }
            self.storage = direct;
            self.palette.clear();
        } else {
            trace!(
                palette_len = self.palette.len(),
                from = self.storage.bits(),
                to = bits,
                "growing palette storage"
            );
            self.storage = self.storage.resized(bits);
        }
    }

    /// Distinct values in first-appearance order. Indirect and single
    /// containers return their palette as is, including unused entries.
    pub fn palette(&self) -> Vec<T> {
        if !self.is_direct() {
            return self.palette.clone();
        }
        let mut seen = HashSet::new();
        self.storage
            .iter()
            .map(T::from_id)
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Packed words as held in memory.
    pub fn raw(&self) -> &[u64] {
        self.storage.words()
    }

    /// Palette and packed offsets in the persisted layout.
    pub fn to_persisted(&self) -> (Vec<T>, Vec<u64>) {
        let palette = self.palette();
        let bits = self.config.persisted_bits(palette.len());
        if !self.is_direct() && bits == self.storage.bits() {
            return (palette, self.storage.words().to_vec());
        }
        let mut packed = BitStorage::new(bits, self.config.volume);
        if bits > 0 {
            for i in 0..self.config.volume {
                let value = self.get(i);
                let offset = palette.iter().position(|v| *v == value).unwrap_or(0);
                packed.set(i, offset as u32);
            }
        }
        (palette, packed.into_words())
    }

    /// Decode a container from its network form.
    pub fn decode(config: ContainerConfig, buf: &mut impl Buf) -> Result<Self, WorldError> {
        let sent_bits = u8::proto_decode(buf)?;
        if sent_bits > 32 {
            return Err(WorldError::invalid(
                "bits_per_entry",
                format!("{sent_bits} is wider than a global id"),
            ));
        }
        let (bits, palette) = if sent_bits == 0 {
            (0, vec![read_id(buf)?])
        } else if sent_bits <= config.max_indirect_bits {
            let bits = sent_bits.max(config.min_bits);
            let len = read_len(buf)?;
            if len == 0 || len > 1usize << bits {
                return Err(WorldError::invalid(
                    "palette",
                    format!("{len} entries do not fit {bits} bits"),
                ));
            }
            let mut palette = Vec::with_capacity(len);
            for _ in 0..len {
                palette.push(read_id(buf)?);
            }
            (bits, palette)
        } else {
            (sent_bits, Vec::new())
        };

        let data = Vec::<u64>::proto_decode(buf)?;
        let storage = BitStorage::from_words(bits, config.volume, data)?;
        if !palette.is_empty() {
            check_indices(&storage, palette.len())?;
        }
        Ok(Self {
            config,
            palette,
            storage,
        })
    }

    /// Replace this container with one decoded from `buf`, keeping the config.
    pub fn read_from(&mut self, buf: &mut impl Buf) -> Result<(), WorldError> {
        *self = Self::decode(self.config, buf)?;
        Ok(())
    }
}

fn read_id<T: PaletteValue>(buf: &mut impl Buf) -> Result<T, WorldError> {
    let id = VarInt::proto_decode(buf)?.0;
    if id < 0 {
        return Err(WorldError::invalid("palette", format!("negative id {id}")));
    }
    Ok(T::from_id(id as u32))
}

fn check_indices(storage: &BitStorage, len: usize) -> Result<(), WorldError> {
    match storage.max_value() {
        Some(index) if index as usize >= len => Err(WorldError::PaletteIndex {
            index: index as u64,
            len,
        }),
        _ => Ok(()),
    }
}

impl<T: PaletteValue> ProtoEncode for PaletteContainer<T> {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.storage.bits());
        if self.storage.bits() == 0 {
            VarInt(self.palette[0].to_id() as i32).proto_encode(buf);
        } else if !self.is_direct() {
            VarInt(self.palette.len() as i32).proto_encode(buf);
            for v in &self.palette {
                VarInt(v.to_id() as i32).proto_encode(buf);
            }
        }
        let words = self.storage.words();
        VarInt(words.len() as i32).proto_encode(buf);
        for &word in words {
            buf.put_u64(word);
        }
    }
}
