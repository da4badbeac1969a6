//! NBT (Named Binary Tag) implementation for Minecraft Java Edition.
//!
//! All numbers are big-endian, string lengths are u16, array lengths are i32.
//! Two root forms are supported:
//! - **Named**: used on disk (level and region files). `TAG_Compound`, root name, payload.
//! - **Network**: used in packets since 1.20.2. `TAG_Compound` without a name,
//!   or a single `TAG_End` when there is no payload.

pub mod error;
mod io;
mod mutf8;
pub mod tag;

pub use error::NbtError;
pub use tag::{NbtCompound, NbtRoot, NbtTag};

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Read a named-root NBT compound from a buffer.
pub fn read_nbt(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    io::read_named_root(buf)
}

/// Write a named-root NBT compound to a buffer.
pub fn write_nbt(buf: &mut impl BufMut, root: &NbtRoot) {
    io::write_named_root(buf, root)
}

/// Read a nameless network compound. `None` means the sender wrote `TAG_End`.
pub fn read_nbt_network(buf: &mut impl Buf) -> Result<Option<NbtCompound>, NbtError> {
    io::read_unnamed_root(buf)
}

/// Write a nameless network compound, or `TAG_End` for `None`.
pub fn write_nbt_network(buf: &mut impl BufMut, compound: Option<&NbtCompound>) {
    io::write_unnamed_root(buf, compound)
}

/// Gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&[0x1F, 0x8B])
}

/// Read a gzip-compressed named-root compound, as found in `level.dat`.
pub fn read_nbt_gzip(reader: impl Read) -> Result<NbtRoot, NbtError> {
    let mut data = Vec::new();
    GzDecoder::new(reader).read_to_end(&mut data)?;
    read_nbt(&mut &data[..])
}

/// Write a gzip-compressed named-root compound.
pub fn write_nbt_gzip(writer: impl Write, root: &NbtRoot) -> Result<(), NbtError> {
    let mut buf = BytesMut::new();
    write_nbt(&mut buf, root);
    let mut encoder = GzEncoder::new(writer, Compression::default());
    encoder.write_all(&buf)?;
    encoder.finish()?;
    Ok(())
}
