//! Light masks and arrays sent alongside chunk data.

use bytes::{Buf, BufMut};
use mc_level_proto::codec::{read_byte_array, read_len, write_byte_array};
use mc_level_proto::{BitSet, ProtoDecode, ProtoEncode, VarInt};

use crate::error::WorldError;
use crate::section::{Section, LIGHT_LEN};

/// Bit `i` of a mask is set when section `i` has that light array. Arrays
/// are listed in section order, one per set bit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightData {
    pub sky_light_mask: BitSet,
    pub block_light_mask: BitSet,
    pub sky_light: Vec<Vec<u8>>,
    pub block_light: Vec<Vec<u8>>,
}

impl LightData {
    pub fn from_sections(sections: &[Section]) -> Self {
        let mut light = LightData {
            sky_light_mask: BitSet::with_capacity(sections.len()),
            block_light_mask: BitSet::with_capacity(sections.len()),
            ..Default::default()
        };
        for (i, section) in sections.iter().enumerate() {
            if let Some(sky) = section.sky_light() {
                light.sky_light_mask.set(i, true);
                light.sky_light.push(sky.to_vec());
            }
            if let Some(block) = section.block_light() {
                light.block_light_mask.set(i, true);
                light.block_light.push(block.to_vec());
            }
        }
        light
    }

    /// Hand arrays back to the sections by mask bit. Sections with a clear
    /// bit lose their array. Bits past the last section are ignored.
    pub fn apply_to(&self, sections: &mut [Section]) -> Result<(), WorldError> {
        let mut sky = self.sky_light.iter();
        let mut block = self.block_light.iter();
        for (i, section) in sections.iter_mut().enumerate() {
            let sky_light = next_array(self.sky_light_mask.get(i), &mut sky, "sky_light")?;
            let block_light = next_array(self.block_light_mask.get(i), &mut block, "block_light")?;
            section.set_sky_light(sky_light)?;
            section.set_block_light(block_light)?;
        }
        Ok(())
    }

    /// Read the light block. The complement masks are read and dropped.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WorldError> {
        let _trust_edges = bool::proto_decode(buf)?;
        let sky_light_mask = BitSet::proto_decode(buf)?;
        let block_light_mask = BitSet::proto_decode(buf)?;
        let _empty_sky_mask = BitSet::proto_decode(buf)?;
        let _empty_block_mask = BitSet::proto_decode(buf)?;
        let sky_light = read_arrays(buf)?;
        let block_light = read_arrays(buf)?;
        Ok(Self {
            sky_light_mask,
            block_light_mask,
            sky_light,
            block_light,
        })
    }
}

fn next_array<'a>(
    present: bool,
    arrays: &mut impl Iterator<Item = &'a Vec<u8>>,
    field: &'static str,
) -> Result<Option<Vec<u8>>, WorldError> {
    if !present {
        return Ok(None);
    }
    arrays
        .next()
        .cloned()
        .map(Some)
        .ok_or_else(|| WorldError::invalid(field, "mask has more bits than arrays"))
}

fn read_arrays(buf: &mut impl Buf) -> Result<Vec<Vec<u8>>, WorldError> {
    let count = read_len(buf)?;
    let mut arrays = Vec::with_capacity(count.min(buf.remaining() / LIGHT_LEN));
    for _ in 0..count {
        let data = read_byte_array(buf)?;
        if data.len() != LIGHT_LEN {
            return Err(WorldError::InvalidLightLength(data.len()));
        }
        arrays.push(data.to_vec());
    }
    Ok(arrays)
}

impl ProtoEncode for LightData {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        true.proto_encode(buf); // trust edges
        self.sky_light_mask.proto_encode(buf);
        self.block_light_mask.proto_encode(buf);
        (!&self.sky_light_mask).proto_encode(buf);
        (!&self.block_light_mask).proto_encode(buf);
        for arrays in [&self.sky_light, &self.block_light] {
            VarInt(arrays.len() as i32).proto_encode(buf);
            for array in arrays {
                write_byte_array(buf, array);
            }
        }
    }
}
