//! Java "modified UTF-8" string encoding used by NBT.
//!
//! Strings are UTF-16 code units written as 1-3 byte sequences. NUL is
//! written as `C0 80` and supplementary characters as two encoded surrogates.
//! Plain UTF-8 without NUL or 4-byte sequences is already valid modified UTF-8.

/// Encode `s`, stopping before the unit that would push the output past `limit` bytes.
pub(crate) fn encode(s: &str, limit: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len().min(limit));
    let mut units = s.encode_utf16().peekable();
    while let Some(unit) = units.next() {
        // Keep surrogate pairs together.
        let pair = if (0xD800..0xDC00).contains(&unit) {
            units.next_if(|low| (0xDC00..0xE000).contains(low))
        } else {
            None
        };
        let needed = unit_len(unit) + pair.map_or(0, unit_len);
        if out.len() + needed > limit {
            break;
        }
        push_unit(&mut out, unit);
        if let Some(low) = pair {
            push_unit(&mut out, low);
        }
    }
    out
}

/// Decode modified UTF-8, also accepting standard 4-byte UTF-8 sequences.
pub(crate) fn decode(bytes: &[u8]) -> Option<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Some(s.to_owned());
    }
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x00..=0x7F => {
                units.push(b as u16);
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = continuation(bytes.get(i + 1))?;
                units.push((((b & 0x1F) as u16) << 6) | b1);
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = continuation(bytes.get(i + 1))?;
                let b2 = continuation(bytes.get(i + 2))?;
                units.push((((b & 0x0F) as u16) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            0xF0..=0xF7 => {
                let b1 = continuation(bytes.get(i + 1))? as u32;
                let b2 = continuation(bytes.get(i + 2))? as u32;
                let b3 = continuation(bytes.get(i + 3))? as u32;
                let cp = (((b & 0x07) as u32) << 18) | (b1 << 12) | (b2 << 6) | b3;
                let mut pair = [0u16; 2];
                units.extend_from_slice(char::from_u32(cp)?.encode_utf16(&mut pair));
                i += 4;
            }
            _ => return None,
        }
    }
    String::from_utf16(&units).ok()
}

fn continuation(byte: Option<&u8>) -> Option<u16> {
    match byte {
        Some(&b) if b & 0xC0 == 0x80 => Some((b & 0x3F) as u16),
        _ => None,
    }
}

fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

fn push_unit(out: &mut Vec<u8>, unit: u16) {
    match unit_len(unit) {
        1 => out.push(unit as u8),
        2 => {
            out.push(0xC0 | (unit >> 6) as u8);
            out.push(0x80 | (unit & 0x3F) as u8);
        }
        _ => {
            out.push(0xE0 | (unit >> 12) as u8);
            out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
            out.push(0x80 | (unit & 0x3F) as u8);
        }
    }
}
