//! NBT tag types.

use std::collections::HashMap;

/// A compound tag: map of name -> tag.
pub type NbtCompound = HashMap<String, NbtTag>;

/// A named root compound, as stored in files and region sectors.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtRoot {
    pub name: String,
    pub compound: NbtCompound,
}

impl NbtRoot {
    pub fn new(name: impl Into<String>, compound: NbtCompound) -> Self {
        Self {
            name: name.into(),
            compound,
        }
    }
}

/// Represents any NBT value.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtTag>),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    /// Returns the numeric tag type ID (1-12). TAG_End is 0 but not representable here.
    pub fn tag_type_id(&self) -> u8 {
        match self {
            NbtTag::Byte(_) => 1,
            NbtTag::Short(_) => 2,
            NbtTag::Int(_) => 3,
            NbtTag::Long(_) => 4,
            NbtTag::Float(_) => 5,
            NbtTag::Double(_) => 6,
            NbtTag::ByteArray(_) => 7,
            NbtTag::String(_) => 8,
            NbtTag::List(_) => 9,
            NbtTag::Compound(_) => 10,
            NbtTag::IntArray(_) => 11,
            NbtTag::LongArray(_) => 12,
        }
    }

    /// Name of the tag type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            NbtTag::Byte(_) => "TAG_Byte",
            NbtTag::Short(_) => "TAG_Short",
            NbtTag::Int(_) => "TAG_Int",
            NbtTag::Long(_) => "TAG_Long",
            NbtTag::Float(_) => "TAG_Float",
            NbtTag::Double(_) => "TAG_Double",
            NbtTag::ByteArray(_) => "TAG_Byte_Array",
            NbtTag::String(_) => "TAG_String",
            NbtTag::List(_) => "TAG_List",
            NbtTag::Compound(_) => "TAG_Compound",
            NbtTag::IntArray(_) => "TAG_Int_Array",
            NbtTag::LongArray(_) => "TAG_Long_Array",
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            NbtTag::Byte(v) => Some(*v),
            _ => None,
        }
    }

    /// Booleans are stored as TAG_Byte 0/1.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_byte().map(|v| v != 0)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            NbtTag::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            NbtTag::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&NbtCompound> {
        match self {
            NbtTag::Compound(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NbtTag]> {
        match self {
            NbtTag::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            NbtTag::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            NbtTag::LongArray(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_names() {
        let tags = [
            (NbtTag::Byte(0), "TAG_Byte"),
            (NbtTag::Short(0), "TAG_Short"),
            (NbtTag::Int(0), "TAG_Int"),
            (NbtTag::Long(0), "TAG_Long"),
            (NbtTag::Float(0.0), "TAG_Float"),
            (NbtTag::Double(0.0), "TAG_Double"),
            (NbtTag::ByteArray(vec![]), "TAG_Byte_Array"),
            (NbtTag::String(String::new()), "TAG_String"),
            (NbtTag::List(vec![]), "TAG_List"),
            (NbtTag::Compound(NbtCompound::new()), "TAG_Compound"),
            (NbtTag::IntArray(vec![]), "TAG_Int_Array"),
            (NbtTag::LongArray(vec![]), "TAG_Long_Array"),
        ];
        for (id, (tag, name)) in (1u8..).zip(tags) {
            assert_eq!(tag.tag_type_id(), id);
            assert_eq!(tag.type_name(), name);
        }
    }

    #[test]
    fn accessors() {
        assert_eq!(NbtTag::Byte(42).as_byte(), Some(42));
        assert_eq!(NbtTag::Int(42).as_byte(), None);
        assert_eq!(NbtTag::String("minecraft:chest".into()).as_string(), Some("minecraft:chest"));
        assert_eq!(NbtTag::Int(5).as_string(), None);
        assert_eq!(NbtTag::LongArray(vec![1, 2]).as_long_array(), Some(&[1i64, 2][..]));
    }

    #[test]
    fn booleans_are_bytes() {
        assert_eq!(NbtTag::Byte(0).as_bool(), Some(false));
        assert_eq!(NbtTag::Byte(3).as_bool(), Some(true));
        assert_eq!(NbtTag::Int(1).as_bool(), None);
    }
}
