use std::fmt;

use crate::error::FormatError;

/// Kind byte identifying a payload shape on the wire.
///
/// `Null`, `Group` and `ListTerminator` are markers only; a stored value is
/// always one of the scalar kinds, `Array` or `List`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Null = 0,
    Byte = 1,
    SByte = 2,
    Short = 3,
    UShort = 4,
    Int = 5,
    UInt = 6,
    Long = 7,
    ULong = 8,
    Float = 9,
    Double = 10,
    String = 11,
    Group = 12,
    Array = 13,
    List = 14,
    ListTerminator = 15,
}

impl Kind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// One of the twelve fixed-shape kinds (everything from `Byte` to `String`).
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Kind::Byte
                | Kind::SByte
                | Kind::Short
                | Kind::UShort
                | Kind::Int
                | Kind::UInt
                | Kind::Long
                | Kind::ULong
                | Kind::Float
                | Kind::Double
                | Kind::String
        )
    }

    /// Kinds a `Value` command or a stored value may carry.
    pub fn is_value(self) -> bool {
        self.is_scalar() || matches!(self, Kind::Array | Kind::List)
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "Null",
            Kind::Byte => "Byte",
            Kind::SByte => "SByte",
            Kind::Short => "Short",
            Kind::UShort => "UShort",
            Kind::Int => "Int",
            Kind::UInt => "UInt",
            Kind::Long => "Long",
            Kind::ULong => "ULong",
            Kind::Float => "Float",
            Kind::Double => "Double",
            Kind::String => "String",
            Kind::Group => "Group",
            Kind::Array => "Array",
            Kind::List => "List",
            Kind::ListTerminator => "ListTerminator",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Kind {
    type Error = FormatError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => Kind::Null,
            1 => Kind::Byte,
            2 => Kind::SByte,
            3 => Kind::Short,
            4 => Kind::UShort,
            5 => Kind::Int,
            6 => Kind::UInt,
            7 => Kind::Long,
            8 => Kind::ULong,
            9 => Kind::Float,
            10 => Kind::Double,
            11 => Kind::String,
            12 => Kind::Group,
            13 => Kind::Array,
            14 => Kind::List,
            15 => Kind::ListTerminator,
            other => return Err(FormatError::UnknownKind(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_are_stable() {
        for byte in 0u8..=15 {
            assert_eq!(Kind::try_from(byte).unwrap().as_u8(), byte);
        }
        assert_eq!(Kind::try_from(16), Err(FormatError::UnknownKind(16)));
    }

    #[test]
    fn markers_are_not_values() {
        assert!(!Kind::Null.is_value());
        assert!(!Kind::Group.is_value());
        assert!(!Kind::ListTerminator.is_value());
        assert!(Kind::List.is_value());
        assert!(!Kind::List.is_scalar());
        assert!(Kind::String.is_scalar());
    }
}
