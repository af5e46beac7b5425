//! Command opcodes and the summaries handed to observers.

use std::fmt;

use crate::error::FormatError;
use crate::kind::Kind;

/// Leading byte of every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Ends the document. No operands.
    End = 0,
    /// Enters the group at a path, creating missing groups on the way.
    Group = 1,
    /// Adds or replaces a value: kind byte, path, payload.
    Value = 2,
    /// Detaches the node at a path.
    Remove = 3,
    /// Binds a handle id to the node at a path; an empty path unbinds it.
    Handle = 4,
    /// Replaces a value's payload through its handle, reusing its kind.
    EditValueByHandle = 5,
    /// Enters the group bound to a handle.
    GroupByHandle = 6,
}

impl Opcode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::End => "End",
            Opcode::Group => "Group",
            Opcode::Value => "Value",
            Opcode::Remove => "Remove",
            Opcode::Handle => "Handle",
            Opcode::EditValueByHandle => "EditValueByHandle",
            Opcode::GroupByHandle => "GroupByHandle",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = FormatError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => Opcode::End,
            1 => Opcode::Group,
            2 => Opcode::Value,
            3 => Opcode::Remove,
            4 => Opcode::Handle,
            5 => Opcode::EditValueByHandle,
            6 => Opcode::GroupByHandle,
            other => return Err(FormatError::UnknownCommand(other)),
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload-free summary of one command as it appeared on the wire.
///
/// Paths are recorded exactly as encoded (relative to the cursor at the
/// time), not resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub opcode: Opcode,
    pub path: Option<String>,
    pub id: Option<u32>,
    pub kind: Option<Kind>,
}

impl CommandRecord {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            path: None,
            id: None,
            kind: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if let Some(kind) = self.kind {
            write!(f, " {kind}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " ({path})")?;
        }
        if let Some(id) = self.id {
            write!(f, " {id}")?;
        }
        f.write_str(";")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

/// Delivered to observers registered with `Df2Stream::on_command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub direction: Direction,
    pub record: CommandRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes() {
        for byte in 0u8..=6 {
            assert_eq!(Opcode::try_from(byte).unwrap().as_u8(), byte);
        }
        assert_eq!(Opcode::try_from(7), Err(FormatError::UnknownCommand(7)));
    }

    #[test]
    fn record_display() {
        let record = CommandRecord::new(Opcode::Value)
            .with_kind(Kind::Byte)
            .with_path("TestData");
        assert_eq!(record.to_string(), "Value Byte (TestData);");
        let record = CommandRecord::new(Opcode::Handle).with_path("").with_id(3);
        assert_eq!(record.to_string(), "Handle () 3;");
        assert_eq!(CommandRecord::new(Opcode::End).to_string(), "End;");
    }
}
