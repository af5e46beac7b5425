//! Read-side state machine.
//!
//! The receiver replays commands into a [`Tree`]. Its inbound cursor moves
//! by the same rules the sender applies to its outbound cursor, so both
//! ends agree on what a relative path means without any acknowledgement.

use std::io::Read;

use df2_buffers::Reader;

use crate::codec::read_payload;
use crate::command::{CommandRecord, Opcode};
use crate::error::{Df2Error, FormatError, Result};
use crate::kind::Kind;
use crate::tree::{NodeId, Tree};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Streaming,
    /// An `End` command was processed; nothing else is accepted.
    Ended,
}

#[derive(Debug)]
pub struct CommandReceiver {
    /// Absolute path of the current group.
    cursor: String,
    state: ReceiverState,
}

impl Default for CommandReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandReceiver {
    pub fn new() -> Self {
        Self {
            cursor: df2_path::SEPARATOR.to_string(),
            state: ReceiverState::Streaming,
        }
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state == ReceiverState::Ended
    }

    /// Decodes and applies one command.
    ///
    /// Returns `Ok(None)` when the source is exhausted at a command
    /// boundary. Any error leaves the tree in an unspecified state and the
    /// stream should be abandoned.
    pub fn process<R: Read>(&mut self, r: &mut Reader<R>, tree: &mut Tree) -> Result<Option<CommandRecord>> {
        if self.is_ended() {
            return Err(Df2Error::InvalidOperation(
                "an End command was already received".to_string(),
            ));
        }
        let offset = r.x;
        let Some(byte) = r.try_u8()? else {
            return Ok(None);
        };
        match self.dispatch(byte, r, tree) {
            Ok(record) => {
                tracing::trace!(target: "df2::recv", offset, command = %record, "received");
                Ok(Some(record))
            }
            Err(e) => {
                tracing::debug!(target: "df2::recv", offset, error = %e, "command rejected");
                Err(e)
            }
        }
    }

    fn dispatch<R: Read>(&mut self, byte: u8, r: &mut Reader<R>, tree: &mut Tree) -> Result<CommandRecord> {
        let opcode = Opcode::try_from(byte)?;
        let record = CommandRecord::new(opcode);
        match opcode {
            Opcode::End => {
                self.state = ReceiverState::Ended;
                Ok(record)
            }
            Opcode::Group => {
                let path = r.str0()?;
                self.enter(tree, &path)?;
                Ok(record.with_path(path))
            }
            Opcode::Value => {
                let kind = Kind::try_from(r.u8()?)?;
                if !kind.is_value() {
                    return Err(FormatError::UnexpectedKind(kind).into());
                }
                let path = r.str0()?;
                let value = read_payload(r, kind)?;
                self.put_value(tree, &path, value)?;
                Ok(record.with_kind(kind).with_path(path))
            }
            Opcode::Remove => {
                let path = r.str0()?;
                self.remove(tree, &path)?;
                Ok(record.with_path(path))
            }
            Opcode::Handle => {
                let path = r.str0()?;
                let id = r.vu32()?;
                self.bind(tree, &path, id)?;
                Ok(record.with_path(path).with_id(id))
            }
            Opcode::EditValueByHandle => {
                let id = r.vu32()?;
                let node = lookup_handle(tree, id)?;
                let kind = tree.node(node).kind();
                if kind == Kind::Group {
                    return Err(Df2Error::TypeMismatch(format!(
                        "handle {id} is bound to group {}",
                        tree.absolute_path(node)
                    )));
                }
                let value = read_payload(r, kind)?;
                tree.set_value(node, value)?;
                Ok(record.with_id(id).with_kind(kind))
            }
            Opcode::GroupByHandle => {
                let id = r.vu32()?;
                let node = lookup_handle(tree, id)?;
                if !tree.node(node).is_group() {
                    return Err(Df2Error::TypeMismatch(format!(
                        "handle {id} is bound to value {}",
                        tree.absolute_path(node)
                    )));
                }
                self.cursor = tree.absolute_path(node);
                Ok(record.with_id(id))
            }
        }
    }

    fn resolve(&self, path: &str) -> Result<String> {
        Ok(df2_path::resolve_absolute(path, &self.cursor)?)
    }

    /// Walks to the group at `path`, creating missing groups.
    fn enter(&mut self, tree: &mut Tree, path: &str) -> Result<()> {
        let absolute = self.resolve(path)?;
        let mut at = NodeId::ROOT;
        for name in df2_path::segments(&absolute) {
            at = tree.get_or_add_group(at, name)?.0;
        }
        self.cursor = tree.absolute_path(at);
        Ok(())
    }

    fn put_value(&mut self, tree: &mut Tree, path: &str, value: Value) -> Result<()> {
        let absolute = self.resolve(path)?;
        let (Some(parent_path), Some(name)) = (df2_path::parent(&absolute), df2_path::file_name(&absolute)) else {
            return Err(Df2Error::Argument("a value cannot be written at the root".to_string()));
        };
        let mut parent = NodeId::ROOT;
        for segment in df2_path::segments(&parent_path) {
            parent = match tree.child(parent, segment) {
                Some(id) if tree.node(id).is_group() => id,
                Some(_) => return Err(Df2Error::PathConflict(absolute.clone())),
                None => {
                    return Err(Df2Error::NotFound(format!(
                        "group {parent_path} for value {name}"
                    )))
                }
            };
        }
        tree.add_or_update(parent, name, value)?;
        Ok(())
    }

    fn remove(&mut self, tree: &mut Tree, path: &str) -> Result<()> {
        let absolute = self.resolve(path)?;
        let (Some(parent_path), Some(name)) = (df2_path::parent(&absolute), df2_path::file_name(&absolute)) else {
            return Err(Df2Error::Argument("the root cannot be removed".to_string()));
        };
        // An absent parent or child is not an error.
        if let Some(parent) = tree.find(&parent_path) {
            tree.detach(parent, name);
        }
        Ok(())
    }

    fn bind(&mut self, tree: &mut Tree, path: &str, id: u32) -> Result<()> {
        if path.trim().is_empty() {
            return match tree.unbind_handle(id) {
                Some(_) => Ok(()),
                None => Err(Df2Error::NotFound(format!("handle {id}"))),
            };
        }
        let absolute = self.resolve(path)?;
        match tree.find(&absolute) {
            Some(NodeId::ROOT) => Err(Df2Error::NotFound(
                "the root cannot be bound to a handle".to_string(),
            )),
            Some(node) => {
                tree.bind_handle(id, node);
                Ok(())
            }
            None => Err(Df2Error::NotFound(absolute)),
        }
    }
}

fn lookup_handle(tree: &Tree, id: u32) -> Result<NodeId> {
    tree.handle_target(id)
        .ok_or_else(|| Df2Error::NotFound(format!("handle {id}")))
}
