//! Write-side state machine.
//!
//! The sender tracks the group the peer is positioned in (its outbound
//! cursor, kept as an absolute path) and encodes every path relative to
//! it. Each command is built in a reusable [`Writer`] and written to the
//! sink as one chunk.

use std::io::Write;

use df2_buffers::Writer;

use crate::codec::write_payload;
use crate::command::{CommandRecord, Opcode};
use crate::error::{Df2Error, Result};
use crate::kind::Kind;
use crate::tree::{NodeId, Tree};
use crate::value::Value;

#[derive(Debug)]
pub struct CommandSender {
    cursor: String,
    writer: Writer,
    sent: Vec<CommandRecord>,
}

impl Default for CommandSender {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSender {
    pub fn new() -> Self {
        Self::with_writer(Writer::new())
    }

    /// Uses a command buffer that grows in chunks of `alloc_size` bytes.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self::with_writer(Writer::with_alloc_size(alloc_size))
    }

    fn with_writer(writer: Writer) -> Self {
        Self {
            cursor: df2_path::SEPARATOR.to_string(),
            writer,
            sent: Vec::new(),
        }
    }

    /// Absolute path of the group the peer is inferred to be positioned
    /// in. It stays meaningful after that group is removed.
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Returns to the root, as at the start of a fresh stream.
    pub fn reset(&mut self) {
        self.cursor = df2_path::SEPARATOR.to_string();
        self.writer.discard();
    }

    /// Adopts the peer cursor reached by replaying existing commands.
    pub(crate) fn follow(&mut self, cursor: &str) {
        if self.cursor != cursor {
            self.cursor = cursor.to_string();
        }
    }

    /// Drains the summaries of commands sent since the last call.
    pub(crate) fn take_records(&mut self) -> Vec<CommandRecord> {
        std::mem::take(&mut self.sent)
    }

    fn commit<W: Write>(&mut self, sink: &mut W, record: CommandRecord) -> Result<()> {
        let bytes = self.writer.flush_slice();
        sink.write_all(bytes)?;
        tracing::trace!(target: "df2::send", len = bytes.len(), command = %record, "sent");
        self.sent.push(record);
        Ok(())
    }

    /// Shortest wire path from the cursor to `target`.
    fn reference(&self, tree: &Tree, target: NodeId) -> Result<String> {
        let target = tree.absolute_path(target);
        Ok(df2_path::shortest_reference(&target, &self.cursor)?)
    }

    pub fn send_end<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.writer.u8(Opcode::End.as_u8());
        self.commit(sink, CommandRecord::new(Opcode::End))
    }

    /// Enters `group` by path and moves the cursor there.
    pub fn send_group<W: Write>(&mut self, sink: &mut W, tree: &Tree, group: NodeId) -> Result<()> {
        let path = self.reference(tree, group)?;
        self.writer.u8(Opcode::Group.as_u8());
        self.writer.str0(&path);
        self.commit(sink, CommandRecord::new(Opcode::Group).with_path(path))?;
        self.cursor = tree.absolute_path(group);
        Ok(())
    }

    pub fn send_group_by_handle<W: Write>(&mut self, sink: &mut W, tree: &Tree, group: NodeId, id: u32) -> Result<()> {
        self.writer.u8(Opcode::GroupByHandle.as_u8());
        self.writer.vu32(id);
        self.commit(sink, CommandRecord::new(Opcode::GroupByHandle).with_id(id))?;
        self.cursor = tree.absolute_path(group);
        Ok(())
    }

    /// Makes `group` the cursor, preferring its handle over a path.
    ///
    /// Nothing is sent when the cursor already names `group`'s path.
    pub fn enter_group<W: Write>(&mut self, sink: &mut W, tree: &Tree, group: NodeId) -> Result<()> {
        if tree.absolute_path(group) == self.cursor {
            return Ok(());
        }
        match tree.node(group).handle() {
            Some(id) => self.send_group_by_handle(sink, tree, group, id),
            None => self.send_group(sink, tree, group),
        }
    }

    /// Sends `value` for the existing value node `node`, addressed by name
    /// from its parent group.
    pub fn send_value<W: Write>(&mut self, sink: &mut W, tree: &Tree, node: NodeId, value: &Value) -> Result<()> {
        let target = tree.node(node);
        let parent = target.parent().ok_or_else(|| {
            Df2Error::InvalidOperation("the root cannot carry a value".to_string())
        })?;
        self.enter_group(sink, tree, parent)?;
        self.send_value_at(sink, target.name(), value)
    }

    /// Sends a `Value` command with a raw wire path relative to the cursor.
    pub fn send_value_at<W: Write>(&mut self, sink: &mut W, path: &str, value: &Value) -> Result<()> {
        let kind = value.kind();
        self.writer.u8(Opcode::Value.as_u8());
        self.writer.u8(kind.as_u8());
        self.writer.str0(path);
        write_payload(&mut self.writer, value);
        self.commit(
            sink,
            CommandRecord::new(Opcode::Value).with_kind(kind).with_path(path),
        )
    }

    /// Replaces a value through handle `id`, whose bound kind is `known`.
    ///
    /// The payload goes out without a kind byte, so a value of another kind
    /// falls back to a `Value` command at `fallback` (a wire path relative
    /// to the cursor).
    ///
    /// # Errors
    ///
    /// [`Df2Error::InvalidOperation`] when the kinds differ and no fallback
    /// path was given.
    pub fn send_edit_value_by_handle<W: Write>(
        &mut self,
        sink: &mut W,
        id: u32,
        known: Kind,
        value: &Value,
        fallback: Option<&str>,
    ) -> Result<()> {
        if value.kind() != known {
            let Some(path) = fallback else {
                return Err(Df2Error::InvalidOperation(format!(
                    "handle {id} is bound to a {known} value; sending a {} needs a fallback path",
                    value.kind()
                )));
            };
            tracing::debug!(id, %known, new = %value.kind(), "kind changed, editing by path");
            return self.send_value_at(sink, path, value);
        }
        self.writer.u8(Opcode::EditValueByHandle.as_u8());
        self.writer.vu32(id);
        write_payload(&mut self.writer, value);
        self.commit(
            sink,
            CommandRecord::new(Opcode::EditValueByHandle).with_id(id).with_kind(known),
        )
    }

    /// Removes `node` by path; the cursor does not move.
    pub fn send_remove<W: Write>(&mut self, sink: &mut W, tree: &Tree, node: NodeId) -> Result<()> {
        let path = self.reference(tree, node)?;
        self.writer.u8(Opcode::Remove.as_u8());
        self.writer.str0(&path);
        self.commit(sink, CommandRecord::new(Opcode::Remove).with_path(path))
    }

    /// Binds `id` to `node` on the peer.
    pub fn send_handle<W: Write>(&mut self, sink: &mut W, tree: &Tree, node: NodeId, id: u32) -> Result<()> {
        let path = self.reference(tree, node)?;
        self.writer.u8(Opcode::Handle.as_u8());
        self.writer.str0(&path);
        self.writer.vu32(id);
        self.commit(sink, CommandRecord::new(Opcode::Handle).with_path(path).with_id(id))
    }

    /// Unbinds `id` on the peer (a `Handle` command with an empty path).
    pub fn send_handle_removal<W: Write>(&mut self, sink: &mut W, id: u32) -> Result<()> {
        self.writer.u8(Opcode::Handle.as_u8());
        self.writer.str0("");
        self.writer.vu32(id);
        self.commit(sink, CommandRecord::new(Opcode::Handle).with_path("").with_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_nested() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let (a, _) = tree.get_or_add_group(NodeId::ROOT, "A").unwrap();
        let (nested, _) = tree.get_or_add_group(a, "Nested").unwrap();
        (tree, a, nested)
    }

    #[test]
    fn group_paths_are_relative_to_cursor() {
        let (tree, a, nested) = tree_with_nested();
        let mut sender = CommandSender::new();
        let mut out = Vec::new();

        sender.send_group(&mut out, &tree, nested).unwrap();
        sender.send_group(&mut out, &tree, a).unwrap();
        sender.send_group(&mut out, &tree, NodeId::ROOT).unwrap();

        let mut expected = vec![Opcode::Group.as_u8()];
        expected.extend_from_slice(b"A/Nested\0");
        expected.push(Opcode::Group.as_u8());
        expected.extend_from_slice(b"..\0");
        expected.push(Opcode::Group.as_u8());
        expected.extend_from_slice(b"/\0");
        assert_eq!(out, expected);
        assert_eq!(sender.cursor(), "/");
    }

    #[test]
    fn enter_group_prefers_handle() {
        let (mut tree, _, nested) = tree_with_nested();
        tree.bind_handle(1, nested);
        let mut sender = CommandSender::new();
        let mut out = Vec::new();
        sender.enter_group(&mut out, &tree, nested).unwrap();
        sender.enter_group(&mut out, &tree, nested).unwrap();
        assert_eq!(out, [Opcode::GroupByHandle.as_u8(), 1]);
        assert_eq!(sender.cursor(), "/A/Nested/");
    }

    #[test]
    fn edit_by_handle_without_fallback_fails_on_kind_change() {
        let mut sender = CommandSender::new();
        let mut out = Vec::new();
        let err = sender
            .send_edit_value_by_handle(&mut out, 3, Kind::Byte, &Value::from("text"), None)
            .unwrap_err();
        assert!(matches!(err, Df2Error::InvalidOperation(_)));
        assert!(out.is_empty());

        sender
            .send_edit_value_by_handle(&mut out, 3, Kind::Byte, &Value::from("text"), Some("v"))
            .unwrap();
        assert_eq!(out[0], Opcode::Value.as_u8());
        assert_eq!(out[1], Kind::String.as_u8());
    }

    #[test]
    fn records_are_drained() {
        let mut sender = CommandSender::new();
        let mut out = Vec::new();
        sender.send_handle_removal(&mut out, 5).unwrap();
        sender.send_end(&mut out).unwrap();
        let records = sender.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_string(), "Handle () 5;");
        assert!(sender.take_records().is_empty());
        assert_eq!(out, [Opcode::Handle.as_u8(), 0, 5, Opcode::End.as_u8()]);
    }
}
