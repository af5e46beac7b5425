//! The stream façade.
//!
//! A [`Df2Stream`] owns its byte source/sink together with the tree, the
//! handle table and both cursors. Writes go through the tree API
//! ([`Df2Stream::get_or_add_group`], [`GroupMut::add_or_update`], ...) and
//! are mirrored to the sink as commands; reads replay commands with
//! [`Df2Stream::process_command`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use df2_buffers::Reader;

use crate::command::{CommandEvent, CommandRecord, Direction};
use crate::error::{Df2Error, Result};
use crate::preface::{read_preface, write_preface, PREFACE};
use crate::receiver::CommandReceiver;
use crate::sender::CommandSender;
use crate::tree::{NodeBody, NodeId, NodeRef, Tree};
use crate::value::Value;

/// Capabilities a stream was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Read,
    Write,
    /// Validates the preface, then both replays and appends at the current
    /// position of the underlying stream.
    ReadWrite,
}

impl StreamMode {
    pub fn can_read(self) -> bool {
        matches!(self, StreamMode::Read | StreamMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, StreamMode::Write | StreamMode::ReadWrite)
    }
}

/// Sinks that can drop their contents, used by
/// [`Df2Stream::rewrite_optimized`].
pub trait Truncate {
    /// Discards everything; the next write lands at offset zero.
    fn truncate(&mut self) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate(&mut self) -> io::Result<()> {
        self.set_len(0)?;
        self.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl Truncate for Cursor<Vec<u8>> {
    fn truncate(&mut self) -> io::Result<()> {
        self.get_mut().clear();
        self.set_position(0);
        Ok(())
    }
}

impl<T: Truncate + ?Sized> Truncate for &mut T {
    fn truncate(&mut self) -> io::Result<()> {
        (**self).truncate()
    }
}

type Listener = Box<dyn FnMut(&CommandEvent)>;

/// A DF2 document bound to a byte stream.
///
/// # Example
///
/// ```
/// use df2::{Df2Stream, Value};
///
/// let mut out = Vec::new();
/// let mut writer = Df2Stream::writer(&mut out)?;
/// writer.get_or_add_group("TestGroup")?.add_or_update("TestData", 42u8)?;
/// writer.flush()?;
///
/// let mut reader = Df2Stream::reader(&out[..])?;
/// reader.process_until_end()?;
/// let data = reader.get("/TestGroup/TestData").and_then(|n| n.value().cloned());
/// assert_eq!(data, Some(Value::Byte(42)));
/// # Ok::<(), df2::Df2Error>(())
/// ```
pub struct Df2Stream<S> {
    inner: S,
    mode: StreamMode,
    tree: Tree,
    sender: CommandSender,
    receiver: CommandReceiver,
    read_offset: usize,
    listeners: BTreeMap<u64, Listener>,
    next_listener_id: u64,
}

impl<S: Read> Df2Stream<S> {
    /// Opens a read-only stream and validates the preface.
    ///
    /// Commands are decoded straight from `inner` with many small reads,
    /// so an unbuffered file or socket should be wrapped in a
    /// [`BufReader`] first (see [`Df2Stream::read_file`]).
    pub fn reader(mut inner: S) -> Result<Self> {
        read_preface(&mut inner)?;
        Ok(Self::assemble(inner, StreamMode::Read, CommandSender::new()))
    }

    /// Decodes and applies one command.
    ///
    /// Returns `false` once an `End` command was applied or the source is
    /// exhausted at a command boundary.
    pub fn process_command(&mut self) -> Result<bool> {
        if !self.mode.can_read() {
            return Err(Df2Error::InvalidOperation(
                "stream was opened write-only".to_string(),
            ));
        }
        let mut reader = Reader::with_offset(&mut self.inner, self.read_offset);
        let outcome = self.receiver.process(&mut reader, &mut self.tree);
        self.read_offset = reader.x;
        let Some(record) = outcome? else {
            return Ok(false);
        };
        if self.mode == StreamMode::ReadWrite {
            // Appended commands continue from where the replayed ones left
            // the peer.
            self.sender.follow(self.receiver.cursor());
        }
        self.notify(Direction::Received, record);
        Ok(!self.receiver.is_ended())
    }

    /// Processes commands until `End` or the end of the source.
    pub fn process_until_end(&mut self) -> Result<()> {
        while self.process_command()? {}
        Ok(())
    }
}

impl Df2Stream<BufReader<File>> {
    /// Opens a DF2 file read-only through a [`BufReader`].
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::reader(BufReader::new(file))
    }
}

impl<S: Write> Df2Stream<S> {
    /// Opens a write-only stream and writes the preface.
    pub fn writer(inner: S) -> Result<Self> {
        Self::writer_with_alloc_size(inner, df2_buffers::DEFAULT_ALLOC_SIZE)
    }

    /// Like [`Df2Stream::writer`], growing the command buffer in chunks of
    /// `alloc_size` bytes.
    pub fn writer_with_alloc_size(mut inner: S, alloc_size: usize) -> Result<Self> {
        write_preface(&mut inner)?;
        Ok(Self::assemble(
            inner,
            StreamMode::Write,
            CommandSender::with_alloc_size(alloc_size),
        ))
    }

    /// Returns the named top-level group, creating it if absent.
    pub fn get_or_add_group(&mut self, name: &str) -> Result<GroupMut<'_, S>> {
        let id = self.sending(|s| s.group_child(NodeId::ROOT, name))?;
        Ok(GroupMut { stream: self, id })
    }

    /// Creates or overwrites a top-level value.
    pub fn add_or_update(&mut self, name: &str, value: impl Into<Value>) -> Result<NodeId> {
        let value = value.into();
        self.sending(|s| s.upsert(NodeId::ROOT, name, value))
    }

    /// Removes a top-level node; `false` if there was none.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        self.sending(|s| s.remove_child(NodeId::ROOT, name))
    }

    /// Write access to an attached group.
    pub fn group(&mut self, id: NodeId) -> Result<GroupMut<'_, S>> {
        self.ensure_attached_group(id)?;
        Ok(GroupMut { stream: self, id })
    }

    /// Replaces the payload of a value node.
    ///
    /// A node with a handle is edited through it, which also works after
    /// the node was removed. Without a handle the node must be attached.
    pub fn update_value(&mut self, node: NodeId, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.sending(|s| {
            value.check_encodable()?;
            match s.tree.get(node) {
                None => return Err(Df2Error::NotFound(format!("node {}", node.index()))),
                Some(n) if n.is_group() => {
                    return Err(Df2Error::TypeMismatch(format!(
                        "{} is a group, not a value",
                        s.tree.absolute_path(node)
                    )))
                }
                Some(_) => {}
            }
            s.send_update(node, &value)?;
            s.tree.set_value(node, value)?;
            Ok(())
        })
    }

    /// Binds (`Some`) or releases (`None`) the handle of a node.
    pub fn set_handle(&mut self, node: NodeId, handle: Option<u32>) -> Result<()> {
        self.sending(|s| s.assign_handle(node, handle))
    }

    /// Writes `End` and flushes the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sending(|s| {
            s.sender.send_end(&mut s.inner)?;
            s.inner.flush()?;
            Ok(())
        })
    }

    fn sending<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if !self.mode.can_write() {
            return Err(Df2Error::InvalidOperation(
                "stream was opened read-only".to_string(),
            ));
        }
        let result = op(self);
        for record in self.sender.take_records() {
            self.notify(Direction::Sent, record);
        }
        result
    }

    fn group_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        df2_path::validate_name(name)?;
        self.ensure_attached_group(parent)?;
        if let Some(id) = self.tree.child(parent, name) {
            if self.tree.node(id).is_group() {
                return Ok(id);
            }
        }
        let (id, _) = self.tree.get_or_add_group(parent, name)?;
        self.sender.send_group(&mut self.inner, &self.tree, id)?;
        Ok(id)
    }

    fn upsert(&mut self, parent: NodeId, name: &str, value: Value) -> Result<NodeId> {
        df2_path::validate_name(name)?;
        value.check_encodable()?;
        self.ensure_attached_group(parent)?;
        match self.tree.child(parent, name) {
            Some(id) if self.tree.node(id).is_group() => Err(Df2Error::TypeMismatch(format!(
                "{} is a group, not a value",
                self.tree.absolute_path(id)
            ))),
            Some(id) => {
                self.send_update(id, &value)?;
                self.tree.set_value(id, value)?;
                Ok(id)
            }
            None => {
                let (id, _) = self.tree.add_or_update(parent, name, value)?;
                if let NodeBody::Value(value) = self.tree.node(id).body() {
                    self.sender.send_value(&mut self.inner, &self.tree, id, value)?;
                }
                Ok(id)
            }
        }
    }

    /// Sends the command that turns the peer's copy of `node` into `value`.
    fn send_update(&mut self, node: NodeId, value: &Value) -> Result<()> {
        let target = self.tree.node(node);
        let attached = self.tree.is_attached(node);
        match target.handle() {
            Some(id) => {
                let known = target.kind();
                let fallback = match target.parent() {
                    Some(parent) if known != value.kind() && attached => {
                        self.sender.enter_group(&mut self.inner, &self.tree, parent)?;
                        Some(target.name())
                    }
                    _ => None,
                };
                self.sender
                    .send_edit_value_by_handle(&mut self.inner, id, known, value, fallback)
            }
            None if attached => self.sender.send_value(&mut self.inner, &self.tree, node, value),
            None => Err(Df2Error::InvalidOperation(format!(
                "{} was removed and has no handle to edit it through",
                self.tree.absolute_path(node)
            ))),
        }
    }

    fn remove_child(&mut self, parent: NodeId, name: &str) -> Result<bool> {
        self.ensure_attached_group(parent)?;
        let Some(child) = self.tree.child(parent, name) else {
            return Ok(false);
        };
        self.sender.send_remove(&mut self.inner, &self.tree, child)?;
        self.tree.detach(parent, name);
        Ok(true)
    }

    fn assign_handle(&mut self, node: NodeId, handle: Option<u32>) -> Result<()> {
        if node == NodeId::ROOT {
            return Err(Df2Error::Argument("the root cannot carry a handle".to_string()));
        }
        let current = self
            .tree
            .get(node)
            .ok_or_else(|| Df2Error::NotFound(format!("node {}", node.index())))?
            .handle();
        match handle {
            Some(id) if current == Some(id) => Ok(()),
            Some(id) => {
                if !self.tree.is_attached(node) {
                    return Err(Df2Error::InvalidOperation(format!(
                        "{} was removed; it cannot be bound to handle {id}",
                        self.tree.absolute_path(node)
                    )));
                }
                self.sender.send_handle(&mut self.inner, &self.tree, node, id)?;
                self.tree.bind_handle(id, node);
                Ok(())
            }
            None => {
                if let Some(id) = current {
                    self.sender.send_handle_removal(&mut self.inner, id)?;
                    self.tree.unbind_handle(id);
                }
                Ok(())
            }
        }
    }
}

impl<S: Read + Write> Df2Stream<S> {
    /// Opens a stream with explicit capabilities.
    ///
    /// `Read` and `ReadWrite` validate the preface, `Write` writes it.
    pub fn open(mut inner: S, mode: StreamMode) -> Result<Self> {
        if mode.can_read() {
            read_preface(&mut inner)?;
        } else {
            write_preface(&mut inner)?;
        }
        Ok(Self::assemble(inner, mode, CommandSender::new()))
    }
}

impl<S: Write + Seek + Truncate> Df2Stream<S> {
    /// Replaces the stream contents with a minimal encoding of the current
    /// tree.
    ///
    /// Handles bound to removed nodes are dropped first, which frees the
    /// nodes they kept alive; every other handle is re-emitted right after
    /// its node. Ids of attached nodes stay valid. The rewritten stream has
    /// no `End` until the next [`Df2Stream::flush`].
    pub fn rewrite_optimized(&mut self) -> Result<()> {
        self.sending(|s| {
            let pruned = s.tree.prune_detached_handles();
            s.inner.seek(SeekFrom::Start(0))?;
            s.inner.truncate()?;
            write_preface(&mut s.inner)?;
            s.sender.reset();
            s.snapshot(NodeId::ROOT)?;
            s.inner.flush()?;
            tracing::debug!(pruned, live = s.tree.node_count(), "rewrote stream");
            Ok(())
        })
    }

    fn snapshot(&mut self, group: NodeId) -> Result<()> {
        let children: Vec<NodeId> = self.tree.children(group).collect();
        for child in children {
            let node = self.tree.node(child);
            match node.body() {
                NodeBody::Group(_) => self.sender.send_group(&mut self.inner, &self.tree, child)?,
                NodeBody::Value(value) => {
                    self.sender.send_value(&mut self.inner, &self.tree, child, value)?
                }
            }
            if let Some(id) = node.handle() {
                self.sender.send_handle(&mut self.inner, &self.tree, child, id)?;
            }
            if node.is_group() {
                self.snapshot(child)?;
            }
        }
        Ok(())
    }
}

impl<S> Df2Stream<S> {
    fn assemble(inner: S, mode: StreamMode, sender: CommandSender) -> Self {
        tracing::debug!(?mode, "opened stream");
        Self {
            inner,
            mode,
            tree: Tree::new(),
            sender,
            receiver: CommandReceiver::new(),
            read_offset: PREFACE.len(),
            listeners: BTreeMap::new(),
            next_listener_id: 0,
        }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.tree.view(NodeId::ROOT)
    }

    /// Looks up a node by absolute path.
    pub fn get(&self, path: &str) -> Option<NodeRef<'_>> {
        self.tree.find(path).map(|id| self.tree.view(id))
    }

    /// The node bound to handle `id`, attached or not.
    pub fn handle(&self, id: u32) -> Option<NodeRef<'_>> {
        self.tree.handle_target(id).map(|node| self.tree.view(node))
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.tree.get(id).map(|_| self.tree.view(id))
    }

    /// `true` once an `End` command has been replayed.
    pub fn is_ended(&self) -> bool {
        self.receiver.is_ended()
    }

    /// Bytes consumed from the source so far, preface included.
    pub fn read_offset(&self) -> usize {
        self.read_offset
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Releases the underlying stream. Pass `&mut T` when constructing to
    /// keep ownership of `T` instead.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Registers an observer for every command sent or received.
    pub fn on_command<F>(&mut self, listener: F) -> u64
    where
        F: FnMut(&CommandEvent) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_command(&mut self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    fn notify(&mut self, direction: Direction, record: CommandRecord) {
        if self.listeners.is_empty() {
            return;
        }
        let event = CommandEvent { direction, record };
        for listener in self.listeners.values_mut() {
            listener(&event);
        }
    }

    fn ensure_attached_group(&self, id: NodeId) -> Result<()> {
        let node = self
            .tree
            .get(id)
            .ok_or_else(|| Df2Error::NotFound(format!("node {}", id.index())))?;
        if !node.is_group() {
            return Err(Df2Error::TypeMismatch(format!(
                "{} is a value, not a group",
                self.tree.absolute_path(id)
            )));
        }
        if !self.tree.is_attached(id) {
            return Err(Df2Error::InvalidOperation(format!(
                "group {} was removed",
                self.tree.absolute_path(id)
            )));
        }
        Ok(())
    }

    /// Re-creates this stream's attached tree in `other`, depth first.
    ///
    /// Handles are bound right after their node is created, so a group's
    /// children are addressed through its handle.
    pub fn copy_to<W: Write>(&self, other: &mut Df2Stream<W>) -> Result<()> {
        other.sending(|o| copy_children(&self.tree, NodeId::ROOT, o, NodeId::ROOT))
    }
}

fn copy_children<W: Write>(tree: &Tree, from: NodeId, other: &mut Df2Stream<W>, to: NodeId) -> Result<()> {
    for child in tree.children(from) {
        let node = tree.node(child);
        let copied = match node.body() {
            NodeBody::Group(_) => other.group_child(to, node.name())?,
            NodeBody::Value(value) => other.upsert(to, node.name(), value.clone())?,
        };
        if let Some(id) = node.handle() {
            other.assign_handle(copied, Some(id))?;
        }
        if node.is_group() {
            copy_children(tree, child, other, copied)?;
        }
    }
    Ok(())
}

impl<S> std::fmt::Debug for Df2Stream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Df2Stream")
            .field("mode", &self.mode)
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("read_offset", &self.read_offset)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Write access to one group of a [`Df2Stream`].
pub struct GroupMut<'a, S> {
    stream: &'a mut Df2Stream<S>,
    id: NodeId,
}

impl<S> GroupMut<'_, S> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn view(&self) -> NodeRef<'_> {
        self.stream.tree.view(self.id)
    }
}

impl<'a, S: Write> GroupMut<'a, S> {
    /// Returns the named child group, creating it if absent.
    pub fn get_or_add_group(self, name: &str) -> Result<GroupMut<'a, S>> {
        let parent = self.id;
        let id = self.stream.sending(|s| s.group_child(parent, name))?;
        Ok(GroupMut {
            stream: self.stream,
            id,
        })
    }

    pub fn add_or_update(&mut self, name: &str, value: impl Into<Value>) -> Result<NodeId> {
        let (parent, value) = (self.id, value.into());
        self.stream.sending(|s| s.upsert(parent, name, value))
    }

    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let parent = self.id;
        self.stream.sending(|s| s.remove_child(parent, name))
    }

    pub fn set_handle(&mut self, handle: Option<u32>) -> Result<()> {
        let id = self.id;
        self.stream.sending(|s| s.assign_handle(id, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_only_streams_refuse_reads() {
        let mut s = Df2Stream::open(Cursor::new(Vec::new()), StreamMode::Write).unwrap();
        assert!(matches!(s.process_command(), Err(Df2Error::InvalidOperation(_))));
    }

    #[test]
    fn read_only_streams_refuse_writes() {
        let mut bytes = PREFACE.to_vec();
        bytes.push(0);
        let mut s = Df2Stream::open(Cursor::new(bytes), StreamMode::Read).unwrap();
        assert!(matches!(s.add_or_update("v", 1u8), Err(Df2Error::InvalidOperation(_))));
        assert!(matches!(s.flush(), Err(Df2Error::InvalidOperation(_))));
        assert!(!s.process_command().unwrap());
        assert!(s.is_ended());
        assert!(matches!(s.process_command(), Err(Df2Error::InvalidOperation(_))));
    }

    #[test]
    fn existing_group_is_returned_without_a_command() {
        let mut s = Df2Stream::writer(Vec::new()).unwrap();
        let first = s.get_or_add_group("g").unwrap().id();
        let len = s.get_ref().len();
        let again = s.get_or_add_group("g").unwrap().id();
        assert_eq!(first, again);
        assert_eq!(s.get_ref().len(), len);
    }

    #[test]
    fn names_are_validated() {
        let mut s = Df2Stream::writer(Vec::new()).unwrap();
        for name in ["", "  ", "a/b", "..", "nul\0"] {
            assert!(matches!(s.add_or_update(name, 1u8), Err(Df2Error::Argument(_))), "{name:?}");
        }
        assert!(matches!(s.add_or_update("s", "a\0b"), Err(Df2Error::Argument(_))));
        assert_eq!(s.get_ref().len(), PREFACE.len());
    }

    #[test]
    fn removed_groups_reject_writes() {
        let mut s = Df2Stream::writer(Vec::new()).unwrap();
        let g = s.get_or_add_group("g").unwrap().id();
        assert!(s.remove("g").unwrap());
        assert!(!s.remove("g").unwrap());
        assert!(matches!(s.group(g), Err(Df2Error::NotFound(_))));
        assert!(s.node(g).is_none());

        let pinned = s.get_or_add_group("p").unwrap().id();
        s.set_handle(pinned, Some(1)).unwrap();
        assert!(s.remove("p").unwrap());
        assert!(matches!(s.group(pinned), Err(Df2Error::InvalidOperation(_))));
    }

    #[test]
    fn add_remove_churn_keeps_the_arena_small() {
        let mut s = Df2Stream::writer(Cursor::new(Vec::new())).unwrap();
        let mut first = None;
        for i in 0..10_000u32 {
            let mut g = s.get_or_add_group("g").unwrap();
            let v = g.add_or_update("v", i).unwrap();
            first.get_or_insert(v);
            assert!(s.remove("g").unwrap());
        }
        assert_eq!(s.tree().node_count(), 1);
        assert_eq!(s.tree().slot_count(), 3);
        s.rewrite_optimized().unwrap();
        assert_eq!(s.tree().slot_count(), 3);

        let stale = first.unwrap();
        assert!(s.node(stale).is_none());
        assert!(matches!(s.update_value(stale, 1u32), Err(Df2Error::NotFound(_))));
    }

    #[test]
    fn replaying_churn_keeps_the_reader_arena_small() {
        let mut s = Df2Stream::writer(Vec::new()).unwrap();
        for i in 0..1_000u32 {
            s.get_or_add_group("g").unwrap().add_or_update("v", i).unwrap();
            s.remove("g").unwrap();
        }
        s.flush().unwrap();

        let bytes = s.into_inner();
        let mut reader = Df2Stream::reader(&bytes[..]).unwrap();
        reader.process_until_end().unwrap();
        assert_eq!(reader.tree().node_count(), 1);
        assert_eq!(reader.tree().slot_count(), 3);
    }

    #[test]
    fn root_cannot_carry_a_handle() {
        let mut s = Df2Stream::writer(Vec::new()).unwrap();
        assert!(matches!(s.set_handle(NodeId::ROOT, Some(1)), Err(Df2Error::Argument(_))));
    }

    #[test]
    fn listeners_can_be_removed() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut s = Df2Stream::writer(Vec::new()).unwrap();
        let sink = Rc::clone(&seen);
        let id = s.on_command(move |e| sink.borrow_mut().push(e.record.to_string()));
        s.add_or_update("a", 1u8).unwrap();
        assert!(s.off_command(id));
        assert!(!s.off_command(id));
        s.add_or_update("b", 2u8).unwrap();
        assert_eq!(*seen.borrow(), ["Value Byte (a);"]);
    }
}
