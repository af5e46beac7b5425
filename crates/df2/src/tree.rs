//! Group/value tree and handle table.
//!
//! Nodes live in an arena owned by the tree and are addressed by
//! [`NodeId`]. Groups own their children through an insertion-ordered
//! name map; the parent link is a plain id, so there are no reference
//! cycles.
//!
//! Removing a node detaches it from its parent's map. The part of the
//! detached subtree that a bound handle can still reach (the handle's
//! node, its descendants and its ancestors up to the removed node) stays
//! in the arena; every other slot goes on a free list for reuse. Each
//! slot carries a generation, so an id of a reclaimed node stops
//! resolving instead of aliasing whatever reuses the slot.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Df2Error, Result};
use crate::kind::Kind;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// The document root.
    pub const ROOT: NodeId = NodeId {
        index: 0,
        generation: 0,
    };

    pub fn index(self) -> usize {
        self.index
    }

    /// Bumped each time the slot is reclaimed.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub enum NodeBody {
    Group(IndexMap<String, NodeId>),
    Value(Value),
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    handle: Option<u32>,
    /// Path of the former parent, set on the top node of a detached subtree.
    origin: Option<String>,
    body: NodeBody,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>, body: NodeBody) -> Self {
        Self {
            name: name.to_string(),
            parent,
            handle: None,
            origin: None,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` for the root and for the top node of a removed subtree.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn is_group(&self) -> bool {
        matches!(self.body, NodeBody::Group(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.body {
            NodeBody::Value(v) => Some(v),
            NodeBody::Group(_) => None,
        }
    }

    /// `Kind::Group` for groups, the payload kind for values.
    pub fn kind(&self) -> Kind {
        match &self.body {
            NodeBody::Group(_) => Kind::Group,
            NodeBody::Value(v) => v.kind(),
        }
    }
}

/// Result of [`Tree::add_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated { previous: Kind },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    live: bool,
    node: Node,
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    handles: BTreeMap<u32, NodeId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                live: true,
                node: Node::new("", None, NodeBody::Group(IndexMap::new())),
            }],
            free: Vec::new(),
            handles: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The node behind `id`, or `None` once it was reclaimed.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.live && slot.generation == id.generation)
            .map(|slot| &slot.node)
    }

    /// Nodes currently held, the root included.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Slots allocated so far, free ones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    // Ids are only minted by this tree, so the index is always in range.
    // Public entry points check liveness with `get` first.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.index].node
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.index].node
    }

    pub fn view(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        match &self.get(parent)?.body {
            NodeBody::Group(children) => children.get(name).copied(),
            NodeBody::Value(_) => None,
        }
    }

    /// Children of a group in insertion order; empty for values.
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let children = match self.get(parent).map(|n| &n.body) {
            Some(NodeBody::Group(children)) => Some(children.values().copied()),
            _ => None,
        };
        children.into_iter().flatten()
    }

    /// `true` when the node is reachable from the root.
    pub fn is_attached(&self, mut id: NodeId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        loop {
            if id == NodeId::ROOT {
                return true;
            }
            let node = self.node(id);
            let Some(parent) = node.parent else {
                return false;
            };
            if self.child(parent, &node.name) != Some(id) {
                return false;
            }
            id = parent;
        }
    }

    /// Absolute path; groups end with `/`, the root is `/`.
    ///
    /// Detached nodes report the path they had when they were removed.
    pub fn absolute_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut origin = None;
        let mut cursor = id;
        loop {
            let node = self.node(cursor);
            match node.parent {
                Some(parent) => {
                    names.push(node.name.as_str());
                    cursor = parent;
                }
                None => {
                    if let Some(prefix) = &node.origin {
                        names.push(node.name.as_str());
                        origin = Some(prefix.as_str());
                    }
                    break;
                }
            }
        }
        let mut parts: Vec<&str> = origin.map(|o| df2_path::segments(o).collect()).unwrap_or_default();
        parts.extend(names.into_iter().rev());
        let mut path = df2_path::join(&parts);
        if self.node(id).is_group() && !parts.is_empty() {
            path.push('/');
        }
        path
    }

    /// Looks up a node by absolute path, descending through groups only.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        df2_path::segments(path).try_fold(NodeId::ROOT, |at, name| self.child(at, name))
    }

    fn expect_group(&self, id: NodeId) -> Result<()> {
        match self.get(id) {
            Some(node) if node.is_group() => Ok(()),
            Some(_) => Err(Df2Error::TypeMismatch(format!(
                "{} is a value, not a group",
                self.absolute_path(id)
            ))),
            None => Err(Df2Error::NotFound(format!("node {}", id.index))),
        }
    }

    fn push(&mut self, parent: NodeId, name: &str, body: NodeBody) -> NodeId {
        let node = Node::new(name, Some(parent), body);
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.live = true;
                slot.node = node;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    live: true,
                    node,
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        if let NodeBody::Group(children) = &mut self.node_mut(parent).body {
            children.insert(name.to_string(), id);
        }
        id
    }

    fn release(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.index];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.node = Node::new("", None, NodeBody::Group(IndexMap::new()));
        self.free.push(id.index);
    }

    /// Returns the named child group, creating it if absent.
    ///
    /// The flag is `true` when the group was created.
    ///
    /// # Errors
    ///
    /// [`Df2Error::TypeMismatch`] if `parent` is a value or the name is
    /// taken by a value.
    pub fn get_or_add_group(&mut self, parent: NodeId, name: &str) -> Result<(NodeId, bool)> {
        self.expect_group(parent)?;
        match self.child(parent, name) {
            Some(id) => {
                self.expect_group(id)?;
                Ok((id, false))
            }
            None => Ok((self.push(parent, name, NodeBody::Group(IndexMap::new())), true)),
        }
    }

    /// Creates the named value or overwrites its payload in place.
    ///
    /// An existing value keeps its id and handle.
    pub fn add_or_update(&mut self, parent: NodeId, name: &str, value: Value) -> Result<(NodeId, Upsert)> {
        self.expect_group(parent)?;
        match self.child(parent, name) {
            Some(id) => {
                let previous = self.set_value(id, value)?;
                Ok((id, Upsert::Updated { previous }))
            }
            None => Ok((self.push(parent, name, NodeBody::Value(value)), Upsert::Created)),
        }
    }

    /// Replaces the payload of a value node and returns its previous kind.
    pub fn set_value(&mut self, id: NodeId, value: Value) -> Result<Kind> {
        if self.get(id).is_none() {
            return Err(Df2Error::NotFound(format!("node {}", id.index)));
        }
        match &mut self.node_mut(id).body {
            NodeBody::Value(slot) => {
                let previous = slot.kind();
                *slot = value;
                Ok(previous)
            }
            NodeBody::Group(_) => Err(Df2Error::TypeMismatch(format!(
                "{} is a group, not a value",
                self.absolute_path(id)
            ))),
        }
    }

    /// Detaches the named child; `false` if there was none.
    ///
    /// Handles bound inside the subtree stay bound and keep their nodes
    /// alive. Everything else in the subtree is reclaimed.
    pub fn detach(&mut self, parent: NodeId, name: &str) -> bool {
        if self.get(parent).is_none() {
            return false;
        }
        let removed = match &mut self.node_mut(parent).body {
            NodeBody::Group(children) => children.shift_remove(name),
            NodeBody::Value(_) => None,
        };
        let Some(child) = removed else {
            return false;
        };
        let origin = self.absolute_path(parent);
        let top = self.node_mut(child);
        top.parent = None;
        top.origin = Some(origin);
        self.reclaim(child);
        true
    }

    /// Frees the slots of the detached subtree under `top` that no bound
    /// handle can reach, and returns how many were freed.
    fn reclaim(&mut self, top: NodeId) -> usize {
        // Pre-order, so every entry comes after its parent's.
        let mut order: Vec<(NodeId, Option<usize>, bool)> = Vec::new();
        let mut stack = vec![(top, None)];
        while let Some((id, parent)) = stack.pop() {
            let pinned = self.node(id).handle.is_some() || parent.is_some_and(|p: usize| order[p].2);
            let position = order.len();
            order.push((id, parent, pinned));
            stack.extend(self.children(id).map(|child| (child, Some(position))));
        }

        let mut keep: Vec<bool> = order.iter().map(|entry| entry.2).collect();
        let mut freed = 0;
        for position in (0..order.len()).rev() {
            let (id, parent, _) = order[position];
            if keep[position] {
                if let Some(p) = parent {
                    keep[p] = true;
                }
                continue;
            }
            if let Some(p) = parent {
                let name = std::mem::take(&mut self.node_mut(id).name);
                if let NodeBody::Group(children) = &mut self.node_mut(order[p].0).body {
                    children.shift_remove(&name);
                }
            }
            self.release(id);
            freed += 1;
        }
        if freed > 0 {
            tracing::trace!(target: "df2::tree", freed, live = self.node_count(), "reclaimed detached nodes");
        }
        freed
    }

    /// Reclaims what is unreachable in the detached subtree holding `id`.
    fn reclaim_if_detached(&mut self, id: NodeId) {
        if self.get(id).is_none() {
            return;
        }
        let mut top = id;
        while let Some(parent) = self.node(top).parent {
            top = parent;
        }
        if top != NodeId::ROOT {
            self.reclaim(top);
        }
    }

    pub fn handle_target(&self, id: u32) -> Option<NodeId> {
        self.handles.get(&id).copied()
    }

    /// Bound handles in ascending id order.
    pub fn handles(&self) -> impl Iterator<Item = (u32, NodeId)> + '_ {
        self.handles.iter().map(|(h, n)| (*h, *n))
    }

    /// Binds `id` to `node`.
    ///
    /// A previous id of `node` is released, and a node that held `id`
    /// before loses it, so the table and the nodes' handle fields always
    /// agree. A removed node that loses its last handle this way is
    /// reclaimed.
    pub fn bind_handle(&mut self, id: u32, node: NodeId) {
        if self.get(node).is_none() {
            return;
        }
        if let Some(old) = self.node(node).handle {
            if old != id && self.handles.get(&old) == Some(&node) {
                self.handles.remove(&old);
            }
        }
        self.node_mut(node).handle = Some(id);
        if let Some(previous) = self.handles.insert(id, node) {
            if previous != node {
                self.node_mut(previous).handle = None;
                self.reclaim_if_detached(previous);
            }
        }
    }

    /// Removes the binding for `id` and returns the node it pointed at.
    ///
    /// If that node was removed from the tree it is reclaimed, so the
    /// returned id may no longer resolve.
    pub fn unbind_handle(&mut self, id: u32) -> Option<NodeId> {
        let node = self.handles.remove(&id)?;
        if self.node(node).handle == Some(id) {
            self.node_mut(node).handle = None;
        }
        self.reclaim_if_detached(node);
        Some(node)
    }

    /// Drops bindings whose node is no longer reachable from the root.
    pub(crate) fn prune_detached_handles(&mut self) -> usize {
        let dangling: Vec<u32> = self
            .handles
            .iter()
            .filter(|(_, node)| !self.is_attached(**node))
            .map(|(h, _)| *h)
            .collect();
        for id in &dangling {
            self.unbind_handle(*id);
        }
        dangling.len()
    }
}

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a Node {
        self.tree.node(self.id)
    }

    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn handle(&self) -> Option<u32> {
        self.node().handle
    }

    pub fn kind(&self) -> Kind {
        self.node().kind()
    }

    pub fn is_group(&self) -> bool {
        self.node().is_group()
    }

    pub fn value(&self) -> Option<&'a Value> {
        self.node().value()
    }

    pub fn absolute_path(&self) -> String {
        self.tree.absolute_path(self.id)
    }

    pub fn is_attached(&self) -> bool {
        self.tree.is_attached(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| self.tree.view(id))
    }

    pub fn child(&self, name: &str) -> Option<NodeRef<'a>> {
        self.tree.child(self.id, name).map(|id| self.tree.view(id))
    }

    /// Like [`NodeRef::child`], but a missing child is an error.
    pub fn at(&self, name: &str) -> Result<NodeRef<'a>> {
        self.child(name).ok_or_else(|| {
            Df2Error::NotFound(format!("{:?} in {}", name, self.absolute_path()))
        })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).map(move |id| tree.view(id))
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("path", &self.absolute_path())
            .field("handle", &self.handle())
            .field("value", &self.value())
            .finish()
    }
}
