//! In-memory host tree.
//!
//! `ArenaHost` keeps every host node in an `indextree` arena and implements
//! insertion points as live ranges over child offsets:
//! - inserting through a range places the node at its start and grows the
//!   range over it;
//! - other ranges owning content at or after that offset move past the new
//!   node, while a collapsed range at the offset stays in front;
//! - removing the child at index `i` moves boundaries inside the removed
//!   subtree to `(parent, i)` and shifts offsets `> i` down by one.
//!
//! Every mutation visits every live range, so released points give their
//! slot back for the next point to reuse.
//!
//! Every tree mutation is appended to a log, which tests use to check that
//! an update touched exactly what it should.

mod serialize;

pub use serialize::SerializeOptions;

use std::cell::RefCell;
use std::rc::Rc;

use facet::Facet;
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use smallvec::SmallVec;

use crate::attrs::{Event, Handler};
use crate::error::{Error, Result};
use crate::host::{Host, HostNode, InsertionPoint};

/// Node payload stored in the arena.
#[derive(Debug, Clone)]
pub(crate) struct HostData {
    pub(crate) handle: HostNode,
    pub(crate) kind: HostKind,
}

#[derive(Debug, Clone)]
pub(crate) enum HostKind {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        listeners: Vec<(String, Handler)>,
    },
    Text(String),
}

/// A live range: content between two child offsets of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range {
    container: NodeId,
    start: usize,
    end: usize,
}

/// One change applied to the host tree.
#[derive(Debug, Clone, PartialEq, Facet)]
#[repr(u8)]
pub enum Mutation {
    CreateElement { node: HostNode, tag: String },
    CreateText { node: HostNode, content: String },
    SetAttribute { node: HostNode, name: String, value: String },
    RemoveAttribute { node: HostNode, name: String },
    AddListener { node: HostNode, event: String },
    Insert { node: HostNode, parent: HostNode, index: usize },
    Remove { node: HostNode, parent: HostNode, index: usize },
}

impl Mutation {
    /// The node this mutation changed.
    pub fn node(&self) -> HostNode {
        match self {
            Mutation::CreateElement { node, .. }
            | Mutation::CreateText { node, .. }
            | Mutation::SetAttribute { node, .. }
            | Mutation::RemoveAttribute { node, .. }
            | Mutation::AddListener { node, .. }
            | Mutation::Insert { node, .. }
            | Mutation::Remove { node, .. } => *node,
        }
    }
}

/// Reference host backed by an arena.
///
/// Removed nodes are detached, never freed, so stale handles keep
/// resolving.
#[derive(Debug, Default)]
pub struct ArenaHost {
    arena: Arena<HostData>,
    /// Handle -> arena id; a handle's raw value is its index here
    nodes: Vec<NodeId>,
    /// Point -> range; a point's raw value is its index here
    ranges: Vec<Option<Range>>,
    /// Released slots of `ranges`
    free: Vec<usize>,
    mutations: Vec<Mutation>,
}

impl ArenaHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new host behind the shared handle the engine expects.
    pub fn shared() -> Rc<RefCell<ArenaHost>> {
        Rc::new(RefCell::new(ArenaHost::new()))
    }

    /// Dispatch an event at `target`.
    ///
    /// Listeners on the target run first, then those of its ancestors.
    /// Listeners are collected before any runs, and the host is not
    /// borrowed while they run, so they may update the tree.
    pub fn dispatch(this: &Rc<RefCell<ArenaHost>>, target: HostNode, event: &str) -> Result<()> {
        let name = event.to_lowercase();
        let handlers: SmallVec<[Handler; 4]> = {
            let host = this.borrow();
            let id = host.id(target)?;
            id.ancestors(&host.arena)
                .flat_map(|ancestor| match &host.arena[ancestor].get().kind {
                    HostKind::Element { listeners, .. } => listeners
                        .iter()
                        .filter(|(event, _)| *event == name)
                        .map(|(_, handler)| handler.clone())
                        .collect::<SmallVec<[Handler; 4]>>(),
                    HostKind::Text(_) => SmallVec::new(),
                })
                .collect()
        };
        trace!("dispatching {} to {} listeners", name, handlers.len());

        let event = Event { name, target };
        for handler in handlers {
            handler.call(&event)?;
        }
        Ok(())
    }

    /// Mutations recorded so far.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Drain the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Points handed out and not yet released.
    pub fn live_points(&self) -> usize {
        self.ranges.len() - self.free.len()
    }

    pub fn tag(&self, node: HostNode) -> Option<&str> {
        match &self.data(node)?.kind {
            HostKind::Element { tag, .. } => Some(tag),
            HostKind::Text(_) => None,
        }
    }

    pub fn text(&self, node: HostNode) -> Option<&str> {
        match &self.data(node)?.kind {
            HostKind::Text(text) => Some(text),
            HostKind::Element { .. } => None,
        }
    }

    pub fn attribute(&self, node: HostNode, name: &str) -> Option<&str> {
        match &self.data(node)?.kind {
            HostKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            HostKind::Text(_) => None,
        }
    }

    /// Attributes of an element, in the order they were set.
    pub fn attributes(&self, node: HostNode) -> Vec<(&str, &str)> {
        match self.data(node).map(|d| &d.kind) {
            Some(HostKind::Element { attrs, .. }) => attrs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn listener_count(&self, node: HostNode) -> usize {
        match self.data(node).map(|d| &d.kind) {
            Some(HostKind::Element { listeners, .. }) => listeners.len(),
            _ => 0,
        }
    }

    pub fn children(&self, node: HostNode) -> Vec<HostNode> {
        match self.id(node) {
            Ok(id) => id
                .children(&self.arena)
                .map(|child| self.arena[child].get().handle)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn parent(&self, node: HostNode) -> Option<HostNode> {
        let id = self.id(node).ok()?;
        let parent = self.arena[id].parent()?;
        Some(self.arena[parent].get().handle)
    }

    /// Serialize the children of `node` as HTML.
    pub fn to_html(&self, node: HostNode) -> String {
        self.to_html_with_options(node, &SerializeOptions::default())
    }

    pub fn to_html_with_options(&self, node: HostNode, opts: &SerializeOptions) -> String {
        match self.id(node) {
            Ok(id) => serialize::serialize_children(&self.arena, id, opts),
            Err(_) => String::new(),
        }
    }

    /// Serialize `node` itself as HTML.
    pub fn outer_html(&self, node: HostNode) -> String {
        match self.id(node) {
            Ok(id) => serialize::serialize_node(&self.arena, id, &SerializeOptions::default()),
            Err(_) => String::new(),
        }
    }

    fn id(&self, node: HostNode) -> Result<NodeId> {
        usize::try_from(node.raw())
            .ok()
            .and_then(|index| self.nodes.get(index))
            .copied()
            .ok_or(Error::UnknownNode { node: node.raw() })
    }

    fn data(&self, node: HostNode) -> Option<&HostData> {
        let id = self.id(node).ok()?;
        Some(self.arena[id].get())
    }

    fn handle_of(&self, id: NodeId) -> HostNode {
        self.arena[id].get().handle
    }

    /// Slot of a live point.
    fn slot(&self, point: InsertionPoint) -> Result<usize> {
        usize::try_from(point.raw())
            .ok()
            .filter(|&index| matches!(self.ranges.get(index), Some(Some(_))))
            .ok_or(Error::UnknownPoint { point: point.raw() })
    }

    fn range(&self, point: InsertionPoint) -> Result<Range> {
        let index = self.slot(point)?;
        self.ranges[index].ok_or(Error::UnknownPoint { point: point.raw() })
    }

    fn range_mut(&mut self, point: InsertionPoint) -> Result<&mut Range> {
        let index = self.slot(point)?;
        self.ranges[index]
            .as_mut()
            .ok_or(Error::UnknownPoint { point: point.raw() })
    }

    fn new_range(&mut self, container: NodeId, offset: usize) -> InsertionPoint {
        let range = Range {
            container,
            start: offset,
            end: offset,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.ranges[index] = Some(range);
                index
            }
            None => {
                self.ranges.push(Some(range));
                self.ranges.len() - 1
            }
        };
        InsertionPoint::from_raw(index as u64)
    }

    fn new_node(&mut self, kind: HostKind) -> HostNode {
        let handle = HostNode::from_raw(self.nodes.len() as u64);
        let id = self.arena.new_node(HostData { handle, kind });
        self.nodes.push(id);
        handle
    }

    fn element_id(&self, node: HostNode) -> Result<NodeId> {
        let id = self.id(node)?;
        match self.arena[id].get().kind {
            HostKind::Element { .. } => Ok(id),
            HostKind::Text(_) => Err(Error::NotAnElement),
        }
    }

    fn element_mut(
        &mut self,
        node: HostNode,
    ) -> Result<(&mut IndexMap<String, String>, &mut Vec<(String, Handler)>)> {
        let id = self.element_id(node)?;
        match &mut self.arena[id].get_mut().kind {
            HostKind::Element {
                attrs, listeners, ..
            } => Ok((attrs, listeners)),
            HostKind::Text(_) => Err(Error::NotAnElement),
        }
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.arena[id].parent()?;
        let index = parent.children(&self.arena).position(|c| c == id)?;
        Some((parent, index))
    }

    /// Insert `child` at the start of the range `through`.
    ///
    /// Other ranges owning content at or after `index` move past the new
    /// node; a collapsed range at `index` stays in front of it.
    fn insert_child(&mut self, through: usize, container: NodeId, index: usize, child: NodeId) {
        let next = container.children(&self.arena).nth(index);
        match next {
            Some(next) => next.insert_before(child, &mut self.arena),
            None => container.append(child, &mut self.arena),
        }
        for (i, slot) in self.ranges.iter_mut().enumerate() {
            let Some(range) = slot else {
                continue;
            };
            if range.container != container {
                continue;
            }
            if i == through {
                range.end += 1;
            } else if range.start > index || (range.start == index && range.end > index) {
                range.start += 1;
                range.end += 1;
            } else if range.end > index {
                range.end += 1;
            }
        }
        self.mutations.push(Mutation::Insert {
            node: self.handle_of(child),
            parent: self.handle_of(container),
            index,
        });
    }

    fn remove_child(&mut self, child: NodeId) {
        let Some((parent, index)) = self.index_in_parent(child) else {
            return;
        };
        child.detach(&mut self.arena);

        let arena = &self.arena;
        for range in self.ranges.iter_mut().flatten() {
            if range.container.ancestors(arena).any(|a| a == child) {
                *range = Range {
                    container: parent,
                    start: index,
                    end: index,
                };
            } else if range.container == parent {
                if range.start > index {
                    range.start -= 1;
                }
                if range.end > index {
                    range.end -= 1;
                }
            }
        }
        self.mutations.push(Mutation::Remove {
            node: self.handle_of(child),
            parent: self.handle_of(parent),
            index,
        });
    }
}

impl Host for ArenaHost {
    fn create_element(&mut self, tag: &str) -> Result<HostNode> {
        let node = self.new_node(HostKind::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            listeners: Vec::new(),
        });
        self.mutations.push(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text(&mut self, content: &str) -> Result<HostNode> {
        let node = self.new_node(HostKind::Text(content.to_string()));
        self.mutations.push(Mutation::CreateText {
            node,
            content: content.to_string(),
        });
        Ok(node)
    }

    fn set_attribute(&mut self, element: HostNode, name: &str, value: &str) -> Result<()> {
        let (attrs, _) = self.element_mut(element)?;
        attrs.insert(name.to_string(), value.to_string());
        self.mutations.push(Mutation::SetAttribute {
            node: element,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, element: HostNode, name: &str) -> Result<()> {
        let (attrs, _) = self.element_mut(element)?;
        attrs.shift_remove(name);
        self.mutations.push(Mutation::RemoveAttribute {
            node: element,
            name: name.to_string(),
        });
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        element: HostNode,
        event: &str,
        handler: Handler,
    ) -> Result<()> {
        let (_, listeners) = self.element_mut(element)?;
        listeners.push((event.to_string(), handler));
        self.mutations.push(Mutation::AddListener {
            node: element,
            event: event.to_string(),
        });
        Ok(())
    }

    fn point_at_start(&mut self, parent: HostNode) -> Result<InsertionPoint> {
        let id = self.element_id(parent)?;
        Ok(self.new_range(id, 0))
    }

    fn point_at_end(&mut self, parent: HostNode) -> Result<InsertionPoint> {
        let id = self.element_id(parent)?;
        let len = id.children(&self.arena).count();
        Ok(self.new_range(id, len))
    }

    fn point_before(&mut self, sibling: HostNode) -> Result<InsertionPoint> {
        let id = self.id(sibling)?;
        let (parent, index) = self.index_in_parent(id).ok_or(Error::DetachedSibling)?;
        Ok(self.new_range(parent, index))
    }

    fn point_after(&mut self, sibling: HostNode) -> Result<InsertionPoint> {
        let id = self.id(sibling)?;
        let (parent, index) = self.index_in_parent(id).ok_or(Error::DetachedSibling)?;
        Ok(self.new_range(parent, index + 1))
    }

    fn point_following(&mut self, point: InsertionPoint) -> Result<InsertionPoint> {
        let range = self.range(point)?;
        Ok(self.new_range(range.container, range.end))
    }

    fn clear(&mut self, point: InsertionPoint) -> Result<()> {
        loop {
            let range = self.range(point)?;
            if range.start >= range.end {
                return Ok(());
            }
            let child = range.container.children(&self.arena).nth(range.start);
            match child {
                Some(child) => self.remove_child(child),
                None => {
                    // Offsets past the last child own nothing.
                    let range = self.range_mut(point)?;
                    range.end = range.start;
                }
            }
        }
    }

    fn insert(&mut self, point: InsertionPoint, node: HostNode) -> Result<()> {
        let id = self.id(node)?;
        if self.arena[id].parent().is_some() {
            self.remove_child(id);
        }
        let through = self.slot(point)?;
        let range = self.range(point)?;
        self.insert_child(through, range.container, range.start, id);
        Ok(())
    }

    fn release(&mut self, point: InsertionPoint) -> Result<()> {
        let index = self.slot(point)?;
        self.ranges[index] = None;
        self.free.push(index);
        trace!("released {:?}", point);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn host_with_root() -> (ArenaHost, HostNode) {
        let mut host = ArenaHost::new();
        let root = host.create_element("body").unwrap();
        (host, root)
    }

    fn text_at(host: &mut ArenaHost, point: InsertionPoint, content: &str) -> HostNode {
        let node = host.create_text(content).unwrap();
        host.insert(point, node).unwrap();
        node
    }

    #[test]
    fn collapsed_points_grow_over_inserted_nodes() {
        let (mut host, root) = host_with_root();
        let first = host.point_at_end(root).unwrap();
        text_at(&mut host, first, "a");
        let second = host.point_at_end(root).unwrap();
        text_at(&mut host, second, "b");
        assert_eq!(host.to_html(root), "ab");

        // Re-filling the first point leaves the second alone.
        host.clear(first).unwrap();
        text_at(&mut host, first, "A");
        assert_eq!(host.to_html(root), "Ab");
        host.clear(second).unwrap();
        text_at(&mut host, second, "B");
        assert_eq!(host.to_html(root), "AB");
    }

    #[test]
    fn following_point_appends_after_content() {
        let (mut host, root) = host_with_root();
        let first = host.point_at_end(root).unwrap();
        text_at(&mut host, first, "a");
        let last = host.point_at_end(root).unwrap();
        text_at(&mut host, last, "z");

        let next = host.point_following(first).unwrap();
        text_at(&mut host, next, "b");
        let after = host.point_following(next).unwrap();
        text_at(&mut host, after, "c");
        assert_eq!(host.to_html(root), "abcz");
    }

    #[test]
    fn sibling_points() {
        let (mut host, root) = host_with_root();
        let start = host.point_at_start(root).unwrap();
        let mid = text_at(&mut host, start, "m");
        let before = host.point_before(mid).unwrap();
        text_at(&mut host, before, "<");
        let after = host.point_after(mid).unwrap();
        text_at(&mut host, after, ">");
        assert_eq!(host.to_html(root), "&lt;m&gt;");

        let detached = host.create_text("x").unwrap();
        assert_eq!(host.point_before(detached), Err(Error::DetachedSibling));
    }

    #[test]
    fn points_inside_removed_subtrees_collapse_to_the_removal_site() {
        let (mut host, root) = host_with_root();
        let outer = host.point_at_end(root).unwrap();
        let div = host.create_element("div").unwrap();
        let inner = host.point_at_end(div).unwrap();
        text_at(&mut host, inner, "inside");
        host.insert(outer, div).unwrap();
        assert_eq!(host.to_html(root), "<div>inside</div>");

        host.clear(outer).unwrap();
        assert_eq!(host.to_html(root), "");
        // The inner point now sits where the div was.
        text_at(&mut host, inner, "moved");
        assert_eq!(host.to_html(root), "moved");
    }

    #[test]
    fn attributes_and_listeners_require_elements() {
        let (mut host, root) = host_with_root();
        host.set_attribute(root, "class", "x").unwrap();
        assert_eq!(host.attribute(root, "class"), Some("x"));
        host.remove_attribute(root, "class").unwrap();
        assert_eq!(host.attribute(root, "class"), None);

        host.set_attribute(root, "id", "main").unwrap();
        host.set_attribute(root, "lang", "en").unwrap();
        assert_eq!(host.attributes(root), [("id", "main"), ("lang", "en")]);
        assert_eq!(host.tag(root), Some("body"));

        let text = host.create_text("t").unwrap();
        assert_eq!(host.text(text), Some("t"));
        assert_eq!(host.tag(text), None);
        assert_eq!(
            host.set_attribute(text, "class", "x"),
            Err(Error::NotAnElement)
        );
        assert_eq!(
            host.point_at_end(HostNode::from_raw(99)),
            Err(Error::UnknownNode { node: 99 })
        );
    }

    #[test]
    fn dispatch_bubbles_without_holding_the_host() {
        let host = ArenaHost::shared();
        let (root, button) = {
            let mut h = host.borrow_mut();
            let root = h.create_element("body").unwrap();
            let button = h.create_element("button").unwrap();
            let point = h.point_at_end(root).unwrap();
            h.insert(point, button).unwrap();
            (root, button)
        };

        let seen = Rc::new(RefCell::new(Vec::new()));
        for (node, label) in [(button, "button"), (root, "body")] {
            let seen = seen.clone();
            let reentrant = host.clone();
            host.borrow_mut()
                .add_event_listener(
                    node,
                    "click",
                    Handler::new(move |event| {
                        // The host must be free while handlers run.
                        reentrant.borrow_mut().create_text("side effect")?;
                        seen.borrow_mut().push((label, event.target));
                        Ok(())
                    }),
                )
                .unwrap();
        }

        ArenaHost::dispatch(&host, button, "Click").unwrap();
        assert_eq!(*seen.borrow(), [("button", button), ("body", button)]);
    }

    #[test]
    fn released_points_are_recycled() {
        let (mut host, root) = host_with_root();
        let kept = host.point_at_end(root).unwrap();
        let dropped = host.point_at_end(root).unwrap();
        assert_eq!(host.live_points(), 2);

        host.release(dropped).unwrap();
        assert_eq!(host.live_points(), 1);
        assert_eq!(
            host.clear(dropped),
            Err(Error::UnknownPoint {
                point: dropped.raw()
            })
        );
        assert_eq!(
            host.release(dropped),
            Err(Error::UnknownPoint {
                point: dropped.raw()
            })
        );

        let reused = host.point_following(kept).unwrap();
        assert_eq!(reused, dropped);
        text_at(&mut host, reused, "again");
        assert_eq!(host.to_html(root), "again");
        assert_eq!(host.live_points(), 2);
    }

    #[test]
    fn mutation_log_serializes() {
        let (mut host, root) = host_with_root();
        let point = host.point_at_end(root).unwrap();
        text_at(&mut host, point, "hi");
        let log = host.take_mutations();
        assert_eq!(log.len(), 3);
        assert!(host.mutations().is_empty());

        let json = facet_json::to_string(&log[2]).expect("serialization should work");
        assert!(json.contains("Insert"), "unexpected json: {json}");
    }
}
