//! The host tree the engine drives.
//!
//! A host is whatever actually displays content: a browser document, a
//! native widget tree, or the in-memory [`ArenaHost`](crate::arena::ArenaHost)
//! used for tests. The engine only talks to it through [`Host`], addressing
//! nodes and locations with opaque handles the host mints.
//!
//! Locations are [`InsertionPoint`]s: live ranges between two siblings of a
//! host parent. A point owns the content between its boundaries; clearing it
//! removes that content, inserting at it places a node at its start. A
//! collapsed point grows to cover the node inserted into it, so a point keeps
//! tracking "the content of this virtual node" as siblings come and go.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use facet::Facet;

use crate::attrs::Handler;
use crate::error::Result;

/// Handle to a node in the host tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[facet(transparent)]
pub struct HostNode(u64);

impl HostNode {
    /// Mint a handle. Only host implementations should need this.
    pub fn from_raw(raw: u64) -> Self {
        HostNode(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HostNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a live range of the host tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[facet(transparent)]
pub struct InsertionPoint(u64);

impl InsertionPoint {
    /// Mint a handle. Only host implementations should need this.
    pub fn from_raw(raw: u64) -> Self {
        InsertionPoint(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for InsertionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Operations the engine needs from a rendering target.
///
/// Implementations must invoke registered [`Handler`]s without holding a
/// borrow of themselves: handlers re-enter the engine, which borrows the
/// host again to apply the resulting update.
pub trait Host {
    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Result<HostNode>;

    /// Create a detached text node.
    fn create_text(&mut self, content: &str) -> Result<HostNode>;

    fn set_attribute(&mut self, element: HostNode, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&mut self, element: HostNode, name: &str) -> Result<()>;

    /// Register `handler` for events named `event` on `element`.
    fn add_event_listener(&mut self, element: HostNode, event: &str, handler: Handler)
    -> Result<()>;

    /// A collapsed point before the first child of `parent`.
    fn point_at_start(&mut self, parent: HostNode) -> Result<InsertionPoint>;

    /// A collapsed point after the last child of `parent`.
    fn point_at_end(&mut self, parent: HostNode) -> Result<InsertionPoint>;

    /// A collapsed point directly before `sibling`.
    fn point_before(&mut self, sibling: HostNode) -> Result<InsertionPoint>;

    /// A collapsed point directly after `sibling`.
    fn point_after(&mut self, sibling: HostNode) -> Result<InsertionPoint>;

    /// A collapsed point directly after the content `point` currently owns.
    fn point_following(&mut self, point: InsertionPoint) -> Result<InsertionPoint>;

    /// Remove everything `point` owns and collapse it.
    fn clear(&mut self, point: InsertionPoint) -> Result<()>;

    /// Insert `node` at the start of `point`, moving it if it is attached
    /// elsewhere.
    fn insert(&mut self, point: InsertionPoint, node: HostNode) -> Result<()>;

    /// The engine will not use `point` again. Hosts may recycle it.
    ///
    /// Released points are never passed back to the host, so the default
    /// keeps nothing to free.
    fn release(&mut self, _point: InsertionPoint) -> Result<()> {
        Ok(())
    }

    /// Attribute name the host uses for styling classes.
    fn class_attribute(&self) -> &str {
        "class"
    }
}

/// A host shared between the engine and the callbacks it registers.
pub type SharedHost = Rc<RefCell<dyn Host>>;
