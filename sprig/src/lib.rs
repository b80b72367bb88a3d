//! A small virtual-node UI engine.
//!
//! sprig provides:
//! - **Virtual trees**: element, text and component nodes built with
//!   [`create_element`] and the [`children!`] macro
//! - **Components**: user types implementing [`Component`], with state,
//!   deep-merging [`set_state`](ComponentNode::set_state) and lifecycle hooks
//! - **Reconciliation**: positional diffing that only touches the host where
//!   the new description differs from the mounted one
//! - **Hosts**: anything implementing [`Host`]; [`arena::ArenaHost`] is an
//!   in-memory tree with a mutation log and HTML output
//!
//! # Example
//!
//! ```rust
//! use sprig::arena::ArenaHost;
//! use sprig::{Attributes, Host, SharedHost, children, create_element, render};
//!
//! let arena = ArenaHost::shared();
//! let body = arena.borrow_mut().create_element("body").unwrap();
//! let host: SharedHost = arena.clone();
//!
//! let tree = create_element(
//!     "p",
//!     Attributes::new().with("className", "greeting"),
//!     children!["Hello, ", "world"],
//! )
//! .unwrap();
//! let root = render(tree, &host, body).unwrap();
//! assert_eq!(
//!     arena.borrow().to_html(body),
//!     r#"<p class="greeting">Hello, world</p>"#
//! );
//!
//! root.unmount().unwrap();
//! assert_eq!(arena.borrow().to_html(body), "");
//! ```

#[macro_use]
mod tracing_macros;

pub mod arena;
pub mod attrs;
pub mod component;
pub mod diff;
pub mod error;
pub mod factory;
pub mod host;
pub mod mount;
pub mod reconcile;
pub mod value;
pub mod vnode;

pub use attrs::{AttrValue, Attributes, Event, Handler};
pub use component::{
    Component, ComponentFactory, ComponentHandle, ComponentNode, Lifecycle, Scope,
};
pub use diff::{is_same_node, is_same_tree};
pub use error::{Error, Result};
pub use factory::{Child, NodeType, create_element};
pub use host::{Host, HostNode, InsertionPoint, SharedHost};
pub use value::Value;
pub use vnode::{ElementNode, TextNode, VNode};

/// Mount `tree` after the existing content of the host element `root`.
pub fn render(mut tree: VNode, host: &SharedHost, root: HostNode) -> Result<Root> {
    debug!("rendering into {:?}", root);
    let point = host.borrow_mut().point_at_end(root)?;
    if let Err(err) = tree.mount_or_discard(host, point) {
        let mut host = host.borrow_mut();
        host.clear(point)?;
        host.release(point)?;
        return Err(err);
    }
    Ok(Root {
        tree: Some(tree),
        point,
        host: host.clone(),
    })
}

/// A tree mounted by [`render`].
pub struct Root {
    /// `None` after a failed update
    tree: Option<VNode>,
    point: InsertionPoint,
    host: SharedHost,
}

impl Root {
    /// The mounted description, unless the last update failed.
    pub fn tree(&self) -> Option<&VNode> {
        self.tree.as_ref()
    }

    /// The point holding everything this root put into the host.
    pub fn point(&self) -> InsertionPoint {
        self.point
    }

    /// Replace the mounted tree with `next`, reconciling against it.
    ///
    /// If reconciling fails, the components of the old tree have already
    /// been unmounted and the root holds no tree. The host content stays
    /// where the failure left it until the next update mounts `next` afresh
    /// or [`unmount`](Root::unmount) clears it.
    pub fn update(&mut self, mut next: VNode) -> Result<()> {
        let current = match self.tree.take() {
            Some(previous) => reconcile::reconcile_pair(&self.host, next, previous)?,
            None => {
                debug!("remounting root at {:?}", self.point);
                next.mount_or_discard(&self.host, self.point)?;
                next
            }
        };
        self.tree = Some(current);
        Ok(())
    }

    /// Run unmount hooks for every component, then remove the content.
    pub fn unmount(self) -> Result<()> {
        debug!("unmounting root at {:?}", self.point);
        match self.tree {
            Some(mut tree) => tree.unmount(&self.host),
            None => {
                let mut host = self.host.borrow_mut();
                host.clear(self.point)?;
                host.release(self.point)
            }
        }
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root")
            .field("point", &self.point)
            .field("tree", &self.tree)
            .finish()
    }
}
