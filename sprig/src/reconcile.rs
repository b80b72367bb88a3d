//! Reconciling a new virtual tree against the mounted one.
//!
//! The diff is positional and shallow: children are paired by index, a pair
//! whose roots differ is replaced wholesale, and a pair whose roots match
//! keeps its host element while its children are reconciled in turn. Only
//! the parts that differ reach the host.
//!
//! Appending children that have no old counterpart needs a position after
//! the last child seen so far. That position (the carry) travels through
//! [`Cursor`], passed in and handed back by each call, so independent passes
//! never share it.

use crate::diff::{is_same_node, is_same_tree};
use crate::error::{Error, Result};
use crate::host::{HostNode, InsertionPoint, SharedHost};
use crate::vnode::VNode;

/// Position state threaded through a reconciliation pass over one child
/// list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Host element owning the child list
    pub parent: Option<HostNode>,
    /// Point of the last child handled so far
    pub carry: Option<InsertionPoint>,
}

impl Cursor {
    /// A fresh cursor for the children of `parent`.
    pub fn within(parent: HostNode) -> Self {
        Cursor {
            parent: Some(parent),
            carry: None,
        }
    }
}

/// Result of reconciling one position.
#[derive(Debug)]
pub struct Reconciled {
    /// The mounted node now occupying the position, if any
    pub node: Option<VNode>,
    pub cursor: Cursor,
}

/// Reconcile `new` against the mounted `old` at one position.
///
/// - no `old`: `new` is mounted after the cursor's carry, or at the end of
///   its parent when nothing was carried yet;
/// - same subtree: nothing happens and the mounted `old` is kept;
/// - different root: components under `old` are unmounted, the points under
///   it are released, and `new` is mounted at `old`'s point, discarding the
///   old content;
/// - same root element: `new` takes over `old`'s host element and the
///   children are reconciled pairwise;
/// - no `new`: `old` is unmounted, its content removed and its point
///   released.
pub fn reconcile(
    host: &SharedHost,
    new: Option<VNode>,
    old: Option<VNode>,
    cursor: Cursor,
) -> Result<Reconciled> {
    match (new, old) {
        (None, None) => Ok(Reconciled { node: None, cursor }),
        (Some(mut new), None) => {
            let point = match (cursor.carry, cursor.parent) {
                (Some(carry), _) => host.borrow_mut().point_following(carry)?,
                (None, Some(parent)) => host.borrow_mut().point_at_end(parent)?,
                (None, None) => return Err(Error::NotMounted),
            };
            trace!("appending new node at {:?}", point);
            if let Err(err) = new.mount_or_discard(host, point) {
                host.borrow_mut().release(point)?;
                return Err(err);
            }
            Ok(Reconciled {
                node: Some(new),
                cursor: Cursor {
                    carry: Some(point),
                    ..cursor
                },
            })
        }
        (None, Some(mut old)) => {
            trace!("removing node at {:?}", old.point());
            old.unmount(host)?;
            Ok(Reconciled { node: None, cursor })
        }
        (Some(new), Some(old)) => {
            let node = reconcile_pair(host, new, old)?;
            let carry = node.point().or(cursor.carry);
            Ok(Reconciled {
                node: Some(node),
                cursor: Cursor { carry, ..cursor },
            })
        }
    }
}

/// Reconcile two present nodes and return the one left mounted.
pub fn reconcile_pair(host: &SharedHost, new: VNode, old: VNode) -> Result<VNode> {
    if is_same_tree(&new, &old) {
        trace!("subtree unchanged at {:?}", old.point());
        return Ok(old);
    }

    let point = old.point().ok_or(Error::NotMounted)?;
    let same_root = is_same_node(&new, &old);
    match (new, old) {
        (VNode::Element(mut new_el), VNode::Element(mut old_el)) if same_root => {
            let mounted = old_el.mounted.ok_or(Error::NotMounted)?;
            trace!("descending into <{}> at {:?}", new_el.tag, point);
            new_el.mounted = Some(mounted);
            let new_children = std::mem::take(&mut new_el.children);
            let old_children = std::mem::take(&mut old_el.children);
            new_el.children = reconcile_children(host, mounted.node, new_children, old_children)?;
            Ok(VNode::Element(new_el))
        }
        // Components have no host children to descend into, so they are
        // replaced like any other mismatch.
        (mut new, mut old) => {
            trace!("replacing subtree at {:?}", point);
            old.discard(host)?;
            new.mount_or_discard(host, point)?;
            Ok(new)
        }
    }
}

/// Reconcile two child lists of the mounted element `parent` by position.
///
/// If a position fails, the children reconciled so far and the old children
/// not reached yet are discarded and every child point is released before
/// the error is returned, so their components still see
/// `component_will_unmount`. Their host content stays until the enclosing
/// point is cleared.
pub fn reconcile_children(
    host: &SharedHost,
    parent: HostNode,
    new: Vec<VNode>,
    old: Vec<VNode>,
) -> Result<Vec<VNode>> {
    let mut cursor = Cursor::within(parent);
    let mut mounted = Vec::with_capacity(new.len());
    let mut new = new.into_iter();
    let mut old = old.into_iter();
    loop {
        let (next_new, next_old) = (new.next(), old.next());
        if next_new.is_none() && next_old.is_none() {
            break;
        }
        let failing_point = next_old.as_ref().and_then(VNode::point);
        let step = match reconcile(host, next_new, next_old, cursor) {
            Ok(step) => step,
            Err(err) => {
                trace!("reconcile under {:?} failed, discarding siblings", parent);
                let mut points: Vec<_> = failing_point.into_iter().collect();
                for mut node in mounted.into_iter().chain(old) {
                    points.extend(node.point());
                    node.discard(host)?;
                }
                let mut host = host.borrow_mut();
                for point in points {
                    host.release(point)?;
                }
                return Err(err);
            }
        };
        cursor = step.cursor;
        mounted.extend(step.node);
    }
    Ok(mounted)
}
