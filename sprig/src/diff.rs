//! Structural equivalence between virtual nodes.
//!
//! Identity is only a fast path: a freshly rendered node that matches a
//! mounted one by type and attributes counts as the same node, which is what
//! lets the reconciler skip unchanged subtrees.

use crate::vnode::VNode;

/// Whether `a` and `b` describe the same node, ignoring children.
///
/// Elements match on tag and attributes, text on content, components on
/// component type and props. Nodes of different kinds never match.
pub fn is_same_node(a: &VNode, b: &VNode) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    match (a, b) {
        (VNode::Element(a), VNode::Element(b)) => a.tag == b.tag && a.attributes == b.attributes,
        (VNode::Text(a), VNode::Text(b)) => a.content == b.content,
        (VNode::Component(a), VNode::Component(b)) => {
            a.ptr_eq(b) || (a.type_id() == b.type_id() && a.props() == b.props())
        }
        _ => false,
    }
}

/// Whether `a` and `b` describe the same subtree: the same node, the same
/// number of children, and every child pair the same subtree.
pub fn is_same_tree(a: &VNode, b: &VNode) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    if !is_same_node(a, b) {
        return false;
    }
    let (a_children, b_children) = (a.children(), b.children());
    a_children.len() == b_children.len()
        && a_children
            .iter()
            .zip(b_children)
            .all(|(a, b)| is_same_tree(a, b))
}
