//! Virtual nodes: in-memory descriptions of UI, before and after they are
//! bound to host content.
//!
//! A tree is built unmounted by the [factory](crate::factory), mounted once
//! through [`VNode::mount_to`], and afterwards only changes by being
//! reconciled against a newer description. Every node owns its children, so
//! a node can never appear under two parents.

use std::fmt;

use crate::attrs::{AttrValue, Attributes};
use crate::component::ComponentNode;
use crate::host::{HostNode, InsertionPoint};

/// Host content bound to a mounted element or text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mounted {
    pub(crate) node: HostNode,
    pub(crate) point: InsertionPoint,
}

/// A node of a virtual tree.
pub enum VNode {
    Element(ElementNode),
    Text(TextNode),
    Component(ComponentNode),
}

impl VNode {
    /// The insertion point this node is bound to, once mounted.
    pub fn point(&self) -> Option<InsertionPoint> {
        match self {
            VNode::Element(el) => el.point(),
            VNode::Text(text) => text.point(),
            VNode::Component(component) => component.point(),
        }
    }

    /// Child descriptions: element children, or the children a component
    /// was created with. Text nodes have none.
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element(el) => &el.children,
            VNode::Text(_) => &[],
            VNode::Component(component) => component.children(),
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            VNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            VNode::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentNode> {
        match self {
            VNode::Component(component) => Some(component),
            _ => None,
        }
    }

    /// An unmounted copy of this description.
    ///
    /// Components are re-created from their factory with the same props and
    /// children, so the copy starts from its initial state.
    pub fn fresh_copy(&self) -> VNode {
        match self {
            VNode::Element(el) => {
                let mut copy = ElementNode::new(el.tag.clone());
                copy.attributes = el.attributes.clone();
                copy.children = el.children.iter().map(VNode::fresh_copy).collect();
                VNode::Element(copy)
            }
            VNode::Text(text) => VNode::Text(TextNode::new(text.content.clone())),
            VNode::Component(component) => VNode::Component(component.fresh_copy()),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Element(el) => el.fmt(f),
            VNode::Text(text) => text.fmt(f),
            VNode::Component(component) => component.fmt(f),
        }
    }
}

impl From<ElementNode> for VNode {
    fn from(el: ElementNode) -> Self {
        VNode::Element(el)
    }
}

impl From<TextNode> for VNode {
    fn from(text: TextNode) -> Self {
        VNode::Text(text)
    }
}

impl From<ComponentNode> for VNode {
    fn from(component: ComponentNode) -> Self {
        VNode::Component(component)
    }
}

/// A host element description.
pub struct ElementNode {
    pub(crate) tag: String,
    pub(crate) attributes: Attributes,
    pub(crate) children: Vec<VNode>,
    pub(crate) mounted: Option<Mounted>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        ElementNode {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
            mounted: None,
        }
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.set(name, value);
    }

    pub fn append_child(&mut self, child: VNode) {
        self.children.push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn children(&self) -> &[VNode] {
        &self.children
    }

    /// The host element created for this node, once mounted.
    pub fn host_node(&self) -> Option<HostNode> {
        self.mounted.map(|m| m.node)
    }

    pub fn point(&self) -> Option<InsertionPoint> {
        self.mounted.map(|m| m.point)
    }
}

impl fmt::Debug for ElementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("attributes", &self.attributes)
            .field("children", &self.children)
            .field("mounted", &self.mounted)
            .finish()
    }
}

/// A text description.
pub struct TextNode {
    pub(crate) content: String,
    pub(crate) mounted: Option<Mounted>,
}

impl TextNode {
    pub fn new(content: impl Into<String>) -> Self {
        TextNode {
            content: content.into(),
            mounted: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn host_node(&self) -> Option<HostNode> {
        self.mounted.map(|m| m.node)
    }

    pub fn point(&self) -> Option<InsertionPoint> {
        self.mounted.map(|m| m.point)
    }
}

impl fmt::Debug for TextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Text").field(&self.content).finish()
    }
}
