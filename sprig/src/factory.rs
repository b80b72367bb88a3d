//! Building virtual trees.
//!
//! [`create_element`] is the target of compiled templates: a node type, an
//! attribute map, and any mix of children. Children may be nested lists of
//! arbitrary depth, nodes, strings, numbers, or nothing at all; the factory
//! flattens them and turns everything that is not a node into text.
//!
//! ```rust
//! use sprig::{Attributes, children, create_element};
//!
//! let button = create_element(
//!     "button",
//!     Attributes::new().with("className", "square"),
//!     children!["Turn ", 1, None::<&str>],
//! )
//! .unwrap();
//! assert_eq!(button.children().len(), 3);
//! ```

use std::borrow::Cow;

use crate::attrs::Attributes;
use crate::component::{Component, ComponentFactory};
use crate::value::{Value, format_number};
use crate::vnode::{ElementNode, TextNode, VNode};

/// What kind of node to build.
#[derive(Debug, Clone)]
pub enum NodeType {
    /// A host element with this tag name
    Tag(Cow<'static, str>),
    /// An instance of a component type
    Component(ComponentFactory),
}

impl NodeType {
    pub fn tag(name: impl Into<Cow<'static, str>>) -> Self {
        NodeType::Tag(name.into())
    }

    pub fn component<C: Component + Default>() -> Self {
        NodeType::Component(ComponentFactory::of::<C>())
    }
}

impl From<&'static str> for NodeType {
    fn from(name: &'static str) -> Self {
        NodeType::Tag(Cow::Borrowed(name))
    }
}

impl From<String> for NodeType {
    fn from(name: String) -> Self {
        NodeType::Tag(Cow::Owned(name))
    }
}

impl From<ComponentFactory> for NodeType {
    fn from(factory: ComponentFactory) -> Self {
        NodeType::Component(factory)
    }
}

/// One child argument of [`create_element`].
#[derive(Debug)]
pub enum Child {
    Node(VNode),
    /// Nested children, flattened in order
    List(Vec<Child>),
    Text(String),
    /// `null`-like; becomes an empty text node
    Empty,
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.to_string())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s)
    }
}

impl From<&String> for Child {
    fn from(s: &String) -> Self {
        Child::Text(s.clone())
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Text(b.to_string())
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Child::Text(format_number(n))
    }
}

impl From<f32> for Child {
    fn from(n: f32) -> Self {
        Child::Text(format_number(f64::from(n)))
    }
}

macro_rules! impl_child_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Child {
                fn from(n: $t) -> Self {
                    Child::Text(n.to_string())
                }
            }
        )*
    };
}

impl_child_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

/// `Null` is empty, strings are used verbatim, anything else is its host
/// string form.
impl From<Value> for Child {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Child::Empty,
            Value::String(s) => Child::Text(s),
            other => Child::Text(other.to_host_string()),
        }
    }
}

impl From<&Value> for Child {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Child::Empty,
            other => Child::Text(other.to_host_string()),
        }
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(v: Option<T>) -> Self {
        v.map_or(Child::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build a `Vec<Child>` from heterogeneous expressions.
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<$crate::Child>::new()
    };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),+]
    };
}

/// Build an unmounted virtual node.
///
/// Returns `None`, without raising anything, for a tag name that cannot
/// name an element: empty, or containing characters other than ASCII
/// letters, digits, `-`, `_`, `:` and `.`.
pub fn create_element(
    ty: impl Into<NodeType>,
    attributes: Attributes,
    children: impl IntoIterator<Item = Child>,
) -> Option<VNode> {
    let mut flat = Vec::new();
    for child in children {
        flatten_into(child, &mut flat);
    }

    match ty.into() {
        NodeType::Tag(tag) => {
            if !is_valid_tag(&tag) {
                debug!("ignoring element with invalid tag {:?}", tag);
                return None;
            }
            let mut element = ElementNode::new(tag.into_owned());
            for (name, value) in attributes.iter() {
                element.set_attribute(name, value.clone());
            }
            for child in flat {
                element.append_child(child);
            }
            Some(VNode::Element(element))
        }
        NodeType::Component(factory) => {
            Some(VNode::Component(factory.instantiate(attributes, flat)))
        }
    }
}

fn flatten_into(child: Child, out: &mut Vec<VNode>) {
    match child {
        Child::Node(node) => out.push(node),
        Child::List(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Child::Text(text) => out.push(VNode::Text(TextNode::new(text))),
        Child::Empty => out.push(VNode::Text(TextNode::new(""))),
    }
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}
