//! Attribute maps for elements and props for components.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::host::HostNode;
use crate::value::Value;

/// An event delivered to a [`Handler`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Lower-cased event name, e.g. `click`
    pub name: String,
    /// Node the event was dispatched to
    pub target: HostNode,
}

/// A shared event callback.
///
/// Handlers are compared the way their serialized source would be: two
/// handlers are equal when they are the same allocation or when they were
/// built from the same closure expression (same closure type), whatever
/// they capture. Re-rendering a tree whose only change is a freshly built
/// handler therefore leaves the host untouched.
#[derive(Clone)]
pub struct Handler {
    origin: TypeId,
    callback: Rc<dyn Fn(&Event) -> Result<()>>,
}

impl Handler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        Handler {
            origin: TypeId::of::<F>(),
            callback: Rc::new(callback),
        }
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) -> Result<()> {
        (self.callback)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
            || self.origin == other.origin
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// The value of one attribute or prop.
#[derive(Debug, Clone)]
pub enum AttrValue {
    Value(Value),
    Handler(Handler),
}

impl AttrValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            AttrValue::Value(v) => Some(v),
            AttrValue::Handler(_) => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            AttrValue::Handler(h) => Some(h),
            AttrValue::Value(_) => None,
        }
    }
}

/// Composites compare by serialized form, scalars by value, handlers by
/// origin. A handler never equals a plain value.
impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Value(a), AttrValue::Value(b)) => {
                if a.is_composite() || b.is_composite() {
                    a.to_string() == b.to_string()
                } else {
                    a == b
                }
            }
            (AttrValue::Handler(a), AttrValue::Handler(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Into<Value>> From<T> for AttrValue {
    fn from(v: T) -> Self {
        AttrValue::Value(v.into())
    }
}

impl From<Handler> for AttrValue {
    fn from(h: Handler) -> Self {
        AttrValue::Handler(h)
    }
}

/// Attribute (or prop) mapping.
///
/// Iteration follows insertion order; equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: IndexMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Attributes::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name)
    }

    /// The plain value of an attribute, if it is not a handler.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(AttrValue::as_value)
    }

    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.get(name).and_then(AttrValue::as_handler)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(name, value)| other.entries.get(name) == Some(value))
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}
