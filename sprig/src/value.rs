//! Dynamic values carried by component state, props, and attributes.
//!
//! State is a loosely-typed tree that components change through
//! [`Value::merge`], a recursive partial update. The `Display` impl renders
//! the canonical serialized form (JSON syntax), which is also what composite
//! attribute values are compared by. String literals come from `facet_json`;
//! numbers are written the way a script runtime stringifies them, which is
//! why the layout around them is assembled here.

use indexmap::IndexMap;
use std::fmt::{self, Write};

/// A dynamically-typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent / null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Number (always a double, like a script runtime)
    Number(f64),
    /// String
    String(String),
    /// Ordered sequence
    Array(Vec<Value>),
    /// Mapping; keys keep insertion order
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an array from values.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Arrays and objects.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a key of an object. Anything else has no keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a path of object keys.
    pub fn pointer<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<&Value> {
        path.into_iter().try_fold(self, |current, key| current.get(key))
    }

    /// Truthiness as a script runtime sees it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Deep-merge `partial` into `self`.
    ///
    /// Every key of `partial` holding an array or object is merged
    /// recursively into a slot of the same kind, which is created (or
    /// replaces a slot of another kind) when needed. Scalars, `Null`
    /// included, overwrite. Keys of `self` that `partial` does not mention
    /// are left alone. A scalar `partial` has no keys and changes nothing.
    pub fn merge(&mut self, partial: &Value) {
        match partial {
            Value::Object(entries) => {
                if !matches!(self, Value::Object(_)) {
                    *self = Value::Object(IndexMap::new());
                }
                if let Value::Object(target) = self {
                    for (key, incoming) in entries {
                        merge_slot(target.entry(key.clone()).or_default(), incoming);
                    }
                }
            }
            Value::Array(items) => {
                if !matches!(self, Value::Array(_)) {
                    *self = Value::Array(Vec::new());
                }
                if let Value::Array(target) = self {
                    for (index, incoming) in items.iter().enumerate() {
                        if index >= target.len() {
                            target.push(Value::Null);
                        }
                        merge_slot(&mut target[index], incoming);
                    }
                }
            }
            _ => {}
        }
    }

    /// The string a host attribute or text node receives for this value.
    pub fn to_host_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_string(),
        }
    }
}

fn merge_slot(slot: &mut Value, incoming: &Value) {
    if incoming.is_composite() {
        slot.merge(incoming);
    } else {
        *slot = incoming.clone();
    }
}

/// Format a number the way a script runtime stringifies it: integral values
/// drop the fraction, non-finite values are spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// Structural equality. Numbers compare by value, except that NaN equals
/// NaN, matching the serialized form both render to.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.is_finite() => f.write_str(&format_number(*n)),
            Value::Number(_) => f.write_str("null"),
            Value::String(s) => f.write_str(&string_literal(s)?),
            Value::Array(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Value::Object(map) => {
                f.write_char('{')?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    f.write_str(&string_literal(key)?)?;
                    write!(f, ":{value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

/// A JSON string literal, quoted and escaped by `facet_json`.
fn string_literal(s: &str) -> Result<String, fmt::Error> {
    facet_json::to_string(&s).map_err(|_| fmt::Error)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}
