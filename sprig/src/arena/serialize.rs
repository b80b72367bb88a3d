//! HTML rendering of arena subtrees.
//!
//! Output follows the HTML5 serialization rules that matter for inspecting
//! a rendered UI: void elements get no end tag, text and attribute values
//! are escaped, and attribute values are always double-quoted.

use std::fmt::Write;

use indextree::{Arena, NodeId};

use super::{HostData, HostKind};

/// Options for serializing an arena subtree.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Whether to pretty-print with indentation (default: false)
    pub pretty: bool,
    /// Indentation string for pretty-printing (default: "  ")
    pub indent: String,
    /// Whether to sort attributes alphabetically (default: false, which
    /// keeps the order they were first set in)
    pub sort_attributes: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
            sort_attributes: false,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty-printing with default indentation.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Set a custom indentation string (implies pretty-printing).
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self.pretty = true;
        self
    }

    pub fn sort_attributes(mut self) -> Self {
        self.sort_attributes = true;
        self
    }
}

/// HTML5 void elements - these never have end tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub(crate) fn serialize_node(arena: &Arena<HostData>, id: NodeId, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    Serializer::new(&mut out, arena, opts).write_node(id);
    out
}

pub(crate) fn serialize_children(
    arena: &Arena<HostData>,
    id: NodeId,
    opts: &SerializeOptions,
) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(&mut out, arena, opts);
    for child in id.children(arena) {
        ser.write_node(child);
    }
    out
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    arena: &'a Arena<HostData>,
    options: &'a SerializeOptions,
    depth: usize,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, arena: &'a Arena<HostData>, options: &'a SerializeOptions) -> Self {
        Self {
            out,
            arena,
            options,
            depth: 0,
        }
    }

    fn write_indent(&mut self) {
        if self.options.pretty {
            for _ in 0..self.depth {
                let _ = write!(self.out, "{}", self.options.indent);
            }
        }
    }

    fn write_newline(&mut self) {
        if self.options.pretty {
            let _ = writeln!(self.out);
        }
    }

    fn write_escaped(&mut self, text: &str, in_attribute: bool) {
        for c in text.chars() {
            let _ = match c {
                '&' => write!(self.out, "&amp;"),
                '<' => write!(self.out, "&lt;"),
                '>' => write!(self.out, "&gt;"),
                '"' if in_attribute => write!(self.out, "&quot;"),
                _ => write!(self.out, "{}", c),
            };
        }
    }

    fn write_attr(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {}=\"", name);
        self.write_escaped(value, true);
        let _ = write!(self.out, "\"");
    }

    fn write_node(&mut self, id: NodeId) {
        match &self.arena[id].get().kind {
            HostKind::Text(text) => {
                self.write_indent();
                self.write_escaped(text, false);
                if self.options.pretty && !text.is_empty() {
                    self.write_newline();
                }
            }
            HostKind::Element { tag, attrs, .. } => {
                self.write_indent();
                let _ = write!(self.out, "<{}", tag);
                if self.options.sort_attributes {
                    let mut sorted: Vec<_> = attrs.iter().collect();
                    sorted.sort_by_key(|(k, _)| *k);
                    for (name, value) in sorted {
                        self.write_attr(name, value);
                    }
                } else {
                    for (name, value) in attrs {
                        self.write_attr(name, value);
                    }
                }
                let _ = write!(self.out, ">");

                if is_void_element(tag) {
                    self.write_newline();
                    return;
                }

                let all_text = id
                    .children(self.arena)
                    .all(|c| matches!(self.arena[c].get().kind, HostKind::Text(_)));
                if all_text {
                    for child in id.children(self.arena) {
                        if let HostKind::Text(text) = &self.arena[child].get().kind {
                            self.write_escaped(text, false);
                        }
                    }
                } else {
                    self.write_newline();
                    self.depth += 1;
                    for child in id.children(self.arena) {
                        self.write_node(child);
                    }
                    self.depth -= 1;
                    self.write_indent();
                }
                let _ = write!(self.out, "</{}>", tag);
                self.write_newline();
            }
        }
    }
}
