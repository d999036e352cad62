//! HTML Serialization
//!
//! Walks a tree and writes HTML. Text content and attribute values are
//! escaped; attributes whose value is `false` are omitted; `true` renders as
//! a bare attribute. Void elements (`<br>`, `<input>`, ...) have no closing
//! tag and never render children.

use std::fmt;

use super::node::VNode;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Attribute names that could break out of the tag are dropped.
fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

/// Escape `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    push_escaped(&mut out, input);
    out
}

fn push_escaped(out: &mut String, input: &str) {
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
}

impl VNode {
    /// Serialize this subtree to an HTML string.
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        if let Some(text) = self.text_content() {
            push_escaped(out, text);
            return;
        }

        out.push('<');
        out.push_str(self.tag());
        for (name, value) in self.attributes() {
            if !is_valid_attr_name(name) {
                tracing::warn!(attribute = %name, tag = %self.tag(), "dropping invalid attribute name");
                continue;
            }
            let Some(text) = value.attr_text() else {
                continue;
            };
            out.push(' ');
            out.push_str(name);
            if let super::PropValue::Bool(true) = value {
                continue;
            }
            out.push_str("=\"");
            push_escaped(out, &text);
            out.push('"');
        }
        out.push('>');

        if is_void(self.tag()) {
            return;
        }

        for child in self.child_nodes() {
            child.write_html(out);
        }

        out.push_str("</");
        out.push_str(self.tag());
        out.push('>');
    }
}

impl fmt::Display for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_html())
    }
}
