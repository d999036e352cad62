//! Virtual Nodes
//!
//! A [`VNode`] describes one rendered element or text node. Components build
//! a fresh tree on every render; nothing mutates a tree once it is built.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::runtime::HandlerId;

/// Tag reported by text nodes.
pub const TEXT_TAG: &str = "#text";

/// Prefix of the attribute that carries an event handler id to the client.
pub const EVENT_ATTR_PREFIX: &str = "data-on-";

/// An attribute value.
///
/// Floats compare by bit pattern, so every value equals itself and a tree
/// always diffs empty against its own clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl PropValue {
    /// The attribute text, or `None` when the attribute is omitted (`false`).
    ///
    /// `true` renders as a bare attribute, which is reported as an empty
    /// string here.
    pub fn attr_text(&self) -> Option<Cow<'_, str>> {
        match self {
            PropValue::Bool(false) => None,
            PropValue::Bool(true) => Some(Cow::Borrowed("")),
            PropValue::Int(v) => Some(Cow::Owned(v.to_string())),
            PropValue::Float(v) => Some(Cow::Owned(v.to_string())),
            PropValue::Str(s) => Some(Cow::Borrowed(s)),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v.into())
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        PropValue::Int(v.into())
    }
}

/// Non-finite floats have no JSON form; they are kept as their attribute
/// text instead.
impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            PropValue::Float(v)
        } else if v.is_nan() {
            PropValue::Str("NaN".to_string())
        } else if v > 0.0 {
            PropValue::Str("Infinity".to_string())
        } else {
            PropValue::Str("-Infinity".to_string())
        }
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

/// Attribute map of an element.
///
/// Equality ignores insertion order; rendering follows it.
pub type Props = IndexMap<String, PropValue>;

/// One node of a virtual DOM tree.
///
/// # Example
///
/// ```rust
/// use strata_core::vdom::VNode;
///
/// let node = VNode::element("ul")
///     .prop("class", "items")
///     .child(VNode::element("li").child(VNode::text("one")))
///     .child(VNode::element("li").child(VNode::text("two")));
///
/// assert_eq!(
///     node.render_html(),
///     r#"<ul class="items"><li>one</li><li>two</li></ul>"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VNode {
    tag: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    props: Props,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<VNode>,

    /// Content of a text node. `Some` exactly when this is a text node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Identity hint. Nodes at the same position with different keys are
    /// replaced rather than patched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

impl VNode {
    /// Create an element node with no attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
            text: None,
            key: None,
        }
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tag: TEXT_TAG.to_string(),
            props: Props::new(),
            children: Vec::new(),
            text: Some(content.into()),
            key: None,
        }
    }

    /// Create an element from its parts.
    pub fn new(tag: impl Into<String>, props: Props, children: Vec<VNode>) -> Self {
        Self {
            tag: tag.into(),
            props,
            children,
            text: None,
            key: None,
        }
    }

    /// Set an attribute. Ignored on text nodes.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        if !self.is_text() {
            self.props.insert(name.into(), value.into());
        }
        self
    }

    /// Set several attributes. Ignored on text nodes.
    pub fn props<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropValue>,
    {
        if !self.is_text() {
            self.props
                .extend(props.into_iter().map(|(k, v)| (k.into(), v.into())));
        }
        self
    }

    /// Append a child. Ignored on text nodes.
    pub fn child(mut self, child: VNode) -> Self {
        if !self.is_text() {
            self.children.push(child);
        }
        self
    }

    /// Append several children. Ignored on text nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        if !self.is_text() {
            self.children.extend(children);
        }
        self
    }

    /// Attach an identity hint.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Bind a registered handler to a client event, e.g. `on("click", &id)`.
    ///
    /// The handler id travels to the client as a `data-on-<event>` attribute.
    pub fn on(self, event: &str, handler: &HandlerId) -> Self {
        self.prop(format!("{}{}", EVENT_ATTR_PREFIX, event), handler.as_str())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// Text content, for text nodes.
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attributes(&self) -> &Props {
        &self.props
    }

    pub fn get_prop(&self, name: &str) -> Option<&PropValue> {
        self.props.get(name)
    }

    pub fn child_nodes(&self) -> &[VNode] {
        &self.children
    }

    pub fn key_hint(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Whether `other` occupies the same identity: same kind, tag, key, and
    /// for text nodes the same content.
    ///
    /// Nodes with the same identity are patched in place; otherwise replaced.
    pub fn same_identity(&self, other: &VNode) -> bool {
        self.tag == other.tag && self.text == other.text && self.key == other.key
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(VNode::node_count).sum::<usize>()
    }

    pub(crate) fn props_mut(&mut self) -> &mut Props {
        &mut self.props
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<VNode> {
        &mut self.children
    }
}
