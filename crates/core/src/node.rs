//! Parse-tree nodes.
//!
//! Every node, whether built by the engine, returned by an action or
//! wrapped by an extension, implements [`TreeNode`]. Trees are shared
//! through [`NodeRef`] (`Rc<dyn TreeNode>`): memoized results are handed
//! out again on cache hits without copying.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

pub type NodeRef = Rc<dyn TreeNode>;

/// The capability set every node provides.
pub trait TreeNode: fmt::Debug + 'static {
    /// The matched input.
    fn text(&self) -> &str;

    /// Character offset of the match start.
    fn offset(&self) -> usize;

    /// Positional children, after muting.
    fn children(&self) -> &[NodeRef];

    /// Child exposed under `label`, explicitly or by rule name.
    fn field(&self, _label: &str) -> Option<&NodeRef> {
        None
    }

    /// The `<Type>` tag this node was built for.
    fn node_type(&self) -> Option<&str> {
        None
    }

    /// The value carried by an action result.
    fn value(&self) -> Option<&serde_json::Value> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn TreeNode {
    /// Recover the concrete node type, e.g. an extension wrapper.
    pub fn downcast_ref<T: TreeNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

// ──────────────────────────────────────────────
// Default node
// ──────────────────────────────────────────────

/// The node the builder produces when no action replaces it.
#[derive(Clone)]
pub struct Node {
    input: Rc<str>,
    span: Range<usize>,
    offset: usize,
    children: Vec<NodeRef>,
    fields: Vec<(String, NodeRef)>,
    node_type: Option<String>,
}

impl Node {
    /// `span` is a byte range into `input`; `offset` the matching character
    /// offset.
    pub fn new(input: Rc<str>, span: Range<usize>, offset: usize) -> Self {
        Node {
            input,
            span,
            offset,
            children: Vec::new(),
            fields: Vec::new(),
            node_type: None,
        }
    }

    pub fn with_children(mut self, children: Vec<NodeRef>) -> Self {
        self.children = children;
        self
    }

    /// Expose `node` under `label`. The first binding of a label wins.
    pub fn add_field(&mut self, label: impl Into<String>, node: NodeRef) {
        let label = label.into();
        if !self.fields.iter().any(|(l, _)| *l == label) {
            self.fields.push((label, node));
        }
    }

    pub fn set_type(&mut self, node_type: impl Into<String>) {
        self.node_type = Some(node_type.into());
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(l, _)| l.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    pub fn into_ref(self) -> NodeRef {
        Rc::new(self)
    }
}

impl TreeNode for Node {
    fn text(&self) -> &str {
        &self.input[self.span.clone()]
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn children(&self) -> &[NodeRef] {
        &self.children
    }

    fn field(&self, label: &str) -> Option<&NodeRef> {
        self.fields.iter().find(|(l, _)| l == label).map(|(_, n)| n)
    }

    fn node_type(&self) -> Option<&str> {
        self.node_type.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Node");
        d.field("text", &self.text()).field("offset", &self.offset);
        if let Some(t) = &self.node_type {
            d.field("type", t);
        }
        if !self.fields.is_empty() {
            d.field("labels", &self.labels().collect::<Vec<_>>());
        }
        d.field("children", &self.children).finish()
    }
}

// ──────────────────────────────────────────────
// Action results
// ──────────────────────────────────────────────

/// A node standing for a value computed by an action.
///
/// Falsy values (`0`, `false`, `""`, `null`, `[]`) are ordinary values here;
/// "no replacement" is expressed by the action returning `None` instead.
#[derive(Debug, Clone)]
pub struct ValueNode {
    value: serde_json::Value,
    text: String,
    offset: usize,
    children: Vec<NodeRef>,
}

impl ValueNode {
    pub fn new(value: serde_json::Value, text: impl Into<String>, offset: usize) -> Self {
        ValueNode {
            value,
            text: text.into(),
            offset,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeRef>) -> Self {
        self.children = children;
        self
    }

    pub fn into_ref(self) -> NodeRef {
        Rc::new(self)
    }
}

impl TreeNode for ValueNode {
    fn text(&self) -> &str {
        &self.text
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn children(&self) -> &[NodeRef] {
        &self.children
    }

    fn value(&self) -> Option<&serde_json::Value> {
        Some(&self.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
