//! Caller extension points.
//!
//! Two orthogonal hooks shape the tree:
//! - [`Actions`] run at construction time for `%action` tags and may replace
//!   the node built for a match.
//! - [`Extensions`] decorate an already-built node after the fact, keyed by
//!   `<Type>` tag (or rule name for untyped rules), without changing its
//!   structure.

use crate::error::ActionError;
use crate::node::NodeRef;
use std::collections::HashMap;
use std::fmt;

// ──────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────

/// Construction-time callbacks for `%action` tags.
pub trait Actions {
    /// Called with the matched text, its start offset and the node's
    /// positional children. `Ok(None)` keeps the default node; `Ok(Some(n))`
    /// replaces it with `n`, whatever value `n` carries; `Err` aborts the
    /// whole parse.
    fn apply(
        &mut self,
        action: &str,
        text: &str,
        offset: usize,
        elements: &[NodeRef],
    ) -> Result<Option<NodeRef>, ActionError>;
}

/// Supplies no actions: every tagged match keeps its default node.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActions;

impl Actions for NoActions {
    fn apply(
        &mut self,
        _action: &str,
        _text: &str,
        _offset: usize,
        _elements: &[NodeRef],
    ) -> Result<Option<NodeRef>, ActionError> {
        Ok(None)
    }
}

/// A single closure can serve every action by dispatching on the name.
impl<F> Actions for F
where
    F: FnMut(&str, &str, usize, &[NodeRef]) -> Result<Option<NodeRef>, ActionError>,
{
    fn apply(
        &mut self,
        action: &str,
        text: &str,
        offset: usize,
        elements: &[NodeRef],
    ) -> Result<Option<NodeRef>, ActionError> {
        self(action, text, offset, elements)
    }
}

type ActionFn<'a> =
    Box<dyn FnMut(&str, usize, &[NodeRef]) -> Result<Option<NodeRef>, ActionError> + 'a>;

/// Name → closure registry. Actions with no registered closure keep the
/// default node.
#[derive(Default)]
pub struct ActionTable<'a> {
    actions: HashMap<String, ActionFn<'a>>,
}

impl<'a> ActionTable<'a> {
    pub fn new() -> Self {
        ActionTable {
            actions: HashMap::new(),
        }
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: FnMut(&str, usize, &[NodeRef]) -> Result<Option<NodeRef>, ActionError> + 'a,
    {
        self.actions.insert(name.into(), Box::new(action));
    }

    pub fn with<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&str, usize, &[NodeRef]) -> Result<Option<NodeRef>, ActionError> + 'a,
    {
        self.insert(name, action);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }
}

impl Actions for ActionTable<'_> {
    fn apply(
        &mut self,
        action: &str,
        text: &str,
        offset: usize,
        elements: &[NodeRef],
    ) -> Result<Option<NodeRef>, ActionError> {
        match self.actions.get_mut(action) {
            Some(f) => f(text, offset, elements),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for ActionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ActionTable").field("actions", &names).finish()
    }
}

// ──────────────────────────────────────────────
// Extensions
// ──────────────────────────────────────────────

type Decorator = Box<dyn Fn(NodeRef) -> NodeRef>;

/// Name → decorator registry applied to finished nodes.
#[derive(Default)]
pub struct Extensions {
    decorators: HashMap<String, Decorator>,
}

impl Extensions {
    pub fn new() -> Self {
        Extensions {
            decorators: HashMap::new(),
        }
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, decorator: F)
    where
        F: Fn(NodeRef) -> NodeRef + 'static,
    {
        self.decorators.insert(name.into(), Box::new(decorator));
    }

    pub fn with<F>(mut self, name: impl Into<String>, decorator: F) -> Self
    where
        F: Fn(NodeRef) -> NodeRef + 'static,
    {
        self.insert(name, decorator);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Run the decorator registered under `name`, if any.
    pub fn decorate(&self, name: &str, node: NodeRef) -> NodeRef {
        match self.decorators.get(name) {
            Some(decorator) => decorator(node),
            None => node,
        }
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.decorators.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Extensions").field("decorators", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ValueNode;
    use serde_json::json;

    #[test]
    fn unregistered_action_keeps_default_node() {
        let mut table = ActionTable::new();
        assert!(table.apply("missing", "x", 0, &[]).unwrap().is_none());
    }

    #[test]
    fn table_dispatches_by_name() {
        let mut calls = 0;
        {
            let mut table = ActionTable::new().with("count", |text: &str, offset, _: &[NodeRef]| {
                calls += 1;
                Ok(Some(ValueNode::new(json!(text.len()), text, offset).into_ref()))
            });
            assert!(table.contains("count"));
            let node = table.apply("count", "abc", 4, &[]).unwrap().unwrap();
            assert_eq!(node.value(), Some(&json!(3)));
            assert_eq!(node.offset(), 4);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn closure_serves_as_action_set() {
        let mut actions = |name: &str, _: &str, _: usize, _: &[NodeRef]| {
            Err::<Option<NodeRef>, _>(ActionError::new(name, "rejected"))
        };
        let err = actions.apply("boom", "", 0, &[]).unwrap_err();
        assert_eq!(err.action, "boom");
    }

    #[test]
    fn decorator_wraps_only_its_name() {
        let extensions = Extensions::new().with("Num", |node: NodeRef| {
            ValueNode::new(json!("wrapped"), node.text(), node.offset()).into_ref()
        });
        let plain = ValueNode::new(json!(1), "1", 0).into_ref();
        let untouched = extensions.decorate("Other", plain.clone());
        assert_eq!(untouched.value(), Some(&json!(1)));
        let wrapped = extensions.decorate("Num", plain);
        assert_eq!(wrapped.value(), Some(&json!("wrapped")));
    }
}
