//! Node construction for the matcher.
//!
//! The default node for a match covers `input[start..cursor]`. Sequences
//! keep their unmuted parts as children and expose labelled parts as
//! fields; an unmuted bare reference is also exposed under the rule's name.
//! Tagged matches are then retyped (`<Type>`), offered to the action
//! (`%action`) and decorated by the extension registered for the type.

use crate::ast::{ParsingExpression, SequencePart};
use crate::error::MatchError;
use crate::matcher::{Matched, Session};
use crate::node::{Node, NodeRef};

impl Session<'_, '_> {
    /// A childless node for `start..end`.
    pub(crate) fn leaf(&self, start: usize, end: usize) -> NodeRef {
        Node::new(self.input.clone(), self.span(start, end), start).into_ref()
    }

    pub(crate) fn sequence_node(
        &self,
        start: usize,
        parts: &[SequencePart],
        elements: Vec<NodeRef>,
    ) -> NodeRef {
        let mut node = Node::new(self.input.clone(), self.span(start, self.cursor), start);
        let mut children = Vec::with_capacity(elements.len());
        for (part, element) in parts.iter().zip(elements) {
            if let Some(label) = &part.label {
                node.add_field(label.as_str(), element.clone());
            }
            if part.muted {
                continue;
            }
            if let ParsingExpression::Reference { rule } = &part.expression {
                node.add_field(rule.as_str(), element.clone());
            }
            children.push(element);
        }
        node.with_children(children).into_ref()
    }

    pub(crate) fn repeat_node(&self, start: usize, items: Vec<NodeRef>) -> NodeRef {
        Node::new(self.input.clone(), self.span(start, self.cursor), start)
            .with_children(items)
            .into_ref()
    }

    /// Apply an alternative's (or rule's) `%action` and `<Type>` tags to a
    /// match that started at `start` and ends at the cursor.
    pub(crate) fn apply_tags(
        &mut self,
        action: Option<&str>,
        node_type: Option<&str>,
        start: usize,
        matched: Matched,
    ) -> Result<Matched, MatchError> {
        if matched.placeholder || (action.is_none() && node_type.is_none()) {
            return Ok(matched);
        }

        let mut node = matched.node;
        if let Some(node_type) = node_type {
            node = retype(node, node_type);
        }
        if let Some(action) = action {
            tracing::trace!(action, offset = start, "running action");
            let end = self.cursor;
            let text = &self.input[self.span(start, end)];
            match self.actions.apply(action, text, start, node.children()) {
                Ok(Some(replacement)) => node = replacement,
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(action, offset = start, error = %e, "action failed");
                    return Err(MatchError::Action(e));
                }
            }
        }
        if let (Some(node_type), Some(extensions)) = (node_type, self.extensions) {
            node = extensions.decorate(node_type, node);
        }
        Ok(Matched::from_node(node))
    }

    /// Apply the rule's own tags, then the decorator registered under the
    /// rule name when the rule has no type tag.
    pub(crate) fn finish_rule(
        &mut self,
        index: usize,
        start: usize,
        matched: Matched,
    ) -> Result<NodeRef, MatchError> {
        let grammar = self.grammar;
        let rule = &grammar.rules()[index];
        let placeholder = matched.placeholder;
        let tagged = self.apply_tags(
            rule.action.as_deref(),
            rule.node_type.as_deref(),
            start,
            matched,
        )?;
        let mut node = tagged.node;
        if rule.node_type.is_none() && !placeholder {
            if let Some(extensions) = self.extensions {
                node = extensions.decorate(&rule.name, node);
            }
        }
        Ok(node)
    }
}

/// Give a default node a type tag. Nodes produced by actions or decorators
/// keep their own representation.
fn retype(node: NodeRef, node_type: &str) -> NodeRef {
    match node.downcast_ref::<Node>() {
        Some(default) => {
            let mut typed = default.clone();
            typed.set_type(node_type);
            typed.into_ref()
        }
        None => node,
    }
}
