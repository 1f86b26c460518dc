//! Span tree assembly from exported spans.
//!
//! Exporters receive spans flat, in end order. The builder nests each span
//! under its parent; spans whose parent is not part of the set become roots.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::span::{ExecutionSpan, SpanStatus};

#[derive(Debug, Default)]
pub struct SpanTreeBuilder {
    spans: Vec<ExecutionSpan>,
}

impl SpanTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, span: ExecutionSpan) {
        self.spans.push(span);
    }

    pub fn extend(&mut self, spans: impl IntoIterator<Item = ExecutionSpan>) {
        self.spans.extend(spans);
    }

    /// Assemble the forest. Roots and siblings are ordered by start time.
    pub fn finalize(self) -> Vec<ExecutionSpan> {
        let known: HashSet<Uuid> = self.spans.iter().map(|s| s.span_id).collect();

        let mut roots = Vec::new();
        let mut by_parent: HashMap<Uuid, Vec<ExecutionSpan>> = HashMap::new();
        for span in self.spans {
            match span.parent_span_id.filter(|p| known.contains(p)) {
                Some(parent) => by_parent.entry(parent).or_default().push(span),
                None => roots.push(span),
            }
        }

        let mut roots: Vec<ExecutionSpan> = roots
            .into_iter()
            .map(|root| attach(root, &mut by_parent))
            .collect();
        roots.sort_by_key(|s| s.started_at);
        roots
    }

    /// Assemble the forest and return the earliest root.
    ///
    /// A root whose subtree holds a failed span is marked failed itself.
    pub fn finalize_root(self) -> Option<ExecutionSpan> {
        let mut root = self.finalize().into_iter().next()?;
        if root.status != SpanStatus::Error && has_error(&root) {
            root.status = SpanStatus::Error;
            root.status_message = Some("One or more child spans failed".to_string());
        }
        Some(root)
    }
}

fn attach(mut span: ExecutionSpan, by_parent: &mut HashMap<Uuid, Vec<ExecutionSpan>>) -> ExecutionSpan {
    let mut children: Vec<ExecutionSpan> = by_parent
        .remove(&span.span_id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach(child, by_parent))
        .collect();
    children.sort_by_key(|s| s.started_at);
    span.children = children;
    span
}

fn has_error(span: &ExecutionSpan) -> bool {
    span.status == SpanStatus::Error || span.children.iter().any(has_error)
}
