//! Suggesting what to insert on an edge
//!
//! When a user adds a step on an existing connection, the editor asks a
//! suggestion service (typically a language model) which node kind fits
//! between the two endpoints. Whatever comes back is untrusted text: it is
//! only ever used after [`resolve_suggestion`] maps it onto an insertable
//! kind, and any failure degrades to an action node.

use async_trait::async_trait;

use crate::graph::GraphModel;
use crate::types::{NodeId, NodeKind};
use crate::Result;

/// Kind used when a suggestion is missing, invalid or failed
pub const FALLBACK_KIND: NodeKind = NodeKind::Action;

/// Service that proposes a node kind for an edge
#[async_trait]
pub trait NodeSuggester: Send + Sync {
    /// Suggest a node kind to insert between `source` and `target`
    ///
    /// Returns the raw suggestion text.
    async fn suggest_node_between(&self, source: NodeKind, target: NodeKind) -> Result<String>;
}

/// Suggester that always answers with the same text
///
/// Used when no suggestion service is configured, and in tests.
#[derive(Debug, Clone)]
pub struct FixedSuggester {
    answer: String,
}

impl FixedSuggester {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

impl Default for FixedSuggester {
    fn default() -> Self {
        Self::new(FALLBACK_KIND.as_str())
    }
}

#[async_trait]
impl NodeSuggester for FixedSuggester {
    async fn suggest_node_between(&self, _source: NodeKind, _target: NodeKind) -> Result<String> {
        Ok(self.answer.clone())
    }
}

/// Map suggestion text onto an insertable node kind
///
/// Case and surrounding whitespace are ignored. `start` and `return` are
/// never inserted on an edge, so they fall back like unknown text.
pub fn resolve_suggestion(text: &str) -> NodeKind {
    let normalized = text.trim().to_lowercase();
    match normalized.parse::<NodeKind>() {
        Ok(kind) if NodeKind::INSERTABLE.contains(&kind) => kind,
        _ => {
            log::debug!("Ignoring suggestion '{}', using {}", text.trim(), FALLBACK_KIND);
            FALLBACK_KIND
        }
    }
}

/// Ask `suggester` for a node kind and insert it on the `source -> target` edge
///
/// Returns the new node's ID, or `None` when the workflow, either node or the
/// edge does not exist.
pub async fn insert_suggested_node(
    model: &mut GraphModel,
    suggester: &dyn NodeSuggester,
    workflow_id: &str,
    source_id: &str,
    target_id: &str,
    x: f64,
    y: f64,
) -> Option<NodeId> {
    let source = model.node(workflow_id, source_id)?.kind;
    let target = model.node(workflow_id, target_id)?.kind;

    let kind = match suggester.suggest_node_between(source, target).await {
        Ok(text) => resolve_suggestion(&text),
        Err(e) => {
            log::warn!("Node suggestion failed: {}", e);
            FALLBACK_KIND
        }
    };

    model.insert_node_between(workflow_id, source_id, target_id, kind, x, y)
}
