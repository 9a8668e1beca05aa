//! Event types for observing a debugging session
//!
//! The debugger reports lifecycle changes through an `EventSink` so that a
//! canvas can highlight the current node without polling the state.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::types::NodeId;

/// Trait for receiving execution events
///
/// This abstracts over the transport (UI channel, mpsc, test buffer).
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by the debugger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionEvent {
    /// A run started at the workflow's start node
    #[serde(rename_all = "camelCase")]
    Started {
        workflow_id: String,
        execution_id: String,
        node_id: NodeId,
    },

    /// A node was evaluated
    #[serde(rename_all = "camelCase")]
    NodeEvaluated {
        execution_id: String,
        node_id: NodeId,
        next_node_id: Option<NodeId>,
        message: String,
    },

    /// Execution paused on a breakpoint
    #[serde(rename_all = "camelCase")]
    BreakpointHit {
        execution_id: String,
        node_id: NodeId,
    },

    /// Execution paused after a single step
    #[serde(rename_all = "camelCase")]
    Paused {
        execution_id: String,
        node_id: Option<NodeId>,
    },

    /// The run reached the end of its path
    #[serde(rename_all = "camelCase")]
    Completed { execution_id: String },

    /// The run stopped because its current node could not be resolved
    #[serde(rename_all = "camelCase")]
    Halted {
        execution_id: String,
        reason: String,
    },

    /// The session was stopped and its state discarded
    #[serde(rename_all = "camelCase")]
    Stopped { execution_id: String },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: ExecutionEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::channel_closed())?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(ExecutionEvent::Completed {
            execution_id: "exec1".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ExecutionEvent::Completed { execution_id } if execution_id == "exec1"));

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = ExecutionEvent::BreakpointHit {
            execution_id: "exec1".to_string(),
            node_id: "n2".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "breakpointHit");
        assert_eq!(json["nodeId"], "n2");
    }
}
