//! Workflow Engine - graph model and stepwise debugger for visual workflows
//!
//! A workflow is a directed graph of typed steps (start, assign, if, switch,
//! foreach, action, return) drawn on a canvas. This crate provides:
//!
//! - `GraphModel`: the only way to mutate workflows, keeping edges consistent
//! - `topology`: downstream search and insert-between-with-relayout
//! - `execution`: a single-threaded interpreter that walks the graph one node
//!   per tick, with breakpoints, stepping and a bounded log
//! - `UndoStack`: compressed snapshots for per-workflow undo/redo
//! - `validate_workflow`: on-demand structural checks
//! - `NodeSuggester`: hook for a service proposing what to insert on an edge
//!
//! # Example
//!
//! ```ignore
//! use workflow_engine::{Debugger, GraphModel, NodeKind, Port, WorkflowScope};
//!
//! let mut model = GraphModel::new();
//! let wf = model.create_workflow("Checkout", WorkflowScope::Server);
//! let start = model.nodes(&wf)[0].id.clone();
//! let ret = model.add_node(&wf, NodeKind::Return, 300.0, 100.0).unwrap();
//! model.connect_nodes(&wf, &start, &ret, Port::Right);
//!
//! let mut debugger = Debugger::default();
//! debugger.start_execution(&model, &wf);
//! debugger.run_until_settled(&model, 100);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod execution;
pub mod graph;
pub mod suggest;
pub mod topology;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use config::{EngineConfig, ExecutionConfig, HistoryConfig, LayoutConfig};
pub use error::{Result, WorkflowError};
pub use events::{EventSink, ExecutionEvent, NullEventSink, VecEventSink};
pub use execution::{
    run_scheduled, spawn_scheduler, Debugger, ExecutionEngine, ExecutionState, ExecutionStatus,
    SharedSession, StepMode, WorkflowSession,
};
pub use graph::{GraphModel, Selection};
pub use suggest::{insert_suggested_node, resolve_suggestion, FixedSuggester, NodeSuggester};
pub use types::{
    NodeConfig, NodeId, NodeKind, NodeParameter, NodeUpdate, ParameterId, ParameterList,
    ParameterType, ParameterUpdate, Port, Workflow, WorkflowId, WorkflowNode, WorkflowScope,
    WorkflowUpdate,
};
pub use undo::UndoStack;
pub use validation::{validate_workflow, ValidationError};
