//! Stepwise debugging of workflows
//!
//! - `engine`: the interpreter, a pure step function over [`ExecutionState`]
//! - `nodes`: one evaluation handler per node kind
//! - `expression`: literal, variable and truthiness rules
//! - `debugger`: run lifecycle (start, stop, resume, step) and events
//! - `driver`: tokio pacing of scheduled ticks

mod debugger;
mod driver;
mod engine;
pub mod expression;
pub mod nodes;
mod state;

pub use debugger::{Debugger, Scheduled};
pub use driver::{run_scheduled, spawn_scheduler, SharedSession, WorkflowSession};
pub use engine::{
    Clock, Continuation, Evaluation, ExecutionEngine, FixedClock, StepMode, SystemClock,
    TickOutcome,
};
pub use nodes::{evaluate_node, NodeOutcome};
pub use state::{ExecutionState, ExecutionStatus};
