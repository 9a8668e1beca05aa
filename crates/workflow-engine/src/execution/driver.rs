//! Async pacing for debugging runs
//!
//! A `WorkflowSession` pairs the graph model with its debugger so editor
//! calls and ticks go through one lock. `run_scheduled` waits out each
//! configured delay without holding the lock, then takes it just long
//! enough to run the pending step.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::debugger::Debugger;
use super::state::ExecutionState;
use crate::config::EngineConfig;
use crate::graph::GraphModel;

/// Graph model plus the debugging session running on it
#[derive(Debug, Default)]
pub struct WorkflowSession {
    pub model: GraphModel,
    pub debugger: Debugger,
}

/// A session shared between the editor and the driver task
pub type SharedSession = Arc<RwLock<WorkflowSession>>;

impl WorkflowSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            model: GraphModel::with_config(config),
            debugger: Debugger::new(config.execution.clone()),
        }
    }

    /// Wrap the session for use with [`run_scheduled`]
    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn execution(&self) -> &ExecutionState {
        self.debugger.state()
    }

    pub fn start_execution(&mut self, workflow_id: &str) -> bool {
        self.debugger.start_execution(&self.model, workflow_id)
    }

    pub fn stop_execution(&mut self) {
        self.debugger.stop_execution();
    }

    pub fn resume_execution(&mut self) -> bool {
        self.debugger.resume_execution()
    }

    pub fn step_execution(&mut self, workflow_id: &str) -> bool {
        self.debugger.step_execution(&self.model, workflow_id)
    }

    /// Flip the breakpoint flag of a node; returns the new flag
    pub fn toggle_breakpoint(&mut self, workflow_id: &str, node_id: &str) -> Option<bool> {
        self.model.toggle_breakpoint(workflow_id, node_id)
    }

    fn run_pending(&mut self) -> bool {
        let Self { model, debugger } = self;
        debugger.run_pending(model)
    }
}

/// Drive the session's pending steps until nothing is scheduled
///
/// Each step waits for its configured delay first. Control calls made while
/// the driver sleeps take effect when it wakes: a stop ends the loop, a step
/// replaces the pending tick. Run one driver per session. Returns the number
/// of steps executed.
pub async fn run_scheduled(session: &SharedSession) -> usize {
    let mut steps = 0;
    loop {
        let Some(delay) = session.read().await.debugger.next_delay() else {
            break;
        };
        tokio::time::sleep(delay).await;

        if session.write().await.run_pending() {
            steps += 1;
        }
    }
    log::debug!("Driver idle after {} steps", steps);
    steps
}

/// Spawn [`run_scheduled`] on the current tokio runtime
pub fn spawn_scheduler(session: SharedSession) -> JoinHandle<usize> {
    tokio::spawn(async move { run_scheduled(&session).await })
}
