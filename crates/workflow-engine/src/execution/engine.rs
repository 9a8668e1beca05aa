//! Stepwise interpreter for debugging runs
//!
//! `ExecutionEngine` holds no run state of its own. Each operation takes the
//! current `ExecutionState` (and the workflow snapshot as it is *now*) and
//! returns the next state plus what the scheduler should do. Reading the
//! workflow at every tick means edits made while paused take effect on the
//! next step.

use serde_json::Value;
use std::sync::Arc;

use super::nodes::evaluate_node;
use super::state::{ExecutionState, ExecutionStatus};
use crate::config::ExecutionConfig;
use crate::types::{NodeId, Workflow};

/// Source of the wall-clock prefix on log lines
pub trait Clock: Send + Sync {
    /// Current local time formatted as `HH:MM:SS`
    fn timestamp(&self) -> String;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// A clock that always reports the same time
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.clone()
    }
}

/// How far a tick is allowed to run on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Keep going until a breakpoint or the end of the path
    Continuous,
    /// Pause after this tick
    SingleStep,
}

/// What the scheduler should do after a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// The run was not running; nothing happened
    Skipped,
    /// Schedule another continuous tick
    Continue,
    /// Paused after a single step
    Paused,
    /// Paused before a breakpoint node
    Breakpoint(NodeId),
    /// The path ended; schedule the completion message
    Finishing,
    /// The current node could not be resolved; the run is idle
    Halted(String),
}

/// A node evaluated during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub node_id: NodeId,
    pub next_node_id: Option<NodeId>,
    pub message: String,
}

/// Result of a tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: ExecutionState,
    pub continuation: Continuation,
    pub evaluation: Option<Evaluation>,
}

/// The interpreter
#[derive(Clone)]
pub struct ExecutionEngine {
    config: ExecutionConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

impl ExecutionEngine {
    /// Create an engine using the local wall clock
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for log timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Begin a run at the workflow's start node
    ///
    /// Every input and local parameter starts out undefined. Returns `None`
    /// when the workflow has no start node; the caller keeps its previous
    /// state. The first start node wins when there are several.
    pub fn start(&self, workflow: &Workflow) -> Option<ExecutionState> {
        let start = workflow.find_start_node()?;
        let variables = workflow
            .inputs
            .iter()
            .chain(&workflow.locals)
            .map(|param| (param.name.clone(), Value::Null))
            .collect();
        let mut state = ExecutionState {
            status: ExecutionStatus::Running,
            current_node_id: Some(start.id.clone()),
            variables,
            logs: Vec::new(),
        };
        state.push_log(
            format!("Started workflow '{}'", workflow.name),
            self.config.log_capacity,
        );
        log::info!(
            "Starting workflow '{}' ({}) at node {}",
            workflow.name,
            workflow.id,
            start.id
        );
        Some(state)
    }

    /// Evaluate the current node and advance
    ///
    /// Only a running state is ticked. `workflow` is `None` when the run's
    /// workflow has been removed.
    pub fn tick(
        &self,
        workflow: Option<&Workflow>,
        mut state: ExecutionState,
        mode: StepMode,
    ) -> TickOutcome {
        if state.status != ExecutionStatus::Running {
            return TickOutcome {
                state,
                continuation: Continuation::Skipped,
                evaluation: None,
            };
        }

        let (workflow, current_id) = match (workflow, state.current_node_id.clone()) {
            (Some(workflow), Some(current_id)) => (workflow, current_id),
            _ => return self.halt(state, "Execution finished."),
        };

        let Some(node) = workflow.find_node(&current_id) else {
            return self.halt(state, &format!("Error: Node {} not found.", current_id));
        };

        let (next_node_id, message) = match evaluate_node(node, &state.variables) {
            Ok(outcome) => {
                if outcome.not_implemented {
                    log::warn!("{} node {} has no interpreter semantics", node.kind, node.id);
                }
                state.variables.extend(outcome.variable_updates);
                (outcome.next_node_id, outcome.message)
            }
            Err(e) => {
                log::warn!("Evaluating node {} failed: {}", node.id, e);
                (node.primary_connection().cloned(), format!("Error: {}", e))
            }
        };

        log::debug!("Evaluated node {} -> {:?}: {}", node.id, next_node_id, message);
        self.push_timestamped(&mut state, &message);
        state.current_node_id = next_node_id.clone();

        let evaluation = Some(Evaluation {
            node_id: node.id.clone(),
            next_node_id: next_node_id.clone(),
            message,
        });

        let breakpoint = next_node_id
            .as_deref()
            .and_then(|id| workflow.find_node(id))
            .filter(|next| next.is_breakpoint);

        let continuation = if let Some(next) = breakpoint {
            state.status = ExecutionStatus::Paused;
            state.push_log(
                format!("Breakpoint hit at {}", next.label),
                self.config.log_capacity,
            );
            log::info!("Breakpoint hit at node {}", next.id);
            Continuation::Breakpoint(next.id.clone())
        } else if mode == StepMode::SingleStep {
            state.status = ExecutionStatus::Paused;
            Continuation::Paused
        } else if next_node_id.is_some() {
            Continuation::Continue
        } else {
            Continuation::Finishing
        };

        TickOutcome {
            state,
            continuation,
            evaluation,
        }
    }

    /// Apply the completion step scheduled after the last tick
    ///
    /// A run that is no longer running (stopped, paused or restarted in the
    /// meantime) is returned unchanged.
    pub fn complete(&self, mut state: ExecutionState) -> ExecutionState {
        if state.status != ExecutionStatus::Running {
            log::debug!("Discarding completion for a {:?} run", state.status);
            return state;
        }
        state.push_log("Execution Completed.", self.config.log_capacity);
        state.status = ExecutionStatus::Paused;
        state.current_node_id = None;
        log::info!("Execution completed");
        state
    }

    fn halt(&self, mut state: ExecutionState, message: &str) -> TickOutcome {
        state.push_log(message, self.config.log_capacity);
        state.status = ExecutionStatus::Idle;
        state.current_node_id = None;
        log::info!("Execution halted: {}", message);
        TickOutcome {
            state,
            continuation: Continuation::Halted(message.to_string()),
            evaluation: None,
        }
    }

    fn push_timestamped(&self, state: &mut ExecutionState, message: &str) {
        let line = format!("[{}] {}", self.clock.timestamp(), message);
        state.push_log(line, self.config.log_capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::nodes::{EXPRESSION_KEY, TARGET_VAR_KEY};
    use crate::types::{NodeKind, NodeParameter, ParameterType, Port, WorkflowNode, WorkflowScope};
    use serde_json::json;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::default().with_clock(Arc::new(FixedClock("12:00:00".to_string())))
    }

    fn link(workflow: &mut Workflow, from: &str, to: &str) {
        if let Some(node) = workflow.find_node_mut(from) {
            node.push_connection(to, Port::Right);
        }
    }

    /// start -> assign(x := 5) -> return
    fn linear_workflow() -> Workflow {
        let mut workflow = Workflow::new("w1", "Linear", WorkflowScope::Server);
        workflow.nodes = vec![
            WorkflowNode::new("s", NodeKind::Start, 0.0, 0.0),
            WorkflowNode::new("a", NodeKind::Assign, 0.0, 0.0)
                .with_config(TARGET_VAR_KEY, "x")
                .with_config(EXPRESSION_KEY, "5"),
            WorkflowNode::new("r", NodeKind::Return, 0.0, 0.0),
        ];
        link(&mut workflow, "s", "a");
        link(&mut workflow, "a", "r");
        workflow
    }

    #[test]
    fn test_start() {
        let state = engine().start(&linear_workflow()).unwrap();

        assert_eq!(state.status, ExecutionStatus::Running);
        assert_eq!(state.current_node_id.as_deref(), Some("s"));
        assert!(state.variables.is_empty());
        assert_eq!(state.logs, vec!["Started workflow 'Linear'".to_string()]);
    }

    #[test]
    fn test_start_declares_parameters() {
        let mut workflow = linear_workflow();
        workflow.inputs = vec![NodeParameter::new("p1", "userId", ParameterType::String)];
        workflow.locals = vec![NodeParameter::new("p2", "count", ParameterType::Number)];
        workflow.outputs = vec![NodeParameter::new("p3", "result", ParameterType::Any)];

        let state = engine().start(&workflow).unwrap();
        assert_eq!(state.variables.len(), 2);
        assert_eq!(state.variables.get("userId"), Some(&Value::Null));
        assert_eq!(state.variables.get("count"), Some(&Value::Null));
        assert!(!state.variables.contains_key("result"));
    }

    #[test]
    fn test_start_without_start_node() {
        let workflow = Workflow::new("w1", "Empty", WorkflowScope::Client);
        assert!(engine().start(&workflow).is_none());
    }

    #[test]
    fn test_tick_through_linear_workflow() {
        let engine = engine();
        let workflow = linear_workflow();
        let mut state = engine.start(&workflow).unwrap();

        let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
        assert_eq!(outcome.continuation, Continuation::Continue);
        state = outcome.state;
        assert_eq!(state.current_node_id.as_deref(), Some("a"));
        assert_eq!(state.logs.last().unwrap(), "[12:00:00] Start");

        let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
        state = outcome.state;
        assert_eq!(state.variables.get("x"), Some(&json!(5)));
        assert_eq!(state.logs.last().unwrap(), "[12:00:00] Set x = 5");

        let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
        assert_eq!(outcome.continuation, Continuation::Finishing);
        state = outcome.state;
        assert!(state.current_node_id.is_none());
        assert_eq!(state.status, ExecutionStatus::Running);

        let state = engine.complete(state);
        assert_eq!(state.status, ExecutionStatus::Paused);
        assert_eq!(state.logs.last().unwrap(), "Execution Completed.");
    }

    #[test]
    fn test_tick_ignores_non_running_state() {
        let engine = engine();
        let workflow = linear_workflow();
        let mut state = engine.start(&workflow).unwrap();
        state.status = ExecutionStatus::Paused;

        let outcome = engine.tick(Some(&workflow), state.clone(), StepMode::Continuous);
        assert_eq!(outcome.continuation, Continuation::Skipped);
        assert_eq!(outcome.state, state);
    }

    #[test]
    fn test_single_step_pauses() {
        let engine = engine();
        let workflow = linear_workflow();
        let state = engine.start(&workflow).unwrap();

        let outcome = engine.tick(Some(&workflow), state, StepMode::SingleStep);
        assert_eq!(outcome.continuation, Continuation::Paused);
        assert_eq!(outcome.state.status, ExecutionStatus::Paused);
        assert_eq!(outcome.state.current_node_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_breakpoint_pauses_before_node() {
        let engine = engine();
        let mut workflow = linear_workflow();
        workflow.find_node_mut("a").unwrap().is_breakpoint = true;
        let state = engine.start(&workflow).unwrap();

        let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
        assert_eq!(outcome.continuation, Continuation::Breakpoint("a".to_string()));
        assert_eq!(outcome.state.status, ExecutionStatus::Paused);
        assert_eq!(outcome.state.current_node_id.as_deref(), Some("a"));
        assert_eq!(outcome.state.logs.last().unwrap(), "Breakpoint hit at Assign");
        // The breakpoint node itself has not been evaluated
        assert!(outcome.state.variables.is_empty());
    }

    #[test]
    fn test_missing_node_halts() {
        let engine = engine();
        let workflow = linear_workflow();
        let mut state = engine.start(&workflow).unwrap();
        state.current_node_id = Some("ghost".to_string());

        let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
        assert!(matches!(outcome.continuation, Continuation::Halted(_)));
        assert_eq!(outcome.state.status, ExecutionStatus::Idle);
        assert!(outcome.state.current_node_id.is_none());
        assert_eq!(
            outcome.state.logs.last().unwrap(),
            "Error: Node ghost not found."
        );
    }

    #[test]
    fn test_missing_workflow_halts() {
        let engine = engine();
        let state = engine.start(&linear_workflow()).unwrap();

        let outcome = engine.tick(None, state, StepMode::Continuous);
        assert_eq!(outcome.state.status, ExecutionStatus::Idle);
        assert_eq!(
            outcome.state.logs.last().unwrap(),
            "Execution finished."
        );
    }

    #[test]
    fn test_invalid_config_logs_error_and_advances() {
        let engine = engine();
        let mut workflow = linear_workflow();
        workflow
            .find_node_mut("a")
            .unwrap()
            .config
            .insert(EXPRESSION_KEY.to_string(), json!({"op": "+"}));
        let mut state = engine.start(&workflow).unwrap();
        state.current_node_id = Some("a".to_string());

        let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
        assert_eq!(outcome.continuation, Continuation::Continue);
        assert_eq!(outcome.state.current_node_id.as_deref(), Some("r"));
        assert!(outcome.state.logs.last().unwrap().starts_with("[12:00:00] Error: "));
        assert!(outcome.state.variables.is_empty());
    }

    #[test]
    fn test_numeric_config_assigns_number() {
        let engine = engine();
        let mut workflow = linear_workflow();
        workflow
            .find_node_mut("a")
            .unwrap()
            .config
            .insert(EXPRESSION_KEY.to_string(), json!(5));
        let mut state = engine.start(&workflow).unwrap();

        loop {
            let outcome = engine.tick(Some(&workflow), state, StepMode::Continuous);
            state = outcome.state;
            if outcome.continuation != Continuation::Continue {
                break;
            }
        }

        assert_eq!(state.variables.get("x"), Some(&json!(5)));
        assert!(state.logs.contains(&"[12:00:00] Set x = 5".to_string()));
    }

    #[test]
    fn test_complete_discarded_when_not_running() {
        let engine = engine();
        let state = ExecutionState::idle();
        assert_eq!(engine.complete(state.clone()), state);
    }
}
