//! Debugging session controller
//!
//! `Debugger` owns the state of one run and decides what happens next. It
//! does not sleep: after every control call or tick it records the single
//! pending step (`Scheduled`) and the caller, either the async driver or a
//! test, runs it with [`Debugger::run_pending`] when the delay has passed.
//! Keeping one pending step means ticks of a run can never overlap.

use std::sync::Arc;
use std::time::Duration;

use super::engine::{Clock, Continuation, ExecutionEngine, StepMode, TickOutcome};
use super::state::{ExecutionState, ExecutionStatus};
use crate::config::ExecutionConfig;
use crate::events::{EventSink, ExecutionEvent, NullEventSink};
use crate::graph::GraphModel;
use crate::types::WorkflowId;

/// The next step a session is waiting to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// Evaluate the current node
    Tick(StepMode),
    /// Log the completion message after the path ended
    Completion,
}

/// Controller for a single debugging run
pub struct Debugger {
    engine: ExecutionEngine,
    workflow_id: Option<WorkflowId>,
    execution_id: String,
    state: ExecutionState,
    scheduled: Option<Scheduled>,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("workflow_id", &self.workflow_id)
            .field("execution_id", &self.execution_id)
            .field("state", &self.state)
            .field("scheduled", &self.scheduled)
            .finish_non_exhaustive()
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

impl Debugger {
    /// Create an idle debugger
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            engine: ExecutionEngine::new(config),
            workflow_id: None,
            execution_id: new_execution_id(),
            state: ExecutionState::idle(),
            scheduled: None,
            event_sink: Arc::new(NullEventSink),
        }
    }

    /// Replace the clock used for log timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.engine = self.engine.with_clock(clock);
        self
    }

    /// Report lifecycle events to `sink`
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Workflow of the current or last run
    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref()
    }

    /// Identifier attached to this run's events
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn scheduled(&self) -> Option<Scheduled> {
        self.scheduled
    }

    /// How long to wait before running the pending step
    pub fn next_delay(&self) -> Option<Duration> {
        let config = self.engine.config();
        self.scheduled.map(|scheduled| match scheduled {
            Scheduled::Tick(_) => config.tick_delay(),
            Scheduled::Completion => config.completion_delay(),
        })
    }

    /// Start a run of `workflow_id` at its start node
    ///
    /// Does nothing and returns `false` when the workflow is unknown or has
    /// no start node. Any previous run is replaced.
    pub fn start_execution(&mut self, model: &GraphModel, workflow_id: &str) -> bool {
        let Some(workflow) = model.workflow(workflow_id) else {
            log::warn!("Cannot start unknown workflow {}", workflow_id);
            return false;
        };
        let Some(state) = self.engine.start(workflow) else {
            log::warn!("Workflow {} has no start node", workflow_id);
            return false;
        };

        self.execution_id = new_execution_id();
        self.workflow_id = Some(workflow.id.clone());
        let start_id = state.current_node_id.clone().unwrap_or_default();
        self.state = state;
        self.scheduled = Some(Scheduled::Tick(StepMode::Continuous));

        self.emit(ExecutionEvent::Started {
            workflow_id: workflow.id.clone(),
            execution_id: self.execution_id.clone(),
            node_id: start_id,
        });
        true
    }

    /// Discard the run and everything it produced
    pub fn stop_execution(&mut self) {
        let was_active = !self.state.is_idle() || self.scheduled.is_some();
        self.state = ExecutionState::idle();
        self.scheduled = None;
        if was_active {
            log::info!("Execution {} stopped", self.execution_id);
            self.emit(ExecutionEvent::Stopped {
                execution_id: self.execution_id.clone(),
            });
        }
    }

    /// Continue a paused run until the next breakpoint or the end
    ///
    /// Returns `false` unless the run was paused.
    pub fn resume_execution(&mut self) -> bool {
        if !self.state.is_paused() {
            return false;
        }
        self.state.status = ExecutionStatus::Running;
        self.scheduled = Some(Scheduled::Tick(StepMode::Continuous));
        log::debug!("Execution {} resumed", self.execution_id);
        true
    }

    /// Advance by exactly one node
    ///
    /// From idle this starts a run of `workflow_id` and pauses on its start
    /// node. Otherwise the active run gets a single-step tick, replacing any
    /// pending tick, and `workflow_id` is ignored.
    pub fn step_execution(&mut self, model: &GraphModel, workflow_id: &str) -> bool {
        if self.state.is_idle() {
            if !self.start_execution(model, workflow_id) {
                return false;
            }
            self.state.status = ExecutionStatus::Paused;
            self.scheduled = None;
            self.emit(ExecutionEvent::Paused {
                execution_id: self.execution_id.clone(),
                node_id: self.state.current_node_id.clone(),
            });
            return true;
        }

        self.state.status = ExecutionStatus::Running;
        self.scheduled = Some(Scheduled::Tick(StepMode::SingleStep));
        true
    }

    /// Run the pending step against the current graph
    ///
    /// Returns `false` when nothing was pending.
    pub fn run_pending(&mut self, model: &GraphModel) -> bool {
        let Some(scheduled) = self.scheduled.take() else {
            return false;
        };

        match scheduled {
            Scheduled::Tick(mode) => self.run_tick(model, mode),
            Scheduled::Completion => self.run_completion(),
        }
        true
    }

    /// Run pending steps back to back, ignoring delays
    ///
    /// Stops once the run settles or after `max_steps`, since a cyclic
    /// graph without a breakpoint never settles. Returns the number of
    /// steps run.
    pub fn run_until_settled(&mut self, model: &GraphModel, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.run_pending(model) {
            steps += 1;
        }
        steps
    }

    fn run_tick(&mut self, model: &GraphModel, mode: StepMode) {
        let workflow = self.workflow_id.as_deref().and_then(|id| model.workflow(id));
        let state = std::mem::take(&mut self.state);

        let TickOutcome {
            state,
            continuation,
            evaluation,
        } = self.engine.tick(workflow, state, mode);
        self.state = state;

        if let Some(evaluation) = evaluation {
            self.emit(ExecutionEvent::NodeEvaluated {
                execution_id: self.execution_id.clone(),
                node_id: evaluation.node_id,
                next_node_id: evaluation.next_node_id,
                message: evaluation.message,
            });
        }

        self.scheduled = match continuation {
            Continuation::Skipped => None,
            Continuation::Continue => Some(Scheduled::Tick(StepMode::Continuous)),
            Continuation::Finishing => Some(Scheduled::Completion),
            Continuation::Paused => {
                self.emit(ExecutionEvent::Paused {
                    execution_id: self.execution_id.clone(),
                    node_id: self.state.current_node_id.clone(),
                });
                None
            }
            Continuation::Breakpoint(node_id) => {
                self.emit(ExecutionEvent::BreakpointHit {
                    execution_id: self.execution_id.clone(),
                    node_id,
                });
                None
            }
            Continuation::Halted(reason) => {
                self.emit(ExecutionEvent::Halted {
                    execution_id: self.execution_id.clone(),
                    reason,
                });
                None
            }
        };
    }

    fn run_completion(&mut self) {
        if !self.state.is_running() {
            log::debug!("Discarding completion for execution {}", self.execution_id);
            return;
        }
        let state = std::mem::take(&mut self.state);
        self.state = self.engine.complete(state);
        self.emit(ExecutionEvent::Completed {
            execution_id: self.execution_id.clone(),
        });
    }

    fn emit(&self, event: ExecutionEvent) {
        let _ = self.event_sink.send(event);
    }
}

fn new_execution_id() -> String {
    format!("debug-exec-{}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::execution::engine::FixedClock;
    use crate::execution::nodes::{EXPRESSION_KEY, QUERY_KEY, TARGET_VAR_KEY};
    use crate::types::{NodeKind, NodeUpdate, Port, WorkflowScope};
    use serde_json::json;

    struct Fixture {
        model: GraphModel,
        workflow_id: String,
        start: String,
        assign: String,
        action: String,
        ret: String,
    }

    /// start -> assign(x := 5) -> action -> return
    fn fixture() -> Fixture {
        let mut model = GraphModel::new();
        let workflow_id = model.create_workflow("Debug", WorkflowScope::Server);
        let start = model.nodes(&workflow_id)[0].id.clone();
        let assign = model.add_node(&workflow_id, NodeKind::Assign, 300.0, 100.0).unwrap();
        let action = model.add_node(&workflow_id, NodeKind::Action, 550.0, 100.0).unwrap();
        let ret = model.add_node(&workflow_id, NodeKind::Return, 800.0, 100.0).unwrap();

        model.update_node_config(&workflow_id, &assign, TARGET_VAR_KEY, json!("x"));
        model.update_node_config(&workflow_id, &assign, EXPRESSION_KEY, json!("5"));
        model.update_node_config(&workflow_id, &action, QUERY_KEY, json!("notify"));
        model.connect_nodes(&workflow_id, &start, &assign, Port::Right);
        model.connect_nodes(&workflow_id, &assign, &action, Port::Right);
        model.connect_nodes(&workflow_id, &action, &ret, Port::Right);

        Fixture {
            model,
            workflow_id,
            start,
            assign,
            action,
            ret,
        }
    }

    fn debugger() -> Debugger {
        Debugger::default().with_clock(Arc::new(FixedClock("09:30:00".to_string())))
    }

    #[test]
    fn test_run_to_completion() {
        let f = fixture();
        let mut debugger = debugger();

        assert!(debugger.start_execution(&f.model, &f.workflow_id));
        assert_eq!(debugger.next_delay(), Some(Duration::from_millis(600)));

        // Four ticks then the completion step
        assert_eq!(debugger.run_until_settled(&f.model, 100), 5);

        let state = debugger.state();
        assert_eq!(state.status, ExecutionStatus::Paused);
        assert!(state.current_node_id.is_none());
        assert_eq!(state.variables.get("x"), Some(&json!(5)));
        assert_eq!(
            state.logs,
            vec![
                "Started workflow 'Debug'",
                "[09:30:00] Start",
                "[09:30:00] Set x = 5",
                "[09:30:00] Execute: notify",
                "[09:30:00] Return",
                "Execution Completed.",
            ]
        );
    }

    #[test]
    fn test_completion_uses_completion_delay() {
        let f = fixture();
        let mut debugger = debugger();
        debugger.start_execution(&f.model, &f.workflow_id);

        debugger.run_until_settled(&f.model, 4);
        assert_eq!(debugger.scheduled(), Some(Scheduled::Completion));
        assert_eq!(debugger.next_delay(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_start_unknown_workflow() {
        let f = fixture();
        let mut debugger = debugger();

        assert!(!debugger.start_execution(&f.model, "missing"));
        assert!(debugger.state().is_idle());
        assert!(debugger.scheduled().is_none());
    }

    #[test]
    fn test_step_from_idle_pauses_on_start() {
        let f = fixture();
        let mut debugger = debugger();

        assert!(debugger.step_execution(&f.model, &f.workflow_id));
        assert!(debugger.state().is_paused());
        assert_eq!(debugger.state().current_node_id.as_deref(), Some(f.start.as_str()));
        assert!(debugger.scheduled().is_none());
        assert!(!debugger.run_pending(&f.model));
    }

    #[test]
    fn test_step_without_start_node_stays_idle() {
        let mut f = fixture();
        let start = f.start.clone();
        f.model.remove_node(&f.workflow_id, &start);
        let mut debugger = debugger();

        assert!(!debugger.step_execution(&f.model, &f.workflow_id));
        assert!(debugger.state().is_idle());
    }

    #[test]
    fn test_repeated_step_is_deterministic() {
        let f = fixture();
        let mut visited = Vec::new();
        let mut debugger = debugger();

        debugger.step_execution(&f.model, &f.workflow_id);
        for _ in 0..3 {
            assert!(debugger.step_execution(&f.model, &f.workflow_id));
            assert!(debugger.run_pending(&f.model));
            assert!(debugger.state().is_paused());
            visited.push(debugger.state().current_node_id.clone());
        }

        assert_eq!(
            visited,
            vec![Some(f.assign.clone()), Some(f.action.clone()), Some(f.ret.clone())]
        );
    }

    #[test]
    fn test_step_replaces_pending_tick() {
        let f = fixture();
        let mut debugger = debugger();
        debugger.start_execution(&f.model, &f.workflow_id);

        debugger.step_execution(&f.model, &f.workflow_id);
        assert_eq!(debugger.scheduled(), Some(Scheduled::Tick(StepMode::SingleStep)));

        debugger.run_pending(&f.model);
        assert!(debugger.state().is_paused());
        assert!(debugger.scheduled().is_none());
    }

    #[test]
    fn test_breakpoint_pauses_once() {
        let mut f = fixture();
        f.model.toggle_breakpoint(&f.workflow_id, &f.action);
        let sink = Arc::new(VecEventSink::new());
        let mut debugger = debugger().with_event_sink(sink.clone());

        debugger.start_execution(&f.model, &f.workflow_id);
        debugger.run_until_settled(&f.model, 100);
        assert!(debugger.state().is_paused());
        assert_eq!(debugger.state().current_node_id.as_deref(), Some(f.action.as_str()));
        assert_eq!(debugger.state().logs.last().unwrap(), "Breakpoint hit at Action");

        assert!(debugger.resume_execution());
        debugger.run_until_settled(&f.model, 100);
        assert!(debugger.state().current_node_id.is_none());

        let hits = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, ExecutionEvent::BreakpointHit { .. }))
            .count();
        assert_eq!(hits, 1);
        assert!(matches!(sink.events().last(), Some(ExecutionEvent::Completed { .. })));
    }

    #[test]
    fn test_resume_only_from_paused() {
        let f = fixture();
        let mut debugger = debugger();
        assert!(!debugger.resume_execution());

        debugger.start_execution(&f.model, &f.workflow_id);
        assert!(!debugger.resume_execution());
    }

    #[test]
    fn test_stop_discards_state_and_pending_completion() {
        let f = fixture();
        let mut debugger = debugger();
        debugger.start_execution(&f.model, &f.workflow_id);
        debugger.run_until_settled(&f.model, 4);
        assert_eq!(debugger.scheduled(), Some(Scheduled::Completion));

        debugger.stop_execution();
        assert_eq!(debugger.state(), &ExecutionState::idle());
        assert!(!debugger.run_pending(&f.model));
    }

    #[test]
    fn test_edits_between_ticks_are_visible() {
        let mut f = fixture();
        let mut debugger = debugger();
        debugger.step_execution(&f.model, &f.workflow_id);
        debugger.step_execution(&f.model, &f.workflow_id);
        debugger.run_pending(&f.model);
        assert_eq!(debugger.state().current_node_id.as_deref(), Some(f.assign.as_str()));

        f.model.update_node(
            &f.workflow_id,
            &f.assign,
            NodeUpdate::default().config(
                [
                    (TARGET_VAR_KEY.to_string(), json!("y")),
                    (EXPRESSION_KEY.to_string(), json!("\"edited\"")),
                ]
                .into_iter()
                .collect(),
            ),
        );
        debugger.step_execution(&f.model, &f.workflow_id);
        debugger.run_pending(&f.model);

        assert_eq!(debugger.state().variables.get("y"), Some(&json!("edited")));
        assert!(!debugger.state().variables.contains_key("x"));
    }

    #[test]
    fn test_removed_node_halts_run() {
        let mut f = fixture();
        let sink = Arc::new(VecEventSink::new());
        let mut debugger = debugger().with_event_sink(sink.clone());
        debugger.step_execution(&f.model, &f.workflow_id);
        debugger.step_execution(&f.model, &f.workflow_id);
        debugger.run_pending(&f.model);

        let assign = f.assign.clone();
        f.model.remove_node(&f.workflow_id, &assign);
        debugger.resume_execution();
        debugger.run_until_settled(&f.model, 100);

        let state = debugger.state();
        assert!(state.is_idle());
        assert!(state.current_node_id.is_none());
        assert_eq!(
            state.logs.last().unwrap(),
            &format!("Error: Node {} not found.", f.assign)
        );
        assert!(matches!(sink.events().last(), Some(ExecutionEvent::Halted { .. })));
    }

    #[test]
    fn test_events_share_execution_id() {
        let f = fixture();
        let sink = Arc::new(VecEventSink::new());
        let mut debugger = debugger().with_event_sink(sink.clone());

        debugger.start_execution(&f.model, &f.workflow_id);
        debugger.run_until_settled(&f.model, 100);
        debugger.stop_execution();

        let events = sink.events();
        assert!(matches!(&events[0], ExecutionEvent::Started { node_id, .. } if *node_id == f.start));
        assert!(matches!(events.last(), Some(ExecutionEvent::Stopped { .. })));
        let execution_id = debugger.execution_id().to_string();
        assert!(events.iter().all(|event| match event {
            ExecutionEvent::Started { execution_id: id, .. }
            | ExecutionEvent::NodeEvaluated { execution_id: id, .. }
            | ExecutionEvent::BreakpointHit { execution_id: id, .. }
            | ExecutionEvent::Paused { execution_id: id, .. }
            | ExecutionEvent::Completed { execution_id: id }
            | ExecutionEvent::Halted { execution_id: id, .. }
            | ExecutionEvent::Stopped { execution_id: id } => *id == execution_id,
        }));
    }
}
