//! The workflow graph model
//!
//! `GraphModel` owns every workflow in an editing session and is the only
//! way to mutate them. Every operation names its workflow explicitly.
//!
//! Mutators follow two rules:
//!
//! - A stale workflow or node ID is ignored: the call returns `false` or
//!   `None` and nothing changes.
//! - Edges stay consistent: a node's `connections` and `outputs` always
//!   name the same targets, and removing a node removes every edge to it.
//!
//! Structural edits (nodes, edges, parameters) record an undo snapshot.
//! Position, label and config edits do not; `undo` and `redo` fold them into
//! the current snapshot first, so they survive an undo/redo round trip.

use serde_json::Value;
use std::collections::HashMap;

use crate::config::{EngineConfig, HistoryConfig, LayoutConfig};
use crate::constants::defaults;
use crate::topology;
use crate::types::{
    new_id, NodeId, NodeKind, NodeParameter, NodeUpdate, ParameterId, ParameterList,
    ParameterType, ParameterUpdate, Port, Workflow, WorkflowId, WorkflowNode, WorkflowScope,
    WorkflowUpdate,
};
use crate::undo::UndoStack;

/// The node currently selected in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub workflow_id: WorkflowId,
    pub node_id: NodeId,
}

/// Owner of all workflows in a session
#[derive(Debug, Default)]
pub struct GraphModel {
    workflows: Vec<Workflow>,
    selection: Option<Selection>,
    histories: HashMap<WorkflowId, UndoStack>,
    layout: LayoutConfig,
    history: HistoryConfig,
}

impl GraphModel {
    /// Create an empty model with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model using the layout and history settings of `config`
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            history: config.history.clone(),
            ..Self::default()
        }
    }

    // =========================================================================
    // Read model
    // =========================================================================

    /// All workflows, in creation order
    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    /// Get a workflow by ID
    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == workflow_id)
    }

    /// Nodes of a workflow, empty if the workflow does not exist
    pub fn nodes(&self, workflow_id: &str) -> &[WorkflowNode] {
        self.workflow(workflow_id)
            .map(|w| w.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Get a node by workflow and node ID
    pub fn node(&self, workflow_id: &str, node_id: &str) -> Option<&WorkflowNode> {
        self.workflow(workflow_id)?.find_node(node_id)
    }

    /// Workflows belonging to one scope
    pub fn visible_workflows(&self, scope: WorkflowScope) -> Vec<&Workflow> {
        self.workflows.iter().filter(|w| w.scope == scope).collect()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The selected node, if it still exists
    pub fn selected_node(&self) -> Option<&WorkflowNode> {
        let selection = self.selection.as_ref()?;
        self.node(&selection.workflow_id, &selection.node_id)
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    // =========================================================================
    // Workflows
    // =========================================================================

    /// Create a workflow holding a single start node
    pub fn create_workflow(&mut self, name: impl Into<String>, scope: WorkflowScope) -> WorkflowId {
        self.insert_workflow(Workflow::with_start_node(name, scope))
    }

    /// Add a fully built workflow, replacing one with the same ID
    pub fn insert_workflow(&mut self, workflow: Workflow) -> WorkflowId {
        let id = workflow.id.clone();
        log::debug!("Adding workflow '{}' ({})", workflow.name, id);

        match self.workflows.iter_mut().find(|w| w.id == id) {
            Some(existing) => *existing = workflow,
            None => self.workflows.push(workflow),
        }
        self.histories.remove(&id);
        self.record(&id);
        id
    }

    /// Rename a workflow or change its scope
    pub fn update_workflow(&mut self, workflow_id: &str, update: WorkflowUpdate) -> bool {
        let Some(workflow) = self.workflow_mut(workflow_id) else {
            return false;
        };
        if let Some(name) = update.name {
            workflow.name = name;
        }
        if let Some(scope) = update.scope {
            workflow.scope = scope;
        }
        true
    }

    /// Delete a workflow and its history
    pub fn remove_workflow(&mut self, workflow_id: &str) -> Option<Workflow> {
        let index = self.workflows.iter().position(|w| w.id == workflow_id)?;
        let removed = self.workflows.remove(index);
        self.histories.remove(workflow_id);
        if self
            .selection
            .as_ref()
            .is_some_and(|s| s.workflow_id == workflow_id)
        {
            self.selection = None;
        }
        log::debug!("Removed workflow '{}'", workflow_id);
        Some(removed)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a node; fails if it does not exist
    pub fn select_node(&mut self, workflow_id: &str, node_id: &str) -> bool {
        if self.node(workflow_id, node_id).is_none() {
            return false;
        }
        self.selection = Some(Selection {
            workflow_id: workflow_id.to_string(),
            node_id: node_id.to_string(),
        });
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Append a disconnected node labelled after its kind
    pub fn add_node(&mut self, workflow_id: &str, kind: NodeKind, x: f64, y: f64) -> Option<NodeId> {
        let workflow = self.workflow_mut(workflow_id)?;
        let node = WorkflowNode::new(new_id(), kind, x, y);
        let node_id = node.id.clone();
        workflow.nodes.push(node);

        log::debug!("Added {} node '{}' to workflow '{}'", kind, node_id, workflow_id);
        self.record(workflow_id);
        Some(node_id)
    }

    /// Merge a partial update into a node
    pub fn update_node(&mut self, workflow_id: &str, node_id: &str, update: NodeUpdate) -> bool {
        let Some(node) = self.node_mut(workflow_id, node_id) else {
            return false;
        };
        update.apply(node);
        true
    }

    /// Set one config field on a node
    pub fn update_node_config(
        &mut self,
        workflow_id: &str,
        node_id: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> bool {
        let Some(node) = self.node_mut(workflow_id, node_id) else {
            return false;
        };
        node.config.insert(key.into(), value.into());
        true
    }

    /// Move a node
    pub fn update_node_position(&mut self, workflow_id: &str, node_id: &str, x: f64, y: f64) -> bool {
        let Some(node) = self.node_mut(workflow_id, node_id) else {
            return false;
        };
        node.x = x;
        node.y = y;
        true
    }

    /// Flip a node's breakpoint flag, returning the new value
    pub fn toggle_breakpoint(&mut self, workflow_id: &str, node_id: &str) -> Option<bool> {
        let node = self.node_mut(workflow_id, node_id)?;
        node.is_breakpoint = !node.is_breakpoint;
        Some(node.is_breakpoint)
    }

    /// Delete a node together with every edge pointing at it
    pub fn remove_node(&mut self, workflow_id: &str, node_id: &str) -> bool {
        let Some(workflow) = self.workflow_mut(workflow_id) else {
            return false;
        };
        if !workflow.contains_node(node_id) {
            return false;
        }

        workflow.nodes.retain(|n| n.id != node_id);
        for node in workflow.nodes.iter_mut() {
            node.drop_connection(node_id);
        }

        if self
            .selection
            .as_ref()
            .is_some_and(|s| s.workflow_id == workflow_id && s.node_id == node_id)
        {
            self.selection = None;
        }

        log::debug!("Removed node '{}' from workflow '{}'", node_id, workflow_id);
        self.record(workflow_id);
        true
    }

    /// Copy a node next to the original, without its edges
    pub fn duplicate_node(&mut self, workflow_id: &str, node_id: &str) -> Option<NodeId> {
        let offset = self.layout.duplicate_offset;
        let workflow = self.workflow_mut(workflow_id)?;
        let original = workflow.find_node(node_id)?;

        let mut copy = original.clone();
        copy.id = new_id();
        copy.x += offset;
        copy.y += offset;
        copy.connections.clear();
        copy.outputs.clear();
        copy.label.push_str(defaults::COPY_SUFFIX);

        let copy_id = copy.id.clone();
        workflow.nodes.push(copy);

        log::debug!("Duplicated node '{}' as '{}'", node_id, copy_id);
        self.record(workflow_id);
        Some(copy_id)
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Add an edge `source → target` leaving from `port`
    ///
    /// Rejected (returns `false`, nothing changes) for self-loops, duplicate
    /// edges, and unknown source or target nodes. New edges go last, so
    /// for an `if` node the first edge added is the true branch.
    pub fn connect_nodes(
        &mut self,
        workflow_id: &str,
        source_id: &str,
        target_id: &str,
        port: Port,
    ) -> bool {
        if source_id == target_id {
            log::warn!("Rejected self-connection on node '{}'", source_id);
            return false;
        }
        let Some(workflow) = self.workflow_mut(workflow_id) else {
            return false;
        };
        if !workflow.contains_node(target_id) {
            log::warn!("Rejected connection to unknown node '{}'", target_id);
            return false;
        }
        let Some(source) = workflow.find_node_mut(source_id) else {
            return false;
        };
        if source.connects_to(target_id) {
            log::warn!("Rejected duplicate connection '{}' -> '{}'", source_id, target_id);
            return false;
        }

        source.push_connection(target_id, port);
        log::debug!("Connected '{}' -> '{}' via {}", source_id, target_id, port.as_str());
        self.record(workflow_id);
        true
    }

    /// Remove the edge `source → target`
    pub fn remove_connection(&mut self, workflow_id: &str, source_id: &str, target_id: &str) -> bool {
        let Some(source) = self.node_mut(workflow_id, source_id) else {
            return false;
        };
        if !source.connects_to(target_id) && !source.outputs.contains_key(target_id) {
            return false;
        }
        source.drop_connection(target_id);

        log::debug!("Disconnected '{}' -> '{}'", source_id, target_id);
        self.record(workflow_id);
        true
    }

    /// Splice a new node into the edge `source → target`
    ///
    /// See [`topology::insert_node_between`] for placement rules.
    pub fn insert_node_between(
        &mut self,
        workflow_id: &str,
        source_id: &str,
        target_id: &str,
        kind: NodeKind,
        x: f64,
        y: f64,
    ) -> Option<NodeId> {
        let layout = self.layout.clone();
        let workflow = self.workflow_mut(workflow_id)?;
        let node_id =
            topology::insert_node_between(workflow, source_id, target_id, kind, x, y, &layout)?;
        self.record(workflow_id);
        Some(node_id)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Append a `new_param: string` parameter to one of the lists
    pub fn add_workflow_parameter(
        &mut self,
        workflow_id: &str,
        list: ParameterList,
    ) -> Option<ParameterId> {
        let workflow = self.workflow_mut(workflow_id)?;
        let param = NodeParameter::new(new_id(), defaults::PARAMETER_NAME, ParameterType::String);
        let param_id = param.id.clone();
        workflow.parameters_mut(list).push(param);

        log::debug!("Added parameter '{}' to {}", param_id, list.as_str());
        self.record(workflow_id);
        Some(param_id)
    }

    /// Rename or retype a parameter
    pub fn update_workflow_parameter(
        &mut self,
        workflow_id: &str,
        list: ParameterList,
        param_id: &str,
        update: ParameterUpdate,
    ) -> bool {
        let Some(workflow) = self.workflow_mut(workflow_id) else {
            return false;
        };
        let Some(param) = workflow
            .parameters_mut(list)
            .iter_mut()
            .find(|p| p.id == param_id)
        else {
            return false;
        };
        if let Some(name) = update.name {
            param.name = name;
        }
        if let Some(param_type) = update.param_type {
            param.param_type = param_type;
        }
        self.record(workflow_id);
        true
    }

    /// Remove a parameter
    pub fn remove_workflow_parameter(
        &mut self,
        workflow_id: &str,
        list: ParameterList,
        param_id: &str,
    ) -> bool {
        let Some(workflow) = self.workflow_mut(workflow_id) else {
            return false;
        };
        let params = workflow.parameters_mut(list);
        let before = params.len();
        params.retain(|p| p.id != param_id);
        if params.len() == before {
            return false;
        }
        self.record(workflow_id);
        true
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn can_undo(&self, workflow_id: &str) -> bool {
        self.histories.get(workflow_id).is_some_and(UndoStack::can_undo)
    }

    pub fn can_redo(&self, workflow_id: &str) -> bool {
        self.histories.get(workflow_id).is_some_and(UndoStack::can_redo)
    }

    /// Restore the workflow to its state before the last structural edit
    pub fn undo(&mut self, workflow_id: &str) -> bool {
        self.sync_history(workflow_id);
        let restored = self.histories.get_mut(workflow_id).and_then(UndoStack::undo);
        self.restore(workflow_id, restored)
    }

    /// Re-apply the last undone structural edit
    pub fn redo(&mut self, workflow_id: &str) -> bool {
        self.sync_history(workflow_id);
        let restored = self.histories.get_mut(workflow_id).and_then(UndoStack::redo);
        self.restore(workflow_id, restored)
    }

    fn restore(&mut self, workflow_id: &str, restored: Option<crate::Result<Workflow>>) -> bool {
        let workflow = match restored {
            Some(Ok(workflow)) => workflow,
            Some(Err(e)) => {
                log::warn!("Failed to restore workflow '{}': {}", workflow_id, e);
                return false;
            }
            None => return false,
        };
        let Some(slot) = self.workflow_mut(workflow_id) else {
            return false;
        };
        *slot = workflow;

        if self.selected_node().is_none() {
            self.selection = None;
        }
        true
    }

    fn record(&mut self, workflow_id: &str) {
        if !self.history.enabled {
            return;
        }
        let Some(workflow) = self.workflows.iter().find(|w| w.id == workflow_id) else {
            return;
        };
        let max_snapshots = self.history.max_snapshots;
        let stack = self
            .histories
            .entry(workflow_id.to_string())
            .or_insert_with(|| UndoStack::new(max_snapshots));
        if let Err(e) = stack.record(workflow) {
            log::warn!("Failed to record undo snapshot for '{}': {}", workflow_id, e);
        }
    }

    /// Write the live workflow over the snapshot at the history cursor
    fn sync_history(&mut self, workflow_id: &str) {
        let Some(workflow) = self.workflows.iter().find(|w| w.id == workflow_id) else {
            return;
        };
        let Some(stack) = self.histories.get_mut(workflow_id) else {
            return;
        };
        if let Err(e) = stack.replace_current(workflow) {
            log::warn!("Failed to sync undo history for '{}': {}", workflow_id, e);
        }
    }

    fn workflow_mut(&mut self, workflow_id: &str) -> Option<&mut Workflow> {
        self.workflows.iter_mut().find(|w| w.id == workflow_id)
    }

    fn node_mut(&mut self, workflow_id: &str, node_id: &str) -> Option<&mut WorkflowNode> {
        self.workflow_mut(workflow_id)?.find_node_mut(node_id)
    }
}
