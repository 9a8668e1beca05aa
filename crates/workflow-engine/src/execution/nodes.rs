//! Per-kind node evaluation
//!
//! Each node kind has one handler. A handler reads the node and the current
//! variables and reports where to go next, which variables change and the
//! log message for the step. Handlers never touch the execution state.

use serde_json::Value;
use std::collections::HashMap;

use super::expression::{display_value, evaluate_condition, resolve_value};
use crate::types::{NodeId, NodeKind, WorkflowNode};
use crate::Result;

/// Config field an assign node writes to
pub const TARGET_VAR_KEY: &str = "targetVar";
/// Config field holding an assign value or a branch condition
pub const EXPRESSION_KEY: &str = "expression";
/// Config field describing an action
pub const QUERY_KEY: &str = "query";

/// Result of evaluating a single node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    /// Node to evaluate next; `None` ends the path
    pub next_node_id: Option<NodeId>,
    /// Variables to write into the environment
    pub variable_updates: HashMap<String, Value>,
    /// Log message for this step, without timestamp
    pub message: String,
    /// The kind has no interpreter semantics yet
    pub not_implemented: bool,
}

impl NodeOutcome {
    /// Continue to `next`
    pub fn advance(next: Option<&NodeId>) -> Self {
        Self {
            next_node_id: next.cloned(),
            variable_updates: HashMap::new(),
            message: String::new(),
            not_implemented: false,
        }
    }

    /// End the path here
    pub fn finish() -> Self {
        Self::advance(None)
    }

    pub fn with_update(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variable_updates.insert(key.into(), value);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Evaluate a Start node.
pub fn evaluate_start(node: &WorkflowNode) -> Result<NodeOutcome> {
    Ok(NodeOutcome::advance(node.primary_connection()).with_message("Start"))
}

/// Evaluate an Assign node.
///
/// Without a target variable the step assigns nothing and logs an empty
/// message.
pub fn evaluate_assign(
    node: &WorkflowNode,
    variables: &HashMap<String, Value>,
) -> Result<NodeOutcome> {
    let target = node.config_text(TARGET_VAR_KEY)?.filter(|t| !t.is_empty());
    let expression = node.config_text(EXPRESSION_KEY)?;
    let outcome = NodeOutcome::advance(node.primary_connection());

    let Some(target) = target else {
        return Ok(outcome);
    };

    let value = match expression.as_deref() {
        Some(expression) => resolve_value(expression, variables),
        None => Value::Null,
    };
    let message = format!("Set {} = {}", target, display_value(&value));

    Ok(outcome.with_update(target.into_owned(), value).with_message(message))
}

/// Evaluate an If node.
///
/// `connections[0]` is the true branch. The false branch is `connections[1]`,
/// falling back to `connections[0]` when there is no second edge.
pub fn evaluate_if(node: &WorkflowNode, variables: &HashMap<String, Value>) -> Result<NodeOutcome> {
    let condition = node.config_text(EXPRESSION_KEY)?;
    let result = condition
        .as_deref()
        .is_some_and(|c| evaluate_condition(c, variables));

    let next = if result {
        node.connections.first()
    } else {
        node.connections.get(1).or(node.connections.first())
    };

    Ok(NodeOutcome::advance(next).with_message(format!(
        "If ({}) -> {}",
        condition.as_deref().unwrap_or("undefined"),
        result
    )))
}

/// Evaluate an Action node.
pub fn evaluate_action(node: &WorkflowNode) -> Result<NodeOutcome> {
    let query = node.config_text(QUERY_KEY)?.filter(|q| !q.is_empty());

    Ok(NodeOutcome::advance(node.primary_connection())
        .with_message(format!("Execute: {}", query.as_deref().unwrap_or("Action"))))
}

/// Evaluate a Return node.
pub fn evaluate_return(_node: &WorkflowNode) -> Result<NodeOutcome> {
    Ok(NodeOutcome::finish().with_message("Return"))
}

/// Placeholder for kinds the debugger cannot interpret.
///
/// Follows the first connection so a run can still walk past them.
pub fn evaluate_unimplemented(node: &WorkflowNode) -> Result<NodeOutcome> {
    let mut outcome = NodeOutcome::advance(node.primary_connection()).with_message(format!(
        "{} is not implemented; following first connection",
        node.kind.label()
    ));
    outcome.not_implemented = true;
    Ok(outcome)
}

/// Evaluate a node based on its kind.
pub fn evaluate_node(
    node: &WorkflowNode,
    variables: &HashMap<String, Value>,
) -> Result<NodeOutcome> {
    match node.kind {
        NodeKind::Start => evaluate_start(node),
        NodeKind::Assign => evaluate_assign(node, variables),
        NodeKind::If => evaluate_if(node, variables),
        NodeKind::Action => evaluate_action(node),
        NodeKind::Return => evaluate_return(node),
        NodeKind::Switch | NodeKind::Foreach => evaluate_unimplemented(node),
    }
}
