//! Structural validation for workflows
//!
//! The graph model keeps edges consistent on its own, but it does not stop
//! an editor from deleting the start node, adding a second one, or giving two
//! parameters the same name. `validate_workflow` reports those conditions on
//! demand, along with anything a hand-built workflow may get wrong.

use std::collections::HashSet;

use crate::types::{NodeKind, ParameterList, Workflow};

/// A structural problem found in a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No start node
    MissingStartNode,
    /// More than one start node
    MultipleStartNodes { count: usize },
    /// A connection names a node that does not exist
    UnknownConnectionTarget { node_id: String, target_id: String },
    /// A node connects to itself
    SelfConnection { node_id: String },
    /// A node lists the same target twice
    DuplicateConnection { node_id: String, target_id: String },
    /// A connection has no port entry
    MissingPort { node_id: String, target_id: String },
    /// A port entry has no matching connection
    OrphanedPort { node_id: String, target_id: String },
    /// Two parameters in one list share a name
    DuplicateParameterName { list: ParameterList, name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStartNode => write!(f, "Workflow has no start node"),
            Self::MultipleStartNodes { count } => {
                write!(f, "Workflow has {} start nodes", count)
            }
            Self::UnknownConnectionTarget { node_id, target_id } => {
                write!(f, "Node '{}' connects to unknown node '{}'", node_id, target_id)
            }
            Self::SelfConnection { node_id } => {
                write!(f, "Node '{}' connects to itself", node_id)
            }
            Self::DuplicateConnection { node_id, target_id } => {
                write!(f, "Node '{}' connects to '{}' more than once", node_id, target_id)
            }
            Self::MissingPort { node_id, target_id } => {
                write!(f, "Connection '{}' -> '{}' has no port", node_id, target_id)
            }
            Self::OrphanedPort { node_id, target_id } => {
                write!(
                    f,
                    "Node '{}' has a port for '{}' without a connection",
                    node_id, target_id
                )
            }
            Self::DuplicateParameterName { list, name } => {
                write!(f, "Parameter name '{}' is used twice in {}", name, list.as_str())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a workflow
///
/// Returns all validation errors found (not just the first).
pub fn validate_workflow(workflow: &Workflow) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_start_node(workflow, &mut errors);
    validate_connections(workflow, &mut errors);
    validate_parameter_names(workflow, &mut errors);

    errors
}

fn validate_start_node(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    let count = workflow
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Start)
        .count();

    match count {
        0 => errors.push(ValidationError::MissingStartNode),
        1 => {}
        count => errors.push(ValidationError::MultipleStartNodes { count }),
    }
}

fn validate_connections(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    let node_ids: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();

    for node in &workflow.nodes {
        let mut seen: HashSet<&str> = HashSet::new();

        for target in &node.connections {
            if target == &node.id {
                errors.push(ValidationError::SelfConnection {
                    node_id: node.id.clone(),
                });
            }
            if !node_ids.contains(target.as_str()) {
                errors.push(ValidationError::UnknownConnectionTarget {
                    node_id: node.id.clone(),
                    target_id: target.clone(),
                });
            }
            if !seen.insert(target.as_str()) {
                errors.push(ValidationError::DuplicateConnection {
                    node_id: node.id.clone(),
                    target_id: target.clone(),
                });
            }
            if !node.outputs.contains_key(target) {
                errors.push(ValidationError::MissingPort {
                    node_id: node.id.clone(),
                    target_id: target.clone(),
                });
            }
        }

        let mut orphaned: Vec<&String> = node
            .outputs
            .keys()
            .filter(|target| !seen.contains(target.as_str()))
            .collect();
        orphaned.sort();
        for target in orphaned {
            errors.push(ValidationError::OrphanedPort {
                node_id: node.id.clone(),
                target_id: target.clone(),
            });
        }
    }
}

fn validate_parameter_names(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    for list in [
        ParameterList::Inputs,
        ParameterList::Outputs,
        ParameterList::Locals,
    ] {
        let mut seen: HashSet<&str> = HashSet::new();
        for param in workflow.parameters(list) {
            if !seen.insert(param.name.as_str()) {
                errors.push(ValidationError::DuplicateParameterName {
                    list,
                    name: param.name.clone(),
                });
            }
        }
    }
}
