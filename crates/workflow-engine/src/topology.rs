//! Structural graph algorithms
//!
//! Downstream reachability and insertion of a node into an existing edge.
//! Workflows may contain cycles, so every traversal here is bounded.

use std::collections::{HashSet, VecDeque};

use crate::config::LayoutConfig;
use crate::types::{new_id, NodeId, NodeKind, Port, Workflow, WorkflowNode};

/// Collect every node reachable from `start_id` by following connections
///
/// The search never enters `exclude_id` and stops after `cap` dequeues,
/// which bounds it on cyclic graphs. IDs that do not resolve to a node are
/// still reported as visited.
pub fn downstream_nodes(
    nodes: &[WorkflowNode],
    start_id: &str,
    exclude_id: &str,
    cap: usize,
) -> HashSet<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start_id]);
    let mut iterations = 0;

    while iterations < cap {
        let Some(id) = queue.pop_front() else {
            break;
        };
        iterations += 1;

        if id == exclude_id || visited.contains(id) {
            continue;
        }
        visited.insert(id.to_string());

        if let Some(node) = nodes.iter().find(|n| n.id == id) {
            for next in &node.connections {
                if !visited.contains(next) {
                    queue.push_back(next.as_str());
                }
            }
        }
    }

    if iterations >= cap && !queue.is_empty() {
        log::warn!(
            "Downstream search from '{}' stopped at the {} iteration cap",
            start_id,
            cap
        );
    }

    visited
}

/// Insert a new node into the edge `source_id → target_id`
///
/// When the target sits at or right of `source.x - cramped_margin` there is
/// no room for the new node, so the target and everything downstream of it
/// (not crossing back into the source) moves right by `insert_gap`, and the
/// new node is placed `insert_gap` right of the source. Otherwise the new
/// node goes to `(x, y)`.
///
/// The source keeps its connection slot and port: the edge now ends at the
/// new node, which connects onward to the target on the right port.
///
/// Returns `None` without touching the workflow when either node is missing
/// or the source does not connect to the target.
pub fn insert_node_between(
    workflow: &mut Workflow,
    source_id: &str,
    target_id: &str,
    kind: NodeKind,
    x: f64,
    y: f64,
    layout: &LayoutConfig,
) -> Option<NodeId> {
    let source = workflow.find_node(source_id)?;
    let target = workflow.find_node(target_id)?;

    if !source.connects_to(target_id) {
        log::warn!(
            "Cannot insert between '{}' and '{}': they are not connected",
            source_id,
            target_id
        );
        return None;
    }

    let cramped = target.x >= source.x - layout.cramped_margin;
    let (shifted, position) = if cramped {
        let shifted = downstream_nodes(
            &workflow.nodes,
            target_id,
            source_id,
            layout.downstream_search_cap,
        );
        (shifted, (source.x + layout.insert_gap, source.y))
    } else {
        (HashSet::new(), (x, y))
    };

    let new_node_id = new_id();
    let mut new_node = WorkflowNode::new(&new_node_id, kind, position.0, position.1);
    new_node.label = kind.as_str().to_string();
    new_node.push_connection(target_id, Port::Right);

    for node in workflow.nodes.iter_mut() {
        if shifted.contains(&node.id) {
            node.x += layout.insert_gap;
        }
        if node.id == source_id {
            let port = node.outputs.remove(target_id).unwrap_or_default();
            for connection in node.connections.iter_mut() {
                if *connection == target_id {
                    *connection = new_node_id.clone();
                }
            }
            node.outputs.insert(new_node_id.clone(), port);
        }
    }
    workflow.nodes.push(new_node);

    log::debug!(
        "Inserted {} node '{}' between '{}' and '{}' ({} nodes shifted)",
        kind,
        new_node_id,
        source_id,
        target_id,
        shifted.len()
    );

    Some(new_node_id)
}
