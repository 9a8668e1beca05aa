//! Core types for workflow graphs
//!
//! These types define the structure of workflows: nodes, their ordered
//! outgoing connections, the presentation ports those connections leave
//! from, and the parameter slots a workflow declares.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::layout;
use crate::error::{Result, WorkflowError};

/// Unique identifier for a workflow
pub type WorkflowId = String;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a workflow parameter
pub type ParameterId = String;

/// Node-specific configuration fields (`targetVar`, `expression`, `query`, ...)
pub type NodeConfig = Map<String, Value>;

/// Generate a fresh identifier
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The kind of step a node performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point of the workflow
    Start,
    /// Assign an expression to a variable
    Assign,
    /// Two-way branch: first connection is true, second is false
    If,
    /// Multi-way branch (no interpreter semantics)
    Switch,
    /// Iteration over a collection (no interpreter semantics)
    Foreach,
    /// Side-effecting step such as a query
    Action,
    /// Terminal step
    Return,
}

impl NodeKind {
    /// Every node kind, in palette order
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Start,
        NodeKind::Assign,
        NodeKind::If,
        NodeKind::Switch,
        NodeKind::Foreach,
        NodeKind::Action,
        NodeKind::Return,
    ];

    /// Kinds that may be inserted between two connected nodes
    pub const INSERTABLE: [NodeKind; 5] = [
        NodeKind::Assign,
        NodeKind::If,
        NodeKind::Switch,
        NodeKind::Foreach,
        NodeKind::Action,
    ];

    /// The lowercase wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Assign => "assign",
            NodeKind::If => "if",
            NodeKind::Switch => "switch",
            NodeKind::Foreach => "foreach",
            NodeKind::Action => "action",
            NodeKind::Return => "return",
        }
    }

    /// Default label for new nodes: the capitalized kind name
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::Assign => "Assign",
            NodeKind::If => "If",
            NodeKind::Switch => "Switch",
            NodeKind::Foreach => "Foreach",
            NodeKind::Action => "Action",
            NodeKind::Return => "Return",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownNodeKind(s.to_string()))
    }
}

/// Side of a node an edge visually leaves from
///
/// Presentation only: the interpreter never looks at ports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    Left,
    #[default]
    Right,
    Bottom,
    Top,
}

impl Port {
    pub fn as_str(&self) -> &'static str {
        match self {
            Port::Left => "left",
            Port::Right => "right",
            Port::Bottom => "bottom",
            Port::Top => "top",
        }
    }
}

/// A step in a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Unique identifier for this node
    pub id: NodeId,
    /// The kind of step
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Human-readable label
    pub label: String,
    /// Canvas position
    pub x: f64,
    pub y: f64,
    /// Ordered outgoing edges; for `if` nodes index 0 is the true branch
    #[serde(default)]
    pub connections: Vec<NodeId>,
    /// Port each connected target is drawn from
    #[serde(default)]
    pub outputs: HashMap<NodeId, Port>,
    /// Kind-specific configuration
    #[serde(default)]
    pub config: NodeConfig,
    /// Pause the debugger when execution reaches this node
    #[serde(default)]
    pub is_breakpoint: bool,
}

impl WorkflowNode {
    /// Create a disconnected node with the default label for its kind
    pub fn new(id: impl Into<String>, kind: NodeKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            label: kind.label().to_string(),
            x,
            y,
            connections: Vec::new(),
            outputs: HashMap::new(),
            config: NodeConfig::new(),
            is_breakpoint: false,
        }
    }

    /// Set a config field, builder style
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Check whether this node has an edge to `target_id`
    pub fn connects_to(&self, target_id: &str) -> bool {
        self.connections.iter().any(|c| c == target_id)
    }

    /// The first outgoing connection, if any
    pub fn primary_connection(&self) -> Option<&NodeId> {
        self.connections.first()
    }

    /// Read a config field as expression text
    ///
    /// Absent and `null` fields read as `None`. Numbers and booleans read as
    /// their literal text, so `5` and `"5"` behave the same. Arrays and
    /// objects are an [`WorkflowError::InvalidConfig`].
    pub fn config_text(&self, key: &str) -> Result<Option<Cow<'_, str>>> {
        match self.config.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(Cow::Borrowed(s.as_str()))),
            Some(Value::Number(n)) => Ok(Some(Cow::Owned(n.to_string()))),
            Some(Value::Bool(b)) => Ok(Some(Cow::Owned(b.to_string()))),
            Some(Value::Array(_) | Value::Object(_)) => Err(WorkflowError::invalid_config(
                &self.id,
                key,
                "a string, number or boolean",
            )),
        }
    }

    /// Append an edge and record its port
    pub(crate) fn push_connection(&mut self, target_id: &str, port: Port) {
        self.connections.push(target_id.to_string());
        self.outputs.insert(target_id.to_string(), port);
    }

    /// Drop every edge to `target_id`, returning the port it used
    pub(crate) fn drop_connection(&mut self, target_id: &str) -> Option<Port> {
        self.connections.retain(|c| c != target_id);
        self.outputs.remove(target_id)
    }
}

/// Where a workflow runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowScope {
    Server,
    Client,
}

/// Data type of a workflow parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
    Any,
}

/// An input, output or local variable slot declared on a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeParameter {
    pub id: ParameterId,
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
}

impl NodeParameter {
    pub fn new(id: impl Into<String>, name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            param_type,
        }
    }
}

/// Which parameter list of a workflow an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterList {
    Inputs,
    Outputs,
    Locals,
}

impl ParameterList {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterList::Inputs => "inputs",
            ParameterList::Outputs => "outputs",
            ParameterList::Locals => "locals",
        }
    }
}

/// A workflow: one directed graph of nodes plus its parameter slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub scope: WorkflowScope,
    #[serde(default)]
    pub inputs: Vec<NodeParameter>,
    #[serde(default)]
    pub outputs: Vec<NodeParameter>,
    #[serde(default)]
    pub locals: Vec<NodeParameter>,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
}

impl Workflow {
    /// Create a workflow with no nodes and no parameters
    pub fn new(id: impl Into<String>, name: impl Into<String>, scope: WorkflowScope) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scope,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locals: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Create a workflow holding a single start node at the default position
    pub fn with_start_node(name: impl Into<String>, scope: WorkflowScope) -> Self {
        let mut workflow = Self::new(new_id(), name, scope);
        let (x, y) = layout::START_POSITION;
        workflow
            .nodes
            .push(WorkflowNode::new(new_id(), NodeKind::Start, x, y));
        workflow
    }

    /// Find a node by its ID
    pub fn find_node(&self, node_id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Find a node by its ID, mutably
    pub fn find_node_mut(&mut self, node_id: &str) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    /// Find the first start node
    pub fn find_start_node(&self) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Start)
    }

    /// Check if a node exists
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    /// Get one of the three parameter lists
    pub fn parameters(&self, list: ParameterList) -> &[NodeParameter] {
        match list {
            ParameterList::Inputs => &self.inputs,
            ParameterList::Outputs => &self.outputs,
            ParameterList::Locals => &self.locals,
        }
    }

    /// Get one of the three parameter lists, mutably
    pub fn parameters_mut(&mut self, list: ParameterList) -> &mut Vec<NodeParameter> {
        match list {
            ParameterList::Inputs => &mut self.inputs,
            ParameterList::Outputs => &mut self.outputs,
            ParameterList::Locals => &mut self.locals,
        }
    }
}

/// Partial update for a node
///
/// Edges are absent: connections and ports only change through
/// the connection operations, which keep both in step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub kind: Option<NodeKind>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub config: Option<NodeConfig>,
    pub is_breakpoint: Option<bool>,
}

impl NodeUpdate {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn breakpoint(mut self, is_breakpoint: bool) -> Self {
        self.is_breakpoint = Some(is_breakpoint);
        self
    }

    /// Merge the set fields into `node`
    pub(crate) fn apply(self, node: &mut WorkflowNode) {
        if let Some(label) = self.label {
            node.label = label;
        }
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(x) = self.x {
            node.x = x;
        }
        if let Some(y) = self.y {
            node.y = y;
        }
        if let Some(config) = self.config {
            node.config = config;
        }
        if let Some(is_breakpoint) = self.is_breakpoint {
            node.is_breakpoint = is_breakpoint;
        }
    }
}

/// Partial update for a workflow's own fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowUpdate {
    pub name: Option<String>,
    pub scope: Option<WorkflowScope>,
}

/// Partial update for a parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUpdate {
    pub name: Option<String>,
    pub param_type: Option<ParameterType>,
}
