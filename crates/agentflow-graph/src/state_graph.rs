use std::collections::{HashMap, HashSet, VecDeque};

use agentflow_core::error::{FlowError, GraphError, Result};
use serde_json::Value;

use crate::channel::{AggregateOp, ChannelSpec};
use crate::compiled::CompiledStateGraph;
use crate::constants::{END, START, is_sentinel};
use crate::edge::{ConditionalEdge, Edge, SendEdge};
use crate::node::NodeFn;

/// Builder for constructing a state graph.
///
/// Edge endpoints are validated when the edge is added, so nodes must be
/// added before the edges that reference them. `compile()` checks the entry
/// and reachability and produces an immutable `CompiledStateGraph`.
#[derive(Default)]
pub struct StateGraph {
    channel_specs: HashMap<String, ChannelSpec>,
    nodes: HashMap<String, NodeFn>,
    edges: Vec<Edge>,
    conditional_edges: Vec<ConditionalEdge>,
    send_edges: Vec<SendEdge>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare how a state field merges updates.
    pub fn add_channel(&mut self, name: impl Into<String>, spec: ChannelSpec) -> &mut Self {
        self.channel_specs.insert(name.into(), spec);
        self
    }

    /// Convenience: add a `LastValue` channel with the given default.
    pub fn add_last_value_channel(&mut self, name: impl Into<String>, default: Value) -> &mut Self {
        self.add_channel(name, ChannelSpec::LastValue { default })
    }

    /// Convenience: add an `AppendChannel`.
    pub fn add_append_channel(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_channel(name, ChannelSpec::Append)
    }

    /// Convenience: add a `BinaryOperatorAggregate` channel.
    pub fn add_binary_operator_channel(
        &mut self,
        name: impl Into<String>,
        default: Value,
        op: AggregateOp,
    ) -> &mut Self {
        self.add_channel(name, ChannelSpec::BinaryOperator { default, op })
    }

    /// Add a node to the graph.
    ///
    /// Fails with `DuplicateNode` if the name is taken and `InvalidGraph`
    /// for the reserved sentinel names.
    pub fn add_node(&mut self, node: NodeFn) -> Result<&mut Self> {
        let name = node.name().to_string();

        if is_sentinel(&name) {
            return Err(GraphError::InvalidGraph(format!(
                "Cannot add node with reserved name '{name}'"
            ))
            .into());
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name).into());
        }

        self.nodes.insert(name, node);
        Ok(self)
    }

    /// Add a static edge. `from` may be `START` and `to` may be `END`.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<&mut Self> {
        let edge = Edge::new(from, to);
        self.check_source(&edge.from, "edge source")?;
        self.check_target(&edge.to, "edge target")?;
        self.edges.push(edge);
        Ok(self)
    }

    /// Add a router-guarded edge. Every destination in its path map must
    /// already be declared.
    pub fn add_conditional_edges(&mut self, edge: ConditionalEdge) -> Result<&mut Self> {
        self.check_source(&edge.from, "conditional edge source")?;
        for target in edge.targets() {
            self.check_target(target, "conditional edge target")?;
        }
        self.conditional_edges.push(edge);
        Ok(self)
    }

    /// Add a dynamic fan-out edge.
    pub fn add_send_edges(&mut self, edge: SendEdge) -> Result<&mut Self> {
        self.check_source(&edge.from, "send edge source")?;
        for target in edge.targets() {
            if target == END {
                return Err(GraphError::InvalidGraph(format!(
                    "Send edge from '{}' cannot target END",
                    edge.from
                ))
                .into());
            }
            self.check_target(target, "send edge target")?;
        }
        self.send_edges.push(edge);
        Ok(self)
    }

    /// Sugar for `add_edge(START, node)`. Calling it more than once gives a
    /// parallel entry.
    pub fn set_entry_point(&mut self, node: impl Into<String>) -> Result<&mut Self> {
        self.add_edge(START, node)
    }

    /// Sugar for `add_edge(node, END)`.
    pub fn set_finish_point(&mut self, node: impl Into<String>) -> Result<&mut Self> {
        self.add_edge(node, END)
    }

    fn check_source(&self, name: &str, context: &str) -> Result<()> {
        if name == START || self.nodes.contains_key(name) {
            return Ok(());
        }
        Err(unknown(name, context))
    }

    fn check_target(&self, name: &str, context: &str) -> Result<()> {
        if name == END || self.nodes.contains_key(name) {
            return Ok(());
        }
        Err(unknown(name, context))
    }

    /// Validate the graph and produce a `CompiledStateGraph`.
    pub fn compile(self) -> Result<CompiledStateGraph> {
        let has_entry = self.edges.iter().any(|e| e.from == START)
            || self.conditional_edges.iter().any(|e| e.from == START)
            || self.send_edges.iter().any(|e| e.from == START);
        if !has_entry {
            return Err(GraphError::InvalidGraph("Entry point not set".to_string()).into());
        }

        self.validate_reachability()?;

        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        for edge in self.edges {
            let targets = edges.entry(edge.from).or_default();
            if !targets.contains(&edge.to) {
                targets.push(edge.to);
            }
        }

        let mut conditional_edges: HashMap<String, Vec<ConditionalEdge>> = HashMap::new();
        for edge in self.conditional_edges {
            conditional_edges.entry(edge.from.clone()).or_default().push(edge);
        }

        let mut send_edges: HashMap<String, Vec<SendEdge>> = HashMap::new();
        for edge in self.send_edges {
            send_edges.entry(edge.from.clone()).or_default().push(edge);
        }

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            edges,
            conditional_edges,
            send_edges,
            channel_specs: self.channel_specs,
        })
    }

    /// BFS from `START`; conditional destinations and send targets count as
    /// reachable.
    fn validate_reachability(&self) -> Result<()> {
        let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            adj.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
        }
        for edge in &self.conditional_edges {
            adj.entry(edge.from.as_str()).or_default().extend(edge.targets());
        }
        for edge in &self.send_edges {
            adj.entry(edge.from.as_str()).or_default().extend(edge.targets());
        }

        let mut visited: HashSet<&str> = HashSet::from([START]);
        let mut queue: VecDeque<&str> = VecDeque::from([START]);
        while let Some(current) = queue.pop_front() {
            for &next in adj.get(current).into_iter().flatten() {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut unreachable: Vec<&String> = self
            .nodes
            .keys()
            .filter(|name| !visited.contains(name.as_str()))
            .collect();
        unreachable.sort();
        match unreachable.first() {
            Some(node) => Err(GraphError::UnreachableNode {
                node: node.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

fn unknown(name: &str, context: &str) -> FlowError {
    GraphError::UnknownNode {
        node: name.to_string(),
        context: context.to_string(),
    }
    .into()
}
