use std::collections::BTreeMap;
use std::sync::Arc;

use agentflow_checkpoint::send::SendDirective;
use agentflow_core::error::{GraphError, Result};
use serde_json::Value;

/// A static edge connecting two nodes.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

type RouteFn = dyn Fn(&Value) -> Vec<String> + Send + Sync;

/// An edge whose destinations are chosen by a router over the state.
///
/// The router returns labels; each label must appear in the declared
/// `path_map`, which maps it to a node name or `END`.
#[derive(Clone)]
pub struct ConditionalEdge {
    pub from: String,
    route_fn: Arc<RouteFn>,
    path_map: BTreeMap<String, String>,
}

impl ConditionalEdge {
    /// A router returning a single label.
    pub fn new<F, I, K, V>(from: impl Into<String>, route_fn: F, path_map: I) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::multi(from, move |state: &Value| vec![route_fn(state)], path_map)
    }

    /// A router returning any number of labels; every destination fires.
    pub fn multi<F, I, K, V>(from: impl Into<String>, route_fn: F, path_map: I) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            from: from.into(),
            route_fn: Arc::new(route_fn),
            path_map: path_map
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn path_map(&self) -> &BTreeMap<String, String> {
        &self.path_map
    }

    /// Every declared destination.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.path_map.values().map(String::as_str)
    }

    /// Resolve the destinations for the given state.
    ///
    /// Fails with `GraphError::Router` on a label outside the path map.
    pub fn resolve(&self, state: &Value) -> Result<Vec<String>> {
        (self.route_fn)(state)
            .into_iter()
            .map(|label| match self.path_map.get(&label) {
                Some(target) => Ok(target.clone()),
                None => Err(GraphError::Router {
                    node: self.from.clone(),
                    label,
                }
                .into()),
            })
            .collect()
    }
}

impl std::fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("path_map", &self.path_map)
            .finish()
    }
}

type SendFn = dyn Fn(&Value) -> Vec<SendDirective> + Send + Sync;

/// An edge that fans out dynamically: the router returns one
/// [`SendDirective`] per task to run, each with its own private input.
#[derive(Clone)]
pub struct SendEdge {
    pub from: String,
    send_fn: Arc<SendFn>,
    targets: Vec<String>,
}

impl SendEdge {
    /// `targets` declares every node the router may send to.
    pub fn new<F, I, S>(from: impl Into<String>, send_fn: F, targets: I) -> Self
    where
        F: Fn(&Value) -> Vec<SendDirective> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: from.into(),
            send_fn: Arc::new(send_fn),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// Resolve the directives for the given state.
    ///
    /// Fails with `GraphError::Router` when a directive names an undeclared
    /// target.
    pub fn resolve(&self, state: &Value) -> Result<Vec<SendDirective>> {
        let sends = (self.send_fn)(state);
        if let Some(bad) = sends.iter().find(|s| !self.targets.contains(&s.node)) {
            return Err(GraphError::Router {
                node: self.from.clone(),
                label: bad.node.clone(),
            }
            .into());
        }
        Ok(sends)
    }
}

impl std::fmt::Debug for SendEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish()
    }
}
