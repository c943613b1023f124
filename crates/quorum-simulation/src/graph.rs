//! Deterministic state graph.
//!
//! Nodes and edges live in ordered sets so iteration order, and with it
//! every random draw indexed off the graph, is stable across runs.

use std::collections::BTreeSet;

use quorum_chain::artifact_hash;

use quorum_types::{MetricKind, ThresholdEvent};

use crate::error::SimulationError;

/// Cap on synthesized nodes so large events stay cheap to model.
const MAX_SYNTH_NODES: usize = 200;

/// Directed graph over string node ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateGraph {
    nodes: BTreeSet<String>,
    edges: BTreeSet<(String, String)>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph representation of the state a threshold event
    /// observed. The shape depends on the metric: file counts become a
    /// star from the root, directory depth a chain, self-references
    /// self-looping nodes, anything else a single annotated node.
    pub fn from_event(event: &ThresholdEvent) -> Self {
        let mut graph = Self::new();
        graph.add_node("root");

        match event.metric {
            MetricKind::FileCount => {
                let count = (event.value as usize).min(MAX_SYNTH_NODES);
                for i in 0..count {
                    let id = format!("file_{i}");
                    graph.add_node(&id);
                    graph.add_edge("root", &id);
                }
            }
            MetricKind::DirectoryDepth => {
                let depth = (event.value as usize).min(MAX_SYNTH_NODES);
                let mut parent = "root".to_string();
                for level in 0..depth {
                    let id = format!("dir_level_{level}");
                    graph.add_node(&id);
                    graph.add_edge(&parent, &id);
                    parent = id;
                }
            }
            MetricKind::SelfReference => {
                let count = (event.value as usize).min(MAX_SYNTH_NODES);
                for i in 0..count {
                    let id = format!("self_ref_{i}");
                    graph.add_node(&id);
                    graph.add_edge("root", &id);
                    graph.add_edge(&id, &id);
                }
            }
            _ => {
                graph.add_node("generic_state");
                graph.add_edge("root", "generic_state");
            }
        }
        graph
    }

    pub fn add_node(&mut self, id: impl Into<String>) {
        self.nodes.insert(id.into());
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        self.edges.insert((from, to));
    }

    pub fn remove_edge(&mut self, from: &str, to: &str) {
        self.edges.remove(&(from.to_string(), to.to_string()));
    }

    pub fn remove_node(&mut self, id: &str) {
        self.nodes.remove(id);
        self.edges.retain(|(from, to)| from != id && to != id);
    }

    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &(String, String)> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn successors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.edges
            .iter()
            .filter(move |(from, _)| from == id)
            .map(|(_, to)| to)
    }

    /// Nth node in deterministic order.
    pub fn node_at(&self, index: usize) -> Option<&String> {
        self.nodes.iter().nth(index)
    }

    /// Reproducible 16-hex hash of the node and edge sets.
    pub fn state_hash(&self) -> Result<String, SimulationError> {
        let shape = (
            self.nodes.iter().collect::<Vec<_>>(),
            self.edges.iter().collect::<Vec<_>>(),
        );
        Ok(artifact_hash(&shape, &[], 16)?)
    }

    /// Reversibility of reaching `self` from `initial`, as one minus the
    /// normalized edit distance: the fewer node/edge operations needed
    /// to revert, the closer to 1.
    pub fn reversibility_from(&self, initial: &StateGraph) -> f64 {
        let nodes_added = self.nodes.difference(&initial.nodes).count();
        let nodes_removed = initial.nodes.difference(&self.nodes).count();
        let edges_added = self.edges.difference(&initial.edges).count();
        let edges_removed = initial.edges.difference(&self.edges).count();

        let operations = nodes_added + nodes_removed + edges_added + edges_removed;
        let ceiling =
            initial.nodes.len() + self.nodes.len() + initial.edges.len() + self.edges.len();
        if ceiling == 0 {
            return 1.0;
        }
        1.0 - (operations as f64 / ceiling as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use quorum_types::Severity;

    fn event(metric: MetricKind, value: f64) -> ThresholdEvent {
        ThresholdEvent::new(metric, value, 100.0, Severity::Critical, "/t", BTreeMap::new())
            .unwrap()
    }

    #[test]
    fn file_count_builds_a_star() {
        let graph = StateGraph::from_event(&event(MetricKind::FileCount, 10.0));
        assert_eq!(graph.node_count(), 11);
        assert_eq!(graph.edge_count(), 10);
        assert_eq!(graph.successors("root").count(), 10);
    }

    #[test]
    fn directory_depth_builds_a_chain() {
        let graph = StateGraph::from_event(&event(MetricKind::DirectoryDepth, 4.0));
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.successors("root").count(), 1);
        assert_eq!(graph.successors("dir_level_3").count(), 0);
    }

    #[test]
    fn self_reference_builds_self_loops() {
        let graph = StateGraph::from_event(&event(MetricKind::SelfReference, 3.0));
        assert!(graph.edges().any(|(from, to)| from == to));
    }

    #[test]
    fn node_synthesis_is_capped() {
        let graph = StateGraph::from_event(&event(MetricKind::FileCount, 100_000.0));
        assert_eq!(graph.node_count(), MAX_SYNTH_NODES + 1);
    }

    #[test]
    fn identical_graphs_are_fully_reversible() {
        let graph = StateGraph::from_event(&event(MetricKind::FileCount, 10.0));
        assert_eq!(graph.reversibility_from(&graph), 1.0);
        assert_eq!(StateGraph::new().reversibility_from(&StateGraph::new()), 1.0);
    }

    #[test]
    fn heavier_edits_lower_reversibility() {
        let initial = StateGraph::from_event(&event(MetricKind::FileCount, 10.0));

        let mut light = initial.clone();
        light.remove_edge("root", "file_0");

        let mut heavy = initial.clone();
        for i in 0..5 {
            heavy.remove_node(&format!("file_{i}"));
        }

        assert!(light.reversibility_from(&initial) > heavy.reversibility_from(&initial));
    }

    #[test]
    fn state_hash_tracks_shape() {
        let a = StateGraph::from_event(&event(MetricKind::FileCount, 10.0));
        let b = StateGraph::from_event(&event(MetricKind::FileCount, 10.0));
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());

        let mut c = a.clone();
        c.add_edge("root", "extra");
        assert_ne!(a.state_hash().unwrap(), c.state_hash().unwrap());
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut graph = StateGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.remove_node("b");
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 2);
    }
}
