// ABOUTME: Dependency resolution over an execution's static edge set
// ABOUTME: Answers root, predecessor, successor, and readiness queries for the scheduler

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use super::error::{ExecutionError, Result};
use crate::graph::{EdgeSpec, GraphValidationError};

/// Predecessor/successor lookups for one execution.
///
/// Node weights are submission positions so every query can answer in
/// submission order regardless of edge insertion order.
pub struct DependencyResolver {
    graph: DiGraph<usize, ()>,
    ids: Vec<String>,
    indices: HashMap<String, NodeIndex>,
}

impl DependencyResolver {
    /// Build from node ids in submission order. Edges naming unknown nodes
    /// are ignored; duplicates collapse into one.
    pub fn new<I, S>(node_ids: I, edges: &[EdgeSpec]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = DiGraph::new();
        let mut ids = Vec::new();
        let mut indices = HashMap::new();

        for id in node_ids {
            let id = id.into();
            let index = graph.add_node(ids.len());
            indices.insert(id.clone(), index);
            ids.push(id);
        }

        for edge in edges {
            if let (Some(&from), Some(&to)) = (indices.get(&edge.source), indices.get(&edge.target))
            {
                graph.update_edge(from, to, ());
            }
        }

        Self {
            graph,
            ids,
            indices,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.indices.contains_key(node_id)
    }

    /// Nodes without predecessors
    pub fn root_nodes(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.ids[self.graph[idx]].clone())
            .collect()
    }

    pub fn predecessors_of(&self, node_id: &str) -> Vec<String> {
        self.neighbors(node_id, Direction::Incoming)
    }

    pub fn successors_of(&self, node_id: &str) -> Vec<String> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    fn neighbors(&self, node_id: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.indices.get(node_id) else {
            return Vec::new();
        };

        let mut positions: Vec<usize> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n])
            .collect();
        positions.sort_unstable();

        positions.into_iter().map(|p| self.ids[p].clone()).collect()
    }

    /// True when every predecessor of `node_id` is in `completed`
    pub fn is_ready(&self, node_id: &str, completed: &HashSet<String>) -> bool {
        let Some(&idx) = self.indices.get(node_id) else {
            return false;
        };

        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .all(|pred| completed.contains(&self.ids[self.graph[pred]]))
    }

    pub fn topological_order(&self) -> Result<Vec<String>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            ExecutionError::Graph(GraphValidationError::CycleDetected {
                nodes: vec![self.ids[self.graph[cycle.node_id()]].clone()],
            })
        })?;

        Ok(sorted
            .into_iter()
            .map(|idx| self.ids[self.graph[idx]].clone())
            .collect())
    }
}
