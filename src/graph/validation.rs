// ABOUTME: Submission-time graph validation and dependency checking
// ABOUTME: Rejects duplicate node ids, dangling edges, and cycles before any execution exists

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use super::error::GraphValidationError;
use super::workflow::WorkflowGraph;
use crate::agents::{capability_for, Agent};
use crate::tasks::WorkUnitRegistry;

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<GraphValidationError>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

pub struct GraphValidator<'a> {
    agents: Option<Vec<Agent>>,
    work_units: Option<&'a WorkUnitRegistry>,
}

impl<'a> GraphValidator<'a> {
    pub fn new() -> Self {
        Self {
            agents: None,
            work_units: None,
        }
    }

    /// Warn about node types no agent in this set can serve
    pub fn with_agents(mut self, agents: Vec<Agent>) -> Self {
        self.agents = Some(agents);
        self
    }

    /// Warn about node types without a work unit and about rejected node configs
    pub fn with_work_units(mut self, work_units: &'a WorkUnitRegistry) -> Self {
        self.work_units = Some(work_units);
        self
    }

    /// Structural validation run at submission. Stops at the first error.
    pub fn validate(&self, graph: &WorkflowGraph) -> Result<(), GraphValidationError> {
        Self::check_unique_ids(graph)?;
        Self::check_edges(graph)?;
        Self::check_acyclic(graph)?;
        Ok(())
    }

    /// Full report for tooling: structural errors plus non-fatal warnings
    pub fn report(&self, graph: &WorkflowGraph) -> ValidationReport {
        let mut report = ValidationReport::new();

        if let Err(error) = self.validate(graph) {
            report.errors.push(error);
        }

        self.check_duplicate_edges(graph, &mut report);
        self.check_isolated_nodes(graph, &mut report);
        self.check_agent_coverage(graph, &mut report);
        self.check_work_units(graph, &mut report);

        report.is_valid = report.errors.is_empty();
        report
    }

    fn check_unique_ids(graph: &WorkflowGraph) -> Result<(), GraphValidationError> {
        let mut seen = HashSet::new();
        for node in &graph.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphValidationError::DuplicateNodeId {
                    node_id: node.id.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_edges(graph: &WorkflowGraph) -> Result<(), GraphValidationError> {
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

        for edge in &graph.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(GraphValidationError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Detect cycles with petgraph; reports every node of the offending
    /// strongly connected component in submission order
    fn check_acyclic(graph: &WorkflowGraph) -> Result<(), GraphValidationError> {
        let mut dag: DiGraph<usize, ()> = DiGraph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

        for (position, node) in graph.nodes.iter().enumerate() {
            indices.insert(node.id.as_str(), dag.add_node(position));
        }

        for edge in &graph.edges {
            if let (Some(&from), Some(&to)) = (
                indices.get(edge.source.as_str()),
                indices.get(edge.target.as_str()),
            ) {
                dag.add_edge(from, to, ());
            }
        }

        if toposort(&dag, None).is_ok() {
            return Ok(());
        }

        let cyclic = tarjan_scc(&dag).into_iter().find(|component| {
            component.len() > 1
                || component
                    .first()
                    .map(|&idx| dag.contains_edge(idx, idx))
                    .unwrap_or(false)
        });

        let mut positions: Vec<usize> = cyclic
            .unwrap_or_default()
            .into_iter()
            .map(|idx| dag[idx])
            .collect();
        positions.sort_unstable();

        Err(GraphValidationError::CycleDetected {
            nodes: positions
                .into_iter()
                .map(|p| graph.nodes[p].id.clone())
                .collect(),
        })
    }

    fn check_duplicate_edges(&self, graph: &WorkflowGraph, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        for edge in &graph.edges {
            if !seen.insert((edge.source.as_str(), edge.target.as_str())) {
                report.warnings.push(format!(
                    "Duplicate edge {} -> {} is ignored",
                    edge.source, edge.target
                ));
            }
        }
    }

    fn check_isolated_nodes(&self, graph: &WorkflowGraph, report: &mut ValidationReport) {
        if graph.nodes.len() < 2 {
            return;
        }

        let connected: HashSet<&str> = graph
            .edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();

        for node in &graph.nodes {
            if !connected.contains(node.id.as_str()) {
                report
                    .warnings
                    .push(format!("Node '{}' is not connected to any other node", node.id));
            }
        }
    }

    fn check_agent_coverage(&self, graph: &WorkflowGraph, report: &mut ValidationReport) {
        let Some(ref agents) = self.agents else {
            return;
        };

        for node in &graph.nodes {
            let served = capability_for(&node.node_type)
                .map(|capability| agents.iter().any(|a| a.has_capability(capability)))
                .unwrap_or(false);

            if !served {
                report.warnings.push(format!(
                    "No agent can serve node '{}' of type '{}'; it will fail with \"no agent available\"",
                    node.id, node.node_type
                ));
            }
        }
    }

    fn check_work_units(&self, graph: &WorkflowGraph, report: &mut ValidationReport) {
        let Some(registry) = self.work_units else {
            return;
        };

        for node in &graph.nodes {
            if let Err(e) = registry.validate_config(node) {
                report
                    .warnings
                    .push(format!("Node '{}' will fail: {}", node.id, e));
            }
            if let Err(e) = node.timeout() {
                report
                    .warnings
                    .push(format!("Node '{}' has an {}", node.id, e));
            }
        }
    }
}

impl Default for GraphValidator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
