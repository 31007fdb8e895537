// src/core/call_graph/call_graph.rs
use std::collections::{BTreeMap, BTreeSet, HashSet};
use serde::{Serialize, Deserialize};

use super::super::CallSet;

/// Edge in the call graph representing "caller invokes callee"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    /// Function making the call
    pub caller: String,
    /// Function being called
    pub callee: String,
}

/// Directed call graph for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallGraph {
    /// All nodes (functions) in the graph
    nodes: BTreeSet<String>,
    /// All edges (calls) in the graph
    edges: BTreeSet<CallEdge>,
    /// Adjacency list (who this function calls)
    #[serde(skip)]
    adjacency_list: BTreeMap<String, BTreeSet<String>>,
    /// Reverse adjacency list (who calls this function)
    #[serde(skip)]
    reverse_adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the call graph from an extracted call mapping
    pub fn from_call_set(calls: &CallSet) -> Self {
        let mut graph = Self::new();

        // Every function is a node, even when it calls nothing
        for name in calls.names() {
            graph.add_node(name);
        }

        for (caller, callees) in calls {
            for callee in callees {
                graph.add_edge(caller, callee);
            }
        }

        graph
    }

    /// Add a function node to the graph
    pub fn add_node(&mut self, name: &str) {
        self.nodes.insert(name.to_string());
    }

    /// Add a call edge between two existing nodes.
    ///
    /// Returns false, leaving the graph untouched, when either endpoint is
    /// not a node.
    pub fn add_edge(&mut self, caller: &str, callee: &str) -> bool {
        if !self.nodes.contains(caller) || !self.nodes.contains(callee) {
            return false;
        }

        let inserted = self.edges.insert(CallEdge {
            caller: caller.to_string(),
            callee: callee.to_string(),
        });

        if inserted {
            self.adjacency_list
                .entry(caller.to_string())
                .or_default()
                .insert(callee.to_string());
            self.reverse_adjacency
                .entry(callee.to_string())
                .or_default()
                .insert(caller.to_string());
        }

        true
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = &CallEdge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn contains_edge(&self, caller: &str, callee: &str) -> bool {
        self.adjacency_list
            .get(caller)
            .map_or(false, |callees| callees.contains(callee))
    }

    /// Get functions that this function calls (outgoing edges)
    pub fn get_callees(&self, name: &str) -> Vec<&str> {
        self.adjacency_list.get(name)
            .map(|callees| callees.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Get functions that call this function (incoming edges)
    pub fn get_callers(&self, name: &str) -> Vec<&str> {
        self.reverse_adjacency.get(name)
            .map(|callers| callers.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Get in-degree (number of callers)
    pub fn in_degree(&self, name: &str) -> usize {
        self.reverse_adjacency.get(name).map_or(0, BTreeSet::len)
    }

    /// Get out-degree (number of callees)
    pub fn out_degree(&self, name: &str) -> usize {
        self.adjacency_list.get(name).map_or(0, BTreeSet::len)
    }

    /// Get all entry point candidates (in-degree = 0, out-degree > 0)
    pub fn get_entry_point_candidates(&self) -> Vec<&str> {
        self.nodes()
            .filter(|name| self.in_degree(name) == 0 && self.out_degree(name) > 0)
            .collect()
    }

    /// Functions with neither callers nor callees
    pub fn get_isolated_nodes(&self) -> Vec<&str> {
        self.nodes()
            .filter(|name| self.in_degree(name) == 0 && self.out_degree(name) == 0)
            .collect()
    }

    /// Detect cycles in the call graph using DFS; a self-call is a cycle of one.
    ///
    /// The search keeps its own stack so long call chains cannot exhaust the
    /// thread stack.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for root in self.nodes() {
            if visited.contains(root) {
                continue;
            }

            visited.insert(root);
            rec_stack.insert(root);
            // Current path, each node with the callees it has yet to explore
            let mut current_path = vec![(root, self.pending_callees(root))];

            while let Some(frame) = current_path.last_mut() {
                let node = frame.0;
                let next = frame.1.pop();

                match next {
                    Some(callee) if !visited.contains(callee) => {
                        visited.insert(callee);
                        rec_stack.insert(callee);
                        current_path.push((callee, self.pending_callees(callee)));
                    }
                    Some(callee) if rec_stack.contains(callee) => {
                        if let Some(cycle_start) = current_path.iter().position(|(n, _)| *n == callee) {
                            let cycle = current_path[cycle_start..]
                                .iter()
                                .map(|(n, _)| n.to_string())
                                .collect();
                            cycles.push(cycle);
                        }
                    }
                    Some(_) => {}
                    None => {
                        rec_stack.remove(node);
                        current_path.pop();
                    }
                }
            }
        }

        cycles
    }

    /// Callees in reverse order, so popping visits them in sorted order
    fn pending_callees(&self, name: &str) -> Vec<&str> {
        let mut callees = self.get_callees(name);
        callees.reverse();
        callees
    }

    /// Get statistics about the call graph
    pub fn get_statistics(&self) -> CallGraphStats {
        CallGraphStats {
            total_functions: self.nodes.len(),
            total_calls: self.edges.len(),
            entry_points: self.get_entry_point_candidates().len(),
            isolated: self.get_isolated_nodes().len(),
            self_calls: self.edges.iter().filter(|e| e.caller == e.callee).count(),
            cycles: self.detect_cycles().len(),
            max_in_degree: self.nodes().map(|n| self.in_degree(n)).max().unwrap_or(0),
            max_out_degree: self.nodes().map(|n| self.out_degree(n)).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphStats {
    pub total_functions: usize,
    pub total_calls: usize,
    pub entry_points: usize,
    pub isolated: usize,
    pub self_calls: usize,
    pub cycles: usize,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_set(entries: &[(&str, Vec<&str>)]) -> CallSet {
        let mut calls = CallSet::new();
        for (name, _) in entries {
            calls.insert_function(name);
        }
        for (name, callees) in entries {
            let callees: BTreeSet<String> = callees.iter().map(|c| c.to_string()).collect();
            calls.set_callees(name, callees);
        }
        calls
    }

    #[test]
    fn isolated_functions_are_nodes() {
        let graph = CallGraph::from_call_set(&call_set(&[("a", vec!["b"]), ("b", vec![]), ("c", vec![])]));

        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge("a", "b"));
        assert_eq!(graph.get_isolated_nodes(), vec!["c"]);
        assert_eq!(graph.out_degree("b"), 0);
    }

    #[test]
    fn rejects_dangling_edges() {
        let mut graph = CallGraph::new();
        graph.add_node("a");

        assert!(!graph.add_edge("a", "ghost"));
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains_node("ghost"));
    }

    #[test]
    fn repeated_edges_collapse() {
        let mut graph = CallGraph::new();
        graph.add_node("a");
        graph.add_node("b");
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.get_callers("b"), vec!["a"]);
    }

    #[test]
    fn entry_points_and_cycles() {
        let graph = CallGraph::from_call_set(&call_set(&[
            ("main", vec!["load"]),
            ("load", vec!["parse"]),
            ("parse", vec!["load"]),
            ("loop", vec!["loop"]),
        ]));

        assert_eq!(graph.get_entry_point_candidates(), vec!["main"]);

        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["load".to_string(), "parse".to_string()]));
        assert!(cycles.contains(&vec!["loop".to_string()]));

        let stats = graph.get_statistics();
        assert_eq!(stats.total_functions, 4);
        assert_eq!(stats.total_calls, 4);
        assert_eq!(stats.self_calls, 1);
        assert_eq!(stats.max_in_degree, 2);
    }

    #[test]
    fn long_call_chains_do_not_exhaust_the_stack() {
        let names: Vec<String> = (0..200_000).map(|i| format!("f{}", i)).collect();
        let mut graph = CallGraph::new();
        for name in &names {
            graph.add_node(name);
        }
        for pair in names.windows(2) {
            graph.add_edge(&pair[0], &pair[1]);
        }
        graph.add_edge(&names[names.len() - 1], &names[0]);

        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), names.len());
    }
}
