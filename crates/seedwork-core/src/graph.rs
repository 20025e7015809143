use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Directed graph over string identifiers, indexed in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
    edges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnStack(usize),
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.intern(from);
        let to = self.intern(to);
        self.adjacency[from].push(to);
        self.edges += 1;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Report one representative cycle per DFS root.
    ///
    /// Each cycle lists the nodes along the recursion stack starting at the
    /// node that was revisited and repeats that node at the end, e.g.
    /// `[a, b, c, a]`. Traversal from a root stops at its first cycle, so this
    /// detects cycles rather than enumerating all of them. Runs in O(V+E).
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut state = vec![Visit::Unvisited; self.nodes.len()];
        let mut cycles = Vec::new();

        for root in 0..self.nodes.len() {
            if state[root] != Visit::Unvisited {
                continue;
            }

            // (node, next outgoing edge to explore)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            state[root] = Visit::OnStack(0);

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&next) = self.adjacency[node].get(frame.1) else {
                    state[node] = Visit::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match state[next] {
                    Visit::OnStack(depth) => {
                        let mut cycle: Vec<String> = stack[depth..]
                            .iter()
                            .map(|(id, _)| self.nodes[*id].clone())
                            .collect();
                        cycle.push(self.nodes[next].clone());
                        cycles.push(cycle);
                        break;
                    }
                    Visit::Unvisited => {
                        state[next] = Visit::OnStack(stack.len());
                        stack.push((next, 0));
                    }
                    Visit::Done => {}
                }
            }

            for (id, _) in stack {
                state[id] = Visit::Done;
            }
        }

        cycles
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(&existing) = self.index.get(id) {
            return existing;
        }
        let position = self.nodes.len();
        self.nodes.push(id.to_string());
        self.index.insert(id.to_string(), position);
        self.adjacency.push(Vec::new());
        position
    }
}

/// Shorthand for building a graph and running cycle detection.
pub fn find_cycles<'a, I>(edges: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    DependencyGraph::from_edges(edges).find_cycles()
}

/// Kahn topological sort; ties resolve lexicographically for determinism.
///
/// `graph` maps each node to the nodes that depend on it. On failure the
/// nodes left with unresolved inbound edges are returned.
pub fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();

    for (node, targets) in graph {
        indegree.entry(node.clone()).or_insert(0);
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| node.clone())
        .collect();

    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = ready.pop_first() {
        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
        order.push(node);
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(node, _)| node)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_node_ring_reports_one_cycle() {
        let cycles = find_cycles([("A", "B"), ("B", "C"), ("C", "A")]);
        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.first(), cycle.last());
        for node in ["A", "B", "C"] {
            assert!(cycle.iter().any(|id| id == node), "missing {node}");
        }
        assert_eq!(cycle, &["A", "B", "C", "A"]);
    }

    #[test]
    fn acyclic_graph_reports_nothing() {
        let cycles = find_cycles([("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        assert!(cycles.is_empty());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let cycles = find_cycles([("A", "A")]);
        assert_eq!(cycles, vec![vec!["A".to_string(), "A".to_string()]]);
    }

    #[test]
    fn cycle_starts_at_revisited_node() {
        let cycles = find_cycles([("X", "A"), ("A", "B"), ("B", "A")]);
        assert_eq!(cycles, vec![vec!["A", "B", "A"]]);
    }

    #[test]
    fn disjoint_cycles_are_each_reported() {
        let cycles = find_cycles([("A", "B"), ("B", "A"), ("C", "D"), ("D", "C")]);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn long_chain_does_not_overflow() {
        let ids: Vec<String> = (0..50_000).map(|i| format!("n{i}")).collect();
        let edges: Vec<(&str, &str)> = ids
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect();
        let graph = DependencyGraph::from_edges(edges);
        assert_eq!(graph.node_count(), 50_000);
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn toposort_orders_dependencies() {
        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        graph
            .entry("users".to_string())
            .or_default()
            .insert("tasks".to_string());
        graph
            .entry("organizations".to_string())
            .or_default()
            .insert("users".to_string());

        let order = toposort(&graph).expect("acyclic");
        assert_eq!(order, vec!["organizations", "users", "tasks"]);
    }

    #[test]
    fn toposort_reports_cycle() {
        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        graph
            .entry("a".to_string())
            .or_default()
            .insert("b".to_string());
        graph
            .entry("b".to_string())
            .or_default()
            .insert("a".to_string());

        let cycle = toposort(&graph).unwrap_err();
        assert_eq!(cycle, vec!["a", "b"]);
    }
}
