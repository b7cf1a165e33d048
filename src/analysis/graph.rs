use std::{
    collections::{BTreeSet, HashMap},
    fmt::Debug,
    hash::Hash,
};

use crate::hardware::{CommandId, CoreModel};

/// The graph has a cycle; `remaining` lists the nodes that could not be
/// ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<Node> {
    pub remaining: Vec<Node>,
}

/// Compute topological order of nodes using BFS.
///
/// Among the nodes ready at the same time, the one listed first in `nodes`
/// is emitted first, so the result is deterministic.
pub fn topo<Node: Copy + Eq + Hash + Debug>(
    nodes: &[Node],
    edges: &[(Node, Node)],
) -> Result<Vec<Node>, Cycle<Node>> {
    let position: HashMap<Node, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let mut degree = vec![0usize; nodes.len()];
    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (from, to) in edges {
        let (Some(&from), Some(&to)) = (position.get(from), position.get(to)) else {
            panic!("edge {:?} -> {:?} refers to a node not in the graph", from, to)
        };
        succ[from].push(to);
        degree[to] += 1;
    }

    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(head) = ready.pop_first() {
        order.push(nodes[head]);
        for &to in &succ[head] {
            degree[to] -= 1;
            if degree[to] == 0 {
                ready.insert(to);
            }
        }
    }

    if order.len() != nodes.len() {
        let remaining = (0..nodes.len())
            .filter(|&i| degree[i] > 0)
            .map(|i| nodes[i])
            .collect();
        return Err(Cycle { remaining });
    }
    Ok(order)
}

/// Dependency graph among the commands of one line.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<CommandId>,
    edges: Vec<(CommandId, CommandId)>,
}

impl DependencyGraph {
    /// `A -> B` whenever a component changed by `A` is read by `B`. A
    /// command listed twice only keeps its first occurrence.
    pub fn build(core: &CoreModel, commands: &[CommandId]) -> Self {
        let mut graph = Self::default();
        for &cmd in commands {
            if !graph.nodes.contains(&cmd) {
                graph.nodes.push(cmd);
            }
        }
        for &a in &graph.nodes {
            for &b in &graph.nodes {
                if a != b && core.command(a).feeds(core.command(b)) {
                    graph.edges.push((a, b));
                }
            }
        }
        graph
    }

    pub fn nodes(&self) -> &[CommandId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(CommandId, CommandId)] {
        &self.edges
    }

    pub fn order(&self) -> Result<Vec<CommandId>, Cycle<CommandId>> {
        topo(&self.nodes, &self.edges)
    }
}
