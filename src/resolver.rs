//! Dependency resolution: turns the wired cell graph into a unit schedule.
//!
//! Units are nodes; a connection from a cell owned by `U` to a cell owned by
//! `V` is an edge `U -> V`. A unit's inputs are assumed to reach all of its
//! outputs. Strongly connected components become groups, and groups are
//! topologically sorted with placement order breaking ties, so the result is
//! stable for a given placement.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;

use crate::cell::CellGraph;
use crate::unit::UnitId;

/// Ordered groups of units. Every unit appears in exactly one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOrder {
    groups: Vec<Vec<UnitId>>,
    group_of: Vec<usize>,
}

impl ExecutionOrder {
    #[must_use]
    pub fn groups(&self) -> &[Vec<UnitId>] {
        &self.groups
    }

    /// Position of the group containing `unit`.
    #[must_use]
    pub fn group_of(&self, unit: UnitId) -> Option<usize> {
        self.group_of.get(unit.index()).copied()
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Units in execution order.
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.groups.iter().flatten().copied()
    }
}

/// Resolve the execution order for `unit_count` units from the live
/// connections in `graph`.
#[must_use]
pub fn resolve(graph: &CellGraph, unit_count: usize) -> ExecutionOrder {
    let edges = graph.connections().filter_map(|(from, to)| {
        let source = graph.owner(from)?;
        let target = graph.owner(to)?;
        Some((source, target))
    });
    resolve_edges(unit_count, edges)
}

/// Resolve an execution order from explicit unit-level edges. Edges naming
/// units outside `0..unit_count` are ignored.
#[must_use]
pub fn resolve_edges(
    unit_count: usize,
    edges: impl IntoIterator<Item = (UnitId, UnitId)>,
) -> ExecutionOrder {
    let mut adjacency = vec![Vec::new(); unit_count];
    for (from, to) in edges {
        if from.index() >= unit_count || to.index() >= unit_count {
            continue;
        }
        if let Some(targets) = adjacency.get_mut(from.index()) {
            targets.push(to.index());
        }
    }
    for targets in &mut adjacency {
        targets.sort_unstable();
        targets.dedup();
    }

    let (component_of, components) = strongly_connected(&adjacency);
    let order = condensed_order(&adjacency, &component_of, &components);

    let mut groups = Vec::with_capacity(order.len());
    let mut group_of = vec![0; unit_count];
    for component in order {
        let Some(members) = components.get(component) else {
            continue;
        };
        for &member in members {
            if let Some(slot) = group_of.get_mut(member) {
                *slot = groups.len();
            }
        }
        groups.push(members.iter().map(|&m| UnitId(index_to_u32(m))).collect());
    }
    debug!("resolved {unit_count} units into {} groups", groups.len());
    ExecutionOrder { groups, group_of }
}

fn index_to_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

struct Frame {
    node: usize,
    next_edge: usize,
}

/// Iterative Tarjan. Returns the component of every node and the members of
/// every component, each sorted by node index.
#[expect(
    clippy::indexing_slicing,
    reason = "Every index is a node id below adjacency.len(), checked on entry."
)]
fn strongly_connected(adjacency: &[Vec<usize>]) -> (Vec<usize>, Vec<Vec<usize>>) {
    const UNVISITED: usize = usize::MAX;
    let n = adjacency.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut component_of = vec![0; n];
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut counter = 0;

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        let mut call_stack = vec![Frame {
            node: root,
            next_edge: 0,
        }];
        index[root] = counter;
        lowlink[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(frame) = call_stack.last_mut() {
            let node = frame.node;
            if let Some(&next) = adjacency[node].get(frame.next_edge) {
                frame.next_edge += 1;
                if index[next] == UNVISITED {
                    index[next] = counter;
                    lowlink[next] = counter;
                    counter += 1;
                    stack.push(next);
                    on_stack[next] = true;
                    call_stack.push(Frame {
                        node: next,
                        next_edge: 0,
                    });
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
                continue;
            }

            call_stack.pop();
            if let Some(parent) = call_stack.last() {
                lowlink[parent.node] = lowlink[parent.node].min(lowlink[node]);
            }
            if lowlink[node] == index[node] {
                let mut members = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component_of[member] = components.len();
                    members.push(member);
                    if member == node {
                        break;
                    }
                }
                members.sort_unstable();
                components.push(members);
            }
        }
    }
    (component_of, components)
}

/// Kahn's algorithm over the condensation. Ready components are taken lowest
/// member index first.
#[expect(
    clippy::indexing_slicing,
    reason = "Component ids come from strongly_connected and are in range."
)]
fn condensed_order(
    adjacency: &[Vec<usize>],
    component_of: &[usize],
    components: &[Vec<usize>],
) -> Vec<usize> {
    let count = components.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut in_degree = vec![0_usize; count];
    for (node, targets) in adjacency.iter().enumerate() {
        let from = component_of[node];
        for &target in targets {
            let to = component_of[target];
            if from != to && !successors[from].contains(&to) {
                successors[from].push(to);
                in_degree[to] += 1;
            }
        }
    }

    // Members are sorted, so the first one is the lowest placement index.
    let key = |component: usize| components[component].first().copied().unwrap_or(usize::MAX);
    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = (0..count)
        .filter(|&c| in_degree[c] == 0)
        .map(|c| Reverse((key(c), c)))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse((_, component))) = ready.pop() {
        order.push(component);
        for &next in &successors[component] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((key(next), next)));
            }
        }
    }
    order
}
