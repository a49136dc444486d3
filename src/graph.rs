//! # Dependency Graph
//!
//! Orders definitions so that every item comes after everything it needs.
//!
//! Edges run from a definition to each name in its `need` list. The order is Kahn's algorithm
//! with the ready set kept as a min-heap over the original positions: among definitions that are
//! free to go, the one declared first goes first. The same input therefore always produces the
//! same order.
//!
//! When Kahn's algorithm stalls the remaining definitions contain a cycle. The members are
//! reported by running Tarjan's strongly-connected-components search over the graph.

use crate::definition::ItemDefinition;
use crate::error::HolderError;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Fails on the first name that appears twice.
pub fn check_unique_definitions<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), HolderError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(HolderError::DuplicateDefinition(name.to_string()));
        }
    }
    Ok(())
}

/// Returns the definitions in build order.
///
/// Expects unique names. Fails with [`HolderError::UnresolvedNeed`] when a `need` names no
/// definition, and with [`HolderError::CyclicDependency`] when no order exists.
pub fn sort_definitions(
    definitions: Vec<ItemDefinition>,
) -> Result<Vec<ItemDefinition>, HolderError> {
    let order = build_order(&definitions)?;
    let mut slots: Vec<Option<ItemDefinition>> = definitions.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

fn build_order(definitions: &[ItemDefinition]) -> Result<Vec<usize>, HolderError> {
    let index: HashMap<&str, usize> = definitions
        .iter()
        .enumerate()
        .map(|(i, def)| (def.name(), i))
        .collect();

    let mut pending = vec![0usize; definitions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); definitions.len()];
    for (i, def) in definitions.iter().enumerate() {
        for need in def.dependencies() {
            let &dependency =
                index
                    .get(need.as_str())
                    .ok_or_else(|| HolderError::UnresolvedNeed {
                        name: def.name().to_string(),
                        need: need.clone(),
                    })?;
            pending[i] += 1;
            dependents[dependency].push(i);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(definitions.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &dependent in &dependents[i] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < definitions.len() {
        return Err(HolderError::CyclicDependency(find_cycle(definitions, &index)));
    }
    Ok(order)
}

fn find_cycle(definitions: &[ItemDefinition], index: &HashMap<&str, usize>) -> Vec<String> {
    let mut graph = DiGraph::<usize, ()>::with_capacity(definitions.len(), 0);
    let nodes: Vec<NodeIndex> = (0..definitions.len()).map(|i| graph.add_node(i)).collect();
    for (i, def) in definitions.iter().enumerate() {
        for need in def.dependencies() {
            if let Some(&dependency) = index.get(need.as_str()) {
                graph.add_edge(nodes[i], nodes[dependency], ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<usize> = scc.into_iter().map(|node| graph[node]).collect();
            members.sort_unstable();
            members
                .into_iter()
                .map(|i| definitions[i].name().to_string())
                .collect()
        })
        .unwrap_or_default()
}
