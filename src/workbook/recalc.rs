//! Dependency ordering of the formula registry

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::cells::CellAddress;
use crate::error::{EngineError, Result};

use super::formulas::FormulaRegistry;

/// Order registry cells so every formula comes after the formulas it reads
///
/// Kahn's algorithm; among ready cells the earliest registered goes first,
/// so an already-sorted registry keeps its order. Fails with
/// `CycleDetected` naming the cells left unsorted.
pub fn evaluation_order(registry: &FormulaRegistry) -> Result<Vec<CellAddress>> {
    let entries = registry.entries();
    let mut in_degree = vec![0usize; entries.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];

    for (i, (_, formula)) in entries.iter().enumerate() {
        let mut deps: Vec<usize> = formula
            .dependencies()
            .iter()
            .filter_map(|addr| registry.position(addr))
            .collect();
        deps.sort_unstable();
        deps.dedup();
        for dep in deps {
            dependents[dep].push(i);
            in_degree[i] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(entries.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(entries[i].0);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != entries.len() {
        let stuck: Vec<String> = entries
            .iter()
            .zip(&in_degree)
            .filter(|(_, degree)| **degree > 0)
            .map(|((addr, _), _)| addr.to_string())
            .collect();
        return Err(EngineError::CycleDetected(stuck));
    }

    Ok(order)
}
