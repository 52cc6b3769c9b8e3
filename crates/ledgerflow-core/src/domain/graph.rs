//! Topological ordering over a flow graph.
//!
//! The execution order is computed once per run with Kahn's algorithm.
//! Ties are broken by step declaration order, which keeps runs
//! deterministic and test-observable.

use crate::domain::flow::{Flow, StepId};
use crate::EngineError;
use std::collections::{HashMap, VecDeque};

/// Compute the execution order for a flow.
///
/// Returns every step exactly once such that for every edge (u -> v), u
/// precedes v. Steps trapped in a dependency cycle can never reach zero
/// in-degree; rather than silently dropping them, the whole flow is
/// rejected with [`EngineError::CyclicFlow`].
pub fn execution_order(flow: &Flow) -> Result<Vec<StepId>, EngineError> {
    // Index steps by ID in declaration order
    let index_of: HashMap<&StepId, usize> = flow
        .steps
        .iter()
        .enumerate()
        .map(|(i, s)| (&s.id, i))
        .collect();

    // Calculate in-degree per step from the edge list
    let mut in_degree = vec![0usize; flow.steps.len()];
    for edge in &flow.edges {
        if let Some(&target) = index_of.get(&edge.target) {
            in_degree[target] += 1;
        }
    }

    // Queue steps with no incoming edges, in declaration order
    let mut queue: VecDeque<usize> = (0..flow.steps.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();

    let mut order = Vec::with_capacity(flow.steps.len());
    let mut visited = vec![false; flow.steps.len()];

    while let Some(current) = queue.pop_front() {
        visited[current] = true;
        order.push(flow.steps[current].id.clone());

        // Reduce in-degree of downstream steps, in edge declaration order
        for edge in &flow.edges {
            if edge.source != flow.steps[current].id {
                continue;
            }
            if let Some(&target) = index_of.get(&edge.target) {
                in_degree[target] -= 1;
                if in_degree[target] == 0 {
                    queue.push_back(target);
                }
            }
        }
    }

    if order.len() != flow.steps.len() {
        let trapped: Vec<StepId> = flow
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| !visited[*i])
            .map(|(_, s)| s.id.clone())
            .collect();

        return Err(EngineError::CyclicFlow(trapped));
    }

    Ok(order)
}
