//! Freeze-time structural validation (spec.md §4.2 Exit conditions, §7
//! category 1 "Configuration errors... raised eagerly at build/freeze
//! time").
//!
//! Grounded on `felipe-santos-gran-prix`'s `graph::verifier::Verifier`: a
//! standalone static pass over the unfrozen graph, run once before anything
//! executable is produced. That verifier checked tensor shape consistency;
//! this one checks DAG-ness and coupling-vector/edge-list parity instead.

use std::collections::HashSet;

use tracing::debug;

use crate::errors::{FilterError, FilterResult};
use crate::graph::EdgeList;
use crate::store::CouplingVectors;
use crate::types::NodeKind;

pub fn verify(
    kinds: &[NodeKind],
    edges: &[EdgeList],
    coupling: &[CouplingVectors],
) -> FilterResult<()> {
    debug!(nodes = kinds.len(), "verifying graph before freeze");

    verify_coupling_lengths(edges, coupling)?;
    verify_required_fields(kinds, edges)?;
    verify_acyclic(edges)?;

    debug!("graph verified");
    Ok(())
}

fn verify_coupling_lengths(edges: &[EdgeList], coupling: &[CouplingVectors]) -> FilterResult<()> {
    for (node, (e, c)) in edges.iter().zip(coupling).enumerate() {
        check_len(node, "value_children", e.value_children.len(), c.value_coupling_children.len())?;
        check_len(node, "value_parents", e.value_parents.len(), c.value_coupling_parents.len())?;
        check_len(
            node,
            "volatility_children",
            e.volatility_children.len(),
            c.volatility_coupling_children.len(),
        )?;
        check_len(
            node,
            "volatility_parents",
            e.volatility_parents.len(),
            c.volatility_coupling_parents.len(),
        )?;
    }
    Ok(())
}

fn check_len(node: usize, _field: &str, expected: usize, found: usize) -> FilterResult<()> {
    if expected != found {
        return Err(FilterError::CouplingLengthMismatch {
            node,
            expected,
            found,
        });
    }
    Ok(())
}

fn verify_required_fields(kinds: &[NodeKind], edges: &[EdgeList]) -> FilterResult<()> {
    for (i, kind) in kinds.iter().enumerate() {
        match kind {
            NodeKind::EfState { dimension } if *dimension == 0 => {
                return Err(FilterError::MissingField {
                    node: i,
                    kind: *kind,
                    field: "dimension",
                });
            }
            NodeKind::CategoricalInput { n_categories } => {
                let parents = edges[i].value_parents.len();
                if parents != *n_categories {
                    return Err(FilterError::InvariantViolation {
                        node: i,
                        message: format!(
                            "categorical input declares {n_categories} categories but has {parents} binary-state value parents"
                        ),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// DFS-based cycle check over the parent-reachability graph (value and
/// volatility parent edges combined): a node must never be reachable from
/// itself through its own ancestors.
fn verify_acyclic(edges: &[EdgeList]) -> FilterResult<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; edges.len()];

    fn visit(
        node: usize,
        edges: &[EdgeList],
        marks: &mut [Mark],
        stack: &mut HashSet<usize>,
    ) -> FilterResult<()> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InProgress => return Err(FilterError::CycleDetected(node)),
            Mark::Unvisited => {}
        }
        marks[node] = Mark::InProgress;
        stack.insert(node);

        for &parent in edges[node]
            .value_parents
            .iter()
            .chain(edges[node].volatility_parents.iter())
        {
            visit(parent.index(), edges, marks, stack)?;
        }

        stack.remove(&node);
        marks[node] = Mark::Done;
        Ok(())
    }

    let mut stack = HashSet::new();
    for node in 0..edges.len() {
        visit(node, edges, &mut marks, &mut stack)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    #[test]
    fn acyclic_chain_passes() {
        let mut a = EdgeList::default();
        let mut b = EdgeList::default();
        a.value_children.push(NodeId(1));
        b.value_parents.push(NodeId(0));
        assert!(verify_acyclic(&[a, b]).is_ok());
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut a = EdgeList::default();
        a.value_parents.push(NodeId(0));
        assert!(verify_acyclic(&[a]).is_err());
    }
}
