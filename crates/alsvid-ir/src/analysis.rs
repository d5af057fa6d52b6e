//! Qubit-usage analysis.
//!
//! Set-based reasoning over which qubit resources an operation touches.
//! Two operations with disjoint qubit sets act on independent resources
//! and may be treated as unordered by scheduling consumers.
//!
//! All functions take `&Graph` only: the analysis is read-only, reentrant
//! and never caches across mutation; every set is recomputed on demand.

use std::collections::BTreeSet;

use crate::graph::{Graph, OpId, ValueId};
use crate::op::OpKind;
use crate::qubit::QubitId;

/// A derived, duplicate-free set of qubit ids.
///
/// `BTreeSet` keeps iteration in declaration order, which makes analysis
/// results deterministic.
pub type QubitSet = BTreeSet<QubitId>;

/// The qubit ids an operation reports directly, without descending into
/// its regions.
///
/// A declaration reports its own id; every other qualifying operation
/// reports the ids behind its qubit-typed operands. Operands whose
/// declaration cannot be traced (for example after lowering has replaced
/// it) contribute nothing.
pub fn reported_qubits(graph: &Graph, op: OpId) -> QubitSet {
    let data = &graph[op];
    match &data.kind {
        OpKind::DeclareQubit { id, .. } => std::iter::once(*id).collect(),
        kind if kind.exposes_qubits() => data
            .operands
            .iter()
            .filter_map(|&operand| declared_id(graph, operand))
            .collect(),
        _ => QubitSet::new(),
    }
}

/// All qubit ids operated on by `op`, including its nested regions.
///
/// Depth-first descent with an explicit stack. At each node, the first
/// qubit-exposing operation encountered claims its qubits and its own
/// nested content is not descended further: the outermost claim wins,
/// which prevents double counting. With `ignore_self` the root's own
/// claim is skipped even if it qualifies, so only descendants contribute.
pub fn operated_qubits(graph: &Graph, op: OpId, ignore_self: bool) -> QubitSet {
    let mut qubits = QubitSet::new();
    let mut stack: Vec<OpId> = Vec::new();
    if ignore_self {
        push_region_ops(graph, op, &mut stack);
    } else {
        stack.push(op);
    }
    while let Some(cur) = stack.pop() {
        if graph[cur].kind.exposes_qubits() {
            qubits.extend(reported_qubits(graph, cur));
            continue;
        }
        push_region_ops(graph, cur, &mut stack);
    }
    qubits
}

/// The first qubit-exposing operation following `op` in its block, if any.
pub fn next_qubit_op(graph: &Graph, op: OpId) -> Option<OpId> {
    let mut cur = op;
    while let Some(next) = graph.next_op(cur) {
        if graph[next].kind.exposes_qubits() {
            return Some(next);
        }
        cur = next;
    }
    None
}

/// Set intersection.
pub fn shared_qubits(first: &QubitSet, second: &QubitSet) -> QubitSet {
    first.intersection(second).copied().collect()
}

/// Set union.
pub fn union_qubits(first: &QubitSet, second: &QubitSet) -> QubitSet {
    first.union(second).copied().collect()
}

/// Whether two qubit sets intersect.
pub fn sets_overlap(first: &QubitSet, second: &QubitSet) -> bool {
    !shared_qubits(first, second).is_empty()
}

/// Qubits operated by both operations (regions included).
pub fn shared_qubits_of(graph: &Graph, first: OpId, second: OpId) -> QubitSet {
    shared_qubits(
        &operated_qubits(graph, first, false),
        &operated_qubits(graph, second, false),
    )
}

/// Whether two operations touch at least one common qubit.
pub fn ops_share_qubits(graph: &Graph, first: OpId, second: OpId) -> bool {
    !shared_qubits_of(graph, first, second).is_empty()
}

/// The union of qubits operated by every operation strictly between
/// `first` and `second` in their shared block.
///
/// Returns the empty set when `second` does not strictly follow `first`
/// in the same block. If the block ends before `second` is reached, the
/// accumulation is discarded and the empty set is returned as well;
/// callers must tolerate this rather than reading it as "no qubits in
/// between".
pub fn qubits_between(graph: &Graph, first: OpId, second: OpId) -> QubitSet {
    if !graph.is_before(first, second) {
        return QubitSet::new();
    }
    let mut accumulated = QubitSet::new();
    let mut cur = graph.next_op(first);
    while let Some(op) = cur {
        if op == second {
            return accumulated;
        }
        accumulated.extend(operated_qubits(graph, op, false));
        cur = graph.next_op(op);
    }
    QubitSet::new()
}

fn push_region_ops(graph: &Graph, op: OpId, stack: &mut Vec<OpId>) {
    let data = &graph[op];
    for &region in data.regions.iter().rev() {
        stack.extend(graph.block_ops(region).iter().rev().copied());
    }
}

fn declared_id(graph: &Graph, value: ValueId) -> Option<QubitId> {
    let mut cur = value;
    loop {
        let def = graph.def(cur)?;
        match &graph[def].kind {
            OpKind::DeclareQubit { id, .. } => return Some(*id),
            // Materialization casts forward the underlying declaration.
            OpKind::Cast => cur = *graph[def].operands.first()?,
            _ => return None,
        }
    }
}
