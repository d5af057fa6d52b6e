//! Runtime function table.
//!
//! The external simulation runtime is an opaque ABI: a fixed set of
//! functions whose bodies are supplied by the linker. The lowering only
//! declares their shapes, once per compiled unit, before any rewrite
//! rule runs.

use alsvid_ir::{Graph, InsertPoint, OpId, OpKind, Type, ValueId};
use rustc_hash::FxHashMap;

use crate::error::LowerResult;

/// The fixed runtime ABI entries.
///
/// `name()` is the portable entry name; `symbol()` is the symbol the
/// linked runtime actually exports. Argument order is part of the ABI
/// and must match bit-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    /// `() -> Handle`: create the simulation state.
    StateCreate,
    /// `(Handle, Str, Str) -> void`: set one configuration key.
    StateConfigure,
    /// `(Handle, i64) -> i64`: allocate qubits, returns the first handle.
    AllocateQubits,
    /// `(Handle) -> Handle`: initialize the state after allocation.
    StateInitialize,
    /// `(Handle, i64, f64, f64, f64) -> void`: apply U(theta, phi, lambda).
    ApplyGate1q,
    /// `(Handle, i64, i64) -> void`: apply controlled-X.
    ApplyGate2q,
    /// `(Handle, ptr<i64>, i64) -> i64`: measure the buffered qubits.
    ApplyMeasure,
    /// `(Handle) -> void`: tear the state down.
    StateFinalize,
}

impl RuntimeFn {
    /// Every ABI entry, in declaration order.
    pub const ALL: [RuntimeFn; 8] = [
        RuntimeFn::StateCreate,
        RuntimeFn::StateConfigure,
        RuntimeFn::AllocateQubits,
        RuntimeFn::StateInitialize,
        RuntimeFn::ApplyGate1q,
        RuntimeFn::ApplyGate2q,
        RuntimeFn::ApplyMeasure,
        RuntimeFn::StateFinalize,
    ];

    /// The portable entry name.
    pub fn name(self) -> &'static str {
        match self {
            RuntimeFn::StateCreate => "state-create",
            RuntimeFn::StateConfigure => "state-configure",
            RuntimeFn::AllocateQubits => "allocate-qubits",
            RuntimeFn::StateInitialize => "state-initialize",
            RuntimeFn::ApplyGate1q => "apply-single-qubit-gate",
            RuntimeFn::ApplyGate2q => "apply-two-qubit-gate",
            RuntimeFn::ApplyMeasure => "apply-measure",
            RuntimeFn::StateFinalize => "state-finalize",
        }
    }

    /// The symbol the linked runtime exports for this entry.
    pub fn symbol(self) -> &'static str {
        match self {
            RuntimeFn::StateCreate => "qrt_state_create",
            RuntimeFn::StateConfigure => "qrt_state_configure",
            RuntimeFn::AllocateQubits => "qrt_allocate_qubits",
            RuntimeFn::StateInitialize => "qrt_state_initialize",
            RuntimeFn::ApplyGate1q => "qrt_apply_gate1q",
            RuntimeFn::ApplyGate2q => "qrt_apply_gate2q",
            RuntimeFn::ApplyMeasure => "qrt_apply_measure",
            RuntimeFn::StateFinalize => "qrt_state_finalize",
        }
    }

    /// Parameter and result types, in ABI order.
    pub fn signature(self) -> (Vec<Type>, Vec<Type>) {
        match self {
            RuntimeFn::StateCreate => (vec![], vec![Type::Handle]),
            RuntimeFn::StateConfigure => (vec![Type::Handle, Type::Str, Type::Str], vec![]),
            RuntimeFn::AllocateQubits => {
                (vec![Type::Handle, Type::int64()], vec![Type::int64()])
            }
            RuntimeFn::StateInitialize => (vec![Type::Handle], vec![Type::Handle]),
            RuntimeFn::ApplyGate1q => (
                vec![
                    Type::Handle,
                    Type::int64(),
                    Type::Float64,
                    Type::Float64,
                    Type::Float64,
                ],
                vec![],
            ),
            RuntimeFn::ApplyGate2q => {
                (vec![Type::Handle, Type::int64(), Type::int64()], vec![])
            }
            RuntimeFn::ApplyMeasure => (
                vec![Type::Handle, Type::ptr_int64(), Type::int64()],
                vec![Type::int64()],
            ),
            RuntimeFn::StateFinalize => (vec![Type::Handle], vec![]),
        }
    }
}

/// The per-unit table of declared runtime functions.
///
/// Immutable once declared; rewrite rules emit calls through it.
#[derive(Debug)]
pub struct RuntimeTable {
    decls: FxHashMap<RuntimeFn, OpId>,
}

impl RuntimeTable {
    /// Declare every ABI entry at the start of the module block.
    pub fn declare(graph: &mut Graph) -> LowerResult<Self> {
        let mut decls = FxHashMap::default();
        // Insert in reverse so the module reads in `ALL` order.
        for func in RuntimeFn::ALL.iter().rev() {
            let (params, results) = func.signature();
            let decl = graph.add_func_at(
                InsertPoint::Start(graph.module()),
                func.symbol(),
                params,
                results,
            )?;
            decls.insert(*func, decl);
        }
        Ok(Self { decls })
    }

    /// The declaration op of an entry.
    pub fn decl(&self, func: RuntimeFn) -> OpId {
        self.decls[&func]
    }

    /// Emit a call to an entry at the given point.
    pub fn call(
        &self,
        graph: &mut Graph,
        at: InsertPoint,
        func: RuntimeFn,
        args: Vec<ValueId>,
    ) -> LowerResult<OpId> {
        let (_, results) = func.signature();
        let call = graph.insert_op(
            at,
            OpKind::Call {
                callee: func.symbol().to_string(),
            },
            args,
            results,
        )?;
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_emits_one_decl_per_entry() {
        let mut g = Graph::new();
        let table = RuntimeTable::declare(&mut g).unwrap();

        assert_eq!(g.block_ops(g.module()).len(), RuntimeFn::ALL.len());
        for (i, func) in RuntimeFn::ALL.iter().enumerate() {
            let decl = table.decl(*func);
            assert_eq!(g.block_ops(g.module())[i], decl);
            let OpKind::Func { name, .. } = &g[decl].kind else {
                panic!("expected func declaration, got {}", g[decl].kind.name());
            };
            assert_eq!(name, func.symbol());
            // Declarations have empty bodies; the linker supplies them.
            let body = g.func_body(decl).unwrap();
            assert!(g.block_ops(body).is_empty());
        }
    }

    #[test]
    fn test_signatures_are_physical() {
        for func in RuntimeFn::ALL {
            let (params, results) = func.signature();
            assert!(params.iter().all(Type::is_physical), "{}", func.name());
            assert!(results.iter().all(Type::is_physical), "{}", func.name());
        }
    }

    #[test]
    fn test_call_results_follow_signature() {
        let mut g = Graph::new();
        let table = RuntimeTable::declare(&mut g).unwrap();
        let main = g.add_func("main", vec![], vec![]).unwrap();
        let body = g.func_body(main).unwrap();

        let create = table
            .call(&mut g, InsertPoint::End(body), RuntimeFn::StateCreate, vec![])
            .unwrap();
        assert_eq!(g[create].results.len(), 1);
        assert_eq!(g.value_ty(g.result(create, 0)), &Type::Handle);

        let state = g.result(create, 0);
        let fin = table
            .call(
                &mut g,
                InsertPoint::End(body),
                RuntimeFn::StateFinalize,
                vec![state],
            )
            .unwrap();
        assert!(g[fin].results.is_empty());
    }
}
