//! Global simulation-state slot.
//!
//! The whole compiled unit shares one opaque state handle, held in a
//! module-level slot. The slot is written exactly once, by the engine's
//! setup phase; every runtime call reads it back through [`StateSlot::load`].
//! The write-once property is a control-flow guarantee of the setup phase,
//! not a language-level static: the slot is threaded by reference through
//! every rewrite rule rather than living in process-wide storage.

use alsvid_ir::{Graph, InsertPoint, OpId, OpKind, Type, ValueId};

use crate::error::LowerResult;

/// Symbol name of the module-level state slot.
pub const STATE_SLOT_SYMBOL: &str = "qrt_state_slot";

/// Accessor for the unit's single global state slot.
#[derive(Debug, Clone, Copy)]
pub struct StateSlot {
    global: OpId,
}

impl StateSlot {
    /// Declare the slot at the start of the module block.
    pub fn declare(graph: &mut Graph) -> LowerResult<Self> {
        let global = graph.insert_op(
            InsertPoint::Start(graph.module()),
            OpKind::Global {
                name: STATE_SLOT_SYMBOL.to_string(),
            },
            vec![],
            vec![],
        )?;
        Ok(Self { global })
    }

    /// The declaring op.
    pub fn global(&self) -> OpId {
        self.global
    }

    /// Emit the slot's address at the given point.
    pub fn address(&self, graph: &mut Graph, at: InsertPoint) -> LowerResult<ValueId> {
        let addr = graph.insert_op(
            at,
            OpKind::AddressOf {
                name: STATE_SLOT_SYMBOL.to_string(),
            },
            vec![],
            vec![Type::Ptr(Box::new(Type::Handle))],
        )?;
        Ok(graph.result(addr, 0))
    }

    /// Emit a read of the current handle at the given point.
    ///
    /// `at` must be a sequential insertion point (`Before` an op or `End`
    /// of a block) so the address and the load land in order.
    pub fn load(&self, graph: &mut Graph, at: InsertPoint) -> LowerResult<ValueId> {
        let addr = self.address(graph, at)?;
        let load = graph.insert_op(at, OpKind::Load, vec![addr], vec![Type::Handle])?;
        Ok(graph.result(load, 0))
    }

    /// Emit the single initializing store of `handle` at the given point.
    pub fn store(
        &self,
        graph: &mut Graph,
        at: InsertPoint,
        handle: ValueId,
    ) -> LowerResult<OpId> {
        let addr = self.address(graph, at)?;
        Ok(graph.insert_op(at, OpKind::Store, vec![handle, addr], vec![])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_emits_address_then_load() {
        let mut g = Graph::new();
        let slot = StateSlot::declare(&mut g).unwrap();
        let main = g.add_func("main", vec![], vec![]).unwrap();
        let body = g.func_body(main).unwrap();

        let handle = slot.load(&mut g, InsertPoint::End(body)).unwrap();
        assert_eq!(g.value_ty(handle), &Type::Handle);

        let kinds: Vec<_> = g
            .block_ops(body)
            .iter()
            .map(|&op| g[op].kind.name())
            .collect();
        assert_eq!(kinds, vec!["addressof", "load"]);
    }

    #[test]
    fn test_slot_is_declared_at_module_start() {
        let mut g = Graph::new();
        g.add_func("main", vec![], vec![]).unwrap();
        let slot = StateSlot::declare(&mut g).unwrap();
        assert_eq!(g.block_ops(g.module())[0], slot.global());
    }
}
