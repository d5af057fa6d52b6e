//! Mutable operation graph.
//!
//! A compiled unit is one [`Graph`]: an arena of operation nodes organized
//! into sequential blocks, with optional nested regions per operation.
//! Operations are addressed by stable [`OpId`]s; erasure tombstones the
//! arena slot so ids held by in-flight rewrites never alias a new node.
//!
//! Mutation goes through a small surface (insert, erase, replace) which
//! is all the legalization engine needs. Analyses only ever take `&Graph`.

use std::ops::Index;

use crate::error::{IrError, IrResult};
use crate::op::OpKind;
use crate::types::Type;

/// Stable identifier of an operation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId(u32);

/// Identifier of an SSA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(u32);

/// Identifier of a sequential block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl OpId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl ValueId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl BlockId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where to insert a new operation.
#[derive(Debug, Clone, Copy)]
pub enum InsertPoint {
    /// At the start of a block.
    Start(BlockId),
    /// At the end of a block.
    End(BlockId),
    /// Immediately before an existing operation.
    Before(OpId),
    /// Immediately after an existing operation.
    After(OpId),
}

/// An operation node.
#[derive(Debug, Clone)]
pub struct OpData {
    /// The operation kind.
    pub kind: OpKind,
    /// Ordered operand list.
    pub operands: Vec<ValueId>,
    /// Result values, in order.
    pub results: Vec<ValueId>,
    /// Nested regions, one block each.
    pub regions: Vec<BlockId>,
    parent: BlockId,
}

/// An SSA value: its type and defining operation.
#[derive(Debug, Clone)]
pub struct ValueData {
    /// The value's type.
    pub ty: Type,
    def: Option<OpId>,
}

#[derive(Debug, Clone, Default)]
struct BlockData {
    ops: Vec<OpId>,
}

/// A compiled unit: one module block plus everything nested beneath it.
#[derive(Debug, Clone)]
pub struct Graph {
    ops: Vec<Option<OpData>>,
    values: Vec<ValueData>,
    blocks: Vec<BlockData>,
    module: BlockId,
}

impl Graph {
    /// Create an empty compiled unit.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            values: Vec::new(),
            blocks: vec![BlockData::default()],
            module: BlockId(0),
        }
    }

    /// The top-level module block.
    pub fn module(&self) -> BlockId {
        self.module
    }

    /// Look up an operation, `None` if it was erased.
    pub fn try_op(&self, op: OpId) -> Option<&OpData> {
        self.ops.get(op.index()).and_then(|slot| slot.as_ref())
    }

    /// Whether an operation is still live.
    pub fn is_live(&self, op: OpId) -> bool {
        self.try_op(op).is_some()
    }

    /// The operations of a block, in sequential order.
    pub fn block_ops(&self, block: BlockId) -> &[OpId] {
        &self.blocks[block.index()].ops
    }

    /// The block containing an operation.
    pub fn parent_block(&self, op: OpId) -> BlockId {
        self[op].parent
    }

    /// Position of an operation within its block.
    pub fn position(&self, op: OpId) -> Option<usize> {
        let block = self.try_op(op)?.parent;
        self.blocks[block.index()].ops.iter().position(|&o| o == op)
    }

    /// Whether `first` precedes `second` within the same block.
    ///
    /// Returns `false` when the operations live in different blocks or
    /// either has been erased.
    pub fn is_before(&self, first: OpId, second: OpId) -> bool {
        match (self.try_op(first), self.try_op(second)) {
            (Some(a), Some(b)) if a.parent == b.parent => {
                match (self.position(first), self.position(second)) {
                    (Some(i), Some(j)) => i < j,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// The next operation after `op` in its block, if any.
    pub fn next_op(&self, op: OpId) -> Option<OpId> {
        let block = self.try_op(op)?.parent;
        let pos = self.position(op)?;
        self.blocks[block.index()].ops.get(pos + 1).copied()
    }

    /// The `i`-th result value of an operation.
    pub fn result(&self, op: OpId, i: usize) -> ValueId {
        self[op].results[i]
    }

    /// The type of a value.
    pub fn value_ty(&self, value: ValueId) -> &Type {
        &self.values[value.index()].ty
    }

    /// The operation defining a value, `None` once the definer is erased.
    pub fn def(&self, value: ValueId) -> Option<OpId> {
        self.values[value.index()].def
    }

    /// Whether any live operation uses `value` as an operand.
    pub fn has_uses(&self, value: ValueId) -> bool {
        self.ops
            .iter()
            .flatten()
            .any(|op| op.operands.contains(&value))
    }

    /// Insert a new operation at the given point.
    ///
    /// One fresh result value is created per entry of `result_tys`.
    pub fn insert_op(
        &mut self,
        at: InsertPoint,
        kind: OpKind,
        operands: Vec<ValueId>,
        result_tys: Vec<Type>,
    ) -> IrResult<OpId> {
        let (block, index) = self.resolve(at)?;
        let id = OpId(u32::try_from(self.ops.len()).expect("op arena overflow"));
        let results = result_tys
            .into_iter()
            .map(|ty| {
                let v = ValueId(u32::try_from(self.values.len()).expect("value arena overflow"));
                self.values.push(ValueData { ty, def: Some(id) });
                v
            })
            .collect();
        self.ops.push(Some(OpData {
            kind,
            operands,
            results,
            regions: Vec::new(),
            parent: block,
        }));
        self.blocks[block.index()].ops.insert(index, id);
        Ok(id)
    }

    /// Append a new operation at the end of a block.
    pub fn append_op(
        &mut self,
        block: BlockId,
        kind: OpKind,
        operands: Vec<ValueId>,
        result_tys: Vec<Type>,
    ) -> IrResult<OpId> {
        self.insert_op(InsertPoint::End(block), kind, operands, result_tys)
    }

    /// Add a nested region (one empty block) to an operation.
    pub fn add_region(&mut self, op: OpId) -> IrResult<BlockId> {
        if !self.is_live(op) {
            return Err(IrError::InvalidOp(op));
        }
        let block = BlockId(u32::try_from(self.blocks.len()).expect("block arena overflow"));
        self.blocks.push(BlockData::default());
        self.op_mut(op).regions.push(block);
        Ok(block)
    }

    /// Append a function to the module block.
    ///
    /// The function gets one (empty) body region; a function left with an
    /// empty body is a declaration whose definition is supplied externally
    /// by the linker.
    pub fn add_func(
        &mut self,
        name: impl Into<String>,
        params: Vec<Type>,
        results: Vec<Type>,
    ) -> IrResult<OpId> {
        self.add_func_at(InsertPoint::End(self.module), name, params, results)
    }

    /// Insert a function at an explicit point in the module block.
    pub fn add_func_at(
        &mut self,
        at: InsertPoint,
        name: impl Into<String>,
        params: Vec<Type>,
        results: Vec<Type>,
    ) -> IrResult<OpId> {
        let func = self.insert_op(
            at,
            OpKind::Func {
                name: name.into(),
                params,
                results,
            },
            vec![],
            vec![],
        )?;
        self.add_region(func)?;
        Ok(func)
    }

    /// The body block of a function (its first region).
    pub fn func_body(&self, func: OpId) -> Option<BlockId> {
        self.try_op(func)?.regions.first().copied()
    }

    /// Replace every use of `old` with `new` across the whole unit.
    pub fn replace_all_uses(&mut self, old: ValueId, new: ValueId) {
        for slot in self.ops.iter_mut().flatten() {
            for operand in &mut slot.operands {
                if *operand == old {
                    *operand = new;
                }
            }
        }
    }

    /// Rewrite the operand list of an operation.
    pub fn set_operands(&mut self, op: OpId, operands: Vec<ValueId>) {
        self.op_mut(op).operands = operands;
    }

    /// Rewrite the kind of an operation in place.
    ///
    /// Used by signature conversion, which changes a function's type
    /// without touching its body.
    pub fn set_kind(&mut self, op: OpId, kind: OpKind) {
        self.op_mut(op).kind = kind;
    }

    /// Erase an operation and everything nested beneath it.
    ///
    /// Erasing an already-erased operation is a no-op. The operation's
    /// results lose their definer but stay in the value arena so dangling
    /// ids can still be inspected.
    pub fn erase_op(&mut self, op: OpId) {
        let Some(data) = self.try_op(op) else {
            return;
        };
        let parent = data.parent;
        // Collect op plus all region contents with an explicit stack.
        let mut doomed = Vec::new();
        let mut stack = vec![op];
        while let Some(cur) = stack.pop() {
            doomed.push(cur);
            if let Some(data) = self.try_op(cur) {
                for &region in &data.regions {
                    stack.extend(self.blocks[region.index()].ops.iter().copied());
                }
            }
        }
        for dead in doomed {
            if let Some(data) = self.ops[dead.index()].take() {
                for result in data.results {
                    self.values[result.index()].def = None;
                }
                for region in data.regions {
                    self.blocks[region.index()].ops.clear();
                }
            }
        }
        self.blocks[parent.index()].ops.retain(|&o| o != op);
    }

    /// Replace an operation: redirect each of its results to the given
    /// values, then erase it.
    pub fn replace_op(&mut self, op: OpId, with: &[ValueId]) -> IrResult<()> {
        let results = self.try_op(op).ok_or(IrError::InvalidOp(op))?.results.clone();
        if results.len() != with.len() {
            return Err(IrError::ResultCountMismatch {
                expected: results.len(),
                got: with.len(),
            });
        }
        for (old, &new) in results.into_iter().zip(with) {
            self.replace_all_uses(old, new);
        }
        self.erase_op(op);
        Ok(())
    }

    /// All live operations in pre-order (module block first, then each
    /// operation's regions depth-first).
    pub fn walk(&self) -> Vec<OpId> {
        let mut out = Vec::new();
        let mut stack: Vec<OpId> = self.blocks[self.module.index()]
            .ops
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(op) = stack.pop() {
            out.push(op);
            let data = &self[op];
            for &region in data.regions.iter().rev() {
                stack.extend(self.blocks[region.index()].ops.iter().rev().copied());
            }
        }
        out
    }

    /// Number of live operations in the unit.
    pub fn num_ops(&self) -> usize {
        self.ops.iter().flatten().count()
    }

    fn resolve(&self, at: InsertPoint) -> IrResult<(BlockId, usize)> {
        match at {
            InsertPoint::Start(block) => Ok((block, 0)),
            InsertPoint::End(block) => Ok((block, self.blocks[block.index()].ops.len())),
            InsertPoint::Before(op) => {
                let block = self.try_op(op).ok_or(IrError::InvalidInsertPoint(op))?.parent;
                let pos = self.position(op).ok_or(IrError::InvalidInsertPoint(op))?;
                Ok((block, pos))
            }
            InsertPoint::After(op) => {
                let block = self.try_op(op).ok_or(IrError::InvalidInsertPoint(op))?.parent;
                let pos = self.position(op).ok_or(IrError::InvalidInsertPoint(op))?;
                Ok((block, pos + 1))
            }
        }
    }

    fn op_mut(&mut self, op: OpId) -> &mut OpData {
        self.ops[op.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("operation {op:?} was erased"))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<OpId> for Graph {
    type Output = OpData;

    fn index(&self, op: OpId) -> &OpData {
        self.ops[op.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("operation {op:?} was erased"))
    }
}
