//! Pattern-driven legalization engine.
//!
//! Walks the operation graph, classifies every node legal or illegal,
//! and applies priority-ordered rewrite rules until a fixed point is
//! reached (everything legal) or a full sweep changes nothing while
//! illegal operations remain (hard failure, no partial output).
//!
//! The engine is single-threaded and synchronous. All shared lowering
//! state (the runtime table, the global state slot and the measurement
//! scratch buffer) is threaded through an explicit [`RuleContext`]
//! value rather than process-wide storage.

use alsvid_ir::{ConstValue, Graph, InsertPoint, OpId, OpKind, QubitId, Type, ValueId};
use tracing::{debug, info};

use crate::config::SimulatorConfig;
use crate::convert::TypeConverter;
use crate::error::{LowerError, LowerResult};
use crate::runtime::{RuntimeFn, RuntimeTable};
use crate::state::StateSlot;

/// Name of the single designated entry function.
pub const ENTRY_FUNCTION: &str = "main";

/// Legality classification of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    /// Structural or target-primitive; survives lowering.
    Legal,
    /// Illegal, but some rewrite rule can eliminate it.
    Convertible,
    /// Illegal with no legal conversion (for example a function whose
    /// signature contains an unconvertible type).
    Unconvertible,
}

/// Classify one operation.
///
/// A fixed allow-list of structural/target kinds is always legal;
/// function-like operations are legal only if every parameter and result
/// type is already physical; every source-layer operation is illegal.
pub fn classify(graph: &Graph, op: OpId, converter: &TypeConverter) -> Legality {
    match &graph[op].kind {
        OpKind::Func { params, results, .. } => {
            if converter.is_signature_legal(params, results) {
                Legality::Legal
            } else if converter.is_signature_convertible(params, results) {
                Legality::Convertible
            } else {
                Legality::Unconvertible
            }
        }
        kind if kind.is_source_layer() => Legality::Convertible,
        _ => Legality::Legal,
    }
}

/// Locate the unit's designated entry function.
pub fn entry_function(graph: &Graph) -> LowerResult<OpId> {
    graph
        .block_ops(graph.module())
        .iter()
        .copied()
        .find(|&op| matches!(&graph[op].kind, OpKind::Func { name, .. } if name == ENTRY_FUNCTION))
        .ok_or(LowerError::MissingEntryFunction(ENTRY_FUNCTION))
}

/// Counters reported by a successful lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoweringSummary {
    /// Number of rule applications.
    pub rewrites: usize,
    /// Number of worklist sweeps.
    pub sweeps: usize,
}

enum RuleOutcome {
    Applied,
    NoMatch,
}

/// Shared lowering state, threaded by reference through every rule.
struct RuleContext {
    table: RuntimeTable,
    state: StateSlot,
    scratch: ValueId,
    converter: TypeConverter,
}

/// The lowering pass: rewrites a unit into calls against the simulation
/// runtime.
pub struct LowerToRuntime {
    config: SimulatorConfig,
}

impl LowerToRuntime {
    /// Create the pass for a given simulator configuration.
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    /// Name of this pass.
    pub fn name(&self) -> &'static str {
        "LowerToRuntime"
    }

    /// Run the lowering to a fixed point.
    ///
    /// On failure the graph may hold a partially rewritten unit; callers
    /// must discard it, no partial lowering is ever a valid result.
    pub fn run(&self, graph: &mut Graph) -> LowerResult<LoweringSummary> {
        let converter = TypeConverter;
        let mut summary = LoweringSummary::default();

        if collect_illegal(graph, &converter).is_empty() {
            debug!("unit already legal, nothing to lower");
            return Ok(summary);
        }

        // Setup phase: runs once, before any rule application.
        strip_synchronize_operands(graph);
        let entry = entry_function(graph)?;
        let table = RuntimeTable::declare(graph)?;
        let state = StateSlot::declare(graph)?;
        create_state(graph, &table, &state, entry)?;
        insert_state_initialize(graph, &table, &state, entry)?;
        let scratch = prepare_measure_scratch(graph, entry)?;
        let ctx = RuleContext {
            table,
            state,
            scratch,
            converter,
        };

        loop {
            let illegal = collect_illegal(graph, &ctx.converter);
            if illegal.is_empty() {
                break;
            }
            summary.sweeps += 1;
            let mut changed = false;
            for op in illegal {
                // Rules may erase ops queued later in the same sweep.
                if !graph.is_live(op) {
                    continue;
                }
                match self.apply_rule(graph, op, &ctx)? {
                    RuleOutcome::Applied => {
                        changed = true;
                        summary.rewrites += 1;
                    }
                    RuleOutcome::NoMatch => {}
                }
            }
            if !changed {
                let remaining = collect_illegal(graph, &ctx.converter).len();
                return Err(LowerError::NotConverged { remaining });
            }
        }

        info!(
            rewrites = summary.rewrites,
            sweeps = summary.sweeps,
            "lowering converged"
        );
        Ok(summary)
    }

    fn apply_rule(
        &self,
        graph: &mut Graph,
        op: OpId,
        ctx: &RuleContext,
    ) -> LowerResult<RuleOutcome> {
        let kind = graph[op].kind.clone();
        match kind {
            OpKind::SystemInit => self.rewrite_system_init(graph, op, ctx),
            // No shot iteration, timing, reset, synchronization or custom
            // gates on this target: erased, no replacement.
            OpKind::ShotInit
            | OpKind::Synchronize
            | OpKind::Barrier
            | OpKind::Delay
            | OpKind::Reset
            | OpKind::CallGate { .. } => {
                debug!(op = kind.name(), "erasing source op with no counterpart");
                graph.erase_op(op);
                Ok(RuleOutcome::Applied)
            }
            OpKind::DeclareQubit { id, width } => {
                rewrite_declare_qubit(graph, op, id, width, ctx)
            }
            OpKind::QuantumConst(value) => rewrite_quantum_const(graph, op, value, ctx),
            OpKind::GateU => rewrite_gate(graph, op, RuntimeFn::ApplyGate1q, ctx),
            OpKind::GateCx => rewrite_gate(graph, op, RuntimeFn::ApplyGate2q, ctx),
            OpKind::Measure => rewrite_measure(graph, op, ctx),
            OpKind::Cast => rewrite_cast(graph, op, ctx),
            OpKind::SystemFinalize => rewrite_finalize(graph, op, ctx),
            OpKind::Func {
                name,
                params,
                results,
            } => rewrite_func(graph, op, name, params, results, ctx),
            _ => Ok(RuleOutcome::NoMatch),
        }
    }

    /// system-init becomes three sequential configuration calls, one per
    /// knob, each fed freshly materialized string constants.
    fn rewrite_system_init(
        &self,
        graph: &mut Graph,
        op: OpId,
        ctx: &RuleContext,
    ) -> LowerResult<RuleOutcome> {
        let at = InsertPoint::Before(op);
        let state = ctx.state.load(graph, at)?;
        let pairs = [
            ("method", self.config.method.token()),
            ("device", self.config.device.token()),
            ("precision", self.config.precision.token()),
        ];
        for (key, value) in pairs {
            let key = const_str(graph, at, key)?;
            let value = const_str(graph, at, value)?;
            ctx.table
                .call(graph, at, RuntimeFn::StateConfigure, vec![state, key, value])?;
        }
        graph.erase_op(op);
        Ok(RuleOutcome::Applied)
    }
}

/// Rules apply in priority order; within one priority class, block order.
fn rule_priority(kind: &OpKind) -> u8 {
    match kind {
        OpKind::SystemInit => 0,
        OpKind::ShotInit
        | OpKind::Synchronize
        | OpKind::Barrier
        | OpKind::Delay
        | OpKind::Reset
        | OpKind::CallGate { .. } => 1,
        OpKind::DeclareQubit { .. } => 2,
        OpKind::QuantumConst(_) => 3,
        OpKind::GateU | OpKind::GateCx => 4,
        OpKind::Measure => 5,
        OpKind::Cast => 6,
        OpKind::SystemFinalize => 7,
        OpKind::Func { .. } => 8,
        _ => u8::MAX,
    }
}

fn collect_illegal(graph: &Graph, converter: &TypeConverter) -> Vec<OpId> {
    let mut illegal: Vec<OpId> = graph
        .walk()
        .into_iter()
        .filter(|&op| classify(graph, op, converter) != Legality::Legal)
        .collect();
    illegal.sort_by_key(|&op| rule_priority(&graph[op].kind));
    illegal
}

/// This target has no cross-qubit synchronization semantics; the marker
/// loses its qubit-operand list before any rule runs.
fn strip_synchronize_operands(graph: &mut Graph) {
    for op in graph.walk() {
        if matches!(graph[op].kind, OpKind::Synchronize) {
            graph.set_operands(op, vec![]);
        }
    }
}

/// Emit the write-once slot assignment at entry start: a state-create
/// call immediately followed by the store.
fn create_state(
    graph: &mut Graph,
    table: &RuntimeTable,
    state: &StateSlot,
    entry: OpId,
) -> LowerResult<()> {
    let body = graph
        .func_body(entry)
        .ok_or(LowerError::MissingEntryFunction(ENTRY_FUNCTION))?;
    let at = block_start(graph, body);
    let create = table.call(graph, at, RuntimeFn::StateCreate, vec![])?;
    let handle = graph.result(create, 0);
    state.store(graph, at, handle)?;
    Ok(())
}

/// Insert the state-initialize call immediately after the qubit
/// declaration with the numerically highest id.
///
/// Only the entry function is scanned; declarations in other functions
/// are erased wholesale and must not anchor the initialization.
fn insert_state_initialize(
    graph: &mut Graph,
    table: &RuntimeTable,
    state: &StateSlot,
    entry: OpId,
) -> LowerResult<()> {
    let body = graph
        .func_body(entry)
        .ok_or(LowerError::MissingEntryFunction(ENTRY_FUNCTION))?;
    let mut last: Option<(QubitId, OpId)> = None;
    let mut stack: Vec<OpId> = graph.block_ops(body).to_vec();
    while let Some(op) = stack.pop() {
        if let OpKind::DeclareQubit { id, .. } = graph[op].kind {
            if last.is_none_or(|(max, _)| id > max) {
                last = Some((id, op));
            }
        }
        for &region in &graph[op].regions {
            stack.extend(graph.block_ops(region).iter().copied());
        }
    }
    let (_, decl) = last.ok_or(LowerError::NoQubitDeclared)?;
    let at = after(graph, decl);
    let handle = state.load(graph, at)?;
    table.call(graph, at, RuntimeFn::StateInitialize, vec![handle])?;
    Ok(())
}

/// Allocate the measurement scratch buffer at entry start.
///
/// Capacity follows the widest measurement actually present in the
/// input, with 1 as the default and minimum.
fn prepare_measure_scratch(graph: &mut Graph, entry: OpId) -> LowerResult<ValueId> {
    let capacity = graph
        .walk()
        .into_iter()
        .filter(|&op| matches!(graph[op].kind, OpKind::Measure))
        .map(|op| graph[op].operands.len())
        .max()
        .unwrap_or(1)
        .max(1) as u64;
    let body = graph
        .func_body(entry)
        .ok_or(LowerError::MissingEntryFunction(ENTRY_FUNCTION))?;
    let at = block_start(graph, body);
    let alloca = graph.insert_op(
        at,
        OpKind::Alloca { count: capacity },
        vec![],
        vec![Type::ptr_int64()],
    )?;
    Ok(graph.result(alloca, 0))
}

/// A width-1 declaration becomes one allocation call; the declaration's
/// result is replaced by the (materialized) call result.
fn rewrite_declare_qubit(
    graph: &mut Graph,
    op: OpId,
    id: QubitId,
    width: u32,
    ctx: &RuleContext,
) -> LowerResult<RuleOutcome> {
    if width != 1 {
        return Err(LowerError::UnsupportedQubitWidth { id, width });
    }
    let at = InsertPoint::Before(op);
    let count = const_int(graph, at, i64::from(width))?;
    let state = ctx.state.load(graph, at)?;
    let call = ctx
        .table
        .call(graph, at, RuntimeFn::AllocateQubits, vec![state, count])?;
    let handle = graph.result(call, 0);
    let materialized = ctx.converter.materialize(graph, at, &Type::Qubit, handle)?;
    graph.replace_op(op, &[materialized])?;
    debug!(qubit = %id, "lowered qubit declaration to allocation call");
    Ok(RuleOutcome::Applied)
}

/// Angle constants become float constants of equal numeric value,
/// materialized back for unconverted consumers. Duration constants are
/// erased once nothing downstream uses them.
fn rewrite_quantum_const(
    graph: &mut Graph,
    op: OpId,
    value: ConstValue,
    ctx: &RuleContext,
) -> LowerResult<RuleOutcome> {
    match value {
        ConstValue::Angle(radians) => {
            let at = InsertPoint::Before(op);
            let angle_ty = graph.value_ty(graph.result(op, 0)).clone();
            let constant = graph.insert_op(
                at,
                OpKind::ConstFloat { value: radians },
                vec![],
                vec![Type::Float64],
            )?;
            let phys = graph.result(constant, 0);
            let materialized = ctx.converter.materialize(graph, at, &angle_ty, phys)?;
            graph.replace_op(op, &[materialized])?;
            Ok(RuleOutcome::Applied)
        }
        ConstValue::Duration(_) => {
            // Delay erasure runs first; once the value is unused the
            // constant can go.
            if graph.has_uses(graph.result(op, 0)) {
                Ok(RuleOutcome::NoMatch)
            } else {
                graph.erase_op(op);
                Ok(RuleOutcome::Applied)
            }
        }
    }
}

/// Gate application: state handle plus the original operands, positional.
fn rewrite_gate(
    graph: &mut Graph,
    op: OpId,
    func: RuntimeFn,
    ctx: &RuleContext,
) -> LowerResult<RuleOutcome> {
    let operands = graph[op].operands.clone();
    let mut resolved = Vec::with_capacity(operands.len());
    for operand in operands {
        match resolve_physical(graph, operand) {
            Some(value) => resolved.push(value),
            // Operand not converted yet; retry on a later sweep.
            None => return Ok(RuleOutcome::NoMatch),
        }
    }
    let at = InsertPoint::Before(op);
    let state = ctx.state.load(graph, at)?;
    let mut args = vec![state];
    args.extend(resolved);
    ctx.table.call(graph, at, func, args)?;
    graph.erase_op(op);
    Ok(RuleOutcome::Applied)
}

/// Single-operand measurement: store the qubit handle into the scratch
/// buffer, call the measurement primitive, truncate the wide result to
/// one bit.
fn rewrite_measure(graph: &mut Graph, op: OpId, ctx: &RuleContext) -> LowerResult<RuleOutcome> {
    let operands = graph[op].operands.clone();
    if operands.len() != 1 {
        return Err(LowerError::MultiQubitMeasurement {
            operands: operands.len(),
        });
    }
    let Some(qubit) = resolve_physical(graph, operands[0]) else {
        return Ok(RuleOutcome::NoMatch);
    };
    let at = InsertPoint::Before(op);
    graph.insert_op(at, OpKind::Store, vec![qubit, ctx.scratch], vec![])?;
    let count = const_int(graph, at, 1)?;
    let state = ctx.state.load(graph, at)?;
    let call = ctx.table.call(
        graph,
        at,
        RuntimeFn::ApplyMeasure,
        vec![state, ctx.scratch, count],
    )?;
    let wide = graph.result(call, 0);
    let trunc = graph.insert_op(
        at,
        OpKind::Trunc { width: 1 },
        vec![wide],
        vec![Type::Int { width: 1 }],
    )?;
    let bit = graph.result(trunc, 0);
    graph.replace_op(op, &[bit])?;
    Ok(RuleOutcome::Applied)
}

/// Materialization casts fold away once their operand carries the
/// converted form of the result type; unused casts are erased.
fn rewrite_cast(graph: &mut Graph, op: OpId, ctx: &RuleContext) -> LowerResult<RuleOutcome> {
    let result = graph.result(op, 0);
    if !graph.has_uses(result) {
        graph.erase_op(op);
        return Ok(RuleOutcome::Applied);
    }
    let operand = graph[op].operands[0];
    if graph.value_ty(operand).is_physical() {
        let result_ty = graph.value_ty(result).clone();
        if let Ok(converted) = ctx.converter.convert(&result_ty) {
            if &converted == graph.value_ty(operand) {
                graph.replace_op(op, &[operand])?;
                return Ok(RuleOutcome::Applied);
            }
        }
    }
    Ok(RuleOutcome::NoMatch)
}

/// The finalize marker becomes one finalize call inserted immediately
/// after it; the marker is erased.
fn rewrite_finalize(graph: &mut Graph, op: OpId, ctx: &RuleContext) -> LowerResult<RuleOutcome> {
    let at = after(graph, op);
    let state = ctx.state.load(graph, at)?;
    ctx.table
        .call(graph, at, RuntimeFn::StateFinalize, vec![state])?;
    graph.erase_op(op);
    Ok(RuleOutcome::Applied)
}

/// Non-entry functions are erased entirely; the entry function gets its
/// signature converted in place.
fn rewrite_func(
    graph: &mut Graph,
    op: OpId,
    name: String,
    params: Vec<Type>,
    results: Vec<Type>,
    ctx: &RuleContext,
) -> LowerResult<RuleOutcome> {
    if name != ENTRY_FUNCTION {
        debug!(func = %name, "erasing non-entry function");
        graph.erase_op(op);
        return Ok(RuleOutcome::Applied);
    }
    let params = params
        .iter()
        .map(|ty| ctx.converter.convert(ty))
        .collect::<LowerResult<Vec<_>>>()?;
    let results = results
        .iter()
        .map(|ty| ctx.converter.convert(ty))
        .collect::<LowerResult<Vec<_>>>()?;
    graph.set_kind(
        op,
        OpKind::Func {
            name,
            params,
            results,
        },
    );
    Ok(RuleOutcome::Applied)
}

/// Look through materialization casts to the physical value underneath.
fn resolve_physical(graph: &Graph, value: ValueId) -> Option<ValueId> {
    if graph.value_ty(value).is_physical() {
        return Some(value);
    }
    let def = graph.def(value)?;
    if matches!(graph[def].kind, OpKind::Cast) {
        let inner = *graph[def].operands.first()?;
        if graph.value_ty(inner).is_physical() {
            return Some(inner);
        }
    }
    None
}

fn const_int(graph: &mut Graph, at: InsertPoint, value: i64) -> LowerResult<ValueId> {
    let op = graph.insert_op(
        at,
        OpKind::ConstInt { value, width: 64 },
        vec![],
        vec![Type::int64()],
    )?;
    Ok(graph.result(op, 0))
}

fn const_str(graph: &mut Graph, at: InsertPoint, value: &str) -> LowerResult<ValueId> {
    let op = graph.insert_op(
        at,
        OpKind::ConstStr {
            value: value.to_string(),
        },
        vec![],
        vec![Type::Str],
    )?;
    Ok(graph.result(op, 0))
}

/// A sequential insertion point just after `op`.
fn after(graph: &Graph, op: OpId) -> InsertPoint {
    match graph.next_op(op) {
        Some(next) => InsertPoint::Before(next),
        None => InsertPoint::End(graph.parent_block(op)),
    }
}

/// A sequential insertion point at the start of `block`.
fn block_start(graph: &Graph, block: alsvid_ir::BlockId) -> InsertPoint {
    match graph.block_ops(block).first() {
        Some(&first) => InsertPoint::Before(first),
        None => InsertPoint::End(block),
    }
}
