//! End-to-end lowering of a complete source unit.

use alsvid_ir::{ConstValue, Graph, OpId, OpKind, QubitId, Type, ValueId};
use alsvid_lower::{
    Device, LowerToRuntime, Method, Precision, RuntimeFn, SimulatorConfig, ENTRY_FUNCTION,
};

fn angle(g: &mut Graph, block: alsvid_ir::BlockId, radians: f64) -> ValueId {
    let op = g
        .append_op(
            block,
            OpKind::QuantumConst(ConstValue::Angle(radians)),
            vec![],
            vec![Type::Angle { width: Some(32) }],
        )
        .unwrap();
    g.result(op, 0)
}

/// One shot of a bell-pair measurement, expressed entirely in the
/// abstract source layers.
fn bell_unit() -> (Graph, OpId) {
    let mut g = Graph::new();
    let main = g.add_func(ENTRY_FUNCTION, vec![], vec![]).unwrap();
    let body = g.func_body(main).unwrap();

    g.append_op(body, OpKind::SystemInit, vec![], vec![])
        .unwrap();
    g.append_op(body, OpKind::ShotInit, vec![], vec![]).unwrap();
    let d0 = g
        .append_op(
            body,
            OpKind::DeclareQubit {
                id: QubitId(0),
                width: 1,
            },
            vec![],
            vec![Type::Qubit],
        )
        .unwrap();
    let d1 = g
        .append_op(
            body,
            OpKind::DeclareQubit {
                id: QubitId(1),
                width: 1,
            },
            vec![],
            vec![Type::Qubit],
        )
        .unwrap();
    let q0 = g.result(d0, 0);
    let q1 = g.result(d1, 0);

    // U(pi/2, 0, pi) is a Hadamard up to global phase.
    let theta = angle(&mut g, body, std::f64::consts::FRAC_PI_2);
    let phi = angle(&mut g, body, 0.0);
    let lambda = angle(&mut g, body, std::f64::consts::PI);
    g.append_op(body, OpKind::GateU, vec![q0, theta, phi, lambda], vec![])
        .unwrap();
    g.append_op(body, OpKind::GateCx, vec![q0, q1], vec![])
        .unwrap();

    let measure = g
        .append_op(body, OpKind::Measure, vec![q1], vec![Type::bit1()])
        .unwrap();
    let bit = g.result(measure, 0);
    g.append_op(body, OpKind::Barrier, vec![q0, q1], vec![])
        .unwrap();
    g.append_op(body, OpKind::SystemFinalize, vec![], vec![])
        .unwrap();
    g.append_op(body, OpKind::Return, vec![bit], vec![]).unwrap();

    (g, main)
}

fn call_sequence(g: &Graph, block: alsvid_ir::BlockId) -> Vec<String> {
    g.block_ops(block)
        .iter()
        .filter_map(|&op| match &g[op].kind {
            OpKind::Call { callee } => Some(callee.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_bell_unit_lowers_to_exact_call_sequence() {
    let (mut g, main) = bell_unit();
    let summary = LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();
    assert!(summary.rewrites > 0);

    let body = g.func_body(main).unwrap();
    let calls = call_sequence(&g, body);
    assert_eq!(
        calls,
        vec![
            RuntimeFn::StateCreate.symbol(),
            RuntimeFn::StateConfigure.symbol(),
            RuntimeFn::StateConfigure.symbol(),
            RuntimeFn::StateConfigure.symbol(),
            RuntimeFn::AllocateQubits.symbol(),
            RuntimeFn::AllocateQubits.symbol(),
            RuntimeFn::StateInitialize.symbol(),
            RuntimeFn::ApplyGate1q.symbol(),
            RuntimeFn::ApplyGate2q.symbol(),
            RuntimeFn::ApplyMeasure.symbol(),
            RuntimeFn::StateFinalize.symbol(),
        ]
    );
}

#[test]
fn test_no_source_layer_op_survives() {
    let (mut g, _) = bell_unit();
    LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();
    for op in g.walk() {
        assert!(
            !g[op].kind.is_source_layer(),
            "residual source op: {}",
            g[op].kind.name()
        );
    }
}

#[test]
fn test_measurement_result_is_truncated_to_one_bit() {
    let (mut g, main) = bell_unit();
    LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();

    let body = g.func_body(main).unwrap();
    let ret = g
        .block_ops(body)
        .iter()
        .copied()
        .find(|&op| matches!(g[op].kind, OpKind::Return))
        .unwrap();
    let bit = g[ret].operands[0];
    assert_eq!(g.value_ty(bit), &Type::Int { width: 1 });
    let trunc = g.def(bit).unwrap();
    assert_eq!(g[trunc].kind, OpKind::Trunc { width: 1 });
}

#[test]
fn test_scratch_store_precedes_measurement_call() {
    let (mut g, main) = bell_unit();
    LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();

    let body = g.func_body(main).unwrap();
    let ops = g.block_ops(body);
    let store_pos = ops
        .iter()
        .rposition(|&op| matches!(g[op].kind, OpKind::Store))
        .unwrap();
    let measure_pos = ops
        .iter()
        .position(|&op| {
            matches!(&g[op].kind, OpKind::Call { callee } if callee == RuntimeFn::ApplyMeasure.symbol())
        })
        .unwrap();
    assert!(store_pos < measure_pos);
    // The store writes the qubit handle through the scratch pointer.
    let store = ops[store_pos];
    assert_eq!(g.value_ty(g[store].operands[0]), &Type::int64());
    assert_eq!(g.value_ty(g[store].operands[1]), &Type::ptr_int64());
}

#[test]
fn test_configuration_tokens_follow_config() {
    let (mut g, main) = bell_unit();
    let config = SimulatorConfig::new(Method::DensityMatrix, Device::Gpu, Precision::Single);
    LowerToRuntime::new(config).run(&mut g).unwrap();

    let body = g.func_body(main).unwrap();
    let strings: Vec<String> = g
        .block_ops(body)
        .iter()
        .filter_map(|&op| match &g[op].kind {
            OpKind::ConstStr { value } => Some(value.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        strings,
        vec![
            "method",
            "density_matrix",
            "device",
            "GPU",
            "precision",
            "single"
        ]
    );
}

#[test]
fn test_allocation_calls_follow_declaration_order() {
    let (mut g, main) = bell_unit();
    LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();

    // Both gate operands resolve to allocation-call results; the control
    // of the two-qubit gate is the earlier allocation.
    let body = g.func_body(main).unwrap();
    let cx = g
        .block_ops(body)
        .iter()
        .copied()
        .find(|&op| {
            matches!(&g[op].kind, OpKind::Call { callee } if callee == RuntimeFn::ApplyGate2q.symbol())
        })
        .unwrap();
    let control = g.def(g[cx].operands[1]).unwrap();
    let target = g.def(g[cx].operands[2]).unwrap();
    assert!(g.is_before(control, target));
}

#[test]
fn test_lowering_is_idempotent() {
    let (mut g, _) = bell_unit();
    let pass = LowerToRuntime::new(SimulatorConfig::default());
    pass.run(&mut g).unwrap();
    let ops_after_first = g.num_ops();

    let second = pass.run(&mut g).unwrap();
    assert_eq!(second.rewrites, 0);
    assert_eq!(second.sweeps, 0);
    assert_eq!(g.num_ops(), ops_after_first);
}

#[test]
fn test_entry_signature_is_converted() {
    let mut g = Graph::new();
    let main = g
        .add_func(ENTRY_FUNCTION, vec![Type::Qubit], vec![Type::bit1()])
        .unwrap();
    let body = g.func_body(main).unwrap();
    g.append_op(
        body,
        OpKind::DeclareQubit {
            id: QubitId(0),
            width: 1,
        },
        vec![],
        vec![Type::Qubit],
    )
    .unwrap();

    LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();

    let OpKind::Func {
        params, results, ..
    } = &g[main].kind
    else {
        panic!("entry survives lowering");
    };
    assert_eq!(params, &vec![Type::int64()]);
    assert_eq!(results, &vec![Type::Int { width: 1 }]);
}

#[test]
fn test_module_holds_runtime_table_and_slot() {
    let (mut g, _) = bell_unit();
    LowerToRuntime::new(SimulatorConfig::default())
        .run(&mut g)
        .unwrap();

    let module_ops = g.block_ops(g.module());
    // Slot, eight runtime declarations, entry function.
    assert_eq!(module_ops.len(), 2 + RuntimeFn::ALL.len());
    assert!(matches!(g[module_ops[0]].kind, OpKind::Global { .. }));
    for (i, func) in RuntimeFn::ALL.iter().enumerate() {
        let OpKind::Func { name, .. } = &g[module_ops[1 + i]].kind else {
            panic!("expected runtime declaration");
        };
        assert_eq!(name, func.symbol());
    }
}
