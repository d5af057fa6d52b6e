//! Operation kinds.
//!
//! The graph works over a closed set of operation variants. Lowering
//! classifies each kind as either a source-layer operation that must be
//! rewritten away, or a structural/target operation that survives code
//! generation. Keeping the set closed (a tagged union rather than trait
//! objects) lets analyses match exhaustively and keeps graph walks free
//! of virtual dispatch.

use serde::{Deserialize, Serialize};

use crate::qubit::QubitId;
use crate::types::Type;

/// Compile-time constant payload of a quantum-circuit constant op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    /// A rotation angle in radians.
    Angle(f64),
    /// A duration in device time units.
    Duration(u64),
}

/// The source layer an operation kind belongs to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// System-control operations (init, shot init, finalize, sync).
    SystemControl,
    /// Classical-bit operations (casts between abstract and physical form).
    ClassicalBit,
    /// Quantum-circuit operations (declarations, gates, measurement).
    QuantumCircuit,
}

/// The kind of an operation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    // --- Structural / target layer ---
    /// A function definition or declaration. A declaration has an empty
    /// body region; the runtime ABI entries are declared this way.
    Func {
        /// Symbol name.
        name: String,
        /// Parameter types.
        params: Vec<Type>,
        /// Result types.
        results: Vec<Type>,
    },
    /// Return from the enclosing function.
    Return,
    /// A structural nesting scope (control-flow region carrier).
    Scope,
    /// An integer constant of the given width.
    ConstInt {
        /// Constant value.
        value: i64,
        /// Bit width of the result.
        width: u32,
    },
    /// A 64-bit float constant.
    ConstFloat {
        /// Constant value.
        value: f64,
    },
    /// A string constant, materialized for runtime configuration calls.
    ConstStr {
        /// The string payload.
        value: String,
    },
    /// A module-level mutable slot.
    Global {
        /// Symbol name of the slot.
        name: String,
    },
    /// Address of a module-level slot.
    AddressOf {
        /// Symbol name of the slot.
        name: String,
    },
    /// Load through a pointer operand.
    Load,
    /// Store `operands[0]` through pointer `operands[1]`.
    Store,
    /// Stack allocation of `count` slots of the result's pointee type.
    Alloca {
        /// Number of slots.
        count: u64,
    },
    /// Call to a declared function.
    Call {
        /// Symbol name of the callee.
        callee: String,
    },
    /// Integer truncation to the given width.
    Trunc {
        /// Target width.
        width: u32,
    },

    // --- System-control layer ---
    /// Whole-system initialization marker.
    SystemInit,
    /// Per-shot initialization marker.
    ShotInit,
    /// Whole-system finalization marker.
    SystemFinalize,
    /// Cross-qubit synchronization marker; operands are the synchronized
    /// qubits.
    Synchronize,

    // --- Classical-bit layer ---
    /// Cast between an abstract type and its physical form.
    Cast,

    // --- Quantum-circuit layer ---
    /// Declare a qubit resource with a fixed id.
    DeclareQubit {
        /// The assigned qubit id.
        id: QubitId,
        /// Declaration width; only width 1 is lowerable.
        width: u32,
    },
    /// Built-in single-qubit gate U(theta, phi, lambda); operands are
    /// `[qubit, theta, phi, lambda]`.
    GateU,
    /// Built-in two-qubit controlled-X; operands are `[control, target]`.
    GateCx,
    /// Projective measurement; operands are the measured qubits, result
    /// is one classical bit.
    Measure,
    /// Reset a qubit to |0>.
    Reset,
    /// Scheduling barrier across the operand qubits.
    Barrier,
    /// Timed delay; operands are `[duration, qubits...]`.
    Delay,
    /// Call to a user-defined gate.
    CallGate {
        /// Symbol name of the gate.
        callee: String,
    },
    /// A quantum-layer constant (angle or duration).
    QuantumConst(ConstValue),
}

impl OpKind {
    /// A short mnemonic for diagnostics and tests.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Func { .. } => "func",
            OpKind::Return => "return",
            OpKind::Scope => "scope",
            OpKind::ConstInt { .. } => "const.int",
            OpKind::ConstFloat { .. } => "const.float",
            OpKind::ConstStr { .. } => "const.str",
            OpKind::Global { .. } => "global",
            OpKind::AddressOf { .. } => "addressof",
            OpKind::Load => "load",
            OpKind::Store => "store",
            OpKind::Alloca { .. } => "alloca",
            OpKind::Call { .. } => "call",
            OpKind::Trunc { .. } => "trunc",
            OpKind::SystemInit => "system.init",
            OpKind::ShotInit => "shot.init",
            OpKind::SystemFinalize => "system.finalize",
            OpKind::Synchronize => "synchronize",
            OpKind::Cast => "cast",
            OpKind::DeclareQubit { .. } => "declare_qubit",
            OpKind::GateU => "gate.u",
            OpKind::GateCx => "gate.cx",
            OpKind::Measure => "measure",
            OpKind::Reset => "reset",
            OpKind::Barrier => "barrier",
            OpKind::Delay => "delay",
            OpKind::CallGate { .. } => "call_gate",
            OpKind::QuantumConst(_) => "quantum.const",
        }
    }

    /// The source layer this kind belongs to, or `None` for structural
    /// and target kinds.
    pub fn layer(&self) -> Option<Layer> {
        match self {
            OpKind::SystemInit
            | OpKind::ShotInit
            | OpKind::SystemFinalize
            | OpKind::Synchronize => Some(Layer::SystemControl),
            OpKind::Cast => Some(Layer::ClassicalBit),
            OpKind::DeclareQubit { .. }
            | OpKind::GateU
            | OpKind::GateCx
            | OpKind::Measure
            | OpKind::Reset
            | OpKind::Barrier
            | OpKind::Delay
            | OpKind::CallGate { .. }
            | OpKind::QuantumConst(_) => Some(Layer::QuantumCircuit),
            _ => None,
        }
    }

    /// Whether this kind belongs to one of the three source layers that
    /// lowering must eliminate.
    pub fn is_source_layer(&self) -> bool {
        self.layer().is_some()
    }

    /// Whether operations of this kind expose qubit usage to the
    /// qubit-usage analyzer.
    ///
    /// A qualifying operation reports its own qubit ids and the analyzer
    /// does not descend into its regions (outermost claim wins).
    pub fn exposes_qubits(&self) -> bool {
        matches!(
            self,
            OpKind::DeclareQubit { .. }
                | OpKind::GateU
                | OpKind::GateCx
                | OpKind::Measure
                | OpKind::Reset
                | OpKind::Barrier
                | OpKind::Delay
                | OpKind::Synchronize
                | OpKind::CallGate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_partition() {
        assert_eq!(OpKind::SystemInit.layer(), Some(Layer::SystemControl));
        assert_eq!(OpKind::Cast.layer(), Some(Layer::ClassicalBit));
        assert_eq!(OpKind::GateU.layer(), Some(Layer::QuantumCircuit));
        assert_eq!(OpKind::Load.layer(), None);
        assert!(!OpKind::Return.is_source_layer());
        assert!(OpKind::Measure.is_source_layer());
    }

    #[test]
    fn test_qubit_exposure() {
        assert!(
            OpKind::DeclareQubit {
                id: QubitId(0),
                width: 1
            }
            .exposes_qubits()
        );
        assert!(OpKind::Barrier.exposes_qubits());
        assert!(!OpKind::SystemInit.exposes_qubits());
        assert!(!OpKind::Scope.exposes_qubits());
    }
}
