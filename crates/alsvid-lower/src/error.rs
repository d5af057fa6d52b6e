//! Error types for the lowering crate.

use alsvid_ir::{IrError, QubitId, Type};
use thiserror::Error;

/// Errors produced while lowering a unit to runtime calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LowerError {
    /// Multi-qubit declarations cannot be lowered yet.
    #[error("Qubit declaration {id} has width {width}; only width-1 declarations are supported")]
    UnsupportedQubitWidth {
        /// The declared qubit id.
        id: QubitId,
        /// The offending declaration width.
        width: u32,
    },

    /// Measurement of more than one qubit at a time is not supported.
    #[error("Measurement of {operands} qubits; only single-qubit measurement is supported")]
    MultiQubitMeasurement {
        /// Number of measured operands.
        operands: usize,
    },

    /// A type has no legal physical form.
    #[error("Type {ty} has no legal conversion")]
    UnconvertibleType {
        /// The offending type.
        ty: Type,
    },

    /// An angle without a declared width cannot be lowered.
    #[error("Cannot lower an angle with no declared width")]
    AngleWidthRequired,

    /// The unit has no designated entry function.
    #[error("Unit has no entry function '{0}'")]
    MissingEntryFunction(&'static str),

    /// State initialization needs at least one qubit declaration.
    #[error("Cannot initialize the simulation state: no qubit is declared")]
    NoQubitDeclared,

    /// A full sweep applied no rule while illegal operations remain.
    #[error("Lowering did not converge: {remaining} illegal operation(s) with no applicable rule")]
    NotConverged {
        /// Number of illegal operations left.
        remaining: usize,
    },

    /// Malformed simulator configuration.
    #[error("Invalid simulator configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// Graph mutation failed.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
}

/// Result type for lowering operations.
pub type LowerResult<T> = Result<T, LowerError>;
