//! Lowering of circuit units onto the external simulation runtime.
//!
//! # Overview
//!
//! This crate rewrites a unit expressed in the abstract source layers of
//! [`alsvid_ir`] into a flat sequence of calls against a fixed runtime
//! ABI. The rewrite is driven by [`LowerToRuntime`], a fixed-point
//! legalization engine: a one-time setup phase declares the runtime
//! function table, the global state slot and the measurement scratch
//! buffer, then priority-ordered rules run in sweeps until no illegal
//! operation remains. Failure at any point aborts the whole lowering;
//! there is no partial output.
//!
//! # Example
//!
//! ```
//! use alsvid_ir::{Graph, OpKind, QubitId, Type};
//! use alsvid_lower::{LowerToRuntime, SimulatorConfig};
//!
//! let mut graph = Graph::new();
//! let main = graph.add_func("main", vec![], vec![])?;
//! let body = graph.func_body(main).unwrap();
//! graph.append_op(
//!     body,
//!     OpKind::DeclareQubit { id: QubitId(0), width: 1 },
//!     vec![],
//!     vec![Type::Qubit],
//! )?;
//!
//! let summary = LowerToRuntime::new(SimulatorConfig::default()).run(&mut graph)?;
//! assert!(summary.rewrites >= 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod state;

pub use config::{Device, Method, Precision, SimulatorConfig};
pub use convert::TypeConverter;
pub use engine::{
    classify, entry_function, Legality, LowerToRuntime, LoweringSummary, ENTRY_FUNCTION,
};
pub use error::{LowerError, LowerResult};
pub use runtime::{RuntimeFn, RuntimeTable};
pub use state::{StateSlot, STATE_SLOT_SYMBOL};
