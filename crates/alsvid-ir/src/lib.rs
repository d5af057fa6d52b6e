//! Alsvid Operation-Graph Intermediate Representation
//!
//! This crate provides the core data structures shared by the Alsvid
//! lowering stack: a mutable operation graph with typed SSA values,
//! sequential blocks and nested regions, plus the read-only qubit-usage
//! analysis built on top of it.
//!
//! # Overview
//!
//! A compiled unit is a [`Graph`]: a module block holding function
//! operations, each with a sequential body block that may nest further
//! regions. Operations are a closed set of variants ([`OpKind`]) spanning
//! three source layers (system-control, classical-bit, quantum-circuit)
//! and the structural/target layer that survives lowering.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] for addressing qubit resources, assigned in
//!   declaration order
//! - **Types**: [`Type`] covering both abstract source types and physical
//!   target types
//! - **Operations**: [`OpKind`] tagged union, [`Graph`] arena with
//!   insert/erase/replace mutation
//! - **Analysis**: [`analysis`] for set-based qubit-usage reasoning
//!
//! # Example: Independence of two gates
//!
//! ```rust
//! use alsvid_ir::{Graph, OpKind, QubitId, Type, analysis};
//!
//! let mut g = Graph::new();
//! let main = g.add_func("main", vec![], vec![]).unwrap();
//! let body = g.func_body(main).unwrap();
//!
//! let d0 = g
//!     .append_op(
//!         body,
//!         OpKind::DeclareQubit { id: QubitId(0), width: 1 },
//!         vec![],
//!         vec![Type::Qubit],
//!     )
//!     .unwrap();
//! let d1 = g
//!     .append_op(
//!         body,
//!         OpKind::DeclareQubit { id: QubitId(1), width: 1 },
//!         vec![],
//!         vec![Type::Qubit],
//!     )
//!     .unwrap();
//!
//! // Gates on disjoint qubits are independent.
//! assert!(!analysis::ops_share_qubits(&g, d0, d1));
//! ```

pub mod analysis;
pub mod error;
pub mod graph;
pub mod op;
pub mod qubit;
pub mod types;

pub use analysis::QubitSet;
pub use error::{IrError, IrResult};
pub use graph::{BlockId, Graph, InsertPoint, OpData, OpId, ValueId};
pub use op::{ConstValue, Layer, OpKind};
pub use qubit::QubitId;
pub use types::Type;
