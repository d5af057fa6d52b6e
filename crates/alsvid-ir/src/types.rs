//! Value types carried by the operation graph.
//!
//! Two layers share one enum: the abstract source types (`Qubit`, `Bit`,
//! `Angle`, `Duration`, `Index`) that the lowering must eliminate, and the
//! physical target types (`Int`, `Float64`, plus the opaque runtime types
//! `Handle`, `Str` and `Ptr`) that survive code generation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value type in the operation graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A quantum bit resource (abstract).
    Qubit,
    /// A classical bit vector of the given width (abstract).
    Bit {
        /// Number of bits.
        width: u32,
    },
    /// A rotation angle; the width is the declared binary precision,
    /// if any (abstract).
    Angle {
        /// Declared angle precision in bits, if known.
        width: Option<u32>,
    },
    /// A time duration (abstract).
    Duration,
    /// A loop/index value; legal in both layers and never converted.
    Index,
    /// An integer of the given width (physical).
    Int {
        /// Bit width.
        width: u32,
    },
    /// A 64-bit IEEE float (physical).
    Float64,
    /// The opaque simulation-state handle (physical).
    Handle,
    /// A string constant as expected by the runtime (physical).
    Str,
    /// A pointer to a value of the inner type (physical).
    Ptr(Box<Type>),
}

impl Type {
    /// The 64-bit integer type, the physical form of qubit handles
    /// and durations.
    pub fn int64() -> Self {
        Type::Int { width: 64 }
    }

    /// A single classical bit.
    pub fn bit1() -> Self {
        Type::Bit { width: 1 }
    }

    /// Pointer to 64-bit integers, the measurement scratch buffer type.
    pub fn ptr_int64() -> Self {
        Type::Ptr(Box::new(Type::int64()))
    }

    /// Check whether this type belongs to the physical target layer.
    ///
    /// Physical types survive lowering unchanged; abstract types must be
    /// eliminated by the type converter. `Index` counts as physical since
    /// it passes through every conversion.
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            Type::Int { .. }
                | Type::Float64
                | Type::Index
                | Type::Handle
                | Type::Str
                | Type::Ptr(_)
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Qubit => write!(f, "qubit"),
            Type::Bit { width } => write!(f, "bit<{width}>"),
            Type::Angle { width: Some(w) } => write!(f, "angle<{w}>"),
            Type::Angle { width: None } => write!(f, "angle<?>"),
            Type::Duration => write!(f, "duration"),
            Type::Index => write!(f, "index"),
            Type::Int { width } => write!(f, "i{width}"),
            Type::Float64 => write!(f, "f64"),
            Type::Handle => write!(f, "handle"),
            Type::Str => write!(f, "str"),
            Type::Ptr(inner) => write!(f, "ptr<{inner}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_partition() {
        assert!(Type::int64().is_physical());
        assert!(Type::Float64.is_physical());
        assert!(Type::Index.is_physical());
        assert!(Type::ptr_int64().is_physical());
        assert!(!Type::Qubit.is_physical());
        assert!(!Type::bit1().is_physical());
        assert!(!Type::Angle { width: Some(32) }.is_physical());
        assert!(!Type::Duration.is_physical());
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::Angle { width: None }.to_string(), "angle<?>");
        assert_eq!(Type::ptr_int64().to_string(), "ptr<i64>");
        assert_eq!(Type::Bit { width: 8 }.to_string(), "bit<8>");
    }
}
