//! Type conversion between the abstract source layers and the physical
//! target layer.

use alsvid_ir::{Graph, InsertPoint, OpKind, Type, ValueId};
use tracing::warn;

use crate::error::{LowerError, LowerResult};

/// Maps abstract domain types to physical target types and defines how
/// abstract-typed values are materialized from their physical form.
///
/// Conversion rules apply in order, first match wins; already-physical
/// types convert to themselves so structural types such as function
/// signatures stay legal across repeated passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeConverter;

impl TypeConverter {
    /// Convert a type to its physical form.
    pub fn convert(&self, ty: &Type) -> LowerResult<Type> {
        match ty {
            // Qubits become opaque 64-bit integer handles.
            Type::Qubit => Ok(Type::int64()),
            // Classical bits keep their width, up to the 64-bit limit.
            Type::Bit { width } if *width <= 64 => Ok(Type::Int { width: *width }),
            Type::Bit { .. } => Err(LowerError::UnconvertibleType { ty: ty.clone() }),
            Type::Angle { width: Some(_) } => Ok(Type::Float64),
            Type::Angle { width: None } => {
                warn!("cannot lower an angle with no declared width");
                Err(LowerError::AngleWidthRequired)
            }
            Type::Duration => Ok(Type::int64()),
            // Physical types pass through unchanged (idempotence).
            Type::Index
            | Type::Int { .. }
            | Type::Float64
            | Type::Handle
            | Type::Str
            | Type::Ptr(_) => Ok(ty.clone()),
        }
    }

    /// Whether every parameter and result type is already physical.
    pub fn is_signature_legal(&self, params: &[Type], results: &[Type]) -> bool {
        params.iter().chain(results).all(Type::is_physical)
    }

    /// Whether every parameter and result type has some legal conversion.
    pub fn is_signature_convertible(&self, params: &[Type], results: &[Type]) -> bool {
        params
            .iter()
            .chain(results)
            .all(|ty| self.convert(ty).is_ok())
    }

    /// Reconstruct an abstract-typed value from its physical form, for
    /// consumers that have not been converted yet.
    ///
    /// Qubits, durations and bits materialize as the physical value
    /// itself; angles insert an explicit cast back to the abstract angle
    /// representation.
    pub fn materialize(
        &self,
        graph: &mut Graph,
        at: InsertPoint,
        ty: &Type,
        value: ValueId,
    ) -> LowerResult<ValueId> {
        match ty {
            Type::Angle { .. } => {
                let cast = graph.insert_op(at, OpKind::Cast, vec![value], vec![ty.clone()])?;
                Ok(graph.result(cast, 0))
            }
            _ => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_conversion_rules() {
        let tc = TypeConverter;
        assert_eq!(tc.convert(&Type::Qubit).unwrap(), Type::int64());
        assert_eq!(
            tc.convert(&Type::Bit { width: 8 }).unwrap(),
            Type::Int { width: 8 }
        );
        assert_eq!(
            tc.convert(&Type::Angle { width: Some(32) }).unwrap(),
            Type::Float64
        );
        assert_eq!(tc.convert(&Type::Duration).unwrap(), Type::int64());
        assert_eq!(tc.convert(&Type::Index).unwrap(), Type::Index);
    }

    #[test]
    fn test_wide_bit_has_no_conversion() {
        let err = TypeConverter.convert(&Type::Bit { width: 65 }).unwrap_err();
        assert!(matches!(err, LowerError::UnconvertibleType { .. }));
        // 64 bits is still fine.
        assert!(TypeConverter.convert(&Type::Bit { width: 64 }).is_ok());
    }

    #[test]
    fn test_widthless_angle_fails() {
        let err = TypeConverter
            .convert(&Type::Angle { width: None })
            .unwrap_err();
        assert!(matches!(err, LowerError::AngleWidthRequired));
    }

    #[test]
    fn test_signature_legality() {
        let tc = TypeConverter;
        assert!(tc.is_signature_legal(&[Type::int64(), Type::Float64], &[Type::Handle]));
        assert!(!tc.is_signature_legal(&[Type::Qubit], &[]));
        assert!(tc.is_signature_legal(&[], &[]));
    }

    #[test]
    fn test_angle_materialization_inserts_cast() {
        let mut g = Graph::new();
        let f = g.add_func("main", vec![], vec![]).unwrap();
        let body = g.func_body(f).unwrap();
        let c = g
            .append_op(
                body,
                OpKind::ConstFloat { value: 1.5 },
                vec![],
                vec![Type::Float64],
            )
            .unwrap();
        let phys = g.result(c, 0);

        let ty = Type::Angle { width: Some(32) };
        let materialized = TypeConverter
            .materialize(&mut g, InsertPoint::End(body), &ty, phys)
            .unwrap();

        assert_ne!(materialized, phys);
        assert_eq!(g.value_ty(materialized), &ty);
        let cast = g.def(materialized).unwrap();
        assert_eq!(g[cast].kind, OpKind::Cast);
        assert_eq!(g[cast].operands, vec![phys]);
    }

    #[test]
    fn test_qubit_materialization_is_identity() {
        let mut g = Graph::new();
        let f = g.add_func("main", vec![], vec![]).unwrap();
        let body = g.func_body(f).unwrap();
        let c = g
            .append_op(
                body,
                OpKind::ConstInt { value: 0, width: 64 },
                vec![],
                vec![Type::int64()],
            )
            .unwrap();
        let phys = g.result(c, 0);
        let before = g.num_ops();

        let materialized = TypeConverter
            .materialize(&mut g, InsertPoint::End(body), &Type::Qubit, phys)
            .unwrap();

        assert_eq!(materialized, phys);
        assert_eq!(g.num_ops(), before);
    }

    fn any_type() -> impl Strategy<Value = Type> {
        prop_oneof![
            Just(Type::Qubit),
            (1u32..=128).prop_map(|width| Type::Bit { width }),
            proptest::option::of(1u32..=64).prop_map(|width| Type::Angle { width }),
            Just(Type::Duration),
            Just(Type::Index),
            (1u32..=64).prop_map(|width| Type::Int { width }),
            Just(Type::Float64),
        ]
    }

    proptest! {
        /// A successful conversion is a fixed point: converting the
        /// converted type changes nothing.
        #[test]
        fn prop_conversion_idempotent(ty in any_type()) {
            let tc = TypeConverter;
            if let Ok(converted) = tc.convert(&ty) {
                prop_assert_eq!(tc.convert(&converted).unwrap(), converted);
            }
        }

        /// Conversion never produces an abstract type.
        #[test]
        fn prop_conversion_targets_physical(ty in any_type()) {
            if let Ok(converted) = TypeConverter.convert(&ty) {
                prop_assert!(converted.is_physical());
            }
        }
    }
}
