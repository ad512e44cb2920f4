//! Address computation for `gep` instructions.
//!
//! The first index strides over whole elements of the declared element type.
//! Each further index selects a field of the current struct, advancing the
//! address by the sizes of the fields before it.

use crate::error::ExecError;
use crate::ir::Operand;
use crate::ty::Layout;
use num_traits::ToPrimitive;

/// Result of an address computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedAddress {
    pub address: i64,
    /// Human-readable arithmetic that produced `address`.
    pub formula: String,
}

impl super::Machine<'_> {
    /// Computes the address reached from `base` by walking `indices` through the
    /// already resolved element layout `elem`.
    ///
    /// Steps the walk cannot follow are reported and end the walk early; the
    /// address computed up to that point is returned.
    pub(super) fn compute_address(
        &mut self,
        base: &Operand,
        elem: &Layout,
        indices: &[Operand],
    ) -> ComputedAddress {
        let mut address = self.eval_int(base);
        let mut formula = format!("{base}({address})");

        let Some((first, rest)) = indices.split_first() else {
            return ComputedAddress { address, formula };
        };
        let mut layout = elem.clone();
        let stride = layout.size() as i64;
        let index = self.eval_int(first);
        address = address.wrapping_add(index.wrapping_mul(stride));
        formula.push_str(&format!(" + {index}*{stride}"));

        for step in rest {
            if !matches!(layout, Layout::Struct(_)) {
                self.report(ExecError::UnsupportedGep {
                    ty: layout.to_string(),
                });
                break;
            }
            let Operand::Const(index) = step else {
                self.report(ExecError::NonConstantStructIndex {
                    operand: step.to_string(),
                });
                break;
            };
            let Some((offset, field)) = index.to_usize().and_then(|idx| layout.field_offset(idx))
            else {
                self.report(ExecError::FieldOutOfRange {
                    index: *index,
                    ty: layout.to_string(),
                });
                break;
            };
            address = address.wrapping_add(offset as i64);
            formula.push_str(&format!(" + {offset}"));
            layout = field.clone();
        }

        ComputedAddress { address, formula }
    }
}
