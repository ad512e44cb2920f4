use crate::error::ExecError;
use crate::ir::{BinOp, CmpOp};

/// Trait for evaluating binary operations on integer values.
pub trait BinaryEval {
    /// Evaluates a binary operation on two 64-bit operands.
    ///
    /// Arithmetic wraps on overflow. Shift amounts are taken modulo 64.
    fn eval(&self, left: i64, right: i64) -> Result<i64, ExecError>;
}

/// Trait for evaluating integer comparisons.
pub trait CompareEval {
    fn eval(&self, left: i64, right: i64) -> bool;
}

impl BinaryEval for BinOp {
    fn eval(&self, left: i64, right: i64) -> Result<i64, ExecError> {
        let shift = right as u32;
        Ok(match self {
            BinOp::Add => left.wrapping_add(right),
            BinOp::Sub => left.wrapping_sub(right),
            BinOp::Mul => left.wrapping_mul(right),
            BinOp::Sdiv => {
                if right == 0 {
                    return Err(ExecError::DivisionByZero);
                }
                left.wrapping_div(right)
            }
            BinOp::Shl => left.wrapping_shl(shift),
            BinOp::Ashr => left.wrapping_shr(shift),
            BinOp::Lshr => (left as u64).wrapping_shr(shift) as i64,
            BinOp::And => left & right,
            BinOp::Or => left | right,
            BinOp::Xor => left ^ right,
        })
    }
}

impl CompareEval for CmpOp {
    fn eval(&self, left: i64, right: i64) -> bool {
        match self {
            CmpOp::Eq => left == right,
            CmpOp::Ne => left != right,
            CmpOp::Slt => left < right,
            CmpOp::Sle => left <= right,
            CmpOp::Sgt => left > right,
            CmpOp::Sge => left >= right,
        }
    }
}
