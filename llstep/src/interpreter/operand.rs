use crate::error::ExecError;
use crate::ir::Operand;
use crate::memory::{Address, Registers};
use crate::value::Value;
use std::collections::HashMap;

/// Resolves an operand to a value against the active registers and global addresses.
pub fn evaluate(
    operand: &Operand,
    registers: &Registers,
    globals: &HashMap<String, Address>,
) -> Result<Value, ExecError> {
    match operand {
        Operand::Null => Ok(Value::ZERO),
        Operand::Const(v) => Ok(Value::Int(*v)),
        Operand::Global(name) => globals
            .get(name)
            .map(|address| Value::Int(*address as i64))
            .ok_or_else(|| ExecError::UndefinedGlobal { name: name.clone() }),
        Operand::Local(name) => registers
            .get(name)
            .cloned()
            .ok_or_else(|| ExecError::UndefinedRegister { name: name.clone() }),
    }
}

impl super::Machine<'_> {
    /// Evaluates an operand, reporting a missing name and using 0 in its place.
    pub(super) fn eval(&mut self, operand: &Operand) -> Value {
        match evaluate(operand, &self.current.registers, &self.globals) {
            Ok(value) => value,
            Err(err) => {
                self.report(err);
                Value::ZERO
            }
        }
    }

    /// Evaluates an operand that must hold an integer or pointer.
    pub(super) fn eval_int(&mut self, operand: &Operand) -> i64 {
        let value = self.eval(operand);
        self.expect_int(value)
    }

    pub(super) fn expect_int(&mut self, value: Value) -> i64 {
        match value.as_int() {
            Some(v) => v,
            None => {
                self.report(ExecError::TypeMismatch {
                    expected: "integer".to_string(),
                    found: format!("string {value}"),
                });
                0
            }
        }
    }
}
