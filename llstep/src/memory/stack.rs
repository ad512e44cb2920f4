//! Register environments and saved caller frames.
//!
//! The active function runs in an [`Activation`]: the statements still to run in
//! the current block, the block's terminator and the register bindings. A call
//! moves the caller's activation onto the [`CallStack`]; a return moves it back.

use crate::error::ExecError;
use crate::ir::{Block, FunctionDecl, Statement, Terminator};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};

/// SSA register bindings of one activation.
///
/// Parameters are bound once at function entry. Every other register belongs to
/// the block that produced it and is dropped on the next block transition.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    params: HashMap<String, Value>,
    block: HashMap<String, Value>,
}

impl Registers {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.block.get(name).or_else(|| self.params.get(name))
    }

    /// Binds a block register. Rebinding is rejected and keeps the first value.
    pub fn bind(&mut self, name: &str, value: Value) -> Result<(), ExecError> {
        if self.get(name).is_some() {
            return Err(ExecError::DoubleAssignment {
                name: name.to_string(),
            });
        }
        self.block.insert(name.to_string(), value);
        Ok(())
    }

    pub fn bind_param(&mut self, name: &str, value: Value) -> Result<(), ExecError> {
        if self.params.contains_key(name) {
            return Err(ExecError::DoubleAssignment {
                name: name.to_string(),
            });
        }
        self.params.insert(name.to_string(), value);
        Ok(())
    }

    pub fn clear_block(&mut self) {
        self.block.clear();
    }
}

/// Execution position within one function call.
#[derive(Debug, Clone)]
pub struct Activation<'p> {
    pub function: &'p FunctionDecl,
    pub statements: VecDeque<Cow<'p, Statement>>,
    pub terminator: &'p Terminator,
    pub registers: Registers,
}

impl<'p> Activation<'p> {
    /// Starts `function` at its entry block with empty registers.
    pub fn start(function: &'p FunctionDecl) -> Result<Self, ExecError> {
        let entry = block(function, &function.entry)?;
        Ok(Self {
            function,
            statements: entry.statements.iter().map(Cow::Borrowed).collect(),
            terminator: &entry.terminator,
            registers: Registers::default(),
        })
    }

    /// Moves to the block named `label`, dropping the registers of the block just left.
    pub fn enter_block(&mut self, label: &str) -> Result<(), ExecError> {
        let next = block(self.function, label)?;
        self.statements = next.statements.iter().map(Cow::Borrowed).collect();
        self.terminator = &next.terminator;
        self.registers.clear_block();
        Ok(())
    }
}

fn block<'p>(function: &'p FunctionDecl, label: &str) -> Result<&'p Block, ExecError> {
    function
        .blocks
        .get(label)
        .ok_or_else(|| ExecError::UnknownLabel {
            function: function.name.clone(),
            label: label.to_string(),
        })
}

/// A suspended caller waiting for its callee to return.
#[derive(Debug, Clone)]
pub struct StackFrame<'p> {
    pub caller: Activation<'p>,
    /// Register in the caller that receives the returned value.
    pub dest: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CallStack<'p> {
    frames: Vec<StackFrame<'p>>,
}

impl<'p> CallStack<'p> {
    pub fn push(&mut self, frame: StackFrame<'p>) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<StackFrame<'p>> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[StackFrame<'p>] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Operand;

    fn two_blocks() -> FunctionDecl {
        FunctionDecl::new(
            "f",
            vec![],
            "a",
            vec![
                ("a", Block::new(vec![], Terminator::Br("b".into()))),
                ("b", Block::new(vec![], Terminator::Ret(Some(Operand::Const(1))))),
            ],
        )
    }

    #[test]
    fn test_double_assignment_keeps_first() {
        let mut regs = Registers::default();
        regs.bind("x", Value::Int(1)).unwrap();
        assert_eq!(
            regs.bind("x", Value::Int(2)),
            Err(ExecError::DoubleAssignment { name: "x".into() })
        );
        assert_eq!(regs.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_params_survive_block_transition() {
        let func = two_blocks();
        let mut act = Activation::start(&func).unwrap();
        act.registers.bind_param("p", Value::Int(3)).unwrap();
        act.registers.bind("x", Value::Int(5)).unwrap();

        act.enter_block("b").unwrap();
        assert_eq!(act.registers.get("p"), Some(&Value::Int(3)));
        assert_eq!(act.registers.get("x"), None);
        assert_eq!(act.terminator, &Terminator::Ret(Some(Operand::Const(1))));
    }

    #[test]
    fn test_unknown_label() {
        let func = two_blocks();
        let mut act = Activation::start(&func).unwrap();
        assert!(matches!(
            act.enter_block("missing"),
            Err(ExecError::UnknownLabel { .. })
        ));
    }
}
