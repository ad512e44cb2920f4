//! This module provides the core interpretation logic.
//!
//! A [`Machine`] owns the whole execution state of one run: the heap, the global
//! addresses, the active function's position and registers, and the stack of
//! suspended callers. [`Machine::step`] executes exactly one instruction or
//! terminator. Calls and returns are state transitions on the machine rather
//! than nested host calls, so the depth of IR recursion never touches the host
//! stack.

mod builtins;
mod function;
mod instruction;
mod operand;
mod place;
mod rvalue;
mod terminator;

pub use builtins::{Builtin, BuiltinOutcome};
pub use operand::evaluate;
pub use rvalue::{BinaryEval, CompareEval};

use crate::error::ExecError;
use crate::ir::{Program, Type};
use crate::memory::{Activation, Address, CallStack, Heap, load_globals};
use crate::trace::Trace;
use crate::ty::{Layout, TypeResolver};
use crate::value::Value;
use std::collections::HashMap;
use tracing::info;

/// Where the machine is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineState {
    Running,
    /// The entry function returned. Holds the program result, if any.
    Halted(Option<Value>),
}

#[derive(Debug)]
pub struct Machine<'p> {
    program: &'p Program,
    resolver: TypeResolver<'p>,
    heap: Heap,
    globals: HashMap<String, Address>,
    current: Activation<'p>,
    stack: CallStack<'p>,
    state: MachineState,
    trace: Trace,
    output: Vec<String>,
    steps: u64,
}

impl<'p> Machine<'p> {
    /// Lays out the program's globals and prepares `entry` to run with `args`.
    pub fn new(program: &'p Program, entry: &str, args: &[Value]) -> Result<Self, ExecError> {
        let resolver = TypeResolver::new(program.types());
        let mut heap = Heap::new();
        let mut trace = Trace::new();
        let globals = load_globals(program.globals(), &resolver, &mut heap, &mut trace)?;

        let function = program
            .function(entry)
            .ok_or_else(|| ExecError::UnknownFunction {
                name: entry.to_string(),
            })?;
        let current = function::activate(function, args, &mut trace)?;
        info!("Starting interpretation of {}", function.name);

        Ok(Self {
            program,
            resolver,
            heap,
            globals,
            current,
            stack: CallStack::default(),
            state: MachineState::Running,
            trace,
            output: Vec::new(),
            steps: 0,
        })
    }

    /// Executes the next instruction, or the block terminator once the block's
    /// instructions are exhausted.
    ///
    /// Returns an error only for fatal diagnostics. The failing instruction is
    /// left pending, so the machine can still be inspected.
    pub fn step(&mut self) -> Result<&MachineState, ExecError> {
        if matches!(self.state, MachineState::Halted(_)) {
            return Ok(&self.state);
        }

        if let Some(statement) = self.current.statements.pop_front() {
            if let Err(err) = self.execute_statement(&statement) {
                self.current.statements.push_front(statement);
                return Err(self.fatal(err));
            }
        } else {
            let terminator = self.current.terminator;
            if let Err(err) = self.execute_terminator(terminator) {
                return Err(self.fatal(err));
            }
        }

        self.steps += 1;
        Ok(&self.state)
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, MachineState::Halted(_))
    }

    /// Number of instructions and terminators executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn global_address(&self, name: &str) -> Option<Address> {
        self.globals.get(name).copied()
    }

    /// Looks up a register of the active function.
    pub fn register(&self, name: &str) -> Option<&Value> {
        self.current.registers.get(name)
    }

    /// Name of the function currently executing.
    pub fn current_function(&self) -> &str {
        &self.current.function.name
    }

    /// Names of the active function and its suspended callers, innermost first.
    pub fn backtrace(&self) -> Vec<&str> {
        std::iter::once(self.current.function)
            .chain(self.stack.frames().iter().rev().map(|frame| frame.caller.function))
            .map(|function| function.name.as_str())
            .collect()
    }

    /// Number of suspended callers.
    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn diagnostics(&self) -> &[ExecError] {
        self.trace.diagnostics()
    }

    /// Drains the text printed by built-ins since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn report(&mut self, err: ExecError) {
        self.trace.report(err);
    }

    fn fatal(&mut self, err: ExecError) -> ExecError {
        self.trace.report(err.clone());
        err
    }

    /// Binds a register of the active function, reporting rebinds.
    fn bind(&mut self, dest: &str, value: Value) {
        if let Err(err) = self.current.registers.bind(dest, value) {
            self.report(err);
        }
    }

    /// Resolves `ty`, falling back to `void` after reporting a bad type.
    fn layout_of(&mut self, ty: &Type) -> Layout {
        match self.resolver.resolve(ty) {
            Ok(layout) => layout,
            Err(err) => {
                self.report(err);
                Layout::Void
            }
        }
    }
}

/// Formats the `%dest = ` prefix of a trace line.
fn assign_prefix(dest: Option<&str>) -> String {
    dest.map(|d| format!("%{d} = ")).unwrap_or_default()
}
