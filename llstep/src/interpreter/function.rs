//! Function calls and returns.
//!
//! A call to a declared function saves the caller's activation on the call
//! stack together with the register waiting for the result, and switches to
//! the callee's entry block. A return restores the caller and puts a
//! `call_result` instruction in front of its remaining statements, so the value
//! is bound by the very next step.

use super::builtins::Builtin;
use super::{Machine, MachineState, assign_prefix};
use crate::error::ExecError;
use crate::ir::{FunctionDecl, Instruction, Operand, Statement, Type};
use crate::memory::{Activation, StackFrame};
use crate::trace::Trace;
use crate::value::Value;
use smallvec::SmallVec;
use std::borrow::Cow;
use tracing::info;

/// Argument values of a single call.
type Args = SmallVec<[Value; 4]>;

/// Creates the activation for a call to `function`, binding parameters in
/// declaration order.
pub(super) fn activate<'p>(
    function: &'p FunctionDecl,
    args: &[Value],
    trace: &mut Trace,
) -> Result<Activation<'p>, ExecError> {
    let mut activation = Activation::start(function)?;
    if args.len() != function.params.len() {
        trace.report(ExecError::ArgumentCount {
            function: function.name.clone(),
            expected: function.params.len(),
            found: args.len(),
        });
    }
    for (param, value) in function.params.iter().zip(args) {
        if let Err(err) = activation.registers.bind_param(&param.name, value.clone()) {
            trace.report(err);
        }
    }
    Ok(activation)
}

impl<'p> Machine<'p> {
    pub(super) fn execute_call(
        &mut self,
        dest: Option<&str>,
        ret: &Type,
        callee: &Operand,
        args: &[Operand],
    ) -> Result<(), ExecError> {
        let Operand::Global(name) = callee else {
            self.trace.record(format!("{}call {callee}", assign_prefix(dest)));
            self.report(ExecError::UnknownCallee {
                callee: callee.to_string(),
            });
            return Ok(());
        };
        let values: Args = args.iter().map(|arg| self.eval(arg)).collect();
        let rendered = values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        if let Some(builtin) = Builtin::lookup(name) {
            let outcome = self.call_builtin(builtin, &values)?;
            let line = format!("{}call {name}({rendered})", assign_prefix(dest));
            match &outcome.value {
                Some(value) => self.trace.record(format!("{line} -> {value}")),
                None => self.trace.record(line),
            }
            if outcome.should_halt {
                info!("Built-in {name} halted the program");
                self.state = MachineState::Halted(outcome.value);
            } else if let (Some(dest), Some(value)) = (dest, outcome.value) {
                self.bind(dest, value);
            }
            return Ok(());
        }

        let program = self.program;
        let Some(function) = program.function(name) else {
            self.trace.record(format!("{}call @{name}({rendered})", assign_prefix(dest)));
            let err = if Builtin::is_reserved(name) {
                ExecError::UnknownBuiltin { name: name.clone() }
            } else {
                ExecError::UnknownCallee {
                    callee: callee.to_string(),
                }
            };
            self.report(err);
            return Ok(());
        };

        self.check_return_type(function, ret);
        let callee_activation = activate(function, &values, &mut self.trace)?;
        self.trace.record(format!(
            "{}call @{name}({rendered}) -> entering {}",
            assign_prefix(dest),
            function.entry
        ));
        let caller = std::mem::replace(&mut self.current, callee_activation);
        self.stack.push(StackFrame {
            caller,
            dest: dest.map(str::to_string),
        });
        info!("Calling {} at depth {}", function.name, self.stack.depth());
        Ok(())
    }

    /// The call site's return type must match the callee's declaration.
    fn check_return_type(&mut self, function: &FunctionDecl, ret: &Type) {
        let declared = self.resolver.resolve(&function.ret);
        let expected = self.resolver.resolve(ret);
        if let (Ok(declared), Ok(expected)) = (declared, expected)
            && declared != expected
        {
            self.report(ExecError::TypeMismatch {
                expected: ret.to_string(),
                found: format!("@{} returning {}", function.name, function.ret),
            });
        }
    }

    /// Leaves the current function. Returning from the entry function halts the machine.
    pub(super) fn return_from_function(&mut self, value: Option<Value>) {
        let Some(frame) = self.stack.pop() else {
            info!("Function {} returned with value: {:?}", self.current.function.name, value);
            self.state = MachineState::Halted(value);
            return;
        };
        info!(
            "Returning from {} to {}",
            self.current.function.name, frame.caller.function.name
        );
        self.current = frame.caller;
        if let Some(value) = value {
            self.current.statements.push_front(Cow::Owned(Statement {
                dest: frame.dest,
                inst: Instruction::CallResult { value },
            }));
        }
    }
}
