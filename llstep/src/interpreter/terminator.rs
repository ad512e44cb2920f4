use super::Machine;
use crate::error::ExecError;
use crate::ir::Terminator;
use crate::ty::Layout;
use tracing::debug;

impl<'p> Machine<'p> {
    /// Ends the current block by branching or returning.
    pub(super) fn execute_terminator(
        &mut self,
        terminator: &'p Terminator,
    ) -> Result<(), ExecError> {
        match terminator {
            Terminator::Br(label) => self.branch(label, format!("br label %{label}")),
            Terminator::CondBr {
                ty,
                cond,
                then_label,
                else_label,
            } => {
                let layout = self.layout_of(ty);
                if layout != Layout::Int(1) {
                    self.report(ExecError::ConditionWidth { ty: ty.to_string() });
                }
                let taken = self.eval_int(cond) != 0;
                let label = if taken { then_label } else { else_label };
                self.branch(label, format!("br {ty} {cond}({taken}) -> %{label}"))
            }
            Terminator::Ret(operand) => {
                let value = operand.as_ref().map(|operand| self.eval(operand));
                match &value {
                    Some(value) => self.trace.record(format!("ret {value}")),
                    None => self.trace.record("ret void".to_string()),
                }
                self.return_from_function(value);
                Ok(())
            }
        }
    }

    fn branch(&mut self, label: &str, line: String) -> Result<(), ExecError> {
        self.current.enter_block(label)?;
        debug!("{}: entering block {label}", self.current.function.name);
        self.trace.record(line);
        Ok(())
    }
}
