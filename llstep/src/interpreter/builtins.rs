//! Intrinsic functions implemented by the machine itself.

use super::Machine;
use crate::error::ExecError;
use crate::value::{Cell, Value};
use num_traits::ToPrimitive;
use tracing::info;

/// Built-in functions, called like any other global function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `llstep.alloc(n)`: allocate `n` uninitialized cells.
    Alloc,
    /// `llstep.array_new(len, template)`: allocate a `{ len, contents* }` header
    /// and `len` content cells copied from `template`.
    ArrayNew,
    /// `llstep.print_str(ptr)`: print the string stored at `ptr`.
    PrintStr,
    /// `llstep.print_int(v)`: print an integer.
    PrintInt,
}

/// What a built-in call produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuiltinOutcome {
    pub value: Option<Value>,
    /// Stop the program with `value` as its result. Reserved: no built-in sets it yet.
    pub should_halt: bool,
}

impl BuiltinOutcome {
    fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            should_halt: false,
        }
    }
}

impl Builtin {
    /// Every built-in name starts with this prefix.
    pub const PREFIX: &'static str = "llstep.";

    const ALL: [Builtin; 4] = [
        Builtin::Alloc,
        Builtin::ArrayNew,
        Builtin::PrintStr,
        Builtin::PrintInt,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    /// Whether `name` lies in the built-in namespace, known or not.
    pub fn is_reserved(name: &str) -> bool {
        name.starts_with(Self::PREFIX)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Alloc => "llstep.alloc",
            Builtin::ArrayNew => "llstep.array_new",
            Builtin::PrintStr => "llstep.print_str",
            Builtin::PrintInt => "llstep.print_int",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Builtin::ArrayNew => 2,
            Builtin::Alloc | Builtin::PrintStr | Builtin::PrintInt => 1,
        }
    }
}

impl Machine<'_> {
    pub(super) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: &[Value],
    ) -> Result<BuiltinOutcome, ExecError> {
        if args.len() != builtin.arity() {
            self.report(ExecError::ArgumentCount {
                function: builtin.name().to_string(),
                expected: builtin.arity(),
                found: args.len(),
            });
        }
        let mut ints = [0i64; 2];
        for (slot, arg) in ints.iter_mut().zip(args) {
            *slot = self.expect_int(arg.clone());
        }

        match builtin {
            Builtin::Alloc => {
                let count = ints[0].to_usize().unwrap_or(0);
                let base = self.heap.allocate(count)?;
                Ok(BuiltinOutcome::value(Value::Int(base as i64)))
            }
            Builtin::ArrayNew => {
                let [len, template] = ints;
                let len = len.to_usize().unwrap_or(0);
                // Header and contents share one allocation.
                let header = self.heap.allocate(len.saturating_add(2))?;
                let contents = header + 2;
                for offset in 0..len {
                    let source = self.heap.checked(template.wrapping_add(offset as i64))?;
                    if let Cell::Value(value) = self.heap.read(source)?.clone() {
                        self.heap.write(contents + offset, value)?;
                    }
                }
                self.heap.write(header, Value::Int(len as i64))?;
                self.heap.write(header + 1, Value::Int(contents as i64))?;
                Ok(BuiltinOutcome::value(Value::Int(header as i64)))
            }
            Builtin::PrintStr => {
                let address = self.heap.checked(ints[0])?;
                match self.heap.read(address)?.clone() {
                    Cell::Value(Value::Str(text)) => self.print(text),
                    Cell::Value(other) => self.report(ExecError::TypeMismatch {
                        expected: "string".to_string(),
                        found: other.to_string(),
                    }),
                    Cell::Uninit => self.report(ExecError::UninitializedRead { address }),
                }
                Ok(BuiltinOutcome::default())
            }
            Builtin::PrintInt => {
                self.print(ints[0].to_string());
                Ok(BuiltinOutcome::default())
            }
        }
    }

    fn print(&mut self, text: String) {
        info!(target: "llstep::output", "{text}");
        self.output.push(text);
    }
}
