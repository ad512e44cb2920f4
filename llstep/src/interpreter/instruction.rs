use super::rvalue::{BinaryEval, CompareEval};
use super::{Machine, assign_prefix};
use crate::error::ExecError;
use crate::ir::{Instruction, Statement, Type};
use crate::ty::Layout;
use crate::value::{Cell, Value};
use tracing::debug;

impl Machine<'_> {
    /// Executes one non-terminating instruction and binds its result.
    pub(super) fn execute_statement(&mut self, statement: &Statement) -> Result<(), ExecError> {
        debug!("Executing statement: {:?}", statement.inst);
        let dest = statement.dest.as_deref();

        let Some((value, summary)) = self.execute_instruction(dest, &statement.inst)? else {
            return Ok(());
        };
        let line = match &value {
            Some(value) => format!("{}{summary} -> {value}", assign_prefix(dest)),
            None => summary,
        };
        self.trace.record(line);

        if let (Some(dest), Some(value)) = (dest, value) {
            self.bind(dest, value);
        }
        Ok(())
    }

    /// Returns the instruction's result, if it has one, and a trace summary.
    ///
    /// Calls trace and bind on their own and return `None`.
    fn execute_instruction(
        &mut self,
        dest: Option<&str>,
        inst: &Instruction,
    ) -> Result<Option<(Option<Value>, String)>, ExecError> {
        let executed = match inst {
            Instruction::Binop { op, ty, lhs, rhs } => {
                let left = self.eval_int(lhs);
                let right = self.eval_int(rhs);
                let result = op.eval(left, right).unwrap_or_else(|err| {
                    self.report(err);
                    0
                });
                (Some(Value::Int(result)), format!("{op} {ty} {left}, {right}"))
            }
            Instruction::Compare { cond, ty, lhs, rhs } => {
                let left = self.eval_int(lhs);
                let right = self.eval_int(rhs);
                let result = Value::from_bool(cond.eval(left, right));
                (Some(result), format!("icmp {cond} {ty} {left}, {right}"))
            }
            Instruction::Alloca { ty } => {
                let size = self.layout_of(ty).size();
                let base = self.heap.allocate(size)?;
                (
                    Some(Value::Int(base as i64)),
                    format!("alloca {ty} ({} cells)", size.max(1)),
                )
            }
            Instruction::Load { ty, ptr } => {
                self.check_single_cell(ty, |ty, size| ExecError::UnsupportedLoad { ty, size });
                let raw = self.eval_int(ptr);
                let address = self.heap.checked(raw)?;
                let value = match self.heap.read(address)?.clone() {
                    Cell::Value(value) => value,
                    Cell::Uninit => {
                        self.report(ExecError::UninitializedRead { address });
                        Value::ZERO
                    }
                };
                (Some(value), format!("load {ty} from {ptr}({address})"))
            }
            Instruction::Store { ty, value, ptr } => {
                self.check_single_cell(ty, |ty, size| ExecError::UnsupportedStore { ty, size });
                let value = self.eval(value);
                let raw = self.eval_int(ptr);
                let address = self.heap.checked(raw)?;
                let summary = format!("store {ty} {value} to {ptr}({address})");
                self.heap.write(address, value)?;
                (None, summary)
            }
            Instruction::Cast {
                op,
                from,
                value,
                to,
            } => {
                let result = self.eval(value);
                (Some(result), format!("{op} {from} {value} to {to}"))
            }
            Instruction::Gep {
                elem,
                ptr_ty,
                base,
                indices,
            } => {
                let layout = self.gep_layout(elem, ptr_ty);
                let computed = self.compute_address(base, &layout, indices);
                (
                    Some(Value::Int(computed.address)),
                    format!("gep {elem}, {ptr_ty} {}", computed.formula),
                )
            }
            Instruction::CallResult { value } => (Some(value.clone()), "call result".to_string()),
            Instruction::Call { ret, callee, args } => {
                self.execute_call(dest, ret, callee, args)?;
                return Ok(None);
            }
        };
        Ok(Some(executed))
    }

    /// Loads and stores move exactly one cell.
    fn check_single_cell(&mut self, ty: &Type, err: impl FnOnce(String, usize) -> ExecError) {
        let size = self.layout_of(ty).size();
        if size != 1 {
            self.report(err(ty.to_string(), size));
        }
    }

    /// Resolves the element type of a `gep`, whose base operand must point to it.
    ///
    /// An element type that does not resolve is reported once and walked as `void`.
    fn gep_layout(&mut self, elem: &Type, ptr_ty: &Type) -> Layout {
        let expected = match self.resolver.resolve(elem) {
            Ok(layout) => layout,
            Err(err) => {
                self.report(err);
                return Layout::Void;
            }
        };
        let found = match self.layout_of(ptr_ty) {
            Layout::Pointer(pointee) => Some(self.layout_of(&pointee)),
            _ => None,
        };
        if found.as_ref() != Some(&expected) {
            self.report(ExecError::TypeMismatch {
                expected: format!("{elem}*"),
                found: ptr_ty.to_string(),
            });
        }
        expected
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ExecError;
    use crate::interpreter::{Machine, MachineState};
    use crate::ir::*;
    use crate::value::{Cell, Value};
    use std::collections::BTreeMap;

    /// Runs `statements` in a single-block `main` that returns `%ret`.
    fn run(
        types: &[(&str, Type)],
        params: Vec<(Type, &str)>,
        args: &[Value],
        statements: Vec<Statement>,
    ) -> (Option<Value>, Vec<ExecError>) {
        let types = types
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect::<BTreeMap<_, _>>();
        let prog = Program::new(
            types,
            vec![],
            vec![FunctionDecl::new(
                "main",
                params,
                "entry",
                vec![(
                    "entry",
                    Block::new(statements, Terminator::Ret(Some(Operand::local("ret")))),
                )],
            )],
        );
        let mut machine = Machine::new(&prog, "main", args).unwrap();
        while !machine.is_halted() {
            machine.step().unwrap();
        }
        let MachineState::Halted(result) = machine.state().clone() else {
            unreachable!()
        };
        (result, machine.diagnostics().to_vec())
    }

    fn binop(op: BinOp, lhs: Operand, rhs: Operand) -> Instruction {
        Instruction::Binop {
            op,
            ty: Type::int(64),
            lhs,
            rhs,
        }
    }

    #[test]
    fn test_binop_with_params() {
        let (result, diags) = run(
            &[],
            vec![(Type::int(32), "a"), (Type::int(32), "b")],
            &[Value::Int(3), Value::Int(4)],
            vec![Statement::bind(
                "ret",
                binop(BinOp::Add, Operand::local("a"), Operand::local("b")),
            )],
        );
        assert_eq!(result, Some(Value::Int(7)));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_lshr_is_unsigned() {
        let (result, _) = run(
            &[],
            vec![],
            &[],
            vec![Statement::bind(
                "ret",
                binop(BinOp::Lshr, Operand::Const(-1), Operand::Const(60)),
            )],
        );
        assert_eq!(result, Some(Value::Int(0xF)));
    }

    #[test]
    fn test_division_by_zero_degrades() {
        let (result, diags) = run(
            &[],
            vec![],
            &[],
            vec![Statement::bind(
                "ret",
                binop(BinOp::Sdiv, Operand::Const(5), Operand::Const(0)),
            )],
        );
        assert_eq!(result, Some(Value::ZERO));
        assert_eq!(diags, vec![ExecError::DivisionByZero]);
    }

    #[test]
    fn test_compare() {
        let (result, _) = run(
            &[],
            vec![],
            &[],
            vec![Statement::bind(
                "ret",
                Instruction::Compare {
                    cond: CmpOp::Slt,
                    ty: Type::int(32),
                    lhs: Operand::Const(-3),
                    rhs: Operand::Const(2),
                },
            )],
        );
        assert_eq!(result, Some(Value::Int(1)));
    }

    #[test]
    fn test_alloca_store_load() {
        let (result, diags) = run(
            &[],
            vec![],
            &[],
            vec![
                Statement::bind("p", Instruction::Alloca { ty: Type::int(32) }),
                Statement::effect(Instruction::Store {
                    ty: Type::int(32),
                    value: Operand::Const(41),
                    ptr: Operand::local("p"),
                }),
                Statement::bind(
                    "ret",
                    Instruction::Load {
                        ty: Type::int(32),
                        ptr: Operand::local("p"),
                    },
                ),
            ],
        );
        assert_eq!(result, Some(Value::Int(41)));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_uninitialized_load() {
        let (result, diags) = run(
            &[],
            vec![],
            &[],
            vec![
                Statement::bind("p", Instruction::Alloca { ty: Type::int(32) }),
                Statement::bind(
                    "ret",
                    Instruction::Load {
                        ty: Type::int(32),
                        ptr: Operand::local("p"),
                    },
                ),
            ],
        );
        assert_eq!(result, Some(Value::ZERO));
        assert_eq!(diags, vec![ExecError::UninitializedRead { address: 1 }]);
    }

    #[test]
    fn test_aggregate_load_is_reported() {
        let pair = Type::Struct(vec![Type::int(32), Type::int(32)]);
        let (_, diags) = run(
            &[],
            vec![],
            &[],
            vec![
                Statement::bind("p", Instruction::Alloca { ty: pair.clone() }),
                Statement::effect(Instruction::Store {
                    ty: Type::int(32),
                    value: Operand::Const(1),
                    ptr: Operand::local("p"),
                }),
                Statement::bind(
                    "ret",
                    Instruction::Load {
                        ty: pair,
                        ptr: Operand::local("p"),
                    },
                ),
            ],
        );
        assert!(matches!(
            diags.as_slice(),
            [ExecError::UnsupportedLoad { size: 2, .. }]
        ));
    }

    #[test]
    fn test_casts_are_identity() {
        let (result, _) = run(
            &[],
            vec![],
            &[],
            vec![
                Statement::bind(
                    "b",
                    Instruction::Cast {
                        op: CastOp::Zext,
                        from: Type::int(1),
                        value: Operand::Const(1),
                        to: Type::int(32),
                    },
                ),
                Statement::bind(
                    "ret",
                    Instruction::Cast {
                        op: CastOp::PtrToInt,
                        from: Type::ptr(Type::int(8)),
                        value: Operand::local("b"),
                        to: Type::int(64),
                    },
                ),
            ],
        );
        assert_eq!(result, Some(Value::Int(1)));
    }

    #[test]
    fn test_gep_store_into_field() {
        let node = Type::Struct(vec![Type::int(32), Type::ptr(Type::named("node"))]);
        let (result, diags) = run(
            &[("node", node)],
            vec![],
            &[],
            vec![
                Statement::bind("n", Instruction::Alloca { ty: Type::named("node") }),
                Statement::bind(
                    "next",
                    Instruction::Gep {
                        elem: Type::named("node"),
                        ptr_ty: Type::ptr(Type::named("node")),
                        base: Operand::local("n"),
                        indices: vec![Operand::Const(0), Operand::Const(1)],
                    },
                ),
                Statement::effect(Instruction::Store {
                    ty: Type::ptr(Type::named("node")),
                    value: Operand::local("n"),
                    ptr: Operand::local("next"),
                }),
                Statement::bind(
                    "ret",
                    Instruction::Load {
                        ty: Type::ptr(Type::named("node")),
                        ptr: Operand::local("next"),
                    },
                ),
            ],
        );
        // The node is the first allocation, at cell 1.
        assert_eq!(result, Some(Value::Int(1)));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_gep_type_mismatch() {
        let (_, diags) = run(
            &[],
            vec![],
            &[],
            vec![
                Statement::bind("p", Instruction::Alloca { ty: Type::int(32) }),
                Statement::bind(
                    "ret",
                    Instruction::Gep {
                        elem: Type::int(32),
                        ptr_ty: Type::ptr(Type::int(8)),
                        base: Operand::local("p"),
                        indices: vec![Operand::Const(0)],
                    },
                ),
            ],
        );
        assert!(matches!(diags.as_slice(), [ExecError::TypeMismatch { .. }]));
    }

    #[test]
    fn test_gep_unknown_element_type_reported_once() {
        let (result, diags) = run(
            &[],
            vec![],
            &[],
            vec![Statement::bind(
                "ret",
                Instruction::Gep {
                    elem: Type::named("missing"),
                    ptr_ty: Type::ptr(Type::named("missing")),
                    base: Operand::Const(7),
                    indices: vec![Operand::Const(1), Operand::Const(0)],
                },
            )],
        );
        // Unresolved element types are walked as `void`: no stride, no fields.
        assert_eq!(result, Some(Value::Int(7)));
        assert!(matches!(
            diags.as_slice(),
            [ExecError::UnknownType { .. }, ExecError::UnsupportedGep { .. }]
        ));
    }

    #[test]
    fn test_oversized_alloca_is_fatal() {
        let prog = Program::new(
            BTreeMap::new(),
            vec![],
            vec![FunctionDecl::new(
                "main",
                vec![],
                "entry",
                vec![(
                    "entry",
                    Block::new(
                        vec![Statement::bind(
                            "p",
                            Instruction::Alloca {
                                ty: Type::array(u64::MAX, Type::int(32)),
                            },
                        )],
                        Terminator::Ret(None),
                    ),
                )],
            )],
        );
        let mut machine = Machine::new(&prog, "main", &[]).unwrap();
        let heap_size = machine.heap().len();
        assert!(matches!(
            machine.step(),
            Err(ExecError::OutOfMemory { requested: usize::MAX, .. })
        ));
        assert_eq!(machine.heap().len(), heap_size);
        assert_eq!(machine.register("p"), None);
        assert_eq!(machine.steps(), 0);
    }

    #[test]
    fn test_double_assignment_keeps_first() {
        let (result, diags) = run(
            &[],
            vec![],
            &[],
            vec![
                Statement::bind("ret", Instruction::CallResult { value: Value::Int(1) }),
                Statement::bind("ret", Instruction::CallResult { value: Value::Int(2) }),
            ],
        );
        assert_eq!(result, Some(Value::Int(1)));
        assert_eq!(diags, vec![ExecError::DoubleAssignment { name: "ret".into() }]);
    }

    #[test]
    fn test_undefined_register_reads_zero() {
        let (result, diags) = run(
            &[],
            vec![],
            &[],
            vec![Statement::bind(
                "ret",
                binop(BinOp::Add, Operand::local("nope"), Operand::Const(5)),
            )],
        );
        assert_eq!(result, Some(Value::Int(5)));
        assert_eq!(diags, vec![ExecError::UndefinedRegister { name: "nope".into() }]);
    }

    #[test]
    fn test_store_through_null_is_fatal() {
        let prog = Program::new(
            BTreeMap::new(),
            vec![],
            vec![FunctionDecl::new(
                "main",
                vec![],
                "entry",
                vec![(
                    "entry",
                    Block::new(
                        vec![Statement::effect(Instruction::Store {
                            ty: Type::int(32),
                            value: Operand::Const(1),
                            ptr: Operand::Null,
                        })],
                        Terminator::Ret(None),
                    ),
                )],
            )],
        );
        let mut machine = Machine::new(&prog, "main", &[]).unwrap();
        assert_eq!(machine.step(), Err(ExecError::NullAccess));
        assert!(machine.heap().cells().iter().all(|cell| *cell == Cell::Uninit));
    }
}
