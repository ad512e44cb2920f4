//! The IR consumed by the interpreter.
//!
//! These are the already-parsed declarations: a type table, global variables and
//! functions made of labeled basic blocks. They are built once (either from Rust
//! values or deserialized from JSON) and never mutated while a program runs.

use crate::value::Value;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A possibly-named IR type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    #[default]
    Void,
    /// Integer of the given bit width. `i1` is the boolean type.
    Int(u32),
    Pointer(Box<Type>),
    Array {
        len: u64,
        elem: Box<Type>,
    },
    Struct(Vec<Type>),
    /// Reference into the program's type table.
    Named(String),
}

impl Type {
    pub fn int(bits: u32) -> Self {
        Type::Int(bits)
    }

    pub fn ptr(inner: Type) -> Self {
        Type::Pointer(Box::new(inner))
    }

    pub fn named(name: &str) -> Self {
        Type::Named(name.to_string())
    }

    pub fn array(len: u64, elem: Type) -> Self {
        Type::Array {
            len,
            elem: Box::new(elem),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Array { len, elem } => write!(f, "[{len} x {elem}]"),
            Type::Struct(fields) => {
                f.write_str("{ ")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str(" }")
            }
            Type::Named(name) => write!(f, "%{name}"),
        }
    }
}

/// Instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Null,
    Const(i64),
    Global(String),
    Local(String),
}

impl Operand {
    pub fn local(name: &str) -> Self {
        Operand::Local(name.to_string())
    }

    pub fn global(name: &str) -> Self {
        Operand::Global(name.to_string())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => f.write_str("null"),
            Operand::Const(v) => write!(f, "{v}"),
            Operand::Global(name) => write!(f, "@{name}"),
            Operand::Local(name) => write!(f, "%{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Sdiv,
    Shl,
    Ashr,
    Lshr,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastOp {
    Bitcast,
    Zext,
    PtrToInt,
}

macro_rules! lowercase_display {
    ($ty:ty { $($variant:ident => $name:literal),* $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $name,)*
                })
            }
        }
    };
}

lowercase_display!(BinOp {
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    Sdiv => "sdiv",
    Shl => "shl",
    Ashr => "ashr",
    Lshr => "lshr",
    And => "and",
    Or => "or",
    Xor => "xor",
});

lowercase_display!(CmpOp {
    Eq => "eq",
    Ne => "ne",
    Slt => "slt",
    Sle => "sle",
    Sgt => "sgt",
    Sge => "sge",
});

lowercase_display!(CastOp {
    Bitcast => "bitcast",
    Zext => "zext",
    PtrToInt => "ptrtoint",
});

/// A non-terminating instruction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Binop {
        op: BinOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    Alloca {
        ty: Type,
    },
    Load {
        ty: Type,
        ptr: Operand,
    },
    Store {
        ty: Type,
        value: Operand,
        ptr: Operand,
    },
    Compare {
        cond: CmpOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        #[serde(default)]
        ret: Type,
        callee: Operand,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Cast {
        op: CastOp,
        from: Type,
        value: Operand,
        to: Type,
    },
    /// Address computation (`getelementptr`).
    Gep {
        elem: Type,
        ptr_ty: Type,
        base: Operand,
        indices: Vec<Operand>,
    },
    /// Injected when a callee returns; binds the returned value in the caller.
    CallResult {
        value: Value,
    },
}

/// An instruction with its optional destination register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Statement {
    #[serde(default)]
    pub dest: Option<String>,
    pub inst: Instruction,
}

impl Statement {
    pub fn bind(dest: &str, inst: Instruction) -> Self {
        Statement {
            dest: Some(dest.to_string()),
            inst,
        }
    }

    pub fn effect(inst: Instruction) -> Self {
        Statement { dest: None, inst }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    Ret(Option<Operand>),
    Br(String),
    CondBr {
        ty: Type,
        cond: Operand,
        then_label: String,
        else_label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

impl Block {
    pub fn new(statements: Vec<Statement>, terminator: Terminator) -> Self {
        Block {
            statements,
            terminator,
        }
    }
}

/// Label to block table of a single function.
pub type BlockTable = BTreeMap<String, Block>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Param {
    pub ty: Type,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub ret: Type,
    #[serde(default)]
    pub params: Vec<Param>,
    pub entry: String,
    pub blocks: BlockTable,
}

impl FunctionDecl {
    pub fn new(
        name: &str,
        params: Vec<(Type, &str)>,
        entry: &str,
        blocks: Vec<(&str, Block)>,
    ) -> Self {
        FunctionDecl {
            name: name.to_string(),
            ret: Type::Void,
            params: params
                .into_iter()
                .map(|(ty, name)| Param {
                    ty,
                    name: name.to_string(),
                })
                .collect(),
            entry: entry.to_string(),
            blocks: blocks
                .into_iter()
                .map(|(label, block)| (label.to_string(), block))
                .collect(),
        }
    }
}

/// Global initializer tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    Int(i64),
    Str(String),
    Null,
    /// Address of another global.
    Global(String),
    Struct(Vec<Initializer>),
    /// Zero-filled storage sized from the global's declared type.
    Zero,
    Undef,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlobalDecl {
    pub name: String,
    #[serde(default)]
    pub ty: Option<Type>,
    pub init: Initializer,
}

impl GlobalDecl {
    pub fn new(name: &str, init: Initializer) -> Self {
        GlobalDecl {
            name: name.to_string(),
            ty: None,
            init,
        }
    }
}

/// Declarations as they appear in a program file.
#[derive(Deserialize)]
struct ProgramDecls {
    #[serde(default)]
    types: BTreeMap<String, Type>,
    #[serde(default)]
    globals: Vec<GlobalDecl>,
    functions: Vec<FunctionDecl>,
}

impl From<ProgramDecls> for Program {
    fn from(decls: ProgramDecls) -> Self {
        Program::new(decls.types, decls.globals, decls.functions)
    }
}

/// The loaded program: type, global and function tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ProgramDecls")]
pub struct Program {
    types: BTreeMap<String, Type>,
    globals: Vec<GlobalDecl>,
    functions: HashMap<String, FunctionDecl>,
}

impl Program {
    pub fn new(
        types: BTreeMap<String, Type>,
        globals: Vec<GlobalDecl>,
        functions: Vec<FunctionDecl>,
    ) -> Self {
        let functions = functions
            .into_iter()
            .map(|func| (func.name.clone(), func))
            .collect();
        Program {
            types,
            globals,
            functions,
        }
    }

    pub fn types(&self) -> &BTreeMap<String, Type> {
        &self.types
    }

    /// Globals in declaration order.
    pub fn globals(&self) -> &[GlobalDecl] {
        &self.globals
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }
}
