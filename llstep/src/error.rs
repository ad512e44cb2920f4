//! Diagnostics raised while loading or executing a program.

use thiserror::Error;

/// How the machine proceeds after a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Bad type or initializer declaration. A fallback is used.
    Structural,
    /// Missing global, register, callee or built-in. A fallback is used.
    Reference,
    /// Ill-shaped type or address. A best-effort result is used.
    Shape,
    /// Second write to an SSA register. The first value is kept.
    DoubleAssignment,
    /// The run aborts.
    Fatal,
}

/// Interpreter diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("cyclic type: {}", .cycle.join(" -> "))]
    CyclicType { cycle: Vec<String> },

    #[error("unknown type %{name}")]
    UnknownType { name: String },

    #[error("malformed initializer for @{global}: {message}")]
    MalformedInitializer { global: String, message: String },

    #[error("undefined global @{name}")]
    UndefinedGlobal { name: String },

    #[error("undefined register %{name}")]
    UndefinedRegister { name: String },

    #[error("unknown callee {callee}")]
    UnknownCallee { callee: String },

    #[error("unknown built-in {name}")]
    UnknownBuiltin { name: String },

    #[error("unsupported GEP through {ty}")]
    UnsupportedGep { ty: String },

    #[error("struct index {operand} is not a constant")]
    NonConstantStructIndex { operand: String },

    #[error("field index {index} out of range for {ty}")]
    FieldOutOfRange { index: i64, ty: String },

    #[error("unsupported load of {ty} ({size} cells)")]
    UnsupportedLoad { ty: String, size: usize },

    #[error("unsupported store of {ty} ({size} cells)")]
    UnsupportedStore { ty: String, size: usize },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("branch condition has type {ty}, expected i1")]
    ConditionWidth { ty: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("read of uninitialized cell {address}")]
    UninitializedRead { address: usize },

    #[error("{function} expects {expected} arguments, got {found}")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("register %{name} is already bound")]
    DoubleAssignment { name: String },

    #[error("null pointer access")]
    NullAccess,

    #[error("heap address {address} out of bounds (heap size {size})")]
    Bounds { address: i64, size: usize },

    #[error("cannot allocate {requested} cells (heap size {size}, limit {limit})")]
    OutOfMemory {
        requested: usize,
        size: usize,
        limit: usize,
    },

    #[error("unknown block label {label} in {function}")]
    UnknownLabel { function: String, label: String },

    #[error("function {name} not found")]
    UnknownFunction { name: String },
}

impl ExecError {
    pub fn severity(&self) -> Severity {
        use ExecError::*;
        match self {
            CyclicType { .. } | UnknownType { .. } | MalformedInitializer { .. } => {
                Severity::Structural
            }
            UndefinedGlobal { .. }
            | UndefinedRegister { .. }
            | UnknownCallee { .. }
            | UnknownBuiltin { .. }
            | UninitializedRead { .. }
            | ArgumentCount { .. } => Severity::Reference,
            UnsupportedGep { .. }
            | NonConstantStructIndex { .. }
            | FieldOutOfRange { .. }
            | UnsupportedLoad { .. }
            | UnsupportedStore { .. }
            | TypeMismatch { .. }
            | ConditionWidth { .. }
            | DivisionByZero => Severity::Shape,
            DoubleAssignment { .. } => Severity::DoubleAssignment,
            NullAccess
            | Bounds { .. }
            | OutOfMemory { .. }
            | UnknownLabel { .. }
            | UnknownFunction { .. } => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Short label prefixed to the diagnostic line in the trace.
    pub fn label(&self) -> &'static str {
        match self.severity() {
            Severity::Structural => "type-error",
            Severity::Reference => "reference-error",
            Severity::Shape => "shape-error",
            Severity::DoubleAssignment => "ssa-error",
            Severity::Fatal => "fatal",
        }
    }
}
