//! llstep Interpreter Library
//!
//! A single-stepping interpreter for a small LLVM-style SSA IR. Programs are
//! loaded from JSON, their globals are laid out on a flat cell heap, and a
//! [`Machine`](interpreter::Machine) executes one instruction per step.
//!
//! Most malformed input is reported as a diagnostic and execution continues
//! with a documented fallback. Null dereferences, out-of-bounds accesses and
//! heap exhaustion stop the machine, as do branches to unknown labels and
//! unknown entry functions.

pub mod error;
pub mod interpreter;
pub mod ir;
pub mod memory;
pub mod runner;
pub mod trace;
pub mod ty;
pub mod value;

use crate::interpreter::Machine;
use crate::ir::Program;
use crate::value::Value;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Reads and parses a JSON program.
pub fn load_program(path: &Path) -> Result<Program> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program `{}`", path.display()))?;
    let program = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse program `{}`", path.display()))?;
    info!("Loaded program from {}", path.display());
    Ok(program)
}

/// Execute function `entry` of `program` to completion with integer arguments.
///
/// # Returns
/// * `Ok(Some(value))` - The function returned a value
/// * `Ok(None)` - The function returned void
/// * `Err(anyhow::Error)` - The function does not exist or execution hit a fatal error
///
/// # Examples
/// ```ignore
/// let program = load_program(Path::new("add.json"))?;
/// let result = run_function(&program, "add", &[3, 4])?;
/// ```
pub fn run_function(program: &Program, entry: &str, args: &[i64]) -> Result<Option<Value>> {
    let args: Vec<Value> = args.iter().copied().map(Value::from).collect();
    let mut machine = Machine::new(program, entry, &args)
        .with_context(|| format!("Failed to start function `{entry}`"))?;
    let result = runner::run_to_completion(&mut machine).with_context(|| {
        format!(
            "Execution of `{entry}` failed after {} steps in `{}`",
            machine.steps(),
            machine.backtrace().join("` <- `")
        )
    })?;

    for line in machine.take_output() {
        println!("{line}");
    }
    match &result {
        Some(value) => info!("Function '{}' returned: {}", entry, value),
        None => info!("Function '{}' returned void", entry),
    }
    Ok(result)
}
