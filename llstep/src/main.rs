//! llstep Interpreter
//!
//! Runs a JSON-encoded SSA program one instruction at a time, printing the
//! execution trace through the logger and pausing periodically for the user.

use anyhow::Result;
use clap::{ArgAction, Parser};
use llstep::interpreter::Machine;
use llstep::runner::{DEFAULT_PAUSE_EVERY, PauseGate, RunConfig, RunOutcome, drive};
use llstep::value::Value;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Step through an LLVM-style SSA program.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Arguments {
    /// Path to the JSON program.
    #[arg(required = true)]
    program: PathBuf,

    /// Function to start from.
    #[arg(short, long, default_value = "main")]
    entry: String,

    /// Integer arguments passed to the entry function.
    #[arg(allow_negative_numbers = true)]
    args: Vec<i64>,

    /// Ask whether to continue after this many steps.
    #[arg(long, default_value_t = DEFAULT_PAUSE_EVERY)]
    pause_every: u64,

    /// Run to completion without pausing.
    #[arg(long, action = ArgAction::SetTrue)]
    no_pause: bool,
}

/// Asks on stdin whether to keep running.
struct PromptGate;

impl PauseGate for PromptGate {
    fn resume(&mut self, machine: &Machine<'_>) -> bool {
        print!(
            "Paused after {} steps in {}. Continue? [Y/n] ",
            machine.steps(),
            machine.current_function()
        );
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => !matches!(answer.trim(), "n" | "N" | "no"),
        }
    }
}

fn main() -> ExitCode {
    let log_level = std::env::var("LLSTEP_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    println!("llstep Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Single-stepping interpreter for SSA programs");

    let arguments = Arguments::parse();
    match run(&arguments) {
        Ok(exit_code) => {
            info!("Interpretation completed with exit code: {:?}", exit_code);
            exit_code
        }
        Err(e) => {
            error!("Interpretation failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(arguments: &Arguments) -> Result<ExitCode> {
    let program = llstep::load_program(&arguments.program)?;
    let args: Vec<Value> = arguments.args.iter().copied().map(Value::from).collect();
    let mut machine = Machine::new(&program, &arguments.entry, &args)?;

    let config = if arguments.no_pause {
        RunConfig::without_pauses()
    } else {
        RunConfig {
            pause_every: Some(arguments.pause_every),
        }
    };
    let outcome = drive(&mut machine, &config, &mut PromptGate);

    for line in machine.take_output() {
        println!("{line}");
    }
    let diagnostics = machine.diagnostics().len();
    if diagnostics > 0 {
        info!("{} diagnostics reported", diagnostics);
    }

    match outcome? {
        RunOutcome::Halted(Some(value)) => {
            println!("Result: {value}");
            Ok(exit_code(&value))
        }
        RunOutcome::Halted(None) => {
            println!("Result: void");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Stopped { steps } => {
            println!("Stopped after {steps} steps");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Maps the program result to a process exit code: 0 is success, any other
/// integer is failure.
fn exit_code(value: &Value) -> ExitCode {
    match value {
        Value::Int(0) | Value::Str(_) => ExitCode::SUCCESS,
        Value::Int(_) => ExitCode::FAILURE,
    }
}
