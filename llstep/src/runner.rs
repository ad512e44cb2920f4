//! Driver loop: steps a machine until it halts, consulting a pause gate on a
//! fixed cadence.

use crate::error::ExecError;
use crate::interpreter::{Machine, MachineState};
use crate::value::Value;
use tracing::{debug, info};

/// Default number of steps between two pause gate checks.
pub const DEFAULT_PAUSE_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Steps between pause checks. `None` or `Some(0)` never pauses.
    pub pause_every: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pause_every: Some(DEFAULT_PAUSE_EVERY),
        }
    }
}

impl RunConfig {
    pub fn without_pauses() -> Self {
        Self { pause_every: None }
    }
}

/// Decides whether a paused run continues.
pub trait PauseGate {
    /// Called after every `pause_every` steps. Returning `false` stops the run.
    fn resume(&mut self, machine: &Machine<'_>) -> bool;
}

impl<F> PauseGate for F
where
    F: FnMut(&Machine<'_>) -> bool,
{
    fn resume(&mut self, machine: &Machine<'_>) -> bool {
        self(machine)
    }
}

/// How a call to [`drive`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The entry function returned this value.
    Halted(Option<Value>),
    /// The pause gate declined to continue. The machine can be driven again.
    Stopped { steps: u64 },
}

/// Steps `machine` until it halts, a fatal error occurs, or `gate` declines to continue.
pub fn drive(
    machine: &mut Machine<'_>,
    config: &RunConfig,
    gate: &mut impl PauseGate,
) -> Result<RunOutcome, ExecError> {
    let pause_every = config.pause_every.filter(|n| *n > 0);
    let mut since_gate = 0u64;
    loop {
        if let MachineState::Halted(value) = machine.step()? {
            let value = value.clone();
            info!("Program halted after {} steps", machine.steps());
            return Ok(RunOutcome::Halted(value));
        }
        since_gate += 1;
        if pause_every.is_some_and(|n| since_gate >= n) {
            since_gate = 0;
            debug!("Pausing after {} steps", machine.steps());
            if !gate.resume(machine) {
                info!("Execution stopped at step {}", machine.steps());
                return Ok(RunOutcome::Stopped {
                    steps: machine.steps(),
                });
            }
        }
    }
}

/// Runs `machine` to completion without pausing.
pub fn run_to_completion(machine: &mut Machine<'_>) -> Result<Option<Value>, ExecError> {
    let mut never = |_: &Machine<'_>| true;
    match drive(machine, &RunConfig::without_pauses(), &mut never)? {
        RunOutcome::Halted(value) => Ok(value),
        RunOutcome::Stopped { .. } => Ok(None),
    }
}
