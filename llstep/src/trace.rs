//! Human-readable execution trace.
//!
//! Every executed instruction and terminator leaves one line here, and every
//! diagnostic leaves a labeled line. Lines are also forwarded to `tracing` under
//! the `llstep::trace` target so they can be followed live.

use crate::error::ExecError;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct Trace {
    lines: Vec<String>,
    diagnostics: Vec<ExecError>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one executed operation.
    pub fn record(&mut self, line: String) {
        info!(target: "llstep::trace", "{line}");
        self.lines.push(line);
    }

    /// Records a diagnostic. The caller is responsible for the fallback.
    pub fn report(&mut self, err: ExecError) {
        let line = format!("{}: {err}", err.label());
        warn!(target: "llstep::trace", "{line}");
        self.lines.push(line);
        self.diagnostics.push(err);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn diagnostics(&self) -> &[ExecError] {
        &self.diagnostics
    }
}
