//! Process runner double for compiler tests.

use std::sync::Mutex;
use std::time::Duration;

use crate::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};

type Handler = Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput, RunnerError> + Send + Sync>;

/// Records every command and answers with a scripted handler.
pub struct ScriptedRunner {
    handler: Handler,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Answer every command with `f(cmd)`. The handler may create files in
    /// `cmd.cwd` to simulate the typesetter's output.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<ProcessOutput, RunnerError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(f),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every command with `f()`.
    pub fn always<F>(f: F) -> Self
    where
        F: Fn() -> Result<ProcessOutput, RunnerError> + Send + Sync + 'static,
    {
        Self::new(move |_| f())
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.clone());
        }
        (self.handler)(cmd)
    }
}
