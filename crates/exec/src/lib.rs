// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! External process execution APIs
//!
//! Everything that spawns a program goes through [`CommandRunner`] so the
//! callers can be exercised against stubbed processes.

use std::{fmt, time::Duration};

use snafu::Snafu;

mod runner;
pub use runner::SystemRunner;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to launch {program}: {source}"))]
    Spawn { program: String, source: std::io::Error },

    #[snafu(display("failed to wait on {program}: {source}"))]
    Wait { program: String, source: std::io::Error },

    #[snafu(display("{program} did not finish within {timeout:?}"))]
    Timeout { program: String, timeout: Duration },

    #[snafu(display("missing output pipe for {program}"))]
    MissingPipe { program: String },
}

/// Runs a [`Command`] to completion and captures what it printed
pub trait CommandRunner {
    fn run(&self, command: &Command) -> Result<Output, Error>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, command: &Command) -> Result<Output, Error> {
        (**self).run(command)
    }
}

/// A program invocation: program, positional arguments and an optional deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Upper bound for the whole run. `None` waits forever.
    pub fn timeout(self, timeout: Option<Duration>) -> Self {
        Self { timeout, ..self }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Full argument vector, program first
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Exit status plus captured (lossily decoded) output of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit code, or `128 + signal` when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn new(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}
