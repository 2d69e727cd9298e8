// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `std::process` backed [`CommandRunner`]

use std::{
    io::Read,
    os::unix::process::ExitStatusExt,
    process::{self, Child, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use snafu::{OptionExt as _, ResultExt as _};

use super::{Command, CommandRunner, Error, MissingPipeSnafu, Output, SpawnSnafu, TimeoutSnafu, WaitSnafu};

/// How often a running child is checked for exit
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long a child gets to honour SIGTERM before it is killed
const TERM_GRACE: Duration = Duration::from_secs(2);

const SIGNAL_SHIFT: i32 = 1 << 7;

/// Runs commands on the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &Command) -> Result<Output, Error> {
        let program = command.program().to_owned();
        log::trace!("executing {command}");

        let mut child = process::Command::new(command.program())
            .args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context(SpawnSnafu { program: &program })?;

        let stdout = drain(child.stdout.take().context(MissingPipeSnafu { program: &program })?);
        let stderr = drain(child.stderr.take().context(MissingPipeSnafu { program: &program })?);

        let deadline = command.get_timeout().map(|timeout| (Instant::now() + timeout, timeout));
        let status = match deadline {
            Some((at, timeout)) => wait_deadline(&mut child, &program, at, timeout)?,
            None => child.wait().context(WaitSnafu { program: &program })?,
        };

        // Descendants may hold the pipes open after the child itself exited
        let at = deadline.map(|(at, _)| at);
        let (Some(stdout), Some(stderr)) = (collect(stdout, at), collect(stderr, at)) else {
            let timeout = deadline.map(|(_, timeout)| timeout).unwrap_or_default();
            log::warn!("{program} left its output open past {timeout:?}");
            return TimeoutSnafu { program, timeout }.fail();
        };

        let output = Output {
            code: exit_code(status),
            stdout,
            stderr,
        };
        log::trace!("{program} exited, exit_code={}", output.code);

        Ok(output)
    }
}

/// Read a pipe to the end on its own thread so a chatty child cannot block on a full pipe
fn drain(mut pipe: impl Read + Send + 'static) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = vec![];
        if let Err(e) = pipe.read_to_end(&mut buf) {
            log::debug!("failed to read child output: {e}");
        }
        // Receiver is gone once the deadline passed
        let _ = tx.send(buf);
    });
    rx
}

/// `None` when the pipe is still open at the deadline
fn collect(rx: Receiver<Vec<u8>>, deadline: Option<Instant>) -> Option<String> {
    let received = match deadline {
        Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn wait_deadline(child: &mut Child, program: &str, deadline: Instant, timeout: Duration) -> Result<ExitStatus, Error> {
    if let Some(status) = poll_until(child, program, deadline)? {
        return Ok(status);
    }

    log::warn!("{program} exceeded {timeout:?}, terminating");
    if let Ok(pid) = i32::try_from(child.id()) {
        if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
            log::debug!("failed to signal {program}: {e}");
        }
    }
    if poll_until(child, program, Instant::now() + TERM_GRACE)?.is_none() {
        // Already gone if this fails, the reap below settles it either way
        let _ = child.kill();
        child.wait().context(WaitSnafu { program })?;
    }

    TimeoutSnafu { program, timeout }.fail()
}

/// `None` when the deadline passed with the child still running
fn poll_until(child: &mut Child, program: &str, deadline: Instant) -> Result<Option<ExitStatus>, Error> {
    loop {
        if let Some(status) = child.try_wait().context(WaitSnafu { program })? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    if let Some(signal) = status.signal() {
        return signal + SIGNAL_SHIFT;
    }
    status.into_raw()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::SystemRunner;
    use crate::{Command, CommandRunner, Error};

    #[test]
    fn captures_status_and_streams() {
        let output = SystemRunner
            .run(&Command::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .expect("sh should run");
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(!output.success());
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = SystemRunner
            .run(&Command::new("/nonexistent/definitely-not-here"))
            .expect_err("spawn must fail");
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn deadline_terminates_child() {
        let err = SystemRunner
            .run(
                &Command::new("sleep")
                    .arg("30")
                    .timeout(Some(Duration::from_millis(100))),
            )
            .expect_err("sleep must be cut short");
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn deadline_covers_inherited_pipes() {
        let started = Instant::now();
        let err = SystemRunner
            .run(
                &Command::new("sh")
                    .args(["-c", "sleep 5 & exit 0"])
                    .timeout(Some(Duration::from_millis(500))),
            )
            .expect_err("background sleep keeps stdout open");
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn deadline_not_hit() {
        let output = SystemRunner
            .run(&Command::new("true").timeout(Some(Duration::from_secs(10))))
            .expect("true should run");
        assert!(output.success());
    }
}
