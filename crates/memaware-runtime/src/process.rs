//! Supervised child-process execution.
//!
//! Spawns a command in its own process group with piped output, drains
//! both pipes on helper threads so a chatty child cannot stall on a full
//! pipe, and enforces one wall-clock limit covering both the child's exit
//! and the draining of its output. A descendant that keeps the pipes open
//! past the limit counts as a hang. On a hang the group gets `SIGTERM`,
//! then `SIGKILL` after a grace period.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use memaware_common::constants::{KILL_GRACE_MILLIS, POLL_INTERVAL_MILLIS};
use memaware_common::error::{HarnessError, Result};

use crate::result::RunResult;

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The process exited on its own and its output was fully read.
    Exited(RunResult),
    /// The process, or a descendant holding its output open, was killed
    /// after the timeout elapsed.
    TimedOut,
}

/// Runs `command` to completion or until `timeout` elapses.
///
/// `on_timeout` runs before the process group is terminated, giving the
/// caller a chance to stop whatever the child was driving.
///
/// # Errors
///
/// Returns [`HarnessError::Engine`] if the program cannot be spawned, or
/// [`HarnessError::Io`] if waiting on it fails.
pub fn run_supervised(
    mut command: Command,
    timeout: Duration,
    on_timeout: impl FnOnce(),
) -> Result<Completion> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!(%program, timeout_secs = timeout.as_secs(), "spawning supervised process");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let _ = command.process_group(0);
    }
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HarnessError::Engine {
            program: program.clone(),
            source: e,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let deadline = start + timeout;
    let poll = Duration::from_millis(POLL_INTERVAL_MILLIS);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!(%program, elapsed_ms = start.elapsed().as_millis(), "process timed out");
                on_timeout();
                terminate(&mut child);
                return Ok(Completion::TimedOut);
            }
            Ok(None) => thread::sleep(poll),
            Err(e) => {
                kill_group(&child);
                let _ = child.kill();
                return Err(HarnessError::Io {
                    path: program.into(),
                    source: e,
                });
            }
        }
    };

    let (Some(out), Some(err)) = (collect(stdout.as_ref(), deadline), collect(stderr.as_ref(), deadline))
    else {
        tracing::warn!(
            %program,
            elapsed_ms = start.elapsed().as_millis(),
            "process exited but a descendant kept its output open past the timeout"
        );
        on_timeout();
        kill_group(&child);
        return Ok(Completion::TimedOut);
    };

    let result = RunResult::new(exit_code(status), out, err);
    tracing::debug!(
        %program,
        exit_code = result.exit_code,
        elapsed_ms = start.elapsed().as_millis(),
        "process exited"
    );
    Ok(Completion::Exited(result))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        let _ = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Waits for a reader until `deadline`; `None` means the pipe is still open.
fn collect(reader: Option<&Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

/// Maps an exit status to a shell-style code; death by signal `n` is `128 + n`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    i32::try_from(child.id()).is_ok_and(|raw| killpg(Pid::from_raw(raw), signal).is_ok())
}

/// Kills whatever is left of the child's process group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    if signal_group(child, nix::sys::signal::Signal::SIGKILL) {
        tracing::info!(pgid = child.id(), "sent SIGKILL to process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::Signal;

    if signal_group(child, Signal::SIGTERM) {
        tracing::info!(pgid = child.id(), "sent SIGTERM to process group");
        let deadline = Instant::now() + Duration::from_millis(KILL_GRACE_MILLIS);
        while Instant::now() < deadline {
            if matches!(child.try_wait(), Ok(Some(_))) {
                kill_group(child);
                return;
            }
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MILLIS));
        }
    }
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
