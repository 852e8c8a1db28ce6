//! Subprocess execution for planned invocations.
//!
//! stdout is inherited so the client and the update script print straight to
//! the terminal. stderr is streamed through line by line and its tail is kept
//! for failure classification. Preflight probes capture both streams quietly.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::process::{ChildStderr, Command, Stdio};
use std::time::Instant;

use crate::error::{ResetError, Result};
use crate::plan::{Invocation, Step};

/// Lines of stderr retained per step.
pub const STDERR_TAIL_LINES: usize = 20;

/// What a finished child left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    /// Captured only for preflight probes.
    pub stdout: String,
    pub stderr_tail: String,
    pub duration_ms: u64,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between orchestration and process spawning.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<StepOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<StepOutput> {
        let mut cmd = build_command(invocation);
        tracing::debug!(step = %invocation.step, argv = %invocation.command_line(), "spawning");

        let started = Instant::now();
        if invocation.step == Step::Preflight {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let output = cmd.output().map_err(|e| spawn_failed(invocation, e))?;
            return Ok(StepOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr_tail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                duration_ms: elapsed_ms(started),
            });
        }

        if invocation.stdin {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
        }
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_failed(invocation, e))?;

        // Only stderr is piped, so draining it before wait() cannot deadlock.
        // The child is waited on even when reading its stderr fails.
        let tail = child
            .stderr
            .take()
            .map(|stderr| drain_stderr(invocation, stderr))
            .unwrap_or_default();

        let status = child.wait()?;
        Ok(StepOutput {
            code: status.code(),
            stdout: String::new(),
            stderr_tail: tail,
            duration_ms: elapsed_ms(started),
        })
    }
}

/// Echo the child's stderr byte for byte and keep its last lines.
///
/// Output is not required to be UTF-8; the tail is decoded lossily.
fn drain_stderr(invocation: &Invocation, stderr: ChildStderr) -> String {
    let mut reader = BufReader::new(stderr);
    let mut echo = std::io::stderr();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let _ = echo.write_all(&buf);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                let line = String::from_utf8_lossy(&buf);
                tail.push_back(line.trim_end_matches(['\n', '\r']).to_string());
            }
            Err(e) => {
                tracing::warn!(step = %invocation.step, error = %e, "stopped reading stderr");
                break;
            }
        }
    }
    Vec::from(tail).join("\n")
}

fn build_command(invocation: &Invocation) -> Command {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);
    if let Some(env) = &invocation.forward_env {
        // `-e NAME` without a value makes the runtime copy NAME from our env.
        if let Some(value) = std::env::var_os(&env.source) {
            cmd.env(&env.name, value);
        }
    }
    cmd
}

fn spawn_failed(invocation: &Invocation, e: std::io::Error) -> ResetError {
    ResetError::SpawnFailed {
        program: invocation.program.clone(),
        reason: e.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::plan::ForwardedEnv;

    fn sh(step: Step, script: &str) -> Invocation {
        Invocation {
            step,
            container: "test".to_string(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            forward_env: None,
            stdin: false,
            tty: false,
        }
    }

    #[test]
    fn captures_exit_code_and_stderr_tail() {
        let inv = sh(Step::Drop, "echo 'ERROR 1045 (28000): Access denied' >&2; exit 1");
        let out = SystemRunner.run(&inv).unwrap();
        assert_eq!(out.code, Some(1));
        assert!(!out.success());
        assert_eq!(out.stderr_tail, "ERROR 1045 (28000): Access denied");
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let inv = sh(Step::Rebuild, "for i in $(seq 1 50); do echo line$i >&2; done");
        let out = SystemRunner.run(&inv).unwrap();
        assert!(out.success());
        let lines: Vec<&str> = out.stderr_tail.lines().collect();
        assert_eq!(lines.len(), STDERR_TAIL_LINES);
        assert_eq!(lines[0], "line31");
        assert_eq!(*lines.last().unwrap(), "line50");
    }

    #[test]
    fn non_utf8_stderr_does_not_cut_the_child_short() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("finished");
        let script = format!(
            "printf 'Caf\\351\\n' >&2; sleep 1; printf 'done\\n' >&2; touch '{}'; exit 3",
            marker.display()
        );
        let out = SystemRunner.run(&sh(Step::Rebuild, &script)).unwrap();
        assert_eq!(out.code, Some(3));
        assert!(marker.exists());
        assert_eq!(out.stderr_tail, "Caf\u{FFFD}\ndone");
    }

    #[test]
    fn preflight_captures_stdout() {
        let inv = sh(Step::Preflight, "echo true");
        let out = SystemRunner.run(&inv).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "true");
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let mut inv = sh(Step::Drop, "");
        inv.program = "/nonexistent/da-reset-runtime".to_string();
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(matches!(err, ResetError::SpawnFailed { .. }));
    }

    #[test]
    fn forwarded_env_reaches_child() {
        // PATH is always set, so it stands in for a password variable.
        let mut inv = sh(Step::Preflight, "printf %s \"$MYSQL_PWD\"");
        inv.forward_env = Some(ForwardedEnv {
            name: "MYSQL_PWD".to_string(),
            source: "PATH".to_string(),
        });
        let out = SystemRunner.run(&inv).unwrap();
        assert_eq!(out.stdout, std::env::var("PATH").unwrap());
    }
}
