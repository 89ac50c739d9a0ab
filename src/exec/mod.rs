// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! External tool invocation with hard time budgets.
//!
//! All tool access (`lspci`, `systemd-hwdb`, `dmidecode`, the escalation
//! program) goes through [`CommandRunner`]. A hung tool is killed once its
//! budget runs out, so a refresh or a hot-plug handler never blocks on it.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{InventoryError, Result};

/// Poll interval while waiting for a child to exit
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Captured result of one tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful run with the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed run with the given exit code.
    pub fn failed(code: i32) -> Self {
        Self {
            status: Some(code),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Process execution seam.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, feeding `stdin` if given, killing it after
    /// `timeout`.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput>;

    /// Whether `program` can be found at all.
    fn available(&self, program: &str) -> bool;
}

/// Run a tool and return its stdout, turning a non-zero exit into
/// [`InventoryError::CommandFailed`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String> {
    let out = runner.run(program, args, None, timeout)?;
    if out.success() {
        return Ok(out.stdout_text());
    }
    Err(InventoryError::CommandFailed(format!(
        "{} {:?} exited with {:?}: {}",
        program,
        args,
        out.status,
        String::from_utf8_lossy(&out.stderr).trim()
    )))
}

/// Run a tool and return its stdout only if it succeeded.
///
/// This is the degrade-to-absent boundary: every failure mode (missing
/// binary, permission denial, non-zero exit, timeout) becomes `None`.
pub fn run_text(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Option<String> {
    match run_checked(runner, program, args, timeout) {
        Ok(out) => Some(out),
        Err(e) => {
            log::debug!("{} unavailable: {}", program, e);
            None
        }
    }
}

/// Runner backed by `std::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn drain<R: Read + Send + 'static>(stream: Option<R>) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut s) = stream {
                let _ = s.read_to_end(&mut buf);
            }
            buf
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| InventoryError::from_spawn(program, e))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // Dropping the pipe closes it so the child sees EOF.
            if let Err(e) = pipe.write_all(input) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }

        // Readers run on their own threads so a chatty child cannot fill a
        // pipe and stall before we get to wait on it.
        let stdout = Self::drain(child.stdout.take());
        let stderr = Self::drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::warn!("{} killed after {:?}", program, timeout);
                    return Err(InventoryError::Timeout {
                        program: program.to_string(),
                        timeout,
                    });
                }
                None => thread::sleep(WAIT_POLL),
            }
        };

        Ok(CommandOutput {
            status: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }

    fn available(&self, program: &str) -> bool {
        if program.contains('/') {
            return std::path::Path::new(program).is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}

/// Runner that reports every tool as missing (offline mode).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoToolsRunner;

impl CommandRunner for NoToolsRunner {
    fn run(
        &self,
        program: &str,
        _args: &[&str],
        _stdin: Option<&[u8]>,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        Err(InventoryError::ToolUnavailable(program.to_string()))
    }

    fn available(&self, _program: &str) -> bool {
        false
    }
}

/// Runner replaying canned outputs keyed by the full command line.
///
/// Used by tests and for replaying captured tool output. Commands without a
/// script report the tool as unavailable; every invocation is recorded.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(program: &str, args: &[&str]) -> String {
        std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Script the output for `program args...`.
    pub fn with(mut self, program: &str, args: &[&str], output: CommandOutput) -> Self {
        self.scripts.insert(Self::key(program, args), output);
        self
    }

    /// Command lines invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _stdin: Option<&[u8]>,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        let key = Self::key(program, args);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.clone());
        self.scripts
            .get(&key)
            .cloned()
            .ok_or_else(|| InventoryError::ToolUnavailable(program.to_string()))
    }

    fn available(&self, program: &str) -> bool {
        let prefix = format!("{} ", program);
        self.scripts
            .keys()
            .any(|k| k == program || k.starts_with(&prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_text_success() {
        let runner = ScriptedRunner::new().with("lspci", &["-mm"], CommandOutput::ok("hello\n"));
        let out = run_text(&runner, "lspci", &["-mm"], Duration::from_secs(1));
        assert_eq!(out.as_deref(), Some("hello\n"));
    }

    #[test]
    fn test_run_text_failure_is_absent() {
        let runner = ScriptedRunner::new().with("dmidecode", &["-t", "17"], CommandOutput::failed(1));
        assert!(run_text(&runner, "dmidecode", &["-t", "17"], Duration::from_secs(1)).is_none());
        assert!(run_text(&runner, "missing", &[], Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_run_checked_reports_exit_status() {
        let runner = ScriptedRunner::new().with(
            "dmidecode",
            &["-t", "17"],
            CommandOutput {
                status: Some(1),
                stdout: Vec::new(),
                stderr: b"/dev/mem: Permission denied\n".to_vec(),
            },
        );
        match run_checked(&runner, "dmidecode", &["-t", "17"], Duration::from_secs(1)) {
            Err(InventoryError::CommandFailed(msg)) => {
                assert!(msg.contains("Some(1)"));
                assert!(msg.contains("Permission denied"));
            }
            other => panic!("Expected CommandFailed, got {other:?}"),
        }
        assert!(matches!(
            run_checked(&runner, "lspci", &[], Duration::from_secs(1)),
            Err(InventoryError::ToolUnavailable(_))
        ));
    }

    #[test]
    fn test_scripted_runner_records_calls() {
        let runner = ScriptedRunner::new();
        let _ = runner.run("lspci", &["-s", "00:02.0"], None, Duration::from_secs(1));
        assert_eq!(runner.calls(), vec!["lspci -s 00:02.0".to_string()]);
        assert!(!runner.available("lspci"));
    }

    #[test]
    fn test_no_tools_runner() {
        let err = NoToolsRunner
            .run("lspci", &[], None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, InventoryError::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_missing_binary() {
        let err = SystemRunner
            .run("linman-definitely-not-a-tool", &[], None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, InventoryError::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_echo() {
        let out = SystemRunner
            .run("sh", &["-c", "echo hi"], None, Duration::from_secs(5))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_text().trim(), "hi");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_stdin() {
        let out = SystemRunner
            .run("cat", &[], Some(b"0000:00:1f.3"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.stdout_text(), "0000:00:1f.3");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_stdin_closed_early() {
        // The child exits without reading, so writing a large input hits a
        // broken pipe; the call must still return promptly.
        let input = vec![b'x'; 4 << 20];
        let start = Instant::now();
        let result = SystemRunner.run("true", &[], Some(&input), Duration::from_secs(5));
        match result {
            Ok(out) => assert!(out.success()),
            Err(e) => assert!(matches!(e, InventoryError::Io(_))),
        }
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout_kills_child() {
        let start = Instant::now();
        let err = SystemRunner
            .run("sleep", &["5"], None, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, InventoryError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
