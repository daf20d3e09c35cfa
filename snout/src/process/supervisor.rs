//! Supervision of external capture executables
//!
//! `ProcessSupervisor` launches one child at a time, relays its output
//! streams and escalates from SIGTERM to SIGKILL when asked to stop.

use super::relay::{Framing, IoRelay, ReadResult};
use crate::errors::{Result, SnoutError};
use bytes::Bytes;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_TERMINATE_RETRIES: u32 = 5;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Never started, or ended by SIGTERM/SIGKILL.
    Stopped,
    Running,
    /// Exited on its own with status 0.
    Terminated,
    Failed,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Running => "running",
            ProcessState::Terminated => "terminated",
            ProcessState::Failed => "failed",
        }
    }

    pub fn from_exit(status: ExitStatus) -> Self {
        if status.code() == Some(0) {
            return ProcessState::Terminated;
        }
        match status.signal() {
            Some(libc::SIGTERM) | Some(libc::SIGKILL) => ProcessState::Stopped,
            _ => ProcessState::Failed,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipeMode {
    /// stdin, stdout and stderr piped, output relayed.
    #[default]
    Piped,
    /// The child shares the parent's stdio.
    Inherit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Blocking,
    NonBlocking,
}

/// Program, arguments and environment of a supervised child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables set on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub pipe_mode: PipeMode,
    pub framing: Framing,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
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
        self.add_args(args);
        self
    }

    /// Appends a whitespace separated argument string such as `"-g 6 -a 8e89bed6"`.
    pub fn arg_line(mut self, line: &str) -> Self {
        self.add_args(line.split_whitespace());
        self
    }

    /// Appends a `flag value` pair, as in `-c 37`.
    pub fn option(mut self, flag: impl Into<String>, value: impl ToString) -> Self {
        self.add_option(flag, value);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: BTreeMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn pipe_mode(mut self, mode: PipeMode) -> Self {
        self.pipe_mode = mode;
        self
    }

    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn add_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    pub fn add_option(&mut self, flag: impl Into<String>, value: impl ToString) {
        self.args.push(flag.into());
        self.args.push(value.to_string());
    }

    pub fn full_command(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_command().join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub retries: u32,
    pub poll_interval: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_TERMINATE_RETRIES,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct ProcessSupervisor {
    command: Option<CommandSpec>,
    policy: TerminationPolicy,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<IoRelay>,
    stderr: Option<IoRelay>,
    exit_status: Option<ExitStatus>,
    started_at: Option<Instant>,
}

impl ProcessSupervisor {
    pub fn new(policy: TerminationPolicy) -> Self {
        Self {
            command: None,
            policy,
            child: None,
            stdin: None,
            stdout: None,
            stderr: None,
            exit_status: None,
            started_at: None,
        }
    }

    pub fn with_command(command: CommandSpec, policy: TerminationPolicy) -> Self {
        let mut supervisor = Self::new(policy);
        supervisor.configure(command);
        supervisor
    }

    /// Takes effect on the next `start`.
    pub fn configure(&mut self, command: CommandSpec) {
        self.command = Some(command);
    }

    pub fn command(&self) -> Option<&CommandSpec> {
        self.command.as_ref()
    }

    pub fn command_mut(&mut self) -> Option<&mut CommandSpec> {
        self.command.as_mut()
    }

    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    pub fn start(&mut self) -> Result<u32> {
        if self.is_running() {
            if let Some(pid) = self.pid() {
                return Err(SnoutError::ProcessAlreadyRunning { pid });
            }
        }

        let spec = self.command.clone().ok_or_else(|| SnoutError::ConfigError {
            message: "no command configured for process supervisor".to_string(),
        })?;

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).envs(&spec.env);
        match spec.pipe_mode {
            PipeMode::Piped => {
                command
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            PipeMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        let mut child = command.spawn().map_err(|source| SnoutError::LaunchError {
            command: spec.to_string(),
            source,
        })?;
        let pid = child.id();

        self.stdin = child.stdin.take();
        self.stdout = match child.stdout.take() {
            Some(pipe) => Some(IoRelay::spawn(&format!("{pid}-stdout"), pipe, spec.framing)?),
            None => None,
        };
        self.stderr = match child.stderr.take() {
            Some(pipe) => Some(IoRelay::spawn(&format!("{pid}-stderr"), pipe, spec.framing)?),
            None => None,
        };
        self.child = Some(child);
        self.exit_status = None;
        self.started_at = Some(Instant::now());

        info!("Started {spec} (pid {pid})");
        Ok(pid)
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn is_running(&mut self) -> bool {
        self.poll_exit().is_none() && self.child.is_some()
    }

    pub fn status(&mut self) -> ProcessState {
        if self.child.is_none() {
            return ProcessState::Stopped;
        }
        match self.poll_exit() {
            None => ProcessState::Running,
            Some(status) => ProcessState::from_exit(status),
        }
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Time since the last successful `start`.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|started| started.elapsed())
    }

    /// Asks the child to terminate, escalating to SIGKILL when it ignores
    /// the retry budget. Idempotent.
    pub fn stop(&mut self) -> Result<ProcessState> {
        self.stdin = None;
        if !self.is_running() {
            return Ok(self.status());
        }
        let Some(pid) = self.pid() else {
            return Ok(ProcessState::Stopped);
        };

        debug!("Stopping pid {pid}");
        for _ in 0..self.policy.retries {
            send_terminate(pid);
            thread::sleep(self.policy.poll_interval);
            if !self.is_running() {
                let state = self.status();
                info!("Process {pid} exited: {state}");
                return Ok(state);
            }
        }

        warn!(
            "Process {pid} ignored {} terminate signals, killing it",
            self.policy.retries
        );
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill() {
                warn!("Failed to kill pid {pid}: {e}");
            }
        }

        for _ in 0..self.policy.retries.max(1) {
            thread::sleep(self.policy.poll_interval);
            if !self.is_running() {
                let state = self.status();
                info!("Process {pid} exited: {state}");
                return Ok(state);
            }
        }

        error!("Process {pid} survived SIGKILL");
        Err(SnoutError::TerminationTimeout {
            pid,
            attempts: self.policy.retries,
        })
    }

    /// Blocks until the child exits on its own.
    pub fn wait(&mut self) -> Result<ProcessState> {
        let Some(child) = self.child.as_mut() else {
            return Ok(ProcessState::Stopped);
        };
        if self.exit_status.is_none() {
            self.exit_status = Some(child.wait()?);
        }
        Ok(self.status())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_running() {
            return Err(self.not_running());
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(self.not_running());
        };
        stdin.write_all(data)?;
        stdin.flush()?;
        Ok(())
    }

    pub fn read_line(&mut self, stream: OutputStream, mode: ReadMode) -> ReadResult {
        let relay = match stream {
            OutputStream::Stdout => self.stdout.as_mut(),
            OutputStream::Stderr => self.stderr.as_mut(),
        };
        let Some(relay) = relay else {
            return ReadResult::Eof;
        };
        match mode {
            ReadMode::Blocking => relay.read_blocking(),
            ReadMode::NonBlocking => relay.try_read(),
        }
    }

    /// Trimmed UTF-8 line. Undecodable lines read as `NoData`.
    pub fn read_line_decoded(&mut self, stream: OutputStream, mode: ReadMode) -> ReadResult<String> {
        match self.read_line(stream, mode) {
            ReadResult::Line(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => ReadResult::Line(text.trim().to_string()),
                Err(_) => ReadResult::NoData,
            },
            ReadResult::NoData => ReadResult::NoData,
            ReadResult::Eof => ReadResult::Eof,
        }
    }

    pub fn read_all(&mut self, stream: OutputStream) -> Vec<Bytes> {
        let relay = match stream {
            OutputStream::Stdout => self.stdout.as_mut(),
            OutputStream::Stderr => self.stderr.as_mut(),
        };
        let Some(relay) = relay else {
            return Vec::new();
        };
        let items = relay.drain();
        debug!("drained {} items from relay {}", items.len(), relay.name());
        items
    }

    fn poll_exit(&mut self) -> Option<ExitStatus> {
        if self.exit_status.is_some() {
            return self.exit_status;
        }
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(status) => {
                self.exit_status = status;
                status
            }
            Err(e) => {
                warn!("Failed to poll pid {}: {e}", child.id());
                None
            }
        }
    }

    fn not_running(&self) -> SnoutError {
        SnoutError::ProcessNotRunning {
            command: self
                .command
                .as_ref()
                .map(CommandSpec::to_string)
                .unwrap_or_default(),
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(TerminationPolicy::default())
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop supervised process: {e}");
        }
    }
}

impl fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("command", &self.command)
            .field("pid", &self.pid())
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

fn send_terminate(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        debug!(
            "SIGTERM to pid {pid} failed: {}",
            std::io::Error::last_os_error()
        );
    }
}
