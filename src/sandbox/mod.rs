// src/sandbox/mod.rs

//! Sandboxed command execution behind a checkpoint protocol.
//!
//! The apply coordinator consumes executors strictly through the
//! [`SandboxExecutor`] contract: open a checkpoint scoped to one action,
//! execute the action's command under a timeout, then commit or roll the
//! checkpoint back. How an executor isolates processes or limits
//! resources is its own concern.
//!
//! [`ProcessSandbox`] is the built-in executor: commands run through
//! `sh -c` with stdin nullified to prevent hangs, enforced by a kill
//! timeout. Its checkpoints record the undo command supplied by the
//! caller; rollback replays it.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;
use wait_timeout::ChildExt;

/// Default timeout for a single sandboxed command (60 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest error detail kept from a command's stderr
const DETAIL_LIMIT: usize = 4096;

/// Opaque handle to an open checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckpointId(Uuid);

impl CheckpointId {
    /// A fresh unique checkpoint id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a checkpoint protects and how to undo it
#[derive(Debug, Clone)]
pub struct CheckpointSpec {
    /// Label for logs, e.g. "install docker [apt]"
    pub label: String,
    /// Command that reverses the action, if the source has one
    pub undo: Option<String>,
}

/// Result of one sandboxed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    Failed {
        code: Option<i32>,
        detail: String,
    },
    TimedOut,
}

/// Execution collaborator contract.
///
/// `Err` from any method means the executor infrastructure itself broke
/// (spawn failure, lost checkpoint); a command that ran and failed is an
/// `Ok(ExecutionOutcome::Failed { .. })`.
pub trait SandboxExecutor {
    fn begin_checkpoint(&mut self, spec: &CheckpointSpec) -> Result<CheckpointId>;
    fn execute(&mut self, command: &str, timeout: Duration) -> Result<ExecutionOutcome>;
    fn commit(&mut self, checkpoint: CheckpointId) -> Result<()>;
    fn rollback(&mut self, checkpoint: CheckpointId) -> Result<()>;
}

/// Subprocess-backed executor
pub struct ProcessSandbox {
    shell: String,
    open_checkpoints: HashMap<CheckpointId, CheckpointSpec>,
}

impl ProcessSandbox {
    pub fn new() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            open_checkpoints: HashMap::new(),
        }
    }

    fn take_checkpoint(&mut self, checkpoint: CheckpointId) -> Result<CheckpointSpec> {
        self.open_checkpoints
            .remove(&checkpoint)
            .ok_or_else(|| Error::ExecutorError(format!("unknown checkpoint {}", checkpoint)))
    }

    fn run(&self, command: &str, timeout: Duration) -> Result<ExecutionOutcome> {
        let mut stderr_file = tempfile::tempfile()?;

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file.try_clone()?))
            .spawn()
            .map_err(|e| Error::ExecutorError(format!("failed to spawn '{}': {}", command, e)))?;

        match child.wait_timeout(timeout)? {
            Some(status) if status.success() => Ok(ExecutionOutcome::Success),
            Some(status) => {
                let mut detail = String::new();
                stderr_file.seek(SeekFrom::Start(0))?;
                stderr_file.read_to_string(&mut detail).ok();
                if detail.len() > DETAIL_LIMIT {
                    let mut start = detail.len() - DETAIL_LIMIT;
                    while !detail.is_char_boundary(start) {
                        start += 1;
                    }
                    detail = detail[start..].to_string();
                }
                Ok(ExecutionOutcome::Failed {
                    code: status.code(),
                    detail: detail.trim().to_string(),
                })
            }
            None => {
                warn!("command timed out after {:?}: {}", timeout, command);
                child.kill().ok();
                child.wait()?;
                Ok(ExecutionOutcome::TimedOut)
            }
        }
    }
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxExecutor for ProcessSandbox {
    fn begin_checkpoint(&mut self, spec: &CheckpointSpec) -> Result<CheckpointId> {
        let id = CheckpointId::new();
        debug!("checkpoint {} opened: {}", id, spec.label);
        self.open_checkpoints.insert(id, spec.clone());
        Ok(id)
    }

    fn execute(&mut self, command: &str, timeout: Duration) -> Result<ExecutionOutcome> {
        debug!("executing: {}", command);
        self.run(command, timeout)
    }

    fn commit(&mut self, checkpoint: CheckpointId) -> Result<()> {
        let spec = self.take_checkpoint(checkpoint)?;
        debug!("checkpoint {} committed: {}", checkpoint, spec.label);
        Ok(())
    }

    fn rollback(&mut self, checkpoint: CheckpointId) -> Result<()> {
        let spec = self.take_checkpoint(checkpoint)?;
        let Some(undo) = spec.undo else {
            warn!(
                "checkpoint {} has no undo command; nothing rolled back for '{}'",
                checkpoint, spec.label
            );
            return Ok(());
        };

        match self.run(&undo, DEFAULT_TIMEOUT)? {
            ExecutionOutcome::Success => Ok(()),
            ExecutionOutcome::Failed { code, detail } => Err(Error::ExecutorError(format!(
                "rollback of '{}' failed (code {:?}): {}",
                spec.label, code, detail
            ))),
            ExecutionOutcome::TimedOut => Err(Error::ExecutorError(format!(
                "rollback of '{}' timed out",
                spec.label
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(label: &str, undo: Option<&str>) -> CheckpointSpec {
        CheckpointSpec {
            label: label.to_string(),
            undo: undo.map(String::from),
        }
    }

    #[test]
    fn test_execute_success() {
        let mut sandbox = ProcessSandbox::new();
        let outcome = sandbox.execute("true", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Success);
    }

    #[test]
    fn test_execute_failure_reports_code_and_stderr() {
        let mut sandbox = ProcessSandbox::new();
        let outcome = sandbox
            .execute("echo oops >&2; exit 3", DEFAULT_TIMEOUT)
            .unwrap();
        match outcome {
            ExecutionOutcome::Failed { code, detail } => {
                assert_eq!(code, Some(3));
                assert!(detail.contains("oops"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_execute_timeout_kills_child() {
        let mut sandbox = ProcessSandbox::new();
        let outcome = sandbox
            .execute("sleep 5", Duration::from_millis(100))
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
    }

    #[test]
    fn test_checkpoint_commit() {
        let mut sandbox = ProcessSandbox::new();
        let id = sandbox.begin_checkpoint(&spec("install x", None)).unwrap();
        sandbox.commit(id).unwrap();
        // Double-commit is an infrastructure error
        assert!(sandbox.commit(id).is_err());
    }

    #[test]
    fn test_rollback_runs_undo_command() {
        let mut sandbox = ProcessSandbox::new();
        let id = sandbox
            .begin_checkpoint(&spec("install x", Some("true")))
            .unwrap();
        sandbox.rollback(id).unwrap();
    }

    #[test]
    fn test_rollback_failure_is_error() {
        let mut sandbox = ProcessSandbox::new();
        let id = sandbox
            .begin_checkpoint(&spec("install x", Some("exit 1")))
            .unwrap();
        assert!(sandbox.rollback(id).is_err());
    }

    #[test]
    fn test_rollback_without_undo_is_noop() {
        let mut sandbox = ProcessSandbox::new();
        let id = sandbox.begin_checkpoint(&spec("install x", None)).unwrap();
        sandbox.rollback(id).unwrap();
    }

    #[test]
    fn test_unknown_checkpoint_rejected() {
        let mut sandbox = ProcessSandbox::new();
        assert!(sandbox.rollback(CheckpointId::new()).is_err());
    }
}
