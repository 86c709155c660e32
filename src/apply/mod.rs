// src/apply/mod.rs

//! Apply coordinator: walks a reconciliation plan and executes it.
//!
//! Each action moves through `Pending -> (Simulated | Executing) ->
//! (Succeeded | Failed)`. Package actions are wrapped in a sandbox
//! checkpoint: commit on success, rollback on failure, with a rollback
//! failure escalating the entry to unrecoverable. Preference changes
//! mutate the local preference store directly and never touch the
//! executor, so preference and package failures stay independent.
//!
//! The coordinator is continue-on-error: one failed action never aborts
//! the remaining plan, and the caller always receives a complete
//! [`ApplyResult`]. Dry-run simulates every non-NoOp action with zero
//! observable side effects. Actions run strictly one at a time; later
//! actions may depend on environment mutated by earlier ones.

use crate::error::{ErrorKind, Result};
use crate::reconcile::{ReconcileAction, ReconciliationPlan, Selection};
use crate::sandbox::{CheckpointSpec, ExecutionOutcome, SandboxExecutor, DEFAULT_TIMEOUT};
use crate::sources::SourceRegistry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Local preference store mutated by `PreferenceChange` actions
pub trait PreferenceSink {
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl PreferenceSink for BTreeMap<String, String> {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Options for one apply invocation; a single immutable structure
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Simulate every action instead of executing
    pub dry_run: bool,
    /// Action categories to apply; everything else is skipped
    pub selection: Selection,
    /// Per-action execution timeout
    pub timeout: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            selection: Selection::all(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Per-action progress states
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ActionState {
    Pending,
    Simulated,
    Executing,
    Succeeded,
    Failed,
}

/// An action that completed successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAction {
    pub action: ReconcileAction,
    /// True when the action was simulated by a dry run
    pub simulated: bool,
}

/// An action that failed, with its classification
#[derive(Debug, Clone)]
pub struct FailedAction {
    pub action: ReconcileAction,
    pub kind: ErrorKind,
    pub message: String,
    /// True when rollback of this action also failed; host state may be
    /// inconsistent
    pub unrecoverable: bool,
}

/// Complete outcome of one apply invocation. Immutable once returned.
///
/// `succeeded`, `failed`, and `skipped` together cover exactly the
/// plan's actions: `skipped` holds selective-filtered actions plus the
/// untouched remainder after a cancellation.
#[derive(Debug)]
pub struct ApplyResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub succeeded: Vec<AppliedAction>,
    pub failed: Vec<FailedAction>,
    pub skipped: Vec<ReconcileAction>,
    /// True when the caller's cancel flag stopped the run early
    pub cancelled: bool,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Count of entries whose rollback also failed
    pub fn unrecoverable_count(&self) -> usize {
        self.failed.iter().filter(|f| f.unrecoverable).count()
    }
}

enum ActionOutcome {
    Succeeded,
    Failed {
        kind: ErrorKind,
        message: String,
        unrecoverable: bool,
    },
}

/// Walks a plan and executes or simulates each action
pub struct ApplyCoordinator<'a> {
    registry: &'a SourceRegistry,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> ApplyCoordinator<'a> {
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Self {
            registry,
            cancel: None,
        }
    }

    /// Cooperative cancellation: checked before each action starts; an
    /// in-flight action runs to completion or its own timeout
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Apply (or simulate) every selected action in the plan
    pub fn apply(
        &self,
        plan: &ReconciliationPlan,
        options: &ApplyOptions,
        executor: &mut dyn SandboxExecutor,
        prefs: &mut dyn PreferenceSink,
    ) -> ApplyResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = false;

        info!(
            "apply run {} started: {} action(s), dry_run={}",
            run_id,
            plan.len(),
            options.dry_run
        );

        for action in &plan.actions {
            if !options.selection.includes(action) {
                skipped.push(action.clone());
                continue;
            }

            if cancelled || self.is_cancelled() {
                cancelled = true;
                skipped.push(action.clone());
                continue;
            }

            // NoOp: Pending -> Succeeded without touching the executor
            if let ReconcileAction::NoOp(_) = action {
                succeeded.push(AppliedAction {
                    action: action.clone(),
                    simulated: false,
                });
                continue;
            }

            if options.dry_run {
                debug!("{} -> {}", action.description(), ActionState::Simulated);
                succeeded.push(AppliedAction {
                    action: action.clone(),
                    simulated: true,
                });
                continue;
            }

            debug!("{} -> {}", action.description(), ActionState::Executing);
            let outcome = match action {
                ReconcileAction::PreferenceChange { key, to, .. } => {
                    self.apply_preference(prefs, key, to)
                }
                _ => self.apply_package_action(action, options.timeout, executor),
            };

            match outcome {
                ActionOutcome::Succeeded => {
                    info!("{}: succeeded", action.description());
                    succeeded.push(AppliedAction {
                        action: action.clone(),
                        simulated: false,
                    });
                }
                ActionOutcome::Failed {
                    kind,
                    message,
                    unrecoverable,
                } => {
                    warn!("{}: failed ({}): {}", action.description(), kind, message);
                    failed.push(FailedAction {
                        action: action.clone(),
                        kind,
                        message,
                        unrecoverable,
                    });
                }
            }
        }

        info!(
            "apply run {} finished: {} succeeded, {} failed, {} skipped",
            run_id,
            succeeded.len(),
            failed.len(),
            skipped.len()
        );

        ApplyResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run: options.dry_run,
            succeeded,
            failed,
            skipped,
            cancelled,
        }
    }

    fn apply_preference(
        &self,
        prefs: &mut dyn PreferenceSink,
        key: &str,
        value: &str,
    ) -> ActionOutcome {
        match prefs.set(key, value) {
            Ok(()) => ActionOutcome::Succeeded,
            Err(e) => ActionOutcome::Failed {
                kind: ErrorKind::PreferenceStore,
                message: e.to_string(),
                unrecoverable: false,
            },
        }
    }

    fn apply_package_action(
        &self,
        action: &ReconcileAction,
        timeout: Duration,
        executor: &mut dyn SandboxExecutor,
    ) -> ActionOutcome {
        let Some(target) = action.target_record() else {
            return ActionOutcome::Failed {
                kind: ErrorKind::ExecutorFailure,
                message: "action has no target record".to_string(),
                unrecoverable: false,
            };
        };

        let Some(caps) = self.registry.get(&target.source) else {
            return ActionOutcome::Failed {
                kind: ErrorKind::MissingPackageSource,
                message: format!("no capability bundle registered for '{}'", target.source),
                unrecoverable: false,
            };
        };

        let command = match action {
            ReconcileAction::Downgrade { .. } => caps.downgrade_command(target),
            _ => caps.install_command(target),
        };

        let spec = CheckpointSpec {
            label: action.description(),
            undo: caps.undo_command(target),
        };

        let checkpoint = match executor.begin_checkpoint(&spec) {
            Ok(id) => id,
            Err(e) => {
                return ActionOutcome::Failed {
                    kind: ErrorKind::ExecutorFailure,
                    message: format!("failed to open checkpoint: {}", e),
                    unrecoverable: false,
                };
            }
        };

        let (kind, message) = match executor.execute(&command, timeout) {
            Ok(ExecutionOutcome::Success) => {
                return match executor.commit(checkpoint) {
                    Ok(()) => ActionOutcome::Succeeded,
                    Err(e) => ActionOutcome::Failed {
                        kind: ErrorKind::ExecutorFailure,
                        message: format!("commit failed: {}", e),
                        unrecoverable: false,
                    },
                };
            }
            Ok(ExecutionOutcome::Failed { code, detail }) => (
                ErrorKind::ExecutorFailure,
                format!("command failed (code {:?}): {}", code, detail),
            ),
            Ok(ExecutionOutcome::TimedOut) => (
                ErrorKind::Timeout,
                format!("timed out after {:?}", timeout),
            ),
            Err(e) => (ErrorKind::ExecutorFailure, e.to_string()),
        };

        // The action failed; roll its checkpoint back. A rollback failure
        // escalates: host state may now be inconsistent.
        match executor.rollback(checkpoint) {
            Ok(()) => ActionOutcome::Failed {
                kind,
                message,
                unrecoverable: false,
            },
            Err(rollback_err) => ActionOutcome::Failed {
                kind: ErrorKind::RollbackFailure,
                message: format!("{}; rollback failed: {}", message, rollback_err),
                unrecoverable: true,
            },
        }
    }
}
