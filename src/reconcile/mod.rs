// src/reconcile/mod.rs

//! Reconciliation actions and plans.
//!
//! A [`ReconciliationPlan`] is the ordered set of actions needed to move
//! an observed machine state toward a desired descriptor. Actions are
//! pure data; executing them is the apply coordinator's job. Plans are
//! built fresh per diff call and never persisted by this crate.

mod diff;

pub use diff::compute_diff;

use crate::gate::CompatibilityResult;
use crate::snapshot::{PackageRecord, PackageSource};

/// One step toward the desired state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Package absent from the host
    Install(PackageRecord),

    /// Host has an older version
    Upgrade {
        from: PackageRecord,
        to: PackageRecord,
    },

    /// Host has a newer version than desired; applied, but reported
    /// distinctly so callers can warn before regressing a package
    Downgrade {
        from: PackageRecord,
        to: PackageRecord,
    },

    /// Already at the desired version; kept in the plan for visibility,
    /// never dispatched to the executor
    NoOp(PackageRecord),

    /// Preference key differs from (or is absent in) the local store
    PreferenceChange {
        key: String,
        from: Option<String>,
        to: String,
    },
}

impl ReconcileAction {
    /// True for package-level actions (everything except preferences)
    pub fn is_package_action(&self) -> bool {
        !matches!(self, Self::PreferenceChange { .. })
    }

    /// True if this action reaches the executor in a real apply
    pub fn is_dispatchable(&self) -> bool {
        matches!(
            self,
            Self::Install(_) | Self::Upgrade { .. } | Self::Downgrade { .. }
        )
    }

    /// The package source this action operates on, if any
    pub fn source(&self) -> Option<&PackageSource> {
        self.target_record().map(|r| &r.source)
    }

    /// The record this action moves the host toward, if any
    pub fn target_record(&self) -> Option<&PackageRecord> {
        match self {
            Self::Install(record) | Self::NoOp(record) => Some(record),
            Self::Upgrade { to, .. } | Self::Downgrade { to, .. } => Some(to),
            Self::PreferenceChange { .. } => None,
        }
    }

    /// Human-readable description for plan output
    pub fn description(&self) -> String {
        match self {
            Self::Install(record) => format!("Install {}", record),
            Self::Upgrade { from, to } => format!(
                "Upgrade {} ({} -> {}) [{}]",
                to.name, from.version, to.version, to.source
            ),
            Self::Downgrade { from, to } => format!(
                "Downgrade {} ({} -> {}) [{}]",
                to.name, from.version, to.version, to.source
            ),
            Self::NoOp(record) => format!("Keep {}", record),
            Self::PreferenceChange { key, from, to } => match from {
                Some(from) => format!("Set preference {} ({} -> {})", key, from, to),
                None => format!("Set preference {} (-> {})", key, to),
            },
        }
    }
}

/// Which action categories a diff or apply operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub packages: bool,
    pub preferences: bool,
}

impl Selection {
    pub fn all() -> Self {
        Self {
            packages: true,
            preferences: true,
        }
    }

    pub fn packages_only() -> Self {
        Self {
            packages: true,
            preferences: false,
        }
    }

    pub fn preferences_only() -> Self {
        Self {
            packages: false,
            preferences: true,
        }
    }

    pub fn includes(&self, action: &ReconcileAction) -> bool {
        if action.is_package_action() {
            self.packages
        } else {
            self.preferences
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::all()
    }
}

/// Options for computing a diff; one immutable structure, not scattered flags
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    pub selection: Selection,
}

/// Action counts, computed before selective filtering so reporting stays
/// accurate even when a plan is narrowed to one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub installs: usize,
    pub upgrades: usize,
    pub downgrades: usize,
    pub noops: usize,
    pub preference_changes: usize,
}

impl DiffStats {
    /// Count of actions that would change the host
    pub fn total_changes(&self) -> usize {
        self.installs + self.upgrades + self.downgrades + self.preference_changes
    }
}

/// The ordered actions needed to reach the desired state, plus the
/// compatibility result that gated plan construction
#[derive(Debug, Clone)]
pub struct ReconciliationPlan {
    /// Package actions grouped by source, then preference changes
    pub actions: Vec<ReconcileAction>,
    /// The gate outcome this plan was built under
    pub gate: CompatibilityResult,
    /// Warnings accumulated while diffing (downgrades, fallbacks, skips)
    pub warnings: Vec<String>,
    /// Pre-filter action counts
    pub stats: DiffStats,
}

impl ReconciliationPlan {
    /// True when nothing in the (filtered) plan would change the host
    pub fn is_in_sync(&self) -> bool {
        !self
            .actions
            .iter()
            .any(|a| a.is_dispatchable() || !a.is_package_action())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
