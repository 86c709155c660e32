// src/lib.rs

//! Outfit Machine State Reconciler
//!
//! Captures a machine's installed-software and preference state into a
//! portable descriptor, and reconciles other machines against it.
//!
//! # Architecture
//!
//! - Descriptor-driven: desired state lives in a portable TOML record
//! - Gate before plan: a compatibility check runs before any plan exists
//! - Additive-only diff: packages the descriptor omits are never removed
//! - Checkpointed apply: each action commits or rolls back in a sandbox
//! - Continue-on-error: a failed action never aborts the remaining plan

pub mod apply;
pub mod db;
pub mod descriptor;
mod error;
pub mod gate;
pub mod host;
pub mod reconcile;
pub mod sandbox;
pub mod snapshot;
pub mod sources;
pub mod version;

pub use apply::{
    ApplyCoordinator, ApplyOptions, ApplyResult, AppliedAction, FailedAction, PreferenceSink,
};
pub use descriptor::{
    descriptor_exists, load_descriptor, parse_descriptor_file, DescriptorError, DescriptorMeta,
    MachineDescriptor, DEFAULT_DESCRIPTOR_PATH,
};
pub use error::{Error, ErrorKind, Result};
pub use gate::CompatibilityResult;
pub use host::HostInfo;
pub use reconcile::{
    compute_diff, DiffOptions, DiffStats, ReconcileAction, ReconciliationPlan, Selection,
};
pub use sandbox::{
    CheckpointId, CheckpointSpec, ExecutionOutcome, ProcessSandbox, SandboxExecutor,
};
pub use snapshot::{
    load_snapshot, save_snapshot, FileInventory, HostInventory, PackageRecord, PackageSnapshot,
    PackageSource,
};
pub use sources::{SourceCapabilities, SourceRegistry};
pub use version::{compare as compare_versions, VersionComparison, VersionDelta};
