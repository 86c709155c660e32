// src/gate/mod.rs

//! Compatibility gate between a descriptor and a host.
//!
//! Runs before any plan is built. Exactly one rule is hard: a descriptor
//! whose major version is outside what this build supports is rejected
//! unless the caller forces past the gate. OS mismatches and missing
//! package sources are advisory; they surface as warnings and shape the
//! plan (missing-source packages become no-ops) without blocking it.
//!
//! The gate reads metadata only: version tag, OS tag, declared sources.

use crate::descriptor::MachineDescriptor;
use crate::host::HostInfo;
use crate::snapshot::PackageSource;
use crate::version;
use std::collections::BTreeSet;
use tracing::warn;

/// Outcome of a compatibility check. Produced once per reconciliation
/// attempt and never mutated afterward.
#[derive(Debug, Clone)]
pub struct CompatibilityResult {
    pub compatible: bool,
    /// Set only when `compatible` is false
    pub reason: Option<String>,
    pub warnings: Vec<String>,
    /// Sources the descriptor references but the host does not provide
    pub missing_sources: BTreeSet<PackageSource>,
    /// True when a hard failure was bypassed with the force flag
    pub forced: bool,
}

impl CompatibilityResult {
    /// A clean pass with no warnings
    pub fn pass() -> Self {
        Self {
            compatible: true,
            reason: None,
            warnings: Vec::new(),
            missing_sources: BTreeSet::new(),
            forced: false,
        }
    }
}

/// Check whether a descriptor may be applied to this host.
///
/// `force` bypasses the major-version rule entirely; its warning still
/// surfaces so the override is never silent.
pub fn check(descriptor: &MachineDescriptor, host: &HostInfo, force: bool) -> CompatibilityResult {
    let mut result = CompatibilityResult::pass();

    // Rule 1 (hard): descriptor major version vs supported major
    match version::major_of(&descriptor.meta.version_tag) {
        Some(major) if major != host.supported_major => {
            if force {
                result.forced = true;
                result.warnings.push(format!(
                    "incompatible major version: descriptor {}, host supports {} (forced)",
                    major, host.supported_major
                ));
            } else {
                result.compatible = false;
                result.reason = Some(format!(
                    "incompatible major version: descriptor {}, host supports {}",
                    major, host.supported_major
                ));
                warn!(
                    "descriptor rejected: major version {} vs supported {}",
                    major, host.supported_major
                );
                return result;
            }
        }
        Some(_) => {}
        None => {
            result.warnings.push(format!(
                "unparseable version tag '{}'; skipping version check",
                descriptor.meta.version_tag
            ));
        }
    }

    // Rule 2 (advisory): OS identifier mismatch
    if descriptor.meta.os_tag != host.os_tag {
        result.warnings.push(format!(
            "OS mismatch: config={}, current={}",
            descriptor.meta.os_tag, host.os_tag
        ));
    }

    // Rule 3 (advisory): referenced sources missing on this host
    for source in descriptor.referenced_sources() {
        if !host.source_available(source) {
            result.warnings.push(format!(
                "package source '{}' not available on this host; its packages will be skipped",
                source
            ));
            result.missing_sources.insert(source.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PackageRecord;

    fn descriptor_with(version_tag: &str, os_tag: &str) -> MachineDescriptor {
        MachineDescriptor::new(version_tag, os_tag)
    }

    fn host() -> HostInfo {
        HostInfo::new("ubuntu-24.04", 0).with_sources([PackageSource::Apt, PackageSource::Pip])
    }

    #[test]
    fn test_matching_descriptor_passes_clean() {
        let mut descriptor = descriptor_with("0.1.0", "ubuntu-24.04");
        descriptor
            .packages
            .push(PackageRecord::new("docker", "24.0.7-1", PackageSource::Apt));

        let result = check(&descriptor, &host(), false);
        assert!(result.compatible);
        assert!(result.reason.is_none());
        assert!(result.warnings.is_empty());
        assert!(result.missing_sources.is_empty());
    }

    #[test]
    fn test_major_mismatch_is_hard_failure() {
        let descriptor = descriptor_with("1.0.0", "ubuntu-24.04");
        let result = check(&descriptor, &host(), false);

        assert!(!result.compatible);
        assert!(result.reason.as_deref().unwrap().contains("major version"));
    }

    #[test]
    fn test_force_bypasses_major_mismatch_with_warning() {
        let descriptor = descriptor_with("1.0.0", "ubuntu-24.04");
        let result = check(&descriptor, &host(), true);

        assert!(result.compatible);
        assert!(result.forced);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_os_mismatch_is_warning_only() {
        let descriptor = descriptor_with("0.1.0", "fedora-41");
        let result = check(&descriptor, &host(), false);

        assert!(result.compatible);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("OS mismatch: config=fedora-41, current=ubuntu-24.04")));
    }

    #[test]
    fn test_missing_source_is_warning_and_recorded() {
        let mut descriptor = descriptor_with("0.1.0", "ubuntu-24.04");
        descriptor
            .packages
            .push(PackageRecord::new("typescript", "5.3.3", PackageSource::Npm));

        let result = check(&descriptor, &host(), false);
        assert!(result.compatible);
        assert!(result.missing_sources.contains(&PackageSource::Npm));
        assert!(result.warnings.iter().any(|w| w.contains("'npm'")));
    }

    #[test]
    fn test_unparseable_version_tag_is_soft() {
        let descriptor = descriptor_with("nightly", "ubuntu-24.04");
        let result = check(&descriptor, &host(), false);

        assert!(result.compatible);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("unparseable version tag")));
    }
}
