// src/host/mod.rs

//! Host metadata used by the compatibility gate.
//!
//! Collects the three facts gating needs: the host OS tag, the descriptor
//! major version this build supports, and which package sources are
//! actually present. Nothing here inspects installed packages.

use crate::snapshot::PackageSource;
use crate::sources::SourceRegistry;
use semver::Version;
use std::collections::BTreeSet;
use tracing::debug;

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Metadata describing the machine a descriptor is applied to
#[derive(Debug, Clone)]
pub struct HostInfo {
    /// OS identifier, e.g. "ubuntu-24.04"
    pub os_tag: String,
    /// Descriptor major version this tool accepts
    pub supported_major: u64,
    /// Package sources whose probe binary is on PATH
    pub available_sources: BTreeSet<PackageSource>,
}

impl HostInfo {
    pub fn new(os_tag: impl Into<String>, supported_major: u64) -> Self {
        Self {
            os_tag: os_tag.into(),
            supported_major,
            available_sources: BTreeSet::new(),
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = PackageSource>) -> Self {
        self.available_sources = sources.into_iter().collect();
        self
    }

    /// Probe the running host: OS tag from os-release, supported major
    /// from this build's own version, sources via their probe binaries.
    pub fn detect(registry: &SourceRegistry) -> Self {
        let os_tag = std::fs::read_to_string(OS_RELEASE_PATH)
            .ok()
            .and_then(|content| parse_os_release(&content))
            .unwrap_or_else(|| std::env::consts::OS.to_string());

        let supported_major = tool_major_version();

        let available_sources = registry
            .sources()
            .filter(|source| {
                registry.get(source).is_some_and(|caps| {
                    let found = which::which(&caps.probe_binary).is_ok();
                    debug!("probe {} ({}): {}", source, caps.probe_binary, found);
                    found
                })
            })
            .cloned()
            .collect();

        Self {
            os_tag,
            supported_major,
            available_sources,
        }
    }

    pub fn source_available(&self, source: &PackageSource) -> bool {
        self.available_sources.contains(source)
    }
}

/// Major version of this build, from Cargo metadata
pub fn tool_major_version() -> u64 {
    Version::parse(env!("CARGO_PKG_VERSION"))
        .map(|v| v.major)
        .unwrap_or(0)
}

/// This build's full version tag, stamped into captured descriptors
pub fn tool_version_tag() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Extract "<id>-<version>" from os-release content
fn parse_os_release(content: &str) -> Option<String> {
    let mut id = None;
    let mut version_id = None;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(value.trim_matches('"').to_string());
        } else if let Some(value) = line.strip_prefix("VERSION_ID=") {
            version_id = Some(value.trim_matches('"').to_string());
        }
    }

    match (id, version_id) {
        (Some(id), Some(version)) => Some(format!("{}-{}", id, version)),
        (Some(id), None) => Some(id),
        _ => None,
    }
}
