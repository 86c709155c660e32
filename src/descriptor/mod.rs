// src/descriptor/mod.rs

//! Portable machine descriptors.
//!
//! A descriptor is the desired-state record for a machine: which packages
//! should be present (per ecosystem), which preferences should be set,
//! plus advisory environment variables and an opaque hardware block. It
//! is a TOML document, written by `capture` on one machine and consumed
//! by `diff`/`apply` on another.
//!
//! # Example machine.toml
//!
//! ```toml
//! [descriptor]
//! version_tag = "0.1.0"
//! os_tag = "ubuntu-24.04"
//!
//! [[packages]]
//! name = "docker"
//! version = "24.0.7-1"
//! source = "apt"
//!
//! [[packages]]
//! name = "numpy"
//! version = "1.24.0"
//! source = "pip"
//!
//! [preferences]
//! "editor.theme" = "dark"
//!
//! # Advisory only; never applied by the reconciler
//! [environment]
//! EDITOR = "vim"
//! ```

use crate::snapshot::{PackageRecord, PackageSnapshot, PackageSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Default path for the machine descriptor file
pub const DEFAULT_DESCRIPTOR_PATH: &str = "/etc/outfit/machine.toml";

/// Errors that can occur when working with descriptors
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Failed to read descriptor file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse descriptor file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize descriptor: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Duplicate package in descriptor: {0}")]
    DuplicatePackage(String),

    #[error("Invalid package entry: {0}")]
    InvalidPackage(String),
}

/// Result type for descriptor operations
pub type DescriptorResult<T> = Result<T, DescriptorError>;

/// Metadata header consumed by the compatibility gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorMeta {
    /// Version of the tool that created this descriptor
    pub version_tag: String,
    /// OS identifier of the capturing machine, e.g. "ubuntu-24.04"
    pub os_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The desired-state record for a machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDescriptor {
    #[serde(rename = "descriptor")]
    pub meta: DescriptorMeta,

    #[serde(default)]
    pub packages: Vec<PackageRecord>,

    /// Desired preference values; keys not listed are left untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preferences: BTreeMap<String, String>,

    /// Advisory only; surfaced in reports, never applied
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// Opaque hardware description, preserved round-trip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<toml::Table>,
}

impl MachineDescriptor {
    /// An empty descriptor with the given metadata
    pub fn new(version_tag: impl Into<String>, os_tag: impl Into<String>) -> Self {
        Self {
            meta: DescriptorMeta {
                version_tag: version_tag.into(),
                os_tag: os_tag.into(),
                created_at: None,
            },
            packages: Vec::new(),
            preferences: BTreeMap::new(),
            environment: BTreeMap::new(),
            hardware: None,
        }
    }

    /// The desired-state snapshot described by this descriptor
    pub fn desired_snapshot(&self) -> crate::Result<PackageSnapshot> {
        PackageSnapshot::from_records(self.packages.clone())
    }

    /// Distinct sources the descriptor references, in first-appearance order
    pub fn referenced_sources(&self) -> Vec<&PackageSource> {
        let mut seen = HashSet::new();
        self.packages
            .iter()
            .map(|r| &r.source)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Serialize to a TOML document
    pub fn to_toml(&self) -> DescriptorResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the descriptor to a file
    pub fn save(&self, path: &Path) -> DescriptorResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    fn validate(&self) -> DescriptorResult<()> {
        let mut seen: HashSet<(&str, &PackageSource)> = HashSet::new();
        for record in &self.packages {
            if record.name.trim().is_empty() {
                return Err(DescriptorError::InvalidPackage(
                    "package with empty name".to_string(),
                ));
            }
            if !seen.insert(record.key()) {
                return Err(DescriptorError::DuplicatePackage(format!(
                    "{} [{}]",
                    record.name, record.source
                )));
            }
        }
        Ok(())
    }
}

/// Parse and validate a descriptor file
pub fn parse_descriptor_file(path: &Path) -> DescriptorResult<MachineDescriptor> {
    let content = std::fs::read_to_string(path)?;
    let descriptor: MachineDescriptor = toml::from_str(&content)?;
    descriptor.validate()?;
    Ok(descriptor)
}

/// Load a descriptor from the default or specified path
pub fn load_descriptor(path: Option<&Path>) -> DescriptorResult<MachineDescriptor> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_DESCRIPTOR_PATH));
    parse_descriptor_file(path)
}

/// Check if a descriptor file exists
pub fn descriptor_exists(path: Option<&Path>) -> bool {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_DESCRIPTOR_PATH));
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_descriptor() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[descriptor]
version_tag = "0.1.0"
os_tag = "ubuntu-24.04"
"#
        )
        .unwrap();

        let descriptor = parse_descriptor_file(file.path()).unwrap();
        assert_eq!(descriptor.meta.version_tag, "0.1.0");
        assert_eq!(descriptor.meta.os_tag, "ubuntu-24.04");
        assert!(descriptor.packages.is_empty());
        assert!(descriptor.preferences.is_empty());
    }

    #[test]
    fn test_parse_full_descriptor() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[descriptor]
version_tag = "0.1.0"
os_tag = "ubuntu-24.04"

[[packages]]
name = "docker"
version = "24.0.7-1"
source = "apt"

[[packages]]
name = "numpy"
version = "1.24.0"
source = "pip"

[preferences]
"editor.theme" = "dark"
"shell.prompt" = "minimal"

[environment]
EDITOR = "vim"

[hardware]
cpu = "arm64"
memory_gb = 32
"#
        )
        .unwrap();

        let descriptor = parse_descriptor_file(file.path()).unwrap();
        assert_eq!(descriptor.packages.len(), 2);
        assert_eq!(descriptor.packages[1].source, PackageSource::Pip);
        assert_eq!(
            descriptor.preferences.get("editor.theme"),
            Some(&"dark".to_string())
        );
        assert_eq!(descriptor.environment.get("EDITOR"), Some(&"vim".to_string()));

        let hardware = descriptor.hardware.as_ref().unwrap();
        assert_eq!(
            hardware.get("cpu").and_then(|v| v.as_str()),
            Some("arm64")
        );
    }

    #[test]
    fn test_duplicate_package_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[descriptor]
version_tag = "0.1.0"
os_tag = "ubuntu-24.04"

[[packages]]
name = "docker"
version = "24.0.7-1"
source = "apt"

[[packages]]
name = "docker"
version = "25.0.0"
source = "apt"
"#
        )
        .unwrap();

        let result = parse_descriptor_file(file.path());
        assert!(matches!(result, Err(DescriptorError::DuplicatePackage(_))));
    }

    #[test]
    fn test_empty_package_name_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[descriptor]
version_tag = "0.1.0"
os_tag = "ubuntu-24.04"

[[packages]]
name = ""
version = "1.0"
source = "apt"
"#
        )
        .unwrap();

        let result = parse_descriptor_file(file.path());
        assert!(matches!(result, Err(DescriptorError::InvalidPackage(_))));
    }

    #[test]
    fn test_round_trip() {
        let mut descriptor = MachineDescriptor::new("0.1.0", "ubuntu-24.04");
        descriptor.packages.push(PackageRecord::new(
            "docker",
            "24.0.7-1",
            PackageSource::Apt,
        ));
        descriptor
            .preferences
            .insert("editor.theme".to_string(), "dark".to_string());

        let file = NamedTempFile::new().unwrap();
        descriptor.save(file.path()).unwrap();
        let reloaded = parse_descriptor_file(file.path()).unwrap();

        assert_eq!(reloaded.packages, descriptor.packages);
        assert_eq!(reloaded.preferences, descriptor.preferences);
    }

    #[test]
    fn test_referenced_sources() {
        let mut descriptor = MachineDescriptor::new("0.1.0", "ubuntu-24.04");
        descriptor.packages = vec![
            PackageRecord::new("docker", "24.0.7-1", PackageSource::Apt),
            PackageRecord::new("numpy", "1.24.0", PackageSource::Pip),
            PackageRecord::new("curl", "8.5.0", PackageSource::Apt),
        ];

        assert_eq!(
            descriptor.referenced_sources(),
            vec![&PackageSource::Apt, &PackageSource::Pip]
        );
    }
}
