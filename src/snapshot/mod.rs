// src/snapshot/mod.rs

//! Package records and point-in-time snapshots.
//!
//! A [`PackageSnapshot`] is an immutable, insertion-ordered listing of
//! `(name, version, source)` triples. Two snapshots drive every
//! reconciliation: `desired` (parsed from a descriptor) and `observed`
//! (enumerated from the host). Identity of a record is `(name, source)`;
//! the same key at a different version is the same package.
//!
//! Host enumeration itself is a collaborator concern behind the
//! [`HostInventory`] trait. The built-in [`FileInventory`] reads a saved
//! snapshot file, which keeps reconciliation testable and scriptable
//! without asking the OS anything.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A package ecosystem a record belongs to.
///
/// Known ecosystems get their own variant; anything else is carried as
/// `Other(tag)` so a new source can participate once it registers its
/// capability bundle with the [`crate::sources::SourceRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageSource {
    Apt,
    Pip,
    Npm,
    Brew,
    Cargo,
    Other(String),
}

impl PackageSource {
    /// The lowercase tag used in descriptors and snapshot files
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Apt => "apt",
            Self::Pip => "pip",
            Self::Npm => "npm",
            Self::Brew => "brew",
            Self::Cargo => "cargo",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl FromStr for PackageSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase();
        match tag.as_str() {
            "" => Err(Error::UnknownSource("empty source tag".to_string())),
            "apt" => Ok(Self::Apt),
            "pip" => Ok(Self::Pip),
            "npm" => Ok(Self::Npm),
            "brew" => Ok(Self::Brew),
            "cargo" => Ok(Self::Cargo),
            _ => Ok(Self::Other(tag)),
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

impl Serialize for PackageSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for PackageSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(|e: Error| D::Error::custom(e.to_string()))
    }
}

/// One installed or desired package. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub source: PackageSource,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>, source: PackageSource) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            source,
        }
    }

    /// Identity key: two records with the same key are the same package
    pub fn key(&self) -> (&str, &PackageSource) {
        (self.name.as_str(), &self.source)
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} [{}]", self.name, self.version, self.source)
    }
}

/// An insertion-ordered set of package records, unique by `(name, source)`
#[derive(Debug, Clone, Default)]
pub struct PackageSnapshot {
    records: Vec<PackageRecord>,
}

impl PackageSnapshot {
    /// An empty snapshot (a host with nothing enumerated yet)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot, rejecting duplicate identity keys
    pub fn from_records(records: Vec<PackageRecord>) -> Result<Self> {
        let mut seen: HashSet<(&str, &PackageSource)> = HashSet::new();
        for record in &records {
            if !seen.insert(record.key()) {
                return Err(Error::SnapshotError(format!(
                    "duplicate package record: {} [{}]",
                    record.name, record.source
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by identity key
    pub fn get(&self, name: &str, source: &PackageSource) -> Option<&PackageRecord> {
        self.records
            .iter()
            .find(|r| r.name == name && &r.source == source)
    }

    /// Build a key -> record index for diffing
    pub fn index(&self) -> HashMap<(&str, &PackageSource), &PackageRecord> {
        self.records.iter().map(|r| (r.key(), r)).collect()
    }

    /// The distinct sources referenced, in first-appearance order
    pub fn sources(&self) -> Vec<&PackageSource> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| &r.source)
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

/// Metadata header of a saved snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot: Option<SnapshotMeta>,
    #[serde(default)]
    packages: Vec<PackageRecord>,
}

/// Load a snapshot from a TOML inventory file
pub fn load_snapshot(path: &Path) -> Result<PackageSnapshot> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::SnapshotError(format!("failed to read {}: {}", path.display(), e))
    })?;
    let file: SnapshotFile = toml::from_str(&content).map_err(|e| {
        Error::SnapshotError(format!("failed to parse {}: {}", path.display(), e))
    })?;
    PackageSnapshot::from_records(file.packages)
}

/// Write a snapshot to a TOML inventory file
pub fn save_snapshot(
    path: &Path,
    snapshot: &PackageSnapshot,
    meta: Option<SnapshotMeta>,
) -> Result<()> {
    let file = SnapshotFile {
        snapshot: meta,
        packages: snapshot.records().to_vec(),
    };
    let content = toml::to_string_pretty(&file)
        .map_err(|e| Error::SnapshotError(format!("failed to serialize snapshot: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// The host enumeration collaborator.
///
/// How a host is asked "what is installed" is outside this crate's core;
/// reconciliation only needs something that yields a snapshot.
pub trait HostInventory {
    fn snapshot(&self) -> Result<PackageSnapshot>;
}

/// Inventory backed by a saved snapshot file
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HostInventory for FileInventory {
    fn snapshot(&self) -> Result<PackageSnapshot> {
        load_snapshot(&self.path)
    }
}
