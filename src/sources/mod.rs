// src/sources/mod.rs

//! Package-source capability registry.
//!
//! Each ecosystem the reconciler can drive is described by a capability
//! bundle: how to detect the source on a host and the command templates
//! used to install, downgrade, and undo a package action. New sources
//! register a bundle at runtime instead of being hardcoded anywhere else.
//!
//! Templates use `{name}` and `{version}` placeholders, rendered against
//! the target [`PackageRecord`] of an action.

use crate::snapshot::{PackageRecord, PackageSource};
use std::collections::BTreeMap;

/// Capability bundle for one package source
#[derive(Debug, Clone)]
pub struct SourceCapabilities {
    /// Binary whose presence on PATH marks this source as available
    pub probe_binary: String,
    /// Command template for install and upgrade actions
    pub install_template: String,
    /// Command template for downgrades; install template is used if absent
    pub downgrade_template: Option<String>,
    /// Command template that undoes an install, used for checkpoint rollback
    pub undo_template: Option<String>,
}

impl SourceCapabilities {
    /// Render the install/upgrade command for a target record
    pub fn install_command(&self, target: &PackageRecord) -> String {
        render(&self.install_template, target)
    }

    /// Render the downgrade command for a target record
    pub fn downgrade_command(&self, target: &PackageRecord) -> String {
        let template = self
            .downgrade_template
            .as_deref()
            .unwrap_or(&self.install_template);
        render(template, target)
    }

    /// Render the undo command for a target record, if this source has one
    pub fn undo_command(&self, target: &PackageRecord) -> Option<String> {
        self.undo_template.as_deref().map(|t| render(t, target))
    }
}

fn render(template: &str, record: &PackageRecord) -> String {
    template
        .replace("{name}", &record.name)
        .replace("{version}", &record.version)
}

/// Registry mapping source tags to capability bundles
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    capabilities: BTreeMap<PackageSource, SourceCapabilities>,
}

impl SourceRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            capabilities: BTreeMap::new(),
        }
    }

    /// The registry seeded with the built-in ecosystems
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            PackageSource::Apt,
            SourceCapabilities {
                probe_binary: "apt-get".to_string(),
                install_template: "apt-get install -y {name}={version}".to_string(),
                downgrade_template: Some(
                    "apt-get install -y --allow-downgrades {name}={version}".to_string(),
                ),
                undo_template: Some("apt-get remove -y {name}".to_string()),
            },
        );

        registry.register(
            PackageSource::Pip,
            SourceCapabilities {
                probe_binary: "pip3".to_string(),
                install_template: "pip3 install {name}=={version}".to_string(),
                downgrade_template: None,
                undo_template: Some("pip3 uninstall -y {name}".to_string()),
            },
        );

        registry.register(
            PackageSource::Npm,
            SourceCapabilities {
                probe_binary: "npm".to_string(),
                install_template: "npm install -g {name}@{version}".to_string(),
                downgrade_template: None,
                undo_template: Some("npm uninstall -g {name}".to_string()),
            },
        );

        registry.register(
            PackageSource::Brew,
            SourceCapabilities {
                probe_binary: "brew".to_string(),
                install_template: "brew install {name}".to_string(),
                downgrade_template: None,
                undo_template: Some("brew uninstall {name}".to_string()),
            },
        );

        registry.register(
            PackageSource::Cargo,
            SourceCapabilities {
                probe_binary: "cargo".to_string(),
                install_template: "cargo install {name} --version {version}".to_string(),
                downgrade_template: None,
                undo_template: Some("cargo uninstall {name}".to_string()),
            },
        );

        registry
    }

    /// Register (or replace) a capability bundle for a source
    pub fn register(&mut self, source: PackageSource, capabilities: SourceCapabilities) {
        self.capabilities.insert(source, capabilities);
    }

    pub fn get(&self, source: &PackageSource) -> Option<&SourceCapabilities> {
        self.capabilities.get(source)
    }

    pub fn contains(&self, source: &PackageSource) -> bool {
        self.capabilities.contains_key(source)
    }

    /// All registered sources, in tag order
    pub fn sources(&self) -> impl Iterator<Item = &PackageSource> {
        self.capabilities.keys()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
