// src/reconcile/diff.rs

//! Diff computation between desired and observed state.
//!
//! Produces a [`ReconciliationPlan`] from two package snapshots and a
//! preference delta. Diffing never fails: version oddities and missing
//! sources degrade to warnings, and the resulting plan always reflects
//! every desired record one way or another.
//!
//! Reconciliation is additive-only. Packages present on the host but not
//! in the descriptor are left alone; uninstalling software a descriptor
//! does not mention would be surprising and destructive.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::gate::CompatibilityResult;
use crate::snapshot::{PackageSnapshot, PackageSource};
use crate::version;

use super::{DiffOptions, DiffStats, ReconcileAction, ReconciliationPlan};

/// Compute the plan that moves `observed` toward `desired`.
///
/// `gate` must be the compatibility result that cleared this attempt;
/// its missing-source set turns affected packages into warned no-ops.
/// Selective filtering happens after diffing, so `stats` counts the full
/// delta regardless of the selection.
pub fn compute_diff(
    desired: &PackageSnapshot,
    observed: &PackageSnapshot,
    prefs_desired: &BTreeMap<String, String>,
    prefs_observed: &BTreeMap<String, String>,
    gate: &CompatibilityResult,
    options: &DiffOptions,
) -> ReconciliationPlan {
    let mut warnings = Vec::new();
    let mut stats = DiffStats::default();

    let observed_index = observed.index();

    // Package delta, in desired order
    let mut package_actions: Vec<ReconcileAction> = Vec::new();
    for record in desired.records() {
        if gate.missing_sources.contains(&record.source) {
            warnings.push(format!(
                "skipping {}: source '{}' unavailable",
                record, record.source
            ));
            stats.noops += 1;
            package_actions.push(ReconcileAction::NoOp(record.clone()));
            continue;
        }

        match observed_index.get(&record.key()) {
            None => {
                stats.installs += 1;
                package_actions.push(ReconcileAction::Install(record.clone()));
            }
            Some(current) => {
                let cmp = version::compare_detailed(&record.version, &current.version);
                if cmp.lexical_fallback {
                    warnings.push(format!(
                        "{}: versions '{}' and '{}' compared lexicographically",
                        record.name, record.version, current.version
                    ));
                }
                match cmp.ordering {
                    Ordering::Greater => {
                        stats.upgrades += 1;
                        package_actions.push(ReconcileAction::Upgrade {
                            from: (*current).clone(),
                            to: record.clone(),
                        });
                    }
                    Ordering::Less => {
                        stats.downgrades += 1;
                        let delta = cmp
                            .delta
                            .map(|d| d.to_string().to_lowercase())
                            .unwrap_or_else(|| "version".to_string());
                        warnings.push(format!(
                            "{}: will downgrade {} -> {} ({} change)",
                            record.name, current.version, record.version, delta
                        ));
                        package_actions.push(ReconcileAction::Downgrade {
                            from: (*current).clone(),
                            to: record.clone(),
                        });
                    }
                    Ordering::Equal => {
                        stats.noops += 1;
                        package_actions.push(ReconcileAction::NoOp(record.clone()));
                    }
                }
            }
        }
    }

    let mut actions = group_by_source(package_actions);

    // Preference delta, over sorted keys; keys the descriptor does not
    // mention are left untouched
    for (key, value) in prefs_desired {
        let current = prefs_observed.get(key);
        if current.map(String::as_str) != Some(value.as_str()) {
            stats.preference_changes += 1;
            actions.push(ReconcileAction::PreferenceChange {
                key: key.clone(),
                from: current.cloned(),
                to: value.clone(),
            });
        }
    }

    // Selective filtering, after counting
    let actions: Vec<ReconcileAction> = actions
        .into_iter()
        .filter(|a| options.selection.includes(a))
        .collect();

    ReconciliationPlan {
        actions,
        gate: gate.clone(),
        warnings,
        stats,
    }
}

/// Cluster package actions by source, sources in first-appearance order,
/// actions within a source in their original order
fn group_by_source(actions: Vec<ReconcileAction>) -> Vec<ReconcileAction> {
    let mut order: Vec<PackageSource> = Vec::new();
    for action in &actions {
        if let Some(source) = action.source() {
            if !order.contains(source) {
                order.push(source.clone());
            }
        }
    }

    let mut grouped = Vec::with_capacity(actions.len());
    for source in &order {
        grouped.extend(
            actions
                .iter()
                .filter(|a| a.source() == Some(source))
                .cloned(),
        );
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PackageRecord;

    fn snapshot(records: &[(&str, &str, PackageSource)]) -> PackageSnapshot {
        PackageSnapshot::from_records(
            records
                .iter()
                .map(|(n, v, s)| PackageRecord::new(*n, *v, s.clone()))
                .collect(),
        )
        .unwrap()
    }

    fn no_prefs() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn diff(desired: &PackageSnapshot, observed: &PackageSnapshot) -> ReconciliationPlan {
        compute_diff(
            desired,
            observed,
            &no_prefs(),
            &no_prefs(),
            &CompatibilityResult::pass(),
            &DiffOptions::default(),
        )
    }

    #[test]
    fn test_empty_inputs_empty_plan() {
        let plan = diff(&PackageSnapshot::empty(), &PackageSnapshot::empty());
        assert!(plan.is_empty());
        assert!(plan.is_in_sync());
        assert_eq!(plan.stats.total_changes(), 0);
    }

    #[test]
    fn test_install_when_absent() {
        // Scenario: desired docker@24.0.7-1 (apt), observed empty
        let desired = snapshot(&[("docker", "24.0.7-1", PackageSource::Apt)]);
        let plan = diff(&desired, &PackageSnapshot::empty());

        assert_eq!(plan.actions.len(), 1);
        assert_eq!(
            plan.actions[0],
            ReconcileAction::Install(PackageRecord::new("docker", "24.0.7-1", PackageSource::Apt))
        );
        assert_eq!(plan.stats.installs, 1);
    }

    #[test]
    fn test_upgrade_when_older() {
        // Scenario: desired numpy@1.24.0 (pip), observed numpy@1.20.0
        let desired = snapshot(&[("numpy", "1.24.0", PackageSource::Pip)]);
        let observed = snapshot(&[("numpy", "1.20.0", PackageSource::Pip)]);
        let plan = diff(&desired, &observed);

        assert_eq!(plan.actions.len(), 1);
        match &plan.actions[0] {
            ReconcileAction::Upgrade { from, to } => {
                assert_eq!(from.version, "1.20.0");
                assert_eq!(to.version, "1.24.0");
            }
            other => panic!("expected Upgrade, got {:?}", other),
        }
        assert_eq!(plan.stats.upgrades, 1);
    }

    #[test]
    fn test_downgrade_is_distinct_and_warned() {
        let desired = snapshot(&[("numpy", "1.20.0", PackageSource::Pip)]);
        let observed = snapshot(&[("numpy", "1.24.0", PackageSource::Pip)]);
        let plan = diff(&desired, &observed);

        assert!(matches!(
            plan.actions[0],
            ReconcileAction::Downgrade { .. }
        ));
        assert_eq!(plan.stats.downgrades, 1);
        assert_eq!(plan.stats.upgrades, 0);
        assert!(plan.warnings.iter().any(|w| w.contains("downgrade")));
    }

    #[test]
    fn test_equal_version_is_noop() {
        let desired = snapshot(&[("curl", "8.5.0", PackageSource::Apt)]);
        let observed = snapshot(&[("curl", "8.5.0", PackageSource::Apt)]);
        let plan = diff(&desired, &observed);

        assert_eq!(
            plan.actions[0],
            ReconcileAction::NoOp(PackageRecord::new("curl", "8.5.0", PackageSource::Apt))
        );
        assert!(plan.is_in_sync());
        assert_eq!(plan.stats.noops, 1);
    }

    #[test]
    fn test_observed_only_packages_left_alone() {
        // Additive-only: nothing in the plan mentions sendmail
        let desired = snapshot(&[("docker", "24.0.7-1", PackageSource::Apt)]);
        let observed = snapshot(&[("sendmail", "8.17.2", PackageSource::Apt)]);
        let plan = diff(&desired, &observed);

        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(plan.actions[0], ReconcileAction::Install(_)));
    }

    #[test]
    fn test_same_name_across_sources_are_independent() {
        let desired = snapshot(&[("requests", "2.31.0", PackageSource::Pip)]);
        let observed = snapshot(&[("requests", "1.0.0", PackageSource::Npm)]);
        let plan = diff(&desired, &observed);

        // pip/requests is absent from the host, so it installs; the npm
        // package with the same name is unrelated
        assert!(matches!(plan.actions[0], ReconcileAction::Install(_)));
    }

    #[test]
    fn test_missing_source_becomes_warned_noop() {
        let desired = snapshot(&[("typescript", "5.3.3", PackageSource::Npm)]);
        let mut gate = CompatibilityResult::pass();
        gate.missing_sources.insert(PackageSource::Npm);

        let plan = compute_diff(
            &desired,
            &PackageSnapshot::empty(),
            &no_prefs(),
            &no_prefs(),
            &gate,
            &DiffOptions::default(),
        );

        assert!(matches!(plan.actions[0], ReconcileAction::NoOp(_)));
        assert_eq!(plan.stats.installs, 0);
        assert!(plan.warnings.iter().any(|w| w.contains("unavailable")));
    }

    #[test]
    fn test_preference_diff() {
        let mut prefs_desired = BTreeMap::new();
        prefs_desired.insert("editor.theme".to_string(), "dark".to_string());
        prefs_desired.insert("shell.prompt".to_string(), "minimal".to_string());
        prefs_desired.insert("unchanged".to_string(), "same".to_string());

        let mut prefs_observed = BTreeMap::new();
        prefs_observed.insert("editor.theme".to_string(), "light".to_string());
        prefs_observed.insert("unchanged".to_string(), "same".to_string());
        prefs_observed.insert("untouched.key".to_string(), "kept".to_string());

        let plan = compute_diff(
            &PackageSnapshot::empty(),
            &PackageSnapshot::empty(),
            &prefs_desired,
            &prefs_observed,
            &CompatibilityResult::pass(),
            &DiffOptions::default(),
        );

        assert_eq!(plan.actions.len(), 2);
        assert_eq!(
            plan.actions[0],
            ReconcileAction::PreferenceChange {
                key: "editor.theme".to_string(),
                from: Some("light".to_string()),
                to: "dark".to_string(),
            }
        );
        assert_eq!(
            plan.actions[1],
            ReconcileAction::PreferenceChange {
                key: "shell.prompt".to_string(),
                from: None,
                to: "minimal".to_string(),
            }
        );
        assert_eq!(plan.stats.preference_changes, 2);
    }

    #[test]
    fn test_selective_packages_only_keeps_stats() {
        let desired = snapshot(&[("docker", "24.0.7-1", PackageSource::Apt)]);
        let mut prefs_desired = BTreeMap::new();
        prefs_desired.insert("editor.theme".to_string(), "dark".to_string());

        let plan = compute_diff(
            &desired,
            &PackageSnapshot::empty(),
            &prefs_desired,
            &no_prefs(),
            &CompatibilityResult::pass(),
            &DiffOptions {
                selection: crate::reconcile::Selection::packages_only(),
            },
        );

        // Preference change filtered out of the plan...
        assert_eq!(plan.actions.len(), 1);
        assert!(plan.actions[0].is_package_action());
        // ...but still counted
        assert_eq!(plan.stats.preference_changes, 1);
        assert_eq!(plan.stats.installs, 1);
    }

    #[test]
    fn test_selective_preferences_only() {
        let desired = snapshot(&[("docker", "24.0.7-1", PackageSource::Apt)]);
        let mut prefs_desired = BTreeMap::new();
        prefs_desired.insert("editor.theme".to_string(), "dark".to_string());

        let plan = compute_diff(
            &desired,
            &PackageSnapshot::empty(),
            &prefs_desired,
            &no_prefs(),
            &CompatibilityResult::pass(),
            &DiffOptions {
                selection: crate::reconcile::Selection::preferences_only(),
            },
        );

        assert_eq!(plan.actions.len(), 1);
        assert!(!plan.actions[0].is_package_action());
        assert_eq!(plan.stats.installs, 1);
    }

    #[test]
    fn test_actions_grouped_by_source() {
        let desired = snapshot(&[
            ("docker", "24.0.7-1", PackageSource::Apt),
            ("numpy", "1.24.0", PackageSource::Pip),
            ("curl", "8.5.0", PackageSource::Apt),
        ]);
        let plan = diff(&desired, &PackageSnapshot::empty());

        let sources: Vec<_> = plan
            .actions
            .iter()
            .filter_map(|a| a.source())
            .cloned()
            .collect();
        assert_eq!(
            sources,
            vec![PackageSource::Apt, PackageSource::Apt, PackageSource::Pip]
        );
        // Within a source, desired order is preserved
        let names: Vec<_> = plan
            .actions
            .iter()
            .filter_map(|a| a.target_record())
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["docker", "curl", "numpy"]);
    }

    #[test]
    fn test_diff_is_deterministic() {
        let desired = snapshot(&[
            ("docker", "24.0.7-1", PackageSource::Apt),
            ("numpy", "1.24.0", PackageSource::Pip),
        ]);
        let observed = snapshot(&[("numpy", "1.20.0", PackageSource::Pip)]);

        let first = diff(&desired, &observed);
        let second = diff(&desired, &observed);
        assert_eq!(first.actions, second.actions);
    }

    #[test]
    fn test_lexicographic_fallback_is_warned() {
        let desired = snapshot(&[("tool", "1.7a", PackageSource::Apt)]);
        let observed = snapshot(&[("tool", "1.8", PackageSource::Apt)]);
        let plan = diff(&desired, &observed);

        assert!(plan
            .warnings
            .iter()
            .any(|w| w.contains("lexicographically")));
    }
}
