//! Regeneration decision for one package.
//!
//! The previously generated registry file records, for every class, the
//! modification time its declaration had when it was last generated. Comparing
//! that snapshot with a fresh discovery decides whether the package needs
//! regenerating. The decision is per package: when anything changed, every
//! generated file of the package is rewritten.

use crate::codegen::discovery::ClassCore;
use crate::schema::ClassEntry;
use serde::Serialize;

/// Class entries read back from a generated registry file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub entries: Vec<ClassEntry>,
}

impl RegistrySnapshot {
    pub fn new(entries: Vec<ClassEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str, module: &str) -> Option<&ClassEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.module == module)
    }
}

/// Why a package does or does not need regenerating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegenDecision {
    pub forced: bool,
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl RegenDecision {
    pub fn needs_regen(&self) -> bool {
        self.forced || !self.added.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// One-line summary for progress output
    pub fn summary(&self) -> String {
        if !self.needs_regen() {
            return "up to date".to_string();
        }
        let mut parts = Vec::new();
        if self.forced {
            parts.push("forced".to_string());
        }
        for (label, names) in [
            ("added", &self.added),
            ("changed", &self.changed),
            ("removed", &self.removed),
        ] {
            if !names.is_empty() {
                parts.push(format!("{}: {}", label, names.join(", ")));
            }
        }
        parts.join("; ")
    }
}

/// Compare a fresh discovery of `module` with its registry snapshot
pub fn decide(
    discovered: &[ClassCore],
    module: &str,
    snapshot: &RegistrySnapshot,
    force: bool,
) -> RegenDecision {
    let mut decision = RegenDecision {
        forced: force,
        ..RegenDecision::default()
    };

    for core in discovered {
        match snapshot.get(&core.name, module) {
            None => decision.added.push(core.name.clone()),
            Some(entry) if core.modified_ms > entry.modified_ms => {
                decision.changed.push(core.name.clone())
            }
            Some(_) => {}
        }
    }

    for entry in snapshot.entries.iter().filter(|e| e.module == module) {
        if !discovered.iter().any(|c| c.name == entry.name) {
            decision.removed.push(entry.name.clone());
        }
    }

    tracing::debug!("Package {}: {}", module, decision.summary());
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::discovery::ClassKind;
    use std::path::PathBuf;

    fn core(name: &str, modified_ms: u64) -> ClassCore {
        ClassCore {
            name: name.to_string(),
            modified_ms,
            path: PathBuf::from(format!("model/{}_bo.rs", name.to_lowercase())),
            kind: ClassKind::Concrete,
        }
    }

    fn snapshot(entries: &[(&str, &str, u64)]) -> RegistrySnapshot {
        RegistrySnapshot::new(
            entries
                .iter()
                .map(|(name, module, ms)| ClassEntry::new(name, module, *ms))
                .collect(),
        )
    }

    #[test]
    fn test_unchanged_package_needs_nothing() {
        let snap = snapshot(&[("Widget", "model", 100), ("User", "model", 90)]);
        let decision = decide(&[core("Widget", 100), core("User", 90)], "model", &snap, false);
        assert!(!decision.needs_regen());
        assert_eq!(decision.summary(), "up to date");
    }

    #[test]
    fn test_added_changed_removed() {
        let snap = snapshot(&[("Widget", "model", 100), ("Gone", "model", 1)]);
        let decision = decide(&[core("Widget", 101), core("User", 5)], "model", &snap, false);
        assert_eq!(decision.added, vec!["User"]);
        assert_eq!(decision.changed, vec!["Widget"]);
        assert_eq!(decision.removed, vec!["Gone"]);
        assert!(decision.needs_regen());
    }

    #[test]
    fn test_older_mtime_is_not_a_change() {
        let snap = snapshot(&[("Widget", "model", 100)]);
        assert!(!decide(&[core("Widget", 99)], "model", &snap, false).needs_regen());
    }

    #[test]
    fn test_other_modules_are_ignored() {
        let snap = snapshot(&[("Widget", "model", 100), ("Invoice", "billing", 1)]);
        let decision = decide(&[core("Widget", 100)], "model", &snap, false);
        assert!(decision.removed.is_empty());
        assert!(!decision.needs_regen());
    }

    #[test]
    fn test_force_and_missing_registry() {
        let decision = decide(&[core("Widget", 100)], "model", &RegistrySnapshot::default(), false);
        assert_eq!(decision.added, vec!["Widget"]);

        let snap = snapshot(&[("Widget", "model", 100)]);
        let forced = decide(&[core("Widget", 100)], "model", &snap, true);
        assert!(forced.needs_regen());
        assert_eq!(forced.summary(), "forced");
    }
}
