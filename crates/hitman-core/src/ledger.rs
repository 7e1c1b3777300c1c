use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// LedgerSet
// ---------------------------------------------------------------------------

/// Named id sets kept in the ledger file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSet {
    CreditedHits,
    CreditedWorkers,
    CreditedAssignments,
    BonusedWorkers,
    BonusedAssignments,
}

impl LedgerSet {
    pub fn all() -> &'static [LedgerSet] {
        &[
            LedgerSet::CreditedHits,
            LedgerSet::CreditedWorkers,
            LedgerSet::CreditedAssignments,
            LedgerSet::BonusedWorkers,
            LedgerSet::BonusedAssignments,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerSet::CreditedHits => "credited_hits",
            LedgerSet::CreditedWorkers => "credited_workers",
            LedgerSet::CreditedAssignments => "credited_assignments",
            LedgerSet::BonusedWorkers => "bonused_workers",
            LedgerSet::BonusedAssignments => "bonused_assignments",
        }
    }
}

impl fmt::Display for LedgerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Grow-only record of ids already acted on, one file per working directory.
///
/// Ids are never removed. [`Ledger::persist`] rewrites the whole file and
/// folds in whatever is already on disk first, so a save can only add ids.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    sets: BTreeMap<LedgerSet, BTreeSet<String>>,
}

impl Ledger {
    /// Load the ledger for `dir`. A missing file is an empty ledger.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = paths::ledger_path(dir);
        let sets = read_sets(&path)?;
        let mut ledger = Self {
            path,
            sets: empty_sets(),
        };
        ledger.merge(sets);
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, set: LedgerSet, id: &str) -> bool {
        self.sets.get(&set).is_some_and(|s| s.contains(id))
    }

    /// Returns `true` if the id was not already recorded.
    pub fn record(&mut self, set: LedgerSet, id: impl Into<String>) -> bool {
        self.sets.entry(set).or_default().insert(id.into())
    }

    pub fn len(&self, set: LedgerSet) -> usize {
        self.sets.get(&set).map_or(0, BTreeSet::len)
    }

    pub fn ids(&self, set: LedgerSet) -> impl Iterator<Item = &str> {
        self.sets.get(&set).into_iter().flatten().map(String::as_str)
    }

    /// Write the union of the on-disk ledger and this one back to disk.
    pub fn persist(&mut self) -> Result<()> {
        let on_disk = read_sets(&self.path)?;
        self.merge(on_disk);
        let data = serde_yaml::to_string(&self.sets)?;
        crate::io::atomic_write(&self.path, data.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "ledger persisted");
        Ok(())
    }

    fn merge(&mut self, other: BTreeMap<LedgerSet, BTreeSet<String>>) {
        for (set, ids) in other {
            self.sets.entry(set).or_default().extend(ids);
        }
    }
}

fn empty_sets() -> BTreeMap<LedgerSet, BTreeSet<String>> {
    LedgerSet::all()
        .iter()
        .map(|s| (*s, BTreeSet::new()))
        .collect()
}

fn read_sets(path: &Path) -> Result<BTreeMap<LedgerSet, BTreeSet<String>>> {
    match crate::io::read_optional(path)? {
        Some(data) if !data.trim().is_empty() => Ok(serde_yaml::from_str(&data)?),
        _ => Ok(BTreeMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::load(dir.path()).unwrap();
        for set in LedgerSet::all() {
            assert_eq!(ledger.len(*set), 0);
        }
        assert!(!ledger.path().exists());
    }

    #[test]
    fn persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(dir.path()).unwrap();
        assert!(ledger.record(LedgerSet::CreditedHits, "H1"));
        assert!(!ledger.record(LedgerSet::CreditedHits, "H1"));
        ledger.record(LedgerSet::BonusedWorkers, "W9");
        ledger.persist().unwrap();

        let reloaded = Ledger::load(dir.path()).unwrap();
        assert!(reloaded.contains(LedgerSet::CreditedHits, "H1"));
        assert!(reloaded.contains(LedgerSet::BonusedWorkers, "W9"));
        assert!(!reloaded.contains(LedgerSet::CreditedWorkers, "W9"));
    }

    #[test]
    fn file_holds_named_sorted_lists() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(dir.path()).unwrap();
        ledger.record(LedgerSet::CreditedAssignments, "b");
        ledger.record(LedgerSet::CreditedAssignments, "a");
        ledger.persist().unwrap();

        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(text.contains("credited_assignments:\n- a\n- b\n"));
        assert!(text.contains("bonused_workers: []"));
    }

    #[test]
    fn persist_never_drops_ids_written_by_another_run() {
        let dir = TempDir::new().unwrap();
        let mut first = Ledger::load(dir.path()).unwrap();
        let mut second = Ledger::load(dir.path()).unwrap();

        first.record(LedgerSet::CreditedHits, "H1");
        first.persist().unwrap();
        second.record(LedgerSet::CreditedHits, "H2");
        second.persist().unwrap();

        let merged = Ledger::load(dir.path()).unwrap();
        assert_eq!(merged.len(LedgerSet::CreditedHits), 2);
    }
}
