//! Select-then-mutate over remote records, keyed against the ledger.
//!
//! Every verb that changes remote state goes through the same two steps:
//! [`select_targets`] drops records whose key is already in the ledger, and
//! [`apply_mutations`] runs the remote call for each remaining record,
//! recording the key on success and reporting failures without stopping.
//! Callers persist the ledger once their top-level record is done.

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::ledger::{Ledger, LedgerSet};

/// Records whose key is absent from `set`, in their original order.
pub fn select_targets<'a, T, K>(
    records: &'a [T],
    ledger: &Ledger,
    set: LedgerSet,
    key: K,
) -> Vec<&'a T>
where
    K: Fn(&T) -> &str,
{
    records
        .iter()
        .filter(|record| !ledger.contains(set, key(*record)))
        .collect()
}

/// Result of [`apply_mutations`], split by outcome.
#[derive(Debug)]
pub struct Applied<'a, T> {
    pub done: Vec<&'a T>,
    pub failed: Vec<&'a T>,
}

impl<T> Applied<'_, T> {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run `mutate` on each target. Successful keys are recorded in `set`;
/// failures go to `diag` and are left out of the ledger for the next run.
pub fn apply_mutations<'a, T, K, D, M>(
    targets: Vec<&'a T>,
    ledger: &mut Ledger,
    set: LedgerSet,
    key: K,
    describe: D,
    mut mutate: M,
    diag: &dyn Diagnostics,
) -> Applied<'a, T>
where
    K: Fn(&T) -> &str,
    D: Fn(&T) -> String,
    M: FnMut(&T) -> Result<()>,
{
    let mut applied = Applied {
        done: Vec::with_capacity(targets.len()),
        failed: Vec::new(),
    };
    for record in targets {
        match mutate(record) {
            Ok(()) => {
                ledger.record(set, key(record));
                applied.done.push(record);
            }
            Err(e) => {
                diag.failure(&describe(record), &e);
                applied.failed.push(record);
            }
        }
    }
    applied
}
