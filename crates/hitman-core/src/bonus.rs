use crate::client::{BonusRequest, Marketplace};
use crate::diagnostics::Diagnostics;
use crate::error::{HitmanError, Result};
use crate::ledger::{Ledger, LedgerSet};
use crate::paginate::fetch_all;
use crate::processor::{apply_mutations, select_targets};
use crate::types::{Assignment, Usd};
use serde::Serialize;

pub const DEFAULT_REASON: &str = "Bonus for participating in our experiment";

#[derive(Debug, Clone, PartialEq)]
pub struct BonusArgs {
    pub worker_id: String,
    pub hit_id: String,
    pub amount: Usd,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusReport {
    pub worker_id: String,
    pub hit_id: String,
    pub amount: Usd,
    /// Assignment ids a bonus was paid on during this run.
    pub paid: Vec<String>,
    pub failed: Vec<String>,
    /// True when the ledger showed this worker was bonused before.
    pub already_bonused: bool,
}

/// Token the marketplace uses to reject a second bonus on one assignment.
pub fn bonus_token(assignment_id: &str) -> String {
    format!("hitman-bonus-{assignment_id}")
}

/// Pay `args.worker_id` a bonus on each of their assignments for `args.hit_id`.
///
/// A worker already in the ledger is left alone. An unknown HIT, or a worker
/// with no assignment on it, is an error.
pub fn bonus_worker(
    client: &dyn Marketplace,
    ledger: &mut Ledger,
    args: &BonusArgs,
    diag: &dyn Diagnostics,
) -> Result<BonusReport> {
    client
        .get_hit(&args.hit_id)?
        .ok_or_else(|| HitmanError::HitNotFound(args.hit_id.clone()))?;

    let mut report = BonusReport {
        worker_id: args.worker_id.clone(),
        hit_id: args.hit_id.clone(),
        amount: args.amount,
        paid: Vec::new(),
        failed: Vec::new(),
        already_bonused: false,
    };

    if ledger.contains(LedgerSet::BonusedWorkers, &args.worker_id) {
        diag.note(&format!("Worker {} was already bonused", args.worker_id));
        report.already_bonused = true;
        return Ok(report);
    }

    let assignments =
        fetch_all(|cursor| client.list_assignments_for_hit(&args.hit_id, &[], cursor))?;
    let mine: Vec<Assignment> = assignments
        .into_iter()
        .filter(|a| a.worker_id == args.worker_id)
        .collect();
    if mine.is_empty() {
        return Err(HitmanError::WorkerNotFound {
            worker: args.worker_id.clone(),
            hit: args.hit_id.clone(),
        });
    }

    let targets = select_targets(&mine, ledger, LedgerSet::BonusedAssignments, |a| {
        a.assignment_id.as_str()
    });
    let applied = apply_mutations(
        targets,
        ledger,
        LedgerSet::BonusedAssignments,
        |a| a.assignment_id.as_str(),
        |a| format!("bonus on assignment {}", a.assignment_id),
        |a| {
            diag.note(&format!(
                "\tBonusing worker {} on assignment {} with ${}",
                a.worker_id, a.assignment_id, args.amount
            ));
            client.send_bonus(&BonusRequest {
                worker_id: a.worker_id.clone(),
                assignment_id: a.assignment_id.clone(),
                amount: args.amount,
                reason: args.reason.clone(),
                unique_request_token: bonus_token(&a.assignment_id),
            })
        },
        diag,
    );

    if applied.all_succeeded() {
        ledger.record(LedgerSet::BonusedWorkers, args.worker_id.as_str());
    }
    ledger.persist()?;
    tracing::info!(
        worker = %args.worker_id,
        hit = %args.hit_id,
        paid = applied.done.len(),
        failed = applied.failed.len(),
        "bonus run finished"
    );

    report.paid = applied.done.iter().map(|a| a.assignment_id.clone()).collect();
    report.failed = applied
        .failed
        .iter()
        .map(|a| a.assignment_id.clone())
        .collect();
    Ok(report)
}
