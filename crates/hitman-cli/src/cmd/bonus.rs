use super::Session;
use crate::output::print_json;
use anyhow::Context;
use hitman_core::bonus::{bonus_worker, BonusArgs};
use hitman_core::ledger::Ledger;
use hitman_core::types::Usd;

pub fn run(
    session: &Session,
    worker_id: String,
    hit_id: String,
    amount: &str,
    reason: String,
) -> anyhow::Result<()> {
    let amount: Usd = amount.parse()?;
    let client = session.client()?;
    let mut ledger = Ledger::load(&session.dir).context("failed to load ledger")?;
    let diag = session.diagnostics();

    let args = BonusArgs {
        worker_id,
        hit_id,
        amount,
        reason,
    };
    let report = bonus_worker(&client, &mut ledger, &args, &*diag)?;

    if session.json {
        return print_json(&report);
    }
    if report.already_bonused {
        println!("No bonus sent.");
        return Ok(());
    }
    println!(
        "Paid ${} to {} on {} assignment(s) of HIT {}.",
        report.amount,
        report.worker_id,
        report.paid.len(),
        report.hit_id
    );
    if !report.failed.is_empty() {
        println!(
            "{} payment(s) failed: {}. Run again to retry.",
            report.failed.len(),
            report.failed.join(", ")
        );
    }
    Ok(())
}
