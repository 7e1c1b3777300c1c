use super::Session;
use crate::output::{print_json, print_table};
use anyhow::Context;
use hitman_core::approve::{approve_by_title, approve_hit, ApproveReport};
use hitman_core::config::resolve_title;
use hitman_core::ledger::Ledger;

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn run_title(session: &Session, title: Option<&str>, feedback: &str) -> anyhow::Result<()> {
    let title = resolve_title(title, &session.dir)?;
    let client = session.client()?;
    let mut ledger = Ledger::load(&session.dir).context("failed to load ledger")?;
    let diag = session.diagnostics();

    let report = approve_by_title(&client, &mut ledger, &title, feedback, &*diag)?;
    print_report(&report, session.json)
}

pub fn run_hit(session: &Session, hit_id: &str, feedback: &str) -> anyhow::Result<()> {
    let client = session.client()?;
    let mut ledger = Ledger::load(&session.dir).context("failed to load ledger")?;
    let diag = session.diagnostics();

    let report = approve_hit(&client, &mut ledger, hit_id, feedback, &*diag)?;
    print_report(&report, session.json)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(report: &ApproveReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }

    for hit_id in &report.skipped_hits {
        println!("HIT {hit_id} already credited, skipping.");
    }
    if report.hits.is_empty() {
        match &report.title {
            Some(title) if report.skipped_hits.is_empty() => {
                println!("No reviewable HITs titled '{title}'.")
            }
            _ => println!("Nothing to approve."),
        }
        return Ok(());
    }

    println!();
    let rows = report
        .hits
        .iter()
        .map(|h| {
            vec![
                h.hit_id.clone(),
                h.approved.len().to_string(),
                h.already_credited.to_string(),
                h.failed.len().to_string(),
                if h.complete { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["HIT", "APPROVED", "SKIPPED", "FAILED", "DONE"], rows);
    println!(
        "\nApproved {} assignment(s), {} failed.",
        report.approved_count(),
        report.failed_count()
    );
    if report.failed_count() > 0 {
        println!("Run again to retry the failed assignments.");
    }
    Ok(())
}
