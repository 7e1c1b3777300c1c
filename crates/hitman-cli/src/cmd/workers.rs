use super::Session;
use crate::output::{print_json, print_table};
use hitman_core::workers::{find_worker, workers_for_hit, HitSelector, WorkerRow};

pub fn run(
    session: &Session,
    hit: Option<String>,
    hit_group: Option<String>,
    worker: Option<&str>,
) -> anyhow::Result<()> {
    let selector = match (hit, hit_group) {
        (Some(id), None) => HitSelector::Id(id),
        (None, Some(group)) => HitSelector::Group(group),
        _ => anyhow::bail!("pass exactly one of --hit or --hit-group"),
    };
    let client = session.client()?;
    let diag = session.diagnostics();

    let rows = match worker {
        Some(worker_id) => vec![find_worker(&client, &selector, worker_id, &*diag)?],
        None => workers_for_hit(&client, &selector, &*diag)?,
    };

    if session.json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No workers yet.");
        return Ok(());
    }
    print_table(
        &["HIT", "WORKER", "ASSIGNMENT", "STATUS", "SUBMITTED"],
        rows.iter().map(row_cells).collect(),
    );
    Ok(())
}

fn row_cells(row: &WorkerRow) -> Vec<String> {
    vec![
        row.hit_id.clone(),
        row.worker_id.clone(),
        row.assignment_id.clone(),
        row.status.to_string(),
        row.submitted_display(),
    ]
}
