use super::Session;
use crate::output::{print_json, print_table};
use hitman_core::client::NewQualificationType;
use hitman_core::qualification::{
    assign_qualification, create_qualification, AssignArgs, GrantAction,
};

// ---------------------------------------------------------------------------
// assign
// ---------------------------------------------------------------------------

pub fn assign(
    session: &Session,
    qualification_type_id: String,
    workers: Vec<String>,
    value: i64,
    send_notification: bool,
) -> anyhow::Result<()> {
    let client = session.client()?;
    let diag = session.diagnostics();

    let args = AssignArgs {
        qualification_type_id,
        workers,
        value,
        send_notification,
    };
    let report = assign_qualification(&client, &args, &*diag)?;

    if session.json {
        return print_json(&report);
    }

    let granted = report
        .outcomes
        .iter()
        .filter(|o| o.action == GrantAction::Granted)
        .count();
    println!(
        "Granted {granted}, updated {}, failed {}.",
        report.outcomes.len() - granted,
        report.failed.len()
    );
    println!(
        "\nWorkers with qualification '{}' ({}):",
        report.qualification_type_id,
        report.holders.len()
    );
    let rows = report
        .holders
        .iter()
        .map(|q| {
            vec![
                q.worker_id.clone(),
                q.integer_value.map(|v| v.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["WORKER", "VALUE"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

pub fn create(
    session: &Session,
    name: String,
    description: String,
    retry_delay_secs: u64,
    auto_granted: bool,
    auto_granted_value: i64,
) -> anyhow::Result<()> {
    let client = session.client()?;
    let diag = session.diagnostics();

    let spec = NewQualificationType {
        name,
        description,
        retry_delay_secs,
        auto_granted,
        auto_granted_value,
    };
    let created = create_qualification(&client, &spec, &*diag)?;

    if session.json {
        return print_json(&created);
    }
    println!("Name:        {}", created.name);
    println!("ID:          {}", created.qualification_type_id);
    println!("Description: {}", created.description);
    println!("Requestable: {}", created.is_requestable);
    Ok(())
}
