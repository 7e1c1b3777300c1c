use crate::client::{Marketplace, NewQualificationType, QualificationGrant};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::paginate::fetch_all;
use crate::types::{Qualification, QualificationType};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantAction {
    Granted,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantOutcome {
    pub worker_id: String,
    pub action: GrantAction,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualificationReport {
    pub qualification_type_id: String,
    pub outcomes: Vec<GrantOutcome>,
    pub failed: Vec<String>,
    /// Holders after the run, as listed by the marketplace.
    pub holders: Vec<Qualification>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignArgs {
    pub qualification_type_id: String,
    pub workers: Vec<String>,
    pub value: i64,
    pub send_notification: bool,
}

pub fn list_holders(
    client: &dyn Marketplace,
    qualification_type_id: &str,
) -> Result<Vec<Qualification>> {
    fetch_all(|cursor| client.list_workers_with_qualification_type(qualification_type_id, cursor))
}

/// Grant a qualification to each worker, or update the score of workers who
/// already hold it. A failure for one worker does not stop the others.
pub fn assign_qualification(
    client: &dyn Marketplace,
    args: &AssignArgs,
    diag: &dyn Diagnostics,
) -> Result<QualificationReport> {
    let qid = args.qualification_type_id.as_str();
    let holders: HashSet<String> = list_holders(client, qid)?
        .into_iter()
        .map(|q| q.worker_id)
        .collect();

    let mut outcomes = Vec::new();
    let mut failed = Vec::new();
    let mut seen = HashSet::new();
    for worker in &args.workers {
        if !seen.insert(worker.as_str()) {
            continue;
        }
        let action = if holders.contains(worker) {
            diag.note(&format!("Updating qualification '{qid}' for worker '{worker}'"));
            GrantAction::Updated
        } else {
            diag.note(&format!("Assigning qualification '{qid}' to worker '{worker}'"));
            GrantAction::Granted
        };
        let grant = QualificationGrant {
            qualification_type_id: qid.to_string(),
            worker_id: worker.clone(),
            value: args.value,
            send_notification: args.send_notification,
        };
        match client.associate_qualification_with_worker(&grant) {
            Ok(()) => {
                tracing::info!(qualification = qid, worker = %worker, ?action, "set");
                outcomes.push(GrantOutcome {
                    worker_id: worker.clone(),
                    action,
                    value: args.value,
                });
            }
            Err(e) => {
                diag.failure(&format!("worker {worker}"), &e);
                failed.push(worker.clone());
            }
        }
    }

    let holders = list_holders(client, qid)?;
    Ok(QualificationReport {
        qualification_type_id: qid.to_string(),
        outcomes,
        failed,
        holders,
    })
}

pub fn create_qualification(
    client: &dyn Marketplace,
    spec: &NewQualificationType,
    diag: &dyn Diagnostics,
) -> Result<QualificationType> {
    diag.note(&format!("Creating qualification '{}'", spec.name));
    let created = client.create_qualification_type(spec)?;
    tracing::info!(
        id = %created.qualification_type_id,
        name = %created.name,
        "qualification type created"
    );
    Ok(created)
}
