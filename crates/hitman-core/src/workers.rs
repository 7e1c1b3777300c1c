use crate::client::Marketplace;
use crate::diagnostics::Diagnostics;
use crate::error::{HitmanError, Result};
use crate::paginate::fetch_all;
use crate::types::{AssignmentStatus, Hit};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which HITs a participation query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitSelector {
    Id(String),
    Group(String),
}

impl HitSelector {
    fn key(&self) -> &'static str {
        match self {
            HitSelector::Id(_) => "HITId",
            HitSelector::Group(_) => "HITGroupId",
        }
    }

    fn value(&self) -> &str {
        match self {
            HitSelector::Id(v) | HitSelector::Group(v) => v,
        }
    }

    fn matches(&self, hit: &Hit) -> bool {
        match self {
            HitSelector::Id(id) => hit.hit_id == *id,
            HitSelector::Group(group) => hit.hit_group_id.as_deref() == Some(group.as_str()),
        }
    }
}

/// One worker's participation in a HIT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerRow {
    pub hit_id: String,
    pub worker_id: String,
    pub assignment_id: String,
    pub status: AssignmentStatus,
    pub submit_time: Option<DateTime<Utc>>,
}

impl WorkerRow {
    /// `MM/DD/YY HH:MM:SS AM`, or empty when the work is not submitted.
    pub fn submitted_display(&self) -> String {
        self.submit_time
            .map(|t| t.format("%D %I:%M:%S %p").to_string())
            .unwrap_or_default()
    }
}

/// Every assignment on the selected HIT(s), in listing order.
pub fn workers_for_hit(
    client: &dyn Marketplace,
    selector: &HitSelector,
    diag: &dyn Diagnostics,
) -> Result<Vec<WorkerRow>> {
    diag.note("Retrieving HITs...");
    let hits: Vec<Hit> = fetch_all(|cursor| client.list_hits(cursor))?
        .into_iter()
        .filter(|h| selector.matches(h))
        .collect();
    if hits.is_empty() {
        return Err(HitmanError::NoMatchingHit {
            key: selector.key(),
            value: selector.value().to_string(),
        });
    }

    let mut rows = Vec::new();
    for hit in &hits {
        diag.note(&format!("Searching Worker IDs for HIT ID `{}`", hit.hit_id));
        let assignments =
            fetch_all(|cursor| client.list_assignments_for_hit(&hit.hit_id, &[], cursor))?;
        rows.extend(assignments.into_iter().map(|a| WorkerRow {
            hit_id: hit.hit_id.clone(),
            worker_id: a.worker_id,
            assignment_id: a.assignment_id,
            status: a.assignment_status,
            submit_time: a.submit_time,
        }));
    }
    tracing::debug!(hits = hits.len(), rows = rows.len(), "participation listed");
    Ok(rows)
}

/// The first assignment by `worker_id` on the selected HIT(s).
pub fn find_worker(
    client: &dyn Marketplace,
    selector: &HitSelector,
    worker_id: &str,
    diag: &dyn Diagnostics,
) -> Result<WorkerRow> {
    workers_for_hit(client, selector, diag)?
        .into_iter()
        .find(|row| row.worker_id == worker_id)
        .ok_or_else(|| HitmanError::WorkerNotFound {
            worker: worker_id.to_string(),
            hit: selector.value().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::fake::FakeMarketplace;
    use crate::types::HitStatus;

    fn marketplace() -> FakeMarketplace {
        FakeMarketplace::new()
            .with_page_size(1)
            .with_hit("H1", "Study", HitStatus::Assignable)
            .with_hit("H2", "Study", HitStatus::Reviewable)
            .with_hit("H3", "Pilot", HitStatus::Reviewable)
            .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
            .with_assignment("H2", "A2", "W2", AssignmentStatus::Approved)
            .with_assignment("H3", "A3", "W3", AssignmentStatus::Submitted)
    }

    #[test]
    fn group_selector_spans_hits() {
        let rows = workers_for_hit(
            &marketplace(),
            &HitSelector::Group("G-Study".into()),
            &RecordingDiagnostics::new(),
        )
        .unwrap();
        let workers: Vec<_> = rows.iter().map(|r| r.worker_id.as_str()).collect();
        assert_eq!(workers, vec!["W1", "W2"]);
        assert_eq!(rows[1].status, AssignmentStatus::Approved);
    }

    #[test]
    fn id_selector_finds_single_hit() {
        let rows = workers_for_hit(
            &marketplace(),
            &HitSelector::Id("H3".into()),
            &RecordingDiagnostics::new(),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].assignment_id, "A3");
        assert_eq!(rows[0].submitted_display(), "09/13/20 12:26:40 PM");
    }

    #[test]
    fn unknown_hit_is_missing_target() {
        let err = workers_for_hit(
            &marketplace(),
            &HitSelector::Id("H9".into()),
            &RecordingDiagnostics::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "could not find a HIT with HITId `H9`");
    }

    #[test]
    fn find_worker_reports_absence() {
        let fake = marketplace();
        let diag = RecordingDiagnostics::new();
        let group = HitSelector::Group("G-Study".into());
        assert_eq!(find_worker(&fake, &group, "W2", &diag).unwrap().hit_id, "H2");
        let err = find_worker(&fake, &group, "W3", &diag).unwrap_err();
        assert!(err.is_missing_target());
    }
}
