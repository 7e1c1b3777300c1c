use crate::client::Marketplace;
use crate::diagnostics::Diagnostics;
use crate::error::{HitmanError, Result};
use crate::ledger::{Ledger, LedgerSet};
use crate::paginate::fetch_all;
use crate::processor::{apply_mutations, select_targets};
use crate::types::{AssignmentStatus, Hit, HitStatus};
use serde::Serialize;

pub const DEFAULT_FEEDBACK: &str = "Thank you for completing our experiment!";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditedAssignment {
    pub assignment_id: String,
    pub worker_id: String,
}

/// What happened to one HIT during a crediting run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitCredit {
    pub hit_id: String,
    pub title: String,
    pub approved: Vec<CreditedAssignment>,
    /// Assignment ids whose approval failed; retried on the next run.
    pub failed: Vec<String>,
    /// Assignments skipped because the ledger already had them.
    pub already_credited: usize,
    /// True once the HIT itself is in the ledger.
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApproveReport {
    pub title: Option<String>,
    pub hits: Vec<HitCredit>,
    /// Matching HITs skipped because they were credited on an earlier run.
    pub skipped_hits: Vec<String>,
}

impl ApproveReport {
    pub fn approved_count(&self) -> usize {
        self.hits.iter().map(|h| h.approved.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.hits.iter().map(|h| h.failed.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Approve submitted work on every reviewable HIT titled `title` that the
/// ledger has not seen. The ledger is saved after each HIT.
pub fn approve_by_title(
    client: &dyn Marketplace,
    ledger: &mut Ledger,
    title: &str,
    feedback: &str,
    diag: &dyn Diagnostics,
) -> Result<ApproveReport> {
    diag.note("Retrieving reviewable HITs...");
    let hits = fetch_all(|cursor| client.list_reviewable_hits(cursor))?;
    let matching: Vec<Hit> = hits.into_iter().filter(|h| h.title == title).collect();
    tracing::info!(title, matching = matching.len(), "reviewable HITs listed");

    let mut report = ApproveReport {
        title: Some(title.to_string()),
        ..Default::default()
    };
    let (fresh, seen): (Vec<&Hit>, Vec<&Hit>) = matching
        .iter()
        .partition(|h| !ledger.contains(LedgerSet::CreditedHits, &h.hit_id));
    report.skipped_hits = seen.iter().map(|h| h.hit_id.clone()).collect();

    for hit in fresh {
        if let Some(credit) = credit_hit(client, ledger, hit, feedback, diag)? {
            report.hits.push(credit);
        }
    }
    Ok(report)
}

/// Approve submitted work on a single HIT. An unknown HIT id is an error.
pub fn approve_hit(
    client: &dyn Marketplace,
    ledger: &mut Ledger,
    hit_id: &str,
    feedback: &str,
    diag: &dyn Diagnostics,
) -> Result<ApproveReport> {
    let hit = client
        .get_hit(hit_id)?
        .ok_or_else(|| HitmanError::HitNotFound(hit_id.to_string()))?;

    let mut report = ApproveReport::default();
    if ledger.contains(LedgerSet::CreditedHits, &hit.hit_id) {
        diag.note(&format!("HIT {} was already credited", hit.hit_id));
        report.skipped_hits.push(hit.hit_id);
        return Ok(report);
    }
    if hit.status != Some(HitStatus::Reviewable) {
        tracing::warn!(hit = %hit.hit_id, status = ?hit.status, "HIT is not reviewable");
        diag.note(&format!(
            "Warning: HIT {} is not reviewable; work submitted after this run will not be approved",
            hit.hit_id
        ));
    }
    if let Some(credit) = credit_hit(client, ledger, &hit, feedback, diag)? {
        report.hits.push(credit);
    }
    Ok(report)
}

/// Approve every submitted assignment of `hit` not yet in the ledger.
///
/// Returns `None` if the assignments could not be listed; that failure is
/// reported to `diag` and the HIT is left for the next run. Only ledger
/// write failures are returned as errors.
fn credit_hit(
    client: &dyn Marketplace,
    ledger: &mut Ledger,
    hit: &Hit,
    feedback: &str,
    diag: &dyn Diagnostics,
) -> Result<Option<HitCredit>> {
    diag.note(&format!(
        "Collecting workers for HIT {}, title: `{}`",
        hit.hit_id, hit.title
    ));

    let listed = fetch_all(|cursor| {
        client.list_assignments_for_hit(&hit.hit_id, &[AssignmentStatus::Submitted], cursor)
    });
    let assignments = match listed {
        Ok(a) => a,
        Err(e) => {
            diag.failure(&format!("HIT {}", hit.hit_id), &e);
            return Ok(None);
        }
    };

    let targets = select_targets(&assignments, ledger, LedgerSet::CreditedAssignments, |a| {
        a.assignment_id.as_str()
    });
    let already_credited = assignments.len() - targets.len();

    let applied = apply_mutations(
        targets,
        ledger,
        LedgerSet::CreditedAssignments,
        |a| a.assignment_id.as_str(),
        |a| format!("assignment {}", a.assignment_id),
        |a| {
            diag.note(&format!(
                "\tCrediting worker {} on assignment {}",
                a.worker_id, a.assignment_id
            ));
            client.approve_assignment(&a.assignment_id, feedback)
        },
        diag,
    );

    for a in &applied.done {
        ledger.record(LedgerSet::CreditedWorkers, a.worker_id.as_str());
    }
    let complete = applied.all_succeeded();
    if complete {
        ledger.record(LedgerSet::CreditedHits, hit.hit_id.as_str());
    }
    ledger.persist()?;
    tracing::info!(
        hit = %hit.hit_id,
        approved = applied.done.len(),
        failed = applied.failed.len(),
        "HIT credited"
    );

    Ok(Some(HitCredit {
        hit_id: hit.hit_id.clone(),
        title: hit.title.clone(),
        approved: applied
            .done
            .iter()
            .map(|a| CreditedAssignment {
                assignment_id: a.assignment_id.clone(),
                worker_id: a.worker_id.clone(),
            })
            .collect(),
        failed: applied
            .failed
            .iter()
            .map(|a| a.assignment_id.clone())
            .collect(),
        already_credited,
        complete,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BonusRequest, NewQualificationType, QualificationGrant};
    use crate::diagnostics::RecordingDiagnostics;
    use crate::fake::{Call, FakeMarketplace};
    use crate::types::{Assignment, Page, Qualification, QualificationType};
    use tempfile::TempDir;

    /// One reviewable HIT titled "Study" with `n` submitted assignments.
    fn study_with_assignments(n: usize) -> FakeMarketplace {
        (0..n).fold(
            FakeMarketplace::new()
                .with_page_size(10)
                .with_hit("H1", "Study", HitStatus::Reviewable),
            |fake, i| {
                let (a, w) = (format!("A{i:02}"), format!("W{i:02}"));
                fake.with_assignment("H1", &a, &w, AssignmentStatus::Submitted)
            },
        )
    }

    #[test]
    fn twelve_assignments_over_two_pages_are_approved_once() {
        let dir = TempDir::new().unwrap();
        let diag = RecordingDiagnostics::new();

        let fake = study_with_assignments(12);
        let mut ledger = Ledger::load(dir.path()).unwrap();
        let report =
            approve_by_title(&fake, &mut ledger, "Study", DEFAULT_FEEDBACK, &diag).unwrap();
        assert_eq!(fake.approvals().len(), 12);
        assert_eq!(report.approved_count(), 12);
        assert_eq!(ledger.len(LedgerSet::CreditedAssignments), 12);
        assert_eq!(ledger.len(LedgerSet::CreditedWorkers), 12);
        assert!(ledger.contains(LedgerSet::CreditedHits, "H1"));

        // Same remote state, fresh process: nothing more is approved.
        let unchanged = study_with_assignments(12);
        let mut reloaded = Ledger::load(dir.path()).unwrap();
        let second =
            approve_by_title(&unchanged, &mut reloaded, "Study", DEFAULT_FEEDBACK, &diag).unwrap();
        assert!(unchanged.approvals().is_empty());
        assert_eq!(second.approved_count(), 0);
        assert_eq!(second.skipped_hits, vec!["H1"]);
        assert_eq!(reloaded.len(LedgerSet::CreditedAssignments), 12);
    }

    #[test]
    fn only_matching_titles_are_credited() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMarketplace::new()
            .with_hit("H1", "Study", HitStatus::Reviewable)
            .with_hit("H2", "Other", HitStatus::Reviewable)
            .with_hit("H3", "Study", HitStatus::Assignable)
            .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
            .with_assignment("H2", "A2", "W2", AssignmentStatus::Submitted)
            .with_assignment("H3", "A3", "W3", AssignmentStatus::Submitted);
        let mut ledger = Ledger::load(dir.path()).unwrap();

        approve_by_title(&fake, &mut ledger, "Study", "thanks", &RecordingDiagnostics::new())
            .unwrap();

        assert_eq!(
            fake.calls(),
            vec![Call::Approve {
                assignment_id: "A1".into(),
                feedback: "thanks".into()
            }]
        );
    }

    #[test]
    fn failed_approval_leaves_hit_open_for_retry() {
        let dir = TempDir::new().unwrap();
        let diag = RecordingDiagnostics::new();
        let fake = FakeMarketplace::new()
            .with_hit("H1", "Study", HitStatus::Reviewable)
            .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
            .with_assignment("H1", "A2", "W2", AssignmentStatus::Submitted)
            .with_assignment("H1", "A3", "W3", AssignmentStatus::Submitted)
            .fail_on("A2");
        let mut ledger = Ledger::load(dir.path()).unwrap();

        let report = approve_by_title(&fake, &mut ledger, "Study", "thanks", &diag).unwrap();
        assert_eq!(fake.approvals(), vec!["A1", "A3"]);
        assert_eq!(report.hits[0].failed, vec!["A2"]);
        assert!(!report.hits[0].complete);
        assert!(!ledger.contains(LedgerSet::CreditedHits, "H1"));
        assert_eq!(diag.failures().len(), 1);

        // Retry against a marketplace that now accepts A2: only A2 is sent.
        let retry = FakeMarketplace::new()
            .with_hit("H1", "Study", HitStatus::Reviewable)
            .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
            .with_assignment("H1", "A2", "W2", AssignmentStatus::Submitted)
            .with_assignment("H1", "A3", "W3", AssignmentStatus::Submitted);
        let mut reloaded = Ledger::load(dir.path()).unwrap();
        let report = approve_by_title(&retry, &mut reloaded, "Study", "thanks", &diag).unwrap();
        assert_eq!(retry.approvals(), vec!["A2"]);
        assert_eq!(report.hits[0].already_credited, 2);
        assert!(reloaded.contains(LedgerSet::CreditedHits, "H1"));
    }

    #[test]
    fn listing_failure_skips_hit_and_continues() {
        let dir = TempDir::new().unwrap();
        let diag = RecordingDiagnostics::new();
        let fake = FakeMarketplace::new()
            .with_hit("H1", "Study", HitStatus::Reviewable)
            .with_hit("H2", "Study", HitStatus::Reviewable)
            .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
            .with_assignment("H2", "A2", "W2", AssignmentStatus::Submitted)
            .fail_on("H1");
        let mut ledger = Ledger::load(dir.path()).unwrap();

        approve_by_title(&fake, &mut ledger, "Study", "thanks", &diag).unwrap();
        assert_eq!(fake.approvals(), vec!["A2"]);
        assert_eq!(diag.failures()[0].0, "HIT H1");
        assert!(!ledger.contains(LedgerSet::CreditedHits, "H1"));
    }

    #[test]
    fn no_reviewable_hits_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMarketplace::new();
        let mut ledger = Ledger::load(dir.path()).unwrap();
        let report = approve_by_title(
            &fake,
            &mut ledger,
            "Study",
            "thanks",
            &RecordingDiagnostics::new(),
        )
        .unwrap();
        assert!(report.hits.is_empty());
        assert!(!ledger.path().exists());
    }

    #[test]
    fn approve_hit_unknown_id_is_fatal() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMarketplace::new();
        let mut ledger = Ledger::load(dir.path()).unwrap();
        let err = approve_hit(&fake, &mut ledger, "NOPE", "thanks", &RecordingDiagnostics::new())
            .unwrap_err();
        assert!(matches!(&err, HitmanError::HitNotFound(id) if id == "NOPE"));
        assert!(err.is_missing_target());
    }

    #[test]
    fn approve_hit_credits_regardless_of_review_status() {
        let dir = TempDir::new().unwrap();
        let fake = FakeMarketplace::new()
            .with_hit("H9", "Anything", HitStatus::Assignable)
            .with_assignment("H9", "A1", "W1", AssignmentStatus::Submitted)
            .with_assignment("H9", "A2", "W2", AssignmentStatus::Approved);
        let mut ledger = Ledger::load(dir.path()).unwrap();
        let diag = RecordingDiagnostics::new();

        let report = approve_hit(&fake, &mut ledger, "H9", "thanks", &diag).unwrap();
        assert_eq!(fake.approvals(), vec!["A1"]);
        assert!(report.hits[0].complete);
        assert!(diag.notes()[0].contains("HIT H9 is not reviewable"));

        let again = approve_hit(&fake, &mut ledger, "H9", "thanks", &diag).unwrap();
        assert_eq!(again.skipped_hits, vec!["H9"]);
        assert_eq!(fake.approvals().len(), 1);
    }

    /// Reads the ledger file when a chosen assignment is approved.
    struct LedgerSnapshot<'a> {
        inner: FakeMarketplace,
        ledger_path: &'a std::path::Path,
        watch: &'a str,
        seen: std::cell::RefCell<Option<String>>,
    }

    impl Marketplace for LedgerSnapshot<'_> {
        fn list_reviewable_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>> {
            self.inner.list_reviewable_hits(cursor)
        }

        fn list_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>> {
            self.inner.list_hits(cursor)
        }

        fn get_hit(&self, hit_id: &str) -> Result<Option<Hit>> {
            self.inner.get_hit(hit_id)
        }

        fn list_assignments_for_hit(
            &self,
            hit_id: &str,
            statuses: &[AssignmentStatus],
            cursor: Option<&str>,
        ) -> Result<Page<Assignment>> {
            self.inner.list_assignments_for_hit(hit_id, statuses, cursor)
        }

        fn approve_assignment(&self, assignment_id: &str, feedback: &str) -> Result<()> {
            if assignment_id == self.watch {
                *self.seen.borrow_mut() = std::fs::read_to_string(self.ledger_path).ok();
            }
            self.inner.approve_assignment(assignment_id, feedback)
        }

        fn send_bonus(&self, bonus: &BonusRequest) -> Result<()> {
            self.inner.send_bonus(bonus)
        }

        fn list_workers_with_qualification_type(
            &self,
            qualification_type_id: &str,
            cursor: Option<&str>,
        ) -> Result<Page<Qualification>> {
            self.inner
                .list_workers_with_qualification_type(qualification_type_id, cursor)
        }

        fn associate_qualification_with_worker(&self, grant: &QualificationGrant) -> Result<()> {
            self.inner.associate_qualification_with_worker(grant)
        }

        fn create_qualification_type(
            &self,
            spec: &NewQualificationType,
        ) -> Result<QualificationType> {
            self.inner.create_qualification_type(spec)
        }
    }

    #[test]
    fn ledger_is_on_disk_before_next_hit_starts() {
        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::load(dir.path()).unwrap();
        let path = ledger.path().to_path_buf();
        let market = LedgerSnapshot {
            inner: FakeMarketplace::new()
                .with_hit("H1", "Study", HitStatus::Reviewable)
                .with_hit("H2", "Study", HitStatus::Reviewable)
                .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
                .with_assignment("H1", "A2", "W2", AssignmentStatus::Submitted)
                .with_assignment("H2", "A3", "W3", AssignmentStatus::Submitted),
            ledger_path: &path,
            watch: "A3",
            seen: std::cell::RefCell::new(None),
        };

        approve_by_title(&market, &mut ledger, "Study", "thanks", &RecordingDiagnostics::new())
            .unwrap();

        let snapshot = market.seen.borrow().clone().expect("ledger written before H2");
        let sets: std::collections::BTreeMap<String, Vec<String>> =
            serde_yaml::from_str(&snapshot).unwrap();
        assert_eq!(sets["credited_hits"], vec!["H1"]);
        assert_eq!(sets["credited_assignments"], vec!["A1", "A2"]);
        assert!(sets["credited_workers"].contains(&"W2".to_string()));
        assert!(ledger.contains(LedgerSet::CreditedHits, "H2"));
    }
}
