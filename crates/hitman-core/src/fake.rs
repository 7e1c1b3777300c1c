use crate::client::{BonusRequest, Marketplace, NewQualificationType, QualificationGrant};
use crate::error::{HitmanError, Result};
use crate::types::{
    Assignment, AssignmentStatus, Hit, HitStatus, Page, Qualification, QualificationStatus,
    QualificationType,
};
use std::cell::RefCell;
use std::collections::HashSet;

/// A mutating call received by [`FakeMarketplace`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Approve {
        assignment_id: String,
        feedback: String,
    },
    Bonus(BonusRequest),
    Associate(QualificationGrant),
    CreateQualificationType(NewQualificationType),
}

#[derive(Debug, Default)]
struct State {
    hits: Vec<Hit>,
    assignments: Vec<Assignment>,
    qualifications: Vec<Qualification>,
    qualification_types: Vec<QualificationType>,
    calls: Vec<Call>,
}

/// In-memory marketplace for exercising verbs without the live service.
///
/// Listings are served in pages of `page_size` with the same cursor
/// convention as the real API. Ids passed to [`FakeMarketplace::fail_on`]
/// make every call that targets them fail.
#[derive(Debug)]
pub struct FakeMarketplace {
    page_size: usize,
    state: RefCell<State>,
    failing: HashSet<String>,
}

impl Default for FakeMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMarketplace {
    pub fn new() -> Self {
        Self {
            page_size: 100,
            state: RefCell::new(State::default()),
            failing: HashSet::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn fail_on(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    pub fn with_hit(self, hit_id: &str, title: &str, status: HitStatus) -> Self {
        self.state.borrow_mut().hits.push(Hit {
            hit_id: hit_id.to_string(),
            hit_group_id: Some(format!("G-{title}")),
            title: title.to_string(),
            status: Some(status),
            max_assignments: Some(9),
            reward: Some("1.00".to_string()),
            creation_time: None,
        });
        self
    }

    pub fn with_assignment(
        self,
        hit_id: &str,
        assignment_id: &str,
        worker_id: &str,
        status: AssignmentStatus,
    ) -> Self {
        self.state.borrow_mut().assignments.push(Assignment {
            assignment_id: assignment_id.to_string(),
            worker_id: worker_id.to_string(),
            hit_id: hit_id.to_string(),
            assignment_status: status,
            accept_time: None,
            submit_time: chrono::DateTime::from_timestamp(1_600_000_000, 0),
        });
        self
    }

    pub fn with_qualification(
        self,
        qualification_type_id: &str,
        worker_id: &str,
        value: i64,
    ) -> Self {
        self.state.borrow_mut().qualifications.push(Qualification {
            qualification_type_id: qualification_type_id.to_string(),
            worker_id: worker_id.to_string(),
            integer_value: Some(value),
            status: Some(QualificationStatus::Granted),
            grant_time: None,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn approvals(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Approve { assignment_id, .. } => Some(assignment_id),
                _ => None,
            })
            .collect()
    }

    pub fn bonuses(&self) -> Vec<BonusRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Bonus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn qualifications(&self) -> Vec<Qualification> {
        self.state.borrow().qualifications.clone()
    }

    fn check(&self, ids: &[&str]) -> Result<()> {
        match ids.iter().find(|id| self.failing.contains(**id)) {
            Some(id) => Err(HitmanError::Remote {
                kind: "ServiceFault".to_string(),
                code: None,
                message: format!("injected failure for {id}"),
            }),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: Vec<T>, cursor: Option<&str>) -> Result<Page<T>> {
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| HitmanError::Protocol(format!("bad cursor {c}")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        let next = (end < items.len()).then(|| end.to_string());
        Ok(Page::new(slice, next))
    }
}

impl Marketplace for FakeMarketplace {
    fn list_reviewable_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>> {
        let hits: Vec<Hit> = self
            .state
            .borrow()
            .hits
            .iter()
            .filter(|h| h.status == Some(HitStatus::Reviewable))
            .cloned()
            .collect();
        self.page(hits, cursor)
    }

    fn list_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>> {
        let hits = self.state.borrow().hits.clone();
        self.page(hits, cursor)
    }

    fn get_hit(&self, hit_id: &str) -> Result<Option<Hit>> {
        self.check(&[hit_id])?;
        Ok(self
            .state
            .borrow()
            .hits
            .iter()
            .find(|h| h.hit_id == hit_id)
            .cloned())
    }

    fn list_assignments_for_hit(
        &self,
        hit_id: &str,
        statuses: &[AssignmentStatus],
        cursor: Option<&str>,
    ) -> Result<Page<Assignment>> {
        self.check(&[hit_id])?;
        let assignments: Vec<Assignment> = self
            .state
            .borrow()
            .assignments
            .iter()
            .filter(|a| a.hit_id == hit_id)
            .filter(|a| statuses.is_empty() || statuses.contains(&a.assignment_status))
            .cloned()
            .collect();
        self.page(assignments, cursor)
    }

    fn approve_assignment(&self, assignment_id: &str, feedback: &str) -> Result<()> {
        self.check(&[assignment_id])?;
        let mut state = self.state.borrow_mut();
        let assignment = state
            .assignments
            .iter_mut()
            .find(|a| a.assignment_id == assignment_id)
            .ok_or_else(|| HitmanError::Remote {
                kind: "RequestError".to_string(),
                code: None,
                message: format!("assignment {assignment_id} does not exist"),
            })?;
        assignment.assignment_status = AssignmentStatus::Approved;
        state.calls.push(Call::Approve {
            assignment_id: assignment_id.to_string(),
            feedback: feedback.to_string(),
        });
        Ok(())
    }

    fn send_bonus(&self, bonus: &BonusRequest) -> Result<()> {
        self.check(&[bonus.assignment_id.as_str(), bonus.worker_id.as_str()])?;
        self.state.borrow_mut().calls.push(Call::Bonus(bonus.clone()));
        Ok(())
    }

    fn list_workers_with_qualification_type(
        &self,
        qualification_type_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Qualification>> {
        self.check(&[qualification_type_id])?;
        let holders: Vec<Qualification> = self
            .state
            .borrow()
            .qualifications
            .iter()
            .filter(|q| q.qualification_type_id == qualification_type_id)
            .filter(|q| q.status == Some(QualificationStatus::Granted))
            .cloned()
            .collect();
        self.page(holders, cursor)
    }

    fn associate_qualification_with_worker(&self, grant: &QualificationGrant) -> Result<()> {
        self.check(&[grant.worker_id.as_str()])?;
        let mut state = self.state.borrow_mut();
        let existing = state.qualifications.iter().position(|q| {
            q.qualification_type_id == grant.qualification_type_id && q.worker_id == grant.worker_id
        });
        match existing {
            Some(i) => {
                let q = &mut state.qualifications[i];
                q.integer_value = Some(grant.value);
                q.status = Some(QualificationStatus::Granted);
            }
            None => state.qualifications.push(Qualification {
                qualification_type_id: grant.qualification_type_id.clone(),
                worker_id: grant.worker_id.clone(),
                integer_value: Some(grant.value),
                status: Some(QualificationStatus::Granted),
                grant_time: None,
            }),
        }
        state.calls.push(Call::Associate(grant.clone()));
        Ok(())
    }

    fn create_qualification_type(&self, spec: &NewQualificationType) -> Result<QualificationType> {
        self.check(&[spec.name.as_str()])?;
        let mut state = self.state.borrow_mut();
        let created = QualificationType {
            qualification_type_id: format!("QT{}", state.qualification_types.len() + 1),
            name: spec.name.clone(),
            description: spec.description.clone(),
            qualification_type_status: Some("Active".to_string()),
            is_requestable: !spec.auto_granted,
            auto_granted: spec.auto_granted,
            auto_granted_value: spec.auto_granted.then_some(spec.auto_granted_value),
        };
        state.qualification_types.push(created.clone());
        state.calls.push(Call::CreateQualificationType(spec.clone()));
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::fetch_all;

    #[test]
    fn pages_follow_marketplace_cursor_convention() {
        let fake = (0..12).fold(
            FakeMarketplace::new()
                .with_page_size(10)
                .with_hit("H1", "Study", HitStatus::Reviewable),
            |f, i| {
                let (a, w) = (format!("A{i}"), format!("W{i}"));
                f.with_assignment("H1", &a, &w, AssignmentStatus::Submitted)
            },
        );
        let first = fake.list_assignments_for_hit("H1", &[], None).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.next_token.as_deref(), Some("10"));
        let second = fake
            .list_assignments_for_hit("H1", &[], first.next_token.as_deref())
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.next_token.is_none());

        let all = fetch_all(|c| fake.list_assignments_for_hit("H1", &[], c)).unwrap();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn injected_failures_surface_as_remote_errors() {
        let fake = FakeMarketplace::new()
            .with_hit("H1", "Study", HitStatus::Reviewable)
            .with_assignment("H1", "A1", "W1", AssignmentStatus::Submitted)
            .fail_on("A1");
        let err = fake.approve_assignment("A1", "thanks").unwrap_err();
        assert!(matches!(err, HitmanError::Remote { .. }));
        assert!(fake.calls().is_empty());
    }
}
