use crate::error::Result;
use crate::types::{
    Assignment, AssignmentStatus, Hit, Page, Qualification, QualificationType, Usd,
};

/// Remote marketplace operations used by the verbs.
///
/// Listing calls take the cursor returned by the previous page (`None` for
/// the first page). Drive them through [`crate::paginate::fetch_all`] rather
/// than calling them in a loop by hand.
pub trait Marketplace {
    fn list_reviewable_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>>;

    fn list_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>>;

    /// `Ok(None)` when the HIT does not exist.
    fn get_hit(&self, hit_id: &str) -> Result<Option<Hit>>;

    /// An empty `statuses` slice means every status.
    fn list_assignments_for_hit(
        &self,
        hit_id: &str,
        statuses: &[AssignmentStatus],
        cursor: Option<&str>,
    ) -> Result<Page<Assignment>>;

    fn approve_assignment(&self, assignment_id: &str, feedback: &str) -> Result<()>;

    fn send_bonus(&self, bonus: &BonusRequest) -> Result<()>;

    /// Workers currently granted `qualification_type_id`.
    fn list_workers_with_qualification_type(
        &self,
        qualification_type_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Qualification>>;

    /// Grants the qualification, or updates the value of an existing grant.
    fn associate_qualification_with_worker(&self, grant: &QualificationGrant) -> Result<()>;

    fn create_qualification_type(&self, spec: &NewQualificationType) -> Result<QualificationType>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BonusRequest {
    pub worker_id: String,
    pub assignment_id: String,
    pub amount: Usd,
    pub reason: String,
    /// Lets the marketplace reject a replay of the same payment.
    pub unique_request_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualificationGrant {
    pub qualification_type_id: String,
    pub worker_id: String,
    pub value: i64,
    pub send_notification: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQualificationType {
    pub name: String,
    pub description: String,
    pub retry_delay_secs: u64,
    pub auto_granted: bool,
    pub auto_granted_value: i64,
}

impl NewQualificationType {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            retry_delay_secs: 123,
            auto_granted: true,
            auto_granted_value: 1,
        }
    }
}
