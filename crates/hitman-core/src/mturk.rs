//! Blocking client for the Mechanical Turk requester API (JSON 1.1 protocol).

use crate::client::{BonusRequest, Marketplace, NewQualificationType, QualificationGrant};
use crate::error::{HitmanError, Result};
use crate::sigv4::{self, Credentials, SigningRequest};
use crate::types::{Assignment, AssignmentStatus, Hit, Page, Qualification, QualificationType};
use chrono::Utc;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const PRODUCTION_ENDPOINT: &str = "https://mturk-requester.us-east-1.amazonaws.com";
pub const SANDBOX_ENDPOINT: &str = "https://mturk-requester-sandbox.us-east-1.amazonaws.com";
pub const ENDPOINT_VAR: &str = "HITMAN_ENDPOINT";

const REGION: &str = "us-east-1";
const SERVICE: &str = "mturk-requester";
const TARGET_PREFIX: &str = "MTurkRequesterServiceV20170117";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const PAGE_SIZE: u32 = 100;
const TIMEOUT_SECS: u64 = 60;

pub struct MTurkClient {
    endpoint: String,
    host: String,
    credentials: Credentials,
    http: reqwest::blocking::Client,
}

impl MTurkClient {
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let host = host_of(&endpoint)?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            endpoint,
            host,
            credentials,
            http,
        })
    }

    /// Build a client from the environment. An explicit endpoint wins over
    /// `--sandbox`.
    pub fn from_env(sandbox: bool, endpoint_override: Option<&str>) -> Result<Self> {
        let endpoint = match endpoint_override {
            Some(e) => e,
            None if sandbox => SANDBOX_ENDPOINT,
            None => PRODUCTION_ENDPOINT,
        };
        Self::new(endpoint, Credentials::from_env()?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call<R: DeserializeOwned>(&self, operation: &str, body: &Value) -> Result<R> {
        let payload = serde_json::to_vec(body)?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let signature = sigv4::sign(
            &self.credentials,
            &SigningRequest {
                host: &self.host,
                region: REGION,
                service: SERVICE,
                content_type: CONTENT_TYPE,
                target: &target,
                body: &payload,
                time: Utc::now(),
            },
        );

        let mut request = self
            .http
            .post(format!("{}/", self.endpoint))
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", &target)
            .header("X-Amz-Date", &signature.amz_date)
            .header("Authorization", &signature.authorization);
        if let Some(token) = self.credentials.session_token.as_deref() {
            request = request.header("X-Amz-Security-Token", token);
        }

        tracing::debug!(operation, "marketplace request");
        let response = request.body(payload).send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            let err = remote_error(status.as_u16(), &text);
            tracing::debug!(
                operation,
                status = status.as_u16(),
                error = %err,
                "marketplace error"
            );
            return Err(err);
        }
        serde_json::from_str(&text)
            .map_err(|e| HitmanError::Protocol(format!("{operation}: {e}")))
    }
}

fn host_of(endpoint: &str) -> Result<String> {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| {
            HitmanError::Protocol(format!("endpoint '{endpoint}' is not an http(s) URL"))
        })?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(HitmanError::Protocol(format!("endpoint '{endpoint}' has no host")));
    }
    Ok(host.to_string())
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(rename = "Message", alias = "message", default)]
    message: Option<String>,
    #[serde(rename = "TurkErrorCode", default)]
    turk_error_code: Option<String>,
}

fn remote_error(status: u16, text: &str) -> HitmanError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => HitmanError::Remote {
            kind: body
                .kind
                .as_deref()
                .map(|k| k.rsplit('#').next().unwrap_or(k).to_string())
                .unwrap_or_else(|| format!("HTTP {status}")),
            code: body.turk_error_code,
            message: body.message.unwrap_or_default(),
        },
        Err(_) => HitmanError::Remote {
            kind: format!("HTTP {status}"),
            code: None,
            message: text.trim().to_string(),
        },
    }
}

fn is_missing_hit(err: &HitmanError) -> bool {
    match err {
        HitmanError::Remote { code, message, .. } => {
            code.as_deref() == Some("AWS.MechanicalTurk.HitDoesNotExist")
                || message.contains("does not exist")
        }
        _ => false,
    }
}

fn paged(mut body: Value, cursor: Option<&str>) -> Value {
    body["MaxResults"] = json!(PAGE_SIZE);
    if let Some(token) = cursor {
        body["NextToken"] = json!(token);
    }
    body
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HitList {
    #[serde(rename = "HITs", default)]
    hits: Vec<Hit>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssignmentList {
    #[serde(default)]
    assignments: Vec<Assignment>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QualificationList {
    #[serde(default)]
    qualifications: Vec<Qualification>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
struct HitEnvelope {
    #[serde(rename = "HIT")]
    hit: Hit,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QualificationTypeEnvelope {
    qualification_type: QualificationType,
}

impl Marketplace for MTurkClient {
    fn list_reviewable_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>> {
        let list: HitList = self.call("ListReviewableHITs", &paged(json!({}), cursor))?;
        Ok(Page::new(list.hits, list.next_token))
    }

    fn list_hits(&self, cursor: Option<&str>) -> Result<Page<Hit>> {
        let list: HitList = self.call("ListHITs", &paged(json!({}), cursor))?;
        Ok(Page::new(list.hits, list.next_token))
    }

    fn get_hit(&self, hit_id: &str) -> Result<Option<Hit>> {
        match self.call::<HitEnvelope>("GetHIT", &json!({ "HITId": hit_id })) {
            Ok(envelope) => Ok(Some(envelope.hit)),
            Err(e) if is_missing_hit(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_assignments_for_hit(
        &self,
        hit_id: &str,
        statuses: &[AssignmentStatus],
        cursor: Option<&str>,
    ) -> Result<Page<Assignment>> {
        let mut body = json!({ "HITId": hit_id });
        if !statuses.is_empty() {
            body["AssignmentStatuses"] =
                json!(statuses.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        }
        let list: AssignmentList = self.call("ListAssignmentsForHIT", &paged(body, cursor))?;
        Ok(Page::new(list.assignments, list.next_token))
    }

    fn approve_assignment(&self, assignment_id: &str, feedback: &str) -> Result<()> {
        self.call::<IgnoredAny>(
            "ApproveAssignment",
            &json!({ "AssignmentId": assignment_id, "RequesterFeedback": feedback }),
        )?;
        Ok(())
    }

    fn send_bonus(&self, bonus: &BonusRequest) -> Result<()> {
        self.call::<IgnoredAny>(
            "SendBonus",
            &json!({
                "WorkerId": bonus.worker_id,
                "AssignmentId": bonus.assignment_id,
                "BonusAmount": bonus.amount.to_string(),
                "Reason": bonus.reason,
                "UniqueRequestToken": bonus.unique_request_token,
            }),
        )?;
        Ok(())
    }

    fn list_workers_with_qualification_type(
        &self,
        qualification_type_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Qualification>> {
        let body = json!({ "QualificationTypeId": qualification_type_id, "Status": "Granted" });
        let list: QualificationList =
            self.call("ListWorkersWithQualificationType", &paged(body, cursor))?;
        Ok(Page::new(list.qualifications, list.next_token))
    }

    fn associate_qualification_with_worker(&self, grant: &QualificationGrant) -> Result<()> {
        self.call::<IgnoredAny>(
            "AssociateQualificationWithWorker",
            &json!({
                "QualificationTypeId": grant.qualification_type_id,
                "WorkerId": grant.worker_id,
                "IntegerValue": grant.value,
                "SendNotification": grant.send_notification,
            }),
        )?;
        Ok(())
    }

    fn create_qualification_type(&self, spec: &NewQualificationType) -> Result<QualificationType> {
        let mut body = json!({
            "Name": spec.name,
            "Description": spec.description,
            "QualificationTypeStatus": "Active",
            "RetryDelayInSeconds": spec.retry_delay_secs,
            "AutoGranted": spec.auto_granted,
        });
        if spec.auto_granted {
            body["AutoGrantedValue"] = json!(spec.auto_granted_value);
        }
        let created: QualificationTypeEnvelope = self.call("CreateQualificationType", &body)?;
        Ok(created.qualification_type)
    }
}
