use crate::error::HitmanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitStatus {
    Assignable,
    Unassignable,
    Reviewable,
    Reviewing,
    Disposed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Submitted,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Submitted => "Submitted",
            AssignmentStatus::Approved => "Approved",
            AssignmentStatus::Rejected => "Rejected",
            AssignmentStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualificationStatus {
    Granted,
    Revoked,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Remote records
// ---------------------------------------------------------------------------

/// A postable unit of paid work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hit {
    #[serde(rename = "HITId")]
    pub hit_id: String,
    #[serde(rename = "HITGroupId", default)]
    pub hit_group_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "HITStatus", default)]
    pub status: Option<HitStatus>,
    #[serde(default)]
    pub max_assignments: Option<u32>,
    #[serde(default)]
    pub reward: Option<String>,
    #[serde(default, with = "epoch_seconds")]
    pub creation_time: Option<DateTime<Utc>>,
}

/// One worker's attempt at a HIT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Assignment {
    pub assignment_id: String,
    pub worker_id: String,
    #[serde(rename = "HITId")]
    pub hit_id: String,
    pub assignment_status: AssignmentStatus,
    #[serde(default, with = "epoch_seconds")]
    pub accept_time: Option<DateTime<Utc>>,
    #[serde(default, with = "epoch_seconds")]
    pub submit_time: Option<DateTime<Utc>>,
}

/// A worker's grant of a qualification type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Qualification {
    pub qualification_type_id: String,
    pub worker_id: String,
    #[serde(default)]
    pub integer_value: Option<i64>,
    #[serde(default)]
    pub status: Option<QualificationStatus>,
    #[serde(default, with = "epoch_seconds")]
    pub grant_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QualificationType {
    pub qualification_type_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub qualification_type_status: Option<String>,
    #[serde(default)]
    pub is_requestable: bool,
    #[serde(default)]
    pub auto_granted: bool,
    #[serde(default)]
    pub auto_granted_value: Option<i64>,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// True when no further page should be requested.
    pub fn is_last(&self) -> bool {
        self.items.is_empty() || self.next_token.is_none()
    }
}

// ---------------------------------------------------------------------------
// Usd
// ---------------------------------------------------------------------------

/// A positive US dollar amount held in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd {
    cents: u64,
}

impl Usd {
    pub fn from_cents(cents: u64) -> Result<Self, HitmanError> {
        if cents == 0 {
            return Err(HitmanError::InvalidAmount("0.00".to_string()));
        }
        Ok(Self { cents })
    }

    pub fn cents(self) -> u64 {
        self.cents
    }
}

impl FromStr for Usd {
    type Err = HitmanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HitmanError::InvalidAmount(s.to_string());
        let raw = s.trim();
        let raw = raw.strip_prefix('$').unwrap_or(raw);
        let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac.len() > 2 {
            return Err(invalid());
        }
        let dollars: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let total = dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .ok_or_else(invalid)?;
        if total == 0 {
            return Err(invalid());
        }
        Ok(Self { cents: total })
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Usd {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// The marketplace encodes timestamps as (fractional) seconds since the epoch.
mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_f64(dt.timestamp_millis() as f64 / 1000.0),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.and_then(|s| DateTime::from_timestamp_millis((s * 1000.0).round() as i64)))
    }
}
