//! Report entity and repository trait.
//!
//! Maps to the `reports` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// What is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ReportTarget {
    User(i64),
    Post(i64),
}

impl ReportTarget {
    /// Database `target_type` column value.
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Post(_) => "post",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::User(id) | Self::Post(id) => *id,
        }
    }

    /// Rebuild from the `target_type` / `target_id` columns.
    pub fn from_parts(target_type: &str, id: i64) -> Self {
        match target_type {
            "post" => Self::Post(id),
            _ => Self::User(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    Scam,
    Other,
}

impl ReportReason {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "spam" => Self::Spam,
            "harassment" => Self::Harassment,
            "inappropriate" => Self::Inappropriate,
            "scam" => Self::Scam,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Harassment => "harassment",
            Self::Inappropriate => "inappropriate",
            Self::Scam => "scam",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "resolved" => Self::Resolved,
            "dismissed" => Self::Dismissed,
            _ => Self::Pending,
        }
    }

    /// Parse a query value, rejecting unknown statuses.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

/// Represents a user-submitted report.
///
/// Maps to the `reports` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - reporter_id: BIGINT NOT NULL REFERENCES users(id)
/// - target_type: TEXT NOT NULL ('user' | 'post')
/// - target_id: BIGINT NOT NULL
/// - reason: TEXT NOT NULL
/// - description: TEXT NULL
/// - status: TEXT NOT NULL DEFAULT 'pending'
/// - resolved_by: BIGINT NULL REFERENCES users(id)
/// - resolution_note: TEXT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - resolved_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub target: ReportTarget,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub resolved_by: Option<i64>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn new(
        id: i64,
        reporter_id: i64,
        target: ReportTarget,
        reason: ReportReason,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            reporter_id,
            target,
            reason,
            description,
            status: ReportStatus::Pending,
            resolved_by: None,
            resolution_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReportStatus::Pending
    }
}

/// Repository trait for Report data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a report. Returns `Conflict` if the reporter already has a
    /// pending report on the same target.
    async fn create(&self, report: &Report) -> Result<Report, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Report>, AppError>;

    /// Reports newest first, optionally filtered by status.
    async fn list(&self, status: Option<ReportStatus>, page: Page)
        -> Result<Vec<Report>, AppError>;

    /// Reports filed by one user, newest first.
    async fn list_by_reporter(&self, reporter_id: i64, page: Page)
        -> Result<Vec<Report>, AppError>;

    /// Close a pending report. Returns `Conflict` if it is no longer pending.
    async fn resolve(
        &self,
        id: i64,
        status: ReportStatus,
        resolved_by: i64,
        note: Option<String>,
    ) -> Result<Report, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parts() {
        let target = ReportTarget::from_parts("post", 9);
        assert_eq!(target, ReportTarget::Post(9));
        assert_eq!(target.type_str(), "post");
        assert_eq!(target.id(), 9);
        assert_eq!(ReportTarget::from_parts("user", 3), ReportTarget::User(3));
    }

    #[test]
    fn test_target_serialization() {
        let json = serde_json::to_value(ReportTarget::User(5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "user", "id": 5}));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ReportStatus::parse("dismissed"), Some(ReportStatus::Dismissed));
        assert_eq!(ReportStatus::parse("closed"), None);
        assert_eq!(ReportReason::from_str("SCAM"), ReportReason::Scam);
    }
}
