//! Report Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Report, ReportReason, ReportRepository, ReportStatus, ReportTarget};
use crate::shared::error::{conflict_on_unique, AppError};
use crate::shared::pagination::Page;

const REPORT_COLUMNS: &str = "id, reporter_id, target_type, target_id, reason, description, status, \
                              resolved_by, resolution_note, created_at, resolved_at";

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: i64,
    reporter_id: i64,
    target_type: String,
    target_id: i64,
    reason: String,
    description: Option<String>,
    status: String,
    resolved_by: Option<i64>,
    resolution_note: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl ReportRow {
    fn into_report(self) -> Report {
        Report {
            id: self.id,
            reporter_id: self.reporter_id,
            target: ReportTarget::from_parts(&self.target_type, self.target_id),
            reason: ReportReason::from_str(&self.reason),
            description: self.description,
            status: ReportStatus::from_str(&self.status),
            resolved_by: self.resolved_by,
            resolution_note: self.resolution_note,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        }
    }
}

/// PostgreSQL report repository implementation.
#[derive(Clone)]
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn create(&self, report: &Report) -> Result<Report, AppError> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            INSERT INTO reports (id, reporter_id, target_type, target_id, reason, description,
                                 status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(report.id)
        .bind(report.reporter_id)
        .bind(report.target.type_str())
        .bind(report.target.id())
        .bind(report.reason.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You already have a pending report on this target"))?;

        Ok(row.into_report())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Report>, AppError> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {} FROM reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_report()))
    }

    async fn list(
        &self,
        status: Option<ReportStatus>,
        page: Page,
    ) -> Result<Vec<Report>, AppError> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {}
            FROM reports
            WHERE ($1::text IS NULL OR status = $1) AND id < $2
            ORDER BY id DESC
            LIMIT $3
            "#,
            REPORT_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_report()).collect())
    }

    async fn list_by_reporter(
        &self,
        reporter_id: i64,
        page: Page,
    ) -> Result<Vec<Report>, AppError> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {}
            FROM reports
            WHERE reporter_id = $1 AND id < $2
            ORDER BY id DESC
            LIMIT $3
            "#,
            REPORT_COLUMNS
        ))
        .bind(reporter_id)
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_report()).collect())
    }

    async fn resolve(
        &self,
        id: i64,
        status: ReportStatus,
        resolved_by: i64,
        note: Option<String>,
    ) -> Result<Report, AppError> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            UPDATE reports
            SET status = $2, resolved_by = $3, resolution_note = $4, resolved_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(resolved_by)
        .bind(note)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into_report()),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(AppError::Conflict("Report is no longer pending".into())),
                None => Err(AppError::NotFound(format!("Report with id {} not found", id))),
            },
        }
    }
}
