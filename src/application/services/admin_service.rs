//! Admin Service
//!
//! Moderation and bookkeeping operations available to the `admin` role.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    PlatformStats, PostRepository, Report, ReportRepository, ReportStatus, ReportTarget,
    SessionRepository, StatsRepository, User, UserRepository, Wallet, WalletRepository,
};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// Follow-up applied when a report is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    #[default]
    None,
    BanUser,
    DeletePost,
}

/// Input for closing a report
#[derive(Debug, Clone)]
pub struct ReportResolution {
    pub status: ReportStatus,
    pub note: Option<String>,
    pub action: ReportAction,
}

/// Admin service trait
#[async_trait]
pub trait AdminService: Send + Sync {
    async fn list_users(&self, query: Option<String>, page: Page) -> Result<Vec<User>, AdminError>;

    /// Ban a user and revoke every refresh session they hold
    async fn ban(&self, admin_id: i64, user_id: i64) -> Result<(), AdminError>;

    async fn unban(&self, user_id: i64) -> Result<(), AdminError>;

    async fn delete_post(&self, admin_id: i64, post_id: i64) -> Result<(), AdminError>;

    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        page: Page,
    ) -> Result<Vec<Report>, AdminError>;

    async fn resolve_report(
        &self,
        admin_id: i64,
        report_id: i64,
        resolution: ReportResolution,
    ) -> Result<Report, AdminError>;

    /// Signed balance correction
    async fn adjust_wallet(
        &self,
        admin_id: i64,
        user_id: i64,
        amount: i64,
        note: Option<String>,
    ) -> Result<Wallet, AdminError>;

    async fn stats(&self) -> Result<PlatformStats, AdminError>;
}

/// Admin service errors
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("User not found")]
    UserNotFound,

    #[error("Post not found")]
    PostNotFound,

    #[error("Report not found")]
    ReportNotFound,

    #[error("Admins cannot ban themselves")]
    SelfBan,

    #[error("Reports can only be closed as resolved or dismissed")]
    InvalidResolution,

    #[error("A follow-up action requires the report to be resolved")]
    ActionRequiresResolved,

    #[error("delete_post only applies to post reports")]
    ActionNotApplicable,

    #[error("Report is no longer pending")]
    ReportClosed,

    #[error("Adjustment amount must not be zero")]
    ZeroAdjustment,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::UserNotFound | AdminError::PostNotFound | AdminError::ReportNotFound => {
                AppError::NotFound(e.to_string())
            }
            AdminError::SelfBan
            | AdminError::ActionRequiresResolved
            | AdminError::ActionNotApplicable => AppError::BadRequest(e.to_string()),
            AdminError::ReportClosed => AppError::Conflict(e.to_string()),
            AdminError::InvalidResolution => AppError::invalid_field("status", e.to_string()),
            AdminError::ZeroAdjustment => AppError::invalid_field("amount", e.to_string()),
            AdminError::Repository(e) => e,
        }
    }
}

/// AdminService implementation
pub struct AdminServiceImpl<U, S, P, R, W, T>
where
    U: UserRepository,
    S: SessionRepository,
    P: PostRepository,
    R: ReportRepository,
    W: WalletRepository,
    T: StatsRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    post_repo: Arc<P>,
    report_repo: Arc<R>,
    wallet_repo: Arc<W>,
    stats_repo: Arc<T>,
}

impl<U, S, P, R, W, T> AdminServiceImpl<U, S, P, R, W, T>
where
    U: UserRepository,
    S: SessionRepository,
    P: PostRepository,
    R: ReportRepository,
    W: WalletRepository,
    T: StatsRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        post_repo: Arc<P>,
        report_repo: Arc<R>,
        wallet_repo: Arc<W>,
        stats_repo: Arc<T>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            post_repo,
            report_repo,
            wallet_repo,
            stats_repo,
        }
    }

    async fn ban_user(&self, admin_id: i64, user_id: i64) -> Result<(), AdminError> {
        if admin_id == user_id {
            return Err(AdminError::SelfBan);
        }
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AdminError::UserNotFound)?;

        self.user_repo.set_banned(user_id, true).await?;
        let revoked = self.session_repo.revoke_all_for_user(user_id).await?;
        tracing::warn!(admin_id, user_id, sessions_revoked = revoked, "User banned");
        Ok(())
    }

    async fn remove_post(&self, admin_id: i64, post_id: i64) -> Result<(), AdminError> {
        if !self.post_repo.soft_delete(post_id).await? {
            return Err(AdminError::PostNotFound);
        }
        tracing::warn!(admin_id, post_id, "Post removed by admin");
        Ok(())
    }
}

#[async_trait]
impl<U, S, P, R, W, T> AdminService for AdminServiceImpl<U, S, P, R, W, T>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
    P: PostRepository + 'static,
    R: ReportRepository + 'static,
    W: WalletRepository + 'static,
    T: StatsRepository + 'static,
{
    async fn list_users(&self, query: Option<String>, page: Page) -> Result<Vec<User>, AdminError> {
        let query = query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        Ok(self.user_repo.search(query, page).await?)
    }

    async fn ban(&self, admin_id: i64, user_id: i64) -> Result<(), AdminError> {
        self.ban_user(admin_id, user_id).await
    }

    async fn unban(&self, user_id: i64) -> Result<(), AdminError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AdminError::UserNotFound)?;
        self.user_repo.set_banned(user_id, false).await?;
        tracing::info!(user_id, "User unbanned");
        Ok(())
    }

    async fn delete_post(&self, admin_id: i64, post_id: i64) -> Result<(), AdminError> {
        self.remove_post(admin_id, post_id).await
    }

    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        page: Page,
    ) -> Result<Vec<Report>, AdminError> {
        Ok(self.report_repo.list(status, page).await?)
    }

    async fn resolve_report(
        &self,
        admin_id: i64,
        report_id: i64,
        resolution: ReportResolution,
    ) -> Result<Report, AdminError> {
        if resolution.status == ReportStatus::Pending {
            return Err(AdminError::InvalidResolution);
        }
        if resolution.action != ReportAction::None && resolution.status != ReportStatus::Resolved {
            return Err(AdminError::ActionRequiresResolved);
        }

        let report = self
            .report_repo
            .find_by_id(report_id)
            .await?
            .ok_or(AdminError::ReportNotFound)?;
        if report.status != ReportStatus::Pending {
            return Err(AdminError::ReportClosed);
        }

        match (resolution.action, report.target) {
            (ReportAction::None, _) => {}
            (ReportAction::BanUser, ReportTarget::User(user_id)) => {
                self.ban_user(admin_id, user_id).await?;
            }
            (ReportAction::BanUser, ReportTarget::Post(post_id)) => {
                let post = self
                    .post_repo
                    .find_by_id(post_id)
                    .await?
                    .ok_or(AdminError::PostNotFound)?;
                self.ban_user(admin_id, post.author_id).await?;
            }
            (ReportAction::DeletePost, ReportTarget::Post(post_id)) => {
                self.remove_post(admin_id, post_id).await?;
            }
            (ReportAction::DeletePost, ReportTarget::User(_)) => {
                return Err(AdminError::ActionNotApplicable);
            }
        }

        let note = resolution
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let closed = self
            .report_repo
            .resolve(report_id, resolution.status, admin_id, note)
            .await?;

        tracing::info!(
            admin_id,
            report_id,
            status = closed.status.as_str(),
            action = ?resolution.action,
            "Report closed"
        );
        Ok(closed)
    }

    async fn adjust_wallet(
        &self,
        admin_id: i64,
        user_id: i64,
        amount: i64,
        note: Option<String>,
    ) -> Result<Wallet, AdminError> {
        if amount == 0 {
            return Err(AdminError::ZeroAdjustment);
        }
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AdminError::UserNotFound)?;

        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or_else(|| Some(format!("Adjustment by admin {admin_id}")));
        let wallet = self.wallet_repo.adjust(user_id, amount, note).await?;

        tracing::warn!(admin_id, user_id, amount, balance = wallet.balance.amount(), "Wallet adjusted");
        Ok(wallet)
    }

    async fn stats(&self) -> Result<PlatformStats, AdminError> {
        Ok(self.stats_repo.platform_stats().await?)
    }
}
