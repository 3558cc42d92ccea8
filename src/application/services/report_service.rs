//! Report Service
//!
//! Users flag other users or posts for moderation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    PostRepository, Report, ReportReason, ReportRepository, ReportTarget, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;
use crate::shared::snowflake::SnowflakeGenerator;

/// Report service trait
#[async_trait]
pub trait ReportService: Send + Sync {
    async fn report(
        &self,
        reporter_id: i64,
        target: ReportTarget,
        reason: ReportReason,
        description: Option<String>,
    ) -> Result<Report, ReportError>;

    async fn list_mine(&self, reporter_id: i64, page: Page) -> Result<Vec<Report>, ReportError>;
}

/// Report service errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Reported user not found")]
    UserNotFound,

    #[error("Reported post not found")]
    PostNotFound,

    #[error("You cannot report yourself or your own post")]
    SelfReport,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::UserNotFound | ReportError::PostNotFound => {
                AppError::NotFound(e.to_string())
            }
            ReportError::SelfReport => AppError::BadRequest(e.to_string()),
            ReportError::Repository(e) => e,
        }
    }
}

/// ReportService implementation
pub struct ReportServiceImpl<R, U, P>
where
    R: ReportRepository,
    U: UserRepository,
    P: PostRepository,
{
    report_repo: Arc<R>,
    user_repo: Arc<U>,
    post_repo: Arc<P>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<R, U, P> ReportServiceImpl<R, U, P>
where
    R: ReportRepository,
    U: UserRepository,
    P: PostRepository,
{
    pub fn new(
        report_repo: Arc<R>,
        user_repo: Arc<U>,
        post_repo: Arc<P>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            report_repo,
            user_repo,
            post_repo,
            id_generator,
        }
    }

    /// The user a target ultimately points at.
    async fn target_owner(&self, target: ReportTarget) -> Result<i64, ReportError> {
        match target {
            ReportTarget::User(id) => self
                .user_repo
                .find_by_id(id)
                .await?
                .map(|user| user.id)
                .ok_or(ReportError::UserNotFound),
            ReportTarget::Post(id) => self
                .post_repo
                .find_by_id(id)
                .await?
                .map(|post| post.author_id)
                .ok_or(ReportError::PostNotFound),
        }
    }
}

#[async_trait]
impl<R, U, P> ReportService for ReportServiceImpl<R, U, P>
where
    R: ReportRepository + 'static,
    U: UserRepository + 'static,
    P: PostRepository + 'static,
{
    async fn report(
        &self,
        reporter_id: i64,
        target: ReportTarget,
        reason: ReportReason,
        description: Option<String>,
    ) -> Result<Report, ReportError> {
        if self.target_owner(target).await? == reporter_id {
            return Err(ReportError::SelfReport);
        }

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let report = Report::new(
            self.id_generator.generate(),
            reporter_id,
            target,
            reason,
            description,
        );

        let created = self.report_repo.create(&report).await?;
        tracing::info!(
            report_id = created.id,
            reporter_id,
            target_type = target.type_str(),
            target_id = target.id(),
            reason = reason.as_str(),
            "Report filed"
        );
        Ok(created)
    }

    async fn list_mine(&self, reporter_id: i64, page: Page) -> Result<Vec<Report>, ReportError> {
        Ok(self.report_repo.list_by_reporter(reporter_id, page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockPostRepository, MockReportRepository, MockUserRepository, Post, User};

    fn service(
        reports: MockReportRepository,
        users: MockUserRepository,
        posts: MockPostRepository,
    ) -> ReportServiceImpl<MockReportRepository, MockUserRepository, MockPostRepository> {
        ReportServiceImpl::new(
            Arc::new(reports),
            Arc::new(users),
            Arc::new(posts),
            Arc::new(SnowflakeGenerator::new(1, 1)),
        )
    }

    fn users() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                ..Default::default()
            }))
        });
        users
    }

    #[tokio::test]
    async fn test_cannot_report_self() {
        let err = service(MockReportRepository::new(), users(), MockPostRepository::new())
            .report(5, ReportTarget::User(5), ReportReason::Spam, None)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_cannot_report_own_post() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|id| {
            Ok(Some(Post {
                id,
                author_id: 5,
                ..Default::default()
            }))
        });

        let err = service(MockReportRepository::new(), MockUserRepository::new(), posts)
            .report(5, ReportTarget::Post(77), ReportReason::Other, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::SelfReport));
    }

    #[tokio::test]
    async fn test_missing_post() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|_| Ok(None));

        let err = service(MockReportRepository::new(), MockUserRepository::new(), posts)
            .report(5, ReportTarget::Post(77), ReportReason::Scam, None)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_report_created_pending() {
        let mut reports = MockReportRepository::new();
        reports
            .expect_create()
            .withf(|r| {
                r.is_pending()
                    && r.target == ReportTarget::User(6)
                    && r.description.as_deref() == Some("keeps spamming")
            })
            .times(1)
            .returning(|r| Ok(r.clone()));

        let report = service(reports, users(), MockPostRepository::new())
            .report(
                5,
                ReportTarget::User(6),
                ReportReason::Spam,
                Some(" keeps spamming ".into()),
            )
            .await
            .unwrap();
        assert_eq!(report.reporter_id, 5);
    }
}
