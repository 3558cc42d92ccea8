//! Rating Service
//!
//! Scores exchanged by the participants of an ended chat.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::services::{ChatAction, ChatPolicy, PolicyViolation};
use crate::domain::{ChatRepository, Rating, RatingRepository, RatingSummary, MAX_SCORE, MIN_SCORE};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;
use crate::shared::snowflake::SnowflakeGenerator;

/// Rating service trait
#[async_trait]
pub trait RatingService: Send + Sync {
    /// Rate the other participant of an ended chat request
    async fn rate(
        &self,
        rater_id: i64,
        request_id: i64,
        score: i16,
        comment: Option<String>,
    ) -> Result<Rating, RatingError>;

    async fn list_for_user(&self, user_id: i64, page: Page) -> Result<Vec<Rating>, RatingError>;

    async fn summary(&self, user_id: i64) -> Result<RatingSummary, RatingError>;
}

/// Rating service errors
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Chat request not found")]
    RequestNotFound,

    #[error("Score must be between 1 and 5")]
    InvalidScore,

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<RatingError> for AppError {
    fn from(e: RatingError) -> Self {
        match e {
            RatingError::RequestNotFound => AppError::NotFound(e.to_string()),
            RatingError::InvalidScore => AppError::invalid_field("score", e.to_string()),
            RatingError::Policy(violation) if violation.is_forbidden() => {
                AppError::Forbidden(violation.to_string())
            }
            RatingError::Policy(violation) => AppError::Conflict(violation.to_string()),
            RatingError::Repository(e) => e,
        }
    }
}

/// RatingService implementation
pub struct RatingServiceImpl<R, C>
where
    R: RatingRepository,
    C: ChatRepository,
{
    rating_repo: Arc<R>,
    chat_repo: Arc<C>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<R, C> RatingServiceImpl<R, C>
where
    R: RatingRepository,
    C: ChatRepository,
{
    pub fn new(rating_repo: Arc<R>, chat_repo: Arc<C>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            rating_repo,
            chat_repo,
            id_generator,
        }
    }
}

#[async_trait]
impl<R, C> RatingService for RatingServiceImpl<R, C>
where
    R: RatingRepository + 'static,
    C: ChatRepository + 'static,
{
    async fn rate(
        &self,
        rater_id: i64,
        request_id: i64,
        score: i16,
        comment: Option<String>,
    ) -> Result<Rating, RatingError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(RatingError::InvalidScore);
        }

        let request = self
            .chat_repo
            .find_request(request_id)
            .await?
            .ok_or(RatingError::RequestNotFound)?;
        ChatPolicy::check(&request, rater_id, ChatAction::Rate)?;
        let ratee_id = request
            .counterpart_of(rater_id)
            .ok_or(PolicyViolation::NotParticipant)?;

        let rating = Rating {
            id: self.id_generator.generate(),
            request_id,
            rater_id,
            ratee_id,
            score,
            comment: comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            created_at: Utc::now(),
        };

        let created = self.rating_repo.create(&rating).await?;
        tracing::info!(request_id, rater_id, ratee_id, score, "Rating submitted");
        Ok(created)
    }

    async fn list_for_user(&self, user_id: i64, page: Page) -> Result<Vec<Rating>, RatingError> {
        Ok(self.rating_repo.list_for_user(user_id, page).await?)
    }

    async fn summary(&self, user_id: i64) -> Result<RatingSummary, RatingError> {
        Ok(self.rating_repo.summary(user_id).await?)
    }
}
