//! Chat request and chat message entities with their repository trait.
//!
//! Maps to the `chat_requests` and `chat_messages` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::image::Image;
use crate::domain::value_objects::Credits;
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// Lifecycle of a chat request.
///
/// ```text
/// pending --accept--> accepted --end+approve--> ended
///    \--reject--> rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatRequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Ended,
}

impl ChatRequestStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            "ended" => Self::Ended,
            _ => Self::Pending,
        }
    }

    /// Parse a query value, rejecting unknown statuses.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Ended => "ended",
        }
    }

    /// Pending and accepted requests block a new request between the same pair.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

impl std::fmt::Display for ChatRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a chat request between two users.
///
/// Maps to the `chat_requests` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - requester_id: BIGINT NOT NULL REFERENCES users(id)
/// - recipient_id: BIGINT NOT NULL REFERENCES users(id)
/// - status: TEXT NOT NULL DEFAULT 'pending'
/// - end_requested_by: BIGINT NULL
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub id: i64,
    pub requester_id: i64,
    pub recipient_id: i64,
    pub status: ChatRequestStatus,
    /// Participant who asked to end the chat, while awaiting approval
    pub end_requested_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatRequest {
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.requester_id == user_id || self.recipient_id == user_id
    }

    /// The other side of the conversation, or None for outsiders.
    pub fn counterpart_of(&self, user_id: i64) -> Option<i64> {
        if self.requester_id == user_id {
            Some(self.recipient_id)
        } else if self.recipient_id == user_id {
            Some(self.requester_id)
        } else {
            None
        }
    }

    pub fn participants(&self) -> [i64; 2] {
        [self.requester_id, self.recipient_id]
    }
}

impl Default for ChatRequest {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            requester_id: 0,
            recipient_id: 0,
            status: ChatRequestStatus::default(),
            end_requested_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Chat message kinds matching the `chat_messages.kind` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    /// Text with attached images
    Complex,
    /// Credit transfer between the participants
    Transaction,
    EndRequest,
    EndRequestApproval,
}

impl MessageKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "complex" => Self::Complex,
            "transaction" => Self::Transaction,
            "end_request" => Self::EndRequest,
            "end_request_approval" => Self::EndRequestApproval,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Complex => "complex",
            Self::Transaction => "transaction",
            Self::EndRequest => "end_request",
            Self::EndRequestApproval => "end_request_approval",
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::EndRequest | Self::EndRequestApproval)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a message inside a chat request.
///
/// Maps to the `chat_messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - request_id: BIGINT NOT NULL REFERENCES chat_requests(id)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - kind: TEXT NOT NULL
/// - content: TEXT NULL
/// - amount: BIGINT NULL (transaction messages only)
/// - container_id: BIGINT NULL REFERENCES image_containers(id) (complex messages only)
/// - delivered_at: TIMESTAMPTZ NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub request_id: i64,
    pub sender_id: i64,
    pub kind: MessageKind,
    pub content: Option<String>,
    pub amount: Option<Credits>,
    pub container_id: Option<i64>,
    /// Images of a complex message, ordered by position
    pub images: Vec<Image>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A message with no content, amount or images.
    pub fn new(id: i64, request_id: i64, sender_id: i64, kind: MessageKind) -> Self {
        Self {
            id,
            request_id,
            sender_id,
            kind,
            content: None,
            amount: None,
            container_id: None,
            images: Vec::new(),
            delivered_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}

/// Which side of the request the caller is on when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDirection {
    Incoming,
    Outgoing,
    #[default]
    All,
}

impl RequestDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "incoming" => Some(Self::Incoming),
            "outgoing" => Some(Self::Outgoing),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// A compare-and-set status change, optionally recording a system message.
///
/// Applied only if the stored row still has `from` and `expected_end_requested_by`;
/// otherwise the repository reports a conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTransition {
    pub request_id: i64,
    pub from: ChatRequestStatus,
    pub expected_end_requested_by: Option<i64>,
    pub to: ChatRequestStatus,
    pub end_requested_by: Option<i64>,
    pub message: Option<ChatMessage>,
}

/// Outcome of an in-chat credit transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub message: ChatMessage,
    pub payer_balance: Credits,
    pub payee_balance: Credits,
}

/// A message whose delivery was just recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub message_id: i64,
    pub request_id: i64,
    pub sender_id: i64,
}

/// Repository trait for chat data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a pending request and its opening message.
    ///
    /// Returns `Conflict` when the pair already has an open request.
    async fn create_request(
        &self,
        request: &ChatRequest,
        first_message: &ChatMessage,
    ) -> Result<ChatRequest, AppError>;

    async fn find_request(&self, id: i64) -> Result<Option<ChatRequest>, AppError>;

    /// Requests involving a user, newest first.
    async fn list_requests(
        &self,
        user_id: i64,
        direction: RequestDirection,
        status: Option<ChatRequestStatus>,
        page: Page,
    ) -> Result<Vec<ChatRequest>, AppError>;

    /// Apply a status change and its system message atomically.
    async fn transition(&self, transition: &ChatTransition) -> Result<ChatRequest, AppError>;

    /// Insert a text or complex message (with its images) while the request is accepted.
    async fn insert_message(&self, message: &ChatMessage) -> Result<ChatMessage, AppError>;

    /// Move `message.amount` from the sender to `payee_id` and record the
    /// transaction message, all in one database transaction.
    async fn transfer(
        &self,
        message: &ChatMessage,
        payee_id: i64,
    ) -> Result<TransferReceipt, AppError>;

    /// Messages of a request, newest first.
    async fn list_messages(&self, request_id: i64, page: Page)
        -> Result<Vec<ChatMessage>, AppError>;

    /// Mark every undelivered message addressed to `recipient_id` as delivered.
    async fn mark_request_delivered(
        &self,
        request_id: i64,
        recipient_id: i64,
    ) -> Result<Vec<DeliveredMessage>, AppError>;

    /// Mark one message delivered if `recipient_id` is its addressee.
    async fn mark_delivered(
        &self,
        message_id: i64,
        recipient_id: i64,
    ) -> Result<Option<DeliveredMessage>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(ChatRequestStatus::parse("accepted"), Some(ChatRequestStatus::Accepted));
        assert_eq!(ChatRequestStatus::parse("nope"), None);
        assert_eq!(ChatRequestStatus::from_str("nope"), ChatRequestStatus::Pending);
        assert!(ChatRequestStatus::Pending.is_open());
        assert!(ChatRequestStatus::Accepted.is_open());
        assert!(!ChatRequestStatus::Ended.is_open());
    }

    #[test]
    fn test_counterpart() {
        let request = ChatRequest {
            requester_id: 1,
            recipient_id: 2,
            ..Default::default()
        };
        assert_eq!(request.counterpart_of(1), Some(2));
        assert_eq!(request.counterpart_of(2), Some(1));
        assert_eq!(request.counterpart_of(3), None);
        assert!(!request.is_participant(3));
    }

    #[test]
    fn test_message_kind_strings() {
        assert_eq!(MessageKind::EndRequestApproval.as_str(), "end_request_approval");
        assert_eq!(MessageKind::from_str("transaction"), MessageKind::Transaction);
        assert!(MessageKind::EndRequest.is_system());
        assert!(!MessageKind::Complex.is_system());
    }

    #[test]
    fn test_message_builder() {
        let message = ChatMessage::new(10, 20, 30, MessageKind::Text).with_content("hi");
        assert_eq!(message.content.as_deref(), Some("hi"));
        assert!(!message.is_delivered());
    }
}
