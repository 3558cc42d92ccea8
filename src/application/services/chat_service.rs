//! Chat Service
//!
//! Chat requests between two users, their messages, in-chat credit
//! transfers and the two-step end handshake.

use std::sync::Arc;

use async_trait::async_trait;

use super::media::{store_uploads, ImageUpload};
use crate::config::MediaSettings;
use crate::domain::services::{ChatAction, ChatPolicy, PolicyViolation};
use crate::domain::{
    ChatMessage, ChatRepository, ChatRequest, ChatRequestStatus, ChatTransition, Credits,
    DeliveredMessage, MediaStorage, MessageKind, RequestDirection, TransferReceipt,
    UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, MAX_PAGE_SIZE};
use crate::shared::snowflake::SnowflakeGenerator;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Open a pending request with a first text message
    async fn create_request(
        &self,
        requester_id: i64,
        recipient_id: i64,
        message: &str,
    ) -> Result<(ChatRequest, ChatMessage), ChatError>;

    async fn list_requests(
        &self,
        user_id: i64,
        direction: RequestDirection,
        status: Option<ChatRequestStatus>,
        page: Page,
    ) -> Result<Vec<ChatRequest>, ChatError>;

    /// Fetch a request the caller participates in
    async fn get_request(&self, user_id: i64, request_id: i64) -> Result<ChatRequest, ChatError>;

    /// Accept or reject a pending request (recipient only)
    async fn respond(
        &self,
        user_id: i64,
        request_id: i64,
        accept: bool,
    ) -> Result<ChatRequest, ChatError>;

    /// Messages newest first; marks the caller's incoming messages delivered
    async fn list_messages(
        &self,
        user_id: i64,
        request_id: i64,
        page: Page,
    ) -> Result<(Vec<ChatMessage>, Vec<DeliveredMessage>), ChatError>;

    async fn send_text(
        &self,
        user_id: i64,
        request_id: i64,
        content: &str,
    ) -> Result<(ChatRequest, ChatMessage), ChatError>;

    async fn send_complex(
        &self,
        user_id: i64,
        request_id: i64,
        content: &str,
        uploads: Vec<ImageUpload>,
    ) -> Result<(ChatRequest, ChatMessage), ChatError>;

    /// Pay the other participant
    async fn send_transaction(
        &self,
        user_id: i64,
        request_id: i64,
        amount: i64,
    ) -> Result<(ChatRequest, TransferReceipt), ChatError>;

    async fn request_end(
        &self,
        user_id: i64,
        request_id: i64,
    ) -> Result<(ChatRequest, ChatMessage), ChatError>;

    async fn approve_end(
        &self,
        user_id: i64,
        request_id: i64,
    ) -> Result<(ChatRequest, ChatMessage), ChatError>;

    /// Record a delivery acknowledgement from the recipient
    async fn acknowledge_delivery(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<Option<DeliveredMessage>, ChatError>;

    /// Incoming pending requests, for the gateway READY payload
    async fn pending_incoming(&self, user_id: i64) -> Result<Vec<ChatRequest>, ChatError>;
}

/// Limits applied to chat content
#[derive(Debug, Clone)]
pub struct ChatLimits {
    pub max_transfer: i64,
    pub media: MediaSettings,
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat request not found")]
    NotFound,

    #[error("Recipient not found")]
    RecipientNotFound,

    #[error("Cannot open a chat with yourself")]
    SelfRequest,

    #[error("Recipient is not available")]
    RecipientBanned,

    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error("Message content must be at most {0} characters")]
    MessageTooLong(usize),

    #[error("Amount must be between 1 and {0}")]
    InvalidAmount(i64),

    #[error("Complex messages need between 1 and {0} images")]
    InvalidImageCount(usize),

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound => AppError::NotFound("Chat request not found".into()),
            ChatError::RecipientNotFound => AppError::NotFound("Recipient not found".into()),
            ChatError::SelfRequest | ChatError::InvalidImageCount(_) => {
                AppError::BadRequest(e.to_string())
            }
            ChatError::RecipientBanned => AppError::Forbidden(e.to_string()),
            e @ (ChatError::EmptyMessage | ChatError::MessageTooLong(_)) => {
                AppError::invalid_field("content", e.to_string())
            }
            e @ ChatError::InvalidAmount(_) => AppError::invalid_field("amount", e.to_string()),
            ChatError::Policy(violation) if violation.is_forbidden() => {
                AppError::Forbidden(violation.to_string())
            }
            ChatError::Policy(violation) => AppError::Conflict(violation.to_string()),
            ChatError::Repository(e) => e,
        }
    }
}

/// Longest text message in characters
pub const MAX_MESSAGE_LENGTH: usize = 4000;

fn checked_content(content: &str) -> Result<String, ChatError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
    }
    Ok(content.to_string())
}

/// ChatService implementation
pub struct ChatServiceImpl<C, U, M>
where
    C: ChatRepository,
    U: UserRepository,
    M: MediaStorage,
{
    chat_repo: Arc<C>,
    user_repo: Arc<U>,
    storage: Arc<M>,
    id_generator: Arc<SnowflakeGenerator>,
    limits: ChatLimits,
}

impl<C, U, M> ChatServiceImpl<C, U, M>
where
    C: ChatRepository,
    U: UserRepository,
    M: MediaStorage,
{
    pub fn new(
        chat_repo: Arc<C>,
        user_repo: Arc<U>,
        storage: Arc<M>,
        id_generator: Arc<SnowflakeGenerator>,
        limits: ChatLimits,
    ) -> Self {
        Self {
            chat_repo,
            user_repo,
            storage,
            id_generator,
            limits,
        }
    }

    async fn find_request(&self, request_id: i64) -> Result<ChatRequest, ChatError> {
        self.chat_repo
            .find_request(request_id)
            .await?
            .ok_or(ChatError::NotFound)
    }

    /// Load a request and check that `user_id` may perform `action` on it.
    async fn authorize(
        &self,
        user_id: i64,
        request_id: i64,
        action: ChatAction,
    ) -> Result<ChatRequest, ChatError> {
        let request = self.find_request(request_id).await?;
        ChatPolicy::check(&request, user_id, action)?;
        Ok(request)
    }

    fn new_message(&self, request_id: i64, sender_id: i64, kind: MessageKind) -> ChatMessage {
        ChatMessage::new(self.id_generator.generate(), request_id, sender_id, kind)
    }
}

#[async_trait]
impl<C, U, M> ChatService for ChatServiceImpl<C, U, M>
where
    C: ChatRepository + 'static,
    U: UserRepository + 'static,
    M: MediaStorage + 'static,
{
    async fn create_request(
        &self,
        requester_id: i64,
        recipient_id: i64,
        message: &str,
    ) -> Result<(ChatRequest, ChatMessage), ChatError> {
        if requester_id == recipient_id {
            return Err(ChatError::SelfRequest);
        }
        let content = checked_content(message)?;

        let recipient = self
            .user_repo
            .find_by_id(recipient_id)
            .await?
            .ok_or(ChatError::RecipientNotFound)?;
        if recipient.banned {
            return Err(ChatError::RecipientBanned);
        }

        let now = chrono::Utc::now();
        let request = ChatRequest {
            id: self.id_generator.generate(),
            requester_id,
            recipient_id,
            status: ChatRequestStatus::Pending,
            end_requested_by: None,
            created_at: now,
            updated_at: now,
        };
        let first_message = self
            .new_message(request.id, requester_id, MessageKind::Text)
            .with_content(content);

        let created = self.chat_repo.create_request(&request, &first_message).await?;
        tracing::info!(request_id = created.id, requester_id, recipient_id, "Chat request created");
        Ok((created, first_message))
    }

    async fn list_requests(
        &self,
        user_id: i64,
        direction: RequestDirection,
        status: Option<ChatRequestStatus>,
        page: Page,
    ) -> Result<Vec<ChatRequest>, ChatError> {
        Ok(self
            .chat_repo
            .list_requests(user_id, direction, status, page)
            .await?)
    }

    async fn get_request(&self, user_id: i64, request_id: i64) -> Result<ChatRequest, ChatError> {
        let request = self.find_request(request_id).await?;
        if !request.is_participant(user_id) {
            return Err(PolicyViolation::NotParticipant.into());
        }
        Ok(request)
    }

    async fn respond(
        &self,
        user_id: i64,
        request_id: i64,
        accept: bool,
    ) -> Result<ChatRequest, ChatError> {
        let request = self.authorize(user_id, request_id, ChatAction::Respond).await?;

        let to = if accept {
            ChatRequestStatus::Accepted
        } else {
            ChatRequestStatus::Rejected
        };
        let updated = self
            .chat_repo
            .transition(&ChatTransition {
                request_id,
                from: request.status,
                expected_end_requested_by: request.end_requested_by,
                to,
                end_requested_by: None,
                message: None,
            })
            .await?;

        tracing::info!(request_id, user_id, status = %updated.status, "Chat request answered");
        Ok(updated)
    }

    async fn list_messages(
        &self,
        user_id: i64,
        request_id: i64,
        page: Page,
    ) -> Result<(Vec<ChatMessage>, Vec<DeliveredMessage>), ChatError> {
        self.get_request(user_id, request_id).await?;

        let delivered = self
            .chat_repo
            .mark_request_delivered(request_id, user_id)
            .await?;
        let messages = self.chat_repo.list_messages(request_id, page).await?;
        Ok((messages, delivered))
    }

    async fn send_text(
        &self,
        user_id: i64,
        request_id: i64,
        content: &str,
    ) -> Result<(ChatRequest, ChatMessage), ChatError> {
        let request = self
            .authorize(user_id, request_id, ChatAction::SendMessage)
            .await?;
        let message = self
            .new_message(request_id, user_id, MessageKind::Text)
            .with_content(checked_content(content)?);

        let stored = self.chat_repo.insert_message(&message).await?;
        Ok((request, stored))
    }

    async fn send_complex(
        &self,
        user_id: i64,
        request_id: i64,
        content: &str,
        uploads: Vec<ImageUpload>,
    ) -> Result<(ChatRequest, ChatMessage), ChatError> {
        let request = self
            .authorize(user_id, request_id, ChatAction::SendMessage)
            .await?;

        let max_images = self.limits.media.max_images_per_container;
        if uploads.is_empty() || uploads.len() > max_images {
            return Err(ChatError::InvalidImageCount(max_images));
        }
        // Complex messages may carry images only
        let content = content.trim();
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
        }

        let container_id = self.id_generator.generate();
        let images = store_uploads(
            self.storage.as_ref(),
            &self.id_generator,
            &self.limits.media,
            container_id,
            0,
            uploads,
        )
        .await?;

        let mut message = self.new_message(request_id, user_id, MessageKind::Complex);
        if !content.is_empty() {
            message.content = Some(content.to_string());
        }
        message.container_id = Some(container_id);
        message.images = images;

        let stored = self.chat_repo.insert_message(&message).await?;
        Ok((request, stored))
    }

    async fn send_transaction(
        &self,
        user_id: i64,
        request_id: i64,
        amount: i64,
    ) -> Result<(ChatRequest, TransferReceipt), ChatError> {
        let max = self.limits.max_transfer;
        let amount = Credits::positive(amount)
            .filter(|a| a.amount() <= max)
            .ok_or(ChatError::InvalidAmount(max))?;

        let request = self
            .authorize(user_id, request_id, ChatAction::SendMessage)
            .await?;
        let payee_id = request
            .counterpart_of(user_id)
            .ok_or(PolicyViolation::NotParticipant)?;

        let mut message = self.new_message(request_id, user_id, MessageKind::Transaction);
        message.amount = Some(amount);

        let receipt = self.chat_repo.transfer(&message, payee_id).await?;
        tracing::info!(
            request_id,
            payer_id = user_id,
            payee_id,
            amount = amount.amount(),
            "Chat transfer completed"
        );
        Ok((request, receipt))
    }

    async fn request_end(
        &self,
        user_id: i64,
        request_id: i64,
    ) -> Result<(ChatRequest, ChatMessage), ChatError> {
        let request = self
            .authorize(user_id, request_id, ChatAction::RequestEnd)
            .await?;
        let message = self.new_message(request_id, user_id, MessageKind::EndRequest);

        let updated = self
            .chat_repo
            .transition(&ChatTransition {
                request_id,
                from: request.status,
                expected_end_requested_by: None,
                to: ChatRequestStatus::Accepted,
                end_requested_by: Some(user_id),
                message: Some(message.clone()),
            })
            .await?;
        Ok((updated, message))
    }

    async fn approve_end(
        &self,
        user_id: i64,
        request_id: i64,
    ) -> Result<(ChatRequest, ChatMessage), ChatError> {
        let request = self
            .authorize(user_id, request_id, ChatAction::ApproveEnd)
            .await?;
        let message = self.new_message(request_id, user_id, MessageKind::EndRequestApproval);

        let updated = self
            .chat_repo
            .transition(&ChatTransition {
                request_id,
                from: request.status,
                expected_end_requested_by: request.end_requested_by,
                to: ChatRequestStatus::Ended,
                end_requested_by: request.end_requested_by,
                message: Some(message.clone()),
            })
            .await?;

        tracing::info!(request_id, user_id, "Chat ended");
        Ok((updated, message))
    }

    async fn acknowledge_delivery(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<Option<DeliveredMessage>, ChatError> {
        Ok(self.chat_repo.mark_delivered(message_id, user_id).await?)
    }

    async fn pending_incoming(&self, user_id: i64) -> Result<Vec<ChatRequest>, ChatError> {
        Ok(self
            .chat_repo
            .list_requests(
                user_id,
                RequestDirection::Incoming,
                Some(ChatRequestStatus::Pending),
                Page::new(None, Some(MAX_PAGE_SIZE)),
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::media::fixtures::PNG;
    use super::*;
    use crate::domain::{MockChatRepository, MockMediaStorage, MockUserRepository, User};
    use mockall::predicate::*;

    const REQUESTER: i64 = 1;
    const RECIPIENT: i64 = 2;
    const REQUEST_ID: i64 = 500;

    fn limits() -> ChatLimits {
        ChatLimits {
            max_transfer: 1_000,
            media: MediaSettings {
                root: "/tmp/media".into(),
                public_path: "/media".into(),
                max_image_bytes: 1024,
                max_images_per_container: 3,
            },
        }
    }

    fn request(status: ChatRequestStatus, end_requested_by: Option<i64>) -> ChatRequest {
        ChatRequest {
            id: REQUEST_ID,
            requester_id: REQUESTER,
            recipient_id: RECIPIENT,
            status,
            end_requested_by,
            ..Default::default()
        }
    }

    fn chat_with(status: ChatRequestStatus, end_requested_by: Option<i64>) -> MockChatRepository {
        let mut chat = MockChatRepository::new();
        chat.expect_find_request()
            .with(eq(REQUEST_ID))
            .returning(move |_| Ok(Some(request(status, end_requested_by))));
        chat
    }

    fn service(
        chat: MockChatRepository,
        users: MockUserRepository,
        storage: MockMediaStorage,
    ) -> ChatServiceImpl<MockChatRepository, MockUserRepository, MockMediaStorage> {
        ChatServiceImpl::new(
            Arc::new(chat),
            Arc::new(users),
            Arc::new(storage),
            Arc::new(SnowflakeGenerator::new(1, 1)),
            limits(),
        )
    }

    fn plain(chat: MockChatRepository) -> ChatServiceImpl<MockChatRepository, MockUserRepository, MockMediaStorage> {
        service(chat, MockUserRepository::new(), MockMediaStorage::new())
    }

    #[tokio::test]
    async fn test_create_request_to_self_rejected() {
        let err = plain(MockChatRepository::new())
            .create_request(REQUESTER, REQUESTER, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::SelfRequest));
    }

    #[tokio::test]
    async fn test_create_request_to_banned_user_forbidden() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                banned: true,
                ..Default::default()
            }))
        });

        let err = service(MockChatRepository::new(), users, MockMediaStorage::new())
            .create_request(REQUESTER, RECIPIENT, "hi")
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_request_stores_first_message() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                ..Default::default()
            }))
        });
        let mut chat = MockChatRepository::new();
        chat.expect_create_request()
            .withf(|req, msg| {
                req.status == ChatRequestStatus::Pending
                    && msg.request_id == req.id
                    && msg.content.as_deref() == Some("Is this still for sale?")
            })
            .times(1)
            .returning(|req, _| Ok(req.clone()));

        let (req, msg) = service(chat, users, MockMediaStorage::new())
            .create_request(REQUESTER, RECIPIENT, "  Is this still for sale?  ")
            .await
            .unwrap();
        assert_eq!(req.recipient_id, RECIPIENT);
        assert_eq!(msg.kind, MessageKind::Text);
    }

    #[tokio::test]
    async fn test_requester_cannot_accept() {
        let err = plain(chat_with(ChatRequestStatus::Pending, None))
            .respond(REQUESTER, REQUEST_ID, true)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_recipient_accepts() {
        let mut chat = chat_with(ChatRequestStatus::Pending, None);
        chat.expect_transition()
            .withf(|t| t.from == ChatRequestStatus::Pending && t.to == ChatRequestStatus::Accepted)
            .times(1)
            .returning(|_| Ok(request(ChatRequestStatus::Accepted, None)));

        let updated = plain(chat).respond(RECIPIENT, REQUEST_ID, true).await.unwrap();
        assert_eq!(updated.status, ChatRequestStatus::Accepted);
    }

    #[tokio::test]
    async fn test_message_on_pending_request_conflicts() {
        let err = plain(chat_with(ChatRequestStatus::Pending, None))
            .send_text(REQUESTER, REQUEST_ID, "hello")
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_outsider_cannot_read_messages() {
        let err = plain(chat_with(ChatRequestStatus::Accepted, None))
            .list_messages(99, REQUEST_ID, Page::default())
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_list_messages_marks_delivered() {
        let mut chat = chat_with(ChatRequestStatus::Accepted, None);
        chat.expect_mark_request_delivered()
            .with(eq(REQUEST_ID), eq(RECIPIENT))
            .times(1)
            .returning(|request_id, _| {
                Ok(vec![DeliveredMessage {
                    message_id: 7,
                    request_id,
                    sender_id: REQUESTER,
                }])
            });
        chat.expect_list_messages().returning(|_, _| Ok(vec![]));

        let (_, delivered) = plain(chat)
            .list_messages(RECIPIENT, REQUEST_ID, Page::default())
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].sender_id, REQUESTER);
    }

    #[tokio::test]
    async fn test_transaction_pays_counterpart() {
        let mut chat = chat_with(ChatRequestStatus::Accepted, None);
        chat.expect_transfer()
            .withf(|msg, payee| {
                *payee == RECIPIENT
                    && msg.kind == MessageKind::Transaction
                    && msg.amount == Some(Credits::new(250))
            })
            .times(1)
            .returning(|msg, _| {
                Ok(TransferReceipt {
                    message: msg.clone(),
                    payer_balance: Credits::new(750),
                    payee_balance: Credits::new(1250),
                })
            });

        let (_, receipt) = plain(chat)
            .send_transaction(REQUESTER, REQUEST_ID, 250)
            .await
            .unwrap();
        assert_eq!(receipt.payer_balance, Credits::new(750));
    }

    #[tokio::test]
    async fn test_transaction_amount_bounds() {
        for amount in [0, -5, 1_001] {
            let err = plain(MockChatRepository::new())
                .send_transaction(REQUESTER, REQUEST_ID, amount)
                .await
                .unwrap_err();
            assert!(matches!(err, ChatError::InvalidAmount(1_000)));
        }
    }

    #[tokio::test]
    async fn test_insufficient_funds_passes_through() {
        let mut chat = chat_with(ChatRequestStatus::Accepted, None);
        chat.expect_transfer()
            .returning(|_, _| Err(AppError::InsufficientFunds("Balance too low".into())));

        let err = plain(chat)
            .send_transaction(REQUESTER, REQUEST_ID, 10)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::InsufficientFunds(_)));
    }

    #[tokio::test]
    async fn test_end_request_records_requester() {
        let mut chat = chat_with(ChatRequestStatus::Accepted, None);
        chat.expect_transition()
            .withf(|t| {
                t.end_requested_by == Some(REQUESTER)
                    && t.to == ChatRequestStatus::Accepted
                    && t.message.as_ref().map(|m| m.kind) == Some(MessageKind::EndRequest)
            })
            .times(1)
            .returning(|_| Ok(request(ChatRequestStatus::Accepted, Some(REQUESTER))));

        let (updated, message) = plain(chat).request_end(REQUESTER, REQUEST_ID).await.unwrap();
        assert_eq!(updated.end_requested_by, Some(REQUESTER));
        assert_eq!(message.kind, MessageKind::EndRequest);
    }

    #[tokio::test]
    async fn test_end_requester_cannot_approve() {
        let err = plain(chat_with(ChatRequestStatus::Accepted, Some(REQUESTER)))
            .approve_end(REQUESTER, REQUEST_ID)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Policy(PolicyViolation::OwnEndRequest)));
    }

    #[tokio::test]
    async fn test_other_side_approves_end() {
        let mut chat = chat_with(ChatRequestStatus::Accepted, Some(REQUESTER));
        chat.expect_transition()
            .withf(|t| t.to == ChatRequestStatus::Ended && t.expected_end_requested_by == Some(REQUESTER))
            .times(1)
            .returning(|_| Ok(request(ChatRequestStatus::Ended, Some(REQUESTER))));

        let (updated, message) = plain(chat).approve_end(RECIPIENT, REQUEST_ID).await.unwrap();
        assert_eq!(updated.status, ChatRequestStatus::Ended);
        assert_eq!(message.kind, MessageKind::EndRequestApproval);
    }

    #[tokio::test]
    async fn test_complex_message_requires_images() {
        let err = plain(chat_with(ChatRequestStatus::Accepted, None))
            .send_complex(REQUESTER, REQUEST_ID, "look", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidImageCount(3)));
    }

    #[tokio::test]
    async fn test_complex_message_stores_images() {
        let mut chat = chat_with(ChatRequestStatus::Accepted, None);
        chat.expect_insert_message()
            .withf(|m| m.kind == MessageKind::Complex && m.images.len() == 2 && m.container_id.is_some())
            .times(1)
            .returning(|m| Ok(m.clone()));
        let mut storage = MockMediaStorage::new();
        storage.expect_store().times(2).returning(|_, _| Ok("f.png".into()));

        let (_, message) = service(chat, MockUserRepository::new(), storage)
            .send_complex(
                REQUESTER,
                REQUEST_ID,
                "two photos",
                vec![ImageUpload::new(PNG), ImageUpload::new(PNG)],
            )
            .await
            .unwrap();
        assert_eq!(message.content.as_deref(), Some("two photos"));
    }
}
