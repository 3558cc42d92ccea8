//! Chat Repository Implementation
//!
//! Status changes are compare-and-set updates so that two participants
//! racing on the same request cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::image_repository::{create_container, insert_images, load_images};
use super::ledger;
use crate::domain::{
    ChatMessage, ChatRepository, ChatRequest, ChatRequestStatus, ChatTransition, Credits,
    DeliveredMessage, MessageKind, RequestDirection, TransferReceipt, WalletTransactionKind,
};
use crate::shared::error::{conflict_on_unique, AppError};
use crate::shared::pagination::Page;

const REQUEST_COLUMNS: &str =
    "id, requester_id, recipient_id, status, end_requested_by, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, request_id, sender_id, kind, content, amount, container_id, delivered_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ChatRequestRow {
    id: i64,
    requester_id: i64,
    recipient_id: i64,
    status: String,
    end_requested_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRequestRow {
    fn into_request(self) -> ChatRequest {
        ChatRequest {
            id: self.id,
            requester_id: self.requester_id,
            recipient_id: self.recipient_id,
            status: ChatRequestStatus::from_str(&self.status),
            end_requested_by: self.end_requested_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    request_id: i64,
    sender_id: i64,
    kind: String,
    content: Option<String>,
    amount: Option<i64>,
    container_id: Option<i64>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ChatMessageRow {
    fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            request_id: self.request_id,
            sender_id: self.sender_id,
            kind: MessageKind::from_str(&self.kind),
            content: self.content,
            amount: self.amount.map(Credits::new),
            container_id: self.container_id,
            images: Vec::new(),
            delivered_at: self.delivered_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveredRow {
    id: i64,
    request_id: i64,
    sender_id: i64,
}

impl From<DeliveredRow> for DeliveredMessage {
    fn from(row: DeliveredRow) -> Self {
        Self {
            message_id: row.id,
            request_id: row.request_id,
            sender_id: row.sender_id,
        }
    }
}

async fn write_message(
    conn: &mut PgConnection,
    message: &ChatMessage,
) -> Result<ChatMessage, AppError> {
    let row = sqlx::query_as::<_, ChatMessageRow>(&format!(
        r#"
        INSERT INTO chat_messages (id, request_id, sender_id, kind, content, amount,
                                   container_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        MESSAGE_COLUMNS
    ))
    .bind(message.id)
    .bind(message.request_id)
    .bind(message.sender_id)
    .bind(message.kind.as_str())
    .bind(&message.content)
    .bind(message.amount.map(i64::from))
    .bind(message.container_id)
    .bind(message.created_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into_message())
}

/// Lock an accepted request for the rest of the transaction.
async fn lock_accepted(conn: &mut PgConnection, request_id: i64) -> Result<(), AppError> {
    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM chat_requests WHERE id = $1 FOR SHARE",
    )
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Chat request {} not found", request_id)))?;

    if ChatRequestStatus::from_str(&status) != ChatRequestStatus::Accepted {
        return Err(AppError::Conflict(format!(
            "Chat request is {}, messages need an accepted chat",
            status
        )));
    }
    Ok(())
}

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn create_request(
        &self,
        request: &ChatRequest,
        first_message: &ChatMessage,
    ) -> Result<ChatRequest, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ChatRequestRow>(&format!(
            r#"
            INSERT INTO chat_requests (id, requester_id, recipient_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.id)
        .bind(request.requester_id)
        .bind(request.recipient_id)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "An open chat request already exists between you"))?;

        write_message(&mut tx, first_message).await?;
        tx.commit().await?;

        Ok(row.into_request())
    }

    async fn find_request(&self, id: i64) -> Result<Option<ChatRequest>, AppError> {
        let row = sqlx::query_as::<_, ChatRequestRow>(&format!(
            "SELECT {} FROM chat_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_request()))
    }

    async fn list_requests(
        &self,
        user_id: i64,
        direction: RequestDirection,
        status: Option<ChatRequestStatus>,
        page: Page,
    ) -> Result<Vec<ChatRequest>, AppError> {
        let side = match direction {
            RequestDirection::Incoming => "recipient_id = $1",
            RequestDirection::Outgoing => "requester_id = $1",
            RequestDirection::All => "(requester_id = $1 OR recipient_id = $1)",
        };

        let rows = sqlx::query_as::<_, ChatRequestRow>(&format!(
            r#"
            SELECT {}
            FROM chat_requests
            WHERE {}
              AND ($2::text IS NULL OR status = $2)
              AND id < $3
            ORDER BY id DESC
            LIMIT $4
            "#,
            REQUEST_COLUMNS, side
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_request()).collect())
    }

    async fn transition(&self, transition: &ChatTransition) -> Result<ChatRequest, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ChatRequestRow>(&format!(
            r#"
            UPDATE chat_requests
            SET status = $4, end_requested_by = $5, updated_at = NOW()
            WHERE id = $1
              AND status = $2
              AND end_requested_by IS NOT DISTINCT FROM $3
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(transition.request_id)
        .bind(transition.from.as_str())
        .bind(transition.expected_end_requested_by)
        .bind(transition.to.as_str())
        .bind(transition.end_requested_by)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Chat request was changed by someone else".into()))?;

        if let Some(message) = &transition.message {
            write_message(&mut tx, message).await?;
        }

        tx.commit().await?;
        Ok(row.into_request())
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<ChatMessage, AppError> {
        let mut tx = self.pool.begin().await?;

        lock_accepted(&mut tx, message.request_id).await?;

        let mut images = Vec::new();
        if let Some(container_id) = message.container_id {
            // Fresh container; the service already bounded the upload count
            create_container(&mut tx, container_id, message.sender_id).await?;
            images = insert_images(&mut tx, container_id, &message.images, None).await?;
        }

        let mut stored = write_message(&mut tx, message).await?;
        tx.commit().await?;

        stored.images = images;
        Ok(stored)
    }

    async fn transfer(
        &self,
        message: &ChatMessage,
        payee_id: i64,
    ) -> Result<TransferReceipt, AppError> {
        let amount = message
            .amount
            .ok_or_else(|| AppError::invalid_field("amount", "Transaction message without amount"))?;

        let mut tx = self.pool.begin().await?;

        lock_accepted(&mut tx, message.request_id).await?;
        let stored = write_message(&mut tx, message).await?;
        let (payer_balance, payee_balance) = ledger::transfer(
            &mut tx,
            message.sender_id,
            payee_id,
            amount,
            WalletTransactionKind::Transfer,
            message.id,
        )
        .await?;

        tx.commit().await?;

        Ok(TransferReceipt {
            message: stored,
            payer_balance,
            payee_balance,
        })
    }

    async fn list_messages(
        &self,
        request_id: i64,
        page: Page,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            r#"
            SELECT {}
            FROM chat_messages
            WHERE request_id = $1 AND id < $2
            ORDER BY id DESC
            LIMIT $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(request_id)
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        let container_ids: Vec<i64> = rows.iter().filter_map(|r| r.container_id).collect();
        let mut images = load_images(&self.pool, &container_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut message = row.into_message();
                if let Some(container_id) = message.container_id {
                    message.images = images.remove(&container_id).unwrap_or_default();
                }
                message
            })
            .collect())
    }

    async fn mark_request_delivered(
        &self,
        request_id: i64,
        recipient_id: i64,
    ) -> Result<Vec<DeliveredMessage>, AppError> {
        let rows = sqlx::query_as::<_, DeliveredRow>(
            r#"
            UPDATE chat_messages m
            SET delivered_at = NOW()
            FROM chat_requests r
            WHERE m.request_id = $1
              AND r.id = m.request_id
              AND (r.requester_id = $2 OR r.recipient_id = $2)
              AND m.sender_id <> $2
              AND m.delivered_at IS NULL
            RETURNING m.id, m.request_id, m.sender_id
            "#,
        )
        .bind(request_id)
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DeliveredMessage::from).collect())
    }

    async fn mark_delivered(
        &self,
        message_id: i64,
        recipient_id: i64,
    ) -> Result<Option<DeliveredMessage>, AppError> {
        let row = sqlx::query_as::<_, DeliveredRow>(
            r#"
            UPDATE chat_messages m
            SET delivered_at = NOW()
            FROM chat_requests r
            WHERE m.id = $1
              AND r.id = m.request_id
              AND (r.requester_id = $2 OR r.recipient_id = $2)
              AND m.sender_id <> $2
              AND m.delivered_at IS NULL
            RETURNING m.id, m.request_id, m.sender_id
            "#,
        )
        .bind(message_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DeliveredMessage::from))
    }
}
