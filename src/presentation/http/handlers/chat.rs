//! Chat Handlers
//!
//! Every created message and status change is also pushed over the gateway.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    ChatRequestQuery, CreateChatRequest, RateRequest, SendMessageRequest, TransactionRequest,
};
use crate::application::dto::response::{
    ChatMessageResponse, ChatRequestResponse, RatingResponse, TransferResponse,
};
use crate::application::services::{ChatService, RatingService};
use crate::domain::{ChatMessage, ChatRequest, ChatRequestStatus, RequestDirection};
use crate::infrastructure::metrics;
use crate::presentation::http::extractors::UploadForm;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::{GatewayEvent, MessageDeliveredEvent, WalletUpdateEvent};
use crate::shared::error::AppError;
use crate::shared::pagination::{CursorQuery, Page, Paginated};
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

type Created<T> = (StatusCode, Json<T>);

impl AppState {
    fn message_response(&self, message: ChatMessage) -> ChatMessageResponse {
        ChatMessageResponse::from_message(message, &self.settings.media.public_path)
    }

    /// Push a new message to the other participant and the sender's other sessions.
    fn push_message(&self, request: &ChatRequest, message: ChatMessageResponse, sender_id: i64) {
        if let Some(recipient_id) = request.counterpart_of(sender_id) {
            self.gateway.dispatch_message(message, sender_id, recipient_id);
        }
    }

    fn push_request_update(&self, request: &ChatRequest) {
        self.gateway.dispatch_to_users(
            &GatewayEvent::ChatRequestUpdate(ChatRequestResponse::from(request.clone())),
            &request.participants(),
        );
    }
}

/// Open a chat request with a first message
pub async fn create_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateChatRequest>,
) -> Result<Created<ChatRequestResponse>, AppError> {
    validate_body(&body)?;
    let recipient_id = parse_id(&body.recipient_id, "recipient")?;

    let (request, message) = state
        .chat_service()
        .create_request(auth.user_id, recipient_id, &body.message)
        .await?;

    let response = ChatRequestResponse::from(request.clone());
    state.gateway.dispatch_to_users(
        &GatewayEvent::ChatRequestCreate(response.clone()),
        &request.participants(),
    );
    state.push_message(&request, state.message_response(message), auth.user_id);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Requests involving the caller
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChatRequestQuery>,
) -> Result<Json<Paginated<ChatRequestResponse>>, AppError> {
    let page = Page::try_from(query.cursor())?;
    let direction = match query.role.as_deref().filter(|r| !r.is_empty()) {
        None => RequestDirection::All,
        Some(raw) => RequestDirection::parse(raw).ok_or_else(|| {
            AppError::invalid_field("role", "Role must be incoming, outgoing or all")
        })?,
    };
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|raw| {
            ChatRequestStatus::parse(raw).ok_or_else(|| {
                AppError::invalid_field(
                    "status",
                    "Status must be pending, accepted, rejected or ended",
                )
            })
        })
        .transpose()?;

    let requests = state
        .chat_service()
        .list_requests(auth.user_id, direction, status, page)
        .await?;

    Ok(Json(
        Paginated::from_items(requests, &page, |r| r.id).map(ChatRequestResponse::from),
    ))
}

/// One request the caller participates in
pub async fn get_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<ChatRequestResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;
    let request = state
        .chat_service()
        .get_request(auth.user_id, request_id)
        .await?;
    Ok(Json(ChatRequestResponse::from(request)))
}

async fn respond(
    state: AppState,
    auth: AuthUser,
    request_id: String,
    accept: bool,
) -> Result<Json<ChatRequestResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;

    let request = state
        .chat_service()
        .respond(auth.user_id, request_id, accept)
        .await?;

    state.push_request_update(&request);

    Ok(Json(ChatRequestResponse::from(request)))
}

/// Accept a pending request (recipient only)
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<ChatRequestResponse>, AppError> {
    respond(state, auth, request_id, true).await
}

/// Reject a pending request (recipient only)
pub async fn reject_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<ChatRequestResponse>, AppError> {
    respond(state, auth, request_id, false).await
}

/// Message history, newest first; marks the caller's incoming messages delivered
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
    Query(cursor): Query<CursorQuery>,
) -> Result<Json<Paginated<ChatMessageResponse>>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;
    let page = Page::try_from(cursor)?;

    let (messages, delivered) = state
        .chat_service()
        .list_messages(auth.user_id, request_id, page)
        .await?;

    for delivered in delivered {
        state
            .gateway
            .acknowledge_delivery(auth.user_id, delivered.message_id);
        state.gateway.dispatch_to_users(
            &GatewayEvent::MessageDelivered(MessageDeliveredEvent::new(&delivered, auth.user_id)),
            &[delivered.sender_id],
        );
    }

    Ok(Json(
        Paginated::from_items(messages, &page, |m| m.id).map(|m| state.message_response(m)),
    ))
}

/// Text message
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Created<ChatMessageResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;
    validate_body(&body)?;

    let (request, message) = state
        .chat_service()
        .send_text(auth.user_id, request_id, &body.content)
        .await?;

    let response = state.message_response(message);
    state.push_message(&request, response.clone(), auth.user_id);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Text plus images, as multipart `content` and `file` parts
pub async fn send_complex_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
    form: UploadForm,
) -> Result<Created<ChatMessageResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;
    let content = form.content.unwrap_or_default();

    let (request, message) = state
        .chat_service()
        .send_complex(auth.user_id, request_id, &content, form.files)
        .await?;

    let response = state.message_response(message);
    state.push_message(&request, response.clone(), auth.user_id);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Pay the other participant
pub async fn send_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
    Json(body): Json<TransactionRequest>,
) -> Result<Created<TransferResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;
    validate_body(&body)?;

    let (request, receipt) = state
        .chat_service()
        .send_transaction(auth.user_id, request_id, body.amount)
        .await?;
    metrics::record_wallet_transfer("transfer");

    let response = state.message_response(receipt.message);
    state.push_message(&request, response.clone(), auth.user_id);

    if let Some(payee_id) = request.counterpart_of(auth.user_id) {
        for (user_id, balance) in [
            (auth.user_id, receipt.payer_balance),
            (payee_id, receipt.payee_balance),
        ] {
            state.gateway.dispatch_to_users(
                &GatewayEvent::WalletUpdate(WalletUpdateEvent {
                    balance: balance.amount(),
                }),
                &[user_id],
            );
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(TransferResponse {
            message: response,
            balance: receipt.payer_balance.amount(),
        }),
    ))
}

/// Ask to end the chat
pub async fn request_end(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<ChatRequestResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;

    let (request, message) = state
        .chat_service()
        .request_end(auth.user_id, request_id)
        .await?;

    state.push_request_update(&request);
    state.push_message(&request, state.message_response(message), auth.user_id);

    Ok(Json(ChatRequestResponse::from(request)))
}

/// Approve the other side's end request
pub async fn approve_end(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<ChatRequestResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;

    let (request, message) = state
        .chat_service()
        .approve_end(auth.user_id, request_id)
        .await?;

    state.push_request_update(&request);
    state.push_message(&request, state.message_response(message), auth.user_id);

    Ok(Json(ChatRequestResponse::from(request)))
}

/// Rate the other participant of an ended chat
pub async fn rate_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(request_id): Path<String>,
    Json(body): Json<RateRequest>,
) -> Result<Created<RatingResponse>, AppError> {
    let request_id = parse_id(&request_id, "chat request")?;
    validate_body(&body)?;

    let rating = state
        .rating_service()
        .rate(auth.user_id, request_id, body.score, body.comment)
        .await?;

    Ok((StatusCode::CREATED, Json(RatingResponse::from(rating))))
}
