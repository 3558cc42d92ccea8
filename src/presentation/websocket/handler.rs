//! WebSocket Connection Handler
//!
//! One task per connection: Hello, Identify within the timeout, READY, then
//! a select loop over client frames and the heartbeat deadline. Outgoing
//! frames go through an mpsc channel drained by a writer task.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use super::gateway::{GatewayEvent, MessageDeliveredEvent, TypingStartEvent};
use super::messages::{
    DeliveryAckPayload, GatewayReceive, GatewaySend, IdentifyPayload, OpCode, ReadyPayload,
    TypingPayload,
};
use super::session::{SessionState, HEARTBEAT_GRACE};
use crate::application::dto::response::{ChatRequestResponse, UserResponse};
use crate::application::services::{ChatService, UserService};
use crate::domain::{ChatRequest, ChatRequestStatus, User, Wallet};
use crate::presentation::middleware::auth::{authenticate, AuthUser};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let settings = &state.settings.websocket;
    ws.max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    tracing::debug!(session_id = %session_id, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewaySend>();

    // Forward queued frames to the socket
    let sender_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let identify_timeout = Duration::from_secs(state.settings.websocket.identify_timeout_secs);
    let auth = match handshake(
        &mut receiver,
        &tx,
        state.gateway.heartbeat_interval(),
        identify_timeout,
        &state.settings.jwt.secret,
        &session_id,
    )
    .await
    {
        Ok(auth) => auth,
        Err(HandshakeEnd::Closed) => {
            sender_task.abort();
            return;
        }
        Err(HandshakeEnd::Refused) => {
            close_after_flush(tx, sender_task).await;
            return;
        }
    };

    let ready = match ready_payload(&state, auth, &session_id).await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::debug!(session_id = %session_id, error = %e, "Identify refused");
            let _ = tx.send(GatewaySend::invalid_session());
            close_after_flush(tx, sender_task).await;
            return;
        }
    };

    let mut session = SessionState::new(session_id.clone(), auth.user_id);

    // Register before READY so nothing dispatched in between is lost
    state
        .gateway
        .register_session(session_id.clone(), auth.user_id, tx.clone());

    let ready_data = match serde_json::to_value(&ready) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize READY");
            state.gateway.unregister_session(&session_id);
            sender_task.abort();
            return;
        }
    };
    if !state.gateway.send_to_session(&session_id, "READY", ready_data) {
        state.gateway.unregister_session(&session_id);
        sender_task.abort();
        return;
    }

    tracing::info!(
        user_id = auth.user_id,
        session_id = %session_id,
        "User connected and identified"
    );

    let heartbeat_interval = Duration::from_millis(state.gateway.heartbeat_interval());
    let mut heartbeat_check = interval(heartbeat_interval + HEARTBEAT_GRACE);
    heartbeat_check.tick().await;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_message(&text, &mut session, &tx, &state).await {
                            tracing::debug!(
                                session_id = %session_id,
                                error = %e,
                                "Error handling message"
                            );
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(session_id = %session_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }

            _ = heartbeat_check.tick() => {
                if !session.is_alive(heartbeat_interval) {
                    tracing::info!(
                        session_id = %session_id,
                        "Heartbeat timeout, closing connection"
                    );
                    break;
                }
            }
        }
    }

    state.gateway.unregister_session(&session_id);
    sender_task.abort();

    tracing::info!(
        user_id = auth.user_id,
        session_id = %session_id,
        "User disconnected"
    );
}

/// How a connection left the handshake without identifying.
#[derive(Debug, PartialEq, Eq)]
enum HandshakeEnd {
    /// Client went away; nothing left to send
    Closed,
    /// InvalidSession has been queued
    Refused,
}

/// Send Hello and wait for an Identify carrying a valid access token.
async fn handshake<S, E>(
    receiver: &mut S,
    tx: &mpsc::UnboundedSender<GatewaySend>,
    heartbeat_interval: u64,
    identify_timeout: Duration,
    jwt_secret: &str,
    session_id: &str,
) -> Result<AuthUser, HandshakeEnd>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
{
    let _ = tx.send(GatewaySend::hello(heartbeat_interval));

    let identify = match timeout(identify_timeout, wait_for_identify(receiver)).await {
        Ok(Some(identify)) => identify,
        Ok(None) => {
            tracing::debug!(session_id = %session_id, "Connection closed before Identify");
            return Err(HandshakeEnd::Closed);
        }
        Err(_) => {
            tracing::debug!(session_id = %session_id, "Identify timeout");
            let _ = tx.send(GatewaySend::invalid_session());
            return Err(HandshakeEnd::Refused);
        }
    };

    authenticate(&identify.token, jwt_secret).map_err(|e| {
        tracing::debug!(session_id = %session_id, error = %e, "Invalid token");
        let _ = tx.send(GatewaySend::invalid_session());
        HandshakeEnd::Refused
    })
}

/// Read frames until an Identify arrives. Other opcodes are ignored.
async fn wait_for_identify<S, E>(receiver: &mut S) -> Option<IdentifyPayload>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
{
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(frame) = serde_json::from_str::<GatewayReceive>(&text) else {
                    continue;
                };
                if OpCode::from_u8(frame.op) == Some(OpCode::Identify) {
                    if let Some(identify) = frame.payload::<IdentifyPayload>() {
                        return Some(identify);
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            _ => continue,
        }
    }
    None
}

/// Drop our sender and give the writer a moment to flush what is queued.
async fn close_after_flush(
    tx: mpsc::UnboundedSender<GatewaySend>,
    sender_task: tokio::task::JoinHandle<()>,
) {
    drop(tx);
    let _ = timeout(Duration::from_millis(500), sender_task).await;
}

async fn ready_payload(
    state: &AppState,
    auth: AuthUser,
    session_id: &str,
) -> Result<ReadyPayload, AppError> {
    let (user, wallet) = identified_user(&state.user_service(), auth.user_id).await?;
    let pending = state.chat_service().pending_incoming(auth.user_id).await?;

    Ok(ReadyPayload {
        user: UserResponse::with_wallet(user, &wallet),
        session_id: session_id.to_string(),
        pending_requests: pending.into_iter().map(ChatRequestResponse::from).collect(),
    })
}

/// Load the identifying user; banned accounts never get READY.
async fn identified_user<U: UserService>(
    users: &U,
    user_id: i64,
) -> Result<(User, Wallet), AppError> {
    let (user, wallet) = users.get_me(user_id).await?;
    if user.banned {
        return Err(AppError::Forbidden("Account is banned".into()));
    }
    Ok((user, wallet))
}

/// Who should see a typing indicator, if anyone.
fn typing_recipient(request: &ChatRequest, user_id: i64) -> Option<i64> {
    if request.status != ChatRequestStatus::Accepted {
        return None;
    }
    request.counterpart_of(user_id)
}

/// Handle incoming WebSocket message
async fn handle_message(
    text: &str,
    session: &mut SessionState,
    tx: &mpsc::UnboundedSender<GatewaySend>,
    state: &AppState,
) -> Result<(), AppError> {
    let frame: GatewayReceive = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))?;

    match OpCode::from_u8(frame.op) {
        Some(OpCode::Heartbeat) => {
            session.heartbeat();
            let _ = tx.send(GatewaySend::heartbeat_ack());
            tracing::trace!(session_id = %session.session_id, "Heartbeat received");
        }

        Some(OpCode::Typing) => {
            let request_id = frame
                .payload::<TypingPayload>()
                .and_then(|p| p.request_id.to_i64())
                .ok_or_else(|| AppError::BadRequest("Invalid typing payload".into()))?;

            let request = state
                .chat_service()
                .get_request(session.user_id, request_id)
                .await?;
            if let Some(other) = typing_recipient(&request, session.user_id) {
                let event = GatewayEvent::TypingStart(TypingStartEvent {
                    request_id: request.id.to_string(),
                    user_id: session.user_id.to_string(),
                    timestamp: chrono::Utc::now().timestamp(),
                });
                state.gateway.dispatch_to_users(&event, &[other]);
            }
        }

        Some(OpCode::DeliveryAck) => {
            let message_id = frame
                .payload::<DeliveryAckPayload>()
                .and_then(|p| p.message_id.to_i64())
                .ok_or_else(|| AppError::BadRequest("Invalid delivery ack payload".into()))?;

            state.gateway.acknowledge_delivery(session.user_id, message_id);

            let delivered = state
                .chat_service()
                .acknowledge_delivery(session.user_id, message_id)
                .await?;
            if let Some(delivered) = delivered {
                let event = GatewayEvent::MessageDelivered(MessageDeliveredEvent::new(
                    &delivered,
                    session.user_id,
                ));
                state
                    .gateway
                    .dispatch_to_users(&event, &[delivered.sender_id]);
            }
        }

        Some(OpCode::Identify) => {
            tracing::debug!(session_id = %session.session_id, "Ignoring repeated Identify");
        }

        _ => {
            tracing::debug!(
                session_id = %session.session_id,
                op = frame.op,
                "Unknown or server-only opcode"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{Claims, UserServiceImpl};
    use crate::domain::{
        Credits, MockSubscriptionRepository, MockUserRepository, MockWalletRepository, UserRole,
    };
    use futures::stream;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::Arc;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";
    const HEARTBEAT: u64 = 45_000;

    type Frames = Vec<Result<Message, axum::Error>>;

    fn text(json: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(json.to_string().into()))
    }

    fn identify(token: &str) -> Result<Message, axum::Error> {
        text(&format!(r#"{{"op":2,"d":{{"token":"{}"}}}}"#, token))
    }

    fn token_for(user_id: i64) -> String {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: UserRole::User,
            exp: (now + chrono::Duration::minutes(5)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<GatewaySend>) -> Vec<GatewaySend> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    async fn run_handshake(
        receiver: &mut (impl Stream<Item = Result<Message, axum::Error>> + Unpin),
        identify_timeout: Duration,
    ) -> (Result<AuthUser, HandshakeEnd>, Vec<GatewaySend>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = handshake(receiver, &tx, HEARTBEAT, identify_timeout, SECRET, "s-1").await;
        (outcome, drain(&mut rx))
    }

    #[tokio::test]
    async fn test_handshake_identifies_after_hello() {
        let frames: Frames = vec![
            text("not json"),
            text(r#"{"op":1,"d":null}"#),
            identify(&token_for(7)),
        ];
        let mut receiver = stream::iter(frames);

        let (outcome, sent) = run_handshake(&mut receiver, Duration::from_secs(1)).await;
        assert_eq!(outcome.unwrap().user_id, 7);
        assert_eq!(sent, vec![GatewaySend::hello(HEARTBEAT)]);
    }

    #[tokio::test]
    async fn test_handshake_times_out_with_invalid_session() {
        let mut receiver = stream::pending::<Result<Message, axum::Error>>();

        let (outcome, sent) = run_handshake(&mut receiver, Duration::from_millis(20)).await;
        assert_eq!(outcome, Err(HandshakeEnd::Refused));
        assert_eq!(
            sent,
            vec![GatewaySend::hello(HEARTBEAT), GatewaySend::invalid_session()]
        );
    }

    #[tokio::test]
    async fn test_handshake_refuses_bad_token() {
        let frames: Frames = vec![identify("not-a-jwt")];
        let mut receiver = stream::iter(frames);

        let (outcome, sent) = run_handshake(&mut receiver, Duration::from_secs(1)).await;
        assert_eq!(outcome, Err(HandshakeEnd::Refused));
        assert_eq!(sent.last(), Some(&GatewaySend::invalid_session()));
    }

    #[tokio::test]
    async fn test_handshake_closed_before_identify() {
        let frames: Frames = vec![Ok(Message::Close(None))];
        let mut receiver = stream::iter(frames);

        let (outcome, sent) = run_handshake(&mut receiver, Duration::from_secs(1)).await;
        assert_eq!(outcome, Err(HandshakeEnd::Closed));
        assert_eq!(sent, vec![GatewaySend::hello(HEARTBEAT)]);
    }

    fn users_with(
        banned: bool,
    ) -> UserServiceImpl<MockUserRepository, MockWalletRepository, MockSubscriptionRepository> {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |id| {
            Ok(Some(User {
                id,
                username: "seller".into(),
                banned,
                ..Default::default()
            }))
        });
        let mut wallets = MockWalletRepository::new();
        wallets.expect_find_by_user().returning(|user_id| {
            Ok(Some(Wallet {
                user_id,
                balance: Credits::new(50),
                updated_at: chrono::Utc::now(),
            }))
        });
        UserServiceImpl::new(
            Arc::new(users),
            Arc::new(wallets),
            Arc::new(MockSubscriptionRepository::new()),
            10_000,
        )
    }

    #[tokio::test]
    async fn test_banned_user_is_refused() {
        let err = identified_user(&users_with(true), 7).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let (user, wallet) = identified_user(&users_with(false), 7).await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(wallet.balance, Credits::new(50));
    }

    fn request(status: ChatRequestStatus) -> ChatRequest {
        ChatRequest {
            id: 1,
            requester_id: 10,
            recipient_id: 20,
            status,
            end_requested_by: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_typing_only_relayed_on_accepted_chat() {
        assert_eq!(typing_recipient(&request(ChatRequestStatus::Accepted), 10), Some(20));
        assert_eq!(typing_recipient(&request(ChatRequestStatus::Accepted), 20), Some(10));
        for status in [
            ChatRequestStatus::Pending,
            ChatRequestStatus::Rejected,
            ChatRequestStatus::Ended,
        ] {
            assert_eq!(typing_recipient(&request(status), 10), None);
        }
    }

    fn test_state() -> AppState {
        let settings = crate::config::Settings::for_tests().unwrap();
        let pool = crate::infrastructure::database::create_lazy_pool(&settings.database).unwrap();
        AppState::new(settings, pool, None)
    }

    #[tokio::test]
    async fn test_heartbeat_is_acknowledged() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = SessionState::new("s-1".into(), 7);

        handle_message(r#"{"op":1,"d":null}"#, &mut session, &tx, &state)
            .await
            .unwrap();
        assert_eq!(drain(&mut rx), vec![GatewaySend::heartbeat_ack()]);
    }

    #[tokio::test]
    async fn test_repeated_identify_is_ignored() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = SessionState::new("s-1".into(), 7);
        let frame = format!(r#"{{"op":2,"d":{{"token":"{}"}}}}"#, token_for(99));

        handle_message(&frame, &mut session, &tx, &state).await.unwrap();
        assert_eq!(session.user_id, 7);
        assert!(drain(&mut rx).is_empty());
    }
}
