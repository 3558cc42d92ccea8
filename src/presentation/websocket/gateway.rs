//! WebSocket Gateway
//!
//! Registry of identified sessions and event routing to users. Every user
//! may hold several sessions; dispatches go to all of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;

use super::delivery::DeliveryTracker;
use super::messages::GatewaySend;
use crate::application::dto::response::{ChatMessageResponse, ChatRequestResponse};
use crate::config::{DeliverySettings, WebSocketSettings};
use crate::domain::DeliveredMessage;
use crate::infrastructure::metrics;

/// Events pushed to clients as `op: 0` dispatches
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", content = "d")]
pub enum GatewayEvent {
    #[serde(rename = "CHAT_REQUEST_CREATE")]
    ChatRequestCreate(ChatRequestResponse),
    #[serde(rename = "CHAT_REQUEST_UPDATE")]
    ChatRequestUpdate(ChatRequestResponse),
    #[serde(rename = "MESSAGE_CREATE")]
    MessageCreate(ChatMessageResponse),
    #[serde(rename = "MESSAGE_DELIVERED")]
    MessageDelivered(MessageDeliveredEvent),
    #[serde(rename = "WALLET_UPDATE")]
    WalletUpdate(WalletUpdateEvent),
    #[serde(rename = "TYPING_START")]
    TypingStart(TypingStartEvent),
}

impl GatewayEvent {
    /// Get the event name for dispatch
    pub fn event_name(&self) -> &'static str {
        match self {
            GatewayEvent::ChatRequestCreate(_) => "CHAT_REQUEST_CREATE",
            GatewayEvent::ChatRequestUpdate(_) => "CHAT_REQUEST_UPDATE",
            GatewayEvent::MessageCreate(_) => "MESSAGE_CREATE",
            GatewayEvent::MessageDelivered(_) => "MESSAGE_DELIVERED",
            GatewayEvent::WalletUpdate(_) => "WALLET_UPDATE",
            GatewayEvent::TypingStart(_) => "TYPING_START",
        }
    }

    /// Convert to JSON value for sending
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            GatewayEvent::ChatRequestCreate(e) => serde_json::to_value(e).unwrap_or_default(),
            GatewayEvent::ChatRequestUpdate(e) => serde_json::to_value(e).unwrap_or_default(),
            GatewayEvent::MessageCreate(e) => serde_json::to_value(e).unwrap_or_default(),
            GatewayEvent::MessageDelivered(e) => serde_json::to_value(e).unwrap_or_default(),
            GatewayEvent::WalletUpdate(e) => serde_json::to_value(e).unwrap_or_default(),
            GatewayEvent::TypingStart(e) => serde_json::to_value(e).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageDeliveredEvent {
    pub message_id: String,
    pub request_id: String,
    pub delivered_to: String,
}

impl MessageDeliveredEvent {
    pub fn new(delivered: &DeliveredMessage, recipient_id: i64) -> Self {
        Self {
            message_id: delivered.message_id.to_string(),
            request_id: delivered.request_id.to_string(),
            delivered_to: recipient_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WalletUpdateEvent {
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypingStartEvent {
    pub request_id: String,
    pub user_id: String,
    pub timestamp: i64,
}

/// Connected session with message sender
pub struct ConnectedSession {
    pub user_id: i64,
    pub session_id: String,
    sequence: AtomicU64,
    sender: mpsc::UnboundedSender<GatewaySend>,
}

impl ConnectedSession {
    /// Send a dispatch with this session's next sequence number.
    fn dispatch(&self, event_name: &str, data: serde_json::Value) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.sender
            .send(GatewaySend::dispatch(sequence, event_name, data))
            .is_ok()
    }
}

/// WebSocket gateway managing all connections
pub struct Gateway {
    /// Active sessions by session_id
    sessions: DashMap<String, Arc<ConnectedSession>>,
    /// User ID to session IDs mapping (one user can have multiple sessions)
    user_sessions: DashMap<i64, Vec<String>>,
    /// MESSAGE_CREATE pushes awaiting a DeliveryAck
    deliveries: DeliveryTracker,
    heartbeat_interval_ms: u64,
}

impl Gateway {
    pub fn new(websocket: &WebSocketSettings, delivery: DeliverySettings) -> Self {
        Self {
            sessions: DashMap::new(),
            user_sessions: DashMap::new(),
            deliveries: DeliveryTracker::new(delivery),
            heartbeat_interval_ms: websocket.heartbeat_interval_ms,
        }
    }

    /// Get the heartbeat interval
    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    pub fn deliveries(&self) -> &DeliveryTracker {
        &self.deliveries
    }

    /// Register a new connected session
    pub fn register_session(
        &self,
        session_id: String,
        user_id: i64,
        sender: mpsc::UnboundedSender<GatewaySend>,
    ) {
        let session = Arc::new(ConnectedSession {
            user_id,
            session_id: session_id.clone(),
            sequence: AtomicU64::new(0),
            sender,
        });

        self.sessions.insert(session_id.clone(), session);
        self.user_sessions
            .entry(user_id)
            .or_default()
            .push(session_id.clone());
        metrics::set_gateway_sessions(self.sessions.len());

        tracing::info!(user_id, session_id = %session_id, "Session registered");
    }

    /// Unregister a session
    pub fn unregister_session(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            self.user_sessions
                .remove_if_mut(&session.user_id, |_, sessions| {
                    sessions.retain(|s| s != session_id);
                    sessions.is_empty()
                });
            metrics::set_gateway_sessions(self.sessions.len());

            tracing::info!(
                user_id = session.user_id,
                session_id = %session_id,
                "Session unregistered"
            );
        }
    }

    fn user_session_handles(&self, user_id: i64) -> Vec<Arc<ConnectedSession>> {
        self.user_sessions
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.sessions.get(id).map(|s| Arc::clone(s.value())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send a dispatch to a single session. Returns false if it is gone.
    pub fn send_to_session(&self, session_id: &str, event_name: &str, data: serde_json::Value) -> bool {
        let session = self.sessions.get(session_id).map(|s| Arc::clone(s.value()));
        session.is_some_and(|s| s.dispatch(event_name, data))
    }

    /// Send a raw frame to every session of a user; returns how many took it.
    pub fn send_to_user(&self, user_id: i64, event_name: &str, data: &serde_json::Value) -> usize {
        self.user_session_handles(user_id)
            .iter()
            .filter(|s| s.dispatch(event_name, data.clone()))
            .count()
    }

    /// Dispatch an event to every session of each listed user
    pub fn dispatch_to_users(&self, event: &GatewayEvent, user_ids: &[i64]) {
        let data = event.to_json();
        for &user_id in user_ids {
            self.send_to_user(user_id, event.event_name(), &data);
        }
    }

    /// Push a new chat message. The recipient's copy is tracked until acked;
    /// the sender's other sessions get an untracked copy.
    pub fn dispatch_message(&self, message: ChatMessageResponse, sender_id: i64, recipient_id: i64) {
        let event = GatewayEvent::MessageCreate(message);
        let data = event.to_json();
        let message_id = match &event {
            GatewayEvent::MessageCreate(m) => m.id.parse::<i64>().ok(),
            _ => None,
        };

        if let Some(message_id) = message_id {
            if self.is_user_online(recipient_id) {
                self.deliveries.track(recipient_id, message_id, data.clone());
            }
        }
        self.send_to_user(recipient_id, event.event_name(), &data);
        self.send_to_user(sender_id, event.event_name(), &data);
    }

    /// Stop retrying a message the recipient confirmed. Returns true if it was pending.
    pub fn acknowledge_delivery(&self, user_id: i64, message_id: i64) -> bool {
        self.deliveries.acknowledge(user_id, message_id)
    }

    /// Get session count
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Check if user is online (has at least one session)
    pub fn is_user_online(&self, user_id: i64) -> bool {
        self.user_sessions
            .get(&user_id)
            .map(|sessions| !sessions.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, MessageKind};
    use pretty_assertions::assert_eq;

    fn gateway() -> Gateway {
        Gateway::new(
            &WebSocketSettings {
                max_message_size: 65536,
                max_frame_size: 16384,
                heartbeat_interval_ms: 45000,
                identify_timeout_secs: 10,
            },
            DeliverySettings {
                retry_interval_ms: 5000,
                retry_jitter_ms: 1000,
                max_attempts: 3,
            },
        )
    }

    fn message(id: i64) -> ChatMessageResponse {
        ChatMessageResponse::from_message(
            ChatMessage::new(id, 7, 1, MessageKind::Text).with_content("hi"),
            "/media",
        )
    }

    #[test]
    fn test_register_and_unregister() {
        let gateway = gateway();
        let (tx, _rx) = mpsc::unbounded_channel();
        gateway.register_session("a".into(), 1, tx);
        assert!(gateway.is_user_online(1));
        assert_eq!(gateway.session_count(), 1);

        gateway.unregister_session("a");
        assert!(!gateway.is_user_online(1));
        assert_eq!(gateway.session_count(), 0);
    }

    #[test]
    fn test_dispatch_reaches_all_user_sessions_in_sequence() {
        let gateway = gateway();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        gateway.register_session("a".into(), 1, tx1);
        gateway.register_session("b".into(), 1, tx2);

        let event = GatewayEvent::WalletUpdate(WalletUpdateEvent { balance: 10 });
        gateway.dispatch_to_users(&event, &[1]);
        gateway.dispatch_to_users(&event, &[1]);

        for rx in [&mut rx1, &mut rx2] {
            let first = rx.try_recv().unwrap();
            let second = rx.try_recv().unwrap();
            assert_eq!(first.t.as_deref(), Some("WALLET_UPDATE"));
            assert_eq!(first.s, Some(1));
            assert_eq!(second.s, Some(2));
        }
    }

    #[test]
    fn test_dispatch_message_tracks_online_recipient() {
        let gateway = gateway();
        let (tx, mut rx) = mpsc::unbounded_channel();
        gateway.register_session("r".into(), 2, tx);

        gateway.dispatch_message(message(99), 1, 2);

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(gateway.deliveries().len(), 1);

        assert!(gateway.acknowledge_delivery(2, 99));
        assert!(!gateway.acknowledge_delivery(2, 99));
        assert_eq!(gateway.deliveries().len(), 0);
    }

    #[test]
    fn test_dispatch_message_to_offline_recipient_is_not_tracked() {
        let gateway = gateway();
        gateway.dispatch_message(message(5), 1, 2);
        assert_eq!(gateway.deliveries().len(), 0);
    }

    #[test]
    fn test_event_names_match_serde_tags() {
        let event = GatewayEvent::TypingStart(TypingStartEvent {
            request_id: "1".into(),
            user_id: "2".into(),
            timestamp: 0,
        });
        let tagged = serde_json::to_value(&event).unwrap();
        assert_eq!(tagged["t"], event.event_name());
        assert_eq!(tagged["d"], event.to_json());
    }
}
