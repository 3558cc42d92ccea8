//! Message Delivery Tracking
//!
//! A MESSAGE_CREATE pushed to an online recipient stays pending until the
//! client answers with a DeliveryAck (op 12). A background sweep re-pushes
//! pending messages on a jittered interval and gives up after
//! `delivery.max_attempts` pushes or once the recipient has gone offline.
//! Messages remain undelivered in the database either way; the client picks
//! them up from the message history.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::Rng;

use super::gateway::Gateway;
use crate::config::DeliverySettings;
use crate::infrastructure::metrics;

const MESSAGE_CREATE: &str = "MESSAGE_CREATE";

#[derive(Debug, Clone)]
struct PendingDelivery {
    payload: serde_json::Value,
    attempts: u32,
    next_attempt_at: Instant,
}

/// What the sweep should do with one pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDecision {
    Wait,
    Resend,
    Expire,
}

/// Pending deliveries keyed by (recipient, message).
pub struct DeliveryTracker {
    pending: DashMap<(i64, i64), PendingDelivery>,
    settings: DeliverySettings,
}

impl DeliveryTracker {
    pub fn new(settings: DeliverySettings) -> Self {
        Self {
            pending: DashMap::new(),
            settings,
        }
    }

    /// Record a first push. Tracking the same message twice restarts it.
    pub fn track(&self, recipient_id: i64, message_id: i64, payload: serde_json::Value) {
        self.pending.insert(
            (recipient_id, message_id),
            PendingDelivery {
                payload,
                attempts: 1,
                next_attempt_at: Instant::now() + self.retry_delay(),
            },
        );
        metrics::set_pending_deliveries(self.pending.len());
    }

    /// Returns true if the message was still pending.
    pub fn acknowledge(&self, recipient_id: i64, message_id: i64) -> bool {
        let removed = self.pending.remove(&(recipient_id, message_id)).is_some();
        metrics::set_pending_deliveries(self.pending.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn retry_delay(&self) -> Duration {
        let jitter = if self.settings.retry_jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.settings.retry_jitter_ms)
        };
        Duration::from_millis(self.settings.retry_interval_ms + jitter)
    }

    fn decide(&self, entry: &PendingDelivery, now: Instant) -> RetryDecision {
        if entry.next_attempt_at > now {
            RetryDecision::Wait
        } else if entry.attempts >= self.settings.max_attempts {
            RetryDecision::Expire
        } else {
            RetryDecision::Resend
        }
    }

    /// Run one pass over the pending set.
    pub(crate) fn sweep(&self, gateway: &Gateway) {
        let now = Instant::now();
        let mut resend = Vec::new();

        self.pending.retain(|&(recipient_id, message_id), entry| {
            if !gateway.is_user_online(recipient_id) {
                metrics::record_delivery_retry("offline");
                tracing::debug!(recipient_id, message_id, "Recipient offline, dropping redelivery");
                return false;
            }
            match self.decide(entry, now) {
                RetryDecision::Wait => true,
                RetryDecision::Expire => {
                    metrics::record_delivery_retry("expired");
                    tracing::warn!(
                        recipient_id,
                        message_id,
                        attempts = entry.attempts,
                        "Giving up on message delivery"
                    );
                    false
                }
                RetryDecision::Resend => {
                    entry.attempts += 1;
                    entry.next_attempt_at = now + self.retry_delay();
                    resend.push((recipient_id, entry.payload.clone()));
                    true
                }
            }
        });

        // Sends happen outside the map lock.
        for (recipient_id, payload) in resend {
            gateway.send_to_user(recipient_id, MESSAGE_CREATE, &payload);
            metrics::record_delivery_retry("resent");
        }
        metrics::set_pending_deliveries(self.pending.len());
    }
}

/// Spawn the redelivery loop. It runs for the life of the process.
pub fn spawn_redelivery(gateway: Arc<Gateway>) -> tokio::task::JoinHandle<()> {
    let tick = Duration::from_millis((gateway.deliveries().settings.retry_interval_ms / 2).max(100));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !gateway.deliveries().is_empty() {
                gateway.deliveries().sweep(&gateway);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSocketSettings;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn delivery_settings(max_attempts: u32) -> DeliverySettings {
        DeliverySettings {
            retry_interval_ms: 0,
            retry_jitter_ms: 0,
            max_attempts,
        }
    }

    fn gateway(max_attempts: u32) -> Gateway {
        Gateway::new(
            &WebSocketSettings {
                max_message_size: 65536,
                max_frame_size: 16384,
                heartbeat_interval_ms: 45000,
                identify_timeout_secs: 10,
            },
            delivery_settings(max_attempts),
        )
    }

    #[test]
    fn test_decide() {
        let tracker = DeliveryTracker::new(delivery_settings(3));
        let now = Instant::now();
        let mut entry = PendingDelivery {
            payload: json!({}),
            attempts: 1,
            next_attempt_at: now + Duration::from_secs(5),
        };
        assert_eq!(tracker.decide(&entry, now), RetryDecision::Wait);

        entry.next_attempt_at = now;
        assert_eq!(tracker.decide(&entry, now), RetryDecision::Resend);

        entry.attempts = 3;
        assert_eq!(tracker.decide(&entry, now), RetryDecision::Expire);
    }

    #[tokio::test]
    async fn test_sweep_resends_until_max_attempts() {
        let gateway = gateway(2);
        let (tx, mut rx) = mpsc::unbounded_channel();
        gateway.register_session("s".into(), 2, tx);

        gateway.deliveries().track(2, 10, json!({"id": "10"}));

        gateway.deliveries().sweep(&gateway);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.t.as_deref(), Some(MESSAGE_CREATE));
        assert_eq!(gateway.deliveries().len(), 1);

        gateway.deliveries().sweep(&gateway);
        assert!(rx.try_recv().is_err());
        assert!(gateway.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_drops_offline_recipient() {
        let gateway = gateway(5);
        gateway.deliveries().track(3, 11, json!({}));
        gateway.deliveries().sweep(&gateway);
        assert!(gateway.deliveries().is_empty());
    }

    #[test]
    fn test_acknowledge_removes_entry() {
        let tracker = DeliveryTracker::new(delivery_settings(3));
        tracker.track(1, 2, json!({}));
        assert!(tracker.acknowledge(1, 2));
        assert!(!tracker.acknowledge(1, 2));
    }
}
