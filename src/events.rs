/*!
 * Progress event bus.
 *
 * Process-wide publish/subscribe keyed by job id, decoupling the worker that
 * produces progress from zero-or-more live client bridges consuming it. The
 * bus is a transient relay, not a store: publishing with no live subscriber is
 * a no-op, and late subscribers only see subsequent events.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::translation::blueprint::TranslationBlueprint;

/// Broadcast channel depth per job topic
const CHANNEL_CAPACITY: usize = 256;

/// Event published on a job's channel while it runs.
///
/// Serialized as a tagged object `{"type": ..., "payload": ...}` for transport
/// across the live-status boundary. `Progress` may fire many times; the
/// terminal variants fire at most once per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Pipeline reached a new stage
    Progress {
        /// Human-readable stage label
        stage: String,
    },

    /// Blueprint synthesis finished
    BlueprintReady(TranslationBlueprint),

    /// Job finished; payload is the rendered subtitle output
    Completed {
        /// Rendered translated subtitle text
        result: String,
    },

    /// Job failed terminally
    Failed {
        /// Summarized, user-safe error message
        error: String,
    },
}

impl ProgressEvent {
    /// Whether this event terminates its job's stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Publish/subscribe broker keyed by job id.
///
/// Constructed once per process and shared by handle. Subscriptions own their
/// registration explicitly: dropping a [`Subscription`] detaches its listener,
/// and the last listener for a job removes the job's channel entirely.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    /// Per-job broadcast channels
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<ProgressEvent>>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to a job's subscribers.
    ///
    /// Fire-and-forget: with no live subscribers this is a no-op, never an
    /// error. Stale channels whose receivers all disconnected are pruned here.
    pub fn publish(&self, job_id: &str, event: ProgressEvent) {
        let mut channels = self.channels.lock();

        let Some(sender) = channels.get(job_id) else {
            trace!("No subscribers for job {job_id}, dropping event");
            return;
        };

        if sender.send(event).is_err() {
            // All receivers vanished without an explicit unsubscribe
            channels.remove(job_id);
        }
    }

    /// Subscribe to a job's event stream.
    ///
    /// The returned handle yields events via [`Subscription::recv`] and
    /// unregisters itself on drop.
    pub fn subscribe(&self, job_id: &str) -> Subscription {
        let receiver = {
            let mut channels = self.channels.lock();
            channels
                .entry(job_id.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };

        Subscription {
            bus: self.clone(),
            job_id: job_id.to_string(),
            receiver,
        }
    }

    /// Number of live subscribers for a job
    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.channels
            .lock()
            .get(job_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Owned registration of one listener on one job's channel
#[derive(Debug)]
pub struct Subscription {
    /// Bus this subscription is registered on
    bus: EventBus,
    /// Job topic
    job_id: String,
    /// Receiving end of the job's broadcast channel
    receiver: broadcast::Receiver<ProgressEvent>,
}

impl Subscription {
    /// Receive the next event.
    ///
    /// Returns `None` once the channel is closed. A slow consumer that lags
    /// behind the channel capacity silently skips to the oldest retained
    /// event, consistent with the no-replay contract.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!("Subscriber for job {} lagged by {}", self.job_id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Job id this subscription listens to
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.bus.channels.lock();
        if let Some(sender) = channels.get(&self.job_id) {
            // This receiver still counts until the struct is fully dropped
            if sender.receiver_count() <= 1 {
                channels.remove(&self.job_id);
            }
        }
    }
}
