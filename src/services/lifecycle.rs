//! Lifecycle State Machine
//!
//! Single writer of the live message set. Drives `locked -> unlocked ->
//! revealed` from scheduler expiry events and user requests, and `* ->
//! deleting -> deleted` for removals, with at most one in-flight reveal or
//! delete per message id. The pending-operation guard is acquired under the
//! map lock, so whichever request reaches the lock first proceeds and the
//! loser is a no-op; duplicate network calls are impossible.
//!
//! Rendering and display are projections of the [`EngineEvent`] stream this
//! engine emits; nothing downstream mutates lifecycle state.

use crate::models::{
    Message, MessageStats, MessageStatus, PendingOperation, RevealPayload,
};
use crate::services::downloads;
use crate::services::gateway::MessageGateway;
use crate::services::notifier::{NoticeLevel, Notifier};
use crate::services::renderer::{self, Rendering};
use crate::services::scheduler::{Countdown, CountdownScheduler, SchedulerEvent};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Projection of lifecycle activity, consumed by the display layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A tracked message is still locked; formatted remaining time
    Countdown {
        message_id: String,
        countdown: Countdown,
    },
    /// A countdown expired and the message became eligible for reveal
    Unlocked { message_id: String },
    /// Content fetched, stored, and rendered
    Revealed {
        message_id: String,
        rendering: Rendering,
    },
    /// A reveal attempt failed; the message is ready for a manual retry
    RevealFailed { message_id: String, error: String },
    /// The message left the live set
    Deleted { message_id: String },
    /// A delete attempt failed; the message stays visible and interactable
    DeleteFailed { message_id: String, error: String },
}

/// Result of a reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Content fetched and stored
    Revealed,
    /// Another reveal or delete already holds the guard; nothing was sent
    AlreadyPending,
    /// Content was already revealed earlier
    AlreadyRevealed,
    /// The id is not in the live set
    Unavailable,
    /// The gateway call failed; status restored for retry
    Failed,
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyPending,
    Unavailable,
    Failed,
}

/// Per-message lifecycle engine
pub struct LifecycleEngine {
    messages: Mutex<HashMap<String, Message>>,
    gateway: Arc<dyn MessageGateway>,
    scheduler: CountdownScheduler,
    notifier: Notifier,
    download_dir: PathBuf,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl LifecycleEngine {
    /// Create an engine and the receiving end of its projection stream
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        scheduler: CountdownScheduler,
        notifier: Notifier,
        download_dir: PathBuf,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                messages: Mutex::new(HashMap::new()),
                gateway,
                scheduler,
                notifier,
                download_dir,
                events: tx,
            }),
            rx,
        )
    }

    /// Enter a message into the live set and start its countdown
    ///
    /// Messages already revealed are not tracked; their lifecycle is done.
    pub async fn insert(&self, message: Message) {
        let should_track = !message.status.is_terminal();
        let message_id = message.id.clone();
        let unlock_time = message.unlock_time;

        self.messages
            .lock()
            .await
            .insert(message_id.clone(), message);

        if should_track {
            self.scheduler.track(&message_id, unlock_time).await;
        }
    }

    /// Seed the live set from a server snapshot
    pub async fn load_snapshot(&self, messages: Vec<Message>) {
        let count = messages.len();
        for message in messages {
            self.insert(message).await;
        }
        info!(count, "message snapshot loaded");
    }

    /// Consume scheduler events until the scheduler shuts down
    ///
    /// Expiries are handled in per-id tasks: one message's slow reveal never
    /// stalls another's countdown or expiry.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<SchedulerEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SchedulerEvent::Tick {
                    message_id,
                    countdown,
                } => {
                    self.emit(EngineEvent::Countdown {
                        message_id,
                        countdown,
                    });
                }
                SchedulerEvent::Expired { message_id } => {
                    let engine = Arc::clone(&self);
                    tokio::spawn(async move {
                        engine.on_expired(&message_id).await;
                    });
                }
            }
        }
    }

    /// Handle a countdown expiry: unlock, report, auto-reveal
    pub async fn on_expired(&self, message_id: &str) {
        let newly_unlocked = {
            let mut messages = self.messages.lock().await;
            match messages.get_mut(message_id) {
                Some(message) if message.status == MessageStatus::Locked => {
                    message.status = MessageStatus::Unlocked;
                    true
                }
                Some(_) => false,
                None => {
                    warn!(message_id, "expiry for unknown message");
                    return;
                }
            }
        };

        if newly_unlocked {
            info!(message_id, "message unlocked");
            self.emit(EngineEvent::Unlocked {
                message_id: message_id.to_string(),
            });

            // Best-effort side report, decoupled from the lifecycle
            // transition: a failure here is logged and nothing else.
            let gateway = Arc::clone(&self.gateway);
            let id = message_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = gateway.update_status(&id, MessageStatus::Unlocked).await {
                    warn!(message_id = %id, error = %e, "status update failed");
                }
            });
        }

        self.request_reveal(message_id).await;
    }

    /// Fetch and expose a message's content
    ///
    /// No-op while another operation holds the guard or once the message is
    /// terminal. Automatic (expiry-driven) and user-initiated reveals both
    /// come through here.
    pub async fn request_reveal(&self, message_id: &str) -> RevealOutcome {
        let prior_status = {
            let mut messages = self.messages.lock().await;
            let Some(message) = messages.get_mut(message_id) else {
                warn!(message_id, "reveal requested for unknown message");
                return RevealOutcome::Unavailable;
            };

            if message.pending_operation.is_some() {
                debug!(message_id, "reveal skipped, operation already pending");
                return RevealOutcome::AlreadyPending;
            }
            match message.status {
                MessageStatus::Revealed => return RevealOutcome::AlreadyRevealed,
                MessageStatus::Deleted => return RevealOutcome::Unavailable,
                _ => {}
            }

            let prior = message.status;
            message.pending_operation = Some(PendingOperation::Reveal);
            message.status = MessageStatus::Revealing;
            prior
        };

        match self.gateway.reveal(message_id).await {
            Ok(payload) => self.complete_reveal(message_id, payload).await,
            Err(e) => {
                {
                    let mut messages = self.messages.lock().await;
                    if let Some(message) = messages.get_mut(message_id) {
                        message.pending_operation = None;
                        message.status = prior_status;
                    }
                }
                error!(message_id, error = %e, "reveal failed");
                self.notifier
                    .notify(format!("Failed to reveal message: {e}"), NoticeLevel::Error);
                self.emit(EngineEvent::RevealFailed {
                    message_id: message_id.to_string(),
                    error: e.to_string(),
                });
                RevealOutcome::Failed
            }
        }
    }

    async fn complete_reveal(&self, message_id: &str, payload: RevealPayload) -> RevealOutcome {
        {
            let mut messages = self.messages.lock().await;
            let Some(message) = messages.get_mut(message_id) else {
                return RevealOutcome::Unavailable;
            };
            message.pending_operation = None;
            message.status = MessageStatus::Revealed;
            // Server is authoritative for the payload type.
            message.message_type = payload.message_type;
            if message.content.is_none() {
                message.content = Some(payload.content.clone());
            }
        }
        self.scheduler.untrack(message_id).await;
        info!(message_id, message_type = payload.message_type.as_str(), "message revealed");

        match renderer::render(message_id, &payload) {
            Ok(rendering) => {
                if matches!(rendering, Rendering::Download { .. }) {
                    self.fetch_attachment(message_id).await;
                }
                self.notifier
                    .notify("Message revealed successfully!", NoticeLevel::Success);
                self.emit(EngineEvent::Revealed {
                    message_id: message_id.to_string(),
                    rendering,
                });
            }
            Err(e) => {
                // The reveal stands; only the presentation failed.
                error!(message_id, error = %e, "failed to render revealed content");
                self.notifier
                    .notify(format!("Failed to display message: {e}"), NoticeLevel::Error);
            }
        }

        RevealOutcome::Revealed
    }

    async fn fetch_attachment(&self, message_id: &str) {
        match self.gateway.download(message_id).await {
            Ok(attachment) => {
                match downloads::save_attachment(&self.download_dir, message_id, &attachment).await
                {
                    Ok(_) => self
                        .notifier
                        .notify("File downloaded successfully!", NoticeLevel::Success),
                    Err(e) => {
                        error!(message_id, error = %e, "failed to save attachment");
                        self.notifier
                            .notify(format!("Failed to save download: {e}"), NoticeLevel::Error);
                    }
                }
            }
            Err(e) => {
                error!(message_id, error = %e, "download failed");
                self.notifier
                    .notify(format!("Failed to download message: {e}"), NoticeLevel::Error);
            }
        }
    }

    /// Remove a message, server first, then locally
    ///
    /// Reachable from any non-terminal state. On failure the prior status is
    /// restored and the message stays interactable.
    pub async fn request_delete(&self, message_id: &str) -> DeleteOutcome {
        let prior_status = {
            let mut messages = self.messages.lock().await;
            let Some(message) = messages.get_mut(message_id) else {
                warn!(message_id, "delete requested for unknown message");
                return DeleteOutcome::Unavailable;
            };

            if message.pending_operation.is_some() {
                debug!(message_id, "delete skipped, operation already pending");
                return DeleteOutcome::AlreadyPending;
            }
            if message.status == MessageStatus::Deleted {
                return DeleteOutcome::Unavailable;
            }

            let prior = message.status;
            message.pending_operation = Some(PendingOperation::Delete);
            message.status = MessageStatus::Deleting;
            prior
        };

        match self.gateway.delete(message_id).await {
            Ok(()) => {
                self.messages.lock().await.remove(message_id);
                self.scheduler.untrack(message_id).await;
                info!(message_id, "message deleted");
                self.emit(EngineEvent::Deleted {
                    message_id: message_id.to_string(),
                });
                DeleteOutcome::Deleted
            }
            Err(e) => {
                {
                    let mut messages = self.messages.lock().await;
                    if let Some(message) = messages.get_mut(message_id) {
                        message.pending_operation = None;
                        message.status = prior_status;
                    }
                }
                error!(message_id, error = %e, "delete failed");
                self.notifier
                    .notify(format!("Failed to delete message: {e}"), NoticeLevel::Error);
                self.emit(EngineEvent::DeleteFailed {
                    message_id: message_id.to_string(),
                    error: e.to_string(),
                });
                DeleteOutcome::Failed
            }
        }
    }

    /// Snapshot of one message's current record
    pub async fn message(&self, message_id: &str) -> Option<Message> {
        self.messages.lock().await.get(message_id).cloned()
    }

    /// Live set size
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }

    /// Aggregate counts over the live set
    pub async fn stats(&self) -> MessageStats {
        let messages = self.messages.lock().await;
        crate::services::notifier::compute_stats(messages.values())
    }

    /// Number of messages with an active countdown timer
    pub async fn tracked_count(&self) -> usize {
        self.scheduler.tracked_count().await
    }

    /// The notification sink, for reading the current transient notice
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Cancel all countdown timers (process teardown)
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}
