//! Countdown Scheduler
//!
//! Owns one repeating timer per tracked message id. Each timer evaluates the
//! remaining time immediately on registration and then once per tick period,
//! emitting `Tick` observations while the message is still locked and a
//! single terminal `Expired` observation once the unlock instant passes.
//! Timers are isolated per id; a slow or failing consumer of one message's
//! events cannot stall another message's timer.

use crate::clock::Clock;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

/// Observation emitted by a message countdown timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The message is still locked; carries the formatted remaining time
    Tick {
        message_id: String,
        countdown: Countdown,
    },
    /// The unlock instant has passed; emitted exactly once per id
    Expired { message_id: String },
}

/// Remaining time decomposed into days/hours/minutes/seconds
///
/// Truncates toward zero, no rounding; the components always reconstruct
/// the whole seconds of the remaining duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn from_remaining(remaining: ChronoDuration) -> Self {
        let total = remaining.num_seconds().max(0);
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    /// Whole seconds the components add back up to
    pub fn total_seconds(&self) -> i64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

struct TimerHandle {
    task: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

type TimerMap = Arc<RwLock<HashMap<String, TimerHandle>>>;

/// Per-message countdown timers behind an owned registry
///
/// Raw timer handles never leave this component; callers interact through
/// `track`/`untrack`/`shutdown` and the event channel returned by `new`.
pub struct CountdownScheduler {
    clock: Arc<dyn Clock>,
    tick_period: Duration,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    timers: TimerMap,
}

impl CountdownScheduler {
    /// Create a scheduler and the receiving end of its event stream
    pub fn new(
        clock: Arc<dyn Clock>,
        tick_period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                clock,
                tick_period,
                events: tx,
                timers: Arc::new(RwLock::new(HashMap::new())),
            },
            rx,
        )
    }

    /// Begin periodic evaluation for a message id
    ///
    /// Idempotent: tracking an id that already has an active timer is a
    /// no-op.
    pub async fn track(&self, message_id: &str, unlock_time: DateTime<Utc>) {
        let mut timers = self.timers.write().await;
        if timers.contains_key(message_id) {
            return;
        }

        let fired = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_countdown(
            message_id.to_string(),
            unlock_time,
            Arc::clone(&self.clock),
            self.tick_period,
            Arc::clone(&fired),
            self.events.clone(),
            Arc::clone(&self.timers),
        ));

        timers.insert(message_id.to_string(), TimerHandle { task, fired });
        debug!(message_id, %unlock_time, "tracking countdown");
    }

    /// Cancel the timer for an id; safe to call when none is active
    pub async fn untrack(&self, message_id: &str) {
        if let Some(handle) = self.timers.write().await.remove(message_id) {
            handle.task.abort();
            debug!(message_id, "untracked countdown");
        }
    }

    /// Cancel all active timers (process/page teardown)
    pub async fn shutdown(&self) {
        let mut timers = self.timers.write().await;
        for (message_id, handle) in timers.drain() {
            handle.task.abort();
            debug!(message_id, "countdown cancelled at shutdown");
        }
    }

    /// Number of ids with a live timer
    pub async fn tracked_count(&self) -> usize {
        self.timers.read().await.len()
    }
}

async fn run_countdown(
    message_id: String,
    unlock_time: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    tick_period: Duration,
    fired: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    timers: TimerMap,
) {
    let mut interval = tokio::time::interval(tick_period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let remaining = unlock_time - clock.now();
        if remaining <= ChronoDuration::zero() {
            // Mark fired before emitting so a re-entrant consumer can never
            // observe a second expiry for this id.
            if fired.swap(true, Ordering::SeqCst) {
                break;
            }
            let _ = events.send(SchedulerEvent::Expired {
                message_id: message_id.clone(),
            });
            break;
        }

        let _ = events.send(SchedulerEvent::Tick {
            message_id: message_id.clone(),
            countdown: Countdown::from_remaining(remaining),
        });
    }

    // Expiry auto-untracks; the registry entry must not outlive the timer.
    timers.write().await.remove(&message_id);
}
