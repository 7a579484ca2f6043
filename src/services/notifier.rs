//! Notification & Stats Sink
//!
//! Transient user feedback plus pure aggregate counts over the live message
//! set. Replacement policy: the latest notice replaces the prior one, and a
//! notice auto-dismisses after a fixed TTL measured by the injected clock.

use crate::clock::Clock;
use crate::models::{Message, MessageStats, MessageStatus};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{error, info};

/// Severity of a transient notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        }
    }
}

/// A transient, auto-dismissing notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub posted_at: DateTime<Utc>,
}

/// Holds at most one live notice at a time
pub struct Notifier {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    current: Mutex<Option<Notice>>,
}

impl Notifier {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            current: Mutex::new(None),
        }
    }

    /// Post a notice, replacing whatever was showing
    pub fn notify(&self, message: impl Into<String>, level: NoticeLevel) {
        let message = message.into();
        match level {
            NoticeLevel::Error => error!(notice = %message, "user notice"),
            _ => info!(notice = %message, level = level.as_str(), "user notice"),
        }

        let notice = Notice {
            message,
            level,
            posted_at: self.clock.now(),
        };
        *self.current.lock().expect("notice lock poisoned") = Some(notice);
    }

    /// The notice currently showing, if it has not aged out
    pub fn current(&self) -> Option<Notice> {
        let mut current = self.current.lock().expect("notice lock poisoned");
        if let Some(notice) = current.as_ref() {
            if self.clock.now() - notice.posted_at >= self.ttl {
                *current = None;
            }
        }
        current.clone()
    }
}

/// Aggregate counts recomputed from current message state
///
/// Pure projection, never independently mutated. `Revealing` counts as
/// unlocked (an unlocked message whose content is being fetched); `Deleting`
/// contributes to the total only.
pub fn compute_stats<'a>(messages: impl IntoIterator<Item = &'a Message>) -> MessageStats {
    let mut stats = MessageStats::default();
    for message in messages {
        stats.total += 1;
        match message.status {
            MessageStatus::Locked => stats.locked += 1,
            MessageStatus::Unlocked | MessageStatus::Revealing => stats.unlocked += 1,
            MessageStatus::Revealed => stats.revealed += 1,
            MessageStatus::Deleting | MessageStatus::Deleted => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::MessageType;

    fn notifier_with_clock() -> (Notifier, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (
            Notifier::new(clock.clone(), Duration::seconds(3)),
            clock,
        )
    }

    fn message_with_status(id: &str, status: MessageStatus) -> Message {
        let mut message = Message::new(id, Utc::now(), MessageType::Text);
        message.status = status;
        message
    }

    #[test]
    fn test_latest_notice_replaces_prior() {
        let (notifier, _clock) = notifier_with_clock();

        notifier.notify("first", NoticeLevel::Info);
        notifier.notify("second", NoticeLevel::Success);

        let current = notifier.current().expect("live notice");
        assert_eq!(current.message, "second");
        assert_eq!(current.level, NoticeLevel::Success);
    }

    #[test]
    fn test_notice_expires_after_ttl() {
        let (notifier, clock) = notifier_with_clock();

        notifier.notify("transient", NoticeLevel::Info);
        assert!(notifier.current().is_some());

        clock.advance(Duration::seconds(3));
        assert!(notifier.current().is_none());
    }

    #[test]
    fn test_notice_survives_within_ttl() {
        let (notifier, clock) = notifier_with_clock();

        notifier.notify("transient", NoticeLevel::Error);
        clock.advance(Duration::seconds(2));
        assert!(notifier.current().is_some());
    }

    #[test]
    fn test_compute_stats_buckets() {
        let messages = vec![
            message_with_status("a", MessageStatus::Locked),
            message_with_status("b", MessageStatus::Locked),
            message_with_status("c", MessageStatus::Unlocked),
            message_with_status("d", MessageStatus::Revealing),
            message_with_status("e", MessageStatus::Revealed),
            message_with_status("f", MessageStatus::Deleting),
        ];

        let stats = compute_stats(&messages);
        assert_eq!(
            stats,
            MessageStats {
                total: 6,
                locked: 2,
                unlocked: 2,
                revealed: 1,
            }
        );
    }

    #[test]
    fn test_compute_stats_empty_set() {
        let stats = compute_stats(Vec::<Message>::new().iter());
        assert_eq!(stats, MessageStats::default());
    }
}
