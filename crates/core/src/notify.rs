//! Notification collaborator.
//!
//! Every user-visible outcome is reported through a [`Notifier`]. Notifications are
//! fire-and-forget: `notify` never blocks on the user and never fails.

use crate::constants::NOTIFICATION_BUFFER_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str);

    fn info(&self, title: &str, message: &str) {
        self.notify(NotificationKind::Info, title, message);
    }

    fn success(&self, title: &str, message: &str) {
        self.notify(NotificationKind::Success, title, message);
    }

    fn error(&self, title: &str, message: &str) {
        self.notify(NotificationKind::Error, title, message);
    }
}

/// Writes notifications to the tracing subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str) {
        match kind {
            NotificationKind::Error => tracing::warn!(%title, %message, "notification"),
            _ => tracing::info!(?kind, %title, %message, "notification"),
        }
    }
}

/// Keeps the most recent notifications in memory, in order. Also forwards them to tracing.
///
/// Once `capacity` entries are held, each new notification drops the oldest one.
#[derive(Debug)]
pub struct RecordingNotifier {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::with_capacity(NOTIFICATION_BUFFER_CAPACITY)
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.title).collect()
    }

    /// Returns and clears everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|mut entries| Vec::from(std::mem::take(&mut *entries)))
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str) {
        TracingNotifier.notify(kind, title, message);
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(Notification {
                kind,
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.success("Patient Added Successfully", "Jane Doe has been added.");
        notifier.error("Selection Required", "Select something.");

        let recorded = notifier.notifications();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].kind, NotificationKind::Success);
        assert_eq!(recorded[1].title, "Selection Required");
    }

    #[test]
    fn test_drain_empties_the_log() {
        let notifier = RecordingNotifier::new();
        notifier.info("EHR Connected", "Successfully connected.");
        assert_eq!(notifier.drain().len(), 1);
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_buffer_drops_oldest_past_capacity() {
        let notifier = RecordingNotifier::with_capacity(3);
        for n in 0..5 {
            notifier.info(&format!("Notice {n}"), "");
        }

        assert_eq!(notifier.titles(), vec!["Notice 2", "Notice 3", "Notice 4"]);
    }

    #[test]
    fn test_default_capacity_is_bounded() {
        let notifier = RecordingNotifier::new();
        for _ in 0..NOTIFICATION_BUFFER_CAPACITY + 10 {
            notifier.success("Patient Added Successfully", "");
        }
        assert_eq!(notifier.notifications().len(), NOTIFICATION_BUFFER_CAPACITY);
    }
}
