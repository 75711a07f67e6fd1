//! Submission progress events and where they go.
//!
//! The submitter reports what it is doing through a [`NotificationSink`]. Sinks
//! are informational only; nothing in the pipeline waits on them or reads
//! anything back. Two sinks ship with the crate:
//!
//! - `mpsc::Sender<SubmitEvent>`: hand events to a printer thread (the CLI).
//! - [`LogSink`]: turn events into `tracing` records.

use crate::queue::ItemId;
use crate::types::WarmthTag;
use std::sync::mpsc;
use std::time::Duration;

/// Severity of an event, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitEvent {
    /// A group is about to be compressed and uploaded.
    GroupStarted { tag: WarmthTag, count: usize },
    /// One item could not be compressed and will not be sent.
    ItemFailed {
        tag: WarmthTag,
        id: ItemId,
        name: String,
        reason: String,
    },
    /// The upload call for a group failed or was rejected; all its items failed.
    GroupFailed {
        tag: WarmthTag,
        count: usize,
        reason: String,
    },
    /// The backend answered for a group.
    GroupCompleted {
        tag: WarmthTag,
        success: usize,
        fail: usize,
    },
    /// All groups are done.
    Finished {
        success: usize,
        fail: usize,
        elapsed: Duration,
    },
}

impl SubmitEvent {
    pub fn level(&self) -> Level {
        match self {
            SubmitEvent::GroupStarted { .. } => Level::Info,
            SubmitEvent::ItemFailed { .. } => Level::Warning,
            SubmitEvent::GroupFailed { .. } => Level::Error,
            SubmitEvent::GroupCompleted { fail, .. } if *fail > 0 => Level::Warning,
            SubmitEvent::GroupCompleted { .. } => Level::Success,
            SubmitEvent::Finished { success: 0, fail, .. } if *fail > 0 => Level::Error,
            SubmitEvent::Finished { fail, .. } if *fail > 0 => Level::Warning,
            SubmitEvent::Finished { .. } => Level::Success,
        }
    }
}

/// Receiver of submission events.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: SubmitEvent);
}

impl NotificationSink for mpsc::Sender<SubmitEvent> {
    fn notify(&self, event: SubmitEvent) {
        // A closed receiver just means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Sink that writes events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: SubmitEvent) {
        match event.level() {
            Level::Error => tracing::error!(?event, "submission"),
            Level::Warning => tracing::warn!(?event, "submission"),
            Level::Info | Level::Success => tracing::info!(?event, "submission"),
        }
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _event: SubmitEvent) {}
}
