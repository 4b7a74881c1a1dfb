use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;

use crate::models::error::RipError;
use crate::models::progress::{RipCounts, RipProgress};
use crate::models::sector::Lsn;
use crate::traits::rip_delegate::RipDelegate;

/// A delegate notification, as queued for another thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RipEvent {
    Started { progress: RipProgress },
    Progress { progress: RipProgress },
    SectorRetry { lsn: Lsn, attempt: u32 },
    SectorFailed { lsn: Lsn, retries_exhausted: bool },
    Cancelled { counts: RipCounts },
    Failed { message: String, counts: RipCounts },
    Completed { counts: RipCounts },
}

impl RipEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled { .. } | Self::Failed { .. } | Self::Completed { .. }
        )
    }
}

/// Delegate that forwards every notification into a single-consumer
/// channel, preserving delivery order.
///
/// Use when the rip runs on a worker thread and the owner (a UI task list,
/// for instance) wants events on its own thread. The consumer can cancel the
/// rip through `request_cancel`, which the session polls between sectors.
pub struct QueuedDelegate {
    sender: Sender<RipEvent>,
    cancel_requested: AtomicBool,
}

impl QueuedDelegate {
    /// Unbounded queue; the ripping thread never blocks on a slow consumer.
    pub fn new() -> (Arc<Self>, Receiver<RipEvent>) {
        let (sender, receiver) = channel::unbounded();
        let delegate = Arc::new(Self {
            sender,
            cancel_requested: AtomicBool::new(false),
        });
        (delegate, receiver)
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    fn send(&self, event: RipEvent) {
        // A consumer that went away is not the session's problem.
        let _ = self.sender.send(event);
    }
}

impl RipDelegate for QueuedDelegate {
    fn on_start(&self, progress: &RipProgress) {
        self.send(RipEvent::Started { progress: *progress });
    }

    fn on_progress(&self, progress: &RipProgress) {
        self.send(RipEvent::Progress { progress: *progress });
    }

    fn on_sector_retry(&self, lsn: Lsn, attempt: u32) {
        self.send(RipEvent::SectorRetry { lsn, attempt });
    }

    fn on_sector_failed(&self, lsn: Lsn, retries_exhausted: bool) {
        self.send(RipEvent::SectorFailed {
            lsn,
            retries_exhausted,
        });
    }

    fn on_cancelled(&self, partial: &RipCounts) {
        self.send(RipEvent::Cancelled { counts: *partial });
    }

    fn on_failed(&self, error: &RipError, partial: &RipCounts) {
        self.send(RipEvent::Failed {
            message: error.to_string(),
            counts: *partial,
        });
    }

    fn on_completed(&self, counts: &RipCounts) {
        self.send(RipEvent::Completed { counts: *counts });
    }

    fn should_cancel(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }
}
