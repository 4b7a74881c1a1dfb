use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::models::error::RipError;
use crate::models::progress::{RipCounts, RipProgress};
use crate::models::sector::Lsn;
use crate::traits::rip_delegate::RipDelegate;

/// Swappable, non-owning reference to a session's delegate.
///
/// Cloned into every `SessionHandle`, so the delegate can be replaced from
/// another thread while a rip is running; the change is seen by the next
/// notification.
#[derive(Clone, Default)]
pub struct DelegateSlot {
    inner: Arc<RwLock<Option<Weak<dyn RipDelegate>>>>,
}

impl DelegateSlot {
    pub fn set(&self, delegate: &Arc<dyn RipDelegate>) {
        *self.inner.write() = Some(Arc::downgrade(delegate));
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// The current delegate, if one is set and still alive.
    pub fn get(&self) -> Option<Arc<dyn RipDelegate>> {
        self.inner.read().as_ref().and_then(Weak::upgrade)
    }
}

/// Serializes delivery for a single rip and enforces the single terminal
/// callback.
pub(crate) struct Notifier {
    slot: DelegateSlot,
    terminal_sent: bool,
}

impl Notifier {
    pub(crate) fn new(slot: DelegateSlot) -> Self {
        Self {
            slot,
            terminal_sent: false,
        }
    }

    fn deliver(&self, f: impl FnOnce(&dyn RipDelegate)) {
        if self.terminal_sent {
            return;
        }
        if let Some(delegate) = self.slot.get() {
            f(delegate.as_ref());
        }
    }

    fn deliver_terminal(&mut self, f: impl FnOnce(&dyn RipDelegate)) {
        self.deliver(f);
        self.terminal_sent = true;
    }

    pub(crate) fn start(&self, progress: &RipProgress) {
        self.deliver(|d| d.on_start(progress));
    }

    pub(crate) fn progress(&self, progress: &RipProgress) {
        self.deliver(|d| d.on_progress(progress));
    }

    pub(crate) fn sector_retry(&self, lsn: Lsn, attempt: u32) {
        self.deliver(|d| d.on_sector_retry(lsn, attempt));
    }

    pub(crate) fn sector_failed(&self, lsn: Lsn, retries_exhausted: bool) {
        self.deliver(|d| d.on_sector_failed(lsn, retries_exhausted));
    }

    pub(crate) fn cancelled(&mut self, partial: &RipCounts) {
        self.deliver_terminal(|d| d.on_cancelled(partial));
    }

    pub(crate) fn failed(&mut self, error: &RipError, partial: &RipCounts) {
        self.deliver_terminal(|d| d.on_failed(error, partial));
    }

    pub(crate) fn completed(&mut self, counts: &RipCounts) {
        self.deliver_terminal(|d| d.on_completed(counts));
    }

    pub(crate) fn should_cancel(&self) -> bool {
        !self.terminal_sent && self.slot.get().is_some_and(|d| d.should_cancel())
    }
}
