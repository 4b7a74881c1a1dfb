use crate::models::error::RipError;
use crate::models::progress::{RipCounts, RipProgress};
use crate::models::sector::Lsn;

/// Event delegate for extraction session notifications.
///
/// All methods are called sequentially from the thread running the rip, in
/// sector order. Exactly one of `on_completed`, `on_cancelled` or `on_failed`
/// is delivered per session, and nothing follows it.
///
/// The session only holds a weak reference; a delegate that has been dropped
/// simply stops receiving calls. Implementations that drive a UI should
/// forward to their own thread (see `QueuedDelegate`).
pub trait RipDelegate: Send + Sync {
    /// The session entered `Running`.
    fn on_start(&self, progress: &RipProgress);

    /// A sector was read and written.
    fn on_progress(&self, progress: &RipProgress);

    /// A sector read failed and is about to be retried.
    ///
    /// Only delivered when activity logging is enabled.
    fn on_sector_retry(&self, _lsn: Lsn, _attempt: u32) {}

    /// A sector was given up on. `retries_exhausted` is false when the
    /// sector could not be retried at all.
    fn on_sector_failed(&self, lsn: Lsn, retries_exhausted: bool);

    /// Terminal: the rip was cancelled between sectors.
    fn on_cancelled(&self, partial: &RipCounts);

    /// Terminal: a drive or sink error aborted the rip.
    fn on_failed(&self, error: &RipError, partial: &RipCounts);

    /// Terminal: every sector in the range was processed.
    fn on_completed(&self, counts: &RipCounts);

    /// Polled between sectors; returning true cancels the rip.
    fn should_cancel(&self) -> bool {
        false
    }
}
