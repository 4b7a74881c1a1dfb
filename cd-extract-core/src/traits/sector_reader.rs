use std::ops::RangeInclusive;

use crate::models::error::ReadError;
use crate::models::sector::Lsn;

/// One sector of corrected audio: 588 interleaved stereo 16-bit frames.
pub type SectorBlock = Vec<i16>;

/// Error-correcting reader wrapped around a sector source.
///
/// The extraction session calls `read_sector` once per attempt and owns the
/// retry loop; `set_max_retries` passes the same ceiling down for readers
/// that also retry internally.
pub trait SectorReader: Send {
    /// Description of the underlying drive.
    fn device_name(&self) -> String;

    /// Sectors the drive can address, if already known.
    fn addressable_range(&self) -> Option<RangeInclusive<Lsn>>;

    /// Retry ceiling configured on the session.
    fn set_max_retries(&mut self, _max_retries: u32) {}

    /// Read and correct a single sector.
    ///
    /// A successful block holds exactly `CD_FRAMEWORDS` samples.
    fn read_sector(&mut self, lsn: Lsn) -> Result<SectorBlock, ReadError>;
}

