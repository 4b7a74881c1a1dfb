use std::ops::RangeInclusive;

use super::error::RipError;

/// Logical sector number, the absolute position of a frame on the disc.
pub type Lsn = i32;

/// Bytes in one raw CD-DA frame (588 stereo frames of 16-bit PCM).
pub const CD_FRAMESIZE_RAW: usize = 2352;

/// 16-bit samples in one raw frame (interleaved left/right).
pub const CD_FRAMEWORDS: usize = CD_FRAMESIZE_RAW / 2;

/// Sectors per second of CD audio.
pub const CD_FRAMES_PER_SECOND: u32 = 75;

/// Ordered, non-empty list of sectors to extract.
///
/// Read order is the order given at construction, and must be strictly
/// ascending: the error-correcting reader relies on sequential access to
/// the same physical region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorRange {
    sectors: Vec<Lsn>,
}

impl SectorRange {
    pub fn new(sectors: Vec<Lsn>) -> Result<Self, RipError> {
        if sectors.is_empty() {
            return Err(RipError::InvalidRange("sector range is empty".into()));
        }
        if let Some(pair) = sectors.windows(2).find(|w| w[0] >= w[1]) {
            return Err(RipError::InvalidRange(format!(
                "sectors must be strictly ascending: {} followed by {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { sectors })
    }

    /// Contiguous span `first..=last`, as found in a track's TOC entry.
    pub fn span(first: Lsn, last: Lsn) -> Result<Self, RipError> {
        if last < first {
            return Err(RipError::InvalidRange(format!(
                "span end {} precedes start {}",
                last, first
            )));
        }
        Self::new((first..=last).collect())
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Always false for a constructed range; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn first(&self) -> Lsn {
        self.sectors[0]
    }

    pub fn last(&self) -> Lsn {
        self.sectors[self.sectors.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = Lsn> + '_ {
        self.sectors.iter().copied()
    }

    pub fn as_slice(&self) -> &[Lsn] {
        &self.sectors
    }

    /// Check every sector against the drive's addressable span.
    pub fn validate_within(&self, addressable: &RangeInclusive<Lsn>) -> Result<(), RipError> {
        // Ascending order means only the endpoints need checking.
        for lsn in [self.first(), self.last()] {
            if !addressable.contains(&lsn) {
                return Err(RipError::InvalidRange(format!(
                    "sector {} outside addressable range {}..={}",
                    lsn,
                    addressable.start(),
                    addressable.end()
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Lsn>> for SectorRange {
    type Error = RipError;

    fn try_from(sectors: Vec<Lsn>) -> Result<Self, Self::Error> {
        Self::new(sectors)
    }
}

impl From<SectorRange> for Vec<Lsn> {
    fn from(range: SectorRange) -> Self {
        range.sectors
    }
}
