use std::ops::RangeInclusive;

use crate::models::config::ReadMode;
use crate::models::error::{DriveError, ReadError};
use crate::models::sector::{Lsn, CD_FRAMESIZE_RAW};
use crate::processing::pcm;
use crate::traits::cd_drive::CdDrive;
use crate::traits::sector_reader::{SectorBlock, SectorReader};

/// Passes taken before a disagreeing sector is declared uncorrectable.
const MAX_VERIFY_PASSES: usize = 3;

/// Counters kept by the reader across a rip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Calls to the underlying drive.
    pub drive_reads: u64,
    /// Sectors where two passes disagreed.
    pub mismatches: u64,
    /// Sectors settled by a third, tie-breaking pass.
    pub corrected: u64,
}

/// Default error-correcting reader over a borrowed or owned `CdDrive`.
///
/// In `ReadMode::Verify` each sector is read together with one neighbouring
/// sector on either side, twice. The block is accepted when both passes agree
/// on the target sector; otherwise a third pass breaks the tie. Three
/// disagreeing passes mean the drive is not returning stable data at this
/// position, and the sector is reported as uncorrectable.
pub struct VerifyingReader<D: CdDrive> {
    drive: D,
    mode: ReadMode,
    stats: ReaderStats,
}

impl<D: CdDrive> VerifyingReader<D> {
    pub fn new(drive: D, mode: ReadMode) -> Self {
        Self {
            drive,
            mode,
            stats: ReaderStats::default(),
        }
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    /// Release the drive.
    pub fn into_inner(self) -> D {
        self.drive
    }

    fn read_window(&mut self, start: Lsn, count: u32) -> Result<Vec<u8>, ReadError> {
        self.stats.drive_reads += 1;
        let data = self.drive.read_audio(start, count)?;
        if data.len() != count as usize * CD_FRAMESIZE_RAW {
            log::debug!(
                "short read at sector {}: {} of {} bytes",
                start,
                data.len(),
                count as usize * CD_FRAMESIZE_RAW
            );
            return Err(ReadError::Uncorrectable(start));
        }
        Ok(data)
    }

    fn read_verified(&mut self, lsn: Lsn) -> Result<SectorBlock, ReadError> {
        let start = (lsn - 1).max(self.drive.first_sector());
        let end = (lsn + 1).min(self.drive.last_sector());
        let count = (end - start + 1) as u32;
        let offset = (lsn - start) as usize * CD_FRAMESIZE_RAW;
        let target = offset..offset + CD_FRAMESIZE_RAW;

        let mut passes: Vec<Vec<u8>> = Vec::with_capacity(MAX_VERIFY_PASSES);
        while passes.len() < MAX_VERIFY_PASSES {
            let sector = match self.read_window(start, count) {
                Ok(window) => window[target.clone()].to_vec(),
                // A bad neighbour should not cost us the target sector.
                Err(ReadError::Uncorrectable(bad)) if bad != lsn && count > 1 => {
                    log::debug!("overlap sector {} unreadable, reading {} alone", bad, lsn);
                    self.read_window(lsn, 1)?
                }
                Err(e) => return Err(e),
            };

            if let Some(agreed) = passes.iter().find(|p| **p == sector) {
                if passes.len() > 1 {
                    self.stats.corrected += 1;
                }
                return Ok(pcm::samples_from_le_bytes(agreed));
            }
            if passes.len() == 1 {
                self.stats.mismatches += 1;
                log::debug!("sector {} passes disagree, re-reading", lsn);
            }
            passes.push(sector);
        }

        Err(ReadError::Uncorrectable(lsn))
    }
}

impl<D: CdDrive> SectorReader for VerifyingReader<D> {
    fn device_name(&self) -> String {
        self.drive.device_name()
    }

    fn addressable_range(&self) -> Option<RangeInclusive<Lsn>> {
        let first = self.drive.first_sector();
        let last = self.drive.last_sector();
        (first <= last).then_some(first..=last)
    }

    fn read_sector(&mut self, lsn: Lsn) -> Result<SectorBlock, ReadError> {
        if lsn < self.drive.first_sector() || lsn > self.drive.last_sector() {
            return Err(DriveError::Unaddressable(lsn).into());
        }
        match self.mode {
            ReadMode::Fast => {
                let data = self.read_window(lsn, 1)?;
                Ok(pcm::samples_from_le_bytes(&data))
            }
            ReadMode::Verify => self.read_verified(lsn),
        }
    }
}
