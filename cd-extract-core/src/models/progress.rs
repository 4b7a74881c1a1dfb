use serde::{Deserialize, Serialize};

use super::sector::CD_FRAMESIZE_RAW;

/// Sector tallies delivered with terminal notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RipCounts {
    pub sectors_read: u64,
    pub sectors_written: u64,
    pub total_sectors: u64,
}

impl RipCounts {
    pub fn new(sectors_read: u64, sectors_written: u64, total_sectors: u64) -> Self {
        Self {
            sectors_read,
            sectors_written,
            total_sectors,
        }
    }
}

/// Snapshot of a session's progress.
///
/// Published by the session after every counter update; the read count for
/// a sector is always published before its write count.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RipProgress {
    pub total_sectors: u64,
    pub sectors_read: u64,
    pub sectors_written: u64,
    pub retries_used: u64,
    pub failed_sectors: u64,
    /// Seconds since the first read, zero before the rip starts.
    pub elapsed_secs: f64,
}

impl RipProgress {
    pub fn new(total_sectors: u64) -> Self {
        Self {
            total_sectors,
            ..Default::default()
        }
    }

    pub fn counts(&self) -> RipCounts {
        RipCounts::new(self.sectors_read, self.sectors_written, self.total_sectors)
    }

    pub fn bytes_read(&self) -> u64 {
        self.sectors_read * CD_FRAMESIZE_RAW as u64
    }

    pub fn bytes_written(&self) -> u64 {
        self.sectors_written * CD_FRAMESIZE_RAW as u64
    }

    /// Sectors accounted for (written or permanently failed) over the total.
    pub fn fraction_complete(&self) -> f64 {
        if self.total_sectors == 0 {
            return 0.0;
        }
        let done = (self.sectors_written + self.failed_sectors).min(self.total_sectors);
        done as f64 / self.total_sectors as f64
    }

    /// Sectors per second since the first read.
    pub fn read_speed(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.sectors_read as f64 / self.elapsed_secs
    }

    /// `written <= read <= total`
    pub fn is_consistent(&self) -> bool {
        self.sectors_written <= self.sectors_read && self.sectors_read <= self.total_sectors
    }
}
