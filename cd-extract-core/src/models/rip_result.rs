use serde::{Deserialize, Serialize};

use super::progress::{RipCounts, RipProgress};
use super::sector::Lsn;

/// How a rip that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RipOutcome {
    Completed,
    Cancelled,
}

/// Returned by a rip that reached `Completed` or `Cancelled`.
#[derive(Debug, Clone, PartialEq)]
pub struct RipReport {
    pub session_id: String,
    pub device_name: String,
    pub outcome: RipOutcome,
    pub first_sector: Lsn,
    pub last_sector: Lsn,
    pub progress: RipProgress,
    /// Sectors given up on, in read order.
    pub failed_sectors: Vec<Lsn>,
}

impl RipReport {
    pub fn counts(&self) -> RipCounts {
        self.progress.counts()
    }

    /// Every sector in the range was written.
    pub fn is_complete(&self) -> bool {
        self.outcome == RipOutcome::Completed
            && self.progress.sectors_written == self.progress.total_sectors
    }
}

/// Extraction log stored alongside the ripped audio.
///
/// Serializable for a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipLog {
    pub id: String,
    pub device_name: String,
    pub created_at: String,
    pub output_path: String,
    pub checksum: Option<String>,
    pub outcome: RipOutcome,
    pub first_sector: Lsn,
    pub last_sector: Lsn,
    pub counts: RipCounts,
    pub retries_used: u64,
    pub failed_sectors: Vec<Lsn>,
    pub elapsed_secs: f64,
}

impl RipLog {
    pub fn from_report(report: &RipReport, output_path: &str, checksum: Option<&str>) -> Self {
        Self {
            id: report.session_id.clone(),
            device_name: report.device_name.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            output_path: output_path.to_string(),
            checksum: checksum.map(str::to_string),
            outcome: report.outcome,
            first_sector: report.first_sector,
            last_sector: report.last_sector,
            counts: report.counts(),
            retries_used: report.progress.retries_used,
            failed_sectors: report.failed_sectors.clone(),
            elapsed_secs: report.progress.elapsed_secs,
        }
    }
}
