//! Fault injection around any `CdDrive`.
//!
//! Lets callers reproduce the failures a worn disc produces on real
//! hardware: unreadable frames, unstable (jittery) data and transport loss.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use cd_extract_core::models::error::DriveError;
use cd_extract_core::models::sector::{Lsn, CD_FRAMESIZE_RAW};
use cd_extract_core::traits::cd_drive::CdDrive;

/// What goes wrong when a faulty sector is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The read fails with a medium error.
    Medium,
    /// The read succeeds but the frame's bytes differ on every pass.
    Jitter,
    /// The transport dies.
    Transport,
}

#[derive(Debug, Clone, Copy)]
struct FaultRule {
    fault: Fault,
    /// Reads left before the sector behaves; `None` means it never does.
    remaining: Option<u32>,
    passes: u32,
}

impl FaultRule {
    fn active(&self) -> bool {
        self.remaining.map_or(true, |n| n > 0)
    }

    fn consume(&mut self) {
        self.passes += 1;
        if let Some(n) = self.remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
    }
}

/// Shared record of the start sector of every read request.
pub type ReadLog = Arc<Mutex<Vec<Lsn>>>;

/// Wraps a drive and injects faults at chosen sectors.
pub struct FaultyDrive<D: CdDrive> {
    inner: D,
    rules: HashMap<Lsn, FaultRule>,
    reads: ReadLog,
}

impl<D: CdDrive> FaultyDrive<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            rules: HashMap::new(),
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make `lsn` misbehave for the next `times` reads touching it, or
    /// forever when `times` is `None`.
    pub fn with_fault(mut self, lsn: Lsn, fault: Fault, times: Option<u32>) -> Self {
        self.rules.insert(
            lsn,
            FaultRule {
                fault,
                remaining: times,
                passes: 0,
            },
        );
        self
    }

    pub fn read_log(&self) -> ReadLog {
        Arc::clone(&self.reads)
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: CdDrive> CdDrive for FaultyDrive<D> {
    fn device_name(&self) -> String {
        format!("{} (fault injection)", self.inner.device_name())
    }

    fn first_sector(&self) -> Lsn {
        self.inner.first_sector()
    }

    fn last_sector(&self) -> Lsn {
        self.inner.last_sector()
    }

    fn read_audio(&mut self, lsn: Lsn, sectors: u32) -> Result<Vec<u8>, DriveError> {
        self.reads.lock().push(lsn);

        let mut jittered = Vec::new();
        for sector in lsn..lsn + sectors as Lsn {
            let Some(rule) = self.rules.get_mut(&sector) else {
                continue;
            };
            if !rule.active() {
                continue;
            }
            rule.consume();
            log::debug!("injecting {:?} at sector {}", rule.fault, sector);
            match rule.fault {
                Fault::Medium => return Err(DriveError::Medium(sector)),
                Fault::Transport => {
                    return Err(DriveError::Transport(format!("injected transport failure at {}", sector)));
                }
                Fault::Jitter => jittered.push((sector, rule.passes)),
            }
        }

        let mut data = self.inner.read_audio(lsn, sectors)?;
        for (sector, pass) in jittered {
            let start = (sector - lsn) as usize * CD_FRAMESIZE_RAW;
            // Different garbage on every pass so no two passes agree.
            let pattern = 0x5A ^ (pass as u8).wrapping_mul(0x1F);
            for byte in &mut data[start..start + CD_FRAMESIZE_RAW] {
                *byte ^= pattern | 1;
            }
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use cd_extract_core::{
        ExtractionSession, QueuedDelegate, ReadMode, RipConfiguration, RipCounts, RipDelegate, RipError, RipEvent,
        RipOutcome, WavFileWriter,
    };

    use crate::image_drive::ImageDrive;

    /// Image where every byte of frame `n` is `n`.
    fn image(sectors: u8) -> ImageDrive<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0..sectors)
            .flat_map(|n| std::iter::repeat(n).take(CD_FRAMESIZE_RAW))
            .collect();
        ImageDrive::from_reader(Cursor::new(data), "TEST IMAGE").unwrap()
    }

    fn config(max_retries: u32) -> RipConfiguration {
        RipConfiguration {
            max_retries,
            log_activity: true,
            read_mode: ReadMode::Verify,
        }
    }

    #[test]
    fn medium_fault_heals_after_given_reads() {
        let mut drive = FaultyDrive::new(image(3)).with_fault(1, Fault::Medium, Some(1));
        assert_eq!(drive.read_audio(1, 1), Err(DriveError::Medium(1)));
        assert_eq!(drive.read_audio(1, 1).unwrap()[0], 1);
        assert_eq!(*drive.read_log().lock(), vec![1, 1]);
    }

    #[test]
    fn jitter_differs_between_passes() {
        let mut drive = FaultyDrive::new(image(3)).with_fault(2, Fault::Jitter, None);
        let a = drive.read_audio(1, 2).unwrap();
        let b = drive.read_audio(1, 2).unwrap();
        assert_eq!(a[..CD_FRAMESIZE_RAW], b[..CD_FRAMESIZE_RAW]);
        assert_ne!(a[CD_FRAMESIZE_RAW..], b[CD_FRAMESIZE_RAW..]);
        assert_ne!(a[CD_FRAMESIZE_RAW], 2);
    }

    #[test]
    fn rips_image_to_wav_skipping_a_bad_sector() {
        let mut drive = FaultyDrive::new(image(5)).with_fault(2, Fault::Jitter, None);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.wav");

        let (delegate, events) = QueuedDelegate::new();
        let mut session = ExtractionSession::with_config(vec![0, 1, 2, 3, 4], &mut drive, config(3)).unwrap();
        session.set_delegate(&(delegate.clone() as Arc<dyn RipDelegate>));
        assert_eq!(session.device_name(), "TEST IMAGE (fault injection)");

        let mut wav = WavFileWriter::create(&path).unwrap();
        let report = session.rip_to_output(&mut wav).unwrap();
        wav.finalize().unwrap();

        assert_eq!(report.outcome, RipOutcome::Completed);
        assert_eq!(report.counts(), RipCounts::new(4, 4, 5));
        assert_eq!(report.failed_sectors, vec![2]);
        assert_eq!(report.progress.retries_used, 3);

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 4 * CD_FRAMESIZE_RAW);
        let first_bytes: Vec<u8> = data[44..].chunks(CD_FRAMESIZE_RAW).map(|c| c[0]).collect();
        assert_eq!(first_bytes, vec![0, 1, 3, 4]);

        let events: Vec<RipEvent> = events.try_iter().collect();
        let failed: Vec<&RipEvent> = events
            .iter()
            .filter(|e| matches!(e, RipEvent::SectorFailed { .. }))
            .collect();
        assert_eq!(
            failed,
            vec![&RipEvent::SectorFailed {
                lsn: 2,
                retries_exhausted: true
            }]
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[test]
    fn transient_medium_error_is_recovered_by_retry() {
        // Two of the failing reads are absorbed by sector 2's overlap window.
        let mut drive = FaultyDrive::new(image(4)).with_fault(3, Fault::Medium, Some(4));
        let mut session = ExtractionSession::with_config(vec![2, 3], &mut drive, config(5)).unwrap();

        let mut output = Vec::new();
        let report = session.rip_to_output(&mut output).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.progress.retries_used, 2);
        assert_eq!(output[CD_FRAMESIZE_RAW], 3);
    }

    #[test]
    fn transport_fault_aborts_the_rip() {
        let mut drive = FaultyDrive::new(image(6)).with_fault(4, Fault::Transport, None);
        let log = drive.read_log();
        let mut session = ExtractionSession::with_config(vec![0, 1, 2, 3, 4, 5], &mut drive, config(3)).unwrap();

        let err = session.rip_to_output(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, RipError::DriveIo(_)));

        // Sector 3's overlap window already reaches sector 4.
        let progress = session.progress();
        assert_eq!(progress.sectors_written, 3);
        assert!(!log.lock().iter().any(|&lsn| lsn >= 5));
    }
}
