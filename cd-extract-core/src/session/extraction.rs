use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::config::RipConfiguration;
use crate::models::error::{ReadError, RipError};
use crate::models::progress::RipProgress;
use crate::models::rip_result::{RipOutcome, RipReport};
use crate::models::sector::{Lsn, SectorRange};
use crate::models::state::RipState;
use crate::processing::pcm;
use crate::processing::verifying_reader::VerifyingReader;
use crate::session::notifier::{DelegateSlot, Notifier};
use crate::traits::cd_drive::CdDrive;
use crate::traits::rip_delegate::RipDelegate;
use crate::traits::sector_reader::{SectorBlock, SectorReader};

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: RipState,
    progress: RipProgress,
    rip_start: Option<Instant>,
    failed_sectors: Vec<Lsn>,
}

impl SessionState {
    fn new(total_sectors: u64) -> Self {
        Self {
            state: RipState::Ready,
            progress: RipProgress::new(total_sectors),
            rip_start: None,
            failed_sectors: Vec::new(),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.rip_start.map_or(0.0, |start| start.elapsed().as_secs_f64())
    }

    /// Progress with elapsed time refreshed while the rip is running.
    fn snapshot(&self) -> RipProgress {
        let mut progress = self.progress;
        if self.state.is_running() {
            progress.elapsed_secs = self.elapsed_secs();
        }
        progress
    }
}

/// How a single sector ended after the retry loop.
enum SectorFailure {
    /// Retries ran out, or the sector could not be retried at all.
    Lost { retries_exhausted: bool },
    Fatal(RipError),
}

/// Cloneable view of a session for other threads.
///
/// Read-only queries, cancellation and delegate swapping all work while
/// `rip_to_output` holds the session mutably.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    device_name: String,
    shared: Arc<Mutex<SessionState>>,
    delegate: DelegateSlot,
    cancel: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn state(&self) -> RipState {
        self.shared.lock().state.clone()
    }

    pub fn progress(&self) -> RipProgress {
        self.shared.lock().snapshot()
    }

    /// Ask the rip to stop before its next sector.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn set_delegate(&self, delegate: &Arc<dyn RipDelegate>) {
        self.delegate.set(delegate);
    }

    pub fn clear_delegate(&self) {
        self.delegate.clear();
    }

    pub fn delegate(&self) -> Option<Arc<dyn RipDelegate>> {
        self.delegate.get()
    }
}

/// Extracts a range of sectors from a borrowed drive into an output sink.
///
/// The read loop is strictly sequential: one sector at a time, in range
/// order, through the error-correcting reader.
/// ```text
/// [CdDrive] → [SectorReader] → retry policy → [Write sink]
///                                   ↓
///                       [progress snapshot] → [RipDelegate]
/// ```
///
/// A session runs at most once. After it reaches a terminal state only the
/// read-only queries remain meaningful; create a new session to try again.
pub struct ExtractionSession<R: SectorReader> {
    reader: R,
    sectors: SectorRange,
    config: RipConfiguration,
    handle: SessionHandle,
}

impl<'d, D: CdDrive> ExtractionSession<VerifyingReader<&'d mut D>> {
    /// Session over `drive` with the default configuration.
    ///
    /// The drive stays owned by the caller and is never closed here.
    pub fn new<S: Into<Vec<Lsn>>>(sectors: S, drive: &'d mut D) -> Result<Self, RipError> {
        Self::with_config(sectors, drive, RipConfiguration::default())
    }

    pub fn with_config<S: Into<Vec<Lsn>>>(
        sectors: S,
        drive: &'d mut D,
        config: RipConfiguration,
    ) -> Result<Self, RipError> {
        let reader = VerifyingReader::new(drive, config.read_mode);
        ExtractionSession::with_reader(sectors, reader, config)
    }
}

impl<R: SectorReader> ExtractionSession<R> {
    /// Session over a custom error-correcting reader.
    ///
    /// Fails with `InvalidRange` when the range is empty, not strictly
    /// ascending, or outside the reader's addressable span (when known).
    pub fn with_reader<S: Into<Vec<Lsn>>>(
        sectors: S,
        reader: R,
        config: RipConfiguration,
    ) -> Result<Self, RipError> {
        let sectors = SectorRange::new(sectors.into())?;
        config.validate().map_err(RipError::InvalidConfiguration)?;
        if let Some(addressable) = reader.addressable_range() {
            sectors.validate_within(&addressable)?;
        }

        let handle = SessionHandle {
            id: uuid::Uuid::new_v4().to_string(),
            device_name: reader.device_name(),
            shared: Arc::new(Mutex::new(SessionState::new(sectors.len() as u64))),
            delegate: DelegateSlot::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        };

        Ok(Self {
            reader,
            sectors,
            config,
            handle,
        })
    }

    pub fn device_name(&self) -> &str {
        self.handle.device_name()
    }

    pub fn set_delegate(&self, delegate: &Arc<dyn RipDelegate>) {
        self.handle.set_delegate(delegate);
    }

    pub fn clear_delegate(&self) {
        self.handle.clear_delegate();
    }

    pub fn delegate(&self) -> Option<Arc<dyn RipDelegate>> {
        self.handle.delegate()
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> RipState {
        self.handle.state()
    }

    pub fn progress(&self) -> RipProgress {
        self.handle.progress()
    }

    pub fn sectors(&self) -> &SectorRange {
        &self.sectors
    }

    pub fn config(&self) -> &RipConfiguration {
        &self.config
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Release the reader (and the drive borrow it carries).
    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Extract every sector in the range into `sink`. Transitions: ready →
    /// running → completed / cancelled / failed.
    ///
    /// Sectors that cannot be recovered are reported to the delegate and
    /// skipped; the sink then holds one block per recovered sector, in range
    /// order. Drive transport failures and sink failures end the rip and are
    /// returned as errors after `on_failed` has been delivered.
    pub fn rip_to_output<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<RipReport, RipError> {
        {
            let s = self.handle.shared.lock();
            if !s.state.is_ready() {
                return Err(RipError::InvalidState(format!(
                    "can only rip from ready state, session is {}",
                    s.state.name()
                )));
            }
        }

        let mut notifier = Notifier::new(self.handle.delegate.clone());
        self.set_state(RipState::Running);

        if let Some(addressable) = self.reader.addressable_range() {
            if let Err(e) = self.sectors.validate_within(&addressable) {
                return Err(self.fail(&mut notifier, e));
            }
        }
        self.reader.set_max_retries(self.config.max_retries);

        log::info!(
            "ripping {} sectors ({}..={}) from {}",
            self.sectors.len(),
            self.sectors.first(),
            self.sectors.last(),
            self.handle.device_name
        );
        notifier.start(&self.progress());

        let sectors = self.sectors.clone();
        for (index, lsn) in sectors.iter().enumerate() {
            if index == 0 {
                self.handle.shared.lock().rip_start = Some(Instant::now());
            }

            if self.cancel_requested(&notifier) {
                if let Err(e) = sink.flush() {
                    return Err(self.fail(&mut notifier, RipError::SinkWrite(e.to_string())));
                }
                return Ok(self.finish(&mut notifier, RipOutcome::Cancelled));
            }

            match self.read_with_retries(lsn, &notifier) {
                Ok(block) => {
                    self.update(|p| p.sectors_read += 1);

                    let bytes = pcm::samples_to_le_bytes(&block);
                    if let Err(e) = sink.write_all(&bytes) {
                        let err = RipError::SinkWrite(format!("sector {}: {}", lsn, e));
                        return Err(self.fail(&mut notifier, err));
                    }

                    let progress = self.update(|p| p.sectors_written += 1);
                    notifier.progress(&progress);
                }
                Err(SectorFailure::Lost { retries_exhausted }) => {
                    {
                        let mut s = self.handle.shared.lock();
                        s.failed_sectors.push(lsn);
                        s.progress.failed_sectors += 1;
                    }
                    log::warn!("giving up on sector {}", lsn);
                    notifier.sector_failed(lsn, retries_exhausted);
                }
                Err(SectorFailure::Fatal(err)) => {
                    // Already-written blocks are intact; push them out before bailing.
                    let _ = sink.flush();
                    return Err(self.fail(&mut notifier, err));
                }
            }
        }

        if let Err(e) = sink.flush() {
            return Err(self.fail(&mut notifier, RipError::SinkWrite(e.to_string())));
        }
        Ok(self.finish(&mut notifier, RipOutcome::Completed))
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: RipState) {
        self.handle.shared.lock().state = new_state;
    }

    /// Apply a counter change and return the published snapshot.
    fn update(&self, f: impl FnOnce(&mut RipProgress)) -> RipProgress {
        let mut s = self.handle.shared.lock();
        f(&mut s.progress);
        s.progress.elapsed_secs = s.elapsed_secs();
        debug_assert!(s.progress.is_consistent());
        s.progress
    }

    fn cancel_requested(&self, notifier: &Notifier) -> bool {
        self.handle.is_cancel_requested() || notifier.should_cancel()
    }

    /// One sector through the reader, retrying uncorrectable reads up to the
    /// configured ceiling.
    fn read_with_retries(&mut self, lsn: Lsn, notifier: &Notifier) -> Result<SectorBlock, SectorFailure> {
        let max_retries = self.config.max_retries;
        let mut retries = 0u32;

        loop {
            match self.reader.read_sector(lsn) {
                Ok(block) => return Ok(block),
                Err(ReadError::Transport(msg)) => {
                    return Err(SectorFailure::Fatal(RipError::DriveIo(format!(
                        "sector {}: {}",
                        lsn, msg
                    ))));
                }
                Err(ReadError::Unaddressable(_)) => {
                    log::warn!("sector {} is not addressable, skipping", lsn);
                    return Err(SectorFailure::Lost {
                        retries_exhausted: false,
                    });
                }
                Err(ReadError::Uncorrectable(_)) => {
                    if retries >= max_retries {
                        let err = RipError::SectorUncorrectable {
                            lsn,
                            attempts: retries + 1,
                        };
                        log::warn!("{}", err);
                        return Err(SectorFailure::Lost {
                            retries_exhausted: true,
                        });
                    }
                    retries += 1;
                    self.update(|p| p.retries_used += 1);
                    if self.config.log_activity {
                        log::info!("retrying sector {} ({} of {})", lsn, retries, max_retries);
                        notifier.sector_retry(lsn, retries);
                    }
                }
            }
        }
    }

    /// Enter `Failed` and deliver the terminal failure. Returns the error for
    /// the caller to propagate.
    fn fail(&self, notifier: &mut Notifier, err: RipError) -> RipError {
        let counts = {
            let mut s = self.handle.shared.lock();
            s.progress.elapsed_secs = s.elapsed_secs();
            s.state = RipState::Failed(err.clone());
            s.progress.counts()
        };
        log::error!("rip on {} failed: {}", self.handle.device_name, err);
        notifier.failed(&err, &counts);
        err
    }

    /// Enter `Completed` or `Cancelled` and deliver the terminal callback.
    fn finish(&self, notifier: &mut Notifier, outcome: RipOutcome) -> RipReport {
        let report = {
            let mut s = self.handle.shared.lock();
            s.progress.elapsed_secs = s.elapsed_secs();
            let report = RipReport {
                session_id: self.handle.id.clone(),
                device_name: self.handle.device_name.clone(),
                outcome,
                first_sector: self.sectors.first(),
                last_sector: self.sectors.last(),
                progress: s.progress,
                failed_sectors: s.failed_sectors.clone(),
            };
            s.state = match outcome {
                RipOutcome::Completed => RipState::Completed(Box::new(report.clone())),
                RipOutcome::Cancelled => RipState::Cancelled(Box::new(report.clone())),
            };
            report
        };

        let counts = report.counts();
        match outcome {
            RipOutcome::Completed => {
                log::info!(
                    "rip complete: {}/{} sectors written, {} retries, {} lost",
                    counts.sectors_written,
                    counts.total_sectors,
                    report.progress.retries_used,
                    report.failed_sectors.len()
                );
                notifier.completed(&counts);
            }
            RipOutcome::Cancelled => {
                log::info!(
                    "rip cancelled after {}/{} sectors",
                    counts.sectors_written,
                    counts.total_sectors
                );
                notifier.cancelled(&counts);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::ops::RangeInclusive;

    use crate::models::error::DriveError;
    use crate::models::progress::RipCounts;
    use crate::models::sector::{CD_FRAMESIZE_RAW, CD_FRAMEWORDS};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start,
        Progress(RipProgress),
        Retry(Lsn, u32),
        SectorFailed(Lsn, bool),
        Cancelled(RipCounts),
        Failed(RipError, RipCounts),
        Completed(RipCounts),
    }

    /// Records every callback; optionally requests cancellation after a
    /// number of progress reports.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        cancel_after: Option<u64>,
    }

    impl Recorder {
        fn cancelling_after(n: u64) -> Self {
            Self {
                cancel_after: Some(n),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn terminal_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Cancelled(_) | Call::Failed(..) | Call::Completed(_)))
                .count()
        }
    }

    impl RipDelegate for Recorder {
        fn on_start(&self, _progress: &RipProgress) {
            self.calls.lock().push(Call::Start);
        }
        fn on_progress(&self, progress: &RipProgress) {
            self.calls.lock().push(Call::Progress(*progress));
        }
        fn on_sector_retry(&self, lsn: Lsn, attempt: u32) {
            self.calls.lock().push(Call::Retry(lsn, attempt));
        }
        fn on_sector_failed(&self, lsn: Lsn, retries_exhausted: bool) {
            self.calls.lock().push(Call::SectorFailed(lsn, retries_exhausted));
        }
        fn on_cancelled(&self, partial: &RipCounts) {
            self.calls.lock().push(Call::Cancelled(*partial));
        }
        fn on_failed(&self, error: &RipError, partial: &RipCounts) {
            self.calls.lock().push(Call::Failed(error.clone(), *partial));
        }
        fn on_completed(&self, counts: &RipCounts) {
            self.calls.lock().push(Call::Completed(*counts));
        }
        fn should_cancel(&self) -> bool {
            let written = self
                .calls
                .lock()
                .iter()
                .filter(|c| matches!(c, Call::Progress(_)))
                .count() as u64;
            self.cancel_after.is_some_and(|n| written >= n)
        }
    }

    /// Reader returning sector `n` filled with the sample value `n`, with
    /// scripted failures.
    #[derive(Default)]
    struct FakeReader {
        span: Option<RangeInclusive<Lsn>>,
        /// Sector -> number of uncorrectable reads before it succeeds
        /// (`u32::MAX` = never).
        flaky: HashMap<Lsn, u32>,
        transport_fail_at: Option<Lsn>,
        reads: Vec<Lsn>,
        ceiling: Option<u32>,
    }

    impl FakeReader {
        fn over(span: RangeInclusive<Lsn>) -> Self {
            Self {
                span: Some(span),
                ..Default::default()
            }
        }
    }

    impl SectorReader for FakeReader {
        fn device_name(&self) -> String {
            "FAKE CD-ROM 1.0".into()
        }

        fn addressable_range(&self) -> Option<RangeInclusive<Lsn>> {
            self.span.clone()
        }

        fn set_max_retries(&mut self, max_retries: u32) {
            self.ceiling = Some(max_retries);
        }

        fn read_sector(&mut self, lsn: Lsn) -> Result<SectorBlock, ReadError> {
            self.reads.push(lsn);
            if self.transport_fail_at == Some(lsn) {
                return Err(ReadError::Transport("drive went away".into()));
            }
            if let Some(remaining) = self.flaky.get_mut(&lsn) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(ReadError::Uncorrectable(lsn));
                }
            }
            Ok(vec![lsn as i16; CD_FRAMEWORDS])
        }
    }

    fn config(max_retries: u32) -> RipConfiguration {
        RipConfiguration {
            max_retries,
            ..Default::default()
        }
    }

    fn attach(session: &ExtractionSession<FakeReader>, recorder: &Arc<Recorder>) {
        session.set_delegate(&(recorder.clone() as Arc<dyn RipDelegate>));
    }

    fn blocks(output: &[u8]) -> Vec<i16> {
        output
            .chunks(CD_FRAMESIZE_RAW)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect()
    }

    struct FailingSink {
        accepted: usize,
        fail_after: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accepted >= self.fail_after {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.accepted += 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn all_sectors_succeed() {
        let mut session =
            ExtractionSession::with_reader((0..10).collect::<Vec<_>>(), FakeReader::over(0..=99), config(3)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        let mut output = Vec::new();
        let report = session.rip_to_output(&mut output).unwrap();

        assert_eq!(report.outcome, RipOutcome::Completed);
        assert!(report.is_complete());
        assert_eq!(report.counts(), RipCounts::new(10, 10, 10));
        assert_eq!(report.progress.retries_used, 0);
        assert_eq!(output.len(), 10 * CD_FRAMESIZE_RAW);
        assert_eq!(blocks(&output), (0..10).collect::<Vec<i16>>());

        let calls = recorder.calls();
        assert_eq!(calls.first(), Some(&Call::Start));
        assert_eq!(calls.last(), Some(&Call::Completed(RipCounts::new(10, 10, 10))));
        assert_eq!(recorder.terminal_count(), 1);
        assert!(session.state().is_terminal());
        assert_eq!(session.reader().ceiling, Some(3));
    }

    #[test]
    fn exhausted_sector_is_skipped_and_reported_once() {
        let mut reader = FakeReader::over(0..=99);
        reader.flaky.insert(2, u32::MAX);
        let mut session = ExtractionSession::with_reader(vec![0, 1, 2, 3, 4], reader, config(3)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        let mut output = Vec::new();
        let report = session.rip_to_output(&mut output).unwrap();

        assert_eq!(report.counts(), RipCounts::new(4, 4, 5));
        assert_eq!(report.failed_sectors, vec![2]);
        assert_eq!(report.progress.retries_used, 3);
        assert_eq!(blocks(&output), vec![0, 1, 3, 4]);

        let calls = recorder.calls();
        let failures: Vec<_> = calls.iter().filter(|c| matches!(c, Call::SectorFailed(..))).collect();
        assert_eq!(failures, vec![&Call::SectorFailed(2, true)]);
        assert_eq!(calls.last(), Some(&Call::Completed(RipCounts::new(4, 4, 5))));

        // 1 initial attempt + 3 retries
        let reads_of_two = session.reader().reads.iter().filter(|&&l| l == 2).count();
        assert_eq!(reads_of_two, 4);
    }

    #[test]
    fn recovered_sector_counts_retries() {
        let mut reader = FakeReader::over(0..=99);
        reader.flaky.insert(1, 2);
        let mut session = ExtractionSession::with_reader(
            vec![0, 1, 2],
            reader,
            RipConfiguration {
                max_retries: 5,
                log_activity: true,
                ..Default::default()
            },
        )
        .unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        let report = session.rip_to_output(&mut Vec::new()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.progress.retries_used, 2);

        let retries: Vec<_> = recorder
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Retry(..)))
            .collect();
        assert_eq!(retries, vec![Call::Retry(1, 1), Call::Retry(1, 2)]);
    }

    #[test]
    fn retries_are_silent_without_activity_logging() {
        let mut reader = FakeReader::over(0..=99);
        reader.flaky.insert(0, 1);
        let mut session = ExtractionSession::with_reader(vec![0], reader, config(3)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        session.rip_to_output(&mut Vec::new()).unwrap();
        assert!(!recorder.calls().iter().any(|c| matches!(c, Call::Retry(..))));
        assert_eq!(session.progress().retries_used, 1);
    }

    #[test]
    fn zero_retries_fail_on_first_error() {
        let mut reader = FakeReader::over(0..=99);
        reader.flaky.insert(0, 1);
        let mut session = ExtractionSession::with_reader(vec![0, 1], reader, config(0)).unwrap();

        let report = session.rip_to_output(&mut Vec::new()).unwrap();
        assert_eq!(report.failed_sectors, vec![0]);
        assert_eq!(report.counts(), RipCounts::new(1, 1, 2));
    }

    #[test]
    fn cancellation_via_delegate_stops_reads() {
        let reader = FakeReader::over(0..=99);
        let mut session = ExtractionSession::with_reader((0..10).collect::<Vec<_>>(), reader, config(3)).unwrap();
        let recorder = Arc::new(Recorder::cancelling_after(4));
        attach(&session, &recorder);

        let mut output = Vec::new();
        let report = session.rip_to_output(&mut output).unwrap();

        assert_eq!(report.outcome, RipOutcome::Cancelled);
        assert_eq!(report.counts(), RipCounts::new(4, 4, 10));
        assert_eq!(output.len(), 4 * CD_FRAMESIZE_RAW);
        assert_eq!(session.reader().reads, vec![0, 1, 2, 3]);
        assert_eq!(recorder.calls().last(), Some(&Call::Cancelled(RipCounts::new(4, 4, 10))));
        assert_eq!(recorder.terminal_count(), 1);
        assert!(matches!(session.state(), RipState::Cancelled(_)));
    }

    #[test]
    fn cancellation_via_handle_before_start() {
        let mut session =
            ExtractionSession::with_reader(vec![5, 6, 7], FakeReader::over(0..=99), config(3)).unwrap();
        session.handle().cancel();

        let report = session.rip_to_output(&mut Vec::new()).unwrap();
        assert_eq!(report.outcome, RipOutcome::Cancelled);
        assert_eq!(report.counts(), RipCounts::new(0, 0, 3));
        assert!(session.reader().reads.is_empty());
    }

    #[test]
    fn transport_failure_is_fatal() {
        let mut reader = FakeReader::over(0..=99);
        reader.transport_fail_at = Some(3);
        let mut session = ExtractionSession::with_reader((0..6).collect::<Vec<_>>(), reader, config(3)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        let mut output = Vec::new();
        let err = session.rip_to_output(&mut output).unwrap_err();

        assert!(matches!(err, RipError::DriveIo(_)));
        assert_eq!(output.len(), 3 * CD_FRAMESIZE_RAW);
        assert_eq!(session.reader().reads, vec![0, 1, 2, 3]);
        match recorder.calls().last() {
            Some(Call::Failed(RipError::DriveIo(_), counts)) => {
                assert_eq!(*counts, RipCounts::new(3, 3, 6));
            }
            other => panic!("unexpected last call: {:?}", other),
        }
        assert_eq!(recorder.terminal_count(), 1);
        assert!(matches!(session.state(), RipState::Failed(RipError::DriveIo(_))));
    }

    #[test]
    fn sink_failure_is_fatal_and_leaves_read_ahead_of_written() {
        let mut session =
            ExtractionSession::with_reader((0..5).collect::<Vec<_>>(), FakeReader::over(0..=99), config(3)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        let mut sink = FailingSink {
            accepted: 0,
            fail_after: 2,
        };
        let err = session.rip_to_output(&mut sink).unwrap_err();

        assert!(matches!(err, RipError::SinkWrite(_)));
        assert_eq!(session.reader().reads, vec![0, 1, 2]);
        let progress = session.progress();
        assert_eq!((progress.sectors_read, progress.sectors_written), (3, 2));
        assert!(matches!(recorder.calls().last(), Some(Call::Failed(RipError::SinkWrite(_), _))));
    }

    #[test]
    fn empty_range_is_rejected_before_any_read() {
        let result = ExtractionSession::with_reader(Vec::<Lsn>::new(), FakeReader::over(0..=99), config(3));
        assert!(matches!(result, Err(RipError::InvalidRange(_))));
    }

    #[test]
    fn out_of_span_range_is_rejected_at_construction() {
        let result = ExtractionSession::with_reader(vec![98, 99, 100], FakeReader::over(0..=99), config(3));
        assert!(matches!(result, Err(RipError::InvalidRange(_))));
    }

    #[test]
    fn unknown_span_accepts_any_range() {
        let mut session = ExtractionSession::with_reader(vec![1000, 1001], FakeReader::default(), config(3)).unwrap();
        let report = session.rip_to_output(&mut Vec::new()).unwrap();
        assert!(report.is_complete());
    }

    #[test]
    fn session_runs_only_once() {
        let mut session = ExtractionSession::with_reader(vec![0], FakeReader::over(0..=9), config(3)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        session.rip_to_output(&mut Vec::new()).unwrap();
        let err = session.rip_to_output(&mut Vec::new()).unwrap_err();

        assert!(matches!(err, RipError::InvalidState(_)));
        assert_eq!(recorder.terminal_count(), 1);
        assert_eq!(session.reader().reads, vec![0]);
    }

    #[test]
    fn progress_is_ordered_and_consistent() {
        let mut reader = FakeReader::over(0..=99);
        reader.flaky.insert(4, u32::MAX);
        let mut session =
            ExtractionSession::with_reader(vec![2, 3, 4, 5, 8], reader, config(1)).unwrap();
        let recorder = Arc::new(Recorder::default());
        attach(&session, &recorder);

        session.rip_to_output(&mut Vec::new()).unwrap();

        let mut last_written = 0;
        for call in recorder.calls() {
            if let Call::Progress(p) = call {
                assert!(p.is_consistent());
                assert_eq!(p.sectors_written, last_written + 1);
                last_written = p.sectors_written;
            }
        }
        assert_eq!(last_written, 4);

        let final_progress = session.progress();
        assert!(final_progress.is_consistent());
        assert_eq!(final_progress.failed_sectors, 1);
        assert!(final_progress.elapsed_secs >= 0.0);
    }

    #[test]
    fn queries_work_without_delegate() {
        let session = ExtractionSession::with_reader(vec![0, 1], FakeReader::over(0..=9), config(3)).unwrap();
        assert_eq!(session.device_name(), "FAKE CD-ROM 1.0");
        assert!(session.delegate().is_none());
        assert!(session.state().is_ready());
        assert_eq!(session.progress(), RipProgress::new(2));
        assert!(!session.handle().id().is_empty());
    }

    /// Drive-level constructor wires the verifying reader over a borrowed drive.
    struct TinyDrive;

    impl CdDrive for TinyDrive {
        fn device_name(&self) -> String {
            "TINY".into()
        }
        fn first_sector(&self) -> Lsn {
            0
        }
        fn last_sector(&self) -> Lsn {
            3
        }
        fn read_audio(&mut self, lsn: Lsn, sectors: u32) -> Result<Vec<u8>, DriveError> {
            Ok(vec![lsn as u8; sectors as usize * CD_FRAMESIZE_RAW])
        }
    }

    #[test]
    fn borrows_drive_without_taking_it() {
        let mut drive = TinyDrive;
        {
            let mut session = ExtractionSession::new(vec![0, 1, 2, 3], &mut drive).unwrap();
            assert_eq!(session.device_name(), "TINY");
            let report = session.rip_to_output(&mut io::sink()).unwrap();
            assert!(report.is_complete());
            assert_eq!(session.reader().stats().drive_reads, 8);
        }
        assert!(ExtractionSession::new(vec![4], &mut drive).is_err());
    }
}
