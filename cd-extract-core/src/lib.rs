//! # cd-extract-core
//!
//! Platform-agnostic CD audio extraction engine.
//!
//! Walks a range of disc sectors through an error-correcting read loop,
//! writes the recovered PCM to a sink, and reports progress, retries,
//! per-sector losses and the final outcome to a delegate. Drive backends
//! implement the `CdDrive` trait and plug into `ExtractionSession`.
//!
//! ## Architecture
//!
//! ```text
//! cd-extract-core (this crate)
//! ├── traits/       ← CdDrive, SectorReader, RipDelegate
//! ├── models/       ← RipError, RipState, RipConfiguration, RipProgress, SectorRange, etc.
//! ├── processing/   ← VerifyingReader, PCM helpers
//! ├── session/      ← ExtractionSession, SessionHandle, QueuedDelegate
//! └── storage/      ← WavFileWriter, rip log sidecar
//! ```
//!
//! ## Usage
//! ```ignore
//! let mut drive = ImageDrive::open("disc.bin")?;
//! let mut session = ExtractionSession::new(SectorRange::span(0, 13_499)?, &mut drive)?;
//! session.set_delegate(&delegate);
//! let mut wav = WavFileWriter::create("01.wav")?;
//! let report = session.rip_to_output(&mut wav)?;
//! let checksum = wav.finalize()?;
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{ReadMode, RipConfiguration};
pub use models::error::{DriveError, ReadError, RipError};
pub use models::progress::{RipCounts, RipProgress};
pub use models::rip_result::{RipLog, RipOutcome, RipReport};
pub use models::sector::{Lsn, SectorRange, CD_FRAMESIZE_RAW, CD_FRAMEWORDS};
pub use models::state::RipState;
pub use processing::verifying_reader::{ReaderStats, VerifyingReader};
pub use session::extraction::{ExtractionSession, SessionHandle};
pub use session::notifier::DelegateSlot;
pub use session::queued::{QueuedDelegate, RipEvent};
pub use storage::wav_writer::WavFileWriter;
pub use traits::cd_drive::CdDrive;
pub use traits::rip_delegate::RipDelegate;
pub use traits::sector_reader::{SectorBlock, SectorReader};
