use thiserror::Error;

use super::sector::Lsn;

/// Errors surfaced by an extraction session.
///
/// `SectorUncorrectable` is only ever reported per sector through the
/// delegate; a rip never returns it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RipError {
    #[error("invalid sector range: {0}")]
    InvalidRange(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("sector {lsn} uncorrectable after {attempts} attempts")]
    SectorUncorrectable { lsn: Lsn, attempts: u32 },

    #[error("drive I/O error: {0}")]
    DriveIo(String),

    #[error("sink write error: {0}")]
    SinkWrite(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl RipError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SectorUncorrectable { .. })
    }
}

/// Failures reported by a sector source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriveError {
    /// The medium could not be read at this position; a re-read may succeed.
    #[error("medium error at sector {0}")]
    Medium(Lsn),

    /// The sector lies outside what the drive can address.
    #[error("unaddressable sector {0}")]
    Unaddressable(Lsn),

    /// The transport itself failed; the drive is not usable.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Failures reported by an error-correcting reader for one sector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("sector {0} could not be corrected")]
    Uncorrectable(Lsn),

    #[error("sector {0} is not addressable")]
    Unaddressable(Lsn),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<DriveError> for ReadError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Medium(lsn) => Self::Uncorrectable(lsn),
            DriveError::Unaddressable(lsn) => Self::Unaddressable(lsn),
            DriveError::Transport(msg) => Self::Transport(msg),
        }
    }
}
