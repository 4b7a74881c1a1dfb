use crate::models::error::DriveError;
use crate::models::sector::Lsn;

/// Interface for a source of raw CD-DA sectors.
///
/// Implemented by:
/// - `ImageDrive` (raw disc images, `cd-extract-image`)
/// - `FaultyDrive` (fault injection wrapper, `cd-extract-image`)
///
/// The drive is owned by the caller; extraction sessions only borrow it.
pub trait CdDrive: Send {
    /// Human-readable description of the device (vendor, model, path).
    fn device_name(&self) -> String;

    /// First addressable audio sector.
    fn first_sector(&self) -> Lsn;

    /// Last addressable audio sector (inclusive).
    fn last_sector(&self) -> Lsn;

    /// Read `sectors` raw frames starting at `lsn`.
    ///
    /// Returns exactly `sectors * CD_FRAMESIZE_RAW` bytes on success.
    fn read_audio(&mut self, lsn: Lsn, sectors: u32) -> Result<Vec<u8>, DriveError>;
}

impl<D: CdDrive + ?Sized> CdDrive for &mut D {
    fn device_name(&self) -> String {
        (**self).device_name()
    }

    fn first_sector(&self) -> Lsn {
        (**self).first_sector()
    }

    fn last_sector(&self) -> Lsn {
        (**self).last_sector()
    }

    fn read_audio(&mut self, lsn: Lsn, sectors: u32) -> Result<Vec<u8>, DriveError> {
        (**self).read_audio(lsn, sectors)
    }
}
