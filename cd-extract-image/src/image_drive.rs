//! Raw CD-DA disc image as a sector source.
//!
//! Reads `.bin`/`.cdr` style images: a flat run of 2352-byte audio frames,
//! little-endian, no sub-channel data.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

use cd_extract_core::models::error::DriveError;
use cd_extract_core::models::sector::{Lsn, CD_FRAMESIZE_RAW};
use cd_extract_core::traits::cd_drive::CdDrive;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image contains no audio frames")]
    Empty,

    #[error("image size {0} is not a multiple of the 2352-byte frame size")]
    Misaligned(u64),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Disc image exposed through the `CdDrive` interface.
///
/// Frame `n` of the image is sector `first_sector + n`.
pub struct ImageDrive<R = File> {
    source: R,
    name: String,
    first_sector: Lsn,
    sector_count: u32,
}

impl ImageDrive<File> {
    /// Open an image file; the first frame is sector 0.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(file, format!("image:{}", path.display()))
    }
}

impl<R: Read + Seek> ImageDrive<R> {
    pub fn from_reader(mut source: R, name: impl Into<String>) -> Result<Self, ImageError> {
        let len = source.seek(SeekFrom::End(0))?;
        if len == 0 {
            return Err(ImageError::Empty);
        }
        if len % CD_FRAMESIZE_RAW as u64 != 0 {
            return Err(ImageError::Misaligned(len));
        }

        let sector_count = (len / CD_FRAMESIZE_RAW as u64) as u32;
        let name = name.into();
        log::debug!("{}: {} sectors", name, sector_count);

        Ok(Self {
            source,
            name,
            first_sector: 0,
            sector_count,
        })
    }

    /// Number the image's frames from `lsn` instead of 0.
    pub fn with_first_sector(mut self, lsn: Lsn) -> Self {
        self.first_sector = lsn;
        self
    }

    pub fn sector_count(&self) -> u32 {
        self.sector_count
    }
}

impl<R: Read + Seek + Send> CdDrive for ImageDrive<R> {
    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn first_sector(&self) -> Lsn {
        self.first_sector
    }

    fn last_sector(&self) -> Lsn {
        self.first_sector + self.sector_count as Lsn - 1
    }

    fn read_audio(&mut self, lsn: Lsn, sectors: u32) -> Result<Vec<u8>, DriveError> {
        if sectors == 0 {
            return Ok(Vec::new());
        }
        let end = lsn + sectors as Lsn - 1;
        if lsn < self.first_sector() {
            return Err(DriveError::Unaddressable(lsn));
        }
        if end > self.last_sector() {
            return Err(DriveError::Unaddressable(end));
        }

        let offset = (lsn - self.first_sector) as u64 * CD_FRAMESIZE_RAW as u64;
        let mut data = vec![0u8; sectors as usize * CD_FRAMESIZE_RAW];
        self.source
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.source.read_exact(&mut data))
            .map_err(|e| DriveError::Transport(format!("{}: {}", self.name, e)))?;
        Ok(data)
    }
}
