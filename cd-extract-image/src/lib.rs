//! # cd-extract-image
//!
//! Disc image backend for cd-extract.
//!
//! Provides:
//! - `ImageDrive`: `CdDrive` over a raw CD-DA image (`.bin`/`.cdr`)
//! - `FaultyDrive`: wraps any drive and injects medium errors, jitter or
//!   transport failures at chosen sectors
//!
//! ## Usage
//! ```ignore
//! use cd_extract_core::{ExtractionSession, WavFileWriter};
//! use cd_extract_image::ImageDrive;
//!
//! let mut drive = ImageDrive::open("disc.bin")?;
//! let last = drive.last_sector();
//! let mut session = ExtractionSession::new((0..=last).collect::<Vec<_>>(), &mut drive)?;
//! let mut wav = WavFileWriter::create("disc.wav")?;
//! session.rip_to_output(&mut wav)?;
//! ```

pub mod faulty_drive;
pub mod image_drive;

pub use faulty_drive::{Fault, FaultyDrive, ReadLog};
pub use image_drive::{ImageDrive, ImageError};
