use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::RipError;
use crate::storage::wav_format;

/// Output sink that frames extracted PCM as a WAV file.
///
/// Hand it to `ExtractionSession::rip_to_output` as the sink, then call
/// `finalize` once the rip returns (whatever the outcome) to patch the
/// header sizes and get the file's SHA-256.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, 44.1 kHz / 16-bit / stereo]
/// [raw PCM, one 2352-byte block per recovered sector...]
/// ```
pub struct WavFileWriter {
    file_path: PathBuf,
    file: BufWriter<File>,
    data_bytes: u64,
}

impl WavFileWriter {
    /// Create the file (and its directory) and write a placeholder header.
    pub fn create(file_path: impl Into<PathBuf>) -> Result<Self, RipError> {
        let file_path = file_path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RipError::StorageError(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&file_path)
            .map_err(|e| RipError::StorageError(format!("failed to create file: {}", e)))?;
        let mut file = BufWriter::new(file);

        // data size placeholder, patched in finalize
        file.write_all(&wav_format::cd_audio_header(0))
            .map_err(|e| RipError::StorageError(format!("failed to write header: {}", e)))?;

        Ok(Self {
            file_path,
            file,
            data_bytes: 0,
        })
    }

    /// PCM bytes written so far (header excluded).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Patch the header sizes, close the file and return its SHA-256 hex digest.
    pub fn finalize(mut self) -> Result<String, RipError> {
        let mut header = wav_format::cd_audio_header(0);
        wav_format::patch_data_size(&mut header, self.data_bytes);
        wav_format::patch_file_size(&mut header, self.data_bytes + wav_format::WAV_HEADER_SIZE as u64);

        let storage = |e: io::Error| RipError::StorageError(e.to_string());
        self.file.flush().map_err(storage)?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0)).map_err(storage)?;
        file.write_all(&header).map_err(storage)?;
        file.sync_all().map_err(storage)?;
        drop(self.file);

        sha256_file(&self.file_path)
    }
}

impl Write for WavFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.file.write(buf)?;
        self.data_bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RipError> {
    let mut file =
        File::open(path).map_err(|e| RipError::StorageError(format!("failed to open file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| RipError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
