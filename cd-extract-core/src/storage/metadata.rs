use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RipError;
use crate::models::rip_result::RipLog;

/// Path of the sidecar log for an output file: `{output}.riplog.json`.
pub fn log_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_owned();
    name.push(".riplog.json");
    PathBuf::from(name)
}

/// Write the extraction log as a JSON sidecar next to the output.
pub fn write_rip_log(log: &RipLog, output_path: &Path) -> Result<PathBuf, RipError> {
    let path = log_path(output_path);
    let json = serde_json::to_string_pretty(log)
        .map_err(|e| RipError::StorageError(format!("failed to serialize rip log: {}", e)))?;
    fs::write(&path, json).map_err(|e| RipError::StorageError(format!("failed to write rip log: {}", e)))?;
    Ok(path)
}

/// Read the extraction log stored next to an output file.
pub fn read_rip_log(output_path: &Path) -> Result<RipLog, RipError> {
    let path = log_path(output_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| RipError::StorageError(format!("failed to read rip log: {}", e)))?;
    let log: RipLog = serde_json::from_str(&json)
        .map_err(|e| RipError::StorageError(format!("failed to parse rip log: {}", e)))?;
    Ok(log)
}
