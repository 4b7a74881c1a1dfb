/// How the default reader checks each sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Single read, no verification.
    Fast,
    /// Two overlapped reads that must agree before a block is accepted.
    #[default]
    Verify,
}

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRY_CEILING: u32 = 1000;

/// Configuration for an extraction session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipConfiguration {
    /// Re-reads allowed for an uncorrectable sector before it is given up
    /// (default: 20).
    pub max_retries: u32,

    /// Report every retry to the delegate and the log (default: false).
    pub log_activity: bool,

    /// Verification strategy of the default reader (default: verify).
    pub read_mode: ReadMode,
}

impl RipConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries > MAX_RETRY_CEILING {
            return Err(format!(
                "max retries {} exceeds ceiling {}",
                self.max_retries, MAX_RETRY_CEILING
            ));
        }
        Ok(())
    }
}

impl Default for RipConfiguration {
    fn default() -> Self {
        Self {
            max_retries: 20,
            log_activity: false,
            read_mode: ReadMode::Verify,
        }
    }
}
