use super::error::RipError;
use super::rip_result::RipReport;

/// Extraction session state machine.
///
/// State transitions:
/// ```text
/// ready → running → completed / cancelled / failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RipState {
    Ready,
    Running,
    Completed(Box<RipReport>),
    Cancelled(Box<RipReport>),
    Failed(RipError),
}

impl RipState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled(_) | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed(_) => "completed",
            Self::Cancelled(_) => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    /// Final report, when the session ended without a fatal error.
    pub fn report(&self) -> Option<&RipReport> {
        match self {
            Self::Completed(report) | Self::Cancelled(report) => Some(report),
            _ => None,
        }
    }
}
