/// Run state definitions for the stage loop
use std::fmt;

/// Represents the current state of a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    // ===== Active States =====
    /// Stages are still being resolved
    StageLoop,

    // ===== Terminal Success States =====
    /// A key was produced
    KeyFound,

    // ===== Terminal Non-Error States =====
    /// The chain ran out without producing a key
    Exhausted,

    // ===== Terminal Error States =====
    /// A stage failed and the run was aborted
    Failed,
}

impl RunState {
    /// Returns true if a key was produced
    pub fn is_success(&self) -> bool {
        matches!(self, Self::KeyFound)
    }

    /// Returns true if the run aborted on an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Stable lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StageLoop => "stage_loop",
            Self::KeyFound => "key_found",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
