/// Job status definitions for tracking crawl progress
///
/// A job only ever moves forward: `Pending -> Processing -> {Completed | Failed}`,
/// and `Processing` may be skipped.
use std::fmt;

/// Represents the current state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Job has been created and is waiting in the queue
    Pending,

    /// A worker has claimed the job and is fetching it
    Processing,

    /// Page was fetched, parsed and its result stored
    Completed,

    /// Any step failed; no result exists for this job
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal state (no further writes allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` keeps the status monotonic
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            Self::Pending => !matches!(next, Self::Pending),
            Self::Processing => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }

    /// States from which a job may legally move into `self`
    pub fn predecessors(&self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[],
            Self::Processing => &[Self::Pending],
            Self::Completed | Self::Failed => &[Self::Pending, Self::Processing],
        }
    }

    /// Converts the job status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a job status from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible job states
    pub fn all_states() -> [Self; 4] {
        [
            Self::Pending,
            Self::Processing,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
