use pdf_planner::PlannerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error("{0} is a Premium feature. Upgrade to Pro for unlimited access.")]
    PremiumRequired(String),
    #[error("Unknown document: {0}")]
    UnknownDocument(u64),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Planner(err) => match err {
                PlannerError::InvalidInput(_) | PlannerError::Config(_) => ErrorKind::InvalidInput,
                PlannerError::OutOfRange { .. } => ErrorKind::OutOfRange,
                PlannerError::EmptySelection => ErrorKind::EmptySelection,
                PlannerError::AlreadyInProgress => ErrorKind::AlreadyInProgress,
                PlannerError::TransformFailure(_) => ErrorKind::TransformFailure,
                PlannerError::Unloaded => ErrorKind::Unloaded,
                PlannerError::Io(_) | PlannerError::TaskJoin(_) => ErrorKind::Io,
            },
            RunError::PremiumRequired(_) => ErrorKind::PremiumRequired,
            RunError::UnknownDocument(_) => ErrorKind::OutOfRange,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

/// Error category reported to front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    OutOfRange,
    EmptySelection,
    AlreadyInProgress,
    TransformFailure,
    Unloaded,
    PremiumRequired,
    Io,
}
