use std::path::PathBuf;

mod backend;
mod error;
mod runner;
mod session;
mod worker;

pub use backend::{LopdfBackend, TransformBackend};
pub use error::{ErrorKind, Result, RunError};
pub use runner::{RunTicket, Runner};
pub use session::{SessionContext, SubscriptionId, UserProfile};
pub use worker::{DocumentStore, worker_task};

// Re-export types from library crates
pub use pdf_planner::{Operation, PagePlanner, PlannerError, ToolOptions, TransformJob};

/// Commands sent from a front end to the worker
#[derive(Debug)]
pub enum PdfCommand {
    Load {
        path: PathBuf,
    },
    Run {
        doc_ids: Vec<DocumentId>,
        job: TransformJob,
        output_dir: PathBuf,
        options: ToolOptions,
    },
    Close {
        doc_id: DocumentId,
    },
}

/// Updates sent from the worker back to the front end
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Loaded {
        doc_id: DocumentId,
        page_count: usize,
        size_bytes: u64,
    },
    Started {
        doc_ids: Vec<DocumentId>,
    },
    Complete {
        paths: Vec<PathBuf>,
    },
    Closed {
        doc_id: DocumentId,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl PdfUpdate {
    pub fn from_error(err: &RunError) -> Self {
        PdfUpdate::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Handle to a loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);
