use std::future::Future;

use lopdf::Document;
use pdf_planner::{TransformJob, apply_transform_async};

/// Executes a compiled job against the source documents.
///
/// The runner only ever holds one call to `apply` at a time.
pub trait TransformBackend: Send + Sync {
    fn apply(
        &self,
        sources: Vec<Document>,
        job: TransformJob,
    ) -> impl Future<Output = pdf_planner::Result<Vec<Document>>> + Send;
}

/// Backend that runs the lopdf executor on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl TransformBackend for LopdfBackend {
    async fn apply(
        &self,
        sources: Vec<Document>,
        job: TransformJob,
    ) -> pdf_planner::Result<Vec<Document>> {
        apply_transform_async(sources, job).await
    }
}
