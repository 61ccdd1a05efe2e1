use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use pdf_planner::{SourceDocument, ToolOptions, TransformJob, load_pdf, save_outputs};
use tokio::sync::mpsc;

use crate::backend::TransformBackend;
use crate::error::{Result, RunError};
use crate::runner::Runner;
use crate::{DocumentId, PdfCommand, PdfUpdate};

/// Documents loaded through the worker, keyed by handle
#[derive(Default)]
pub struct DocumentStore {
    next_id: u64,
    documents: HashMap<DocumentId, SourceDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, source: SourceDocument) -> DocumentId {
        self.next_id += 1;
        let id = DocumentId(self.next_id);
        self.documents.insert(id, source);
        id
    }

    pub fn get(&self, id: DocumentId) -> Option<&SourceDocument> {
        self.documents.get(&id)
    }

    pub fn remove(&mut self, id: DocumentId) -> Option<SourceDocument> {
        self.documents.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Copies of the requested documents, in the requested order
    fn sources(&self, ids: &[DocumentId]) -> Result<Vec<lopdf::Document>> {
        ids.iter()
            .map(|id| {
                self.get(*id)
                    .map(|source| source.document.clone())
                    .ok_or(RunError::UnknownDocument(id.0))
            })
            .collect()
    }
}

/// Async worker task that processes PDF commands and sends updates
pub async fn worker_task<B: TransformBackend + 'static>(
    runner: Arc<Runner<B>>,
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
) {
    let mut store = DocumentStore::new();

    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &runner, &mut store, &update_tx).await;
    }
    log::debug!("Command channel closed, worker exiting");
}

async fn process_command<B: TransformBackend + 'static>(
    cmd: PdfCommand,
    runner: &Arc<Runner<B>>,
    store: &mut DocumentStore,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match cmd {
        PdfCommand::Load { path } => handle_load(path, store, update_tx).await,
        PdfCommand::Run {
            doc_ids,
            job,
            output_dir,
            options,
        } => {
            if let Err(err) = handle_run(runner, store, doc_ids, job, output_dir, options, update_tx)
            {
                let _ = update_tx.send(PdfUpdate::from_error(&err));
            }
        }
        PdfCommand::Close { doc_id } => {
            if store.remove(doc_id).is_some() {
                let _ = update_tx.send(PdfUpdate::Closed { doc_id });
            } else {
                let _ = update_tx.send(PdfUpdate::from_error(&RunError::UnknownDocument(doc_id.0)));
            }
        }
    }
}

async fn handle_load(
    path: PathBuf,
    store: &mut DocumentStore,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match load_pdf(&path).await {
        Ok(source) => {
            let page_count = source.page_count();
            let size_bytes = source.info.size_bytes;
            let doc_id = store.store(source);
            let _ = update_tx.send(PdfUpdate::Loaded {
                doc_id,
                page_count,
                size_bytes,
            });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::from_error(&RunError::from(e)));
        }
    }
}

/// Claims the run slot synchronously, then finishes the run on its own task
/// so the worker keeps answering commands while it executes.
fn handle_run<B: TransformBackend + 'static>(
    runner: &Arc<Runner<B>>,
    store: &DocumentStore,
    doc_ids: Vec<DocumentId>,
    job: TransformJob,
    output_dir: PathBuf,
    options: ToolOptions,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<()> {
    options.validate()?;
    let source_count_ok = match job.expected_sources() {
        Some(count) => count == doc_ids.len(),
        None => !doc_ids.is_empty(),
    };
    if !source_count_ok {
        return Err(pdf_planner::PlannerError::InvalidInput(format!(
            "Job needs {} source document(s), got {}",
            job.expected_sources()
                .map_or_else(|| "at least 1".to_string(), |count| count.to_string()),
            doc_ids.len()
        ))
        .into());
    }
    let sources = store.sources(&doc_ids)?;
    let ticket = runner.try_begin()?;

    let _ = update_tx.send(PdfUpdate::Started {
        doc_ids: doc_ids.clone(),
    });

    let runner = Arc::clone(runner);
    let update_tx = update_tx.clone();
    tokio::spawn(async move {
        let result = match runner.execute(&ticket, sources, job).await {
            Ok(outputs) => save_outputs(outputs, &output_dir, &options)
                .await
                .map_err(RunError::from),
            Err(err) => Err(err),
        };
        drop(ticket);
        let update = match result {
            Ok(paths) => PdfUpdate::Complete { paths },
            Err(err) => PdfUpdate::from_error(&err),
        };
        let _ = update_tx.send(update);
    });
    Ok(())
}
