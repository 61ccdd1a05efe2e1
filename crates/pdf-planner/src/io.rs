//! Document I/O

use crate::options::ToolOptions;
use crate::types::*;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// A parsed source document together with the facts the planner needs
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub document: Document,
    pub info: DocumentInfo,
}

impl SourceDocument {
    pub fn page_count(&self) -> usize {
        self.info.page_count
    }
}

/// Parse an in-memory PDF. The page count always comes from the parsed file.
pub async fn load_pdf_bytes(bytes: Vec<u8>) -> Result<SourceDocument> {
    let size_bytes = bytes.len() as u64;
    let document = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(PlannerError::TransformFailure(
            "Document has no pages".to_string(),
        ));
    }
    Ok(SourceDocument {
        document,
        info: DocumentInfo {
            page_count,
            size_bytes,
        },
    })
}

/// Load a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<SourceDocument> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let source = load_pdf_bytes(bytes).await?;
    log::debug!(
        "Loaded {} ({} pages, {} bytes)",
        path.display(),
        source.info.page_count,
        source.info.size_bytes
    );
    Ok(source)
}

/// Load multiple PDF documents
pub async fn load_multiple_pdfs(paths: &[impl AsRef<Path>]) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    for path in paths {
        documents.push(load_pdf(path).await?);
    }
    Ok(documents)
}

/// Serialize a document to bytes
pub async fn pdf_to_bytes(mut doc: Document) -> Result<Vec<u8>> {
    let bytes = tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, PlannerError>(writer)
    })
    .await??;
    Ok(bytes)
}

/// Save a produced document
pub async fn save_pdf(doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let bytes = pdf_to_bytes(doc).await?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Save every output of a run into `dir`, named after the configured stem
pub async fn save_outputs(
    docs: Vec<Document>,
    dir: impl AsRef<Path>,
    options: &ToolOptions,
) -> Result<Vec<PathBuf>> {
    let count = docs.len();
    let mut written = Vec::with_capacity(count);
    for (index, doc) in docs.into_iter().enumerate() {
        let path = dir.as_ref().join(options.output_file_name(index, count));
        save_pdf(doc, &path).await?;
        written.push(path);
    }
    Ok(written)
}
