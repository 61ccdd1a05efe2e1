#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::{Dictionary, Document, Object, Stream};
use pdf_async_runtime::TransformBackend;
use pdf_planner::{PlannerError, TransformJob, apply_transform};
use tokio::sync::Notify;

pub fn create_test_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for i in 0..num_pages {
        let content = format!("BT /F1 12 Tf 50 700 Td (Page-{}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(num_pages as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_test_pdf(dir: &std::path::Path, name: &str, num_pages: usize) -> std::path::PathBuf {
    let mut bytes = Vec::new();
    create_test_pdf(num_pages).save_to(&mut bytes).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Backend that blocks every call until the gate is opened
pub struct GatedBackend {
    gate: Arc<Notify>,
    calls: AtomicUsize,
}

impl GatedBackend {
    pub fn new(gate: Arc<Notify>) -> Self {
        Self {
            gate,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransformBackend for GatedBackend {
    async fn apply(
        &self,
        sources: Vec<Document>,
        job: TransformJob,
    ) -> pdf_planner::Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        apply_transform(&sources, &job)
    }
}

pub struct FailingBackend;

impl TransformBackend for FailingBackend {
    async fn apply(
        &self,
        _sources: Vec<Document>,
        _job: TransformJob,
    ) -> pdf_planner::Result<Vec<Document>> {
        Err(PlannerError::TransformFailure("backend refused".to_string()))
    }
}
