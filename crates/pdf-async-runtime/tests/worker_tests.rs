mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{GatedBackend, write_test_pdf};
use pdf_async_runtime::*;
use pdf_planner::{EntryJob, PageEntry, Rotation, load_pdf};
use tokio::sync::{Notify, mpsc};

async fn next_update(rx: &mut mpsc::UnboundedReceiver<PdfUpdate>) -> PdfUpdate {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for update")
        .expect("worker hung up")
}

fn spawn_worker<B: TransformBackend + 'static>(
    runner: Arc<Runner<B>>,
) -> (
    mpsc::UnboundedSender<PdfCommand>,
    mpsc::UnboundedReceiver<PdfUpdate>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_task(runner, command_rx, update_tx));
    (command_tx, update_rx)
}

async fn load(
    tx: &mpsc::UnboundedSender<PdfCommand>,
    rx: &mut mpsc::UnboundedReceiver<PdfUpdate>,
    path: std::path::PathBuf,
) -> (DocumentId, usize) {
    tx.send(PdfCommand::Load { path }).unwrap();
    match next_update(rx).await {
        PdfUpdate::Loaded {
            doc_id, page_count, ..
        } => (doc_id, page_count),
        other => panic!("Expected Loaded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_run_close() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), "input.pdf", 3);
    let (tx, mut rx) = spawn_worker(Arc::new(Runner::new(LopdfBackend)));

    let (doc_id, page_count) = load(&tx, &mut rx, input).await;
    assert_eq!(page_count, 3);

    let mut planner = PagePlanner::new();
    planner.initialize(page_count).unwrap();
    planner.reorder(2, 0).unwrap();
    planner.rotate_entry(0, 90).unwrap();

    tx.send(PdfCommand::Run {
        doc_ids: vec![doc_id],
        job: Operation::Organize.compile(&planner).unwrap(),
        output_dir: dir.path().to_path_buf(),
        options: ToolOptions {
            output_name: "organized".to_string(),
            ..Default::default()
        },
    })
    .unwrap();

    assert!(matches!(next_update(&mut rx).await, PdfUpdate::Started { .. }));
    let paths = match next_update(&mut rx).await {
        PdfUpdate::Complete { paths } => paths,
        other => panic!("Expected Complete, got {:?}", other),
    };
    assert_eq!(paths, vec![dir.path().join("organized.pdf")]);
    assert_eq!(load_pdf(&paths[0]).await.unwrap().page_count(), 3);

    tx.send(PdfCommand::Close { doc_id }).unwrap();
    assert!(matches!(
        next_update(&mut rx).await,
        PdfUpdate::Closed { doc_id: closed } if closed == doc_id
    ));
}

#[tokio::test]
async fn test_load_missing_file_reports_error() {
    let (tx, mut rx) = spawn_worker(Arc::new(Runner::new(LopdfBackend)));
    tx.send(PdfCommand::Load {
        path: "/definitely/not/here.pdf".into(),
    })
    .unwrap();
    assert!(matches!(
        next_update(&mut rx).await,
        PdfUpdate::Error { .. }
    ));
}

#[tokio::test]
async fn test_run_on_unknown_document_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = spawn_worker(Arc::new(Runner::new(LopdfBackend)));

    tx.send(PdfCommand::Run {
        doc_ids: vec![DocumentId(42)],
        job: TransformJob::Pages(EntryJob::new(vec![PageEntry::new(0)])),
        output_dir: dir.path().to_path_buf(),
        options: ToolOptions::default(),
    })
    .unwrap();

    match next_update(&mut rx).await {
        PdfUpdate::Error { kind, .. } => assert_eq!(kind, ErrorKind::OutOfRange),
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_while_busy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), "input.pdf", 2);

    let gate = Arc::new(Notify::new());
    let runner = Arc::new(Runner::new(GatedBackend::new(Arc::clone(&gate))));
    let (tx, mut rx) = spawn_worker(Arc::clone(&runner));

    let (doc_id, _) = load(&tx, &mut rx, input).await;
    let run = |name: &str, rotation| PdfCommand::Run {
        doc_ids: vec![doc_id],
        job: TransformJob::Pages(EntryJob::new(vec![PageEntry::rotated(1, rotation)])),
        output_dir: dir.path().to_path_buf(),
        options: ToolOptions {
            output_name: name.to_string(),
            ..Default::default()
        },
    };

    tx.send(run("first", Rotation::Clockwise90)).unwrap();
    tx.send(run("second", Rotation::Clockwise180)).unwrap();

    assert!(matches!(next_update(&mut rx).await, PdfUpdate::Started { .. }));
    match next_update(&mut rx).await {
        PdfUpdate::Error { kind, .. } => assert_eq!(kind, ErrorKind::AlreadyInProgress),
        other => panic!("Expected Error, got {:?}", other),
    }

    gate.notify_one();
    match next_update(&mut rx).await {
        PdfUpdate::Complete { paths } => {
            assert_eq!(paths, vec![dir.path().join("first.pdf")]);
        }
        other => panic!("Expected Complete, got {:?}", other),
    }
    assert!(!dir.path().join("second.pdf").exists());
    assert_eq!(runner.backend().calls(), 1);
}

#[tokio::test]
async fn test_merge_needs_at_least_one_document() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = spawn_worker(Arc::new(Runner::new(LopdfBackend)));

    tx.send(PdfCommand::Run {
        doc_ids: vec![],
        job: TransformJob::Merge,
        output_dir: dir.path().to_path_buf(),
        options: ToolOptions::default(),
    })
    .unwrap();

    match next_update(&mut rx).await {
        PdfUpdate::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidInput),
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_images_job_runs_without_source_documents() {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let mut png = Vec::new();
    RgbImage::from_pixel(40, 20, Rgb([0, 128, 255]))
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = spawn_worker(Arc::new(Runner::new(LopdfBackend)));
    let planner = PagePlanner::new();

    tx.send(PdfCommand::Run {
        doc_ids: vec![],
        job: Operation::ImagesToPdf {
            images: vec![png.clone(), png],
        }
        .compile(&planner)
        .unwrap(),
        output_dir: dir.path().to_path_buf(),
        options: ToolOptions {
            output_name: "photos".to_string(),
            ..Default::default()
        },
    })
    .unwrap();

    assert!(matches!(next_update(&mut rx).await, PdfUpdate::Started { .. }));
    let paths = match next_update(&mut rx).await {
        PdfUpdate::Complete { paths } => paths,
        other => panic!("Expected Complete, got {:?}", other),
    };
    assert_eq!(load_pdf(&paths[0]).await.unwrap().page_count(), 2);
}

#[tokio::test]
async fn test_images_job_rejects_source_documents() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path(), "input.pdf", 1);
    let (tx, mut rx) = spawn_worker(Arc::new(Runner::new(LopdfBackend)));
    let (doc_id, _) = load(&tx, &mut rx, input).await;

    tx.send(PdfCommand::Run {
        doc_ids: vec![doc_id],
        job: TransformJob::Images(vec![vec![1, 2, 3]]),
        output_dir: dir.path().to_path_buf(),
        options: ToolOptions::default(),
    })
    .unwrap();

    match next_update(&mut rx).await {
        PdfUpdate::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidInput),
        other => panic!("Expected Error, got {:?}", other),
    }
}
