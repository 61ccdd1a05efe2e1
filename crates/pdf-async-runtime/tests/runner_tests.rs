mod common;

use std::sync::Arc;

use common::{FailingBackend, GatedBackend, create_test_pdf};
use pdf_async_runtime::*;
use pdf_planner::{EntryJob, PageEntry};
use tokio::sync::Notify;

fn keep_first_page() -> TransformJob {
    TransformJob::Pages(EntryJob::new(vec![PageEntry::new(0)]))
}

#[tokio::test]
async fn test_lopdf_backend_runs_job() {
    let runner = Runner::new(LopdfBackend);
    let outputs = runner
        .run(vec![create_test_pdf(3)], keep_first_page())
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].get_pages().len(), 1);
    assert!(!runner.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_run_rejected_while_first_in_flight() {
    let gate = Arc::new(Notify::new());
    let runner = Arc::new(Runner::new(GatedBackend::new(Arc::clone(&gate))));

    let first = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            runner
                .run(
                    vec![create_test_pdf(4)],
                    TransformJob::Pages(EntryJob::new(vec![
                        PageEntry::new(3),
                        PageEntry::new(2),
                    ])),
                )
                .await
        })
    };

    while runner.backend().calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(runner.is_running());

    let second = runner.run(vec![create_test_pdf(1)], keep_first_page()).await;
    let err = second.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyInProgress);
    assert!(matches!(
        err,
        RunError::Planner(PlannerError::AlreadyInProgress)
    ));

    // The rejected request never reached the backend
    assert_eq!(runner.backend().calls(), 1);

    gate.notify_one();
    let outputs = first.await.unwrap().unwrap();
    assert_eq!(outputs[0].get_pages().len(), 2);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_ticket_blocks_until_dropped() {
    let runner = Runner::new(LopdfBackend);
    let ticket = runner.try_begin().unwrap();
    assert!(runner.is_running());
    assert!(runner.try_begin().is_err());

    drop(ticket);
    assert!(!runner.is_running());
    assert!(runner.try_begin().is_ok());
}

#[tokio::test]
async fn test_ticket_from_another_runner_is_rejected() {
    let first = Runner::new(LopdfBackend);
    let gate = Arc::new(Notify::new());
    let second = Runner::new(GatedBackend::new(gate));

    let foreign = first.try_begin().unwrap();
    let err = second
        .execute(&foreign, vec![create_test_pdf(2)], keep_first_page())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyInProgress);
    assert_eq!(second.backend().calls(), 0);
    assert!(!second.is_running());

    // The owning runner still accepts its own ticket
    let outputs = first
        .execute(&foreign, vec![create_test_pdf(2)], keep_first_page())
        .await
        .unwrap();
    assert_eq!(outputs[0].get_pages().len(), 1);
}

#[tokio::test]
async fn test_failed_run_leaves_plan_untouched() {
    let mut planner = PagePlanner::new();
    planner.initialize(3).unwrap();
    planner.reorder(0, 2).unwrap();
    planner.rotate_entry(1, 180).unwrap();
    planner.toggle_select(0).unwrap();

    let before = planner.snapshot().unwrap();
    let selection_before = planner.selection().unwrap();

    let runner = Runner::new(FailingBackend);
    let job = Operation::Organize.compile(&planner).unwrap();
    let err = runner
        .run(vec![create_test_pdf(3)], job.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransformFailure);

    assert_eq!(planner.snapshot().unwrap(), before);
    assert_eq!(planner.selection().unwrap(), selection_before);

    // The slot is released so the same job can be retried
    assert!(!runner.is_running());
    let retry = runner.run(vec![create_test_pdf(3)], job).await.unwrap_err();
    assert_eq!(retry.kind(), ErrorKind::TransformFailure);
}
