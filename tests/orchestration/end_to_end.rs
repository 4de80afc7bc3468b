//! Full submit-then-review flows over HTTP against the mock dispatcher.

use std::fs;

use anyhow::Result;
use seqjob::FileLedger;

use crate::support::helpers::{http_orchestrator, init_tracing, protein_request};
use crate::support::mock_service::{MockDispatcher, MockDispatcherServer};

#[tokio::test]
async fn submitted_jobs_finish_and_land_in_the_results_tree() -> Result<()> {
    init_tracing();
    let dispatcher = MockDispatcher::default();
    let server = MockDispatcherServer::start(dispatcher.clone()).await?;
    let dir = tempfile::tempdir()?;
    let orch = http_orchestrator(server.url(), 3, dir.path());

    let summary = orch
        .submit_batch(
            "IGH",
            vec![
                protein_request("IGH", "a.aln"),
                protein_request("IGH", "b.aln"),
            ],
        )
        .await?;
    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.failed, 0);

    // Finish every job the ledger recorded.
    let ledger = FileLedger::new(dir.path().join("ledger"));
    let pending = ledger.load("IGH")?;
    assert_eq!(pending.len(), 2);
    for entry in &pending {
        dispatcher.finish_job(
            entry.job_id(),
            &format!("CLUSTAL alignment for {}", entry.output_target()),
        );
    }

    let report = orch.review_pending(&["IGH"]).await?;
    assert!(report.all_complete());
    assert_eq!(report.resolved(), 2);

    let a = fs::read_to_string(dir.path().join("results").join("IGH").join("a.aln"))?;
    assert_eq!(a, "CLUSTAL alignment for a.aln");
    assert!(!ledger.pending_path("IGH").exists());
    assert_eq!(orch.telemetry().resolved_entries(), 2);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn submission_form_carries_the_dispatcher_parameters() -> Result<()> {
    init_tracing();
    let dispatcher = MockDispatcher::default();
    let server = MockDispatcherServer::start(dispatcher.clone()).await?;
    let dir = tempfile::tempdir()?;
    let orch = http_orchestrator(server.url(), 1, dir.path());

    orch.submit_batch("IGH", vec![protein_request("IGH", "a.aln")])
        .await?;

    let bodies = dispatcher.received_bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("stype=protein"));
    assert!(bodies[0].contains("outfmt=clustal_num"));
    assert!(bodies[0].contains("email=ops%40example.org"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn exhausted_submission_fails_without_aborting_the_batch() -> Result<()> {
    init_tracing();
    let dispatcher = MockDispatcher::default();
    let server = MockDispatcherServer::start(dispatcher.clone()).await?;
    let dir = tempfile::tempdir()?;
    // Parallelism 1 so the injected failures all hit the first request.
    let orch = http_orchestrator(server.url(), 1, dir.path());

    dispatcher.fail_next_submissions(3);
    let summary = orch
        .submit_batch(
            "IGH",
            vec![
                protein_request("IGH", "a.aln"),
                protein_request("IGH", "b.aln"),
            ],
        )
        .await?;

    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.failed, 1);
    // Three attempts for the doomed request, one for the survivor.
    assert_eq!(dispatcher.submission_count(), 4);

    let pending = FileLedger::new(dir.path().join("ledger")).load("IGH")?;
    assert_eq!(pending.len(), 1);
    assert_eq!(orch.telemetry().failed_submissions(), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn review_converges_over_repeated_passes() -> Result<()> {
    init_tracing();
    let dispatcher = MockDispatcher::default();
    let server = MockDispatcherServer::start(dispatcher.clone()).await?;
    let dir = tempfile::tempdir()?;
    let orch = http_orchestrator(server.url(), 2, dir.path());

    orch.submit_batch(
        "IGH",
        vec![
            protein_request("IGH", "a.aln"),
            protein_request("IGH", "b.aln"),
        ],
    )
    .await?;

    let ledger = FileLedger::new(dir.path().join("ledger"));
    let pending: Vec<_> = ledger.load("IGH")?.into_iter().collect();
    let first = pending
        .iter()
        .find(|e| e.output_target() == "a.aln")
        .expect("a.aln must be pending");
    let second = pending
        .iter()
        .find(|e| e.output_target() == "b.aln")
        .expect("b.aln must be pending");

    dispatcher.finish_job(first.job_id(), "first alignment");
    let pass_one = orch.review_pending(&["IGH"]).await?;
    assert_eq!(pass_one.resolved(), 1);
    assert_eq!(pass_one.remaining(), 1);
    assert!(dir
        .path()
        .join("results")
        .join("IGH")
        .join("a.aln")
        .exists());

    dispatcher.finish_job(second.job_id(), "second alignment");
    let pass_two = orch.review_pending(&["IGH"]).await?;
    assert!(pass_two.all_complete());

    // A pass over the drained ledger is a no-op.
    let pass_three = orch.review_pending(&["IGH"]).await?;
    assert!(pass_three.all_complete());
    assert_eq!(pass_three.resolved(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn terminally_errored_job_is_dropped_from_the_ledger() -> Result<()> {
    init_tracing();
    let dispatcher = MockDispatcher::default();
    let server = MockDispatcherServer::start(dispatcher.clone()).await?;
    let dir = tempfile::tempdir()?;
    let orch = http_orchestrator(server.url(), 1, dir.path());

    orch.submit_batch("IGH", vec![protein_request("IGH", "a.aln")])
        .await?;

    let ledger = FileLedger::new(dir.path().join("ledger"));
    let entry = ledger
        .load("IGH")?
        .into_iter()
        .next()
        .expect("one entry must be pending");
    dispatcher.error_job(entry.job_id());

    let report = orch.review_pending(&["IGH"]).await?;
    assert!(report.all_complete());
    assert_eq!(report.resolved(), 0);
    assert_eq!(report.groups[0].errored, 1);
    assert!(!ledger.pending_path("IGH").exists());
    assert!(!dir
        .path()
        .join("results")
        .join("IGH")
        .join("a.aln")
        .exists());

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn grouped_submission_reviews_per_group() -> Result<()> {
    init_tracing();
    let dispatcher = MockDispatcher::default();
    let server = MockDispatcherServer::start(dispatcher.clone()).await?;
    let dir = tempfile::tempdir()?;
    let orch = http_orchestrator(server.url(), 2, dir.path());

    let summaries = orch
        .submit_grouped(vec![
            protein_request("IGH", "a.aln"),
            protein_request("IGK", "b.aln"),
        ])
        .await?;
    assert_eq!(summaries.len(), 2);

    let ledger = FileLedger::new(dir.path().join("ledger"));
    for group in ["IGH", "IGK"] {
        for entry in ledger.load(group)? {
            dispatcher.finish_job(entry.job_id(), "aligned");
        }
    }

    let report = orch.review_pending(&["IGH", "IGK"]).await?;
    assert!(report.all_complete());
    assert_eq!(report.resolved(), 2);
    assert!(dir
        .path()
        .join("results")
        .join("IGK")
        .join("b.aln")
        .exists());

    server.shutdown().await;
    Ok(())
}
