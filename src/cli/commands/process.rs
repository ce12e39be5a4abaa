//! Pipeline execution and recovery commands.

use std::time::Duration;

use console::style;

use crate::config::Settings;
use crate::models::sources;
use crate::services::{
    RecoveryDisposition, RecoveryOptions, RunOptions, RunOutcome, RunReport,
};

use super::helpers;

/// Run the processing pipeline for one document.
pub async fn cmd_process(
    settings: &Settings,
    document_id: &str,
    retry: bool,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let ctx = helpers::open_context(settings).await?;
    let services = helpers::build_services(settings, &ctx);

    if retry {
        if services.pipeline.reset_failed(document_id).await? {
            println!(
                "  {} Reset {} back to PENDING",
                style("✓").green(),
                document_id
            );
        } else {
            println!(
                "  {} Document is not in ERROR, nothing to reset",
                style("!").yellow()
            );
        }
    }

    let options = RunOptions {
        stage_timeout: timeout.map(Duration::from_secs),
        source: sources::USER.to_string(),
        ..Default::default()
    };

    println!(
        "{} Processing document {}",
        style("→").cyan(),
        document_id
    );
    let report = services.pipeline.run(document_id, &options).await?;
    print_run_report(&report);

    if matches!(report.outcome, RunOutcome::NotFound) {
        anyhow::bail!("document not found: {}", document_id);
    }
    Ok(())
}

/// Print a human-readable summary of a pipeline run.
pub(super) fn print_run_report(report: &RunReport) {
    match &report.outcome {
        RunOutcome::Completed => {
            println!("  {} Processing completed", style("✓").green());
        }
        RunOutcome::AlreadyCompleted => {
            println!(
                "  {} Document is already completed, nothing to do",
                style("✓").green()
            );
        }
        RunOutcome::NotFound => {
            println!("  {} Document not found", style("✗").red());
        }
        RunOutcome::Faulted { reason } => {
            println!(
                "  {} Document is in ERROR{}",
                style("✗").red(),
                reason
                    .as_deref()
                    .map(|r| format!(": {}", r))
                    .unwrap_or_default()
            );
            println!("    Use --retry to reset it back to PENDING first");
        }
        RunOutcome::StageFailed { stage, reason } => {
            println!(
                "  {} Stage {} failed: {}",
                style("✗").red(),
                stage.display_name(),
                reason
            );
        }
        RunOutcome::Conflict { stage } => {
            println!(
                "  {} Another run is already processing this document ({})",
                style("!").yellow(),
                stage.display_name()
            );
        }
    }
}

/// Sweep for stalled documents and restart them.
pub async fn cmd_recover(
    settings: &Settings,
    staleness: Option<u64>,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let ctx = helpers::open_context(settings).await?;
    let services = helpers::build_services(settings, &ctx);

    let options = RecoveryOptions {
        staleness: Duration::from_secs(staleness.unwrap_or(settings.staleness_secs)),
        limit: limit.unwrap_or(settings.recovery_limit),
        ..Default::default()
    };

    println!(
        "{} Scanning for documents stalled longer than {}s...",
        style("→").cyan(),
        options.staleness.as_secs()
    );
    let report = services.recovery.recover(&options).await?;

    if report.count == 0 {
        println!("  {} No stalled documents found", style("✓").green());
        return Ok(());
    }

    for outcome in &report.outcomes {
        match outcome.disposition {
            RecoveryDisposition::Recovered => {
                println!(
                    "  {} Restarted {}",
                    style("✓").green(),
                    outcome.document_id
                );
            }
            RecoveryDisposition::Failed => {
                println!(
                    "  {} Skipped {}{}",
                    style("!").yellow(),
                    outcome.document_id,
                    outcome
                        .detail
                        .as_deref()
                        .map(|d| format!(" ({})", d))
                        .unwrap_or_default()
                );
            }
            RecoveryDisposition::Error => {
                println!(
                    "  {} Failed to reset {}{}",
                    style("✗").red(),
                    outcome.document_id,
                    outcome
                        .detail
                        .as_deref()
                        .map(|d| format!(" ({})", d))
                        .unwrap_or_default()
                );
            }
        }
    }
    println!(
        "{} Recovery sweep touched {} document(s)",
        style("✓").green(),
        report.count
    );

    // Restarted pipelines run as background tasks on this runtime; wait
    // for them so a one-shot CLI invocation doesn't drop them at exit.
    let recovered: Vec<String> = report
        .outcomes
        .iter()
        .filter(|o| o.disposition == RecoveryDisposition::Recovered)
        .map(|o| o.document_id.clone())
        .collect();
    if !recovered.is_empty() {
        println!(
            "  {} Waiting for {} restarted pipeline(s) to finish...",
            style("→").cyan(),
            recovered.len()
        );
        wait_for_settled(&ctx.documents(), &recovered, settings).await?;
    }

    Ok(())
}

/// Poll until every restarted document reaches a terminal status.
async fn wait_for_settled(
    documents: &crate::repository::DocumentRepository,
    ids: &[String],
    settings: &Settings,
) -> anyhow::Result<()> {
    let deadline =
        std::time::Instant::now() + Duration::from_secs(settings.request_timeout.max(1) * 4);
    loop {
        let mut active = 0;
        for id in ids {
            if let Some(doc) = documents.get(id).await? {
                if doc.is_in_flight() {
                    active += 1;
                }
            }
        }
        if active == 0 {
            println!("  {} All restarted pipelines settled", style("✓").green());
            return Ok(());
        }
        if std::time::Instant::now() > deadline {
            println!(
                "  {} {} document(s) still processing, check `redline status` later",
                style("!").yellow(),
                active
            );
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
