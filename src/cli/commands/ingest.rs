//! Ingest command.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::models::sources;
use crate::services::{IngestError, RunOptions};

use super::helpers;
use super::process::print_run_report;

/// Ingest one contract file, optionally running the pipeline right away.
pub async fn cmd_ingest(
    settings: &Settings,
    file: &Path,
    content_type: Option<&str>,
    name: Option<&str>,
    process: bool,
) -> anyhow::Result<()> {
    let content = tokio::fs::read(file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let file_name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string()),
    };

    let ctx = helpers::open_context(settings).await?;
    let services = helpers::build_services(settings, &ctx);

    println!(
        "{} Ingesting {} ({} bytes)",
        style("→").cyan(),
        file_name,
        content.len()
    );

    let result = match services.ingest.ingest(&content, &file_name, content_type).await {
        Ok(result) => result,
        Err(IngestError::Conversion(e)) => {
            eprintln!("  {} Text extraction failed: {}", style("✗").red(), e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if result.duplicate {
        println!(
            "  {} Identical content already ingested as document {}",
            style("!").yellow(),
            result.document_id
        );
        return Ok(());
    }

    println!(
        "  {} Created document {}",
        style("✓").green(),
        result.document_id
    );

    if process {
        let options = RunOptions {
            source: sources::USER.to_string(),
            ..Default::default()
        };
        println!(
            "{} Processing document {}",
            style("→").cyan(),
            result.document_id
        );
        let report = services.pipeline.run(&result.document_id, &options).await?;
        print_run_report(&report);
    } else {
        println!(
            "    Run `redline process {}` to extract contract data",
            result.document_id
        );
    }

    Ok(())
}
