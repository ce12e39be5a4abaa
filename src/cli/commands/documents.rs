//! Document inspection commands: status, list, logs.

use console::style;
use serde_json::json;

use crate::config::Settings;
use crate::models::{LogQuery, LogStatus, ProcessingStatus};

use super::helpers;

const STATUS_ORDER: [ProcessingStatus; 6] = [
    ProcessingStatus::Pending,
    ProcessingStatus::ProcessingBasicInfo,
    ProcessingStatus::ProcessingAnalysis,
    ProcessingStatus::ProcessingServiceInfo,
    ProcessingStatus::Completed,
    ProcessingStatus::Error,
];

/// Show pipeline status: counts per status plus in-flight documents.
pub async fn cmd_status(settings: &Settings, json_output: bool) -> anyhow::Result<()> {
    let ctx = helpers::open_context(settings).await?;
    let documents = ctx.documents();

    let total = documents.count(None).await?;
    let by_status = documents.count_by_status().await?;
    let in_flight = documents.list_in_flight().await?;

    if json_output {
        let payload = json!({
            "total": total,
            "by_status": by_status,
            "in_flight": in_flight,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{} Pipeline status", style("→").cyan());
    println!("  Database: {}", settings.database_path().display());
    println!();
    for status in STATUS_ORDER {
        let count = by_status.get(status.as_str()).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let label = format!("{:<24}", status.as_str());
        match status {
            ProcessingStatus::Completed => {
                println!("  {} {} {}", style("✓").green(), label, count)
            }
            ProcessingStatus::Error => println!("  {} {} {}", style("✗").red(), label, count),
            _ => println!("  {} {} {}", style("→").cyan(), label, count),
        }
    }
    println!("  {} {:<24} {}", style("Σ").bold(), "TOTAL", total);

    if !in_flight.is_empty() {
        println!();
        println!("{} In flight:", style("→").cyan());
        for doc in &in_flight {
            println!(
                "  {}  {:<24} {}",
                doc.id,
                doc.status.as_str(),
                doc.file_name
            );
        }
    }

    Ok(())
}

/// List documents, newest first.
pub async fn cmd_list(
    settings: &Settings,
    status: Option<&str>,
    limit: i64,
    offset: i64,
    format: &str,
) -> anyhow::Result<()> {
    let status = match status {
        Some(s) => Some(parse_status(s)?),
        None => None,
    };

    let ctx = helpers::open_context(settings).await?;
    let documents = ctx.documents().list(status, limit, offset).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
        "ids" => {
            for doc in &documents {
                println!("{}", doc.id);
            }
        }
        _ => {
            if documents.is_empty() {
                println!("{} No documents found", style("!").yellow());
                return Ok(());
            }
            println!(
                "{:<36}  {:<24} {:>10}  {:<19}  {}",
                "ID", "STATUS", "SIZE", "CREATED", "NAME"
            );
            for doc in &documents {
                println!(
                    "{:<36}  {:<24} {:>10}  {:<19}  {}",
                    doc.id,
                    doc.status.as_str(),
                    doc.file_size,
                    doc.created_at.format("%Y-%m-%d %H:%M:%S"),
                    doc.file_name
                );
            }
            println!();
            println!("{} document(s)", documents.len());
        }
    }

    Ok(())
}

/// Query the processing ledger.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_logs(
    settings: &Settings,
    document: Option<String>,
    action: Option<String>,
    source: Option<String>,
    status: Option<String>,
    search: Option<String>,
    limit: i64,
    offset: i64,
    json_output: bool,
) -> anyhow::Result<()> {
    let status = match status.as_deref() {
        Some(s) => Some(LogStatus::from_str(s).ok_or_else(|| {
            anyhow::anyhow!("unknown log status {:?} (expected SUCCESS, ERROR, or SKIPPED)", s)
        })?),
        None => None,
    };

    let query = LogQuery {
        document_id: document,
        action,
        source,
        status,
        search,
        limit,
        offset,
    };

    let ctx = helpers::open_context(settings).await?;
    let page = ctx.logs().query(&query).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.entries.is_empty() {
        println!("{} No ledger entries match", style("!").yellow());
        return Ok(());
    }

    for entry in &page.entries {
        let glyph = match entry.status {
            LogStatus::Success => style("✓").green(),
            LogStatus::Error => style("✗").red(),
            LogStatus::Skipped => style("!").yellow(),
        };
        let duration = entry
            .duration_ms
            .map(|ms| format!(" [{}ms]", ms))
            .unwrap_or_default();
        println!(
            "{} {}  {:<24} {:<10} {}{}",
            glyph,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.source.as_deref().unwrap_or("-"),
            entry.description.as_deref().unwrap_or(""),
            duration
        );
        if let Some(document_id) = &entry.document_id {
            println!("    document: {}", document_id);
        }
    }
    println!();
    println!(
        "Showing {} of {} entries (offset {})",
        page.entries.len(),
        page.total,
        page.offset
    );

    Ok(())
}

fn parse_status(s: &str) -> anyhow::Result<ProcessingStatus> {
    ProcessingStatus::from_str(&s.to_uppercase()).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown status {:?} (expected one of PENDING, PROCESSING_BASIC_INFO, \
             PROCESSING_ANALYSIS, PROCESSING_SERVICE_INFO, COMPLETED, ERROR)",
            s
        )
    })
}
