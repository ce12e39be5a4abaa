//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    // Initialize database with DbContext
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    let tables = ctx.list_tables().await?;

    println!(
        "  {} Database ready at {} ({} tables)",
        style("✓").green(),
        settings.database_path().display(),
        tables.len()
    );
    println!(
        "  {} Document store at {}",
        style("✓").green(),
        ctx.documents_dir().display()
    );
    println!(
        "{} Initialized Redline in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
