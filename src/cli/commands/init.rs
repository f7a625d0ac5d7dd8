//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::services::SearchIndex;

/// Create the data, media and index directories and apply migrations.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.migrate().await?;
    println!(
        "  {} Database ready at {}",
        style("✓").green(),
        settings.database_path().display()
    );

    let index = SearchIndex::open(&settings.index_dir)?;
    index.shutdown()?;
    println!(
        "  {} Search index ready at {} ({} documents)",
        style("✓").green(),
        settings.index_dir.display(),
        index.len()
    );

    if settings.auth.is_insecure_default() {
        println!(
            "{} CORPORATICA_JWT_SECRET is not set; tokens are signed with a built-in secret",
            style("!").yellow()
        );
    }

    println!(
        "{} Initialized Corporatica in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
