//! Offline access to the persistent search index.

use console::style;

use crate::config::Settings;
use crate::services::SearchIndex;

pub async fn cmd_index_add(settings: &Settings, text: &str) -> anyhow::Result<()> {
    let index = SearchIndex::open(&settings.index_dir)?;
    let position = index.index_document(text)?;
    index.shutdown()?;
    println!(
        "{} Indexed document #{} ({} total)",
        style("✓").green(),
        position,
        index.len()
    );
    Ok(())
}

pub async fn cmd_index_search(
    settings: &Settings,
    query: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let index = SearchIndex::open(&settings.index_dir)?;
    let hits = index.search(query, limit);

    if hits.is_empty() {
        println!("{} No matches for {}", style("!").yellow(), style(query).cyan());
        return Ok(());
    }

    for hit in hits {
        println!("{} {}", style(format!("{:>8.3}", hit.score)).dim(), hit.text);
    }
    Ok(())
}
