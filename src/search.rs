//! `spot ask`: semantic venue search from the command line.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::service::VenueService;

/// Run a semantic query and print the digest, or the full answer as JSON.
///
/// The tier that answered is always reported, on stderr in text mode so the
/// digest on stdout stays clean.
pub async fn run_ask(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let service = VenueService::from_config(config)?;
    let answer = service
        .ask_semantic(query, limit)
        .await
        .with_context(|| format!("Semantic search failed for query: {}", query))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    if answer.results.is_empty() {
        println!("No results.");
    } else {
        println!("{}", answer.answer);
    }
    for event in service.index_status().degradations {
        eprintln!(
            "note: {} tier unavailable ({}); answered with {}",
            event.from, event.reason, answer.active_tier
        );
    }
    Ok(())
}
