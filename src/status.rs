//! `spot status` and `spot presets`.

use anyhow::Result;

use nightspot_core::geo::PRESETS;

use crate::config::Config;
use crate::service::VenueService;

/// Build the index and print which tier it landed on.
pub async fn run_status(config: &Config, json: bool) -> Result<()> {
    let service = VenueService::from_config(config)?;
    if let Err(e) = service.warm_up().await {
        eprintln!("warning: index build failed: {}", e);
    }
    let status = service.index_status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Nightspot Index Status");
    println!("======================");
    println!();
    println!("  Corpus:      {}", config.corpus.path.display());
    println!("  Venues:      {} ({} with coordinates)", status.corpus_size, status.located);
    println!("  Preferred:   {}", status.preferred_tier);
    println!(
        "  Active:      {}",
        status.active_tier.map(|t| t.to_string()).unwrap_or_else(|| "none".to_string())
    );
    if let Some(standby) = status.standby_tier {
        println!("  Standby:     {}", standby);
    }
    if let Some(built_at) = status.built_at {
        println!("  Built:       {}", built_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if !status.degradations.is_empty() {
        println!();
        println!("  Degradations:");
        for event in &status.degradations {
            let to = event.to.map(|t| t.to_string()).unwrap_or_else(|| "none".to_string());
            println!("    {} → {}: {}", event.from, to, event.reason);
        }
    }
    Ok(())
}

pub fn run_presets() {
    for preset in PRESETS {
        println!(
            "{:<8} {:>9.4} {:>9.4}  {}",
            preset.name,
            preset.lat,
            preset.lon,
            preset.aliases.join(", ")
        );
    }
}
