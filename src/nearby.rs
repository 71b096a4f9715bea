//! `spot nearby`: proximity ranking from the command line.

use anyhow::{Context, Result};

use nightspot_core::geo::resolve_origin;
use nightspot_core::projection::render_minimap;

use crate::config::Config;
use crate::service::VenueService;

const MINIMAP_GRID: usize = 21;

pub struct NearbyArgs {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub near: Option<String>,
    pub limit: Option<usize>,
    pub radius_km: Option<f64>,
    pub map: bool,
    pub json: bool,
}

pub fn run_nearby(config: &Config, args: &NearbyArgs) -> Result<()> {
    let origin = resolve_origin(args.near.as_deref(), args.lat, args.lon)
        .context("Could not determine the origin")?;

    let service = VenueService::from_config(config)?;
    let answer = service.ask_nearby_from(origin, args.limit, args.radius_km)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer);
    if args.map && !answer.results.is_empty() {
        let projection = service.visualize(origin.lat(), origin.lon(), &answer.results)?;
        println!();
        println!("{}", render_minimap(&projection, MINIMAP_GRID));
    }
    Ok(())
}
