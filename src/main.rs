//! # Nightspot CLI (`spot`)
//!
//! The `spot` binary answers venue questions from a local snapshot: by
//! meaning (`spot ask`) or by distance (`spot nearby`), and serves the same
//! tools over HTTP (`spot serve`).
//!
//! ## Usage
//!
//! ```bash
//! spot --config ./config/spot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `spot ask "<query>"` | Semantic search over the corpus |
//! | `spot nearby --lat <lat> --lon <lon>` | Nearest venues to a coordinate |
//! | `spot nearby --near <preset>` | Nearest venues to a landmark |
//! | `spot status` | Build the index and show the active tier |
//! | `spot import <raw.json>` | Normalize a raw open-data export |
//! | `spot presets` | List landmark presets |
//! | `spot serve` | Start the HTTP tool server |
//!
//! ## Examples
//!
//! ```bash
//! # Normalize the city export into a snapshot
//! spot import ./raw/nightview.json --out ./data/venues.json
//!
//! # Ask by meaning
//! spot ask "quiet riverside walk with a bridge view"
//!
//! # Ask by distance, with a minimap
//! spot nearby --near namsan --radius-km 3 --map
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use nightspot::config;
use nightspot::logging::init_logging;
use nightspot::nearby::{run_nearby, NearbyArgs};
use nightspot::search::run_ask;
use nightspot::server::run_server;
use nightspot::snapshot::run_import;
use nightspot::status::{run_presets, run_status};

/// Nightspot: resilient semantic and geo search over night-view venues.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults. See
/// `config/spot.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "spot",
    about = "Nightspot: resilient semantic and geo search over night-view venues",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/spot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank venues by similarity to a free-text query.
    ///
    /// Uses the best available tier: remote embeddings, then local TF-IDF,
    /// then keyword overlap.
    Ask {
        /// The search query.
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Print the full answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rank venues by distance from an origin.
    Nearby {
        /// Origin latitude (requires --lon).
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        /// Origin longitude (requires --lat).
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        /// Landmark preset to use as origin (see `spot presets`).
        #[arg(long, required_unless_present = "lat")]
        near: Option<String>,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Only include venues within this many kilometres.
        #[arg(long)]
        radius_km: Option<f64>,

        /// Draw an ASCII minimap below the results.
        #[arg(long)]
        map: bool,

        /// Print the full answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build the similarity index and report the active tier.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Normalize a raw open-data export into a snapshot.
    Import {
        /// Raw JSON export (array of rows).
        raw: PathBuf,

        /// Output path. Defaults to `[corpus].path`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List landmark presets usable with `nearby --near`.
    Presets,

    /// Start the HTTP tool server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config_path = cli.config;
    let load = || config::load_config_or_default(&config_path);

    match cli.command {
        Commands::Ask { query, limit, json } => {
            run_ask(&load()?, &query, limit, json).await?;
        }
        Commands::Nearby {
            lat,
            lon,
            near,
            limit,
            radius_km,
            map,
            json,
        } => {
            let args = NearbyArgs {
                lat,
                lon,
                near,
                limit,
                radius_km,
                map,
                json,
            };
            run_nearby(&load()?, &args)?;
        }
        Commands::Status { json } => {
            run_status(&load()?, json).await?;
        }
        Commands::Import { raw, out } => {
            let cfg = load()?;
            let out = out.unwrap_or_else(|| cfg.corpus.path.clone());
            run_import(&raw, &out)?;
        }
        Commands::Presets => {
            run_presets();
        }
        Commands::Serve => {
            run_server(&load()?).await?;
        }
    }

    Ok(())
}
