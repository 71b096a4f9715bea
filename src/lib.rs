//! # Nightspot
//!
//! Resilient semantic and geo search over a snapshot of night-view venues.
//!
//! Semantic queries go through a tiered similarity engine that prefers
//! remote embeddings and degrades to local TF-IDF, then keyword overlap,
//! whenever the tier above is unconfigured or failing. Proximity queries
//! rank venues by great-circle distance from an origin.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────────────┐
//! │  Snapshot  │──▶│ VenueService │──▶│ nightspot-core           │
//! │  (JSON)    │   │  (facade)    │   │ tiered retrieval · geo   │
//! └────────────┘   └──────┬───────┘   └────────────┬─────────────┘
//!                         │                        │
//!               ┌─────────┴────────┐       ┌───────▼────────┐
//!               ▼                  ▼       │ Azure OpenAI   │
//!          ┌──────────┐      ┌──────────┐  │ embeddings     │
//!          │   CLI    │      │   HTTP   │  └────────────────┘
//!          │  (spot)  │      │  tools   │
//!          └──────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and env fallback |
//! | [`embedding`] | Azure OpenAI embedding provider |
//! | [`snapshot`] | Snapshot loading, raw row normalization, import |
//! | [`service`] | The venue service facade |
//! | [`digest`] | Rule-based plain-text answers |
//! | [`search`] | `spot ask` |
//! | [`nearby`] | `spot nearby` |
//! | [`status`] | `spot status` and `spot presets` |
//! | [`server`] | HTTP tool server |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod digest;
pub mod embedding;
pub mod logging;
pub mod nearby;
pub mod search;
pub mod server;
pub mod service;
pub mod snapshot;
pub mod status;
