//! HTTP tool server.
//!
//! Exposes the venue service as JSON tools that AI agents and scripts can
//! call over HTTP.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all tools with parameter schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Tools
//!
//! | Name | Parameters | Result |
//! |------|------------|--------|
//! | `ask_semantic` | `query`, `top_k?` | ranked results, active tier, digest |
//! | `ask_nearby` | `lat`+`lon` or `near`, `top_k?`, `radius_km?` | ranked results, digest |
//! | `visualize` | as `ask_nearby`, plus `grid?` (3 to 101) | results, projection, ASCII minimap |
//! | `index_status` | none | tier, corpus size, build time, degradations |
//! | `rebuild` | none | status after rebuilding from the preferred tier |
//!
//! Successful calls return `{ "result": ... }`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "top_k must be at least 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `not_indexed` (409),
//! `provider_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use nightspot_core::geo::resolve_origin;
use nightspot_core::projection::{render_minimap, MAX_GRID, MIN_GRID};
use nightspot_core::Error;

use crate::config::Config;
use crate::service::VenueService;

const DEFAULT_GRID: usize = 21;

/// Build the service from config and serve it on `[server].bind`.
///
/// The similarity index is warmed up before the listener opens so the
/// first query does not pay for the build.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(VenueService::from_config(config)?);
    if let Err(e) = service.warm_up().await {
        warn!(error = %e, "index warm-up failed, will retry on first query");
    }

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "tool server listening");
    serve(listener, service).await
}

/// Serve the tool API on an already-bound listener.
pub async fn serve(listener: TcpListener, service: Arc<VenueService>) -> anyhow::Result<()> {
    axum::serve(listener, router(service)).await?;
    Ok(())
}

pub fn router(service: Arc<VenueService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::NotIndexed => (StatusCode::CONFLICT, "not_indexed"),
            Error::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            Error::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolInfo {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

fn origin_schema(extra: Value) -> Value {
    let mut properties = json!({
        "lat": { "type": "number", "description": "Origin latitude" },
        "lon": { "type": "number", "description": "Origin longitude" },
        "near": { "type": "string", "description": "Preset landmark, e.g. 남산 or gangnam" },
        "top_k": { "type": "integer", "minimum": 1 },
        "radius_km": { "type": "number", "minimum": 0 }
    });
    if let (Some(props), Value::Object(more)) = (properties.as_object_mut(), extra) {
        props.extend(more);
    }
    json!({ "type": "object", "properties": properties })
}

fn tool_catalog() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "ask_semantic",
            description: "Rank venues by similarity to a free-text query",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "top_k": { "type": "integer", "minimum": 1 }
                },
                "required": ["query"]
            }),
        },
        ToolInfo {
            name: "ask_nearby",
            description: "Rank venues by great-circle distance from an origin",
            parameters: origin_schema(json!({})),
        },
        ToolInfo {
            name: "visualize",
            description: "Nearby venues projected into the unit square, with an ASCII minimap",
            parameters: origin_schema(json!({
                "grid": { "type": "integer", "minimum": MIN_GRID, "maximum": MAX_GRID }
            })),
        },
        ToolInfo {
            name: "index_status",
            description: "Active similarity tier, corpus size, and degradation history",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolInfo {
            name: "rebuild",
            description: "Rebuild the similarity index starting from the preferred tier",
            parameters: json!({ "type": "object", "properties": {} }),
        },
    ]
}

async fn handle_list_tools() -> Json<Value> {
    Json(json!({ "tools": tool_catalog() }))
}

// ============ POST /tools/{name} ============

#[derive(Deserialize)]
struct SemanticParams {
    query: String,
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct NearbyParams {
    lat: Option<f64>,
    lon: Option<f64>,
    near: Option<String>,
    top_k: Option<usize>,
    radius_km: Option<f64>,
    grid: Option<usize>,
}

fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T, AppError> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| bad_request(format!("{}: {}", tool, e)))
}

async fn handle_tool_call(
    State(service): State<Arc<VenueService>>,
    Path(name): Path<String>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let result = match name.as_str() {
        "ask_semantic" => {
            let p: SemanticParams = parse_params(&name, params)?;
            json!(service.ask_semantic(&p.query, p.top_k).await?)
        }
        "ask_nearby" => {
            let p: NearbyParams = parse_params(&name, params)?;
            let origin = resolve_origin(p.near.as_deref(), p.lat, p.lon)?;
            json!(service.ask_nearby_from(origin, p.top_k, p.radius_km)?)
        }
        "visualize" => {
            let p: NearbyParams = parse_params(&name, params)?;
            let grid = p.grid.unwrap_or(DEFAULT_GRID);
            if !(MIN_GRID..=MAX_GRID).contains(&grid) {
                return Err(bad_request(format!(
                    "grid must be between {} and {}, got {}",
                    MIN_GRID, MAX_GRID, grid
                )));
            }
            let origin = resolve_origin(p.near.as_deref(), p.lat, p.lon)?;
            let nearby = service.ask_nearby_from(origin, p.top_k, p.radius_km)?;
            let projection = service.visualize(origin.lat(), origin.lon(), &nearby.results)?;
            let minimap = render_minimap(&projection, grid);
            json!({
                "results": nearby.results,
                "projection": projection,
                "minimap": minimap,
            })
        }
        "index_status" => json!(service.index_status()),
        "rebuild" => json!(service.rebuild().await?),
        _ => return Err(not_found(format!("no tool registered with name: {}", name))),
    };

    Ok(Json(json!({ "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let e = AppError::from(Error::NotIndexed);
        assert_eq!((e.status, e.code), (StatusCode::CONFLICT, "not_indexed"));
        let e = AppError::from(Error::Validation("bad".into()));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        let e = AppError::from(Error::Provider(nightspot_core::ProviderError::Timeout {
            timeout_secs: 5,
        }));
        assert_eq!((e.status, e.code), (StatusCode::BAD_GATEWAY, "provider_error"));
    }

    #[test]
    fn test_catalog_names() {
        let names: Vec<&str> = tool_catalog().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["ask_semantic", "ask_nearby", "visualize", "index_status", "rebuild"]
        );
        let visualize = &tool_catalog()[2];
        assert_eq!(visualize.parameters["properties"]["grid"]["maximum"], MAX_GRID);
        assert!(visualize.parameters["properties"]["near"].is_object());
    }
}
