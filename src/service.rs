//! The venue service: one process-wide entry point over both engines.
//!
//! [`VenueService`] owns the corpus and the tiered retrieval engine. The
//! similarity index is built lazily on the first semantic query (or eagerly
//! through [`VenueService::warm_up`]) and replaced only by an explicit
//! [`VenueService::rebuild`]. Builds are serialized by an async mutex;
//! readers keep using the previous complete index while a rebuild runs.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::info;

use nightspot_core::corpus::Corpus;
use nightspot_core::geo::nearest_to;
use nightspot_core::models::{GeoPoint, RankedResult, Tier};
use nightspot_core::projection::{project_for_visualization, Projection};
use nightspot_core::retrieval::{BuiltIndex, DegradationEvent, TieredRetrieval};
use nightspot_core::similarity::TfIdfBackend;

use crate::config::Config;
use crate::digest::{summarize_nearby, summarize_semantic};
use crate::embedding::embedding_backend;
use crate::snapshot::load_snapshot;

type CoreResult<T> = nightspot_core::Result<T>;

/// Defaults applied when a query leaves a parameter unset.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub preferred_tier: Tier,
    pub semantic_top_k: usize,
    pub nearby_top_k: usize,
    pub default_radius_km: Option<f64>,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            preferred_tier: config.retrieval.preferred_tier,
            semantic_top_k: config.retrieval.default_top_k,
            nearby_top_k: config.geo.default_top_k,
            default_radius_km: config.geo.default_radius_km,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticAnswer {
    pub query: String,
    pub active_tier: Tier,
    pub results: Vec<RankedResult>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyAnswer {
    pub origin: GeoPoint,
    pub radius_km: Option<f64>,
    pub results: Vec<RankedResult>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub preferred_tier: Tier,
    pub active_tier: Option<Tier>,
    pub standby_tier: Option<Tier>,
    pub corpus_size: usize,
    pub located: usize,
    pub built_at: Option<DateTime<Utc>>,
    pub degradations: Vec<DegradationEvent>,
}

pub struct VenueService {
    corpus: RwLock<Arc<Corpus>>,
    engine: TieredRetrieval,
    build_lock: Mutex<()>,
    settings: ServiceSettings,
}

impl VenueService {
    pub fn new(corpus: Corpus, engine: TieredRetrieval, settings: ServiceSettings) -> Self {
        Self {
            corpus: RwLock::new(Arc::new(corpus)),
            engine,
            build_lock: Mutex::new(()),
            settings,
        }
    }

    /// Load the configured snapshot and wire up the standard tier ladder.
    pub fn from_config(config: &Config) -> Result<Self> {
        let corpus = load_snapshot(&config.corpus.path)?;
        let engine = TieredRetrieval::standard(
            embedding_backend(config),
            TfIdfBackend::new(config.retrieval.tfidf_max_features),
        );
        Ok(Self::new(corpus, engine, ServiceSettings::from_config(config)))
    }

    pub fn corpus(&self) -> Arc<Corpus> {
        Arc::clone(&self.corpus.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Build the index now instead of on the first semantic query.
    pub async fn warm_up(&self) -> CoreResult<()> {
        self.ensure_index().await.map(|_| ())
    }

    async fn ensure_index(&self) -> CoreResult<Arc<BuiltIndex>> {
        if let Some(built) = self.engine.current() {
            return Ok(built);
        }
        let _guard = self.build_lock.lock().await;
        if let Some(built) = self.engine.current() {
            return Ok(built);
        }
        self.engine
            .build_index(self.corpus(), self.settings.preferred_tier)
            .await
    }

    /// Rebuild from the preferred tier, discarding any sticky demotion.
    pub async fn rebuild(&self) -> CoreResult<IndexStatus> {
        let _guard = self.build_lock.lock().await;
        self.engine
            .build_index(self.corpus(), self.settings.preferred_tier)
            .await?;
        Ok(self.index_status())
    }

    pub async fn ask_semantic(&self, query: &str, top_k: Option<usize>) -> CoreResult<SemanticAnswer> {
        let top_k = top_k.unwrap_or(self.settings.semantic_top_k);
        let built = self.ensure_index().await?;
        let outcome = built.search(query, top_k).await?;
        info!(
            tier = %outcome.tier,
            results = outcome.results.len(),
            "semantic query answered"
        );
        Ok(SemanticAnswer {
            query: query.to_string(),
            active_tier: outcome.tier,
            answer: summarize_semantic(query, &outcome.results, outcome.tier),
            results: outcome.results,
        })
    }

    /// Rank venues by distance from `(lat, lon)`.
    ///
    /// An unset radius falls back to `geo.default_radius_km`.
    pub fn ask_nearby(
        &self,
        lat: f64,
        lon: f64,
        top_k: Option<usize>,
        radius_km: Option<f64>,
    ) -> CoreResult<NearbyAnswer> {
        let origin = GeoPoint::new(lat, lon)?;
        self.ask_nearby_from(origin, top_k, radius_km)
    }

    pub fn ask_nearby_from(
        &self,
        origin: GeoPoint,
        top_k: Option<usize>,
        radius_km: Option<f64>,
    ) -> CoreResult<NearbyAnswer> {
        let top_k = top_k.unwrap_or(self.settings.nearby_top_k);
        let radius_km = radius_km.or(self.settings.default_radius_km);
        let results = nearest_to(origin, &self.corpus(), top_k, radius_km)?;
        info!(
            origin = %format!("({:.2}, {:.2})", origin.lat(), origin.lon()),
            radius_km = ?radius_km,
            results = results.len(),
            "nearby query answered"
        );
        Ok(NearbyAnswer {
            origin,
            radius_km,
            answer: summarize_nearby(&results, radius_km),
            results,
        })
    }

    pub fn visualize(&self, lat: f64, lon: f64, results: &[RankedResult]) -> CoreResult<Projection> {
        let reference = GeoPoint::new(lat, lon)?;
        Ok(project_for_visualization(reference, results))
    }

    pub fn index_status(&self) -> IndexStatus {
        let corpus = self.corpus();
        let built = self.engine.current();
        IndexStatus {
            preferred_tier: self.settings.preferred_tier,
            active_tier: built.as_ref().map(|b| b.active_tier()),
            standby_tier: built.as_ref().and_then(|b| b.standby_tier()),
            corpus_size: corpus.len(),
            located: corpus.located(),
            built_at: built.as_ref().map(|b| b.built_at()),
            degradations: built.map(|b| b.degradations()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nightspot_core::embedding::EmbeddingProvider;
    use nightspot_core::models::VenueRecord;
    use nightspot_core::similarity::EmbeddingBackend;
    use nightspot_core::{Error, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn settings() -> ServiceSettings {
        ServiceSettings {
            preferred_tier: Tier::Embedding,
            semantic_top_k: 5,
            nearby_top_k: 5,
            default_radius_km: Some(3.0),
        }
    }

    fn service() -> VenueService {
        let corpus = Corpus::new(vec![
            VenueRecord::new("v1", "Seoullo 7017")
                .unwrap()
                .with_description("Elevated garden walkway lit at night")
                .with_coordinates(Some(37.5567), Some(126.9707)),
            VenueRecord::new("v2", "Namsan Tower")
                .unwrap()
                .with_description("Panoramic night view of the city")
                .with_coordinates(Some(37.5512), Some(126.9882)),
            VenueRecord::new("v3", "Banpo Bridge")
                .unwrap()
                .with_description("Rainbow fountain over the Han river")
                .with_coordinates(Some(37.5118), Some(126.9960)),
        ]);
        let engine = TieredRetrieval::standard(
            EmbeddingBackend::unavailable("not configured"),
            TfIdfBackend::default(),
        );
        VenueService::new(corpus, engine, settings())
    }

    #[tokio::test]
    async fn test_lazy_build_on_first_query() {
        let service = service();
        assert_eq!(service.index_status().active_tier, None);

        let answer = service.ask_semantic("rainbow fountain", None).await.unwrap();
        assert_eq!(answer.active_tier, Tier::Tfidf);
        assert_eq!(answer.results[0].record.id, "v3");

        let status = service.index_status();
        assert_eq!(status.active_tier, Some(Tier::Tfidf));
        assert_eq!(status.degradations.len(), 1);
        assert_eq!(status.corpus_size, 3);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_index() {
        let service = service();
        service.warm_up().await.unwrap();
        let first = service.index_status().built_at.unwrap();
        let status = service.rebuild().await.unwrap();
        assert!(status.built_at.unwrap() >= first);
        assert_eq!(status.active_tier, Some(Tier::Tfidf));
    }

    /// Embeds instantly, except that every fit after the first waits for
    /// `release` once it has signalled `entered`.
    struct GatedProvider {
        fits: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    impl GatedProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fits: AtomicUsize::new(0),
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for GatedProvider {
        fn model_name(&self) -> &str {
            "gated"
        }

        async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
            if texts.len() > 1 && self.fits.fetch_add(1, Ordering::SeqCst) >= 1 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let river = if t.to_lowercase().contains("river") { 1.0 } else { 0.0 };
                    vec![river, 1.0 - river]
                })
                .collect())
        }
    }

    fn gated_service(provider: Arc<GatedProvider>) -> Arc<VenueService> {
        let engine = TieredRetrieval::standard(EmbeddingBackend::new(provider), TfIdfBackend::default());
        let mut service = service();
        service.engine = engine;
        Arc::new(service)
    }

    #[tokio::test]
    async fn test_concurrent_first_queries_build_once() {
        let provider = GatedProvider::new();
        let service = gated_service(Arc::clone(&provider));

        let (a, b) = tokio::join!(
            service.ask_semantic("river", None),
            service.ask_semantic("night view", None)
        );
        assert_eq!(a.unwrap().active_tier, Tier::Embedding);
        assert_eq!(b.unwrap().active_tier, Tier::Embedding);
        assert_eq!(provider.fits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_readers_see_previous_index_during_rebuild() {
        let provider = GatedProvider::new();
        let service = gated_service(Arc::clone(&provider));
        service.warm_up().await.unwrap();
        let first_built = service.index_status().built_at.unwrap();

        let rebuild = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.rebuild().await }
        });
        provider.entered.notified().await;

        // The rebuild holds the build lock and is stuck inside `fit`.
        for query in ["river", "rainbow fountain", "night view"] {
            let answer = service.ask_semantic(query, None).await.unwrap();
            assert_eq!(answer.active_tier, Tier::Embedding);
        }
        assert_eq!(service.index_status().built_at, Some(first_built));

        provider.release.notify_one();
        let status = rebuild.await.unwrap().unwrap();
        assert_eq!(status.active_tier, Some(Tier::Embedding));
        assert!(status.built_at.unwrap() >= first_built);
        assert_eq!(provider.fits.load(Ordering::SeqCst), 2);

        let answer = service.ask_semantic("river", Some(1)).await.unwrap();
        assert_eq!(answer.results[0].record.id, "v3");
    }

    #[test]
    fn test_nearby_uses_default_radius() {
        let service = service();
        let answer = service.ask_nearby(37.5563, 126.9723, None, None).unwrap();
        assert_eq!(answer.radius_km, Some(3.0));
        assert!(answer.results.iter().all(|r| r.distance_km().unwrap() <= 3.0));
        assert_eq!(answer.results[0].record.id, "v1");
        assert!(!answer.results.iter().any(|r| r.record.id == "v3"));

        let wide = service.ask_nearby(37.5563, 126.9723, Some(10), Some(20.0)).unwrap();
        assert_eq!(wide.results.len(), 3);
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let service = service();
        let err = service.ask_nearby(120.0, 126.97, None, None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(service.visualize(f64::NAN, 0.0, &[]).is_err());
    }

    #[test]
    fn test_visualize_nearby_results() {
        let service = service();
        let answer = service.ask_nearby(37.5563, 126.9723, None, Some(10.0)).unwrap();
        let projection = service.visualize(37.5563, 126.9723, &answer.results).unwrap();
        assert_eq!(projection.points.len(), answer.results.len());
    }
}
