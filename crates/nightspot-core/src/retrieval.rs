//! Tiered retrieval engine.
//!
//! Builds a similarity index by walking the tiers from the preferred one
//! downwards until a backend succeeds, then answers semantic queries from
//! that index.
//!
//! # Degradation
//!
//! ```text
//! EMBEDDING ──fail──▶ TFIDF ──fail──▶ KEYWORD
//! ```
//!
//! - At build time a backend failure moves to the next tier.
//! - When the winning tier is remote, the next local tier is fitted too and
//!   kept as a standby. A query-time failure of the remote tier demotes the
//!   index to the standby for the rest of its lifetime.
//! - Nothing ever moves back up. Only a new [`TieredRetrieval::build_index`]
//!   starts again from the preferred tier.
//!
//! Every step down is recorded as a [`DegradationEvent`] and logged with
//! `tracing::warn!`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::models::{RankSignal, RankedResult, Tier};
use crate::similarity::{
    EmbeddingBackend, KeywordBackend, SimilarityBackend, SimilarityIndex, TfIdfBackend,
};

/// One step down the tier ladder.
#[derive(Debug, Clone, Serialize)]
pub struct DegradationEvent {
    pub from: Tier,
    /// `None` when no lower tier was left to try.
    pub to: Option<Tier>,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Results of a semantic query, tagged with the tier that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RankedResult>,
    pub tier: Tier,
}

struct TierIndex {
    backend: Arc<dyn SimilarityBackend>,
    index: SimilarityIndex,
}

impl TierIndex {
    fn tier(&self) -> Tier {
        self.backend.tier()
    }
}

/// A complete, immutable index over one corpus snapshot.
pub struct BuiltIndex {
    corpus: Arc<Corpus>,
    primary: TierIndex,
    standby: Option<TierIndex>,
    demoted: AtomicBool,
    built_at: DateTime<Utc>,
    events: RwLock<Vec<DegradationEvent>>,
}

impl BuiltIndex {
    /// The tier queries are currently answered from.
    pub fn active_tier(&self) -> Tier {
        self.active().tier()
    }

    /// The local tier held in reserve, if the active tier is remote.
    pub fn standby_tier(&self) -> Option<Tier> {
        if self.is_demoted() {
            return None;
        }
        self.standby.as_ref().map(|s| s.tier())
    }

    pub fn is_demoted(&self) -> bool {
        self.demoted.load(Ordering::Acquire)
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Degradations recorded while building and querying this index.
    pub fn degradations(&self) -> Vec<DegradationEvent> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn active(&self) -> &TierIndex {
        match (&self.standby, self.is_demoted()) {
            (Some(standby), true) => standby,
            _ => &self.primary,
        }
    }

    /// Rank the corpus against `query`, best first.
    ///
    /// Only strictly positive similarities are returned. Equal scores keep
    /// corpus order. A blank query returns no results.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchOutcome> {
        if top_k == 0 {
            return Err(Error::Validation("top_k must be at least 1".to_string()));
        }
        if query.trim().is_empty() || self.corpus.is_empty() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                tier: self.active_tier(),
            });
        }

        let active = self.active();
        let (tier_index, repr) = match active.backend.embed_query(query, &active.index).await {
            Ok(repr) => (active, repr),
            Err(e) => {
                let standby = match (&self.standby, std::ptr::eq(active, &self.primary)) {
                    (Some(standby), true) if active.backend.is_remote() => standby,
                    _ => return Err(e),
                };
                self.demote(active.tier(), standby.tier(), &e);
                let repr = standby.backend.embed_query(query, &standby.index).await?;
                (standby, repr)
            }
        };

        let tier = tier_index.tier();
        let mut scored: Vec<(usize, f64)> = tier_index
            .index
            .score(&repr)
            .into_iter()
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        let results = scored
            .into_iter()
            .filter_map(|(pos, score)| self.corpus.get(pos).map(|r| (r, score)))
            .enumerate()
            .map(|(i, (record, score))| RankedResult {
                rank: i + 1,
                signal: RankSignal::Similarity { score, tier },
                record: record.clone(),
            })
            .collect();

        Ok(SearchOutcome { results, tier })
    }

    fn demote(&self, from: Tier, to: Tier, error: &Error) {
        if self
            .demoted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        warn!(
            from = %from,
            to = %to,
            error = %error,
            "query-time failure, switching to standby tier"
        );
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(DegradationEvent {
                from,
                to: Some(to),
                reason: error.to_string(),
                at: Utc::now(),
            });
    }
}

/// Owns the ordered backends and the currently published index.
pub struct TieredRetrieval {
    backends: Vec<Arc<dyn SimilarityBackend>>,
    current: RwLock<Option<Arc<BuiltIndex>>>,
}

impl TieredRetrieval {
    /// Backends are ordered by tier, highest fidelity first.
    pub fn new(mut backends: Vec<Arc<dyn SimilarityBackend>>) -> Self {
        backends.sort_by_key(|b| b.tier());
        Self {
            backends,
            current: RwLock::new(None),
        }
    }

    /// The full three-tier ladder.
    pub fn standard(embedding: EmbeddingBackend, tfidf: TfIdfBackend) -> Self {
        Self::new(vec![
            Arc::new(embedding),
            Arc::new(tfidf),
            Arc::new(KeywordBackend),
        ])
    }

    /// Build an index over `corpus`, starting at `preferred`, and publish it.
    ///
    /// The previously published index stays visible until the new one is
    /// complete. Fails only when every tier at or below `preferred` fails.
    /// An empty corpus still goes through every backend's `fit`, so an
    /// unconfigured tier is skipped and recorded like any other failure.
    pub async fn build_index(&self, corpus: Arc<Corpus>, preferred: Tier) -> Result<Arc<BuiltIndex>> {
        let candidates: Vec<&Arc<dyn SimilarityBackend>> = self
            .backends
            .iter()
            .filter(|b| b.tier() >= preferred)
            .collect();

        if candidates.is_empty() {
            return Err(Error::Configuration(format!(
                "no similarity backend available at or below tier '{}'",
                preferred
            )));
        }

        let texts = corpus.texts();
        let mut events = Vec::new();
        let mut last_error = None;

        for (i, backend) in candidates.iter().enumerate() {
            match backend.fit(&texts).await {
                Ok(index) => {
                    let primary = TierIndex {
                        backend: Arc::clone(backend),
                        index,
                    };
                    let standby = if backend.is_remote() {
                        fit_standby(&candidates[i + 1..], &texts).await
                    } else {
                        None
                    };
                    return Ok(self.publish(corpus, primary, standby, events));
                }
                Err(e) => {
                    let to = candidates.get(i + 1).map(|b| b.tier());
                    warn!(
                        from = %backend.tier(),
                        to = ?to,
                        error = %e,
                        "index build failed, trying next tier"
                    );
                    events.push(DegradationEvent {
                        from: backend.tier(),
                        to,
                        reason: e.to_string(),
                        at: Utc::now(),
                    });
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Configuration("every similarity tier failed".to_string())
        }))
    }

    /// The published index, if any.
    pub fn current(&self) -> Option<Arc<BuiltIndex>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn active_tier(&self) -> Option<Tier> {
        self.current().map(|b| b.active_tier())
    }

    /// Query the published index. Fails with [`Error::NotIndexed`] before
    /// the first successful build.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchOutcome> {
        let built = self.current().ok_or(Error::NotIndexed)?;
        built.search(query, top_k).await
    }

    fn publish(
        &self,
        corpus: Arc<Corpus>,
        primary: TierIndex,
        standby: Option<TierIndex>,
        events: Vec<DegradationEvent>,
    ) -> Arc<BuiltIndex> {
        info!(
            tier = %primary.tier(),
            standby = ?standby.as_ref().map(|s| s.tier()),
            documents = corpus.len(),
            degradations = events.len(),
            "similarity index built"
        );
        let built = Arc::new(BuiltIndex {
            corpus,
            primary,
            standby,
            demoted: AtomicBool::new(false),
            built_at: Utc::now(),
            events: RwLock::new(events),
        });
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&built));
        built
    }
}

async fn fit_standby(rest: &[&Arc<dyn SimilarityBackend>], texts: &[String]) -> Option<TierIndex> {
    for backend in rest.iter().filter(|b| !b.is_remote()) {
        match backend.fit(texts).await {
            Ok(index) => {
                return Some(TierIndex {
                    backend: Arc::clone(backend),
                    index,
                })
            }
            Err(e) => warn!(tier = %backend.tier(), error = %e, "standby fit failed"),
        }
    }
    None
}
