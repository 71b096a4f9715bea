//! Embedding tier: dense vectors from a remote [`EmbeddingProvider`].

use async_trait::async_trait;
use std::sync::Arc;

use super::{QueryRepr, SimilarityBackend, SimilarityIndex};
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::{Error, ProviderError, Result};
use crate::models::Tier;

/// Dense document vectors, by corpus position.
#[derive(Debug, Clone, Default)]
pub struct DenseIndex {
    vectors: Vec<Vec<f32>>,
    dims: usize,
}

impl DenseIndex {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Cosine similarity clamped to `[0, 1]`.
    pub fn score(&self, query: &[f32]) -> Vec<(usize, f64)> {
        self.vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, cosine_similarity(v, query).max(0.0) as f64))
            .collect()
    }
}

enum Source {
    Provider(Arc<dyn EmbeddingProvider>),
    Unavailable(String),
}

/// The highest-fidelity tier.
///
/// Constructed either around a live provider or as [`unavailable`], in
/// which case every fit fails with [`Error::Configuration`] and the engine
/// degrades immediately.
///
/// [`unavailable`]: EmbeddingBackend::unavailable
pub struct EmbeddingBackend {
    source: Source,
}

impl EmbeddingBackend {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            source: Source::Provider(provider),
        }
    }

    /// A backend that cannot run, e.g. because no endpoint is configured.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            source: Source::Unavailable(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.source, Source::Provider(_))
    }

    fn provider(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        match &self.source {
            Source::Provider(p) => Ok(p),
            Source::Unavailable(reason) => Err(Error::Configuration(reason.clone())),
        }
    }
}

#[async_trait]
impl SimilarityBackend for EmbeddingBackend {
    fn tier(&self) -> Tier {
        Tier::Embedding
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn fit(&self, texts: &[String]) -> Result<SimilarityIndex> {
        let provider = self.provider()?;
        if texts.is_empty() {
            return Ok(SimilarityIndex::empty(Tier::Embedding));
        }

        let vectors = provider.embed(texts).await?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            ))
            .into());
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
            return Err(ProviderError::InvalidResponse(
                "embeddings have inconsistent or zero dimensions".to_string(),
            )
            .into());
        }

        Ok(SimilarityIndex::Dense(DenseIndex { vectors, dims }))
    }

    async fn embed_query(&self, text: &str, index: &SimilarityIndex) -> Result<QueryRepr> {
        let dims = match index {
            SimilarityIndex::Dense(i) => i.dims(),
            _ => 0,
        };
        if text.trim().is_empty() {
            return Ok(QueryRepr::Dense(vec![0.0; dims]));
        }

        let provider = self.provider()?;
        let mut vectors = provider.embed(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("empty embedding response".into()))?;
        if dims != 0 && vector.len() != dims {
            return Err(ProviderError::InvalidResponse(format!(
                "query embedding has {} dimensions, index has {}",
                vector.len(),
                dims
            ))
            .into());
        }
        Ok(QueryRepr::Dense(vector))
    }
}
