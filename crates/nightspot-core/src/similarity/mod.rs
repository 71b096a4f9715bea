//! Similarity backends: one contract, three tiers.
//!
//! | Tier | Backend | Representation | Failure modes |
//! |------|---------|----------------|---------------|
//! | [`Tier::Embedding`] | [`EmbeddingBackend`] | dense vectors from a remote provider | configuration, provider |
//! | [`Tier::Tfidf`] | [`TfIdfBackend`] | L2-normalized sparse TF-IDF vectors | none |
//! | [`Tier::Keyword`] | [`KeywordBackend`] | token multisets | none |
//!
//! Each backend builds and owns its own [`SimilarityIndex`] variant. The
//! index variants never look inside one another; the tiered engine only
//! ever pairs an index with the [`QueryRepr`] produced by the same backend.
//!
//! All backends are total over their inputs: empty text produces an empty
//! representation that scores `0.0` against every document, and tokens
//! unseen at fit time contribute nothing.

pub mod dense;
pub mod keyword;
pub mod tfidf;

use async_trait::async_trait;

pub use dense::{DenseIndex, EmbeddingBackend};
pub use keyword::{KeywordBackend, KeywordIndex, TokenBag};
pub use tfidf::{SparseVector, TfIdfBackend, TfIdfIndex};

use crate::error::Result;
use crate::models::Tier;

/// A similarity strategy the tiered engine can fit and query.
#[async_trait]
pub trait SimilarityBackend: Send + Sync {
    /// The tier this backend implements.
    fn tier(&self) -> Tier;

    /// Whether fitting or querying leaves the process (and can fail at
    /// query time).
    fn is_remote(&self) -> bool {
        false
    }

    /// Build an index over the corpus texts, by position.
    async fn fit(&self, texts: &[String]) -> Result<SimilarityIndex>;

    /// Represent a query against an index previously built by this backend.
    async fn embed_query(&self, text: &str, index: &SimilarityIndex) -> Result<QueryRepr>;
}

/// A fitted index, tagged by the backend that built it.
#[derive(Debug, Clone)]
pub enum SimilarityIndex {
    Dense(DenseIndex),
    Sparse(TfIdfIndex),
    Lexical(KeywordIndex),
}

/// A query representation, tagged like [`SimilarityIndex`].
#[derive(Debug, Clone)]
pub enum QueryRepr {
    Dense(Vec<f32>),
    Sparse(SparseVector),
    Tokens(TokenBag),
}

impl SimilarityIndex {
    /// An index with zero documents for the given tier.
    pub fn empty(tier: Tier) -> Self {
        match tier {
            Tier::Embedding => SimilarityIndex::Dense(DenseIndex::default()),
            Tier::Tfidf => SimilarityIndex::Sparse(TfIdfIndex::default()),
            Tier::Keyword => SimilarityIndex::Lexical(KeywordIndex::default()),
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            SimilarityIndex::Dense(_) => Tier::Embedding,
            SimilarityIndex::Sparse(_) => Tier::Tfidf,
            SimilarityIndex::Lexical(_) => Tier::Keyword,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        match self {
            SimilarityIndex::Dense(i) => i.len(),
            SimilarityIndex::Sparse(i) => i.len(),
            SimilarityIndex::Lexical(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Score every document against the query, by position.
    ///
    /// A representation from a different tier scores nothing.
    pub fn score(&self, query: &QueryRepr) -> Vec<(usize, f64)> {
        match (self, query) {
            (SimilarityIndex::Dense(index), QueryRepr::Dense(q)) => index.score(q),
            (SimilarityIndex::Sparse(index), QueryRepr::Sparse(q)) => index.score(q),
            (SimilarityIndex::Lexical(index), QueryRepr::Tokens(q)) => index.score(q),
            _ => Vec::new(),
        }
    }
}
