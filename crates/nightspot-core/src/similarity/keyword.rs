//! Keyword tier: multiset token overlap, the last resort.
//!
//! Similarity is the multiset Jaccard coefficient:
//!
//! ```text
//!             Σ min(q(t), d(t))
//! J(q, d) = ─────────────────────
//!             Σ max(q(t), d(t))
//! ```

use async_trait::async_trait;
use std::collections::HashMap;

use super::{QueryRepr, SimilarityBackend, SimilarityIndex};
use crate::error::Result;
use crate::models::Tier;

/// Token counts for one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBag {
    counts: HashMap<String, u32>,
    total: u32,
}

impl TokenBag {
    pub fn from_text(text: &str) -> Self {
        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut total = 0;
        for token in tokenize(text) {
            *counts.entry(token).or_default() += 1;
            total += 1;
        }
        Self { counts, total }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    fn overlap(&self, other: &TokenBag) -> f64 {
        if self.total == 0 || other.total == 0 {
            return 0.0;
        }
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let intersection: u32 = small
            .counts
            .iter()
            .map(|(t, &c)| c.min(large.counts.get(t).copied().unwrap_or(0)))
            .sum();
        let union = self.total + other.total - intersection;
        intersection as f64 / union as f64
    }
}

/// Token bags by corpus position.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    documents: Vec<TokenBag>,
}

impl KeywordIndex {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn score(&self, query: &TokenBag) -> Vec<(usize, f64)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(pos, doc)| (pos, doc.overlap(query)))
            .collect()
    }
}

/// Pure lexical backend. Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordBackend;

#[async_trait]
impl SimilarityBackend for KeywordBackend {
    fn tier(&self) -> Tier {
        Tier::Keyword
    }

    async fn fit(&self, texts: &[String]) -> Result<SimilarityIndex> {
        Ok(SimilarityIndex::Lexical(KeywordIndex {
            documents: texts.iter().map(|t| TokenBag::from_text(t)).collect(),
        }))
    }

    async fn embed_query(&self, text: &str, _index: &SimilarityIndex) -> Result<QueryRepr> {
        Ok(QueryRepr::Tokens(TokenBag::from_text(text)))
    }
}

/// Whitespace split, lowercase, edge punctuation trimmed.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}
