//! TF-IDF tier: a local sparse vector space built from the corpus alone.
//!
//! # Weighting
//!
//! Terms are lowercase alphanumeric unigrams plus adjacent bigrams. For a
//! corpus of `n` documents where a term appears in `df` of them:
//!
//! ```text
//! idf(t)    = ln((1 + n) / (1 + df(t))) + 1
//! w(t, d)   = count(t, d) × idf(t)
//! ```
//!
//! Document and query vectors are L2-normalized, so the dot product is the
//! cosine similarity and lies in `[0, 1]`.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{QueryRepr, SimilarityBackend, SimilarityIndex};
use crate::error::Result;
use crate::models::Tier;

/// Default vocabulary cap.
pub const DEFAULT_MAX_FEATURES: usize = 20_000;

/// A sparse vector: `(term id, weight)` pairs sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            if a == b {
                sum += wa * wb;
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }
        sum
    }
}

/// Vocabulary, IDF table, and per-document vectors.
#[derive(Debug, Clone, Default)]
pub struct TfIdfIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: Vec<SparseVector>,
}

impl TfIdfIndex {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Map text into this index's vector space. Unknown terms are dropped.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in terms(text) {
            if let Some(&id) = self.vocabulary.get(&term) {
                *counts.entry(id).or_default() += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id]))
            .collect();
        entries.sort_by_key(|(id, _)| *id);

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > f64::EPSILON {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        } else {
            entries.clear();
        }

        SparseVector { entries }
    }

    pub fn score(&self, query: &SparseVector) -> Vec<(usize, f64)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(pos, doc)| (pos, doc.dot(query).clamp(0.0, 1.0)))
            .collect()
    }
}

/// Local TF-IDF backend. Deterministic and infallible.
#[derive(Debug, Clone)]
pub struct TfIdfBackend {
    max_features: Option<usize>,
}

impl Default for TfIdfBackend {
    fn default() -> Self {
        Self {
            max_features: Some(DEFAULT_MAX_FEATURES),
        }
    }
}

impl TfIdfBackend {
    /// `None` keeps every term.
    pub fn new(max_features: Option<usize>) -> Self {
        Self { max_features }
    }

    pub fn build(&self, texts: &[String]) -> TfIdfIndex {
        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| terms(t)).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut total_freq: HashMap<&str, usize> = HashMap::new();
        for doc in &tokenized {
            let mut seen: Vec<&str> = doc.iter().map(|t| t.as_str()).collect();
            for term in &seen {
                *total_freq.entry(*term).or_default() += 1;
            }
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        // Keep the most frequent terms, ties broken alphabetically.
        let mut kept: Vec<(&str, usize)> = total_freq.into_iter().collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        if let Some(cap) = self.max_features {
            kept.truncate(cap);
        }
        let mut kept: Vec<&str> = kept.into_iter().map(|(t, _)| t).collect();
        kept.sort_unstable();

        let n = texts.len() as f64;
        let idf: Vec<f64> = kept
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary: HashMap<String, usize> = kept
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();

        let mut index = TfIdfIndex {
            vocabulary,
            idf,
            documents: Vec::new(),
        };
        index.documents = texts.iter().map(|t| index.vectorize(t)).collect();
        index
    }
}

#[async_trait]
impl SimilarityBackend for TfIdfBackend {
    fn tier(&self) -> Tier {
        Tier::Tfidf
    }

    async fn fit(&self, texts: &[String]) -> Result<SimilarityIndex> {
        Ok(SimilarityIndex::Sparse(self.build(texts)))
    }

    async fn embed_query(&self, text: &str, index: &SimilarityIndex) -> Result<QueryRepr> {
        let vector = match index {
            SimilarityIndex::Sparse(i) => i.vectorize(text),
            _ => SparseVector::default(),
        };
        Ok(QueryRepr::Sparse(vector))
    }
}

/// Lowercase alphanumeric unigrams followed by adjacent bigrams.
fn terms(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let bigrams: Vec<String> = words
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();
    let mut out = words;
    out.extend(bigrams);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "Banpo Bridge | Rainbow fountain over the Han river at night".to_string(),
            "Namsan Tower | Panoramic city night view from the mountain".to_string(),
            "Ikseon-dong | Hanok alley with cafes and bars".to_string(),
        ]
    }

    fn top(index: &TfIdfIndex, query: &str) -> usize {
        let q = index.vectorize(query);
        let mut scores = index.score(&q);
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
        scores[0].0
    }

    #[test]
    fn test_terms_include_bigrams() {
        assert_eq!(
            terms("Han River, night!"),
            vec!["han", "river", "night", "han river", "river night"]
        );
        assert!(terms("  ").is_empty());
    }

    #[test]
    fn test_relevant_document_ranks_first() {
        let index = TfIdfBackend::default().build(&corpus());
        assert_eq!(top(&index, "river fountain"), 0);
        assert_eq!(top(&index, "mountain view"), 1);
        assert_eq!(top(&index, "hanok cafes"), 2);
    }

    #[test]
    fn test_scores_in_unit_interval() {
        let index = TfIdfBackend::default().build(&corpus());
        let q = index.vectorize("night view over the river");
        for (_, s) in index.score(&q) {
            assert!((0.0..=1.0).contains(&s), "score out of range: {}", s);
        }
        let self_q = index.vectorize(&corpus()[1]);
        let (_, s) = index.score(&self_q)[1];
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_and_empty_queries_score_zero() {
        let index = TfIdfBackend::default().build(&corpus());
        for query in ["", "zzz qqq"] {
            let q = index.vectorize(query);
            assert!(q.is_empty());
            assert!(index.score(&q).iter().all(|(_, s)| *s == 0.0));
        }
    }

    #[test]
    fn test_empty_corpus_builds_empty_index() {
        let index = TfIdfBackend::default().build(&[]);
        assert!(index.is_empty());
        assert!(index.score(&index.vectorize("river")).is_empty());
    }

    #[test]
    fn test_max_features_caps_vocabulary() {
        let index = TfIdfBackend::new(Some(3)).build(&corpus());
        assert_eq!(index.vocabulary_size(), 3);
        let unbounded = TfIdfBackend::new(None).build(&corpus());
        assert!(unbounded.vocabulary_size() > 3);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = TfIdfBackend::default().build(&corpus());
        let b = TfIdfBackend::default().build(&corpus());
        let qa = a.vectorize("night river");
        let qb = b.vectorize("night river");
        assert_eq!(qa, qb);
        assert_eq!(a.score(&qa), b.score(&qb));
    }
}
