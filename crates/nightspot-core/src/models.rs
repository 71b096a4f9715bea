//! Core data models shared by both engines.
//!
//! A [`VenueRecord`] is the normalized form of one venue. Coordinates are an
//! `Option<GeoPoint>` so that records with missing or bogus coordinates stay
//! searchable by text while being skipped by geo ranking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One of the interchangeable similarity strategies, ordered by fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Embedding,
    #[serde(alias = "tf-idf")]
    Tfidf,
    Keyword,
}

impl Tier {
    /// All tiers, highest fidelity first.
    pub const ORDER: [Tier; 3] = [Tier::Embedding, Tier::Tfidf, Tier::Keyword];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Embedding => "embedding",
            Tier::Tfidf => "tfidf",
            Tier::Keyword => "keyword",
        }
    }

    /// The next lower tier, if any.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Embedding => Some(Tier::Tfidf),
            Tier::Tfidf => Some(Tier::Keyword),
            Tier::Keyword => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedding" => Ok(Tier::Embedding),
            "tfidf" | "tf-idf" => Ok(Tier::Tfidf),
            "keyword" => Ok(Tier::Keyword),
            other => Err(Error::Validation(format!(
                "unknown tier '{}'. Use embedding, tfidf, or keyword.",
                other
            ))),
        }
    }
}

/// A WGS84 coordinate that is known to be finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Validate a user-supplied coordinate.
    ///
    /// Rejects non-finite values and values outside `-90..=90` /
    /// `-180..=180`. Zero is a legitimate query coordinate here.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(lat.is_finite() && lon.is_finite()) {
            return Err(Error::Validation(format!(
                "coordinates must be finite, got ({}, {})",
                lat, lon
            )));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::Validation(format!(
                "coordinates out of range: ({}, {})",
                lat, lon
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Coerce source coordinates into a point, or `None`.
    ///
    /// Source data encodes "unknown" as `0`, so a zero in either component
    /// yields `None`, as does a missing, non-finite, or out-of-range value.
    pub fn cleansed(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        let (lat, lon) = (lat?, lon?);
        if lat == 0.0 || lon == 0.0 {
            return None;
        }
        Self::new(lat, lon).ok()
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

/// A normalized venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VenueRecordRepr", into = "VenueRecordRepr")]
pub struct VenueRecord {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub operating_hours: Option<String>,
    pub fee: Option<String>,
    pub source_url: Option<String>,
}

impl VenueRecord {
    /// Create a record with only the required fields.
    ///
    /// Fails with [`Error::Validation`] when `id` or `name` is blank.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        let name = name.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::Validation("venue id must not be empty".to_string()));
        }
        if name.is_empty() {
            return Err(Error::Validation(format!(
                "venue '{}' has an empty name",
                id
            )));
        }
        Ok(Self {
            id,
            name,
            category: None,
            address: None,
            location: None,
            description: None,
            tags: None,
            operating_hours: None,
            fee: None,
            source_url: None,
        })
    }

    /// Attach source coordinates, cleansing them on the way in.
    pub fn with_coordinates(mut self, lat: Option<f64>, lon: Option<f64>) -> Self {
        self.location = GeoPoint::cleansed(lat, lon);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_blank(Some(description.into()));
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = non_blank(Some(address.into()));
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = non_blank(Some(tags.into()));
        self
    }

    /// Text fed to the similarity backends.
    ///
    /// Fields are joined with `" | "` in a fixed order so the same record
    /// always produces the same text.
    pub fn retrieval_text(&self) -> String {
        let fields = [
            Some(&self.name),
            self.category.as_ref(),
            self.description.as_ref(),
            self.operating_hours.as_ref(),
            self.fee.as_ref(),
            self.tags.as_ref(),
            self.address.as_ref(),
            self.source_url.as_ref(),
        ];
        fields
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Single-line excerpt of the retrieval text, at most `max_chars` long
    /// plus an ellipsis when truncated.
    pub fn snippet(&self, max_chars: usize) -> String {
        let text = self.retrieval_text().replace('\n', " ");
        let text = text.trim();
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let mut out: String = text.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Flat wire shape of [`VenueRecord`], used for snapshots and JSON output.
#[derive(Serialize, Deserialize)]
struct VenueRecordRepr {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operating_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fee: Option<String>,
    #[serde(default, alias = "sourceUrl", skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
}

impl TryFrom<VenueRecordRepr> for VenueRecord {
    type Error = String;

    fn try_from(repr: VenueRecordRepr) -> std::result::Result<Self, Self::Error> {
        let mut record = VenueRecord::new(repr.id, repr.name).map_err(|e| e.to_string())?;
        record.category = non_blank(repr.category);
        record.address = non_blank(repr.address);
        record.location = GeoPoint::cleansed(repr.latitude, repr.longitude);
        record.description = non_blank(repr.description);
        record.tags = non_blank(repr.tags);
        record.operating_hours = non_blank(repr.operating_hours);
        record.fee = non_blank(repr.fee);
        record.source_url = non_blank(repr.source_url);
        Ok(record)
    }
}

impl From<VenueRecord> for VenueRecordRepr {
    fn from(record: VenueRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            category: record.category,
            address: record.address,
            latitude: record.location.map(|p| p.lat()),
            longitude: record.location.map(|p| p.lon()),
            description: record.description,
            tags: record.tags,
            operating_hours: record.operating_hours,
            fee: record.fee,
            source_url: record.source_url,
        }
    }
}

/// Why a result is ranked where it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RankSignal {
    /// Semantic result: similarity in `[0, 1]` and the tier that produced it.
    Similarity { score: f64, tier: Tier },
    /// Geo result: great-circle distance from the reference point.
    Distance { distance_km: f64 },
}

/// A venue with its 1-based rank in a result list.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub rank: usize,
    #[serde(flatten)]
    pub signal: RankSignal,
    pub record: VenueRecord,
}

impl RankedResult {
    pub fn score(&self) -> Option<f64> {
        match self.signal {
            RankSignal::Similarity { score, .. } => Some(score),
            RankSignal::Distance { .. } => None,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self.signal {
            RankSignal::Similarity { tier, .. } => Some(tier),
            RankSignal::Distance { .. } => None,
        }
    }

    pub fn distance_km(&self) -> Option<f64> {
        match self.signal {
            RankSignal::Distance { distance_km } => Some(distance_km),
            RankSignal::Similarity { .. } => None,
        }
    }
}
