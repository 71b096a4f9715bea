//! Geo-ranking: great-circle distance ranking and origin resolution.
//!
//! Distances use the haversine formula over a spherical Earth with the
//! IUGG mean radius. Records without coordinates never take part.

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::models::{GeoPoint, RankSignal, RankedResult};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let dphi = phi2 - phi1;
    let dlambda = (b.lon() - a.lon()).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// The `top_k` records closest to `reference`, nearest first.
///
/// With a radius, records farther than `radius_km` are dropped, so fewer
/// than `top_k` results is a normal outcome. Equal distances keep corpus
/// order.
pub fn nearest_to(
    reference: GeoPoint,
    corpus: &Corpus,
    top_k: usize,
    radius_km: Option<f64>,
) -> Result<Vec<RankedResult>> {
    if top_k == 0 {
        return Err(Error::Validation("top_k must be at least 1".to_string()));
    }
    if let Some(r) = radius_km {
        if !r.is_finite() || r < 0.0 {
            return Err(Error::Validation(format!(
                "radius_km must be a non-negative number, got {}",
                r
            )));
        }
    }

    let mut candidates: Vec<(f64, usize)> = corpus
        .iter()
        .enumerate()
        .filter_map(|(pos, record)| record.location.map(|p| (haversine_km(reference, p), pos)))
        .filter(|(d, _)| radius_km.map_or(true, |r| *d <= r))
        .collect();

    // Stable, so equal distances stay in corpus order.
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates.truncate(top_k);

    Ok(candidates
        .into_iter()
        .filter_map(|(d, pos)| corpus.get(pos).map(|r| (d, r)))
        .enumerate()
        .map(|(i, (distance_km, record))| RankedResult {
            rank: i + 1,
            signal: RankSignal::Distance { distance_km },
            record: record.clone(),
        })
        .collect())
}

/// A named reference point.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub lat: f64,
    pub lon: f64,
}

impl Preset {
    pub fn point(&self) -> Result<GeoPoint> {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Seoul landmarks usable as origins.
pub const PRESETS: &[Preset] = &[
    Preset {
        name: "시청",
        aliases: &["seoul city hall", "city hall"],
        lat: 37.5663,
        lon: 126.9779,
    },
    Preset {
        name: "광화문",
        aliases: &["gwanghwamun"],
        lat: 37.5759,
        lon: 126.9768,
    },
    Preset {
        name: "남산",
        aliases: &["namsan"],
        lat: 37.5512,
        lon: 126.9882,
    },
    Preset {
        name: "잠실",
        aliases: &["jamsil"],
        lat: 37.5130,
        lon: 127.1028,
    },
    Preset {
        name: "강남",
        aliases: &["gangnam"],
        lat: 37.4979,
        lon: 127.0276,
    },
    Preset {
        name: "여의도",
        aliases: &["yeouido"],
        lat: 37.5219,
        lon: 126.9244,
    },
];

/// Look up a preset by name or alias. Case-insensitive, surrounding
/// whitespace ignored.
pub fn preset(label: &str) -> Option<&'static Preset> {
    let key = label.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    PRESETS
        .iter()
        .find(|p| p.name == key || p.aliases.iter().any(|a| *a == key))
}

/// Pick the query origin.
///
/// A known preset label wins over explicit coordinates. An unknown label
/// falls back to the coordinates when both are given.
pub fn resolve_origin(label: Option<&str>, lat: Option<f64>, lon: Option<f64>) -> Result<GeoPoint> {
    let label = label.map(str::trim).filter(|l| !l.is_empty());
    if let Some(found) = label.and_then(preset) {
        return found.point();
    }
    match (lat, lon, label) {
        (Some(lat), Some(lon), _) => GeoPoint::new(lat, lon),
        (_, _, Some(label)) => {
            let known: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
            Err(Error::Validation(format!(
                "unknown location preset '{}'. Known presets: {}",
                label,
                known.join(", ")
            )))
        }
        _ => Err(Error::Validation(
            "an origin needs either a preset label or both latitude and longitude".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VenueRecord;

    fn at(id: &str, lat: f64, lon: f64) -> VenueRecord {
        VenueRecord::new(id, format!("Venue {}", id))
            .unwrap()
            .with_coordinates(Some(lat), Some(lon))
    }

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_haversine_known_distance() {
        let city_hall = point(37.5663, 126.9779);
        let gangnam = point(37.4979, 127.0276);
        let d = haversine_km(city_hall, gangnam);
        assert!((8.5..9.1).contains(&d), "got {}", d);
        assert_eq!(haversine_km(city_hall, city_hall), 0.0);
        assert!((haversine_km(gangnam, city_hall) - d).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_within_radius_ascending() {
        let corpus = Corpus::new(vec![
            at("far", 37.385, 126.97),
            at("mid", 37.52, 127.072),
            at("near", 37.5227, 126.97),
        ]);
        let results = nearest_to(point(37.52, 126.97), &corpus, 2, Some(10.0)).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(results.iter().all(|r| r.distance_km().unwrap() <= 10.0));
        assert_eq!(results[1].rank, 2);
    }

    #[test]
    fn test_radius_may_return_fewer() {
        let corpus = Corpus::new(vec![
            at("a", 37.51, 126.98),
            at("b", 37.60, 127.10),
            at("c", 37.40, 126.80),
        ]);
        let results = nearest_to(point(37.52, 126.97), &corpus, 2, Some(10.0)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "a");

        let all = nearest_to(point(37.52, 126.97), &corpus, 5, None).unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_coordinates_excluded() {
        let corpus = Corpus::new(vec![
            VenueRecord::new("x", "No coords").unwrap(),
            at("zero", 0.0, 0.0),
            at("a", 37.51, 126.98),
        ]);
        let results = nearest_to(point(37.52, 126.97), &corpus, 5, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "a");
    }

    #[test]
    fn test_equal_distances_keep_corpus_order() {
        let corpus = Corpus::new(vec![
            at("second", 37.53, 126.97),
            at("first", 37.53, 126.97),
        ]);
        let results = nearest_to(point(37.52, 126.97), &corpus, 2, None).unwrap();
        assert_eq!(results[0].record.id, "second");
        assert_eq!(results[1].record.id, "first");
    }

    #[test]
    fn test_invalid_arguments() {
        let corpus = Corpus::default();
        let origin = point(37.52, 126.97);
        assert!(matches!(
            nearest_to(origin, &corpus, 0, None),
            Err(Error::Validation(_))
        ));
        assert!(nearest_to(origin, &corpus, 1, Some(-1.0)).is_err());
        assert!(nearest_to(origin, &corpus, 1, Some(f64::NAN)).is_err());
        assert!(nearest_to(origin, &corpus, 1, Some(0.0)).unwrap().is_empty());
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(preset("남산").unwrap().lat, 37.5512);
        assert_eq!(preset("  Gangnam ").unwrap().name, "강남");
        assert_eq!(preset("CITY HALL").unwrap().name, "시청");
        assert!(preset("busan").is_none());
        assert!(preset("").is_none());
    }

    #[test]
    fn test_resolve_origin() {
        let p = resolve_origin(Some("jamsil"), Some(1.0), Some(1.0)).unwrap();
        assert_eq!((p.lat(), p.lon()), (37.5130, 127.1028));

        let p = resolve_origin(None, Some(37.5), Some(127.0)).unwrap();
        assert_eq!(p.lat(), 37.5);

        assert!(resolve_origin(Some("atlantis"), None, None).is_err());
        let p = resolve_origin(Some("atlantis"), Some(37.5), Some(127.0)).unwrap();
        assert_eq!(p.lon(), 127.0);
        assert!(resolve_origin(None, Some(37.5), None).is_err());
        assert!(resolve_origin(None, Some(95.0), Some(127.0)).is_err());
    }
}
