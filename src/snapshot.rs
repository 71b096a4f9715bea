//! Corpus snapshots on disk.
//!
//! A snapshot is a JSON array in one of two shapes:
//!
//! - **Normalized**: [`VenueRecord`] objects as written by [`save_snapshot`].
//! - **Raw open-data rows**: upper-case fields (`NUM`, `TITLE`, `ADDR`,
//!   `LA`, `LO`, ...) as published by the city night-view dataset. These
//!   are normalized on load by [`normalize_row`].
//!
//! Rows that cannot become a valid record are skipped with a warning; one
//! bad row never rejects the whole snapshot.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

use nightspot_core::corpus::Corpus;
use nightspot_core::models::VenueRecord;

/// Read a snapshot into a corpus. A missing file yields an empty corpus.
pub fn load_snapshot(path: &Path) -> Result<Corpus> {
    if !path.exists() {
        warn!(path = %path.display(), "snapshot not found, starting with an empty corpus");
        return Ok(Corpus::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let records = parse_snapshot(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
    let corpus = Corpus::new(records);
    info!(
        path = %path.display(),
        venues = corpus.len(),
        located = corpus.located(),
        "snapshot loaded"
    );
    Ok(corpus)
}

/// Parse snapshot JSON in either accepted shape.
pub fn parse_snapshot(content: &str) -> Result<Vec<VenueRecord>> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(rows) = value else {
        bail!("snapshot must be a JSON array");
    };

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let Value::Object(map) = row else {
            warn!(row = i, "skipping non-object snapshot row");
            continue;
        };
        let record = if is_raw_row(&map) {
            normalize_row(&map)
        } else {
            match serde_json::from_value::<VenueRecord>(Value::Object(map)) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(row = i, error = %e, "skipping invalid venue record");
                    None
                }
            }
        };
        records.extend(record);
    }
    Ok(records)
}

fn is_raw_row(map: &Map<String, Value>) -> bool {
    map.contains_key("TITLE") || map.contains_key("NUM")
}

/// Normalize one raw open-data row.
///
/// Strings are trimmed and blank values dropped. `LA`/`LO` become
/// coordinates only when they parse, are non-zero, and are in range.
/// Returns `None` for rows without a title.
pub fn normalize_row(row: &Map<String, Value>) -> Option<VenueRecord> {
    let Some(title) = field(row, "TITLE") else {
        warn!(num = ?field(row, "NUM"), "skipping row without a title");
        return None;
    };
    let address = field(row, "ADDR");
    let lat = field(row, "LA").and_then(|v| v.parse::<f64>().ok());
    let lon = field(row, "LO").and_then(|v| v.parse::<f64>().ok());

    let id = field(row, "NUM").unwrap_or_else(|| {
        derive_id(&title, address.as_deref(), lat, lon)
    });

    let mut record = VenueRecord::new(id, title).ok()?.with_coordinates(lat, lon);
    record.category = field(row, "SUBJECT_CD");
    record.address = address;
    record.description = field(row, "CONTENTS");
    record.operating_hours = field(row, "OPERATING_TIME");
    record.source_url = field(row, "URL");
    record.fee = match (field(row, "ENTR_FEE"), field(row, "FREE_YN")) {
        (Some(fee), _) => Some(fee),
        (None, Some(free)) if free.eq_ignore_ascii_case("Y") => Some("free".to_string()),
        _ => None,
    };

    let tags: Vec<String> = [
        ("subway", "SUBWAY"),
        ("bus", "BUS"),
        ("parking", "PARKING_INFO"),
        ("tel", "TEL_NO"),
    ]
    .iter()
    .filter_map(|(label, key)| field(row, key).map(|v| format!("{}: {}", label, v)))
    .collect();
    if !tags.is_empty() {
        record.tags = Some(tags.join("; "));
    }

    Some(record)
}

/// Trimmed, non-blank string value of a raw field. Numbers are accepted.
fn field(row: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match row.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Stable id for rows that carry no `NUM`.
pub fn derive_id(title: &str, address: Option<&str>, lat: Option<f64>, lon: Option<f64>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(address.unwrap_or("").as_bytes());
    hasher.update(b"\x1f");
    hasher.update(lat.map(|v| v.to_string()).unwrap_or_default().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(lon.map(|v| v.to_string()).unwrap_or_default().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("v-{}", &digest[..16])
}

/// Write normalized records as pretty JSON, creating parent directories.
pub fn save_snapshot(path: &Path, records: &[VenueRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
    info!(path = %path.display(), venues = records.len(), "snapshot saved");
    Ok(())
}

/// `spot import`: normalize a raw export and save it as a snapshot.
pub fn run_import(raw: &Path, out: &Path) -> Result<()> {
    let content = std::fs::read_to_string(raw)
        .with_context(|| format!("Failed to read raw export: {}", raw.display()))?;
    let records = parse_snapshot(&content)
        .with_context(|| format!("Failed to parse raw export: {}", raw.display()))?;
    let corpus = Corpus::new(records);
    save_snapshot(out, corpus.records())?;

    println!(
        "Imported {} venues ({} with coordinates) → {}",
        corpus.len(),
        corpus.located(),
        out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_normalize_row_trims_and_maps() {
        let row = raw(serde_json::json!({
            "NUM": " 12 ",
            "SUBJECT_CD": "Bridge",
            "TITLE": " Banpo Bridge ",
            "ADDR": " Seocho-gu ",
            "LA": "37.5118",
            "LO": "126.9960",
            "URL": "",
            "OPERATING_TIME": "20:00~21:00 ",
            "FREE_YN": "Y",
            "CONTENTS": " Moonlight rainbow fountain ",
            "SUBWAY": " Express Bus Terminal ",
        }));
        let record = normalize_row(&row).unwrap();
        assert_eq!(record.id, "12");
        assert_eq!(record.name, "Banpo Bridge");
        assert_eq!(record.address.as_deref(), Some("Seocho-gu"));
        assert_eq!(record.location.unwrap().lat(), 37.5118);
        assert_eq!(record.source_url, None);
        assert_eq!(record.fee.as_deref(), Some("free"));
        assert_eq!(record.category.as_deref(), Some("Bridge"));
        assert_eq!(record.tags.as_deref(), Some("subway: Express Bus Terminal"));
    }

    #[test]
    fn test_zero_and_garbage_coordinates_dropped() {
        let row = raw(serde_json::json!({ "NUM": "1", "TITLE": "A", "LA": "0", "LO": "127.0" }));
        assert!(normalize_row(&row).unwrap().location.is_none());
        let row = raw(serde_json::json!({ "NUM": "2", "TITLE": "B", "LA": "north", "LO": "127.0" }));
        assert!(normalize_row(&row).unwrap().location.is_none());
        let row = raw(serde_json::json!({ "NUM": "3", "TITLE": "C", "LA": 37.5, "LO": 127.0 }));
        assert!(normalize_row(&row).unwrap().location.is_some());
    }

    #[test]
    fn test_missing_title_skipped_and_id_derived() {
        assert!(normalize_row(&raw(serde_json::json!({ "NUM": "1", "TITLE": "  " }))).is_none());

        let row = raw(serde_json::json!({ "TITLE": "Namsan", "ADDR": "Yongsan-gu" }));
        let a = normalize_row(&row).unwrap();
        let b = normalize_row(&row).unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("v-"));
        assert_eq!(a.id.len(), 18);
    }

    #[test]
    fn test_parse_both_shapes() {
        let normalized = r#"[{"id":"v1","name":"Namsan Tower","latitude":37.5512,"longitude":126.9882}]"#;
        let records = parse_snapshot(normalized).unwrap();
        assert_eq!(records[0].name, "Namsan Tower");

        let raw_rows = r#"[{"NUM":"7","TITLE":"Seoullo 7017"}, {"id":"","name":"bad"}, 3]"#;
        let records = parse_snapshot(raw_rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "7");

        assert!(parse_snapshot(r#"{"id":"v1"}"#).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("venues.json");
        let records = vec![VenueRecord::new("v1", "Namsan Tower")
            .unwrap()
            .with_coordinates(Some(37.5512), Some(126.9882))];
        save_snapshot(&path, &records).unwrap();

        let corpus = load_snapshot(&path).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.records()[0], records[0]);
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = load_snapshot(&dir.path().join("absent.json")).unwrap();
        assert!(corpus.is_empty());
    }
}
