//! Rule-based plain-text answers.
//!
//! Renders ranked results as a short readable answer: one line per venue
//! followed by a list of sources. Used by the CLI and returned alongside
//! structured results by the tool server.

use nightspot_core::models::{RankedResult, Tier};

const MAX_SOURCES: usize = 5;

/// Answer for a proximity query.
pub fn summarize_nearby(results: &[RankedResult], radius_km: Option<f64>) -> String {
    if results.is_empty() {
        return match radius_km {
            Some(r) => format!(
                "No venues found within {} km. Check the origin or widen the radius.",
                r
            ),
            None => "No venues with coordinates are available.".to_string(),
        };
    }

    let mut lines = vec!["Nearest night-view spots:".to_string()];
    for r in results {
        let distance = r
            .distance_km()
            .map(|d| format!("{:.2} km", d))
            .unwrap_or_else(|| "-".to_string());
        lines.push(venue_line(r, &distance));
    }
    push_sources(&mut lines, results);
    lines.join("\n")
}

/// Answer for a semantic query.
pub fn summarize_semantic(query: &str, results: &[RankedResult], tier: Tier) -> String {
    if results.is_empty() {
        return format!("No venues matched \"{}\" ({} tier).", query.trim(), tier);
    }

    let mut lines = vec![format!("Best matches for \"{}\" ({} tier):", query.trim(), tier)];
    for r in results {
        let score = r
            .score()
            .map(|s| format!("score {:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        lines.push(venue_line(r, &score));
    }
    push_sources(&mut lines, results);
    lines.join("\n")
}

fn venue_line(r: &RankedResult, signal: &str) -> String {
    let record = &r.record;
    let mut line = format!(
        "{}. {} · {} · {} · hours {}",
        r.rank,
        record.name,
        signal,
        record.address.as_deref().unwrap_or("-"),
        record.operating_hours.as_deref().unwrap_or("-"),
    );
    if let Some(url) = &record.source_url {
        line.push_str(" · ");
        line.push_str(url);
    }
    line
}

fn push_sources(lines: &mut Vec<String>, results: &[RankedResult]) {
    lines.push(String::new());
    lines.push("Sources:".to_string());
    for r in results.iter().take(MAX_SOURCES) {
        match &r.record.source_url {
            Some(url) => lines.push(format!("- {} ({})", r.record.name, url)),
            None => lines.push(format!("- {}", r.record.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightspot_core::models::{RankSignal, VenueRecord};

    fn ranked(rank: usize, signal: RankSignal, name: &str, url: Option<&str>) -> RankedResult {
        let mut record = VenueRecord::new(format!("v{}", rank), name).unwrap();
        record.source_url = url.map(String::from);
        RankedResult {
            rank,
            signal,
            record,
        }
    }

    #[test]
    fn test_nearby_lines_and_sources() {
        let results = vec![
            ranked(1, RankSignal::Distance { distance_km: 0.4567 }, "Seoullo 7017", Some("https://seoullo")),
            ranked(2, RankSignal::Distance { distance_km: 2.0 }, "Namsan Tower", None),
        ];
        let text = summarize_nearby(&results, Some(3.0));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Nearest night-view spots:");
        assert_eq!(lines[1], "1. Seoullo 7017 · 0.46 km · - · hours - · https://seoullo");
        assert_eq!(lines[2], "2. Namsan Tower · 2.00 km · - · hours -");
        assert!(text.ends_with("Sources:\n- Seoullo 7017 (https://seoullo)\n- Namsan Tower"));
    }

    #[test]
    fn test_semantic_mentions_tier() {
        let results = vec![ranked(
            1,
            RankSignal::Similarity { score: 0.8123, tier: Tier::Tfidf },
            "Banpo Bridge",
            None,
        )];
        let text = summarize_semantic(" river ", &results, Tier::Tfidf);
        assert!(text.starts_with("Best matches for \"river\" (tfidf tier):"));
        assert!(text.contains("score 0.812"));
    }

    #[test]
    fn test_empty_results_explain() {
        assert!(summarize_nearby(&[], Some(3.0)).contains("within 3 km"));
        assert!(summarize_semantic("x", &[], Tier::Keyword).contains("keyword tier"));
    }
}
