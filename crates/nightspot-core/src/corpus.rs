//! The venue corpus shared by both engines.
//!
//! A [`Corpus`] keeps records in source order and deduplicates them by id.
//! When an id repeats, the later record replaces the earlier one in place,
//! so positions stay stable and tie-breaking by position stays meaningful.

use std::collections::HashMap;

use crate::models::VenueRecord;

/// Ordered, id-unique, read-only venue table.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<VenueRecord>,
}

impl Corpus {
    pub fn new(records: impl IntoIterator<Item = VenueRecord>) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut out: Vec<VenueRecord> = Vec::new();

        for record in records {
            match positions.get(&record.id) {
                Some(&pos) => out[pos] = record,
                None => {
                    positions.insert(record.id.clone(), out.len());
                    out.push(record);
                }
            }
        }

        Self { records: out }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VenueRecord] {
        &self.records
    }

    pub fn get(&self, position: usize) -> Option<&VenueRecord> {
        self.records.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VenueRecord> {
        self.records.iter()
    }

    /// Number of records that carry usable coordinates.
    pub fn located(&self) -> usize {
        self.records.iter().filter(|r| r.location.is_some()).count()
    }

    /// Retrieval text for every record, by position.
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.retrieval_text()).collect()
    }
}

impl FromIterator<VenueRecord> for Corpus {
    fn from_iter<I: IntoIterator<Item = VenueRecord>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(id: &str, name: &str) -> VenueRecord {
        VenueRecord::new(id, name).unwrap()
    }

    #[test]
    fn test_preserves_insertion_order() {
        let corpus = Corpus::new(vec![venue("b", "Bravo"), venue("a", "Alpha")]);
        let names: Vec<&str> = corpus.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Alpha"]);
    }

    #[test]
    fn test_duplicate_id_last_write_wins_in_place() {
        let corpus: Corpus = vec![
            venue("a", "Alpha"),
            venue("b", "Bravo"),
            venue("a", "Alpha Renamed"),
        ]
        .into_iter()
        .collect();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get(0).unwrap().name, "Alpha Renamed");
        assert_eq!(corpus.get(1).unwrap().name, "Bravo");
    }

    #[test]
    fn test_located_counts_coordinates() {
        let corpus = Corpus::new(vec![
            venue("a", "Alpha").with_coordinates(Some(37.5), Some(127.0)),
            venue("b", "Bravo").with_coordinates(Some(0.0), Some(0.0)),
        ]);
        assert_eq!(corpus.located(), 1);
        assert_eq!(corpus.texts(), vec!["Alpha", "Bravo"]);
    }
}
