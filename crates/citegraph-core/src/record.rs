//! Paper records as they appear in the corpus.

use serde::{Deserialize, Serialize};

/// One paper from the corpus.
///
/// Missing optional fields fall back to the corpus defaults: a year and
/// citation count of 0, no title and no references. Unknown fields such as
/// `authors`, `venue` or `abstract` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Corpus identifier. A record without one parses fine but never
    /// becomes a graph node.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub year: i64,

    /// Citation count reported by the corpus.
    #[serde(default, rename = "n_citation")]
    pub citation_count: i64,

    #[serde(default)]
    pub title: Option<String>,

    /// Ids of the papers this record cites.
    #[serde(default)]
    pub references: Vec<String>,
}

impl PaperRecord {
    /// Creates a record with an id and no other data.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = year;
        self
    }

    pub fn with_citations(mut self, count: i64) -> Self {
        self.citation_count = count;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_references(mut self, refs: Vec<String>) -> Self {
        self.references = refs;
        self
    }

    /// Parses a single corpus line.
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Returns the id if it is present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let line = r#"{"id": "p1", "year": 2012, "n_citation": 75, "title": "Streams", "references": ["p2", "p3"], "venue": "VLDB"}"#;
        let record = PaperRecord::from_json(line).unwrap();

        assert_eq!(record.key(), Some("p1"));
        assert_eq!(record.year, 2012);
        assert_eq!(record.citation_count, 75);
        assert_eq!(record.title.as_deref(), Some("Streams"));
        assert_eq!(record.references, vec!["p2", "p3"]);
    }

    #[test]
    fn test_missing_fields_default() {
        let record = PaperRecord::from_json(r#"{"id": "p1"}"#).unwrap();
        assert_eq!(record.year, 0);
        assert_eq!(record.citation_count, 0);
        assert!(record.title.is_none());
        assert!(record.references.is_empty());
    }

    #[test]
    fn test_missing_id_still_parses() {
        let record = PaperRecord::from_json(r#"{"year": 2011, "n_citation": 100}"#).unwrap();
        assert!(record.key().is_none());
    }

    #[test]
    fn test_empty_id_has_no_key() {
        let record = PaperRecord::from_json(r#"{"id": ""}"#).unwrap();
        assert!(record.key().is_none());
    }

    #[test]
    fn test_wrong_field_type_fails() {
        assert!(PaperRecord::from_json(r#"{"id": "p1", "year": "twenty"}"#).is_err());
        assert!(PaperRecord::from_json("{not json").is_err());
    }
}
