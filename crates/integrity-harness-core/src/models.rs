//! Core data models: corpus sources, query results, and plagiarism reports.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Placeholder title for sources stored without one.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Placeholder authors for sources stored without any.
pub const DEFAULT_AUTHORS: &str = "Unknown Authors";
/// Placeholder abstract for sources stored without one.
pub const DEFAULT_ABSTRACT: &str = "No abstract available";

/// Kind of reference source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    #[default]
    Paper,
    Book,
    Journal,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Paper => "paper",
            SourceType::Book => "book",
            SourceType::Journal => "journal",
            SourceType::Other(tag) => tag,
        }
    }
}

impl From<String> for SourceType {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "paper" => SourceType::Paper,
            "book" => SourceType::Book,
            "journal" => SourceType::Journal,
            _ => SourceType::Other(tag),
        }
    }
}

impl From<&str> for SourceType {
    fn from(tag: &str) -> Self {
        SourceType::from(tag.to_string())
    }
}

impl From<SourceType> for String {
    fn from(kind: SourceType) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source submitted for ingestion, before it has an id or embedding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSource {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub source_type: SourceType,
}

/// An entry in the reference corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub publication_year: Option<i32>,
    pub abstract_text: Option<String>,
    pub full_text: String,
    pub source_type: SourceType,
    /// Absent for records that have not been embedded; those are excluded
    /// from retrieval.
    pub embedding: Option<Vec<f32>>,
}

/// Metadata of a ranked corpus entry, without body text or vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub id: String,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub publication_year: Option<i32>,
    pub abstract_text: Option<String>,
    pub source_type: SourceType,
}

impl From<&SourceRecord> for SourceSummary {
    fn from(record: &SourceRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            authors: record.authors.clone(),
            publication_year: record.publication_year,
            abstract_text: record.abstract_text.clone(),
            source_type: record.source_type.clone(),
        }
    }
}

/// A corpus entry with its raw similarity to a query, as ranked by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSource {
    pub source: SourceSummary,
    /// `1 - cosine_distance`; not clamped.
    pub similarity: f64,
}

/// A search result with every optional field filled in.
///
/// Serialized field names are the public JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub publication_year: i32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub source_type: String,
    pub similarity_score: f64,
}

impl QueryResult {
    /// Substitute defaults for absent metadata.
    pub fn from_summary(source: SourceSummary, similarity_score: f64) -> Self {
        Self {
            id: source.id,
            title: source.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            authors: source.authors.unwrap_or_else(|| DEFAULT_AUTHORS.to_string()),
            publication_year: source.publication_year.unwrap_or_else(current_year),
            abstract_text: source
                .abstract_text
                .unwrap_or_else(|| DEFAULT_ABSTRACT.to_string()),
            source_type: source.source_type.to_string(),
            similarity_score,
        }
    }
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// A contiguous, word-aligned slice of a document.
///
/// Borrows from the document; chunks live only for one detection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    /// 0-based position in document order.
    pub index: usize,
    /// Index of the first word of the span.
    pub word_start: usize,
    /// One past the last word of the span.
    pub word_end: usize,
    pub text: &'a str,
}

impl TextChunk<'_> {
    pub fn word_count(&self) -> usize {
        self.word_end - self.word_start
    }
}

/// A chunk that matched a corpus source above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedSection {
    pub chunk_index: usize,
    /// Chunk preview, truncated with `...` when long.
    pub text: String,
    pub source_id: String,
    pub matched_source: String,
    pub source_authors: String,
    pub similarity: f64,
}

/// Terminal state of a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Completed,
    TooShort,
    Failed,
}

/// Document-level plagiarism verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismReport {
    /// Max similarity among flags, clamped to `[0, 1]`.
    pub plagiarism_score: f64,
    pub flagged_sections: Vec<FlaggedSection>,
    pub total_chunks_analyzed: usize,
    /// Number of flagged sections; a chunk matching two sources counts twice.
    pub chunks_flagged: usize,
    /// Distinct chunks with at least one flag.
    #[serde(default)]
    pub distinct_chunks_flagged: usize,
    /// Chunks below the minimum length that were not searched.
    pub chunks_skipped: usize,
    pub status: ReportStatus,
    /// True when any chunk was scored against degraded search results.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlagiarismReport {
    pub fn too_short() -> Self {
        Self {
            message: Some("Text too short for meaningful plagiarism detection".to_string()),
            ..Self::empty(ReportStatus::TooShort)
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::empty(ReportStatus::Failed)
        }
    }

    pub fn is_too_short(&self) -> bool {
        self.status == ReportStatus::TooShort
    }

    fn empty(status: ReportStatus) -> Self {
        Self {
            plagiarism_score: 0.0,
            flagged_sections: Vec::new(),
            total_chunks_analyzed: 0,
            chunks_flagged: 0,
            distinct_chunks_flagged: 0,
            chunks_skipped: 0,
            status,
            degraded: false,
            message: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parsing() {
        assert_eq!(SourceType::from("Book"), SourceType::Book);
        assert_eq!(SourceType::from(""), SourceType::Paper);
        assert_eq!(
            SourceType::from("thesis"),
            SourceType::Other("thesis".to_string())
        );
        assert_eq!(SourceType::Journal.to_string(), "journal");
    }

    #[test]
    fn test_query_result_defaults() {
        let summary = SourceSummary {
            id: "s1".to_string(),
            title: None,
            authors: None,
            publication_year: None,
            abstract_text: None,
            source_type: SourceType::default(),
        };
        let result = QueryResult::from_summary(summary, 0.5);
        assert_eq!(result.title, DEFAULT_TITLE);
        assert_eq!(result.authors, DEFAULT_AUTHORS);
        assert_eq!(result.abstract_text, DEFAULT_ABSTRACT);
        assert_eq!(result.source_type, "paper");
        assert_eq!(result.publication_year, current_year());
    }

    #[test]
    fn test_query_result_json_field_names() {
        let result = QueryResult {
            id: "s1".to_string(),
            title: "T".to_string(),
            authors: "A".to_string(),
            publication_year: 2001,
            abstract_text: "Abs".to_string(),
            source_type: "book".to_string(),
            similarity_score: 0.25,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["abstract"], "Abs");
        assert_eq!(json["similarity_score"], 0.25);
    }

    #[test]
    fn test_too_short_report() {
        let report = PlagiarismReport::too_short();
        assert!(report.is_too_short());
        assert_eq!(report.plagiarism_score, 0.0);
        assert!(report.flagged_sections.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "too_short");
        assert!(json.get("error").is_none());
    }
}
