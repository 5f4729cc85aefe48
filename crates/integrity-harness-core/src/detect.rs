//! Document-level plagiarism scoring.
//!
//! # Algorithm
//!
//! 1. Trimmed text shorter than `min_document_chars` → `too_short` report.
//! 2. Split into `chunk_words`-word chunks ([`chunk_words`]).
//! 3. Skip chunks whose trimmed length is below `min_chunk_chars`.
//! 4. Retrieve the `matches_per_chunk` best sources for each remaining
//!    chunk. Chunk searches are independent and run up to `concurrency` at
//!    a time; results are consumed in chunk order.
//! 5. Every match scoring above the threshold becomes a [`FlaggedSection`].
//! 6. `plagiarism_score` is the best flagged similarity, clamped to `[0, 1]`.
//!
//! A retrieval error anywhere turns the whole run into a `failed` report
//! with a zero score; detection itself never returns an error.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use crate::chunk::{chunk_words, preview, DEFAULT_CHUNK_WORDS};
use crate::error::Result;
use crate::models::{FlaggedSection, PlagiarismReport, ReportStatus, TextChunk};
use crate::search::{clamp_score, SourceRetriever};
use crate::stats::EngineStats;

/// Default similarity a match must exceed to be flagged.
pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Tunables for a detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionParams {
    pub threshold: f64,
    pub chunk_words: usize,
    pub min_document_chars: usize,
    pub min_chunk_chars: usize,
    pub matches_per_chunk: usize,
    pub preview_chars: usize,
    pub concurrency: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            chunk_words: DEFAULT_CHUNK_WORDS,
            min_document_chars: 50,
            min_chunk_chars: 100,
            matches_per_chunk: 2,
            preview_chars: 200,
            concurrency: 4,
        }
    }
}

pub struct PlagiarismDetector {
    retriever: Arc<dyn SourceRetriever>,
    params: DetectionParams,
    stats: Arc<EngineStats>,
}

impl PlagiarismDetector {
    pub fn new(
        retriever: Arc<dyn SourceRetriever>,
        params: DetectionParams,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            retriever,
            params,
            stats,
        }
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Score `text` against the configured threshold.
    pub async fn detect(&self, text: &str) -> PlagiarismReport {
        self.detect_with_threshold(text, self.params.threshold).await
    }

    pub async fn detect_with_threshold(&self, text: &str, threshold: f64) -> PlagiarismReport {
        let length = text.trim().chars().count();
        if length < self.params.min_document_chars {
            debug!(length, "document too short for detection");
            return PlagiarismReport::too_short();
        }

        match self.analyze(text, threshold).await {
            Ok(report) => {
                info!(
                    score = report.plagiarism_score,
                    chunks = report.total_chunks_analyzed,
                    flagged = report.chunks_flagged,
                    degraded = report.degraded,
                    "plagiarism detection completed"
                );
                report
            }
            Err(e) => {
                self.stats.record_detection_failure();
                error!(error = %e, "plagiarism detection failed");
                PlagiarismReport::failed(e)
            }
        }
    }

    async fn analyze(&self, text: &str, threshold: f64) -> Result<PlagiarismReport> {
        let chunks = chunk_words(text, self.params.chunk_words);
        let total = chunks.len();

        let (searchable, skipped): (Vec<TextChunk<'_>>, Vec<TextChunk<'_>>) = chunks
            .into_iter()
            .partition(|c| c.text.trim().chars().count() >= self.params.min_chunk_chars);
        debug!(total, skipped = skipped.len(), "document chunked");

        let limit = self.params.matches_per_chunk.max(1);
        let retriever = &self.retriever;
        let results: Vec<_> = stream::iter(searchable)
            .map(|chunk| async move { (chunk, retriever.retrieve(chunk.text, limit).await) })
            .buffered(self.params.concurrency.max(1))
            .collect()
            .await;

        let mut flagged_sections = Vec::new();
        let mut distinct_chunks_flagged = 0;
        let mut degraded = false;

        for (chunk, result) in results {
            let outcome = result?;
            degraded |= outcome.is_degraded();

            let before = flagged_sections.len();
            for matched in outcome.value() {
                if matched.similarity_score > threshold {
                    flagged_sections.push(FlaggedSection {
                        chunk_index: chunk.index,
                        text: preview(chunk.text, self.params.preview_chars),
                        source_id: matched.id.clone(),
                        matched_source: matched.title.clone(),
                        source_authors: matched.authors.clone(),
                        similarity: matched.similarity_score,
                    });
                }
            }
            if flagged_sections.len() > before {
                distinct_chunks_flagged += 1;
            }
        }

        let best = flagged_sections
            .iter()
            .map(|f| f.similarity)
            .fold(0.0, f64::max);

        Ok(PlagiarismReport {
            plagiarism_score: clamp_score(best),
            chunks_flagged: flagged_sections.len(),
            distinct_chunks_flagged,
            flagged_sections,
            total_chunks_analyzed: total,
            chunks_skipped: skipped.len(),
            status: ReportStatus::Completed,
            degraded,
            message: None,
            error: None,
        })
    }
}
