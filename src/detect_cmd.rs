//! `integrity detect`: score a plain-text document for plagiarism.
//!
//! Text extraction from PDF/DOCX happens upstream; this command reads plain
//! text from a file, or from stdin when the path is `-`.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;

use integrity_harness_core::models::{PlagiarismReport, ReportStatus};

use crate::config::Config;
use crate::engine::Engine;

pub fn read_document(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read document from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))
}

pub async fn run_detect(
    config: &Config,
    path: &Path,
    threshold: Option<f64>,
    json: bool,
) -> Result<()> {
    let threshold = threshold.unwrap_or(config.detection.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        bail!("--threshold must be in [0.0, 1.0]");
    }

    let text = read_document(path)?;
    let engine = Engine::connect(config).await?;
    let report = engine.detector().detect_with_threshold(&text, threshold).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, threshold);
    }

    engine.close().await;
    Ok(())
}

fn print_report(report: &PlagiarismReport, threshold: f64) {
    println!("plagiarism report");
    match report.status {
        ReportStatus::TooShort => {
            println!("  {}", report.message.as_deref().unwrap_or("text too short"));
            return;
        }
        ReportStatus::Failed => {
            println!(
                "  analysis failed: {}",
                report.error.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        ReportStatus::Completed => {}
    }

    println!("  score: {:.2}", report.plagiarism_score);
    println!("  threshold: {:.2}", threshold);
    println!("  chunks analyzed: {}", report.total_chunks_analyzed);
    println!(
        "  sections flagged: {} (in {} chunks)",
        report.chunks_flagged, report.distinct_chunks_flagged
    );
    if report.chunks_skipped > 0 {
        println!("  chunks skipped (too short): {}", report.chunks_skipped);
    }
    if report.degraded {
        println!("  note: some searches used fallback results");
    }

    for flag in &report.flagged_sections {
        println!();
        println!(
            "  [chunk {}] {:.2} {} / {}",
            flag.chunk_index, flag.similarity, flag.matched_source, flag.source_authors
        );
        println!("    \"{}\"", flag.text.replace('\n', " ").trim());
    }
}
