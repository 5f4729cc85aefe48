use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn integrity_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("integrity");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    fs::write(
        root.join("sources.json"),
        r#"[
  {
    "title": "Attention Is All You Need",
    "authors": "Vaswani et al.",
    "publication_year": 2017,
    "abstract": "The dominant sequence transduction models are based on recurrent networks.",
    "full_text": "We propose a new simple network architecture, the Transformer.",
    "source_type": "paper"
  },
  {
    "title": "A Few Useful Things to Know About Machine Learning",
    "authors": "Pedro Domingos",
    "publication_year": 2012,
    "full_text": "Machine learning algorithms can figure out how to perform important tasks.",
    "source_type": "journal"
  }
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/integrity.sqlite"

[embedding]
provider = "disabled"
dims = 8
max_attempts = 1
backoff_base_ms = 0

[logging]
level = "warn"
"#,
        root.display()
    );

    let config_path = config_dir.join("integrity.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_integrity(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = integrity_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run integrity binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn long_text(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_integrity(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    assert!(tmp.path().join("data/integrity.sqlite").exists());

    // Idempotent
    let (_, stderr, success) = run_integrity(&config, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_ingest_inserts_without_embeddings() {
    let (tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);

    let sources = tmp.path().join("sources.json");
    let (stdout, stderr, success) =
        run_integrity(&config, &["ingest", sources.to_str().unwrap()]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("inserted: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("embedded: 0"), "stdout: {}", stdout);
    assert!(stdout.contains("pending embeddings: 2"));
}

#[test]
fn test_ingest_skips_populated_corpus() {
    let (tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);
    let sources = tmp.path().join("sources.json");
    run_integrity(&config, &["ingest", sources.to_str().unwrap()]);

    let (stdout, _, success) = run_integrity(&config, &["ingest", sources.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("corpus already has 2 sources; skipped"));

    let (stdout, _, success) = run_integrity(
        &config,
        &["ingest", sources.to_str().unwrap(), "--append"],
    );
    assert!(success);
    assert!(stdout.contains("inserted: 2"));
}

#[test]
fn test_ingest_requires_init() {
    let (tmp, config) = setup_test_env();
    let sources = tmp.path().join("sources.json");
    let (_, stderr, success) = run_integrity(&config, &["ingest", sources.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("integrity init"), "stderr: {}", stderr);
}

#[test]
fn test_search_json_serves_fallback() {
    let (tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);
    let sources = tmp.path().join("sources.json");
    run_integrity(&config, &["ingest", sources.to_str().unwrap()]);

    let (stdout, stderr, success) =
        run_integrity(&config, &["search", "neural networks", "--json"]);
    assert!(success, "search failed: {}", stderr);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["query"], "neural networks");
    assert_eq!(parsed["degraded"], true);
    let results = parsed["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(
        results[0]["title"],
        "Machine Learning: A Probabilistic Perspective"
    );
}

#[test]
fn test_search_limit_is_clamped() {
    let (_tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);

    let (stdout, _, success) =
        run_integrity(&config, &["search", "statistics", "--limit", "2", "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["results"].as_array().unwrap().len(), 2);

    let (stdout, _, success) =
        run_integrity(&config, &["search", "statistics", "--limit", "0", "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["results"].as_array().unwrap().len(), 1);
}

#[test]
fn test_detect_short_text() {
    let (tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);
    let doc = tmp.path().join("short.txt");
    fs::write(&doc, "Too short to analyze.").unwrap();

    let (stdout, stderr, success) =
        run_integrity(&config, &["detect", doc.to_str().unwrap(), "--json"]);
    assert!(success, "detect failed: {}", stderr);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["status"], "too_short");
    assert_eq!(parsed["plagiarism_score"], 0.0);
    assert_eq!(parsed["total_chunks_analyzed"], 0);
}

#[test]
fn test_detect_long_text_completes_degraded() {
    let (tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);
    let doc = tmp.path().join("essay.txt");
    fs::write(&doc, long_text(1200)).unwrap();

    let (stdout, stderr, success) =
        run_integrity(&config, &["detect", doc.to_str().unwrap(), "--json"]);
    assert!(success, "detect failed: {}", stderr);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["status"], "completed");
    assert_eq!(parsed["total_chunks_analyzed"], 3);
    assert_eq!(parsed["chunks_flagged"], 0);
    assert_eq!(parsed["plagiarism_score"], 0.0);
    assert_eq!(parsed["degraded"], true);
}

#[test]
fn test_detect_rejects_bad_threshold() {
    let (tmp, config) = setup_test_env();
    let doc = tmp.path().join("essay.txt");
    fs::write(&doc, long_text(200)).unwrap();

    let (_, stderr, success) = run_integrity(
        &config,
        &["detect", doc.to_str().unwrap(), "--threshold", "1.5"],
    );
    assert!(!success);
    assert!(stderr.contains("--threshold"));
}

#[test]
fn test_health_reports_degraded() {
    let (_tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);

    let (stdout, stderr, success) = run_integrity(&config, &["health"]);
    assert!(success, "health failed: {}", stderr);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["service"], "integrity-harness");
    assert_eq!(parsed["status"], "degraded");
    assert_eq!(parsed["components"]["provider"], "not_configured");
    assert_eq!(parsed["components"]["cache"], "not_configured");
}

#[test]
fn test_embed_pending_requires_provider() {
    let (_tmp, config) = setup_test_env();
    run_integrity(&config, &["init"]);

    let (_, stderr, success) = run_integrity(&config, &["embed", "pending"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));

    let (stdout, _, success) = run_integrity(&config, &["embed", "pending", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("embed pending (dry-run)"));
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[embedding]\ndims = 0\n").unwrap();

    let (_, stderr, success) = run_integrity(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("dims"), "stderr: {}", stderr);
}
