//! Static result set served when the corpus cannot be queried.
//!
//! The default dataset is a handful of canonical machine-learning texts with
//! preset scores. Hosts can supply their own list (the app crate loads one
//! from a JSON file named in config).

use serde::Deserialize;

use crate::models::QueryResult;

/// An injectable, ordered list of canned search results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FallbackCorpus {
    entries: Vec<QueryResult>,
}

impl FallbackCorpus {
    pub fn new(entries: Vec<QueryResult>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn entries(&self) -> &[QueryResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first `limit` entries, in dataset order.
    pub fn take(&self, limit: usize) -> Vec<QueryResult> {
        self.entries.iter().take(limit).cloned().collect()
    }
}

impl Default for FallbackCorpus {
    fn default() -> Self {
        let entry = |id: &str,
                     title: &str,
                     authors: &str,
                     year: i32,
                     abstract_text: &str,
                     source_type: &str,
                     score: f64| QueryResult {
            id: id.to_string(),
            title: title.to_string(),
            authors: authors.to_string(),
            publication_year: year,
            abstract_text: abstract_text.to_string(),
            source_type: source_type.to_string(),
            similarity_score: score,
        };

        Self::new(vec![
            entry(
                "fallback-1",
                "Machine Learning: A Probabilistic Perspective",
                "Kevin P. Murphy",
                2012,
                "Comprehensive textbook on machine learning from a probabilistic perspective, covering topics from linear regression to modern deep learning.",
                "book",
                0.85,
            ),
            entry(
                "fallback-2",
                "Deep Learning",
                "Ian Goodfellow, Yoshua Bengio, Aaron Courville",
                2016,
                "Foundational textbook on deep learning, covering neural networks, convolutional networks, recurrent networks, and deep learning research.",
                "book",
                0.78,
            ),
            entry(
                "fallback-3",
                "Pattern Recognition and Machine Learning",
                "Christopher M. Bishop",
                2006,
                "Introduction to pattern recognition and machine learning concepts with emphasis on probabilistic models and Bayesian methods.",
                "book",
                0.72,
            ),
            entry(
                "fallback-4",
                "The Elements of Statistical Learning",
                "Trevor Hastie, Robert Tibshirani, Jerome Friedman",
                2009,
                "Comprehensive overview of statistical learning methods including supervised and unsupervised learning techniques.",
                "book",
                0.68,
            ),
            entry(
                "fallback-5",
                "Recent Advances in Deep Learning for Natural Language Processing",
                "Various Researchers",
                2023,
                "Survey of recent developments in applying deep learning to natural language processing tasks including transformers and large language models.",
                "journal",
                0.65,
            ),
        ])
    }
}
