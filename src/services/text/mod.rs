//! Text analysis: summaries, keywords, sentiment, similarity search,
//! categorisation, 2-D projection and named queries.

pub mod categorize;
pub mod keywords;
pub mod projection;
pub mod query;
pub mod sentiment;
pub mod summarize;
pub mod tfidf;
pub mod tokenize;

pub use categorize::categorize;
pub use keywords::extract_keywords;
pub use projection::visualize;
pub use query::QueryFunction;
pub use sentiment::{analyze as sentiment, Sentiment};
pub use summarize::summarize;

use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

/// Largest text, or combined texts, accepted by the pairwise analyses.
pub const MAX_TEXT_BYTES: usize = 512 * 1024;

/// Sentences ranked by one summary, and texts placed by one projection.
/// Both build a square matrix over these units.
pub const MAX_UNITS: usize = 500;

/// Reject inputs whose pairwise matrices would not fit a request.
pub(crate) fn check_size(bytes: usize, units: usize, unit_name: &str) -> ServiceResult<()> {
    if bytes > MAX_TEXT_BYTES {
        return Err(ServiceError::invalid_parameter(format!(
            "Text is too long (at most {} bytes)",
            MAX_TEXT_BYTES
        )));
    }
    if units > MAX_UNITS {
        return Err(ServiceError::invalid_parameter(format!(
            "Too many {} ({} given, at most {})",
            unit_name, units, MAX_UNITS
        )));
    }
    Ok(())
}

/// Number of results returned by an in-memory similarity search.
pub const SEARCH_TOP_K: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f64,
}

/// Rank `texts` against `query` by TF-IDF cosine similarity.
pub fn search_texts(query: &str, texts: &[String]) -> Vec<SearchHit> {
    let docs: Vec<&str> = texts.iter().map(String::as_str).collect();
    tfidf::rank(query, &docs, SEARCH_TOP_K)
        .into_iter()
        .map(|(i, score)| SearchHit {
            text: texts[i].clone(),
            score,
        })
        .collect()
}
