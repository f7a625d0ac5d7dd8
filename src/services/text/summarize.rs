//! Extractive summarisation with TextRank.
//!
//! Sentences are nodes; edges are weighted by normalised word overlap.
//! PageRank scores pick the top sentences, which are returned in document order.

use std::collections::HashSet;

use super::check_size;
use super::tokenize::{sentences, terms};
use crate::error::{ServiceError, ServiceResult};

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-6;

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let common = a.intersection(b).count() as f64;
    if common == 0.0 {
        return 0.0;
    }
    let denom = (a.len() as f64).ln() + (b.len() as f64).ln();
    if denom > 0.0 {
        common / denom
    } else {
        common
    }
}

/// PageRank over a symmetric weighted adjacency matrix.
fn pagerank(weights: &[Vec<f64>]) -> Vec<f64> {
    let n = weights.len();
    let out: Vec<f64> = weights.iter().map(|row| row.iter().sum()).collect();
    let mut scores = vec![1.0 / n as f64; n];

    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![(1.0 - DAMPING) / n as f64; n];
        for (i, slot) in next.iter_mut().enumerate() {
            let incoming: f64 = (0..n)
                .filter(|&j| out[j] > 0.0)
                .map(|j| weights[j][i] / out[j] * scores[j])
                .sum();
            *slot += DAMPING * incoming;
        }
        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < TOLERANCE {
            break;
        }
    }
    scores
}

/// Keep `ceil(ratio * n)` sentences (at least one).
pub fn summarize(text: &str, ratio: f64) -> ServiceResult<String> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("Text is required"));
    }
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(ServiceError::invalid_parameter(
            "Ratio must be greater than 0 and at most 1",
        ));
    }

    check_size(text.len(), 0, "sentences")?;
    let sents = sentences(text);
    check_size(text.len(), sents.len(), "sentences")?;
    let keep = ((ratio * sents.len() as f64).ceil() as usize).clamp(1, sents.len().max(1));
    if sents.len() <= keep {
        return Ok(sents.join(" "));
    }

    let bags: Vec<HashSet<String>> = sents.iter().map(|s| terms(s).into_iter().collect()).collect();
    let n = sents.len();
    let mut weights = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let w = overlap(&bags[i], &bags[j]);
            weights[i][j] = w;
            weights[j][i] = w;
        }
    }
    let scores = pagerank(&weights);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]).then(a.cmp(b)));
    let mut chosen: Vec<usize> = order.into_iter().take(keep).collect();
    chosen.sort_unstable();

    Ok(chosen
        .into_iter()
        .map(|i| sents[i].as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "Rust is a systems programming language. \
        Rust guarantees memory safety without a garbage collector. \
        The weather was sunny yesterday. \
        Many companies adopt Rust for systems programming and memory safety. \
        Cats sleep a lot.";

    #[test]
    fn test_summary_keeps_central_sentences_in_order() {
        let summary = summarize(TEXT, 0.4).unwrap();
        let parts = sentences(&summary);
        assert_eq!(parts.len(), 2);
        assert!(summary.contains("Rust"));
        assert!(!summary.contains("Cats"));
        let first = TEXT.find(parts[0].as_str()).unwrap();
        let second = TEXT.find(parts[1].as_str()).unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_summary_at_least_one_sentence() {
        let summary = summarize(TEXT, 0.01).unwrap();
        assert_eq!(sentences(&summary).len(), 1);
    }

    #[test]
    fn test_summary_validation() {
        assert!(matches!(
            summarize("   ", 0.2),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            summarize(TEXT, 0.0),
            Err(ServiceError::InvalidParameter(_))
        ));
        assert!(matches!(
            summarize(TEXT, 1.5),
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_summary_rejects_too_many_sentences() {
        let text = "Short sentence here. ".repeat(super::super::MAX_UNITS + 1);
        let err = summarize(&text, 0.2).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParameter(_)));
        assert!(err.to_string().starts_with("Too many sentences"));

        let text = "a".repeat(super::super::MAX_TEXT_BYTES + 1);
        assert!(matches!(
            summarize(&text, 0.2),
            Err(ServiceError::InvalidParameter(_))
        ));
    }
}
