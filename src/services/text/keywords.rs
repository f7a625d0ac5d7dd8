//! Keyword extraction with RAKE (Rapid Automatic Keyword Extraction).
//!
//! Candidate phrases are runs of content words between stop words and
//! punctuation. Each word scores degree / frequency; a phrase scores the sum
//! of its words.

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

use super::tokenize::is_stop_word;
use crate::error::{ServiceError, ServiceResult};

fn candidate_phrases(text: &str) -> Vec<Vec<String>> {
    let mut phrases = Vec::new();
    for fragment in text.split(|c: char| !(c.is_alphanumeric() || c.is_whitespace() || c == '\'' || c == '-')) {
        let mut current: Vec<String> = Vec::new();
        for word in fragment.unicode_words() {
            let word = word.to_lowercase();
            if is_stop_word(&word) || word.chars().all(|c| c.is_numeric()) {
                if !current.is_empty() {
                    phrases.push(std::mem::take(&mut current));
                }
            } else {
                current.push(word);
            }
        }
        if !current.is_empty() {
            phrases.push(current);
        }
    }
    phrases
}

/// Top `top_n` phrases, best first. Equal scores keep first-seen order.
pub fn extract_keywords(text: &str, top_n: usize) -> ServiceResult<Vec<String>> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("Text is required"));
    }
    if top_n == 0 {
        return Err(ServiceError::invalid_parameter("top_n must be at least 1"));
    }

    let phrases = candidate_phrases(text);

    let mut frequency: HashMap<&str, f64> = HashMap::new();
    let mut degree: HashMap<&str, f64> = HashMap::new();
    for phrase in &phrases {
        for word in phrase {
            *frequency.entry(word).or_default() += 1.0;
            *degree.entry(word).or_default() += phrase.len() as f64;
        }
    }

    let mut seen: Vec<String> = Vec::new();
    let mut scored: Vec<(String, f64)> = Vec::new();
    for phrase in &phrases {
        let joined = phrase.join(" ");
        if seen.contains(&joined) {
            continue;
        }
        let score = phrase
            .iter()
            .map(|w| degree[w.as_str()] / frequency[w.as_str()])
            .sum();
        seen.push(joined.clone());
        scored.push((joined, score));
    }

    // Stable sort keeps first occurrence ahead on ties
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scored.into_iter().take(top_n).map(|(p, _)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_word_phrases_rank_first() {
        let text = "Compatibility of systems of linear constraints over the set of natural numbers. \
                    Criteria of compatibility of a system of linear Diophantine equations are considered.";
        let keywords = extract_keywords(text, 3).unwrap();
        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords[0], "linear diophantine equations");
        assert!(keywords.contains(&"linear constraints".to_string()));
    }

    #[test]
    fn test_phrases_are_deduplicated() {
        let keywords = extract_keywords("Red apples. Red apples! Green pears.", 5).unwrap();
        assert_eq!(keywords, vec!["red apples", "green pears"]);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            extract_keywords("", 5),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            extract_keywords("word", 0),
            Err(ServiceError::InvalidParameter(_))
        ));
    }
}
