//! Named text queries.
//!
//! Clients pick an operation by name; there is no way to supply code.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::tokenize::{sentences, words};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFunction {
    WordCount,
    CharacterCount,
    SentenceCount,
    UniqueWordCount,
    AverageWordLength,
    LongestWord,
    MostCommonWord,
}

impl QueryFunction {
    pub const ALL: [QueryFunction; 7] = [
        Self::WordCount,
        Self::CharacterCount,
        Self::SentenceCount,
        Self::UniqueWordCount,
        Self::AverageWordLength,
        Self::LongestWord,
        Self::MostCommonWord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WordCount => "word_count",
            Self::CharacterCount => "character_count",
            Self::SentenceCount => "sentence_count",
            Self::UniqueWordCount => "unique_word_count",
            Self::AverageWordLength => "average_word_length",
            Self::LongestWord => "longest_word",
            Self::MostCommonWord => "most_common_word",
        }
    }

    pub fn parse(name: &str) -> ServiceResult<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| {
                ServiceError::invalid_parameter(format!(
                    "Unknown query_function; expected one of {}",
                    Self::ALL
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    pub fn apply(&self, text: &str) -> Value {
        let tokens = words(text);
        match self {
            Self::WordCount => json!(tokens.len()),
            Self::CharacterCount => json!(text.chars().count()),
            Self::SentenceCount => json!(sentences(text).len()),
            Self::UniqueWordCount => {
                let mut unique: Vec<&String> = tokens.iter().collect();
                unique.sort();
                unique.dedup();
                json!(unique.len())
            }
            Self::AverageWordLength => {
                if tokens.is_empty() {
                    json!(0.0)
                } else {
                    let total: usize = tokens.iter().map(|w| w.chars().count()).sum();
                    json!(total as f64 / tokens.len() as f64)
                }
            }
            Self::LongestWord => {
                // First of the longest wins
                let mut best: Option<&String> = None;
                for w in &tokens {
                    if best.is_none_or(|b| w.chars().count() > b.chars().count()) {
                        best = Some(w);
                    }
                }
                json!(best)
            }
            Self::MostCommonWord => {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for w in &tokens {
                    *counts.entry(w).or_default() += 1;
                }
                let mut best: Option<(&str, usize)> = None;
                for w in &tokens {
                    let c = counts[w.as_str()];
                    if best.is_none_or(|(_, bc)| c > bc) {
                        best = Some((w, c));
                    }
                }
                json!(best.map(|(w, _)| w))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "The cat sat. The cat ran away quickly!";

    #[test]
    fn test_counts() {
        assert_eq!(QueryFunction::WordCount.apply(TEXT), json!(8));
        assert_eq!(QueryFunction::SentenceCount.apply(TEXT), json!(2));
        assert_eq!(QueryFunction::UniqueWordCount.apply(TEXT), json!(6));
        assert_eq!(QueryFunction::CharacterCount.apply("héllo"), json!(5));
    }

    #[test]
    fn test_word_choices() {
        assert_eq!(QueryFunction::LongestWord.apply(TEXT), json!("quickly"));
        assert_eq!(QueryFunction::MostCommonWord.apply(TEXT), json!("the"));
        assert_eq!(QueryFunction::LongestWord.apply(""), Value::Null);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert_eq!(
            QueryFunction::parse("word_count").unwrap(),
            QueryFunction::WordCount
        );
        assert!(matches!(
            QueryFunction::parse("__import__('os').system('ls')"),
            Err(ServiceError::InvalidParameter(_))
        ));
    }
}
