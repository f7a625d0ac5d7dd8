//! Lexicon-based sentiment scoring.
//!
//! Polarity is the mean polarity of the opinion words found, in [-1, 1];
//! subjectivity is their mean subjectivity, in [0, 1]. A preceding negation
//! inverts and dampens a word; a preceding intensifier scales it.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::tokenize::words;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

/// word -> (polarity, subjectivity)
static LEXICON: LazyLock<HashMap<&'static str, (f64, f64)>> = LazyLock::new(|| {
    [
        ("love", (0.5, 0.6)),
        ("loved", (0.7, 0.8)),
        ("loves", (0.5, 0.6)),
        ("like", (0.3, 0.4)),
        ("liked", (0.3, 0.4)),
        ("enjoy", (0.4, 0.5)),
        ("enjoyed", (0.4, 0.5)),
        ("good", (0.7, 0.6)),
        ("great", (0.8, 0.75)),
        ("excellent", (1.0, 1.0)),
        ("amazing", (0.6, 0.9)),
        ("awesome", (1.0, 1.0)),
        ("wonderful", (1.0, 1.0)),
        ("fantastic", (0.4, 0.9)),
        ("perfect", (1.0, 1.0)),
        ("best", (1.0, 0.3)),
        ("better", (0.5, 0.5)),
        ("nice", (0.6, 1.0)),
        ("happy", (0.8, 1.0)),
        ("glad", (0.5, 1.0)),
        ("pleased", (0.5, 1.0)),
        ("beautiful", (0.85, 1.0)),
        ("brilliant", (0.9, 1.0)),
        ("fun", (0.3, 0.2)),
        ("helpful", (0.5, 0.5)),
        ("impressive", (1.0, 1.0)),
        ("recommend", (0.4, 0.5)),
        ("satisfied", (0.5, 1.0)),
        ("positive", (0.23, 0.55)),
        ("fast", (0.2, 0.6)),
        ("easy", (0.43, 0.83)),
        ("reliable", (0.5, 0.6)),
        ("success", (0.3, 0.5)),
        ("successful", (0.75, 0.95)),
        ("win", (0.8, 0.4)),
        ("hate", (-0.8, 0.9)),
        ("hated", (-0.9, 0.7)),
        ("hates", (-0.8, 0.9)),
        ("dislike", (-0.3, 0.4)),
        ("bad", (-0.7, 0.67)),
        ("worse", (-0.4, 0.6)),
        ("worst", (-1.0, 1.0)),
        ("terrible", (-1.0, 1.0)),
        ("awful", (-1.0, 1.0)),
        ("horrible", (-1.0, 1.0)),
        ("poor", (-0.4, 0.6)),
        ("sad", (-0.5, 1.0)),
        ("angry", (-0.5, 1.0)),
        ("annoying", (-0.8, 0.9)),
        ("boring", (-1.0, 1.0)),
        ("disappointed", (-0.75, 0.75)),
        ("disappointing", (-0.6, 0.7)),
        ("ugly", (-0.7, 1.0)),
        ("broken", (-0.4, 0.4)),
        ("useless", (-0.5, 0.2)),
        ("slow", (-0.3, 0.4)),
        ("difficult", (-0.5, 1.0)),
        ("hard", (-0.29, 0.54)),
        ("wrong", (-0.5, 0.9)),
        ("fail", (-0.5, 0.3)),
        ("failed", (-0.5, 0.3)),
        ("failure", (-0.3, 0.3)),
        ("problem", (-0.2, 0.2)),
        ("negative", (-0.3, 0.4)),
        ("stupid", (-0.8, 1.0)),
        ("fine", (0.42, 0.5)),
        ("okay", (0.5, 0.5)),
        ("interesting", (0.5, 0.5)),
    ]
    .into_iter()
    .collect()
});

static INTENSIFIERS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        ("very", 1.3),
        ("really", 1.3),
        ("extremely", 1.5),
        ("incredibly", 1.5),
        ("so", 1.2),
        ("too", 1.2),
        ("quite", 1.1),
        ("slightly", 0.5),
        ("somewhat", 0.7),
        ("barely", 0.4),
    ]
    .into_iter()
    .collect()
});

fn is_negation(word: &str) -> bool {
    matches!(word, "not" | "no" | "never" | "nor" | "without" | "cannot")
        || word.ends_with("n't")
        || word.ends_with("n\u{2019}t")
}

/// Negations reach this many words ahead.
const NEGATION_WINDOW: usize = 3;

pub fn analyze(text: &str) -> Sentiment {
    let tokens = words(text);
    let mut polarity = Vec::new();
    let mut subjectivity = Vec::new();

    for (i, word) in tokens.iter().enumerate() {
        let Some(&(p, s)) = LEXICON.get(word.as_str()) else {
            continue;
        };
        let mut p = p;
        let mut s = s;
        if i > 0 {
            if let Some(scale) = INTENSIFIERS.get(tokens[i - 1].as_str()) {
                p *= scale;
                s *= scale;
            }
        }
        let start = i.saturating_sub(NEGATION_WINDOW);
        if tokens[start..i].iter().any(|w| is_negation(w)) {
            p *= -0.5;
        }
        polarity.push(p.clamp(-1.0, 1.0));
        subjectivity.push(s.clamp(0.0, 1.0));
    }

    if polarity.is_empty() {
        return Sentiment {
            polarity: 0.0,
            subjectivity: 0.0,
        };
    }
    let n = polarity.len() as f64;
    Sentiment {
        polarity: polarity.iter().sum::<f64>() / n,
        subjectivity: subjectivity.iter().sum::<f64>() / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_sign() {
        assert!(analyze("I love this").polarity > 0.0);
        assert!(analyze("I hate this").polarity < 0.0);
    }

    #[test]
    fn test_neutral_text() {
        let s = analyze("The table has four legs.");
        assert_eq!(s.polarity, 0.0);
        assert_eq!(s.subjectivity, 0.0);
    }

    #[test]
    fn test_negation_flips() {
        assert!(analyze("This is not good").polarity < 0.0);
        assert!(analyze("This isn't bad at all").polarity > 0.0);
    }

    #[test]
    fn test_intensifier_scales_and_clamps() {
        let plain = analyze("good").polarity;
        let strong = analyze("very good").polarity;
        assert!(strong > plain);
        assert!(analyze("extremely excellent").polarity <= 1.0);
        assert!(analyze("extremely excellent").subjectivity <= 1.0);
    }
}
