//! Text categorisation by TF-IDF similarity.
//!
//! Each category label is expanded with related topic words before
//! comparison, so short labels like "sports" still match on-topic text.

use super::tfidf::similarities;
use crate::error::{ServiceError, ServiceResult};

fn topic_words(category: &str) -> &'static [&'static str] {
    match category.trim().to_lowercase().as_str() {
        "sports" | "sport" => &["football", "basketball", "cricket", "soccer", "athlete"],
        "technology" | "tech" => &["software", "computer", "tech", "ai", "robotics"],
        "politics" => &["election", "government", "parliament", "minister", "policy"],
        "business" | "finance" => &["market", "company", "revenue", "investment", "stock"],
        "health" => &["doctor", "medicine", "hospital", "disease", "fitness"],
        "entertainment" => &["movie", "music", "film", "celebrity", "television"],
        "science" => &["research", "experiment", "physics", "biology", "chemistry"],
        _ => &[],
    }
}

/// Return the category most similar to `text`; the first wins ties.
pub fn categorize(text: &str, categories: &[String]) -> ServiceResult<String> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("Text is required"));
    }
    if categories.is_empty() {
        return Err(ServiceError::validation("At least one category is required"));
    }

    let expanded: Vec<String> = categories
        .iter()
        .map(|c| {
            let mut doc = c.clone();
            for word in topic_words(c) {
                doc.push(' ');
                doc.push_str(word);
            }
            doc
        })
        .collect();
    let docs: Vec<&str> = expanded.iter().map(String::as_str).collect();
    let scores = similarities(text, &docs);

    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    Ok(categories[best].clone())
}
