//! TF-IDF vectorisation and cosine ranking.
//!
//! Smoothed idf `ln((1 + n) / (1 + df)) + 1`, raw term counts, rows L2
//! normalised, English stop words removed.

use std::collections::{BTreeMap, HashMap};

use super::tokenize::terms;

#[derive(Debug, Clone)]
pub struct TfidfModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfModel {
    /// Fit on `docs`. With `max_features`, only the most frequent terms
    /// across the corpus are kept (ties broken alphabetically).
    pub fn fit(docs: &[&str], max_features: Option<usize>) -> Self {
        let tokenised: Vec<Vec<String>> = docs.iter().map(|d| terms(d)).collect();

        let mut total: HashMap<&str, usize> = HashMap::new();
        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in &tokenised {
            let mut seen: Vec<&str> = Vec::new();
            for t in doc {
                *total.entry(t).or_default() += 1;
                if !seen.contains(&t.as_str()) {
                    seen.push(t);
                    *df.entry(t).or_default() += 1;
                }
            }
        }

        let mut kept: Vec<&str> = total.keys().copied().collect();
        if let Some(limit) = max_features {
            kept.sort_by(|a, b| total[b].cmp(&total[a]).then(a.cmp(b)));
            kept.truncate(limit);
        }
        kept.sort();

        let n = docs.len() as f64;
        let vocabulary: BTreeMap<String, usize> = kept
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();
        let idf = kept
            .iter()
            .map(|t| ((1.0 + n) / (1.0 + df[t] as f64)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    pub fn num_features(&self) -> usize {
        self.idf.len()
    }

    /// Dense L2-normalised vector for `doc`. All zeros when no term is known.
    pub fn transform(&self, doc: &str) -> Vec<f64> {
        let mut v = vec![0.0; self.idf.len()];
        for t in terms(doc) {
            if let Some(&i) = self.vocabulary.get(&t) {
                v[i] += 1.0;
            }
        }
        for (x, idf) in v.iter_mut().zip(&self.idf) {
            *x *= idf;
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Similarity of `query` to each candidate, fitting on query plus candidates.
pub fn similarities(query: &str, candidates: &[&str]) -> Vec<f64> {
    let mut corpus = Vec::with_capacity(candidates.len() + 1);
    corpus.push(query);
    corpus.extend_from_slice(candidates);
    let model = TfidfModel::fit(&corpus, None);
    let q = model.transform(query);
    candidates
        .iter()
        .map(|c| cosine(&q, &model.transform(c)))
        .collect()
}

/// Indices and scores of the `top_k` most similar candidates, best first.
/// Equal scores keep input order.
pub fn rank(query: &str, candidates: &[&str], top_k: usize) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = similarities(query, candidates)
        .into_iter()
        .enumerate()
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_are_normalised() {
        let model = TfidfModel::fit(&["apple banana", "banana cherry"], None);
        assert_eq!(model.num_features(), 3);
        let v = model.transform("apple banana banana");
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(model.transform("unknown words").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_max_features_keeps_frequent_terms() {
        let model = TfidfModel::fit(&["red red red blue", "red green"], Some(1));
        assert_eq!(model.num_features(), 1);
        assert!(model.transform("red")[0] > 0.0);
    }

    #[test]
    fn test_rank_orders_by_relevance() {
        let texts = [
            "cooking pasta recipes",
            "rust programming language",
            "programming in rust is fun",
        ];
        let ranked = rank("rust programming", &texts, 5);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[2].0, 0);
        assert_eq!(ranked[2].1, 0.0);
    }

    #[test]
    fn test_rank_truncates() {
        let texts = ["a1 x", "b2 x", "c3 x", "d4 x", "e5 x", "f6 x", "g7 x"];
        assert_eq!(rank("x", &texts, 5).len(), 5);
    }
}
