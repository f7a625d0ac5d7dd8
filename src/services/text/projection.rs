//! Two-dimensional embedding of texts for visualisation.
//!
//! Texts are TF-IDF vectorised (at most 100 features) and projected with
//! classical multidimensional scaling: double-centre the squared distance
//! matrix and take its two leading eigenvectors by power iteration.

use super::check_size;
use super::tfidf::TfidfModel;
use crate::error::{ServiceError, ServiceResult};
use crate::services::render;

const MAX_FEATURES: usize = 100;
const POWER_ITERATIONS: usize = 200;

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Leading eigenpair of a symmetric matrix.
fn power_iteration(m: &[Vec<f64>], seed: usize) -> (f64, Vec<f64>) {
    let n = m.len();
    // Deterministic, non-degenerate start vector
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + ((i + seed) % 7) as f64 * 0.1).collect();
    let mut lambda = 0.0;
    for _ in 0..POWER_ITERATIONS {
        let next: Vec<f64> = m
            .iter()
            .map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum())
            .collect();
        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return (0.0, vec![0.0; n]);
        }
        v = next.into_iter().map(|x| x / norm).collect();
        lambda = norm;
    }
    (lambda, v)
}

/// Embed `vectors` into the plane preserving pairwise distances.
pub fn classical_mds(vectors: &[Vec<f64>]) -> Vec<(f64, f64)> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }

    let d2: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| squared_distance(&vectors[i], &vectors[j])).collect())
        .collect();
    let row_mean: Vec<f64> = d2.iter().map(|r| r.iter().sum::<f64>() / n as f64).collect();
    let total_mean = row_mean.iter().sum::<f64>() / n as f64;

    // B = -1/2 J D2 J
    let mut b: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| -0.5 * (d2[i][j] - row_mean[i] - row_mean[j] + total_mean))
                .collect()
        })
        .collect();

    let mut axes = Vec::with_capacity(2);
    for k in 0..2 {
        let (lambda, v) = power_iteration(&b, k);
        let scale = lambda.max(0.0).sqrt();
        axes.push(v.iter().map(|x| x * scale).collect::<Vec<f64>>());
        // Deflate
        for i in 0..n {
            for j in 0..n {
                b[i][j] -= lambda * v[i] * v[j];
            }
        }
    }

    (0..n).map(|i| (axes[0][i], axes[1][i])).collect()
}

/// Project texts to 2-D coordinates.
pub fn project(texts: &[String]) -> ServiceResult<Vec<(f64, f64)>> {
    let docs: Vec<&str> = texts
        .iter()
        .map(String::as_str)
        .filter(|t| !t.trim().is_empty())
        .collect();
    if docs.is_empty() {
        return Err(ServiceError::validation("At least one text is required"));
    }
    check_size(docs.iter().map(|d| d.len()).sum(), docs.len(), "texts")?;
    let model = TfidfModel::fit(&docs, Some(MAX_FEATURES));
    let vectors: Vec<Vec<f64>> = docs.iter().map(|d| model.transform(d)).collect();
    Ok(classical_mds(&vectors))
}

/// Scatter plot PNG of the projected texts.
pub fn visualize(texts: &[String]) -> ServiceResult<Vec<u8>> {
    let points = project(texts)?;
    render::scatter_plot(&points)
}
