//! Text analysis endpoints and the search index API.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::super::AppState;
use super::helpers::{blocking, lenient_f64, lenient_int, png, required, required_text, ApiJson};
use crate::error::{ServiceError, ServiceResult};
use crate::services::search_index::DEFAULT_LIMIT;
use crate::services::text::{self, tokenize, QueryFunction};

const DEFAULT_RATIO: f64 = 0.2;
const DEFAULT_TOP_N: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: Option<String>,
    /// Share of sentences kept, in (0, 1].
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub top_n: Option<i64>,
}

/// `text` and `texts` are alternatives; `texts` wins when both are sent.
#[derive(Debug, Deserialize)]
pub struct TextsRequest {
    pub text: Option<String>,
    pub texts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub texts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    pub text: Option<String>,
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CustomQueryRequest {
    pub text: Option<String>,
    pub query_function: Option<String>,
}

pub async fn summarize(ApiJson(req): ApiJson<SummarizeRequest>) -> ServiceResult<Response> {
    let input = required_text(req.text, "text")?;
    let ratio = req.ratio.unwrap_or(DEFAULT_RATIO);

    let summary = blocking(move || text::summarize(&input, ratio)).await?;
    Ok(Json(json!({ "summary": summary })).into_response())
}

pub async fn keywords(ApiJson(req): ApiJson<KeywordsRequest>) -> ServiceResult<Response> {
    let input = required_text(req.text, "text")?;
    let top_n = usize::try_from(req.top_n.unwrap_or(DEFAULT_TOP_N))
        .map_err(|_| ServiceError::invalid_parameter("top_n must be at least 1"))?;

    let keywords = blocking(move || text::extract_keywords(&input, top_n)).await?;
    Ok(Json(json!({ "keywords": keywords })).into_response())
}

pub async fn sentiment(ApiJson(req): ApiJson<TextRequest>) -> ServiceResult<Response> {
    let input = required_text(req.text, "text")?;
    Ok(Json(text::sentiment(&input)).into_response())
}

/// Texts to project: `texts`, or the sentences of `text`.
fn projection_inputs(req: TextsRequest) -> ServiceResult<Vec<String>> {
    if let Some(texts) = req.texts {
        return Ok(texts);
    }
    let input = required_text(req.text, "text")
        .map_err(|_| ServiceError::validation("Texts are required"))?;
    Ok(tokenize::sentences(&input))
}

/// Served at both `/visualize/` and `/mds/`.
pub async fn visualize(ApiJson(req): ApiJson<TextsRequest>) -> ServiceResult<Response> {
    let texts = projection_inputs(req)?;
    let plot = blocking(move || text::visualize(&texts)).await?;
    Ok(png(plot))
}

/// Rank `texts` against `query`, or query the persistent index when no
/// texts are supplied. Both paths answer `{"results": [{text, score}]}`.
pub async fn search(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SearchRequest>,
) -> ServiceResult<Response> {
    let query = required_text(req.query, "query")?;

    let results = match req.texts {
        Some(texts) => blocking(move || Ok(text::search_texts(&query, &texts))).await?,
        None => {
            let index = state.index.clone();
            blocking(move || Ok(index.search(&query, DEFAULT_LIMIT))).await?
        }
    };
    Ok(Json(json!({ "results": results })).into_response())
}

pub async fn categorize(ApiJson(req): ApiJson<CategorizeRequest>) -> ServiceResult<Response> {
    let input = required_text(req.text, "text")?;
    let categories = required(req.categories, "categories")
        .map_err(|_| ServiceError::validation("Categories are required"))?;

    let category = blocking(move || text::categorize(&input, &categories)).await?;
    Ok(Json(json!({ "category": category })).into_response())
}

pub async fn custom_query(ApiJson(req): ApiJson<CustomQueryRequest>) -> ServiceResult<Response> {
    let input = required_text(req.text, "text")?;
    let function = QueryFunction::parse(&required_text(req.query_function, "query_function")?)?;
    Ok(Json(json!({
        "query_function": function.as_str(),
        "result": function.apply(&input),
    }))
    .into_response())
}

/// Append `text` or each of `texts` to the search index, persisting once.
pub async fn index_documents(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TextsRequest>,
) -> ServiceResult<Response> {
    let documents = match req.texts {
        Some(texts) if !texts.is_empty() => texts,
        Some(_) => return Err(ServiceError::validation("Texts are required")),
        None => vec![required_text(req.text, "text")?],
    };

    let index = state.index.clone();
    let count = documents.len();
    let total = blocking(move || index.index_documents(&documents)).await?;

    tracing::info!("Indexed {} documents ({} total)", count, total);
    Ok(Json(json!({ "indexed": count, "total": total })).into_response())
}
