//! Request extraction and response helpers shared by handlers.
//!
//! Numeric fields are accepted either as JSON numbers or as numeric strings,
//! matching what form-encoded clients tend to send.

use axum::{
    async_trait,
    extract::{multipart::Multipart, FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};

use super::super::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::services::Upload;

/// `Json<T>` whose rejections become `{"error": ...}` responses.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ServiceError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejections become `{"error": ...}` responses.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ServiceError::invalid_parameter(e.body_text()))?;
        Ok(Self(value))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

/// `deserialize_with` for optional integers sent as numbers or numeric strings.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<NumberOrString>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(NumberOrString::Int(n)) => Some(n),
        Some(NumberOrString::Float(f)) if f.fract() == 0.0 => Some(f as i64),
        Some(NumberOrString::Float(_)) => None,
        Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
    };
    parsed
        .map(Some)
        .ok_or_else(|| D::Error::custom("expected an integer"))
}

/// `deserialize_with` for optional floats sent as numbers or numeric strings.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(n)) => Ok(Some(n as f64)),
        Some(NumberOrString::Float(f)) => Ok(Some(f)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom("expected a number")),
    }
}

pub fn required<T>(value: Option<T>, name: &str) -> ServiceResult<T> {
    value.ok_or_else(|| ServiceError::validation(format!("{} is required", name)))
}

/// A present, non-blank string. The message names the field capitalised,
/// e.g. "Text is required".
pub fn required_text(value: Option<String>, name: &str) -> ServiceResult<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ServiceError::validation(format!(
            "{} is required",
            capitalize(name)
        ))),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Pixel sizes and coordinates must fit in a `u32`.
pub fn pixels(value: Option<i64>, name: &str) -> ServiceResult<u32> {
    let value = required(value, name)?;
    u32::try_from(value).map_err(|_| {
        ServiceError::invalid_parameter(format!("{} must be a non-negative integer", name))
    })
}

/// Absolute base for artifact URLs: configured `public_url`, else the Host
/// header of the request.
pub fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.public_url {
        return url.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

pub fn binary(content: Vec<u8>, content_type: &str) -> Response {
    ([(header::CONTENT_TYPE, content_type.to_string())], content).into_response()
}

pub fn png(content: Vec<u8>) -> Response {
    binary(content, "image/png")
}

/// Run CPU-bound work off the async runtime.
pub async fn blocking<T, F>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::upstream("Processing task failed", e))?
}

/// Collect every file submitted under `field`.
pub async fn read_files(mut multipart: Multipart, field: &str) -> ServiceResult<Vec<Upload>> {
    let mut uploads = Vec::new();
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::validation(format!("Malformed multipart body: {}", e)))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let name = part.file_name().unwrap_or(field).to_string();
        let content = part
            .bytes()
            .await
            .map_err(|e| ServiceError::validation(format!("Failed to read upload: {}", e)))?;
        uploads.push(Upload {
            name,
            content: content.to_vec(),
        });
    }
    Ok(uploads)
}

/// The single file submitted under `field`.
pub async fn read_file(multipart: Multipart, field: &str) -> ServiceResult<Upload> {
    read_files(multipart, field)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::validation("No file was submitted"))
}
