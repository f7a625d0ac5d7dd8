//! Image upload, lookup and transformation endpoints.

use axum::{
    extract::{multipart::Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use super::super::auth::AuthUser;
use super::super::AppState;
use super::helpers::{
    base_url, binary, blocking, lenient_int, pixels, png, read_file, read_files, required,
    required_text, ApiJson, ApiQuery,
};
use crate::error::ServiceResult;
use crate::models::ArtifactKind;
use crate::services::imaging::{self, CropBox, OutputFormat};

const KIND: ArtifactKind = ArtifactKind::Image;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub image_id: Option<i64>,
}

/// Query parameters for the colour histogram.
#[derive(Debug, Deserialize)]
pub struct HistogramQuery {
    pub image_id: Option<i64>,
    /// `json` for raw bins; anything else renders the plot.
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameImageRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub image_id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResizeRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub image_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub height: Option<i64>,
}

/// Crop box in pixels: `left`/`top` inclusive, `right`/`bottom` exclusive.
#[derive(Debug, Deserialize)]
pub struct CropRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub image_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub left: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub top: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub right: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub bottom: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub image_id: Option<i64>,
    /// Target codec, JPEG when absent.
    pub format: Option<String>,
}

pub async fn upload_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let upload = read_file(multipart, "image").await?;
    let artifact = state.artifacts.upload(KIND, &upload).await?;
    tracing::info!("{} uploaded image {}", user.username, artifact.id);
    Ok((
        StatusCode::CREATED,
        Json(artifact.to_json(&base_url(&state, &headers))),
    )
        .into_response())
}

pub async fn batch_upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let uploads = read_files(multipart, "images").await?;
    let stored = state.artifacts.batch_upload(KIND, &uploads).await?;
    tracing::info!(
        "{} uploaded {} of {} images",
        user.username,
        stored.len(),
        uploads.len()
    );
    let base = base_url(&state, &headers);
    let body: Vec<_> = stored.iter().map(|a| a.to_json(&base)).collect();
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn get_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<ImageQuery>,
) -> ServiceResult<Response> {
    let id = required(params.image_id, "image_id")?;
    let artifact = state.artifacts.get(KIND, id).await?;
    Ok(Json(artifact.to_json(&base_url(&state, &headers))).into_response())
}

pub async fn update_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RenameImageRequest>,
) -> ServiceResult<Response> {
    let id = required(req.image_id, "image_id")?;
    let name = required_text(req.name, "name")?;
    let artifact = state.artifacts.update(KIND, id, &name).await?;
    Ok(Json(artifact.to_json(&base_url(&state, &headers))).into_response())
}

pub async fn delete_image(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ImageQuery>,
) -> ServiceResult<Response> {
    let id = required(params.image_id, "image_id")?;
    state.artifacts.delete(KIND, id).await?;
    Ok(Json(json!({ "message": "Image deleted successfully" })).into_response())
}

/// `GET /api/color_histogram?image_id=N[&format=json]`
pub async fn color_histogram(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<HistogramQuery>,
) -> ServiceResult<Response> {
    let id = required(params.image_id, "image_id")?;
    let as_json = params
        .format
        .is_some_and(|f| f.eq_ignore_ascii_case("json"));
    let bytes = state.artifacts.payload(KIND, id).await?;

    if as_json {
        let hist = blocking(move || imaging::histogram(&bytes)).await?;
        return Ok(Json(hist).into_response());
    }
    let plot = blocking(move || imaging::histogram_plot(&imaging::histogram(&bytes)?)).await?;
    Ok(png(plot))
}

pub async fn resize_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResizeRequest>,
) -> ServiceResult<Response> {
    let id = required(req.image_id, "image_id")?;
    let width = pixels(req.width, "width")?;
    let height = pixels(req.height, "height")?;

    let bytes = state.artifacts.payload(KIND, id).await?;
    let resized = blocking(move || imaging::resize(&bytes, width, height)).await?;
    Ok(png(resized))
}

pub async fn crop_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CropRequest>,
) -> ServiceResult<Response> {
    let id = required(req.image_id, "image_id")?;
    let area = CropBox {
        left: pixels(req.left, "left")?,
        top: pixels(req.top, "top")?,
        right: pixels(req.right, "right")?,
        bottom: pixels(req.bottom, "bottom")?,
    };

    let bytes = state.artifacts.payload(KIND, id).await?;
    let cropped = blocking(move || imaging::crop(&bytes, area)).await?;
    Ok(png(cropped))
}

pub async fn convert_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ConvertRequest>,
) -> ServiceResult<Response> {
    let id = required(req.image_id, "image_id")?;
    let format = match req.format.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => OutputFormat::parse(name)?,
        _ => OutputFormat::Jpeg,
    };

    let bytes = state.artifacts.payload(KIND, id).await?;
    let (converted, mime) = blocking(move || imaging::convert(&bytes, format)).await?;
    Ok(binary(converted, mime))
}
