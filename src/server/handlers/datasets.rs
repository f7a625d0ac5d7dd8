//! Tabular dataset endpoints.

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
    base_url, blocking, lenient_int, read_file, required, required_text, ApiJson, ApiQuery,
};
use crate::error::ServiceResult;
use crate::models::ArtifactKind;
use crate::services::tabular;
use crate::storage::CHART_FILENAME;

const KIND: ArtifactKind = ArtifactKind::Dataset;

#[derive(Debug, Deserialize)]
pub struct DatasetQuery {
    pub dataset_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RenameDatasetRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub dataset_id: Option<i64>,
    pub name: Option<String>,
}

pub async fn upload_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let upload = read_file(multipart, "file").await?;
    let artifact = state.artifacts.upload(KIND, &upload).await?;
    tracing::info!("{} uploaded dataset {}", user.username, artifact.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "data": artifact.to_json(&base_url(&state, &headers)),
        })),
    )
        .into_response())
}

pub async fn get_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<DatasetQuery>,
) -> ServiceResult<Response> {
    let id = required(params.dataset_id, "dataset_id")?;
    let artifact = state.artifacts.get(KIND, id).await?;
    Ok(Json(artifact.to_json(&base_url(&state, &headers))).into_response())
}

/// Rename a dataset. The id travels in the body alongside the new fields.
pub async fn update_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RenameDatasetRequest>,
) -> ServiceResult<Response> {
    let id = required(req.dataset_id, "dataset_id")?;
    let name = required_text(req.name, "name")?;
    let artifact = state.artifacts.update(KIND, id, &name).await?;
    Ok(Json(artifact.to_json(&base_url(&state, &headers))).into_response())
}

pub async fn delete_file(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DatasetQuery>,
) -> ServiceResult<Response> {
    let id = required(params.dataset_id, "dataset_id")?;
    state.artifacts.delete(KIND, id).await?;
    Ok(Json(json!({ "message": "Dataset deleted successfully" })).into_response())
}

pub async fn statistics(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DatasetQuery>,
) -> ServiceResult<Response> {
    let id = required(params.dataset_id, "dataset_id")?;
    let bytes = state.artifacts.payload(KIND, id).await?;
    let stats = blocking(move || {
        let table = tabular::parse_csv(&bytes)?;
        Ok(tabular::statistics(&table))
    })
    .await?;
    Ok(Json(stats).into_response())
}

/// Render the chart to the fixed chart path and return its URL.
pub async fn chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<DatasetQuery>,
) -> ServiceResult<Response> {
    let id = required(params.dataset_id, "dataset_id")?;
    let bytes = state.artifacts.payload(KIND, id).await?;
    let store = state.artifacts.store().clone();

    blocking(move || {
        let table = tabular::parse_csv(&bytes)?;
        let png = tabular::chart(&table)?;
        store.write_atomic(CHART_FILENAME, &png)?;
        Ok(())
    })
    .await?;

    tracing::debug!("Chart for dataset {} written to {}", id, CHART_FILENAME);
    Ok(Json(json!({
        "message": "Chart created successfully",
        "chart": format!("{}/media/{}", base_url(&state, &headers), CHART_FILENAME),
    }))
    .into_response())
}
