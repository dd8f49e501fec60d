//! Title listing and title update endpoints

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use nahuel_common::db::TitleRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::titles;
use crate::error::{ApiError, ApiResult};
use crate::filters;
use crate::services::{self, TitleUpdatePayload};
use crate::AppState;

/// GET /api/titles
///
/// Every query parameter is optional; see [`filters::FILTER_FIELDS`] for
/// the recognized names. Unrecognized parameters are ignored.
pub async fn list_titles(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<Vec<TitleRecord>>> {
    info!("Request received for /api/titles");

    let Query(criteria) = query?;
    let compiled = filters::compile(&criteria)?;

    if compiled.is_unrestricted() {
        info!("No params received");
    }

    let records = titles::fetch_titles(&state.db, &compiled).await?;
    info!(count = records.len(), view = compiled.view.name(), "Titles listed");

    Ok(Json(records))
}

/// POST /api/title request body
#[derive(Debug, Deserialize)]
pub struct TitleUpdateRequest {
    pub title: Option<TitleUpdatePayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleUpdateResponse {
    pub status: u16,
    pub message: String,
    pub updated_title: TitleRecord,
}

/// POST /api/title
pub async fn update_title(
    State(state): State<AppState>,
    body: Result<Json<TitleUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<TitleUpdateResponse>> {
    info!("Request received for /api/title");

    let Json(request) = body?;
    let payload = request
        .title
        .ok_or_else(|| ApiError::Input("Missing 'title' object in request body".to_string()))?;

    let updated = services::update_title(&state.db, state.code_resolution, &payload).await?;

    Ok(Json(TitleUpdateResponse {
        status: 200,
        message: format!("Title {} updated", updated.id_title),
        updated_title: updated,
    }))
}
