//! Resolution endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nahuel_common::db::{LinkedResolution, ResolutionRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::resolutions;
use crate::error::{ApiError, ApiResult};
use crate::services::{self, ResolutionInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LinkedResolutionsQuery {
    #[serde(rename = "idTitle")]
    pub id_title: Option<String>,
}

/// GET /api/resolutions
///
/// Enabled resolution links, for one title when `idTitle` is given.
pub async fn list_resolutions(
    State(state): State<AppState>,
    query: Result<Query<LinkedResolutionsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LinkedResolution>>> {
    info!("Request received for /api/resolutions");

    let Query(query) = query?;
    let id_title = match query.id_title.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::Input(format!("idTitle must be an integer, got '{}'", raw))
        })?),
    };

    let linked = resolutions::list_linked(&state.db, id_title).await?;
    Ok(Json(linked))
}

/// POST /api/resolution request body
#[derive(Debug, Deserialize)]
pub struct CreateResolutionRequest {
    pub resolution: Option<ResolutionInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResolutionResponse {
    pub status: u16,
    pub existing_resolution: bool,
    pub resolution: ResolutionRecord,
}

/// POST /api/resolution
///
/// 201 when the resolution was created, 200 when an existing one with the
/// same type, number and year was returned instead.
pub async fn create_resolution(
    State(state): State<AppState>,
    body: Result<Json<CreateResolutionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    info!("Request received for /api/resolution");

    let Json(request) = body?;
    let input = request.resolution.ok_or_else(|| {
        ApiError::Input("Missing 'resolution' object in request body".to_string())
    })?;

    let outcome = services::get_or_create(&state.db, state.code_resolution, &input).await?;

    let status = if outcome.existing_resolution {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let response = CreateResolutionResponse {
        status: status.as_u16(),
        existing_resolution: outcome.existing_resolution,
        resolution: outcome.resolution,
    };

    Ok((status, Json(response)).into_response())
}
