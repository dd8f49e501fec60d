//! Unfiltered catalog listings

use axum::{extract::State, Json};
use tracing::info;

use crate::db::catalog::{
    self, AcademicUnit, Career, CareerType, Institution, ResolutionType, TitleMode, TitleType,
};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/institutions
pub async fn list_institutions(State(state): State<AppState>) -> ApiResult<Json<Vec<Institution>>> {
    info!("Request received for /api/institutions");
    Ok(Json(catalog::list_institutions(&state.db).await?))
}

/// GET /api/academicUnits
pub async fn list_academic_units(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AcademicUnit>>> {
    info!("Request received for /api/academicUnits");
    Ok(Json(catalog::list_academic_units(&state.db).await?))
}

/// GET /api/careerTypes
pub async fn list_career_types(State(state): State<AppState>) -> ApiResult<Json<Vec<CareerType>>> {
    info!("Request received for /api/careerTypes");
    Ok(Json(catalog::list_career_types(&state.db).await?))
}

/// GET /api/titleTypes
pub async fn list_title_types(State(state): State<AppState>) -> ApiResult<Json<Vec<TitleType>>> {
    info!("Request received for /api/titleTypes");
    Ok(Json(catalog::list_title_types(&state.db).await?))
}

/// GET /api/titleModes
pub async fn list_title_modes(State(state): State<AppState>) -> ApiResult<Json<Vec<TitleMode>>> {
    info!("Request received for /api/titleModes");
    Ok(Json(catalog::list_title_modes(&state.db).await?))
}

/// GET /api/careers
pub async fn list_careers(State(state): State<AppState>) -> ApiResult<Json<Vec<Career>>> {
    info!("Request received for /api/careers");
    Ok(Json(catalog::list_careers(&state.db).await?))
}

/// GET /api/resolutionTypes
pub async fn list_resolution_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ResolutionType>>> {
    info!("Request received for /api/resolutionTypes");
    Ok(Json(catalog::list_resolution_types(&state.db).await?))
}
