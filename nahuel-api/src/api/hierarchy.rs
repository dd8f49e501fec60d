//! Academic unit hierarchy endpoint

use axum::{extract::State, Json};
use tracing::info;

use crate::db::catalog;
use crate::error::ApiResult;
use crate::hierarchy::{self, AcademicUnitNode};
use crate::AppState;

/// GET /api/academicUnitsHierarchy
///
/// Forest of academic units with their careers as leaves. Two reads (units,
/// then careers grouped by unit) feed the in-memory materializer.
pub async fn academic_units_hierarchy(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AcademicUnitNode>>> {
    info!("Request received for /api/academicUnitsHierarchy");

    let units = catalog::load_unit_rows(&state.db).await?;
    let careers = catalog::load_careers_by_unit(&state.db).await?;

    let unit_count = units.len();
    let forest = hierarchy::materialize(units, careers);
    info!(units = unit_count, roots = forest.len(), "Hierarchy materialized");

    Ok(Json(forest))
}
