//! Unfiltered catalog listings and hierarchy source rows

use std::collections::HashMap;

use nahuel_common::db::AcademicUnitRow;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    #[sqlx(rename = "code")]
    pub institution_code: String,
    #[sqlx(rename = "name")]
    pub institution_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AcademicUnit {
    #[serde(rename = "auCode")]
    #[sqlx(rename = "code")]
    pub code: String,
    #[serde(rename = "auName")]
    #[sqlx(rename = "name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CareerType {
    #[sqlx(rename = "code")]
    pub career_type_code: String,
    #[sqlx(rename = "name")]
    pub career_type_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TitleType {
    #[sqlx(rename = "code")]
    pub title_type_code: String,
    #[sqlx(rename = "name")]
    pub title_type_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TitleMode {
    #[sqlx(rename = "code")]
    pub title_mode_code: String,
    #[sqlx(rename = "name")]
    pub title_mode_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Career {
    #[sqlx(rename = "code")]
    pub career_code: String,
    #[sqlx(rename = "name")]
    pub career_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionType {
    #[sqlx(rename = "code")]
    pub resolution_type_code: String,
    #[sqlx(rename = "name")]
    pub resolution_type_name: String,
}

/// Read every `(code, name)` row of a catalog table, in id order
async fn list_code_table<T>(
    pool: &SqlitePool,
    table: &'static str,
    context: &'static str,
) -> ApiResult<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT code, name FROM {} ORDER BY id", table);

    sqlx::query_as::<_, T>(&sql)
        .fetch_all(pool)
        .await
        .map_err(ApiError::query(context))
}

pub async fn list_institutions(pool: &SqlitePool) -> ApiResult<Vec<Institution>> {
    list_code_table(pool, "edu_institution", "listing institutions").await
}

pub async fn list_academic_units(pool: &SqlitePool) -> ApiResult<Vec<AcademicUnit>> {
    list_code_table(pool, "academic_unit", "listing academic units").await
}

pub async fn list_career_types(pool: &SqlitePool) -> ApiResult<Vec<CareerType>> {
    list_code_table(pool, "career_type", "listing career types").await
}

pub async fn list_title_types(pool: &SqlitePool) -> ApiResult<Vec<TitleType>> {
    list_code_table(pool, "title_type", "listing title types").await
}

pub async fn list_title_modes(pool: &SqlitePool) -> ApiResult<Vec<TitleMode>> {
    list_code_table(pool, "title_mode", "listing title modes").await
}

pub async fn list_careers(pool: &SqlitePool) -> ApiResult<Vec<Career>> {
    list_code_table(pool, "career", "listing careers").await
}

pub async fn list_resolution_types(pool: &SqlitePool) -> ApiResult<Vec<ResolutionType>> {
    list_code_table(pool, "resolution_type", "listing resolution types").await
}

/// All academic units with their parent pointers, in id order
pub async fn load_unit_rows(pool: &SqlitePool) -> ApiResult<Vec<AcademicUnitRow>> {
    sqlx::query_as::<_, AcademicUnitRow>(
        "SELECT id, name, academic_unit_parent_id FROM academic_unit ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(ApiError::query("loading academic units"))
}

/// Career names grouped by academic unit id, in career id order
pub async fn load_careers_by_unit(pool: &SqlitePool) -> ApiResult<HashMap<i64, Vec<String>>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT academic_unit_id, name
        FROM career
        WHERE academic_unit_id IS NOT NULL
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(ApiError::query("loading careers by academic unit"))?;

    let mut grouped: HashMap<i64, Vec<String>> = HashMap::new();
    for (unit_id, name) in rows {
        grouped.entry(unit_id).or_default().push(name);
    }

    Ok(grouped)
}
