//! Database row models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of `v_career_title`, shaped for clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TitleRecord {
    pub id_title: i64,
    #[sqlx(rename = "edu_institution_name")]
    pub institution: Option<String>,
    #[sqlx(rename = "academic_unit_name")]
    pub academic_unit: Option<String>,
    #[sqlx(rename = "career_type_name")]
    pub career_type: Option<String>,
    pub career_code: Option<String>,
    pub career_name: Option<String>,
    pub title_code: String,
    #[sqlx(rename = "title")]
    pub title_name: String,
    pub title_female_name: Option<String>,
    #[sqlx(rename = "title_comment")]
    pub comment: Option<String>,
    #[sqlx(rename = "title_type_name")]
    pub title_type: Option<String>,
    #[sqlx(rename = "title_mode_name")]
    pub career_mode: Option<String>,
    #[sqlx(rename = "title_state_code")]
    pub state: Option<String>,
}

/// Resolution row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    #[sqlx(rename = "id")]
    pub resolution_id: String,
    pub resolution_type_id: Option<i64>,
    #[sqlx(rename = "number")]
    pub resolution_number: String,
    #[sqlx(rename = "year")]
    pub resolution_year: String,
    #[sqlx(rename = "date")]
    pub resolution_date: Option<NaiveDate>,
}

/// A resolution as seen through an enabled title link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LinkedResolution {
    pub id_title: i64,
    pub resolution_id: String,
    pub resolution_type_code: Option<String>,
    pub resolution_type_name: Option<String>,
    pub resolution_number: String,
    pub resolution_year: String,
    pub resolution_date: Option<NaiveDate>,
}

/// Academic unit row as read for hierarchy building
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AcademicUnitRow {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "academic_unit_parent_id")]
    pub parent_id: Option<i64>,
}
