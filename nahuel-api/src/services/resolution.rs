//! Resolution get-or-create
//!
//! Resolutions are unique on (type, number, year). Creating one that
//! already exists returns the stored row instead. Lookup and insert share
//! one transaction, and the insert yields to the natural-key index, so two
//! identical concurrent requests both end up with the same row: the first
//! creates it, the second reads it.

use chrono::NaiveDate;
use nahuel_common::db::ResolutionRecord;
use nahuel_common::uuid_utils;
use nahuel_common::CodeResolution;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::db::lookup::{resolve_code, CodeKind};
use crate::db::{begin_monitored, resolutions};
use crate::error::{ApiError, ApiResult};
use crate::lenient::{self, present};

/// Resolution fields as received from clients. Month is 1-based.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInput {
    #[serde(default, deserialize_with = "lenient::text")]
    pub resolution_type_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub resolution_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub resolution_year: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub resolution_month: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub resolution_day: Option<String>,
}

/// Validated natural key plus optional date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionKey {
    pub type_code: String,
    pub number: String,
    pub year: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutcome {
    pub existing_resolution: bool,
    pub resolution: ResolutionRecord,
}

impl ResolutionInput {
    /// Check mandatory fields and assemble the date. Touches no store.
    pub fn validate(&self) -> ApiResult<ResolutionKey> {
        let type_code = present(&self.resolution_type_code);
        let number = present(&self.resolution_number);
        let year = present(&self.resolution_year);

        let (Some(type_code), Some(number), Some(year)) = (type_code, number, year) else {
            let missing: Vec<&str> = [
                ("resolutionTypeCode", type_code),
                ("resolutionNumber", number),
                ("resolutionYear", year),
            ]
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

            return Err(ApiError::Input(format!(
                "Missing mandatory resolution fields: {}",
                missing.join(", ")
            )));
        };

        let date = match (present(&self.resolution_month), present(&self.resolution_day)) {
            (Some(month), Some(day)) => Some(assemble_date(year, month, day)?),
            _ => None,
        };

        Ok(ResolutionKey {
            type_code: type_code.to_string(),
            number: number.to_string(),
            year: year.to_string(),
            date,
        })
    }
}

/// Calendar date from year, 1-based month and day
fn assemble_date(year: &str, month: &str, day: &str) -> ApiResult<NaiveDate> {
    let invalid = || {
        ApiError::Input(format!(
            "Invalid resolution date: year {}, month {}, day {}",
            year, month, day
        ))
    };

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Return the resolution matching the input, creating it if needed
pub async fn get_or_create(
    pool: &SqlitePool,
    policy: CodeResolution,
    input: &ResolutionInput,
) -> ApiResult<ResolutionOutcome> {
    let key = input.validate()?;

    let mut tx = begin_monitored(pool, "resolution_get_or_create").await?;

    let result = get_or_create_in(tx.conn()?, policy, &key).await;

    match result {
        Ok(outcome) => {
            tx.commit().await?;
            Ok(outcome)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback after failed resolution create also failed");
            }
            Err(e)
        }
    }
}

/// Get-or-create inside a caller-owned transaction
pub async fn get_or_create_in(
    conn: &mut SqliteConnection,
    policy: CodeResolution,
    key: &ResolutionKey,
) -> ApiResult<ResolutionOutcome> {
    let type_id = resolve_code(conn, CodeKind::ResolutionType, &key.type_code, policy).await?;

    if let Some(existing) =
        resolutions::find_by_natural_key(conn, type_id, &key.number, &key.year).await?
    {
        return Ok(ResolutionOutcome {
            existing_resolution: true,
            resolution: existing,
        });
    }

    let record = ResolutionRecord {
        resolution_id: uuid_utils::generate_string(),
        resolution_type_id: type_id,
        resolution_number: key.number.clone(),
        resolution_year: key.year.clone(),
        resolution_date: key.date,
    };

    if resolutions::insert_if_absent(conn, &record).await? {
        info!(
            resolution_id = %record.resolution_id,
            number = %record.resolution_number,
            year = %record.resolution_year,
            "Created resolution"
        );
        return Ok(ResolutionOutcome {
            existing_resolution: false,
            resolution: record,
        });
    }

    // Another writer inserted the same key between lookup and insert
    let existing = resolutions::find_by_natural_key(conn, type_id, &key.number, &key.year)
        .await?
        .ok_or_else(|| {
            ApiError::Internal("resolution insert conflicted but no row matches".to_string())
        })?;

    Ok(ResolutionOutcome {
        existing_resolution: true,
        resolution: existing,
    })
}
