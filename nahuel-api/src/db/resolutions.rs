//! Resolution reads and title link bookkeeping

use nahuel_common::db::{LinkedResolution, ResolutionRecord};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{ApiError, ApiResult};

const LINKED_RESOLUTION_SELECT: &str = r#"
    SELECT
        tr.title_id AS id_title,
        r.id AS resolution_id,
        rt.code AS resolution_type_code,
        rt.name AS resolution_type_name,
        r.number AS resolution_number,
        r.year AS resolution_year,
        r.date AS resolution_date
    FROM title_resolution tr
    JOIN resolution r ON r.id = tr.resolution_id
    LEFT JOIN resolution_type rt ON rt.id = r.resolution_type_id
    WHERE tr.enabled = 1
"#;

/// Resolutions linked (enabled) to titles, optionally for one title only
pub async fn list_linked(
    pool: &SqlitePool,
    id_title: Option<i64>,
) -> ApiResult<Vec<LinkedResolution>> {
    let rows = match id_title {
        Some(id) => {
            let sql = format!(
                "{} AND tr.title_id = ? ORDER BY r.year, r.number",
                LINKED_RESOLUTION_SELECT
            );
            sqlx::query_as::<_, LinkedResolution>(&sql)
                .bind(id)
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "{} ORDER BY tr.title_id, r.year, r.number",
                LINKED_RESOLUTION_SELECT
            );
            sqlx::query_as::<_, LinkedResolution>(&sql)
                .fetch_all(pool)
                .await
        }
    };

    rows.map_err(ApiError::query("listing resolutions"))
}

/// Find a resolution by natural key. A null type id only matches null.
pub async fn find_by_natural_key(
    conn: &mut SqliteConnection,
    resolution_type_id: Option<i64>,
    number: &str,
    year: &str,
) -> ApiResult<Option<ResolutionRecord>> {
    sqlx::query_as::<_, ResolutionRecord>(
        r#"
        SELECT id, resolution_type_id, number, year, date
        FROM resolution
        WHERE resolution_type_id IS ? AND number = ? AND year = ?
        "#,
    )
    .bind(resolution_type_id)
    .bind(number)
    .bind(year)
    .fetch_optional(&mut *conn)
    .await
    .map_err(ApiError::lookup("looking up resolution by natural key"))
}

/// Insert a resolution unless its natural key already exists.
/// Returns false when an existing row blocked the insert.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    record: &ResolutionRecord,
) -> ApiResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO resolution (id, resolution_type_id, number, year, date)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&record.resolution_id)
    .bind(record.resolution_type_id)
    .bind(&record.resolution_number)
    .bind(&record.resolution_year)
    .bind(record.resolution_date)
    .execute(&mut *conn)
    .await
    .map_err(ApiError::mutation("inserting resolution"))?;

    Ok(result.rows_affected() > 0)
}

/// Whether an enabled link between the title and resolution exists
pub async fn enabled_link_exists(
    conn: &mut SqliteConnection,
    id_title: i64,
    resolution_id: &str,
) -> ApiResult<bool> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM title_resolution
            WHERE title_id = ? AND resolution_id = ? AND enabled = 1
        )
        "#,
    )
    .bind(id_title)
    .bind(resolution_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(ApiError::lookup("checking title resolution link"))
}

/// Create an enabled link with the given identifier
pub async fn insert_link(
    conn: &mut SqliteConnection,
    link_id: &str,
    id_title: i64,
    resolution_id: &str,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO title_resolution (id, title_id, resolution_id, enabled)
        VALUES (?, ?, ?, 1)
        "#,
    )
    .bind(link_id)
    .bind(id_title)
    .bind(resolution_id)
    .execute(&mut *conn)
    .await
    .map_err(ApiError::mutation("creating title resolution link"))?;

    Ok(())
}
