//! Title reads over the denormalized views

use nahuel_common::db::TitleRecord;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::filters::{TitleQuery, TITLE_COLUMNS};

/// Run a compiled title query, binding its parameters in order, then keep
/// the rows that satisfy its contains-match clauses
pub async fn fetch_titles(pool: &SqlitePool, query: &TitleQuery) -> ApiResult<Vec<TitleRecord>> {
    debug!(
        sql = %query.sql,
        params = query.params.len(),
        text_matches = query.text_matches.len(),
        view = query.view.name(),
        "Running title query"
    );

    let mut statement = sqlx::query_as::<_, TitleRecord>(&query.sql);
    for param in &query.params {
        statement = statement.bind(param.as_str());
    }

    let mut records = statement
        .fetch_all(pool)
        .await
        .map_err(ApiError::query("listing titles"))?;

    if !query.text_matches.is_empty() {
        let fetched = records.len();
        records.retain(|record| query.matches(record));
        debug!(fetched, kept = records.len(), "Applied contains-match clauses");
    }

    Ok(records)
}

/// Canonical denormalized record of one title
pub async fn fetch_title(pool: &SqlitePool, id_title: i64) -> ApiResult<Option<TitleRecord>> {
    let sql = format!("SELECT {} FROM v_career_title WHERE id_title = ?", TITLE_COLUMNS);

    sqlx::query_as::<_, TitleRecord>(&sql)
        .bind(id_title)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::query("fetching title"))
}
