//! Database initialization
//!
//! Opens (or creates) the catalog database and makes sure every table,
//! index and view the services read from exists. All statements are
//! `IF NOT EXISTS`, so initialization is safe to run on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection pool and create schema if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Per-connection options: pragma statements issued through the pool
    // would only reach whichever connection ran them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema.
///
/// The pool is capped at one connection because every SQLite in-memory
/// connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all catalog tables, indexes and views (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Lookup catalogs
    for table in [
        "edu_institution",
        "career_type",
        "title_type",
        "title_mode",
        "title_state",
        "resolution_type",
    ] {
        create_code_table(pool, table).await?;
    }

    create_academic_unit_table(pool).await?;
    create_career_table(pool).await?;
    create_title_table(pool).await?;
    create_resolution_table(pool).await?;
    create_title_resolution_table(pool).await?;

    create_career_title_view(pool).await?;
    create_career_title_resolution_view(pool).await?;

    Ok(())
}

/// Catalog tables share the (id, code, name) shape
async fn create_code_table(pool: &SqlitePool, table: &str) -> Result<()> {
    // Table names come from the fixed list in create_schema
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
        table
    );
    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

async fn create_academic_unit_table(pool: &SqlitePool) -> Result<()> {
    // academic_unit_parent_id carries no foreign key: dangling parents are
    // legal and make the unit a hierarchy root
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS academic_unit (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            edu_institution_id INTEGER REFERENCES edu_institution(id),
            academic_unit_parent_id INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_career_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS career (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            academic_unit_id INTEGER REFERENCES academic_unit(id),
            career_type_id INTEGER REFERENCES career_type(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_career_academic_unit ON career(academic_unit_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_title_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS title (
            id INTEGER PRIMARY KEY,
            career_id INTEGER REFERENCES career(id),
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            female_name TEXT,
            comment TEXT,
            title_state_id INTEGER REFERENCES title_state(id),
            title_type_id INTEGER REFERENCES title_type(id),
            title_mode_id INTEGER REFERENCES title_mode(id),
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_resolution_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resolution (
            id TEXT PRIMARY KEY,
            resolution_type_id INTEGER REFERENCES resolution_type(id),
            number TEXT NOT NULL,
            year TEXT NOT NULL,
            date TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Natural key. IFNULL folds unresolved types together so that two
    // permissive creates with an unknown type still collide.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_resolution_natural_key
            ON resolution(IFNULL(resolution_type_id, -1), number, year)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_title_resolution_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS title_resolution (
            id TEXT PRIMARY KEY,
            title_id INTEGER NOT NULL REFERENCES title(id),
            resolution_id TEXT NOT NULL REFERENCES resolution(id),
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one enabled link per (title, resolution)
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_title_resolution_enabled
            ON title_resolution(title_id, resolution_id)
            WHERE enabled = 1
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Flat, denormalized title view
async fn create_career_title_view(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE VIEW IF NOT EXISTS v_career_title AS
        SELECT
            t.id AS id_title,
            i.name AS edu_institution_name,
            au.name AS academic_unit_name,
            ct.name AS career_type_name,
            c.code AS career_code,
            c.name AS career_name,
            t.code AS title_code,
            t.name AS title,
            t.female_name AS title_female_name,
            t.comment AS title_comment,
            tt.name AS title_type_name,
            tm.name AS title_mode_name,
            ts.code AS title_state_code
        FROM title t
        LEFT JOIN career c ON c.id = t.career_id
        LEFT JOIN academic_unit au ON au.id = c.academic_unit_id
        LEFT JOIN edu_institution i ON i.id = au.edu_institution_id
        LEFT JOIN career_type ct ON ct.id = c.career_type_id
        LEFT JOIN title_type tt ON tt.id = t.title_type_id
        LEFT JOIN title_mode tm ON tm.id = t.title_mode_id
        LEFT JOIN title_state ts ON ts.id = t.title_state_id
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Title view joined through enabled links to resolutions and their types.
/// One row per (title, linked resolution).
async fn create_career_title_resolution_view(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE VIEW IF NOT EXISTS v_career_title_resolution AS
        SELECT
            v.*,
            rt.name AS resolution_type_name,
            r.number AS resolution_number,
            r.year AS resolution_year
        FROM v_career_title v
        JOIN title_resolution tr ON tr.title_id = v.id_title AND tr.enabled = 1
        JOIN resolution r ON r.id = tr.resolution_id
        LEFT JOIN resolution_type rt ON rt.id = r.resolution_type_id
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
