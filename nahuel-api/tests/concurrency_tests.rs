//! Concurrent write workflows against a file-backed database
//!
//! Every task runs on its own pooled connection, so writers really contend
//! for the SQLite write lock.

use nahuel_api::services::{get_or_create, update_title, ResolutionInput, TitleUpdatePayload};
use nahuel_common::db::init_database;
use nahuel_common::CodeResolution;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

const WRITERS: i64 = 8;

/// Test helper: file database with one career and `WRITERS` titles
async fn setup_file_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("catalog.db"))
        .await
        .expect("Should create database");

    for sql in [
        "INSERT INTO edu_institution (id, code, name) VALUES (1, 'UNA', 'Universidad Nacional')",
        "INSERT INTO academic_unit (id, code, name, edu_institution_id) VALUES (1, 'ENG', 'Eng', 1)",
        "INSERT INTO career_type (id, code, name) VALUES (1, 'UG', 'Undergraduate')",
        "INSERT INTO career (id, code, name, academic_unit_id, career_type_id)
            VALUES (1, 'SYS', 'Systems', 1, 1)",
        "INSERT INTO title_state (id, code, name) VALUES (1, 'V', 'Vigente'), (2, 'B', 'Baja')",
        "INSERT INTO title_type (id, code, name) VALUES (1, 'GRD', 'Grado')",
        "INSERT INTO title_mode (id, code, name) VALUES (1, 'P', 'Presencial')",
        "INSERT INTO resolution_type (id, code, name) VALUES (1, 'DEC', 'Decreto')",
    ] {
        sqlx::query(sql).execute(&pool).await.expect("Should seed");
    }

    for id in 1..=WRITERS {
        sqlx::query(
            "INSERT INTO title (id, career_id, code, name, female_name, title_state_id, title_type_id, title_mode_id)
                VALUES (?, 1, ?, 'Engineer', 'Engineer', 1, 1, 1)",
        )
        .bind(id)
        .bind(format!("T{}", id))
        .execute(&pool)
        .await
        .expect("Should seed title");
    }

    (dir, pool)
}

fn resolution_input() -> ResolutionInput {
    serde_json::from_value(json!({
        "resolutionTypeCode": "DEC",
        "resolutionNumber": "77",
        "resolutionYear": 2021,
        "resolutionMonth": 3,
        "resolutionDay": 15
    }))
    .unwrap()
}

async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_resolution_creates_resolve_to_one_row() {
    let (_dir, pool) = setup_file_db().await;

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                get_or_create(&pool, CodeResolution::Permissive, &resolution_input()).await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        let outcome = handle
            .await
            .unwrap()
            .unwrap_or_else(|e| panic!("concurrent create failed: {:?}", e));
        outcomes.push(outcome);
    }

    let created = outcomes.iter().filter(|o| !o.existing_resolution).count();
    assert_eq!(created, 1, "exactly one writer inserts");

    let first_id = &outcomes[0].resolution.resolution_id;
    assert!(outcomes
        .iter()
        .all(|o| &o.resolution.resolution_id == first_id));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM resolution").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_updates_on_different_titles_all_succeed() {
    let (_dir, pool) = setup_file_db().await;

    let handles: Vec<_> = (1..=WRITERS)
        .map(|id| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let payload: TitleUpdatePayload = serde_json::from_value(json!({
                    "idTitle": id,
                    "titleCode": format!("T{}-B", id),
                    "titleName": format!("Engineer {}", id),
                    "titleFemaleName": format!("Engineer {}", id),
                    "comment": "bulk edit",
                    "state": "B",
                    "titleType": "GRD",
                    "titleMode": "P",
                    "resolutions": [{
                        "resolutionTypeCode": "DEC",
                        "resolutionNumber": "77",
                        "resolutionYear": 2021
                    }]
                }))
                .unwrap();
                update_title(&pool, CodeResolution::Permissive, &payload).await
            })
        })
        .collect();

    for (id, handle) in (1..=WRITERS).zip(handles) {
        let title = handle
            .await
            .unwrap()
            .unwrap_or_else(|e| panic!("update of title {} failed: {:?}", id, e));
        assert_eq!(title.id_title, id);
        assert_eq!(title.title_code, format!("T{}-B", id));
        assert_eq!(title.state.as_deref(), Some("B"));
    }

    // The shared resolution was created once and linked to every title
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM resolution").await, 1);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM title_resolution WHERE enabled = 1").await,
        WRITERS
    );
}
