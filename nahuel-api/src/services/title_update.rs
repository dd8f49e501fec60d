//! Title update coordinator
//!
//! Applies a title edit as one unit of work:
//!
//! ```text
//! Validating -> TransactionOpen -> ResolveCodes -> SyncResolutionLinks
//!     -> ApplyUpdate -> Committing -> Done
//! ```
//!
//! Validation happens before any connection is borrowed. Every step after
//! that runs in one transaction; the first failing step rolls it back and
//! its error is returned unchanged. On success the denormalized title is
//! read again outside the transaction.

use std::collections::HashSet;
use std::fmt;

use nahuel_common::db::TitleRecord;
use nahuel_common::uuid_utils;
use nahuel_common::CodeResolution;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::db::lookup::{resolve_code, CodeKind};
use crate::db::{begin_monitored, resolutions, titles};
use crate::error::{ApiError, ApiResult};
use crate::lenient::{self, present};
use crate::services::resolution::{get_or_create_in, ResolutionInput, ResolutionKey};

/// Title edit as received from clients
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleUpdatePayload {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_female_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title_mode: Option<String>,
    #[serde(default)]
    pub resolutions: Option<Vec<ResolutionRef>>,
}

/// A resolution to link, by id or by natural key
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResolutionRef {
    Id(String),
    Key(ResolutionInput),
}

/// Validated edit
#[derive(Debug, Clone)]
struct TitleUpdate {
    id_title: i64,
    code: String,
    name: String,
    female_name: String,
    comment: Option<String>,
    state: String,
    title_type: String,
    title_mode: String,
    links: Vec<LinkTarget>,
}

#[derive(Debug, Clone)]
enum LinkTarget {
    Id(String),
    Key(ResolutionKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateStage {
    ResolveCodes,
    SyncResolutionLinks,
    ApplyUpdate,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolveCodes => "resolve_codes",
            Self::SyncResolutionLinks => "sync_resolution_links",
            Self::ApplyUpdate => "apply_update",
        };
        f.write_str(name)
    }
}

/// Identifiers the title's codes resolved to
struct ResolvedCodes {
    state_id: Option<i64>,
    type_id: Option<i64>,
    mode_id: Option<i64>,
}

impl TitleUpdatePayload {
    fn validate(&self) -> ApiResult<TitleUpdate> {
        let fields = [
            ("idTitle", present(&self.id_title)),
            ("titleCode", present(&self.title_code)),
            ("titleName", present(&self.title_name)),
            ("titleFemaleName", present(&self.title_female_name)),
            ("state", present(&self.state)),
            ("titleType", present(&self.title_type)),
            ("titleMode", present(&self.title_mode)),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::Input(format!(
                "Missing mandatory title fields: {}",
                missing.join(", ")
            )));
        }

        let [id, code, name, female_name, state, title_type, title_mode] =
            fields.map(|(_, value)| value.unwrap_or_default().to_string());

        let id_title: i64 = id
            .parse()
            .map_err(|_| ApiError::Input(format!("idTitle must be an integer, got '{}'", id)))?;

        let links = self
            .resolutions
            .iter()
            .flatten()
            .map(|entry| match entry {
                ResolutionRef::Id(id) => {
                    let id = id.trim();
                    if id.is_empty() {
                        Err(ApiError::Input("Empty resolution id".to_string()))
                    } else {
                        Ok(LinkTarget::Id(id.to_string()))
                    }
                }
                ResolutionRef::Key(input) => input.validate().map(LinkTarget::Key),
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(TitleUpdate {
            id_title,
            code,
            name,
            female_name,
            comment: present(&self.comment).map(str::to_string),
            state,
            title_type,
            title_mode,
            links,
        })
    }
}

/// Apply a title edit and return the title as stored afterwards
pub async fn update_title(
    pool: &SqlitePool,
    policy: CodeResolution,
    payload: &TitleUpdatePayload,
) -> ApiResult<TitleRecord> {
    let update = payload.validate()?;

    let mut tx = begin_monitored(pool, "title_update").await?;

    let result = apply(tx.conn()?, policy, &update).await;

    match result {
        Ok(()) => {
            tx.commit().await?;
        }
        Err(e) => {
            warn!(id_title = update.id_title, error = %e, "Title update failed; rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback after failed title update also failed");
            }
            return Err(e);
        }
    }

    info!(id_title = update.id_title, "Title updated");

    titles::fetch_title(pool, update.id_title)
        .await?
        .ok_or_else(|| title_not_found(update.id_title))
}

/// Steps that run inside the transaction
async fn apply(
    conn: &mut SqliteConnection,
    policy: CodeResolution,
    update: &TitleUpdate,
) -> ApiResult<()> {
    if !title_exists(conn, update.id_title).await? {
        return Err(title_not_found(update.id_title));
    }

    debug!(id_title = update.id_title, stage = %UpdateStage::ResolveCodes, "Title update stage");
    let codes = ResolvedCodes {
        state_id: resolve_code(conn, CodeKind::TitleState, &update.state, policy).await?,
        type_id: resolve_code(conn, CodeKind::TitleType, &update.title_type, policy).await?,
        mode_id: resolve_code(conn, CodeKind::TitleMode, &update.title_mode, policy).await?,
    };

    debug!(id_title = update.id_title, stage = %UpdateStage::SyncResolutionLinks, "Title update stage");
    sync_links(conn, policy, update).await?;

    debug!(id_title = update.id_title, stage = %UpdateStage::ApplyUpdate, "Title update stage");
    apply_update(conn, update, &codes).await
}

fn title_not_found(id_title: i64) -> ApiError {
    ApiError::NotFound(format!("Title {} not found", id_title))
}

async fn title_exists(conn: &mut SqliteConnection, id_title: i64) -> ApiResult<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM title WHERE id = ?)")
        .bind(id_title)
        .fetch_one(&mut *conn)
        .await
        .map_err(ApiError::lookup("checking title exists"))
}

/// Ensure an enabled link exists for every requested resolution
async fn sync_links(
    conn: &mut SqliteConnection,
    policy: CodeResolution,
    update: &TitleUpdate,
) -> ApiResult<()> {
    let mut seen: HashSet<String> = HashSet::new();

    for target in &update.links {
        let resolution_id = match target {
            LinkTarget::Id(id) => id.clone(),
            LinkTarget::Key(key) => {
                get_or_create_in(conn, policy, key)
                    .await?
                    .resolution
                    .resolution_id
            }
        };

        if !seen.insert(resolution_id.clone()) {
            continue;
        }

        if resolutions::enabled_link_exists(conn, update.id_title, &resolution_id).await? {
            debug!(id_title = update.id_title, resolution_id = %resolution_id, "Link already enabled");
            continue;
        }

        let link_id = uuid_utils::generate_string();
        resolutions::insert_link(conn, &link_id, update.id_title, &resolution_id).await?;
        info!(
            id_title = update.id_title,
            resolution_id = %resolution_id,
            link_id = %link_id,
            "Linked resolution to title"
        );
    }

    Ok(())
}

async fn apply_update(
    conn: &mut SqliteConnection,
    update: &TitleUpdate,
    codes: &ResolvedCodes,
) -> ApiResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE title SET
            code = ?,
            name = ?,
            female_name = ?,
            comment = COALESCE(?, comment),
            title_state_id = ?,
            title_type_id = ?,
            title_mode_id = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&update.code)
    .bind(&update.name)
    .bind(&update.female_name)
    .bind(update.comment.as_deref())
    .bind(codes.state_id)
    .bind(codes.type_id)
    .bind(codes.mode_id)
    .bind(update.id_title)
    .execute(&mut *conn)
    .await
    .map_err(ApiError::mutation("updating title"))?;

    if result.rows_affected() == 0 {
        return Err(title_not_found(update.id_title));
    }

    Ok(())
}
