//! Code to identifier resolution for catalog tables

use nahuel_common::CodeResolution;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Catalog a human-readable code is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    TitleState,
    TitleType,
    TitleMode,
    ResolutionType,
}

impl CodeKind {
    fn table(self) -> &'static str {
        match self {
            Self::TitleState => "title_state",
            Self::TitleType => "title_type",
            Self::TitleMode => "title_mode",
            Self::ResolutionType => "resolution_type",
        }
    }

    /// Human-readable name used in messages
    pub fn label(self) -> &'static str {
        match self {
            Self::TitleState => "title state",
            Self::TitleType => "title type",
            Self::TitleMode => "title mode",
            Self::ResolutionType => "resolution type",
        }
    }

    fn lookup_context(self) -> &'static str {
        match self {
            Self::TitleState => "resolving title state code",
            Self::TitleType => "resolving title type code",
            Self::TitleMode => "resolving title mode code",
            Self::ResolutionType => "resolving resolution type code",
        }
    }
}

/// Resolve a code to its row id.
///
/// A miss is `Ok(None)` under [`CodeResolution::Permissive`] and
/// [`ApiError::UnknownCode`] under [`CodeResolution::Strict`]. A failing
/// statement is always [`ApiError::Lookup`].
pub async fn resolve_code(
    conn: &mut SqliteConnection,
    kind: CodeKind,
    code: &str,
    policy: CodeResolution,
) -> ApiResult<Option<i64>> {
    let sql = format!("SELECT id FROM {} WHERE code = ?", kind.table());

    let id: Option<i64> = sqlx::query_scalar(&sql)
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
        .map_err(ApiError::lookup(kind.lookup_context()))?;

    match (id, policy) {
        (Some(id), _) => {
            debug!(kind = kind.label(), code, id, "Code resolved");
            Ok(Some(id))
        }
        (None, CodeResolution::Permissive) => {
            warn!(kind = kind.label(), code, "Unknown code resolved to null");
            Ok(None)
        }
        (None, CodeResolution::Strict) => Err(ApiError::UnknownCode {
            kind: kind.label(),
            code: code.to_string(),
        }),
    }
}
