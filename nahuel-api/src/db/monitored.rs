//! Monitored transactions
//!
//! Wraps a sqlx transaction to log how long the connection was held and
//! how it was released. A transaction that is dropped without commit or
//! rollback (for instance because the client disconnected and the request
//! future was dropped) is rolled back by sqlx; the drop is logged here.
//!
//! Every workflow reads before it writes. Transactions therefore start
//! with `BEGIN IMMEDIATE`: the write lock is taken up front, and a second
//! writer waits on the busy timeout instead of failing on lock upgrade.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};

/// Transactions held longer than this are logged as warnings
const LONG_TRANSACTION_MS: u128 = 2000;

pub struct MonitoredTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
    caller: &'static str,
    acquired_at: Instant,
}

const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Begin a write transaction on a pooled connection
pub async fn begin_monitored(
    pool: &SqlitePool,
    caller: &'static str,
) -> ApiResult<MonitoredTransaction> {
    debug!(caller, "Connection acquisition requested");
    let requested_at = Instant::now();

    let tx = pool
        .begin_with(BEGIN_WRITE)
        .await
        .map_err(ApiError::connection(caller))?;

    debug!(
        caller,
        wait_ms = requested_at.elapsed().as_millis() as u64,
        "Transaction opened"
    );

    Ok(MonitoredTransaction {
        tx: Some(tx),
        caller,
        acquired_at: Instant::now(),
    })
}

impl MonitoredTransaction {
    /// Connection to run statements on inside the transaction
    pub fn conn(&mut self) -> ApiResult<&mut SqliteConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(ApiError::Internal(format!(
                "transaction for {} already released",
                self.caller
            ))),
        }
    }

    /// Commit and log release timing
    pub async fn commit(mut self) -> ApiResult<()> {
        let tx = self.take()?;
        tx.commit().await.map_err(|e| {
            warn!(caller = self.caller, error = %e, "Commit failed");
            ApiError::Commit(e)
        })?;
        self.log_release("commit");
        Ok(())
    }

    /// Roll back and log release timing
    pub async fn rollback(mut self) -> ApiResult<()> {
        let tx = self.take()?;
        tx.rollback()
            .await
            .map_err(ApiError::mutation("rolling back transaction"))?;
        self.log_release("rollback");
        Ok(())
    }

    fn take(&mut self) -> ApiResult<Transaction<'static, Sqlite>> {
        self.tx.take().ok_or_else(|| {
            ApiError::Internal(format!("transaction for {} already released", self.caller))
        })
    }

    fn log_release(&self, how: &'static str) {
        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > LONG_TRANSACTION_MS {
            warn!(
                caller = self.caller,
                held_ms = held_ms as u64,
                how,
                "LONG TRANSACTION - connection held for extended period"
            );
        } else {
            debug!(caller = self.caller, held_ms = held_ms as u64, how, "Connection released");
        }
    }
}

impl Drop for MonitoredTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            info!(
                caller = self.caller,
                held_ms = self.acquired_at.elapsed().as_millis() as u64,
                "Transaction dropped before completion; rolled back"
            );
        }
    }
}
