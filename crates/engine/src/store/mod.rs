mod records;
mod reports;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use records::{build_count_query, build_record_query, RecordFilter, RecordPage, RecordQuery, SortOrder};
pub use reports::{PeriodTotals, Periodicity, ProfitAndLoss, ReportTotals};

/// Read-only client for the ERP's PostgreSQL database.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ErpStore {
    pool: PgPool,
}

impl ErpStore {
    /// Connect to PostgreSQL and return a client with a connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        tracing::info!("Connecting to ERP database");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.health_check().await?;
        tracing::info!("ERP database connection established");

        Ok(store)
    }

    /// Build a pool without touching the network. Connections are opened on first use.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Verify the connection is alive.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("PostgreSQL connection error: {0}")]
    Connection(String),

    #[error("PostgreSQL query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for erpchat_common::ErpChatError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => erpchat_common::ErpChatError::NotFound(what),
            other => erpchat_common::ErpChatError::Postgres(other.to_string()),
        }
    }
}

/// Quoted table name for a doctype, e.g. `"tabSales Invoice"`.
pub(crate) fn table_name(doctype: &str) -> String {
    format!("\"tab{}\"", doctype.replace('"', "\"\""))
}

/// Quoted column reference on the `t` alias.
pub(crate) fn column_ref(column: &str) -> String {
    format!("t.\"{}\"", column.replace('"', "\"\""))
}
