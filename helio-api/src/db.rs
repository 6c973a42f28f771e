//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`PgProjectStore`] adapter that implements [`ProjectStore`] over the
//! upstream `projects` and `calculations` tables.
//!
//! Every method acquires its own pooled connection. The `Object` guard returns
//! the connection to the pool when it drops, on every exit path.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use helio_core::{
    CalculationId, CalculationRecord, ErasureReport, ProjectId, ProjectRecord, ProjectStatus,
    ReportError, ReportResult, StoredJson, Timestamp,
};
use helio_storage::ProjectStore;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long a request waits for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "helio".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HELIO_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("HELIO_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("HELIO_DB_NAME").unwrap_or_else(|_| "helio".to_string()),
            user: std::env::var("HELIO_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("HELIO_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("HELIO_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("HELIO_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SQL
// ============================================================================

const SELECT_PROJECT: &str = "\
    SELECT id, project_name, status, \
           location_lat::float8, location_lon::float8, cost_usd::float8, \
           to_jsonb(metadata), created_at \
    FROM projects WHERE id = $1";

const SELECT_LATEST_CALCULATION: &str = "\
    SELECT id, project_id, annual_kwh::float8, shading_loss_pct::float8, \
           to_jsonb(financial_data), created_at \
    FROM calculations WHERE project_id = $1 \
    ORDER BY created_at DESC NULLS LAST LIMIT 1";

const PROJECT_EXISTS: &str = "SELECT 1 FROM projects WHERE id = $1 FOR UPDATE";
const DELETE_CALCULATIONS: &str = "DELETE FROM calculations WHERE project_id = $1";
const DELETE_PROJECT: &str = "DELETE FROM projects WHERE id = $1";

// ============================================================================
// POSTGRES PROJECT STORE
// ============================================================================

/// [`ProjectStore`] backed by the upstream PostgreSQL database.
#[derive(Clone)]
pub struct PgProjectStore {
    pool: Pool,
}

impl PgProjectStore {
    /// Create a new store with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    async fn fetch_project(&self, id: ProjectId) -> ApiResult<Option<ProjectRecord>> {
        let conn = self.get_conn().await?;
        let row = conn.query_opt(SELECT_PROJECT, &[&id.as_uuid()]).await?;
        row.map(|row| project_from_row(&row)).transpose()
    }

    async fn fetch_latest_calculation(
        &self,
        project_id: ProjectId,
    ) -> ApiResult<Option<CalculationRecord>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(SELECT_LATEST_CALCULATION, &[&project_id.as_uuid()])
            .await?;
        row.map(|row| calculation_from_row(&row)).transpose()
    }

    /// Delete calculations, then the project, in one transaction.
    ///
    /// Returns `None` when the project does not exist; nothing is deleted then.
    async fn delete_project_rows(&self, id: ProjectId) -> ApiResult<Option<ErasureReport>> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await?;
        let uuid = id.as_uuid();

        if tx.query_opt(PROJECT_EXISTS, &[&uuid]).await?.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let calculations_deleted = tx.execute(DELETE_CALCULATIONS, &[&uuid]).await?;
        tx.execute(DELETE_PROJECT, &[&uuid]).await?;
        tx.commit().await?;

        tracing::info!(
            project_id = %id,
            calculations_deleted,
            "Project rows deleted"
        );

        Ok(Some(ErasureReport {
            project_id: id,
            calculations_deleted,
        }))
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn project_get(&self, id: ProjectId) -> ReportResult<Option<ProjectRecord>> {
        Ok(self.fetch_project(id).await?)
    }

    async fn calculation_latest(
        &self,
        project_id: ProjectId,
    ) -> ReportResult<Option<CalculationRecord>> {
        Ok(self.fetch_latest_calculation(project_id).await?)
    }

    async fn erase_project(&self, id: ProjectId) -> ReportResult<ErasureReport> {
        self.delete_project_rows(id)
            .await?
            .ok_or_else(|| ReportError::project_not_found(id.as_uuid()))
    }

    async fn ping(&self) -> ReportResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(ApiError::from)?;
        Ok(())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn project_from_row(row: &Row) -> ApiResult<ProjectRecord> {
    let id: Uuid = row.try_get(0)?;
    let status: String = row.try_get(2)?;
    let metadata: Option<JsonValue> = row.try_get(6)?;

    Ok(ProjectRecord {
        id: ProjectId::new(id),
        name: row.try_get(1)?,
        status: ProjectStatus::from(status),
        location_lat: row.try_get(3)?,
        location_lon: row.try_get(4)?,
        cost_usd: row.try_get(5)?,
        metadata: StoredJson::from_column(metadata),
        created_at: row.try_get::<_, Option<Timestamp>>(7)?,
    })
}

fn calculation_from_row(row: &Row) -> ApiResult<CalculationRecord> {
    let id: Uuid = row.try_get(0)?;
    let project_id: Uuid = row.try_get(1)?;
    let financial_data: Option<JsonValue> = row.try_get(4)?;

    Ok(CalculationRecord {
        id: CalculationId::new(id),
        project_id: ProjectId::new(project_id),
        annual_kwh: row.try_get(2)?,
        shading_loss_pct: row.try_get(3)?,
        financial_data: StoredJson::from_column(financial_data),
        created_at: row.try_get::<_, Option<Timestamp>>(5)?,
    })
}
