//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! PostgreSQL implementation of the employee record store.

use crate::error::{ApiError, ApiResult};
use ::async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolError, RecyclingMethod, Runtime};
use roster_core::{EmployeeEntity, EmployeeId, RosterResult, StorageError};
use roster_storage::{
    EmployeeRepository, EmployeeStore, EmployeeTransaction, EMAIL_UNIQUE_CONSTRAINT,
};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};

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
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "roster".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Environment variables: `ROSTER_DB_HOST`, `ROSTER_DB_PORT`,
    /// `ROSTER_DB_NAME`, `ROSTER_DB_USER`, `ROSTER_DB_PASSWORD`,
    /// `ROSTER_DB_POOL_SIZE`, `ROSTER_DB_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("ROSTER_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("ROSTER_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("ROSTER_DB_NAME").unwrap_or_else(|_| "roster".to_string()),
            user: std::env::var("ROSTER_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("ROSTER_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("ROSTER_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("ROSTER_DB_TIMEOUT")
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
        cfg.connect_timeout = Some(self.timeout);

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
// SCHEMA
// ============================================================================

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS employees (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(50)   NOT NULL,
    email           VARCHAR(255)  NOT NULL,
    age             INTEGER       NOT NULL,
    date_of_joining DATE          NOT NULL,
    is_active       BOOLEAN       NOT NULL,
    salary          NUMERIC(8, 2) NOT NULL,
    role            VARCHAR(64)   NOT NULL,
    CONSTRAINT employees_email_key UNIQUE (email)
)";

const COLUMNS: &str = "id, name, email, age, date_of_joining, is_active, salary, role";

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and serves as the
/// PostgreSQL employee store.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        let status = self.pool.status();
        status.size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> RosterResult<Object> {
        Ok(self.pool.get().await.map_err(pool_error)?)
    }

    /// Create the `employees` table and its unique email constraint if absent.
    pub async fn migrate(&self) -> RosterResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA_SQL)
            .await
            .map_err(|e| query_error(e, None))?;
        tracing::info!("Employee schema is in place");
        Ok(())
    }
}

#[async_trait]
impl EmployeeRepository for DbClient {
    async fn find_all(&self) -> RosterResult<Vec<EmployeeEntity>> {
        let conn = self.get_conn().await?;
        find_all_on(&conn).await
    }

    async fn find_by_id(&self, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>> {
        let conn = self.get_conn().await?;
        find_by_id_on(&conn, id).await
    }

    async fn exists_by_email(&self, email: &str) -> RosterResult<bool> {
        let conn = self.get_conn().await?;
        exists_by_email_on(&conn, email).await
    }

    async fn save(&self, entity: EmployeeEntity) -> RosterResult<EmployeeEntity> {
        let conn = self.get_conn().await?;
        save_on(&conn, entity).await
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RosterResult<bool> {
        let conn = self.get_conn().await?;
        delete_by_id_on(&conn, id).await
    }
}

#[async_trait]
impl EmployeeStore for DbClient {
    type Tx = PgTransaction;

    async fn begin(&self) -> RosterResult<PgTransaction> {
        let conn = self.get_conn().await?;
        conn.batch_execute("BEGIN")
            .await
            .map_err(|e| transaction_error("BEGIN", e))?;
        Ok(PgTransaction { conn: Some(conn) })
    }

    /// Health check - verifies database connectivity.
    async fn health_check(&self) -> RosterResult<()> {
        let conn = self.get_conn().await?;

        // Simple query to verify connectivity
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| query_error(e, None))?;

        Ok(())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// A PostgreSQL transaction pinned to one pooled connection.
///
/// Dropped without `commit` or `rollback`, the transaction is rolled back on
/// the current runtime. Outside a runtime the connection is detached from
/// the pool instead, which closes it.
pub struct PgTransaction {
    conn: Option<Object>,
}

impl PgTransaction {
    fn conn(&self) -> RosterResult<&Object> {
        self.conn.as_ref().ok_or_else(|| {
            StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            }
            .into()
        })
    }

    async fn finish(mut self, statement: &'static str) -> RosterResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if let Err(e) = conn.batch_execute(statement).await {
            drop(Object::take(conn));
            return Err(transaction_error(statement, e).into());
        }
        Ok(())
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.batch_execute("ROLLBACK").await {
                        tracing::warn!("Rollback of abandoned transaction failed: {}", e);
                        drop(Object::take(conn));
                    }
                });
            }
            Err(_) => {
                drop(Object::take(conn));
            }
        }
    }
}

#[async_trait]
impl EmployeeRepository for PgTransaction {
    async fn find_all(&self) -> RosterResult<Vec<EmployeeEntity>> {
        find_all_on(self.conn()?).await
    }

    async fn find_by_id(&self, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>> {
        find_by_id_on(self.conn()?, id).await
    }

    async fn exists_by_email(&self, email: &str) -> RosterResult<bool> {
        exists_by_email_on(self.conn()?, email).await
    }

    async fn save(&self, entity: EmployeeEntity) -> RosterResult<EmployeeEntity> {
        save_on(self.conn()?, entity).await
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RosterResult<bool> {
        delete_by_id_on(self.conn()?, id).await
    }
}

#[async_trait]
impl EmployeeTransaction for PgTransaction {
    async fn commit(self) -> RosterResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self) -> RosterResult<()> {
        self.finish("ROLLBACK").await
    }
}

// ============================================================================
// QUERIES
// ============================================================================

async fn find_all_on(client: &Client) -> RosterResult<Vec<EmployeeEntity>> {
    let sql = format!("SELECT {} FROM employees ORDER BY id", COLUMNS);
    let rows = client
        .query(sql.as_str(), &[])
        .await
        .map_err(|e| query_error(e, None))?;
    rows.iter().map(row_to_entity).collect()
}

async fn find_by_id_on(client: &Client, id: EmployeeId) -> RosterResult<Option<EmployeeEntity>> {
    let sql = format!("SELECT {} FROM employees WHERE id = $1", COLUMNS);
    let row = client
        .query_opt(sql.as_str(), &[&id.get()])
        .await
        .map_err(|e| query_error(e, None))?;
    row.as_ref().map(row_to_entity).transpose()
}

async fn exists_by_email_on(client: &Client, email: &str) -> RosterResult<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE email = $1)",
            &[&email],
        )
        .await
        .map_err(|e| query_error(e, None))?;
    Ok(row
        .try_get(0)
        .map_err(|e| StorageError::QueryFailed {
            reason: e.to_string(),
        })?)
}

async fn save_on(client: &Client, entity: EmployeeEntity) -> RosterResult<EmployeeEntity> {
    let row = match entity.id {
        None => {
            let sql = format!(
                "INSERT INTO employees (name, email, age, date_of_joining, is_active, salary, role) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
                COLUMNS
            );
            client
                .query_one(
                    sql.as_str(),
                    &[
                        &entity.name,
                        &entity.email,
                        &entity.age,
                        &entity.date_of_joining,
                        &entity.active,
                        &entity.salary,
                        &entity.role,
                    ],
                )
                .await
                .map_err(|e| query_error(e, Some(entity.email.as_str())))?
        }
        Some(id) => {
            let sql = format!(
                "UPDATE employees SET name = $1, email = $2, age = $3, date_of_joining = $4, \
                 is_active = $5, salary = $6, role = $7 WHERE id = $8 RETURNING {}",
                COLUMNS
            );
            client
                .query_opt(
                    sql.as_str(),
                    &[
                        &entity.name,
                        &entity.email,
                        &entity.age,
                        &entity.date_of_joining,
                        &entity.active,
                        &entity.salary,
                        &entity.role,
                        &id.get(),
                    ],
                )
                .await
                .map_err(|e| query_error(e, Some(entity.email.as_str())))?
                .ok_or(StorageError::NotFound {
                    entity: "employee",
                    id: id.get(),
                })?
        }
    };
    row_to_entity(&row)
}

async fn delete_by_id_on(client: &Client, id: EmployeeId) -> RosterResult<bool> {
    let affected = client
        .execute("DELETE FROM employees WHERE id = $1", &[&id.get()])
        .await
        .map_err(|e| query_error(e, None))?;
    Ok(affected > 0)
}

fn row_to_entity(row: &Row) -> RosterResult<EmployeeEntity> {
    let column_error = |e: tokio_postgres::Error| StorageError::QueryFailed {
        reason: e.to_string(),
    };
    Ok(EmployeeEntity {
        id: Some(EmployeeId::from_store(
            row.try_get("id").map_err(column_error)?,
        )),
        name: row.try_get("name").map_err(column_error)?,
        email: row.try_get("email").map_err(column_error)?,
        age: row.try_get("age").map_err(column_error)?,
        date_of_joining: row.try_get("date_of_joining").map_err(column_error)?,
        active: row.try_get("is_active").map_err(column_error)?,
        salary: row.try_get("salary").map_err(column_error)?,
        role: row.try_get("role").map_err(column_error)?,
    })
}

// ============================================================================
// ERROR TRANSLATION
// ============================================================================

fn query_error(err: tokio_postgres::Error, email: Option<&str>) -> StorageError {
    if let Some(db_error) = err.as_db_error() {
        if *db_error.code() == SqlState::UNIQUE_VIOLATION {
            return StorageError::UniqueViolation {
                constraint: db_error
                    .constraint()
                    .unwrap_or(EMAIL_UNIQUE_CONSTRAINT)
                    .to_string(),
                value: email.unwrap_or_default().to_string(),
            };
        }
    }
    if err.is_closed() {
        return StorageError::ConnectionFailed {
            reason: err.to_string(),
        };
    }
    StorageError::QueryFailed {
        reason: err.to_string(),
    }
}

fn transaction_error(statement: &str, err: tokio_postgres::Error) -> StorageError {
    StorageError::TransactionFailed {
        reason: format!("{} failed: {}", statement, err),
    }
}

fn pool_error(err: PoolError) -> StorageError {
    match err {
        PoolError::Timeout(_) => StorageError::PoolExhausted,
        other => StorageError::ConnectionFailed {
            reason: other.to_string(),
        },
    }
}
