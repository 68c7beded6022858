//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2, with connection customization
//! and migrations run on initialization.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use dvrflow_common::{Error, Result};
use std::path::Path;
use std::time::Duration;

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Initialize a new database pool with the given file path.
///
/// This function will:
/// - Create the SQLite database file if it doesn't exist
/// - Switch the journal to WAL so readers never see a half-written row
/// - Set a busy timeout so racing publishers wait instead of failing
/// - Run pending database migrations
///
/// # Example
///
/// ```no_run
/// use dvrflow_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/dvrflow/ledger.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: impl AsRef<Path>) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path.as_ref()).with_init(|conn| {
        // Before the journal switch, which needs the lock too.
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
    });

    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

/// Initialize an in-memory database pool for testing.
///
/// Every SQLite `:memory:` connection is its own database, so the pool holds
/// exactly one connection. The data is lost when the pool is dropped.
///
/// # Example
///
/// ```
/// use dvrflow_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

fn migrate(pool: &DbPool) -> Result<()> {
    let conn = get_conn(pool)?;
    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;
    Ok(())
}

/// Get a connection from the pool.
///
/// Converts the r2d2 error into the common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}
