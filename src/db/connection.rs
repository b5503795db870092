use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteTransactionBehavior};
use sqlx::{ConnectOptions, Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;

/// Connections default their `BEGIN` to `IMMEDIATE` rather than SQLite's
/// own default of `DEFERRED`. A `DEFERRED` transaction only acquires its
/// write lock on the first write statement, so two transactions can both
/// open, both read, and then both discover at write time that the other
/// got there first — exactly the lost-update window the Review & Scoring
/// Engine's row-locking requirement exists to close. `IMMEDIATE` takes the
/// write lock at `BEGIN`, which is SQLite's nearest equivalent to a
/// `SELECT ... FOR UPDATE` row lock.
fn connect_options(url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(url)?
        .transaction_behavior(SqliteTransactionBehavior::Immediate)
        .disable_statement_logging())
}

/// Opens (creating if necessary) a SQLite pool at `db_path`.
pub async fn establish_pool(db_path: PathBuf) -> Result<Pool<Sqlite>, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let options = connect_options(&format!("sqlite:{}?mode=rwc", db_path.display()))?;
    SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
}

/// In-memory pool for tests and short-lived tooling. Pinned to a single
/// connection: `sqlite::memory:` hands out an independent empty database
/// per connection, so a pool of more than one would silently fragment
/// state across callers.
pub async fn establish_memory_pool() -> Result<Pool<Sqlite>, sqlx::Error> {
    let options = connect_options("sqlite::memory:")?;
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}
