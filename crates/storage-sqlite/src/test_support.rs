//! Shared database setup for this crate's tests.

use std::sync::Arc;

use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use tempfile::TempDir;

use crate::db::{create_pool, init, run_migrations, write_actor::spawn_writer, WriteHandle};

/// A migrated database in a fresh temp dir. Keep the `TempDir` alive for
/// the duration of the test.
pub fn setup_db() -> (
    Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    WriteHandle,
    TempDir,
) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = init(&dir.path().to_string_lossy()).expect("init db");
    run_migrations(&db_path).expect("migrate db");
    let pool = create_pool(&db_path).expect("create pool");
    let writer = spawn_writer(pool.as_ref().clone());
    (pool, writer, dir)
}
