//! Single-writer actor.
//!
//! SQLite allows one writer at a time. All writes are funnelled through one
//! dedicated thread, each job in its own IMMEDIATE transaction, so
//! read-modify-write sequences (badge counter, cache overwrite) are atomic.

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::{error, warn};
use tokio::sync::{mpsc, oneshot};

use super::{get_connection, DbPool};
use crate::errors::StorageError;

const QUEUE_DEPTH: usize = 256;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Cloneable handle to the writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Job>,
}

impl WriteHandle {
    /// Run `job` on the writer connection inside a transaction. An `Err`
    /// rolls the transaction back.
    pub async fn exec<F, T>(&self, job: F) -> sitecache_core::Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> sitecache_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let wrapped: Job = Box::new(move |conn: &mut SqliteConnection| {
            let result = conn
                .immediate_transaction::<T, StorageError, _>(|tx| job(tx).map_err(StorageError::from));
            if reply_tx.send(result).is_err() {
                warn!("[Storage] Write finished after its caller went away");
            }
        });

        self.tx
            .send(wrapped)
            .await
            .map_err(|_| StorageError::WriterClosed)?;
        let result = reply_rx.await.map_err(|_| StorageError::WriterClosed)?;
        Ok(result?)
    }
}

/// Start the writer thread. It runs until every handle is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("sitecache-db-writer".to_string())
        .spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                match get_connection(&pool) {
                    Ok(mut conn) => job(&mut *conn),
                    // Dropping the job drops its reply sender; the caller sees WriterClosed.
                    Err(err) => error!("[Storage] Writer could not get a connection: {}", err),
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|err| error!("[Storage] Could not start writer thread: {}", err));

    WriteHandle { tx }
}
