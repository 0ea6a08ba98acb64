//! Fire-and-forget work that outlives the request that started it.

use std::future::Future;

use log::debug;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Tracks background tasks (cache revalidation) so they can be awaited on
/// shutdown and in tests. Tasks are never cancelled by the caller going away.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Wait for every task spawned so far.
    pub async fn wait_idle(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                debug!("[SW] Background task ended abnormally: {}", err);
            }
        }
    }
}
