use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Work that outlives the request which started it.
///
/// Tasks run on the runtime captured at construction rather than on the HTTP worker that spawned
/// them, so a worker shutting down does not cancel them. [`BackgroundTasks::wait_idle`] keeps the
/// process alive until every task has finished.
#[derive(Clone)]
pub struct BackgroundTasks {
    runtime: Handle,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new(runtime: Handle) -> BackgroundTasks {
        BackgroundTasks {
            runtime,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Tracks tasks on the runtime this is called from. Panics outside of a tokio runtime.
    pub fn current() -> BackgroundTasks {
        Self::new(Handle::current())
    }

    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.runtime.spawn(task);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }

    /// Waits for every tracked task, including the ones spawned while waiting.
    pub async fn wait_idle(&self) {
        loop {
            let handles = {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *pending)
            };

            if handles.is_empty() {
                return;
            }

            for handle in handles {
                if let Err(err) = handle.await {
                    tracing::error!("Background task did not complete: {:?}", err);
                }
            }
        }
    }
}
