//! Per-user FIFO queues, each drained by one worker task.
//!
//! A worker that stays idle past the timeout removes its own map entry and
//! exits; the next item for that user starts a fresh worker.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error};

pub type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct UserQueues<T> {
    queues: Mutex<HashMap<u64, mpsc::UnboundedSender<T>>>,
    idle: Duration,
    run: Box<dyn Fn(T) -> Job + Send + Sync>,
}

impl<T: Send + 'static> UserQueues<T> {
    pub fn new(idle: Duration, run: impl Fn(T) -> Job + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { queues: Mutex::new(HashMap::new()), idle, run: Box::new(run) })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<T>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `item` behind everything already queued for `user`.
    pub fn push(self: &Arc<Self>, user: u64, item: T) {
        let mut queues = self.lock();
        let tx = queues.entry(user).or_insert_with(|| self.spawn_worker(user));
        if let Err(mpsc::error::SendError(item)) = tx.send(item) {
            let fresh = self.spawn_worker(user);
            if fresh.send(item).is_err() {
                error!(user, "Failed to queue update");
            }
            queues.insert(user, fresh);
        }
    }

    /// Users with a live worker.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_worker(self: &Arc<Self>, user: u64) -> mpsc::UnboundedSender<T> {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let queues = Arc::clone(self);
        tokio::spawn(async move {
            debug!(user, "Worker started");
            loop {
                match tokio::time::timeout(queues.idle, rx.recv()).await {
                    Ok(Some(item)) => (queues.run)(item).await,
                    Ok(None) => break,
                    Err(_) => {
                        // Pushes happen under this lock, so nothing can land
                        // between the emptiness check and the removal. The
                        // entry is ours: it is only replaced once our receiver
                        // is gone.
                        let mut map = queues.lock();
                        if rx.is_empty() {
                            map.remove(&user);
                            break;
                        }
                    }
                }
            }
            debug!(user, "Worker stopped");
        });
        tx
    }
}
