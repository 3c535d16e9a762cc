//! Stop signal and task registry shared by the background tasks of one
//! transport.
//!
//! Tasks clone a receiver with [`ShutdownToken::subscribe`] and watch it in
//! their `tokio::select!` loop; the owner calls
//! [`signal_stop`](ShutdownToken::signal_stop) and then
//! [`join_all`](ShutdownToken::join_all).

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

pub struct ShutdownToken {
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            stop_tx,
            stop_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    pub async fn add_task(&self, handle: JoinHandle<()>) {
        self.tasks.lock().await.push(handle);
    }

    /// Idempotent.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Await every registered task. Panicked tasks are ignored.
    pub async fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
