//! Completion delivery.
//!
//! Every finished request hands its callback to one loop task, so callbacks never run
//! concurrently with each other. Callbacks should return quickly; a slow callback
//! delays every completion queued behind it.

use std::panic::AssertUnwindSafe;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

pub(crate) type Completion = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct CompletionLoop {
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionLoop {
    /// Spawn the loop on `runtime`. It stops once every sender is dropped.
    pub(crate) fn start(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                if std::panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("completion callback panicked");
                }
            }
            debug!("completion loop stopped");
        });
        Self { tx }
    }

    pub(crate) fn deliver(&self, job: Completion) {
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            // The loop is gone (runtime shutting down); the callback still fires once.
            debug!("completion loop closed, running callback inline");
            job();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn callbacks_run_in_order_on_one_loop() {
        let lp = CompletionLoop::start(&Handle::current());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();
        for i in 0..5 {
            let seen = seen.clone();
            lp.deliver(Box::new(move || seen.lock().unwrap().push(i)));
        }
        lp.deliver(Box::new(move || {
            let _ = done_tx.send(());
        }));
        done_rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn panicking_callback_does_not_stop_the_loop() {
        let lp = CompletionLoop::start(&Handle::current());
        let count = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = oneshot::channel();
        lp.deliver(Box::new(|| panic!("boom")));
        let c = count.clone();
        lp.deliver(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            let _ = done_tx.send(());
        }));
        done_rx.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
