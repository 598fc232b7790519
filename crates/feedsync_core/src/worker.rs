//! Background worker for best-effort remote writes.
//!
//! Toggle-style mutations return to the caller as soon as the local
//! effect is applied; the remote effect runs here. A failed job is
//! logged and dropped: the optimistic local state is intentionally
//! retained (no rollback). Jobs that started are never cancelled
//! mid-flight; dropping the worker drains the queue before joining.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::error::SyncResult;

type Job = Box<dyn FnOnce() -> SyncResult<()> + Send + 'static>;

enum Message {
    Run { label: &'static str, job: Job },
    Flush(Sender<()>),
}

/// A single background thread executing queued remote writes in order.
pub struct RemoteWriteWorker {
    tx: Option<Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl RemoteWriteWorker {
    /// Spawns the worker thread.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Message>();
        let handle = thread::Builder::new()
            .name("feedsync-remote-writes".into())
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    match message {
                        Message::Run { label, job } => {
                            if let Err(error) = job() {
                                tracing::warn!(
                                    %error,
                                    label,
                                    "best-effort remote write failed; keeping local state"
                                );
                            }
                        }
                        Message::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })
            .expect("failed to spawn remote-write worker");
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Enqueues a best-effort remote write.
    ///
    /// `label` identifies the mutation in logs.
    pub fn submit<F>(&self, label: &'static str, job: F)
    where
        F: FnOnce() -> SyncResult<()> + Send + 'static,
    {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Message::Run {
                label,
                job: Box::new(job),
            });
        }
    }

    /// Blocks until every previously submitted job has completed.
    ///
    /// Primarily for tests and orderly shutdown.
    pub fn flush(&self) {
        if let Some(tx) = &self.tx {
            let (done_tx, done_rx) = mpsc::channel();
            if tx.send(Message::Flush(done_tx)).is_ok() {
                let _ = done_rx.recv();
            }
        }
    }
}

impl Default for RemoteWriteWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RemoteWriteWorker {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain remaining jobs.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn jobs_run_in_submission_order() {
        let worker = RemoteWriteWorker::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = Arc::clone(&log);
            worker.submit("test", move || {
                log.lock().push(i);
                Ok(())
            });
        }
        worker.flush();
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn failed_job_does_not_stop_the_worker() {
        let worker = RemoteWriteWorker::new();
        let ran = Arc::new(AtomicUsize::new(0));
        worker.submit("failing", || Err(SyncError::validation("boom")));
        let ran_clone = Arc::clone(&ran);
        worker.submit("after", move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        worker.flush();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_drains_pending_jobs() {
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let worker = RemoteWriteWorker::new();
            for _ in 0..10 {
                let ran = Arc::clone(&ran);
                worker.submit("drain", move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
        }
        assert_eq!(ran.load(Ordering::SeqCst), 10);
    }
}
