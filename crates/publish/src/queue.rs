//! The process-wide publish queue.
//!
//! Publishing mutates shared repository metadata, so publish jobs run one at a
//! time on a single worker thread, in submission order. Every
//! [`MavenPublisher`](crate::MavenPublisher) submits to
//! [`PublishQueue::global`] unless given its own queue.

use crate::error::{Error, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send>;

static GLOBAL: OnceLock<Arc<PublishQueue>> = OnceLock::new();

/// A single worker that runs submitted jobs strictly one after another.
#[derive(Debug)]
pub struct PublishQueue {
    jobs: Sender<Job>,
}

impl PublishQueue {
    /// A new queue with its own worker thread. The worker exits once the
    /// queue is dropped and every submitted job has run.
    #[must_use]
    pub fn new() -> Self {
        let (jobs, receiver) = mpsc::channel::<Job>();
        thread::spawn(move || {
            for job in receiver {
                job();
            }
            debug!("Publish queue worker stopped");
        });
        Self { jobs }
    }

    /// The queue shared by the whole process.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Run `job` on the worker and wait for its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobPanicked`] if `job` panicked; the worker keeps
    /// running for later submissions. Returns [`Error::QueueClosed`] if the
    /// worker is gone.
    pub fn submit<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (reply, result) = mpsc::sync_channel(1);
        self.jobs
            .send(Box::new(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(job));
                let _ = reply.send(outcome.map_err(|payload| panic_message(payload.as_ref())));
            }))
            .map_err(|_| Error::QueueClosed)?;
        result
            .recv()
            .map_err(|_| Error::QueueClosed)?
            .map_err(|message| Error::JobPanicked { message })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Default for PublishQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_jobs_never_overlap() {
        let queue = Arc::new(PublishQueue::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    queue
                        .submit(move || {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(5));
                            running.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_results_in_submission_order() {
        let queue = PublishQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = Arc::clone(&order);
            let value = queue.submit(move || {
                order.lock().push(i);
                i * 2
            });
            assert_eq!(value.unwrap(), i * 2);
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panicking_job_leaves_queue_usable() {
        let queue = PublishQueue::new();
        let err = queue
            .submit(|| -> u32 { panic!("transport blew up") })
            .unwrap_err();
        assert!(matches!(&err, Error::JobPanicked { message } if message == "transport blew up"));
        assert_eq!(queue.submit(|| 42).unwrap(), 42);

        let formatted = queue.submit(|| -> u32 { panic!("status {}", 500) }).unwrap_err();
        assert_eq!(formatted.to_string(), "Publish job panicked: status 500");
        assert_eq!(queue.submit(|| 7).unwrap(), 7);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&PublishQueue::global(), &PublishQueue::global()));
    }
}
