//! Named worker pool.
//!
//! Backs the parallel key lookups of the dispatch layer. The pool is sized at
//! table open to cover one task per partition plus slack and keeps that size
//! for its lifetime. Jobs are boxed closures drained from a shared channel;
//! shutdown closes the channel and grants in-flight jobs a grace period.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers named `<name_prefix>-worker-<n>`.
    pub fn new(size: usize, name_prefix: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("{name_prefix}-worker-{index}"))
                .spawn(move || loop {
                    // Hold the lock only while waiting; jobs run unlocked.
                    let job = match receiver.lock() {
                        Ok(guard) => guard.recv(),
                        Err(_) => break,
                    };
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job. Fails with `Closed` once shutdown has begun.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(Error::Closed)?;
        sender.send(Box::new(job)).map_err(|_| Error::Closed)
    }

    /// Close the job channel and wait up to `grace` for workers to drain.
    ///
    /// Workers still busy after the grace period are detached; they exit on
    /// their own once their current job finishes. Idempotent.
    pub fn shutdown(&mut self, grace: Duration) {
        self.sender.take();

        let deadline = Instant::now() + grace;
        while !self.workers.is_empty() && Instant::now() < deadline {
            if self.workers.iter().all(|w| w.is_finished()) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        for worker in self.workers.drain(..) {
            if worker.is_finished() {
                // Join cannot block here; surface worker panics to the log.
                if worker.join().is_err() {
                    log::warn!("lookup worker panicked during shutdown");
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
    }
}
