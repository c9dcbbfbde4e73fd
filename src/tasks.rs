//! Background task launching
//!
//! [`TaskManager`] runs fire-and-forget work on a small pool of worker
//! threads. It is not part of the per-frame path; the renderer never waits on
//! it. Work that needs to report back should carry its own channel.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn spawn(id: usize, receiver: Receiver<Job>) -> std::io::Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("task-worker-{id}"))
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("Task on worker {id} panicked");
                    }
                }
            })?;

        Ok(Self {
            id,
            thread: Some(thread),
        })
    }
}

/// Pool of worker threads fed from one unbounded queue.
///
/// Tasks run in no particular order. Dropping the manager runs every task
/// still queued and then joins the workers.
pub struct TaskManager {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
}

impl TaskManager {
    pub fn new(worker_count: usize) -> std::io::Result<Self> {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = unbounded::<Job>();

        let workers = (0..worker_count)
            .map(|id| Worker::spawn(id, receiver.clone()))
            .collect::<std::io::Result<Vec<_>>>()?;

        log::info!("Task manager started with {worker_count} workers");
        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// One worker per available core
    pub fn with_default_workers() -> std::io::Result<Self> {
        let count = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(count)
    }

    /// Queue `work` to be called with `argument` on some worker
    pub fn launch<A, F>(&self, work: F, argument: A)
    where
        A: Send + 'static,
        F: FnOnce(A) + Send + 'static,
    {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(Box::new(move || work(argument))).is_err() {
            log::warn!("Task dropped: no workers left");
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        // Disconnecting lets workers drain the queue and exit
        drop(self.sender.take());

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!("Task worker {} exited abnormally", worker.id);
                }
            }
        }
        log::info!("Task manager stopped");
    }
}
