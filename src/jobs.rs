//! Background job plumbing shared by the dashboard and the chat session.
//!
//! Blocking backend calls run through a [`JobSpawner`]; each job sends its
//! result over a channel that the owning controller drains on its own thread
//! (see `poll_background_jobs`). All state changes therefore happen on one
//! thread, one completion at a time.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

/// Unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs background jobs.
pub trait JobSpawner: Send + Sync {
    fn spawn(&self, job: Job);
}

/// Runs every job on its own OS thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSpawner;

impl JobSpawner for ThreadSpawner {
    fn spawn(&self, job: Job) {
        thread::spawn(job);
    }
}

/// Holds jobs until the caller runs them, in any order.
///
/// Used to replay network interleavings deterministically.
#[derive(Default)]
pub struct ManualSpawner {
    queue: Mutex<VecDeque<Job>>,
}

impl ManualSpawner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of jobs spawned but not yet run.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the oldest pending job. Returns false when the queue was empty.
    pub fn run_next(&self) -> bool {
        let job = self.lock().pop_front();
        Self::run(job)
    }

    /// Run the most recently spawned pending job.
    pub fn run_latest(&self) -> bool {
        let job = self.lock().pop_back();
        Self::run(job)
    }

    /// Run the pending job at `index` (0 = oldest).
    pub fn run_at(&self, index: usize) -> bool {
        let job = self.lock().remove(index);
        Self::run(job)
    }

    /// Run pending jobs until the queue is empty, including jobs spawned meanwhile.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    fn run(job: Option<Job>) -> bool {
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl JobSpawner for ManualSpawner {
    fn spawn(&self, job: Job) {
        self.lock().push_back(job);
    }
}

/// Identity of one issued request, unique and increasing within its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct TokenSource {
    next: u64,
}

impl Default for TokenSource {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl TokenSource {
    pub(crate) fn next(&mut self) -> RequestToken {
        let token = RequestToken(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        token
    }
}

/// Spawns work and collects its completion messages.
pub(crate) struct JobQueue<M> {
    spawner: Arc<dyn JobSpawner>,
    message_tx: Sender<M>,
    message_rx: Receiver<M>,
}

impl<M: Send + 'static> JobQueue<M> {
    pub(crate) fn new(spawner: Arc<dyn JobSpawner>) -> Self {
        let (message_tx, message_rx) = std::sync::mpsc::channel();
        Self {
            spawner,
            message_tx,
            message_rx,
        }
    }

    /// Run `work` in the background and post its result as a message.
    pub(crate) fn begin<F>(&self, work: F)
    where
        F: FnOnce() -> M + Send + 'static,
    {
        let tx = self.message_tx.clone();
        self.spawner.spawn(Box::new(move || {
            let _ = tx.send(work());
        }));
    }

    pub(crate) fn try_recv_message(&self) -> Result<M, TryRecvError> {
        self.message_rx.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_spawner_runs_in_requested_order() {
        let spawner = ManualSpawner::new();
        let queue: JobQueue<u32> = JobQueue::new(spawner.clone());
        for value in 1..=3 {
            queue.begin(move || value);
        }
        assert_eq!(spawner.pending(), 3);
        assert!(spawner.run_latest());
        assert!(spawner.run_at(0));
        assert_eq!(queue.try_recv_message().unwrap(), 3);
        assert_eq!(queue.try_recv_message().unwrap(), 1);
        assert!(queue.try_recv_message().is_err());
        assert_eq!(spawner.run_all(), 1);
        assert_eq!(queue.try_recv_message().unwrap(), 2);
    }

    #[test]
    fn tokens_increase() {
        let mut tokens = TokenSource::default();
        let first = tokens.next();
        let second = tokens.next();
        assert!(second > first);
        assert_eq!(first.value(), 1);
    }

    #[test]
    fn thread_spawner_delivers_results() {
        let queue: JobQueue<&'static str> = JobQueue::new(Arc::new(ThreadSpawner));
        queue.begin(|| "done");
        let message = queue.message_rx.recv_timeout(std::time::Duration::from_secs(5));
        assert_eq!(message.unwrap(), "done");
    }
}
