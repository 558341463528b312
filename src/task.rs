//! Asynchronous batch operations over one index.
//!
//! A [`TaskController`] owns a fixed pool of worker threads fed by a
//! channel, plus one delivery thread on which every completion callback
//! runs. A batch submits one unit per item, an optional flush unit that runs
//! once every item has finished, and a completion unit that runs after the
//! flush. Cancelling skips units that have not started yet, including the
//! flush, but completions still fire.
//!
//! Queue size changes are published as [`QueueEvent`]s to every subscriber.

pub mod search_task;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::engine::Index;
use crate::error::Result;
use crate::extract;
use crate::index::document::TermState;
use crate::task::search_task::SearchTask;

pub use search_task::DEFAULT_SEARCH_TIMEOUT;

/// Default number of worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 6;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// A document to add or remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTask {
    pub uri: String,
    pub text: String,
}

impl TextTask {
    pub fn new<U: Into<String>, T: Into<String>>(uri: U, text: T) -> Self {
        TextTask {
            uri: uri.into(),
            text: text.into(),
        }
    }
}

/// Published whenever the number of queued units changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub queue_size: usize,
    pub is_complete: bool,
}

/// Per-batch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Flush the index once every item has been processed.
    pub flush_when_complete: bool,
    /// Let added documents replace existing ones with the same URI.
    pub can_replace: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            flush_when_complete: false,
            can_replace: true,
        }
    }
}

impl BatchOptions {
    /// Set whether the batch ends with a flush.
    pub fn with_flush(mut self, flush: bool) -> Self {
        self.flush_when_complete = flush;
        self
    }

    /// Set whether adds may replace existing documents.
    pub fn with_replace(mut self, can_replace: bool) -> Self {
        self.can_replace = can_replace;
        self
    }
}

/// Configuration for [`TaskController`].
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Number of worker threads.
    pub worker_threads: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfig {
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

pub(crate) struct Batch {
    generation: u64,
    remaining: AtomicUsize,
    flush: bool,
    completion: Mutex<Option<Callback>>,
}

pub(crate) enum Job {
    /// One item of a batch; skipped once its generation is cancelled.
    Item {
        generation: u64,
        batch: Arc<Batch>,
        work: Callback,
    },
    /// Work outside any batch.
    Detached(Callback),
}

#[derive(Default)]
struct QueueState {
    size: usize,
    idle_callbacks: Vec<Callback>,
}

pub(crate) struct Shared {
    index: Index,
    generation: AtomicU64,
    queue: Mutex<QueueState>,
    idle: Condvar,
    subscribers: Mutex<Vec<Sender<QueueEvent>>>,
    delivery: Sender<Callback>,
}

impl Shared {
    fn is_cancelled(&self, generation: u64) -> bool {
        generation < self.generation.load(Ordering::Acquire)
    }

    fn publish(&self, queue_size: usize) {
        let event = QueueEvent {
            queue_size,
            is_complete: queue_size == 0,
        };
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event).is_ok());
    }

    fn add_units(&self, count: usize) {
        let mut queue = self.queue.lock();
        queue.size += count;
        self.publish(queue.size);
    }

    fn finish_units(&self, count: usize) {
        let mut queue = self.queue.lock();
        queue.size = queue.size.saturating_sub(count);
        self.publish(queue.size);
        if queue.size == 0 {
            self.idle.notify_all();
            for callback in queue.idle_callbacks.drain(..) {
                self.deliver(callback);
            }
        }
    }

    /// Run `callback` on the delivery thread.
    pub(crate) fn deliver(&self, callback: Callback) {
        if let Err(unsent) = self.delivery.send(callback) {
            (unsent.into_inner())();
        }
    }

    fn when_idle(&self, callback: Callback) {
        let mut queue = self.queue.lock();
        if queue.size == 0 {
            drop(queue);
            self.deliver(callback);
        } else {
            queue.idle_callbacks.push(callback);
        }
    }

    fn run_job(self: &Arc<Self>, job: Job) {
        match job {
            Job::Detached(work) => work(),
            Job::Item {
                generation,
                batch,
                work,
            } => {
                if !self.is_cancelled(generation) {
                    work();
                }
                if batch.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    self.finish_batch(&batch);
                }
                self.finish_units(1);
            }
        }
    }

    fn finish_batch(self: &Arc<Self>, batch: &Batch) {
        if batch.flush {
            if self.is_cancelled(batch.generation) {
                log::debug!("skipping flush of cancelled batch");
            } else if let Err(e) = self.index.flush() {
                log::warn!("batch flush failed: {e}");
            }
            self.finish_units(1);
        }

        let completion = batch.completion.lock().take();
        let shared = Arc::clone(self);
        self.deliver(Box::new(move || {
            if let Some(completion) = completion {
                completion();
            }
            shared.finish_units(1);
        }));
    }
}

/// Runs index mutations on a worker pool and delivers their completions.
pub struct TaskController {
    shared: Arc<Shared>,
    jobs: Sender<Job>,
    running: Arc<AtomicBool>,
    delivering: Arc<AtomicBool>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    delivery_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskController")
            .field("workers", &self.workers.lock().len())
            .field("queue_size", &self.queue_size())
            .finish()
    }
}

impl TaskController {
    /// Start a controller with the default pool size.
    pub fn new(index: Index) -> Result<Self> {
        Self::with_config(index, TaskConfig::default())
    }

    /// Start a controller.
    pub fn with_config(index: Index, config: TaskConfig) -> Result<Self> {
        let (jobs, job_receiver) = unbounded::<Job>();
        let (delivery, delivery_receiver) = unbounded::<Callback>();
        let shared = Arc::new(Shared {
            index,
            generation: AtomicU64::new(0),
            queue: Mutex::new(QueueState::default()),
            idle: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
            delivery,
        });
        let running = Arc::new(AtomicBool::new(true));
        let delivering = Arc::new(AtomicBool::new(true));

        let mut workers = Vec::with_capacity(config.worker_threads.max(1));
        for worker_id in 0..config.worker_threads.max(1) {
            let receiver = job_receiver.clone();
            let shared = Arc::clone(&shared);
            let running = Arc::clone(&running);
            let handle = thread::Builder::new()
                .name(format!("quire-worker-{worker_id}"))
                .spawn(move || {
                    loop {
                        match receiver.recv_timeout(POLL_INTERVAL) {
                            Ok(job) => shared.run_job(job),
                            Err(RecvTimeoutError::Timeout) => {
                                if !running.load(Ordering::Acquire) {
                                    break;
                                }
                            }
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                })?;
            workers.push(handle);
        }

        let delivery_thread = {
            let delivering = Arc::clone(&delivering);
            thread::Builder::new()
                .name("quire-delivery".to_string())
                .spawn(move || {
                    loop {
                        match delivery_receiver.recv_timeout(POLL_INTERVAL) {
                            Ok(callback) => callback(),
                            Err(RecvTimeoutError::Timeout) => {
                                if !delivering.load(Ordering::Acquire) {
                                    break;
                                }
                            }
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                })?
        };

        log::debug!("started task controller with {} workers", workers.len());
        Ok(TaskController {
            shared,
            jobs,
            running,
            delivering,
            workers: Mutex::new(workers),
            delivery_thread: Mutex::new(Some(delivery_thread)),
        })
    }

    /// The index this controller operates on.
    pub fn index(&self) -> &Index {
        &self.shared.index
    }

    /// Units queued or running, completions included.
    pub fn queue_size(&self) -> usize {
        self.shared.queue.lock().size
    }

    /// Check if nothing is queued.
    pub fn is_complete(&self) -> bool {
        self.queue_size() == 0
    }

    /// Receive a [`QueueEvent`] on every queue size change.
    pub fn subscribe(&self) -> Receiver<QueueEvent> {
        let (sender, receiver) = unbounded();
        self.shared.subscribers.lock().push(sender);
        receiver
    }

    fn submit_batch(&self, items: Vec<Callback>, flush: bool, completion: Callback) {
        let generation = self.shared.generation.load(Ordering::Acquire);
        let count = items.len();
        let batch = Arc::new(Batch {
            generation,
            remaining: AtomicUsize::new(count),
            flush,
            completion: Mutex::new(Some(completion)),
        });
        self.shared.add_units(count + usize::from(flush) + 1);
        log::debug!("queued batch of {count} units (flush: {flush})");

        if count == 0 {
            self.shared.finish_batch(&batch);
            return;
        }
        for work in items {
            let job = Job::Item {
                generation,
                batch: Arc::clone(&batch),
                work,
            };
            if let Err(unsent) = self.jobs.send(job) {
                self.shared.run_job(unsent.into_inner());
            }
        }
    }

    pub(crate) fn submit_detached(&self, work: Callback) {
        if let Err(unsent) = self.jobs.send(Job::Detached(work)) {
            self.shared.run_job(unsent.into_inner());
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Add documents. `complete` receives the tasks once the batch is done.
    pub fn add_text<F>(&self, tasks: Vec<TextTask>, options: BatchOptions, complete: F)
    where
        F: FnOnce(Vec<TextTask>) + Send + 'static,
    {
        let items = tasks
            .iter()
            .cloned()
            .map(|task| {
                let index = self.shared.index.clone();
                Box::new(move || {
                    if let Err(e) = index.add_text(&task.uri, &task.text, options.can_replace) {
                        log::warn!("add {} failed: {e}", task.uri);
                    }
                }) as Callback
            })
            .collect();
        self.submit_batch(
            items,
            options.flush_when_complete,
            Box::new(move || complete(tasks)),
        );
    }

    /// Add files; directories are expanded recursively.
    ///
    /// `complete` receives the files that were queued.
    pub fn add_files<F>(&self, paths: Vec<PathBuf>, options: BatchOptions, complete: F)
    where
        F: FnOnce(Vec<PathBuf>) + Send + 'static,
    {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(extract::list_files(&path));
            } else if path.is_file() {
                files.push(path);
            } else {
                log::warn!("skipping missing path {}", path.display());
            }
        }

        let items = files
            .iter()
            .cloned()
            .map(|path| {
                let index = self.shared.index.clone();
                Box::new(move || {
                    if let Err(e) = index.add_file(&path, None, options.can_replace) {
                        log::warn!("add {} failed: {e}", path.display());
                    }
                }) as Callback
            })
            .collect();
        self.submit_batch(
            items,
            options.flush_when_complete,
            Box::new(move || complete(files)),
        );
    }

    /// Remove the documents named by the tasks' URIs.
    pub fn remove_text<F>(&self, tasks: Vec<TextTask>, options: BatchOptions, complete: F)
    where
        F: FnOnce(Vec<TextTask>) + Send + 'static,
    {
        let items = tasks
            .iter()
            .map(|task| self.remove_unit(task.uri.clone()))
            .collect();
        self.submit_batch(
            items,
            options.flush_when_complete,
            Box::new(move || complete(tasks)),
        );
    }

    /// Remove documents by URI.
    pub fn remove_uris<F>(&self, uris: Vec<String>, options: BatchOptions, complete: F)
    where
        F: FnOnce(Vec<String>) + Send + 'static,
    {
        let items = uris.iter().map(|uri| self.remove_unit(uri.clone())).collect();
        self.submit_batch(
            items,
            options.flush_when_complete,
            Box::new(move || complete(uris)),
        );
    }

    fn remove_unit(&self, uri: String) -> Callback {
        let index = self.shared.index.clone();
        Box::new(move || {
            if let Err(e) = index.remove(&uri) {
                log::warn!("remove {uri} failed: {e}");
            }
        })
    }

    /// Remove every indexed document without terms.
    ///
    /// `complete` receives the URIs that were scheduled for removal.
    pub fn prune<F>(&self, complete: F) -> Result<()>
    where
        F: FnOnce(Vec<String>) + Send + 'static,
    {
        let empty = self.shared.index.documents(TermState::Empty)?;
        self.remove_uris(empty, BatchOptions::default(), complete);
        Ok(())
    }

    /// Start a progressive search whose pages are fetched on the pool.
    pub fn search(&self, query: &str) -> Result<SearchTask> {
        let cursor = self.shared.index.progressive_search(query)?;
        Ok(SearchTask::new(cursor, self))
    }

    /// Skip every unit that has not started yet.
    ///
    /// Completion callbacks of cancelled batches still run. `done` runs on
    /// the delivery thread once the queue is empty.
    pub fn cancel_current<F>(&self, done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        log::debug!("cancelled queued units");
        self.shared.when_idle(Box::new(done));
    }

    /// Run `done` on the delivery thread once the queue is empty.
    pub fn when_idle<F>(&self, done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.when_idle(Box::new(done));
    }

    /// Block until the queue is empty.
    ///
    /// Must not be called from a completion callback.
    pub fn wait_until_idle(&self) {
        let mut queue = self.shared.queue.lock();
        while queue.size > 0 {
            self.shared.idle.wait(&mut queue);
        }
    }

    /// Block until the queue is empty or `timeout` passes.
    ///
    /// Returns true if the queue emptied.
    pub fn wait_until_idle_for(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut queue = self.shared.queue.lock();
        while queue.size > 0 {
            if self.shared.idle.wait_until(&mut queue, deadline).timed_out() {
                return queue.size == 0;
            }
        }
        true
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        let current = thread::current().id();
        self.running.store(false, Ordering::Release);
        for worker in self.workers.lock().drain(..) {
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
        self.delivering.store(false, Ordering::Release);
        if let Some(delivery) = self.delivery_thread.lock().take()
            && delivery.thread().id() != current
        {
            let _ = delivery.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::config::IndexConfig;

    fn controller() -> TaskController {
        let index = Index::create(IndexConfig::default()).unwrap();
        TaskController::new(index).unwrap()
    }

    fn tasks(count: usize) -> Vec<TextTask> {
        (0..count)
            .map(|i| TextTask::new(format!("doc://{i}"), format!("word{i} common")))
            .collect()
    }

    #[test]
    fn test_add_with_flush_commits_before_completion() {
        let controller = controller();
        let (sender, receiver) = unbounded();
        let index = controller.index().clone();
        controller.add_text(tasks(20), BatchOptions::default().with_flush(true), move |done| {
            let count = index.document_count().unwrap();
            let _ = sender.send((done.len(), count));
        });
        let (delivered, committed) = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(delivered, 20);
        assert_eq!(committed, 20);
        controller.wait_until_idle();
        assert!(controller.is_complete());
    }

    #[test]
    fn test_add_without_flush_stays_pending() {
        let controller = controller();
        controller.add_text(tasks(3), BatchOptions::default(), |_| {});
        controller.wait_until_idle();
        assert_eq!(controller.index().document_count().unwrap(), 0);
        controller.index().flush().unwrap();
        assert_eq!(controller.index().document_count().unwrap(), 3);
    }

    #[test]
    fn test_empty_batch_completes() {
        let controller = controller();
        let (sender, receiver) = unbounded();
        controller.remove_uris(Vec::new(), BatchOptions::default().with_flush(true), move |uris| {
            let _ = sender.send(uris.len());
        });
        assert_eq!(receiver.recv_timeout(Duration::from_secs(10)).unwrap(), 0);
    }

    #[test]
    fn test_cancelled_batch_still_completes() {
        let index = Index::create(IndexConfig::default()).unwrap();
        let controller =
            TaskController::with_config(index, TaskConfig { worker_threads: 1 }).unwrap();

        let (sender, receiver) = unbounded();
        let gate = Arc::new(parking_lot::Mutex::new(()));
        let held = gate.lock();
        {
            let gate = Arc::clone(&gate);
            controller.submit_batch(
                vec![Box::new(move || drop(gate.lock())) as Callback],
                false,
                Box::new(|| {}),
            );
        }
        let done_sender = sender.clone();
        controller.add_text(tasks(50), BatchOptions::default().with_flush(true), move |t| {
            let _ = done_sender.send(format!("completed {}", t.len()));
        });
        controller.cancel_current(move || {
            let _ = sender.send("idle".to_string());
        });
        drop(held);

        let first = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        let second = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first, "completed 50");
        assert_eq!(second, "idle");
        controller.index().flush().unwrap();
        assert_eq!(controller.index().document_count().unwrap(), 0);
    }

    #[test]
    fn test_queue_events() {
        let controller = controller();
        let events = controller.subscribe();
        controller.add_text(tasks(2), BatchOptions::default(), |_| {});
        controller.wait_until_idle();

        let received: Vec<QueueEvent> = events.try_iter().collect();
        assert!(received.first().is_some_and(|e| e.queue_size == 3 && !e.is_complete));
        assert!(received.last().is_some_and(|e| e.queue_size == 0 && e.is_complete));
    }

    #[test]
    fn test_remove_and_prune() {
        let controller = controller();
        let index = controller.index();
        index.add_text("empty", "", false).unwrap();
        index.add_text("full", "text", false).unwrap();
        index.flush().unwrap();

        let (sender, receiver) = unbounded();
        controller.prune(move |uris| {
            let _ = sender.send(uris);
        })
        .unwrap();
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(10)).unwrap(),
            vec!["empty".to_string()]
        );
        controller.wait_until_idle();
        assert_eq!(index.documents(TermState::All).unwrap(), vec!["full"]);

        controller.remove_text(
            vec![TextTask::new("full", "")],
            BatchOptions::default().with_flush(true),
            |_| {},
        );
        controller.wait_until_idle();
        assert_eq!(index.document_count().unwrap(), 0);
    }

    #[test]
    fn test_add_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "beta").unwrap();

        let controller = controller();
        let (sender, receiver) = unbounded();
        controller.add_files(
            vec![dir.path().to_path_buf()],
            BatchOptions::default().with_flush(true),
            move |files| {
                let _ = sender.send(files.len());
            },
        );
        assert_eq!(receiver.recv_timeout(Duration::from_secs(10)).unwrap(), 2);
        controller.wait_until_idle();
        assert_eq!(controller.index().search("beta", 10, None).unwrap().len(), 1);
    }
}
