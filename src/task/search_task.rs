//! Progressive search driven by the task pool.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::search::SearchResults;
use crate::search::cursor::{CursorState, ProgressiveSearch};
use crate::task::{Job, Shared, TaskController};

/// Time budget of one page fetch when the caller gives none.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_millis(300);

type PageCallback = Box<dyn FnOnce(SearchResults) + Send + 'static>;

struct PageRequest {
    limit: usize,
    timeout: Option<Duration>,
    callback: PageCallback,
}

#[derive(Default)]
struct Lane {
    requests: VecDeque<PageRequest>,
    draining: bool,
}

/// A search whose pages are scanned on a worker and delivered on the
/// delivery thread.
///
/// Requests on one task are served in submission order. Dropping the task
/// cancels its cursor; requests still queued then get empty final pages.
pub struct SearchTask {
    cursor: Arc<ProgressiveSearch>,
    lane: Arc<Mutex<Lane>>,
    shared: Arc<Shared>,
    jobs: Sender<Job>,
}

impl std::fmt::Debug for SearchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTask")
            .field("query", &self.cursor.query())
            .field("state", &self.cursor.state())
            .finish()
    }
}

impl SearchTask {
    pub(crate) fn new(cursor: ProgressiveSearch, controller: &TaskController) -> Self {
        SearchTask {
            cursor: Arc::new(cursor),
            lane: Arc::new(Mutex::new(Lane::default())),
            shared: Arc::clone(controller.shared()),
            jobs: controller.jobs.clone(),
        }
    }

    /// The query being searched.
    pub fn query(&self) -> &str {
        self.cursor.query()
    }

    /// State of the underlying cursor.
    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Cancel the search.
    pub fn cancel(&self) {
        self.cursor.cancel();
    }

    /// Fetch the next page and pass it to `callback` on the delivery thread.
    ///
    /// `timeout` defaults to [`DEFAULT_SEARCH_TIMEOUT`].
    pub fn next<F>(&self, limit: usize, timeout: Option<Duration>, callback: F)
    where
        F: FnOnce(SearchResults) + Send + 'static,
    {
        let mut lane = self.lane.lock();
        lane.requests.push_back(PageRequest {
            limit,
            timeout: timeout.or(Some(DEFAULT_SEARCH_TIMEOUT)),
            callback: Box::new(callback),
        });
        if lane.draining {
            return;
        }
        lane.draining = true;
        drop(lane);

        let cursor = Arc::clone(&self.cursor);
        let lane = Arc::clone(&self.lane);
        let shared = Arc::clone(&self.shared);
        let drain = Box::new(move || {
            loop {
                let request = {
                    let mut lane = lane.lock();
                    match lane.requests.pop_front() {
                        Some(request) => request,
                        None => {
                            lane.draining = false;
                            break;
                        }
                    }
                };
                let page = cursor.next(request.limit, request.timeout);
                let callback = request.callback;
                shared.deliver(Box::new(move || callback(page)));
            }
        });

        if let Err(unsent) = self.jobs.send(Job::Detached(drain)) {
            if let Job::Detached(work) = unsent.into_inner() {
                work();
            }
        }
    }
}

impl Drop for SearchTask {
    fn drop(&mut self) {
        self.cursor.cancel();
    }
}
