use std::collections::VecDeque;
use std::sync::Mutex;

use crate::lock;

/// A task deferred to the next scheduling tick.
pub type Task = Box<dyn FnOnce() + Send>;

/// Defers work until the current synchronous block has completed.
pub trait Scheduler: Send + Sync {
    fn defer(&self, task: Task);

    /// Runs the tasks that are due, for schedulers driven by the host.
    /// Returns the number of tasks run.
    fn run_pending(&self) -> usize {
        0
    }
}

/// Browser scheduler: runs deferred tasks from a zero-delay timeout.
///
/// Off the browser there is no event loop; tasks are queued until
/// [`Scheduler::run_pending`] is called, never run inline.
#[derive(Default)]
pub struct TimeoutScheduler {
    #[cfg(not(target_arch = "wasm32"))]
    queue: QueuedScheduler,
}

impl TimeoutScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TimeoutScheduler {
    fn defer(&self, task: Task) {
        #[cfg(target_arch = "wasm32")]
        leptos::leptos_dom::helpers::set_timeout(task, std::time::Duration::ZERO);

        #[cfg(not(target_arch = "wasm32"))]
        self.queue.defer(task);
    }

    fn run_pending(&self) -> usize {
        #[cfg(not(target_arch = "wasm32"))]
        return self.queue.run_pending();

        #[cfg(target_arch = "wasm32")]
        return 0;
    }
}

/// FIFO scheduler driven by the host: tasks run when [`run_pending`](Self::run_pending) is called.
#[derive(Default)]
pub struct QueuedScheduler {
    queue: Mutex<VecDeque<Task>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Runs queued tasks until the queue is empty, including tasks queued by
    /// the tasks themselves. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = lock(&self.queue).pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Scheduler for QueuedScheduler {
    fn defer(&self, task: Task) {
        lock(&self.queue).push_back(task);
    }

    fn run_pending(&self) -> usize {
        QueuedScheduler::run_pending(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tasks_wait_for_run_pending() {
        let scheduler = QueuedScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.defer(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_timeout_scheduler_never_runs_inline() {
        let scheduler = TimeoutScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.defer(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(Scheduler::run_pending(&scheduler), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tasks_scheduled_by_tasks_also_run() {
        let scheduler = Arc::new(QueuedScheduler::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let (s, o) = (scheduler.clone(), order.clone());
        scheduler.defer(Box::new(move || {
            o.lock().unwrap().push(1);
            let o2 = o.clone();
            s.defer(Box::new(move || o2.lock().unwrap().push(2)));
        }));

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }
}
