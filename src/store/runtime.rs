use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Job = Box<dyn FnOnce()>;

/// Notification queue shared by every store created from it.
///
/// Publishes are delivered in FIFO order. A publish that happens while another
/// one is being delivered is queued behind it instead of running nested, so
/// every observer sees values in the order they were published. Derived view
/// outputs go through a second lane that drains first: a view finishes
/// reacting to one source publish before the next source publish is delivered.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

#[derive(Default)]
struct RuntimeInner {
    queue: RefCell<VecDeque<Job>>,
    derived: RefCell<VecDeque<Job>>,
    flushing: Cell<bool>,
    batch_depth: Cell<usize>,
    batch_epoch: Cell<u64>,
}

/// Resets a flag (or decrements a counter) even if an observer panics.
struct CellGuard<'a, T: Copy> {
    cell: &'a Cell<T>,
    restore: T,
}

impl<T: Copy> Drop for CellGuard<'_, T> {
    fn drop(&mut self) {
        self.cell.set(self.restore);
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with deliveries held back until it returns.
    ///
    /// Stores written inside the batch publish their final value once, and a
    /// derived view over several of them recomputes once with all of the
    /// post-batch values. Batches nest; only the outermost one flushes.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.inner.batch_depth.get();
        if depth == 0 {
            self.inner.batch_epoch.set(self.inner.batch_epoch.get() + 1);
        }
        self.inner.batch_depth.set(depth + 1);
        let result = {
            let _guard = CellGuard {
                cell: &self.inner.batch_depth,
                restore: depth,
            };
            f()
        };
        self.flush();
        result
    }

    pub fn is_batching(&self) -> bool {
        self.inner.batch_depth.get() > 0
    }

    /// Number of publishes waiting to be delivered.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len() + self.inner.derived.borrow().len()
    }

    /// Identifies the outermost batch in progress, if any. Writes that share
    /// an epoch are merged into one publish.
    pub(crate) fn batch_epoch(&self) -> Option<u64> {
        self.is_batching().then(|| self.inner.batch_epoch.get())
    }

    pub(crate) fn enqueue(&self, job: Job) {
        self.inner.queue.borrow_mut().push_back(job);
    }

    pub(crate) fn enqueue_derived(&self, job: Job) {
        self.inner.derived.borrow_mut().push_back(job);
    }

    pub(crate) fn flush(&self) {
        if self.is_batching() || self.inner.flushing.replace(true) {
            return;
        }
        let _guard = CellGuard {
            cell: &self.inner.flushing,
            restore: false,
        };
        loop {
            let job = self.inner.derived.borrow_mut().pop_front();
            let job = job.or_else(|| self.inner.queue.borrow_mut().pop_front());
            let Some(job) = job else { break };
            job();
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("pending", &self.pending())
            .field("flushing", &self.inner.flushing.get())
            .field("batch_depth", &self.inner.batch_depth.get())
            .finish()
    }
}
