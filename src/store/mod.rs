//! Observable containers.
//!
//! A [`Store`] holds one value and pushes every change to its observers. A
//! [`Derived`] view recomputes from one or more sources. Everything here is
//! single-threaded: handles are `Rc` based and deliveries run synchronously on
//! the [`Runtime`] that created the store.

mod derived;
mod runtime;

pub use derived::Derived;
pub use runtime::Runtime;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Hooks a derived view installs on its sources so it can hold back
/// recomputation until every source it depends on has delivered.
pub(crate) trait Dependent {
    /// A source has a publish in flight.
    fn invalidate(&self);
    /// A source finished its cycle without changing.
    fn settle(&self);
}

struct Observer<T> {
    id: u64,
    /// Version current when the observer registered; older publishes skip it.
    since: u64,
    on_change: Rc<dyn Fn(&T)>,
    dependent: Option<Rc<dyn Dependent>>,
}

/// A published version and its value, shared between a store and the queued
/// job that delivers it.
type Staged<T> = Rc<RefCell<(u64, Rc<T>)>>;

pub(crate) struct StoreInner<T> {
    label: &'static str,
    runtime: Runtime,
    /// Output of a derived view; publishes go through the runtime's derived lane.
    derived: bool,
    value: RefCell<Rc<T>>,
    version: Cell<u64>,
    observers: RefCell<Vec<Observer<T>>>,
    next_id: Cell<u64>,
    /// Publish jobs enqueued but not yet delivered.
    queued_jobs: Cell<usize>,
    /// The merged publish of the current batch, keyed by batch epoch.
    batch_slot: RefCell<Option<(u64, Staged<T>)>>,
}

/// A writable observable value.
pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Store<T> {
    pub fn new(runtime: &Runtime, label: &'static str, value: T) -> Self {
        Self::build(runtime, label, value, false)
    }

    pub(crate) fn new_derived(runtime: &Runtime, label: &'static str, value: T) -> Self {
        Self::build(runtime, label, value, true)
    }

    fn build(runtime: &Runtime, label: &'static str, value: T, derived: bool) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                label,
                runtime: runtime.clone(),
                derived,
                value: RefCell::new(Rc::new(value)),
                version: Cell::new(0),
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                queued_jobs: Cell::new(0),
                batch_slot: RefCell::new(None),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Replaces the value and publishes it. Returns `false` (and notifies
    /// nobody) when the new value equals the current one.
    ///
    /// Every change is delivered, including several writes made from inside
    /// one observer. Only writes within the same [`Runtime::batch`] merge into
    /// a single publish of the final value.
    pub fn set(&self, value: T) -> bool {
        if **self.inner.value.borrow() == value {
            return false;
        }
        let value = Rc::new(value);
        *self.inner.value.borrow_mut() = Rc::clone(&value);
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        trace!(store = self.inner.label, version, "value changed");

        match self.inner.runtime.batch_epoch() {
            Some(epoch) => {
                // Views wait for every store written in the batch.
                self.inner.invalidate_dependents(version);
                self.stage_batched(epoch, version, value);
            }
            None => self.enqueue_publish(Rc::new(RefCell::new((version, value)))),
        }
        self.inner.runtime.flush();
        true
    }

    /// Computes the next value from the current one and publishes it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let current = Rc::clone(&self.inner.value.borrow());
        self.set(f(&current))
    }

    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly {
            store: self.clone(),
        }
    }

    fn stage_batched(&self, epoch: u64, version: u64, value: Rc<T>) {
        let mut slot = self.inner.batch_slot.borrow_mut();
        if let Some((slot_epoch, staged)) = slot.as_ref() {
            if *slot_epoch == epoch {
                *staged.borrow_mut() = (version, value);
                return;
            }
        }
        let staged = Rc::new(RefCell::new((version, value)));
        *slot = Some((epoch, Rc::clone(&staged)));
        drop(slot);
        self.enqueue_publish(staged);
    }

    fn enqueue_publish(&self, staged: Staged<T>) {
        self.inner.queued_jobs.set(self.inner.queued_jobs.get() + 1);
        let weak = Rc::downgrade(&self.inner);
        let job = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.queued_jobs.set(inner.queued_jobs.get() - 1);
                let (version, value) = staged.borrow().clone();
                inner.publish(version, &value);
            }
        });
        if self.inner.derived {
            self.inner.runtime.enqueue_derived(job);
        } else {
            self.inner.runtime.enqueue(job);
        }
    }

    pub(crate) fn snapshot(&self) -> Rc<T> {
        Rc::clone(&self.inner.value.borrow())
    }

    /// Registers an observer without the immediate initial call.
    pub(crate) fn attach(
        &self,
        on_change: Rc<dyn Fn(&T)>,
        dependent: Option<Rc<dyn Dependent>>,
    ) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.observers.borrow_mut().push(Observer {
            id,
            since: self.inner.version.get(),
            on_change,
            dependent,
        });

        let weak: Weak<StoreInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().retain(|o| o.id != id);
            }
        })
    }

    /// Marks dependents as waiting on this store's next publish.
    pub(crate) fn invalidate_dependents(&self) {
        self.inner.invalidate_dependents(self.inner.version.get() + 1);
    }

    /// Releases dependents that were invalidated by a cycle that ended
    /// without a change. A queued publish will release them instead.
    pub(crate) fn settle_dependents(&self) {
        if self.inner.queued_jobs.get() > 0 {
            return;
        }
        for dependent in self.inner.dependents(u64::MAX) {
            dependent.settle();
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }
}

impl<T: 'static> StoreInner<T> {
    /// Dependents that will receive the publish of `version`.
    fn dependents(&self, version: u64) -> Vec<Rc<dyn Dependent>> {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.since < version)
            .filter_map(|o| o.dependent.clone())
            .collect()
    }

    fn invalidate_dependents(&self, version: u64) {
        for dependent in self.dependents(version) {
            dependent.invalidate();
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.observers.borrow().iter().any(|o| o.id == id)
    }

    fn publish(&self, version: u64, value: &T) {
        self.invalidate_dependents(version);
        let targets: Vec<(u64, Rc<dyn Fn(&T)>)> = self
            .observers
            .borrow()
            .iter()
            .filter(|o| o.since < version)
            .map(|o| (o.id, Rc::clone(&o.on_change)))
            .collect();
        trace!(
            store = self.label,
            version,
            observers = targets.len(),
            "publishing"
        );

        for (id, on_change) in targets {
            if self.is_registered(id) {
                on_change(value);
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.inner.label)
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

/// Read access to a [`Store`] without its write half.
pub struct ReadOnly<T> {
    store: Store<T>,
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnly").field(&self.store).finish()
    }
}

mod sealed {
    pub trait Source<T> {
        fn source(&self) -> &super::Store<T>;
    }
}


/// Anything that can be read and observed: stores, read-only handles and
/// derived views.
pub trait Readable<T: Clone + PartialEq + 'static>: sealed::Source<T> {
    /// Snapshot of the current value.
    fn get(&self) -> T {
        (*self.source().snapshot()).clone()
    }

    /// Borrows the current value without cloning it.
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.source().snapshot())
    }

    /// Calls `observer` now with the current value and then on every change,
    /// until the returned [`Subscription`] is dropped.
    fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let store = self.source();
        let observer: Rc<dyn Fn(&T)> = Rc::new(observer);
        let subscription = store.attach(Rc::clone(&observer), None);
        observer(&store.snapshot());
        subscription
    }
}

impl<T> sealed::Source<T> for Store<T> {
    fn source(&self) -> &Store<T> {
        self
    }
}

impl<T> sealed::Source<T> for ReadOnly<T> {
    fn source(&self) -> &Store<T> {
        &self.store
    }
}

impl<T: Clone + PartialEq + 'static> Readable<T> for Store<T> {}
impl<T: Clone + PartialEq + 'static> Readable<T> for ReadOnly<T> {}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(self) {}

    /// Leaves the observer registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
