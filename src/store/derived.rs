use super::sealed;
use super::{Dependent, Readable, Store, Subscription};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// A read-only value recomputed from one or more sources.
///
/// The compute function must be pure. It runs once at construction and then
/// whenever a source changes; if several sources change in the same batch it
/// runs once, after all of them have delivered.
pub struct Derived<T> {
    core: Rc<DerivedCore<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

struct DerivedCore<T> {
    output: Store<T>,
    /// One bit per source with a publish in flight.
    pending: Cell<u32>,
    dirty: Cell<bool>,
    compute: Box<dyn Fn() -> T>,
    links: RefCell<Vec<Subscription>>,
}

trait Node {
    fn invalidate(&self, bit: u32);
    fn settle(&self, bit: u32);
    fn mark_dirty(&self);
}

struct Link {
    node: Weak<dyn Node>,
    bit: u32,
}

impl Dependent for Link {
    fn invalidate(&self) {
        if let Some(node) = self.node.upgrade() {
            node.invalidate(self.bit);
        }
    }

    fn settle(&self) {
        if let Some(node) = self.node.upgrade() {
            node.settle(self.bit);
        }
    }
}

impl<T: Clone + PartialEq + 'static> Node for DerivedCore<T> {
    fn invalidate(&self, bit: u32) {
        let before = self.pending.get();
        self.pending.set(before | bit);
        if before == 0 {
            self.output.invalidate_dependents();
        }
    }

    fn settle(&self, bit: u32) {
        let before = self.pending.get();
        let rest = before & !bit;
        self.pending.set(rest);
        if rest != 0 {
            return;
        }
        if self.dirty.replace(false) {
            trace!(view = self.output.label(), "recomputing");
            if self.output.set((self.compute)()) {
                return;
            }
        }
        if before != 0 {
            self.output.settle_dependents();
        }
    }

    fn mark_dirty(&self) {
        self.dirty.set(true);
    }
}

impl<T: Clone + PartialEq + 'static> DerivedCore<T> {
    fn link<S: Clone + PartialEq + 'static>(
        self: &Rc<Self>,
        source: &Store<S>,
        bit: u32,
        slot: Rc<RefCell<S>>,
    ) -> Subscription {
        let weak: Weak<Self> = Rc::downgrade(self);
        let node: Weak<dyn Node> = weak.clone();
        let on_change = move |value: &S| {
            *slot.borrow_mut() = value.clone();
            if let Some(core) = weak.upgrade() {
                core.mark_dirty();
                core.settle(bit);
            }
        };
        source.attach(Rc::new(on_change), Some(Rc::new(Link { node, bit })))
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    /// A view over a single source.
    pub fn new<A, SA>(label: &'static str, a: &SA, f: impl Fn(&A) -> T + 'static) -> Self
    where
        A: Clone + PartialEq + 'static,
        SA: Readable<A>,
    {
        let source = a.source();
        let slot = Rc::new(RefCell::new(a.get()));
        let compute = {
            let slot = Rc::clone(&slot);
            move || f(&slot.borrow())
        };
        let core = Self::build(source.runtime(), label, Box::new(compute));
        let link = core.link(source, 0b01, slot);
        core.links.borrow_mut().push(link);
        Self { core }
    }

    /// A view over two sources, recomputed with the latest value of both.
    pub fn combine<A, B, SA, SB>(
        label: &'static str,
        a: &SA,
        b: &SB,
        f: impl Fn(&A, &B) -> T + 'static,
    ) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
        SA: Readable<A>,
        SB: Readable<B>,
    {
        let slot_a = Rc::new(RefCell::new(a.get()));
        let slot_b = Rc::new(RefCell::new(b.get()));
        let compute = {
            let (slot_a, slot_b) = (Rc::clone(&slot_a), Rc::clone(&slot_b));
            move || f(&slot_a.borrow(), &slot_b.borrow())
        };
        let core = Self::build(a.source().runtime(), label, Box::new(compute));
        let link_a = core.link(a.source(), 0b01, slot_a);
        let link_b = core.link(b.source(), 0b10, slot_b);
        core.links.borrow_mut().extend([link_a, link_b]);
        Self { core }
    }

    fn build(
        runtime: &super::Runtime,
        label: &'static str,
        compute: Box<dyn Fn() -> T>,
    ) -> Rc<DerivedCore<T>> {
        let initial = compute();
        Rc::new(DerivedCore {
            output: Store::new_derived(runtime, label, initial),
            pending: Cell::new(0),
            dirty: Cell::new(false),
            compute,
            links: RefCell::new(Vec::new()),
        })
    }

    pub fn label(&self) -> &'static str {
        self.core.output.label()
    }
}

impl<T> sealed::Source<T> for Derived<T> {
    fn source(&self) -> &Store<T> {
        &self.core.output
    }
}

impl<T: Clone + PartialEq + 'static> Readable<T> for Derived<T> {}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("output", &self.core.output)
            .field("pending", &self.core.pending.get())
            .field("sources", &self.core.links.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::Runtime;
    use super::*;

    #[test]
    fn test_single_source_view_follows_source() {
        let runtime = Runtime::new();
        let count = Store::new(&runtime, "count", 2);
        let doubled = Derived::new("doubled", &count, |v: &i32| v * 2);

        assert_eq!(doubled.get(), 4);
        count.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn test_batched_sources_recompute_once() {
        let runtime = Runtime::new();
        let a = Store::new(&runtime, "a", 1);
        let b = Store::new(&runtime, "b", 10);
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let sum = Derived::combine("sum", &a, &b, move |x: &i32, y: &i32| {
            counter.set(counter.get() + 1);
            x + y
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = sum.subscribe(move |v| sink.borrow_mut().push(*v));
        runs.set(0);

        runtime.batch(|| {
            a.set(2);
            b.set(20);
        });

        assert_eq!(runs.get(), 1);
        assert_eq!(*seen.borrow(), vec![11, 22]);
    }

    #[test]
    fn test_unbatched_sources_each_recompute() {
        let runtime = Runtime::new();
        let a = Store::new(&runtime, "a", 1);
        let b = Store::new(&runtime, "b", 10);
        let sum = Derived::combine("sum", &a, &b, |x: &i32, y: &i32| x + y);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = sum.subscribe(move |v| sink.borrow_mut().push(*v));

        a.set(2);
        b.set(20);

        assert_eq!(*seen.borrow(), vec![11, 12, 22]);
    }

    #[test]
    fn test_unchanged_result_does_not_notify() {
        let runtime = Runtime::new();
        let count = Store::new(&runtime, "count", 1);
        let positive = Derived::new("positive", &count, |v: &i32| *v > 0);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let _sub = positive.subscribe(move |_| counter.set(counter.get() + 1));

        count.set(2);
        count.set(3);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_diamond_recomputes_once_with_consistent_inputs() {
        let runtime = Runtime::new();
        let root = Store::new(&runtime, "root", 1);
        let left = Derived::new("left", &root, |v: &i32| v + 1);
        let both = Derived::combine("both", &root, &left, |r: &i32, l: &i32| (*r, *l));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = both.subscribe(move |v| sink.borrow_mut().push(*v));

        root.set(5);

        assert_eq!(*seen.borrow(), vec![(1, 2), (5, 6)]);
    }

    #[test]
    fn test_diamond_settles_when_middle_is_unchanged() {
        let runtime = Runtime::new();
        let root = Store::new(&runtime, "root", 1);
        let sign = Derived::new("sign", &root, |v: &i32| v.signum());
        let both = Derived::combine("both", &root, &sign, |r: &i32, s: &i32| r * s);

        root.set(4);
        assert_eq!(both.get(), 4);
        root.set(-3);
        assert_eq!(both.get(), 3);
    }

    #[test]
    fn test_chained_view_sees_each_write_from_an_observer() {
        let runtime = Runtime::new();
        let trigger = Store::new(&runtime, "trigger", false);
        let root = Store::new(&runtime, "root", 0);
        let doubled = Derived::new("doubled", &root, |v: &i32| v * 2);
        let plus_one = Derived::new("plus_one", &doubled, |v: &i32| v + 1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = plus_one.subscribe(move |v| sink.borrow_mut().push(*v));

        let writer = root.clone();
        let _trigger_sub = trigger.subscribe(move |fired| {
            if *fired {
                writer.set(10);
                writer.set(20);
            }
        });
        trigger.set(true);

        assert_eq!(*seen.borrow(), vec![1, 21, 41]);
    }

    #[test]
    fn test_diamond_stays_consistent_under_nested_writes() {
        let runtime = Runtime::new();
        let trigger = Store::new(&runtime, "trigger", false);
        let root = Store::new(&runtime, "root", 1);
        let left = Derived::new("left", &root, |v: &i32| v + 1);
        let both = Derived::combine("both", &root, &left, |r: &i32, l: &i32| (*r, *l));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = both.subscribe(move |v| sink.borrow_mut().push(*v));

        let writer = root.clone();
        let _trigger_sub = trigger.subscribe(move |fired| {
            if *fired {
                writer.set(5);
                writer.set(8);
            }
        });
        trigger.set(true);

        assert_eq!(*seen.borrow(), vec![(1, 2), (5, 6), (8, 9)]);
    }

    #[test]
    fn test_dropped_view_unsubscribes_from_source() {
        let runtime = Runtime::new();
        let count = Store::new(&runtime, "count", 0);
        let view = Derived::new("copy", &count, |v: &i32| *v);
        assert_eq!(count.observer_count(), 1);

        drop(view);

        assert_eq!(count.observer_count(), 0);
        count.set(1);
    }
}
