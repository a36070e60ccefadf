//! Timer seam. Every delay in the crate (boot stepping, debounce, effect
//! lifetimes, recurring spawns) goes through [`Scheduler`], so the browser
//! implementation can be swapped for [`VirtualScheduler`] and driven by hand.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

pub trait Scheduler {
    /// Run `f` once after `delay_ms`.
    fn set_timeout(&self, delay_ms: u32, f: Box<dyn FnOnce()>) -> TimerId;
    /// Run `f` every `period_ms` until cleared.
    fn set_interval(&self, period_ms: u32, f: Box<dyn FnMut()>) -> TimerId;
    /// Cancel a pending timeout or a recurring interval. Unknown ids are ignored.
    fn clear(&self, id: TimerId);
    /// Milliseconds on this scheduler's clock.
    fn now_ms(&self) -> f64;
}

enum Task {
    Once(Box<dyn FnOnce()>),
    Every(u32, Box<dyn FnMut()>),
}

// (due, insertion sequence): equal deadlines fire in scheduling order.
type Slot = (u64, u64);

#[derive(Default)]
struct Queue {
    now: u64,
    seq: u64,
    next_id: u64,
    tasks: BTreeMap<Slot, (TimerId, Task)>,
    // Live timers. An interval stays here while its callback runs so that a
    // `clear` from inside the callback is seen when it would re-arm.
    live: HashMap<TimerId, Slot>,
}

impl Queue {
    fn insert(&mut self, id: TimerId, due: u64, task: Task) {
        self.seq += 1;
        let slot = (due, self.seq);
        self.tasks.insert(slot, (id, task));
        self.live.insert(id, slot);
    }

    fn alloc(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }
}

/// Deterministic scheduler with a manually advanced millisecond clock.
#[derive(Default)]
pub struct VirtualScheduler {
    queue: RefCell<Queue>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `ms`, firing every timer that comes due on the
    /// way, in deadline order. Timers scheduled by callbacks fire in the same
    /// call if they fall inside the window.
    pub fn advance(&self, ms: u64) {
        let target = self.queue.borrow().now + ms;
        loop {
            let next = {
                let mut q = self.queue.borrow_mut();
                let due_now = q
                    .tasks
                    .first_key_value()
                    .is_some_and(|(&(due, _), _)| due <= target);
                if due_now {
                    q.tasks.pop_first().map(|(slot, entry)| {
                        q.now = slot.0;
                        entry
                    })
                } else {
                    None
                }
            };
            let Some((id, task)) = next else { break };
            match task {
                Task::Once(f) => {
                    self.queue.borrow_mut().live.remove(&id);
                    f();
                }
                Task::Every(period, mut f) => {
                    f();
                    let mut q = self.queue.borrow_mut();
                    if q.live.contains_key(&id) {
                        let due = q.now + u64::from(period);
                        q.insert(id, due, Task::Every(period, f));
                    }
                }
            }
        }
        self.queue.borrow_mut().now = target;
    }

    /// Number of armed timers (timeouts not yet fired plus live intervals).
    pub fn pending(&self) -> usize {
        self.queue.borrow().live.len()
    }

    /// Number of armed recurring intervals.
    pub fn intervals(&self) -> usize {
        self.queue
            .borrow()
            .tasks
            .values()
            .filter(|(_, t)| matches!(t, Task::Every(..)))
            .count()
    }
}

impl Scheduler for VirtualScheduler {
    fn set_timeout(&self, delay_ms: u32, f: Box<dyn FnOnce()>) -> TimerId {
        let mut q = self.queue.borrow_mut();
        let id = q.alloc();
        let due = q.now + u64::from(delay_ms);
        q.insert(id, due, Task::Once(f));
        id
    }

    fn set_interval(&self, period_ms: u32, f: Box<dyn FnMut()>) -> TimerId {
        // A zero period would spin `advance` forever.
        let period = period_ms.max(1);
        let mut q = self.queue.borrow_mut();
        let id = q.alloc();
        let due = q.now + u64::from(period);
        q.insert(id, due, Task::Every(period, f));
        id
    }

    fn clear(&self, id: TimerId) {
        let mut q = self.queue.borrow_mut();
        if let Some(slot) = q.live.remove(&id) {
            q.tasks.remove(&slot);
        }
    }

    fn now_ms(&self) -> f64 {
        self.queue.borrow().now as f64
    }
}
