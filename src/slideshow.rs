//! Inline slideshow: one active slide at a time, advancing on a fixed
//! interval and wrapping forever.

use std::cell::Cell;
use std::rc::Rc;

use crate::scheduler::{Scheduler, TimerId};
use crate::stage::Stage;

pub fn next_index(current: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (current + 1) % len }
}

/// Active index after `ticks` advances from a fresh start.
pub fn index_after(ticks: u64, len: usize) -> usize {
    if len == 0 { 0 } else { (ticks % len as u64) as usize }
}

pub struct Slideshow {
    stage: Rc<dyn Stage>,
    scheduler: Rc<dyn Scheduler>,
    interval_ms: u32,
    len: Cell<usize>,
    index: Cell<usize>,
    timer: Cell<Option<TimerId>>,
}

impl Slideshow {
    pub fn new(stage: Rc<dyn Stage>, scheduler: Rc<dyn Scheduler>, interval_ms: u32) -> Rc<Self> {
        Rc::new(Self {
            stage,
            scheduler,
            interval_ms,
            len: Cell::new(0),
            index: Cell::new(0),
            timer: Cell::new(None),
        })
    }

    /// Populate the slideshow container, first slide active.
    pub fn build(&self, urls: &[String]) {
        let built = self.stage.build_slides(urls);
        self.len.set(built);
        self.index.set(0);
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    pub fn active(&self) -> usize {
        self.index.get()
    }

    pub fn is_running(&self) -> bool {
        self.timer.get().is_some()
    }

    /// (Re)start from the first slide. Any running interval is cleared
    /// before the new one is armed.
    pub fn start(self: &Rc<Self>) {
        if let Some(old) = self.timer.take() {
            self.scheduler.clear(old);
        }
        let len = self.len.get();
        if len == 0 {
            return;
        }
        let current = self.index.replace(0);
        if current != 0 {
            self.stage.set_slide_active(current, false);
            self.stage.set_slide_active(0, true);
        }
        let this = self.clone();
        let id = self
            .scheduler
            .set_interval(self.interval_ms, Box::new(move || this.advance()));
        self.timer.set(Some(id));
    }

    fn advance(&self) {
        let len = self.len.get();
        let current = self.index.get();
        let next = next_index(current, len);
        self.stage.set_slide_active(current, false);
        self.stage.set_slide_active(next, true);
        self.index.set(next);
    }
}
