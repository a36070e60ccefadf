//! Boot loader: a scripted progress bar that plays once per page load and
//! then hands the page over to the gesture gate.
//!
//! Stepping is driven purely by elapsed time. Each step paints its label and
//! percentage, then waits `total_ms / steps` before the next one. After the
//! last step and a short pause the gate is revealed above the loader, the
//! handoff callback runs, and the loader fades out and leaves layout.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::BootConfig;
use crate::log::{clog, cwarn};
use crate::scheduler::Scheduler;
use crate::stage::{Anchor, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootPhase {
    Idle,
    Stepping(usize),
    HandingOff,
    Done,
}

/// Time spent on each step.
pub fn step_delay_ms(total_ms: u32, steps: usize) -> u32 {
    if steps == 0 {
        0
    } else {
        total_ms / steps as u32
    }
}

pub struct BootSequence {
    stage: Rc<dyn Stage>,
    scheduler: Rc<dyn Scheduler>,
    config: BootConfig,
    phase: Cell<BootPhase>,
    handoff: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl BootSequence {
    /// `handoff` runs once the gate has been revealed. Without one the page
    /// stops at the revealed gate.
    pub fn new(
        stage: Rc<dyn Stage>,
        scheduler: Rc<dyn Scheduler>,
        config: BootConfig,
        handoff: Option<Box<dyn FnOnce()>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            stage,
            scheduler,
            config,
            phase: Cell::new(BootPhase::Idle),
            handoff: RefCell::new(handoff),
        })
    }

    pub fn phase(&self) -> BootPhase {
        self.phase.get()
    }

    /// Begin stepping. Returns false (and does nothing) if the loader markup
    /// is missing or the sequence already ran.
    pub fn start(self: &Rc<Self>) -> bool {
        if self.phase.get() != BootPhase::Idle {
            return false;
        }
        let required = [Anchor::BootLoader, Anchor::ProgressFill, Anchor::ProgressText];
        if let Some(missing) = required.iter().find(|a| !self.stage.has(**a)) {
            clog(&format!("boot loader skipped: no {}", missing.selector()));
            return false;
        }
        self.step(0);
        true
    }

    fn step(self: &Rc<Self>, index: usize) {
        let this = self.clone();
        match self.config.steps.get(index) {
            Some(step) => {
                self.phase.set(BootPhase::Stepping(index));
                self.stage.set_progress(&step.label, step.progress.min(100));
                let delay = step_delay_ms(self.config.total_ms, self.config.steps.len());
                self.scheduler
                    .set_timeout(delay, Box::new(move || this.step(index + 1)));
            }
            None => {
                self.phase.set(BootPhase::HandingOff);
                self.scheduler
                    .set_timeout(self.config.handoff_delay_ms, Box::new(move || this.hand_off()));
            }
        }
    }

    fn hand_off(self: &Rc<Self>) {
        // Gate goes up first so it covers the page while the loader fades.
        self.stage.reveal_gate();
        let handoff = self.handoff.borrow_mut().take();
        match handoff {
            Some(handoff) => handoff(),
            None => cwarn("boot finished without a gate handoff"),
        }
        self.stage.fade_boot_layer();
        let this = self.clone();
        self.scheduler.set_timeout(
            self.config.fade_ms,
            Box::new(move || {
                this.stage.remove_boot_layer();
                this.phase.set(BootPhase::Done);
            }),
        );
    }
}
