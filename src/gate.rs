//! Tap-to-start gate.
//!
//! Browsers refuse audio until the user interacts with the page, so the page
//! sits behind a full-screen prompt until the first tap. That tap hides the
//! prompt, starts the music and runs the app initializer. `arm` is the one
//! entry point for showing the gate; `on_gesture` unlocks at most once no
//! matter how many listeners or event types deliver gestures.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::log::clog;
use crate::media::MediaPlayback;
use crate::stage::{Anchor, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

pub struct GestureGate {
    stage: Rc<dyn Stage>,
    media: Rc<MediaPlayback>,
    state: Cell<GateState>,
    armed: Cell<bool>,
    gestures: Cell<u32>,
    on_unlock: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl GestureGate {
    pub fn new(
        stage: Rc<dyn Stage>,
        media: Rc<MediaPlayback>,
        on_unlock: Box<dyn FnOnce()>,
    ) -> Rc<Self> {
        Rc::new(Self {
            stage,
            media,
            state: Cell::new(GateState::Locked),
            armed: Cell::new(false),
            gestures: Cell::new(0),
            on_unlock: RefCell::new(Some(on_unlock)),
        })
    }

    pub fn state(&self) -> GateState {
        self.state.get()
    }

    /// Gestures delivered so far, including ignored ones.
    pub fn gestures(&self) -> u32 {
        self.gestures.get()
    }

    /// Show the prompt. Returns true only on the call that armed the gate;
    /// the caller attaches gesture listeners exactly then.
    pub fn arm(&self) -> bool {
        if self.armed.get() || self.state.get() == GateState::Unlocked {
            return false;
        }
        if !self.stage.has(Anchor::Gate) || !self.stage.has(Anchor::Media) {
            clog("tap gate skipped: markup incomplete");
            return false;
        }
        self.stage.reveal_gate();
        self.armed.set(true);
        true
    }

    /// A qualifying gesture reached the gate. Returns true for the gesture
    /// that unlocked it, false for every later one.
    pub fn on_gesture(&self) -> bool {
        self.gestures.set(self.gestures.get() + 1);
        if self.state.get() == GateState::Unlocked {
            return false;
        }
        self.state.set(GateState::Unlocked);
        self.stage.hide_gate();
        self.media.start();
        let on_unlock = self.on_unlock.borrow_mut().take();
        if let Some(f) = on_unlock {
            f();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::MemoryStage;

    fn gate(stage: &Rc<MemoryStage>, count: &Rc<Cell<u32>>) -> Rc<GestureGate> {
        let media = MediaPlayback::new(stage.clone());
        let c = count.clone();
        GestureGate::new(stage.clone(), media, Box::new(move || c.set(c.get() + 1)))
    }

    #[test]
    fn five_taps_unlock_once() {
        let stage = Rc::new(MemoryStage::new());
        let inits = Rc::new(Cell::new(0));
        let g = gate(&stage, &inits);
        assert!(g.arm());
        assert!(stage.gate_visible.get());
        let unlocked: Vec<bool> = (0..5).map(|_| g.on_gesture()).collect();
        assert_eq!(unlocked, vec![true, false, false, false, false]);
        assert_eq!(g.gestures(), 5);
        assert_eq!(inits.get(), 1);
        assert_eq!(stage.play_calls.get(), 1);
        assert!(!stage.gate_visible.get());
        assert_eq!(g.state(), GateState::Unlocked);
    }

    #[test]
    fn arm_is_idempotent() {
        let stage = Rc::new(MemoryStage::new());
        let inits = Rc::new(Cell::new(0));
        let g = gate(&stage, &inits);
        assert!(g.arm());
        assert!(!g.arm());
        g.on_gesture();
        assert!(!g.arm());
    }

    #[test]
    fn incomplete_markup_does_not_arm() {
        let stage = Rc::new(MemoryStage::new().without(Anchor::Media));
        let inits = Rc::new(Cell::new(0));
        let g = gate(&stage, &inits);
        assert!(!g.arm());
        assert!(!stage.gate_visible.get());
    }

    #[test]
    fn rejected_playback_still_initializes() {
        let stage = Rc::new(MemoryStage::new());
        stage.reject_playback(true);
        let inits = Rc::new(Cell::new(0));
        let g = gate(&stage, &inits);
        g.arm();
        assert!(g.on_gesture());
        assert_eq!(inits.get(), 1);
        assert_eq!(stage.notices.borrow().len(), 1);
    }
}
