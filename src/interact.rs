//! Keyboard, click and touch reactions. All of them stay quiet until the app
//! has been initialized by the gate.

use std::cell::Cell;
use std::rc::Rc;

use crate::app::App;
use crate::media::MediaPlayback;
use crate::scheduler::Scheduler;
use crate::stage::Stage;

pub struct Interactions {
    app: Rc<App>,
    media: Rc<MediaPlayback>,
    stage: Rc<dyn Stage>,
    scheduler: Rc<dyn Scheduler>,
    last_click_ms: Cell<Option<f64>>,
}

impl Interactions {
    pub fn new(
        app: Rc<App>,
        media: Rc<MediaPlayback>,
        stage: Rc<dyn Stage>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Rc<Self> {
        Rc::new(Self { app, media, stage, scheduler, last_click_ms: Cell::new(None) })
    }

    /// Returns true when the browser default for the key should be suppressed.
    pub fn on_key(&self, key: &str) -> bool {
        if !self.app.is_initialized() {
            return false;
        }
        let tuning = self.app.config().interactions;
        match key {
            "c" | "C" => {
                self.app.confetti.spawn(tuning.key_burst);
                false
            }
            " " => {
                self.flash_message(tuning.flash_ms);
                self.app.confetti.spawn(tuning.space_burst);
                true
            }
            _ => false,
        }
    }

    /// Document click. Clicks on the control strip are ignored; the rest are
    /// throttled to one confetti burst per window. A click is also the retry
    /// gesture for music the browser refused to start.
    pub fn on_click(&self, inside_controls: bool) {
        if inside_controls {
            return;
        }
        self.media.retry();
        if !self.app.is_initialized() {
            return;
        }
        let tuning = self.app.config().interactions;
        let now = self.scheduler.now_ms();
        let ready = self
            .last_click_ms
            .get()
            .is_none_or(|last| now - last > f64::from(tuning.click_throttle_ms));
        if ready {
            self.app.confetti.spawn(tuning.click_burst);
            self.last_click_ms.set(Some(now));
        }
    }

    /// Touch anywhere inside the message container.
    pub fn on_message_touch(&self) {
        if self.app.is_initialized() {
            self.app.confetti.spawn(self.app.config().interactions.touch_burst);
            self.on_message_tap();
        }
    }

    /// Click or touch on the message container.
    pub fn on_message_tap(&self) {
        if self.app.is_initialized() {
            self.app.emoji.spawn(self.app.config().interactions.emoji_tap_burst);
        }
    }

    fn flash_message(&self, ms: u32) {
        self.stage.set_message_glow(true);
        let stage = self.stage.clone();
        self.scheduler
            .set_timeout(ms, Box::new(move || stage.set_message_glow(false)));
    }
}
