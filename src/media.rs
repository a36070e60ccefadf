//! Background music state.
//!
//! The media element is shared between the gate (first start) and tab
//! visibility (pause / resume). Every write checks the current state first so
//! a hidden tab never pauses silence and a visible tab never resumes music
//! the user has not started yet. A start that settles after the tab was hidden
//! is paused straight away.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::log::{cerror, clog};
use crate::stage::{Anchor, Stage};

pub const RETRY_NOTICE: &str = "Please tap again to start music 🎶";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    /// `play()` was issued and has not settled yet.
    Starting,
    Playing,
    Paused,
}

pub struct MediaPlayback {
    stage: Rc<dyn Stage>,
    state: Cell<PlaybackState>,
    /// A start was refused; the next user gesture should try again.
    retry_pending: Cell<bool>,
    hidden: Cell<bool>,
    me: Weak<MediaPlayback>,
}

impl MediaPlayback {
    pub fn new(stage: Rc<dyn Stage>) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            stage,
            state: Cell::new(PlaybackState::Stopped),
            retry_pending: Cell::new(false),
            hidden: Cell::new(false),
            me: me.clone(),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending.get()
    }

    /// Start playback. Must be called from inside a user gesture handler for
    /// browsers to allow it.
    pub fn start(&self) {
        if !self.stage.has(Anchor::Media) {
            return;
        }
        if matches!(self.state.get(), PlaybackState::Starting | PlaybackState::Playing) {
            return;
        }
        self.retry_pending.set(false);
        self.state.set(PlaybackState::Starting);
        let me = self.me.clone();
        self.stage.play_media(Box::new(move |result| {
            let Some(this) = me.upgrade() else { return };
            match result {
                Ok(()) => {
                    this.started();
                    clog("music started");
                }
                Err(err) => {
                    this.state.set(PlaybackState::Stopped);
                    this.retry_pending.set(true);
                    cerror(&format!("music play blocked: {err}"));
                    this.stage.notify(RETRY_NOTICE);
                }
            }
        }));
    }

    /// Retry a refused start. No-op unless a retry is pending.
    pub fn retry(&self) -> bool {
        if !self.retry_pending.get() {
            return false;
        }
        self.start();
        true
    }

    /// Tab visibility changed.
    pub fn on_visibility(&self, visible: bool) {
        self.hidden.set(!visible);
        if !self.stage.has(Anchor::Media) {
            return;
        }
        match (visible, self.state.get()) {
            (false, PlaybackState::Playing) => {
                self.stage.pause_media();
                self.state.set(PlaybackState::Paused);
            }
            (true, PlaybackState::Paused) if self.stage.media_paused() => {
                self.state.set(PlaybackState::Starting);
                let me = self.me.clone();
                self.stage.play_media(Box::new(move |result| {
                    let Some(this) = me.upgrade() else { return };
                    match result {
                        Ok(()) => this.started(),
                        // Back to Paused; the next visibility change tries again.
                        Err(err) => {
                            this.state.set(PlaybackState::Paused);
                            cerror(&format!("could not resume music: {err}"));
                        }
                    }
                }));
            }
            _ => {}
        }
    }

    /// A `play()` settled successfully.
    fn started(&self) {
        if self.hidden.get() {
            self.stage.pause_media();
            self.state.set(PlaybackState::Paused);
        } else {
            self.state.set(PlaybackState::Playing);
        }
    }
}
