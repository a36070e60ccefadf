//! The page surface the components draw on.
//!
//! Components never touch `web_sys` directly; they talk to a [`Stage`]. The
//! browser implementation lives in `web.rs`; [`MemoryStage`] records every
//! call so orchestration can be checked without a DOM.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use crate::error::FxError;

/// Page elements the components depend on, by role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    BootLoader,
    ProgressFill,
    ProgressText,
    Gate,
    Media,
    Collage,
    Slideshow,
    Confetti,
    Balloons,
    Emoji,
    Message,
    MessageContainer,
}

impl Anchor {
    pub const ALL: [Anchor; 12] = [
        Anchor::BootLoader,
        Anchor::ProgressFill,
        Anchor::ProgressText,
        Anchor::Gate,
        Anchor::Media,
        Anchor::Collage,
        Anchor::Slideshow,
        Anchor::Confetti,
        Anchor::Balloons,
        Anchor::Emoji,
        Anchor::Message,
        Anchor::MessageContainer,
    ];

    /// CSS selector of the element in the page markup.
    pub fn selector(self) -> &'static str {
        match self {
            Anchor::BootLoader => "#boot-loader",
            Anchor::ProgressFill => "#progress-fill",
            Anchor::ProgressText => "#progress-text",
            Anchor::Gate => "#tap-screen",
            Anchor::Media => "#bg-music",
            Anchor::Collage => "#collage-background",
            Anchor::Slideshow => "#inline-slideshow",
            Anchor::Confetti => "#confetti",
            Anchor::Balloons => ".balloons-container",
            Anchor::Emoji => "#emoji-layer",
            Anchor::Message => ".birthday-message",
            Anchor::MessageContainer => ".birthday-message-container",
        }
    }
}

/// Containers that hold ephemeral effect elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Confetti,
    Balloons,
    Emoji,
}

impl Layer {
    pub fn anchor(self) -> Anchor {
        match self {
            Layer::Confetti => Anchor::Confetti,
            Layer::Balloons => Anchor::Balloons,
            Layer::Emoji => Anchor::Emoji,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    Percent(f64),
    Px(f64),
}

impl Length {
    pub fn css(self) -> String {
        match self {
            Length::Percent(v) => format!("{v}%"),
            Length::Px(v) => format!("{v}px"),
        }
    }
}

/// Visual parameters of one transient element.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectElement {
    pub class: &'static str,
    pub glyph: Option<&'static str>,
    pub left: Length,
    pub bottom: Option<Length>,
    pub font_size_rem: Option<f64>,
    pub rotation_deg: Option<f64>,
    pub delay_s: Option<f64>,
    pub duration_s: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Completion callback of an asynchronous media start.
pub type PlayDone = Box<dyn FnOnce(Result<(), FxError>)>;

pub trait Stage {
    fn has(&self, anchor: Anchor) -> bool;
    fn viewport(&self) -> Viewport;

    fn set_progress(&self, label: &str, percent: u8);
    /// Make the gate visible, stacked above the boot layer.
    fn reveal_gate(&self);
    fn hide_gate(&self);
    fn fade_boot_layer(&self);
    fn remove_boot_layer(&self);

    /// Start the media element. `done` runs once playback starts or is refused.
    fn play_media(&self, done: PlayDone);
    fn pause_media(&self);
    fn media_paused(&self) -> bool;
    /// User-visible notice (an alert in the browser).
    fn notify(&self, message: &str);

    /// Replace the collage contents with one tile per entry.
    fn fill_collage(&self, tiles: &[&str]);
    /// Warm the browser cache at low priority.
    fn preload(&self, urls: &[String]);
    /// Replace the slideshow contents; returns the number of slides built.
    fn build_slides(&self, urls: &[String]) -> usize;
    fn set_slide_active(&self, index: usize, active: bool);

    fn set_message_font(&self, rem: f64);
    fn set_message_glow(&self, on: bool);
    /// Re-skin the balloons already present in the markup; `dress` yields a
    /// glyph and an animation delay in seconds per balloon.
    fn dress_balloons(&self, dress: &mut dyn FnMut() -> (&'static str, f64));

    fn spawn(&self, layer: Layer, element: &EffectElement) -> Option<ElementId>;
    /// Detach an element. Returns false if it was already gone.
    fn despawn(&self, id: ElementId) -> bool;
}

/// Recording [`Stage`] for tests and headless runs.
pub struct MemoryStage {
    anchors: RefCell<HashSet<Anchor>>,
    viewport: Cell<Viewport>,
    pub progress: RefCell<Vec<(String, u8)>>,
    pub gate_visible: Cell<bool>,
    pub gate_raised: Cell<bool>,
    pub boot_faded: Cell<bool>,
    pub boot_removed: Cell<bool>,
    pub play_calls: Cell<u32>,
    pub pause_calls: Cell<u32>,
    reject_play: Cell<bool>,
    hold_play: Cell<bool>,
    held: RefCell<Option<PlayDone>>,
    paused: Cell<bool>,
    pub notices: RefCell<Vec<String>>,
    pub collage: RefCell<Vec<String>>,
    pub collage_builds: Cell<u32>,
    pub preloaded: RefCell<Vec<String>>,
    pub slides: RefCell<Vec<bool>>,
    pub message_font: Cell<Option<f64>>,
    pub message_glow: Cell<bool>,
    static_balloons: Cell<usize>,
    pub dressed: RefCell<Vec<(&'static str, f64)>>,
    next_id: Cell<u64>,
    elements: RefCell<BTreeMap<ElementId, (Layer, EffectElement)>>,
    pub spawned_total: Cell<u64>,
}

impl Default for MemoryStage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStage {
    /// Every anchor present, 1024×768 viewport, playback accepted.
    pub fn new() -> Self {
        Self {
            anchors: RefCell::new(Anchor::ALL.into_iter().collect()),
            viewport: Cell::new(Viewport { width: 1024.0, height: 768.0 }),
            progress: RefCell::new(Vec::new()),
            gate_visible: Cell::new(false),
            gate_raised: Cell::new(false),
            boot_faded: Cell::new(false),
            boot_removed: Cell::new(false),
            play_calls: Cell::new(0),
            pause_calls: Cell::new(0),
            reject_play: Cell::new(false),
            hold_play: Cell::new(false),
            held: RefCell::new(None),
            paused: Cell::new(true),
            notices: RefCell::new(Vec::new()),
            collage: RefCell::new(Vec::new()),
            collage_builds: Cell::new(0),
            preloaded: RefCell::new(Vec::new()),
            slides: RefCell::new(Vec::new()),
            message_font: Cell::new(None),
            message_glow: Cell::new(false),
            static_balloons: Cell::new(0),
            dressed: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            elements: RefCell::new(BTreeMap::new()),
            spawned_total: Cell::new(0),
        }
    }

    pub fn without(self, anchor: Anchor) -> Self {
        self.anchors.borrow_mut().remove(&anchor);
        self
    }

    pub fn with_viewport(self, width: f64, height: f64) -> Self {
        self.viewport.set(Viewport { width, height });
        self
    }

    pub fn with_static_balloons(self, n: usize) -> Self {
        self.static_balloons.set(n);
        self
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.viewport.set(Viewport { width, height });
    }

    /// Make subsequent `play_media` calls fail the way autoplay policy does.
    pub fn reject_playback(&self, reject: bool) {
        self.reject_play.set(reject);
    }

    /// Keep later `play_media` calls in flight until [`Self::settle_playback`].
    pub fn hold_playback(&self, hold: bool) {
        self.hold_play.set(hold);
    }

    /// Resolve the held `play_media` call. Returns false if none was held.
    pub fn settle_playback(&self) -> bool {
        let held = self.held.borrow_mut().take();
        match held {
            Some(done) => {
                self.finish_play(done);
                true
            }
            None => false,
        }
    }

    fn finish_play(&self, done: PlayDone) {
        if self.reject_play.get() {
            done(Err(FxError::PlaybackRejected("NotAllowedError".into())));
        } else {
            self.paused.set(false);
            done(Ok(()));
        }
    }

    pub fn live(&self, layer: Layer) -> usize {
        self.elements.borrow().values().filter(|(l, _)| *l == layer).count()
    }

    pub fn elements(&self, layer: Layer) -> Vec<EffectElement> {
        self.elements
            .borrow()
            .values()
            .filter(|(l, _)| *l == layer)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn active_slides(&self) -> Vec<usize> {
        self.slides
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(i, on)| on.then_some(i))
            .collect()
    }
}

impl Stage for MemoryStage {
    fn has(&self, anchor: Anchor) -> bool {
        self.anchors.borrow().contains(&anchor)
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn set_progress(&self, label: &str, percent: u8) {
        self.progress.borrow_mut().push((label.to_string(), percent));
    }

    fn reveal_gate(&self) {
        if self.has(Anchor::Gate) {
            self.gate_visible.set(true);
            self.gate_raised.set(true);
        }
    }

    fn hide_gate(&self) {
        self.gate_visible.set(false);
    }

    fn fade_boot_layer(&self) {
        self.boot_faded.set(true);
    }

    fn remove_boot_layer(&self) {
        self.boot_removed.set(true);
    }

    fn play_media(&self, done: PlayDone) {
        self.play_calls.set(self.play_calls.get() + 1);
        if self.hold_play.get() {
            *self.held.borrow_mut() = Some(done);
        } else {
            self.finish_play(done);
        }
    }

    fn pause_media(&self) {
        self.pause_calls.set(self.pause_calls.get() + 1);
        self.paused.set(true);
    }

    fn media_paused(&self) -> bool {
        self.paused.get()
    }

    fn notify(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }

    fn fill_collage(&self, tiles: &[&str]) {
        self.collage_builds.set(self.collage_builds.get() + 1);
        *self.collage.borrow_mut() = tiles.iter().map(|t| t.to_string()).collect();
    }

    fn preload(&self, urls: &[String]) {
        self.preloaded.borrow_mut().extend(urls.iter().cloned());
    }

    fn build_slides(&self, urls: &[String]) -> usize {
        *self.slides.borrow_mut() = urls.iter().enumerate().map(|(i, _)| i == 0).collect();
        urls.len()
    }

    fn set_slide_active(&self, index: usize, active: bool) {
        if let Some(slot) = self.slides.borrow_mut().get_mut(index) {
            *slot = active;
        }
    }

    fn set_message_font(&self, rem: f64) {
        self.message_font.set(Some(rem));
    }

    fn set_message_glow(&self, on: bool) {
        self.message_glow.set(on);
    }

    fn dress_balloons(&self, dress: &mut dyn FnMut() -> (&'static str, f64)) {
        let mut dressed = self.dressed.borrow_mut();
        dressed.clear();
        for _ in 0..self.static_balloons.get() {
            dressed.push(dress());
        }
    }

    fn spawn(&self, layer: Layer, element: &EffectElement) -> Option<ElementId> {
        if !self.has(layer.anchor()) {
            return None;
        }
        let id = ElementId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.spawned_total.set(self.spawned_total.get() + 1);
        self.elements.borrow_mut().insert(id, (layer, element.clone()));
        Some(id)
    }

    fn despawn(&self, id: ElementId) -> bool {
        self.elements.borrow_mut().remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn despawn_is_defensive() {
        let stage = MemoryStage::new();
        let el = EffectElement {
            class: "confetti-piece",
            glyph: None,
            left: Length::Percent(10.0),
            bottom: None,
            font_size_rem: None,
            rotation_deg: None,
            delay_s: None,
            duration_s: 2.0,
        };
        let id = stage.spawn(Layer::Confetti, &el).unwrap();
        assert_eq!(stage.live(Layer::Confetti), 1);
        assert!(stage.despawn(id));
        assert!(!stage.despawn(id));
        assert_eq!(stage.live(Layer::Confetti), 0);
    }

    #[test]
    fn spawn_into_missing_layer_is_refused() {
        let stage = MemoryStage::new().without(Anchor::Emoji);
        let el = EffectElement {
            class: "emoji-item",
            glyph: Some("🎉"),
            left: Length::Px(3.0),
            bottom: Some(Length::Px(-20.0)),
            font_size_rem: None,
            rotation_deg: None,
            delay_s: None,
            duration_s: 3.0,
        };
        assert!(stage.spawn(Layer::Emoji, &el).is_none());
    }

    #[test]
    fn lengths_render_as_css() {
        assert_eq!(Length::Percent(12.5).css(), "12.5%");
        assert_eq!(Length::Px(-20.0).css(), "-20px");
    }
}
