//! Ephemeral effects: confetti, balloons and emoji bursts.
//!
//! Each family is an [`Effect`] describing how to draw one randomized unit;
//! [`Spawner`] owns the live units of a family. Every unit is scheduled for
//! removal the moment it is created, so the containers never grow without
//! bound however long the page stays open.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::config::EffectTuning;
use crate::rng::FxRng;
use crate::scheduler::{Scheduler, TimerId};
use crate::stage::{EffectElement, ElementId, Layer, Length, Stage, Viewport};

pub const BALLOON_GLYPHS: [&str; 7] = ["🎈", "🎆", "🎊", "✨", "🌟", "💫", "🎯"];
/// Glyphs for balloons that ship in the markup.
pub const STATIC_BALLOON_GLYPHS: [&str; 5] = ["🎈", "🎆", "🎊", "✨", "🌟"];
pub const EMOJI_GLYPHS: [&str; 10] = ["🎉", "🎊", "✨", "🎈", "🎁", "🥳", "🎂", "💖", "🌟", "💫"];

pub trait Effect {
    const LAYER: Layer;
    fn sample(rng: &FxRng, viewport: Viewport) -> EffectElement;
}

/// Left 0–100 %, delay 0–2 s, fall 2–4 s, rotation 0–360°.
pub struct Confetti;

impl Effect for Confetti {
    const LAYER: Layer = Layer::Confetti;

    fn sample(rng: &FxRng, _viewport: Viewport) -> EffectElement {
        EffectElement {
            class: "confetti-piece",
            glyph: None,
            left: Length::Percent(rng.range(0.0, 100.0)),
            bottom: None,
            font_size_rem: None,
            rotation_deg: Some(rng.range(0.0, 360.0)),
            delay_s: Some(rng.range(0.0, 2.0)),
            duration_s: rng.range(2.0, 4.0),
        }
    }
}

/// Left 0–90 %, size 2–4 rem, rise 6–10 s.
pub struct Balloon;

impl Effect for Balloon {
    const LAYER: Layer = Layer::Balloons;

    fn sample(rng: &FxRng, _viewport: Viewport) -> EffectElement {
        EffectElement {
            class: "balloon",
            glyph: rng.pick(&BALLOON_GLYPHS).copied(),
            left: Length::Percent(rng.range(0.0, 90.0)),
            bottom: None,
            font_size_rem: Some(rng.range(2.0, 4.0)),
            rotation_deg: None,
            delay_s: None,
            duration_s: rng.range(6.0, 10.0),
        }
    }
}

/// Left anywhere across the viewport in px, starting just below it; float
/// 2.5–4.5 s after a 0–0.5 s delay.
pub struct Emoji;

impl Effect for Emoji {
    const LAYER: Layer = Layer::Emoji;

    fn sample(rng: &FxRng, viewport: Viewport) -> EffectElement {
        EffectElement {
            class: "emoji-item",
            glyph: rng.pick(&EMOJI_GLYPHS).copied(),
            left: Length::Px(rng.range(0.0, viewport.width.max(0.0))),
            bottom: Some(Length::Px(-20.0)),
            font_size_rem: None,
            rotation_deg: None,
            delay_s: Some(rng.range(0.0, 0.5)),
            duration_s: rng.range(2.5, 4.5),
        }
    }
}

pub struct Spawner<E: Effect> {
    stage: Rc<dyn Stage>,
    scheduler: Rc<dyn Scheduler>,
    rng: Rc<FxRng>,
    tuning: EffectTuning,
    live: RefCell<Vec<ElementId>>,
    auto: Cell<Option<TimerId>>,
    _effect: PhantomData<E>,
}

impl<E: Effect + 'static> Spawner<E> {
    pub fn new(
        stage: Rc<dyn Stage>,
        scheduler: Rc<dyn Scheduler>,
        rng: Rc<FxRng>,
        tuning: EffectTuning,
    ) -> Rc<Self> {
        Rc::new(Self {
            stage,
            scheduler,
            rng,
            tuning,
            live: RefCell::new(Vec::new()),
            auto: Cell::new(None),
            _effect: PhantomData,
        })
    }

    /// Number of units currently on the page.
    pub fn live(&self) -> usize {
        self.live.borrow().len()
    }

    /// Release `count` units, staggered by the family's `stagger_ms`.
    pub fn spawn(self: &Rc<Self>, count: u32) {
        if !self.stage.has(E::LAYER.anchor()) {
            return;
        }
        let stagger = self.tuning.stagger_ms;
        for i in 0..count {
            if stagger == 0 {
                self.spawn_one();
            } else {
                let this = self.clone();
                self.scheduler
                    .set_timeout(i.saturating_mul(stagger), Box::new(move || this.spawn_one()));
            }
        }
    }

    fn spawn_one(self: &Rc<Self>) {
        let element = E::sample(&self.rng, self.stage.viewport());
        let Some(id) = self.stage.spawn(E::LAYER, &element) else {
            return;
        };
        self.live.borrow_mut().push(id);
        let this = self.clone();
        self.scheduler.set_timeout(
            self.tuning.lifetime_ms,
            Box::new(move || {
                this.stage.despawn(id);
                this.live.borrow_mut().retain(|x| *x != id);
            }),
        );
    }

    /// Arm the recurring spawn, replacing any previous one. Families without
    /// an auto interval ignore this.
    pub fn start_auto(self: &Rc<Self>) {
        let Some(period) = self.tuning.auto_interval_ms else {
            return;
        };
        if let Some(old) = self.auto.take() {
            self.scheduler.clear(old);
        }
        let this = self.clone();
        let count = self.tuning.auto_count;
        let id = self
            .scheduler
            .set_interval(period, Box::new(move || this.spawn(count)));
        self.auto.set(Some(id));
    }
}

impl Spawner<Balloon> {
    /// Re-skin the balloons that ship in the markup: random glyph and a 0–5 s
    /// animation delay each.
    pub fn dress_static(&self) {
        let rng = &self.rng;
        self.stage.dress_balloons(&mut || {
            let glyph = rng.pick(&STATIC_BALLOON_GLYPHS).copied().unwrap_or("🎈");
            (glyph, rng.range(0.0, 5.0))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FxConfig;
    use crate::scheduler::VirtualScheduler;
    use crate::stage::{Anchor, MemoryStage};

    fn rig(stage: MemoryStage) -> (Rc<MemoryStage>, Rc<VirtualScheduler>, Rc<FxRng>) {
        (Rc::new(stage), Rc::new(VirtualScheduler::new()), Rc::new(FxRng::seeded(11)))
    }

    #[test]
    fn confetti_staggers_and_expires() {
        let (stage, sched, rng) = rig(MemoryStage::new());
        let confetti =
            Spawner::<Confetti>::new(stage.clone(), sched.clone(), rng, FxConfig::default().confetti);
        confetti.spawn(50);
        sched.advance(0);
        assert_eq!(stage.live(Layer::Confetti), 1);
        sched.advance(49 * 50);
        assert_eq!(stage.live(Layer::Confetti), 50);
        assert_eq!(confetti.live(), 50);
        sched.advance(4000);
        assert_eq!(stage.live(Layer::Confetti), 0);
        assert_eq!(confetti.live(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn samples_stay_in_documented_ranges() {
        let rng = FxRng::seeded(5);
        let vp = Viewport { width: 320.0, height: 640.0 };
        for _ in 0..2_000 {
            let c = Confetti::sample(&rng, vp);
            let Length::Percent(left) = c.left else { panic!("confetti left must be %") };
            assert!((0.0..100.0).contains(&left));
            assert!((2.0..4.0).contains(&c.duration_s));
            assert!((0.0..2.0).contains(&c.delay_s.unwrap()));
            assert!((0.0..360.0).contains(&c.rotation_deg.unwrap()));

            let b = Balloon::sample(&rng, vp);
            let Length::Percent(left) = b.left else { panic!("balloon left must be %") };
            assert!((0.0..90.0).contains(&left));
            assert!((6.0..10.0).contains(&b.duration_s));
            assert!((2.0..4.0).contains(&b.font_size_rem.unwrap()));
            assert!(BALLOON_GLYPHS.contains(&b.glyph.unwrap()));

            let e = Emoji::sample(&rng, vp);
            let Length::Px(left) = e.left else { panic!("emoji left must be px") };
            assert!((0.0..320.0).contains(&left));
            assert!((2.5..4.5).contains(&e.duration_s));
            assert!((0.0..0.5).contains(&e.delay_s.unwrap()));
            assert_eq!(e.bottom, Some(Length::Px(-20.0)));
            assert!(EMOJI_GLYPHS.contains(&e.glyph.unwrap()));
        }
    }

    #[test]
    fn emoji_burst_is_immediate() {
        let (stage, sched, rng) = rig(MemoryStage::new());
        let emoji = Spawner::<Emoji>::new(stage.clone(), sched.clone(), rng, FxConfig::default().emoji);
        emoji.spawn(18);
        assert_eq!(stage.live(Layer::Emoji), 18);
        sched.advance(3999);
        assert_eq!(stage.live(Layer::Emoji), 18);
        sched.advance(1);
        assert_eq!(stage.live(Layer::Emoji), 0);
    }

    #[test]
    fn balloon_auto_spawn_stays_bounded() {
        let (stage, sched, rng) = rig(MemoryStage::new());
        let balloons =
            Spawner::<Balloon>::new(stage.clone(), sched.clone(), rng, FxConfig::default().balloons);
        balloons.start_auto();
        balloons.start_auto();
        assert_eq!(sched.intervals(), 1);
        for _ in 0..100 {
            sched.advance(8000);
            // Lifetime 10 s, period 8 s: never more than two on screen.
            assert!(stage.live(Layer::Balloons) <= 2);
        }
        assert_eq!(stage.spawned_total.get(), 100);
    }

    #[test]
    fn missing_container_spawns_nothing() {
        let (stage, sched, rng) = rig(MemoryStage::new().without(Anchor::Confetti));
        let confetti =
            Spawner::<Confetti>::new(stage.clone(), sched.clone(), rng, FxConfig::default().confetti);
        confetti.spawn(10);
        sched.advance(10_000);
        assert_eq!(stage.spawned_total.get(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn confetti_has_no_auto_interval() {
        let (stage, sched, rng) = rig(MemoryStage::new());
        let confetti =
            Spawner::<Confetti>::new(stage, sched.clone(), rng, FxConfig::default().confetti);
        confetti.start_auto();
        assert_eq!(sched.intervals(), 0);
    }

    #[test]
    fn static_balloons_get_dressed() {
        let (stage, sched, rng) = rig(MemoryStage::new().with_static_balloons(6));
        let balloons =
            Spawner::<Balloon>::new(stage.clone(), sched, rng, FxConfig::default().balloons);
        balloons.dress_static();
        let dressed = stage.dressed.borrow();
        assert_eq!(dressed.len(), 6);
        for (glyph, delay) in dressed.iter() {
            assert!(STATIC_BALLOON_GLYPHS.contains(glyph));
            assert!((0.0..5.0).contains(delay));
        }
    }
}
