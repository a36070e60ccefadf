//! Everything that starts once the gate is passed.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::FxConfig;
use crate::effects::{Balloon, Confetti, Emoji, Spawner};
use crate::layout::LayoutAdjuster;
use crate::log::clog;
use crate::rng::FxRng;
use crate::scheduler::Scheduler;
use crate::slideshow::Slideshow;
use crate::stage::Stage;

pub struct App {
    stage: Rc<dyn Stage>,
    scheduler: Rc<dyn Scheduler>,
    config: FxConfig,
    pub confetti: Rc<Spawner<Confetti>>,
    pub balloons: Rc<Spawner<Balloon>>,
    pub emoji: Rc<Spawner<Emoji>>,
    pub slideshow: Rc<Slideshow>,
    pub layout: Rc<LayoutAdjuster>,
    initialized: Cell<bool>,
}

impl App {
    pub fn new(
        stage: Rc<dyn Stage>,
        scheduler: Rc<dyn Scheduler>,
        rng: Rc<FxRng>,
        config: FxConfig,
    ) -> Rc<Self> {
        let pool: Vec<String> = config.images.iter().take(config.collage_pool).cloned().collect();
        Rc::new(Self {
            confetti: Spawner::new(stage.clone(), scheduler.clone(), rng.clone(), config.confetti),
            balloons: Spawner::new(stage.clone(), scheduler.clone(), rng.clone(), config.balloons),
            emoji: Spawner::new(stage.clone(), scheduler.clone(), rng, config.emoji),
            slideshow: Slideshow::new(stage.clone(), scheduler.clone(), config.slideshow_interval_ms),
            layout: LayoutAdjuster::new(stage.clone(), scheduler.clone(), config.layout, pool),
            stage,
            scheduler,
            config,
            initialized: Cell::new(false),
        })
    }

    pub fn config(&self) -> &FxConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Start collage, effects and slideshow, then schedule the welcome
    /// burst. Later calls do nothing.
    pub fn initialize(self: &Rc<Self>) {
        if self.initialized.replace(true) {
            return;
        }
        self.layout.build_collage();
        if let Some(rest) = self.config.images.get(1..) {
            self.stage.preload(rest);
        }

        self.balloons.dress_static();
        self.balloons.start_auto();
        self.emoji.start_auto();

        self.slideshow.build(&self.config.images);
        self.slideshow.start();

        let confetti = self.confetti.clone();
        let burst = self.config.welcome_burst;
        self.scheduler
            .set_timeout(self.config.welcome_delay_ms, Box::new(move || confetti.spawn(burst)));
        clog("celebration started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::VirtualScheduler;
    use crate::stage::{Layer, MemoryStage};

    fn app(stage: &Rc<MemoryStage>, sched: &Rc<VirtualScheduler>) -> Rc<App> {
        App::new(stage.clone(), sched.clone(), Rc::new(FxRng::seeded(1)), FxConfig::default())
    }

    #[test]
    fn initialize_starts_everything() {
        let stage = Rc::new(MemoryStage::new().with_static_balloons(3));
        let sched = Rc::new(VirtualScheduler::new());
        let app = app(&stage, &sched);
        app.initialize();

        assert!(app.is_initialized());
        assert_eq!(stage.collage.borrow()[..4], ["img1.jpg", "img2.jpg", "img3.jpg", "img4.jpg"]);
        assert_eq!(stage.collage.borrow()[4], "img1.jpg");
        assert_eq!(stage.preloaded.borrow().len(), 13);
        assert_eq!(stage.preloaded.borrow()[0], "img2.jpg");
        assert_eq!(stage.slides.borrow().len(), 14);
        assert_eq!(stage.active_slides(), vec![0]);
        assert_eq!(stage.dressed.borrow().len(), 3);
        // balloons, emoji, slideshow
        assert_eq!(sched.intervals(), 3);
        assert!(app.slideshow.is_running());
    }

    #[test]
    fn welcome_burst_after_one_second() {
        let stage = Rc::new(MemoryStage::new());
        let sched = Rc::new(VirtualScheduler::new());
        let app = app(&stage, &sched);
        app.initialize();
        sched.advance(999);
        assert_eq!(stage.spawned_total.get(), 0);
        sched.advance(1);
        assert_eq!(stage.live(Layer::Confetti), 1);
        sched.advance(99 * 50);
        assert_eq!(stage.spawned_total.get(), 100);
        // Every piece is gone 4 s after the last one landed.
        sched.advance(4000);
        assert_eq!(stage.live(Layer::Confetti), 0);
    }

    #[test]
    fn second_initialize_is_ignored() {
        let stage = Rc::new(MemoryStage::new());
        let sched = Rc::new(VirtualScheduler::new());
        let app = app(&stage, &sched);
        app.initialize();
        app.initialize();
        assert_eq!(stage.collage_builds.get(), 1);
        assert_eq!(sched.intervals(), 3);
        // Before the first emoji wave (6 s) and balloon (8 s): only the
        // single welcome burst has been spawned.
        sched.advance(1000 + 99 * 50);
        assert_eq!(stage.spawned_total.get(), 100);
    }
}
