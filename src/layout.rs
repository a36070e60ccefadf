//! Responsive layout: the background collage grid and the message font size.
//!
//! Recomputation is idempotent. Resize bursts are debounced, orientation
//! changes wait a longer settle delay; both clear their pending timer before
//! re-arming so a burst produces one recomputation.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::LayoutConfig;
use crate::scheduler::{Scheduler, TimerId};
use crate::stage::{Anchor, Stage, Viewport};

/// Viewports at most this wide use the compact tile size.
pub const SMALL_VIEWPORT_PX: f64 = 480.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollageGrid {
    pub tile: u32,
    pub gap: u32,
    pub cols: u32,
    pub rows: u32,
}

impl CollageGrid {
    /// Smallest grid of tiles that covers the whole viewport.
    pub fn fit(viewport: Viewport) -> Self {
        let small = viewport.width <= SMALL_VIEWPORT_PX;
        let (tile, gap) = if small { (60u32, 3u32) } else { (80, 4) };
        let span = f64::from(tile + gap);
        let count = |extent: f64| ((extent - f64::from(gap)) / span).ceil().max(0.0) as u32;
        Self { tile, gap, cols: count(viewport.width), rows: count(viewport.height) }
    }

    pub fn tiles(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

/// Message font size for narrow screens; `None` leaves the stylesheet value.
pub fn message_font_rem(width: f64) -> Option<f64> {
    if width < 400.0 {
        Some(1.8)
    } else if width < 600.0 {
        Some(2.5)
    } else {
        None
    }
}

/// Tile images for a grid: the pool repeated in order until the grid is full.
pub fn collage_tiles<'a>(grid: &CollageGrid, pool: &'a [String]) -> Vec<&'a str> {
    if pool.is_empty() {
        return Vec::new();
    }
    (0..grid.tiles()).map(|i| pool[i % pool.len()].as_str()).collect()
}

pub struct LayoutAdjuster {
    stage: Rc<dyn Stage>,
    scheduler: Rc<dyn Scheduler>,
    config: LayoutConfig,
    pool: Vec<String>,
    resize_timer: Cell<Option<TimerId>>,
    settle_timer: Cell<Option<TimerId>>,
    recomputations: Cell<u32>,
}

impl LayoutAdjuster {
    /// `pool` is the set of images the collage cycles through.
    pub fn new(
        stage: Rc<dyn Stage>,
        scheduler: Rc<dyn Scheduler>,
        config: LayoutConfig,
        pool: Vec<String>,
    ) -> Rc<Self> {
        Rc::new(Self {
            stage,
            scheduler,
            config,
            pool,
            resize_timer: Cell::new(None),
            settle_timer: Cell::new(None),
            recomputations: Cell::new(0),
        })
    }

    pub fn recomputations(&self) -> u32 {
        self.recomputations.get()
    }

    pub fn adjust_text(&self) {
        if !self.stage.has(Anchor::Message) {
            return;
        }
        if let Some(rem) = message_font_rem(self.stage.viewport().width) {
            self.stage.set_message_font(rem);
        }
    }

    pub fn build_collage(&self) {
        if !self.stage.has(Anchor::Collage) || self.pool.is_empty() {
            return;
        }
        let grid = CollageGrid::fit(self.stage.viewport());
        self.stage.fill_collage(&collage_tiles(&grid, &self.pool));
    }

    pub fn recompute(&self) {
        self.recomputations.set(self.recomputations.get() + 1);
        self.adjust_text();
        self.build_collage();
    }

    pub fn on_resize(self: &Rc<Self>) {
        self.rearm(&self.resize_timer, self.config.resize_debounce_ms);
    }

    pub fn on_orientation_change(self: &Rc<Self>) {
        self.rearm(&self.settle_timer, self.config.orientation_settle_ms);
    }

    fn rearm(self: &Rc<Self>, slot: &Cell<Option<TimerId>>, delay_ms: u32) {
        if let Some(old) = slot.take() {
            self.scheduler.clear(old);
        }
        let this = self.clone();
        let id = self.scheduler.set_timeout(delay_ms, Box::new(move || this.recompute()));
        slot.set(Some(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::VirtualScheduler;
    use crate::stage::MemoryStage;

    fn pool() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn grid_covers_viewport() {
        let g = CollageGrid::fit(Viewport { width: 1024.0, height: 768.0 });
        assert_eq!((g.tile, g.gap), (80, 4));
        // ceil(1020 / 84) = 13, ceil(764 / 84) = 10
        assert_eq!((g.cols, g.rows), (13, 10));
        assert!(f64::from(g.cols * (g.tile + g.gap) + g.gap) >= 1024.0);

        let s = CollageGrid::fit(Viewport { width: 480.0, height: 800.0 });
        assert_eq!((s.tile, s.gap), (60, 3));
        assert_eq!((s.cols, s.rows), (8, 13));
    }

    #[test]
    fn font_breakpoints() {
        assert_eq!(message_font_rem(320.0), Some(1.8));
        assert_eq!(message_font_rem(399.9), Some(1.8));
        assert_eq!(message_font_rem(400.0), Some(2.5));
        assert_eq!(message_font_rem(599.0), Some(2.5));
        assert_eq!(message_font_rem(600.0), None);
    }

    #[test]
    fn tiles_cycle_the_pool() {
        let grid = CollageGrid { tile: 80, gap: 4, cols: 3, rows: 2 };
        let p = pool();
        assert_eq!(collage_tiles(&grid, &p), vec!["a", "b", "c", "d", "a", "b"]);
        assert!(collage_tiles(&grid, &[]).is_empty());
    }

    #[test]
    fn resize_burst_recomputes_once() {
        let stage = Rc::new(MemoryStage::new());
        let sched = Rc::new(VirtualScheduler::new());
        let layout = LayoutAdjuster::new(stage.clone(), sched.clone(), LayoutConfig::default(), pool());
        for _ in 0..10 {
            layout.on_resize();
            sched.advance(5);
        }
        // Last event at t=45; fires at t=195.
        sched.advance(149 - 5);
        assert_eq!(layout.recomputations(), 0);
        sched.advance(1);
        assert_eq!(layout.recomputations(), 1);
        sched.advance(1000);
        assert_eq!(layout.recomputations(), 1);
        assert_eq!(stage.collage_builds.get(), 1);
    }

    #[test]
    fn orientation_waits_to_settle() {
        let stage = Rc::new(MemoryStage::new().with_viewport(1024.0, 768.0));
        let sched = Rc::new(VirtualScheduler::new());
        let layout = LayoutAdjuster::new(stage.clone(), sched.clone(), LayoutConfig::default(), pool());
        layout.on_orientation_change();
        stage.set_viewport(375.0, 812.0);
        sched.advance(499);
        assert_eq!(layout.recomputations(), 0);
        sched.advance(1);
        assert_eq!(layout.recomputations(), 1);
        assert_eq!(stage.message_font.get(), Some(1.8));
        let grid = CollageGrid::fit(Viewport { width: 375.0, height: 812.0 });
        assert_eq!(stage.collage.borrow().len(), grid.tiles());
    }

    #[test]
    fn recompute_is_idempotent() {
        let stage = Rc::new(MemoryStage::new().with_viewport(500.0, 700.0));
        let sched = Rc::new(VirtualScheduler::new());
        let layout = LayoutAdjuster::new(stage.clone(), sched, LayoutConfig::default(), pool());
        layout.recompute();
        let first = stage.collage.borrow().clone();
        layout.recompute();
        assert_eq!(*stage.collage.borrow(), first);
        assert_eq!(stage.message_font.get(), Some(2.5));
    }

    #[test]
    fn missing_collage_only_adjusts_text() {
        let stage = Rc::new(MemoryStage::new().without(Anchor::Collage).with_viewport(350.0, 600.0));
        let sched = Rc::new(VirtualScheduler::new());
        let layout = LayoutAdjuster::new(stage.clone(), sched, LayoutConfig::default(), pool());
        layout.recompute();
        assert_eq!(stage.collage_builds.get(), 0);
        assert_eq!(stage.message_font.get(), Some(1.8));
    }
}
