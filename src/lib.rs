//! Celebration page effects, compiled to WASM.
//!
//! On load a scripted boot loader plays, then a tap-to-start gate waits for
//! the one gesture browsers require before music may play. That gesture
//! starts the music and the celebration: background collage, slideshow,
//! confetti, balloons and emoji, plus a welcome burst. Call `start_celebration()`
//! from JavaScript (or `start_celebration_with_config(json)` to override tuning).
//!
//! Components are written against two seams, [`stage::Stage`] for the page
//! and [`scheduler::Scheduler`] for timers, so their timing can be driven by
//! hand with [`stage::MemoryStage`] and [`scheduler::VirtualScheduler`].

use wasm_bindgen::prelude::*;

pub mod app;
pub mod boot;
pub mod config;
pub mod effects;
pub mod error;
pub mod gate;
pub mod interact;
pub mod layout;
mod log;
pub mod media;
pub mod rng;
pub mod scheduler;
pub mod slideshow;
pub mod stage;
pub mod web;

pub use config::FxConfig;
pub use error::FxError;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
