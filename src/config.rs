//! Tuning for every timed effect on the page.
//!
//! `FxConfig::default()` carries the values the page ships with. With the
//! `serde_json` feature a JSON object can override any subset of them; missing
//! fields keep their defaults.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// One labelled stop of the boot progress bar.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootStep {
    pub label: String,
    /// 0..=100
    pub progress: u8,
}

impl BootStep {
    pub fn new(label: &str, progress: u8) -> Self {
        Self { label: label.to_string(), progress }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BootConfig {
    pub steps: Vec<BootStep>,
    /// Spread evenly across the steps.
    pub total_ms: u32,
    /// Pause after the last step before the gate is revealed.
    pub handoff_delay_ms: u32,
    /// Fade-out time of the boot layer before it is removed from layout.
    pub fade_ms: u32,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                BootStep::new("Initializing...", 20),
                BootStep::new("Loading images...", 50),
                BootStep::new("Setting up animations...", 80),
                BootStep::new("Complete!", 100),
            ],
            total_ms: 4000,
            handoff_delay_ms: 300,
            fade_ms: 800,
        }
    }
}

/// Timing of one ephemeral effect family.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectTuning {
    /// Delay between consecutive units of one `spawn(count)` call; 0 = all at once.
    pub stagger_ms: u32,
    /// Time from creation to removal.
    pub lifetime_ms: u32,
    /// Recurring spawn independent of explicit calls.
    pub auto_interval_ms: Option<u32>,
    pub auto_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LayoutConfig {
    pub resize_debounce_ms: u32,
    pub orientation_settle_ms: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { resize_debounce_ms: 150, orientation_settle_ms: 500 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct InteractionConfig {
    pub click_throttle_ms: u32,
    pub click_burst: u32,
    pub key_burst: u32,
    pub space_burst: u32,
    pub flash_ms: u32,
    pub touch_burst: u32,
    pub emoji_tap_burst: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_throttle_ms: 400,
            click_burst: 20,
            key_burst: 50,
            space_burst: 25,
            flash_ms: 500,
            touch_burst: 30,
            emoji_tap_burst: 18,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct FxConfig {
    pub boot: BootConfig,
    /// Image references in display order.
    pub images: Vec<String>,
    /// How many leading images the background collage cycles through.
    pub collage_pool: usize,
    pub slideshow_interval_ms: u32,
    pub confetti: EffectTuning,
    pub balloons: EffectTuning,
    pub emoji: EffectTuning,
    pub welcome_delay_ms: u32,
    pub welcome_burst: u32,
    pub layout: LayoutConfig,
    pub interactions: InteractionConfig,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            boot: BootConfig::default(),
            images: (1..=14).map(|i| format!("img{i}.jpg")).collect(),
            collage_pool: 4,
            slideshow_interval_ms: 2500,
            confetti: EffectTuning {
                stagger_ms: 50,
                lifetime_ms: 4000,
                auto_interval_ms: None,
                auto_count: 0,
            },
            balloons: EffectTuning {
                stagger_ms: 0,
                lifetime_ms: 10_000,
                auto_interval_ms: Some(8000),
                auto_count: 1,
            },
            emoji: EffectTuning {
                stagger_ms: 0,
                lifetime_ms: 4000,
                auto_interval_ms: Some(6000),
                auto_count: 10,
            },
            welcome_delay_ms: 1000,
            welcome_burst: 100,
            layout: LayoutConfig::default(),
            interactions: InteractionConfig::default(),
        }
    }
}

impl FxConfig {
    pub fn validate(&self) -> Result<(), FxError> {
        let steps = &self.boot.steps;
        let Some(last) = steps.last() else {
            return Err(FxError::InvalidConfig("boot.steps is empty".into()));
        };
        let mut prev = 0u8;
        for step in steps {
            if step.progress > 100 {
                return Err(FxError::InvalidConfig(format!(
                    "boot step `{}` exceeds 100%",
                    step.label
                )));
            }
            if step.progress < prev {
                return Err(FxError::InvalidConfig(format!(
                    "boot step `{}` moves progress backwards ({} -> {})",
                    step.label, prev, step.progress
                )));
            }
            prev = step.progress;
        }
        if last.progress != 100 {
            return Err(FxError::InvalidConfig("last boot step must reach 100%".into()));
        }
        if self.slideshow_interval_ms == 0 {
            return Err(FxError::InvalidConfig("slideshow_interval_ms must be > 0".into()));
        }
        for (name, tuning) in [
            ("confetti", &self.confetti),
            ("balloons", &self.balloons),
            ("emoji", &self.emoji),
        ] {
            if tuning.auto_interval_ms == Some(0) {
                return Err(FxError::InvalidConfig(format!(
                    "{name}.auto_interval_ms must be > 0"
                )));
            }
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON override and validate the result.
    ///
    /// The override is laid over the defaults object by object, so
    /// `{"balloons": {"lifetime_ms": 5000}}` keeps every other balloon field.
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self, FxError> {
        let invalid = |e: serde_json::Error| FxError::InvalidConfig(e.to_string());
        let patch: serde_json::Value = serde_json::from_str(json).map_err(invalid)?;
        let mut merged = serde_json::to_value(FxConfig::default()).map_err(invalid)?;
        overlay(&mut merged, patch);
        let cfg: FxConfig = serde_json::from_value(merged).map_err(invalid)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Objects merge key by key; any other value, arrays included, replaces.
#[cfg(feature = "serde_json")]
fn overlay(base: &mut serde_json::Value, patch: serde_json::Value) {
    use serde_json::Value;
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
