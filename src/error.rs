//! Error taxonomy shared by every component.
//!
//! Almost nothing here ever reaches JavaScript: a component that hits one of
//! these logs it and degrades to a no-op. Only the exported `start*` entry
//! points hand an error back across the wasm boundary.

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FxError {
    /// A page element the component needs is not in the markup.
    #[error("missing page element `{0}`")]
    MissingAnchor(&'static str),
    /// `HTMLMediaElement.play()` rejected, usually because of autoplay policy.
    #[error("media playback rejected: {0}")]
    PlaybackRejected(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No `window` / `document` (running outside a browser page).
    #[error("browser environment unavailable: no {0}")]
    NoBrowser(&'static str),
}

impl From<FxError> for JsValue {
    fn from(err: FxError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
