// Browser tests for the DOM-backed stage. Run with
// `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use celebration_fx::effects::{Confetti, Effect};
use celebration_fx::gate::{GateState, GestureGate};
use celebration_fx::media::MediaPlayback;
use celebration_fx::rng::FxRng;
use celebration_fx::stage::{Anchor, Layer, MemoryStage, Stage};
use celebration_fx::web::{DomStage, attach_gate_listeners, start_celebration};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn page() -> (web_sys::Document, DomStage) {
    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    let body = document.body().unwrap();
    body.set_inner_html(
        "<div id='boot-loader'><div id='progress-fill'></div><div id='progress-text'></div></div>\
         <div id='tap-screen' style='display:none'></div>\
         <div id='confetti'></div>\
         <div id='inline-slideshow'></div>\
         <div id='collage-background'></div>\
         <div class='birthday-message-container'><h1 class='birthday-message'>Hi</h1></div>",
    );
    (document.clone(), DomStage::new(window, document))
}

#[wasm_bindgen_test]
fn anchors_resolve_from_markup() {
    let (_doc, stage) = page();
    assert!(stage.has(Anchor::BootLoader));
    assert!(stage.has(Anchor::Confetti));
    assert!(!stage.has(Anchor::Media));
    assert!(!stage.has(Anchor::Emoji));
}

#[wasm_bindgen_test]
fn progress_paints_label_and_width() {
    let (doc, stage) = page();
    stage.set_progress("Loading images...", 50);
    let text = doc.get_element_by_id("progress-text").unwrap();
    assert_eq!(text.text_content().as_deref(), Some("Loading images..."));
    let fill = doc.get_element_by_id("progress-fill").unwrap();
    assert!(fill.get_attribute("style").unwrap_or_default().contains("width: 50%"));
}

#[wasm_bindgen_test]
fn spawned_confetti_is_removed() {
    let (doc, stage) = page();
    let rng = FxRng::seeded(1);
    let piece = Confetti::sample(&rng, stage.viewport());
    let id = stage.spawn(Layer::Confetti, &piece).unwrap();
    let layer = doc.get_element_by_id("confetti").unwrap();
    assert_eq!(layer.child_element_count(), 1);
    assert!(stage.despawn(id));
    assert_eq!(layer.child_element_count(), 0);
    assert!(!stage.despawn(id));
}

#[wasm_bindgen_test]
fn slides_toggle_active_class() {
    let (doc, stage) = page();
    let urls: Vec<String> = (1..=3).map(|i| format!("img{i}.jpg")).collect();
    assert_eq!(stage.build_slides(&urls), 3);
    stage.set_slide_active(0, false);
    stage.set_slide_active(1, true);
    let active = doc.query_selector_all(".inline-slide.active").unwrap();
    assert_eq!(active.length(), 1);
}

#[wasm_bindgen_test]
fn gate_reveal_and_hide() {
    let (doc, stage) = page();
    stage.reveal_gate();
    let style = doc.get_element_by_id("tap-screen").unwrap().get_attribute("style").unwrap();
    assert!(style.contains("display: flex"));
    assert!(style.contains("z-index: 20001"));
    stage.hide_gate();
    let style = doc.get_element_by_id("tap-screen").unwrap().get_attribute("style").unwrap();
    assert!(style.contains("display: none"));
}

fn tap_screen_style(doc: &web_sys::Document) -> String {
    doc.get_element_by_id("tap-screen")
        .and_then(|el| el.get_attribute("style"))
        .unwrap_or_default()
}

#[wasm_bindgen_test]
fn touch_then_clicks_unlock_gate_once() {
    let (doc, stage) = page();
    doc.body()
        .unwrap()
        .insert_adjacent_html("beforeend", "<audio id='bg-music'></audio>")
        .unwrap();
    let stage: Rc<DomStage> = Rc::new(stage);
    // Music goes through the recording stage so no real play() is issued.
    let media = MediaPlayback::new(Rc::new(MemoryStage::new()));
    let unlocks = Rc::new(Cell::new(0));
    let gate = {
        let unlocks = unlocks.clone();
        GestureGate::new(stage, media, Box::new(move || unlocks.set(unlocks.get() + 1)))
    };
    assert!(gate.arm());
    attach_gate_listeners(&doc, &gate).unwrap();
    assert!(tap_screen_style(&doc).contains("display: flex"));

    let screen: web_sys::EventTarget =
        doc.get_element_by_id("tap-screen").unwrap().unchecked_into();
    screen.dispatch_event(&web_sys::Event::new("touchstart").unwrap()).unwrap();
    for _ in 0..5 {
        screen.dispatch_event(&web_sys::Event::new("click").unwrap()).unwrap();
    }

    assert_eq!(unlocks.get(), 1);
    assert_eq!(gate.state(), GateState::Unlocked);
    // Both listeners are gone after the first event.
    assert_eq!(gate.gestures(), 1);
    assert!(tap_screen_style(&doc).contains("display: none"));
}

#[wasm_bindgen_test]
fn start_without_loader_arms_gate_directly() {
    let (doc, _stage) = page();
    let body = doc.body().unwrap();
    body.set_inner_html(
        "<div id='tap-screen' style='display:none'></div><audio id='bg-music'></audio>",
    );
    // The test document has finished loading, so launch skips DOMContentLoaded.
    assert_ne!(doc.ready_state(), "loading");
    start_celebration().unwrap();
    assert!(tap_screen_style(&doc).contains("display: flex"));
}
