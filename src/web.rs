//! Browser side: the DOM-backed [`Stage`], the `window` timer [`Scheduler`]
//! and the event wiring that connects page events to the components.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget,
    HtmlElement, HtmlImageElement, HtmlMediaElement, KeyboardEvent, VisibilityState, Window,
};

use crate::app::App;
use crate::boot::BootSequence;
use crate::config::FxConfig;
use crate::error::FxError;
use crate::gate::GestureGate;
use crate::interact::Interactions;
use crate::log::{clog, cwarn};
use crate::media::MediaPlayback;
use crate::rng::FxRng;
use crate::scheduler::{Scheduler, TimerId};
use crate::stage::{Anchor, EffectElement, ElementId, Layer, PlayDone, Stage, Viewport};

// --- Stage -----------------------------------------------------------------

type PromiseHandlers = (Closure<dyn FnMut(JsValue)>, Closure<dyn FnMut(JsValue)>);

/// One in-flight `play()`: the completion and the handlers JS will call.
struct PlayRequest<H> {
    done: Option<PlayDone>,
    handlers: Option<H>,
}

/// Deliver a settled `play()` once. The handlers move to `spent` because one
/// of them is running right now and cannot be dropped yet.
fn settle_play<H>(
    request: &RefCell<PlayRequest<H>>,
    spent: &RefCell<Vec<H>>,
    result: Result<(), FxError>,
) {
    let (done, handlers) = {
        let mut request = request.borrow_mut();
        (request.done.take(), request.handlers.take())
    };
    if let Some(handlers) = handlers {
        spent.borrow_mut().push(handlers);
    }
    if let Some(done) = done {
        done(result);
    }
}

pub struct DomStage {
    window: Window,
    document: Document,
    next_id: Cell<u64>,
    live: RefCell<HashMap<ElementId, Element>>,
    slides: RefCell<Vec<Element>>,
    saved_glow: RefCell<Option<String>>,
    /// Handlers of settled `play()` promises, freed on the next play.
    spent_plays: Rc<RefCell<Vec<PromiseHandlers>>>,
}

impl DomStage {
    pub fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            next_id: Cell::new(0),
            live: RefCell::new(HashMap::new()),
            slides: RefCell::new(Vec::new()),
            saved_glow: RefCell::new(None),
            spent_plays: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Promise handlers still held for settled plays.
    pub fn spent_plays(&self) -> usize {
        self.spent_plays.borrow().len()
    }

    fn find(&self, anchor: Anchor) -> Option<Element> {
        self.document.query_selector(anchor.selector()).ok().flatten()
    }

    fn html(&self, anchor: Anchor) -> Option<HtmlElement> {
        self.find(anchor)?.dyn_into::<HtmlElement>().ok()
    }

    fn media(&self) -> Option<HtmlMediaElement> {
        self.find(Anchor::Media)?.dyn_into::<HtmlMediaElement>().ok()
    }

    fn div(&self, class: &str) -> Option<HtmlElement> {
        let el = self.document.create_element("div").ok()?;
        el.set_class_name(class);
        el.dyn_into::<HtmlElement>().ok()
    }
}

fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    let _ = el.style().set_property(prop, value);
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

impl Stage for DomStage {
    fn has(&self, anchor: Anchor) -> bool {
        self.find(anchor).is_some()
    }

    fn viewport(&self) -> Viewport {
        let (client_w, client_h) = self
            .document
            .document_element()
            .map(|e| (f64::from(e.client_width()), f64::from(e.client_height())))
            .unwrap_or((0.0, 0.0));
        let inner = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Viewport {
            width: client_w.max(inner(self.window.inner_width())),
            height: client_h.max(inner(self.window.inner_height())),
        }
    }

    fn set_progress(&self, label: &str, percent: u8) {
        if let Some(text) = self.find(Anchor::ProgressText) {
            text.set_text_content(Some(label));
        }
        if let Some(fill) = self.html(Anchor::ProgressFill) {
            set_style(&fill, "width", &format!("{percent}%"));
        }
    }

    fn reveal_gate(&self) {
        if let Some(gate) = self.html(Anchor::Gate) {
            set_style(&gate, "display", "flex");
            set_style(&gate, "z-index", "20001");
        }
    }

    fn hide_gate(&self) {
        if let Some(gate) = self.html(Anchor::Gate) {
            set_style(&gate, "display", "none");
        }
    }

    fn fade_boot_layer(&self) {
        if let Some(loader) = self.find(Anchor::BootLoader) {
            let _ = loader.class_list().add_1("hidden");
        }
    }

    fn remove_boot_layer(&self) {
        if let Some(loader) = self.html(Anchor::BootLoader) {
            set_style(&loader, "display", "none");
        }
    }

    fn play_media(&self, done: PlayDone) {
        // Never called from inside a promise handler, so none of these runs.
        self.spent_plays.borrow_mut().clear();
        let Some(media) = self.media() else {
            done(Err(FxError::MissingAnchor(Anchor::Media.selector())));
            return;
        };
        media.set_volume(1.0);
        let promise = match media.play() {
            Ok(p) => p,
            Err(err) => {
                done(Err(FxError::PlaybackRejected(describe(&err))));
                return;
            }
        };
        let request = Rc::new(RefCell::new(PlayRequest { done: Some(done), handlers: None }));
        let on_ok = {
            let request = request.clone();
            let spent = self.spent_plays.clone();
            Closure::wrap(Box::new(move |_: JsValue| settle_play(&request, &spent, Ok(())))
                as Box<dyn FnMut(JsValue)>)
        };
        let on_err = {
            let request = request.clone();
            let spent = self.spent_plays.clone();
            Closure::wrap(Box::new(move |err: JsValue| {
                settle_play(&request, &spent, Err(FxError::PlaybackRejected(describe(&err))))
            }) as Box<dyn FnMut(JsValue)>)
        };
        let _ = promise.then2(&on_ok, &on_err);
        // Promise reactions run as microtasks, never before this store.
        request.borrow_mut().handlers = Some((on_ok, on_err));
    }

    fn pause_media(&self) {
        if let Some(media) = self.media() {
            let _ = media.pause();
        }
    }

    fn media_paused(&self) -> bool {
        self.media().map(|m| m.paused()).unwrap_or(true)
    }

    fn notify(&self, message: &str) {
        let _ = self.window.alert_with_message(message);
    }

    fn fill_collage(&self, tiles: &[&str]) {
        let Some(collage) = self.find(Anchor::Collage) else { return };
        collage.set_inner_html("");
        for url in tiles {
            if let Some(tile) = self.div("collage-tile") {
                set_style(&tile, "background-image", &format!("url('{url}')"));
                let _ = collage.append_child(&tile);
            }
        }
    }

    fn preload(&self, urls: &[String]) {
        for url in urls {
            if let Ok(img) = HtmlImageElement::new() {
                let _ = img.set_attribute("loading", "lazy");
                let _ = img.set_attribute("decoding", "async");
                img.set_src(url);
            }
        }
    }

    fn build_slides(&self, urls: &[String]) -> usize {
        let mut slides = self.slides.borrow_mut();
        slides.clear();
        let Some(container) = self.find(Anchor::Slideshow) else { return 0 };
        container.set_inner_html("");
        for (idx, url) in urls.iter().enumerate() {
            let class = if idx == 0 { "inline-slide active" } else { "inline-slide" };
            if let Some(slide) = self.div(class) {
                set_style(&slide, "background-image", &format!("url('{url}')"));
                let _ = container.append_child(&slide);
                slides.push(slide.into());
            }
        }
        slides.len()
    }

    fn set_slide_active(&self, index: usize, active: bool) {
        if let Some(slide) = self.slides.borrow().get(index) {
            let classes = slide.class_list();
            let _ = if active { classes.add_1("active") } else { classes.remove_1("active") };
        }
    }

    fn set_message_font(&self, rem: f64) {
        if let Some(msg) = self.html(Anchor::Message) {
            set_style(&msg, "font-size", &format!("{rem}rem"));
        }
    }

    fn set_message_glow(&self, on: bool) {
        let Some(msg) = self.html(Anchor::Message) else { return };
        let style = msg.style();
        if on {
            let mut saved = self.saved_glow.borrow_mut();
            if saved.is_none() {
                *saved = Some(style.get_property_value("text-shadow").unwrap_or_default());
            }
            let _ = style.set_property(
                "text-shadow",
                "0 0 50px rgba(255, 255, 255, 1), 0 0 100px rgba(255, 215, 0, 1), 0 0 150px rgba(255, 105, 180, 0.8)",
            );
        } else if let Some(original) = self.saved_glow.borrow_mut().take() {
            let _ = style.set_property("text-shadow", &original);
        }
    }

    fn dress_balloons(&self, dress: &mut dyn FnMut() -> (&'static str, f64)) {
        let Ok(nodes) = self.document.query_selector_all(".balloon") else { return };
        for i in 0..nodes.length() {
            let Some(balloon) = nodes.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
                continue;
            };
            let (glyph, delay_s) = dress();
            balloon.set_text_content(Some(glyph));
            set_style(&balloon, "animation-delay", &format!("{delay_s}s"));
        }
    }

    fn spawn(&self, layer: Layer, element: &EffectElement) -> Option<ElementId> {
        let container = self.find(layer.anchor())?;
        let el = self.div(element.class)?;
        if let Some(glyph) = element.glyph {
            el.set_text_content(Some(glyph));
        }
        set_style(&el, "left", &element.left.css());
        if let Some(bottom) = element.bottom {
            set_style(&el, "bottom", &bottom.css());
        }
        if let Some(rem) = element.font_size_rem {
            set_style(&el, "font-size", &format!("{rem}rem"));
        }
        if let Some(deg) = element.rotation_deg {
            set_style(&el, "transform", &format!("rotate({deg}deg)"));
        }
        if let Some(delay) = element.delay_s {
            set_style(&el, "animation-delay", &format!("{delay}s"));
        }
        set_style(&el, "animation-duration", &format!("{}s", element.duration_s));
        container.append_child(&el).ok()?;

        let id = ElementId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.live.borrow_mut().insert(id, el.into());
        Some(id)
    }

    fn despawn(&self, id: ElementId) -> bool {
        let Some(el) = self.live.borrow_mut().remove(&id) else { return false };
        if el.parent_node().is_none() {
            return false;
        }
        el.remove();
        true
    }
}

// --- Scheduler -------------------------------------------------------------

struct Armed {
    handle: i32,
    interval: bool,
    callback: Closure<dyn FnMut()>,
}

/// `window.setTimeout` / `setInterval` with the closures owned here.
///
/// A closure must not be dropped while JS is running it, so fired and cleared
/// closures are parked in `retired` and freed at the top of the next timer
/// callback, when none of them can be on the stack.
pub struct BrowserScheduler {
    window: Window,
    next_id: Cell<u64>,
    armed: RefCell<HashMap<TimerId, Armed>>,
    retired: RefCell<Vec<Closure<dyn FnMut()>>>,
    me: Weak<BrowserScheduler>,
}

impl BrowserScheduler {
    pub fn new(window: Window) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            window,
            next_id: Cell::new(0),
            armed: RefCell::new(HashMap::new()),
            retired: RefCell::new(Vec::new()),
            me: me.clone(),
        })
    }

    fn alloc(&self) -> TimerId {
        let id = TimerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        id
    }

    fn retire(&self, id: TimerId) {
        let armed = self.armed.borrow_mut().remove(&id);
        if let Some(armed) = armed {
            self.retired.borrow_mut().push(armed.callback);
        }
    }

    fn sweep(&self) {
        self.retired.borrow_mut().clear();
    }
}

impl Scheduler for BrowserScheduler {
    fn set_timeout(&self, delay_ms: u32, f: Box<dyn FnOnce()>) -> TimerId {
        let id = self.alloc();
        let me = self.me.clone();
        let mut task = Some(f);
        let callback = Closure::wrap(Box::new(move || {
            let Some(sched) = me.upgrade() else { return };
            sched.sweep();
            if let Some(f) = task.take() {
                f();
            }
            sched.retire(id);
        }) as Box<dyn FnMut()>);
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), delay)
        {
            Ok(handle) => {
                self.armed
                    .borrow_mut()
                    .insert(id, Armed { handle, interval: false, callback });
            }
            Err(err) => cwarn(&format!("setTimeout failed: {}", describe(&err))),
        }
        id
    }

    fn set_interval(&self, period_ms: u32, mut f: Box<dyn FnMut()>) -> TimerId {
        let id = self.alloc();
        let me = self.me.clone();
        let callback = Closure::wrap(Box::new(move || {
            if let Some(sched) = me.upgrade() {
                sched.sweep();
            }
            f();
        }) as Box<dyn FnMut()>);
        let period = i32::try_from(period_ms.max(1)).unwrap_or(i32::MAX);
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), period)
        {
            Ok(handle) => {
                self.armed
                    .borrow_mut()
                    .insert(id, Armed { handle, interval: true, callback });
            }
            Err(err) => cwarn(&format!("setInterval failed: {}", describe(&err))),
        }
        id
    }

    fn clear(&self, id: TimerId) {
        let (handle, interval) = match self.armed.borrow().get(&id) {
            Some(armed) => (armed.handle, armed.interval),
            None => return,
        };
        if interval {
            self.window.clear_interval_with_handle(handle);
        } else {
            self.window.clear_timeout_with_handle(handle);
        }
        self.retire(id);
    }

    fn now_ms(&self) -> f64 {
        self.window.performance().map(|p| p.now()).unwrap_or(0.0)
    }
}

// --- Event wiring ----------------------------------------------------------

fn listen<F>(target: &EventTarget, event: &str, passive: bool, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    let opts = AddEventListenerOptions::new();
    opts.set_passive(passive);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        closure.as_ref().unchecked_ref(),
        &opts,
    )?;
    closure.forget();
    Ok(())
}

fn target_within(event: &Event, selector: &str) -> bool {
    event
        .target()
        .and_then(|t| t.dyn_into::<Element>().ok())
        .and_then(|el| el.closest(selector).ok().flatten())
        .is_some()
}

/// Tap and touch on the gate both unlock it. Each listener is `once`, and
/// whichever fires first also detaches the other.
pub fn attach_gate_listeners(document: &Document, gate: &Rc<GestureGate>) -> Result<(), JsValue> {
    let screen: EventTarget = document
        .query_selector(Anchor::Gate.selector())?
        .ok_or(FxError::MissingAnchor(Anchor::Gate.selector()))?
        .into();
    let own_fn: Rc<RefCell<Option<js_sys::Function>>> = Rc::new(RefCell::new(None));
    let closure = {
        let gate = gate.clone();
        let screen = screen.clone();
        let own_fn = own_fn.clone();
        Closure::wrap(Box::new(move |e: Event| {
            e.prevent_default();
            if let Some(f) = own_fn.borrow_mut().take() {
                let _ = screen.remove_event_listener_with_callback("click", &f);
                let _ = screen.remove_event_listener_with_callback("touchstart", &f);
            }
            gate.on_gesture();
        }) as Box<dyn FnMut(Event)>)
    };
    let func: &js_sys::Function = closure.as_ref().unchecked_ref();
    *own_fn.borrow_mut() = Some(func.clone());
    let opts = AddEventListenerOptions::new();
    opts.set_once(true);
    screen.add_event_listener_with_callback_and_add_event_listener_options("click", func, &opts)?;
    screen.add_event_listener_with_callback_and_add_event_listener_options("touchstart", func, &opts)?;
    closure.forget();
    Ok(())
}

fn wire_page(
    window: &Window,
    document: &Document,
    app: &Rc<App>,
    media: &Rc<MediaPlayback>,
    input: &Rc<Interactions>,
) -> Result<(), JsValue> {
    let win_target: &EventTarget = window.as_ref();
    let doc_target: &EventTarget = document.as_ref();

    {
        let layout = app.layout.clone();
        listen(win_target, "resize", true, move |_: Event| layout.on_resize())?;
    }
    {
        let layout = app.layout.clone();
        listen(win_target, "orientationchange", false, move |_: Event| {
            layout.on_orientation_change()
        })?;
    }
    listen(win_target, "load", false, |_: Event| clog("page fully loaded"))?;
    {
        let media = media.clone();
        let doc = document.clone();
        listen(doc_target, "visibilitychange", false, move |_: Event| {
            media.on_visibility(doc.visibility_state() == VisibilityState::Visible)
        })?;
    }
    {
        let input = input.clone();
        listen(doc_target, "keydown", false, move |e: Event| {
            let Some(key) = e.dyn_ref::<KeyboardEvent>().map(|k| k.key()) else { return };
            if input.on_key(&key) {
                e.prevent_default();
            }
        })?;
    }
    {
        let input = input.clone();
        listen(doc_target, "click", false, move |e: Event| {
            input.on_click(target_within(&e, ".controls"))
        })?;
    }
    {
        let input = input.clone();
        listen(doc_target, "touchstart", true, move |e: Event| {
            if target_within(&e, Anchor::MessageContainer.selector()) {
                input.on_message_touch();
            }
        })?;
    }
    if let Some(container) = document.query_selector(Anchor::MessageContainer.selector())? {
        let input = input.clone();
        let target: &EventTarget = container.as_ref();
        listen(target, "click", true, move |_: Event| input.on_message_tap())?;
    }
    Ok(())
}

struct Runtime {
    _app: Rc<App>,
    _gate: Rc<GestureGate>,
    _boot: Rc<BootSequence>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

fn launch(config: FxConfig) -> Result<(), JsValue> {
    if RUNTIME.with(|r| r.borrow().is_some()) {
        cwarn("celebration already started");
        return Ok(());
    }
    let window = web_sys::window().ok_or(FxError::NoBrowser("window"))?;
    let document = window.document().ok_or(FxError::NoBrowser("document"))?;

    let stage = Rc::new(DomStage::new(window.clone(), document.clone()));
    let scheduler = BrowserScheduler::new(window.clone());
    let seed = window.performance().map(|p| p.now().to_bits()).unwrap_or(1);
    let rng = Rc::new(FxRng::from_entropy(seed));

    let media = MediaPlayback::new(stage.clone());
    let app = App::new(stage.clone(), scheduler.clone(), rng, config.clone());
    let gate = {
        let app = app.clone();
        GestureGate::new(stage.clone(), media.clone(), Box::new(move || app.initialize()))
    };
    let input = Interactions::new(app.clone(), media.clone(), stage.clone(), scheduler.clone());
    wire_page(&window, &document, &app, &media, &input)?;
    app.layout.adjust_text();

    let arm_gate: Rc<dyn Fn()> = {
        let gate = gate.clone();
        let document = document.clone();
        Rc::new(move || {
            if gate.arm() {
                if let Err(err) = attach_gate_listeners(&document, &gate) {
                    cwarn(&format!("tap gate listeners failed: {}", describe(&err)));
                }
            }
        })
    };
    let handoff: Box<dyn FnOnce()> = {
        let arm_gate = arm_gate.clone();
        Box::new(move || arm_gate())
    };
    let boot = BootSequence::new(stage, scheduler, config.boot, Some(handoff));

    if document.ready_state() == "loading" {
        let boot = boot.clone();
        let arm_gate = arm_gate.clone();
        let opts = AddEventListenerOptions::new();
        opts.set_once(true);
        let closure = Closure::wrap(Box::new(move |_: Event| {
            if !boot.start() {
                arm_gate();
            }
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback_and_add_event_listener_options(
            "DOMContentLoaded",
            closure.as_ref().unchecked_ref(),
            &opts,
        )?;
        closure.forget();
    } else if !boot.start() {
        // No loader markup: go straight to the gate.
        arm_gate();
    }

    RUNTIME.with(|r| {
        *r.borrow_mut() = Some(Runtime { _app: app, _gate: gate, _boot: boot });
    });
    Ok(())
}

/// Boot the page with the built-in tuning.
#[wasm_bindgen]
pub fn start_celebration() -> Result<(), JsValue> {
    launch(FxConfig::default())
}

/// Boot the page with a JSON tuning override (any subset of the fields).
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_celebration_with_config(json: &str) -> Result<(), JsValue> {
    let config = FxConfig::from_json(json)?;
    launch(config)
}
