//! WASM API module for the browser
//!
//! Mounts a [`ParticleField`] into the page's `#particles` element: a canvas
//! backed [`DrawSurface`], `requestAnimationFrame` scheduling, visibility and
//! reduced-motion signals, and pointer/touch input on the enclosing `.hero`.

use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::rc::{Rc, Weak};

use image::Rgba;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Element, Event, EventTarget,
    HtmlCanvasElement, HtmlElement, HtmlImageElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, MediaQueryListEvent, PointerEvent,
    TouchEvent, Window,
};

use crate::color::to_css;
use crate::field::{FrameScheduler, Host, ParticleField, VISIBILITY_THRESHOLD};
use crate::hooks::PointerTrail;
use crate::impact::{ImpactSpec, DEFAULT_DEBRIS, DEFAULT_DUST};
use crate::sim::SimOptions;
use crate::sprites::{Sprite, DEFAULT_SOURCES};
use crate::surface::{BlendMode, ColorStop, DrawSurface, Rect};
use crate::theme::{Theme, ThemeSource, VariableRegistry, THEME_VARIABLES};

const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

/// Headline lines that crash in after load, with their delay in ms
const HEADLINE_IMPACTS: [(&str, u32); 2] = [(".from-crash", 900), (".to-cash", 1250)];

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// [`DrawSurface`] over a 2D canvas context
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
    blend: BlendMode,
    stack: Vec<BlendMode>,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self {
            canvas,
            ctx,
            width: 1.0,
            height: 1.0,
            blend: BlendMode::SourceOver,
            stack: Vec::new(),
        }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn round_rect_path(&self, rect: Rect, radius: f64) {
        let Rect { x, y, width: w, height: h } = rect;
        let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
        let ctx = &self.ctx;
        ctx.begin_path();
        ctx.move_to(x + r, y);
        ctx.arc_to(x + w, y, x + w, y + h, r).ok();
        ctx.arc_to(x + w, y + h, x, y + h, r).ok();
        ctx.arc_to(x, y + h, x, y, r).ok();
        ctx.arc_to(x, y, x + w, y, r).ok();
        ctx.close_path();
    }
}

impl DrawSurface for CanvasSurface {
    type Image = HtmlImageElement;

    fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        self.width = width;
        self.height = height;
        self.canvas.set_width((width * dpr).floor() as u32);
        self.canvas.set_height((height * dpr).floor() as u32);
        // Resizing a canvas resets its context state
        self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
        self.blend = BlendMode::SourceOver;
        self.stack.clear();
    }

    fn clear(&mut self) {
        self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
    }

    fn save(&mut self) {
        self.ctx.save();
        self.stack.push(self.blend);
    }

    fn restore(&mut self) {
        self.ctx.restore();
        if let Some(blend) = self.stack.pop() {
            self.blend = blend;
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.ctx.translate(x, y).ok();
    }

    fn rotate(&mut self, radians: f64) {
        self.ctx.rotate(radians).ok();
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.blend = mode;
        self.ctx.set_global_composite_operation(mode.as_composite_op()).ok();
    }

    fn blend(&self) -> BlendMode {
        self.blend
    }

    fn fill_round_rect(&mut self, rect: Rect, radius: f64, color: Rgba<u8>) {
        self.round_rect_path(rect, radius);
        self.ctx.set_fill_style_str(&to_css(color));
        self.ctx.fill();
    }

    fn fill_circle(&mut self, radius: f64, color: Rgba<u8>) {
        self.ctx.begin_path();
        self.ctx.arc(0.0, 0.0, radius, 0.0, TAU).ok();
        self.ctx.set_fill_style_str(&to_css(color));
        self.ctx.fill();
    }

    fn fill_radial(&mut self, radius: f64, stops: &[ColorStop]) {
        let Ok(gradient) = self.ctx.create_radial_gradient(0.0, 0.0, 0.0, 0.0, 0.0, radius) else {
            return;
        };
        for stop in stops {
            gradient.add_color_stop(stop.offset as f32, &to_css(stop.color)).ok();
        }
        self.ctx.set_fill_style_canvas_gradient(&gradient);
        self.ctx.begin_path();
        self.ctx.arc(0.0, 0.0, radius, 0.0, TAU).ok();
        self.ctx.fill();
    }

    fn draw_image(&mut self, image: &HtmlImageElement, dest: Rect) {
        let Rect { x, y, width, height } = dest;
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(image, x, y, width, height)
            .ok();
    }
}

type RafCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` on the page clock
struct RafScheduler {
    window: Window,
    callback: RafCallback,
    handle: Cell<Option<i32>>,
}

impl FrameScheduler for RafScheduler {
    fn now(&self) -> f64 {
        self.window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn request_frame(&mut self) {
        let callback = self.callback.borrow();
        if let Some(cb) = callback.as_ref() {
            let handle = self.window.request_animation_frame(cb.as_ref().unchecked_ref()).ok();
            self.handle.set(handle);
        }
    }
}

impl Drop for RafScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.window.cancel_animation_frame(handle).ok();
        }
    }
}

/// The `#particles` container and its canvas
#[derive(Clone)]
struct BrowserHost {
    window: Window,
    container: HtmlElement,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Host for BrowserHost {
    type Surface = CanvasSurface;

    fn content_size(&self) -> (f64, f64) {
        let rect = self.container.get_bounding_client_rect();
        (rect.width(), rect.height())
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn create_surface(&mut self, width: f64, height: f64, dpr: f64) -> CanvasSurface {
        let mut surface = CanvasSurface::new(self.canvas.clone(), self.ctx.clone());
        surface.resize(width, height, dpr);
        surface
    }
}

type SharedField = Rc<RefCell<ParticleField<CanvasSurface>>>;
type WeakField = Weak<RefCell<ParticleField<CanvasSurface>>>;

/// An event listener removed again on drop
struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn add(
        target: &EventTarget,
        kind: &'static str,
        passive: bool,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let closure = Closure::<dyn FnMut(Event)>::new(handler);
        if passive {
            let opts = AddEventListenerOptions::new();
            opts.set_passive(true);
            target.add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                closure.as_ref().unchecked_ref(),
                &opts,
            )?;
        } else {
            target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        }
        Ok(Self { target: target.clone(), kind, closure })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref())
            .ok();
    }
}

/// Run `f` on the field unless it is gone or already borrowed.
fn with_field(field: &WeakField, f: impl FnOnce(&mut ParticleField<CanvasSurface>)) {
    if let Some(field) = field.upgrade() {
        if let Ok(mut field) = field.try_borrow_mut() {
            f(&mut field);
        }
    }
}

/// Theme custom properties as currently computed on `<html>`
fn read_theme_vars(window: &Window) -> VariableRegistry {
    let mut vars = VariableRegistry::new();
    let style = window
        .document()
        .and_then(|d| d.document_element())
        .and_then(|root| window.get_computed_style(&root).ok().flatten());
    if let Some(style) = style {
        for name in THEME_VARIABLES {
            if let Ok(value) = style.get_property_value(name) {
                if !value.trim().is_empty() {
                    vars.define(name, &value);
                }
            }
        }
    }
    vars
}

/// Viewport position relative to the container
fn local_point(container: &HtmlElement, client_x: f64, client_y: f64) -> (f64, f64) {
    let rect = container.get_bounding_client_rect();
    (client_x - rect.left(), client_y - rect.top())
}

/// Fire an impact at the center of `target`, in container coordinates.
fn impact_at_element(field: &WeakField, container: &HtmlElement, target: &Element, debris: usize) {
    let rect = target.get_bounding_client_rect();
    let center_x = rect.left() + rect.width() / 2.0;
    let center_y = rect.top() + rect.height() / 2.0;
    let (x, y) = local_point(container, center_x, center_y);
    with_field(field, |field| field.sim_mut().trigger_impact(x, y, debris, DEFAULT_DUST));
}

fn load_sprite_images(field: &SharedField, sources: &[&str]) -> Result<(), JsValue> {
    for &source in sources {
        let img = HtmlImageElement::new()?;
        let weak = Rc::downgrade(field);
        let loaded = img.clone();
        let onload = Closure::once_into_js(move || {
            let sprite = Sprite::new(
                loaded.clone(),
                loaded.natural_width() as f64,
                loaded.natural_height() as f64,
            );
            with_field(&weak, |field| field.attach_sprites(vec![sprite]));
        });
        let src = source.to_string();
        let onerror = Closure::once_into_js(move || {
            log::warn!("failed to load sprite '{}'; falling back to vector fries", src);
        });
        img.set_onload(Some(onload.unchecked_ref()));
        img.set_onerror(Some(onerror.unchecked_ref()));
        img.set_src(source);
    }
    Ok(())
}

/// The hero particle field mounted in the page
#[wasm_bindgen]
pub struct HeroParticles {
    field: SharedField,
    window: Window,
    container: HtmlElement,
    observer: Option<IntersectionObserver>,
    timers: RefCell<Vec<i32>>,
    _raf: RafCallback,
    _listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl HeroParticles {
    /// Mount a field into the element with id `container_id`.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str) -> Result<HeroParticles, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let container: HtmlElement = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{}", container_id)))?
            .dyn_into()
            .map_err(|_| JsValue::from_str("container is not an HTML element"))?;

        let canvas: HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("failed to create canvas"))?;
        canvas.set_attribute("aria-hidden", "true")?;
        let style = canvas.style();
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("display", "block")?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("2d context unavailable")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("unexpected context type"))?;
        container.append_child(&canvas)?;

        let host_vars = read_theme_vars(&window);
        let theme = Theme::resolve(&ThemeSource::default(), &host_vars).unwrap_or_else(|e| {
            log::warn!("{}; using default theme", e);
            Theme::default()
        });

        let raf: RafCallback = Rc::new(RefCell::new(None));
        let scheduler = RafScheduler {
            window: window.clone(),
            callback: raf.clone(),
            handle: Cell::new(None),
        };
        let mut host =
            BrowserHost { window: window.clone(), container: container.clone(), canvas, ctx };
        let options = SimOptions { theme, ..Default::default() };
        let field: SharedField =
            Rc::new(RefCell::new(ParticleField::new(&mut host, Box::new(scheduler), options)));
        field.borrow_mut().add_hook(Box::new(PointerTrail::default()));

        let weak = Rc::downgrade(&field);
        *raf.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(move |now: f64| {
            with_field(&weak, |field| {
                field.frame(now);
            });
        }));

        load_sprite_images(&field, &DEFAULT_SOURCES)?;

        let mut listeners = Vec::new();

        let weak = Rc::downgrade(&field);
        let resize_host = host.clone();
        listeners.push(Listener::add(&window, "resize", false, move |_| {
            with_field(&weak, |field| field.resize_to_host(&resize_host));
        })?);

        if let Some(mq) = window.match_media(REDUCED_MOTION_QUERY)? {
            if mq.matches() {
                field.borrow_mut().set_reduced_motion(true);
            }
            let weak = Rc::downgrade(&field);
            listeners.push(Listener::add(&mq, "change", false, move |ev| {
                if let Some(ev) = ev.dyn_ref::<MediaQueryListEvent>() {
                    let reduced = ev.matches();
                    with_field(&weak, |field| field.set_reduced_motion(reduced));
                }
            })?);
        }

        let hero: HtmlElement = match container.closest(".hero")? {
            Some(el) => {
                el.dyn_into().map_err(|_| JsValue::from_str(".hero is not an HTML element"))?
            }
            None => document.body().ok_or("no body")?,
        };

        let (weak, c) = (Rc::downgrade(&field), container.clone());
        listeners.push(Listener::add(&hero, "pointerdown", false, move |ev| {
            if let Some(ev) = ev.dyn_ref::<PointerEvent>() {
                let (x, y) = local_point(&c, ev.client_x() as f64, ev.client_y() as f64);
                with_field(&weak, |field| field.pointer_down(x, y));
            }
        })?);

        let (weak, c) = (Rc::downgrade(&field), container.clone());
        listeners.push(Listener::add(&hero, "touchstart", true, move |ev| {
            let touch = ev.dyn_ref::<TouchEvent>().and_then(|ev| ev.touches().get(0));
            if let Some(touch) = touch {
                let (x, y) = local_point(&c, touch.client_x() as f64, touch.client_y() as f64);
                with_field(&weak, |field| field.pointer_down(x, y));
            }
        })?);

        let (weak, c) = (Rc::downgrade(&field), container.clone());
        listeners.push(Listener::add(&hero, "pointermove", false, move |ev| {
            if let Some(ev) = ev.dyn_ref::<PointerEvent>() {
                let (x, y) = local_point(&c, ev.client_x() as f64, ev.client_y() as f64);
                with_field(&weak, |field| field.pointer_move(x, y));
            }
        })?);

        let weak = Rc::downgrade(&field);
        listeners.push(Listener::add(&hero, "pointerleave", false, move |_| {
            with_field(&weak, |field| field.pointer_leave());
        })?);

        let has_observer =
            js_sys::Reflect::has(&window, &JsValue::from_str("IntersectionObserver"))?;
        let observer = if has_observer {
            let weak = Rc::downgrade(&field);
            let callback = Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
                move |entries: js_sys::Array, _: IntersectionObserver| {
                    for entry in entries.iter() {
                        let entry: IntersectionObserverEntry = entry.unchecked_into();
                        let ratio =
                            if entry.is_intersecting() { entry.intersection_ratio() } else { 0.0 };
                        with_field(&weak, |field| field.set_visibility(ratio));
                    }
                },
            );
            let init = IntersectionObserverInit::new();
            init.set_threshold(&JsValue::from_f64(VISIBILITY_THRESHOLD));
            let observer =
                IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
            observer.observe(&hero);
            // The observer owns the callback from here on
            callback.forget();
            Some(observer)
        } else {
            field.borrow_mut().start();
            None
        };

        Ok(HeroParticles {
            field,
            window,
            container,
            observer,
            timers: RefCell::new(Vec::new()),
            _raf: raf,
            _listeners: listeners,
        })
    }

    pub fn start(&self) {
        self.field.borrow_mut().start();
    }

    pub fn stop(&self) {
        self.field.borrow_mut().stop();
    }

    #[wasm_bindgen(getter, js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.field.borrow().is_running()
    }

    /// Throw a burst of fries from (x, y) in container coordinates.
    pub fn burst(&self, x: f64, y: f64) {
        self.field.borrow_mut().emit_burst(x, y);
    }

    /// Fire a debris impact at (x, y) now.
    pub fn impact(&self, x: f64, y: f64) {
        self.field.borrow_mut().sim_mut().trigger_impact(x, y, DEFAULT_DEBRIS, DEFAULT_DUST);
    }

    /// Queue an impact at fractions (fx, fy) of the field, `delay_ms` from now.
    #[wasm_bindgen(js_name = scheduleImpact)]
    pub fn schedule_impact(&self, delay_ms: u32, fx: f64, fy: f64) {
        let spec = ImpactSpec {
            delay_ms: delay_ms as u64,
            at: [fx, fy],
            debris: DEFAULT_DEBRIS,
            dust: DEFAULT_DUST,
        };
        self.field.borrow_mut().sim_mut().schedule_impact(spec);
    }

    /// Crash `debris` pieces into the center of the first element matching
    /// `selector` now. Returns whether the element exists.
    #[wasm_bindgen(js_name = lineImpact)]
    pub fn line_impact(&self, selector: &str, debris: usize) -> Result<bool, JsValue> {
        let Some(target) = self.query(selector)? else {
            return Ok(false);
        };
        impact_at_element(&Rc::downgrade(&self.field), &self.container, &target, debris);
        Ok(true)
    }

    /// Like [`line_impact`](Self::line_impact), `delay_ms` from now. The
    /// element is measured when the timer fires.
    #[wasm_bindgen(js_name = scheduleLineImpact)]
    pub fn schedule_line_impact(
        &self,
        selector: &str,
        delay_ms: u32,
        debris: usize,
    ) -> Result<bool, JsValue> {
        let Some(target) = self.query(selector)? else {
            return Ok(false);
        };
        let (weak, container) = (Rc::downgrade(&self.field), self.container.clone());
        let callback = Closure::once_into_js(move || {
            impact_at_element(&weak, &container, &target, debris);
        });
        let handle = self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            delay_ms.min(i32::MAX as u32) as i32,
        )?;
        self.timers.borrow_mut().push(handle);
        Ok(true)
    }

    /// Live entity counts as a JSON string
    pub fn stats(&self) -> String {
        serde_json::to_string(&self.field.borrow().sim().stats()).unwrap_or_default()
    }
}

impl HeroParticles {
    fn query(&self, selector: &str) -> Result<Option<Element>, JsValue> {
        match self.window.document() {
            Some(document) => document.query_selector(selector),
            None => Ok(None),
        }
    }
}

impl Drop for HeroParticles {
    fn drop(&mut self) {
        for handle in self.timers.get_mut().drain(..) {
            self.window.clear_timeout_with_handle(handle);
        }
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        if let Ok(mut field) = self.field.try_borrow_mut() {
            field.stop();
        }
    }
}

/// Mount the field into `#particles` unless it already holds a canvas, and
/// crash the headline lines in once the page has settled.
#[wasm_bindgen(js_name = initParticles)]
pub fn init_particles() -> Result<Option<HeroParticles>, JsValue> {
    let document = web_sys::window().and_then(|w| w.document()).ok_or("no document")?;
    let Some(container) = document.get_element_by_id("particles") else {
        return Ok(None);
    };
    if container.query_selector("canvas")?.is_some() {
        return Ok(None);
    }
    let hero = HeroParticles::new("particles")?;
    for (selector, delay_ms) in HEADLINE_IMPACTS {
        hero.schedule_line_impact(selector, delay_ms, DEFAULT_DEBRIS)?;
    }
    Ok(Some(hero))
}
