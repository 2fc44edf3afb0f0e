#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for [`TurnOrderApp`].
//!
//! This module wraps [`super::runner_core::RunnerCore`] with JS-friendly types
//! and supplies the browser collaborators: `localStorage` for the persisted
//! mode and `navigator.maxTouchPoints` for the contact limit. Only compiled
//! on `wasm32` targets.

use js_sys::{Array, Object, Reflect, Uint32Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::runner_core::{
    CountInputState, RunnerCore, bounded_fairness_counts, bounded_turn_order,
};
use turnorder_core::{ModeStore, Notice, PickerConfig, SystemRandom};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<js_sys::Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn method(target: &JsValue, name: &str) -> Option<js_sys::Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<js_sys::Function>()
        .ok()
}

/// `localStorage`-backed mode store.
///
/// Missing storage (private mode, sandboxed iframes) and quota errors are
/// swallowed: loads return `None`, stores do nothing.
struct LocalStorageModeStore {
    storage: Option<JsValue>,
}

impl LocalStorageModeStore {
    fn new() -> Self {
        let storage = Reflect::get(&js_sys::global(), &"localStorage".into())
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null());
        Self { storage }
    }
}

impl ModeStore for LocalStorageModeStore {
    fn load(&self, key: &str) -> Option<String> {
        let storage = self.storage.as_ref()?;
        let get_item = method(storage, "getItem")?;
        get_item
            .call1(storage, &JsValue::from_str(key))
            .ok()?
            .as_string()
    }

    fn store(&mut self, key: &str, value: &str) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        let Some(set_item) = method(storage, "setItem") else {
            return;
        };
        let _ = set_item.call2(storage, &JsValue::from_str(key), &JsValue::from_str(value));
    }
}

/// `navigator.maxTouchPoints`, if the browser reports one.
fn device_max_touch_points() -> Option<u32> {
    let navigator = Reflect::get(&js_sys::global(), &"navigator".into()).ok()?;
    let points = Reflect::get(&navigator, &"maxTouchPoints".into())
        .ok()?
        .as_f64()?;
    (points.is_finite() && points >= 0.0).then_some(points as u32)
}

fn notice_to_js(notice: &Notice) -> JsValue {
    let obj = Object::new();
    set_js(&obj, "kind", JsValue::from_str(notice.kind()));
    match *notice {
        Notice::MarkerCreated { id, slot, position } => {
            set_js(&obj, "id", JsValue::from_f64(f64::from(id.0)));
            set_js(&obj, "slot", JsValue::from_f64(slot as f64));
            set_js(&obj, "x", JsValue::from_f64(f64::from(position.x)));
            set_js(&obj, "y", JsValue::from_f64(f64::from(position.y)));
        }
        Notice::MarkerMoved { id, position } => {
            set_js(&obj, "id", JsValue::from_f64(f64::from(id.0)));
            set_js(&obj, "x", JsValue::from_f64(f64::from(position.x)));
            set_js(&obj, "y", JsValue::from_f64(f64::from(position.y)));
        }
        Notice::MarkerRemoved { id }
        | Notice::CapacityPulse { id }
        | Notice::Highlight { id }
        | Notice::WinnerSelected { id }
        | Notice::WinnerReleased { id } => {
            set_js(&obj, "id", JsValue::from_f64(f64::from(id.0)));
        }
        Notice::CountChanged { count } => {
            set_js(&obj, "count", JsValue::from_f64(count as f64));
        }
        Notice::ModeChanged { mode } | Notice::ModeSwitchRejected { requested: mode } => {
            set_js(&obj, "mode", JsValue::from_str(mode.as_str()));
        }
        Notice::AnticipationStarted | Notice::AnticipationStopped | Notice::Reset => {}
    }
    obj.into()
}

fn strings_to_js(items: Vec<String>) -> Array {
    let arr = Array::new();
    for item in items {
        arr.push(&JsValue::from_str(&item));
    }
    arr
}

fn count_state_to_js(state: &CountInputState) -> JsValue {
    let obj = Object::new();
    match &state.error {
        Some(err) => set_js(&obj, "error", JsValue::from_str(&err.to_string())),
        None => set_js(&obj, "error", JsValue::NULL),
    }
    set_js(&obj, "generate_enabled", state.generate_enabled.into());
    obj.into()
}

/// Turn-order picker for the browser.
///
/// Host-driven: JavaScript forwards pointer events, advances time every
/// `requestAnimationFrame`, calls `step()`, and renders the drained notices.
#[wasm_bindgen]
pub struct TurnOrderApp {
    inner: RunnerCore,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

impl TurnOrderApp {
    fn from_config(config: PickerConfig) -> Result<Self, JsValue> {
        install_panic_hook();
        let mut inner = RunnerCore::new(config, Box::new(LocalStorageModeStore::new()))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        inner.set_device_max_touch_points(device_max_touch_points());
        Ok(Self { inner })
    }
}

#[wasm_bindgen]
impl TurnOrderApp {
    /// Create an app with default timing and limits.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<TurnOrderApp, JsValue> {
        Self::from_config(PickerConfig::default())
    }

    /// Create an app from a JSON configuration object; missing fields keep
    /// their defaults.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<TurnOrderApp, JsValue> {
        let config =
            PickerConfig::from_json_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Self::from_config(config)
    }

    /// Advance the deterministic clock by `dt_ms` milliseconds.
    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, dt_ms: f64) {
        self.inner.advance_time_ms(dt_ms);
    }

    /// Set the deterministic clock to absolute milliseconds.
    #[wasm_bindgen(js_name = setTime)]
    pub fn set_time(&mut self, ts_ms: f64) {
        self.inner.set_time_ms(ts_ms);
    }

    /// Parse a JSON-encoded input and queue it.
    /// Returns `true` if accepted, `false` if unsupported/malformed.
    #[wasm_bindgen(js_name = pushEncodedInput)]
    pub fn push_encoded_input(&mut self, json: &str) -> bool {
        self.inner.push_encoded_input(json)
    }

    /// Queue a pointer press. Pass `0` for an unreported width/height.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, pointer_id: u32, x: f32, y: f32, width: f32, height: f32) {
        self.inner.pointer_down(pointer_id, x, y, width, height);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, pointer_id: u32, x: f32, y: f32) {
        self.inner.pointer_move(pointer_id, x, y);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, pointer_id: u32) {
        self.inner.pointer_up(pointer_id);
    }

    #[wasm_bindgen(js_name = pointerCancel)]
    pub fn pointer_cancel(&mut self, pointer_id: u32) {
        self.inner.pointer_cancel(pointer_id);
    }

    /// Apply queued input, fire due timers, and flush marker positions.
    ///
    /// Returns `{ inputs_processed, frame_flushed, rejected }`.
    pub fn step(&mut self) -> JsValue {
        let result = self.inner.step();
        let obj = Object::new();
        set_js(
            &obj,
            "inputs_processed",
            JsValue::from_f64(result.inputs_processed as f64),
        );
        set_js(
            &obj,
            "frame_flushed",
            JsValue::from_f64(result.frame_flushed as f64),
        );
        set_js(&obj, "rejected", JsValue::from_f64(result.rejected.len() as f64));
        obj.into()
    }

    /// Drain presentation notices as plain objects with a `kind` field.
    #[wasm_bindgen(js_name = takeNotices)]
    pub fn take_notices(&mut self) -> Array {
        let arr = Array::new();
        for notice in self.inner.take_notices() {
            arr.push(&notice_to_js(&notice));
        }
        arr
    }

    /// Current mode name (`"count-entry"` or `"contact-pick"`).
    pub fn mode(&self) -> String {
        self.inner.mode().as_str().to_owned()
    }

    /// Request a mode by name. Returns `false` if refused or unknown.
    #[wasm_bindgen(js_name = requestMode)]
    pub fn request_mode(&mut self, name: &str) -> bool {
        self.inner.request_mode(name)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    #[wasm_bindgen(js_name = selectionActive)]
    pub fn selection_active(&self) -> bool {
        self.inner.selection_active()
    }

    pub fn winner(&self) -> Option<u32> {
        self.inner.winner()
    }

    #[wasm_bindgen(js_name = activeCount)]
    pub fn active_count(&self) -> u32 {
        self.inner.active_count() as u32
    }

    /// Test hook: force the selection flag.
    #[wasm_bindgen(js_name = forceSelectionActive)]
    pub fn force_selection_active(&mut self, active: bool) -> bool {
        self.inner.force_selection_active(active)
    }

    /// Live-validate the player-count field.
    ///
    /// Returns `{ error: string | null, generate_enabled: boolean }`.
    #[wasm_bindgen(js_name = setCountInput)]
    pub fn set_count_input(&mut self, text: &str) -> JsValue {
        count_state_to_js(&self.inner.set_count_input(text))
    }

    /// Generate a turn order from the field text.
    ///
    /// Returns `{ order: Uint32Array, text: string }` or `{ error: string }`.
    pub fn generate(&mut self) -> JsValue {
        let obj = Object::new();
        match self.inner.generate() {
            Ok(order) => {
                set_js(&obj, "order", Uint32Array::from(order.as_slice()).into());
                set_js(&obj, "text", JsValue::from_str(&self.inner.formatted_order()));
            }
            Err(err) => set_js(&obj, "error", JsValue::from_str(&err.to_string())),
        }
        obj.into()
    }

    #[wasm_bindgen(js_name = lastValidCount)]
    pub fn last_valid_count(&self) -> Option<u32> {
        self.inner.last_valid_count()
    }

    #[wasm_bindgen(js_name = takeAnnouncements)]
    pub fn take_announcements(&mut self) -> Array {
        strings_to_js(self.inner.take_announcements())
    }

    #[wasm_bindgen(js_name = takeLogs)]
    pub fn take_logs(&mut self) -> Array {
        strings_to_js(self.inner.take_logs())
    }
}

/// Shuffled `[1..=n]` from the secure source, for inspection and tests.
///
/// Counts above the player maximum return an empty array.
#[wasm_bindgen(js_name = generateTurnOrder)]
pub fn generate_turn_order_js(n: u32) -> Uint32Array {
    let order = bounded_turn_order(n, &mut SystemRandom::new());
    Uint32Array::from(order.as_slice())
}

/// Per-index hit counts of `samples` draws over `candidates` indices.
///
/// Zero candidates, or more than the player maximum, return an empty array.
#[wasm_bindgen(js_name = sampleFairness)]
pub fn sample_fairness(candidates: u32, samples: u32) -> Uint32Array {
    let counts = bounded_fairness_counts(&mut SystemRandom::new(), candidates, samples);
    Uint32Array::from(counts.as_slice())
}
