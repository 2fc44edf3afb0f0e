#![forbid(unsafe_code)]

//! Browser runner for the turn-order picker.
//!
//! This crate provides [`TurnOrderApp`], a `wasm-bindgen`-exported struct
//! that wraps `turnorder_web::PickerHost` plus the count-entry form and
//! exposes both to JavaScript for host-driven execution. The page forwards
//! pointer events, calls `advanceTime`/`step` once per animation frame, and
//! renders the notices it takes back.

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::TurnOrderApp;

// Runner core is used by the wasm module and by native tests.
#[cfg(any(target_arch = "wasm32", test))]
mod runner_core;
