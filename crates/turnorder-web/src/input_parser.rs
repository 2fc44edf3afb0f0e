#![forbid(unsafe_code)]

//! JSON input parser for converting browser-encoded pointer events to
//! [`ContactInput`] values.
//!
//! Schema, one object per event:
//!
//! ```text
//! {"kind":"pointer","phase":"down|move|up|cancel","id":N,"x":F,"y":F,"w":F,"h":F}
//! {"kind":"reset"}
//! {"kind":"mode","mode":"count-entry|contact-pick"}
//! ```
//!
//! `w`/`h` are the contact footprint and only matter on `down`. Kinds without
//! a [`ContactInput`] mapping (keyboard, focus, future additions) return
//! `Ok(None)`.

use serde::Deserialize;
use turnorder_core::{ContactId, Mode, Position, SizeHint};

use crate::ContactInput;

/// Errors from parsing encoded input JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
    /// Unknown pointer phase value.
    UnknownPhase(String),
    /// Unknown mode name.
    UnknownMode(String),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownPhase(phase) => write!(f, "unknown phase: {phase}"),
            Self::UnknownMode(mode) => write!(f, "unknown mode: {mode}"),
        }
    }
}

impl std::error::Error for InputParseError {}

#[derive(Debug, Deserialize)]
struct RawInput {
    kind: String,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
    #[serde(default)]
    w: Option<f32>,
    #[serde(default)]
    h: Option<f32>,
    #[serde(default)]
    mode: Option<String>,
}

/// Parse one JSON-encoded input event.
///
/// Returns `Err` for malformed JSON, missing required fields, or unknown
/// phase/mode values.
pub fn parse_encoded_input(json: &str) -> Result<Option<ContactInput>, InputParseError> {
    let raw: RawInput =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;

    match raw.kind.as_str() {
        "pointer" => parse_pointer(&raw).map(Some),
        "reset" => Ok(Some(ContactInput::Reset)),
        "mode" => parse_mode(&raw).map(Some),
        _ => Ok(None),
    }
}

/// Parse a JSON array of encoded events, skipping unmapped kinds.
///
/// Stops at the first invalid element.
pub fn parse_encoded_inputs(json: &str) -> Result<Vec<ContactInput>, InputParseError> {
    let items: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;
    let mut inputs = Vec::with_capacity(items.len());
    for item in items {
        let raw: RawInput =
            serde_json::from_value(item).map_err(|e| InputParseError::Json(e.to_string()))?;
        let parsed = match raw.kind.as_str() {
            "pointer" => Some(parse_pointer(&raw)?),
            "reset" => Some(ContactInput::Reset),
            "mode" => Some(parse_mode(&raw)?),
            _ => None,
        };
        inputs.extend(parsed);
    }
    Ok(inputs)
}

fn position(raw: &RawInput) -> Result<Position, InputParseError> {
    let x = raw.x.ok_or(InputParseError::MissingField("x"))?;
    let y = raw.y.ok_or(InputParseError::MissingField("y"))?;
    Ok(Position::new(x, y))
}

fn parse_pointer(raw: &RawInput) -> Result<ContactInput, InputParseError> {
    let phase = raw
        .phase
        .as_deref()
        .ok_or(InputParseError::MissingField("phase"))?;
    let id = ContactId(raw.id.ok_or(InputParseError::MissingField("id"))?);
    match phase {
        "down" => Ok(ContactInput::Down {
            id,
            position: position(raw)?,
            size: match (raw.w, raw.h) {
                (Some(w), Some(h)) => Some(SizeHint::new(w, h)),
                _ => None,
            },
        }),
        "move" => Ok(ContactInput::Move {
            id,
            position: position(raw)?,
        }),
        "up" => Ok(ContactInput::Up { id }),
        "cancel" => Ok(ContactInput::Cancel { id }),
        other => Err(InputParseError::UnknownPhase(other.to_string())),
    }
}

fn parse_mode(raw: &RawInput) -> Result<ContactInput, InputParseError> {
    let name = raw
        .mode
        .as_deref()
        .ok_or(InputParseError::MissingField("mode"))?;
    name.parse::<Mode>()
        .map(ContactInput::SetMode)
        .map_err(|_| InputParseError::UnknownMode(name.to_string()))
}
