#![forbid(unsafe_code)]

//! Browser-encoded JSON events through the parser and into a host.

use std::time::Duration;

use pretty_assertions::assert_eq;
use turnorder_core::{ContactId, MemoryModeStore, Mode, PickerConfig, SeededRandom};
use turnorder_web::PickerHost;
use turnorder_web::input_parser::{InputParseError, parse_encoded_input, parse_encoded_inputs};

fn host() -> PickerHost<SeededRandom> {
    PickerHost::new(
        PickerConfig::default(),
        Box::new(MemoryModeStore::new()),
        SeededRandom::new(11),
    )
    .unwrap()
}

#[test]
fn json_stream_drives_a_full_round() {
    let mut h = host();
    let batch = parse_encoded_inputs(
        r#"[
            {"kind":"mode","mode":"contact-pick"},
            {"kind":"pointer","phase":"down","id":11,"x":40,"y":60,"w":22,"h":24},
            {"kind":"pointer","phase":"down","id":12,"x":240,"y":60,"w":20,"h":20},
            {"kind":"pointer","phase":"down","id":13,"x":140,"y":300,"w":190,"h":170},
            {"kind":"wheel","dx":0,"dy":3}
        ]"#,
    )
    .unwrap();
    assert_eq!(batch.len(), 4);
    for input in batch {
        h.push_input(input);
    }
    let first = h.step();
    assert_eq!(first.inputs_processed, 4);
    assert_eq!(first.rejected.len(), 1, "palm-sized contact is rejected");
    assert_eq!(h.session().mode(), Mode::ContactPick);
    assert_eq!(h.session().active_count(), 2);

    h.advance_time(Duration::from_millis(2_000));
    h.step();
    let winner = h.session().winner().unwrap();
    assert!(winner == ContactId(11) || winner == ContactId(12));

    let up = parse_encoded_input(&format!(
        r#"{{"kind":"pointer","phase":"up","id":{}}}"#,
        winner.0
    ))
    .unwrap()
    .unwrap();
    h.push_input(up);
    h.step();
    assert!(h.session().winner_marker_retained());
}

#[test]
fn first_bad_element_fails_the_batch() {
    let err = parse_encoded_inputs(
        r#"[{"kind":"reset"},{"kind":"pointer","phase":"down","id":1}]"#,
    )
    .unwrap_err();
    assert_eq!(err, InputParseError::MissingField("x"));
}

#[test]
fn error_messages_are_readable() {
    let err = parse_encoded_input(r#"{"kind":"pointer","phase":"wiggle","id":1}"#).unwrap_err();
    assert_eq!(err.to_string(), "unknown phase: wiggle");
}
