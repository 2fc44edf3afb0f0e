#![no_main]

use libfuzzer_sys::fuzz_target;
use turnorder_web::input_parser::{parse_encoded_input, parse_encoded_inputs};

fuzz_target!(|data: &[u8]| {
    // Arbitrary text must parse or fail cleanly, never panic.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let single = parse_encoded_input(text);
    let batch = parse_encoded_inputs(text);

    // A one-element array agrees with the single-event parser.
    if let Ok(Some(input)) = single {
        let wrapped = format!("[{text}]");
        assert_eq!(parse_encoded_inputs(&wrapped), Ok(vec![input]));
    }
    if let Ok(inputs) = batch {
        for input in &inputs {
            let _ = input.kind();
        }
    }
});
