#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlstream::{EventData, Parser};

fuzz_target!(|data: &[u8]| {
    let mut input = data;
    let mut parser = Parser::new();
    parser.set_input_string(&mut input);
    while let Ok(event) = parser.parse() {
        if matches!(event.data, EventData::StreamEnd) {
            break;
        }
    }
});
