#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlstream::{Emitter, EventData, Parser};

// Any event stream the parser accepts must be emittable.
fuzz_target!(|data: &[u8]| {
    let mut input = data;
    let mut parser = Parser::new();
    parser.set_input_string(&mut input);
    let mut events = Vec::new();
    loop {
        match parser.parse() {
            Ok(event) => {
                let done = matches!(event.data, EventData::StreamEnd);
                events.push(event);
                if done {
                    break;
                }
            }
            Err(_) => return,
        }
    }
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    for event in events {
        emitter.emit(event).expect("parsed events must emit");
    }
});
