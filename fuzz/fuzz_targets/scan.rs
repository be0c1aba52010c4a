#![no_main]

use libfuzzer_sys::fuzz_target;
use yamlstream::{Scanner, TokenData};

fuzz_target!(|data: &[u8]| {
    let mut input = data;
    let mut scanner = Scanner::new();
    scanner.set_input_string(&mut input);
    while let Ok(token) = scanner.scan() {
        if matches!(token.data, TokenData::StreamEnd) {
            break;
        }
    }
});
