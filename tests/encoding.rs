use pretty_assertions::assert_eq;
use yamlstream::{Encoding, Event, EventData, Parser, ParserError, ReaderError, ScannerError};

const DOC: &str = "key: value\nlist:\n  - caf\u{00e9}\n  - \"\u{263a}\"\n";

fn parse_all(input: &[u8], encoding: Option<Encoding>) -> Vec<Event> {
    let mut bytes = input;
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    if let Some(encoding) = encoding {
        parser.set_encoding(encoding);
    }
    let mut events = Vec::new();
    loop {
        let event = parser.parse().unwrap();
        let done = matches!(event.data, EventData::StreamEnd);
        events.push(event);
        if done {
            return events;
        }
    }
}

fn utf16(input: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    if bom {
        bytes.extend(if big_endian {
            [0xfe, 0xff]
        } else {
            [0xff, 0xfe]
        });
    }
    for unit in input.encode_utf16() {
        bytes.extend(if big_endian {
            unit.to_be_bytes()
        } else {
            unit.to_le_bytes()
        });
    }
    bytes
}

/// Strip the encoding payload so streams from different encodings compare
/// equal.
fn data_without_encoding(events: Vec<Event>) -> Vec<EventData> {
    events
        .into_iter()
        .map(|event| match event.data {
            EventData::StreamStart { .. } => EventData::StreamStart {
                encoding: Encoding::Any,
            },
            data => data,
        })
        .collect()
}

#[test]
fn bom_and_encoding_only_change_the_stream_start_payload() {
    let plain = parse_all(DOC.as_bytes(), None);
    assert!(matches!(
        plain[0].data,
        EventData::StreamStart {
            encoding: Encoding::Utf8
        }
    ));

    let mut with_bom = b"\xEF\xBB\xBF".to_vec();
    with_bom.extend(DOC.as_bytes());
    let bom_events = parse_all(&with_bom, None);

    let le_events = parse_all(&utf16(DOC, false, true), None);
    assert!(matches!(
        le_events[0].data,
        EventData::StreamStart {
            encoding: Encoding::Utf16Le
        }
    ));

    let be_events = parse_all(&utf16(DOC, true, true), None);
    assert!(matches!(
        be_events[0].data,
        EventData::StreamStart {
            encoding: Encoding::Utf16Be
        }
    ));

    let plain = data_without_encoding(plain);
    assert_eq!(plain, data_without_encoding(bom_events));
    assert_eq!(plain, data_without_encoding(le_events));
    assert_eq!(plain, data_without_encoding(be_events));
}

#[test]
fn explicit_encoding_overrides_detection() {
    // Without a BOM, UTF-16 content must be announced by the caller.
    let bytes = utf16(DOC, false, false);
    let events = parse_all(&bytes, Some(Encoding::Utf16Le));
    assert!(matches!(
        events[0].data,
        EventData::StreamStart {
            encoding: Encoding::Utf16Le
        }
    ));
    assert_eq!(
        data_without_encoding(events),
        data_without_encoding(parse_all(DOC.as_bytes(), None))
    );
}

#[test]
fn invalid_utf8_surfaces_as_a_decoder_error() {
    let mut bytes: &[u8] = b"key: \xC0\xAF\n";
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    let err = loop {
        match parser.parse() {
            Ok(_) => {}
            Err(err) => break err,
        }
    };
    assert!(matches!(
        err,
        ParserError::Scanner(ScannerError::Reader(ReaderError::Decoder(_)))
    ));
}

#[test]
fn control_characters_are_rejected() {
    let mut bytes: &[u8] = b"key: a\x01b\n";
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    let err = loop {
        match parser.parse() {
            Ok(_) => {}
            Err(err) => break err,
        }
    };
    assert!(err.to_string().contains("control characters are not allowed"));
}
