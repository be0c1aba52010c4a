use pretty_assertions::assert_eq;
use yamlstream::{
    Break, Emitter, EmitterError, Encoding, Event, EventData, MappingStyle, Parser, ScalarStyle,
    SequenceStyle, StandardResolver, INT_TAG, STR_TAG,
};

fn emit_to_string(configure: impl FnOnce(&mut Emitter), events: Vec<Event>) -> String {
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    configure(&mut emitter);
    for event in events {
        emitter.emit(event).unwrap();
    }
    String::from_utf8(output).unwrap()
}

fn mapping_events(pairs: &[(&str, &str)]) -> Vec<Event> {
    let mut events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::mapping_start(None, None, true, MappingStyle::Any),
    ];
    for (key, value) in pairs {
        events.push(Event::scalar(None, None, key, true, true, ScalarStyle::Any));
        events.push(Event::scalar(None, None, value, true, true, ScalarStyle::Any));
    }
    events.push(Event::mapping_end());
    events.push(Event::document_end(true));
    events.push(Event::stream_end());
    events
}

#[test]
fn block_mapping_output() {
    let output = emit_to_string(|_| {}, mapping_events(&[("key", "value"), ("a", "b")]));
    assert_eq!(output, "key: value\na: b\n");
}

#[test]
fn canonical_output_is_flow_and_double_quoted() {
    let output = emit_to_string(
        |emitter| emitter.set_canonical(true),
        mapping_events(&[("a", "b")]),
    );
    assert_eq!(output, "---\n{\n  ? \"a\"\n  : \"b\",\n}\n");
}

#[test]
fn indent_is_configurable() {
    let events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::mapping_start(None, None, true, MappingStyle::Block),
        Event::scalar(None, None, "outer", true, true, ScalarStyle::Any),
        Event::sequence_start(None, None, true, SequenceStyle::Block),
        Event::scalar(None, None, "x", true, true, ScalarStyle::Any),
        Event::sequence_end(),
        Event::mapping_end(),
        Event::document_end(true),
        Event::stream_end(),
    ];
    let output = emit_to_string(|emitter| emitter.set_indent(4), events);
    assert_eq!(output, "outer:\n- x\n");

    // A nested mapping actually indents.
    let events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::mapping_start(None, None, true, MappingStyle::Block),
        Event::scalar(None, None, "outer", true, true, ScalarStyle::Any),
        Event::mapping_start(None, None, true, MappingStyle::Block),
        Event::scalar(None, None, "inner", true, true, ScalarStyle::Any),
        Event::scalar(None, None, "x", true, true, ScalarStyle::Any),
        Event::mapping_end(),
        Event::mapping_end(),
        Event::document_end(true),
        Event::stream_end(),
    ];
    let output = emit_to_string(|emitter| emitter.set_indent(4), events);
    assert_eq!(output, "outer:\n    inner: x\n");
}

#[test]
fn width_hint_breaks_long_flow_lines() {
    let mut events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::sequence_start(None, None, true, SequenceStyle::Flow),
    ];
    for _ in 0..8 {
        events.push(Event::scalar(
            None,
            None,
            "abcdefghij",
            true,
            true,
            ScalarStyle::Any,
        ));
    }
    events.push(Event::sequence_end());
    events.push(Event::document_end(true));
    events.push(Event::stream_end());

    let output = emit_to_string(|emitter| emitter.set_width(24), events);
    assert!(
        output.lines().count() > 2,
        "expected the flow sequence to break: {output:?}"
    );
    for line in output.lines() {
        assert!(line.len() <= 36, "line too long: {line:?}");
    }
}

#[test]
fn long_plain_scalars_fold_at_spaces_and_round_trip() {
    let value = "words ".repeat(30).trim_end().to_string();
    let events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::scalar(None, None, &value, true, true, ScalarStyle::Plain),
        Event::document_end(true),
        Event::stream_end(),
    ];
    let output = emit_to_string(|_| {}, events);
    assert!(output.lines().count() > 1);

    let mut bytes = output.as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    parser.parse().unwrap();
    parser.parse().unwrap();
    let scalar = parser.parse().unwrap();
    match scalar.data {
        EventData::Scalar { value: parsed, .. } => assert_eq!(parsed, value),
        other => panic!("expected a scalar, got {other:?}"),
    }
}

#[test]
fn non_ascii_is_escaped_unless_unicode_is_enabled() {
    let events = |style| {
        vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::scalar(None, None, "caf\u{00e9}", true, true, style),
            Event::document_end(true),
            Event::stream_end(),
        ]
    };
    let escaped = emit_to_string(|_| {}, events(ScalarStyle::Any));
    assert_eq!(escaped, "\"caf\\xE9\"\n");

    let verbatim = emit_to_string(|emitter| emitter.set_unicode(true), events(ScalarStyle::Any));
    assert_eq!(verbatim, "caf\u{00e9}\n");
}

#[test]
fn astral_plane_escapes_use_eight_digits() {
    let events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::scalar(None, None, "\u{1f600}", true, true, ScalarStyle::DoubleQuoted),
        Event::document_end(true),
        Event::stream_end(),
    ];
    let output = emit_to_string(|_| {}, events);
    assert_eq!(output, "\"\\U0001F600\"\n");
}

#[test]
fn crlf_breaks_are_configurable() {
    let output = emit_to_string(
        |emitter| emitter.set_break(Break::CrLn),
        mapping_events(&[("a", "b")]),
    );
    assert_eq!(output, "a: b\r\n");
}

#[test]
fn utf16_output_starts_with_a_bom() {
    let mut output = Vec::new();
    {
        let mut emitter = Emitter::new();
        emitter.set_encoding(Encoding::Utf16Le);
        emitter.set_output(&mut output);
        emitter.emit(Event::stream_start(Encoding::Utf16Le)).unwrap();
        emitter.emit(Event::document_start(None, &[], true)).unwrap();
        emitter
            .emit(Event::scalar(None, None, "hi", true, true, ScalarStyle::Plain))
            .unwrap();
        emitter.emit(Event::document_end(true)).unwrap();
        emitter.emit(Event::stream_end()).unwrap();
    }
    assert_eq!(&output[..2], &[0xff, 0xfe]);
    // "hi\n" in UTF-16-LE follows the BOM.
    assert_eq!(&output[2..], [b'h', 0x00, b'i', 0x00, b'\n', 0x00]);
}

#[test]
fn resolver_quotes_misleading_plain_strings() {
    let scalar = |value: &str| {
        vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::scalar(None, Some(STR_TAG), value, true, true, ScalarStyle::Any),
            Event::document_end(true),
            Event::stream_end(),
        ]
    };

    let mut resolver = StandardResolver::new();
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    emitter.set_resolver(&mut resolver);
    for event in scalar("yes") {
        emitter.emit(event).unwrap();
    }
    assert_eq!(String::from_utf8(output).unwrap(), "'yes'\n");

    let mut resolver = StandardResolver::new();
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    emitter.set_resolver(&mut resolver);
    for event in scalar("hello") {
        emitter.emit(event).unwrap();
    }
    assert_eq!(String::from_utf8(output).unwrap(), "hello\n");
}

#[test]
fn quoted_implicit_omits_the_tag_for_quoted_styles() {
    // Tag omission for non-plain styles is governed by the
    // quoted-implicit flag alone; the tag string is not inspected.
    let events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::scalar(
            None,
            Some(INT_TAG),
            "5",
            false,
            true,
            ScalarStyle::SingleQuoted,
        ),
        Event::document_end(true),
        Event::stream_end(),
    ];
    let output = emit_to_string(|_| {}, events);
    assert_eq!(output, "'5'\n");

    // With quoted-implicit unset the tag is written out.
    let events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
        Event::scalar(
            None,
            Some(INT_TAG),
            "5",
            false,
            false,
            ScalarStyle::SingleQuoted,
        ),
        Event::document_end(true),
        Event::stream_end(),
    ];
    let output = emit_to_string(|_| {}, events);
    assert_eq!(output, "!!int '5'\n");
}

#[test]
fn invalid_event_sequences_poison_the_emitter() {
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    let err = emitter
        .emit(Event::scalar(None, None, "x", true, true, ScalarStyle::Any))
        .unwrap_err();
    assert!(err.to_string().contains("expected STREAM-START"));
    assert!(matches!(
        emitter.emit(Event::stream_start(Encoding::Utf8)),
        Err(EmitterError::Poisoned)
    ));
    emitter.reset();
}

#[test]
fn nothing_after_stream_end() {
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    emitter.emit(Event::stream_start(Encoding::Utf8)).unwrap();
    emitter.emit(Event::stream_end()).unwrap();
    let err = emitter.emit(Event::stream_end()).unwrap_err();
    assert!(err.to_string().contains("expected nothing after STREAM-END"));
}
