use pretty_assertions::assert_eq;
use yamlstream::{Emitter, Event, EventData, Parser};

/// The comparable part of an event: round-trips preserve node structure,
/// values, anchors and explicit tags, but not styles, marks or the
/// implicit flags.
#[derive(Debug, PartialEq)]
enum Shape {
    StreamStart,
    StreamEnd,
    DocStart,
    DocEnd,
    Alias(String),
    Scalar(Option<String>, Option<String>, String),
    SeqStart(Option<String>, Option<String>),
    SeqEnd,
    MapStart(Option<String>, Option<String>),
    MapEnd,
}

fn normalize_tag(tag: &Option<String>) -> Option<String> {
    match tag.as_deref() {
        None | Some("!") => None,
        Some(tag) => Some(String::from(tag)),
    }
}

fn shape_of(event: &Event) -> Shape {
    match &event.data {
        EventData::StreamStart { .. } => Shape::StreamStart,
        EventData::StreamEnd => Shape::StreamEnd,
        EventData::DocumentStart { .. } => Shape::DocStart,
        EventData::DocumentEnd { .. } => Shape::DocEnd,
        EventData::Alias { anchor } => Shape::Alias(anchor.clone()),
        EventData::Scalar {
            anchor, tag, value, ..
        } => Shape::Scalar(anchor.clone(), normalize_tag(tag), value.clone()),
        EventData::SequenceStart { anchor, tag, .. } => {
            Shape::SeqStart(anchor.clone(), normalize_tag(tag))
        }
        EventData::SequenceEnd => Shape::SeqEnd,
        EventData::MappingStart { anchor, tag, .. } => {
            Shape::MapStart(anchor.clone(), normalize_tag(tag))
        }
        EventData::MappingEnd => Shape::MapEnd,
    }
}

fn parse_all(input: &[u8]) -> Vec<Event> {
    let mut bytes = input;
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
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

fn emit_all(events: Vec<Event>) -> Vec<u8> {
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);
    for event in events {
        emitter.emit(event).unwrap();
    }
    output
}

#[track_caller]
fn assert_roundtrip(input: &str) {
    let first = parse_all(input.as_bytes());
    let shapes: Vec<Shape> = first.iter().map(shape_of).collect();
    let output = emit_all(parse_all(input.as_bytes()));
    let reparsed = parse_all(&output);
    let reparsed_shapes: Vec<Shape> = reparsed.iter().map(shape_of).collect();
    assert_eq!(
        shapes,
        reparsed_shapes,
        "round-trip changed the event stream;\ninput: {input:?}\noutput: {:?}",
        String::from_utf8_lossy(&output)
    );
    // The second trip must be a fixed point as well.
    let again = emit_all(parse_all(&output));
    assert_eq!(
        parse_all(&again).iter().map(shape_of).collect::<Vec<_>>(),
        reparsed_shapes,
    );
}

#[test]
fn scalars_and_mappings() {
    assert_roundtrip("key: value\n");
    assert_roundtrip("a:\nb: c\n");
    assert_roundtrip("? complex key\n: complex value\n");
}

#[test]
fn sequences() {
    assert_roundtrip("- 1\n- 2\n- 3\n");
    assert_roundtrip("seq:\n- a\n- b\n");
    assert_roundtrip("- - nested\n- deeper:\n    - x\n");
}

#[test]
fn flow_collections() {
    assert_roundtrip("[a, b, {c: d}]\n");
    assert_roundtrip("{a: 1, b: [x, y], c: {d: e}}\n");
    assert_roundtrip("[]\n");
    assert_roundtrip("{}\n");
}

#[test]
fn nested_block_structures() {
    assert_roundtrip("a:\n  b:\n    - 1\n    - c: d\n      e: f\n  g: h\n");
}

#[test]
fn block_scalars() {
    assert_roundtrip("lit: |\n  line1\n  line2\n");
    assert_roundtrip("fold: >\n  one\n  two\n");
    assert_roundtrip("strip: |-\n  text\n");
    assert_roundtrip("keep: |+\n  text\n\n");
}

#[test]
fn quoted_scalars() {
    assert_roundtrip("q1: 'single quoted'\nq2: \"double \\\" quoted\"\n");
    assert_roundtrip("tricky: ': starts with colon'\n");
    assert_roundtrip("escapes: \"tab\\there\"\n");
}

#[test]
fn anchors_and_aliases() {
    assert_roundtrip("&anchor foo\n---\n*anchor\n");
    assert_roundtrip("n1: &a [1, 2]\nn2: *a\n");
}

#[test]
fn tags_and_directives() {
    assert_roundtrip("%YAML 1.1\n%TAG !e! tag:example.com,2024:\n---\n!e!t v\n");
    assert_roundtrip("!!str 123\n");
    assert_roundtrip("!!seq\n- 1\n");
}

#[test]
fn multiple_documents() {
    assert_roundtrip("---\none\n---\ntwo\n...\n");
    assert_roundtrip("first: 1\n---\nsecond: 2\n");
}
