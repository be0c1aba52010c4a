use pretty_assertions::assert_eq;
use yamlstream::{
    Encoding, Event, EventData, MappingStyle, Parser, ParserError, ScalarStyle, Scanner,
    ScannerError, SequenceStyle, TagDirective, Token, TokenData, VersionDirective,
};

fn parse_events(input: &str) -> Vec<Event> {
    let mut bytes = input.as_bytes();
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

fn plain(value: &str) -> EventData {
    EventData::Scalar {
        anchor: None,
        tag: None,
        value: String::from(value),
        plain_implicit: true,
        quoted_implicit: false,
        style: ScalarStyle::Plain,
    }
}

#[test]
fn simple_block_mapping() {
    let events: Vec<EventData> = parse_events("key: value\n")
        .into_iter()
        .map(|e| e.data)
        .collect();
    assert_eq!(
        events,
        vec![
            EventData::StreamStart {
                encoding: Encoding::Utf8
            },
            EventData::DocumentStart {
                version_directive: None,
                tag_directives: vec![],
                implicit: true
            },
            EventData::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: MappingStyle::Block
            },
            plain("key"),
            plain("value"),
            EventData::MappingEnd,
            EventData::DocumentEnd { implicit: true },
            EventData::StreamEnd,
        ]
    );
}

#[test]
fn simple_block_sequence() {
    let events: Vec<EventData> = parse_events("- 1\n- 2\n- 3\n")
        .into_iter()
        .map(|e| e.data)
        .collect();
    assert_eq!(
        events,
        vec![
            EventData::StreamStart {
                encoding: Encoding::Utf8
            },
            EventData::DocumentStart {
                version_directive: None,
                tag_directives: vec![],
                implicit: true
            },
            EventData::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: SequenceStyle::Block
            },
            plain("1"),
            plain("2"),
            plain("3"),
            EventData::SequenceEnd,
            EventData::DocumentEnd { implicit: true },
            EventData::StreamEnd,
        ]
    );
}

#[test]
fn nested_flow_collections() {
    let events: Vec<EventData> = parse_events("[a, b, {c: d}]\n")
        .into_iter()
        .map(|e| e.data)
        .collect();
    assert_eq!(
        events,
        vec![
            EventData::StreamStart {
                encoding: Encoding::Utf8
            },
            EventData::DocumentStart {
                version_directive: None,
                tag_directives: vec![],
                implicit: true
            },
            EventData::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: SequenceStyle::Flow
            },
            plain("a"),
            plain("b"),
            EventData::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: MappingStyle::Flow
            },
            plain("c"),
            plain("d"),
            EventData::MappingEnd,
            EventData::SequenceEnd,
            EventData::DocumentEnd { implicit: true },
            EventData::StreamEnd,
        ]
    );
}

#[test]
fn alias_is_not_dereferenced() {
    let mut bytes = "&anchor foo\n---\n*anchor\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);

    // STREAM-START, DOCUMENT-START.
    parser.parse().unwrap();
    parser.parse().unwrap();

    let scalar = parser.parse().unwrap();
    assert_eq!(
        scalar.data,
        EventData::Scalar {
            anchor: Some(String::from("anchor")),
            tag: None,
            value: String::from("foo"),
            plain_implicit: true,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        }
    );
    assert_eq!(parser.defined_anchors().len(), 1);
    assert_eq!(parser.defined_anchors()[0], "anchor");

    // DOCUMENT-END clears the per-document anchor set.
    parser.parse().unwrap();
    assert!(parser.defined_anchors().is_empty());

    // Second document: the alias comes through by name.
    parser.parse().unwrap();
    let alias = parser.parse().unwrap();
    assert_eq!(
        alias.data,
        EventData::Alias {
            anchor: String::from("anchor")
        }
    );
}

#[test]
fn tag_directives_rewrite_shorthand_tags() {
    let events = parse_events("%YAML 1.1\n%TAG !e! tag:example.com,2024:\n---\n!e!t v\n");
    let doc_start = &events[1];
    assert_eq!(
        doc_start.data,
        EventData::DocumentStart {
            version_directive: Some(VersionDirective { major: 1, minor: 1 }),
            tag_directives: vec![TagDirective::new("!e!", "tag:example.com,2024:")],
            implicit: false,
        }
    );
    let scalar = &events[2];
    assert_eq!(
        scalar.data,
        EventData::Scalar {
            anchor: None,
            tag: Some(String::from("tag:example.com,2024:t")),
            value: String::from("v"),
            plain_implicit: false,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        }
    );
}

#[test]
fn tab_indentation_is_a_scanner_error() {
    let mut bytes = "\t- x\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    parser.parse().unwrap(); // STREAM-START
    let err = parser.parse().unwrap_err();
    match err {
        ParserError::Scanner(ScannerError::Problem {
            problem,
            problem_mark,
            ..
        }) => {
            assert_eq!(problem, "found character that cannot start any token");
            assert_eq!(problem_mark.index, 0);
            assert_eq!(problem_mark.line, 0);
            assert_eq!(problem_mark.column, 0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The parser is poisoned until reset.
    assert!(matches!(parser.parse(), Err(ParserError::Poisoned)));
    parser.reset();
    let mut bytes = "ok: true\n".as_bytes();
    parser.set_input_string(&mut bytes);
    assert!(parser.parse().is_ok());
}

#[test]
fn token_marks_do_not_move_backwards() {
    // The retroactive KEY insertions must stay invisible in the scanned
    // order: marks never run backwards between successive tokens either.
    let mut bytes =
        "a:\n  b:\n    - 1\n    - c: d\n      e: f\nlit: |\n  text\nflow: [x, {y: z}]\n"
            .as_bytes();
    let mut scanner = Scanner::new();
    scanner.set_input_string(&mut bytes);
    let mut tokens: Vec<Token> = Vec::new();
    loop {
        let token = scanner.scan().unwrap();
        let done = matches!(token.data, TokenData::StreamEnd);
        tokens.push(token);
        if done {
            break;
        }
    }
    for pair in tokens.windows(2) {
        assert!(
            pair[0].end_mark.index <= pair[1].start_mark.index,
            "token mark moved backwards: {:?} then {:?}",
            pair[0],
            pair[1]
        );
    }
    for token in &tokens {
        assert!(token.start_mark.index <= token.end_mark.index);
    }
}

#[test]
fn event_marks_do_not_move_backwards() {
    let events = parse_events(
        "a:\n  b:\n    - 1\n    - c: d\n      e: f\nlit: |\n  text\nflow: [x, {y: z}]\n",
    );
    for pair in events.windows(2) {
        assert!(
            pair[0].end_mark.index <= pair[1].start_mark.index,
            "event mark moved backwards: {:?} then {:?}",
            pair[0],
            pair[1]
        );
    }
    for event in &events {
        assert!(event.start_mark.index <= event.end_mark.index);
    }
}

#[test]
fn collection_events_are_balanced_and_mappings_paired() {
    let inputs = [
        "key: value\n",
        "- 1\n- 2\n",
        "[a, [b, {c: d}], {e: [f]}]\n",
        "a:\n  - 1\n  - b: c\nd: {}\n",
        "? key\n: value\n",
        "---\none\n---\ntwo\n...\n",
    ];
    #[derive(Debug, PartialEq)]
    enum Frame {
        Sequence,
        Mapping(u32),
    }

    for input in inputs {
        let events = parse_events(input);
        let mut stack: Vec<Frame> = Vec::new();
        let note_child = |stack: &mut Vec<Frame>| {
            if let Some(Frame::Mapping(children)) = stack.last_mut() {
                *children += 1;
            }
        };
        for event in &events {
            match &event.data {
                EventData::SequenceStart { .. } => {
                    note_child(&mut stack);
                    stack.push(Frame::Sequence);
                }
                EventData::MappingStart { .. } => {
                    note_child(&mut stack);
                    stack.push(Frame::Mapping(0));
                }
                EventData::SequenceEnd => {
                    assert_eq!(stack.pop(), Some(Frame::Sequence), "in {input:?}");
                }
                EventData::MappingEnd => {
                    match stack.pop() {
                        Some(Frame::Mapping(children)) => {
                            assert_eq!(
                                children % 2,
                                0,
                                "odd number of mapping children in {input:?}"
                            );
                        }
                        other => panic!("unbalanced mapping in {input:?}: {other:?}"),
                    }
                }
                EventData::Scalar { .. } | EventData::Alias { .. } => {
                    note_child(&mut stack);
                }
                _ => {}
            }
        }
        assert!(stack.is_empty(), "unbalanced events in {input:?}");
    }
}

#[test]
fn empty_mapping_values_become_empty_scalars() {
    let events: Vec<EventData> = parse_events("a:\nb: c\n")
        .into_iter()
        .map(|e| e.data)
        .collect();
    assert_eq!(
        events,
        vec![
            EventData::StreamStart {
                encoding: Encoding::Utf8
            },
            EventData::DocumentStart {
                version_directive: None,
                tag_directives: vec![],
                implicit: true
            },
            EventData::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: MappingStyle::Block
            },
            plain("a"),
            plain(""),
            plain("b"),
            plain("c"),
            EventData::MappingEnd,
            EventData::DocumentEnd { implicit: true },
            EventData::StreamEnd,
        ]
    );
}

#[test]
fn duplicate_yaml_directive_is_a_parser_error() {
    let mut bytes = "%YAML 1.1\n%YAML 1.1\n---\nx\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    parser.parse().unwrap(); // STREAM-START
    let err = parser.parse().unwrap_err();
    assert!(err.to_string().contains("found duplicate %YAML directive"));
}

#[test]
fn unresolvable_tag_handle_is_a_parser_error() {
    let mut bytes = "!x!t v\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    parser.parse().unwrap(); // STREAM-START
    parser.parse().unwrap(); // DOCUMENT-START
    let err = parser.parse().unwrap_err();
    assert!(err.to_string().contains("found undefined tag handle"));
}

#[test]
fn duplicate_anchor_on_one_node_is_an_error() {
    let mut bytes = "&a &b scalar\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    parser.parse().unwrap(); // STREAM-START
    parser.parse().unwrap(); // DOCUMENT-START
    let err = parser.parse().unwrap_err();
    assert!(err.to_string().contains("found duplicate anchor or tag"));
}

#[test]
fn mismatched_dedent_is_an_error() {
    let mut bytes = "a:\n  b: c\n d: e\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    let err = loop {
        match parser.parse() {
            Ok(event) => assert!(!matches!(event.data, EventData::StreamEnd)),
            Err(err) => break err,
        }
    };
    let rendered = err.to_string();
    assert!(
        rendered.contains("did not find expected key"),
        "unexpected error: {rendered}"
    );
}

#[test]
fn line_break_invalidates_a_simple_key() {
    let mut bytes = "foo\n: bar\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    let err = loop {
        match parser.parse() {
            Ok(event) => assert!(!matches!(event.data, EventData::StreamEnd)),
            Err(err) => break err,
        }
    };
    // "foo" cannot become the key of a mapping opened on the next line.
    assert!(err.to_string().contains("did not find expected <document start>"));
}

#[test]
fn mapping_value_in_sequence_context_fails() {
    let mut bytes = "- a\n: b\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);
    parser.parse().unwrap(); // STREAM-START
    parser.parse().unwrap(); // DOCUMENT-START
    parser.parse().unwrap(); // SEQUENCE-START
    parser.parse().unwrap(); // SCALAR "a"
    assert!(parser.parse().is_err());
}
