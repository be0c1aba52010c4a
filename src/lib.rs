#![doc = include_str!("../README.md")]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::fn_params_excessive_bools,
    clippy::manual_range_contains,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools,
    clippy::too_many_lines
)]
#![deny(unsafe_code)]

mod chars;
mod emitter;
mod error;
mod event;
mod parser;
mod reader;
mod resolver;
mod scanner;
mod token;
mod writer;

pub use crate::emitter::{Emitter, EmitterState};
pub use crate::error::{
    ComposerError, DecoderError, EmitterError, Error, Mark, ParserError, ReaderError,
    ResolverError, ScannerError, SerializerError, WriterError,
};
pub use crate::event::{Event, EventData};
pub use crate::parser::{Parser, ParserState};
pub use crate::resolver::{NodeKind, Resolver, StandardResolver, UnresolvedNode};
pub use crate::scanner::Scanner;
pub use crate::token::{Token, TokenData};

pub(crate) const INPUT_RAW_BUFFER_SIZE: usize = 16384;
pub(crate) const OUTPUT_BUFFER_SIZE: usize = 16384;

/// The tag `!!null` with the only possible value: `null`.
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
/// The tag `!!bool` with the values: `true` and `false`.
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
/// The tag `!!str` for string values.
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag `!!int` for integer values.
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
/// The tag `!!float` for float values.
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";

/// The tag `!!seq` is used to denote sequences.
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag `!!map` is used to denote mapping.
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

/// The default scalar tag is `!!str`.
pub const DEFAULT_SCALAR_TAG: &str = STR_TAG;
/// The default sequence tag is `!!seq`.
pub const DEFAULT_SEQUENCE_TAG: &str = SEQ_TAG;
/// The default mapping tag is `!!map`.
pub const DEFAULT_MAPPING_TAG: &str = MAP_TAG;

/// The version directive data.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VersionDirective {
    /// The major version number.
    pub major: i32,
    /// The minor version number.
    pub minor: i32,
}

/// The tag directive data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle.
    pub handle: String,
    /// The tag prefix.
    pub prefix: String,
}

impl TagDirective {
    /// Create a tag directive from a handle/prefix pair.
    pub fn new(handle: &str, prefix: &str) -> Self {
        Self {
            handle: String::from(handle),
            prefix: String::from(prefix),
        }
    }
}

/// The two tag directives that are in scope in every document.
pub(crate) fn default_tag_directives() -> [TagDirective; 2] {
    [
        TagDirective::new("!", "!"),
        TagDirective::new("!!", "tag:yaml.org,2002:"),
    ]
}

/// The stream encoding.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Let the parser choose the encoding.
    #[default]
    Any = 0,
    /// The default UTF-8 encoding.
    Utf8 = 1,
    /// The UTF-16-LE encoding with BOM.
    Utf16Le = 2,
    /// The UTF-16-BE encoding with BOM.
    Utf16Be = 3,
}

/// Line break type.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Break {
    /// Let the emitter choose the break type.
    #[default]
    Any = 0,
    /// Use CR for line breaks (Mac style).
    Cr = 1,
    /// Use LN for line breaks (Unix style).
    Ln = 2,
    /// Use CR LN for line breaks (DOS style).
    CrLn = 3,
}

/// Scalar styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// Let the emitter choose the style.
    #[default]
    Any = 0,
    /// The plain scalar style.
    Plain = 1,
    /// The single-quoted scalar style.
    SingleQuoted = 2,
    /// The double-quoted scalar style.
    DoubleQuoted = 3,
    /// The literal scalar style.
    Literal = 4,
    /// The folded scalar style.
    Folded = 5,
}

/// Sequence styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// Let the emitter choose the style.
    Any = 0,
    /// The block sequence style.
    Block = 1,
    /// The flow sequence style.
    Flow = 2,
}

/// Mapping styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// Let the emitter choose the style.
    Any = 0,
    /// The block mapping style.
    Block = 1,
    /// The flow mapping style.
    Flow = 2,
}

/// Lifecycle state shared by the scanner, parser and emitter.
///
/// Every public entry point checks this once instead of sprinkling error
/// flags across the call tree. `Poisoned` sticks until `reset()`.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub(crate) enum Health {
    #[default]
    Ready,
    Poisoned,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SANITY_INPUT: &str = r#"
unicode: "Sosa did fine.☺"
control: "\b1998\t1999\t2000\n"
hex esc: "\x0d\x0a is \r\n"

single: '"Howdy!" he cried.'
quoted: ' # Not a ''comment''.'
tie-fighter: '|\-*-/|'
"#;

    #[test]
    fn sanity() {
        let mut parser = Parser::new();
        let mut read_in = SANITY_INPUT.as_bytes();
        parser.set_input_string(&mut read_in);
        let mut events = Vec::new();
        loop {
            let event = parser.parse().unwrap();
            let done = matches!(event.data, EventData::StreamEnd);
            events.push(event);
            if done {
                break;
            }
        }
        // stream start/end, document start/end, mapping start/end and six
        // key/value pairs.
        assert_eq!(events.len(), 6 + 12);
    }

    #[test]
    fn flow_mapping_inside_flow_sequence() {
        let mut parser = Parser::new();
        let mut input = "[\nfoo: bar\n]\n".as_bytes();
        parser.set_input_string(&mut input);
        loop {
            let event = parser.parse().unwrap();
            if matches!(event.data, EventData::StreamEnd) {
                break;
            }
        }
    }

    #[test]
    fn multiline_plain_scalar_is_single_quoted() {
        let mut emitter = Emitter::new();
        let mut output = Vec::new();
        emitter.set_output_string(&mut output);

        emitter.emit(Event::stream_start(Encoding::Utf8)).unwrap();
        emitter.emit(Event::document_start(None, &[], true)).unwrap();
        emitter
            .emit(Event::scalar(
                None,
                None,
                "1st non-empty\n2nd non-empty 3rd non-empty",
                true,
                true,
                ScalarStyle::Plain,
            ))
            .unwrap();
        emitter.emit(Event::document_end(true)).unwrap();
        emitter.emit(Event::stream_end()).unwrap();

        assert_eq!(
            core::str::from_utf8(&output),
            Ok("'1st non-empty\n\n  2nd non-empty 3rd non-empty'\n")
        );
    }
}
