use std::io::BufRead;

use log::debug;

use crate::error::ParserError;
use crate::event::{Event, EventData};
use crate::scanner::Scanner;
use crate::token::{Token, TokenData};
use crate::{
    default_tag_directives, Encoding, Health, MappingStyle, Mark, ScalarStyle, SequenceStyle,
    TagDirective, VersionDirective,
};

/// The states of the parser.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ParserState {
    /// Expect STREAM-START.
    #[default]
    StreamStart = 0,
    /// Expect the beginning of an implicit document.
    ImplicitDocumentStart = 1,
    /// Expect DOCUMENT-START.
    DocumentStart = 2,
    /// Expect the content of a document.
    DocumentContent = 3,
    /// Expect DOCUMENT-END.
    DocumentEnd = 4,
    /// Expect a block node.
    BlockNode = 5,
    /// Expect a block node or indentless sequence.
    BlockNodeOrIndentlessSequence = 6,
    /// Expect a flow node.
    FlowNode = 7,
    /// Expect the first entry of a block sequence.
    BlockSequenceFirstEntry = 8,
    /// Expect an entry of a block sequence.
    BlockSequenceEntry = 9,
    /// Expect an entry of an indentless sequence.
    IndentlessSequenceEntry = 10,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey = 11,
    /// Expect a block mapping key.
    BlockMappingKey = 12,
    /// Expect a block mapping value.
    BlockMappingValue = 13,
    /// Expect the first entry of a flow sequence.
    FlowSequenceFirstEntry = 14,
    /// Expect an entry of a flow sequence.
    FlowSequenceEntry = 15,
    /// Expect a key of an ordered mapping.
    FlowSequenceEntryMappingKey = 16,
    /// Expect a value of an ordered mapping.
    FlowSequenceEntryMappingValue = 17,
    /// Expect the end of an ordered mapping entry.
    FlowSequenceEntryMappingEnd = 18,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey = 19,
    /// Expect a key of a flow mapping.
    FlowMappingKey = 20,
    /// Expect a value of a flow mapping.
    FlowMappingValue = 21,
    /// Expect an empty value of a flow mapping.
    FlowMappingEmptyValue = 22,
    /// Expect nothing.
    End = 23,
}

/// Turns the scanner's token stream into a grammar-checked event stream.
///
/// The parser is a pushdown automaton; the state stack grows with document
/// nesting and with nothing else.
#[non_exhaustive]
pub struct Parser<'r> {
    scanner: Scanner<'r>,
    health: Health,
    /// The parser states stack.
    states: Vec<ParserState>,
    /// The current parser state.
    state: ParserState,
    /// The stack of marks where open collections started.
    marks: Vec<Mark>,
    /// The tag directives in scope for the current document.
    tag_directives: Vec<TagDirective>,
    /// Anchor names defined so far in the current document. The upstream
    /// composer resolves aliases against this; the parser itself never
    /// dereferences.
    anchors: Vec<String>,
}

impl<'r> Default for Parser<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Parser<'r> {
    /// Create a parser without an input source.
    pub fn new() -> Parser<'r> {
        Parser {
            scanner: Scanner::new(),
            health: Health::Ready,
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            anchors: Vec::new(),
        }
    }

    /// Reset the parser to its freshly created state. Input and encoding
    /// must be configured again.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r mut &[u8]) {
        self.scanner.set_input_string(input);
    }

    /// Set a generic input source.
    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        self.scanner.set_input(input);
    }

    /// Set the source encoding, overriding BOM detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.scanner.set_encoding(encoding);
    }

    /// Scan the input stream and produce the next token.
    ///
    /// An application must not alternate calls of [`Parser::scan`] with
    /// calls of [`Parser::parse`]; the two consume the same token queue.
    pub fn scan(&mut self) -> Result<Token, crate::ScannerError> {
        self.scanner.scan()
    }

    /// Anchor names defined by the events produced so far in the current
    /// document. Cleared at every DOCUMENT-END.
    pub fn defined_anchors(&self) -> &[String] {
        &self.anchors
    }

    /// Parse the input stream and produce the next parsing event.
    ///
    /// The initial event is STREAM-START and the final one STREAM-END;
    /// further calls keep returning STREAM-END events.
    pub fn parse(&mut self) -> Result<Event, ParserError> {
        match self.health {
            Health::Poisoned => return Err(ParserError::Poisoned),
            Health::Done => return Ok(Event::new(EventData::StreamEnd)),
            Health::Ready => {}
        }
        if self.scanner.health == Health::Done || self.state == ParserState::End {
            self.health = Health::Done;
            return Ok(Event::new(EventData::StreamEnd));
        }
        match self.state_machine() {
            Ok(event) => {
                self.note_event(&event);
                Ok(event)
            }
            Err(err) => {
                self.health = Health::Poisoned;
                Err(err)
            }
        }
    }

    fn note_event(&mut self, event: &Event) {
        match &event.data {
            EventData::DocumentStart { implicit, .. } => {
                debug!("document start (implicit: {implicit})");
            }
            EventData::DocumentEnd { .. } => {
                self.anchors.clear();
            }
            EventData::Scalar {
                anchor: Some(anchor),
                ..
            }
            | EventData::SequenceStart {
                anchor: Some(anchor),
                ..
            }
            | EventData::MappingStart {
                anchor: Some(anchor),
                ..
            } => {
                if !self.anchors.iter().any(|known| known == anchor) {
                    self.anchors.push(anchor.clone());
                }
            }
            _ => {}
        }
    }

    fn peek_token(&mut self) -> Result<&Token, ParserError> {
        if !self.scanner.token_available {
            self.scanner.fetch_more_tokens()?;
            if !self.scanner.token_available {
                return Err(ParserError::UnexpectedEof);
            }
        }
        Ok(self
            .scanner
            .tokens
            .front()
            .expect("token_available is set, but the token queue is empty"))
    }

    fn peek_token_mut(&mut self) -> Result<&mut Token, ParserError> {
        if !self.scanner.token_available {
            self.scanner.fetch_more_tokens()?;
            if !self.scanner.token_available {
                return Err(ParserError::UnexpectedEof);
            }
        }
        Ok(self
            .scanner
            .tokens
            .front_mut()
            .expect("token_available is set, but the token queue is empty"))
    }

    fn skip_token(&mut self) {
        self.scanner.token_available = false;
        self.scanner.tokens_parsed += 1;
        let skipped = self
            .scanner
            .tokens
            .pop_front()
            .expect("skip_token on an empty queue");
        if matches!(skipped.data, TokenData::StreamEnd) {
            self.scanner.health = Health::Done;
        }
    }

    fn parser_error<T>(problem: &'static str, mark: Mark) -> Result<T, ParserError> {
        Err(ParserError::Problem { problem, mark })
    }

    fn parser_error_context<T>(
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    ) -> Result<T, ParserError> {
        Err(ParserError::ProblemWithContext {
            context,
            context_mark,
            problem,
            mark,
        })
    }

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            ParserState::FlowNode => self.parse_node(false, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => {
                self.parse_flow_sequence_entry_mapping_key()
            }
            ParserState::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            ParserState::FlowSequenceEntryMappingEnd => {
                self.parse_flow_sequence_entry_mapping_end()
            }
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => unreachable!("parser end state reached unexpectedly"),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::StreamStart { encoding } = &token.data {
            let event = Event::spanned(
                EventData::StreamStart {
                    encoding: *encoding,
                },
                token.start_mark,
                token.end_mark,
            );
            self.state = ParserState::ImplicitDocumentStart;
            self.skip_token();
            Ok(event)
        } else {
            let mark = token.start_mark;
            Self::parser_error("did not find expected <stream-start>", mark)
        }
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = Vec::new();

        let mut token = self.peek_token()?;
        if !implicit {
            while let TokenData::DocumentEnd = &token.data {
                self.skip_token();
                token = self.peek_token()?;
            }
        }
        if implicit
            && !matches!(
                token.data,
                TokenData::VersionDirective { .. }
                    | TokenData::TagDirective { .. }
                    | TokenData::DocumentStart
                    | TokenData::StreamEnd
            )
        {
            let event = Event::spanned(
                EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: Vec::new(),
                    implicit: true,
                },
                token.start_mark,
                token.end_mark,
            );
            self.process_directives(None, None)?;
            self.states.push(ParserState::DocumentEnd);
            self.state = ParserState::BlockNode;
            Ok(event)
        } else if !matches!(token.data, TokenData::StreamEnd) {
            let start_mark = token.start_mark;
            self.process_directives(Some(&mut version_directive), Some(&mut tag_directives))?;
            let token = self.peek_token()?;
            if let TokenData::DocumentStart = token.data {
                let event = Event::spanned(
                    EventData::DocumentStart {
                        version_directive,
                        tag_directives: core::mem::take(&mut tag_directives),
                        implicit: false,
                    },
                    start_mark,
                    token.end_mark,
                );
                self.states.push(ParserState::DocumentEnd);
                self.state = ParserState::DocumentContent;
                self.skip_token();
                Ok(event)
            } else {
                Self::parser_error("did not find expected <document start>", token.start_mark)
            }
        } else {
            let event = Event::spanned(EventData::StreamEnd, token.start_mark, token.end_mark);
            self.state = ParserState::End;
            self.skip_token();
            Ok(event)
        }
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::VersionDirective { .. }
        | TokenData::TagDirective { .. }
        | TokenData::DocumentStart
        | TokenData::DocumentEnd
        | TokenData::StreamEnd = &token.data
        {
            let mark = token.start_mark;
            self.state = self.states.pop().expect("parser state stack underflow");
            Self::process_empty_scalar(mark)
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let mut implicit = true;
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let mut end_mark = start_mark;
        if let TokenData::DocumentEnd = &token.data {
            end_mark = token.end_mark;
            self.skip_token();
            implicit = false;
        }
        self.tag_directives.clear();
        self.state = ParserState::DocumentStart;
        Ok(Event::spanned(
            EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        ))
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let mut anchor: Option<String> = None;
        let mut tag_handle: Option<String> = None;
        let mut tag_suffix: Option<String> = None;
        let mut tag: Option<String> = None;
        let mut start_mark: Mark;
        let mut end_mark: Mark;
        let mut tag_mark = Mark::default();

        let mut token = self.peek_token_mut()?;

        if let TokenData::Alias { value } = &mut token.data {
            let event = Event::spanned(
                EventData::Alias {
                    anchor: core::mem::take(value),
                },
                token.start_mark,
                token.end_mark,
            );
            self.state = self.states.pop().expect("parser state stack underflow");
            self.skip_token();
            return Ok(event);
        }

        end_mark = token.start_mark;
        start_mark = end_mark;
        if let TokenData::Anchor { value } = &mut token.data {
            anchor = Some(core::mem::take(value));
            start_mark = token.start_mark;
            end_mark = token.end_mark;
            self.skip_token();
            token = self.peek_token_mut()?;
            if let TokenData::Tag { handle, suffix } = &mut token.data {
                tag_handle = Some(core::mem::take(handle));
                tag_suffix = Some(core::mem::take(suffix));
                tag_mark = token.start_mark;
                end_mark = token.end_mark;
                self.skip_token();
            }
        } else if let TokenData::Tag { handle, suffix } = &mut token.data {
            tag_handle = Some(core::mem::take(handle));
            tag_suffix = Some(core::mem::take(suffix));
            tag_mark = token.start_mark;
            start_mark = tag_mark;
            end_mark = token.end_mark;
            self.skip_token();
            token = self.peek_token_mut()?;
            if let TokenData::Anchor { value } = &mut token.data {
                anchor = Some(core::mem::take(value));
                end_mark = token.end_mark;
                self.skip_token();
            }
        }

        if let Some(tag_handle_value) = &tag_handle {
            if tag_handle_value.is_empty() {
                tag = tag_suffix;
            } else {
                for tag_directive in &self.tag_directives {
                    if tag_directive.handle == *tag_handle_value {
                        let suffix = tag_suffix.as_deref().unwrap_or("");
                        tag = Some(format!("{}{}", tag_directive.prefix, suffix));
                        break;
                    }
                }
                if tag.is_none() {
                    return Self::parser_error_context(
                        "while parsing a node",
                        start_mark,
                        "found undefined tag handle",
                        tag_mark,
                    );
                }
            }
        }

        let token = self.peek_token_mut()?;
        if matches!(token.data, TokenData::Anchor { .. } | TokenData::Tag { .. }) {
            return Self::parser_error_context(
                "while parsing a node",
                start_mark,
                "found duplicate anchor or tag",
                token.start_mark,
            );
        }
        let implicit = tag.is_none() || tag.as_deref() == Some("");

        if indentless_sequence && matches!(token.data, TokenData::BlockEntry) {
            end_mark = token.end_mark;
            self.state = ParserState::IndentlessSequenceEntry;
            Ok(Event::spanned(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            ))
        } else if let TokenData::Scalar { value, style } = &mut token.data {
            let mut plain_implicit = false;
            let mut quoted_implicit = false;
            end_mark = token.end_mark;
            if *style == ScalarStyle::Plain && tag.is_none() || tag.as_deref() == Some("!") {
                plain_implicit = true;
            } else if tag.is_none() {
                quoted_implicit = true;
            }
            let event = Event::spanned(
                EventData::Scalar {
                    anchor,
                    tag,
                    value: core::mem::take(value),
                    plain_implicit,
                    quoted_implicit,
                    style: *style,
                },
                start_mark,
                end_mark,
            );
            self.state = self.states.pop().expect("parser state stack underflow");
            self.skip_token();
            Ok(event)
        } else if let TokenData::FlowSequenceStart = &token.data {
            end_mark = token.end_mark;
            self.state = ParserState::FlowSequenceFirstEntry;
            Ok(Event::spanned(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Flow,
                },
                start_mark,
                end_mark,
            ))
        } else if let TokenData::FlowMappingStart = &token.data {
            end_mark = token.end_mark;
            self.state = ParserState::FlowMappingFirstKey;
            Ok(Event::spanned(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Flow,
                },
                start_mark,
                end_mark,
            ))
        } else if block && matches!(token.data, TokenData::BlockSequenceStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockSequenceFirstEntry;
            Ok(Event::spanned(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            ))
        } else if block && matches!(token.data, TokenData::BlockMappingStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockMappingFirstKey;
            Ok(Event::spanned(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Block,
                },
                start_mark,
                end_mark,
            ))
        } else if anchor.is_some() || tag.is_some() {
            // An anchor or a tag with no node content is an empty scalar.
            self.state = self.states.pop().expect("parser state stack underflow");
            Ok(Event::spanned(
                EventData::Scalar {
                    anchor,
                    tag,
                    value: String::new(),
                    plain_implicit: implicit,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark,
                end_mark,
            ))
        } else {
            Self::parser_error_context(
                if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                },
                start_mark,
                "did not find expected node content",
                token.start_mark,
            )
        }
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let token = self.peek_token()?;
        if let TokenData::BlockEntry = &token.data {
            let mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                self.state = ParserState::BlockSequenceEntry;
                Self::process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::BlockSequenceEntry);
                self.parse_node(true, false)
            }
        } else if let TokenData::BlockEnd = token.data {
            let event = Event::spanned(EventData::SequenceEnd, token.start_mark, token.end_mark);
            self.state = self.states.pop().expect("parser state stack underflow");
            let _ = self.marks.pop();
            self.skip_token();
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().expect("parser mark stack underflow");
            Self::parser_error_context(
                "while parsing a block collection",
                mark,
                "did not find expected '-' indicator",
                token_mark,
            )
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::BlockEntry = token.data {
            let mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::IndentlessSequenceEntry;
                Self::process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            let event = Event::spanned(EventData::SequenceEnd, token.start_mark, token.end_mark);
            self.state = self.states.pop().expect("parser state stack underflow");
            Ok(event)
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let token = self.peek_token()?;
        if let TokenData::Key = token.data {
            let mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingValue;
                Self::process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::BlockMappingValue);
                self.parse_node(true, true)
            }
        } else if let TokenData::BlockEnd = token.data {
            let event = Event::spanned(EventData::MappingEnd, token.start_mark, token.end_mark);
            self.state = self.states.pop().expect("parser state stack underflow");
            let _ = self.marks.pop();
            self.skip_token();
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().expect("parser mark stack underflow");
            Self::parser_error_context(
                "while parsing a block mapping",
                mark,
                "did not find expected key",
                token_mark,
            )
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            let mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingKey;
                Self::process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            let mark = token.start_mark;
            self.state = ParserState::BlockMappingKey;
            Self::process_empty_scalar(mark)
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowSequenceEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().expect("parser mark stack underflow");
                    return Self::parser_error_context(
                        "while parsing a flow sequence",
                        mark,
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                let event = Event::spanned(
                    EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        style: MappingStyle::Flow,
                    },
                    token.start_mark,
                    token.end_mark,
                );
                self.state = ParserState::FlowSequenceEntryMappingKey;
                self.skip_token();
                return Ok(event);
            } else if !matches!(token.data, TokenData::FlowSequenceEnd) {
                self.states.push(ParserState::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let event = Event::spanned(EventData::SequenceEnd, token.start_mark, token.end_mark);
        self.state = self.states.pop().expect("parser state stack underflow");
        let _ = self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(
            token.data,
            TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
        ) {
            let mark = token.end_mark;
            self.skip_token();
            self.state = ParserState::FlowSequenceEntryMappingValue;
            Self::process_empty_scalar(mark)
        } else {
            self.states.push(ParserState::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            self.skip_token();
            let token = self.peek_token()?;
            if !matches!(
                token.data,
                TokenData::FlowEntry | TokenData::FlowSequenceEnd
            ) {
                self.states.push(ParserState::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            let mark = token.start_mark;
            self.state = ParserState::FlowSequenceEntryMappingEnd;
            Self::process_empty_scalar(mark)
        } else {
            let mark = token.start_mark;
            self.state = ParserState::FlowSequenceEntryMappingEnd;
            Self::process_empty_scalar(mark)
        }
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let end_mark = token.end_mark;
        self.state = ParserState::FlowSequenceEntry;
        Ok(Event::spanned(EventData::MappingEnd, start_mark, end_mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowMappingEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().expect("parser mark stack underflow");
                    return Self::parser_error_context(
                        "while parsing a flow mapping",
                        mark,
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                self.skip_token();
                let token = self.peek_token()?;
                if !matches!(
                    token.data,
                    TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                ) {
                    self.states.push(ParserState::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                let mark = token.start_mark;
                self.state = ParserState::FlowMappingValue;
                return Self::process_empty_scalar(mark);
            } else if !matches!(token.data, TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let event = Event::spanned(EventData::MappingEnd, token.start_mark, token.end_mark);
        self.state = self.states.pop().expect("parser state stack underflow");
        let _ = self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if empty {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            return Self::process_empty_scalar(mark);
        }
        if let TokenData::Value = token.data {
            self.skip_token();
            let token = self.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingKey);
                return self.parse_node(false, false);
            }
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            Self::process_empty_scalar(mark)
        } else {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            Self::process_empty_scalar(mark)
        }
    }

    /// A missing node becomes an empty plain scalar.
    fn process_empty_scalar(mark: Mark) -> Result<Event, ParserError> {
        Ok(Event::spanned(
            EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        ))
    }

    /// Collect the directives before a document and install the defaults.
    /// `%TAG` scope is the following document only.
    fn process_directives(
        &mut self,
        version_directive_ref: Option<&mut Option<VersionDirective>>,
        tag_directives_ref: Option<&mut Vec<TagDirective>>,
    ) -> Result<(), ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = Vec::new();

        let mut token = self.peek_token_mut()?;
        loop {
            if !matches!(
                token.data,
                TokenData::VersionDirective { .. } | TokenData::TagDirective { .. }
            ) {
                break;
            }

            if let TokenData::VersionDirective { major, minor } = &token.data {
                let mark = token.start_mark;
                if version_directive.is_some() {
                    return Self::parser_error("found duplicate %YAML directive", mark);
                } else if *major != 1 || *minor != 1 && *minor != 2 {
                    return Self::parser_error("found incompatible YAML document", mark);
                }
                version_directive = Some(VersionDirective {
                    major: *major,
                    minor: *minor,
                });
            } else if let TokenData::TagDirective { handle, prefix } = &mut token.data {
                let value = TagDirective {
                    handle: core::mem::take(handle),
                    prefix: core::mem::take(prefix),
                };
                let mark = token.start_mark;
                self.append_tag_directive(value.clone(), false, mark)?;
                tag_directives.push(value);
            }

            self.skip_token();
            token = self.peek_token_mut()?;
        }

        let start_mark = token.start_mark;
        for default in default_tag_directives() {
            self.append_tag_directive(default, true, start_mark)?;
        }

        if let Some(version_directive_ref) = version_directive_ref {
            *version_directive_ref = version_directive;
        }
        if let Some(tag_directives_ref) = tag_directives_ref {
            *tag_directives_ref = tag_directives;
        }
        Ok(())
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
        mark: Mark,
    ) -> Result<(), ParserError> {
        for tag_directive in &self.tag_directives {
            if value.handle == tag_directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Self::parser_error("found duplicate %TAG directive", mark);
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }
}
