use std::collections::VecDeque;
use std::io::Write;

use bitflags::bitflags;

use crate::chars::{is_alpha, is_ascii, is_blank, is_blankz, is_bom, is_break, is_breakz, is_printable, is_space};
use crate::error::{EmitterError, WriterError};
use crate::event::{Event, EventData};
use crate::resolver::{NodeKind, Resolver, UnresolvedNode};
use crate::{
    default_tag_directives, Break, Encoding, Health, MappingStyle, ScalarStyle, SequenceStyle,
    TagDirective, VersionDirective, OUTPUT_BUFFER_SIZE,
};

/// The states of the emitter.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum EmitterState {
    /// Expect STREAM-START.
    #[default]
    StreamStart = 0,
    /// Expect the first DOCUMENT-START or STREAM-END.
    FirstDocumentStart = 1,
    /// Expect DOCUMENT-START or STREAM-END.
    DocumentStart = 2,
    /// Expect the content of a document.
    DocumentContent = 3,
    /// Expect DOCUMENT-END.
    DocumentEnd = 4,
    /// Expect the first item of a flow sequence.
    FlowSequenceFirstItem = 5,
    /// Expect an item of a flow sequence.
    FlowSequenceItem = 6,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey = 7,
    /// Expect a key of a flow mapping.
    FlowMappingKey = 8,
    /// Expect a value for a simple key of a flow mapping.
    FlowMappingSimpleValue = 9,
    /// Expect a value of a flow mapping.
    FlowMappingValue = 10,
    /// Expect the first item of a block sequence.
    BlockSequenceFirstItem = 11,
    /// Expect an item of a block sequence.
    BlockSequenceItem = 12,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey = 13,
    /// Expect the key of a block mapping.
    BlockMappingKey = 14,
    /// Expect a value for a simple key of a block mapping.
    BlockMappingSimpleValue = 15,
    /// Expect a value of a block mapping.
    BlockMappingValue = 16,
    /// Expect nothing.
    End = 17,
}

/// What the last thing written at the document root leaves dangling.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
enum OpenEnded {
    #[default]
    None,
    /// An implicit document end; `...` must precede directives.
    Document,
    /// A keep-chomped block scalar at the root; `...` must precede any
    /// following document or the stream end.
    BlockScalar,
}

bitflags! {
    /// Features of a scalar value, gathered in one linear scan.
    struct ScalarTraits: u16 {
        /// Starts with an indicator or contains ": " / " #".
        const BLOCK_INDICATORS   = 1 << 0;
        /// Contains characters that are special inside flow context.
        const FLOW_INDICATORS    = 1 << 1;
        const LINE_BREAKS        = 1 << 2;
        /// Unprintable, or non-ASCII while unicode output is off.
        const SPECIAL_CHARACTERS = 1 << 3;
        const LEADING_SPACE      = 1 << 4;
        const LEADING_BREAK      = 1 << 5;
        const TRAILING_SPACE     = 1 << 6;
        const TRAILING_BREAK     = 1 << 7;
        /// A space right after a break.
        const BREAK_SPACE        = 1 << 8;
        /// A break right after a space.
        const SPACE_BREAK        = 1 << 9;
    }
}

#[derive(Default)]
struct Analysis<'a> {
    anchor: Option<AnchorAnalysis<'a>>,
    tag: Option<TagAnalysis<'a>>,
    scalar: Option<ScalarAnalysis<'a>>,
}

struct AnchorAnalysis<'a> {
    anchor: &'a str,
    alias: bool,
}

struct TagAnalysis<'a> {
    handle: &'a str,
    suffix: &'a str,
}

struct ScalarAnalysis<'a> {
    value: &'a str,
    multiline: bool,
    flow_plain_allowed: bool,
    block_plain_allowed: bool,
    single_quoted_allowed: bool,
    block_allowed: bool,
    style: ScalarStyle,
}

impl<'a> ScalarAnalysis<'a> {
    /// Derive the per-style permissions from the trait set.
    fn from_traits(value: &'a str, traits: ScalarTraits) -> ScalarAnalysis<'a> {
        let mut analysis = ScalarAnalysis {
            value,
            multiline: traits.contains(ScalarTraits::LINE_BREAKS),
            flow_plain_allowed: true,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: true,
            style: ScalarStyle::Any,
        };
        if traits.intersects(
            ScalarTraits::LEADING_SPACE
                | ScalarTraits::LEADING_BREAK
                | ScalarTraits::TRAILING_SPACE
                | ScalarTraits::TRAILING_BREAK,
        ) {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if traits.contains(ScalarTraits::TRAILING_SPACE) {
            analysis.block_allowed = false;
        }
        if traits.contains(ScalarTraits::BREAK_SPACE) {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
        }
        if traits.intersects(ScalarTraits::SPACE_BREAK | ScalarTraits::SPECIAL_CHARACTERS) {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
            analysis.block_allowed = false;
        }
        if traits.contains(ScalarTraits::LINE_BREAKS) {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if traits.contains(ScalarTraits::FLOW_INDICATORS) {
            analysis.flow_plain_allowed = false;
        }
        if traits.contains(ScalarTraits::BLOCK_INDICATORS) {
            analysis.block_plain_allowed = false;
        }
        analysis
    }
}

fn scan_scalar_traits(value: &str, unicode: bool) -> ScalarTraits {
    let mut traits = ScalarTraits::empty();
    if value.starts_with("---") || value.starts_with("...") {
        traits |= ScalarTraits::BLOCK_INDICATORS | ScalarTraits::FLOW_INDICATORS;
    }
    let mut preceded_by_whitespace = true;
    let mut previous_space = false;
    let mut previous_break = false;
    let mut chars = value.chars();
    let mut first = true;
    while let Some(ch) = chars.next() {
        let next = chars.clone().next();
        let followed_by_whitespace = is_blankz(next);
        if first {
            match ch {
                '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                | '%' | '@' | '`' => {
                    traits |= ScalarTraits::BLOCK_INDICATORS | ScalarTraits::FLOW_INDICATORS;
                }
                '?' | ':' => {
                    traits |= ScalarTraits::FLOW_INDICATORS;
                    if followed_by_whitespace {
                        traits |= ScalarTraits::BLOCK_INDICATORS;
                    }
                }
                '-' if followed_by_whitespace => {
                    traits |= ScalarTraits::BLOCK_INDICATORS | ScalarTraits::FLOW_INDICATORS;
                }
                _ => {}
            }
        } else {
            match ch {
                ',' | '?' | '[' | ']' | '{' | '}' => {
                    traits |= ScalarTraits::FLOW_INDICATORS;
                }
                ':' => {
                    traits |= ScalarTraits::FLOW_INDICATORS;
                    if followed_by_whitespace {
                        traits |= ScalarTraits::BLOCK_INDICATORS;
                    }
                }
                '#' if preceded_by_whitespace => {
                    traits |= ScalarTraits::BLOCK_INDICATORS | ScalarTraits::FLOW_INDICATORS;
                }
                _ => {}
            }
        }

        if !is_printable(ch) || !is_ascii(ch) && !unicode {
            traits |= ScalarTraits::SPECIAL_CHARACTERS;
        }

        if is_space(ch) {
            if first {
                traits |= ScalarTraits::LEADING_SPACE;
            }
            if next.is_none() {
                traits |= ScalarTraits::TRAILING_SPACE;
            }
            if previous_break {
                traits |= ScalarTraits::BREAK_SPACE;
            }
            previous_space = true;
            previous_break = false;
        } else if is_break(ch) {
            traits |= ScalarTraits::LINE_BREAKS;
            if first {
                traits |= ScalarTraits::LEADING_BREAK;
            }
            if next.is_none() {
                traits |= ScalarTraits::TRAILING_BREAK;
            }
            if previous_space {
                traits |= ScalarTraits::SPACE_BREAK;
            }
            previous_space = false;
            previous_break = true;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = is_blankz(ch);
        first = false;
    }
    traits
}

/// Accepts parsing events and writes the corresponding YAML text.
///
/// The emitter keeps a small event lookahead so that it can see whether the
/// next collection is empty before committing to a style. Presentation is
/// governed by the configuration setters; an event's requested style is
/// honored when it is legal for the value.
#[non_exhaustive]
pub struct Emitter<'w> {
    pub(crate) sink: Option<&'w mut dyn Write>,
    /// Pending characters, flushed to the sink in ~16 KiB spans.
    pub(crate) buffer: String,
    /// Encoded bytes for non-UTF-8 output encodings.
    pub(crate) raw_buffer: Vec<u8>,
    pub(crate) encoding: Encoding,
    health: Health,
    canonical: bool,
    best_indent: i32,
    best_width: i32,
    unicode: bool,
    line_break: Break,
    states: Vec<EmitterState>,
    state: EmitterState,
    events: VecDeque<Event>,
    indents: Vec<i32>,
    tag_directives: Vec<TagDirective>,
    resolver: Option<&'w mut dyn Resolver>,
    indent: i32,
    flow_level: i32,
    mapping_context: bool,
    simple_key_context: bool,
    line: i32,
    column: i32,
    whitespace: bool,
    indention: bool,
    open_ended: OpenEnded,
}

impl<'w> Default for Emitter<'w> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'w> Emitter<'w> {
    /// Create an emitter without an output sink.
    pub fn new() -> Emitter<'w> {
        Emitter {
            sink: None,
            buffer: String::with_capacity(OUTPUT_BUFFER_SIZE),
            raw_buffer: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
            encoding: Encoding::Any,
            health: Health::Ready,
            canonical: false,
            best_indent: 0,
            best_width: 0,
            unicode: false,
            line_break: Break::default(),
            states: Vec::with_capacity(16),
            state: EmitterState::default(),
            events: VecDeque::with_capacity(16),
            indents: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            resolver: None,
            indent: 0,
            flow_level: 0,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: false,
            indention: false,
            open_ended: OpenEnded::None,
        }
    }

    /// Reset the emitter to its freshly created state. Output and
    /// configuration must be applied again.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set a string output. The emitter writes UTF-8 into `output`.
    pub fn set_output_string(&mut self, output: &'w mut Vec<u8>) {
        assert!(self.sink.is_none(), "output sink is already set");
        if self.encoding == Encoding::Any {
            self.encoding = Encoding::Utf8;
        } else {
            assert!(
                self.encoding == Encoding::Utf8,
                "cannot output UTF-16 into a string"
            );
        }
        output.clear();
        self.sink = Some(output);
    }

    /// Set a generic output sink.
    pub fn set_output(&mut self, sink: &'w mut dyn Write) {
        assert!(self.sink.is_none(), "output sink is already set");
        self.sink = Some(sink);
    }

    /// Set the output encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        assert!(
            self.encoding == Encoding::Any,
            "encoding is already determined"
        );
        self.encoding = encoding;
    }

    /// Set if the output should be in the "canonical" format.
    pub fn set_canonical(&mut self, canonical: bool) {
        self.canonical = canonical;
    }

    /// Set the indentation increment (2 to 9; anything else becomes 2).
    pub fn set_indent(&mut self, indent: i32) {
        self.best_indent = if 1 < indent && indent < 10 { indent } else { 2 };
    }

    /// Set the preferred line width. A negative width means unlimited.
    pub fn set_width(&mut self, width: i32) {
        self.best_width = if width >= 0 { width } else { -1 };
    }

    /// Set if unescaped non-ASCII characters are allowed.
    pub fn set_unicode(&mut self, unicode: bool) {
        self.unicode = unicode;
    }

    /// Set the preferred line break.
    pub fn set_break(&mut self, line_break: Break) {
        self.line_break = line_break;
    }

    /// Install a tag resolver. With one installed, the plain style with an
    /// omitted tag is only used when the value re-resolves to the event's
    /// tag.
    pub fn set_resolver(&mut self, resolver: &'w mut dyn Resolver) {
        self.resolver = Some(resolver);
    }

    /// Emit an event.
    ///
    /// The emitter takes responsibility for the event object and releases
    /// its content after it is written, even if the call fails.
    pub fn emit(&mut self, event: Event) -> Result<(), EmitterError> {
        if self.health == Health::Poisoned {
            return Err(EmitterError::Poisoned);
        }
        let result = self.emit_inner(event);
        if result.is_err() {
            self.health = Health::Poisoned;
        }
        result
    }

    fn emit_inner(&mut self, event: Event) -> Result<(), EmitterError> {
        self.events.push_back(event);
        while let Some(event) = self.next_emittable_event() {
            let tag_directives = core::mem::take(&mut self.tag_directives);
            let mut analysis = self.analyze_event(&event, &tag_directives)?;
            self.state_machine(&event, &mut analysis)?;
            // DOCUMENT-START repopulates the directive table; everything
            // else leaves it alone and gets the old one back.
            if self.tag_directives.is_empty() {
                self.tag_directives = tag_directives;
            }
        }
        Ok(())
    }

    /// Pop the head event once enough lookahead is queued to decide its
    /// presentation: one event is enough unless the head opens a document
    /// or a collection, in which case the matching close (or a nested
    /// open) must be visible.
    fn next_emittable_event(&mut self) -> Option<Event> {
        let first = self.events.front()?;
        let accumulate = match &first.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return self.events.pop_front(),
        };
        if self.events.len() > accumulate {
            return self.events.pop_front();
        }
        let mut level = 0i32;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                _ => {}
            }
            if level == 0 {
                return self.events.pop_front();
            }
        }
        None
    }

    fn emitter_error<T>(problem: &'static str) -> Result<T, EmitterError> {
        Err(EmitterError::Problem(problem))
    }

    fn analyze_event<'a>(
        &mut self,
        event: &'a Event,
        tag_directives: &'a [TagDirective],
    ) -> Result<Analysis<'a>, EmitterError> {
        let mut analysis = Analysis::default();
        match &event.data {
            EventData::Alias { anchor } => {
                analysis.anchor = Some(analyze_anchor(anchor, true)?);
            }
            EventData::Scalar {
                anchor,
                tag,
                value,
                plain_implicit,
                quoted_implicit,
                ..
            } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(analyze_anchor(anchor, false)?);
                }
                if let Some(tag) = tag {
                    if self.canonical || !*plain_implicit && !*quoted_implicit {
                        analysis.tag = Some(analyze_tag(tag, tag_directives)?);
                    }
                }
                analysis.scalar = Some(self.analyze_scalar(value));
            }
            EventData::SequenceStart {
                anchor,
                tag,
                implicit,
                ..
            }
            | EventData::MappingStart {
                anchor,
                tag,
                implicit,
                ..
            } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(analyze_anchor(anchor, false)?);
                }
                if let Some(tag) = tag {
                    if self.canonical || !*implicit {
                        analysis.tag = Some(analyze_tag(tag, tag_directives)?);
                    }
                }
            }
            _ => {}
        }
        Ok(analysis)
    }

    fn analyze_scalar<'a>(&self, value: &'a str) -> ScalarAnalysis<'a> {
        if value.is_empty() {
            return ScalarAnalysis {
                value: "",
                multiline: false,
                flow_plain_allowed: false,
                block_plain_allowed: true,
                single_quoted_allowed: true,
                block_allowed: false,
                style: ScalarStyle::Any,
            };
        }
        let traits = scan_scalar_traits(value, self.unicode);
        ScalarAnalysis::from_traits(value, traits)
    }

    fn state_machine<'a>(
        &mut self,
        event: &'a Event,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        match self.state {
            EmitterState::StreamStart => self.emit_stream_start(event),
            EmitterState::FirstDocumentStart => self.emit_document_start(event, true),
            EmitterState::DocumentStart => self.emit_document_start(event, false),
            EmitterState::DocumentContent => self.emit_document_content(event, analysis),
            EmitterState::DocumentEnd => self.emit_document_end(event),
            EmitterState::FlowSequenceFirstItem => {
                self.emit_flow_sequence_item(event, true, analysis)
            }
            EmitterState::FlowSequenceItem => self.emit_flow_sequence_item(event, false, analysis),
            EmitterState::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true, analysis),
            EmitterState::FlowMappingKey => self.emit_flow_mapping_key(event, false, analysis),
            EmitterState::FlowMappingSimpleValue => {
                self.emit_flow_mapping_value(event, true, analysis)
            }
            EmitterState::FlowMappingValue => self.emit_flow_mapping_value(event, false, analysis),
            EmitterState::BlockSequenceFirstItem => {
                self.emit_block_sequence_item(event, true, analysis)
            }
            EmitterState::BlockSequenceItem => {
                self.emit_block_sequence_item(event, false, analysis)
            }
            EmitterState::BlockMappingFirstKey => {
                self.emit_block_mapping_key(event, true, analysis)
            }
            EmitterState::BlockMappingKey => self.emit_block_mapping_key(event, false, analysis),
            EmitterState::BlockMappingSimpleValue => {
                self.emit_block_mapping_value(event, true, analysis)
            }
            EmitterState::BlockMappingValue => self.emit_block_mapping_value(event, false, analysis),
            EmitterState::End => Self::emitter_error("expected nothing after STREAM-END"),
        }
    }

    fn emit_stream_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        self.open_ended = OpenEnded::None;
        if let EventData::StreamStart { encoding } = &event.data {
            if self.encoding == Encoding::Any {
                self.encoding = *encoding;
            }
            if self.encoding == Encoding::Any {
                self.encoding = Encoding::Utf8;
            }
            if self.best_indent < 2 || self.best_indent > 9 {
                self.best_indent = 2;
            }
            if self.best_width >= 0 && self.best_width <= self.best_indent * 2 {
                self.best_width = 80;
            }
            if self.best_width < 0 {
                self.best_width = i32::MAX;
            }
            if self.line_break == Break::Any {
                self.line_break = Break::Ln;
            }
            self.indent = -1;
            self.line = 0;
            self.column = 0;
            self.whitespace = true;
            self.indention = true;
            if self.encoding != Encoding::Utf8 {
                self.write_bom()?;
            }
            self.state = EmitterState::FirstDocumentStart;
            return Ok(());
        }
        Self::emitter_error("expected STREAM-START")
    }

    fn emit_document_start(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if let EventData::DocumentStart {
            version_directive,
            tag_directives,
            implicit,
        } = &event.data
        {
            let mut implicit = *implicit;
            if let Some(version_directive) = version_directive {
                analyze_version_directive(*version_directive)?;
            }
            for tag_directive in tag_directives {
                analyze_tag_directive(tag_directive)?;
                self.append_tag_directive(tag_directive.clone(), false)?;
            }
            for tag_directive in default_tag_directives() {
                self.append_tag_directive(tag_directive, true)?;
            }
            if !first || self.canonical {
                implicit = false;
            }
            if (version_directive.is_some() || !tag_directives.is_empty())
                && self.open_ended != OpenEnded::None
            {
                self.write_indicator("...", true, false, false)?;
                self.write_indent()?;
            }
            self.open_ended = OpenEnded::None;
            if let Some(version_directive) = version_directive {
                implicit = false;
                self.write_indicator("%YAML", true, false, false)?;
                if version_directive.minor == 1 {
                    self.write_indicator("1.1", true, false, false)?;
                } else {
                    self.write_indicator("1.2", true, false, false)?;
                }
                self.write_indent()?;
            }
            if !tag_directives.is_empty() {
                implicit = false;
                for tag_directive in tag_directives {
                    self.write_indicator("%TAG", true, false, false)?;
                    self.write_tag_handle(&tag_directive.handle)?;
                    self.write_tag_content(&tag_directive.prefix, true)?;
                    self.write_indent()?;
                }
            }
            if !implicit {
                self.write_indent()?;
                self.write_indicator("---", true, false, false)?;
                if self.canonical {
                    self.write_indent()?;
                }
            }
            self.state = EmitterState::DocumentContent;
            self.open_ended = OpenEnded::None;
            return Ok(());
        } else if let EventData::StreamEnd = &event.data {
            if self.open_ended == OpenEnded::BlockScalar {
                self.write_indicator("...", true, false, false)?;
                self.open_ended = OpenEnded::None;
                self.write_indent()?;
            }
            self.flush()?;
            self.state = EmitterState::End;
            self.health = Health::Done;
            return Ok(());
        }
        Self::emitter_error("expected DOCUMENT-START or STREAM-END")
    }

    fn emit_document_content(
        &mut self,
        event: &Event,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        self.states.push(EmitterState::DocumentEnd);
        self.emit_node(event, false, false, analysis)
    }

    fn emit_document_end(&mut self, event: &Event) -> Result<(), EmitterError> {
        if let EventData::DocumentEnd { implicit } = &event.data {
            let implicit = *implicit;
            self.write_indent()?;
            if !implicit {
                self.write_indicator("...", true, false, false)?;
                self.open_ended = OpenEnded::None;
                self.write_indent()?;
            } else if self.open_ended == OpenEnded::None {
                self.open_ended = OpenEnded::Document;
            }
            self.flush()?;
            self.state = EmitterState::DocumentStart;
            self.tag_directives.clear();
            return Ok(());
        }
        Self::emitter_error("expected DOCUMENT-END")
    }

    fn emit_flow_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::SequenceEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().expect("emitter indent stack underflow");
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.state = self.states.pop().expect("emitter state stack underflow");
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        self.states.push(EmitterState::FlowSequenceItem);
        self.emit_node(event, false, false, analysis)
    }

    fn emit_flow_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::MappingEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().expect("emitter indent stack underflow");
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.state = self.states.pop().expect("emitter state stack underflow");
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        if !self.canonical && self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::FlowMappingSimpleValue);
            self.emit_node(event, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(EmitterState::FlowMappingValue);
            self.emit_node(event, true, false, analysis)
        }
    }

    fn emit_flow_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.canonical || self.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(EmitterState::FlowMappingKey);
        self.emit_node(event, true, false, analysis)
    }

    fn emit_block_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.increase_indent(false, self.mapping_context && !self.indention);
        }
        if let EventData::SequenceEnd = &event.data {
            self.indent = self.indents.pop().expect("emitter indent stack underflow");
            self.state = self.states.pop().expect("emitter state stack underflow");
            return Ok(());
        }
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(EmitterState::BlockSequenceItem);
        self.emit_node(event, false, false, analysis)
    }

    fn emit_block_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.increase_indent(false, false);
        }
        if let EventData::MappingEnd = &event.data {
            self.indent = self.indents.pop().expect("emitter indent stack underflow");
            self.state = self.states.pop().expect("emitter state stack underflow");
            return Ok(());
        }
        self.write_indent()?;
        if self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::BlockMappingSimpleValue);
            self.emit_node(event, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(EmitterState::BlockMappingValue);
            self.emit_node(event, true, false, analysis)
        }
    }

    fn emit_block_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.states.push(EmitterState::BlockMappingKey);
        self.emit_node(event, true, false, analysis)
    }

    fn emit_node(
        &mut self,
        event: &Event,
        mapping: bool,
        simple_key: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;

        match event.data {
            EventData::Alias { .. } => self.emit_alias(&analysis.anchor),
            EventData::Scalar { .. } => self.emit_scalar(event, analysis),
            EventData::SequenceStart { .. } => self.emit_sequence_start(event, analysis),
            EventData::MappingStart { .. } => self.emit_mapping_start(event, analysis),
            _ => Self::emitter_error("expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS"),
        }
    }

    fn emit_alias(&mut self, anchor: &Option<AnchorAnalysis>) -> Result<(), EmitterError> {
        self.process_anchor(anchor)?;
        if self.simple_key_context {
            self.put(' ')?;
        }
        self.state = self.states.pop().expect("emitter state stack underflow");
        Ok(())
    }

    fn emit_scalar(&mut self, event: &Event, analysis: &mut Analysis) -> Result<(), EmitterError> {
        let Analysis {
            anchor,
            tag,
            scalar: Some(scalar),
        } = analysis
        else {
            unreachable!("no scalar analysis");
        };
        self.select_scalar_style(event, scalar, tag)?;
        self.process_anchor(anchor)?;
        self.process_tag(tag)?;
        self.increase_indent(true, false);
        self.process_scalar(scalar)?;
        self.indent = self.indents.pop().expect("emitter indent stack underflow");
        self.state = self.states.pop().expect("emitter state stack underflow");
        Ok(())
    }

    fn emit_sequence_start(
        &mut self,
        event: &Event,
        analysis: &Analysis,
    ) -> Result<(), EmitterError> {
        let Analysis { anchor, tag, .. } = analysis;
        self.process_anchor(anchor)?;
        self.process_tag(tag)?;

        let EventData::SequenceStart { style, .. } = &event.data else {
            unreachable!()
        };

        if self.flow_level > 0
            || self.canonical
            || *style == SequenceStyle::Flow
            || self.check_empty_sequence(event)
        {
            self.state = EmitterState::FlowSequenceFirstItem;
        } else {
            self.state = EmitterState::BlockSequenceFirstItem;
        }
        Ok(())
    }

    fn emit_mapping_start(
        &mut self,
        event: &Event,
        analysis: &Analysis,
    ) -> Result<(), EmitterError> {
        let Analysis { anchor, tag, .. } = analysis;
        self.process_anchor(anchor)?;
        self.process_tag(tag)?;

        let EventData::MappingStart { style, .. } = &event.data else {
            unreachable!()
        };

        if self.flow_level > 0
            || self.canonical
            || *style == MappingStyle::Flow
            || self.check_empty_mapping(event)
        {
            self.state = EmitterState::FlowMappingFirstKey;
        } else {
            self.state = EmitterState::BlockMappingFirstKey;
        }
        Ok(())
    }

    fn check_empty_sequence(&self, event: &Event) -> bool {
        let Some(next) = self.events.front() else {
            return false;
        };
        matches!(event.data, EventData::SequenceStart { .. })
            && matches!(next.data, EventData::SequenceEnd)
    }

    fn check_empty_mapping(&self, event: &Event) -> bool {
        let Some(next) = self.events.front() else {
            return false;
        };
        matches!(event.data, EventData::MappingStart { .. })
            && matches!(next.data, EventData::MappingEnd)
    }

    /// A key can stay inline (`key: value`) only when its whole rendition
    /// is short and single-line.
    fn check_simple_key(&self, event: &Event, analysis: &Analysis) -> bool {
        let Analysis {
            anchor,
            tag,
            scalar,
        } = analysis;

        let mut length = anchor.as_ref().map_or(0, |a| a.anchor.len())
            + tag.as_ref().map_or(0, |t| t.handle.len() + t.suffix.len());

        match event.data {
            EventData::Alias { .. } => {
                length = anchor.as_ref().map_or(0, |a| a.anchor.len());
            }
            EventData::Scalar { .. } => {
                let Some(scalar) = scalar else {
                    unreachable!("no scalar analysis");
                };
                if scalar.multiline {
                    return false;
                }
                length += scalar.value.len();
            }
            EventData::SequenceStart { .. } => {
                if !self.check_empty_sequence(event) {
                    return false;
                }
            }
            EventData::MappingStart { .. } => {
                if !self.check_empty_mapping(event) {
                    return false;
                }
            }
            _ => return false,
        }

        length <= 128
    }

    fn select_scalar_style(
        &mut self,
        event: &Event,
        scalar_analysis: &mut ScalarAnalysis,
        tag_analysis: &mut Option<TagAnalysis>,
    ) -> Result<(), EmitterError> {
        let EventData::Scalar {
            tag,
            plain_implicit,
            quoted_implicit,
            style,
            ..
        } = &event.data
        else {
            unreachable!()
        };
        let mut style = *style;
        let no_tag = tag_analysis.is_none();
        if no_tag && !*plain_implicit && !*quoted_implicit {
            return Self::emitter_error("neither tag nor implicit flags are specified");
        }
        if style == ScalarStyle::Any {
            style = ScalarStyle::Plain;
        }
        if self.canonical {
            style = ScalarStyle::DoubleQuoted;
        }
        if self.simple_key_context && scalar_analysis.multiline {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::Plain {
            if self.flow_level > 0 && !scalar_analysis.flow_plain_allowed
                || self.flow_level == 0 && !scalar_analysis.block_plain_allowed
            {
                style = ScalarStyle::SingleQuoted;
            }
            if scalar_analysis.value.is_empty()
                && (self.flow_level > 0 || self.simple_key_context)
            {
                style = ScalarStyle::SingleQuoted;
            }
            if no_tag && !*plain_implicit {
                style = ScalarStyle::SingleQuoted;
            }
            if style == ScalarStyle::Plain && *plain_implicit {
                if let (Some(resolver), Some(event_tag)) =
                    (self.resolver.as_mut(), tag.as_deref())
                {
                    // Plain with an omitted tag must re-resolve to the
                    // same tag on the way back in.
                    let resolved = resolver.resolve(UnresolvedNode {
                        kind: NodeKind::Scalar,
                        value: Some(scalar_analysis.value),
                        plain: true,
                    })?;
                    if resolved != event_tag {
                        style = ScalarStyle::SingleQuoted;
                    }
                }
            }
        }
        if style == ScalarStyle::SingleQuoted && !scalar_analysis.single_quoted_allowed {
            style = ScalarStyle::DoubleQuoted;
        }
        if (style == ScalarStyle::Literal || style == ScalarStyle::Folded)
            && (!scalar_analysis.block_allowed || self.flow_level > 0 || self.simple_key_context)
        {
            style = ScalarStyle::DoubleQuoted;
        }
        if no_tag && !*quoted_implicit && style != ScalarStyle::Plain {
            *tag_analysis = Some(TagAnalysis {
                handle: "!",
                suffix: "",
            });
        }
        scalar_analysis.style = style;
        Ok(())
    }

    fn process_anchor(&mut self, analysis: &Option<AnchorAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis.as_ref() else {
            return Ok(());
        };
        self.write_indicator(if analysis.alias { "*" } else { "&" }, true, false, false)?;
        self.write_anchor(analysis.anchor)?;
        Ok(())
    }

    fn process_tag(&mut self, analysis: &Option<TagAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis.as_ref() else {
            return Ok(());
        };
        if analysis.handle.is_empty() && analysis.suffix.is_empty() {
            return Ok(());
        }
        if analysis.handle.is_empty() {
            self.write_indicator("!<", true, false, false)?;
            self.write_tag_content(analysis.suffix, false)?;
            self.write_indicator(">", false, false, false)?;
        } else {
            self.write_tag_handle(analysis.handle)?;
            if !analysis.suffix.is_empty() {
                self.write_tag_content(analysis.suffix, false)?;
            }
        }
        Ok(())
    }

    fn process_scalar(&mut self, analysis: &ScalarAnalysis) -> Result<(), EmitterError> {
        match analysis.style {
            ScalarStyle::Plain => {
                Ok(self.write_plain_scalar(analysis.value, !self.simple_key_context)?)
            }
            ScalarStyle::SingleQuoted => {
                Ok(self.write_single_quoted_scalar(analysis.value, !self.simple_key_context)?)
            }
            ScalarStyle::DoubleQuoted => {
                Ok(self.write_double_quoted_scalar(analysis.value, !self.simple_key_context)?)
            }
            ScalarStyle::Literal => Ok(self.write_literal_scalar(analysis.value)?),
            ScalarStyle::Folded => Ok(self.write_folded_scalar(analysis.value)?),
            ScalarStyle::Any => unreachable!("no scalar style chosen"),
        }
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
    ) -> Result<(), EmitterError> {
        for tag_directive in &self.tag_directives {
            if value.handle == tag_directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Self::emitter_error("duplicate %TAG directive");
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent } else { 0 };
        } else if !indentless {
            self.indent += self.best_indent;
        }
    }

    // Low-level output: everything below stages characters in the buffer
    // and tracks the column so the width hint can be applied.

    fn flush_if_needed(&mut self) -> Result<(), WriterError> {
        if self.buffer.len() < OUTPUT_BUFFER_SIZE - 5 {
            Ok(())
        } else {
            self.flush()
        }
    }

    fn put(&mut self, ch: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.buffer.push(ch);
        self.column += 1;
        Ok(())
    }

    fn put_break(&mut self) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        match self.line_break {
            Break::Cr => self.buffer.push('\r'),
            Break::Any | Break::Ln => self.buffer.push('\n'),
            Break::CrLn => self.buffer.push_str("\r\n"),
        }
        self.column = 0;
        self.line += 1;
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.buffer.push(ch);
        self.column += 1;
        Ok(())
    }

    fn write_str(&mut self, string: &str) -> Result<(), WriterError> {
        for ch in string.chars() {
            self.write_char(ch)?;
        }
        Ok(())
    }

    fn write_break_char(&mut self, ch: char) -> Result<(), WriterError> {
        if ch == '\n' {
            self.put_break()?;
        } else {
            self.write_char(ch)?;
            self.column = 0;
            self.line += 1;
        }
        Ok(())
    }

    fn write_bom(&mut self) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.buffer.push('\u{feff}');
        Ok(())
    }

    fn write_indent(&mut self) -> Result<(), WriterError> {
        let indent = self.indent.max(0);
        if !self.indention
            || self.column > indent
            || self.column == indent && !self.whitespace
        {
            self.put_break()?;
        }
        while self.column < indent {
            self.put(' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<(), WriterError> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }
        self.write_str(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn write_anchor(&mut self, value: &str) -> Result<(), WriterError> {
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_handle(&mut self, value: &str) -> Result<(), WriterError> {
        if !self.whitespace {
            self.put(' ')?;
        }
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_content(
        &mut self,
        value: &str,
        need_whitespace: bool,
    ) -> Result<(), WriterError> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }
        for ch in value.chars() {
            if is_alpha(ch)
                || matches!(
                    ch,
                    ';' | '/'
                        | '?'
                        | ':'
                        | '@'
                        | '&'
                        | '='
                        | '+'
                        | '$'
                        | ','
                        | '_'
                        | '.'
                        | '~'
                        | '*'
                        | '\''
                        | '('
                        | ')'
                        | '['
                        | ']'
                )
            {
                self.write_char(ch)?;
                continue;
            }
            let mut encode_buffer = [0u8; 4];
            for byte in ch.encode_utf8(&mut encode_buffer).bytes() {
                self.put('%')?;
                self.put(hex_digit(byte >> 4))?;
                self.put(hex_digit(byte & 0x0f))?;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_plain_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), WriterError> {
        let mut spaces = false;
        let mut breaks = false;
        if !self.whitespace && (!value.is_empty() || self.flow_level > 0) {
            self.put(' ')?;
        }
        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            if is_space(ch) {
                if allow_breaks && !spaces && self.column > self.best_width && !is_space(next) {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_single_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), WriterError> {
        let mut spaces = false;
        let mut breaks = false;
        self.write_indicator("'", true, false, false)?;
        let mut chars = value.chars();
        let mut is_first = true;
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let is_last = next.is_none();
            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && !is_first
                    && !is_last
                    && !is_space(next)
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.put('\'')?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
            is_first = false;
        }
        if breaks {
            self.write_indent()?;
        }
        self.write_indicator("'", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_double_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), WriterError> {
        let mut spaces = false;
        self.write_indicator("\"", true, false, false)?;
        let mut chars = value.chars();
        let mut first = true;
        while let Some(ch) = chars.next() {
            if !is_printable(ch)
                || !self.unicode && !is_ascii(ch)
                || is_bom(ch)
                || is_break(ch)
                || ch == '"'
                || ch == '\\'
            {
                self.put('\\')?;
                match ch {
                    '\0' => self.put('0')?,
                    '\x07' => self.put('a')?,
                    '\x08' => self.put('b')?,
                    '\x09' => self.put('t')?,
                    '\x0a' => self.put('n')?,
                    '\x0b' => self.put('v')?,
                    '\x0c' => self.put('f')?,
                    '\x0d' => self.put('r')?,
                    '\x1b' => self.put('e')?,
                    '\x22' => self.put('"')?,
                    '\x5c' => self.put('\\')?,
                    '\u{0085}' => self.put('N')?,
                    '\u{00a0}' => self.put('_')?,
                    '\u{2028}' => self.put('L')?,
                    '\u{2029}' => self.put('P')?,
                    _ => {
                        let (prefix, width) = if ch <= '\u{00ff}' {
                            ('x', 2)
                        } else if ch <= '\u{ffff}' {
                            ('u', 4)
                        } else {
                            ('U', 8)
                        };
                        self.put(prefix)?;
                        let value = ch as u32;
                        for k in (0..width).rev() {
                            let digit = (value >> (k * 4)) & 0x0f;
                            self.put(hex_digit(digit as u8))?;
                        }
                    }
                }
                spaces = false;
            } else if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && !first
                    && chars.clone().next().is_some()
                {
                    self.write_indent()?;
                    if is_space(chars.clone().next()) {
                        self.put('\\')?;
                    }
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else {
                self.write_char(ch)?;
                spaces = false;
            }
            first = false;
        }
        self.write_indicator("\"", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_block_scalar_hints(&mut self, string: &str) -> Result<(), WriterError> {
        let mut chomp_hint: Option<&str> = None;
        let first = string.chars().next();
        if is_space(first) || is_break(first) {
            let indent_hint = char::from_digit(self.best_indent as u32, 10)
                .expect("best_indent out of range");
            let mut indent_hint_buffer = [0u8; 1];
            let indent_hint = indent_hint.encode_utf8(&mut indent_hint_buffer);
            self.write_indicator(indent_hint, false, false, false)?;
        }
        self.open_ended = OpenEnded::None;

        if string.is_empty() {
            chomp_hint = Some("-");
        } else {
            let mut chars_rev = string.chars().rev();
            let last = chars_rev.next();
            let before_last = chars_rev.next();
            if !is_break(last) {
                chomp_hint = Some("-");
            } else if is_breakz(before_last) {
                chomp_hint = Some("+");
                self.open_ended = OpenEnded::BlockScalar;
            }
        }

        if let Some(chomp_hint) = chomp_hint {
            self.write_indicator(chomp_hint, false, false, false)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<(), WriterError> {
        let mut breaks = true;
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        for ch in value.chars() {
            if is_break(ch) {
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<(), WriterError> {
        let mut breaks = true;
        let mut leading_spaces = true;
        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;

        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            if is_break(ch) {
                if !breaks && !leading_spaces && ch == '\n' {
                    let mut skip_breaks = chars.clone();
                    while is_break(skip_breaks.next()) {}
                    if !is_blankz(skip_breaks.next()) {
                        self.put_break()?;
                    }
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_blank(ch);
                }
                if !breaks
                    && is_space(ch)
                    && !is_space(chars.clone().next())
                    && self.column > self.best_width
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }
}

fn hex_digit(value: u8) -> char {
    char::from_digit(u32::from(value), 16)
        .expect("not in digit range (hex)")
        .to_ascii_uppercase()
}

fn analyze_version_directive(version_directive: VersionDirective) -> Result<(), EmitterError> {
    if version_directive.major != 1
        || version_directive.minor != 1 && version_directive.minor != 2
    {
        return Err(EmitterError::Problem("incompatible %YAML directive"));
    }
    Ok(())
}

fn analyze_tag_directive(tag_directive: &TagDirective) -> Result<(), EmitterError> {
    if tag_directive.handle.is_empty() {
        return Err(EmitterError::Problem("tag handle must not be empty"));
    }
    if !tag_directive.handle.starts_with('!') {
        return Err(EmitterError::Problem("tag handle must start with '!'"));
    }
    if !tag_directive.handle.ends_with('!') {
        return Err(EmitterError::Problem("tag handle must end with '!'"));
    }
    if tag_directive.handle.len() > 2 {
        let content = &tag_directive.handle[1..tag_directive.handle.len() - 1];
        if !content.chars().all(is_alpha) {
            return Err(EmitterError::Problem(
                "tag handle must contain alphanumerical characters only",
            ));
        }
    }
    if tag_directive.prefix.is_empty() {
        return Err(EmitterError::Problem("tag prefix must not be empty"));
    }
    Ok(())
}

fn analyze_anchor(anchor: &str, alias: bool) -> Result<AnchorAnalysis<'_>, EmitterError> {
    if anchor.is_empty() {
        return Err(EmitterError::Problem(if alias {
            "alias value must not be empty"
        } else {
            "anchor value must not be empty"
        }));
    }
    if !anchor.chars().all(is_alpha) {
        return Err(EmitterError::Problem(if alias {
            "alias value must contain alphanumerical characters only"
        } else {
            "anchor value must contain alphanumerical characters only"
        }));
    }
    Ok(AnchorAnalysis { anchor, alias })
}

fn analyze_tag<'a>(
    tag: &'a str,
    tag_directives: &'a [TagDirective],
) -> Result<TagAnalysis<'a>, EmitterError> {
    if tag.is_empty() {
        return Err(EmitterError::Problem("tag value must not be empty"));
    }
    let mut handle = "";
    let mut suffix = tag;
    for tag_directive in tag_directives {
        let prefix_len = tag_directive.prefix.len();
        if prefix_len < tag.len() && tag_directive.prefix == tag[0..prefix_len] {
            handle = &tag_directive.handle;
            suffix = &tag[prefix_len..];
            break;
        }
    }
    Ok(TagAnalysis { handle, suffix })
}
