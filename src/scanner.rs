use std::collections::VecDeque;
use std::io::BufRead;

use crate::chars::{
    self, as_digit, as_hex, is_alpha, is_blank, is_blankz, is_break, is_breakz, is_digit, is_hex,
};
use crate::error::ScannerError;
use crate::reader::Reader;
use crate::token::{Token, TokenData};
use crate::{Encoding, Health, Mark, ScalarStyle};

/// A plain scalar this long can no longer become a simple key.
const MAX_SIMPLE_KEY_LENGTH: u64 = 1024;

/// A potential simple key, one slot per flow level.
///
/// `token_number` is the absolute number of the token the key would become;
/// when the matching `:` arrives, a KEY token is spliced into the queue at
/// that position, behind tokens that were produced in the meantime.
#[derive(Copy, Clone, Default)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Mark,
}

/// Produces tokens from a character stream on demand.
///
/// Tokens are staged in an internal queue because a simple key forces the
/// scanner to emit a KEY token *before* the scalar it was discovered after;
/// [`Scanner::scan`] only fetches more input when the queue is empty or its
/// head may still receive such a retroactive insertion.
pub struct Scanner<'r> {
    pub(crate) reader: Reader<'r>,
    pub(crate) health: Health,
    stream_start_produced: bool,
    flow_level: usize,
    pub(crate) tokens: VecDeque<Token>,
    /// Number of tokens already handed out; queue position of an absolute
    /// token number `n` is `n - tokens_parsed`.
    pub(crate) tokens_parsed: usize,
    pub(crate) token_available: bool,
    indent: i64,
    indents: Vec<i64>,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
}

impl<'r> Default for Scanner<'r> {
    fn default() -> Self {
        Self::new()
    }
}

fn scanner_error(
    context: &'static str,
    context_mark: Mark,
    problem: &'static str,
    problem_mark: Mark,
) -> ScannerError {
    ScannerError::Problem {
        context,
        context_mark,
        problem,
        problem_mark,
    }
}

/// Merge pending line breaks into `string` per the YAML folding rules: a
/// single break becomes a space, a run of breaks keeps all but the first.
fn fold_breaks(string: &mut String, leading_break: &mut String, trailing_breaks: &mut String) {
    if leading_break.starts_with('\n') {
        if trailing_breaks.is_empty() {
            string.push(' ');
        } else {
            string.push_str(trailing_breaks);
            trailing_breaks.clear();
        }
        leading_break.clear();
    } else {
        string.push_str(leading_break);
        string.push_str(trailing_breaks);
        leading_break.clear();
        trailing_breaks.clear();
    }
}

impl<'r> Scanner<'r> {
    /// Create a scanner without an input source.
    pub fn new() -> Scanner<'r> {
        Scanner {
            reader: Reader::new(),
            health: Health::Ready,
            stream_start_produced: false,
            flow_level: 0,
            tokens: VecDeque::with_capacity(16),
            tokens_parsed: 0,
            token_available: false,
            indent: 0,
            indents: Vec::with_capacity(16),
            simple_key_allowed: false,
            simple_keys: Vec::with_capacity(16),
        }
    }

    /// Reset the scanner to its freshly created state. Input and encoding
    /// must be configured again.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r mut &[u8]) {
        self.reader.set_input(input);
    }

    /// Set a generic input source.
    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        self.reader.set_input(input);
    }

    /// Set the source encoding, overriding BOM detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.reader.set_encoding(encoding);
    }

    /// Scan the input stream and produce the next token.
    ///
    /// The first token is always STREAM-START and the last one STREAM-END;
    /// further calls keep returning STREAM-END tokens.
    pub fn scan(&mut self) -> Result<Token, ScannerError> {
        match self.health {
            Health::Poisoned => return Err(ScannerError::Poisoned),
            Health::Done => {
                let mark = self.reader.mark;
                return Ok(Token::new(TokenData::StreamEnd, mark, mark));
            }
            Health::Ready => {}
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let token = self
            .tokens
            .pop_front()
            .expect("token queue is empty after fetch");
        self.token_available = false;
        self.tokens_parsed += 1;
        if matches!(token.data, TokenData::StreamEnd) {
            self.health = Health::Done;
        }
        Ok(token)
    }

    /// Fill the queue until its head token is final, i.e. no pending simple
    /// key may still splice a KEY token in front of it.
    pub(crate) fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        let result = self.fetch_more_tokens_inner();
        if result.is_err() {
            self.health = Health::Poisoned;
        }
        result
    }

    fn fetch_more_tokens_inner(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more = self.tokens.is_empty();
            if !need_more {
                self.stale_simple_keys()?;
                for simple_key in &self.simple_keys {
                    if simple_key.possible && simple_key.token_number == self.tokens_parsed {
                        need_more = true;
                        break;
                    }
                }
            }
            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.reader.cache(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.reader.mark.column as i64);
        self.reader.cache(4)?;
        if self.reader.peek().is_none() {
            return self.fetch_stream_end();
        }
        let at_line_start = self.reader.mark.column == 0;
        if at_line_start && self.reader.check('%') {
            return self.fetch_directive();
        }
        if at_line_start && self.check_document_indicator('-') {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if at_line_start && self.check_document_indicator('.') {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        if self.reader.check('[') {
            return self.fetch_flow_collection_start(TokenData::FlowSequenceStart);
        }
        if self.reader.check('{') {
            return self.fetch_flow_collection_start(TokenData::FlowMappingStart);
        }
        if self.reader.check(']') {
            return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd);
        }
        if self.reader.check('}') {
            return self.fetch_flow_collection_end(TokenData::FlowMappingEnd);
        }
        if self.reader.check(',') {
            return self.fetch_flow_entry();
        }
        if self.reader.check('-') && is_blankz(self.reader.peek_at(1)) {
            return self.fetch_block_entry();
        }
        if self.reader.check('?') && (self.flow_level > 0 || is_blankz(self.reader.peek_at(1))) {
            return self.fetch_key();
        }
        if self.reader.check(':') && (self.flow_level > 0 || is_blankz(self.reader.peek_at(1))) {
            return self.fetch_value();
        }
        if self.reader.check('*') {
            return self.fetch_anchor(true);
        }
        if self.reader.check('&') {
            return self.fetch_anchor(false);
        }
        if self.reader.check('!') {
            return self.fetch_tag();
        }
        if self.reader.check('|') && self.flow_level == 0 {
            return self.fetch_block_scalar(true);
        }
        if self.reader.check('>') && self.flow_level == 0 {
            return self.fetch_block_scalar(false);
        }
        if self.reader.check('\'') {
            return self.fetch_flow_scalar(true);
        }
        if self.reader.check('"') {
            return self.fetch_flow_scalar(false);
        }
        let is_indicator = is_blankz(self.reader.peek())
            || matches!(
                self.reader.peek(),
                Some(
                    '-' | '?'
                        | ':'
                        | ','
                        | '['
                        | ']'
                        | '{'
                        | '}'
                        | '#'
                        | '&'
                        | '*'
                        | '!'
                        | '|'
                        | '>'
                        | '\''
                        | '"'
                        | '%'
                        | '@'
                        | '`'
                )
            );
        if !is_indicator
            || self.reader.check('-') && !is_blank(self.reader.peek_at(1))
            || self.flow_level == 0
                && (self.reader.check('?') || self.reader.check(':'))
                && !is_blankz(self.reader.peek_at(1))
        {
            return self.fetch_plain_scalar();
        }
        Err(scanner_error(
            "while scanning for the next token",
            self.reader.mark,
            "found character that cannot start any token",
            self.reader.mark,
        ))
    }

    fn check_document_indicator(&self, ch: char) -> bool {
        self.reader.check(ch)
            && self.reader.check_at(1, ch)
            && self.reader.check_at(2, ch)
            && is_blankz(self.reader.peek_at(3))
    }

    /// Expire candidates that can no longer be simple keys: the line moved
    /// on, or the key grew past the length limit.
    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.mark;
        for simple_key in &mut self.simple_keys {
            if simple_key.possible
                && (simple_key.mark.line < mark.line
                    || simple_key.mark.index + MAX_SIMPLE_KEY_LENGTH < mark.index)
            {
                if simple_key.required {
                    return Err(scanner_error(
                        "while scanning a simple key",
                        simple_key.mark,
                        "could not find expected ':'",
                        mark,
                    ));
                }
                simple_key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let required = self.flow_level == 0 && self.indent == self.reader.mark.column as i64;
        if self.simple_key_allowed {
            let simple_key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark: self.reader.mark,
            };
            self.remove_simple_key()?;
            *self.simple_keys.last_mut().expect("no simple key slot") = simple_key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.mark;
        let simple_key = self.simple_keys.last_mut().expect("no simple key slot");
        if simple_key.possible && simple_key.required {
            return Err(scanner_error(
                "while scanning a simple key",
                simple_key.mark,
                "could not find expected ':'",
                mark,
            ));
        }
        simple_key.possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            let _ = self.simple_keys.pop();
        }
    }

    /// Open a block collection context at `column`. With `number`, the
    /// start token is spliced at that absolute queue position (behind a
    /// retroactive KEY); otherwise it is appended.
    fn roll_indent(&mut self, column: i64, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token::new(data, mark, mark);
            match number {
                Some(number) => self.tokens.insert(number - self.tokens_parsed, token),
                None => self.tokens.push_back(token),
            }
        }
    }

    /// Close block collection contexts down to `column`, emitting a
    /// BLOCK-END token for each.
    fn unroll_indent(&mut self, column: i64) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark;
            self.tokens
                .push_back(Token::new(TokenData::BlockEnd, mark, mark));
            self.indent = self.indents.pop().expect("indent stack underflow");
        }
    }

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let mark = self.reader.mark;
        self.tokens.push_back(Token::new(
            TokenData::StreamStart {
                encoding: self.reader.encoding,
            },
            mark,
            mark,
        ));
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        if self.reader.mark.column != 0 {
            self.reader.mark.column = 0;
            self.reader.mark.line += 1;
        }
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let mark = self.reader.mark;
        self.tokens
            .push_back(Token::new(TokenData::StreamEnd, mark, mark));
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.reader.skip();
        self.reader.skip();
        self.tokens
            .push_back(Token::new(data, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.tokens
            .push_back(Token::new(data, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.tokens
            .push_back(Token::new(data, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.tokens
            .push_back(Token::new(TokenData::FlowEntry, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(scanner_error(
                    "",
                    self.reader.mark,
                    "block sequence entries are not allowed in this context",
                    self.reader.mark,
                ));
            }
            self.roll_indent(
                self.reader.mark.column as i64,
                None,
                TokenData::BlockSequenceStart,
                self.reader.mark,
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.tokens.push_back(Token::new(
            TokenData::BlockEntry,
            start_mark,
            self.reader.mark,
        ));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(scanner_error(
                    "",
                    self.reader.mark,
                    "mapping keys are not allowed in this context",
                    self.reader.mark,
                ));
            }
            self.roll_indent(
                self.reader.mark.column as i64,
                None,
                TokenData::BlockMappingStart,
                self.reader.mark,
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.tokens
            .push_back(Token::new(TokenData::Key, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let simple_key = self.simple_keys.last_mut().expect("no simple key slot");
        if simple_key.possible {
            let token = Token::new(TokenData::Key, simple_key.mark, simple_key.mark);
            let token_number = simple_key.token_number;
            let mark = simple_key.mark;
            simple_key.possible = false;
            self.tokens.insert(token_number - self.tokens_parsed, token);
            self.roll_indent(
                mark.column as i64,
                Some(token_number),
                TokenData::BlockMappingStart,
                mark,
            );
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(scanner_error(
                        "",
                        self.reader.mark,
                        "mapping values are not allowed in this context",
                        self.reader.mark,
                    ));
                }
                self.roll_indent(
                    self.reader.mark.column as i64,
                    None,
                    TokenData::BlockMappingStart,
                    self.reader.mark,
                );
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.tokens
            .push_back(Token::new(TokenData::Value, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    /// Skip whitespace, comments and line breaks before the next token.
    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            self.reader.cache(1)?;
            if self.reader.mark.column == 0 && chars::is_bom(self.reader.peek()) {
                self.reader.skip();
            }
            self.reader.cache(1)?;
            // Tabs may separate tokens, but not indent a simple key.
            while self.reader.check(' ')
                || (self.flow_level > 0 || !self.simple_key_allowed) && self.reader.check('\t')
            {
                self.reader.skip();
                self.reader.cache(1)?;
            }
            if self.reader.check('#') {
                while !is_breakz(self.reader.peek()) {
                    self.reader.skip();
                    self.reader.cache(1)?;
                }
            }
            if !is_break(self.reader.peek()) {
                break;
            }
            self.reader.cache(2)?;
            self.reader.skip_break();
            if self.flow_level == 0 {
                self.simple_key_allowed = true;
            }
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.reader.skip();
        let name = self.scan_directive_name(start_mark)?;
        let token = if name == "YAML" {
            let (major, minor) = self.scan_version_directive_value(start_mark)?;
            Token::new(
                TokenData::VersionDirective { major, minor },
                start_mark,
                self.reader.mark,
            )
        } else if name == "TAG" {
            let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
            Token::new(
                TokenData::TagDirective { handle, prefix },
                start_mark,
                self.reader.mark,
            )
        } else {
            return Err(scanner_error(
                "while scanning a directive",
                start_mark,
                "found unknown directive name",
                self.reader.mark,
            ));
        };
        self.reader.cache(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if self.reader.check('#') {
            while !is_breakz(self.reader.peek()) {
                self.reader.skip();
                self.reader.cache(1)?;
            }
        }
        if !is_breakz(self.reader.peek()) {
            return Err(scanner_error(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
                self.reader.mark,
            ));
        }
        if is_break(self.reader.peek()) {
            self.reader.cache(2)?;
            self.reader.skip_break();
        }
        Ok(token)
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        let mut string = String::new();
        self.reader.cache(1)?;
        while is_alpha(self.reader.peek()) {
            self.reader.read_into(&mut string);
            self.reader.cache(1)?;
        }
        if string.is_empty() {
            Err(scanner_error(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
                self.reader.mark,
            ))
        } else if !is_blankz(self.reader.peek()) {
            Err(scanner_error(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
                self.reader.mark,
            ))
        } else {
            Ok(string)
        }
    }

    fn scan_version_directive_value(&mut self, start_mark: Mark) -> Result<(i32, i32), ScannerError> {
        self.reader.cache(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        let major = self.scan_version_number(start_mark)?;
        if !self.reader.check('.') {
            return Err(scanner_error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
                self.reader.mark,
            ));
        }
        self.reader.skip();
        let minor = self.scan_version_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_number(&mut self, start_mark: Mark) -> Result<i32, ScannerError> {
        const MAX_NUMBER_LENGTH: usize = 9;
        let mut value = 0i32;
        let mut length = 0usize;
        self.reader.cache(1)?;
        while is_digit(self.reader.peek()) {
            length += 1;
            if length > MAX_NUMBER_LENGTH {
                return Err(scanner_error(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                    self.reader.mark,
                ));
            }
            value = value * 10 + as_digit(self.reader.peek()) as i32;
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if length == 0 {
            return Err(scanner_error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
                self.reader.mark,
            ));
        }
        Ok(value)
    }

    fn scan_tag_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(String, String), ScannerError> {
        self.reader.cache(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.reader.cache(1)?;
        if !is_blank(self.reader.peek()) {
            return Err(scanner_error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
                self.reader.mark,
            ));
        }
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        let prefix = self.scan_tag_uri(true, true, None, start_mark)?;
        self.reader.cache(1)?;
        if !is_blankz(self.reader.peek()) {
            return Err(scanner_error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
                self.reader.mark,
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        let mut string = String::new();
        self.reader.skip();
        self.reader.cache(1)?;
        while is_alpha(self.reader.peek()) {
            self.reader.read_into(&mut string);
            self.reader.cache(1)?;
        }
        let end_mark = self.reader.mark;
        let terminated = is_blankz(self.reader.peek())
            || matches!(
                self.reader.peek(),
                Some('?' | ':' | ',' | ']' | '}' | '%' | '@' | '`')
            );
        if string.is_empty() || !terminated {
            return Err(scanner_error(
                if alias {
                    "while scanning an alias"
                } else {
                    "while scanning an anchor"
                },
                start_mark,
                "did not find expected alphabetic or numeric character",
                self.reader.mark,
            ));
        }
        let data = if alias {
            TokenData::Alias { value: string }
        } else {
            TokenData::Anchor { value: string }
        };
        Ok(Token::new(data, start_mark, end_mark))
    }

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        let mut handle;
        let mut suffix;
        self.reader.cache(2)?;
        if self.reader.check_at(1, '<') {
            // Verbatim tag: !<uri>
            handle = String::new();
            self.reader.skip();
            self.reader.skip();
            suffix = self.scan_tag_uri(true, false, None, start_mark)?;
            if !self.reader.check('>') {
                return Err(scanner_error(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                    self.reader.mark,
                ));
            }
            self.reader.skip();
        } else {
            handle = self.scan_tag_handle(false, start_mark)?;
            if handle.len() > 1 && handle.starts_with('!') && handle.ends_with('!') {
                suffix = self.scan_tag_uri(false, false, None, start_mark)?;
            } else {
                suffix = self.scan_tag_uri(false, false, Some(&handle), start_mark)?;
                handle = String::from("!");
                // A lone '!' is a valid non-specific tag.
                if suffix.is_empty() {
                    core::mem::swap(&mut handle, &mut suffix);
                }
            }
        }
        self.reader.cache(1)?;
        if !is_blankz(self.reader.peek()) && (self.flow_level == 0 || !self.reader.check(',')) {
            return Err(scanner_error(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
                self.reader.mark,
            ));
        }
        Ok(Token::new(
            TokenData::Tag { handle, suffix },
            start_mark,
            self.reader.mark,
        ))
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: Mark) -> Result<String, ScannerError> {
        let context = if directive {
            "while scanning a tag directive"
        } else {
            "while scanning a tag"
        };
        let mut string = String::new();
        self.reader.cache(1)?;
        if !self.reader.check('!') {
            return Err(scanner_error(
                context,
                start_mark,
                "did not find expected '!'",
                self.reader.mark,
            ));
        }
        self.reader.read_into(&mut string);
        self.reader.cache(1)?;
        while is_alpha(self.reader.peek()) {
            self.reader.read_into(&mut string);
            self.reader.cache(1)?;
        }
        if self.reader.check('!') {
            self.reader.read_into(&mut string);
        } else if directive && string != "!" {
            return Err(scanner_error(
                context,
                start_mark,
                "did not find expected '!'",
                self.reader.mark,
            ));
        }
        Ok(string)
    }

    fn scan_tag_uri(
        &mut self,
        uri_char: bool,
        directive: bool,
        head: Option<&str>,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let head = head.unwrap_or("");
        let mut length = head.len();
        // The handle's '!' stays out; the rest of the head is part of the
        // suffix.
        let mut string = if length > 1 {
            String::from(&head[1..])
        } else {
            String::new()
        };
        self.reader.cache(1)?;
        loop {
            let ch = self.reader.peek();
            let accepted = is_alpha(ch)
                || matches!(
                    ch,
                    Some(
                        ';' | '/'
                            | '?'
                            | ':'
                            | '@'
                            | '&'
                            | '='
                            | '+'
                            | '$'
                            | '.'
                            | '%'
                            | '!'
                            | '~'
                            | '*'
                            | '\''
                            | '('
                            | ')'
                    )
                )
                || uri_char && matches!(ch, Some(',' | '[' | ']'));
            if !accepted {
                break;
            }
            if self.reader.check('%') {
                self.scan_uri_escapes(directive, start_mark, &mut string)?;
            } else {
                self.reader.read_into(&mut string);
            }
            length += 1;
            self.reader.cache(1)?;
        }
        if length == 0 {
            return Err(scanner_error(
                if directive {
                    "while parsing a %TAG directive"
                } else {
                    "while parsing a tag"
                },
                start_mark,
                "did not find expected tag URI",
                self.reader.mark,
            ));
        }
        Ok(string)
    }

    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        let context = if directive {
            "while parsing a %TAG directive"
        } else {
            "while parsing a tag"
        };
        let mut bytes: Vec<u8> = Vec::with_capacity(4);
        let mut width = 0usize;
        loop {
            self.reader.cache(3)?;
            if !(self.reader.check('%')
                && is_hex(self.reader.peek_at(1))
                && is_hex(self.reader.peek_at(2)))
            {
                return Err(scanner_error(
                    context,
                    start_mark,
                    "did not find URI escaped octet",
                    self.reader.mark,
                ));
            }
            let octet = ((as_hex(self.reader.peek_at(1)) << 4) + as_hex(self.reader.peek_at(2))) as u8;
            if bytes.is_empty() {
                width = match octet {
                    0x00..=0x7f => 1,
                    0xc0..=0xdf => 2,
                    0xe0..=0xef => 3,
                    0xf0..=0xf7 => 4,
                    _ => {
                        return Err(scanner_error(
                            context,
                            start_mark,
                            "found an incorrect leading UTF-8 octet",
                            self.reader.mark,
                        ))
                    }
                };
            } else if octet & 0xc0 != 0x80 {
                return Err(scanner_error(
                    context,
                    start_mark,
                    "found an incorrect trailing UTF-8 octet",
                    self.reader.mark,
                ));
            }
            bytes.push(octet);
            self.reader.skip();
            self.reader.skip();
            self.reader.skip();
            if bytes.len() == width {
                break;
            }
        }
        match std::str::from_utf8(&bytes) {
            Ok(decoded) => {
                string.push_str(decoded);
                Ok(())
            }
            Err(_) => Err(scanner_error(
                context,
                start_mark,
                "found an invalid URI escape sequence",
                self.reader.mark,
            )),
        }
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        // -1 strip, 0 clip, +1 keep.
        let mut chomping = 0i32;
        let mut increment = 0i64;
        let mut indent = 0i64;
        let mut leading_blank = false;

        self.reader.skip();
        self.reader.cache(1)?;
        if self.reader.check('+') || self.reader.check('-') {
            chomping = if self.reader.check('+') { 1 } else { -1 };
            self.reader.skip();
            self.reader.cache(1)?;
            if is_digit(self.reader.peek()) {
                if self.reader.check('0') {
                    return Err(scanner_error(
                        "while scanning a block scalar",
                        start_mark,
                        "found an indentation indicator equal to 0",
                        self.reader.mark,
                    ));
                }
                increment = as_digit(self.reader.peek()) as i64;
                self.reader.skip();
            }
        } else if is_digit(self.reader.peek()) {
            if self.reader.check('0') {
                return Err(scanner_error(
                    "while scanning a block scalar",
                    start_mark,
                    "found an indentation indicator equal to 0",
                    self.reader.mark,
                ));
            }
            increment = as_digit(self.reader.peek()) as i64;
            self.reader.skip();
            self.reader.cache(1)?;
            if self.reader.check('+') || self.reader.check('-') {
                chomping = if self.reader.check('+') { 1 } else { -1 };
                self.reader.skip();
            }
        }

        self.reader.cache(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if self.reader.check('#') {
            while !is_breakz(self.reader.peek()) {
                self.reader.skip();
                self.reader.cache(1)?;
            }
        }
        if !is_breakz(self.reader.peek()) {
            return Err(scanner_error(
                "while scanning a block scalar",
                start_mark,
                "did not find expected comment or line break",
                self.reader.mark,
            ));
        }
        if is_break(self.reader.peek()) {
            self.reader.cache(2)?;
            self.reader.skip_break();
        }

        let mut end_mark = self.reader.mark;
        if increment != 0 {
            indent = if self.indent >= 0 {
                self.indent + increment
            } else {
                increment
            };
        }
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark, &mut end_mark)?;
        self.reader.cache(1)?;

        while self.reader.mark.column as i64 == indent && self.reader.peek().is_some() {
            let trailing_blank = is_blank(self.reader.peek());
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
                leading_break.clear();
            } else {
                string.push_str(&leading_break);
                leading_break.clear();
            }
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = is_blank(self.reader.peek());
            while !is_breakz(self.reader.peek()) {
                self.reader.read_into(&mut string);
                self.reader.cache(1)?;
            }
            self.reader.cache(2)?;
            self.reader.read_break_into(&mut leading_break);
            self.scan_block_scalar_breaks(
                &mut indent,
                &mut trailing_breaks,
                start_mark,
                &mut end_mark,
            )?;
        }

        if chomping != -1 {
            string.push_str(&leading_break);
        }
        if chomping == 1 {
            string.push_str(&trailing_breaks);
        }

        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: if literal {
                    ScalarStyle::Literal
                } else {
                    ScalarStyle::Folded
                },
            },
            start_mark,
            end_mark,
        ))
    }

    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut i64,
        breaks: &mut String,
        start_mark: Mark,
        end_mark: &mut Mark,
    ) -> Result<(), ScannerError> {
        let mut max_indent = 0i64;
        *end_mark = self.reader.mark;
        loop {
            self.reader.cache(1)?;
            while (*indent == 0 || (self.reader.mark.column as i64) < *indent)
                && self.reader.check(' ')
            {
                self.reader.skip();
                self.reader.cache(1)?;
            }
            if self.reader.mark.column as i64 > max_indent {
                max_indent = self.reader.mark.column as i64;
            }
            if (*indent == 0 || (self.reader.mark.column as i64) < *indent)
                && self.reader.check('\t')
            {
                return Err(scanner_error(
                    "while scanning a block scalar",
                    start_mark,
                    "found a tab character where an indentation space is expected",
                    self.reader.mark,
                ));
            }
            if !is_break(self.reader.peek()) {
                break;
            }
            self.reader.cache(2)?;
            self.reader.read_break_into(breaks);
            *end_mark = self.reader.mark;
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let quote = if single { '\'' } else { '"' };
        let start_mark = self.reader.mark;
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks;

        self.reader.skip();
        loop {
            self.reader.cache(4)?;
            if self.reader.mark.column == 0
                && (self.check_document_indicator('-') || self.check_document_indicator('.'))
            {
                return Err(scanner_error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document indicator",
                    self.reader.mark,
                ));
            }
            if self.reader.peek().is_none() {
                return Err(scanner_error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected end of stream",
                    self.reader.mark,
                ));
            }
            self.reader.cache(2)?;
            leading_blanks = false;
            while !is_blankz(self.reader.peek()) {
                if single && self.reader.check('\'') && self.reader.check_at(1, '\'') {
                    string.push('\'');
                    self.reader.skip();
                    self.reader.skip();
                } else if self.reader.check(quote) {
                    break;
                } else if !single && self.reader.check('\\') && is_break(self.reader.peek_at(1)) {
                    // Escaped line break: eat it and fold the following
                    // whitespace.
                    self.reader.cache(3)?;
                    self.reader.skip();
                    self.reader.skip_break();
                    leading_blanks = true;
                    break;
                } else if !single && self.reader.check('\\') {
                    let mut code_length = 0usize;
                    match self.reader.peek_at(1) {
                        Some('0') => string.push('\0'),
                        Some('a') => string.push('\x07'),
                        Some('b') => string.push('\x08'),
                        Some('t' | '\t') => string.push('\t'),
                        Some('n') => string.push('\n'),
                        Some('v') => string.push('\x0b'),
                        Some('f') => string.push('\x0c'),
                        Some('r') => string.push('\r'),
                        Some('e') => string.push('\x1b'),
                        Some(' ') => string.push(' '),
                        Some('"') => string.push('"'),
                        Some('/') => string.push('/'),
                        Some('\\') => string.push('\\'),
                        Some('N') => string.push('\u{0085}'),
                        Some('_') => string.push('\u{00a0}'),
                        Some('L') => string.push('\u{2028}'),
                        Some('P') => string.push('\u{2029}'),
                        Some('x') => code_length = 2,
                        Some('u') => code_length = 4,
                        Some('U') => code_length = 8,
                        _ => {
                            return Err(scanner_error(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found unknown escape character",
                                self.reader.mark,
                            ))
                        }
                    }
                    self.reader.skip();
                    self.reader.skip();
                    if code_length != 0 {
                        self.reader.cache(code_length)?;
                        let mut value = 0u32;
                        for k in 0..code_length {
                            if !is_hex(self.reader.peek_at(k)) {
                                return Err(scanner_error(
                                    "while parsing a quoted scalar",
                                    start_mark,
                                    "did not find expected hexadecimal number",
                                    self.reader.mark,
                                ));
                            }
                            value = (value << 4) + as_hex(self.reader.peek_at(k));
                        }
                        let Some(ch) = char::from_u32(value) else {
                            return Err(scanner_error(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found invalid Unicode character escape code",
                                self.reader.mark,
                            ));
                        };
                        string.push(ch);
                        for _ in 0..code_length {
                            self.reader.skip();
                        }
                    }
                } else {
                    self.reader.read_into(&mut string);
                }
                self.reader.cache(2)?;
            }
            self.reader.cache(1)?;
            if self.reader.check(quote) {
                break;
            }
            self.reader.cache(1)?;
            while is_blank(self.reader.peek()) || is_break(self.reader.peek()) {
                if is_blank(self.reader.peek()) {
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read_into(&mut whitespaces);
                    }
                } else {
                    self.reader.cache(2)?;
                    if leading_blanks {
                        self.reader.read_break_into(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_break_into(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.cache(1)?;
            }
            if leading_blanks {
                fold_breaks(&mut string, &mut leading_break, &mut trailing_breaks);
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        self.reader.skip();
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: if single {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::DoubleQuoted
                },
            },
            start_mark,
            self.reader.mark,
        ))
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        let indent = self.indent + 1;
        let start_mark = self.reader.mark;
        let mut end_mark = start_mark;
        loop {
            self.reader.cache(4)?;
            if self.reader.mark.column == 0
                && (self.check_document_indicator('-') || self.check_document_indicator('.'))
            {
                break;
            }
            if self.reader.check('#') {
                break;
            }
            while !is_blankz(self.reader.peek()) {
                if self.flow_level > 0
                    && self.reader.check(':')
                    && matches!(self.reader.peek_at(1), Some(',' | '?' | '[' | ']' | '{' | '}'))
                {
                    return Err(scanner_error(
                        "while scanning a plain scalar",
                        start_mark,
                        "found unexpected ':'",
                        self.reader.mark,
                    ));
                }
                if self.reader.check(':') && is_blankz(self.reader.peek_at(1))
                    || self.flow_level > 0
                        && matches!(self.reader.peek(), Some(',' | '[' | ']' | '{' | '}'))
                {
                    break;
                }
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        fold_breaks(&mut string, &mut leading_break, &mut trailing_breaks);
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }
                self.reader.read_into(&mut string);
                end_mark = self.reader.mark;
                self.reader.cache(2)?;
            }
            if !(is_blank(self.reader.peek()) || is_break(self.reader.peek())) {
                break;
            }
            self.reader.cache(1)?;
            while is_blank(self.reader.peek()) || is_break(self.reader.peek()) {
                if is_blank(self.reader.peek()) {
                    if leading_blanks
                        && (self.reader.mark.column as i64) < indent
                        && chars::is_tab(self.reader.peek())
                    {
                        return Err(scanner_error(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                            self.reader.mark,
                        ));
                    }
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read_into(&mut whitespaces);
                    }
                } else {
                    self.reader.cache(2)?;
                    if leading_blanks {
                        self.reader.read_break_into(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_break_into(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.cache(1)?;
            }
            if self.flow_level == 0 && (self.reader.mark.column as i64) < indent {
                break;
            }
        }

        if leading_blanks {
            self.simple_key_allowed = true;
        }
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tokens_of(input: &str) -> Vec<TokenData> {
        let mut bytes = input.as_bytes();
        let mut scanner = Scanner::new();
        scanner.set_input_string(&mut bytes);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.scan().unwrap();
            let done = matches!(token.data, TokenData::StreamEnd);
            tokens.push(token.data);
            if done {
                return tokens;
            }
        }
    }

    #[test]
    fn simple_key_is_spliced_before_the_scalar() {
        let tokens = tokens_of("key: value\n");
        assert_eq!(
            tokens,
            vec![
                TokenData::StreamStart {
                    encoding: Encoding::Utf8
                },
                TokenData::BlockMappingStart,
                TokenData::Key,
                TokenData::Scalar {
                    value: String::from("key"),
                    style: ScalarStyle::Plain
                },
                TokenData::Value,
                TokenData::Scalar {
                    value: String::from("value"),
                    style: ScalarStyle::Plain
                },
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_collection_tokens() {
        let tokens = tokens_of("[a, b]\n");
        assert_eq!(
            tokens,
            vec![
                TokenData::StreamStart {
                    encoding: Encoding::Utf8
                },
                TokenData::FlowSequenceStart,
                TokenData::Scalar {
                    value: String::from("a"),
                    style: ScalarStyle::Plain
                },
                TokenData::FlowEntry,
                TokenData::Scalar {
                    value: String::from("b"),
                    style: ScalarStyle::Plain
                },
                TokenData::FlowSequenceEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn tab_cannot_start_a_token() {
        let mut bytes: &[u8] = b"\t- x\n";
        let mut scanner = Scanner::new();
        scanner.set_input_string(&mut bytes);
        // STREAM-START is fine.
        scanner.scan().unwrap();
        let err = scanner.scan().unwrap_err();
        match err {
            ScannerError::Problem {
                problem,
                problem_mark,
                ..
            } => {
                assert_eq!(problem, "found character that cannot start any token");
                assert_eq!(problem_mark.index, 0);
                assert_eq!(problem_mark.line, 0);
                assert_eq!(problem_mark.column, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The scanner stays poisoned until reset.
        assert!(matches!(scanner.scan(), Err(ScannerError::Poisoned)));
    }

    #[test]
    fn overlong_simple_key_is_rejected() {
        // The second key sits at the mapping's own indentation level, so
        // the scanner requires it to be a simple key and must report the
        // overflow instead of silently dropping the candidate.
        let long_key = "x".repeat(1100);
        let input = format!("a: b\n{long_key}: v\n");
        let mut bytes = input.as_bytes();
        let mut scanner = Scanner::new();
        scanner.set_input_string(&mut bytes);
        let mut result = Ok(());
        loop {
            match scanner.scan() {
                Ok(token) => {
                    if matches!(token.data, TokenData::StreamEnd) {
                        break;
                    }
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        let err = result.unwrap_err();
        assert!(err
            .to_string()
            .contains("could not find expected ':'"));
    }

    #[test]
    fn block_scalar_chomping() {
        let tokens = tokens_of("strip: |-\n  text\n\nkeep: |+\n  text\n\n");
        let scalars: Vec<&TokenData> = tokens
            .iter()
            .filter(|t| matches!(t, TokenData::Scalar { style: ScalarStyle::Literal, .. }))
            .collect();
        assert_eq!(
            scalars,
            vec![
                &TokenData::Scalar {
                    value: String::from("text"),
                    style: ScalarStyle::Literal
                },
                &TokenData::Scalar {
                    value: String::from("text\n\n"),
                    style: ScalarStyle::Literal
                },
            ]
        );
    }

    #[test]
    fn folded_scalar_folds_single_breaks() {
        let tokens = tokens_of("folded: >\n  one\n  two\n\n  three\n");
        let folded = tokens.iter().find_map(|t| match t {
            TokenData::Scalar {
                value,
                style: ScalarStyle::Folded,
            } => Some(value.clone()),
            _ => None,
        });
        assert_eq!(folded.as_deref(), Some("one two\nthree\n"));
    }

    #[test]
    fn double_quoted_escapes() {
        let tokens = tokens_of("\"a\\tb\\u263A\\x41\"\n");
        let scalar = tokens.iter().find_map(|t| match t {
            TokenData::Scalar { value, .. } => Some(value.clone()),
            _ => None,
        });
        assert_eq!(scalar.as_deref(), Some("a\tb\u{263a}A"));
    }

    #[test]
    fn single_quote_doubling() {
        let tokens = tokens_of("'it''s'\n");
        let scalar = tokens.iter().find_map(|t| match t {
            TokenData::Scalar { value, .. } => Some(value.clone()),
            _ => None,
        });
        assert_eq!(scalar.as_deref(), Some("it's"));
    }
}
