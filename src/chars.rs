//! Character classes shared by the scanner and the emitter.
//!
//! Every predicate accepts `Option<char>` so that lookahead past the end of
//! the stream (`None`) participates in the `..z` variants without a special
//! case at the call sites.

/// Word character: alphanumeric, `_` or `-`.
pub(crate) fn is_alpha(ch: impl Into<Option<char>>) -> bool {
    let Some(ch) = ch.into() else {
        return false;
    };
    ch >= '0' && ch <= '9'
        || ch >= 'A' && ch <= 'Z'
        || ch >= 'a' && ch <= 'z'
        || ch == '_'
        || ch == '-'
}

pub(crate) fn is_digit(ch: impl Into<Option<char>>) -> bool {
    ch.into().map_or(false, |ch| ch.is_ascii_digit())
}

pub(crate) fn as_digit(ch: impl Into<Option<char>>) -> u32 {
    ch.into()
        .and_then(|ch| ch.to_digit(10))
        .expect("not in digit range")
}

pub(crate) fn is_hex(ch: impl Into<Option<char>>) -> bool {
    ch.into().map_or(false, |ch| ch.is_ascii_hexdigit())
}

pub(crate) fn as_hex(ch: impl Into<Option<char>>) -> u32 {
    ch.into()
        .and_then(|ch| ch.to_digit(16))
        .expect("not in digit range (hex)")
}

pub(crate) fn is_ascii(ch: char) -> bool {
    ch.is_ascii()
}

/// Printable per the YAML 1.1 character set. Excludes the BOM and the two
/// permanent non-characters at the end of the BMP.
pub(crate) fn is_printable(ch: char) -> bool {
    match ch {
        '\u{feff}' | '\u{fffe}' | '\u{ffff}' => false,
        '\x0a'
        | '\x20'..='\x7e'
        | '\u{00a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}' => true,
        _ => false,
    }
}

/// Characters the reader accepts from a decoded stream: TAB, LF, CR, NEL
/// and the printable planes. C0/C1 controls, surrogates and non-characters
/// are rejected at decode time.
pub(crate) fn is_allowed_in_stream(ch: char) -> bool {
    ch == '\x09'
        || ch == '\x0a'
        || ch == '\x0d'
        || ch >= '\x20' && ch <= '\x7e'
        || ch == '\u{0085}'
        || ch >= '\u{00a0}' && ch <= '\u{d7ff}'
        || ch >= '\u{e000}' && ch <= '\u{fffd}'
        || ch >= '\u{10000}' && ch <= '\u{10ffff}'
}

pub(crate) fn is_bom(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\u{feff}')
}

pub(crate) fn is_space(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some(' ')
}

pub(crate) fn is_tab(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\t')
}

pub(crate) fn is_blank(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_space(ch) || is_tab(ch)
}

pub(crate) fn is_break(ch: impl Into<Option<char>>) -> bool {
    matches!(
        ch.into(),
        Some('\r' | '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}')
    )
}

/// Break or end of stream.
pub(crate) fn is_breakz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    ch.is_none() || is_break(ch)
}

/// Blank, break or end of stream.
pub(crate) fn is_blankz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_blank(ch) || is_breakz(ch)
}
