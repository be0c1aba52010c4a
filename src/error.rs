/// The pointer position: zero-based byte index, line and column.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub struct Mark {
    /// The position index.
    pub index: u64,
    /// The position line.
    pub line: u64,
    /// The position column.
    pub column: u64,
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Humans count from one.
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

fn in_context(context: &str, mark: Mark) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(", in {context} at {mark}")
    }
}

/// An ill-formed byte sequence or a character outside the YAML character
/// set.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("{problem} at byte {offset}")]
    Invalid {
        problem: &'static str,
        offset: usize,
        value: u32,
    },
    #[error("control characters are not allowed at byte {offset} (value {value:#x})")]
    Forbidden { offset: usize, value: u32 },
}

/// A failure of the input source or of the decoding layer on top of it.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decoder(#[from] DecoderError),
    #[error("input is too long at byte {offset}")]
    TooLong { offset: usize },
}

/// A token-level syntax error.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{problem} at {problem_mark}{}", in_context(context, *context_mark))]
    Problem {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        problem_mark: Mark,
    },
    #[error("scanner is poisoned by an earlier error; reset it before scanning again")]
    Poisoned,
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// A grammar error above the token stream.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("no more tokens")]
    UnexpectedEof,
    #[error("{problem} at {mark}")]
    Problem { problem: &'static str, mark: Mark },
    #[error("{problem} at {mark}{}", in_context(context, *context_mark))]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error("parser is poisoned by an earlier error; reset it before parsing again")]
    Poisoned,
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

/// A semantic error in the layer that materializes event streams into
/// documents. The composer itself lives outside this crate; the type
/// completes the error taxonomy of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("{problem} at {mark}")]
    Problem { problem: &'static str, mark: Mark },
    #[error("{problem} at {mark}{}", in_context(context, *context_mark))]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Parser(#[from] ParserError),
}

/// A failure of the output sink.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A failure of a tag resolver callback.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("{0}")]
    Problem(String),
}

/// An invalid event sequence or an un-emittable value.
#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("{0}")]
    Problem(&'static str),
    #[error("emitter is poisoned by an earlier error; reset it before emitting again")]
    Poisoned,
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

/// The emit-side twin of [`ComposerError`], for the layer that serializes
/// document graphs into event streams. Lives outside this crate.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("{0}")]
    Problem(&'static str),
    #[error(transparent)]
    Emitter(#[from] EmitterError),
}

/// Any error the pipeline can produce, tagged with the component that
/// raised it. `Display` renders `<kind>: <problem> at line L, column C`,
/// with the surrounding context appended when one was recorded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reader: {0}")]
    Reader(#[from] ReaderError),
    #[error("decoder: {0}")]
    Decoder(#[from] DecoderError),
    #[error("scanner: {0}")]
    Scanner(#[from] ScannerError),
    #[error("parser: {0}")]
    Parser(#[from] ParserError),
    #[error("composer: {0}")]
    Composer(#[from] ComposerError),
    #[error("writer: {0}")]
    Writer(#[from] WriterError),
    #[error("emitter: {0}")]
    Emitter(#[from] EmitterError),
    #[error("serializer: {0}")]
    Serializer(#[from] SerializerError),
    #[error("resolver: {0}")]
    Resolver(#[from] ResolverError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_with_context() {
        let err = ScannerError::Problem {
            context: "while scanning a simple key",
            context_mark: Mark {
                index: 0,
                line: 0,
                column: 0,
            },
            problem: "could not find expected ':'",
            problem_mark: Mark {
                index: 10,
                line: 1,
                column: 3,
            },
        };
        assert_eq!(
            err.to_string(),
            "could not find expected ':' at line 2, column 4, \
             in while scanning a simple key at line 1, column 1"
        );
        let flat = Error::from(err).to_string();
        assert!(flat.starts_with("scanner: "));
    }

    #[test]
    fn render_without_context() {
        let err = ParserError::Problem {
            problem: "did not find expected <stream-start>",
            mark: Mark::default(),
        };
        assert_eq!(
            err.to_string(),
            "did not find expected <stream-start> at line 1, column 1"
        );
    }
}
