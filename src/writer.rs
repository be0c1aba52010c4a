use log::debug;

use crate::error::WriterError;
use crate::{Emitter, Encoding};

impl Emitter<'_> {
    /// Flush the accumulated characters to the output.
    ///
    /// Characters are encoded to the output encoding and handed to the
    /// sink as one contiguous span. A UTF-16 stream starts with the BOM
    /// that [`Emitter::emit`] staged into the character buffer.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        assert!(self.sink.is_some(), "output sink is not set");
        assert_ne!(self.encoding, Encoding::Any, "output encoding is not set");

        if self.buffer.is_empty() {
            return Ok(());
        }

        if self.encoding == Encoding::Utf8 {
            let to_emit = self.buffer.as_bytes();
            debug!("flushing {} bytes", to_emit.len());
            self.sink
                .as_mut()
                .expect("output sink is not set")
                .write_all(to_emit)?;
            self.buffer.clear();
            return Ok(());
        }

        let big_endian = match self.encoding {
            Encoding::Any | Encoding::Utf8 => unreachable!("unhandled encoding"),
            Encoding::Utf16Le => false,
            Encoding::Utf16Be => true,
        };

        for unit in self.buffer.encode_utf16() {
            let bytes = if big_endian {
                unit.to_be_bytes()
            } else {
                unit.to_le_bytes()
            };
            self.raw_buffer.extend(bytes);
        }

        debug!("flushing {} bytes", self.raw_buffer.len());
        self.sink
            .as_mut()
            .expect("output sink is not set")
            .write_all(&self.raw_buffer)?;
        self.buffer.clear();
        self.raw_buffer.clear();
        Ok(())
    }
}
