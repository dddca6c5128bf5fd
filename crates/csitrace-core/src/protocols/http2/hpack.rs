use std::fmt;

use super::error::Http2Error;
use super::parser::StreamId;

/// One decoded header field, in block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Value of the first field called `name`.
pub fn find_field<'a>(fields: &'a [HeaderField], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|field| field.name == name)
        .map(|field| field.value.as_str())
}

/// Whether any field matches `name` and `value` exactly.
pub fn has_field(fields: &[HeaderField], name: &str, value: &str) -> bool {
    fields
        .iter()
        .any(|field| field.name == name && field.value == value)
}

/// HPACK decoder for one direction of one connection.
///
/// The dynamic table carries over from block to block, so the decoder must
/// see every header block of its direction exactly once, in byte order.
pub struct HeaderBlockDecoder {
    inner: loona_hpack::Decoder<'static>,
    blocks: u64,
}

impl HeaderBlockDecoder {
    pub fn new() -> Self {
        Self {
            inner: loona_hpack::Decoder::new(),
            blocks: 0,
        }
    }

    /// Decode one complete header block (HEADERS plus any CONTINUATIONs).
    ///
    /// # Errors
    /// Returns `Http2Error::Hpack` when the block is malformed; the dynamic
    /// table is unusable afterwards.
    pub fn decode(
        &mut self,
        stream_id: StreamId,
        block: &[u8],
    ) -> Result<Vec<HeaderField>, Http2Error> {
        let decoded = self.inner.decode(block).map_err(|e| Http2Error::Hpack {
            stream_id,
            message: format!("{e:?}"),
        })?;
        self.blocks += 1;
        Ok(decoded
            .into_iter()
            .map(|(name, value)| HeaderField {
                name: String::from_utf8_lossy(&name).into_owned(),
                value: String::from_utf8_lossy(&value).into_owned(),
            })
            .collect())
    }

    pub fn blocks_decoded(&self) -> u64 {
        self.blocks
    }
}

impl Default for HeaderBlockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeaderBlockDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderBlockDecoder")
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}
