//! Request encoding for the TIO run endpoint
//!
//! A request is a sequence of named fields. Each field is written as a
//! marker byte (`F` for a string, `V` for a list), the field name, and
//! NUL-separated length/count and values. The stream ends with `R` and is
//! sent as a raw deflate body.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

/// zlib header length stripped from the compressed stream
const ZLIB_HEADER_LEN: usize = 2;
/// Adler-32 trailer length stripped from the compressed stream
const ZLIB_TRAILER_LEN: usize = 4;
/// Terminates the encoded field stream
const RUN_MARKER: u8 = b'R';

/// Value of a request field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Empty strings and lists are omitted from the stream
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(value) => value.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Ordered set of uniquely named request fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    fields: Vec<(String, FieldValue)>,
}

impl ExecutionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing the value of an existing field in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode all fields in order and terminate the stream
    pub fn encode(&self) -> EncodedPayload {
        let mut buf = Vec::new();
        for (name, value) in &self.fields {
            encode_field(&mut buf, name, value);
        }
        buf.push(RUN_MARKER);
        EncodedPayload(buf)
    }
}

fn encode_field(buf: &mut Vec<u8>, name: &str, value: &FieldValue) {
    if value.is_empty() {
        return;
    }

    match value {
        FieldValue::Text(text) => {
            buf.push(b'F');
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.extend_from_slice(text.len().to_string().as_bytes());
            buf.push(0);
            buf.extend_from_slice(text.as_bytes());
            buf.push(0);
        }
        FieldValue::List(items) => {
            buf.push(b'V');
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.extend_from_slice(items.len().to_string().as_bytes());
            buf.push(0);
            for item in items {
                buf.extend_from_slice(item.as_bytes());
                buf.push(0);
            }
        }
    }
}

/// Encoded field stream, including the trailing `R`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(Vec<u8>);

impl EncodedPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Deflate at maximum level and strip the zlib framing
    pub fn compress(self) -> std::io::Result<CompressedPayload> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&self.0)?;
        let zlib = encoder.finish()?;

        // A zlib stream always carries both header and trailer
        let end = zlib.len().saturating_sub(ZLIB_TRAILER_LEN).max(ZLIB_HEADER_LEN);
        Ok(CompressedPayload(zlib[ZLIB_HEADER_LEN..end].to_vec()))
    }
}

/// Raw deflate body sent to the run endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPayload(Vec<u8>);

impl CompressedPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}
