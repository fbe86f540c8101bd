//! Transport decoding of event attributes.
//!
//! The node base64-encodes every attribute value of `block_results`. A
//! [`RawEvent`] is turned into a [`DecodedEvent`] exactly once; the two types
//! are distinct so a decoded value can never be fed through the decoder again.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::rpc::RawEvent;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("attribute {index} of '{event_type}' is not valid base64: {source}")]
    Base64 {
        event_type: String,
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("attribute {index} of '{event_type}' is not valid UTF-8")]
    Utf8 { event_type: String, index: usize },
}

/// An event whose attribute values are plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub kind: String,
    pub attributes: Vec<DecodedAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttribute {
    /// Keys are passed through untouched; only values are interpreted.
    pub key: Option<String>,
    pub value: String,
    pub index: bool,
}

impl DecodedEvent {
    /// Value of the attribute at `position`, if present.
    pub fn value(&self, position: usize) -> Option<&str> {
        self.attributes.get(position).map(|a| a.value.as_str())
    }
}

/// Decodes every attribute value of `raw`. Any failing attribute fails the
/// whole event; a missing value decodes to the empty string.
pub fn decode_event(raw: &RawEvent) -> Result<DecodedEvent, DecodeError> {
    #[cfg(test)]
    DECODED.with(|count| count.set(count.get() + 1));

    let attributes = raw
        .attributes
        .iter()
        .enumerate()
        .map(|(index, attribute)| {
            let value = match attribute.value.as_deref() {
                None | Some("") => String::new(),
                Some(encoded) => decode_value(&raw.kind, index, encoded)?,
            };
            Ok(DecodedAttribute {
                key: attribute.key.clone(),
                value,
                index: attribute.index,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(DecodedEvent {
        kind: raw.kind.clone(),
        attributes,
    })
}

#[cfg(test)]
thread_local! {
    static DECODED: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Number of events decoded so far on the calling thread.
#[cfg(test)]
pub(crate) fn decoded_on_this_thread() -> usize {
    DECODED.with(|count| count.get())
}

fn decode_value(event_type: &str, index: usize, encoded: &str) -> Result<String, DecodeError> {
    let bytes = BASE64.decode(encoded).map_err(|source| DecodeError::Base64 {
        event_type: event_type.to_string(),
        index,
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Utf8 {
        event_type: event_type.to_string(),
        index,
    })
}
