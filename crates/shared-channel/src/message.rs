//! # Channel Messages
//!
//! A message is an opaque payload plus any endpoints being transferred with
//! it. The channel never looks inside the payload.

use crate::endpoint::ChannelEnd;
use bytes::Bytes;
use std::fmt;

/// A single message on a channel.
pub struct Message {
    /// Opaque payload bytes.
    pub payload: Bytes,

    /// Endpoints moved to the reader together with the payload.
    pub endpoints: Vec<ChannelEnd>,
}

impl Message {
    /// A message with a payload and no endpoints.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            endpoints: Vec::new(),
        }
    }

    /// A message carrying endpoints alongside the payload.
    pub fn with_endpoints(payload: impl Into<Bytes>, endpoints: Vec<ChannelEnd>) -> Self {
        Self {
            payload: payload.into(),
            endpoints,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Take ownership of the attached endpoints.
    pub fn take_endpoints(&mut self) -> Vec<ChannelEnd> {
        std::mem::take(&mut self.endpoints)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("payload_len", &self.payload.len())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl From<&'static str> for Message {
    fn from(value: &'static str) -> Self {
        Self::new(Bytes::from_static(value.as_bytes()))
    }
}

impl From<Vec<u8>> for Message {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}
