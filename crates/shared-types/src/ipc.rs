//! # Directory Protocol
//!
//! The only message a directory channel carries: a request to bind one
//! interface to the endpoint attached alongside it. Encoded with bincode.

use crate::errors::ProtocolError;
use crate::entities::InterfaceName;
use serde::{Deserialize, Serialize};

/// Current version of the directory protocol.
pub const DIRECTORY_PROTOCOL_VERSION: u16 = 1;

/// Request sent over a directory channel.
///
/// The endpoint to bind travels in the same message as its only attached
/// endpoint, never inside the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryRequest {
    /// Bind `interface` to the attached endpoint.
    ConnectToService {
        /// Protocol version of the sender.
        version: u16,
        /// The interface being looked up.
        interface: InterfaceName,
    },
}

impl DirectoryRequest {
    /// Build a lookup request for the current protocol version.
    pub fn connect_to_service(interface: InterfaceName) -> Self {
        Self::ConnectToService {
            version: DIRECTORY_PROTOCOL_VERSION,
            interface,
        }
    }

    /// Encode as bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Decode from bytes, rejecting unknown protocol versions.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let request: Self =
            bincode::deserialize(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let Self::ConnectToService { version, .. } = &request;
        if *version != DIRECTORY_PROTOCOL_VERSION {
            return Err(ProtocolError::Malformed(format!(
                "unsupported protocol version {version}"
            )));
        }
        Ok(request)
    }

    /// The interface this request names.
    #[must_use]
    pub fn interface(&self) -> &InterfaceName {
        match self {
            Self::ConnectToService { interface, .. } => interface,
        }
    }
}
