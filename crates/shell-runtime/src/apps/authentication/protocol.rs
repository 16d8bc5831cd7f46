//! Wire messages of `AuthenticationService`, bincode encoded.

use serde::{Deserialize, Serialize};

/// Interface served by the authentication application.
pub const AUTHENTICATION_INTERFACE: &str = "AuthenticationService";

/// One call from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthRequest {
    /// Ask the user to pick an account. Replies with the account name.
    SelectAccount { id: u64 },
    /// Fetch an OAuth2 access token for `account`. Replies with the token.
    GetOAuth2Token {
        id: u64,
        account: String,
        scopes: Vec<String>,
    },
    /// Drop a token from the cache. No reply.
    ClearOAuth2Token { token: String },
}

impl AuthRequest {
    /// Encode for a channel message.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode a channel message payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Answer to the request with the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthReply {
    /// Request this answers.
    pub id: u64,
    /// The account name or token, or an error message.
    pub result: Result<String, String>,
}

impl AuthReply {
    /// Encode for a channel message.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode a channel message payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
