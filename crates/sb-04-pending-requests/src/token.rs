//! Correlation tokens.
//!
//! Two separate namespaces: fire-and-forget receivers are identified by a
//! random UUID, expect-a-result requests by a small positive request code.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which namespace a token is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// The host may report any number of times; only the first counts.
    FireAndForget,
    /// The host reports exactly one result, success or denial.
    ExpectResult,
}

/// Identifies one suspended call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Fire-and-forget receiver.
    Receiver(Uuid),
    /// Expect-a-result request code, always ≥ 1.
    ///
    /// Codes wrap back to 1 after `u32::MAX` and skip codes that are still
    /// suspended, so a code is only reissued once its earlier call has
    /// resolved. One table holds at most `u32::MAX` expect-a-result calls.
    RequestCode(u32),
}

impl Token {
    /// The namespace this token belongs to.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Receiver(_) => TokenKind::FireAndForget,
            Self::RequestCode(_) => TokenKind::ExpectResult,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receiver(uuid) => write!(f, "{uuid}"),
            Self::RequestCode(code) => write!(f, "{code}"),
        }
    }
}

/// Hands out fresh tokens.
///
/// Request codes count up from 1, skip codes still in use, and wrap back to 1
/// after `u32::MAX`.
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenAllocator {
    last_request_code: u32,
}

impl TokenAllocator {
    #[cfg(test)]
    pub(crate) fn starting_after(last_request_code: u32) -> Self {
        Self { last_request_code }
    }

    pub(crate) fn allocate(&mut self, kind: TokenKind, in_use: impl Fn(&Token) -> bool) -> Token {
        match kind {
            TokenKind::FireAndForget => loop {
                let token = Token::Receiver(Uuid::new_v4());
                if !in_use(&token) {
                    return token;
                }
            },
            TokenKind::ExpectResult => loop {
                self.last_request_code = self.last_request_code.checked_add(1).unwrap_or(1);
                let token = Token::RequestCode(self.last_request_code);
                if !in_use(&token) {
                    return token;
                }
            },
        }
    }
}
