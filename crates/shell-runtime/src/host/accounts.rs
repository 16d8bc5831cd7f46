//! In-memory account store standing in for the platform's.
//!
//! Accounts listed as needing consent answer token requests with a
//! [`CONSENT_ACTION`] until [`LocalAccounts::approve`] records the user's
//! approval for that account and scope.

use crate::apps::authentication::{TokenError, TokenProvider, CONSENT_ACTION};
use parking_lot::RwLock;
use sb_04_pending_requests::ActionDescriptor;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct AccountState {
    accounts: Vec<String>,
    needs_consent: HashSet<String>,
    approved: HashSet<(String, String)>,
    issued: HashMap<String, (String, String)>,
}

/// Accounts, consents and issued tokens.
#[derive(Debug, Default)]
pub struct LocalAccounts {
    state: RwLock<AccountState>,
}

impl LocalAccounts {
    /// Store with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account whose tokens are issued without asking.
    #[must_use]
    pub fn with_account(self, account: impl Into<String>) -> Self {
        self.state.write().accounts.push(account.into());
        self
    }

    /// Add an account whose tokens need the user's approval per scope.
    #[must_use]
    pub fn with_consent_account(self, account: impl Into<String>) -> Self {
        let account = account.into();
        {
            let mut state = self.state.write();
            state.needs_consent.insert(account.clone());
            state.accounts.push(account);
        }
        self
    }

    /// The account offered by the account picker.
    #[must_use]
    pub fn default_account(&self) -> Option<String> {
        self.state.read().accounts.first().cloned()
    }

    /// Record that the user approved `scope` for `account`.
    pub fn approve(&self, account: &str, scope: &str) {
        debug!(account, scope, "Token scope approved");
        self.state
            .write()
            .approved
            .insert((account.to_string(), scope.to_string()));
    }

    /// Number of tokens issued and not cleared.
    #[must_use]
    pub fn issued_tokens(&self) -> usize {
        self.state.read().issued.len()
    }
}

/// Payload of a [`CONSENT_ACTION`]: the bincode `(account, scope)` pair.
pub fn consent_payload(account: &str, scope: &str) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(&(account, scope))
}

impl TokenProvider for LocalAccounts {
    fn get_token(&self, account: &str, scope: &str) -> Result<String, TokenError> {
        let mut state = self.state.write();
        if !state.accounts.iter().any(|known| known == account) {
            return Err(TokenError::Failed(format!("Unknown account: {account}")));
        }

        let key = (account.to_string(), scope.to_string());
        if state.needs_consent.contains(account) && !state.approved.contains(&key) {
            let payload = consent_payload(account, scope).map_err(|e| TokenError::Failed(e.to_string()))?;
            return Err(TokenError::Recoverable(
                ActionDescriptor::new(CONSENT_ACTION)
                    .with_message(format!("Allow {scope} for {account}"))
                    .with_payload(payload),
            ));
        }

        let token = format!("ya29.{}", Uuid::new_v4().simple());
        state.issued.insert(token.clone(), key);
        Ok(token)
    }

    fn clear_token(&self, token: &str) -> Result<(), TokenError> {
        match self.state.write().issued.remove(token) {
            Some(_) => Ok(()),
            None => Err(TokenError::Failed(format!("Unknown token: {token}"))),
        }
    }
}
