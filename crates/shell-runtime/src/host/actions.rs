//! In-process external action host.
//!
//! Stands in for the platform UI: every action is answered immediately
//! according to a fixed [`ActionDecision`], posting the result to the owning
//! application's inbox.

use super::accounts::LocalAccounts;
use crate::apps::authentication::{ActionHostFactory, ACCOUNT_PICKER_ACTION, CONSENT_ACTION};
use sb_04_pending_requests::{
    ActionDescriptor, ExternalActionHost, ExternalOutcome, ResultSender, Token,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// How the simulated user answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionDecision {
    /// Pick the default account and approve every consent.
    #[default]
    Approve,
    /// Decline everything.
    Deny,
}

impl FromStr for ActionDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "deny" => Ok(Self::Deny),
            other => Err(format!("unknown action decision: {other}")),
        }
    }
}

/// Answers account picker and consent actions from [`LocalAccounts`].
#[derive(Debug)]
pub struct LocalActionHost {
    accounts: Arc<LocalAccounts>,
    results: ResultSender,
    decision: ActionDecision,
}

impl LocalActionHost {
    /// Host posting to `results`.
    pub fn new(accounts: Arc<LocalAccounts>, results: ResultSender, decision: ActionDecision) -> Self {
        Self {
            accounts,
            results,
            decision,
        }
    }

    /// Factory building one host per application instance.
    pub fn factory(accounts: Arc<LocalAccounts>, decision: ActionDecision) -> ActionHostFactory {
        Arc::new(move |results: ResultSender| {
            Arc::new(Self::new(Arc::clone(&accounts), results, decision)) as Arc<dyn ExternalActionHost>
        })
    }

    fn outcome(&self, action: &ActionDescriptor) -> ExternalOutcome {
        if self.decision == ActionDecision::Deny {
            return ExternalOutcome::Denied;
        }
        match action.action.as_str() {
            ACCOUNT_PICKER_ACTION => match self.accounts.default_account() {
                Some(account) => ExternalOutcome::Granted(account.into_bytes()),
                None => ExternalOutcome::Failed("No accounts available".to_string()),
            },
            CONSENT_ACTION => match bincode::deserialize::<(String, String)>(&action.payload) {
                Ok((account, scope)) => {
                    self.accounts.approve(&account, &scope);
                    ExternalOutcome::Granted(Vec::new())
                }
                Err(err) => ExternalOutcome::Failed(err.to_string()),
            },
            other => ExternalOutcome::Failed(format!("Unsupported action: {other}")),
        }
    }
}

impl ExternalActionHost for LocalActionHost {
    fn request_external_action(&self, token: &Token, action: ActionDescriptor) {
        let outcome = self.outcome(&action);
        info!(
            token = %token,
            action = %action.action,
            message = action.message.as_deref().unwrap_or(""),
            decision = ?self.decision,
            "External action answered"
        );
        self.results.deliver_external_action_result(*token, outcome);
    }
}
