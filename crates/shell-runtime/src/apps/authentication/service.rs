//! Authentication loop and per-client sessions.
//!
//! ```text
//! client ══ serve_session ──SessionEvent──▶ AuthenticationLoop ◀── ResultInbox ◀── host
//!              ▲                                │
//!              └──────────── AuthReply ─────────┘
//! ```
//!
//! The loop owns the pending-request table; sessions only shuttle bytes. When
//! a session ends, every call it still has suspended is cancelled.

use super::protocol::{AuthReply, AuthRequest};
use super::provider::{TokenError, TokenProvider};
use super::ACCOUNT_PICKER_ACTION;
use sb_04_pending_requests::{
    ActionDescriptor, Callback, ExternalActionHost, ExternalResult, PendingCall, PendingError,
    PendingRequestTable, Resolution, ResultInbox, Token, TokenKind,
};
use shared_channel::{ChannelEnd, Message};
use shared_types::RequestorIdentity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

pub(crate) type SessionId = u64;

/// Error delivered for `GetOAuth2Token` without scopes.
pub const EMPTY_SCOPES: &str = "scopes cannot be empty";

pub(crate) enum SessionEvent {
    Opened {
        session: SessionId,
        consumer: RequestorIdentity,
        replies: mpsc::UnboundedSender<AuthReply>,
    },
    Request {
        session: SessionId,
        request: AuthRequest,
    },
    Closed {
        session: SessionId,
    },
}

/// Parameters kept for a suspended call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthCall {
    SelectAccount,
    GetOAuth2Token { account: String, scopes: Vec<String> },
}

struct Session {
    consumer: RequestorIdentity,
    replies: mpsc::UnboundedSender<AuthReply>,
}

/// `oauth2:` followed by the scopes, space separated.
pub(crate) fn oauth2_scope(scopes: &[String]) -> String {
    format!("oauth2:{}", scopes.join(" "))
}

/// Account picker prompt naming the consumer, or the shell when anonymous.
pub(crate) fn account_prompt(consumer: &RequestorIdentity) -> String {
    if consumer.is_anonymous() {
        "Select an account to use with the shell".to_string()
    } else {
        format!("Select an account to use with application: {consumer}")
    }
}

fn reply_callback(replies: mpsc::UnboundedSender<AuthReply>, id: u64) -> Callback<String> {
    Box::new(move |result| {
        let reply = AuthReply {
            id,
            result: result.map_err(|e| e.to_string()),
        };
        if replies.send(reply).is_err() {
            trace!(id, "Reply dropped, session gone");
        }
    })
}

pub(crate) struct AuthenticationLoop {
    provider: Arc<dyn TokenProvider>,
    table: PendingRequestTable<AuthCall, String>,
    owners: HashMap<Token, SessionId>,
    sessions: HashMap<SessionId, Session>,
}

impl AuthenticationLoop {
    pub(crate) fn new(provider: Arc<dyn TokenProvider>, host: Arc<dyn ExternalActionHost>) -> Self {
        Self {
            provider,
            table: PendingRequestTable::new(host),
            owners: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub(crate) async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        mut inbox: ResultInbox,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(result) = inbox.recv() => self.handle_result(result),
            }
        }

        let stats = self.table.stats();
        debug!(
            suspended = stats.suspended,
            delivered = stats.delivered,
            rejected = stats.rejected,
            retried = stats.retried,
            "Authentication loop stopped"
        );
        self.table.cancel_all("authentication service stopped");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened {
                session,
                consumer,
                replies,
            } => {
                debug!(session, consumer = %consumer, "Authentication session opened");
                self.sessions.insert(session, Session { consumer, replies });
            }
            SessionEvent::Request { session, request } => self.handle_request(session, request),
            SessionEvent::Closed { session } => self.close_session(session),
        }
    }

    fn handle_request(&mut self, session: SessionId, request: AuthRequest) {
        if let AuthRequest::ClearOAuth2Token { token } = request {
            if let Err(err) = self.provider.clear_token(&token) {
                trace!(error = %err, "Clearing token failed, ignored");
            }
            return;
        }

        let Some(replies) = self.sessions.get(&session).map(|s| s.replies.clone()) else {
            debug!(session, "Request from unknown session dropped");
            return;
        };

        match request {
            AuthRequest::SelectAccount { id } => {
                self.dispatch(session, AuthCall::SelectAccount, reply_callback(replies, id), 0);
            }
            AuthRequest::GetOAuth2Token {
                id,
                account,
                scopes,
            } => {
                let call = AuthCall::GetOAuth2Token { account, scopes };
                self.dispatch(session, call, reply_callback(replies, id), 0);
            }
            AuthRequest::ClearOAuth2Token { .. } => {}
        }
    }

    fn dispatch(
        &mut self,
        session: SessionId,
        call: AuthCall,
        callback: Callback<String>,
        attempt: u32,
    ) {
        match call {
            AuthCall::SelectAccount => self.select_account(session, callback),
            AuthCall::GetOAuth2Token { account, scopes } => {
                self.get_oauth2_token(session, account, scopes, callback, attempt);
            }
        }
    }

    fn select_account(&mut self, session: SessionId, callback: Callback<String>) {
        let Some(consumer) = self.sessions.get(&session).map(|s| s.consumer.clone()) else {
            callback(Err(PendingError::Cancelled("client disconnected".to_string())));
            return;
        };

        let action = ActionDescriptor::new(ACCOUNT_PICKER_ACTION).with_message(account_prompt(&consumer));
        let call = PendingCall::deliver(AuthCall::SelectAccount, callback, |data| {
            String::from_utf8(data).map_err(|e| PendingError::Failed(e.to_string()))
        });
        let token = self.table.suspend(TokenKind::ExpectResult, call, action);
        self.owners.insert(token, session);
    }

    fn get_oauth2_token(
        &mut self,
        session: SessionId,
        account: String,
        scopes: Vec<String>,
        callback: Callback<String>,
        attempt: u32,
    ) {
        if scopes.is_empty() {
            callback(Err(PendingError::Failed(EMPTY_SCOPES.to_string())));
            return;
        }

        match self.provider.get_token(&account, &oauth2_scope(&scopes)) {
            Ok(token) => callback(Ok(token)),
            Err(TokenError::Failed(reason)) => callback(Err(PendingError::Failed(reason))),
            Err(TokenError::Recoverable(action)) => {
                if !self.table.retry_allowed(attempt) {
                    warn!(
                        account = %account,
                        attempts = attempt,
                        "Authorization still required after retry"
                    );
                    callback(Err(PendingError::RetryExhausted { attempts: attempt }));
                    return;
                }
                let call = PendingCall::retry_original(
                    AuthCall::GetOAuth2Token { account, scopes },
                    callback,
                )
                .with_attempt(attempt);
                let token = self.table.suspend(TokenKind::ExpectResult, call, action);
                self.owners.insert(token, session);
            }
        }
    }

    fn handle_result(&mut self, result: ExternalResult) {
        let owner = self.owners.remove(&result.token);
        if let Resolution::Retry(retry) = self.table.resolve_result(result) {
            match owner.filter(|session| self.sessions.contains_key(session)) {
                Some(session) => {
                    debug!(token = %retry.token, attempt = retry.attempt, "Re-issuing original call");
                    self.dispatch(session, retry.params, retry.callback, retry.attempt);
                }
                None => (retry.callback)(Err(PendingError::Cancelled(
                    "client disconnected".to_string(),
                ))),
            }
        }
    }

    fn close_session(&mut self, session: SessionId) {
        self.sessions.remove(&session);
        let orphaned: Vec<Token> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == session)
            .map(|(token, _)| *token)
            .collect();
        for token in &orphaned {
            self.owners.remove(token);
            self.table.cancel(token, "client disconnected");
        }
        debug!(session, cancelled = orphaned.len(), "Authentication session closed");
    }
}

/// Shuttle one client's requests to the loop and its replies back.
pub(crate) async fn serve_session(
    session: SessionId,
    mut endpoint: ChannelEnd,
    consumer: RequestorIdentity,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let (replies_tx, mut replies) = mpsc::unbounded_channel();
    let opened = SessionEvent::Opened {
        session,
        consumer,
        replies: replies_tx,
    };
    if events.send(opened).is_err() {
        endpoint.close();
        return;
    }

    loop {
        tokio::select! {
            message = endpoint.read() => {
                let Some(message) = message else { break };
                match AuthRequest::decode(&message.payload) {
                    Ok(request) => {
                        if events.send(SessionEvent::Request { session, request }).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(session, error = %err, "Malformed authentication request, closing");
                        break;
                    }
                }
            }
            Some(reply) = replies.recv() => {
                let bytes = match reply.encode() {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(session, error = %err, "Failed to encode reply");
                        break;
                    }
                };
                if endpoint.write(Message::new(bytes)).is_err() {
                    break;
                }
            }
        }
    }

    // Ignored if the loop is already gone.
    let _ = events.send(SessionEvent::Closed { session });
    endpoint.close();
}
