//! Pending Request Table
//!
//! Maps tokens to suspended calls for one application loop.
//!
//! Flow:
//! 1. A service call needs the user; it calls `suspend()` with its original
//!    parameters and callback and gets a fresh token
//! 2. The table asks the host to run the external action under that token
//! 3. The host's result reaches the owning loop, which calls `resolve()`
//! 4. The entry is removed before anything else happens, so the callback runs
//!    at most once no matter how often the host reports

use crate::errors::PendingError;
use crate::inbox::ExternalResult;
use crate::ports::{ActionDescriptor, ExternalActionHost, ExternalOutcome};
use crate::token::{Token, TokenAllocator, TokenKind};
use broker_telemetry::{metric_inc, EXTERNAL_RESULTS, PENDING_REQUESTS};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Retries a `RetryOriginal` call gets before a further authorization
/// failure is terminal.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Receives the final outcome of a suspended call.
pub type Callback<R> = Box<dyn FnOnce(Result<R, PendingError>) + Send>;

/// What a granted external action turns into.
pub enum OnGrant<R> {
    /// Map the host's result data into the call's result and deliver it.
    Deliver(Box<dyn FnOnce(Vec<u8>) -> Result<R, PendingError> + Send>),
    /// Hand the original parameters back so the owner re-issues the call.
    RetryOriginal,
}

impl<R> fmt::Debug for OnGrant<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliver(_) => f.write_str("Deliver"),
            Self::RetryOriginal => f.write_str("RetryOriginal"),
        }
    }
}

/// A call being suspended.
pub struct PendingCall<P, R> {
    /// Parameters of the original call, kept for a retry.
    pub params: P,
    /// Receives the outcome.
    pub callback: Callback<R>,
    /// What to do on a grant.
    pub on_grant: OnGrant<R>,
    /// Retries already spent on this call.
    pub attempt: u32,
}

impl<P, R> PendingCall<P, R> {
    /// Deliver `map(data)` to the callback on a grant.
    pub fn deliver<F>(params: P, callback: Callback<R>, map: F) -> Self
    where
        F: FnOnce(Vec<u8>) -> Result<R, PendingError> + Send + 'static,
    {
        Self {
            params,
            callback,
            on_grant: OnGrant::Deliver(Box::new(map)),
            attempt: 0,
        }
    }

    /// Re-issue the original call on a grant.
    pub fn retry_original(params: P, callback: Callback<R>) -> Self {
        Self {
            params,
            callback,
            on_grant: OnGrant::RetryOriginal,
            attempt: 0,
        }
    }

    /// Record retries already spent.
    #[must_use]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }
}

/// A granted `RetryOriginal` call, handed back to its owner.
pub struct RetryRequest<P, R> {
    /// The token that was resolved. Never reused.
    pub token: Token,
    /// The original parameters, untouched.
    pub params: P,
    /// The original callback, not yet invoked.
    pub callback: Callback<R>,
    /// Retries spent including this one.
    pub attempt: u32,
}

impl<P: fmt::Debug, R> fmt::Debug for RetryRequest<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRequest")
            .field("token", &self.token)
            .field("params", &self.params)
            .field("attempt", &self.attempt)
            .finish()
    }
}

/// What `resolve` did.
pub enum Resolution<P, R> {
    /// The callback received a result.
    Delivered,
    /// The callback received a denial or failure.
    Rejected,
    /// The owner must re-issue the original call.
    Retry(RetryRequest<P, R>),
    /// No entry for the token; nothing happened.
    Unknown,
}

impl<P, R> Resolution<P, R> {
    /// Whether the resolution was a no-op.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl<P: fmt::Debug, R> fmt::Debug for Resolution<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("Delivered"),
            Self::Rejected => f.write_str("Rejected"),
            Self::Retry(retry) => f.debug_tuple("Retry").field(retry).finish(),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Counters for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStats {
    /// Calls suspended
    pub suspended: u64,
    /// Results delivered to callbacks
    pub delivered: u64,
    /// Denials and failures delivered to callbacks
    pub rejected: u64,
    /// Calls handed back for retry
    pub retried: u64,
    /// Calls cancelled
    pub cancelled: u64,
    /// Resolutions for tokens with no entry
    pub unknown: u64,
}

struct PendingEntry<P, R> {
    call: PendingCall<P, R>,
    action: String,
    created_at: Instant,
}

/// Token → suspended call, owned by one application loop.
pub struct PendingRequestTable<P, R> {
    entries: HashMap<Token, PendingEntry<P, R>>,
    allocator: TokenAllocator,
    host: Arc<dyn ExternalActionHost>,
    max_retries: u32,
    stats: PendingStats,
}

impl<P, R> PendingRequestTable<P, R> {
    /// Create a table that starts external actions on `host`.
    pub fn new(host: Arc<dyn ExternalActionHost>) -> Self {
        Self {
            entries: HashMap::new(),
            allocator: TokenAllocator::default(),
            host,
            max_retries: DEFAULT_MAX_RETRIES,
            stats: PendingStats::default(),
        }
    }

    /// Override the retry budget for `RetryOriginal` calls.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether a call that has spent `attempt` retries may be suspended again.
    #[must_use]
    pub fn retry_allowed(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Suspend `call` and start `action` on the host.
    ///
    /// Returns the fresh token the host will report back with. Request codes
    /// wrap after `u32::MAX` but never collide with a call still in the table.
    pub fn suspend(
        &mut self,
        kind: TokenKind,
        call: PendingCall<P, R>,
        action: ActionDescriptor,
    ) -> Token {
        let entries = &self.entries;
        let token = self
            .allocator
            .allocate(kind, |candidate| entries.contains_key(candidate));

        debug!(
            token = %token,
            action = %action.action,
            attempt = call.attempt,
            "Suspending call on external action"
        );

        self.entries.insert(
            token,
            PendingEntry {
                call,
                action: action.action.clone(),
                created_at: Instant::now(),
            },
        );
        self.stats.suspended += 1;
        PENDING_REQUESTS.inc();

        self.host.request_external_action(&token, action);
        token
    }

    /// Apply the host's outcome for `token`.
    ///
    /// The entry is removed first; a second outcome for the same token is
    /// `Unknown` and touches nothing.
    pub fn resolve(&mut self, token: &Token, outcome: ExternalOutcome) -> Resolution<P, R> {
        let Some(entry) = self.entries.remove(token) else {
            self.stats.unknown += 1;
            metric_inc!(EXTERNAL_RESULTS, &["unknown"]);
            debug!(token = %token, "Result for unknown or resolved token ignored");
            return Resolution::Unknown;
        };
        PENDING_REQUESTS.dec();
        metric_inc!(EXTERNAL_RESULTS, &[outcome.label()]);

        let PendingEntry {
            call,
            action,
            created_at,
        } = entry;
        debug!(
            token = %token,
            action = %action,
            outcome = outcome.label(),
            waited_ms = created_at.elapsed().as_millis() as u64,
            "Resolving suspended call"
        );

        let PendingCall {
            params,
            callback,
            on_grant,
            attempt,
        } = call;

        match outcome {
            ExternalOutcome::Granted(data) => match on_grant {
                OnGrant::Deliver(map) => {
                    let result = map(data);
                    if result.is_ok() {
                        self.stats.delivered += 1;
                    } else {
                        self.stats.rejected += 1;
                    }
                    callback(result);
                    Resolution::Delivered
                }
                OnGrant::RetryOriginal => {
                    self.stats.retried += 1;
                    Resolution::Retry(RetryRequest {
                        token: *token,
                        params,
                        callback,
                        attempt: attempt + 1,
                    })
                }
            },
            ExternalOutcome::Denied => {
                self.stats.rejected += 1;
                callback(Err(PendingError::user_denied()));
                Resolution::Rejected
            }
            ExternalOutcome::Failed(reason) => {
                self.stats.rejected += 1;
                callback(Err(PendingError::Failed(reason)));
                Resolution::Rejected
            }
        }
    }

    /// Resolve a result taken from a `ResultInbox`.
    pub fn resolve_result(&mut self, result: ExternalResult) -> Resolution<P, R> {
        self.resolve(&result.token, result.outcome)
    }

    /// Cancel one suspended call. Returns `false` if the token has no entry.
    pub fn cancel(&mut self, token: &Token, reason: &str) -> bool {
        let Some(entry) = self.entries.remove(token) else {
            return false;
        };
        PENDING_REQUESTS.dec();
        metric_inc!(EXTERNAL_RESULTS, &["cancelled"]);
        self.stats.cancelled += 1;
        debug!(token = %token, action = %entry.action, reason, "Cancelling suspended call");
        (entry.call.callback)(Err(PendingError::Cancelled(reason.to_string())));
        true
    }

    /// Cancel every suspended call, e.g. when the client disconnects.
    pub fn cancel_all(&mut self, reason: &str) -> usize {
        let tokens: Vec<Token> = self.entries.keys().copied().collect();
        let count = tokens.len();
        for token in tokens {
            self.cancel(&token, reason);
        }
        if count > 0 {
            warn!(count, reason, "Cancelled all suspended calls");
        }
        count
    }

    /// Whether `token` has a suspended call.
    #[must_use]
    pub fn contains(&self, token: &Token) -> bool {
        self.entries.contains_key(token)
    }

    /// Number of suspended calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is suspended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> PendingStats {
        self.stats
    }
}

impl<P, R> Drop for PendingRequestTable<P, R> {
    fn drop(&mut self) {
        self.cancel_all("owner shut down");
    }
}

impl<P, R> fmt::Debug for PendingRequestTable<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequestTable")
            .field("pending", &self.entries.len())
            .field("max_retries", &self.max_retries)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        actions: Mutex<Vec<(Token, ActionDescriptor)>>,
    }

    impl ExternalActionHost for Recorder {
        fn request_external_action(&self, token: &Token, action: ActionDescriptor) {
            self.actions.lock().unwrap().push((*token, action));
        }
    }

    type Outcomes = Arc<Mutex<Vec<Result<String, PendingError>>>>;

    fn collecting() -> (Outcomes, impl Fn() -> Callback<String>) {
        let outcomes: Outcomes = Arc::default();
        let sink = outcomes.clone();
        let make = move || -> Callback<String> {
            let sink = sink.clone();
            Box::new(move |result| sink.lock().unwrap().push(result))
        };
        (outcomes, make)
    }

    fn table() -> (PendingRequestTable<(String, Vec<String>), String>, Arc<Recorder>) {
        let host = Arc::new(Recorder::default());
        (PendingRequestTable::new(host.clone()), host)
    }

    fn utf8(data: Vec<u8>) -> Result<String, PendingError> {
        String::from_utf8(data).map_err(|e| PendingError::Failed(e.to_string()))
    }

    #[test]
    fn test_suspend_requests_external_action() {
        let (mut table, host) = table();
        let (_outcomes, callback) = collecting();

        let token = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("account-picker").with_message("Select an account"),
        );

        assert!(table.contains(&token));
        let actions = host.actions.lock().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].0, token);
        assert_eq!(actions[0].1.action, "account-picker");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();

        let token = table.suspend(
            TokenKind::FireAndForget,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("pick"),
        );

        let first = table.resolve(&token, ExternalOutcome::Granted(b"alice".to_vec()));
        assert!(matches!(first, Resolution::Delivered));
        for _ in 0..3 {
            assert!(table
                .resolve(&token, ExternalOutcome::Granted(b"mallory".to_vec()))
                .is_unknown());
            assert!(table.resolve(&token, ExternalOutcome::Denied).is_unknown());
        }

        assert_eq!(*outcomes.lock().unwrap(), vec![Ok("alice".to_string())]);
        assert!(table.is_empty());
        assert_eq!(table.stats().unknown, 6);
    }

    #[test]
    fn test_denial_delivers_terminal_error() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();

        let token = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::retry_original(("bob".into(), vec!["email".into()]), callback()),
            ActionDescriptor::new("consent"),
        );
        assert!(matches!(
            table.resolve(&token, ExternalOutcome::Denied),
            Resolution::Rejected
        ));
        assert_eq!(
            *outcomes.lock().unwrap(),
            vec![Err(PendingError::Denied("User denied the request.".into()))]
        );
    }

    #[test]
    fn test_grant_hands_back_identical_params() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();
        let params = ("bob@example.com".to_string(), vec!["a".to_string(), "b".to_string()]);

        let token = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::retry_original(params.clone(), callback()),
            ActionDescriptor::new("consent"),
        );

        match table.resolve(&token, ExternalOutcome::Granted(vec![])) {
            Resolution::Retry(retry) => {
                assert_eq!(retry.params, params);
                assert_eq!(retry.token, token);
                assert_eq!(retry.attempt, 1);
                assert!(!table.retry_allowed(retry.attempt));
                (retry.callback)(Ok("token".into()));
            }
            other => panic!("expected retry, got {other:?}"),
        }
        assert_eq!(*outcomes.lock().unwrap(), vec![Ok("token".to_string())]);
        assert_eq!(table.stats().retried, 1);
    }

    #[test]
    fn test_failed_map_is_rejection() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();
        let token = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("pick"),
        );
        table.resolve(&token, ExternalOutcome::Granted(vec![0xff]));
        assert!(outcomes.lock().unwrap()[0].is_err());
        assert_eq!(table.stats().rejected, 1);
    }

    #[test]
    fn test_cancel_all_delivers_once_each() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();
        let tokens: Vec<_> = (0..3)
            .map(|_| {
                table.suspend(
                    TokenKind::ExpectResult,
                    PendingCall::deliver((String::new(), vec![]), callback(), utf8),
                    ActionDescriptor::new("pick"),
                )
            })
            .collect();

        assert_eq!(table.cancel_all("client disconnected"), 3);
        assert!(table.is_empty());
        for token in &tokens {
            assert!(table.resolve(token, ExternalOutcome::Denied).is_unknown());
            assert!(!table.cancel(token, "again"));
        }
        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| *o == Err(PendingError::Cancelled("client disconnected".into()))));
    }

    #[test]
    fn test_drop_cancels_outstanding() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();
        table.suspend(
            TokenKind::FireAndForget,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("pick"),
        );
        drop(table);
        assert_eq!(outcomes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fresh_tokens_never_reuse_live_codes() {
        let (mut table, _host) = table();
        let (_outcomes, callback) = collecting();
        let a = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("pick"),
        );
        let b = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("pick"),
        );
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_wrapped_codes_skip_live_calls() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();
        table.allocator = TokenAllocator::starting_after(u32::MAX - 1);
        let suspend = |table: &mut PendingRequestTable<_, _>| {
            table.suspend(
                TokenKind::ExpectResult,
                PendingCall::deliver((String::new(), vec![]), callback(), utf8),
                ActionDescriptor::new("pick"),
            )
        };

        let last = suspend(&mut table);
        assert_eq!(last, Token::RequestCode(u32::MAX));
        let first = suspend(&mut table);
        assert_eq!(first, Token::RequestCode(1));

        // Wrap again while code 1 is still suspended.
        table.allocator = TokenAllocator::starting_after(u32::MAX);
        assert_eq!(suspend(&mut table), Token::RequestCode(2));

        table.resolve(&first, ExternalOutcome::Granted(b"dave".to_vec()));
        table.allocator = TokenAllocator::starting_after(u32::MAX);
        assert_eq!(suspend(&mut table), Token::RequestCode(1));
        assert_eq!(*outcomes.lock().unwrap(), vec![Ok("dave".to_string())]);
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_from_inbox() {
        let (mut table, _host) = table();
        let (outcomes, callback) = collecting();
        let (sender, mut inbox) = crate::inbox::result_channel();

        let token = table.suspend(
            TokenKind::ExpectResult,
            PendingCall::deliver((String::new(), vec![]), callback(), utf8),
            ActionDescriptor::new("pick"),
        );

        std::thread::spawn(move || {
            sender.deliver_external_action_result(token, ExternalOutcome::Granted(b"carol".to_vec()));
            sender.deliver_external_action_result(token, ExternalOutcome::Granted(b"carol".to_vec()));
        });

        let mut resolutions = Vec::new();
        while let Some(result) = inbox.recv().await {
            resolutions.push(table.resolve_result(result).is_unknown());
        }
        assert_eq!(resolutions, vec![false, true]);
        assert_eq!(*outcomes.lock().unwrap(), vec![Ok("carol".to_string())]);
    }
}
