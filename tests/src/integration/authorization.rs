//! # Authorization Flows
//!
//! Calls that detour through the host runtime:
//!
//! 1. **Account selection**: suspended under a request code, delivered on grant
//! 2. **Recoverable authorization**: suspended, re-issued once with the
//!    original parameters, terminal on a second failure
//! 3. **Host threads**: results posted from foreign threads resolve on the
//!    owning loop, duplicates are ignored

#[cfg(test)]
mod tests {
    use super::super::{broker_with, register, sees_disconnect, WAIT};
    use parking_lot::Mutex;
    use sb_02_connection_broker::{ConnectionBroker, LoaderRegistry};
    use sb_04_pending_requests::{
        result_channel, ActionDescriptor, ExternalActionHost, ExternalOutcome, PendingCall,
        PendingError, PendingRequestTable, Resolution, ResultSender, Token, TokenKind, USER_DENIED,
    };
    use shared_channel::{ChannelEnd, Message};
    use shared_types::{ApplicationName, InterfaceName};
    use shell_runtime::apps::authentication::CONSENT_ACTION;
    use shell_runtime::apps::{
        ActionHostFactory, AuthReply, AuthRequest, AuthenticationApp, TokenError, TokenProvider,
        AUTHENTICATION_INTERFACE,
    };
    use shell_runtime::host::{consent_payload, ActionDecision, LocalAccounts, LocalActionHost};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const AUTH: &str = "app:authentication";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Provider that always needs the user, counting how often it was asked.
    #[derive(Default)]
    struct StubbornProvider {
        asked: Mutex<Vec<String>>,
    }

    impl TokenProvider for StubbornProvider {
        fn get_token(&self, account: &str, scope: &str) -> Result<String, TokenError> {
            self.asked.lock().push(scope.to_string());
            let payload = consent_payload(account, scope).unwrap();
            Err(TokenError::Recoverable(
                ActionDescriptor::new(CONSENT_ACTION).with_payload(payload),
            ))
        }

        fn clear_token(&self, _token: &str) -> Result<(), TokenError> {
            Ok(())
        }
    }

    fn auth_registry(
        provider: Arc<dyn TokenProvider>,
        accounts: Arc<LocalAccounts>,
        decision: ActionDecision,
    ) -> LoaderRegistry {
        let registry = LoaderRegistry::new();
        let hosts = LocalActionHost::factory(accounts, decision);
        register(&registry, AUTH, move || {
            AuthenticationApp::new(Arc::clone(&provider), Arc::clone(&hosts))
        });
        registry
    }

    fn local_registry(accounts: Arc<LocalAccounts>, decision: ActionDecision) -> LoaderRegistry {
        auth_registry(Arc::clone(&accounts) as Arc<dyn TokenProvider>, accounts, decision)
    }

    async fn call(end: &mut ChannelEnd, request: AuthRequest) -> AuthReply {
        end.write(Message::new(request.encode().unwrap())).unwrap();
        let message = timeout(WAIT, end.read()).await.unwrap().unwrap();
        AuthReply::decode(&message.payload).unwrap()
    }

    /// The broker must outlive the channel; dropping it stops every instance.
    fn connect(registry: LoaderRegistry, consumer: &str) -> (Arc<ConnectionBroker>, ChannelEnd) {
        let broker = broker_with(registry);
        let end = broker
            .shell(ApplicationName::new(consumer))
            .connect_to_service(
                &ApplicationName::new(AUTH),
                InterfaceName::new(AUTHENTICATION_INTERFACE),
            );
        (broker, end)
    }

    fn token_request(id: u64, account: &str) -> AuthRequest {
        AuthRequest::GetOAuth2Token {
            id,
            account: account.to_string(),
            scopes: vec!["email".to_string(), "profile".to_string()],
        }
    }

    // =============================================================================
    // ACCOUNT SELECTION
    // =============================================================================

    #[tokio::test]
    async fn test_select_account_granted() {
        let accounts = Arc::new(LocalAccounts::new().with_account("first@example.com"));
        let (_broker, mut end) = connect(local_registry(accounts, ActionDecision::Approve), "app:mail");

        let reply = call(&mut end, AuthRequest::SelectAccount { id: 1 }).await;
        assert_eq!(reply.id, 1);
        assert_eq!(reply.result, Ok("first@example.com".to_string()));
    }

    #[tokio::test]
    async fn test_select_account_denied() {
        let accounts = Arc::new(LocalAccounts::new().with_account("first@example.com"));
        let (_broker, mut end) = connect(local_registry(accounts, ActionDecision::Deny), "app:mail");

        let reply = call(&mut end, AuthRequest::SelectAccount { id: 2 }).await;
        assert_eq!(reply.result, Err(USER_DENIED.to_string()));
    }

    // =============================================================================
    // RECOVERABLE AUTHORIZATION
    // =============================================================================

    #[tokio::test]
    async fn test_consent_then_token() {
        let accounts = Arc::new(LocalAccounts::new().with_consent_account("user@example.com"));
        let (_broker, mut end) = connect(
            local_registry(Arc::clone(&accounts), ActionDecision::Approve),
            "app:mail",
        );

        let reply = call(&mut end, token_request(3, "user@example.com")).await;
        let token = reply.result.unwrap();
        assert!(token.starts_with("ya29."));

        // Consent is remembered; the next call needs no detour.
        let again = call(&mut end, token_request(4, "user@example.com")).await;
        assert!(again.result.is_ok());
        assert_eq!(accounts.issued_tokens(), 2);

        end.write(Message::new(
            AuthRequest::ClearOAuth2Token { token }.encode().unwrap(),
        ))
        .unwrap();
        let unknown = call(&mut end, token_request(5, "stranger@example.com")).await;
        assert_eq!(
            unknown.result,
            Err("Unknown account: stranger@example.com".to_string())
        );
        assert_eq!(accounts.issued_tokens(), 1);
    }

    #[tokio::test]
    async fn test_consent_denied() {
        let accounts = Arc::new(LocalAccounts::new().with_consent_account("user@example.com"));
        let (_broker, mut end) = connect(
            local_registry(Arc::clone(&accounts), ActionDecision::Deny),
            "app:mail",
        );

        let reply = call(&mut end, token_request(6, "user@example.com")).await;
        assert_eq!(reply.result, Err(USER_DENIED.to_string()));
        assert_eq!(accounts.issued_tokens(), 0);
    }

    #[tokio::test]
    async fn test_retry_happens_once_with_same_scope() {
        let provider = Arc::new(StubbornProvider::default());
        let accounts = Arc::new(LocalAccounts::new());
        let (_broker, mut end) = connect(
            auth_registry(
                Arc::clone(&provider) as Arc<dyn TokenProvider>,
                accounts,
                ActionDecision::Approve,
            ),
            "app:mail",
        );

        let reply = call(&mut end, token_request(7, "user@example.com")).await;
        assert!(reply.result.unwrap_err().contains("after 1 retry"));
        assert_eq!(
            *provider.asked.lock(),
            vec!["oauth2:email profile".to_string(); 2]
        );
    }

    // =============================================================================
    // HOST THREADS
    // =============================================================================

    /// Host that only records what it was asked to do.
    #[derive(Default)]
    struct RecordingHost {
        started: Mutex<Vec<Token>>,
    }

    impl ExternalActionHost for RecordingHost {
        fn request_external_action(&self, token: &Token, _action: ActionDescriptor) {
            self.started.lock().push(*token);
        }
    }

    #[tokio::test]
    async fn test_unknown_target_creates_no_pending_request() {
        let provider = Arc::new(StubbornProvider::default());
        let host = Arc::new(RecordingHost::default());
        let hosts: ActionHostFactory = {
            let host = Arc::clone(&host);
            Arc::new(move |_: ResultSender| Arc::clone(&host) as Arc<dyn ExternalActionHost>)
        };
        let registry = LoaderRegistry::new();
        let app_provider = Arc::clone(&provider);
        register(&registry, AUTH, move || {
            AuthenticationApp::new(
                Arc::clone(&app_provider) as Arc<dyn TokenProvider>,
                Arc::clone(&hosts),
            )
        });
        let broker = broker_with(registry);
        let shell = broker.shell(ApplicationName::new("app:mail"));

        let mut missing = shell.connect_to_service(
            &ApplicationName::new("app:does-not-exist"),
            InterfaceName::new(AUTHENTICATION_INTERFACE),
        );
        let _ = missing.write(Message::new(token_request(8, "user@example.com").encode().unwrap()));
        assert!(sees_disconnect(&mut missing).await);
        assert!(host.started.lock().is_empty());
        assert!(provider.asked.lock().is_empty());
        assert!(!broker.is_running(&ApplicationName::new("app:does-not-exist")));

        // The same request to the real service is suspended.
        let end = shell.connect_to_service(
            &ApplicationName::new(AUTH),
            InterfaceName::new(AUTHENTICATION_INTERFACE),
        );
        end.write(Message::new(token_request(9, "user@example.com").encode().unwrap()))
            .unwrap();
        timeout(WAIT, async {
            while host.started.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(host.started.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_results_from_host_threads_resolve_once() {
        let host = Arc::new(RecordingHost::default());
        let mut table: PendingRequestTable<u32, String> =
            PendingRequestTable::new(Arc::clone(&host) as Arc<dyn ExternalActionHost>);
        let (sender, mut inbox) = result_channel();
        let delivered = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3u32 {
            let sink = Arc::clone(&delivered);
            let call = PendingCall::deliver(
                n,
                Box::new(move |result: Result<String, PendingError>| sink.lock().push(result)),
                |data| String::from_utf8(data).map_err(|e| PendingError::Failed(e.to_string())),
            );
            table.suspend(TokenKind::ExpectResult, call, ActionDescriptor::new("picker"));
        }

        let tokens = host.started.lock().clone();
        assert_eq!(tokens.len(), 3);
        let reporter = std::thread::spawn(move || {
            for token in &tokens {
                sender.deliver_external_action_result(*token, ExternalOutcome::Granted(b"ok".to_vec()));
                sender.deliver_external_action_result(*token, ExternalOutcome::Denied);
            }
        });
        reporter.join().unwrap();

        let mut unknown = 0;
        while let Some(result) = inbox.try_recv() {
            if table.resolve_result(result).is_unknown() {
                unknown += 1;
            }
        }

        assert_eq!(unknown, 3);
        assert!(table.is_empty());
        assert_eq!(
            *delivered.lock(),
            vec![Ok("ok".to_string()), Ok("ok".to_string()), Ok("ok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_retry_original_hands_back_parameters() {
        let host = Arc::new(RecordingHost::default());
        let mut table: PendingRequestTable<(String, Vec<String>), String> =
            PendingRequestTable::new(Arc::clone(&host) as Arc<dyn ExternalActionHost>);

        let params = ("user@example.com".to_string(), vec!["email".to_string()]);
        let call = PendingCall::retry_original(
            params.clone(),
            Box::new(|_: Result<String, PendingError>| {}),
        );
        let token = table.suspend(TokenKind::ExpectResult, call, ActionDescriptor::new("consent"));

        match table.resolve(&token, ExternalOutcome::Granted(Vec::new())) {
            Resolution::Retry(retry) => {
                assert_eq!(retry.params, params);
                assert_eq!(retry.attempt, 1);
                assert!(!table.retry_allowed(retry.attempt));
            }
            other => panic!("expected a retry, got {other:?}"),
        }
    }
}
