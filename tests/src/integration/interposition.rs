//! # Interposition
//!
//! The authenticating proxy exposes `NetworkService` and forwards each
//! session to an upstream application through a `PipeForwarder`:
//!
//! ```text
//! client ══ app:authenticating_network_proxy ══ upstream NetworkService
//! ```
//!
//! Verified here: replies pass through unchanged, each client gets its own
//! upstream session, and a close on either side reaches the other.

#[cfg(test)]
mod tests {
    use super::super::{broker_with, read_payload, register, sees_disconnect, WAIT};
    use sb_01_service_directory::ServiceDirectory;
    use sb_02_connection_broker::{
        Application, BrokerConfig, ConnectionBroker, LoaderRegistry, Shell,
    };
    use sb_03_pipe_forwarder::ForwarderConfig;
    use shared_channel::Message;
    use shared_types::{ApplicationName, BrokerError, InterfaceName};
    use shell_runtime::apps::{AuthenticatingProxyApp, NetworkApp, NETWORK_INTERFACE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    const PROXY: &str = "app:authenticating_network_proxy";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Upstream that answers once, then hangs up, and reports every session
    /// that ended.
    #[derive(Clone, Default)]
    struct OneShotUpstream {
        sessions: Arc<AtomicUsize>,
        ended: Arc<Notify>,
    }

    impl Application for OneShotUpstream {
        fn initialize(
            &mut self,
            _shell: &Shell,
            _args: &[String],
            directory: &mut ServiceDirectory,
        ) -> Result<(), BrokerError> {
            let counter = self.clone();
            directory.register(NETWORK_INTERFACE, move |mut endpoint, _ctx| {
                let counter = counter.clone();
                counter.sessions.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    if let Some(request) = endpoint.read().await {
                        let _ = endpoint.write(Message::new(request.payload));
                    }
                    endpoint.close();
                    counter.ended.notify_one();
                });
            })?;
            Ok(())
        }
    }

    fn proxy_registry(config: ForwarderConfig) -> LoaderRegistry {
        let registry = LoaderRegistry::new();
        register(&registry, PROXY, move || AuthenticatingProxyApp::new(config));
        register(&registry, "app:network_service", NetworkApp::default);
        registry
    }

    fn network() -> InterfaceName {
        InterfaceName::new(NETWORK_INTERFACE)
    }

    // =============================================================================
    // PASS-THROUGH
    // =============================================================================

    #[tokio::test]
    async fn test_proxy_passes_replies_through() {
        let broker = broker_with(proxy_registry(ForwarderConfig::default()));
        let shell = broker.shell(ApplicationName::new("app:browser"));

        let mut end = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        for url in ["https://a.example", "https://b.example"] {
            end.write(Message::from(url.as_bytes().to_vec())).unwrap();
            assert_eq!(read_payload(&mut end).await, format!("fetched:{url}").into_bytes());
        }
    }

    #[tokio::test]
    async fn test_upstream_args_reach_network_service() {
        let config = BrokerConfig::default().with_args("app:network_service", vec!["cached:".into()]);
        let broker = ConnectionBroker::new(
            Arc::new(proxy_registry(ForwarderConfig {
                idle_wait: Some(Duration::from_millis(10)),
            })),
            config,
        );
        let shell = broker.shell(ApplicationName::new("app:browser"));

        let mut end = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        tokio::time::sleep(Duration::from_millis(30)).await;
        end.write(Message::from("x")).unwrap();
        assert_eq!(read_payload(&mut end).await, b"cached:x");
    }

    #[tokio::test]
    async fn test_proxy_to_itself_fails_to_start() {
        let config = BrokerConfig::default().with_args(PROXY, vec![PROXY.to_string()]);
        let broker = ConnectionBroker::new(
            Arc::new(proxy_registry(ForwarderConfig::default())),
            config,
        );
        let shell = broker.shell(ApplicationName::new("app:browser"));

        let mut end = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        assert!(sees_disconnect(&mut end).await);
    }

    // =============================================================================
    // CLOSE PROPAGATION
    // =============================================================================

    #[tokio::test]
    async fn test_upstream_close_reaches_client() {
        let upstream = OneShotUpstream::default();
        let registry = proxy_registry(ForwarderConfig::default());
        let counter = upstream.clone();
        register(&registry, "app:one_shot", move || counter.clone());

        let config = BrokerConfig::default().with_args(PROXY, vec!["app:one_shot".into()]);
        let broker = ConnectionBroker::new(Arc::new(registry), config);
        let shell = broker.shell(ApplicationName::new("app:browser"));

        let mut end = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        end.write(Message::from("only")).unwrap();
        assert_eq!(read_payload(&mut end).await, b"only");
        assert!(sees_disconnect(&mut end).await);
    }

    #[tokio::test]
    async fn test_client_close_reaches_upstream() {
        let upstream = OneShotUpstream::default();
        let registry = proxy_registry(ForwarderConfig::default());
        let counter = upstream.clone();
        register(&registry, "app:one_shot", move || counter.clone());

        let config = BrokerConfig::default().with_args(PROXY, vec!["app:one_shot".into()]);
        let broker = ConnectionBroker::new(Arc::new(registry), config);
        let shell = broker.shell(ApplicationName::new("app:browser"));

        let ended = upstream.ended.notified();
        tokio::pin!(ended);
        ended.as_mut().enable();

        let end = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        tokio::time::timeout(WAIT, async {
            while upstream.sessions.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("upstream never bound");
        drop(end);

        tokio::time::timeout(WAIT, ended).await.expect("upstream never saw the close");
    }

    #[tokio::test]
    async fn test_each_client_gets_own_upstream_session() {
        let upstream = OneShotUpstream::default();
        let registry = proxy_registry(ForwarderConfig::default());
        let counter = upstream.clone();
        register(&registry, "app:one_shot", move || counter.clone());

        let config = BrokerConfig::default().with_args(PROXY, vec!["app:one_shot".into()]);
        let broker = ConnectionBroker::new(Arc::new(registry), config);
        let shell = broker.shell(ApplicationName::new("app:browser"));

        let mut a = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        let mut b = shell.connect_to_service(&ApplicationName::new(PROXY), network());
        a.write(Message::from("from a")).unwrap();
        b.write(Message::from("from b")).unwrap();

        assert_eq!(read_payload(&mut a).await, b"from a");
        assert_eq!(read_payload(&mut b).await, b"from b");
        assert_eq!(upstream.sessions.load(Ordering::SeqCst), 2);
    }
}
