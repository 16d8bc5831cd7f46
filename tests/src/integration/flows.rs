//! # Connection Flows
//!
//! Broker, directory and channel working together:
//!
//! 1. **Echo round trip**: name → instance → directory → service → reply
//! 2. **Unknown targets**: unknown application or interface closes the end
//! 3. **Concurrency**: simultaneous connects share one instance and never
//!    cross channels
//! 4. **Instance keys**: query suffixes address the same instance

#[cfg(test)]
mod tests {
    use super::super::{broker_with, read_payload, register, sees_disconnect, WAIT};
    use async_trait::async_trait;
    use sb_02_connection_broker::{
        Application, BrokerConfig, ConnectionBroker, HostError, HostRuntime, LoaderRegistry,
    };
    use shared_channel::Message;
    use shared_types::{ApplicationName, InterfaceName};
    use shell_runtime::apps::{EchoApp, ECHO_INTERFACE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Host that counts how many instances it created.
    struct CountingHost {
        registry: LoaderRegistry,
        created: AtomicUsize,
    }

    #[async_trait]
    impl HostRuntime for CountingHost {
        async fn create_application_instance(
            &self,
            name: &ApplicationName,
        ) -> Result<Box<dyn Application>, HostError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.registry.create_application_instance(name).await
        }
    }

    fn echo_registry() -> LoaderRegistry {
        let registry = LoaderRegistry::new();
        register(&registry, "app:echo", || EchoApp);
        registry
    }

    fn counting_broker() -> (Arc<ConnectionBroker>, Arc<CountingHost>) {
        let host = Arc::new(CountingHost {
            registry: echo_registry(),
            created: AtomicUsize::new(0),
        });
        let broker = ConnectionBroker::new(Arc::clone(&host) as Arc<dyn HostRuntime>, BrokerConfig::default());
        (broker, host)
    }

    fn echo() -> InterfaceName {
        InterfaceName::new(ECHO_INTERFACE)
    }

    // =============================================================================
    // ECHO ROUND TRIP
    // =============================================================================

    #[tokio::test]
    async fn test_echo_round_trip() {
        let broker = broker_with(echo_registry());
        let shell = broker.shell(ApplicationName::new("app:client"));

        let mut end = shell.connect_to_service(&ApplicationName::new("app:echo"), echo());
        end.write(Message::from("ping")).unwrap();

        assert_eq!(read_payload(&mut end).await, b"ping");
        assert!(broker.is_running(&ApplicationName::new("app:echo")));
    }

    #[tokio::test]
    async fn test_echo_preserves_message_boundaries_and_endpoints() {
        let broker = broker_with(echo_registry());
        let shell = broker.shell(ApplicationName::new("app:client"));
        let mut end = shell.connect_to_service(&ApplicationName::new("app:echo"), echo());

        let (mut kept, sent) = shared_channel::channel();
        end.write(Message::from("a")).unwrap();
        end.write(Message::with_endpoints("bc", vec![sent])).unwrap();

        assert_eq!(read_payload(&mut end).await, b"a");
        let mut second = timeout(WAIT, end.read()).await.unwrap().unwrap();
        assert_eq!(&second.payload[..], b"bc");

        let returned = second.take_endpoints().pop().unwrap();
        returned.write(Message::from("via transferred end")).unwrap();
        assert_eq!(read_payload(&mut kept).await, b"via transferred end");
    }

    // =============================================================================
    // UNKNOWN TARGETS
    // =============================================================================

    #[tokio::test]
    async fn test_unknown_application_closes_channel() {
        let broker = broker_with(echo_registry());
        let shell = broker.shell(ApplicationName::new("app:client"));

        let mut end = shell.connect_to_service(&ApplicationName::new("app:does-not-exist"), echo());
        assert!(sees_disconnect(&mut end).await);
        assert!(!broker.is_running(&ApplicationName::new("app:does-not-exist")));
    }

    #[tokio::test]
    async fn test_unknown_interface_keeps_directory_usable() {
        let broker = broker_with(echo_registry());
        let shell = broker.shell(ApplicationName::new("app:client"));
        let directory = shell.connect_to_application(&ApplicationName::new("app:echo"), None);

        let mut missing = directory.connect_to_service(InterfaceName::new("Missing"));
        assert!(sees_disconnect(&mut missing).await);

        let mut end = directory.connect_to_service(echo());
        end.write(Message::from("still here")).unwrap();
        assert_eq!(read_payload(&mut end).await, b"still here");
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_connects_share_one_instance() {
        let (broker, host) = counting_broker();

        let mut clients = Vec::new();
        for i in 0..16u8 {
            let broker = Arc::clone(&broker);
            clients.push(tokio::spawn(async move {
                let shell = broker.shell(ApplicationName::new(format!("app:client-{i}")));
                let mut end = shell.connect_to_service(&ApplicationName::new("app:echo"), echo());
                end.write(Message::from(vec![i])).unwrap();
                read_payload(&mut end).await
            }));
        }

        for (i, client) in clients.into_iter().enumerate() {
            let payload = timeout(WAIT, client).await.unwrap().unwrap();
            assert_eq!(payload, vec![i as u8]);
        }
        assert_eq!(host.created.load(Ordering::SeqCst), 1);
        assert_eq!(
            broker.running_applications(),
            vec![ApplicationName::new("app:echo")]
        );
    }

    #[tokio::test]
    async fn test_query_suffix_addresses_same_instance() {
        let (broker, host) = counting_broker();
        let shell = broker.shell(ApplicationName::new("app:client"));

        let mut plain = shell.connect_to_service(&ApplicationName::new("app:echo"), echo());
        let mut queried = shell.connect_to_service(&ApplicationName::new("app:echo?mode=loud"), echo());
        plain.write(Message::from("1")).unwrap();
        queried.write(Message::from("2")).unwrap();

        assert_eq!(read_payload(&mut plain).await, b"1");
        assert_eq!(read_payload(&mut queried).await, b"2");
        assert_eq!(host.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restart_after_shutdown() {
        let (broker, host) = counting_broker();
        let shell = broker.shell(ApplicationName::new("app:client"));
        let name = ApplicationName::new("app:echo");

        let mut first = shell.connect_to_service(&name, echo());
        first.write(Message::from("one")).unwrap();
        assert_eq!(read_payload(&mut first).await, b"one");

        assert!(broker.shutdown_application(&name).await);
        assert!(!broker.is_running(&name));

        let mut second = shell.connect_to_service(&name, echo());
        second.write(Message::from("two")).unwrap();
        assert_eq!(read_payload(&mut second).await, b"two");
        assert_eq!(host.created.load(Ordering::SeqCst), 2);
    }
}
