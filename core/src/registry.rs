//! Named clients and the registry that hands them out.
//!
//! # Design
//! A logical name maps to one `RestClient` bound to one long-lived transport.
//! Entries are created on first lookup and live as long as the registry;
//! there is no eviction or reconfiguration. Lookups take a read lock; only
//! the create path takes the write lock, and it re-checks under that lock so
//! each name is created once.
//!
//! `ClientRegistry` is a plain value so tests and applications can own one.
//! `ClientRegistry::global()` offers a process-wide instance for callers that
//! want the "get client by name" convenience.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::engine;
use crate::error::{ConfigError, TransportError};
use crate::request::RestRequest;
use crate::response::RestResponse;
use crate::transport::{ReqwestTransport, Transport, TransportConfig};

/// Creates the transport for a newly registered client name.
pub type TransportFactory =
    Box<dyn Fn(&str) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync>;

/// Facade that executes requests through one named transport.
pub struct RestClient {
    name: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient").field("name", &self.name).finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(name: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.to_string(),
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Execute `request`. See `engine::execute` for the error contract.
    pub async fn execute(&self, request: RestRequest) -> Result<RestResponse, ConfigError> {
        engine::execute(&self.name, self.transport.as_ref(), request).await
    }

    /// Configure a fresh request in `configure`, then execute it.
    pub async fn execute_with<F>(&self, configure: F) -> Result<RestResponse, ConfigError>
    where
        F: FnOnce(&mut RestRequest),
    {
        let mut request = RestRequest::new();
        configure(&mut request);
        self.execute(request).await
    }
}

/// Create-once cache of named clients.
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Arc<RestClient>>>,
    factory: TransportFactory,
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry").field("len", &self.len()).finish_non_exhaustive()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// Registry whose clients use a `ReqwestTransport` configured from the
    /// environment.
    pub fn new() -> Self {
        Self::with_factory(|_name: &str| {
            let transport = ReqwestTransport::new(&TransportConfig::from_env())?;
            Ok(Arc::new(transport) as Arc<dyn Transport>)
        })
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync + 'static,
    {
        Self {
            clients: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ClientRegistry {
        static GLOBAL: OnceLock<ClientRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ClientRegistry::new)
    }

    /// Return the client registered under `name`, creating it on first use.
    pub fn get(&self, name: &str) -> Result<Arc<RestClient>, TransportError> {
        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(name) {
            return Ok(Arc::clone(client));
        }

        let transport = (self.factory)(name)?;
        let client = Arc::new(RestClient::new(name, transport));
        clients.insert(name.to_string(), Arc::clone(&client));
        debug!(client = name, "registered client");
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Look up `name` in the process-wide registry.
pub fn get_client(name: &str) -> Result<Arc<RestClient>, TransportError> {
    ClientRegistry::global().get(name)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::http::{WireRequest, WireResponse};

    struct Fixed;

    #[async_trait]
    impl Transport for Fixed {
        async fn send(
            &self,
            _request: WireRequest,
            _cancel: CancellationToken,
        ) -> Result<WireResponse, TransportError> {
            Ok(WireResponse {
                status: 200,
                body: Bytes::from_static(b"fixed"),
            })
        }
    }

    fn counting_registry() -> (ClientRegistry, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let registry = ClientRegistry::with_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed) as Arc<dyn Transport>)
        });
        (registry, created)
    }

    #[test]
    fn same_name_returns_same_client() {
        let (registry, created) = counting_registry();
        let a = registry.get("default").unwrap();
        let b = registry.get("default").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(a.transport(), b.transport()));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(a.name(), "default");
    }

    #[test]
    fn different_names_never_share_a_transport() {
        let (registry, created) = counting_registry();
        let a = registry.get("a").unwrap();
        let b = registry.get("b").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(a.transport(), b.transport()));
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_lookups_create_once() {
        let (registry, created) = counting_registry();
        let registry = Arc::new(registry);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get("shared").unwrap())
            })
            .collect();
        let clients: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_failure_registers_nothing() {
        let registry =
            ClientRegistry::with_factory(|_| Err(TransportError::Other("no tls".to_string())));
        assert!(registry.get("x").is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn execute_with_configures_fresh_request() {
        let client = RestClient::new("closure", Arc::new(Fixed));
        let response = client
            .execute_with(|req| {
                req.set_url("http://h/api").add_query_value("a", "1");
            })
            .await
            .unwrap();
        assert!(!response.is_error());
        assert_eq!(response.text(), Some("fixed"));
        assert_eq!(response.request().url(), "http://h/api");
    }

    #[test]
    #[serial_test::serial]
    fn global_registry_is_shared() {
        let a = get_client("registry-global-test").unwrap();
        let b = ClientRegistry::global().get("registry-global-test").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
