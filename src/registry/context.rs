//! Constructed per-service client resources.
//!
//! A [`ClientContext`] bundles a service's server pool with the auxiliary
//! beans its factory produced. Factories build one through
//! [`ClientContextBuilder`], which accepts a server-list supplier and named
//! bean constructors; both are consumed by `build` and never touched per request.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::BoxError;
use crate::load_balancer::{LoadBalancerPolicy, ServerPool};

type Bean = Arc<dyn Any + Send + Sync>;
type BeanConstructor = Box<dyn FnOnce() -> Result<Bean, BoxError> + Send>;

/// Supplies the servers of a service at construction time.
pub trait ServerList: Send + Sync {
    fn servers(&self) -> Result<Vec<SocketAddr>, BoxError>;
}

/// A fixed server list.
#[derive(Debug, Clone, Default)]
pub struct StaticServerList {
    servers: Vec<SocketAddr>,
}

impl StaticServerList {
    pub fn new(servers: impl IntoIterator<Item = SocketAddr>) -> Self {
        Self {
            servers: servers.into_iter().collect(),
        }
    }
}

impl ServerList for StaticServerList {
    fn servers(&self) -> Result<Vec<SocketAddr>, BoxError> {
        Ok(self.servers.clone())
    }
}

/// Externally-fed lists, e.g. a closure reading from another component.
impl<F> ServerList for F
where
    F: Fn() -> Result<Vec<SocketAddr>, BoxError> + Send + Sync,
{
    fn servers(&self) -> Result<Vec<SocketAddr>, BoxError> {
        self()
    }
}

/// The cached bundle of resources used to reach one service.
pub struct ClientContext {
    service_id: String,
    pool: ServerPool,
    beans: HashMap<String, Bean>,
    created_at: Instant,
}

impl ClientContext {
    pub fn builder(service_id: impl Into<String>) -> ClientContextBuilder {
        ClientContextBuilder::new(service_id)
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    /// Typed access to an auxiliary bean.
    pub fn bean<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.beans
            .get(name)
            .and_then(|bean| bean.clone().downcast::<T>().ok())
    }

    /// Names of all auxiliary beans, sorted.
    pub fn bean_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.beans.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Time since construction finished.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("service_id", &self.service_id)
            .field("pool", &self.pool)
            .field("beans", &self.bean_names())
            .finish()
    }
}

/// Assembles a [`ClientContext`] inside a service's factory.
pub struct ClientContextBuilder {
    service_id: String,
    server_list: Option<Box<dyn ServerList>>,
    policy: LoadBalancerPolicy,
    max_connections: usize,
    beans: Vec<(String, BeanConstructor)>,
}

impl ClientContextBuilder {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            server_list: None,
            policy: LoadBalancerPolicy::default(),
            max_connections: 100,
            beans: Vec::new(),
        }
    }

    pub fn server_list(mut self, list: impl ServerList + 'static) -> Self {
        self.server_list = Some(Box::new(list));
        self
    }

    pub fn policy(mut self, policy: LoadBalancerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Register an infallible bean constructor.
    pub fn bean<T, F>(self, name: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T + Send + 'static,
    {
        self.try_bean(name, move || Ok(constructor()))
    }

    /// Register a fallible bean constructor; its error fails the whole build.
    pub fn try_bean<T, F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, BoxError> + Send + 'static,
    {
        let constructor: BeanConstructor = Box::new(move || -> Result<Bean, BoxError> {
            let bean: Bean = Arc::new(constructor()?);
            Ok(bean)
        });
        self.beans.push((name.into(), constructor));
        self
    }

    /// Run the supplier and every bean constructor, in registration order.
    pub fn build(self) -> Result<ClientContext, BoxError> {
        let servers = match &self.server_list {
            Some(list) => list.servers()?,
            None => Vec::new(),
        };
        let pool = ServerPool::new(&servers, self.policy, self.max_connections);

        let mut beans = HashMap::with_capacity(self.beans.len());
        for (name, constructor) in self.beans {
            if beans.contains_key(&name) {
                return Err(
                    format!("duplicate bean '{}' for service '{}'", name, self.service_id).into(),
                );
            }
            let bean = constructor()?;
            beans.insert(name, bean);
        }

        Ok(ClientContext {
            service_id: self.service_id,
            pool,
            beans,
            created_at: Instant::now(),
        })
    }
}
