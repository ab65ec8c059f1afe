//! Upstream transport.
//!
//! The dispatcher hands a request whose URI carries only path and query to a
//! [`Transport`] together with the chosen server; the transport supplies
//! scheme and authority and performs the exchange.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::error::TransportError;
use crate::resilience::with_deadline;

/// Sends one request to one backend server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn forward(
        &self,
        server: SocketAddr,
        request: Request<Body>,
    ) -> Result<Response<Body>, TransportError>;
}

/// Absolute `http://server/path?query` form of a relative request URI.
pub fn upstream_uri(server: SocketAddr, uri: &Uri) -> Result<Uri, TransportError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("http://{}{}", server, path_and_query)
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| TransportError::InvalidRequest(e.to_string()))
}

/// HTTP/1.1 transport on the hyper-util pooled client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn forward(
        &self,
        server: SocketAddr,
        request: Request<Body>,
    ) -> Result<Response<Body>, TransportError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = upstream_uri(server, &parts.uri)?;
        let request = Request::from_parts(parts, body);

        let response: Response<Incoming> = with_deadline(server, self.upstream_timeout, async {
            self.client
                .request(request)
                .await
                .map_err(|e| TransportError::Upstream {
                    backend: server,
                    source: Box::new(e),
                })
        })
        .await?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    #[test]
    fn builds_absolute_upstream_uri() {
        let server: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        let uri: Uri = "/sample?x=1".parse().unwrap();
        assert_eq!(
            upstream_uri(server, &uri).unwrap().to_string(),
            "http://127.0.0.1:3000/sample?x=1"
        );
    }

    #[tokio::test]
    async fn forwards_to_backend() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/sample", get(|| async { "sample" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let transport = HttpTransport::new(&TimeoutConfig::default());
        let request = Request::get("/sample").body(Body::empty()).unwrap();
        let response = transport.forward(addr, request).await.unwrap();
        assert!(response.status().is_success());

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"sample");
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_error() {
        // Bind then drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let transport = HttpTransport::new(&TimeoutConfig::default());
        let request = Request::get("/").body(Body::empty()).unwrap();
        let err = transport.forward(addr, request).await.unwrap_err();
        assert!(matches!(err, TransportError::Upstream { .. }));
    }
}
