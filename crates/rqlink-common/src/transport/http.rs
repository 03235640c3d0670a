//! HTTP client used for every exchange with a node.
//!
//! # Example
//!
//! ```no_run
//! use rqlink_common::transport::HttpTransport;
//! use rqlink_common::CallContext;
//! use std::time::Duration;
//!
//! # async fn demo() -> rqlink_common::Result<()> {
//! let transport = HttpTransport::new(Duration::from_secs(5), None);
//! let response = transport
//!     .get("http://127.0.0.1:4001/status", &CallContext::background())
//!     .await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;

use crate::config::{Config, Credentials};
use crate::context::CallContext;
use crate::protocol::error::{Result, RqlinkError};

/// Status code and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8, for error messages.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Cheaply cloneable HTTP client bound to one set of credentials and one
/// request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    authorization: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("authenticated", &self.authorization.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(timeout: Duration, credentials: Option<&Credentials>) -> Self {
        let authorization = credentials.map(|c| {
            let token = BASE64.encode(format!("{}:{}", c.username, c.password));
            format!("Basic {}", token)
        });

        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            authorization,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.timeout, config.credentials.as_ref())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get(&self, url: &str, ctx: &CallContext) -> Result<HttpResponse> {
        self.send(Method::GET, url, Bytes::new(), ctx).await
    }

    pub async fn post_json(&self, url: &str, body: &Value, ctx: &CallContext) -> Result<HttpResponse> {
        let body = serde_json::to_vec(body)?;
        self.send(Method::POST, url, Bytes::from(body), ctx).await
    }

    async fn send(&self, method: Method, url: &str, body: Bytes, ctx: &CallContext) -> Result<HttpResponse> {
        let mut builder = Request::builder().method(method).uri(url);
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth.as_str());
        }
        let request = builder
            .body(Full::new(body))
            .map_err(|e| RqlinkError::Transport(format!("Failed to build request for {}: {}", url, e)))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| RqlinkError::Transport(format!("HTTP request to {} failed: {}", url, e)))?;
            let status = response.status().as_u16();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| RqlinkError::Transport(format!("Failed to read response from {}: {}", url, e)))?
                .to_bytes();
            Ok::<_, RqlinkError>(HttpResponse { status, body })
        };

        let timeout = self.timeout;
        ctx.run(async move {
            tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| RqlinkError::Timeout(timeout.as_millis() as u64))?
        })
        .await
    }
}
