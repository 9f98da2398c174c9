//! reqwest-backed transport.

use async_trait::async_trait;
use courier_common_config::ClientConfig;
use reqwest::{Client, ClientBuilder};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::HttpError;
use crate::request::RequestDescriptor;
use crate::response::Response;
use crate::transport::Transport;

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Applied when the request carries no timeout of its own.
    pub request_timeout: Duration,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("courier/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

impl From<&ClientConfig> for HttpConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
            pool_max_idle_per_host: config.pool_max_idle_per_host,
            gzip: config.gzip,
        }
    }
}

/// Build a configured reqwest client.
pub fn build_client(config: &HttpConfig) -> Result<Client, HttpError> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .gzip(config.gzip)
        .build()
        .map_err(|e| HttpError::ClientBuild(e.to_string()))
}

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    request_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default())
    }

    pub fn with_config(config: HttpConfig) -> Result<Self, HttpError> {
        Ok(Self {
            client: build_client(&config)?,
            request_timeout: config.request_timeout,
        })
    }

    /// Wrap an existing client; `request_timeout` applies to requests without one.
    pub fn from_client(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, HttpError> {
        let url = request.full_url();
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .timeout(request.timeout.unwrap_or(self.request_timeout));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
