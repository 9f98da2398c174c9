//! Verb-level entry points.

use courier_common_config::ClientConfig;
use courier_common_core::query::{QueryParameters, ToQueryParameters};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::{HttpConfig, ReqwestTransport};
use crate::codec::{JsonDecoder, JsonEncoder};
use crate::error::HttpError;
use crate::executor::{Executor, ExecutorBuilder};
use crate::request::Method;
use crate::response::{Empty, NoBody};
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use crate::tuners::Tuners;
use crate::validator::ResponseValidator;

/// Typed JSON client.
///
/// `get` sends query parameters; the other verbs send a JSON body, except
/// that a body encoding to `null` (such as [`NoBody`]) is left out. The
/// `*_empty` variants skip decoding and tolerate `[0, 400)` failures.
///
/// ```no_run
/// use courier_common_http::{JsonClient, NoBody, Tuners};
/// use courier_common_core::query_params;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Warehouse {
///     id: u64,
/// }
///
/// # async fn run() -> Result<(), courier_common_http::HttpError> {
/// let client = JsonClient::builder().base_url("https://api.example.com/").build()?;
/// let warehouses: Vec<Warehouse> = client
///     .get("warehouses", &query_params! { "active" => true }, Tuners::default())
///     .await?;
/// client.delete_empty("warehouses/7", &NoBody, Tuners::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonClient {
    executor: Executor,
}

/// One call, spelled out.
#[derive(Debug, Clone)]
pub struct CallSpec<'a, B: ?Sized> {
    pub method: Method,
    pub url: &'a str,
    pub parameters: QueryParameters,
    pub body: Option<&'a B>,
    pub tuners: Tuners,
    pub cancel: Option<CancellationToken>,
}

impl<'a> CallSpec<'a, NoBody> {
    pub fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            parameters: QueryParameters::new(),
            body: None,
            tuners: Tuners::default(),
            cancel: None,
        }
    }
}

impl<'a, B: ?Sized> CallSpec<'a, B> {
    pub fn body<C: ?Sized>(self, body: &'a C) -> CallSpec<'a, C> {
        CallSpec {
            method: self.method,
            url: self.url,
            parameters: self.parameters,
            body: Some(body),
            tuners: self.tuners,
            cancel: self.cancel,
        }
    }

    pub fn parameters(mut self, parameters: &impl ToQueryParameters) -> Self {
        self.parameters = parameters.to_query_parameters();
        self
    }

    pub fn tuners(mut self, tuners: Tuners) -> Self {
        self.tuners = tuners;
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Builds a [`JsonClient`], by default over [`ReqwestTransport`].
pub struct JsonClientBuilder {
    http: HttpConfig,
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<String>,
    configure: Vec<Box<dyn FnOnce(ExecutorBuilder) -> ExecutorBuilder + Send>>,
}

impl JsonClientBuilder {
    fn new() -> Self {
        Self {
            http: HttpConfig::default(),
            transport: None,
            base_url: None,
            configure: Vec::new(),
        }
    }

    fn then(mut self, f: impl FnOnce(ExecutorBuilder) -> ExecutorBuilder + Send + 'static) -> Self {
        self.configure.push(Box::new(f));
        self
    }

    pub fn http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Use `transport` instead of building a reqwest one.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Base URL for relative paths; an unparseable URL fails [`JsonClientBuilder::build`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.then(move |builder| builder.header(name, value))
    }

    pub fn encoder(self, encoder: JsonEncoder) -> Self {
        self.then(move |builder| builder.encoder(encoder))
    }

    pub fn decoder(self, decoder: JsonDecoder) -> Self {
        self.then(move |builder| builder.decoder(decoder))
    }

    pub fn validator(self, validator: impl ResponseValidator + 'static) -> Self {
        self.then(move |builder| builder.validator(validator))
    }

    pub fn retry_policy(self, policy: impl RetryPolicy + 'static) -> Self {
        self.then(move |builder| builder.retry_policy(policy))
    }

    pub fn build(self) -> Result<JsonClient, HttpError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_config(self.http)?),
        };
        let mut builder = ExecutorBuilder::with_shared_transport(transport);
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url)?;
        }
        let builder = self.configure.into_iter().fold(builder, |builder, f| f(builder));
        Ok(JsonClient {
            executor: builder.build(),
        })
    }
}

impl JsonClient {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn builder() -> JsonClientBuilder {
        JsonClientBuilder::new()
    }

    /// Client over reqwest configured from `config`: base URL, timeouts,
    /// default headers and the reference offset for zone-less timestamps.
    pub fn from_config(config: &ClientConfig) -> Result<Self, HttpError> {
        let parser = config
            .timestamp_parser()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;
        let transport = ReqwestTransport::with_config(HttpConfig::from(config))?;
        let mut builder = ExecutorBuilder::new(transport).timestamp_parser(parser);
        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url)?;
        }
        for (name, value) in &config.default_headers {
            builder = builder.header(name.clone(), value.clone());
        }
        Ok(Self::new(builder.build()))
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run an explicit call, optionally cancellable.
    pub async fn call<B, T>(&self, spec: CallSpec<'_, B>) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = match spec.body {
            Some(body) => self.executor.encode_body(body, &spec.tuners)?,
            None => None,
        };
        let request = self
            .executor
            .build_request(spec.method, spec.url, &spec.parameters, body, &spec.tuners)?;
        self.executor
            .execute(request, &spec.tuners, spec.cancel.as_ref())
            .await
    }

    /// Like [`JsonClient::call`], without decoding.
    pub async fn call_empty<B>(&self, spec: CallSpec<'_, B>) -> Result<Empty, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let body = match spec.body {
            Some(body) => self.executor.encode_body(body, &spec.tuners)?,
            None => None,
        };
        let request = self
            .executor
            .build_request(spec.method, spec.url, &spec.parameters, body, &spec.tuners)?;
        self.executor
            .execute_empty(request, &spec.tuners, spec.cancel.as_ref())
            .await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        parameters: &impl ToQueryParameters,
        tuners: Tuners,
    ) -> Result<T, HttpError> {
        self.call::<NoBody, T>(CallSpec::new(Method::Get, url).parameters(parameters).tuners(tuners))
            .await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B, tuners: Tuners) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Post, url, body, tuners).await
    }

    pub async fn put<B, T>(&self, url: &str, body: &B, tuners: Tuners) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Put, url, body, tuners).await
    }

    pub async fn delete<B, T>(&self, url: &str, body: &B, tuners: Tuners) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Delete, url, body, tuners).await
    }

    pub async fn patch<B, T>(&self, url: &str, body: &B, tuners: Tuners) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Patch, url, body, tuners).await
    }

    pub async fn post_empty<B>(&self, url: &str, body: &B, tuners: Tuners) -> Result<Empty, HttpError>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(Method::Post, url, body, tuners).await
    }

    pub async fn put_empty<B>(&self, url: &str, body: &B, tuners: Tuners) -> Result<Empty, HttpError>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(Method::Put, url, body, tuners).await
    }

    pub async fn delete_empty<B>(&self, url: &str, body: &B, tuners: Tuners) -> Result<Empty, HttpError>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(Method::Delete, url, body, tuners).await
    }

    pub async fn patch_empty<B>(&self, url: &str, body: &B, tuners: Tuners) -> Result<Empty, HttpError>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(Method::Patch, url, body, tuners).await
    }

    async fn send<B, T>(&self, method: Method, url: &str, body: &B, tuners: Tuners) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(CallSpec::new(method, url).body(body).tuners(tuners)).await
    }

    async fn send_empty<B>(&self, method: Method, url: &str, body: &B, tuners: Tuners) -> Result<Empty, HttpError>
    where
        B: Serialize + ?Sized,
    {
        self.call_empty(CallSpec::new(method, url).body(body).tuners(tuners))
            .await
    }
}
