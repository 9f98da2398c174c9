//! The request pipeline: build, dispatch, validate, retry, decode.

use bytes::Bytes;
use courier_common_core::query::ToQueryParameters;
use courier_common_core::TimestampParser;
use courier_common_log::spans::{record_attempt, record_error, record_status, request_span, Timer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::codec::{JsonDecoder, JsonEncoder};
use crate::error::HttpError;
use crate::request::{Method, RequestBuilder, RequestDescriptor};
use crate::response::{Empty, Response};
use crate::retry::{NeverRetry, RetryPolicy};
use crate::transport::Transport;
use crate::tuners::Tuners;
use crate::validator::{DefaultValidator, ResponseValidator};

struct Inner {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    encoder: JsonEncoder,
    decoder: JsonDecoder,
    validator: Arc<dyn ResponseValidator>,
    retry: Arc<dyn RetryPolicy>,
}

/// Runs requests against a [`Transport`].
///
/// Cloning is cheap; clones share the transport, codec settings, validator
/// and retry policy.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<Inner>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("builder", &self.inner.builder)
            .field("encoder", &self.inner.encoder)
            .field("decoder", &self.inner.decoder)
            .finish_non_exhaustive()
    }
}

/// Configures an [`Executor`].
pub struct ExecutorBuilder {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    encoder: JsonEncoder,
    decoder: JsonDecoder,
    validator: Arc<dyn ResponseValidator>,
    retry: Arc<dyn RetryPolicy>,
}

impl ExecutorBuilder {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_shared_transport(Arc::new(transport))
    }

    pub fn with_shared_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            builder: RequestBuilder::new(),
            encoder: JsonEncoder::default(),
            decoder: JsonDecoder::default(),
            validator: Arc::new(DefaultValidator),
            retry: Arc::new(NeverRetry),
        }
    }

    pub fn base_url(mut self, url: &str) -> Result<Self, HttpError> {
        self.builder = self.builder.base_url(url)?;
        Ok(self)
    }

    /// Header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn encoder(mut self, encoder: JsonEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn decoder(mut self, decoder: JsonDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Decode dates leniently, reading zone-less values in `parser`'s offset.
    pub fn timestamp_parser(self, parser: TimestampParser) -> Self {
        self.decoder(JsonDecoder::with_parser(parser))
    }

    /// Replace the default validation policy.
    pub fn validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    pub fn build(self) -> Executor {
        Executor {
            inner: Arc::new(Inner {
                transport: self.transport,
                builder: self.builder,
                encoder: self.encoder,
                decoder: self.decoder,
                validator: self.validator,
                retry: self.retry,
            }),
        }
    }
}

impl Executor {
    pub fn builder(transport: impl Transport + 'static) -> ExecutorBuilder {
        ExecutorBuilder::new(transport)
    }

    pub fn request_builder(&self) -> &RequestBuilder {
        &self.inner.builder
    }

    /// Encode a request body with the configured encoder and the encoder tuner.
    ///
    /// A body that encodes to `null`, such as [`NoBody`](crate::NoBody), is not sent.
    pub fn encode_body<B: Serialize + ?Sized>(
        &self,
        body: &B,
        tuners: &Tuners,
    ) -> Result<Option<Bytes>, HttpError> {
        let mut encoder = self.inner.encoder;
        tuners.tune_encoder(&mut encoder);
        let bytes = encoder.encode(body)?;
        Ok((bytes.as_ref() != b"null").then_some(bytes))
    }

    pub fn build_request(
        &self,
        method: Method,
        url: &str,
        parameters: &impl ToQueryParameters,
        body: Option<Bytes>,
        tuners: &Tuners,
    ) -> Result<RequestDescriptor, HttpError> {
        self.inner.builder.build(method, url, parameters, body, tuners)
    }

    /// Run `request` and decode the body as `T`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
        tuners: &Tuners,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, HttpError> {
        let span = request_span(request.method.as_str(), request.url.as_str());
        async {
            let timer = Timer::start("request");
            let result = match self.run(&request, tuners, cancel).await {
                Ok(response) => self.decode(&response, tuners),
                Err(error) => Err(error),
            };
            timer.finish();
            result
        }
        .instrument(span)
        .await
    }

    /// Run `request` without decoding the body.
    ///
    /// Failures carrying a code in `[0, 400)` are swallowed, so an empty
    /// `204 No Content` succeeds. A JSON body that would not decode is never
    /// looked at, but a non-JSON content type still fails validation.
    pub async fn execute_empty(
        &self,
        request: RequestDescriptor,
        tuners: &Tuners,
        cancel: Option<&CancellationToken>,
    ) -> Result<Empty, HttpError> {
        let span = request_span(request.method.as_str(), request.url.as_str());
        async {
            let timer = Timer::start("request");
            let result = match self.run(&request, tuners, cancel).await {
                Ok(_) => Ok(Empty {}),
                Err(error) if error.is_tolerated_without_body() => {
                    tracing::debug!(error = %error, "tolerated failure for call without payload");
                    Ok(Empty {})
                }
                Err(error) => Err(error),
            };
            timer.finish();
            result
        }
        .instrument(span)
        .await
    }

    /// Dispatch until a response validates or the retry policy gives up.
    async fn run(
        &self,
        request: &RequestDescriptor,
        tuners: &Tuners,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, HttpError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            record_attempt(attempt);

            let error = match self.dispatch(request, cancel).await {
                Ok(response) => {
                    record_status(response.status);
                    match self.validate(&response, tuners) {
                        Ok(()) => return Ok(response),
                        Err(error) => error,
                    }
                }
                Err(HttpError::Cancelled) => return Err(HttpError::Cancelled),
                Err(error) => error,
            };

            record_error(&error);
            if !error.is_retry_eligible() {
                return Err(error);
            }
            let retry = self.consult_policy(request, &error, attempt, cancel).await?;
            tracing::debug!(attempt, error = %error, retry, "retry decision");
            if !retry {
                return Err(error);
            }
        }
    }

    /// Ask the retry policy, which may sleep a backoff; cancellation ends the wait.
    async fn consult_policy(
        &self,
        request: &RequestDescriptor,
        error: &HttpError,
        attempt: u32,
        cancel: Option<&CancellationToken>,
    ) -> Result<bool, HttpError> {
        let decision = self.inner.retry.should_retry(request, error, attempt);
        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(attempt, "request cancelled while awaiting retry decision");
                        Err(HttpError::Cancelled)
                    }
                    retry = decision => Ok(retry),
                }
            }
            None => Ok(decision.await),
        }
    }

    async fn dispatch(
        &self,
        request: &RequestDescriptor,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, HttpError> {
        tracing::debug!(method = %request.method, url = %request.full_url(), "dispatching request");
        let send = self.inner.transport.send(request);
        let response = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!("request cancelled");
                        return Err(HttpError::Cancelled);
                    }
                    result = send => result,
                }
            }
            None => send.await,
        }?;
        tracing::debug!(status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }

    /// Validator, then response tuner; the error tuner may accept either failure.
    fn validate(&self, response: &Response, tuners: &Tuners) -> Result<(), HttpError> {
        let accept = |result: Result<(), HttpError>| match result {
            Err(error) if tuners.remaps(&error) => {
                tracing::debug!(error = %error, "validation failure accepted by error tuner");
                Ok(())
            }
            other => other,
        };
        accept(self.inner.validator.validate(response))?;
        accept(tuners.tune_response(response))
    }

    fn decode<T: DeserializeOwned>(&self, response: &Response, tuners: &Tuners) -> Result<T, HttpError> {
        let mut decoder = self.inner.decoder;
        tuners.tune_decoder(&mut decoder);
        decoder.decode(&response.body).map_err(|error| {
            tracing::warn!(
                status = response.status,
                error = %error,
                body = %response.body_snippet(),
                "malformed response payload"
            );
            record_error(&error);
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::retry_fn;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<Response, HttpError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Response, HttpError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, _: &RequestDescriptor) -> Result<Response, HttpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Response::new(599)))
        }
    }

    fn json(status: u16, body: &'static str) -> Result<Response, HttpError> {
        Ok(Response::new(status)
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    fn get(executor: &Executor) -> RequestDescriptor {
        executor
            .build_request(Method::Get, "https://api.example.com/items/1", &(), None, &Tuners::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_decodes() {
        let transport = Scripted::new(vec![json(200, "{\"id\":1}")]);
        let executor = Executor::builder(transport.clone()).build();
        let item: Item = executor.execute(get(&executor), &Tuners::default(), None).await.unwrap();
        assert_eq!(item, Item { id: 1 });
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_until_policy_declines() {
        let transport = Scripted::new(vec![json(500, "{}"), json(500, "{}"), json(200, "{\"id\":3}")]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let executor = Executor::builder(transport.clone())
            .retry_policy(retry_fn(move |_: &RequestDescriptor, _: &HttpError, attempt: u32| {
                record.lock().unwrap().push(attempt);
                true
            }))
            .build();
        let item: Item = executor.execute(get(&executor), &Tuners::default(), None).await.unwrap();
        assert_eq!(item.id, 3);
        assert_eq!(transport.calls(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_call_logs_duration() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Scripted::new(vec![json(404, "{}")]);
        let executor = Executor::builder(transport.clone()).build();
        let result: Result<Item, _> = executor.execute(get(&executor), &Tuners::default(), None).await;
        assert!(result.is_err());

        let failed: Result<Empty, _> = Executor::builder(Scripted::new(vec![json(500, "{}")]))
            .build()
            .execute_empty(get(&executor), &Tuners::default(), None)
            .await;
        assert!(failed.is_err());

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("operation completed").count(), 2, "{output}");
        assert!(output.contains("duration_ms"));
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_retried() {
        let transport = Scripted::new(vec![json(200, "{\"id\":\"x\"}"), json(200, "{\"id\":1}")]);
        let executor = Executor::builder(transport.clone())
            .retry_policy(retry_fn(|_: &RequestDescriptor, _: &HttpError, _: u32| true))
            .build();
        let result: Result<Item, _> = executor.execute(get(&executor), &Tuners::default(), None).await;
        assert!(matches!(result, Err(HttpError::Decode { .. })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_path_swallows_no_content() {
        let transport = Scripted::new(vec![Ok(Response::new(204))]);
        let executor = Executor::builder(transport).build();
        let result = executor.execute_empty(get(&executor), &Tuners::default(), None).await;
        assert_eq!(result, Ok(Empty {}));
    }

    #[tokio::test]
    async fn test_empty_path_surfaces_server_error_with_empty_body() {
        let transport = Scripted::new(vec![Ok(Response::new(502))]);
        let executor = Executor::builder(transport).build();
        let result = executor.execute_empty(get(&executor), &Tuners::default(), None).await;
        assert_eq!(result, Err(HttpError::status(502, b"")));
    }

    #[tokio::test]
    async fn test_response_tuner_failure_can_be_retried() {
        let transport = Scripted::new(vec![json(200, "{\"id\":1}"), json(200, "{\"id\":2}")]);
        let executor = Executor::builder(transport.clone())
            .retry_policy(retry_fn(|_: &RequestDescriptor, e: &HttpError, _: u32| {
                matches!(e, HttpError::Backend { .. })
            }))
            .build();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let tuners = Tuners::new().response(move |_: &Response| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(HttpError::Backend {
                    code: Some(9),
                    message: "busy".into(),
                })
            } else {
                Ok(())
            }
        });
        let item: Item = executor.execute(get(&executor), &tuners, None).await.unwrap();
        assert_eq!(item.id, 2);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_retry_backoff() {
        use crate::retry::{BackoffStrategy, MaxAttempts};
        use std::time::Duration;

        let transport = Scripted::new(vec![Err(HttpError::TransportFailure {
            code: crate::error::codes::TIMED_OUT,
            message: "timed out".into(),
        })]);
        let executor = Executor::builder(transport.clone())
            .retry_policy(MaxAttempts::new(5).with_backoff(BackoffStrategy::Fixed(Duration::from_secs(60))))
            .build();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result: Result<Item, _> = executor
            .execute(get(&executor), &Tuners::default(), Some(&token))
            .await;

        assert_eq!(result, Err(HttpError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch() {
        let transport = Scripted::new(vec![json(200, "{\"id\":1}")]);
        let executor = Executor::builder(transport.clone())
            .retry_policy(retry_fn(|_: &RequestDescriptor, _: &HttpError, _: u32| {
                panic!("policy must not be consulted")
            }))
            .build();
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<Item, _> = executor
            .execute(get(&executor), &Tuners::default(), Some(&token))
            .await;
        assert_eq!(result, Err(HttpError::Cancelled));
    }
}
