//! Typed JSON request/response pipeline.
//!
//! A call is built into a [`RequestDescriptor`], dispatched through a
//! [`Transport`], checked by a [`ResponseValidator`], retried at the
//! discretion of a [`RetryPolicy`], and decoded with lenient timestamp
//! handling. [`JsonClient`] wraps the pipeline in one method per verb.

pub mod client;
pub mod codec;
pub mod error;
pub mod executor;
pub mod json_client;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod tuners;
pub mod validator;

pub use client::{build_client, HttpConfig, ReqwestTransport};
pub use codec::{JsonDecoder, JsonEncoder};
pub use error::{codes, HttpError};
pub use executor::{Executor, ExecutorBuilder};
pub use json_client::{CallSpec, JsonClient, JsonClientBuilder};
pub use request::{headers, Method, RequestBuilder, RequestDescriptor};
pub use response::{Empty, NoBody, Response};
pub use retry::{retry_fn, BackoffStrategy, MaxAttempts, NeverRetry, RetryFn, RetryPolicy};
pub use transport::Transport;
pub use tuners::Tuners;
pub use validator::{DefaultValidator, ResponseValidator};

pub use tokio_util::sync::CancellationToken;
