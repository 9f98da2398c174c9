//! The seam between the pipeline and the network.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::HttpError;
use crate::request::RequestDescriptor;
use crate::response::Response;

/// Sends one request and buffers the whole response.
///
/// Any HTTP status is a successful send; only failures to obtain a
/// response are errors, reported as [`HttpError::TransportFailure`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, HttpError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, HttpError> {
        (**self).send(request).await
    }
}
