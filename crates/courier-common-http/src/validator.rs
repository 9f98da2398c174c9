//! Response validation.

use crate::error::HttpError;
use crate::request::headers::CONTENT_TYPE_JSON;
use crate::response::Response;

/// Decides whether a response may be decoded.
///
/// A configured validator replaces [`DefaultValidator`] entirely.
pub trait ResponseValidator: Send + Sync {
    fn validate(&self, response: &Response) -> Result<(), HttpError>;
}

/// Accepts non-empty JSON responses with a status below 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl ResponseValidator for DefaultValidator {
    fn validate(&self, response: &Response) -> Result<(), HttpError> {
        // Status first, so an empty 5xx is not mistaken for a tolerable empty body.
        if response.is_error() {
            return Err(HttpError::status(response.status, &response.body));
        }
        if response.body.is_empty() {
            return Err(HttpError::EmptyResponse);
        }
        if response.media_type().as_deref() != Some(CONTENT_TYPE_JSON) {
            return Err(HttpError::UnexpectedContentType {
                content_type: response.content_type().map(str::to_string),
            });
        }
        Ok(())
    }
}

impl<F> ResponseValidator for F
where
    F: Fn(&Response) -> Result<(), HttpError> + Send + Sync,
{
    fn validate(&self, response: &Response) -> Result<(), HttpError> {
        self(response)
    }
}
