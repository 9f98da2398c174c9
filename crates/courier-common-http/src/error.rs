//! HTTP pipeline errors.

use serde_json::Error as JsonError;

/// Transport failure codes, mirroring platform URL error codes.
pub mod codes {
    /// Unclassified transport failure.
    pub const UNKNOWN: i32 = -1;
    /// The request timed out.
    pub const TIMED_OUT: i32 = -1001;
    /// The host could not be reached.
    pub const CANNOT_CONNECT: i32 = -1004;
    /// The response could not be read.
    pub const BAD_SERVER_RESPONSE: i32 = -1011;
}

/// Status code reported for [`HttpError::EmptyResponse`].
pub const EMPTY_RESPONSE_CODE: i32 = 204;

/// Maximum number of body bytes kept on errors for diagnostics.
pub const BODY_SNIPPET_LIMIT: usize = 512;

/// HTTP errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The descriptor could not be turned into a request, e.g. an invalid header name.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport failure ({code}): {message}")]
    TransportFailure { code: i32, message: String },

    #[error("empty response body")]
    EmptyResponse,

    #[error("HTTP status {code}")]
    HttpStatus { code: u16, body: String },

    #[error("unexpected content type: {}", content_type.as_deref().unwrap_or("<none>"))]
    UnexpectedContentType { content_type: Option<String> },

    #[error("backend error{}: {message}", code.map(|c| format!(" ({c})")).unwrap_or_default())]
    Backend { code: Option<i32>, message: String },

    #[error("failed to decode response at line {line} column {column}: {detail}")]
    Decode {
        line: usize,
        column: usize,
        detail: String,
        body: String,
    },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl HttpError {
    /// Build a decode error from a JSON failure and the offending body.
    pub fn decode(source: &JsonError, body: &[u8]) -> Self {
        HttpError::Decode {
            line: source.line(),
            column: source.column(),
            detail: source.to_string(),
            body: body_snippet(body),
        }
    }

    /// Build an HTTP status error, keeping a snippet of the body.
    pub fn status(code: u16, body: &[u8]) -> Self {
        HttpError::HttpStatus {
            code,
            body: body_snippet(body),
        }
    }

    /// Whether the retry policy gets a say. Malformed requests, malformed
    /// payloads and cancellations are always final.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(
            self,
            HttpError::TransportFailure { .. }
                | HttpError::EmptyResponse
                | HttpError::HttpStatus { .. }
                | HttpError::UnexpectedContentType { .. }
                | HttpError::Backend { .. }
        )
    }

    /// Numeric code carried by the error, if any.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            HttpError::EmptyResponse => Some(EMPTY_RESPONSE_CODE),
            HttpError::HttpStatus { code, .. } => Some(i32::from(*code)),
            HttpError::TransportFailure { code, .. } => Some(*code),
            HttpError::Backend { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether a call that expects no payload should swallow this error.
    ///
    /// Every code in `[0, 400)` is tolerated, which is deliberately wide:
    /// informational and redirect codes are swallowed too.
    pub fn is_tolerated_without_body(&self) -> bool {
        self.status_code()
            .map_or(false, |code| (0..400).contains(&code))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            return match e.url() {
                Some(url) => HttpError::InvalidUrl(format!("{url}: {e}")),
                None => HttpError::InvalidRequest(e.to_string()),
            };
        }
        let code = if e.is_timeout() {
            codes::TIMED_OUT
        } else if e.is_connect() {
            codes::CANNOT_CONNECT
        } else if e.is_body() || e.is_decode() {
            codes::BAD_SERVER_RESPONSE
        } else {
            codes::UNKNOWN
        };
        HttpError::TransportFailure {
            code,
            message: e.to_string(),
        }
    }
}

/// Lossy UTF-8 rendering of at most [`BODY_SNIPPET_LIMIT`] bytes.
pub fn body_snippet(body: &[u8]) -> String {
    let end = body.len().min(BODY_SNIPPET_LIMIT);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
