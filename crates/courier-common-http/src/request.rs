//! HTTP request types and builders.

use bytes::Bytes;
use courier_common_core::query::{QueryParameters, ToQueryParameters};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::HttpError;
use crate::tuners::Tuners;

/// Common HTTP headers.
pub mod headers {
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const ACCEPT: &str = "Accept";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CONTENT_TYPE_JSON: &str = "application/json";
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// A fully formed outbound request.
///
/// `url` holds the address without the managed parameters; `query` is
/// rendered onto it, sorted by key, when the request is dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub query: QueryParameters,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: QueryParameters::new(),
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Set a header, replacing any existing header with the same name in any case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The dispatch URL: existing query pairs first, then the sorted parameters.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in self.query.sorted() {
                pairs.append_pair(name, &value);
            }
        }
        url
    }
}

/// Builds [`RequestDescriptor`]s against an optional base URL.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    headers: BTreeMap<String, String>,
    base_url: Option<Url>,
}

impl RequestBuilder {
    /// Create a new request builder that asks for JSON responses.
    pub fn new() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(headers::ACCEPT.to_string(), headers::CONTENT_TYPE_JSON.to_string());
        Self {
            headers,
            base_url: None,
        }
    }

    /// Set the base URL that relative request URLs are joined onto.
    pub fn base_url(mut self, url: &str) -> Result<Self, HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    /// Add a default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Add bearer token authorization.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        self.header(headers::AUTHORIZATION, format!("Bearer {}", token.as_ref()))
    }

    /// Get the default headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Resolve `url` to an absolute URL.
    pub fn url(&self, url: &str) -> Result<Url, HttpError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(url)
                    .map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}"))),
                None => Err(HttpError::InvalidUrl(format!("{url}: no scheme and no base URL"))),
            },
            Err(e) => Err(HttpError::InvalidUrl(format!("{url}: {e}"))),
        }
    }

    /// Build a request. The request tuner runs last and may override anything.
    pub fn build(
        &self,
        method: Method,
        url: &str,
        parameters: &impl ToQueryParameters,
        body: Option<Bytes>,
        tuners: &Tuners,
    ) -> Result<RequestDescriptor, HttpError> {
        let mut request = RequestDescriptor::new(method, self.url(url)?);
        request.query = parameters.to_query_parameters();
        request.headers = self.headers.clone();

        if let Some(body) = body {
            request.set_header(headers::CONTENT_TYPE, headers::CONTENT_TYPE_JSON);
            request.body = Some(body);
        }

        tuners.tune_request(&mut request);
        Ok(request)
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
