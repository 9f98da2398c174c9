//! Test utilities for Courier crates.

use async_trait::async_trait;
use courier_common_http::{codes, HttpError, RequestDescriptor, Response, Transport};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a project directory holding `.courier/config.yaml`.
pub fn temp_project(config_yaml: &str) -> TempDir {
    let dir = temp_dir();
    let config_dir = dir.path().join(".courier");
    std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    std::fs::write(config_dir.join("config.yaml"), config_yaml).expect("Failed to write config");
    dir
}

/// A `application/json` response.
pub fn json_response(status: u16, body: impl Into<String>) -> Response {
    Response::new(status)
        .with_header("content-type", "application/json")
        .with_body(body.into())
}

/// A response with an explicit content type.
pub fn text_response(status: u16, content_type: &str, body: impl Into<String>) -> Response {
    Response::new(status)
        .with_header("content-type", content_type)
        .with_body(body.into())
}

/// A transport failure such as a timeout.
pub fn transport_failure(code: i32) -> HttpError {
    HttpError::TransportFailure {
        code,
        message: format!("scripted transport failure {code}"),
    }
}

/// A [`Transport`] that replays scripted outcomes and records every request.
///
/// Outcomes are consumed in order. Once exhausted, the fallback set with
/// [`MockTransport::otherwise`] is repeated; without one, dispatch fails
/// with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Response, HttpError>>>,
    fallback: Option<Result<Response, HttpError>>,
    requests: Mutex<Vec<RequestDescriptor>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn respond(self, response: Response) -> Self {
        self.then(Ok(response))
    }

    /// Queue a failure.
    pub fn fail(self, error: HttpError) -> Self {
        self.then(Err(error))
    }

    /// Queue an outcome.
    pub fn then(self, outcome: Result<Response, HttpError>) -> Self {
        self.replies
            .lock()
            .expect("mock transport lock poisoned")
            .push_back(outcome);
        self
    }

    /// Outcome repeated once the queue is empty.
    pub fn otherwise(mut self, outcome: Result<Response, HttpError>) -> Self {
        self.fallback = Some(outcome);
        self
    }

    /// Sleep before answering each dispatch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests dispatched so far, in order.
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.requests.lock().expect("mock transport lock poisoned").len()
    }

    pub fn last_request(&self) -> Option<RequestDescriptor> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, HttpError> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .replies
            .lock()
            .expect("mock transport lock poisoned")
            .pop_front();
        scripted
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| {
                Err(HttpError::TransportFailure {
                    code: codes::UNKNOWN,
                    message: "mock transport has no scripted reply".to_string(),
                })
            })
    }
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_common_http::Method;
    use proptest::prelude::*;

    fn request(path: &str) -> RequestDescriptor {
        let url = url::Url::parse("https://api.example.com/").unwrap().join(path).unwrap();
        RequestDescriptor::new(Method::Get, url)
    }

    #[test]
    fn test_temp_project_layout() {
        let dir = temp_project("client: {}\n");
        assert!(dir.path().join(".courier/config.yaml").is_file());
    }

    #[test]
    fn test_response_helpers() {
        let response = json_response(201, "{}");
        assert_eq!(response.status, 201);
        assert_eq!(response.content_type(), Some("application/json"));

        let html = text_response(200, "text/html", "<p/>");
        assert_eq!(html.content_type(), Some("text/html"));
        assert_eq!(&html.body[..], b"<p/>");
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_then_falls_back() {
        let mock = MockTransport::new()
            .respond(json_response(500, "{}"))
            .fail(transport_failure(codes::TIMED_OUT))
            .otherwise(Ok(json_response(200, "[]")));

        assert_eq!(mock.send(&request("a")).await.unwrap().status, 500);
        assert_eq!(
            mock.send(&request("b")).await.unwrap_err().status_code(),
            Some(codes::TIMED_OUT)
        );
        assert_eq!(mock.send(&request("c")).await.unwrap().status, 200);
        assert_eq!(mock.send(&request("d")).await.unwrap().status, 200);

        assert_eq!(mock.dispatch_count(), 4);
        let paths: Vec<String> = mock.requests().iter().map(|r| r.url.path().to_string()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c", "/d"]);
        assert_eq!(mock.last_request().map(|r| r.url.path().to_string()), Some("/d".into()));
    }

    #[tokio::test]
    async fn test_mock_without_script_fails() {
        let error = assert_err!(MockTransport::new().send(&request("x")).await);
        assert!(matches!(error, HttpError::TransportFailure { code: codes::UNKNOWN, .. }));
    }

    #[test]
    fn test_assert_ok_returns_value() {
        let value: Result<u8, String> = Ok(3);
        assert_eq!(assert_ok!(value), 3);
    }

    proptest! {
        #[test]
        fn test_mock_replays_any_script_in_order(statuses in proptest::collection::vec(100u16..600, 0..8)) {
            let mock = statuses
                .iter()
                .fold(MockTransport::new(), |mock, status| mock.respond(Response::new(*status)));
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let replayed: Vec<u16> = runtime.block_on(async {
                let mut replayed = Vec::new();
                for _ in &statuses {
                    replayed.push(mock.send(&request("p")).await.unwrap().status);
                }
                replayed
            });
            prop_assert_eq!(&replayed, &statuses);
            prop_assert_eq!(mock.dispatch_count(), statuses.len());
        }
    }
}
