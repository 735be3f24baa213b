//! HTTP mocking for the plugin catalog and module manifests.
//!
//! Requests are matched against glob patterns and recorded for verification.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, VistaError};
use crate::plugin::{BoxFuture, HttpFetch};

/// Mock [`HttpFetch`] implementation.
///
/// ```ignore
/// let http = MockHttp::builder()
///     .mock_json("/api/v1/plugins", json!([]))
///     .build();
/// http.get_json("/api/v1/plugins").await?;
/// http.assert_called("/api/v1/plugins");
/// ```
#[derive(Clone, Default)]
pub struct MockHttp {
    mocks: Arc<RwLock<Vec<MockHandler>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

/// Type alias for mock handler closure.
pub type BoxedHandler = Box<dyn Fn(&MockRequest) -> MockResponse + Send + Sync>;

struct MockHandler {
    pattern: String,
    handler: Arc<dyn Fn(&MockRequest) -> MockResponse + Send + Sync>,
}

/// A recorded request for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
}

/// Request handed to a mock handler.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub url: String,
}

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockBody {
    Json(Value),
    /// A body that fails to decode as JSON.
    Raw(String),
    /// The request never reaches a server.
    TransportError(String),
}

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: MockBody,
}

impl MockResponse {
    /// Create a successful JSON response.
    pub fn json<T: Serialize>(body: T) -> Self {
        Self {
            status: 200,
            body: MockBody::Json(serde_json::to_value(body).unwrap_or(Value::Null)),
        }
    }

    /// A 200 response whose body is not valid JSON.
    pub fn invalid_json(body: &str) -> Self {
        Self {
            status: 200,
            body: MockBody::Raw(body.to_string()),
        }
    }

    /// Create an error response.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: MockBody::Json(serde_json::json!({ "error": message })),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::error(500, message)
    }

    /// Simulate a connection failure.
    pub fn transport_error(message: &str) -> Self {
        Self {
            status: 0,
            body: MockBody::TransportError(message.to_string()),
        }
    }

    fn into_result(self, url: &str) -> Result<Value> {
        match self.body {
            MockBody::TransportError(message) => Err(VistaError::Transport(message)),
            _ if !(200..300).contains(&self.status) => Err(VistaError::Transport(format!(
                "HTTP {} for {}",
                self.status, url
            ))),
            MockBody::Json(value) => Ok(value),
            MockBody::Raw(raw) => serde_json::from_str(&raw).map_err(VistaError::from),
        }
    }
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MockHttpBuilder {
        MockHttpBuilder::new()
    }

    /// Add a mock handler; the first matching pattern wins.
    pub fn add_mock<F>(&self, pattern: &str, handler: F)
    where
        F: Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.add_mock_boxed(pattern, Box::new(handler));
    }

    pub fn add_mock_boxed(&self, pattern: &str, handler: BoxedHandler) {
        self.mocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockHandler {
                pattern: pattern.to_string(),
                handler: Arc::from(handler),
            });
    }

    /// Record `request` and produce the matching mock response.
    pub fn execute(&self, request: MockRequest) -> MockResponse {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                method: request.method.clone(),
                url: request.url.clone(),
            });

        let mocks = self.mocks.read().unwrap_or_else(PoisonError::into_inner);
        mocks
            .iter()
            .find(|mock| matches_pattern(&request.url, &mock.pattern))
            .map(|mock| (mock.handler)(&request))
            .unwrap_or_else(|| MockResponse::not_found(&format!("No mock found for {}", request.url)))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded URLs, in call order.
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn requests_to(&self, pattern: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| matches_pattern(&r.url, pattern))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Assert that a URL pattern was called.
    pub fn assert_called(&self, pattern: &str) {
        let requests = self.requests();
        assert!(
            requests.iter().any(|r| matches_pattern(&r.url, pattern)),
            "Expected HTTP call matching '{}', but none found. Recorded requests: {:?}",
            pattern,
            requests.iter().map(|r| &r.url).collect::<Vec<_>>()
        );
    }

    /// Assert that a URL pattern was called a specific number of times.
    pub fn assert_called_times(&self, pattern: &str, expected: usize) {
        let matching = self.requests_to(pattern).len();
        assert_eq!(
            matching, expected,
            "Expected {} HTTP calls matching '{}', but found {}",
            expected, pattern, matching
        );
    }

    /// Assert that a URL pattern was not called.
    pub fn assert_not_called(&self, pattern: &str) {
        self.assert_called_times(pattern, 0);
    }
}

impl HttpFetch for MockHttp {
    fn get_json<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let response = self.execute(MockRequest {
                method: "GET".to_string(),
                url: url.to_string(),
            });
            response.into_result(url)
        })
    }
}

/// Glob match where `*` spans any run of characters.
fn matches_pattern(url: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return url == pattern;
    }

    let mut remaining = url;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match remaining.strip_prefix(part) {
                Some(rest) => remaining = rest,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return remaining.ends_with(part);
        } else {
            match remaining.find(part) {
                Some(pos) => remaining = &remaining[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Builder for MockHttp.
#[derive(Default)]
pub struct MockHttpBuilder {
    mocks: Vec<(String, BoxedHandler)>,
}

impl MockHttpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mock with a custom handler.
    pub fn mock<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.mocks.push((pattern.to_string(), Box::new(handler)));
        self
    }

    /// Add a mock that returns a JSON response.
    pub fn mock_json<T: Serialize + Clone + Send + Sync + 'static>(
        self,
        pattern: &str,
        response: T,
    ) -> Self {
        self.mock(pattern, move |_| MockResponse::json(response.clone()))
    }

    /// Add a mock whose requests fail before reaching a server.
    pub fn mock_transport_error(self, pattern: &str, message: &str) -> Self {
        let message = message.to_string();
        self.mock(pattern, move |_| MockResponse::transport_error(&message))
    }

    pub fn build(self) -> MockHttp {
        let mock = MockHttp::new();
        for (pattern, handler) in self.mocks {
            mock.add_mock_boxed(&pattern, handler);
        }
        mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pattern_matching() {
        assert!(matches_pattern("/api/v1/plugins", "/api/v1/plugins"));
        assert!(matches_pattern(
            "https://example.com/plugins/m/mf-manifest.json",
            "https://example.com/*"
        ));
        assert!(matches_pattern(
            "/plugins/m/mf-manifest.json",
            "/plugins/*/mf-manifest.json"
        ));
        assert!(matches_pattern("/plugins/m/mf-manifest.json", "*mf-manifest.json"));
        assert!(!matches_pattern("/api/v1/plugins", "/plugins/*"));
        assert!(!matches_pattern("/api/v1/plugins/x", "/api/v1/plugins"));
    }

    #[tokio::test]
    async fn test_json_response() {
        let http = MockHttp::builder()
            .mock_json("/api/v1/plugins", json!([{ "kind": "PluginModule" }]))
            .build();

        let body = http.get_json("/api/v1/plugins").await.unwrap();
        assert_eq!(body[0]["kind"], "PluginModule");
        http.assert_called_times("/api/v1/plugins", 1);
        assert_eq!(http.requests()[0].method, "GET");
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let http = MockHttp::builder()
            .mock_transport_error("/down", "connection refused")
            .mock("/garbage", |_| MockResponse::invalid_json("<html>"))
            .mock("/error", |_| MockResponse::internal_error("boom"))
            .build();

        assert!(matches!(
            http.get_json("/down").await,
            Err(VistaError::Transport(m)) if m == "connection refused"
        ));
        assert!(matches!(
            http.get_json("/garbage").await,
            Err(VistaError::Deserialization(_))
        ));
        assert!(matches!(
            http.get_json("/error").await,
            Err(VistaError::Transport(m)) if m == "HTTP 500 for /error"
        ));
        assert!(matches!(
            http.get_json("/unmocked").await,
            Err(VistaError::Transport(_))
        ));
        http.assert_not_called("/api/*");
        assert_eq!(http.urls(), vec!["/down", "/garbage", "/error", "/unmocked"]);
    }
}
