//! Testing utilities for vista hosts and plugins.
//!
//! - [`MockHttp`]: scripted HTTP responses for the plugin catalog and manifests
//! - [`MockModuleHost`]: scripted remote module loads
//! - assertion macros (`assert_ok!`, `assert_err!`, `assert_err_variant!`)
//! - plugin catalog fixtures
//!
//! ```ignore
//! use vista_core::testing::*;
//!
//! #[tokio::test]
//! async fn test_catalog() {
//!     let http = MockHttp::builder()
//!         .mock_json("/api/v1/plugins", mixed_validity_catalog())
//!         .build();
//!     http.get_json("/api/v1/plugins").await?;
//!     http.assert_called("/api/v1/plugins");
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_host;
pub mod mock_http;

pub use assertions::*;
pub use fixtures::*;
pub use mock_host::{HostCall, MockLoad, MockModuleHost};
pub use mock_http::{MockBody, MockHttp, MockHttpBuilder, MockRequest, MockResponse, RecordedRequest};
