#![allow(clippy::needless_doctest_main)]
//! `fetchmock` intercepts fetch calls in tests, matching them against declarative mocks and
//! synthesizing responses in place of the network.
//!
//! It provides request matching (on url, method, headers and body) and response templating.
//!
//! # Table of Contents
//! 1. [Getting started](#getting-started)
//! 2. [Matchers](#matchers)
//! 3. [Responses](#responses)
//! 4. [Unmatched calls](#unmatched-calls)
//! 5. [Test isolation](#test-isolation)
//! 6. [Runtime compatibility](#runtime-compatibility)
//!
//! ## Getting started
//! ```rust
//! use fetchmock::{FetchBinding, FetchMock, MockFn, RequestInit};
//! use fetchmock::matchers::{url, Pattern};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[async_std::main]
//! async fn main() {
//!     // The code under test performs its fetch calls through a binding.
//!     let binding = Arc::new(FetchBinding::default());
//!
//!     // Starting a session points the binding at a mock function.
//!     let fetch_mock = FetchMock::start(&binding, Arc::new(MockFn::new()));
//!
//!     // Arrange the behaviour of the session:
//!     // a GET on '/hello' gets a JSON greeting back...
//!     fetch_mock.mock_get("/hello", json!({ "greeting": "Hello world!" }), None);
//!     // ...a POST on '/orders' with the right body gets a 201, once.
//!     fetch_mock.mock_post_once(
//!         url("/orders").and_body(Pattern::object([("sku", "alpha")])),
//!         201,
//!         None,
//!     );
//!
//!     let response = binding.fetch("/hello", None).await.unwrap();
//!     assert_eq!(response.json::<serde_json::Value>().unwrap()["greeting"], "Hello world!");
//!
//!     let init = RequestInit::new()
//!         .method("POST")
//!         .body(json!({ "sku": "alpha", "quantity": 2 }));
//!     let response = binding.fetch("/orders", Some(init)).await.unwrap();
//!     assert_eq!(response.status(), 201);
//!
//!     // If no mock accepts the call, it fails.
//!     assert!(binding.fetch("/missing", None).await.is_err());
//! }
//! ```
//!
//! ## Matchers
//!
//! A string matcher compares the url of the call: `*` accepts any url, `*suffix` urls ending
//! with `suffix`, `prefix*` urls starting with `prefix`, `/source/flags` is a regular expression
//! and anything else must be equal to the url.
//!
//! Structured matchers, built with the functions in the [`matchers`] module, constrain the
//! method, the headers and the body of the call as well. Bodies are matched as a subset: the
//! request can carry fields the matcher does not mention.
//!
//! Use [`matchers::function`] to look at the raw arguments of the call instead.
//!
//! ## Responses
//!
//! A bare status code, a string or a JSON value can be used in place of a full
//! [`ResponseTemplate`]. Bodies are encoded according to the [`ResponseType`] of the mock, or of
//! the session if the mock does not specify one.
//!
//! ## Unmatched calls
//!
//! Calls no mock accepted fail with [`Error::UnmatchedRequest`] by default. Check
//! [`FetchMockBuilder`] to let them through to the network or inspect them with a fallback
//! handler.
//!
//! ## Test isolation
//!
//! Each [`FetchMock`] owns its mocks: use one binding and one session per test to ensure no
//! cross-test interference. [`FetchMock::restore`] binds back the previous fetch implementation.
//!
//! ## Runtime compatibility
//!
//! `fetchmock` does not spawn tasks nor does it rely on a runtime-specific timer: it can be used
//! (and it is tested to work) with both [`async_std`] and [`tokio`] as futures runtimes.
//!
//! [`async_std`]: https://docs.rs/async-std/
//! [`tokio`]: https://docs.rs/tokio/
mod error;
mod fetch;
mod fetch_mock;
pub mod matchers;
mod mock;
mod mock_fn;
mod mock_set;
mod mounted_mock;
mod request;
mod response;
mod response_template;
mod validator;

pub use error::Error;
pub use fetch::{Fetch, FetchBinding, OfflineFetch};
pub use fetch_mock::{FallbackContext, FallbackHandler, FetchMock, FetchMockBuilder, FetchMockConfig};
pub use mock::{Mock, MockBuilder, MockOptions};
pub use mock_fn::{Call, Implementation, MockFn, MockFunction, ResetHook};
pub use request::{Body, BodyPrintLimit, HeadersInit, Request, RequestBody, RequestInfo, RequestInit};
pub use response::{Blob, FetchResponse, FormData, ResponseType};
pub use response_template::ResponseTemplate;
pub use validator::ArrayMatching;
