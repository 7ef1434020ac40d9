use std::string::FromUtf8Error;

/// Everything that can go wrong when a mocked fetch call is dispatched or when the body of a
/// [`FetchResponse`] is read back.
///
/// [`FetchResponse`]: crate::FetchResponse
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// None of the mounted mocks accepted the request and falling back to the network
    /// is disabled.
    #[error("fetch mock: the request was not covered by any of the matchers ({method} {url})")]
    UnmatchedRequest { method: String, url: String },
    /// The mock function was invoked while no implementation was installed on it.
    #[error("fetch mock: the mock function has no implementation installed")]
    NoImplementation,
    /// The fetch implementation behind the binding failed to perform the request.
    #[error("network request failed: {0}")]
    Network(String),
    #[error("failed to parse the response body as JSON")]
    Json(#[from] serde_json::Error),
    #[error("the response body is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
    #[error("the response body could not be parsed as form data")]
    FormData,
}
