use crate::fetch::FetchBinding;
use crate::fetch_mock::FetchMock;
use crate::mock_fn::MockFunction;
use crate::request::{BodyPrintLimit, RequestInfo, RequestInit, BODY_PRINT_LIMIT};
use crate::response::ResponseType;
use crate::validator::ArrayMatching;
use std::env;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// A callback invoked with every fetch call no mock accepted.
pub type FallbackHandler = Arc<dyn Fn(&FallbackContext<'_>) + Send + Sync>;

/// What a [`FallbackHandler`] gets to look at: the session configuration and the call,
/// exactly as it was made.
#[derive(Debug)]
pub struct FallbackContext<'a> {
    pub config: &'a FetchMockConfig,
    pub input: &'a RequestInfo,
    pub init: Option<&'a RequestInit>,
}

/// Session-wide settings of a [`FetchMock`], fixed when the session starts.
#[derive(Debug, Clone)]
pub struct FetchMockConfig {
    /// Let unmatched calls through to the [`Fetch`] that was bound before the session started.
    ///
    /// [`Fetch`]: crate::Fetch
    pub fallback_to_network: bool,
    /// Log a warning for every call let through to the network.
    pub warn_on_fallback: bool,
    /// How response bodies are encoded when the mock does not say otherwise.
    pub response_type: ResponseType,
    pub array_matching: ArrayMatching,
    pub body_print_limit: BodyPrintLimit,
}

impl Default for FetchMockConfig {
    fn default() -> Self {
        let body_print_limit = match env::var("FETCHMOCK_BODY_PRINT_LIMIT")
            .ok()
            .and_then(|x| x.parse::<usize>().ok())
        {
            Some(limit) => BodyPrintLimit::Limited(limit),
            None => BodyPrintLimit::Limited(BODY_PRINT_LIMIT),
        };
        Self {
            fallback_to_network: false,
            warn_on_fallback: false,
            response_type: ResponseType::default(),
            array_matching: ArrayMatching::default(),
            body_print_limit,
        }
    }
}

/// A builder providing a fluent API to assemble a [`FetchMock`] step-by-step.
/// Use [`FetchMock::builder`] to get started.
pub struct FetchMockBuilder {
    config: FetchMockConfig,
    fallback_handler: Option<FallbackHandler>,
}

impl FetchMockBuilder {
    pub(super) fn new() -> Self {
        Self {
            config: FetchMockConfig::default(),
            fallback_handler: None,
        }
    }

    /// Invoke `handler` with every call no mock accepted, before it is let through to the
    /// network or rejected. Handy to find out why a mock did not match.
    ///
    /// ### Example:
    /// ```rust
    /// use fetchmock::{FetchBinding, FetchMock, MockFn};
    /// use std::sync::{Arc, Mutex};
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     // Arrange
    ///     let binding = Arc::new(FetchBinding::default());
    ///     let unmatched = Arc::new(Mutex::new(vec![]));
    ///     let unmatched_clone = unmatched.clone();
    ///     let fetch_mock = FetchMock::builder()
    ///         .fallback_handler(move |context| {
    ///             unmatched_clone.lock().unwrap().push(format!("{:?}", context.input));
    ///         })
    ///         .start(&binding, Arc::new(MockFn::new()));
    ///     fetch_mock.mock_get("/alpha", 200, None);
    ///
    ///     // Act
    ///     let outcome = binding.fetch("/bravo", None).await;
    ///
    ///     // Assert
    ///     assert!(outcome.is_err());
    ///     assert_eq!(unmatched.lock().unwrap().len(), 1);
    /// }
    /// ```
    pub fn fallback_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&FallbackContext<'_>) + Send + Sync + 'static,
    {
        self.fallback_handler = Some(Arc::new(handler));
        self
    }

    /// By default, calls no mock accepted fail with [`Error::UnmatchedRequest`].
    ///
    /// With `fallback_to_network(true)` they are performed by the [`Fetch`] that was bound
    /// before the session started.
    ///
    /// [`Error::UnmatchedRequest`]: crate::Error::UnmatchedRequest
    /// [`Fetch`]: crate::Fetch
    pub fn fallback_to_network(mut self, enabled: bool) -> Self {
        self.config.fallback_to_network = enabled;
        self
    }

    pub fn warn_on_fallback(mut self, enabled: bool) -> Self {
        self.config.warn_on_fallback = enabled;
        self
    }

    /// The default encoding of response bodies. [`ResponseType::Json`] if left unset.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.config.response_type = response_type;
        self
    }

    pub fn array_matching(mut self, array_matching: ArrayMatching) -> Self {
        self.config.array_matching = array_matching;
        self
    }

    /// Request bodies are printed when an unmatched call is logged. Large bodies are truncated
    /// to `FETCHMOCK_BODY_PRINT_LIMIT` bytes (10 000 if the variable is unset or invalid):
    /// use this method to pick a different limit.
    pub fn body_print_limit(mut self, limit: BodyPrintLimit) -> Self {
        self.config.body_print_limit = limit;
        self
    }

    /// Finalise the builder: `binding` is pointed at `mock_fn` for the lifetime of the
    /// returned session.
    pub fn start(self, binding: &Arc<FetchBinding>, mock_fn: Arc<dyn MockFunction>) -> FetchMock {
        FetchMock::new(binding, mock_fn, self.config, self.fallback_handler)
    }
}

impl Debug for FetchMockBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchMockBuilder")
            .field("config", &self.config)
            .field("fallback_handler", &self.fallback_handler.is_some())
            .finish()
    }
}
