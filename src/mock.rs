use crate::matchers::Matcher;
use crate::response::ResponseType;
use crate::response_template::ResponseTemplate;
use crate::FetchMock;
use std::time::Duration;

/// Per-mock knobs: how long to wait before responding, how to encode the response body and
/// how many matching calls the mock should serve.
///
/// ```rust
/// use fetchmock::{MockOptions, ResponseType};
/// use std::time::Duration;
///
/// let options = MockOptions::new()
///     .delay(Duration::from_millis(50))
///     .response_type(ResponseType::Text)
///     .times(2);
/// # let _ = options;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    pub(crate) delay: Option<Duration>,
    pub(crate) response_type: Option<ResponseType>,
    // Maximum number of times (inclusive) we should return a response from this Mock on
    // matching requests.
    // If `None`, there is no cap and we will respond to all incoming matching requests.
    pub(crate) times: Option<u64>,
}

impl MockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Introduce an artificial delay before the response is handed back, to simulate a
    /// server with a non-negligible latency.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Overrides the default response type of the [`FetchMock`] for this mock.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Serve at most `n` matching calls: the mock is then evicted.
    ///
    /// Panics if `n` is 0.
    pub fn times(mut self, n: u64) -> Self {
        assert!(n > 0, "n must be strictly greater than 0!");
        self.times = Some(n);
        self
    }
}

/// Given a [`Matcher`], a `Mock` describes the response to synthesize in place of the
/// network call.
///
/// `Mock` is the long-hand form of the `mock_*` methods on [`FetchMock`]:
///
/// ```rust
/// use fetchmock::{FetchBinding, FetchMock, Mock, MockFn, ResponseTemplate};
/// use fetchmock::matchers::url;
/// use std::sync::Arc;
///
/// #[async_std::main]
/// async fn main() {
///     let binding = Arc::new(FetchBinding::default());
///     let fetch_mock = FetchMock::start(&binding, Arc::new(MockFn::new()));
///
///     Mock::given(url("/alpha").method("GET"))
///         .respond_with(ResponseTemplate::new(200).set_body("Hello world!"))
///         .up_to_n_times(1)
///         .mount(&fetch_mock);
///
///     let response = binding.fetch("/alpha", None).await.unwrap();
///     assert_eq!(response.json::<String>().unwrap(), "Hello world!");
///     assert!(binding.fetch("/alpha", None).await.is_err());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Mock {
    pub(crate) matcher: Matcher,
    pub(crate) response: ResponseTemplate,
    pub(crate) options: MockOptions,
}

/// A fluent builder to construct a [`Mock`] instance given a [`Matcher`].
#[derive(Debug)]
pub struct MockBuilder {
    pub(crate) matcher: Matcher,
}

impl Mock {
    /// Start building a [`Mock`] specifying the calls it should match.
    pub fn given<M: Into<Matcher>>(matcher: M) -> MockBuilder {
        MockBuilder {
            matcher: matcher.into(),
        }
    }

    pub(crate) fn new(matcher: Matcher, response: ResponseTemplate, options: MockOptions) -> Self {
        Self {
            matcher,
            response,
            options,
        }
    }

    /// Specify an upper limit to the number of times you would like this [`Mock`] to respond
    /// to matching calls. Once reached, the mock is removed from the [`FetchMock`].
    ///
    /// Panics if `n` is 0.
    pub fn up_to_n_times(mut self, n: u64) -> Mock {
        self.options = self.options.times(n);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Mock {
        self.options = self.options.delay(delay);
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Mock {
        self.options = self.options.response_type(response_type);
        self
    }

    /// Mount a [`Mock`] on a [`FetchMock`]. Same as [`FetchMock::register`].
    pub fn mount(self, fetch_mock: &FetchMock) {
        fetch_mock.register(self);
    }
}

impl MockBuilder {
    /// Finalise the builder with the response to synthesize on matching calls.
    pub fn respond_with<T: Into<ResponseTemplate>>(self, template: T) -> Mock {
        Mock::new(self.matcher, template.into(), MockOptions::default())
    }
}
