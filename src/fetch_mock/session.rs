use crate::fetch::{Fetch, FetchBinding};
use crate::fetch_mock::builder::{FallbackHandler, FetchMockBuilder, FetchMockConfig};
use crate::fetch_mock::dispatcher::Dispatcher;
use crate::matchers::Matcher;
use crate::mock::{Mock, MockOptions};
use crate::mock_fn::{Implementation, MockFunction};
use crate::mock_set::MountedMockSet;
use crate::request::{RequestInfo, RequestInit};
use crate::response::FetchResponse;
use crate::response_template::ResponseTemplate;
use crate::Error;
use async_trait::async_trait;
use futures::FutureExt;
use log::debug;
use std::sync::{Arc, RwLock};

/// A mocking session for the fetch calls going through a [`FetchBinding`].
///
/// Starting a session points the binding at a mock function; every call it receives is
/// matched against the mocks registered on the session, in registration order. The first
/// mock accepting the call synthesizes the response.
///
/// Each `FetchMock` owns its registry: sessions started on different bindings never see
/// each other's mocks.
///
/// ```rust
/// use fetchmock::{FetchBinding, FetchMock, MockFn};
/// use std::sync::Arc;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let binding = Arc::new(FetchBinding::default());
///     let fetch_mock = FetchMock::start(&binding, Arc::new(MockFn::new()));
///     fetch_mock
///         .mock_get("/alpha", "Hello world!", None)
///         .mock_post_once("/bravo", 201, None);
///
///     // Act
///     let alpha = binding.fetch("/alpha", None).await.unwrap();
///
///     // Assert
///     assert_eq!(alpha.json::<String>().unwrap(), "Hello world!");
///     assert_eq!(fetch_mock.active_mocks().len(), 2);
/// }
/// ```
pub struct FetchMock {
    binding: Arc<FetchBinding>,
    original: Arc<dyn Fetch>,
    mock_fn: Arc<dyn MockFunction>,
    mock_set: Arc<RwLock<MountedMockSet>>,
    config: Arc<FetchMockConfig>,
    fallback_handler: Option<FallbackHandler>,
}

impl FetchMock {
    /// Start a session with the default configuration.
    ///
    /// Use [`FetchMock::builder`] if you need to tune it.
    pub fn start(binding: &Arc<FetchBinding>, mock_fn: Arc<dyn MockFunction>) -> Self {
        Self::builder().start(binding, mock_fn)
    }

    /// Provide a [`FetchMockBuilder`] to customise the session before starting it.
    pub fn builder() -> FetchMockBuilder {
        FetchMockBuilder::new()
    }

    pub(super) fn new(
        binding: &Arc<FetchBinding>,
        mock_fn: Arc<dyn MockFunction>,
        config: FetchMockConfig,
        fallback_handler: Option<FallbackHandler>,
    ) -> Self {
        let original = binding.replace(Arc::new(MockedFetch {
            mock_fn: mock_fn.clone(),
        }));

        let mock_set = Arc::new(RwLock::new(MountedMockSet::new()));
        let reset_mock_set = mock_set.clone();
        mock_fn.on_reset(Box::new(move || {
            reset_mock_set.write().expect("Poisoned lock!").clear();
        }));

        Self {
            binding: binding.clone(),
            original,
            mock_fn,
            mock_set,
            config: Arc::new(config),
            fallback_handler,
        }
    }

    /// Register a [`Mock`] on the session.
    ///
    /// The first registration installs the dispatcher on the mock function. Registering again
    /// while an implementation is installed does not touch it.
    pub fn register(&self, mock: Mock) {
        if !self.mock_fn.has_implementation() {
            debug!("Installing the fetch mock dispatcher.");
            self.mock_fn.mock_implementation(self.implementation());
        }
        self.mock_set
            .write()
            .expect("Poisoned lock!")
            .register(mock, self.config.array_matching);
    }

    /// Mock every call accepted by `matcher`, whatever its method.
    ///
    /// `options` (or `None`) tunes the delay, the response type and the number of calls the
    /// mock serves.
    pub fn mock_request<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount(matcher.into(), response.into(), options.into(), false)
    }

    /// Like [`FetchMock::mock_request`], but the mock serves a single call.
    pub fn mock_request_once<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount(matcher.into(), response.into(), options.into(), true)
    }

    /// Mock the `GET` calls accepted by `matcher`.
    ///
    /// The method of a structured matcher is overridden; function matchers are taken as they
    /// are. Same for the other verb-specific methods.
    pub fn mock_get<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("get", matcher.into(), response.into(), options.into(), false)
    }

    pub fn mock_get_once<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("get", matcher.into(), response.into(), options.into(), true)
    }

    pub fn mock_post<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("post", matcher.into(), response.into(), options.into(), false)
    }

    pub fn mock_post_once<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("post", matcher.into(), response.into(), options.into(), true)
    }

    pub fn mock_put<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("put", matcher.into(), response.into(), options.into(), false)
    }

    pub fn mock_put_once<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("put", matcher.into(), response.into(), options.into(), true)
    }

    pub fn mock_delete<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("delete", matcher.into(), response.into(), options.into(), false)
    }

    pub fn mock_delete_once<M, R, O>(&self, matcher: M, response: R, options: O) -> &Self
    where
        M: Into<Matcher>,
        R: Into<ResponseTemplate>,
        O: Into<Option<MockOptions>>,
    {
        self.mount_for("delete", matcher.into(), response.into(), options.into(), true)
    }

    /// A description of the mocks still in the registry, in the order they are tried.
    ///
    /// Mocks that served their quota of calls are gone.
    pub fn active_mocks(&self) -> Vec<String> {
        self.mock_set.read().expect("Poisoned lock!").describe()
    }

    /// Reset the mock function: its recorded calls and implementations are dropped and so is
    /// every mock registered on this session.
    pub fn reset(&self) {
        self.mock_fn.mock_reset();
    }

    /// Bind back the [`Fetch`] that was in place when the session started.
    pub fn restore(&self) {
        debug!("Restoring the original fetch.");
        self.binding.replace(self.original.clone());
    }

    /// Call the mock function, as the code under test would through the binding.
    pub async fn fetch<I: Into<RequestInfo>>(
        &self,
        input: I,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, Error> {
        self.mock_fn.call(input.into(), init).await
    }

    pub fn mock_fn(&self) -> &Arc<dyn MockFunction> {
        &self.mock_fn
    }

    pub fn config(&self) -> &FetchMockConfig {
        &self.config
    }

    fn mount_for(
        &self,
        method: &str,
        matcher: Matcher,
        response: ResponseTemplate,
        options: Option<MockOptions>,
        once: bool,
    ) -> &Self {
        self.mount(matcher.with_method(method), response, options, once)
    }

    fn mount(
        &self,
        matcher: Matcher,
        response: ResponseTemplate,
        options: Option<MockOptions>,
        once: bool,
    ) -> &Self {
        let mut options = options.unwrap_or_default();
        if once {
            options = options.times(1);
        }
        self.register(Mock::new(matcher, response, options));
        self
    }

    fn implementation(&self) -> Implementation {
        let dispatcher = Arc::new(Dispatcher::new(
            self.mock_set.clone(),
            self.config.clone(),
            self.fallback_handler.clone(),
            self.original.clone(),
            Arc::downgrade(&self.mock_fn),
        ));
        Arc::new(move |input, init| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.dispatch(input, init).await }.boxed()
        })
    }
}

impl std::fmt::Debug for FetchMock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchMock")
            .field("config", &self.config)
            .field("active_mocks", &self.active_mocks())
            .finish_non_exhaustive()
    }
}

/// The [`Fetch`] bound while a session is running: every call goes through the mock function.
struct MockedFetch {
    mock_fn: Arc<dyn MockFunction>,
}

#[async_trait]
impl Fetch for MockedFetch {
    async fn fetch(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, Error> {
        self.mock_fn.call(input, init).await
    }
}
