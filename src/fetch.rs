use crate::request::{Request, RequestInfo, RequestInit};
use crate::response::FetchResponse;
use crate::Error;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Anything that can perform a fetch call.
///
/// Implement it to plug a real HTTP client behind a [`FetchBinding`]: it is what a
/// [`FetchMock`] falls back to when it is configured to let unmatched calls through.
///
/// [`FetchMock`]: crate::FetchMock
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, Error>;
}

/// A [`Fetch`] without network access: every call fails with [`Error::Network`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetch;

#[async_trait]
impl Fetch for OfflineFetch {
    async fn fetch(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, Error> {
        let request = Request::normalize(&input, init.as_ref());
        Err(Error::Network(format!(
            "no network available to perform {} {}",
            request.method.to_ascii_uppercase(),
            request.url
        )))
    }
}

/// The slot holding the [`Fetch`] implementation the code under test calls into.
///
/// A [`FetchMock`] swaps its own implementation in when it starts and puts the previous one
/// back on [`FetchMock::restore`].
///
/// [`FetchMock`]: crate::FetchMock
/// [`FetchMock::restore`]: crate::FetchMock::restore
pub struct FetchBinding {
    slot: RwLock<Arc<dyn Fetch>>,
}

impl FetchBinding {
    pub fn new<F: Fetch + 'static>(fetch: F) -> Self {
        Self {
            slot: RwLock::new(Arc::new(fetch)),
        }
    }

    /// The implementation currently bound.
    pub fn current(&self) -> Arc<dyn Fetch> {
        self.slot.read().expect("Poisoned lock!").clone()
    }

    /// Bind `fetch`, returning the implementation it replaced.
    pub fn replace(&self, fetch: Arc<dyn Fetch>) -> Arc<dyn Fetch> {
        std::mem::replace(&mut *self.slot.write().expect("Poisoned lock!"), fetch)
    }

    /// Perform a fetch call through the implementation currently bound.
    pub async fn fetch<I: Into<RequestInfo>>(
        &self,
        input: I,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, Error> {
        let input = input.into();
        let fetch = self.current();
        fetch.fetch(input, init).await
    }
}

impl Default for FetchBinding {
    fn default() -> Self {
        Self::new(OfflineFetch)
    }
}

impl std::fmt::Debug for FetchBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchBinding").finish_non_exhaustive()
    }
}
