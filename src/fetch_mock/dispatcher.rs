use crate::fetch::Fetch;
use crate::fetch_mock::builder::{FallbackContext, FallbackHandler, FetchMockConfig};
use crate::mock_fn::MockFunction;
use crate::mock_set::MountedMockSet;
use crate::request::{Request, RequestInfo, RequestInit};
use crate::response::FetchResponse;
use crate::Error;
use futures_timer::Delay;
use log::{debug, log_enabled, warn, Level};
use once_cell::unsync::OnceCell;
use std::sync::{Arc, RwLock, Weak};

/// What runs in place of fetch once a [`FetchMock`] has mocks registered.
///
/// It holds a weak reference to the mock function it is installed on: the mock function
/// owns the dispatcher (through its implementation), not the other way around.
///
/// [`FetchMock`]: crate::FetchMock
pub(super) struct Dispatcher {
    mock_set: Arc<RwLock<MountedMockSet>>,
    config: Arc<FetchMockConfig>,
    fallback_handler: Option<FallbackHandler>,
    original: Arc<dyn Fetch>,
    mock_fn: Weak<dyn MockFunction>,
}

impl Dispatcher {
    pub(super) fn new(
        mock_set: Arc<RwLock<MountedMockSet>>,
        config: Arc<FetchMockConfig>,
        fallback_handler: Option<FallbackHandler>,
        original: Arc<dyn Fetch>,
        mock_fn: Weak<dyn MockFunction>,
    ) -> Self {
        Self {
            mock_set,
            config,
            fallback_handler,
            original,
            mock_fn,
        }
    }

    pub(super) async fn dispatch(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, Error> {
        // Matchers run against a snapshot, without holding the lock: they might call back
        // into the session. The usage counter is committed before any suspension point, and a
        // mock exhausted by a concurrent call in the meantime makes way for the next one.
        let (matched, canonical) = {
            let canonical = OnceCell::new();
            let candidates = self.mock_set.read().expect("Poisoned lock!").candidates();
            let matched = candidates
                .matching(&input, init.as_ref(), &canonical)
                .find_map(|id| self.mock_set.write().expect("Poisoned lock!").consume(id));
            (matched, canonical.into_inner())
        };

        match matched {
            Some(matched) => {
                let response_type = matched.response_type.unwrap_or(self.config.response_type);
                let response = matched.response.generate_response(response_type);
                if let Some(delay) = matched.delay {
                    Delay::new(delay).await;
                }
                Ok(response)
            }
            None => {
                let request =
                    canonical.unwrap_or_else(|| Request::normalize(&input, init.as_ref()));
                self.fall_through(input, init, request).await
            }
        }
    }

    async fn fall_through(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
        request: Request,
    ) -> Result<FetchResponse, Error> {
        if log_enabled!(Level::Debug) {
            let mut printed = String::new();
            if request
                .print_with_limit(&mut printed, self.config.body_print_limit)
                .is_ok()
            {
                debug!("No mock matched the fetch call:\n{}", printed);
            }
        }

        // The call is handled out-of-band: it does not belong in the mock function's ledger.
        if let Some(mock_fn) = self.mock_fn.upgrade() {
            mock_fn.pop_last_call();
        }

        if let Some(handler) = &self.fallback_handler {
            handler(&FallbackContext {
                config: &self.config,
                input: &input,
                init: init.as_ref(),
            });
        }

        if self.config.fallback_to_network {
            if self.config.warn_on_fallback {
                warn!(
                    "the {} request to {} was not covered by any of the matchers, falling back to network.",
                    request.method, request.url
                );
            }
            return self.original.fetch(input, init).await;
        }

        Err(Error::UnmatchedRequest {
            method: request.method.to_ascii_uppercase(),
            url: request.url,
        })
    }
}
