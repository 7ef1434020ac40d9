use crate::matchers::Matcher;
use crate::mock::{Mock, MockOptions};
use crate::response_template::ResponseTemplate;
use crate::validator::{ArrayMatching, CompiledMatcher};
use std::sync::Arc;

/// Given the behaviour described by a [`Mock`], keep track of runtime information
/// concerning this mock - e.g. how many times it matched on a call.
#[derive(Debug)]
pub(crate) struct MountedMock {
    /// Stable across evictions of other mocks, unlike the position in the registry.
    pub(crate) id: u64,
    /// Shared so that calls can be matched against it without holding the registry lock.
    pub(crate) matcher: Arc<CompiledMatcher>,
    pub(crate) response: ResponseTemplate,
    pub(crate) options: MockOptions,
    n_matched_requests: u64,
    /// Kept around for diagnostics.
    source: Matcher,
}

impl MountedMock {
    pub(crate) fn new(mock: Mock, policy: ArrayMatching, id: u64) -> Self {
        Self {
            id,
            matcher: Arc::new(CompiledMatcher::compile(&mock.matcher, policy)),
            response: mock.response,
            options: mock.options,
            n_matched_requests: 0,
            source: mock.matcher,
        }
    }

    /// Record a matched call. Returns `true` if the mock has now served its quota.
    pub(crate) fn record_match(&mut self) -> bool {
        self.n_matched_requests += 1;
        self.is_exhausted()
    }

    pub(crate) fn n_matched_requests(&self) -> u64 {
        self.n_matched_requests
    }

    /// A mock that has already served its quota of calls never matches, whatever the call.
    pub(crate) fn is_exhausted(&self) -> bool {
        Some(self.n_matched_requests) == self.options.times
    }

    pub(crate) fn describe(&self) -> String {
        match self.options.times {
            Some(times) => format!(
                "{:?} ({} of {} calls served)",
                self.source,
                self.n_matched_requests(),
                times
            ),
            None => format!(
                "{:?} ({} calls served)",
                self.source,
                self.n_matched_requests()
            ),
        }
    }
}
