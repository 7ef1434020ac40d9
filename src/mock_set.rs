use crate::mock::Mock;
use crate::mounted_mock::MountedMock;
use crate::request::{Request, RequestInfo, RequestInit};
use crate::response::ResponseType;
use crate::response_template::ResponseTemplate;
use crate::validator::{ArrayMatching, CompiledMatcher};
use log::debug;
use once_cell::unsync::OnceCell;
use std::sync::Arc;
use std::time::Duration;

/// What a dispatch needs to know about the mock that matched, once the registry lock is
/// released.
#[derive(Debug, Clone)]
pub(crate) struct MatchedMock {
    pub(crate) response: ResponseTemplate,
    pub(crate) response_type: Option<ResponseType>,
    pub(crate) delay: Option<Duration>,
}

/// The ordered collection of mocks registered on a [`FetchMock`].
///
/// Mocks are tried in insertion order: the first one to accept a call wins, no matter how
/// specific the others are.
///
/// [`FetchMock`]: crate::FetchMock
#[derive(Debug, Default)]
pub(crate) struct MountedMockSet {
    mocks: Vec<MountedMock>,
    next_id: u64,
}

/// The mocks that could serve a call, in registration order, detached from the registry.
///
/// Matchers run user code (predicates and function matchers): they are evaluated against a
/// snapshot, with no lock held, and the winner is then claimed with [`MountedMockSet::consume`].
#[derive(Debug, Clone)]
pub(crate) struct Candidates(Vec<(u64, Arc<CompiledMatcher>)>);

impl Candidates {
    /// The ids of the candidates accepting the call, in registration order.
    ///
    /// Matchers are evaluated lazily, as the iterator is advanced. The canonical form of the
    /// call is built at most once, and only if a structured matcher asks for it.
    pub(crate) fn matching<'a>(
        &'a self,
        input: &'a RequestInfo,
        init: Option<&'a RequestInit>,
        canonical: &'a OnceCell<Request>,
    ) -> impl Iterator<Item = u64> + 'a {
        self.0.iter().filter_map(move |(id, matcher)| {
            matcher
                .matches(input, init, || {
                    canonical.get_or_init(|| Request::normalize(input, init))
                })
                .then_some(*id)
        })
    }
}

impl MountedMockSet {
    pub(crate) fn new() -> MountedMockSet {
        MountedMockSet {
            mocks: vec![],
            next_id: 0,
        }
    }

    pub(crate) fn register(&mut self, mock: Mock, policy: ArrayMatching) {
        debug!("Registering mock {:?}.", mock.matcher);
        let id = self.next_id;
        self.next_id += 1;
        self.mocks.push(MountedMock::new(mock, policy, id));
    }

    pub(crate) fn candidates(&self) -> Candidates {
        Candidates(
            self.mocks
                .iter()
                .filter(|mock| !mock.is_exhausted())
                .map(|mock| (mock.id, mock.matcher.clone()))
                .collect(),
        )
    }

    /// Account for a call served by the mock with the given `id`, evicting it if it has
    /// exhausted its quota. The order of the remaining mocks is preserved.
    ///
    /// Returns `None` if the mock is gone: evicted by a concurrent call, or dropped by a reset.
    pub(crate) fn consume(&mut self, id: u64) -> Option<MatchedMock> {
        let index = self
            .mocks
            .iter()
            .position(|mock| mock.id == id && !mock.is_exhausted())?;
        let mock = &mut self.mocks[index];
        let matched = MatchedMock {
            response: mock.response.clone(),
            response_type: mock.options.response_type,
            delay: mock.options.delay,
        };
        if mock.record_match() {
            let mock = self.mocks.remove(index);
            debug!("Evicting mock {}.", mock.describe());
        }
        Some(matched)
    }

    pub(crate) fn clear(&mut self) {
        debug!("Dropping {} mocks.", self.mocks.len());
        self.mocks.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.mocks.len()
    }

    pub(crate) fn describe(&self) -> Vec<String> {
        self.mocks.iter().map(MountedMock::describe).collect()
    }

    #[cfg(test)]
    fn n_matched_requests(&self) -> Vec<u64> {
        self.mocks.iter().map(MountedMock::n_matched_requests).collect()
    }
}
