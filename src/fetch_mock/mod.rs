//! All bits and pieces concerning a fetch mock session are in this module.
//!
//! `session::FetchMock` is what crate users interact with: it owns the registry of mounted
//! mocks and swaps the [`Fetch`] of a [`FetchBinding`] for the mock function.
//!
//! `dispatcher::Dispatcher` is the implementation installed on the mock function: it resolves
//! every call against the registry, synthesizing a response or falling through.
//!
//! [`Fetch`]: crate::Fetch
//! [`FetchBinding`]: crate::FetchBinding
mod builder;
mod dispatcher;
mod session;

pub use builder::{FallbackContext, FallbackHandler, FetchMockBuilder, FetchMockConfig};
pub use session::FetchMock;
