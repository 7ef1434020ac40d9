//! The mock function that stands in for fetch.
//!
//! In a test framework with built-in mock functions (call recording, swappable
//! implementations, reset) the session would reuse those. [`MockFunction`] is the subset of that
//! capability the session relies on; [`MockFn`] is a self-contained implementation of it.
use crate::request::{RequestInfo, RequestInit};
use crate::response::FetchResponse;
use crate::Error;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What a mock function runs when it is called.
pub type Implementation = Arc<
    dyn Fn(RequestInfo, Option<RequestInit>) -> BoxFuture<'static, Result<FetchResponse, Error>>
        + Send
        + Sync,
>;

/// A callback invoked every time the mock function is reset.
pub type ResetHook = Box<dyn Fn() + Send + Sync>;

/// The capabilities of a mock function the session builds upon.
pub trait MockFunction: Send + Sync {
    /// Install `implementation`, replacing the current one.
    fn mock_implementation(&self, implementation: Implementation);

    /// Queue `implementation` to serve the next call only. One-shot implementations are
    /// used, in order, before the persistent one.
    fn mock_implementation_once(&self, implementation: Implementation);

    fn has_implementation(&self) -> bool;

    /// Forget every recorded call and every installed implementation, then run the reset hooks.
    fn mock_reset(&self);

    fn on_reset(&self, hook: ResetHook);

    /// Record the call and run the implementation in charge of it.
    fn call(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
    ) -> BoxFuture<'static, Result<FetchResponse, Error>>;

    /// Drop the most recently recorded call.
    fn pop_last_call(&self);
}

/// A call recorded by [`MockFn`].
#[derive(Debug, Clone)]
pub struct Call {
    pub input: RequestInfo,
    pub init: Option<RequestInit>,
}

#[derive(Default)]
struct State {
    implementation: Option<Implementation>,
    once: VecDeque<Implementation>,
    calls: Vec<Call>,
}

/// An in-memory [`MockFunction`] recording every call it receives.
#[derive(Default)]
pub struct MockFn {
    state: Mutex<State>,
    reset_hooks: Mutex<Vec<ResetHook>>,
}

impl MockFn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("Poisoned lock!").calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().expect("Poisoned lock!").calls.len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.state.lock().expect("Poisoned lock!").calls.last().cloned()
    }

    /// Forget the recorded calls, keeping the installed implementations.
    pub fn mock_clear(&self) {
        self.state.lock().expect("Poisoned lock!").calls.clear();
    }
}

impl MockFunction for MockFn {
    fn mock_implementation(&self, implementation: Implementation) {
        self.state.lock().expect("Poisoned lock!").implementation = Some(implementation);
    }

    fn mock_implementation_once(&self, implementation: Implementation) {
        self.state
            .lock()
            .expect("Poisoned lock!")
            .once
            .push_back(implementation);
    }

    fn has_implementation(&self) -> bool {
        let state = self.state.lock().expect("Poisoned lock!");
        state.implementation.is_some() || !state.once.is_empty()
    }

    fn mock_reset(&self) {
        debug!("Resetting mock function.");
        *self.state.lock().expect("Poisoned lock!") = State::default();
        for hook in self.reset_hooks.lock().expect("Poisoned lock!").iter() {
            hook();
        }
    }

    fn on_reset(&self, hook: ResetHook) {
        self.reset_hooks.lock().expect("Poisoned lock!").push(hook);
    }

    fn call(
        &self,
        input: RequestInfo,
        init: Option<RequestInit>,
    ) -> BoxFuture<'static, Result<FetchResponse, Error>> {
        let implementation = {
            let mut state = self.state.lock().expect("Poisoned lock!");
            state.calls.push(Call {
                input: input.clone(),
                init: init.clone(),
            });
            state.once.pop_front().or_else(|| state.implementation.clone())
        };
        match implementation {
            Some(implementation) => implementation(input, init),
            None => futures::future::ready(Err(Error::NoImplementation)).boxed(),
        }
    }

    fn pop_last_call(&self) {
        self.state.lock().expect("Poisoned lock!").calls.pop();
    }
}
