// src/core/hook.rs
//! Ordered callback chains with veto and cancellation.
//!
//! Callbacks run in registration order against a shared context. Each one sees
//! the values returned by the callbacks before it, and may stop the chain by
//! returning [`HookResult::Veto`] or by cancelling through the context.

use thiserror::Error;
use tracing::{debug, trace};

/// What a single callback decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult<R> {
    /// Record the value and keep going.
    Continue(R),
    /// Stop here; the default action must be suppressed.
    Veto,
}

/// Context objects can carry an externally observed cancellation flag.
pub trait HookContext {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl HookContext for () {}

/// A callback failed. Carries the position of the callback in the chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("hook callback #{index} failed: {message}")]
pub struct HookError {
    pub index: usize,
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { index: 0, message: message.into() }
    }
}

/// Overall outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<R> {
    /// Every callback ran.
    Allowed(Vec<R>),
    /// Callback `by` vetoed; `results` holds what ran before it.
    Vetoed { by: usize, results: Vec<R> },
    /// The context was cancelled after callback `by`.
    Cancelled { by: usize, results: Vec<R> },
}

impl<R> Dispatch<R> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Dispatch::Allowed(_))
    }

    pub fn results(&self) -> &[R] {
        match self {
            Dispatch::Allowed(results) => results,
            Dispatch::Vetoed { results, .. } | Dispatch::Cancelled { results, .. } => results,
        }
    }
}

type Callback<C, R> = Box<dyn FnMut(&C, &[R]) -> Result<HookResult<R>, HookError>>;

/// An ordered callback registry. Insertion order is execution order.
pub struct Hook<C, R = ()> {
    name: &'static str,
    callbacks: Vec<Callback<C, R>>,
}

impl<C: HookContext, R> Hook<C, R> {
    pub fn new(name: &'static str) -> Self {
        Self { name, callbacks: Vec::new() }
    }

    /// Appends a callback. Duplicates are not detected.
    pub fn register<F>(&mut self, callback: F)
    where
        F: FnMut(&C, &[R]) -> Result<HookResult<R>, HookError> + 'static,
    {
        self.callbacks.push(Box::new(callback));
        trace!(hook = self.name, count = self.callbacks.len(), "Callback registered");
    }

    /// Runs the chain against `context`.
    ///
    /// A failing callback aborts the chain and its error is returned with the
    /// callback's index filled in. The accumulated results are dropped before
    /// the error reaches the caller.
    pub fn dispatch(&mut self, context: &C) -> Result<Dispatch<R>, HookError> {
        let mut results = Vec::with_capacity(self.callbacks.len());

        for (index, callback) in self.callbacks.iter_mut().enumerate() {
            match callback(context, &results) {
                Ok(HookResult::Continue(value)) => results.push(value),
                Ok(HookResult::Veto) => {
                    debug!(hook = self.name, index, "Chain vetoed");
                    return Ok(Dispatch::Vetoed { by: index, results });
                }
                Err(err) => {
                    drop(results);
                    return Err(HookError { index, message: err.message });
                }
            }

            if context.is_cancelled() {
                debug!(hook = self.name, index, "Chain cancelled");
                return Ok(Dispatch::Cancelled { by: index, results });
            }
        }

        Ok(Dispatch::Allowed(results))
    }

    /// Removes every callback.
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<C, R> std::fmt::Debug for Hook<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
