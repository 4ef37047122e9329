// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! One-shot retire completion.
//!
//! A `Completion` is move-only and is consumed by `complete`, so the type
//! system rules out firing it twice. Whoever holds it last owns the duty to
//! fire it: dropping an unfired handle fires it with `CommitError::Abandoned`
//! so the waiting journal manager always hears back exactly once.

use core::fmt;

use crate::error::{CommitError, CommitStatus};

type Callback = Box<dyn FnOnce(CommitStatus) + Send + 'static>;

pub struct Completion {
    callback: Option<Callback>,
}

impl Completion {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(CommitStatus) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(f)),
        }
    }

    /// A completion nobody listens to.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Fires the callback with `status`, consuming the handle.
    pub fn complete(mut self, status: CommitStatus) {
        if let Some(cb) = self.callback.take() {
            cb(status);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(cb) = self.callback.take() {
            tracing::warn!("retire completion dropped unfired");
            cb(Err(CommitError::Abandoned));
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("armed", &self.callback.is_some())
            .finish()
    }
}
