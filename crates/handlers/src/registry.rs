// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-type registry.
//!
//! Built once at process start, shared read-only afterwards. The registry is
//! the only extension point: new job types register here and the core never
//! learns their semantics.

use crate::handler::Handler;
use crate::ping::PingHandler;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A second registration under an already-taken key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate handler registration: {0}")]
pub struct DuplicateHandler(pub String);

/// Table mapping job-type keys to handler implementations.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the builtin handlers registered.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        // Registration under a fresh map cannot collide.
        let _ = registry.register("ping", Arc::new(PingHandler));
        registry
    }

    /// Register a handler under a unique job-type key.
    pub fn register(
        &mut self,
        job_type: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<(), DuplicateHandler> {
        let job_type = job_type.into();
        if self.handlers.contains_key(&job_type) {
            return Err(DuplicateHandler(job_type));
        }
        self.handlers.insert(job_type, handler);
        Ok(())
    }

    /// Look up the handler for a job type.
    pub fn resolve(&self, job_type: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(job_type).cloned()
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered keys, sorted, for error messages and logs.
    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
