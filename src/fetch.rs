//! Seams to the content-retrieval layer: LSA fetching and data validation.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::name::Name;

/// One attempt at retrieving an LSA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// `lsa_prefix/site/router/type/seq`
    pub interest: Name,
    /// Lifetime of this attempt.
    pub lifetime: Duration,
    /// Attempts made before this one.
    pub retry: u32,
    /// Overall deadline, on the scheduler clock.
    pub deadline: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The interest expired locally without an answer.
    InterestTimeout,
    /// Any other retrieval failure (nack, validation by the transport, ...).
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn timeout() -> Self {
        Self {
            kind: FetchErrorKind::InterestTimeout,
            message: "interest timed out".to_string(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Other,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Outcome of a [`FetchRequest`], handed back to the router.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub request: FetchRequest,
    pub result: Result<Vec<u8>, FetchError>,
}

/// Expresses LSA interests. Completion comes back asynchronously as a
/// [`FetchResponse`].
pub trait LsaFetcher: Send {
    fn fetch(&mut self, request: FetchRequest);
}

/// Decides whether retrieved LSA content may be trusted.
pub trait LsaValidator: Send {
    fn validate(&self, data_name: &Name, content: &[u8]) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl LsaValidator for AcceptAllValidator {
    fn validate(&self, _data_name: &Name, _content: &[u8]) -> bool {
        true
    }
}

/// Fetcher that queues requests for the owner to deliver later.
#[derive(Debug, Clone, Default)]
pub struct QueueFetcher {
    queue: Arc<Mutex<VecDeque<FetchRequest>>>,
}

impl QueueFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued request.
    pub fn drain(&self) -> Vec<FetchRequest> {
        match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl LsaFetcher for QueueFetcher {
    fn fetch(&mut self, request: FetchRequest) {
        match self.queue.lock() {
            Ok(mut queue) => queue.push_back(request),
            Err(poisoned) => poisoned.into_inner().push_back(request),
        }
    }
}
