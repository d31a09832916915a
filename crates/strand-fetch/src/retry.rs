//! Retry policies for failed retrievals
//!
//! The orchestrator asks the policy once per classified failure. Names that
//! cannot be classified never reach the policy.

use std::collections::HashMap;

use strand_name::{Name, NameType};

use crate::transfer::RetrievalFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-issue the request at the same hierarchy level
    Retry,
    /// Stop retrying this name and surface the failure
    GiveUp,
}

pub trait RetryPolicy: Send {
    fn decide(&mut self, failure: &RetrievalFailure, kind: NameType) -> RetryDecision;

    /// `name` arrived; forget anything tracked for it
    fn record_success(&mut self, _name: &Name) {}

    /// The download finished; forget everything
    fn reset(&mut self) {}
}

/// Retry every failure, forever
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl RetryPolicy for AlwaysRetry {
    fn decide(&mut self, _failure: &RetrievalFailure, _kind: NameType) -> RetryDecision {
        RetryDecision::Retry
    }
}

/// Retry each name at most `max_retries` times
#[derive(Debug, Clone, Default)]
pub struct CappedRetry {
    max_retries: u32,
    attempts: HashMap<Name, u32>,
}

impl CappedRetry {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: HashMap::new(),
        }
    }

    /// Retries already granted for `name`
    pub fn attempts(&self, name: &Name) -> u32 {
        self.attempts.get(name).copied().unwrap_or(0)
    }
}

impl RetryPolicy for CappedRetry {
    fn decide(&mut self, failure: &RetrievalFailure, _kind: NameType) -> RetryDecision {
        let attempts = self.attempts.entry(failure.name.clone()).or_insert(0);
        if *attempts >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        *attempts = attempts.saturating_add(1);
        RetryDecision::Retry
    }

    fn record_success(&mut self, name: &Name) {
        self.attempts.remove(name);
    }

    fn reset(&mut self) {
        self.attempts.clear();
    }
}
