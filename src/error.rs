//! Errors returned by [`Queue`](crate::Queue).
//!
//! [`QueueError`] covers the two expected outcomes of an unsuccessful
//! [`Queue::acquire`](crate::Queue::acquire). [`ReleaseError`] is only ever produced when a caller
//! breaks the one-release-per-acquire contract, and [`BuildError`] when a queue is constructed
//! with parameters it cannot honour.

use http::StatusCode;
use thiserror::Error;

/// Why a request was not admitted.
///
/// Neither variant is retried by the queue; a caller may try again later with a fresh
/// [`Queue::acquire`](crate::Queue::acquire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum QueueError {
    /// Every waiting slot was taken at the moment of the call.
    #[error("too many requests queued")]
    TooManyRequests,
    /// The request waited the whole timeout without getting a running slot.
    #[error("queueing timedout")]
    QueueingTimedOut,
}

impl QueueError {
    /// The value of the `type` label on the `queueing_errors` counter.
    pub fn label(&self) -> &'static str {
        match self {
            QueueError::TooManyRequests => "too_many_requests",
            QueueError::QueueingTimedOut => "queueing_timedout",
        }
    }

    /// The status a gateway answers with when a request is turned away.
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueueError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            QueueError::QueueingTimedOut => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// A [`Queue::release`](crate::Queue::release) without a matching successful acquire.
///
/// This is a programming error in the caller, never a load condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ReleaseError {
    #[error("release called while no running slot is held")]
    NotRunning,
    #[error("release called while no waiting slot is held")]
    NotWaiting,
}

/// Invalid parameters passed to [`Queue::new`](crate::Queue::new).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("queue name must not be empty")]
    EmptyName,
    #[error("limit {limit} plus queue limit {queue_limit} exceeds the supported capacity")]
    CapacityOverflow { limit: usize, queue_limit: usize },
}
