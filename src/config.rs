//! Per-route queueing configuration.
//!
//! A `limit` of zero disables queueing for the route altogether: [`QueueConfig::build`] returns
//! no queue and [`Queueing`](crate::Queueing) passes requests straight through.

use std::time::Duration;

use metrics::Recorder;

use crate::{BuildError, Queue};

/// Timeout applied when none, or a zero one, is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueConfig {
    /// Requests allowed to run concurrently. Zero disables queueing.
    pub limit: usize,
    /// Requests allowed to wait beyond `limit`.
    pub queue_limit: usize,
    /// How long a request may wait for a running slot.
    pub timeout: Option<Duration>,
}

impl QueueConfig {
    pub fn new(limit: usize, queue_limit: usize) -> Self {
        Self {
            limit,
            queue_limit,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// The effective timeout, falling back to [`DEFAULT_TIMEOUT`].
    pub fn timeout(&self) -> Duration {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            _ => DEFAULT_TIMEOUT,
        }
    }

    /// Builds the queue for `name`, or `None` when queueing is disabled.
    pub fn build<R>(&self, name: &str, recorder: &R) -> Result<Option<Queue>, BuildError>
    where
        R: Recorder + ?Sized,
    {
        if !self.is_enabled() {
            tracing::debug!(queue_name = name, "queueing disabled");
            return Ok(None);
        }
        Queue::new(name, self.limit, self.queue_limit, self.timeout(), recorder).map(Some)
    }
}
