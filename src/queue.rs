//! [`Queue`] bounds how many requests run at once and how many may wait for their turn.
//!
//! A queue owns two pools:
//!
//! - running slots, a FIFO-fair semaphore with `limit` permits, held while a request is being
//!   processed;
//! - waiting slots, a bounded FIFO of claim instants with room for `limit + queue_limit`
//!   entries, held from the start of [`Queue::acquire`] until the matching release.
//!
//! [`Queue::acquire`] first claims a waiting slot without blocking, failing with
//! [`QueueError::TooManyRequests`] when none is left. It then tries to take a running slot
//! without blocking and, failing that, waits up to the queue's timeout for one before giving up
//! with [`QueueError::QueueingTimedOut`]. The timeout only covers this last, blocking phase.
//!
//! Releasing always frees the _oldest_ waiting slot, whoever the caller is, so the wait time
//! recorded on release is that of the longest-held claim.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use metrics::NoopRecorder;
//! use queueing::{Queue, QueueError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let queue = Queue::new("api", 1, 0, Duration::from_secs(30), &NoopRecorder).unwrap();
//!
//! let permit = queue.acquire().await.unwrap();
//! assert_eq!(queue.acquire().await.unwrap_err(), QueueError::TooManyRequests);
//!
//! drop(permit);
//! assert!(queue.acquire().await.is_ok());
//! # }
//! ```

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use metrics::Recorder;
use tokio::{
    sync::{Semaphore, SemaphorePermit},
    time::Instant,
};

use crate::{
    queue_metrics::QueueMetrics,
    waiting::WaitingSlots,
    BuildError, QueueError, ReleaseError,
};

/// An admission controller for one protected resource.
///
/// See the [module](crate::queue) for more information.
pub struct Queue {
    name: String,
    limit: usize,
    queue_limit: usize,
    timeout: Duration,
    busy: Semaphore,
    running: AtomicUsize,
    waiting: WaitingSlots,
    metrics: QueueMetrics,
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("queue_limit", &self.queue_limit)
            .field("timeout", &self.timeout)
            .field("busy", &self.busy())
            .field("waiting", &self.waiting())
            .finish()
    }
}

impl Queue {
    /// Constructs a queue and registers its metrics against `recorder`.
    ///
    /// `limit` requests may run concurrently and `queue_limit` more may wait, each for at most
    /// `timeout`. The `name` labels every metric, so it should be unique per recorder.
    pub fn new<R>(
        name: impl Into<String>,
        limit: usize,
        queue_limit: usize,
        timeout: Duration,
        recorder: &R,
    ) -> Result<Self, BuildError>
    where
        R: Recorder + ?Sized,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        let capacity = limit
            .checked_add(queue_limit)
            .filter(|capacity| *capacity <= Semaphore::MAX_PERMITS)
            .ok_or(BuildError::CapacityOverflow { limit, queue_limit })?;

        let metrics = QueueMetrics::register(recorder, &name, limit, queue_limit, timeout);
        tracing::debug!(queue_name = %name, limit, queue_limit, ?timeout, "queue created");

        Ok(Self {
            name,
            limit,
            queue_limit,
            timeout,
            busy: Semaphore::new(limit),
            running: AtomicUsize::new(0),
            waiting: WaitingSlots::new(capacity),
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of requests allowed to run concurrently.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The number of requests allowed to wait beyond [`Queue::limit`].
    pub fn queue_limit(&self) -> usize {
        self.queue_limit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Running slots currently held.
    pub fn busy(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Waiting slots currently held, running requests included.
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Waits for a running slot.
    ///
    /// Resolves immediately with [`QueueError::TooManyRequests`] when the waiting slots are
    /// exhausted, or with [`QueueError::QueueingTimedOut`] when no running slot frees up within
    /// the timeout. A failed call, or one whose future is dropped before completing, leaves the
    /// queue as it found it.
    pub async fn acquire(&self) -> Result<QueuePermit<'_>, QueueError> {
        if !self.waiting.try_claim(Instant::now()) {
            return Err(self.reject(QueueError::TooManyRequests));
        }
        self.metrics.waiting_entered();
        let claim = WaitingClaim { queue: self };

        if let Ok(permit) = self.busy.try_acquire() {
            tracing::trace!(queue_name = %self.name, "admitted without waiting");
            return Ok(self.admit(permit, claim));
        }

        match tokio::time::timeout(self.timeout, self.busy.acquire()).await {
            Ok(permit) => {
                tracing::trace!(queue_name = %self.name, "admitted after waiting");
                Ok(self.admit(permit.expect("semaphore is never closed"), claim))
            }
            Err(_elapsed) => {
                drop(claim);
                Err(self.reject(QueueError::QueueingTimedOut))
            }
        }
    }

    /// Frees one running slot and the oldest waiting slot.
    ///
    /// Only needed after [`QueuePermit::forget`]; a permit releases itself when dropped. Each
    /// call must close out exactly one successful [`Queue::acquire`]. Extra calls are refused
    /// with a [`ReleaseError`] rather than freeing slots nobody holds.
    pub fn release(&self) -> Result<(), ReleaseError> {
        if self
            .running
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            tracing::error!(queue_name = %self.name, "release without a running slot");
            return Err(ReleaseError::NotRunning);
        }

        // Every running slot is backed by a waiting slot, so this only fails if that pairing
        // is broken inside the queue itself.
        let Some(claimed) = self.waiting.pop() else {
            self.running.fetch_add(1, Ordering::AcqRel);
            tracing::error!(queue_name = %self.name, "release without a waiting slot");
            debug_assert!(false, "running slot held without a waiting slot");
            return Err(ReleaseError::NotWaiting);
        };
        self.metrics.waiting_left(claimed.elapsed());

        self.metrics.busy_left();
        self.busy.add_permits(1);

        tracing::trace!(queue_name = %self.name, "released");
        Ok(())
    }

    fn admit<'a>(
        &'a self,
        permit: SemaphorePermit<'a>,
        claim: WaitingClaim<'a>,
    ) -> QueuePermit<'a> {
        permit.forget();
        self.running.fetch_add(1, Ordering::AcqRel);
        self.metrics.busy_entered();
        claim.keep();
        QueuePermit { queue: Some(self) }
    }

    fn reject(&self, error: QueueError) -> QueueError {
        self.metrics.rejected(error);
        tracing::debug!(
            queue_name = %self.name,
            limit = self.limit,
            queue_limit = self.queue_limit,
            %error,
            "request rejected"
        );
        error
    }
}

/// A waiting slot claimed by an in-flight [`Queue::acquire`], given back unless kept.
struct WaitingClaim<'a> {
    queue: &'a Queue,
}

impl WaitingClaim<'_> {
    fn keep(self) {
        std::mem::forget(self);
    }
}

impl Drop for WaitingClaim<'_> {
    fn drop(&mut self) {
        if let Some(claimed) = self.queue.waiting.pop() {
            self.queue.metrics.waiting_left(claimed.elapsed());
        }
    }
}

/// Proof of admission returned by [`Queue::acquire`].
///
/// Dropping the permit releases its slots.
#[must_use]
#[derive(Debug)]
pub struct QueuePermit<'a> {
    queue: Option<&'a Queue>,
}

impl QueuePermit<'_> {
    /// Releases the slots now, reporting a broken acquire/release pairing.
    pub fn release(mut self) -> Result<(), ReleaseError> {
        match self.queue.take() {
            Some(queue) => queue.release(),
            None => Ok(()),
        }
    }

    /// Keeps the slots held without a permit. They must later be freed by a single
    /// [`Queue::release`].
    pub fn forget(mut self) {
        self.queue = None;
    }
}

impl Drop for QueuePermit<'_> {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            if let Err(error) = queue.release() {
                tracing::error!(queue_name = %queue.name, %error, "permit release failed");
                debug_assert!(false, "permit release failed: {error}");
            }
        }
    }
}
