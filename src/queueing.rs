//! The [`ServiceExt::queueing`](crate::ServiceExt::queueing) combinator returns [`Queueing`],
//! which admits each request through a [`Queue`] before handing it to the inner service.
//!
//! The queue slot is taken in [`Service::acquire`] and held until the inner [`Service::call`]
//! has completed. Requests turned away by the queue never reach the inner service; they resolve
//! to the [`QueueError`] instead.
//!
//! Without a queue, as built from a disabled [`QueueConfig`](crate::QueueConfig), requests pass
//! straight through.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use metrics::NoopRecorder;
//! use queueing::*;
//!
//! struct Backend;
//!
//! impl Service<u32> for Backend {
//!     type Response = u32;
//!     type Permit<'a> = ();
//!
//!     async fn acquire(&self) -> Self::Permit<'_> {}
//!
//!     async fn call((): Self::Permit<'_>, request: u32) -> Self::Response {
//!         request + 1
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let queue = Queue::new("backend", 4, 16, Duration::from_secs(30), &NoopRecorder).unwrap();
//! let svc = Backend.queueing(queue);
//! assert_eq!(svc.oneshot(1).await, Ok(2));
//! # }
//! ```

use std::fmt;

use crate::{Queue, QueueError, QueuePermit, Service};

/// A wrapper for the [`ServiceExt::queueing`](crate::ServiceExt::queueing) combinator.
///
/// See the [module](crate::queueing) for more information.
#[derive(Debug)]
pub struct Queueing<S> {
    inner: S,
    queue: Option<Queue>,
}

impl<S> Queueing<S> {
    pub(crate) fn new(inner: S, queue: Option<Queue>) -> Self {
        Self { inner, queue }
    }

    /// The queue requests go through, if queueing is enabled.
    pub fn queue(&self) -> Option<&Queue> {
        self.queue.as_ref()
    }
}

/// The [`Service::Permit`] type for [`Queueing`].
pub struct QueueingPermit<'a, S, Request>
where
    S: Service<Request> + 'a,
{
    inner: S::Permit<'a>,
    admission: Option<QueuePermit<'a>>,
}

impl<'a, S, Request> fmt::Debug for QueueingPermit<'a, S, Request>
where
    S: Service<Request>,
    S::Permit<'a>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueingPermit")
            .field("inner", &self.inner)
            .field("admission", &self.admission)
            .finish()
    }
}

impl<Request, S> Service<Request> for Queueing<S>
where
    S: Service<Request>,
{
    type Response = Result<S::Response, QueueError>;
    type Permit<'a> = Result<QueueingPermit<'a, S, Request>, QueueError>
    where
        S: 'a;

    async fn acquire(&self) -> Self::Permit<'_> {
        let admission = match &self.queue {
            Some(queue) => Some(queue.acquire().await?),
            None => None,
        };
        Ok(QueueingPermit {
            inner: self.inner.acquire().await,
            admission,
        })
    }

    async fn call(permit: Self::Permit<'_>, request: Request) -> Self::Response {
        let QueueingPermit { inner, admission } = permit?;
        let response = S::call(inner, request).await;
        drop(admission);
        Ok(response)
    }
}
