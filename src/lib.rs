//! Bounded request queueing for gateways.
//!
//! A [`Queue`] lets a fixed number of requests run concurrently and a further, bounded number
//! wait for their turn. Everything beyond that is turned away immediately, and waiters that do
//! not get through within the queue's timeout are turned away too. Both outcomes surface as a
//! [`QueueError`].
//!
//! Queues report their state through an injected [`Recorder`](::metrics::Recorder), see the
//! [`queue_metrics`] module for the exported series.
//!
//! The [`Service`] trait and [`ServiceExt::queueing`] put a queue in front of a backend.
#![allow(async_fn_in_trait)]

mod config;
mod error;
mod queue;
pub mod queue_metrics;
mod queueing;
mod waiting;

pub use config::*;
pub use error::*;
pub use queue::*;
pub use queueing::*;

pub use queue_metrics::waiting_time_buckets;

pub trait Service<Request> {
    type Response;
    type Permit<'a>
    where
        Self: 'a;

    async fn acquire(&self) -> Self::Permit<'_>;

    async fn call(permit: Self::Permit<'_>, request: Request) -> Self::Response;
}

pub trait ServiceExt<Request>: Service<Request> {
    async fn oneshot(&self, request: Request) -> Self::Response
    where
        Self: Sized,
    {
        let permit = self.acquire().await;
        Self::call(permit, request).await
    }

    /// Admits requests through `queue` before calling this service.
    ///
    /// Passing `None` leaves the service unqueued.
    fn queueing(self, queue: impl Into<Option<Queue>>) -> Queueing<Self>
    where
        Self: Sized,
    {
        Queueing::new(self, queue.into())
    }
}

impl<S, Request> ServiceExt<Request> for S where S: Service<Request> {}
