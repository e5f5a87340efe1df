//! Metrics reported by a [`Queue`](crate::Queue).
//!
//! Handles are registered once, at construction, against the [`Recorder`] handed to
//! [`Queue::new`](crate::Queue::new). Every metric carries a `queue_name` label, so two queues
//! sharing a name on the same recorder will overwrite each other.

use std::time::Duration;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Label, Level, Metadata, Recorder, SharedString, Unit,
};

use crate::QueueError;

pub const QUEUEING_LIMIT: &str = "queueing_limit";
pub const QUEUEING_QUEUE_LIMIT: &str = "queueing_queue_limit";
pub const QUEUEING_QUEUE_TIMEOUT: &str = "queueing_queue_timeout";
pub const QUEUEING_BUSY: &str = "queueing_busy";
pub const QUEUEING_WAITING: &str = "queueing_waiting";
pub const QUEUEING_WAITING_TIME: &str = "queueing_waiting_time";
pub const QUEUEING_ERRORS: &str = "queueing_errors";

/// Label carrying the queue's name on every metric.
pub const QUEUE_NAME_LABEL: &str = "queue_name";

const BUCKET_FRACTIONS: [f64; 10] = [0.01, 0.05, 0.10, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99, 1.0];

/// Histogram bucket boundaries, in seconds, for `queueing_waiting_time`.
///
/// `metrics` leaves bucketing to the exporter, so these are meant to be passed to it, e.g.
/// `PrometheusBuilder::set_buckets_for_metric`.
pub fn waiting_time_buckets(timeout: Duration) -> [f64; 10] {
    BUCKET_FRACTIONS.map(|fraction| timeout.as_secs_f64() * fraction)
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

fn describe<R>(recorder: &R)
where
    R: Recorder + ?Sized,
{
    recorder.describe_gauge(
        KeyName::from_const_str(QUEUEING_LIMIT),
        None,
        SharedString::const_str("Current limit set for the queueing mechanism"),
    );
    recorder.describe_gauge(
        KeyName::from_const_str(QUEUEING_QUEUE_LIMIT),
        None,
        SharedString::const_str("Current queue limit set for the queueing mechanism"),
    );
    recorder.describe_gauge(
        KeyName::from_const_str(QUEUEING_QUEUE_TIMEOUT),
        Some(Unit::Seconds),
        SharedString::const_str("Current queue timeout set for the queueing mechanism"),
    );
    recorder.describe_gauge(
        KeyName::from_const_str(QUEUEING_BUSY),
        None,
        SharedString::const_str("How many queued requests are now processed"),
    );
    recorder.describe_gauge(
        KeyName::from_const_str(QUEUEING_WAITING),
        None,
        SharedString::const_str("How many requests are now queued"),
    );
    recorder.describe_histogram(
        KeyName::from_const_str(QUEUEING_WAITING_TIME),
        Some(Unit::Seconds),
        SharedString::const_str("How much time a request spent in queue"),
    );
    recorder.describe_counter(
        KeyName::from_const_str(QUEUEING_ERRORS),
        None,
        SharedString::const_str(
            "How many times the too many requests or queueing timedout errors were returned \
             while queueing, partitioned by error type",
        ),
    );
}

pub(crate) struct QueueMetrics {
    busy: Gauge,
    waiting: Gauge,
    waiting_time: Histogram,
    too_many_requests: Counter,
    queueing_timedout: Counter,
}

impl QueueMetrics {
    pub(crate) fn register<R>(
        recorder: &R,
        name: &str,
        limit: usize,
        queue_limit: usize,
        timeout: Duration,
    ) -> Self
    where
        R: Recorder + ?Sized,
    {
        describe(recorder);

        let labels = vec![Label::new(QUEUE_NAME_LABEL, name.to_owned())];
        let key = |metric: &'static str| Key::from_parts(metric, labels.clone());
        let error_key = |error: QueueError| {
            let mut labels = labels.clone();
            labels.push(Label::new("type", error.label()));
            Key::from_parts(QUEUEING_ERRORS, labels)
        };
        let metadata = metadata();

        recorder
            .register_gauge(&key(QUEUEING_LIMIT), &metadata)
            .set(limit as f64);
        recorder
            .register_gauge(&key(QUEUEING_QUEUE_LIMIT), &metadata)
            .set(queue_limit as f64);
        recorder
            .register_gauge(&key(QUEUEING_QUEUE_TIMEOUT), &metadata)
            .set(timeout.as_secs_f64());

        Self {
            busy: recorder.register_gauge(&key(QUEUEING_BUSY), &metadata),
            waiting: recorder.register_gauge(&key(QUEUEING_WAITING), &metadata),
            waiting_time: recorder.register_histogram(&key(QUEUEING_WAITING_TIME), &metadata),
            too_many_requests: recorder
                .register_counter(&error_key(QueueError::TooManyRequests), &metadata),
            queueing_timedout: recorder
                .register_counter(&error_key(QueueError::QueueingTimedOut), &metadata),
        }
    }

    pub(crate) fn waiting_entered(&self) {
        self.waiting.increment(1.0);
    }

    pub(crate) fn waiting_left(&self, waited: Duration) {
        self.waiting.decrement(1.0);
        self.waiting_time.record(waited.as_secs_f64());
    }

    pub(crate) fn busy_entered(&self) {
        self.busy.increment(1.0);
    }

    pub(crate) fn busy_left(&self) {
        self.busy.decrement(1.0);
    }

    pub(crate) fn rejected(&self, error: QueueError) {
        match error {
            QueueError::TooManyRequests => self.too_many_requests.increment(1),
            QueueError::QueueingTimedOut => self.queueing_timedout.increment(1),
        }
    }
}
