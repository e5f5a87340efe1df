use std::{error::Error, time::Duration};

use futures::{stream::FuturesUnordered, StreamExt};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use queueing::{
    queue_metrics::QUEUEING_WAITING_TIME, waiting_time_buckets, QueueConfig, Service, ServiceExt,
};
use tokio::time::sleep;

struct Backend {
    latency: Duration,
}

impl Service<u64> for Backend {
    type Response = u64;
    type Permit<'a> = Duration;

    async fn acquire(&self) -> Self::Permit<'_> {
        self.latency
    }

    async fn call(latency: Self::Permit<'_>, request: u64) -> Self::Response {
        sleep(latency).await;
        request
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    const N_REQUESTS: u64 = 12;

    let config = QueueConfig::new(2, 4).with_timeout(Duration::from_millis(300));
    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(QUEUEING_WAITING_TIME.to_owned()),
            &waiting_time_buckets(config.timeout()),
        )?
        .build_recorder();
    let handle = recorder.handle();

    let queue = config.build("backend", &recorder)?;
    let svc = Backend {
        latency: Duration::from_millis(100),
    }
    .queueing(queue);

    let svc = &svc;
    let mut requests: FuturesUnordered<_> = (0..N_REQUESTS)
        .map(|request| async move { (request, svc.oneshot(request).await) })
        .collect();
    while let Some((request, response)) = requests.next().await {
        match response {
            Ok(_) => tracing::info!(request, "served"),
            Err(error) => tracing::info!(request, status = %error.status_code(), %error),
        }
    }

    println!("{}", handle.render());
    Ok(())
}
