//! Prometheus `/metrics` endpoint.

use std::net::SocketAddr;

use prometheus::{Encoder, TextEncoder};
use warp::Filter;

/// Renders every registered metric in the text exposition format.
#[must_use]
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Serves `/metrics` on `addr` in the background.
pub fn spawn_server(addr: SocketAddr) {
    tokio::spawn(async move {
        let route = warp::path("metrics".to_string()).map(render);
        tracing::info!("Metrics available at http://{addr}/metrics");
        warp::serve(route).run(addr).await;
    });
}
