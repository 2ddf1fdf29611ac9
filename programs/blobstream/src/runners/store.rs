//! `store serve`.

use std::sync::Arc;

use blobstream_confirm_store::{
    rpc::{replica_service_server::ReplicaServiceServer, FILE_DESCRIPTOR_SET},
    Replica, ReplicaNode,
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::config::Config;

/// Serves a replica on the configured address until `token` is cancelled.
///
/// # Errors
/// Fails if the address cannot be bound or the server fails.
pub async fn run(config: &Config, token: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.store.listen_addr).await?;
    serve(listener, token).await
}

/// Serves a fresh replica on `listener` until `token` is cancelled.
///
/// # Errors
/// Fails if the server fails.
pub async fn serve(listener: TcpListener, token: CancellationToken) -> anyhow::Result<()> {
    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    tracing::info!(addr = %listener.local_addr()?, "Serving confirm store replica");
    Server::builder()
        .layer(
            TraceLayer::new_for_grpc()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .add_service(ReplicaServiceServer::new(ReplicaNode::new(Arc::new(Replica::new()))))
        .add_service(reflection)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), token.cancelled_owned())
        .await?;
    tracing::info!("Replica stopped");
    Ok(())
}
