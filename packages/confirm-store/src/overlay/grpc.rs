//! Overlay over a set of remote replicas.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tonic::{
    transport::{Channel, Endpoint},
    Code, Request,
};

use crate::{
    rpc::{replica_service_client::ReplicaServiceClient, GetRecordRequest, PutRecordRequest},
    Overlay, OverlayError,
};

#[derive(Debug, Clone)]
struct Peer {
    endpoint: String,
    client: ReplicaServiceClient<Channel>,
}

/// Fans writes out to every peer replica and gathers candidates from every
/// peer on reads. Unreachable peers are logged and skipped.
#[derive(Debug, Clone)]
pub struct GrpcOverlay {
    peers: Vec<Peer>,
    request_timeout: Duration,
}

enum PeerFailure {
    Rejected(String),
    Unavailable(String),
}

impl GrpcOverlay {
    /// Creates clients for the given peer endpoints. Connections are
    /// established on first use, so peers may come up after us.
    ///
    /// # Errors
    /// Fails if an endpoint is not a valid URI.
    pub fn connect_lazy(
        endpoints: &[String],
        request_timeout: Duration,
    ) -> Result<Self, OverlayError> {
        let peers = endpoints
            .iter()
            .map(|endpoint| {
                let channel = Endpoint::from_shared(endpoint.clone())
                    .map_err(|e| {
                        OverlayError::Unavailable(format!("invalid endpoint {endpoint}: {e}"))
                    })?
                    .connect_timeout(request_timeout)
                    .connect_lazy();
                Ok(Peer {
                    endpoint: endpoint.clone(),
                    client: ReplicaServiceClient::new(channel),
                })
            })
            .collect::<Result<Vec<_>, OverlayError>>()?;

        Ok(Self {
            peers,
            request_timeout,
        })
    }

    async fn put_to_peer(&self, peer: &Peer, key: &str, value: Vec<u8>) -> Result<(), PeerFailure> {
        let mut client = peer.client.clone();
        let request = Request::new(PutRecordRequest {
            key: key.to_string(),
            value,
        });

        match timeout(self.request_timeout, client.put_record(request)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(status)) if status.code() == Code::InvalidArgument => {
                Err(PeerFailure::Rejected(status.message().to_string()))
            }
            Ok(Err(status)) => Err(PeerFailure::Unavailable(status.to_string())),
            Err(_) => Err(PeerFailure::Unavailable(format!(
                "timed out after {:?}",
                self.request_timeout
            ))),
        }
    }

    async fn get_from_peer(&self, peer: &Peer, key: &str) -> Result<Option<Vec<u8>>, String> {
        let mut client = peer.client.clone();
        let request = Request::new(GetRecordRequest {
            key: key.to_string(),
        });

        match timeout(self.request_timeout, client.get_record(request)).await {
            Ok(Ok(response)) => Ok(response.into_inner().value),
            Ok(Err(status)) => Err(status.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.request_timeout)),
        }
    }
}

#[async_trait::async_trait]
impl Overlay for GrpcOverlay {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), OverlayError> {
        let results = join_all(
            self.peers
                .iter()
                .map(|peer| {
                    let value = value.clone();
                    async move { (peer, self.put_to_peer(peer, key, value).await) }
                }),
        )
        .await;

        let mut accepted = 0_usize;
        let mut rejection = None;
        let mut unavailable = None;
        for (peer, result) in results {
            match result {
                Ok(()) => accepted += 1,
                Err(PeerFailure::Rejected(reason)) => {
                    tracing::warn!(
                        endpoint = %peer.endpoint,
                        key,
                        %reason,
                        "Replica rejected record"
                    );
                    rejection = Some(reason);
                }
                Err(PeerFailure::Unavailable(reason)) => {
                    tracing::warn!(endpoint = %peer.endpoint, key, %reason, "Replica unavailable");
                    unavailable = Some(reason);
                }
            }
        }

        match (accepted, rejection, unavailable) {
            (0, Some(reason), _) => Err(OverlayError::Rejected(reason)),
            (0, None, Some(reason)) => Err(OverlayError::Unavailable(reason)),
            (0, None, None) => Err(OverlayError::Unavailable("no peers configured".to_string())),
            _ => Ok(()),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<Vec<u8>>, OverlayError> {
        let results = join_all(
            self.peers
                .iter()
                .map(|peer| async move { (peer, self.get_from_peer(peer, key).await) }),
        )
        .await;

        let mut values = Vec::new();
        let mut reachable = 0_usize;
        let mut last_error = None;
        for (peer, result) in results {
            match result {
                Ok(value) => {
                    reachable += 1;
                    values.extend(value);
                }
                Err(reason) => {
                    tracing::warn!(endpoint = %peer.endpoint, key, %reason, "Replica unavailable");
                    last_error = Some(reason);
                }
            }
        }

        if reachable == 0 {
            return Err(OverlayError::Unavailable(
                last_error.unwrap_or_else(|| "no peers configured".to_string()),
            ));
        }
        Ok(values)
    }
}
