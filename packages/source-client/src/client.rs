//! [`AttestationSource`] over the source chain's gRPC query service.

use std::time::Duration;

use alloy_primitives::B256;
use blobstream_types::{Attestation, AttestationSource, NonceStream, SourceError, Valset};
use futures::{stream, StreamExt};
use tonic::{
    metadata::MetadataValue,
    transport::{Channel, Endpoint},
    Code, Request, Status,
};

use crate::{
    convert,
    rpc::{
        query_client::QueryClient, QueryAttestationRequestByNonceRequest,
        QueryDataRootTupleRootRequest, QueryEarliestAttestationNonceRequest,
        QueryLatestAttestationNonceRequest, QueryLatestHeightRequest,
        QueryLatestValsetRequestBeforeNonceRequest,
    },
    SourceConfig,
};

/// Request metadata selecting the height a query is answered at.
pub const BLOCK_HEIGHT_HEADER: &str = "x-cosmos-block-height";

fn transport(status: Status) -> SourceError {
    SourceError::Transport(format!("{}: {}", status.code(), status.message()))
}

/// Reads attestations from a source chain node.
///
/// New attestations are detected by polling the latest nonce.
#[derive(Debug, Clone)]
pub struct GrpcAttestationSource {
    client: QueryClient<Channel>,
    poll_interval: Duration,
}

impl GrpcAttestationSource {
    /// Creates a client for the configured node. The connection is made on
    /// first use.
    ///
    /// # Errors
    /// Fails if the endpoint is not a valid URI.
    pub fn connect_lazy(config: &SourceConfig) -> Result<Self, SourceError> {
        let channel = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| {
                SourceError::Transport(format!("invalid endpoint {}: {e}", config.endpoint))
            })?
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .connect_lazy();

        Ok(Self {
            client: QueryClient::new(channel),
            poll_interval: config.poll_interval,
        })
    }

    fn client(&self) -> QueryClient<Channel> {
        self.client.clone()
    }

    async fn attestation(
        &self,
        request: Request<QueryAttestationRequestByNonceRequest>,
    ) -> Result<Option<Attestation>, SourceError> {
        match self.client().attestation_request_by_nonce(request).await {
            Ok(response) => response
                .into_inner()
                .attestation
                .map(Attestation::try_from)
                .transpose(),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(transport(status)),
        }
    }
}

#[async_trait::async_trait]
impl AttestationSource for GrpcAttestationSource {
    async fn get_attestation(&self, nonce: u64) -> Result<Option<Attestation>, SourceError> {
        self.attestation(Request::new(QueryAttestationRequestByNonceRequest { nonce }))
            .await
    }

    async fn latest_nonce(&self) -> Result<u64, SourceError> {
        let response = self
            .client()
            .latest_attestation_nonce(QueryLatestAttestationNonceRequest {})
            .await
            .map_err(transport)?;
        Ok(response.into_inner().nonce)
    }

    async fn earliest_nonce(&self) -> Result<u64, SourceError> {
        let response = self
            .client()
            .earliest_attestation_nonce(QueryEarliestAttestationNonceRequest {})
            .await
            .map_err(transport)?;
        Ok(response.into_inner().nonce)
    }

    async fn get_valset_before(&self, nonce: u64) -> Result<Valset, SourceError> {
        let response = self
            .client()
            .latest_valset_request_before_nonce(QueryLatestValsetRequestBeforeNonceRequest {
                nonce,
            })
            .await;
        match response {
            Ok(response) => response
                .into_inner()
                .valset
                .ok_or(SourceError::ValsetNotFound(nonce))?
                .try_into(),
            Err(status) if status.code() == Code::NotFound => {
                Err(SourceError::ValsetNotFound(nonce))
            }
            Err(status) => Err(transport(status)),
        }
    }

    async fn get_data_root(&self, begin: u64, end: u64) -> Result<B256, SourceError> {
        let response = self
            .client()
            .data_root_tuple_root(QueryDataRootTupleRootRequest {
                begin_block: begin,
                end_block: end,
            })
            .await
            .map_err(transport)?;
        convert::data_root(&response.into_inner().data_root_tuple_root)
    }

    async fn subscribe_new_attestations(&self) -> Result<NonceStream, SourceError> {
        let start = self.latest_nonce().await?;
        tracing::debug!(start, poll_interval = ?self.poll_interval, "Polling for new attestations");

        let nonces = stream::unfold(
            (self.clone(), start, start),
            |(source, mut emitted, mut known)| async move {
                loop {
                    if emitted < known {
                        emitted += 1;
                        return Some((Ok(emitted), (source, emitted, known)));
                    }

                    tokio::time::sleep(source.poll_interval).await;
                    match source.latest_nonce().await {
                        Ok(latest) => known = known.max(latest),
                        Err(err) => return Some((Err(err), (source, emitted, known))),
                    }
                }
            },
        );
        Ok(nonces.boxed())
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        self.latest_height().await.map(|_| ())
    }

    async fn latest_height(&self) -> Result<u64, SourceError> {
        let response = self
            .client()
            .latest_height(QueryLatestHeightRequest {})
            .await
            .map_err(transport)?;
        Ok(response.into_inner().height)
    }

    async fn get_attestation_at_height(
        &self,
        nonce: u64,
        height: u64,
    ) -> Result<Option<Attestation>, SourceError> {
        let mut request = Request::new(QueryAttestationRequestByNonceRequest { nonce });
        request
            .metadata_mut()
            .insert(BLOCK_HEIGHT_HEADER, MetadataValue::from(height));
        self.attestation(request).await
    }
}
