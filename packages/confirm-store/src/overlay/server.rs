//! gRPC service exposing a [`Replica`] to the network.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::{
    rpc::{
        replica_service_server::ReplicaService, GetRecordRequest, GetRecordResponse,
        PutRecordRequest, PutRecordResponse,
    },
    Replica,
};

/// Serves a replica over gRPC.
#[derive(Debug, Clone)]
pub struct ReplicaNode {
    replica: Arc<Replica>,
}

impl ReplicaNode {
    /// Creates a node serving `replica`.
    #[must_use]
    pub const fn new(replica: Arc<Replica>) -> Self {
        Self { replica }
    }
}

#[tonic::async_trait]
impl ReplicaService for ReplicaNode {
    #[tracing::instrument(skip_all, fields(key = %request.get_ref().key))]
    async fn put_record(
        &self,
        request: Request<PutRecordRequest>,
    ) -> Result<Response<PutRecordResponse>, Status> {
        let PutRecordRequest { key, value } = request.into_inner();
        self.replica.put(&key, value).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected record");
            Status::from(e)
        })?;
        Ok(Response::new(PutRecordResponse {}))
    }

    async fn get_record(
        &self,
        request: Request<GetRecordRequest>,
    ) -> Result<Response<GetRecordResponse>, Status> {
        let value = self.replica.get(&request.into_inner().key).await;
        Ok(Response::new(GetRecordResponse { value }))
    }
}
