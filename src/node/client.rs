//! Peer gRPC client helpers

use std::time::Duration;

use crate::common::{Error, Result};
use crate::proto::child_status_client::ChildStatusClient;
use crate::proto::run_command_client::RunCommandClient;
use crate::proto::{self, Empty};
use tonic::transport::{Channel, Endpoint};

/// Outbound calls the coordinator makes to its peers
#[tonic::async_trait]
pub trait PeerTransport: Send + Sync {
    /// Liveness poll of the node at `addr` (`host:port`)
    async fn get_child_status(&self, addr: &str) -> Result<proto::Status>;

    async fn run_command(&self, addr: &str, cmd: proto::Command) -> Result<proto::CommandResult>;
}

/// Plain-text gRPC transport with a per-call deadline
pub struct GrpcPeerClient {
    timeout: Duration,
}

impl GrpcPeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn channel(&self, addr: &str) -> Result<Channel> {
        let endpoint = Endpoint::from_shared(format!("http://{}", addr))?
            .connect_timeout(self.timeout)
            .timeout(self.timeout);
        endpoint.connect().await.map_err(|e| Error::Unreachable {
            peer: addr.to_string(),
            reason: e.to_string(),
        })
    }

    /// Bound a whole call (connect + request) by the deadline
    async fn with_deadline<T>(
        &self,
        addr: &str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Timeout(format!("{} after {:?}", addr, self.timeout)))?
    }
}

#[tonic::async_trait]
impl PeerTransport for GrpcPeerClient {
    async fn get_child_status(&self, addr: &str) -> Result<proto::Status> {
        self.with_deadline(addr, async {
            let mut client = ChildStatusClient::new(self.channel(addr).await?);
            let resp = client.get_child_status(Empty {}).await?;
            Ok(resp.into_inner())
        })
        .await
    }

    async fn run_command(&self, addr: &str, cmd: proto::Command) -> Result<proto::CommandResult> {
        self.with_deadline(addr, async {
            let mut client = RunCommandClient::new(self.channel(addr).await?);
            let resp = client.run_command(cmd).await?;
            Ok(resp.into_inner())
        })
        .await
    }
}
