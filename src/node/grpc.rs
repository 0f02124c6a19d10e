//! Node gRPC service
//!
//! Every node answers liveness polls and remote commands. Serving a
//! liveness poll resets the node's own heartbeat timer: a node that is
//! being polled knows some other node is coordinating this round.

use std::sync::Arc;

use crate::common::current_time;
use crate::node::command::CommandType;
use crate::node::context::NodeContext;
use crate::node::ladder::NodeStatus;
use crate::proto::child_status_server::{ChildStatus, ChildStatusServer};
use crate::proto::run_command_server::{RunCommand, RunCommandServer};
use crate::proto::{self, Empty};
use tonic::{Request, Response, Status};

/// NodeGrpcService implements both node-facing services.
#[derive(Clone)]
pub struct NodeGrpcService {
    ctx: Arc<NodeContext>,
}

impl NodeGrpcService {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    pub fn child_status_server(&self) -> ChildStatusServer<Self> {
        ChildStatusServer::new(self.clone())
    }

    pub fn run_command_server(&self) -> RunCommandServer<Self> {
        RunCommandServer::new(self.clone())
    }
}

#[tonic::async_trait]
impl ChildStatus for NodeGrpcService {
    /// A reachable node always reports itself live.
    async fn get_child_status(
        &self,
        _req: Request<Empty>,
    ) -> Result<Response<proto::Status>, Status> {
        self.ctx.timer().reset();
        tracing::debug!("liveness poll served, timer reset");

        Ok(Response::new(proto::Status {
            server_id: self.ctx.server_id().to_string(),
            status: NodeStatus::Live.to_string(),
            time: current_time(),
        }))
    }
}

#[tonic::async_trait]
impl RunCommand for NodeGrpcService {
    async fn run_command(
        &self,
        req: Request<proto::Command>,
    ) -> Result<Response<proto::CommandResult>, Status> {
        let cmd = req.into_inner();
        let cmd_type: CommandType = cmd.cmdtype.parse().map_err(|e: crate::Error| {
            tracing::warn!("rejecting command {}: {}", cmd.cmdid, e);
            e.to_grpc_status()
        })?;

        let result = self
            .ctx
            .run_remote(cmd_type, &cmd.cmd)
            .map_err(|e| {
                tracing::info!("command {} refused: {}", cmd.cmdid, e);
                e.to_grpc_status()
            })?;

        tracing::info!(
            "[{}] {}-{}",
            self.ctx.server_id(),
            cmd.cmd,
            result
        );

        Ok(Response::new(proto::CommandResult {
            server_id: self.ctx.server_id().to_string(),
            cmd: cmd.cmd,
            result,
            time: current_time(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service() -> (NodeGrpcService, Arc<NodeContext>) {
        let ctx = Arc::new(NodeContext::new(
            "node-7:4096-1",
            Duration::from_secs(5),
            Duration::from_secs(5),
        ));
        (NodeGrpcService::new(ctx.clone()), ctx)
    }

    fn command(cmd_type: &str, cmd: &str) -> Request<proto::Command> {
        Request::new(proto::Command {
            cmdid: "c-1".into(),
            cmdtype: cmd_type.into(),
            cmd: cmd.into(),
        })
    }

    #[tokio::test]
    async fn test_get_child_status_reports_live() {
        let (svc, _) = service();
        let status = svc
            .get_child_status(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(status.server_id, "node-7:4096-1");
        assert_eq!(status.status, "L");
        assert!(!status.time.is_empty());
    }

    #[tokio::test]
    async fn test_run_command_all() {
        let (svc, _) = service();
        let result = svc
            .run_command(command("ALL", "$print hello world"))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(result.result, "hello world");
        assert_eq!(result.cmd, "$print hello world");
        assert_eq!(result.server_id, "node-7:4096-1");
    }

    #[tokio::test]
    async fn test_momkat_fails_fast_on_regular_node() {
        let (svc, _) = service();
        let err = svc
            .run_command(command("MOMKAT", "$whoareu"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::FailedPrecondition);
    }

    #[tokio::test]
    async fn test_unknown_command_type() {
        let (svc, _) = service();
        let err = svc.run_command(command("SOME", "$whoareu")).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}
