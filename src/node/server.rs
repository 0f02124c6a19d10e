//! Node server

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

use crate::common::{make_server_id, Error, NodeConfig, Result};
use crate::node::client::{GrpcPeerClient, PeerTransport};
use crate::node::context::NodeContext;
use crate::node::coordinator::Coordinator;
use crate::node::grpc::NodeGrpcService;
use crate::node::queue::CommandQueue;
use crate::node::registry::StatusRegistry;
use crate::table::{HttpTable, StatusTable};

pub struct NodeServer {
    config: NodeConfig,
    table: Option<Arc<dyn StatusTable>>,
    transport: Option<Arc<dyn PeerTransport>>,
}

impl NodeServer {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            table: None,
            transport: None,
        }
    }

    /// Use `table` instead of connecting to `config.table_url`
    pub fn with_table(mut self, table: Arc<dyn StatusTable>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn PeerTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Bind the configured address and serve until SIGINT/SIGTERM or `$kill you`
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.grpc_addr).await?;
        self.serve_with_listener(listener, shutdown_signal()).await
    }

    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let monitor = self.config.monitor.clone();
        monitor.validate()?;

        let port = listener.local_addr()?.port();
        let server_id = make_server_id(&self.config.advertise_host, port, Local::now());

        let table: Arc<dyn StatusTable> = match self.table {
            Some(table) => table,
            None => Arc::new(HttpTable::new(self.config.table_url.clone())?),
        };
        let transport: Arc<dyn PeerTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(GrpcPeerClient::new(monitor.call_timeout())),
        };

        tracing::info!("Starting meerkat {} node: {}", crate::VERSION, server_id);
        tracing::info!("  gRPC API: {}", listener.local_addr()?);
        tracing::info!("  Status table: {}", self.config.table_url);
        tracing::info!("  Timer: {:?}", monitor.timer_period());

        let ctx = Arc::new(NodeContext::new(
            server_id.clone(),
            monitor.timer_period(),
            monitor.kill_grace(),
        ));
        let registry = StatusRegistry::new(table.clone(), monitor.clone());
        let queue = CommandQueue::new(table, monitor.clone());

        // Register this node in the status table
        let row = registry.register(&server_id).await?;

        let coordinator = Coordinator::new(
            ctx.clone(),
            registry.clone(),
            queue,
            transport,
            monitor,
        )
        .with_own_row(row);
        let coordinator_stop = ctx.shutdown().subscribe();
        let coordinator_handle = tokio::spawn(async move {
            coordinator.run(coordinator_stop).await;
        });

        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(crate::proto::FILE_DESCRIPTOR_SET)
            .build_v1()
            .map_err(|e| Error::Internal(format!("reflection service: {}", e)))?;

        let grpc_service = NodeGrpcService::new(ctx.clone());
        let mut killed = ctx.shutdown().subscribe();
        let stop = async move {
            tokio::select! {
                _ = signal => tracing::info!("shutdown signal received"),
                _ = async { killed.wait_for(|stop| *stop).await.is_ok() } => {
                    tracing::info!("stopping on remote request")
                }
            }
        };

        tracing::info!("✓ Meer-Kat ready: grpc://{}:{}", self.config.advertise_host, port);

        let served = tonic::transport::Server::builder()
            .add_service(grpc_service.child_status_server())
            .add_service(grpc_service.run_command_server())
            .add_service(reflection)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), stop)
            .await;

        ctx.shutdown().trigger();
        if let Err(e) = coordinator_handle.await {
            tracing::error!("coordinator task failed: {}", e);
        }

        // Leave the registry even when the server failed
        match registry.retire(row).await {
            Ok(()) => tracing::info!("row {} released", row),
            Err(e) => tracing::error!("could not clear check bit of row {}: {}", row, e),
        }

        served?;
        Ok(())
    }
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
