//! The echo server: TCP and UDP listeners plus the flush task.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use echostats_store::{Batcher, RecordStore};

use crate::config::EchoConfig;
use crate::context::ServerContext;
use crate::error::{EchoError, Result};
use crate::transport::{serve_tcp, serve_udp};

/// A bound echo server, ready to run.
pub struct EchoServer<S: RecordStore + 'static> {
    config: EchoConfig,
    context: Arc<ServerContext<S>>,
    tcp: TcpListener,
    udp: Arc<UdpSocket>,
}

impl<S: RecordStore + 'static> EchoServer<S> {
    /// Bind TCP and UDP on the configured address.
    ///
    /// With port 0, UDP binds to whatever port TCP was given so both
    /// transports always share one port.
    pub async fn bind(config: EchoConfig, store: Arc<S>) -> Result<Self> {
        config.validate()?;

        let tcp = TcpListener::bind(config.listen).await?;
        let udp = UdpSocket::bind(tcp.local_addr()?).await?;

        let batcher = Arc::new(Batcher::new(store));
        Ok(Self {
            config,
            context: Arc::new(ServerContext::new(batcher)),
            tcp,
            udp: Arc::new(udp),
        })
    }

    /// The address both transports are bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.tcp.local_addr()?)
    }

    /// Shared state, for inspection.
    pub fn context(&self) -> &Arc<ServerContext<S>> {
        &self.context
    }

    /// Run until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run until `shutdown` resolves.
    ///
    /// On shutdown the listeners and open connections stop first; the flush
    /// task then writes whatever they left in the buffer and exits.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let EchoServer {
            config,
            context,
            tcp,
            udp,
        } = self;
        let addr = tcp.local_addr()?;

        let transports = CancellationToken::new();
        let flusher_token = CancellationToken::new();
        let tracker = TaskTracker::new();

        let flusher = tokio::spawn(
            context
                .batcher()
                .clone()
                .run(config.flush_interval, flusher_token.clone()),
        );

        tracing::info!(%addr, "Starting TCP echo server");
        tracker.spawn(serve_tcp(
            tcp,
            context.clone(),
            config.tcp_read_size,
            transports.clone(),
            tracker.clone(),
        ));
        tracing::info!(%addr, "Starting UDP echo server");
        tracker.spawn(serve_udp(
            udp,
            context.clone(),
            config.udp_read_size,
            transports.clone(),
            tracker.clone(),
        ));

        shutdown.await;
        tracing::info!("shutting down");

        transports.cancel();
        tracker.close();
        tracker.wait().await;

        flusher_token.cancel();
        flusher
            .await
            .map_err(|e| EchoError::Task(format!("flush task: {}", e)))?;

        let batcher = context.batcher();
        tracing::info!(
            sessions = context.registry().len(),
            written = batcher.records_written(),
            dropped = batcher.records_dropped(),
            "echo server stopped"
        );
        Ok(())
    }
}
