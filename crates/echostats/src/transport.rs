//! TCP and UDP echo loops.
//!
//! Both loops share one [`ServerContext`] and stop when the shutdown token is
//! cancelled. Every TCP connection and every UDP datagram is handled in its
//! own task on the shared [`TaskTracker`].

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use echostats_store::RecordStore;

use crate::context::ServerContext;

/// Accept TCP connections until `shutdown` is cancelled.
///
/// Accept errors are retried with exponential back-off capped at one second.
pub async fn serve_tcp<S: RecordStore + 'static>(
    listener: TcpListener,
    ctx: Arc<ServerContext<S>>,
    read_size: usize,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    let mut delay = Duration::from_millis(10);
    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            res = listener.accept() => match res {
                Ok((stream, peer)) => {
                    tracker.spawn(handle_connection(
                        stream,
                        peer,
                        ctx.clone(),
                        read_size,
                        shutdown.clone(),
                    ));
                    delay = Duration::from_millis(10);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept error");
                    sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(1));
                }
            },
        }
    }
    tracing::debug!("tcp accept loop stopped");
}

/// Echo one TCP connection until the peer closes it.
async fn handle_connection<S: RecordStore>(
    mut stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<ServerContext<S>>,
    read_size: usize,
    shutdown: CancellationToken,
) {
    tracing::info!(%peer, "new tcp connection");
    let mut buf = vec![0u8; read_size];

    loop {
        let n = tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            res = stream.read(&mut buf) => match res {
                Ok(0) => {
                    tracing::info!(%peer, "closed");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "tcp read failed");
                    return;
                }
            },
        };

        let reply = ctx.process(peer, &buf[..n], "tcp");
        if let Err(e) = stream.write_all(&reply).await {
            tracing::warn!(%peer, error = %e, "tcp write failed");
            return;
        }
    }
    tracing::debug!(%peer, "connection closed by shutdown");
}

/// Receive UDP datagrams until `shutdown` is cancelled, replying to each.
pub async fn serve_udp<S: RecordStore + 'static>(
    socket: Arc<UdpSocket>,
    ctx: Arc<ServerContext<S>>,
    read_size: usize,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    let mut buf = vec![0u8; read_size];
    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            res = socket.recv_from(&mut buf) => match res {
                Ok((n, peer)) => {
                    let datagram = Bytes::copy_from_slice(&buf[..n]);
                    let socket = socket.clone();
                    let ctx = ctx.clone();
                    tracker.spawn(async move {
                        let reply = ctx.process(peer, &datagram, "udp");
                        if let Err(e) = socket.send_to(&reply, peer).await {
                            tracing::warn!(%peer, error = %e, "udp send failed");
                        }
                    });
                }
                Err(e) => {
                    // Errors here are per-datagram (e.g. ICMP port unreachable
                    // from an earlier reply); the socket itself stays usable.
                    tracing::warn!(error = %e, "error receiving from datagram socket");
                }
            },
        }
    }
    tracing::debug!("udp receive loop stopped");
}
