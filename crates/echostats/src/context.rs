//! Shared server state handed to every connection handler.

use std::net::SocketAddr;
use std::sync::Arc;

use echostats_core::parse_header;
use echostats_store::{Batcher, RecordStore};

use crate::echo::rot13;
use crate::registry::SessionRegistry;

/// Everything a transport needs to process a packet.
///
/// Built once per process and shared through an `Arc`.
pub struct ServerContext<S: RecordStore> {
    registry: SessionRegistry<S>,
    batcher: Arc<Batcher<S>>,
}

impl<S: RecordStore> ServerContext<S> {
    pub fn new(batcher: Arc<Batcher<S>>) -> Self {
        Self {
            registry: SessionRegistry::new(batcher.clone()),
            batcher,
        }
    }

    pub fn registry(&self) -> &SessionRegistry<S> {
        &self.registry
    }

    pub fn batcher(&self) -> &Arc<Batcher<S>> {
        &self.batcher
    }

    /// Record statistics for one buffer and produce the echo reply.
    ///
    /// Instrumentation failures are logged and never change the reply.
    pub fn process(&self, peer: SocketAddr, data: &[u8], origin: &str) -> Vec<u8> {
        tracing::debug!(%peer, origin, "received {} bytes", data.len());
        let text = String::from_utf8_lossy(data);

        match parse_header(&text, data.len()) {
            Ok(Some(reception)) => {
                tracing::debug!(
                    %peer,
                    nonce = %reception.nonce,
                    packet_num = reception.packet_num,
                    total_expected = reception.total_expected,
                    payload_len = reception.payload_len,
                    "got magic header"
                );
                let reception = reception.with_address(peer.to_string());
                if let Err(violation) = self.registry.receive(reception) {
                    tracing::warn!(%peer, origin, error = %violation, "couldn't process packet");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%peer, origin, error = %e, "ignoring malformed header");
            }
        }

        rot13(&text).into_bytes()
    }
}
