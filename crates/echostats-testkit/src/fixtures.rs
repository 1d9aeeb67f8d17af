//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use echostats::sender::build_packet;
use echostats::ServerContext;
use echostats_core::{encode_header, SessionTracker};
use echostats_store::{Batcher, FlushOutcome, MemoryStore};

use crate::generators::DeliveryPlan;

/// A server context over a memory store, without any sockets.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub context: Arc<ServerContext<MemoryStore>>,
    pub peer: SocketAddr,
}

impl TestFixture {
    /// Fixture whose store has the receptions schema.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::receptions())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let batcher = Arc::new(Batcher::new(store.clone()));
        Self {
            store,
            context: Arc::new(ServerContext::new(batcher)),
            peer: SocketAddr::from(([127, 0, 0, 1], 40_000)),
        }
    }

    /// An instrumented packet: header line followed by `body`.
    pub fn packet(nonce: &str, packet_num: u64, total: u64, body: &[u8]) -> Vec<u8> {
        let mut packet = encode_header(nonce, packet_num, total).into_bytes();
        packet.extend_from_slice(body);
        packet
    }

    /// A packet padded with random digits, the way the sender builds them.
    pub fn padded_packet(nonce: &str, packet_num: u64, total: u64, packet_len: usize) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(packet_num);
        build_packet(&mut rng, nonce, packet_num, total, packet_len)
    }

    /// Process one buffer as if it arrived from `self.peer`.
    pub fn deliver(&self, data: &[u8]) -> Vec<u8> {
        self.context.process(self.peer, data, "fixture")
    }

    /// Deliver every packet of a plan in order, returning the packets sent.
    pub fn deliver_plan(&self, plan: &DeliveryPlan) -> Vec<Vec<u8>> {
        plan.packets()
            .into_iter()
            .inspect(|packet| {
                self.deliver(packet);
            })
            .collect()
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.context.batcher().flush().await
    }

    pub fn tracker(&self, nonce: &str) -> Option<SessionTracker> {
        self.context.registry().session(nonce)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
