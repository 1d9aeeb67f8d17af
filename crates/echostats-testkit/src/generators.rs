//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::fixtures::TestFixture;

/// Generate a session nonce.
pub fn nonce() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a packet body that cannot contain a newline.
pub fn body(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(b'a'..=b'z', 0..=max_len)
}

/// One session's traffic as it arrives: any order, any duplicates, any gaps.
#[derive(Debug, Clone)]
pub struct DeliveryPlan {
    pub nonce: String,
    pub total: u64,
    pub arrivals: Vec<u64>,
    pub body: Vec<u8>,
}

impl DeliveryPlan {
    /// Packet numbers that arrived at least once.
    pub fn distinct(&self) -> BTreeSet<u64> {
        self.arrivals.iter().copied().collect()
    }

    /// Packet numbers that never arrived.
    pub fn missing(&self) -> Vec<u64> {
        let distinct = self.distinct();
        (0..self.total).filter(|n| !distinct.contains(n)).collect()
    }

    /// The framed packets, in arrival order.
    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.arrivals
            .iter()
            .map(|&n| TestFixture::packet(&self.nonce, n, self.total, &self.body))
            .collect()
    }
}

/// Generate a delivery plan for a session of at most `max_total` packets.
pub fn delivery_plan(max_total: u64) -> impl Strategy<Value = DeliveryPlan> {
    (nonce(), 1..=max_total, body(64)).prop_flat_map(|(nonce, total, body)| {
        prop::collection::vec(0..total, 0..(3 * total as usize))
            .prop_map(move |arrivals| DeliveryPlan {
                nonce: nonce.clone(),
                total,
                arrivals,
                body: body.clone(),
            })
    })
}

impl Arbitrary for DeliveryPlan {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        delivery_plan(40).boxed()
    }
}
