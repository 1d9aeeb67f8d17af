//! # echostats Testkit
//!
//! Testing utilities for echostats.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: an in-memory server context with helpers to deliver packets
//! - **Generators**: Proptest strategies for nonces and delivery plans
//!
//! ## Test Fixtures
//!
//! ```rust
//! use echostats_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let reply = fixture.deliver(&TestFixture::packet("n1", 0, 3, b"body"));
//! assert!(reply.starts_with(b"zntvpurnqre:"));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use echostats_testkit::generators::DeliveryPlan;
//!
//! proptest! {
//!     #[test]
//!     fn every_delivery_is_echoed(plan: DeliveryPlan) {
//!         let fixture = TestFixture::new();
//!         fixture.deliver_plan(&plan);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::TestFixture;
pub use generators::{delivery_plan, nonce, DeliveryPlan};
