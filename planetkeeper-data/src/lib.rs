//! Orchestration of the external OSM tools for planetkeeper.
//!
//! Responsibilities:
//! - Acquire a snapshot over HTTP or from an object store.
//! - Extract named regions with one of three interchangeable strategies.
//! - Keep a snapshot current through an interval pipeline or a single call.
//!
//! Boundaries:
//! - Geometry, region and snapshot rules live in `planetkeeper-core`.
//! - Every external program runs through a
//!   [`planetkeeper_core::CommandRunner`]; nothing here spawns processes
//!   directly.
//!
//! Invariants:
//! - No global mutable state.
//! - A failed operation leaves on-disk state as the last completed step
//!   wrote it.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod acquire;
pub mod extract;
pub mod replication;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;
