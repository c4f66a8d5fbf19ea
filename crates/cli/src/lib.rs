//! ddrgate: governance for decision contracts.
//!
//! The binary wraps the engine with a scenario harness, hash utilities and
//! the HTTP gateway. The harness lives here so integration tests can drive
//! it directly.

pub mod harness;
