//! # pocx-tests
//!
//! Integration tests for the PoCX node.
//!
//! This crate provides cross-crate testing:
//! - A harness that forges real, fully-validated blocks onto an in-memory
//!   chain without waiting out deadlines
//! - End-to-end forging through the scheduler
//! - Assignment lifecycle tests spanning wallet, chain and consensus
//! - Property-based tests for the consensus invariants

pub mod harness;


#[cfg(test)]
mod assignment_tests;



pub use harness::*;
