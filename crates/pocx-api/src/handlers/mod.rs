//! Request handlers.

pub mod assignments;
pub mod mining;
