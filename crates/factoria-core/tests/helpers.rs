//! Shared helpers for factoria-core integration tests.

#[path = "helpers/adapters.rs"]
pub mod adapters;
#[path = "helpers/factories.rs"]
pub mod factories;
