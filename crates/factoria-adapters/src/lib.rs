//! Persistence adapters for factoria.
//!
//! - [`MemoryAdapter`] keeps saved models in per-model in-memory
//!   collections, assigning primary keys the way a document store does.
//! - [`ActiveModelAdapter`] delegates persistence to models implementing
//!   [`ActiveModel`].
//!
//! Both can be registered on an engine with
//! [`Engine::set_adapter`](factoria_core::Engine::set_adapter).

#![warn(missing_docs)]

pub mod active;
pub mod error;
pub mod memory;

pub use active::{ActiveModel, ActiveModelAdapter};
pub use error::StoreError;
pub use memory::MemoryAdapter;
