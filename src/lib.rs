//! # Factoria
//!
//! Test fixture factories for Rust.
//!
//! A factory names a model and describes its default attributes. Attribute
//! values may be plain data or deferred generators: sequences, random fake
//! data, picks from a list, associations to other factories and lazy
//! closures. The engine resolves them on every build, persists models
//! through an adapter on create and destroys everything it created during
//! cleanup, newest first.
//!
//! ## Feature Flags
//!
//! - `adapters` (default) - Bundled persistence adapters: an in-memory
//!   document store and an adapter for self-persisting models
//!
//! ## Quick Example
//!
//! ```
//! use factoria::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> FactoryResult<()> {
//! let store = Arc::new(MemoryAdapter::new());
//! let engine = Engine::builder().default_adapter(store.clone()).build();
//!
//! engine.define(
//!     "User",
//!     ModelDescriptor::record("users"),
//!     attrs! {
//!         "email" => engine.seq("User.email").map(|n| format!("user{n}@example.com")),
//!         "name" => engine.chance("name"),
//!     },
//!     FactoryOptions::default(),
//! )?;
//!
//! let user = engine.create("User", attrs! {}, attrs! {}).await?;
//! assert_eq!(
//!     user.get("email")?,
//!     Some(AttrValue::from("user1@example.com"))
//! );
//! assert_eq!(store.count("users"), 1);
//!
//! engine.cleanup().await?;
//! assert_eq!(store.count("users"), 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use factoria_core::*;

#[cfg(feature = "adapters")]
pub use factoria_adapters as adapters;

#[cfg(feature = "adapters")]
pub use factoria_adapters::{ActiveModel, ActiveModelAdapter, MemoryAdapter, StoreError};

/// Convenience re-exports for common usage.
pub mod prelude {
	pub use factoria_core::prelude::*;

	// External
	pub use async_trait::async_trait;
	pub use serde::{Deserialize, Serialize};

	#[cfg(feature = "adapters")]
	pub use factoria_adapters::{ActiveModel, ActiveModelAdapter, MemoryAdapter};
}
