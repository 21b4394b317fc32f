//! Attribute resolution and object lifecycle engine for test fixtures.
//!
//! Factories describe the default attributes of a model. The [`Engine`]
//! resolves them into concrete values, builds models through a pluggable
//! [`Adapter`], persists them on request and destroys everything it created
//! when the test is done.
//!
//! # Quick Start
//!
//! ```
//! use factoria_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> FactoryResult<()> {
//! let engine = Engine::new();
//! engine.seed(7);
//!
//! engine.define(
//!     "User",
//!     ModelDescriptor::record("users"),
//!     attrs! {
//!         "id" => engine.seq("User.id"),
//!         "name" => engine.chance("name"),
//!         "role" => engine.one_of(vec!["admin", "member"]),
//!     },
//!     FactoryOptions::default(),
//! )?;
//! engine.define(
//!     "Post",
//!     ModelDescriptor::record("posts"),
//!     attrs! { "author_id" => engine.assoc("User").key("id") },
//!     FactoryOptions::default(),
//! )?;
//!
//! let posts = engine.create_many("Post", 2, ManyArg::None, ManyArg::None).await?;
//! assert_eq!(posts.len(), 2);
//! assert_eq!(engine.created_count(), 4);
//!
//! engine.cleanup().await?;
//! assert_eq!(engine.created_count(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`Attrs`] / [`AttrValue`] - ordered attribute maps and their values
//! - [`ModelDescriptor`] / [`Instance`] - model types and built models
//! - [`Factory`] - a model, its [`Initializer`] and [`FactoryOptions`]
//! - [`generators`] - deferred values: sequences, associations, random
//!   values, one-of picks and lazy closures
//! - [`Adapter`] - persistence contract; [`ObjectAdapter`] is the default
//! - [`Engine`] - registry, lifecycle operations and teardown

#![warn(missing_docs)]

pub mod adapter;
pub mod attrs;
pub mod engine;
pub mod error;
pub mod factory;
pub mod generators;
pub mod many;
pub mod model;
pub mod options;
pub mod prelude;
pub mod resolve;
pub mod tracking;
pub mod value;

pub use adapter::{Adapter, ObjectAdapter};
pub use attrs::{Attrs, BuildOptions};
pub use engine::{Engine, EngineBuilder, GeneratorContext};
pub use error::{AdapterError, ErrorKind, FactoryError, FactoryResult};
pub use factory::{Factory, FactoryOptions, Hook, Initializer};
pub use generators::{
	AssocArgs, AssocManyArgs, FakerSource, Generator, OneOfArgs, Pending, RandomArgs,
	RandomSource, SequenceArgs, SequenceRegistry,
};
pub use many::ManyArg;
pub use model::{Instance, ModelCodec, ModelDescriptor, RecordCodec, SerdeCodec};
pub use options::{EngineOptions, SEED_ENV_VAR};
pub use tracking::{CreatedList, CreatedRecord};
pub use value::{AttrValue, Opaque};
