//! Convenience re-exports for common usage.
//!
//! ```
//! use factoria_core::prelude::*;
//!
//! let engine = Engine::new();
//! let attrs = attrs! { "id" => engine.sequence() };
//! assert!(!attrs.is_resolved());
//! ```

pub use crate::attrs;

pub use crate::adapter::{Adapter, ObjectAdapter};
pub use crate::attrs::{Attrs, BuildOptions};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{AdapterError, FactoryError, FactoryResult};
pub use crate::factory::{Factory, FactoryOptions, Hook, Initializer};
pub use crate::generators::{Pending, RandomSource};
pub use crate::many::ManyArg;
pub use crate::model::{Instance, ModelDescriptor};
pub use crate::options::EngineOptions;
pub use crate::value::AttrValue;
