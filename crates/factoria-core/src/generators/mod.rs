//! Deferred attribute values.
//!
//! A generator is a placeholder stored in an initializer or override map
//! that produces the real value when attributes are resolved. Each kind of
//! placeholder is one variant of [`Pending`]; the matching [`Generator`]
//! implementation does the work.
//!
//! Generators are bound to an engine through a [`GeneratorContext`]. The
//! context holds a weak handle, so binding after the engine has been
//! dropped fails with [`FactoryError::UnboundGenerator`].
//!
//! [`FactoryError::UnboundGenerator`]: crate::FactoryError::UnboundGenerator

mod assoc;
mod one_of;
mod random;
mod sequence;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::engine::{Engine, GeneratorContext};
use crate::error::{FactoryError, FactoryResult};
use crate::value::AttrValue;

pub use assoc::{
	AssocArgs, AssocAttrsGenerator, AssocAttrsManyGenerator, AssocGenerator, AssocManyArgs,
	AssocManyGenerator,
};
pub use one_of::{OneOfArgs, OneOfGenerator};
pub use random::{FakerSource, RandomArgs, RandomFn, RandomGenerator, RandomSource};
pub use sequence::{SequenceArgs, SequenceGenerator, SequenceRegistry};

/// A value producer bound to an engine.
#[async_trait]
pub trait Generator: Send + Sync + Sized {
	/// Arguments captured when the placeholder was created.
	type Args: Send + Sync;

	/// Binds a generator to the engine behind `ctx`.
	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self>;

	/// Produces one value.
	async fn generate(&self, args: &Self::Args) -> FactoryResult<AttrValue>;
}

/// Deferred closure producing a value at resolution time.
pub type LazyFn = Arc<dyn Fn() -> BoxFuture<'static, FactoryResult<AttrValue>> + Send + Sync>;

/// A placeholder awaiting resolution.
#[derive(Clone)]
pub enum Pending {
	/// Next number of a named or anonymous sequence.
	Sequence(SequenceArgs),
	/// A persisted model created by another factory.
	Assoc(AssocArgs),
	/// Several persisted models created by another factory.
	AssocMany(AssocManyArgs),
	/// Resolved attributes of another factory.
	AssocAttrs(AssocArgs),
	/// Several resolved attribute maps of another factory.
	AssocAttrsMany(AssocManyArgs),
	/// A value from the engine's random source.
	Random(RandomArgs),
	/// One element picked from a list.
	OneOf(OneOfArgs),
	/// A closure called at resolution time.
	Lazy(LazyFn),
}

impl Pending {
	/// Wraps a synchronous closure.
	pub fn lazy<F, V>(f: F) -> Self
	where
		F: Fn() -> V + Send + Sync + 'static,
		V: Into<AttrValue>,
	{
		Self::Lazy(Arc::new(move || {
			let value: AttrValue = f().into();
			future::ready(Ok::<_, FactoryError>(value)).boxed()
		}))
	}

	/// Wraps a closure returning a future.
	pub fn lazy_async<F, Fut>(f: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = FactoryResult<AttrValue>> + Send + 'static,
	{
		Self::Lazy(Arc::new(move || f().boxed()))
	}

	/// Short description used in logs and error messages.
	pub fn describe(&self) -> String {
		match self {
			Self::Sequence(args) => match args.id() {
				Some(id) => format!("sequence({id})"),
				None => "sequence".to_string(),
			},
			Self::Assoc(args) => format!("assoc({})", args.factory()),
			Self::AssocMany(args) => format!("assoc_many({}, {})", args.factory(), args.count()),
			Self::AssocAttrs(args) => format!("assoc_attrs({})", args.factory()),
			Self::AssocAttrsMany(args) => {
				format!("assoc_attrs_many({}, {})", args.factory(), args.count())
			}
			Self::Random(args) => format!("random({})", args.method_name()),
			Self::OneOf(args) => format!("one_of({})", args.len()),
			Self::Lazy(_) => "lazy".to_string(),
		}
	}

	/// Produces the value for this placeholder.
	///
	/// The result may itself be pending when a closure or list element
	/// returns another placeholder; resolution takes care of that.
	pub async fn generate(&self, engine: &Engine) -> FactoryResult<AttrValue> {
		match self {
			Self::Sequence(args) => run::<SequenceGenerator>(engine, args).await,
			Self::Assoc(args) => run::<AssocGenerator>(engine, args).await,
			Self::AssocMany(args) => run::<AssocManyGenerator>(engine, args).await,
			Self::AssocAttrs(args) => run::<AssocAttrsGenerator>(engine, args).await,
			Self::AssocAttrsMany(args) => run::<AssocAttrsManyGenerator>(engine, args).await,
			Self::Random(args) => run::<RandomGenerator>(engine, args).await,
			Self::OneOf(args) => run::<OneOfGenerator>(engine, args).await,
			Self::Lazy(f) => f().await,
		}
	}
}

async fn run<G: Generator>(engine: &Engine, args: &G::Args) -> FactoryResult<AttrValue> {
	G::bind(&engine.context())?.generate(args).await
}

impl fmt::Debug for Pending {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Pending({})", self.describe())
	}
}
