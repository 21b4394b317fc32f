//! Factory definitions.
//!
//! A [`Factory`] pairs a model with an [`Initializer`] describing its
//! default attributes and with per-factory [`FactoryOptions`]. Factories
//! are registered on an [`Engine`](crate::Engine), which supplies the
//! adapter and the generator context when they run.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture, try_join_all};
use serde_json::Value as JsonValue;

use crate::adapter::{Adapter, adapter_failure};
use crate::attrs::{Attrs, BuildOptions};
use crate::engine::Engine;
use crate::error::{FactoryError, FactoryResult};
use crate::many::{ManyArg, validate_count};
use crate::model::{Instance, ModelDescriptor};
use crate::resolve::resolve_attrs;
use crate::value::AttrValue;

type HookFn = dyn Fn(Instance, Attrs, BuildOptions) -> BoxFuture<'static, FactoryResult<Instance>>
	+ Send
	+ Sync;

/// Lifecycle callback run after a model is built or created.
///
/// Receives the model together with the overrides and build options of the
/// call, and returns the model to hand on.
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
	/// Wraps a synchronous callback.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(Instance, &Attrs, &BuildOptions) -> FactoryResult<Instance> + Send + Sync + 'static,
	{
		Self(Arc::new(move |model, overrides, options| {
			future::ready(f(model, &overrides, &options)).boxed()
		}))
	}

	/// Wraps an asynchronous callback.
	pub fn from_async<F, Fut>(f: F) -> Self
	where
		F: Fn(Instance, Attrs, BuildOptions) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = FactoryResult<Instance>> + Send + 'static,
	{
		Self(Arc::new(move |model, overrides, options| {
			f(model, overrides, options).boxed()
		}))
	}

	/// Runs the callback.
	pub async fn call(
		&self,
		model: Instance,
		overrides: &Attrs,
		options: &BuildOptions,
	) -> FactoryResult<Instance> {
		(self.0)(model, overrides.clone(), options.clone()).await
	}
}

impl fmt::Debug for Hook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Hook")
	}
}

type InitializerFn = dyn Fn(BuildOptions) -> BoxFuture<'static, FactoryResult<Attrs>> + Send + Sync;

/// Source of a factory's default attributes.
#[derive(Clone)]
pub enum Initializer {
	/// Static map, copied on every use.
	Attrs(Attrs),
	/// Function of the build options.
	Func(Arc<InitializerFn>),
}

impl Initializer {
	/// Wraps a synchronous initializer function.
	///
	/// # Examples
	///
	/// ```
	/// use factoria_core::{Initializer, attrs};
	///
	/// let init = Initializer::from_fn(|options| {
	///     let admin = options.get("admin").and_then(|v| v.as_bool()).unwrap_or(false);
	///     attrs! { "role" => if admin { "admin" } else { "user" } }
	/// });
	/// assert!(init.is_fn());
	/// ```
	pub fn from_fn<F>(f: F) -> Self
	where
		F: Fn(&BuildOptions) -> Attrs + Send + Sync + 'static,
	{
		Self::Func(Arc::new(move |options: BuildOptions| {
			future::ready(Ok::<_, FactoryError>(f(&options))).boxed()
		}))
	}

	/// Wraps an asynchronous initializer function.
	pub fn from_async<F, Fut>(f: F) -> Self
	where
		F: Fn(BuildOptions) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = FactoryResult<Attrs>> + Send + 'static,
	{
		Self::Func(Arc::new(move |options| f(options).boxed()))
	}

	/// Returns true for function initializers.
	pub fn is_fn(&self) -> bool {
		matches!(self, Self::Func(_))
	}

	/// Produces a fresh attribute map.
	pub async fn produce(&self, options: &BuildOptions) -> FactoryResult<Attrs> {
		match self {
			Self::Attrs(attrs) => Ok(attrs.clone()),
			Self::Func(f) => f(options.clone()).await,
		}
	}

	/// Combines a parent and a child initializer, child winning per key.
	///
	/// Two maps merge directly. Otherwise the result is a function that
	/// runs both and merges their output.
	pub fn inherit(parent: &Initializer, child: &Initializer) -> Initializer {
		match (parent, child) {
			(Self::Attrs(parent), Self::Attrs(child)) => {
				let mut merged = parent.clone();
				merged.extend(child.clone());
				Self::Attrs(merged)
			}
			_ => {
				let parent = parent.clone();
				let child = child.clone();
				Self::Func(Arc::new(move |options| {
					let parent = parent.clone();
					let child = child.clone();
					async move {
						let mut merged = parent.produce(&options).await?;
						merged.extend(child.produce(&options).await?);
						Ok::<_, FactoryError>(merged)
					}
					.boxed()
				}))
			}
		}
	}
}

impl fmt::Debug for Initializer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Attrs(attrs) => f.debug_tuple("Attrs").field(attrs).finish(),
			Self::Func(_) => f.write_str("Func"),
		}
	}
}

impl From<Attrs> for Initializer {
	fn from(attrs: Attrs) -> Self {
		Self::Attrs(attrs)
	}
}

impl TryFrom<AttrValue> for Initializer {
	type Error = FactoryError;

	fn try_from(value: AttrValue) -> Result<Self, Self::Error> {
		match value {
			AttrValue::Map(attrs) => Ok(Self::Attrs(attrs)),
			other => Err(FactoryError::InvalidInitializer(format!(
				"expected a map or a function, got {}",
				other.kind_name()
			))),
		}
	}
}

impl TryFrom<JsonValue> for Initializer {
	type Error = FactoryError;

	fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
		Self::try_from(AttrValue::from(value))
	}
}

/// Per-factory options.
#[derive(Debug, Clone, Default)]
pub struct FactoryOptions {
	/// Runs after every build of this factory.
	pub after_build: Option<Hook>,
	/// Runs after every create of this factory, once the model is saved.
	pub after_create: Option<Hook>,
	/// Model of an extended factory; ignored by `define`.
	pub model: Option<ModelDescriptor>,
	/// Opaque options for adapters.
	pub adapter_options: Attrs,
}

impl FactoryOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the after-build hook.
	pub fn with_after_build(mut self, hook: Hook) -> Self {
		self.after_build = Some(hook);
		self
	}

	/// Sets the after-create hook.
	pub fn with_after_create(mut self, hook: Hook) -> Self {
		self.after_create = Some(hook);
		self
	}

	/// Sets the model used by `extend`.
	pub fn with_model(mut self, model: ModelDescriptor) -> Self {
		self.model = Some(model);
		self
	}

	/// Adds an adapter option.
	pub fn with_adapter_option(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.adapter_options.insert(key, value);
		self
	}

	/// Shallow merge with `child` winning per key.
	pub fn merged(&self, child: &FactoryOptions) -> FactoryOptions {
		let mut adapter_options = self.adapter_options.clone();
		adapter_options.extend(child.adapter_options.clone());
		FactoryOptions {
			after_build: child.after_build.clone().or_else(|| self.after_build.clone()),
			after_create: child.after_create.clone().or_else(|| self.after_create.clone()),
			model: child.model.clone().or_else(|| self.model.clone()),
			adapter_options,
		}
	}
}

/// A named recipe for one model.
#[derive(Debug, Clone)]
pub struct Factory {
	model: ModelDescriptor,
	initializer: Initializer,
	options: FactoryOptions,
}

impl Factory {
	/// Creates a factory, validating the model.
	pub fn new(
		model: ModelDescriptor,
		initializer: impl Into<Initializer>,
		options: FactoryOptions,
	) -> FactoryResult<Self> {
		model.validate()?;
		Ok(Self {
			model,
			initializer: initializer.into(),
			options,
		})
	}

	/// Model built by this factory.
	pub fn model(&self) -> &ModelDescriptor {
		&self.model
	}

	/// Default attribute source.
	pub fn initializer(&self) -> &Initializer {
		&self.initializer
	}

	/// Factory options.
	pub fn options(&self) -> &FactoryOptions {
		&self.options
	}

	/// Unresolved default attributes for one item.
	pub async fn factory_attrs(&self, options: &BuildOptions) -> FactoryResult<Attrs> {
		self.initializer.produce(options).await
	}

	/// Resolved attributes: defaults, deep-merged overrides, generators run.
	pub async fn attrs(
		&self,
		engine: &Engine,
		overrides: &Attrs,
		options: &BuildOptions,
	) -> FactoryResult<Attrs> {
		let mut attrs = self.factory_attrs(options).await?;
		attrs.merge_deep(overrides);
		resolve_attrs(engine, attrs).await
	}

	/// Resolves `num` attribute maps concurrently.
	pub async fn attrs_many(
		&self,
		engine: &Engine,
		num: usize,
		overrides: &ManyArg,
		options: &ManyArg,
	) -> FactoryResult<Vec<Attrs>> {
		validate_count(num)?;
		let empty = Attrs::new();
		let overrides = overrides.expand("attrs", num, &empty)?;
		let options = options.expand("buildOptions", num, &empty)?;
		try_join_all(
			overrides
				.into_iter()
				.zip(options)
				.map(|(overrides, options)| self.attrs(engine, overrides, options)),
		)
		.await
	}

	/// Builds one model and runs the after-build hook.
	pub async fn build(
		&self,
		engine: &Engine,
		adapter: &dyn Adapter,
		overrides: &Attrs,
		options: &BuildOptions,
	) -> FactoryResult<Instance> {
		let attrs = self.attrs(engine, overrides, options).await?;
		let model = adapter
			.build(&self.model, attrs)
			.await
			.map_err(adapter_failure)?;
		match &self.options.after_build {
			Some(hook) => hook.call(model, overrides, options).await,
			None => Ok(model),
		}
	}

	/// Builds, saves and runs the after-create hook.
	pub async fn create(
		&self,
		engine: &Engine,
		adapter: &dyn Adapter,
		overrides: &Attrs,
		options: &BuildOptions,
	) -> FactoryResult<Instance> {
		let model = self.build(engine, adapter, overrides, options).await?;
		let saved = adapter
			.save(model, &self.model)
			.await
			.map_err(adapter_failure)?;
		match &self.options.after_create {
			Some(hook) => hook.call(saved, overrides, options).await,
			None => Ok(saved),
		}
	}

	/// Builds `num` models concurrently.
	pub async fn build_many(
		&self,
		engine: &Engine,
		adapter: &dyn Adapter,
		num: usize,
		overrides: &ManyArg,
		options: &ManyArg,
	) -> FactoryResult<Vec<Instance>> {
		validate_count(num)?;
		let empty = Attrs::new();
		let overrides = overrides.expand("attrs", num, &empty)?;
		let options = options.expand("buildOptions", num, &empty)?;
		try_join_all(
			overrides
				.into_iter()
				.zip(options)
				.map(|(overrides, options)| self.build(engine, adapter, overrides, options)),
		)
		.await
	}

	/// Creates `num` models concurrently.
	pub async fn create_many(
		&self,
		engine: &Engine,
		adapter: &dyn Adapter,
		num: usize,
		overrides: &ManyArg,
		options: &ManyArg,
	) -> FactoryResult<Vec<Instance>> {
		validate_count(num)?;
		let empty = Attrs::new();
		let overrides = overrides.expand("attrs", num, &empty)?;
		let options = options.expand("buildOptions", num, &empty)?;
		try_join_all(
			overrides
				.into_iter()
				.zip(options)
				.map(|(overrides, options)| self.create(engine, adapter, overrides, options)),
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapter::ObjectAdapter;
	use crate::generators::SequenceArgs;
	use rstest::{fixture, rstest};
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[fixture]
	fn engine() -> Engine {
		Engine::new()
	}

	fn dummy_factory(initializer: impl Into<Initializer>) -> Factory {
		Factory::new(
			ModelDescriptor::record("dummy"),
			initializer,
			FactoryOptions::default(),
		)
		.unwrap()
	}

	#[rstest]
	fn test_rejects_invalid_model() {
		let result = Factory::new(
			ModelDescriptor::record(""),
			Attrs::new(),
			FactoryOptions::default(),
		);
		assert!(matches!(result, Err(FactoryError::InvalidModel(_))));
	}

	#[rstest]
	#[case(AttrValue::from(2))]
	#[case(AttrValue::from("attrs"))]
	#[case(AttrValue::from(vec![1]))]
	fn test_rejects_non_map_initializer(#[case] value: AttrValue) {
		assert!(matches!(
			Initializer::try_from(value),
			Err(FactoryError::InvalidInitializer(_))
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_static_initializer_is_copied(engine: Engine) {
		let factory = dummy_factory(crate::attrs! { "nested" => { "n" => 1 } });

		let mut first = factory.factory_attrs(&Attrs::new()).await.unwrap();
		first.insert("nested", 2);
		let second = factory.factory_attrs(&Attrs::new()).await.unwrap();

		assert_eq!(second.get_path("nested.n"), Some(&AttrValue::Int(1)));
		let resolved = factory
			.attrs(&engine, &Attrs::new(), &Attrs::new())
			.await
			.unwrap();
		assert_eq!(resolved, crate::attrs! { "nested" => { "n" => 1 } });
	}

	#[rstest]
	#[tokio::test]
	async fn test_function_initializer_receives_build_options(engine: Engine) {
		let factory = dummy_factory(Initializer::from_fn(|options| {
			crate::attrs! { "echo" => options.get("value").cloned() }
		}));

		let attrs = factory
			.attrs(&engine, &Attrs::new(), &crate::attrs! { "value" => "x" })
			.await
			.unwrap();

		assert_eq!(attrs, crate::attrs! { "echo" => "x" });
	}

	#[rstest]
	#[tokio::test]
	async fn test_async_initializer(engine: Engine) {
		let factory = dummy_factory(Initializer::from_async(|_| async {
			Ok(crate::attrs! { "name" => "async" })
		}));

		let attrs = factory
			.attrs(&engine, &Attrs::new(), &Attrs::new())
			.await
			.unwrap();

		assert_eq!(attrs, crate::attrs! { "name" => "async" });
	}

	#[rstest]
	#[tokio::test]
	async fn test_overrides_merge_deeply(engine: Engine) {
		let factory = dummy_factory(crate::attrs! {
			"name" => "Bruce",
			"address" => { "city" => "Gotham", "zip" => "10001" },
		});

		let attrs = factory
			.attrs(
				&engine,
				&crate::attrs! { "address" => { "city" => "Bludhaven" } },
				&Attrs::new(),
			)
			.await
			.unwrap();

		assert_eq!(
			attrs,
			crate::attrs! {
				"name" => "Bruce",
				"address" => { "city" => "Bludhaven", "zip" => "10001" },
			}
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_overrides_may_be_generators(engine: Engine) {
		let factory = dummy_factory(crate::attrs! { "id" => 0 });

		let attrs = factory
			.attrs(
				&engine,
				&crate::attrs! { "id" => SequenceArgs::named("override") },
				&Attrs::new(),
			)
			.await
			.unwrap();

		assert_eq!(attrs.get("id"), Some(&AttrValue::Int(1)));
	}

	#[rstest]
	#[case(0)]
	#[tokio::test]
	async fn test_attrs_many_rejects_invalid_num(engine: Engine, #[case] num: usize) {
		let factory = dummy_factory(Attrs::new());

		let result = factory
			.attrs_many(&engine, num, &ManyArg::None, &ManyArg::None)
			.await;

		assert!(matches!(
			result,
			Err(FactoryError::ValidationError { ref field, .. }) if field == "num"
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_attrs_many_rejects_invalid_shapes(engine: Engine) {
		let factory = dummy_factory(Attrs::new());

		let result = factory
			.attrs_many(&engine, 2, &ManyArg::from(AttrValue::from(2)), &ManyArg::None)
			.await;

		assert!(matches!(result, Err(FactoryError::ValidationError { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_attrs_many_per_item_overrides(engine: Engine) {
		let factory = dummy_factory(crate::attrs! { "name" => "default" });

		let list = factory
			.attrs_many(
				&engine,
				3,
				&ManyArg::from(vec![
					crate::attrs! { "name" => "a" },
					crate::attrs! { "name" => "b" },
				]),
				&ManyArg::None,
			)
			.await
			.unwrap();

		let names: Vec<_> = list.iter().map(|a| a.get("name").cloned()).collect();
		assert_eq!(
			names,
			vec![
				Some(AttrValue::from("a")),
				Some(AttrValue::from("b")),
				Some(AttrValue::from("default")),
			]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_build_runs_after_build_hook(engine: Engine) {
		let factory = Factory::new(
			ModelDescriptor::record("dummy"),
			crate::attrs! { "name" => "x" },
			FactoryOptions::new().with_after_build(Hook::new(|model, _, options| {
				let flag = options.get("flag").cloned().unwrap_or_default();
				model.with_attrs(&crate::attrs! { "flag" => flag })
			})),
		)
		.unwrap();

		let model = factory
			.build(
				&engine,
				&ObjectAdapter,
				&Attrs::new(),
				&crate::attrs! { "flag" => true },
			)
			.await
			.unwrap();

		assert_eq!(model.get("flag").unwrap(), Some(AttrValue::Bool(true)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_runs_both_hooks_in_order(engine: Engine) {
		let order = Arc::new(AtomicUsize::new(0));
		let build_order = order.clone();
		let create_order = order.clone();
		let factory = Factory::new(
			ModelDescriptor::record("dummy"),
			Attrs::new(),
			FactoryOptions::new()
				.with_after_build(Hook::new(move |model, _, _| {
					assert_eq!(build_order.fetch_add(1, Ordering::SeqCst), 0);
					Ok(model)
				}))
				.with_after_create(Hook::from_async(move |model, _, _| {
					let create_order = create_order.clone();
					async move {
						assert_eq!(create_order.fetch_add(1, Ordering::SeqCst), 1);
						Ok(model)
					}
				})),
		)
		.unwrap();

		factory
			.create(&engine, &ObjectAdapter, &Attrs::new(), &Attrs::new())
			.await
			.unwrap();

		assert_eq!(order.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	fn test_options_merge_child_wins() {
		let parent = FactoryOptions::new()
			.with_after_build(Hook::new(|m, _, _| Ok(m)))
			.with_adapter_option("table", "parents")
			.with_adapter_option("schema", "public");
		let child = FactoryOptions::new().with_adapter_option("table", "children");

		let merged = parent.merged(&child);

		assert!(merged.after_build.is_some());
		assert!(merged.after_create.is_none());
		assert_eq!(
			merged.adapter_options,
			crate::attrs! { "table" => "children", "schema" => "public" }
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_inherit_function_initializers_merge_output() {
		let parent = Initializer::from_fn(|_| crate::attrs! { "a" => 1, "b" => 1 });
		let child = Initializer::from(crate::attrs! { "b" => 2, "c" => 2 });

		let merged = Initializer::inherit(&parent, &child);

		assert!(merged.is_fn());
		assert_eq!(
			merged.produce(&Attrs::new()).await.unwrap(),
			crate::attrs! { "a" => 1, "b" => 2, "c" => 2 }
		);
	}
}
