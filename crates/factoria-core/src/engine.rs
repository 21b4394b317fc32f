//! The engine: factory registry, adapters, global hooks and teardown.
//!
//! An [`Engine`] owns everything one test suite needs: the named factories,
//! the adapters they persist through, global options, the shared sequence
//! counters and random source, and the list of created models that
//! [`Engine::cleanup`] destroys.
//!
//! `Engine` is a cheap handle; clones share the same state. Locks are never
//! held across an await, so resolving attributes may freely call back into
//! the engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use futures::future::try_join_all;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::adapter::{Adapter, ObjectAdapter, adapter_failure};
use crate::attrs::{Attrs, BuildOptions};
use crate::error::{FactoryError, FactoryResult};
use crate::factory::{Factory, FactoryOptions, Hook, Initializer};
use crate::generators::{
	AssocArgs, AssocManyArgs, FakerSource, OneOfArgs, Pending, RandomArgs, RandomSource,
	SequenceArgs, SequenceRegistry,
};
use crate::many::ManyArg;
use crate::model::{Instance, ModelDescriptor};
use crate::options::EngineOptions;
use crate::tracking::CreatedList;
use crate::value::AttrValue;

struct EngineInner {
	factories: RwLock<HashMap<String, Arc<Factory>>>,
	adapters: RwLock<HashMap<String, Arc<dyn Adapter>>>,
	default_adapter: RwLock<Arc<dyn Adapter>>,
	options: RwLock<EngineOptions>,
	created: Mutex<CreatedList>,
	sequences: SequenceRegistry,
	random: Mutex<Box<dyn RandomSource>>,
}

/// Weak handle generators are bound through.
#[derive(Clone)]
pub struct GeneratorContext {
	engine: Weak<EngineInner>,
}

impl GeneratorContext {
	/// Upgrades to the engine, failing once it has been dropped.
	pub fn engine(&self) -> FactoryResult<Engine> {
		self.engine
			.upgrade()
			.map(|inner| Engine { inner })
			.ok_or(FactoryError::UnboundGenerator)
	}
}

impl fmt::Debug for GeneratorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GeneratorContext")
			.field("bound", &(self.engine.strong_count() > 0))
			.finish()
	}
}

/// Factory registry and fixture lifecycle.
///
/// # Examples
///
/// ```
/// use factoria_core::{Engine, FactoryOptions, ModelDescriptor, attrs};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> factoria_core::FactoryResult<()> {
/// let engine = Engine::new();
/// engine.define(
///     "User",
///     ModelDescriptor::record("users"),
///     attrs! { "email" => engine.sequence().map(|n| format!("user{n}@example.com")) },
///     FactoryOptions::default(),
/// )?;
///
/// let user = engine.create("User", attrs! {}, attrs! {}).await?;
/// assert_eq!(user.get("email")?.unwrap().as_str(), Some("user1@example.com"));
///
/// engine.cleanup().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Engine {
	inner: Arc<EngineInner>,
}

impl Engine {
	/// Creates an engine with the [`ObjectAdapter`] as default adapter.
	pub fn new() -> Self {
		Self::builder().build()
	}

	/// Returns a builder for a customized engine.
	pub fn builder() -> EngineBuilder {
		EngineBuilder::new()
	}

	/// Context for binding generators to this engine.
	pub fn context(&self) -> GeneratorContext {
		GeneratorContext {
			engine: Arc::downgrade(&self.inner),
		}
	}

	/// Registers a factory under `name`.
	///
	/// Fails if the name is taken or the model is invalid.
	pub fn define(
		&self,
		name: impl Into<String>,
		model: ModelDescriptor,
		initializer: impl Into<Initializer>,
		options: FactoryOptions,
	) -> FactoryResult<Arc<Factory>> {
		let name = name.into();
		if self.has_factory(&name) {
			return Err(FactoryError::AlreadyDefined(name));
		}
		let factory = Factory::new(model, initializer, options)?;
		self.register(name, factory)
	}

	/// Registers `name` as a child of the factory `parent`.
	///
	/// The child uses `options.model` if given, otherwise the parent's
	/// model. Options and initializers are merged shallowly with the child
	/// winning per key.
	pub fn extend(
		&self,
		parent: &str,
		name: impl Into<String>,
		initializer: impl Into<Initializer>,
		options: FactoryOptions,
	) -> FactoryResult<Arc<Factory>> {
		let name = name.into();
		if self.has_factory(&name) {
			return Err(FactoryError::AlreadyDefined(name));
		}
		let parent_factory = self.get_factory(parent)?;
		let model = options
			.model
			.clone()
			.unwrap_or_else(|| parent_factory.model().clone());
		let options = parent_factory.options().merged(&options);
		let initializer = Initializer::inherit(parent_factory.initializer(), &initializer.into());
		let factory = Factory::new(model, initializer, options)?;
		debug!(parent = %parent, factory = %name, "extending factory");
		self.register(name, factory)
	}

	fn register(&self, name: String, factory: Factory) -> FactoryResult<Arc<Factory>> {
		let mut factories = self.inner.factories.write();
		if factories.contains_key(&name) {
			return Err(FactoryError::AlreadyDefined(name));
		}
		let factory = Arc::new(factory);
		debug!(factory = %name, model = factory.model().name(), "defined factory");
		factories.insert(name, factory.clone());
		Ok(factory)
	}

	/// Unregisters a factory, returning it if it existed.
	pub fn remove(&self, name: &str) -> Option<Arc<Factory>> {
		self.inner.factories.write().remove(name)
	}

	/// Looks up a factory, failing if it does not exist.
	pub fn get_factory(&self, name: &str) -> FactoryResult<Arc<Factory>> {
		self.find_factory(name)
			.ok_or_else(|| FactoryError::NotFound(name.to_string()))
	}

	/// Looks up a factory.
	pub fn find_factory(&self, name: &str) -> Option<Arc<Factory>> {
		self.inner.factories.read().get(name).cloned()
	}

	/// Returns true if `name` is registered.
	pub fn has_factory(&self, name: &str) -> bool {
		self.inner.factories.read().contains_key(name)
	}

	/// Registered factory names, sorted.
	pub fn factory_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.inner.factories.read().keys().cloned().collect();
		names.sort();
		names
	}

	/// Resolved attributes of one item.
	pub async fn attrs(
		&self,
		name: &str,
		overrides: Attrs,
		options: BuildOptions,
	) -> FactoryResult<Attrs> {
		let factory = self.get_factory(name)?;
		factory.attrs(self, &overrides, &options).await
	}

	/// Resolved attributes of `num` items.
	pub async fn attrs_many(
		&self,
		name: &str,
		num: usize,
		overrides: impl Into<ManyArg>,
		options: impl Into<ManyArg>,
	) -> FactoryResult<Vec<Attrs>> {
		let overrides = overrides.into();
		let options = options.into();
		let factory = self.get_factory(name)?;
		factory.attrs_many(self, num, &overrides, &options).await
	}

	/// Builds one model without persisting it.
	pub async fn build(
		&self,
		name: &str,
		overrides: Attrs,
		options: BuildOptions,
	) -> FactoryResult<Instance> {
		let factory = self.get_factory(name)?;
		let adapter = self.get_adapter(Some(name));
		let model = factory
			.build(self, adapter.as_ref(), &overrides, &options)
			.await?;
		debug!(factory = %name, adapter = adapter.name(), "built model");
		let hook = self.inner.options.read().after_build.clone();
		match hook {
			Some(hook) => hook.call(model, &overrides, &options).await,
			None => Ok(model),
		}
	}

	/// Builds `num` models without persisting them.
	pub async fn build_many(
		&self,
		name: &str,
		num: usize,
		overrides: impl Into<ManyArg>,
		options: impl Into<ManyArg>,
	) -> FactoryResult<Vec<Instance>> {
		let overrides = overrides.into();
		let options = options.into();
		let factory = self.get_factory(name)?;
		let adapter = self.get_adapter(Some(name));
		let models = factory
			.build_many(self, adapter.as_ref(), num, &overrides, &options)
			.await?;
		debug!(factory = %name, count = models.len(), "built models");
		let hook = self.inner.options.read().after_build.clone();
		run_hook_many(hook, models, &overrides, &options).await
	}

	/// Builds, persists and tracks one model.
	pub async fn create(
		&self,
		name: &str,
		overrides: Attrs,
		options: BuildOptions,
	) -> FactoryResult<Instance> {
		let factory = self.get_factory(name)?;
		let adapter = self.get_adapter(Some(name));
		let model = factory
			.create(self, adapter.as_ref(), &overrides, &options)
			.await?;
		self.add_to_created_list(adapter.clone(), [model.clone()]);
		debug!(factory = %name, adapter = adapter.name(), "created model");
		let hook = self.inner.options.read().after_create.clone();
		match hook {
			Some(hook) => hook.call(model, &overrides, &options).await,
			None => Ok(model),
		}
	}

	/// Builds, persists and tracks `num` models.
	pub async fn create_many(
		&self,
		name: &str,
		num: usize,
		overrides: impl Into<ManyArg>,
		options: impl Into<ManyArg>,
	) -> FactoryResult<Vec<Instance>> {
		let overrides = overrides.into();
		let options = options.into();
		let factory = self.get_factory(name)?;
		let adapter = self.get_adapter(Some(name));
		let models = factory
			.create_many(self, adapter.as_ref(), num, &overrides, &options)
			.await?;
		self.add_to_created_list(adapter.clone(), models.iter().cloned());
		debug!(factory = %name, count = models.len(), "created models");
		let hook = self.inner.options.read().after_create.clone();
		run_hook_many(hook, models, &overrides, &options).await
	}

	/// Replaces or merges the global options.
	///
	/// A seed in `options` reseeds the random source.
	pub fn with_options(&self, options: EngineOptions, merge: bool) {
		let seed = options.seed;
		{
			let mut current = self.inner.options.write();
			*current = if merge {
				std::mem::take(&mut *current).merge(options)
			} else {
				options
			};
		}
		if let Some(seed) = seed {
			self.seed(seed);
		}
	}

	/// Current global options.
	pub fn options(&self) -> EngineOptions {
		self.inner.options.read().clone()
	}

	/// Assigns `adapter` to each factory in `names`, or makes it the
	/// default when `names` is empty.
	pub fn set_adapter<I, S>(&self, adapter: Arc<dyn Adapter>, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let names: Vec<String> = names.into_iter().map(Into::into).collect();
		if names.is_empty() {
			self.set_default_adapter(adapter);
			return;
		}
		let mut adapters = self.inner.adapters.write();
		for name in names {
			debug!(factory = %name, adapter = adapter.name(), "assigned adapter");
			adapters.insert(name, adapter.clone());
		}
	}

	/// Replaces the default adapter.
	pub fn set_default_adapter(&self, adapter: Arc<dyn Adapter>) {
		debug!(adapter = adapter.name(), "set default adapter");
		*self.inner.default_adapter.write() = adapter;
	}

	/// Adapter for the factory `name`, falling back to the default.
	pub fn get_adapter(&self, name: Option<&str>) -> Arc<dyn Adapter> {
		if let Some(adapter) = name.and_then(|name| self.inner.adapters.read().get(name).cloned()) {
			return adapter;
		}
		self.inner.default_adapter.read().clone()
	}

	/// Tracks models for [`cleanup`](Self::cleanup).
	pub fn add_to_created_list(
		&self,
		adapter: Arc<dyn Adapter>,
		models: impl IntoIterator<Item = Instance>,
	) {
		let mut created = self.inner.created.lock();
		for model in models {
			created.push(adapter.clone(), model);
		}
	}

	/// Number of tracked models.
	pub fn created_count(&self) -> usize {
		self.inner.created.lock().len()
	}

	/// Tracked models in creation order.
	pub fn created_instances(&self) -> Vec<Instance> {
		self.inner.created.lock().instances()
	}

	/// Destroys every tracked model, newest first, and resets all sequences.
	///
	/// Stops at the first failing destroy and returns its error. Models
	/// after the failure are not destroyed and are no longer tracked.
	pub async fn cleanup(&self) -> FactoryResult<()> {
		let records = self.inner.created.lock().drain_lifo();
		self.inner.sequences.reset(None);
		let total = records.len();
		for (index, record) in records.into_iter().enumerate() {
			let model = record.instance.model().clone();
			if let Err(error) = record.adapter.destroy(record.instance, &model).await {
				warn!(
					adapter = record.adapter.name(),
					model = model.name(),
					skipped = total - index - 1,
					"cleanup aborted"
				);
				return Err(adapter_failure(error));
			}
		}
		debug!(count = total, "cleaned up created models");
		Ok(())
	}

	/// Sequence counters of this engine.
	pub fn sequences(&self) -> &SequenceRegistry {
		&self.inner.sequences
	}

	/// Sequence sharing its counter with every sequence named `id`.
	pub fn seq(&self, id: impl Into<String>) -> SequenceArgs {
		SequenceArgs::named(id)
	}

	/// Anonymous sequence.
	pub fn sequence(&self) -> SequenceArgs {
		SequenceArgs::new()
	}

	/// Resets one sequence, or all when `id` is `None`.
	pub fn reset_sequence(&self, id: Option<&str>) {
		self.inner.sequences.reset(id);
	}

	/// Alias of [`reset_sequence`](Self::reset_sequence).
	pub fn reset_seq(&self, id: Option<&str>) {
		self.reset_sequence(id);
	}

	/// Creates a model of `factory` when resolved.
	pub fn assoc(&self, factory: impl Into<String>) -> AssocArgs {
		AssocArgs::create(factory)
	}

	/// Creates `count` models of `factory` when resolved.
	pub fn assoc_many(&self, factory: impl Into<String>, count: usize) -> AssocManyArgs {
		AssocManyArgs::create(factory, count)
	}

	/// Resolves the attributes of `factory` when resolved.
	pub fn assoc_attrs(&self, factory: impl Into<String>) -> AssocArgs {
		AssocArgs::attrs(factory)
	}

	/// Resolves `count` attribute maps of `factory` when resolved.
	pub fn assoc_attrs_many(&self, factory: impl Into<String>, count: usize) -> AssocManyArgs {
		AssocManyArgs::attrs(factory, count)
	}

	/// Random value from the named source method.
	pub fn chance(&self, method: impl Into<String>) -> RandomArgs {
		RandomArgs::method(method)
	}

	/// Random value computed by `f` from the source.
	///
	/// `f` runs while the engine's random source is locked. It must draw only
	/// from the source it is given and must not call back into [`Engine::seed`],
	/// [`Engine::with_random`] or another random value of the same engine,
	/// which would deadlock.
	pub fn chance_with<F>(&self, f: F) -> RandomArgs
	where
		F: Fn(&mut dyn RandomSource, &[AttrValue]) -> FactoryResult<AttrValue> + Send + Sync + 'static,
	{
		RandomArgs::custom(f)
	}

	/// One element of `values`, picked when resolved.
	pub fn one_of(&self, values: impl Into<AttrValue>) -> OneOfArgs {
		OneOfArgs::new(values)
	}

	/// Value computed by `f` when resolved.
	pub fn lazy<F, V>(&self, f: F) -> Pending
	where
		F: Fn() -> V + Send + Sync + 'static,
		V: Into<AttrValue>,
	{
		Pending::lazy(f)
	}

	/// Reseeds the shared random source.
	pub fn seed(&self, seed: u64) {
		debug!(seed, "seeding random source");
		self.inner.random.lock().seed(seed);
	}

	/// Runs `f` with exclusive access to the random source.
	///
	/// The lock is not reentrant; `f` must not use this engine's random API.
	pub fn with_random<R>(&self, f: impl FnOnce(&mut dyn RandomSource) -> R) -> R {
		let mut source = self.inner.random.lock();
		f(&mut **source)
	}
}

async fn run_hook_many(
	hook: Option<Hook>,
	models: Vec<Instance>,
	overrides: &ManyArg,
	options: &ManyArg,
) -> FactoryResult<Vec<Instance>> {
	let Some(hook) = hook else {
		return Ok(models);
	};
	let empty = Attrs::new();
	let overrides = overrides.expand("attrs", models.len(), &empty)?;
	let options = options.expand("buildOptions", models.len(), &empty)?;
	try_join_all(
		models
			.into_iter()
			.zip(overrides)
			.zip(options)
			.map(|((model, overrides), options)| hook.call(model, overrides, options)),
	)
	.await
}

impl Default for Engine {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Engine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("factories", &self.factory_names())
			.field("created", &self.created_count())
			.finish_non_exhaustive()
	}
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
	options: EngineOptions,
	default_adapter: Option<Arc<dyn Adapter>>,
	random: Option<Box<dyn RandomSource>>,
}

impl EngineBuilder {
	/// Creates a builder with default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the global options.
	pub fn options(mut self, options: EngineOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the default adapter.
	pub fn default_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
		self.default_adapter = Some(adapter);
		self
	}

	/// Replaces the random source.
	pub fn random_source(mut self, source: impl RandomSource + 'static) -> Self {
		self.random = Some(Box::new(source));
		self
	}

	/// Builds the engine.
	pub fn build(self) -> Engine {
		let mut random = self
			.random
			.unwrap_or_else(|| Box::new(FakerSource::new()));
		if let Some(seed) = self.options.seed {
			random.seed(seed);
		}
		let default_adapter = self
			.default_adapter
			.unwrap_or_else(|| Arc::new(ObjectAdapter::new()));
		Engine {
			inner: Arc::new(EngineInner {
				factories: RwLock::new(HashMap::new()),
				adapters: RwLock::new(HashMap::new()),
				default_adapter: RwLock::new(default_adapter),
				options: RwLock::new(self.options),
				created: Mutex::new(CreatedList::new()),
				sequences: SequenceRegistry::new(),
				random: Mutex::new(random),
			}),
		}
	}
}
