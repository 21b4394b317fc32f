//! Associations: values produced by running another factory.

use async_trait::async_trait;

use super::{Generator, Pending};
use crate::adapter::adapter_failure;
use crate::attrs::{Attrs, BuildOptions};
use crate::engine::{Engine, GeneratorContext};
use crate::error::FactoryResult;
use crate::many::ManyArg;
use crate::model::Instance;
use crate::value::AttrValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssocMode {
	Create,
	Attrs,
}

/// Arguments of a single association.
#[derive(Debug, Clone)]
pub struct AssocArgs {
	factory: String,
	key: Option<String>,
	overrides: Attrs,
	build_options: BuildOptions,
	mode: AssocMode,
}

impl AssocArgs {
	/// Association creating and persisting one model.
	pub fn create(factory: impl Into<String>) -> Self {
		Self::with_mode(factory, AssocMode::Create)
	}

	/// Association resolving attributes only.
	pub fn attrs(factory: impl Into<String>) -> Self {
		Self::with_mode(factory, AssocMode::Attrs)
	}

	fn with_mode(factory: impl Into<String>, mode: AssocMode) -> Self {
		Self {
			factory: factory.into(),
			key: None,
			overrides: Attrs::new(),
			build_options: BuildOptions::new(),
			mode,
		}
	}

	/// Yields the attribute `key` of the result instead of the whole value.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Overrides passed to the associated factory.
	pub fn overrides(mut self, overrides: Attrs) -> Self {
		self.overrides = overrides;
		self
	}

	/// Build options passed to the associated factory.
	pub fn build_options(mut self, build_options: BuildOptions) -> Self {
		self.build_options = build_options;
		self
	}

	/// Name of the associated factory.
	pub fn factory(&self) -> &str {
		&self.factory
	}
}

impl From<AssocArgs> for Pending {
	fn from(args: AssocArgs) -> Self {
		match args.mode {
			AssocMode::Create => Pending::Assoc(args),
			AssocMode::Attrs => Pending::AssocAttrs(args),
		}
	}
}

impl From<AssocArgs> for AttrValue {
	fn from(args: AssocArgs) -> Self {
		AttrValue::Pending(args.into())
	}
}

/// Arguments of a many-valued association.
#[derive(Debug, Clone)]
pub struct AssocManyArgs {
	factory: String,
	count: usize,
	key: Option<String>,
	overrides: ManyArg,
	build_options: ManyArg,
	mode: AssocMode,
}

impl AssocManyArgs {
	/// Association creating and persisting `count` models.
	pub fn create(factory: impl Into<String>, count: usize) -> Self {
		Self::with_mode(factory, count, AssocMode::Create)
	}

	/// Association resolving `count` attribute maps.
	pub fn attrs(factory: impl Into<String>, count: usize) -> Self {
		Self::with_mode(factory, count, AssocMode::Attrs)
	}

	fn with_mode(factory: impl Into<String>, count: usize, mode: AssocMode) -> Self {
		Self {
			factory: factory.into(),
			count,
			key: None,
			overrides: ManyArg::None,
			build_options: ManyArg::None,
			mode,
		}
	}

	/// Yields the attribute `key` of each result.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Overrides, shared or per item.
	pub fn overrides(mut self, overrides: impl Into<ManyArg>) -> Self {
		self.overrides = overrides.into();
		self
	}

	/// Build options, shared or per item.
	pub fn build_options(mut self, build_options: impl Into<ManyArg>) -> Self {
		self.build_options = build_options.into();
		self
	}

	/// Name of the associated factory.
	pub fn factory(&self) -> &str {
		&self.factory
	}

	/// Number of values produced.
	pub fn count(&self) -> usize {
		self.count
	}
}

impl From<AssocManyArgs> for Pending {
	fn from(args: AssocManyArgs) -> Self {
		match args.mode {
			AssocMode::Create => Pending::AssocMany(args),
			AssocMode::Attrs => Pending::AssocAttrsMany(args),
		}
	}
}

impl From<AssocManyArgs> for AttrValue {
	fn from(args: AssocManyArgs) -> Self {
		AttrValue::Pending(args.into())
	}
}

fn pluck_model(engine: &Engine, factory: &str, model: &Instance, key: &str) -> FactoryResult<AttrValue> {
	let adapter = engine.get_adapter(Some(factory));
	let value = adapter
		.get(model, key, model.model())
		.map_err(adapter_failure)?;
	Ok(value.unwrap_or_default())
}

fn pluck_attr(attrs: &Attrs, key: &str) -> AttrValue {
	attrs.get(key).cloned().unwrap_or_default()
}

/// Creates one model through the engine.
pub struct AssocGenerator {
	engine: Engine,
}

#[async_trait]
impl Generator for AssocGenerator {
	type Args = AssocArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &AssocArgs) -> FactoryResult<AttrValue> {
		let model = self
			.engine
			.create(&args.factory, args.overrides.clone(), args.build_options.clone())
			.await?;
		match &args.key {
			Some(key) => pluck_model(&self.engine, &args.factory, &model, key),
			None => Ok(AttrValue::Model(model)),
		}
	}
}

/// Creates several models through the engine.
pub struct AssocManyGenerator {
	engine: Engine,
}

#[async_trait]
impl Generator for AssocManyGenerator {
	type Args = AssocManyArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &AssocManyArgs) -> FactoryResult<AttrValue> {
		let models = self
			.engine
			.create_many(
				&args.factory,
				args.count,
				args.overrides.clone(),
				args.build_options.clone(),
			)
			.await?;
		let values = match &args.key {
			Some(key) => models
				.iter()
				.map(|model| pluck_model(&self.engine, &args.factory, model, key))
				.collect::<FactoryResult<Vec<_>>>()?,
			None => models.into_iter().map(AttrValue::Model).collect(),
		};
		Ok(AttrValue::List(values))
	}
}

/// Resolves another factory's attributes without building.
pub struct AssocAttrsGenerator {
	engine: Engine,
}

#[async_trait]
impl Generator for AssocAttrsGenerator {
	type Args = AssocArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &AssocArgs) -> FactoryResult<AttrValue> {
		let attrs = self
			.engine
			.attrs(&args.factory, args.overrides.clone(), args.build_options.clone())
			.await?;
		Ok(match &args.key {
			Some(key) => pluck_attr(&attrs, key),
			None => AttrValue::Map(attrs),
		})
	}
}

/// Resolves several attribute maps of another factory.
pub struct AssocAttrsManyGenerator {
	engine: Engine,
}

#[async_trait]
impl Generator for AssocAttrsManyGenerator {
	type Args = AssocManyArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &AssocManyArgs) -> FactoryResult<AttrValue> {
		let list = self
			.engine
			.attrs_many(
				&args.factory,
				args.count,
				args.overrides.clone(),
				args.build_options.clone(),
			)
			.await?;
		Ok(AttrValue::List(
			list.into_iter()
				.map(|attrs| match &args.key {
					Some(key) => pluck_attr(&attrs, key),
					None => AttrValue::Map(attrs),
				})
				.collect(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory::FactoryOptions;
	use crate::model::ModelDescriptor;
	use rstest::rstest;

	fn engine_with_user() -> Engine {
		let engine = Engine::new();
		engine
			.define(
				"User",
				ModelDescriptor::record("users"),
				crate::attrs! { "name" => "Bruce", "age" => 42 },
				FactoryOptions::default(),
			)
			.unwrap();
		engine
	}

	#[rstest]
	#[tokio::test]
	async fn test_assoc_creates_model() {
		let engine = engine_with_user();
		let generator = AssocGenerator::bind(&engine.context()).unwrap();

		let value = generator.generate(&AssocArgs::create("User")).await.unwrap();

		let model = value.as_model().unwrap();
		assert_eq!(model.get("name").unwrap(), Some(AttrValue::from("Bruce")));
		assert_eq!(engine.created_count(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_assoc_plucks_key() {
		let engine = engine_with_user();
		let generator = AssocGenerator::bind(&engine.context()).unwrap();

		let value = generator
			.generate(&AssocArgs::create("User").key("age"))
			.await
			.unwrap();

		assert_eq!(value, AttrValue::Int(42));
	}

	#[rstest]
	#[tokio::test]
	async fn test_assoc_missing_key_is_null() {
		let engine = engine_with_user();
		let generator = AssocGenerator::bind(&engine.context()).unwrap();

		let value = generator
			.generate(&AssocArgs::create("User").key("nope"))
			.await
			.unwrap();

		assert!(value.is_null());
	}

	#[rstest]
	#[tokio::test]
	async fn test_assoc_many_applies_overrides() {
		let engine = engine_with_user();
		let generator = AssocManyGenerator::bind(&engine.context()).unwrap();
		let args = AssocManyArgs::create("User", 2)
			.key("name")
			.overrides(crate::attrs! { "name" => "Alfred" });

		let value = generator.generate(&args).await.unwrap();

		assert_eq!(value, AttrValue::from(vec!["Alfred", "Alfred"]));
		assert_eq!(engine.created_count(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_assoc_attrs_does_not_persist() {
		let engine = engine_with_user();
		let generator = AssocAttrsGenerator::bind(&engine.context()).unwrap();

		let value = generator.generate(&AssocArgs::attrs("User")).await.unwrap();

		assert_eq!(
			value,
			AttrValue::Map(crate::attrs! { "name" => "Bruce", "age" => 42 })
		);
		assert_eq!(engine.created_count(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_assoc_attrs_many_per_item_overrides() {
		let engine = engine_with_user();
		let generator = AssocAttrsManyGenerator::bind(&engine.context()).unwrap();
		let args = AssocManyArgs::attrs("User", 2).key("age").overrides(vec![
			crate::attrs! { "age" => 1 },
			crate::attrs! { "age" => 2 },
		]);

		let value = generator.generate(&args).await.unwrap();

		assert_eq!(value, AttrValue::from(vec![1, 2]));
	}

	#[rstest]
	fn test_mode_selects_pending_variant() {
		assert!(matches!(
			Pending::from(AssocArgs::create("User")),
			Pending::Assoc(_)
		));
		assert!(matches!(
			Pending::from(AssocArgs::attrs("User")),
			Pending::AssocAttrs(_)
		));
		assert!(matches!(
			Pending::from(AssocManyArgs::attrs("User", 3)),
			Pending::AssocAttrsMany(_)
		));
	}
}
