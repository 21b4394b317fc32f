//! Persistence adapter contract.
//!
//! An [`Adapter`] is the only thing the engine knows about storage. The
//! engine asks it to build a bare model, to save it, and during cleanup to
//! destroy it. Errors returned by an adapter reach the caller unchanged.

use std::fmt;

use async_trait::async_trait;

use crate::attrs::Attrs;
use crate::error::{AdapterError, FactoryError};
use crate::model::{Instance, ModelDescriptor};
use crate::value::AttrValue;

/// Persistence backend for built models.
///
/// # Example
///
/// ```ignore
/// struct NoopAdapter;
///
/// #[async_trait]
/// impl Adapter for NoopAdapter {
///     fn name(&self) -> &str { "noop" }
///     async fn save(&self, model: Instance, _: &ModelDescriptor) -> Result<Instance, AdapterError> {
///         Ok(model)
///     }
///     async fn destroy(&self, model: Instance, _: &ModelDescriptor) -> Result<Instance, AdapterError> {
///         Ok(model)
///     }
/// }
/// ```
#[async_trait]
pub trait Adapter: Send + Sync {
	/// Adapter name, used in logs.
	fn name(&self) -> &str;

	/// Constructs an unpersisted instance populated with `attrs`.
	///
	/// The default implementation delegates to the model descriptor.
	async fn build(&self, model: &ModelDescriptor, attrs: Attrs) -> Result<Instance, AdapterError> {
		model.construct(&attrs).map_err(AdapterError::from)
	}

	/// Persists an instance, returning the possibly updated instance.
	async fn save(&self, instance: Instance, model: &ModelDescriptor) -> Result<Instance, AdapterError>;

	/// Removes the persisted state of an instance.
	///
	/// Must tolerate instances that never finished persisting.
	async fn destroy(
		&self,
		instance: Instance,
		model: &ModelDescriptor,
	) -> Result<Instance, AdapterError>;

	/// Reads one attribute from an instance.
	fn get(
		&self,
		instance: &Instance,
		attr: &str,
		_model: &ModelDescriptor,
	) -> Result<Option<AttrValue>, AdapterError> {
		instance.get(attr).map_err(AdapterError::from)
	}

	/// Applies `attrs` to an instance, returning the updated instance.
	fn set(
		&self,
		attrs: &Attrs,
		instance: Instance,
		_model: &ModelDescriptor,
	) -> Result<Instance, AdapterError> {
		instance.with_attrs(attrs).map_err(AdapterError::from)
	}
}

impl fmt::Debug for dyn Adapter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Adapter")
			.field("name", &self.name())
			.finish()
	}
}

/// Adapter for plain in-memory models.
///
/// Builds through the model descriptor and treats `save` and `destroy` as
/// no-ops. This is the engine's default adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectAdapter;

impl ObjectAdapter {
	/// Creates a new object adapter.
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Adapter for ObjectAdapter {
	fn name(&self) -> &str {
		"object"
	}

	async fn save(&self, instance: Instance, _model: &ModelDescriptor) -> Result<Instance, AdapterError> {
		Ok(instance)
	}

	async fn destroy(
		&self,
		instance: Instance,
		_model: &ModelDescriptor,
	) -> Result<Instance, AdapterError> {
		Ok(instance)
	}
}

/// Converts an adapter error back into an engine error.
pub(crate) fn adapter_failure(error: AdapterError) -> FactoryError {
	match error.downcast::<FactoryError>() {
		Ok(inner) => *inner,
		Err(other) => FactoryError::Adapter(other),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_object_adapter_builds_model() {
		let adapter = ObjectAdapter::new();
		let model = ModelDescriptor::record("dummy");

		let instance = adapter
			.build(&model, crate::attrs! { "name" => "Bruce", "age" => 204 })
			.await
			.unwrap();

		assert_eq!(
			adapter.get(&instance, "name", &model).unwrap(),
			Some(AttrValue::from("Bruce"))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_object_adapter_save_and_destroy_resolve_to_same_instance() {
		let adapter = ObjectAdapter::new();
		let model = ModelDescriptor::record("dummy");
		let instance = adapter.build(&model, Attrs::new()).await.unwrap();

		let saved = adapter.save(instance.clone(), &model).await.unwrap();
		let destroyed = adapter.destroy(saved.clone(), &model).await.unwrap();

		assert_eq!(saved, instance);
		assert_eq!(destroyed, instance);
	}

	#[rstest]
	fn test_object_adapter_set_merges_attrs() {
		let adapter = ObjectAdapter::new();
		let model = ModelDescriptor::record("dummy");
		let instance = model.construct(&crate::attrs! { "a" => 1, "b" => 2 }).unwrap();

		let updated = adapter
			.set(&crate::attrs! { "b" => 3 }, instance, &model)
			.unwrap();

		assert_eq!(updated.attrs().unwrap(), crate::attrs! { "a" => 1, "b" => 3 });
	}

	#[rstest]
	fn test_adapter_failure_unwraps_factory_errors() {
		let boxed: AdapterError = Box::new(FactoryError::InvalidModel("x".to_string()));
		assert!(matches!(adapter_failure(boxed), FactoryError::InvalidModel(_)));

		let io: AdapterError = Box::new(std::io::Error::other("disk full"));
		assert!(matches!(adapter_failure(io), FactoryError::Adapter(_)));
	}
}
