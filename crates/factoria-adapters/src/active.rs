//! Adapter for models that persist themselves.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use factoria_core::{Adapter, AdapterError, Instance, ModelDescriptor};

use crate::error::StoreError;

/// A model that knows how to save and destroy itself.
#[async_trait]
pub trait ActiveModel: Send + Sync + Sized + 'static {
	/// Persists the model, returning the stored state.
	async fn save(&self) -> Result<Self, AdapterError>;

	/// Removes the model from storage.
	async fn destroy(&self) -> Result<(), AdapterError>;
}

/// Adapter delegating `save` and `destroy` to an [`ActiveModel`].
///
/// Instances must hold a `T`, typically built from a
/// [`ModelDescriptor::of::<T>`](ModelDescriptor::of) descriptor.
pub struct ActiveModelAdapter<T> {
	_model: PhantomData<fn() -> T>,
}

impl<T: ActiveModel> ActiveModelAdapter<T> {
	/// Creates the adapter.
	pub fn new() -> Self {
		Self {
			_model: PhantomData,
		}
	}

	fn model_of<'a>(instance: &'a Instance, model: &ModelDescriptor) -> Result<&'a T, StoreError> {
		instance
			.downcast_ref::<T>()
			.ok_or_else(|| StoreError::TypeMismatch {
				model: model.name().to_string(),
				expected: type_name::<T>(),
			})
	}
}

impl<T: ActiveModel> Default for ActiveModelAdapter<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for ActiveModelAdapter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActiveModelAdapter")
			.field("model", &type_name::<T>())
			.finish()
	}
}

#[async_trait]
impl<T: ActiveModel> Adapter for ActiveModelAdapter<T> {
	fn name(&self) -> &str {
		"active-model"
	}

	async fn save(&self, instance: Instance, model: &ModelDescriptor) -> Result<Instance, AdapterError> {
		let saved = Self::model_of(&instance, model)?.save().await?;
		Ok(model.wrap(saved))
	}

	async fn destroy(
		&self,
		instance: Instance,
		model: &ModelDescriptor,
	) -> Result<Instance, AdapterError> {
		Self::model_of(&instance, model)?.destroy().await?;
		Ok(instance)
	}
}
