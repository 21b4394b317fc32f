//! Model descriptors and built model instances.
//!
//! A [`ModelDescriptor`] is the engine's handle on "a type that can be
//! constructed from attributes". The engine itself never looks inside a
//! model; adapters use the descriptor's [`ModelCodec`] to construct
//! instances and to read attributes back out of them.

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::attrs::Attrs;
use crate::error::{FactoryError, FactoryResult};
use crate::value::AttrValue;

/// Type-erased model value.
pub type ModelValue = Arc<dyn Any + Send + Sync>;

/// Converts between attribute maps and model values of one type.
pub trait ModelCodec: Send + Sync {
	/// Constructs a model value from resolved attributes.
	fn construct(&self, model: &str, attrs: &Attrs) -> FactoryResult<ModelValue>;

	/// Reads the attributes of a model value.
	fn attrs_of(&self, model: &str, value: &(dyn Any + Send + Sync)) -> FactoryResult<Attrs>;

	/// Serializes a model value to JSON.
	fn to_json(&self, model: &str, value: &(dyn Any + Send + Sync)) -> FactoryResult<JsonValue> {
		self.attrs_of(model, value)?.to_json()
	}
}

/// Codec for schemaless records: the model value is the `Attrs` itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordCodec;

impl ModelCodec for RecordCodec {
	fn construct(&self, _model: &str, attrs: &Attrs) -> FactoryResult<ModelValue> {
		Ok(Arc::new(attrs.clone()))
	}

	fn attrs_of(&self, model: &str, value: &(dyn Any + Send + Sync)) -> FactoryResult<Attrs> {
		value
			.downcast_ref::<Attrs>()
			.cloned()
			.ok_or_else(|| FactoryError::model(model, "instance is not a record"))
	}
}

/// Codec for Rust types that round-trip through serde.
pub struct SerdeCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for SerdeCodec<T> {
	fn default() -> Self {
		Self(PhantomData)
	}
}

impl<T> SerdeCodec<T>
where
	T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
	fn typed<'a>(&self, model: &str, value: &'a (dyn Any + Send + Sync)) -> FactoryResult<&'a T> {
		value.downcast_ref::<T>().ok_or_else(|| {
			FactoryError::model(model, format!("instance is not a {}", type_name::<T>()))
		})
	}
}

impl<T> ModelCodec for SerdeCodec<T>
where
	T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
	fn construct(&self, model: &str, attrs: &Attrs) -> FactoryResult<ModelValue> {
		let json = attrs.to_json()?;
		let value: T = serde_json::from_value(json)
			.map_err(|e| FactoryError::model(model, e.to_string()))?;
		Ok(Arc::new(value))
	}

	fn attrs_of(&self, model: &str, value: &(dyn Any + Send + Sync)) -> FactoryResult<Attrs> {
		let json = self.to_json(model, value)?;
		Attrs::from_json(json).map_err(|e| FactoryError::model(model, e.to_string()))
	}

	fn to_json(&self, model: &str, value: &(dyn Any + Send + Sync)) -> FactoryResult<JsonValue> {
		Ok(serde_json::to_value(self.typed(model, value)?)?)
	}
}

/// Handle to a constructable, persistable model type.
#[derive(Clone)]
pub struct ModelDescriptor {
	name: Arc<str>,
	codec: Arc<dyn ModelCodec>,
}

impl ModelDescriptor {
	/// Describes a schemaless record model.
	///
	/// # Examples
	///
	/// ```
	/// use factoria_core::ModelDescriptor;
	///
	/// let model = ModelDescriptor::record("users");
	/// assert_eq!(model.name(), "users");
	/// ```
	pub fn record(name: impl AsRef<str>) -> Self {
		Self::with_codec(name, RecordCodec)
	}

	/// Describes a serde-backed Rust type.
	pub fn of<T>(name: impl AsRef<str>) -> Self
	where
		T: Serialize + DeserializeOwned + Send + Sync + 'static,
	{
		Self::with_codec(name, SerdeCodec::<T>::default())
	}

	/// Describes a model with a custom codec.
	pub fn with_codec(name: impl AsRef<str>, codec: impl ModelCodec + 'static) -> Self {
		Self {
			name: Arc::from(name.as_ref()),
			codec: Arc::new(codec),
		}
	}

	/// Model name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Checks that the descriptor can be used to define a factory.
	pub fn validate(&self) -> FactoryResult<()> {
		if self.name.trim().is_empty() {
			return Err(FactoryError::InvalidModel(
				"model name must not be empty".to_string(),
			));
		}
		Ok(())
	}

	/// Constructs an instance from resolved attributes.
	pub fn construct(&self, attrs: &Attrs) -> FactoryResult<Instance> {
		if !attrs.is_resolved() {
			return Err(FactoryError::Unresolved(format!(
				"cannot construct {} from unresolved attributes",
				self.name
			)));
		}
		let value = self.codec.construct(&self.name, attrs)?;
		Ok(Instance {
			value,
			model: self.clone(),
		})
	}

	/// Wraps an already built value as an instance of this model.
	pub fn wrap<T: Any + Send + Sync>(&self, value: T) -> Instance {
		Instance {
			value: Arc::new(value),
			model: self.clone(),
		}
	}

	/// Returns true if both handles describe the same model.
	pub fn same_as(&self, other: &ModelDescriptor) -> bool {
		self.name == other.name && Arc::ptr_eq(&self.codec, &other.codec)
	}
}

impl fmt::Debug for ModelDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelDescriptor")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// A built model.
///
/// Instances are cheap to clone; clones refer to the same model value.
/// Equality is identity.
#[derive(Clone)]
pub struct Instance {
	value: ModelValue,
	model: ModelDescriptor,
}

impl Instance {
	/// Descriptor of the model this instance was built from.
	pub fn model(&self) -> &ModelDescriptor {
		&self.model
	}

	/// Returns the model value if it has type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}

	/// Reads all attributes of the instance.
	pub fn attrs(&self) -> FactoryResult<Attrs> {
		self.model.codec.attrs_of(&self.model.name, &*self.value)
	}

	/// Reads a single attribute, `None` when absent.
	pub fn get(&self, attr: &str) -> FactoryResult<Option<AttrValue>> {
		Ok(self.attrs()?.remove(attr))
	}

	/// Serializes the instance to JSON.
	pub fn to_json(&self) -> FactoryResult<JsonValue> {
		self.model.codec.to_json(&self.model.name, &*self.value)
	}

	/// Returns a new instance of the same model with `attrs` merged in.
	pub fn with_attrs(&self, attrs: &Attrs) -> FactoryResult<Instance> {
		let mut merged = self.attrs()?;
		merged.extend(attrs.clone());
		self.model.construct(&merged)
	}

	/// Returns true if both handles refer to the same model value.
	pub fn ptr_eq(&self, other: &Instance) -> bool {
		Arc::ptr_eq(&self.value, &other.value)
	}
}

impl PartialEq for Instance {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.to_json() {
			Ok(json) => write!(f, "{}({json})", self.model.name),
			Err(_) => write!(f, "{}(..)", self.model.name),
		}
	}
}
