//! In-memory document store adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use factoria_core::{Adapter, AdapterError, AttrValue, Attrs, Instance, ModelDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::StoreError;

type Collection = IndexMap<String, Attrs>;

/// Adapter storing saved models in memory, one collection per model name.
///
/// `save` assigns a random uuid to the primary key field when it is empty
/// and upserts the record. `destroy` removes it and succeeds when the record
/// is already gone.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use factoria_adapters::MemoryAdapter;
/// use factoria_core::{Engine, FactoryOptions, ModelDescriptor, attrs};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> factoria_core::FactoryResult<()> {
/// let store = Arc::new(MemoryAdapter::new());
/// let engine = Engine::new();
/// engine.set_default_adapter(store.clone());
/// engine.define("User", ModelDescriptor::record("users"), attrs! { "name" => "Bruce" }, FactoryOptions::default())?;
///
/// engine.create("User", attrs! {}, attrs! {}).await?;
/// assert_eq!(store.count("users"), 1);
///
/// engine.cleanup().await?;
/// assert_eq!(store.count("users"), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryAdapter {
	id_field: String,
	collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryAdapter {
	/// Creates an empty store keyed by `"id"`.
	pub fn new() -> Self {
		Self::with_id_field("id")
	}

	/// Creates an empty store keyed by `field`.
	pub fn with_id_field(field: impl Into<String>) -> Self {
		Self {
			id_field: field.into(),
			collections: RwLock::new(HashMap::new()),
		}
	}

	/// Name of the primary key field.
	pub fn id_field(&self) -> &str {
		&self.id_field
	}

	/// Number of stored records of `model`.
	pub fn count(&self, model: &str) -> usize {
		self.collections.read().get(model).map_or(0, IndexMap::len)
	}

	/// Stored records of `model` in insertion order.
	pub fn all(&self, model: &str) -> Vec<Attrs> {
		self.collections
			.read()
			.get(model)
			.map(|c| c.values().cloned().collect())
			.unwrap_or_default()
	}

	/// Stored record of `model` with primary key `id`.
	pub fn find(&self, model: &str, id: &str) -> Option<Attrs> {
		self.collections.read().get(model)?.get(id).cloned()
	}

	/// Drops every stored record.
	pub fn clear(&self) {
		self.collections.write().clear();
	}

	fn read(instance: &Instance, model: &ModelDescriptor) -> Result<Attrs, StoreError> {
		instance.attrs().map_err(|source| StoreError::Unreadable {
			model: model.name().to_string(),
			source,
		})
	}

	fn key_of(&self, attrs: &Attrs, model: &ModelDescriptor) -> Result<Option<String>, StoreError> {
		match attrs.get(&self.id_field) {
			None | Some(AttrValue::Null) => Ok(None),
			Some(AttrValue::String(id)) => Ok(Some(id.clone())),
			Some(AttrValue::Int(id)) => Ok(Some(id.to_string())),
			Some(other) => Err(StoreError::UnsupportedKey {
				model: model.name().to_string(),
				kind: other.kind_name(),
			}),
		}
	}
}

impl Default for MemoryAdapter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Adapter for MemoryAdapter {
	fn name(&self) -> &str {
		"memory"
	}

	async fn save(&self, instance: Instance, model: &ModelDescriptor) -> Result<Instance, AdapterError> {
		let mut attrs = Self::read(&instance, model)?;
		let (key, instance) = match self.key_of(&attrs, model)? {
			Some(key) => (key, instance),
			None => {
				let key = uuid::Uuid::new_v4().to_string();
				attrs.insert(self.id_field.clone(), key.clone());
				let keyed = self.set(&attrs, instance, model)?;
				(key, keyed)
			}
		};
		trace!(model = model.name(), key = %key, "saving record");
		self.collections
			.write()
			.entry(model.name().to_string())
			.or_default()
			.insert(key, attrs);
		Ok(instance)
	}

	async fn destroy(
		&self,
		instance: Instance,
		model: &ModelDescriptor,
	) -> Result<Instance, AdapterError> {
		let attrs = Self::read(&instance, model)?;
		if let Some(key) = self.key_of(&attrs, model)? {
			trace!(model = model.name(), key = %key, "destroying record");
			if let Some(collection) = self.collections.write().get_mut(model.name()) {
				collection.shift_remove(&key);
			}
		}
		Ok(instance)
	}
}
