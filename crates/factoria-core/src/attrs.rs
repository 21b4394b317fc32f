//! Ordered attribute maps.
//!
//! [`Attrs`] is the unit every factory works in: initializers produce it,
//! overrides are expressed in it, adapters build models from it.

use std::fmt;

use indexmap::IndexMap;
use indexmap::map::{IntoIter, Iter, IterMut};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{FactoryError, FactoryResult};
use crate::value::AttrValue;

/// Insertion-ordered map from attribute name to [`AttrValue`].
///
/// Cloning an `Attrs` produces an independent tree. Opaque values, models
/// and pending generators are reference counted, so their clones share the
/// underlying value.
#[derive(Clone, Default, PartialEq)]
pub struct Attrs {
	entries: IndexMap<String, AttrValue>,
}

/// Build options are an opaque attribute map threaded through resolution.
pub type BuildOptions = Attrs;

impl Attrs {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a value, returning the previous one.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
		self.entries.insert(key.into(), value.into())
	}

	/// Builder-style insert.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.insert(key, value);
		self
	}

	/// Returns the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&AttrValue> {
		self.entries.get(key)
	}

	/// Returns a mutable reference to the value stored under `key`.
	pub fn get_mut(&mut self, key: &str) -> Option<&mut AttrValue> {
		self.entries.get_mut(key)
	}

	/// Follows a dotted path (`"address.street"`) through nested maps.
	pub fn get_path(&self, path: &str) -> Option<&AttrValue> {
		let mut segments = path.split('.');
		let mut current = self.get(segments.next()?)?;
		for segment in segments {
			current = current.as_map()?.get(segment)?;
		}
		Some(current)
	}

	/// Removes a key, preserving the order of the remaining entries.
	pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
		self.entries.shift_remove(key)
	}

	/// Returns true if `key` is present.
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Number of top-level entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true when there are no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over entries in insertion order.
	pub fn iter(&self) -> Iter<'_, String, AttrValue> {
		self.entries.iter()
	}

	/// Iterates mutably over entries in insertion order.
	pub fn iter_mut(&mut self) -> IterMut<'_, String, AttrValue> {
		self.entries.iter_mut()
	}

	/// Attribute names in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Shallow merge: every top-level key of `other` replaces ours.
	pub fn extend(&mut self, other: Attrs) {
		self.entries.extend(other.entries);
	}

	/// Deep merge of `overrides` into `self`.
	///
	/// When both sides hold a map under the same key the maps are merged
	/// recursively; in every other case the override replaces the value
	/// wholesale. Lists, models and opaque values are never merged.
	pub fn merge_deep(&mut self, overrides: &Attrs) {
		for (key, value) in overrides.iter() {
			match (self.entries.get_mut(key), value) {
				(Some(AttrValue::Map(base)), AttrValue::Map(nested)) => base.merge_deep(nested),
				_ => {
					self.entries.insert(key.clone(), value.clone());
				}
			}
		}
	}

	/// Returns true when no pending generator remains anywhere in the tree.
	pub fn is_resolved(&self) -> bool {
		self.entries.values().all(|value| !value.is_pending())
	}

	/// Converts the map to a JSON object.
	pub fn to_json(&self) -> FactoryResult<JsonValue> {
		let mut map = JsonMap::with_capacity(self.entries.len());
		for (key, value) in &self.entries {
			map.insert(key.clone(), value.to_json()?);
		}
		Ok(JsonValue::Object(map))
	}

	/// Builds a map from a JSON object.
	pub fn from_json(value: JsonValue) -> FactoryResult<Self> {
		match value {
			JsonValue::Object(map) => Ok(Self::from(map)),
			other => Err(FactoryError::validation(
				"attrs",
				format!("expected a JSON object, got {other}"),
			)),
		}
	}
}

impl fmt::Debug for Attrs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.entries.iter()).finish()
	}
}

impl From<JsonMap<String, JsonValue>> for Attrs {
	fn from(map: JsonMap<String, JsonValue>) -> Self {
		map.into_iter()
			.map(|(key, value)| (key, AttrValue::from(value)))
			.collect()
	}
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attrs {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		}
	}
}

impl IntoIterator for Attrs {
	type Item = (String, AttrValue);
	type IntoIter = IntoIter<String, AttrValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

impl<'a> IntoIterator for &'a Attrs {
	type Item = (&'a String, &'a AttrValue);
	type IntoIter = Iter<'a, String, AttrValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

/// Builds an [`Attrs`] map from `key => value` pairs.
///
/// Nested maps can be written inline with braces.
///
/// # Examples
///
/// ```
/// use factoria_core::attrs;
///
/// let user = attrs! {
///     "name" => "Bruce",
///     "age" => 204,
///     "address" => { "city" => "Gotham" },
/// };
/// assert_eq!(user.get_path("address.city").and_then(|v| v.as_str()), Some("Gotham"));
/// ```
#[macro_export]
macro_rules! attrs {
	(@munch $attrs:ident;) => {};
	(@munch $attrs:ident; $key:expr => { $($inner:tt)* } $(, $($rest:tt)*)?) => {
		$attrs.insert($key, $crate::AttrValue::Map($crate::attrs!($($inner)*)));
		$crate::attrs!(@munch $attrs; $($($rest)*)?);
	};
	(@munch $attrs:ident; $key:expr => $value:expr $(, $($rest:tt)*)?) => {
		$attrs.insert($key, $crate::AttrValue::from($value));
		$crate::attrs!(@munch $attrs; $($($rest)*)?);
	};
	() => {
		$crate::Attrs::new()
	};
	($($body:tt)+) => {{
		let mut attrs = $crate::Attrs::new();
		$crate::attrs!(@munch attrs; $($body)+);
		attrs
	}};
}
