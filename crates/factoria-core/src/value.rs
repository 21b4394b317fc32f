//! Attribute values.
//!
//! [`AttrValue`] is the closed set of values an attribute map can hold. Most
//! variants are plain data; [`AttrValue::Model`] embeds an associated model,
//! [`AttrValue::Opaque`] carries arbitrary Rust values untouched, and
//! [`AttrValue::Pending`] is a generator waiting to be resolved.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::attrs::Attrs;
use crate::error::{FactoryError, FactoryResult};
use crate::generators::Pending;
use crate::model::Instance;

/// Object-safe equality and downcasting for opaque values.
pub trait OpaqueValue: Any + fmt::Debug + Send + Sync {
	/// Returns the value as `Any` for downcasting.
	fn as_any(&self) -> &dyn Any;

	/// Compares with another opaque value of possibly different type.
	fn eq_dyn(&self, other: &dyn OpaqueValue) -> bool;
}

impl<T> OpaqueValue for T
where
	T: Any + fmt::Debug + PartialEq + Send + Sync,
{
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn eq_dyn(&self, other: &dyn OpaqueValue) -> bool {
		other
			.as_any()
			.downcast_ref::<T>()
			.is_some_and(|other| self == other)
	}
}

/// Shared handle to an opaque value.
///
/// Opaque values are never merged or resolved; clones share the same value.
#[derive(Clone)]
pub struct Opaque(Arc<dyn OpaqueValue>);

impl Opaque {
	/// Wraps a value.
	pub fn new<T>(value: T) -> Self
	where
		T: Any + fmt::Debug + PartialEq + Send + Sync,
	{
		Self(Arc::new(value))
	}

	/// Returns the wrapped value if it has type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.as_any().downcast_ref::<T>()
	}
}

impl fmt::Debug for Opaque {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl PartialEq for Opaque {
	fn eq(&self, other: &Self) -> bool {
		self.0.eq_dyn(&*other.0)
	}
}

/// A single attribute value.
#[derive(Clone, Debug, Default)]
pub enum AttrValue {
	/// Absent value.
	#[default]
	Null,
	/// Boolean.
	Bool(bool),
	/// Signed integer.
	Int(i64),
	/// Floating point number.
	Float(f64),
	/// String.
	String(String),
	/// UTC timestamp.
	DateTime(DateTime<Utc>),
	/// Ordered list of values.
	List(Vec<AttrValue>),
	/// Nested attribute map.
	Map(Attrs),
	/// A built model, typically produced by an association.
	Model(Instance),
	/// Arbitrary Rust value passed through untouched.
	Opaque(Opaque),
	/// Unresolved generator.
	Pending(Pending),
}

impl AttrValue {
	/// Wraps an arbitrary Rust value as an opaque attribute.
	pub fn opaque<T>(value: T) -> Self
	where
		T: Any + fmt::Debug + PartialEq + Send + Sync,
	{
		Self::Opaque(Opaque::new(value))
	}

	/// Returns true for [`AttrValue::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Returns true when this value, or anything nested in it, is pending.
	pub fn is_pending(&self) -> bool {
		match self {
			Self::Pending(_) => true,
			Self::List(items) => items.iter().any(AttrValue::is_pending),
			Self::Map(attrs) => !attrs.is_resolved(),
			_ => false,
		}
	}

	/// Returns the boolean value, if any.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// Returns the integer value, if any.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value),
			_ => None,
		}
	}

	/// Returns the value as a float, widening integers.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Float(value) => Some(*value),
			Self::Int(value) => Some(*value as f64),
			_ => None,
		}
	}

	/// Returns the string value, if any.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}

	/// Returns the list items, if any.
	pub fn as_list(&self) -> Option<&[AttrValue]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}

	/// Returns the nested map, if any.
	pub fn as_map(&self) -> Option<&Attrs> {
		match self {
			Self::Map(attrs) => Some(attrs),
			_ => None,
		}
	}

	/// Returns the embedded model, if any.
	pub fn as_model(&self) -> Option<&Instance> {
		match self {
			Self::Model(instance) => Some(instance),
			_ => None,
		}
	}

	/// Returns the opaque value if it has type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			Self::Opaque(opaque) => opaque.downcast_ref::<T>(),
			_ => None,
		}
	}

	/// Short name of the variant, used in error messages.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Int(_) => "integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::DateTime(_) => "datetime",
			Self::List(_) => "list",
			Self::Map(_) => "map",
			Self::Model(_) => "model",
			Self::Opaque(_) => "opaque",
			Self::Pending(_) => "pending",
		}
	}

	/// Converts the value to JSON.
	///
	/// Models are serialized through their descriptor. Pending and opaque
	/// values have no JSON form and are rejected.
	pub fn to_json(&self) -> FactoryResult<JsonValue> {
		Ok(match self {
			Self::Null => JsonValue::Null,
			Self::Bool(value) => JsonValue::Bool(*value),
			Self::Int(value) => JsonValue::from(*value),
			Self::Float(value) => serde_json::Number::from_f64(*value)
				.map(JsonValue::Number)
				.unwrap_or(JsonValue::Null),
			Self::String(value) => JsonValue::String(value.clone()),
			Self::DateTime(value) => JsonValue::String(value.to_rfc3339()),
			Self::List(items) => JsonValue::Array(
				items
					.iter()
					.map(AttrValue::to_json)
					.collect::<FactoryResult<_>>()?,
			),
			Self::Map(attrs) => attrs.to_json()?,
			Self::Model(instance) => instance.to_json()?,
			Self::Opaque(opaque) => {
				return Err(FactoryError::InvalidArgument(format!(
					"opaque value {opaque:?} cannot be converted to JSON"
				)));
			}
			Self::Pending(pending) => {
				return Err(FactoryError::Unresolved(pending.describe()));
			}
		})
	}
}

impl PartialEq for AttrValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Int(a), Self::Int(b)) => a == b,
			(Self::Float(a), Self::Float(b)) => a == b,
			(Self::String(a), Self::String(b)) => a == b,
			(Self::DateTime(a), Self::DateTime(b)) => a == b,
			(Self::List(a), Self::List(b)) => a == b,
			(Self::Map(a), Self::Map(b)) => a == b,
			(Self::Model(a), Self::Model(b)) => a == b,
			(Self::Opaque(a), Self::Opaque(b)) => a == b,
			// Two unresolved generators are never considered equal.
			_ => false,
		}
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

macro_rules! impl_from_int {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for AttrValue {
				fn from(value: $ty) -> Self {
					Self::Int(i64::from(value))
				}
			}
		)*
	};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for AttrValue {
	fn from(value: u64) -> Self {
		Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
	}
}

impl From<usize> for AttrValue {
	fn from(value: usize) -> Self {
		Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
	}
}

impl From<f32> for AttrValue {
	fn from(value: f32) -> Self {
		Self::Float(f64::from(value))
	}
}

impl From<f64> for AttrValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for AttrValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<DateTime<Utc>> for AttrValue {
	fn from(value: DateTime<Utc>) -> Self {
		Self::DateTime(value)
	}
}

impl From<Attrs> for AttrValue {
	fn from(value: Attrs) -> Self {
		Self::Map(value)
	}
}

impl From<Instance> for AttrValue {
	fn from(value: Instance) -> Self {
		Self::Model(value)
	}
}

impl From<Opaque> for AttrValue {
	fn from(value: Opaque) -> Self {
		Self::Opaque(value)
	}
}

impl From<Pending> for AttrValue {
	fn from(value: Pending) -> Self {
		Self::Pending(value)
	}
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
	fn from(values: Vec<T>) -> Self {
		Self::List(values.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

impl From<JsonValue> for AttrValue {
	fn from(value: JsonValue) -> Self {
		match value {
			JsonValue::Null => Self::Null,
			JsonValue::Bool(value) => Self::Bool(value),
			JsonValue::Number(number) => match number.as_i64() {
				Some(int) => Self::Int(int),
				None => Self::Float(number.as_f64().unwrap_or(f64::NAN)),
			},
			JsonValue::String(value) => Self::String(value),
			JsonValue::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
			JsonValue::Object(map) => Self::Map(Attrs::from(map)),
		}
	}
}
