//! Arguments of the "many" operations.

use serde_json::Value as JsonValue;

use crate::attrs::Attrs;
use crate::error::{FactoryError, FactoryResult};
use crate::value::AttrValue;

/// Overrides or build options for a batch of `num` items.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ManyArg {
	/// Every item gets an empty map.
	#[default]
	None,
	/// Every item gets the same map.
	Shared(Attrs),
	/// Item `i` gets entry `i`; missing entries are empty maps.
	PerItem(Vec<Attrs>),
	/// A shape that cannot be used, described for the error message.
	Invalid(String),
}

impl ManyArg {
	/// Expands the argument to one map per item.
	///
	/// `field` names the argument in validation errors.
	pub fn expand<'a>(&'a self, field: &str, num: usize, empty: &'a Attrs) -> FactoryResult<Vec<&'a Attrs>> {
		match self {
			Self::None => Ok(vec![empty; num]),
			Self::Shared(attrs) => Ok(vec![attrs; num]),
			Self::PerItem(list) => Ok((0..num).map(|i| list.get(i).unwrap_or(empty)).collect()),
			Self::Invalid(kind) => Err(FactoryError::validation(
				field,
				format!("expected a map or an array of maps, got {kind}"),
			)),
		}
	}
}

/// Rejects batch sizes below one.
pub(crate) fn validate_count(num: usize) -> FactoryResult<()> {
	if num < 1 {
		return Err(FactoryError::validation(
			"num",
			"Invalid number of objects requested",
		));
	}
	Ok(())
}

impl From<Attrs> for ManyArg {
	fn from(attrs: Attrs) -> Self {
		Self::Shared(attrs)
	}
}

impl From<Vec<Attrs>> for ManyArg {
	fn from(list: Vec<Attrs>) -> Self {
		Self::PerItem(list)
	}
}

impl From<Option<Attrs>> for ManyArg {
	fn from(attrs: Option<Attrs>) -> Self {
		attrs.map_or(Self::None, Self::Shared)
	}
}

impl From<AttrValue> for ManyArg {
	fn from(value: AttrValue) -> Self {
		match value {
			AttrValue::Null => Self::None,
			AttrValue::Map(attrs) => Self::Shared(attrs),
			AttrValue::List(items) => {
				let mut list = Vec::with_capacity(items.len());
				for item in items {
					match item {
						AttrValue::Map(attrs) => list.push(attrs),
						AttrValue::Null => list.push(Attrs::new()),
						other => return Self::Invalid(format!("an array containing {}", other.kind_name())),
					}
				}
				Self::PerItem(list)
			}
			other => Self::Invalid(other.kind_name().to_string()),
		}
	}
}

impl From<JsonValue> for ManyArg {
	fn from(value: JsonValue) -> Self {
		Self::from(AttrValue::from(value))
	}
}
