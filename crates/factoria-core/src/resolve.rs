//! Attribute resolution.
//!
//! Walks an attribute tree depth first in insertion order and replaces every
//! pending generator with the value it produces. Resolution is sequential:
//! a sibling is only evaluated once the previous one has settled, so
//! sequences and associations observe a stable order.

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::trace;

use crate::attrs::Attrs;
use crate::engine::Engine;
use crate::error::FactoryResult;
use crate::value::AttrValue;

/// Resolves every pending value in `attrs`.
pub fn resolve_attrs(engine: &Engine, attrs: Attrs) -> BoxFuture<'_, FactoryResult<Attrs>> {
	async move {
		if attrs.is_resolved() {
			return Ok(attrs);
		}
		let mut resolved = Attrs::new();
		for (key, value) in attrs {
			let value = resolve_value(engine, value).await?;
			resolved.insert(key, value);
		}
		Ok(resolved)
	}
	.boxed()
}

/// Resolves a single value, recursing into maps and lists.
///
/// Values produced by a generator are resolved again, so a closure may
/// return another generator.
pub fn resolve_value(engine: &Engine, value: AttrValue) -> BoxFuture<'_, FactoryResult<AttrValue>> {
	async move {
		match value {
			AttrValue::Pending(pending) => {
				trace!(generator = %pending.describe(), "resolving pending value");
				let produced = pending.generate(engine).await?;
				if produced.is_pending() {
					resolve_value(engine, produced).await
				} else {
					Ok(produced)
				}
			}
			AttrValue::Map(attrs) => Ok(AttrValue::Map(resolve_attrs(engine, attrs).await?)),
			AttrValue::List(items) if items.iter().any(AttrValue::is_pending) => {
				let mut resolved = Vec::with_capacity(items.len());
				for item in items {
					resolved.push(resolve_value(engine, item).await?);
				}
				Ok(AttrValue::List(resolved))
			}
			other => Ok(other),
		}
	}
	.boxed()
}
