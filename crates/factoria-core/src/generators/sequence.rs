//! Sequences: id-keyed counters handing out 1, 2, 3, ...

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Generator, Pending};
use crate::engine::{Engine, GeneratorContext};
use crate::error::FactoryResult;
use crate::value::AttrValue;

type SequenceCallback = Arc<dyn Fn(u64) -> AttrValue + Send + Sync>;

#[derive(Debug, Default)]
struct SequenceState {
	counters: HashMap<String, u64>,
	next_auto: u64,
}

/// Counter table shared by every sequence of one engine.
///
/// Reading and incrementing a counter happen under one lock, so concurrent
/// resolutions never observe the same value twice.
#[derive(Debug, Default)]
pub struct SequenceRegistry {
	state: Mutex<SequenceState>,
}

impl SequenceRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next value for `id`, starting at 1.
	pub fn next(&self, id: &str) -> u64 {
		let mut state = self.state.lock();
		let counter = state.counters.entry(id.to_string()).or_insert(1);
		let value = *counter;
		*counter += 1;
		tracing::trace!(sequence = %id, value, "sequence advanced");
		value
	}

	/// Returns the value the next call to [`next`](Self::next) would hand
	/// out, or `None` if the counter has not been used since its last reset.
	pub fn peek(&self, id: &str) -> Option<u64> {
		self.state.lock().counters.get(id).copied()
	}

	/// Allocates a fresh id for an anonymous sequence.
	///
	/// Ids are `_0`, `_1`, ... and skip ids already in use. The allocator is
	/// never rewound, so ids stay unique even across resets.
	pub fn generate_id(&self) -> String {
		let mut state = self.state.lock();
		loop {
			let id = format!("_{}", state.next_auto);
			state.next_auto += 1;
			if !state.counters.contains_key(&id) {
				return id;
			}
		}
	}

	/// Resets one counter, or every counter when `id` is `None`.
	pub fn reset(&self, id: Option<&str>) {
		let mut state = self.state.lock();
		match id {
			Some(id) => {
				state.counters.remove(id);
			}
			None => state.counters.clear(),
		}
	}

	/// Number of live counters.
	pub fn len(&self) -> usize {
		self.state.lock().counters.len()
	}

	/// Returns true when no counter is live.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Arguments of a pending sequence.
///
/// Clones of one `SequenceArgs` share the lazily assigned anonymous id, so a
/// sequence embedded in a static initializer keeps counting across builds.
#[derive(Clone, Default)]
pub struct SequenceArgs {
	id: Option<String>,
	auto_id: Arc<OnceLock<String>>,
	callback: Option<SequenceCallback>,
}

impl SequenceArgs {
	/// Anonymous sequence; its id is assigned on first use.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sequence sharing its counter with every other sequence named `id`.
	pub fn named(id: impl Into<String>) -> Self {
		Self {
			id: Some(id.into()),
			..Self::default()
		}
	}

	/// Maps each number through `callback`.
	///
	/// # Examples
	///
	/// ```
	/// use factoria_core::SequenceArgs;
	///
	/// let email = SequenceArgs::named("User.email").map(|n| format!("user{n}@example.com"));
	/// assert_eq!(email.id(), Some("User.email"));
	/// ```
	pub fn map<F, V>(mut self, callback: F) -> Self
	where
		F: Fn(u64) -> V + Send + Sync + 'static,
		V: Into<AttrValue>,
	{
		self.callback = Some(Arc::new(move |n: u64| -> AttrValue { callback(n).into() }));
		self
	}

	/// The explicit id, or the assigned anonymous id once it exists.
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref().or_else(|| self.auto_id.get().map(String::as_str))
	}
}

impl fmt::Debug for SequenceArgs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SequenceArgs")
			.field("id", &self.id())
			.field("callback", &self.callback.is_some())
			.finish()
	}
}

impl From<SequenceArgs> for Pending {
	fn from(args: SequenceArgs) -> Self {
		Pending::Sequence(args)
	}
}

impl From<SequenceArgs> for AttrValue {
	fn from(args: SequenceArgs) -> Self {
		AttrValue::Pending(Pending::Sequence(args))
	}
}

/// Generator producing sequence numbers from the engine's registry.
pub struct SequenceGenerator {
	engine: Engine,
}

#[async_trait]
impl Generator for SequenceGenerator {
	type Args = SequenceArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &SequenceArgs) -> FactoryResult<AttrValue> {
		let registry = self.engine.sequences();
		let id = match &args.id {
			Some(id) => id.as_str(),
			None => args.auto_id.get_or_init(|| registry.generate_id()).as_str(),
		};
		let next = registry.next(id);
		Ok(match &args.callback {
			Some(callback) => callback(next),
			None => AttrValue::from(next),
		})
	}
}
