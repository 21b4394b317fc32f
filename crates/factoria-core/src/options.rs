//! Engine-wide options.

use crate::error::{FactoryError, FactoryResult};
use crate::factory::Hook;

/// Environment variable holding the random seed.
pub const SEED_ENV_VAR: &str = "FACTORIA_SEED";

/// Options applied by the engine to every factory.
///
/// Global hooks run after the factory's own hooks.
///
/// # Examples
///
/// ```
/// use factoria_core::EngineOptions;
///
/// let options = EngineOptions::new().with_seed(42);
/// assert_eq!(options.seed, Some(42));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
	/// Runs after every build.
	pub after_build: Option<Hook>,
	/// Runs after every create.
	pub after_create: Option<Hook>,
	/// Seed for the shared random source.
	pub seed: Option<u64>,
}

impl EngineOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the global after-build hook.
	pub fn with_after_build(mut self, hook: Hook) -> Self {
		self.after_build = Some(hook);
		self
	}

	/// Sets the global after-create hook.
	pub fn with_after_create(mut self, hook: Hook) -> Self {
		self.after_create = Some(hook);
		self
	}

	/// Sets the random seed.
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	/// Overlays `other` on `self`; options set in `other` win.
	pub fn merge(self, other: EngineOptions) -> EngineOptions {
		EngineOptions {
			after_build: other.after_build.or(self.after_build),
			after_create: other.after_create.or(self.after_create),
			seed: other.seed.or(self.seed),
		}
	}

	/// Reads options from the process environment.
	pub fn from_env() -> FactoryResult<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads options through `lookup`, which maps a variable name to its value.
	pub fn from_lookup<F>(lookup: F) -> FactoryResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let seed = match lookup(SEED_ENV_VAR) {
			Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|e| {
				FactoryError::InvalidConfig(format!("{SEED_ENV_VAR}={raw:?}: {e}"))
			})?),
			_ => None,
		};
		Ok(Self {
			seed,
			..Self::default()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key: &str| vars.get(key).cloned()
	}

	#[rstest]
	fn test_merge_prefers_new_values() {
		let base = EngineOptions::new()
			.with_seed(1)
			.with_after_build(Hook::new(|m, _, _| Ok(m)));

		let merged = base.merge(EngineOptions::new().with_seed(2));

		assert_eq!(merged.seed, Some(2));
		assert!(merged.after_build.is_some());
	}

	#[rstest]
	#[case(&[], None)]
	#[case(&[("FACTORIA_SEED", "42")], Some(42))]
	#[case(&[("FACTORIA_SEED", " 7 ")], Some(7))]
	#[case(&[("FACTORIA_SEED", "")], None)]
	fn test_seed_from_lookup(#[case] vars: &[(&str, &str)], #[case] expected: Option<u64>) {
		let options = EngineOptions::from_lookup(lookup(vars)).unwrap();
		assert_eq!(options.seed, expected);
	}

	#[rstest]
	fn test_unparsable_seed_is_config_error() {
		let result = EngineOptions::from_lookup(lookup(&[("FACTORIA_SEED", "abc")]));
		assert!(matches!(result, Err(FactoryError::InvalidConfig(_))));
	}
}
