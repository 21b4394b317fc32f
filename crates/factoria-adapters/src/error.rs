//! Errors raised by the bundled adapters.

use thiserror::Error;

/// Errors raised by [`MemoryAdapter`](crate::MemoryAdapter) and
/// [`ActiveModelAdapter`](crate::ActiveModelAdapter).
#[derive(Debug, Error)]
pub enum StoreError {
	/// The primary key holds a value that cannot be used as a key.
	#[error("Unsupported primary key for {model}: {kind}")]
	UnsupportedKey {
		/// Model name.
		model: String,
		/// Kind of the offending value.
		kind: &'static str,
	},

	/// The instance could not be read back into attributes.
	#[error("Cannot read {model} instance: {source}")]
	Unreadable {
		/// Model name.
		model: String,
		/// Underlying failure.
		#[source]
		source: factoria_core::FactoryError,
	},

	/// The instance does not hold the type the adapter manages.
	#[error("{model} instance is not a {expected}")]
	TypeMismatch {
		/// Model name.
		model: String,
		/// Type the adapter expected.
		expected: &'static str,
	},
}
