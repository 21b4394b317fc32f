//! Error types for the factory engine.
//!
//! Every failure surfaced by the engine is a [`FactoryError`]. Errors fall
//! into four broad classes, reported by [`FactoryError::kind`]:
//!
//! - **Definition** errors are raised synchronously by `define`/`extend`.
//! - **Resolution** errors come out of attribute resolution and the
//!   "many" operations.
//! - **Lookup** errors report an unknown factory name.
//! - **Adapter** errors are whatever the persistence adapter returned,
//!   carried through untouched.

use thiserror::Error;

/// Error type produced by adapters.
///
/// The engine never inspects or rewraps adapter errors, it only moves them
/// into [`FactoryError::Adapter`].
pub type AdapterError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broad classification of a [`FactoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Invalid factory definition (duplicate name, bad model or initializer).
	Definition,
	/// Failure while resolving attributes or validating arguments.
	Resolution,
	/// Unknown factory requested.
	Lookup,
	/// Failure raised by a persistence adapter.
	Adapter,
}

/// Errors that can occur while defining factories or producing fixtures.
#[derive(Debug, Error)]
pub enum FactoryError {
	/// A factory with this name already exists.
	#[error("Factory {0} already defined")]
	AlreadyDefined(String),

	/// The model descriptor cannot be used to construct models.
	#[error("Invalid model: {0}")]
	InvalidModel(String),

	/// The initializer is neither an attribute map nor a function.
	#[error("Invalid initializer: {0}")]
	InvalidInitializer(String),

	/// The requested factory does not exist.
	#[error("Invalid factory '{0}' requested")]
	NotFound(String),

	/// An argument failed validation.
	#[error("Validation error: {field}: {message}")]
	ValidationError {
		/// Argument that failed validation.
		field: String,
		/// Validation error message.
		message: String,
	},

	/// A generator received arguments it cannot work with.
	#[error("Invalid generator argument: {0}")]
	InvalidArgument(String),

	/// The random source has no method with this name.
	#[error("Invalid random method requested: {0}")]
	UnknownRandomMethod(String),

	/// The generator was constructed from a context whose engine is gone.
	#[error("Generator is not bound to a live engine")]
	UnboundGenerator,

	/// A pending value was found where a resolved one was required.
	#[error("Unresolved value: {0}")]
	Unresolved(String),

	/// A model could not be constructed from, or converted to, attributes.
	#[error("Model error: {model}: {message}")]
	ModelError {
		/// Model name.
		model: String,
		/// Description of the failure.
		message: String,
	},

	/// Configuration could not be read.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// JSON conversion error.
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// Error raised by a persistence adapter.
	#[error(transparent)]
	Adapter(AdapterError),
}

impl FactoryError {
	/// Creates a validation error for the given argument.
	pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::ValidationError {
			field: field.into(),
			message: message.into(),
		}
	}

	/// Creates a model error for the given model name.
	pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
		Self::ModelError {
			model: model.into(),
			message: message.into(),
		}
	}

	/// Wraps an adapter failure.
	pub fn adapter(error: impl Into<AdapterError>) -> Self {
		Self::Adapter(error.into())
	}

	/// Returns the class this error belongs to.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::AlreadyDefined(_) | Self::InvalidModel(_) | Self::InvalidInitializer(_) => {
				ErrorKind::Definition
			}
			Self::NotFound(_) => ErrorKind::Lookup,
			Self::Adapter(_) => ErrorKind::Adapter,
			Self::ValidationError { .. }
			| Self::InvalidArgument(_)
			| Self::UnknownRandomMethod(_)
			| Self::UnboundGenerator
			| Self::Unresolved(_)
			| Self::ModelError { .. }
			| Self::InvalidConfig(_)
			| Self::JsonError(_) => ErrorKind::Resolution,
		}
	}
}

/// Result type alias for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;
