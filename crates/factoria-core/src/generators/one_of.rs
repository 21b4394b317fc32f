use async_trait::async_trait;

use super::{Generator, Pending};
use crate::engine::{Engine, GeneratorContext};
use crate::error::{FactoryError, FactoryResult};
use crate::resolve::resolve_value;
use crate::value::AttrValue;

/// Arguments of a pending one-of pick.
#[derive(Debug, Clone)]
pub struct OneOfArgs {
	values: Box<AttrValue>,
}

impl OneOfArgs {
	/// Picks from `values`, which must be a non-empty list when resolved.
	pub fn new(values: impl Into<AttrValue>) -> Self {
		Self {
			values: Box::new(values.into()),
		}
	}

	/// Number of candidates, zero when the input is not a list.
	pub fn len(&self) -> usize {
		self.values.as_list().map_or(0, <[AttrValue]>::len)
	}

	/// Returns true when there is nothing to pick from.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl From<OneOfArgs> for Pending {
	fn from(args: OneOfArgs) -> Self {
		Pending::OneOf(args)
	}
}

impl From<OneOfArgs> for AttrValue {
	fn from(args: OneOfArgs) -> Self {
		AttrValue::Pending(Pending::OneOf(args))
	}
}

/// Picks one candidate uniformly with the engine's random source.
///
/// A candidate that is itself pending, such as a lazy closure, is resolved
/// before it is returned.
pub struct OneOfGenerator {
	engine: Engine,
}

#[async_trait]
impl Generator for OneOfGenerator {
	type Args = OneOfArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &OneOfArgs) -> FactoryResult<AttrValue> {
		let candidates = args.values.as_list().ok_or_else(|| {
			FactoryError::InvalidArgument("Expected an array of possible values".to_string())
		})?;
		if candidates.is_empty() {
			return Err(FactoryError::InvalidArgument(
				"Empty array passed for possible values".to_string(),
			));
		}
		let index = self
			.engine
			.with_random(|source| source.pick_index(candidates.len()));
		resolve_value(&self.engine, candidates[index].clone()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generators::SequenceArgs;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_single_candidate_always_wins() {
		let engine = Engine::new();
		let generator = OneOfGenerator::bind(&engine.context()).unwrap();

		let value = generator.generate(&OneOfArgs::new(vec!["a"])).await.unwrap();

		assert_eq!(value, AttrValue::from("a"));
	}

	#[rstest]
	#[case(AttrValue::List(vec![]))]
	#[case(AttrValue::from("not a list"))]
	#[case(AttrValue::Null)]
	#[tokio::test]
	async fn test_rejects_invalid_candidates(#[case] values: AttrValue) {
		let engine = Engine::new();
		let generator = OneOfGenerator::bind(&engine.context()).unwrap();

		let result = generator.generate(&OneOfArgs::new(values)).await;

		assert!(matches!(result, Err(FactoryError::InvalidArgument(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolves_lazy_candidate() {
		let engine = Engine::new();
		let generator = OneOfGenerator::bind(&engine.context()).unwrap();
		let lazy = AttrValue::from(Pending::lazy_async(|| async {
			Ok(AttrValue::from("promised"))
		}));

		let value = generator
			.generate(&OneOfArgs::new(vec![lazy]))
			.await
			.unwrap();

		assert_eq!(value, AttrValue::from("promised"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolves_nested_generator_candidate() {
		let engine = Engine::new();
		let generator = OneOfGenerator::bind(&engine.context()).unwrap();
		let candidates = vec![AttrValue::from(SequenceArgs::named("pick"))];

		let value = generator
			.generate(&OneOfArgs::new(candidates))
			.await
			.unwrap();

		assert_eq!(value, AttrValue::Int(1));
	}

	#[rstest]
	#[tokio::test]
	async fn test_nested_one_of_candidate_is_resolved() {
		let engine = Engine::new();
		let generator = OneOfGenerator::bind(&engine.context()).unwrap();
		let inner = AttrValue::from(OneOfArgs::new(vec!["deep"]));

		let value = generator
			.generate(&OneOfArgs::new(vec![inner]))
			.await
			.unwrap();

		assert_eq!(value, AttrValue::from("deep"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_seeded_engine_picks_deterministically() {
		let engine = Engine::new();
		let generator = OneOfGenerator::bind(&engine.context()).unwrap();
		let args = OneOfArgs::new(vec![1, 2, 3, 4, 5, 6, 7, 8]);

		engine.seed(11);
		let mut first = Vec::new();
		for _ in 0..5 {
			first.push(generator.generate(&args).await.unwrap());
		}
		engine.seed(11);
		let mut second = Vec::new();
		for _ in 0..5 {
			second.push(generator.generate(&args).await.unwrap());
		}

		assert_eq!(first, second);
	}
}
