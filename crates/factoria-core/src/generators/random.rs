//! Seeded random values.
//!
//! [`RandomSource`] is the opaque capability: given a method name and
//! arguments it produces a value, and reseeding it with the same seed
//! replays the same sequence of outputs. [`FakerSource`] backs it with a
//! [`StdRng`] and the `fake` crate.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use fake::Fake;
use fake::faker::address::en::{CityName, CountryName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Generator, Pending};
use crate::attrs::Attrs;
use crate::engine::{Engine, GeneratorContext};
use crate::error::{FactoryError, FactoryResult};
use crate::value::AttrValue;

/// Largest integer a double can represent exactly; the default integer range.
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

const DEFAULT_POOL: &str =
	"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()[]";

/// Upper bound for lengths and word or sentence counts.
const MAX_COUNT: usize = 10_000;

// 1970-01-01 .. 2100-01-01
const DATE_RANGE_SECS: std::ops::Range<i64> = 0..4_102_444_800;

const METHODS: &[&str] = &[
	"bool",
	"integer",
	"natural",
	"floating",
	"character",
	"string",
	"word",
	"sentence",
	"paragraph",
	"name",
	"first",
	"last",
	"email",
	"phone",
	"city",
	"country",
	"street",
	"zip",
	"company",
	"uuid",
	"guid",
	"date",
	"pickone",
	"pickset",
	"shuffle",
];

/// Source of seeded pseudo-random values.
pub trait RandomSource: Send {
	/// Reseeds the source.
	fn seed(&mut self, seed: u64);

	/// Returns true if `method` can be passed to [`call`](Self::call).
	fn has_method(&self, method: &str) -> bool;

	/// Produces one value by method name.
	fn call(&mut self, method: &str, args: &[AttrValue]) -> FactoryResult<AttrValue>;

	/// Picks an index in `0..len`. `len` is never zero.
	fn pick_index(&mut self, len: usize) -> usize;
}

/// Reads chance-style options out of the first argument.
struct Options<'a>(Option<&'a Attrs>);

impl<'a> Options<'a> {
	fn new(args: &'a [AttrValue]) -> Self {
		Self(args.first().and_then(AttrValue::as_map))
	}

	fn value(&self, key: &str) -> Option<&'a AttrValue> {
		self.0.and_then(|attrs| attrs.get(key)).filter(|v| !v.is_null())
	}

	fn int(&self, key: &str) -> FactoryResult<Option<i64>> {
		self.value(key)
			.map(|v| {
				v.as_i64().ok_or_else(|| {
					FactoryError::InvalidArgument(format!("option '{key}' must be an integer"))
				})
			})
			.transpose()
	}

	fn count(&self, key: &str) -> FactoryResult<Option<usize>> {
		self.int(key)?
			.map(|v| {
				let count = usize::try_from(v).map_err(|_| {
					FactoryError::InvalidArgument(format!("option '{key}' must not be negative"))
				})?;
				if count > MAX_COUNT {
					return Err(FactoryError::InvalidArgument(format!(
						"option '{key}' must not exceed {MAX_COUNT}"
					)));
				}
				Ok(count)
			})
			.transpose()
	}

	fn float(&self, key: &str) -> FactoryResult<Option<f64>> {
		self.value(key)
			.map(|v| {
				v.as_f64().ok_or_else(|| {
					FactoryError::InvalidArgument(format!("option '{key}' must be a number"))
				})
			})
			.transpose()
	}

	fn string(&self, key: &str) -> FactoryResult<Option<&'a str>> {
		self.value(key)
			.map(|v| {
				v.as_str().ok_or_else(|| {
					FactoryError::InvalidArgument(format!("option '{key}' must be a string"))
				})
			})
			.transpose()
	}
}

fn list_arg<'a>(method: &str, args: &'a [AttrValue]) -> FactoryResult<&'a [AttrValue]> {
	let list = args.first().and_then(AttrValue::as_list).ok_or_else(|| {
		FactoryError::InvalidArgument(format!("{method} requires an array"))
	})?;
	if list.is_empty() && method == "pickone" {
		return Err(FactoryError::InvalidArgument(
			"pickone requires a non-empty array".to_string(),
		));
	}
	Ok(list)
}

fn ensure_range<T: PartialOrd>(min: T, max: T) -> FactoryResult<()> {
	if min > max {
		return Err(FactoryError::InvalidArgument(
			"min cannot be greater than max".to_string(),
		));
	}
	Ok(())
}

/// Default [`RandomSource`], backed by a seedable [`StdRng`].
pub struct FakerSource {
	rng: StdRng,
}

impl FakerSource {
	/// Creates a source seeded from the operating system.
	pub fn new() -> Self {
		Self {
			rng: StdRng::from_entropy(),
		}
	}

	/// Creates a deterministic source.
	pub fn seeded(seed: u64) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
		}
	}

	fn pool(&mut self, options: &Options<'_>) -> FactoryResult<Vec<char>> {
		let pool: Vec<char> = options
			.string("pool")?
			.unwrap_or(DEFAULT_POOL)
			.chars()
			.collect();
		if pool.is_empty() {
			return Err(FactoryError::InvalidArgument(
				"character pool must not be empty".to_string(),
			));
		}
		Ok(pool)
	}

	fn character(&mut self, pool: &[char]) -> char {
		pool[self.rng.gen_range(0..pool.len())]
	}

	fn integer(&mut self, options: &Options<'_>, default_min: i64) -> FactoryResult<AttrValue> {
		let min = options.int("min")?.unwrap_or(default_min);
		let max = options.int("max")?.unwrap_or(MAX_SAFE_INTEGER);
		ensure_range(min, max)?;
		Ok(AttrValue::Int(self.rng.gen_range(min..=max)))
	}

	fn floating(&mut self, options: &Options<'_>) -> FactoryResult<AttrValue> {
		let fixed = options.int("fixed")?.unwrap_or(4).clamp(0, 15) as i32;
		let scale = 10f64.powi(fixed);
		let bound = MAX_SAFE_INTEGER as f64 / scale;
		let min = options.float("min")?.unwrap_or(-bound);
		let max = options.float("max")?.unwrap_or(bound);
		if !min.is_finite() || !max.is_finite() {
			return Err(FactoryError::InvalidArgument(
				"min and max must be finite numbers".to_string(),
			));
		}
		ensure_range(min, max)?;
		if !(max - min).is_finite() {
			return Err(FactoryError::InvalidArgument(
				"range between min and max is too wide".to_string(),
			));
		}
		let value = self.rng.gen_range(min..=max);
		let rounded = (value * scale).round() / scale;
		Ok(AttrValue::Float(if rounded.is_finite() { rounded } else { value }))
	}
}

impl Default for FakerSource {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for FakerSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FakerSource").finish_non_exhaustive()
	}
}

impl RandomSource for FakerSource {
	fn seed(&mut self, seed: u64) {
		self.rng = StdRng::seed_from_u64(seed);
	}

	fn has_method(&self, method: &str) -> bool {
		METHODS.contains(&method)
	}

	fn call(&mut self, method: &str, args: &[AttrValue]) -> FactoryResult<AttrValue> {
		let options = Options::new(args);
		let value = match method {
			"bool" => {
				let likelihood = options.int("likelihood")?.unwrap_or(50);
				if !(0..=100).contains(&likelihood) {
					return Err(FactoryError::InvalidArgument(
						"likelihood must be between 0 and 100".to_string(),
					));
				}
				AttrValue::Bool(self.rng.gen_bool(likelihood as f64 / 100.0))
			}
			"integer" => self.integer(&options, -MAX_SAFE_INTEGER)?,
			"natural" => {
				if options.int("min")?.is_some_and(|min| min < 0) {
					return Err(FactoryError::InvalidArgument(
						"natural min must not be negative".to_string(),
					));
				}
				self.integer(&options, 0)?
			}
			"floating" => self.floating(&options)?,
			"character" => {
				let pool = self.pool(&options)?;
				AttrValue::String(self.character(&pool).to_string())
			}
			"string" => {
				let pool = self.pool(&options)?;
				let length = match options.count("length")? {
					Some(length) => length,
					None => self.rng.gen_range(5..=20),
				};
				AttrValue::String((0..length).map(|_| self.character(&pool)).collect())
			}
			"word" => AttrValue::String(Word().fake_with_rng(&mut self.rng)),
			"sentence" => {
				let words = match options.count("words")? {
					Some(words) => words..words.saturating_add(1),
					None => 12..19,
				};
				AttrValue::String(Sentence(words).fake_with_rng(&mut self.rng))
			}
			"paragraph" => {
				let sentences = match options.count("sentences")? {
					Some(sentences) => sentences..sentences.saturating_add(1),
					None => 3..8,
				};
				AttrValue::String(Paragraph(sentences).fake_with_rng(&mut self.rng))
			}
			"name" => AttrValue::String(Name().fake_with_rng(&mut self.rng)),
			"first" => AttrValue::String(FirstName().fake_with_rng(&mut self.rng)),
			"last" => AttrValue::String(LastName().fake_with_rng(&mut self.rng)),
			"email" => AttrValue::String(SafeEmail().fake_with_rng(&mut self.rng)),
			"phone" => AttrValue::String(PhoneNumber().fake_with_rng(&mut self.rng)),
			"city" => AttrValue::String(CityName().fake_with_rng(&mut self.rng)),
			"country" => AttrValue::String(CountryName().fake_with_rng(&mut self.rng)),
			"street" => AttrValue::String(StreetName().fake_with_rng(&mut self.rng)),
			"zip" => AttrValue::String(ZipCode().fake_with_rng(&mut self.rng)),
			"company" => AttrValue::String(CompanyName().fake_with_rng(&mut self.rng)),
			"uuid" | "guid" => {
				let bytes: [u8; 16] = self.rng.r#gen();
				AttrValue::String(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
			}
			"date" => {
				let secs = self.rng.gen_range(DATE_RANGE_SECS);
				let date = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
					FactoryError::InvalidArgument(format!("timestamp {secs} out of range"))
				})?;
				AttrValue::DateTime(date)
			}
			"pickone" => {
				let list = list_arg(method, args)?;
				list[self.rng.gen_range(0..list.len())].clone()
			}
			"pickset" => {
				let list = list_arg(method, args)?;
				let count = match args.get(1) {
					Some(value) => value.as_i64().and_then(|n| usize::try_from(n).ok()).ok_or_else(
						|| FactoryError::InvalidArgument("pickset count must be a natural number".to_string()),
					)?,
					None => 1,
				};
				AttrValue::List(list.choose_multiple(&mut self.rng, count).cloned().collect())
			}
			"shuffle" => {
				let mut list = list_arg(method, args)?.to_vec();
				list.shuffle(&mut self.rng);
				AttrValue::List(list)
			}
			other => return Err(FactoryError::UnknownRandomMethod(other.to_string())),
		};
		Ok(value)
	}

	fn pick_index(&mut self, len: usize) -> usize {
		self.rng.gen_range(0..len)
	}
}

/// Custom random function: receives the source and the captured arguments.
pub type RandomFn =
	Arc<dyn Fn(&mut dyn RandomSource, &[AttrValue]) -> FactoryResult<AttrValue> + Send + Sync>;

#[derive(Clone)]
enum RandomMethod {
	Named(String),
	Custom(RandomFn),
}

/// Arguments of a pending random value.
#[derive(Clone)]
pub struct RandomArgs {
	method: RandomMethod,
	args: Vec<AttrValue>,
}

impl RandomArgs {
	/// Dispatches to the source method `name`.
	pub fn method(name: impl Into<String>) -> Self {
		Self {
			method: RandomMethod::Named(name.into()),
			args: Vec::new(),
		}
	}

	/// Calls `f` with the source instead of a named method.
	pub fn custom<F>(f: F) -> Self
	where
		F: Fn(&mut dyn RandomSource, &[AttrValue]) -> FactoryResult<AttrValue> + Send + Sync + 'static,
	{
		Self {
			method: RandomMethod::Custom(Arc::new(f)),
			args: Vec::new(),
		}
	}

	/// Appends a positional argument.
	pub fn arg(mut self, value: impl Into<AttrValue>) -> Self {
		self.args.push(value.into());
		self
	}

	/// Method name, or `"custom"` for closures.
	pub fn method_name(&self) -> &str {
		match &self.method {
			RandomMethod::Named(name) => name,
			RandomMethod::Custom(_) => "custom",
		}
	}

	/// Captured positional arguments.
	pub fn args(&self) -> &[AttrValue] {
		&self.args
	}
}

impl fmt::Debug for RandomArgs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RandomArgs")
			.field("method", &self.method_name())
			.field("args", &self.args)
			.finish()
	}
}

impl From<RandomArgs> for Pending {
	fn from(args: RandomArgs) -> Self {
		Pending::Random(args)
	}
}

impl From<RandomArgs> for AttrValue {
	fn from(args: RandomArgs) -> Self {
		AttrValue::Pending(Pending::Random(args))
	}
}

/// Draws values from the engine's shared random source.
pub struct RandomGenerator {
	engine: Engine,
}

impl RandomGenerator {
	/// Reseeds the engine's random source.
	pub fn seed(&self, seed: u64) {
		self.engine.seed(seed);
	}
}

#[async_trait]
impl Generator for RandomGenerator {
	type Args = RandomArgs;

	fn bind(ctx: &GeneratorContext) -> FactoryResult<Self> {
		Ok(Self {
			engine: ctx.engine()?,
		})
	}

	async fn generate(&self, args: &RandomArgs) -> FactoryResult<AttrValue> {
		self.engine.with_random(|source| match &args.method {
			RandomMethod::Named(method) => {
				if !source.has_method(method) {
					return Err(FactoryError::UnknownRandomMethod(method.clone()));
				}
				source.call(method, &args.args)
			}
			RandomMethod::Custom(f) => f(source, &args.args),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn draw(source: &mut FakerSource, method: &str, args: &[AttrValue]) -> Vec<AttrValue> {
		(0..5).map(|_| source.call(method, args).unwrap()).collect()
	}

	#[rstest]
	#[case("name", vec![])]
	#[case("integer", vec![AttrValue::Map(crate::attrs! { "min" => 1, "max" => 100 })])]
	#[case("sentence", vec![AttrValue::Map(crate::attrs! { "words" => 4 })])]
	#[case("uuid", vec![])]
	#[case("date", vec![])]
	fn test_same_seed_replays_values(#[case] method: &str, #[case] args: Vec<AttrValue>) {
		// Arrange
		let mut source = FakerSource::new();

		// Act
		source.seed(3);
		let first = draw(&mut source, method, &args);
		source.seed(3);
		let second = draw(&mut source, method, &args);

		// Assert
		assert_eq!(first, second);
	}

	#[rstest]
	fn test_integer_respects_bounds() {
		let mut source = FakerSource::seeded(1);
		let options = [AttrValue::Map(crate::attrs! { "min" => -2, "max" => 2 })];
		for _ in 0..50 {
			let value = source.call("integer", &options).unwrap().as_i64().unwrap();
			assert!((-2..=2).contains(&value));
		}
	}

	#[rstest]
	fn test_integer_rejects_inverted_range() {
		let mut source = FakerSource::seeded(1);
		let options = [AttrValue::Map(crate::attrs! { "min" => 5, "max" => 1 })];
		assert!(matches!(
			source.call("integer", &options),
			Err(FactoryError::InvalidArgument(_))
		));
	}

	#[rstest]
	#[case(-1e308, 1e308)]
	#[case(f64::NAN, 1.0)]
	#[case(0.0, f64::INFINITY)]
	#[case(f64::NEG_INFINITY, 0.0)]
	fn test_floating_rejects_unusable_bounds(#[case] min: f64, #[case] max: f64) {
		let mut source = FakerSource::seeded(1);
		let options = [AttrValue::Map(crate::attrs! { "min" => min, "max" => max })];
		assert!(matches!(
			source.call("floating", &options),
			Err(FactoryError::InvalidArgument(_))
		));
	}

	#[rstest]
	fn test_floating_respects_bounds() {
		let mut source = FakerSource::seeded(1);
		let options = [AttrValue::Map(crate::attrs! { "min" => -1.5, "max" => 1.5 })];
		for _ in 0..50 {
			let value = source.call("floating", &options).unwrap().as_f64().unwrap();
			assert!((-1.5..=1.5).contains(&value));
		}
	}

	#[rstest]
	#[case("sentence", "words")]
	#[case("paragraph", "sentences")]
	#[case("string", "length")]
	fn test_oversized_counts_are_rejected(#[case] method: &str, #[case] key: &str) {
		let mut source = FakerSource::seeded(1);
		let mut options = Attrs::new();
		options.insert(key, i64::MAX);
		assert!(matches!(
			source.call(method, &[AttrValue::Map(options)]),
			Err(FactoryError::InvalidArgument(_))
		));
	}

	#[rstest]
	fn test_bool_likelihood_extremes() {
		let mut source = FakerSource::seeded(1);
		let always = [AttrValue::Map(crate::attrs! { "likelihood" => 100 })];
		let never = [AttrValue::Map(crate::attrs! { "likelihood" => 0 })];
		assert_eq!(source.call("bool", &always).unwrap(), AttrValue::Bool(true));
		assert_eq!(source.call("bool", &never).unwrap(), AttrValue::Bool(false));
	}

	#[rstest]
	fn test_string_length_and_pool() {
		let mut source = FakerSource::seeded(1);
		let options = [AttrValue::Map(crate::attrs! { "length" => 8, "pool" => "ab" })];
		let value = source.call("string", &options).unwrap();
		let value = value.as_str().unwrap();
		assert_eq!(value.len(), 8);
		assert!(value.chars().all(|c| c == 'a' || c == 'b'));
	}

	#[rstest]
	fn test_pickone_and_pickset() {
		let mut source = FakerSource::seeded(1);
		let list = AttrValue::from(vec![1, 2, 3]);

		let one = source.call("pickone", &[list.clone()]).unwrap();
		let set = source.call("pickset", &[list.clone(), AttrValue::Int(2)]).unwrap();

		assert!(list.as_list().unwrap().contains(&one));
		assert_eq!(set.as_list().unwrap().len(), 2);
		assert!(source.call("pickone", &[AttrValue::List(vec![])]).is_err());
	}

	#[rstest]
	fn test_unknown_method() {
		let mut source = FakerSource::seeded(1);
		assert!(!source.has_method("someMethodThatDoesNotExist"));
		assert!(matches!(
			source.call("someMethodThatDoesNotExist", &[]),
			Err(FactoryError::UnknownRandomMethod(_))
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_generator_rejects_unknown_method() {
		let engine = Engine::new();
		let generator = RandomGenerator::bind(&engine.context()).unwrap();

		let result = generator
			.generate(&RandomArgs::method("someMethodThatDoesNotExist"))
			.await;

		assert!(matches!(result, Err(FactoryError::UnknownRandomMethod(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_generator_calls_custom_function() {
		let engine = Engine::new();
		let generator = RandomGenerator::bind(&engine.context()).unwrap();
		let args = RandomArgs::custom(|source, args| {
			let index = source.pick_index(1);
			Ok(args[index].clone())
		})
		.arg("only");

		assert_eq!(
			generator.generate(&args).await.unwrap(),
			AttrValue::from("only")
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_generator_seed_is_deterministic() {
		let engine = Engine::new();
		let generator = RandomGenerator::bind(&engine.context()).unwrap();
		let args = RandomArgs::method("name");

		generator.seed(3);
		let first = generator.generate(&args).await.unwrap();
		generator.seed(3);
		let second = generator.generate(&args).await.unwrap();

		assert_eq!(first, second);
	}
}
