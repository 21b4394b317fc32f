//! Engine lifecycle against the bundled adapters.

use std::sync::Arc;

use async_trait::async_trait;
use factoria_adapters::{ActiveModel, ActiveModelAdapter, MemoryAdapter};
use factoria_core::prelude::*;
use rstest::{fixture, rstest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ticket {
	title: String,
	#[serde(default)]
	number: Option<u32>,
}

#[async_trait]
impl ActiveModel for Ticket {
	async fn save(&self) -> Result<Self, AdapterError> {
		Ok(Self {
			number: Some(self.title.len() as u32),
			..self.clone()
		})
	}

	async fn destroy(&self) -> Result<(), AdapterError> {
		Ok(())
	}
}

struct Fixture {
	engine: Engine,
	store: Arc<MemoryAdapter>,
}

#[fixture]
fn fixture() -> Fixture {
	let store = Arc::new(MemoryAdapter::new());
	let engine = Engine::builder().default_adapter(store.clone()).build();
	engine
		.define(
			"Address",
			ModelDescriptor::record("addresses"),
			attrs! { "street" => engine.seq("Address.street").map(|n| format!("{n} Main St")) },
			FactoryOptions::default(),
		)
		.unwrap();
	engine
		.define(
			"User",
			ModelDescriptor::record("users"),
			attrs! {
				"name" => engine.seq("User.name").map(|n| format!("user{n}")),
				"address_id" => engine.assoc("Address").key("id"),
			},
			FactoryOptions::default(),
		)
		.unwrap();
	Fixture { engine, store }
}

#[rstest]
#[tokio::test]
async fn test_create_persists_associations_with_generated_keys(fixture: Fixture) {
	// Act
	let user = fixture
		.engine
		.create("User", attrs! {}, attrs! {})
		.await
		.unwrap();

	// Assert
	let address_id = user.get("address_id").unwrap().unwrap();
	let address = fixture
		.store
		.find("addresses", address_id.as_str().unwrap())
		.unwrap();
	assert_eq!(address.get("street"), Some(&AttrValue::from("1 Main St")));
	assert_eq!(fixture.store.count("users"), 1);
	assert_eq!(fixture.engine.created_count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_cleanup_empties_store(fixture: Fixture) {
	fixture
		.engine
		.create_many("User", 3, ManyArg::None, ManyArg::None)
		.await
		.unwrap();
	assert_eq!(fixture.store.count("users"), 3);
	assert_eq!(fixture.store.count("addresses"), 3);

	fixture.engine.cleanup().await.unwrap();

	assert_eq!(fixture.store.count("users"), 0);
	assert_eq!(fixture.store.count("addresses"), 0);
	assert_eq!(fixture.engine.created_count(), 0);
}

#[rstest]
#[tokio::test]
async fn test_build_does_not_touch_store(fixture: Fixture) {
	let user = fixture
		.engine
		.build("User", attrs! { "address_id" => "fixed" }, attrs! {})
		.await
		.unwrap();

	assert_eq!(user.get("id").unwrap(), None);
	assert_eq!(fixture.store.count("users"), 0);
	assert_eq!(fixture.store.count("addresses"), 0);
}

#[rstest]
#[tokio::test]
async fn test_active_models_use_their_own_adapter(fixture: Fixture) {
	// Arrange
	fixture.engine.set_adapter(Arc::new(ActiveModelAdapter::<Ticket>::new()), ["Ticket"]);
	fixture
		.engine
		.define(
			"Ticket",
			ModelDescriptor::of::<Ticket>("Ticket"),
			attrs! { "title" => "broken build" },
			FactoryOptions::default(),
		)
		.unwrap();

	// Act
	let ticket = fixture
		.engine
		.create("Ticket", attrs! {}, attrs! {})
		.await
		.unwrap();

	// Assert
	assert_eq!(ticket.downcast_ref::<Ticket>().unwrap().number, Some(12));
	assert_eq!(fixture.store.count("Ticket"), 0);
	fixture.engine.cleanup().await.unwrap();
}
