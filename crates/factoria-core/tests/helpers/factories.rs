//! A small related model graph: phone numbers, addresses and users.

use factoria_core::{Engine, FactoryOptions, FactoryResult, Initializer, ModelDescriptor, attrs};

pub fn define_dummy_factories(engine: &Engine) -> FactoryResult<()> {
	engine.define(
		"PhoneNumber",
		ModelDescriptor::record("phone_numbers"),
		attrs! { "type" => "mobile", "number" => "1234567890" },
		FactoryOptions::default(),
	)?;

	let number = engine.seq("PhoneNumber2.number").map(|n| format!("1234567890-{n}"));
	engine.define(
		"PhoneNumber2",
		ModelDescriptor::record("phone_numbers"),
		Initializer::from_fn(move |options| {
			let landline = options.get("landline").and_then(|v| v.as_bool()).unwrap_or(false);
			attrs! {
				"type" => if landline { "landline" } else { "mobile" },
				"number" => number.clone(),
			}
		}),
		FactoryOptions::default(),
	)?;

	engine.define(
		"Address",
		ModelDescriptor::record("addresses"),
		attrs! {
			"id" => engine.seq("Address.id").map(|n| format!("address_{n}_id")),
			"street" => engine.seq("Address.street").map(|n| format!("street-{n}")),
			"lane_no" => engine.seq("Address.lane_no"),
			"landline_number" => engine
				.assoc_attrs("PhoneNumber2")
				.build_options(attrs! { "landline" => true }),
		},
		FactoryOptions::default(),
	)?;

	engine.define(
		"User",
		ModelDescriptor::record("users"),
		attrs! {
			"name" => engine.chance("name"),
			"email" => engine.seq("User.email").map(|n| format!("user{n}@email.com")),
			"mobile" => engine.assoc_attrs_many("PhoneNumber", 2).overrides(attrs! {
				"number" => engine.seq("User.mobile").map(|n| format!("123456-{n}")),
			}),
			"address" => engine.assoc_many("Address", 3).key("id"),
			"bio" => engine.chance("paragraph").arg(attrs! { "sentences" => 2 }),
		},
		FactoryOptions::default(),
	)?;

	Ok(())
}
