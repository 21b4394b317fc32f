//! Adapters that record what the engine asks of them.

use std::sync::Arc;

use async_trait::async_trait;
use factoria_core::{Adapter, AdapterError, AttrValue, Instance, ModelDescriptor};
use parking_lot::Mutex;

/// One call received by a [`RecordingAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	pub action: &'static str,
	pub instance: Instance,
}

/// Adapter logging every save and destroy.
///
/// Destroying an instance whose `fail` attribute is `true` returns an
/// I/O error.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
	events: Mutex<Vec<Event>>,
}

impl RecordingAdapter {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn events(&self) -> Vec<Event> {
		self.events.lock().clone()
	}

	pub fn destroyed(&self) -> Vec<Instance> {
		self.events
			.lock()
			.iter()
			.filter(|event| event.action == "destroy")
			.map(|event| event.instance.clone())
			.collect()
	}

	fn record(&self, action: &'static str, instance: &Instance) {
		self.events.lock().push(Event {
			action,
			instance: instance.clone(),
		});
	}
}

#[async_trait]
impl Adapter for RecordingAdapter {
	fn name(&self) -> &str {
		"recording"
	}

	async fn save(&self, instance: Instance, _model: &ModelDescriptor) -> Result<Instance, AdapterError> {
		self.record("save", &instance);
		Ok(instance)
	}

	async fn destroy(
		&self,
		instance: Instance,
		_model: &ModelDescriptor,
	) -> Result<Instance, AdapterError> {
		self.record("destroy", &instance);
		if instance.get("fail")? == Some(AttrValue::Bool(true)) {
			return Err(Box::new(std::io::Error::other("destroy refused")));
		}
		Ok(instance)
	}
}
