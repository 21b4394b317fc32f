//! Bookkeeping of created models for teardown.

use std::mem;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::model::Instance;

/// A created model together with the adapter that persisted it.
#[derive(Debug, Clone)]
pub struct CreatedRecord {
	/// Adapter used to destroy the model.
	pub adapter: Arc<dyn Adapter>,
	/// The created model.
	pub instance: Instance,
}

/// Stack of created models, drained in reverse creation order.
#[derive(Debug, Default)]
pub struct CreatedList {
	records: Vec<CreatedRecord>,
}

impl CreatedList {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one created model.
	pub fn push(&mut self, adapter: Arc<dyn Adapter>, instance: Instance) {
		self.records.push(CreatedRecord { adapter, instance });
	}

	/// Number of tracked models.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true when nothing is tracked.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Tracked models in creation order.
	pub fn instances(&self) -> Vec<Instance> {
		self.records.iter().map(|r| r.instance.clone()).collect()
	}

	/// Empties the list, returning the records newest first.
	pub fn drain_lifo(&mut self) -> Vec<CreatedRecord> {
		let mut records = mem::take(&mut self.records);
		records.reverse();
		records
	}
}
