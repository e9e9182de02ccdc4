//! Deep reactive objects and arrays
//!
//! Object and array values own their contents and track reads per property.
//! An effect that reads `user.name` re-runs when `name` is written, and not
//! when `user.age` is. Nested objects are values of their own, so tracking
//! extends to any depth.
//!
//! Writes compare by identity: storing the value already present notifies
//! nobody.

use core::cell::RefCell;
use core::fmt;

use grappelli_reactive::{KeyedTrigger, Trigger};
use indexmap::IndexMap;

use crate::value::Value;

/// An ordered map of values with per-key change tracking.
pub struct ReactiveObject {
	entries: RefCell<IndexMap<String, Value>>,
	fields: KeyedTrigger<String>,
	shape: Trigger,
}

impl ReactiveObject {
	/// Creates an object holding `entries`.
	pub fn new(entries: IndexMap<String, Value>) -> Self {
		Self {
			entries: RefCell::new(entries),
			fields: KeyedTrigger::new(),
			shape: Trigger::new(),
		}
	}

	/// Reads `key`, subscribing the running effect to it.
	///
	/// Missing keys read as `undefined` and are tracked too, so adding one
	/// later re-runs the reader.
	pub fn get(&self, key: &str) -> Value {
		self.fields.track(key);
		self.get_untracked(key)
	}

	/// Reads `key` without tracking.
	pub fn get_untracked(&self, key: &str) -> Value {
		self.entries.borrow().get(key).cloned().unwrap_or_default()
	}

	/// Whether `key` is present (tracked).
	pub fn contains_key(&self, key: &str) -> bool {
		self.fields.track(key);
		self.entries.borrow().contains_key(key)
	}

	/// Writes `key`, re-running readers of that key if the value changed.
	pub fn set(&self, key: &str, value: Value) {
		let added = {
			let mut entries = self.entries.borrow_mut();
			match entries.get_mut(key) {
				Some(slot) if *slot == value => return,
				Some(slot) => {
					*slot = value;
					false
				}
				None => {
					entries.insert(key.to_string(), value);
					true
				}
			}
		};
		self.fields.notify(key);
		if added {
			self.shape.notify();
		}
	}

	/// Removes `key`, returning its last value.
	pub fn remove(&self, key: &str) -> Option<Value> {
		let removed = self.entries.borrow_mut().shift_remove(key)?;
		self.fields.remove(key);
		self.shape.notify();
		Some(removed)
	}

	/// Keys in insertion order; tracks additions and removals.
	pub fn keys(&self) -> Vec<String> {
		self.shape.track();
		self.entries.borrow().keys().cloned().collect()
	}

	/// Number of entries; tracks additions and removals.
	pub fn len(&self) -> usize {
		self.shape.track();
		self.entries.borrow().len()
	}

	/// Whether the object has no entries (tracked).
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Every entry, tracking the key set and each value.
	pub fn entries(&self) -> Vec<(String, Value)> {
		self.shape.track();
		let entries = self.entries_untracked();
		for (key, _) in &entries {
			self.fields.track(key.as_str());
		}
		entries
	}

	/// Every entry, without tracking.
	pub fn entries_untracked(&self) -> Vec<(String, Value)> {
		self.entries
			.borrow()
			.iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect()
	}
}

impl fmt::Debug for ReactiveObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.entries.borrow().iter()).finish()
	}
}

/// A list of values with per-index change tracking.
///
/// Readers of a single index subscribe to that index. Enumerating readers
/// (`to_vec`, `map`, `join`, ...) subscribe to the whole contents.
pub struct ReactiveArray {
	items: RefCell<Vec<Value>>,
	indices: KeyedTrigger<usize>,
	length: Trigger,
	contents: Trigger,
}

impl ReactiveArray {
	/// Creates an array holding `items`.
	pub fn new(items: Vec<Value>) -> Self {
		Self {
			items: RefCell::new(items),
			indices: KeyedTrigger::new(),
			length: Trigger::new(),
			contents: Trigger::new(),
		}
	}

	/// Reads `index` (tracked); out of range reads as `undefined`.
	pub fn get(&self, index: usize) -> Value {
		self.indices.track(&index);
		self.items.borrow().get(index).cloned().unwrap_or_default()
	}

	/// Length; tracks pushes, pops, and splices.
	pub fn len(&self) -> usize {
		self.length.track();
		self.items.borrow().len()
	}

	/// Whether the array is empty (tracked).
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A snapshot of the items, re-running the caller on any change.
	pub fn to_vec(&self) -> Vec<Value> {
		self.length.track();
		self.contents.track();
		self.to_vec_untracked()
	}

	/// A snapshot of the items without tracking.
	pub fn to_vec_untracked(&self) -> Vec<Value> {
		self.items.borrow().clone()
	}

	/// Writes `index`, padding with `undefined` past the end.
	pub fn set(&self, index: usize, value: Value) {
		let grew = {
			let mut items = self.items.borrow_mut();
			match items.get_mut(index) {
				Some(slot) if *slot == value => return,
				Some(slot) => {
					*slot = value;
					false
				}
				None => {
					items.resize(index, Value::Undefined);
					items.push(value);
					true
				}
			}
		};
		self.indices.notify(&index);
		self.contents.notify();
		if grew {
			self.length.notify();
		}
	}

	/// Appends `values`, returning the new length.
	pub fn push(&self, values: impl IntoIterator<Item = Value>) -> usize {
		let (start, end) = {
			let mut items = self.items.borrow_mut();
			let start = items.len();
			items.extend(values);
			(start, items.len())
		};
		if end > start {
			self.changed(start, end);
		}
		end
	}

	/// Removes and returns the last item.
	pub fn pop(&self) -> Option<Value> {
		let (last, len) = {
			let mut items = self.items.borrow_mut();
			let last = items.pop()?;
			(last, items.len())
		};
		self.changed(len, len + 1);
		Some(last)
	}

	/// Removes `delete` items at `start` and inserts `insert` there.
	///
	/// Returns the removed items. `start` past the end appends.
	pub fn splice(&self, start: usize, delete: usize, insert: Vec<Value>) -> Vec<Value> {
		let (removed, old_len, new_len) = {
			let mut items = self.items.borrow_mut();
			let old_len = items.len();
			let start = start.min(old_len);
			let end = start.saturating_add(delete).min(old_len);
			let removed: Vec<Value> = items.splice(start..end, insert).collect();
			(removed, old_len, items.len())
		};
		if removed.is_empty() && old_len == new_len {
			return removed;
		}
		self.changed(start.min(old_len), old_len.max(new_len));
		removed
	}

	/// Notifies readers of the indices in `from..to`, the contents, and the
	/// length when it moved.
	fn changed(&self, from: usize, to: usize) {
		let touched: Vec<usize> = (from..to).collect();
		self.indices.notify_all(&touched);
		self.contents.notify();
		self.length.notify();
	}
}

impl fmt::Debug for ReactiveArray {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.items.borrow().iter()).finish()
	}
}
