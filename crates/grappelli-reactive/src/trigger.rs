//! Triggers - valueless reactive nodes
//!
//! A [`Trigger`] is a signal without a value: reading it with [`Trigger::track`]
//! subscribes the running effect, and [`Trigger::notify`] re-runs every
//! subscriber. Containers that own their data (reactive objects and arrays)
//! pair their storage with triggers so effects subscribe to exactly the parts
//! they read.
//!
//! [`KeyedTrigger`] holds one lazily created trigger per key, giving
//! per-property tracking.
//!
//! ```ignore
//! let fields = KeyedTrigger::new();
//! Effect::new({
//!     let fields = fields.clone();
//!     move || fields.track(&"name")
//! });
//! fields.notify(&"name"); // re-runs the effect
//! fields.notify(&"age");  // nobody subscribed
//! ```

use core::cell::RefCell;
use core::fmt;
use core::hash::Hash;

use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::{NodeId, try_with_runtime, with_runtime};

/// A reactive node carrying no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigger {
	id: NodeId,
}

impl Trigger {
	/// Creates a trigger.
	pub fn new() -> Self {
		Self { id: NodeId::new() }
	}

	/// Subscribes the running effect, if any.
	pub fn track(&self) {
		with_runtime(|rt| rt.track_dependency(self.id));
	}

	/// Re-runs every subscriber before returning.
	pub fn notify(&self) {
		with_runtime(|rt| rt.notify_signal_change(self.id));
	}

	/// Number of effects currently subscribed.
	pub fn subscriber_count(&self) -> usize {
		with_runtime(|rt| rt.subscriber_count(self.id))
	}

	/// Id of the node.
	pub fn id(&self) -> NodeId {
		self.id
	}

	fn release(&self) {
		let _ = try_with_runtime(|rt| rt.remove_node(self.id));
	}
}

impl Default for Trigger {
	fn default() -> Self {
		Self::new()
	}
}

/// One trigger per key, created on first use.
///
/// Clones share the same triggers.
pub struct KeyedTrigger<K> {
	triggers: Rc<RefCell<HashMap<K, Trigger>>>,
}

impl<K: Hash + Eq + Clone> KeyedTrigger<K> {
	/// Creates an empty set of triggers.
	pub fn new() -> Self {
		Self {
			triggers: Rc::default(),
		}
	}

	/// Subscribes the running effect to `key`.
	///
	/// Outside of an effect this allocates nothing.
	pub fn track<Q>(&self, key: &Q)
	where
		K: core::borrow::Borrow<Q>,
		Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
	{
		if with_runtime(|rt| rt.current_observer()).is_none() {
			return;
		}
		let existing = self.triggers.borrow().get(key).copied();
		let trigger = match existing {
			Some(trigger) => trigger,
			None => {
				let trigger = Trigger::new();
				self.triggers.borrow_mut().insert(key.to_owned(), trigger);
				trigger
			}
		};
		trigger.track();
	}

	/// Re-runs the subscribers of `key`.
	pub fn notify<Q>(&self, key: &Q)
	where
		K: core::borrow::Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let trigger = self.triggers.borrow().get(key).copied();
		if let Some(trigger) = trigger {
			trigger.notify();
		}
	}

	/// Re-runs the subscribers of every key in `keys`, each effect once per key.
	pub fn notify_all<'a>(&self, keys: impl IntoIterator<Item = &'a K>)
	where
		K: 'a,
	{
		let triggers: Vec<Trigger> = {
			let map = self.triggers.borrow();
			keys.into_iter().filter_map(|key| map.get(key).copied()).collect()
		};
		for trigger in triggers {
			trigger.notify();
		}
	}

	/// Drops the trigger for `key` after notifying its subscribers.
	pub fn remove<Q>(&self, key: &Q)
	where
		K: core::borrow::Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let trigger = self.triggers.borrow_mut().remove(key);
		if let Some(trigger) = trigger {
			trigger.notify();
			trigger.release();
		}
	}

	/// Number of keys that have been tracked at least once.
	pub fn len(&self) -> usize {
		self.triggers.borrow().len()
	}

	/// Whether no key has been tracked yet.
	pub fn is_empty(&self) -> bool {
		self.triggers.borrow().is_empty()
	}
}

impl<K: Hash + Eq + Clone> Default for KeyedTrigger<K> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K> Clone for KeyedTrigger<K> {
	fn clone(&self) -> Self {
		Self {
			triggers: self.triggers.clone(),
		}
	}
}

impl<K: fmt::Debug> fmt::Debug for KeyedTrigger<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyedTrigger")
			.field("keys", &self.triggers.borrow().keys().collect::<Vec<_>>())
			.finish()
	}
}
