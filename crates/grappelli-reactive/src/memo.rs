//! Memo - derived values.
//!
//! A `Memo<T>` is an effect that writes into an internal signal. Consumers get
//! a read-only accessor that tracks like a signal, and only hear about changes
//! when the recomputed value differs from the previous one.

use core::fmt;

use crate::cleanup::Owner;
use crate::effect::Effect;
use crate::runtime::{ExecutionGuard, NodeId, NodeType, Observer};
use crate::signal::Signal;

/// A derived, read-only reactive value
pub struct Memo<T: 'static> {
	value: Signal<T>,
	effect: Effect,
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
	/// Creates a memo from a computation.
	///
	/// The computation runs immediately and again whenever a signal it read changes.
	///
	/// ```ignore
	/// let count = Signal::new(2);
	/// let doubled = Memo::new({
	///     let count = count.clone();
	///     move || count.get() * 2
	/// });
	/// assert_eq!(doubled.get(), 4);
	/// ```
	pub fn new<F>(mut compute: F) -> Self
	where
		F: FnMut() -> T + 'static,
	{
		let id = NodeId::new();
		let owner = Owner::new();

		// First run is tracked under the memo's own id and owner
		let initial = {
			let _guard = ExecutionGuard::enter(Observer::new(id, NodeType::Memo), Some(owner.clone()));
			compute()
		};

		let value = Signal::new(initial);
		let writer = value.clone();
		let effect = Effect::register_owned(id, NodeType::Memo, owner, move || {
			writer.set(compute());
		});

		Self { value, effect }
	}

	/// Reads the value, tracking the dependency.
	pub fn get(&self) -> T {
		self.value.get()
	}

	/// Reads the value without tracking.
	pub fn get_untracked(&self) -> T {
		self.value.get_untracked()
	}
}

impl<T: 'static> Memo<T> {
	/// Borrows the value, tracking the dependency.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.value.with(f)
	}

	/// Id of the node consumers subscribe to.
	pub fn id(&self) -> NodeId {
		self.value.id()
	}

	/// Stops recomputing. The last value stays readable.
	pub fn dispose(&self) {
		self.effect.dispose();
	}
}

impl<T: 'static> Clone for Memo<T> {
	fn clone(&self) -> Self {
		Self {
			value: self.value.clone(),
			effect: self.effect.clone(),
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Memo<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Memo")
			.field("value", &self.value)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[test]
	#[serial]
	fn test_memo_follows_source() {
		let count = Signal::new(2);
		let count_c = count.clone();
		let doubled = Memo::new(move || count_c.get() * 2);

		assert_eq!(doubled.get(), 4);
		count.set(5);
		assert_eq!(doubled.get(), 10);
	}

	#[test]
	#[serial]
	fn test_memo_suppresses_equal_results() {
		let count = Signal::new(1);
		let count_c = count.clone();
		let parity = Memo::new(move || count_c.get() % 2);

		let runs = Rc::new(RefCell::new(0));
		let (parity_c, runs_c) = (parity.clone(), runs.clone());
		let _effect = Effect::new(move || {
			let _ = parity_c.get();
			*runs_c.borrow_mut() += 1;
		});

		count.set(3);
		assert_eq!(*runs.borrow(), 1);

		count.set(4);
		assert_eq!(*runs.borrow(), 2);
	}

	#[test]
	#[serial]
	fn test_effects_from_first_run_are_owned() {
		let count = Signal::new(1);
		let created: Rc<RefCell<Vec<Effect>>> = Rc::default();
		let (count_c, created_c) = (count.clone(), created.clone());
		let _memo = Memo::new(move || {
			let value = count_c.get();
			let inner = Effect::new(|| ());
			created_c.borrow_mut().push(inner);
			value
		});

		count.set(2);

		let created = created.borrow();
		assert_eq!(created.len(), 2);
		assert!(created[0].is_disposed());
		assert!(!created[1].is_disposed());
	}

	#[test]
	#[serial]
	fn test_memo_dispose_freezes_value() {
		let count = Signal::new(1);
		let count_c = count.clone();
		let memo = Memo::new(move || count_c.get() + 1);

		memo.dispose();
		count.set(10);
		assert_eq!(memo.get(), 2);
	}
}
