//! Signal - Fine-grained Reactive Primitive
//!
//! `Signal<T>` is the core reactive primitive that holds a value and automatically
//! tracks dependencies when accessed.
//!
//! ## Key Features
//!
//! - **Automatic Dependency Tracking**: When `get()` is called inside an Effect or Memo,
//!   the dependency is automatically recorded.
//! - **Synchronous Notification**: `set()` and `update()` re-run every dependent Effect
//!   before returning.
//! - **Equality Short-circuit**: `set()` with a value equal to the current one is a no-op.
//! - **Lightweight**: `Signal<T>` is a NodeId plus a shared cell, cheap to clone.
//!
//! ## Example
//!
//! ```ignore
//! use grappelli_reactive::Signal;
//!
//! let count = Signal::new(0);
//! assert_eq!(count.get(), 0);
//!
//! count.set(42);
//! assert_eq!(count.get(), 42);
//!
//! count.update(|n| *n += 1);
//! assert_eq!(count.get(), 43);
//! ```

use core::cell::RefCell;
use core::fmt;

use std::rc::Rc;

use crate::runtime::{NodeId, try_with_runtime, with_runtime};

/// A reactive signal that holds a value and tracks dependencies
///
/// ## Cloning
///
/// `Signal<T>` implements `Clone` and shares the value via `Rc<RefCell<T>>`.
/// All clones of the same Signal share the same underlying value and node.
pub struct Signal<T: 'static> {
	/// Unique identifier for this signal
	id: NodeId,
	/// The actual value, shared via reference counting
	value: Rc<RefCell<T>>,
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			value: self.value.clone(),
		}
	}
}

impl<T: 'static> Signal<T> {
	/// Create a new Signal with the given initial value
	///
	/// # Example
	///
	/// ```ignore
	/// let count = Signal::new(0);
	/// assert_eq!(count.get(), 0);
	/// ```
	pub fn new(value: T) -> Self {
		Self {
			id: NodeId::new(),
			value: Rc::new(RefCell::new(value)),
		}
	}

	/// Get the current value of the signal
	///
	/// This automatically tracks the dependency if called from within an Effect or Memo.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.track();
		self.get_untracked()
	}

	/// Get the current value without tracking dependencies
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Borrow the current value, tracking the dependency
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.track();
		f(&self.value.borrow())
	}

	/// Borrow the current value without tracking the dependency
	pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.value.borrow())
	}

	/// Set the signal to a new value
	///
	/// Writing a value equal to the current one does nothing. Otherwise every
	/// dependent Effect re-runs once before this returns.
	///
	/// # Example
	///
	/// ```ignore
	/// let count = Signal::new(0);
	/// count.set(42);
	/// assert_eq!(count.get(), 42);
	/// ```
	pub fn set(&self, value: T)
	where
		T: PartialEq,
	{
		if *self.value.borrow() == value {
			return;
		}
		*self.value.borrow_mut() = value;
		self.notify();
	}

	/// Update the signal's value using a function
	///
	/// Always notifies dependents, since the closure may mutate in place.
	///
	/// # Example
	///
	/// ```ignore
	/// let count = Signal::new(0);
	/// count.update(|n| *n += 1);
	/// assert_eq!(count.get(), 1);
	/// ```
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		f(&mut *self.value.borrow_mut());
		self.notify();
	}

	/// Get the NodeId of this signal
	///
	/// This is mainly for internal use by the runtime and tests.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Whether two handles refer to the same signal.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.value, &other.value)
	}

	fn track(&self) {
		with_runtime(|rt| rt.track_dependency(self.id));
	}

	fn notify(&self) {
		with_runtime(|rt| rt.notify_signal_change(self.id));
	}
}

impl<T: 'static> Drop for Signal<T> {
	fn drop(&mut self) {
		// Only the last clone removes the node from the graph
		if Rc::strong_count(&self.value) == 1 {
			let _ = try_with_runtime(|rt| rt.remove_node(self.id));
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.finish()
	}
}
