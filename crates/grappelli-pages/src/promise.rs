//! Single-assignment asynchronous values consumed by await blocks.

use core::cell::RefCell;
use core::fmt;

use std::rc::Rc;

use crate::value::Value;

/// Outcome of a settled [`Promise`].
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
	/// Fulfilled with a value
	Resolved(Value),
	/// Rejected with a reason
	Rejected(Value),
}

type SettleCallback = Box<dyn FnOnce(&Settlement)>;

struct PromiseInner {
	settlement: RefCell<Option<Settlement>>,
	callbacks: RefCell<Vec<SettleCallback>>,
}

/// A value that becomes available later.
///
/// The first call to [`Promise::resolve`] or [`Promise::reject`] settles it;
/// later calls are ignored. Callbacks run synchronously at settlement, in
/// registration order.
#[derive(Clone)]
pub struct Promise(Rc<PromiseInner>);

impl Promise {
	/// Creates an unsettled promise.
	pub fn pending() -> Self {
		Self(Rc::new(PromiseInner {
			settlement: RefCell::new(None),
			callbacks: RefCell::new(Vec::new()),
		}))
	}

	/// Creates a promise already resolved with `value`.
	pub fn resolved(value: impl Into<Value>) -> Self {
		let promise = Self::pending();
		promise.resolve(value);
		promise
	}

	/// Creates a promise already rejected with `reason`.
	pub fn rejected(reason: impl Into<Value>) -> Self {
		let promise = Self::pending();
		promise.reject(reason);
		promise
	}

	/// Resolves the promise. Returns `false` if it was already settled.
	pub fn resolve(&self, value: impl Into<Value>) -> bool {
		self.settle(Settlement::Resolved(value.into()))
	}

	/// Rejects the promise. Returns `false` if it was already settled.
	pub fn reject(&self, reason: impl Into<Value>) -> bool {
		self.settle(Settlement::Rejected(reason.into()))
	}

	fn settle(&self, settlement: Settlement) -> bool {
		{
			let mut slot = self.0.settlement.borrow_mut();
			if slot.is_some() {
				return false;
			}
			*slot = Some(settlement.clone());
		}
		let callbacks = core::mem::take(&mut *self.0.callbacks.borrow_mut());
		for callback in callbacks {
			callback(&settlement);
		}
		true
	}

	/// Settlement, if any.
	pub fn settlement(&self) -> Option<Settlement> {
		self.0.settlement.borrow().clone()
	}

	/// Whether the promise is still unsettled.
	pub fn is_pending(&self) -> bool {
		self.0.settlement.borrow().is_none()
	}

	/// Runs `callback` on settlement, or immediately if already settled.
	pub fn on_settle<F>(&self, callback: F)
	where
		F: FnOnce(&Settlement) + 'static,
	{
		let settled = self.settlement();
		match settled {
			Some(settlement) => callback(&settlement),
			None => self.0.callbacks.borrow_mut().push(Box::new(callback)),
		}
	}

	/// Whether both handles refer to the same promise.
	pub fn ptr_eq(&self, other: &Promise) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn key(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}
}

impl fmt::Debug for Promise {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.0.settlement.borrow() {
			None => f.write_str("Promise(<pending>)"),
			Some(Settlement::Resolved(value)) => write!(f, "Promise(resolved: {value:?})"),
			Some(Settlement::Rejected(reason)) => write!(f, "Promise(rejected: {reason:?})"),
		}
	}
}
