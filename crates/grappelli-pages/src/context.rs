//! Scoped context values.
//!
//! A [`ContextChain`] is a persistent, parent-linked list of maps. Components
//! push a new map when instantiated; writes go to the innermost map only and
//! lookups search from innermost to outermost. Pushing never alters the chain
//! it was pushed from, so siblings never see each other's values.

use core::cell::RefCell;
use core::fmt;

use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

struct ContextFrame {
	values: RefCell<IndexMap<String, Value>>,
	parent: Option<Rc<ContextFrame>>,
}

/// Handle to the innermost context map and, through it, its ancestors.
#[derive(Clone, Default)]
pub struct ContextChain(Option<Rc<ContextFrame>>);

impl ContextChain {
	/// A chain with no maps.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a chain with a fresh, empty innermost map above this one.
	pub fn push_new(&self) -> Self {
		Self(Some(Rc::new(ContextFrame {
			values: RefCell::new(IndexMap::new()),
			parent: self.0.clone(),
		})))
	}

	/// Writes `key` into the innermost map. Returns `false` if there is none.
	pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
		match &self.0 {
			Some(frame) => {
				frame.values.borrow_mut().insert(key.into(), value.into());
				true
			}
			None => false,
		}
	}

	/// Looks `key` up from the innermost map outward.
	pub fn get(&self, key: &str) -> Option<Value> {
		let mut frame = self.0.as_ref();
		while let Some(current) = frame {
			if let Some(value) = current.values.borrow().get(key) {
				return Some(value.clone());
			}
			frame = current.parent.as_ref();
		}
		None
	}

	/// Number of maps in the chain.
	pub fn depth(&self) -> usize {
		let mut depth = 0;
		let mut frame = self.0.as_ref();
		while let Some(current) = frame {
			depth += 1;
			frame = current.parent.as_ref();
		}
		depth
	}
}

impl fmt::Debug for ContextChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContextChain")
			.field("depth", &self.depth())
			.finish()
	}
}

/// Context handed to mount callbacks.
///
/// Bound to the chain that was active when the callback was registered, so a
/// deferred callback resolves context against its own component's ancestors
/// no matter what else was instantiated before the flush.
#[derive(Debug, Clone)]
pub struct MountContext {
	chain: ContextChain,
}

impl MountContext {
	pub(crate) fn new(chain: ContextChain) -> Self {
		Self { chain }
	}

	/// Looks up a context value; `undefined` when absent.
	pub fn get_context(&self, key: &str) -> Value {
		self.chain.get(key).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_inner_shadows_outer() {
		let outer = ContextChain::new().push_new();
		outer.set("theme", "dark");
		let inner = outer.push_new();
		inner.set("theme", "light");

		assert_eq!(inner.get("theme"), Some(Value::from("light")));
		assert_eq!(outer.get("theme"), Some(Value::from("dark")));
	}

	#[rstest]
	fn test_siblings_are_isolated() {
		let parent = ContextChain::new().push_new();
		let first = parent.push_new();
		let second = parent.push_new();
		first.set("k", 1);

		assert_eq!(first.get("k"), Some(Value::from(1)));
		assert_eq!(second.get("k"), None);
	}

	#[rstest]
	fn test_late_writes_to_ancestor_are_visible() {
		let parent = ContextChain::new().push_new();
		let child = parent.push_new();
		parent.set("k", "late");
		assert_eq!(child.get("k"), Some(Value::from("late")));
	}

	#[rstest]
	fn test_empty_chain_rejects_writes() {
		let chain = ContextChain::new();
		assert!(!chain.set("k", 1));
		assert_eq!(chain.depth(), 0);
	}
}
