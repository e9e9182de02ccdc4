//! Ordered name→value context passed to template instantiation.

use core::fmt;

use std::rc::Rc;

use crate::value::Value;

/// The context object a template is instantiated with.
///
/// Keys are ordered; compiled expressions address values by position, so the
/// key list (not just the key set) determines which cached closure is used.
#[derive(Clone, Default)]
pub struct Scope {
	keys: Rc<[Rc<str>]>,
	values: Rc<[Value]>,
}

impl Scope {
	/// Creates an empty scope.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a scope from pairs. Later duplicates replace earlier ones.
	pub fn from_pairs<K, I>(pairs: I) -> Self
	where
		K: AsRef<str>,
		I: IntoIterator<Item = (K, Value)>,
	{
		pairs
			.into_iter()
			.fold(Scope::new(), |scope, (key, value)| scope.with(key.as_ref(), value))
	}

	/// Returns a copy with `name` bound to `value`.
	///
	/// An existing binding keeps its position; a new one is appended.
	pub fn with(&self, name: &str, value: impl Into<Value>) -> Self {
		let value = value.into();
		let mut keys: Vec<Rc<str>> = self.keys.to_vec();
		let mut values: Vec<Value> = self.values.to_vec();
		match keys.iter().position(|key| &**key == name) {
			Some(index) => values[index] = value,
			None => {
				keys.push(Rc::from(name));
				values.push(value);
			}
		}
		Self {
			keys: keys.into(),
			values: values.into(),
		}
	}

	/// Returns a copy extended with every binding of `other`.
	pub fn merged(&self, other: &Scope) -> Self {
		other
			.iter()
			.fold(self.clone(), |scope, (key, value)| scope.with(key, value.clone()))
	}

	/// Value bound to `name`.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.keys
			.iter()
			.position(|key| &**key == name)
			.map(|index| &self.values[index])
	}

	/// Key names in binding order.
	pub fn keys(&self) -> &[Rc<str>] {
		&self.keys
	}

	/// Values in binding order.
	pub fn values(&self) -> &[Value] {
		&self.values
	}

	/// Number of bindings.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the scope has no bindings.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Iterates bindings in order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.keys.iter().map(|key| &**key).zip(self.values.iter())
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<K: AsRef<str>> FromIterator<(K, Value)> for Scope {
	fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
		Scope::from_pairs(iter)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_with_replaces_in_place() {
		let scope = Scope::new().with("a", 1).with("b", 2).with("a", 3);
		let keys: Vec<&str> = scope.keys().iter().map(|k| &**k).collect();
		assert_eq!(keys, vec!["a", "b"]);
		assert_eq!(scope.get("a"), Some(&Value::from(3)));
	}

	#[rstest]
	fn test_with_does_not_mutate_original() {
		let base = Scope::new().with("a", 1);
		let _extended = base.with("b", 2);
		assert_eq!(base.len(), 1);
	}

	#[rstest]
	fn test_merged_overrides() {
		let parent = Scope::from_pairs([("a", Value::from(1)), ("b", Value::from(2))]);
		let child = Scope::from_pairs([("b", Value::from(20)), ("c", Value::from(30))]);
		let merged = parent.merged(&child);
		assert_eq!(merged.get("b"), Some(&Value::from(20)));
		assert_eq!(merged.len(), 3);
	}
}
