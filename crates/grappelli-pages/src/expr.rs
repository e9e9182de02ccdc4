//! Binding expression language.
//!
//! Template bindings such as `{{ count() + 1 }}` or
//! `onclick="{{ () => count.set(count() + 1) }}"` are compiled into closures
//! over an explicit, ordered list of context keys. Identifiers are resolved at
//! compile time; an identifier that is neither a context key, an arrow
//! parameter, nor a builtin literal is a configuration error.
//!
//! Property and index assignments (`todo.done = !todo.done`) write through
//! the reactive objects and arrays in [`crate::store`].
//!
//! Compiled expressions are memoized per (expression text, key list) in a
//! thread-local cache. The cache is append-only: entries are never evicted. A
//! warning is logged once when it grows past the configured threshold.

mod compile;
mod lexer;
mod parser;

use core::cell::{Cell, RefCell};
use core::fmt;

use std::collections::HashMap;
use std::rc::Rc;

use compile::{Compiled, Env, Resolver};

use crate::error::{EvalError, EvalResult, ExprError};
use crate::scope::Scope;
use crate::value::Value;
use crate::warn_log;

/// An expression compiled against a fixed key list.
#[derive(Clone)]
pub struct CompiledExpr {
	source: Rc<str>,
	keys: Rc<[Rc<str>]>,
	eval: Compiled,
}

impl CompiledExpr {
	/// Compiles `source` against `keys` without consulting the cache.
	///
	/// # Errors
	///
	/// Returns [`ExprError`] on syntax errors and unknown identifiers.
	pub fn compile(source: &str, keys: &[Rc<str>]) -> Result<Self, ExprError> {
		let tree = parser::parse(source)?;
		let mut resolver = Resolver::new(keys);
		let eval = compile::lower(&tree, &mut resolver)?;
		Ok(Self {
			source: Rc::from(source.trim()),
			keys: keys.into(),
			eval,
		})
	}

	/// Evaluates against a scope with the same key list.
	///
	/// Signals read during evaluation are tracked by the running effect.
	pub fn evaluate(&self, scope: &Scope) -> EvalResult<Value> {
		if !self.matches(scope.keys()) {
			return Err(EvalError::Type(format!(
				"`{}` was compiled for keys [{}] but evaluated with [{}]",
				self.source,
				self.keys.join(", "),
				scope.keys().join(", ")
			)));
		}
		(self.eval)(&Env::root(scope.values().into()))
	}

	fn matches(&self, keys: &[Rc<str>]) -> bool {
		self.keys.len() == keys.len() && self.keys.iter().zip(keys).all(|(a, b)| a == b)
	}

	/// Trimmed expression text.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Key list the expression was compiled for.
	pub fn keys(&self) -> &[Rc<str>] {
		&self.keys
	}
}

impl fmt::Debug for CompiledExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompiledExpr")
			.field("source", &self.source)
			.field("keys", &self.keys)
			.finish()
	}
}

struct ExpressionCache {
	entries: RefCell<HashMap<String, CompiledExpr>>,
	warn_threshold: Cell<usize>,
	warned: Cell<bool>,
}

thread_local! {
	static CACHE: ExpressionCache = ExpressionCache {
		entries: RefCell::new(HashMap::new()),
		warn_threshold: Cell::new(4096),
		warned: Cell::new(false),
	};
}

fn cache_key(source: &str, keys: &[Rc<str>]) -> String {
	let mut key = String::with_capacity(source.len() + keys.len() * 8);
	key.push_str(source.trim());
	key.push('\u{0}');
	for (i, name) in keys.iter().enumerate() {
		if i > 0 {
			key.push(',');
		}
		key.push_str(name);
	}
	key
}

/// Compiles `source` against `keys`, reusing a cached closure when the same
/// text was compiled for the same key list before.
///
/// # Errors
///
/// Returns [`ExprError`] on syntax errors and unknown identifiers. Failures
/// are not cached.
pub fn compile_cached(source: &str, keys: &[Rc<str>]) -> Result<CompiledExpr, ExprError> {
	let key = cache_key(source, keys);
	if let Some(hit) = CACHE.with(|cache| cache.entries.borrow().get(&key).cloned()) {
		return Ok(hit);
	}

	let compiled = CompiledExpr::compile(source, keys)?;
	CACHE.with(|cache| {
		let len = {
			let mut entries = cache.entries.borrow_mut();
			entries.insert(key, compiled.clone());
			entries.len()
		};
		if len > cache.warn_threshold.get() && !cache.warned.replace(true) {
			warn_log!(
				entries = len,
				threshold = cache.warn_threshold.get(),
				"expression cache grew past its warning threshold; entries are never evicted"
			);
		}
	});
	Ok(compiled)
}

/// Checks that `source` parses, without resolving identifiers.
///
/// # Errors
///
/// Returns [`ExprError`] on syntax errors.
pub fn validate(source: &str) -> Result<(), ExprError> {
	parser::parse(source).map(|_| ())
}

/// Sets the entry count above which the cache logs its one-time warning.
pub fn set_cache_warn_threshold(threshold: usize) {
	CACHE.with(|cache| cache.warn_threshold.set(threshold));
}

/// Number of cached expressions on this thread.
pub fn cache_len() -> usize {
	CACHE.with(|cache| cache.entries.borrow().len())
}

/// Empties the cache and re-arms the growth warning.
pub fn clear_cache() {
	CACHE.with(|cache| {
		cache.entries.borrow_mut().clear();
		cache.warned.set(false);
	});
}
