//! Dynamic values flowing through template contexts.
//!
//! A template context maps names to [`Value`]s. Reactive fields are
//! [`Value::Signal`]s or read-only accessor functions; expressions call them to
//! read (and track) the current value.
//!
//! Equality is strict identity, matching how signals decide whether a write is
//! a change: primitives compare by value, everything else by reference.
//!
//! Objects and arrays are deep reactive containers (see [`crate::store`]):
//! `user.name = "Grace"` re-runs only the bindings that read `user.name`.

use core::cmp::Ordering;
use core::fmt;

use std::rc::Rc;

use grappelli_reactive::{NodeId, Signal};
use indexmap::IndexMap;

use crate::dom::Node;
use crate::error::{EvalError, EvalResult};
use crate::events::Event;
use crate::promise::Promise;
use crate::store::{ReactiveArray, ReactiveObject};

/// Signature of native functions callable from expressions.
pub type NativeFn = dyn Fn(&[Value]) -> EvalResult<Value>;

/// A callable value.
#[derive(Clone)]
pub struct Function {
	name: Rc<str>,
	call: Rc<NativeFn>,
}

impl Function {
	/// Wraps a closure.
	pub fn new<F>(name: impl Into<Rc<str>>, f: F) -> Self
	where
		F: Fn(&[Value]) -> EvalResult<Value> + 'static,
	{
		Self {
			name: name.into(),
			call: Rc::new(f),
		}
	}

	/// Calls the function.
	pub fn call(&self, args: &[Value]) -> EvalResult<Value> {
		(self.call)(args)
	}

	/// Name used in diagnostics.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether both handles wrap the same closure.
	pub fn ptr_eq(&self, other: &Function) -> bool {
		Rc::ptr_eq(&self.call, &other.call)
	}

	fn key(&self) -> usize {
		Rc::as_ptr(&self.call) as *const () as usize
	}
}

impl fmt::Debug for Function {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[Function {}]", self.name)
	}
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
	/// Absent value
	#[default]
	Undefined,
	/// Explicit null
	Null,
	/// Boolean
	Bool(bool),
	/// IEEE-754 number
	Number(f64),
	/// Immutable string
	Str(Rc<str>),
	/// Reactive array, shared by reference
	Array(Rc<ReactiveArray>),
	/// Reactive ordered object, shared by reference
	Object(Rc<ReactiveObject>),
	/// Callable
	Function(Function),
	/// Reactive cell; calling it reads, `.set(v)` writes
	Signal(Signal<Value>),
	/// Asynchronous value
	Promise(Promise),
	/// DOM node
	Node(Node),
	/// DOM event
	Event(Event),
}

/// Hashable identity of a value, used for each-block keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAtom {
	/// `undefined`
	Undefined,
	/// `null`
	Null,
	/// Boolean
	Bool(bool),
	/// Number, by bit pattern with `-0` folded into `0`
	Number(u64),
	/// String contents
	Str(Rc<str>),
	/// Reference identity
	Ref(usize),
	/// Signal identity
	Signal(NodeId),
	/// Several fields
	Composite(Vec<KeyAtom>),
}

impl Value {
	/// Builds an object from key/value pairs.
	pub fn object<K, I>(entries: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		Value::from(
			entries
				.into_iter()
				.map(|(k, v)| (k.into(), v))
				.collect::<IndexMap<String, Value>>(),
		)
	}

	/// Builds an array.
	pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
		Value::from(items.into_iter().collect::<Vec<_>>())
	}

	/// Wraps a closure as a function value.
	pub fn function<F>(name: &str, f: F) -> Self
	where
		F: Fn(&[Value]) -> EvalResult<Value> + 'static,
	{
		Value::Function(Function::new(name, f))
	}

	/// Read-only accessor over a signal: calling it reads with tracking.
	pub fn accessor(name: &str, signal: Signal<Value>) -> Self {
		Value::function(name, move |_| Ok(signal.get()))
	}

	/// Converts a JSON document.
	pub fn from_json(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Value::from(s),
			serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from_json)),
			serde_json::Value::Object(map) => {
				Value::object(map.into_iter().map(|(k, v)| (k, Value::from_json(v))))
			}
		}
	}

	/// Name of the variant as reported in diagnostics.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Undefined => "undefined",
			Value::Null => "null",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::Str(_) => "string",
			Value::Array(_) => "array",
			Value::Object(_) => "object",
			Value::Function(_) => "function",
			Value::Signal(_) => "signal",
			Value::Promise(_) => "promise",
			Value::Node(_) => "node",
			Value::Event(_) => "event",
		}
	}

	/// Whether the value is `undefined` or `null`.
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Undefined | Value::Null)
	}

	/// Truthiness.
	///
	/// Signals are truthy as handles; call them to test their contents.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Undefined | Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::Str(s) => !s.is_empty(),
			_ => true,
		}
	}

	/// Numeric conversion.
	pub fn to_number(&self) -> f64 {
		match self {
			Value::Undefined => f64::NAN,
			Value::Null => 0.0,
			Value::Bool(b) => f64::from(u8::from(*b)),
			Value::Number(n) => *n,
			Value::Str(s) => {
				let trimmed = s.trim();
				if trimmed.is_empty() {
					0.0
				} else {
					trimmed.parse().unwrap_or(f64::NAN)
				}
			}
			Value::Signal(signal) => signal.with(Value::to_number),
			_ => f64::NAN,
		}
	}

	/// String payload, if this is a string.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}

	/// The array, if this is one.
	pub fn as_array(&self) -> Option<&ReactiveArray> {
		match self {
			Value::Array(items) => Some(items),
			_ => None,
		}
	}

	/// The object, if this is one.
	pub fn as_object(&self) -> Option<&ReactiveObject> {
		match self {
			Value::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Reads through a signal (with tracking); other values are returned as is.
	pub fn resolve(&self) -> Value {
		match self {
			Value::Signal(signal) => signal.get(),
			other => other.clone(),
		}
	}

	/// Calls a function or reads/writes a signal.
	pub fn call(&self, args: &[Value]) -> EvalResult<Value> {
		match self {
			Value::Function(function) => function.call(args),
			Value::Signal(signal) => match args.first() {
				None => Ok(signal.get()),
				Some(value) => {
					signal.set(value.clone());
					Ok(Value::Undefined)
				}
			},
			other => Err(EvalError::NotCallable(other.type_name().to_string())),
		}
	}

	/// Loose equality: `null == undefined`, numbers compare with numeric strings.
	pub fn loose_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(a, b) if a.is_nullish() && b.is_nullish() => true,
			(a, b) if a.is_nullish() || b.is_nullish() => false,
			(Value::Number(_) | Value::Bool(_), Value::Str(_) | Value::Bool(_))
			| (Value::Str(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
				self.to_number() == other.to_number()
			}
			_ => self == other,
		}
	}

	/// Relational comparison; strings compare lexically, the rest numerically.
	pub fn compare(&self, other: &Value) -> Option<Ordering> {
		match (self, other) {
			(Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
			_ => self.to_number().partial_cmp(&other.to_number()),
		}
	}

	/// `+` operator: string concatenation if either side is a string.
	pub fn add(&self, other: &Value) -> Value {
		let stringy = |v: &Value| matches!(v, Value::Str(_) | Value::Array(_) | Value::Object(_));
		if stringy(self) || stringy(other) {
			Value::from(format!("{self}{other}"))
		} else {
			Value::Number(self.to_number() + other.to_number())
		}
	}

	/// Identity key for keyed iteration.
	pub fn identity_key(&self) -> KeyAtom {
		match self {
			Value::Undefined => KeyAtom::Undefined,
			Value::Null => KeyAtom::Null,
			Value::Bool(b) => KeyAtom::Bool(*b),
			Value::Number(n) => KeyAtom::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
			Value::Str(s) => KeyAtom::Str(s.clone()),
			Value::Array(items) => KeyAtom::Ref(Rc::as_ptr(items) as usize),
			Value::Object(map) => KeyAtom::Ref(Rc::as_ptr(map) as usize),
			Value::Function(function) => KeyAtom::Ref(function.key()),
			Value::Signal(signal) => KeyAtom::Signal(signal.id()),
			Value::Promise(promise) => KeyAtom::Ref(promise.key()),
			Value::Node(node) => KeyAtom::Ref(node.key()),
			Value::Event(event) => KeyAtom::Ref(event.key()),
		}
	}

	/// Property access (`value.name`).
	///
	/// # Errors
	///
	/// [`EvalError::NoProperty`] on `undefined` or `null`.
	pub fn get_member(&self, name: &str) -> EvalResult<Value> {
		match self {
			Value::Undefined | Value::Null => Err(EvalError::NoProperty {
				property: name.to_string(),
				target: self.type_name().to_string(),
			}),
			Value::Str(s) => Ok(match name {
				"length" => Value::from(s.chars().count()),
				_ => string_method(s.clone(), name).unwrap_or_default(),
			}),
			Value::Array(items) => Ok(match name {
				"length" => Value::from(items.len()),
				_ => match name.parse::<usize>() {
					Ok(index) => items.get(index),
					Err(_) => array_method(items.clone(), name).unwrap_or_default(),
				},
			}),
			Value::Object(object) => Ok(object.get(name)),
			Value::Number(n) => Ok(number_method(*n, name).unwrap_or_default()),
			Value::Signal(signal) => Ok(signal_method(signal.clone(), name).unwrap_or_default()),
			Value::Function(function) => Ok(match name {
				"name" => Value::from(function.name()),
				_ => Value::Undefined,
			}),
			Value::Node(node) => Ok(node_member(node, name)),
			Value::Event(event) => Ok(event.member(name)),
			Value::Bool(_) | Value::Promise(_) => Ok(Value::Undefined),
		}
	}

	/// Index access (`value[index]`).
	pub fn get_index(&self, index: &Value) -> EvalResult<Value> {
		match (self, index) {
			(Value::Array(items), Value::Number(n)) => {
				Ok(as_index(*n).map(|i| items.get(i)).unwrap_or_default())
			}
			(Value::Str(s), Value::Number(n)) => Ok(as_index(*n)
				.and_then(|i| s.chars().nth(i))
				.map(|c| Value::from(c.to_string()))
				.unwrap_or_default()),
			_ => self.get_member(&index.to_string()),
		}
	}

	/// Property assignment (`value.name = v`).
	///
	/// # Errors
	///
	/// [`EvalError::ReadOnlyProperty`] unless the target is an object, or an
	/// array written at an index.
	pub fn set_member(&self, name: &str, value: Value) -> EvalResult<()> {
		match self {
			Value::Object(object) => {
				object.set(name, value);
				Ok(())
			}
			Value::Array(items) => match name.parse::<usize>() {
				Ok(index) => {
					items.set(index, value);
					Ok(())
				}
				Err(_) => Err(self.read_only(name)),
			},
			_ => Err(self.read_only(name)),
		}
	}

	/// Index assignment (`value[index] = v`).
	pub fn set_index(&self, index: &Value, value: Value) -> EvalResult<()> {
		match (self, index) {
			(Value::Array(items), Value::Number(n)) => match as_index(*n) {
				Some(i) => {
					items.set(i, value);
					Ok(())
				}
				None => Err(self.read_only(&index.to_string())),
			},
			_ => self.set_member(&index.to_string(), value),
		}
	}

	fn read_only(&self, property: &str) -> EvalError {
		EvalError::ReadOnlyProperty {
			property: property.to_string(),
			target: self.type_name().to_string(),
		}
	}
}

fn as_index(n: f64) -> Option<usize> {
	(n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn arg(args: &[Value], index: usize) -> Value {
	args.get(index).cloned().unwrap_or_default()
}

fn string_method(s: Rc<str>, name: &str) -> Option<Value> {
	let f: fn(&str, &[Value]) -> Value = match name {
		"toUpperCase" => |s, _| Value::from(s.to_uppercase()),
		"toLowerCase" => |s, _| Value::from(s.to_lowercase()),
		"trim" => |s, _| Value::from(s.trim()),
		"includes" => |s, args| Value::Bool(s.contains(&*arg(args, 0).to_string())),
		"startsWith" => |s, args| Value::Bool(s.starts_with(&*arg(args, 0).to_string())),
		"endsWith" => |s, args| Value::Bool(s.ends_with(&*arg(args, 0).to_string())),
		"split" => |s, args| {
			let separator = arg(args, 0).to_string();
			Value::array(s.split(separator.as_str()).map(Value::from))
		},
		_ => return None,
	};
	Some(Value::function(name, move |args| Ok(f(&s, args))))
}

fn array_method(array: Rc<ReactiveArray>, name: &str) -> Option<Value> {
	let method = name.to_string();
	let call = move |args: &[Value]| -> EvalResult<Value> {
		match method.as_str() {
			"push" => Ok(Value::from(array.push(args.iter().cloned()))),
			"pop" => Ok(array.pop().unwrap_or_default()),
			"splice" => {
				let len = array.to_vec_untracked().len() as f64;
				let start = arg(args, 0).to_number();
				let start = if start.is_nan() {
					0.0
				} else if start < 0.0 {
					(len + start).max(0.0)
				} else {
					start.min(len)
				};
				let delete = match args.get(1) {
					None => len - start,
					Some(count) => count.to_number().clamp(0.0, len - start),
				};
				let delete = if delete.is_nan() { 0.0 } else { delete };
				let insert = args.iter().skip(2).cloned().collect();
				Ok(Value::from(array.splice(start as usize, delete as usize, insert)))
			}
			_ => read_method(&array.to_vec(), &method, args),
		}
	};
	matches!(
		name,
		"push" | "pop" | "splice" | "includes" | "indexOf" | "join" | "map" | "filter" | "concat" | "slice"
	)
	.then(|| Value::function(name, call))
}

fn read_method(items: &[Value], method: &str, args: &[Value]) -> EvalResult<Value> {
	match method {
		"includes" => {
			let needle = arg(args, 0);
			Ok(Value::Bool(items.iter().any(|item| *item == needle)))
		}
		"indexOf" => {
			let needle = arg(args, 0);
			let found = items.iter().position(|item| *item == needle);
			Ok(found.map_or(Value::Number(-1.0), Value::from))
		}
		"join" => {
			let separator = match arg(args, 0) {
				Value::Undefined => ",".to_string(),
				other => other.to_string(),
			};
			let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
			Ok(Value::from(parts.join(&separator)))
		}
		"map" => {
			let callback = arg(args, 0);
			let mapped = items
				.iter()
				.enumerate()
				.map(|(i, item)| callback.call(&[item.clone(), Value::from(i)]))
				.collect::<EvalResult<Vec<_>>>()?;
			Ok(Value::array(mapped))
		}
		"filter" => {
			let callback = arg(args, 0);
			let mut kept = Vec::new();
			for (i, item) in items.iter().enumerate() {
				if callback.call(&[item.clone(), Value::from(i)])?.is_truthy() {
					kept.push(item.clone());
				}
			}
			Ok(Value::array(kept))
		}
		"concat" => {
			let mut joined = items.to_vec();
			for extra in args {
				match extra {
					Value::Array(more) => joined.extend(more.to_vec()),
					other => joined.push(other.clone()),
				}
			}
			Ok(Value::array(joined))
		}
		"slice" => {
			let len = items.len() as f64;
			let clamp = |v: Value, default: f64| {
				let n = if v.is_nullish() { default } else { v.to_number() };
				let n = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
				n as usize
			};
			let start = clamp(arg(args, 0), 0.0);
			let end = clamp(arg(args, 1), len);
			Ok(Value::array(items.get(start..end.max(start)).unwrap_or(&[]).iter().cloned()))
		}
		other => Err(EvalError::NotCallable(format!("array.{other}"))),
	}
}

fn number_method(n: f64, name: &str) -> Option<Value> {
	match name {
		"toFixed" => Some(Value::function(name, move |args| {
			let digits = arg(args, 0).to_number();
			let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 20.0) as usize };
			Ok(Value::from(format!("{n:.digits$}")))
		})),
		_ => None,
	}
}

fn signal_method(signal: Signal<Value>, name: &str) -> Option<Value> {
	match name {
		"get" => Some(Value::function(name, move |_| Ok(signal.get()))),
		"set" => Some(Value::function(name, move |args| {
			signal.set(arg(args, 0));
			Ok(Value::Undefined)
		})),
		"update" => Some(Value::function(name, move |args| {
			let next = arg(args, 0).call(&[signal.get_untracked()])?;
			signal.set(next);
			Ok(Value::Undefined)
		})),
		_ => None,
	}
}

fn node_member(node: &Node, name: &str) -> Value {
	match name {
		"value" | "checked" => node.property(name).unwrap_or_default(),
		"textContent" => Value::from(node.text_content()),
		"tagName" => node
			.tag_name()
			.map(|tag| Value::from(tag.to_ascii_uppercase()))
			.unwrap_or_default(),
		"parentNode" => node.parent().map(Value::Node).unwrap_or(Value::Null),
		_ => node
			.property(name)
			.or_else(|| node.attribute(name).map(Value::from))
			.unwrap_or_default(),
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::Str(a), Value::Str(b)) => a == b,
			(Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
			(Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
			(Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
			(Value::Signal(a), Value::Signal(b)) => a.ptr_eq(b),
			(Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
			(Value::Node(a), Value::Node(b)) => a.ptr_eq(b),
			(Value::Event(a), Value::Event(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined | Value::Null => Ok(()),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Number(n) => write_number(f, *n),
			Value::Str(s) => f.write_str(s),
			Value::Array(items) => {
				for (i, item) in items.to_vec().iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					write!(f, "{item}")?;
				}
				Ok(())
			}
			Value::Object(_) => f.write_str("[object Object]"),
			Value::Function(function) => write!(f, "function {}()", function.name()),
			Value::Signal(signal) => signal.with(|value| write!(f, "{value}")),
			Value::Promise(_) => f.write_str("[object Promise]"),
			Value::Node(node) => f.write_str(&node.text_content()),
			Value::Event(event) => write!(f, "[object Event {}]", event.kind()),
		}
	}
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
	if n.is_nan() {
		f.write_str("NaN")
	} else if n.is_infinite() {
		f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
	} else if n.fract() == 0.0 && n.abs() < 1e15 {
		write!(f, "{}", n as i64)
	} else {
		write!(f, "{n}")
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("undefined"),
			Value::Null => f.write_str("null"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Number(n) => write_number(f, *n),
			Value::Str(s) => write!(f, "{s:?}"),
			Value::Array(items) => write!(f, "{items:?}"),
			Value::Object(object) => write!(f, "{object:?}"),
			Value::Function(function) => write!(f, "{function:?}"),
			Value::Signal(signal) => {
				signal.with_untracked(|value| write!(f, "Signal({value:?})"))
			}
			Value::Promise(promise) => write!(f, "{promise:?}"),
			Value::Node(node) => write!(f, "{node:?}"),
			Value::Event(event) => write!(f, "{event:?}"),
		}
	}
}

macro_rules! from_number {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Value {
				fn from(n: $ty) -> Self {
					Value::Number(n as f64)
				}
			}
		)*
	};
}

from_number!(u8, i32, i64, u32, u64, usize, f32, f64);

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::Str(Rc::from(s))
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::Str(Rc::from(s))
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::Array(Rc::new(ReactiveArray::new(items)))
	}
}

impl From<IndexMap<String, Value>> for Value {
	fn from(map: IndexMap<String, Value>) -> Self {
		Value::Object(Rc::new(ReactiveObject::new(map)))
	}
}

impl From<Function> for Value {
	fn from(function: Function) -> Self {
		Value::Function(function)
	}
}

impl From<Signal<Value>> for Value {
	fn from(signal: Signal<Value>) -> Self {
		Value::Signal(signal)
	}
}

impl From<Promise> for Value {
	fn from(promise: Promise) -> Self {
		Value::Promise(promise)
	}
}

impl From<Node> for Value {
	fn from(node: Node) -> Self {
		Value::Node(node)
	}
}

impl From<Event> for Value {
	fn from(event: Event) -> Self {
		Value::Event(event)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Value::Undefined, false)]
	#[case(Value::from(0), false)]
	#[case(Value::Number(f64::NAN), false)]
	#[case(Value::from(""), false)]
	#[case(Value::from("0"), true)]
	#[case(Value::array([]), true)]
	fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(value.is_truthy(), expected);
	}

	#[rstest]
	#[case(Value::from(3), "3")]
	#[case(Value::from(2.5), "2.5")]
	#[case(Value::Null, "")]
	#[case(Value::array([Value::from(1), Value::from("a")]), "1,a")]
	fn test_display(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(value.to_string(), expected);
	}

	#[rstest]
	fn test_equality_is_identity_for_compounds() {
		let a = Value::array([Value::from(1)]);
		let b = Value::array([Value::from(1)]);
		assert_ne!(a, b);
		assert_eq!(a, a.clone());
		assert_eq!(Value::from("x"), Value::from("x"));
	}

	#[rstest]
	fn test_loose_equality() {
		assert!(Value::Null.loose_eq(&Value::Undefined));
		assert!(Value::from(1).loose_eq(&Value::from("1")));
		assert!(!Value::Null.loose_eq(&Value::from(0)));
	}

	#[rstest]
	fn test_add_concatenates_strings() {
		assert_eq!(Value::from("a").add(&Value::from(1)), Value::from("a1"));
		assert_eq!(Value::from(1).add(&Value::from(2)), Value::from(3));
	}

	#[rstest]
	fn test_array_methods() {
		let items = Value::array([Value::from(1), Value::from(2), Value::from(3)]);
		let double = Value::function("double", |args| {
			Ok(Value::Number(args[0].to_number() * 2.0))
		});
		let mapped = items.get_member("map").unwrap().call(&[double]).unwrap();
		assert_eq!(mapped.to_string(), "2,4,6");

		let joined = items.get_member("join").unwrap().call(&[Value::from("-")]).unwrap();
		assert_eq!(joined, Value::from("1-2-3"));
		assert_eq!(items.get_member("length").unwrap(), Value::from(3));
	}

	#[rstest]
	fn test_signal_call_reads_and_writes() {
		let signal = Signal::new(Value::from(1));
		let value = Value::Signal(signal.clone());
		assert_eq!(value.call(&[]).unwrap(), Value::from(1));
		value.call(&[Value::from(5)]).unwrap();
		assert_eq!(signal.get_untracked(), Value::from(5));

		let increment = Value::function("inc", |args| Ok(args[0].add(&Value::from(1))));
		value.get_member("update").unwrap().call(&[increment]).unwrap();
		assert_eq!(signal.get_untracked(), Value::from(6));
	}

	#[rstest]
	fn test_member_of_undefined_fails() {
		assert!(matches!(
			Value::Undefined.get_member("x"),
			Err(EvalError::NoProperty { .. })
		));
	}

	#[rstest]
	fn test_from_json() {
		let value = Value::from_json(json!({"id": 1, "tags": ["a", "b"]}));
		assert_eq!(value.get_member("id").unwrap(), Value::from(1));
		assert_eq!(value.get_member("tags").unwrap().to_string(), "a,b");
	}

	#[rstest]
	fn test_identity_key_folds_negative_zero() {
		assert_eq!(Value::from(0.0).identity_key(), Value::from(-0.0).identity_key());
		assert_ne!(Value::from(1).identity_key(), Value::from("1").identity_key());
	}

	#[rstest]
	fn test_string_split() {
		let parts = Value::from("a,b,,c").get_member("split").unwrap().call(&[Value::from(",")]).unwrap();
		assert_eq!(parts.get_member("length").unwrap(), Value::from(4));
		assert_eq!(parts.get_index(&Value::from(3)).unwrap(), Value::from("c"));
	}

	#[rstest]
	fn test_array_mutation_methods() {
		let items = Value::array([Value::from(1), Value::from(2), Value::from(3)]);
		let pushed = items.get_member("push").unwrap().call(&[Value::from(4)]).unwrap();
		assert_eq!(pushed, Value::from(4));

		let removed = items
			.get_member("splice")
			.unwrap()
			.call(&[Value::from(-3), Value::from(2), Value::from("x")])
			.unwrap();
		assert_eq!(removed.to_string(), "2,3");
		assert_eq!(items.to_string(), "1,x,4");
		assert_eq!(items.get_member("pop").unwrap().call(&[]).unwrap(), Value::from(4));
		assert_eq!(items.to_string(), "1,x");
	}

	#[rstest]
	fn test_assignment_targets() {
		let user = Value::object([("name", Value::from("Ada"))]);
		user.set_member("name", Value::from("Grace")).unwrap();
		user.set_member("age", Value::from(36)).unwrap();
		assert_eq!(user.get_member("name").unwrap(), Value::from("Grace"));
		assert_eq!(user.as_object().unwrap().keys(), ["name", "age"]);

		let list = Value::array([Value::from("a")]);
		list.set_index(&Value::from(1), Value::from("b")).unwrap();
		assert_eq!(list.to_string(), "a,b");

		assert!(matches!(
			Value::from("text").set_member("x", Value::Null),
			Err(EvalError::ReadOnlyProperty { ref target, .. }) if target == "string"
		));
		assert!(list.set_index(&Value::from(-1), Value::Null).is_err());
	}

	#[rstest]
	fn test_to_fixed() {
		let fixed = Value::from(3.14159).get_member("toFixed").unwrap();
		assert_eq!(fixed.call(&[Value::from(2)]).unwrap(), Value::from("3.14"));
	}
}
