//! Event objects and delegated listener bookkeeping.
//!
//! Listeners are not attached to individual nodes. An [`EventDelegator`]
//! records one delegated listener per event name and a lookup table keyed by
//! node. Dispatch starts at the event target and walks up `parent` links until
//! it finds a node with handlers for the event, then calls those handlers.

use core::cell::{Cell, RefCell};
use core::fmt;

use std::collections::HashMap;
use std::rc::Rc;

use grappelli_reactive::Cleanup;
use indexmap::{IndexMap, IndexSet};

use crate::dom::Node;
use crate::value::{Function, Value};
use crate::{debug_log, error_log};

struct EventInner {
	kind: String,
	target: Node,
	current_target: RefCell<Option<Node>>,
	detail: RefCell<IndexMap<String, Value>>,
	default_prevented: Cell<bool>,
}

/// A dispatched event.
#[derive(Clone)]
pub struct Event(Rc<EventInner>);

impl Event {
	/// Creates an event of `kind` targeting `target`.
	pub fn new(kind: impl Into<String>, target: &Node) -> Self {
		Self(Rc::new(EventInner {
			kind: kind.into(),
			target: target.clone(),
			current_target: RefCell::new(None),
			detail: RefCell::new(IndexMap::new()),
			default_prevented: Cell::new(false),
		}))
	}

	/// Attaches an extra field readable from handlers as `event.<key>`.
	pub fn with_detail(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.detail.borrow_mut().insert(key.into(), value.into());
		self
	}

	/// Event name (`click`, `input`, ...).
	pub fn kind(&self) -> &str {
		&self.0.kind
	}

	/// Node the event was dispatched at.
	pub fn target(&self) -> &Node {
		&self.0.target
	}

	/// Node whose handlers are running.
	pub fn current_target(&self) -> Option<Node> {
		self.0.current_target.borrow().clone()
	}

	/// Marks the default action as cancelled.
	pub fn prevent_default(&self) {
		self.0.default_prevented.set(true);
	}

	/// Whether [`Event::prevent_default`] was called.
	pub fn default_prevented(&self) -> bool {
		self.0.default_prevented.get()
	}

	/// Whether both handles refer to the same event.
	pub fn ptr_eq(&self, other: &Event) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn key(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}

	/// Property access from expressions.
	pub(crate) fn member(&self, name: &str) -> Value {
		match name {
			"type" => Value::from(self.kind()),
			"target" => Value::Node(self.target().clone()),
			"currentTarget" => self.current_target().map(Value::Node).unwrap_or(Value::Null),
			"defaultPrevented" => Value::Bool(self.default_prevented()),
			"preventDefault" => {
				let event = self.clone();
				Value::function(name, move |_| {
					event.prevent_default();
					Ok(Value::Undefined)
				})
			}
			_ => self.0.detail.borrow().get(name).cloned().unwrap_or_default(),
		}
	}
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("kind", &self.0.kind)
			.field("target", &self.0.target)
			.finish()
	}
}

/// Handlers registered on one node for one event name.
struct NodeHandlers {
	// Holding the node keeps its address from being reused while registered
	_node: Node,
	handlers: IndexMap<u64, Function>,
}

#[derive(Default)]
struct DelegatorInner {
	installed: RefCell<IndexSet<String>>,
	handlers: RefCell<HashMap<String, HashMap<usize, NodeHandlers>>>,
	next_id: Cell<u64>,
}

/// Delegated event listener table for one application root.
#[derive(Clone, Default)]
pub struct EventDelegator(Rc<DelegatorInner>);

impl EventDelegator {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for `event` on `node`.
	///
	/// The first registration for an event name installs the delegated
	/// listener for it; installed names are never removed. The returned
	/// cleanup unregisters this handler only.
	pub fn add(&self, event: &str, node: &Node, handler: Function) -> Cleanup {
		if self.0.installed.borrow_mut().insert(event.to_string()) {
			debug_log!(event, "installed delegated listener");
		}

		let id = self.0.next_id.get();
		self.0.next_id.set(id + 1);

		self.0
			.handlers
			.borrow_mut()
			.entry(event.to_string())
			.or_default()
			.entry(node.key())
			.or_insert_with(|| NodeHandlers {
				_node: node.clone(),
				handlers: IndexMap::new(),
			})
			.handlers
			.insert(id, handler);

		let inner = Rc::downgrade(&self.0);
		let (event, node_key) = (event.to_string(), node.key());
		Cleanup::new(move || {
			let Some(inner) = inner.upgrade() else {
				return;
			};
			let mut table = inner.handlers.borrow_mut();
			if let Some(by_node) = table.get_mut(&event) {
				if let Some(entry) = by_node.get_mut(&node_key) {
					entry.handlers.shift_remove(&id);
					if entry.handlers.is_empty() {
						by_node.remove(&node_key);
					}
				}
			}
		})
	}

	/// Delivers `event` to the nearest node, from the target upward, that has
	/// handlers for it.
	///
	/// Handler errors are logged and do not stop the remaining handlers.
	/// Returns whether any handler ran.
	pub fn dispatch(&self, event: &Event) -> bool {
		let mut current = Some(event.target().clone());
		while let Some(node) = current {
			let handlers: Vec<Function> = self
				.0
				.handlers
				.borrow()
				.get(event.kind())
				.and_then(|by_node| by_node.get(&node.key()))
				.map(|entry| entry.handlers.values().cloned().collect())
				.unwrap_or_default();

			if !handlers.is_empty() {
				*event.0.current_target.borrow_mut() = Some(node.clone());
				let argument = [Value::Event(event.clone())];
				for handler in handlers {
					if let Err(error) = handler.call(&argument) {
						error_log!(event = event.kind(), handler = handler.name(), "event handler failed: {}", error);
					}
				}
				*event.0.current_target.borrow_mut() = None;
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Event names with an installed delegated listener, in install order.
	pub fn installed_events(&self) -> Vec<String> {
		self.0.installed.borrow().iter().cloned().collect()
	}

	/// Number of handlers registered for `event` across all nodes.
	pub fn handler_count(&self, event: &str) -> usize {
		self.0
			.handlers
			.borrow()
			.get(event)
			.map(|by_node| by_node.values().map(|entry| entry.handlers.len()).sum())
			.unwrap_or(0)
	}
}

impl fmt::Debug for EventDelegator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventDelegator")
			.field("installed", &*self.0.installed.borrow())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn counter(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> Function {
		let log = log.clone();
		Function::new(label, move |args| {
			let kind = args[0].get_member("type")?;
			log.borrow_mut().push(format!("{label}:{kind}"));
			Ok(Value::Undefined)
		})
	}

	#[rstest]
	fn test_dispatch_bubbles_to_nearest_registered_ancestor() {
		let delegator = EventDelegator::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let outer = Node::element("div");
		let inner = Node::element("button");
		let label = Node::text("go");
		outer.append_child(&inner);
		inner.append_child(&label);

		let _outer = delegator.add("click", &outer, counter(&log, "outer"));
		let _inner = delegator.add("click", &inner, counter(&log, "inner"));

		assert!(delegator.dispatch(&Event::new("click", &label)));
		assert_eq!(*log.borrow(), vec!["inner:click"]);
	}

	#[rstest]
	fn test_remover_unregisters_single_handler() {
		let delegator = EventDelegator::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let button = Node::element("button");

		let first = delegator.add("click", &button, counter(&log, "a"));
		let _second = delegator.add("click", &button, counter(&log, "b"));
		first.run();

		delegator.dispatch(&Event::new("click", &button));
		assert_eq!(*log.borrow(), vec!["b:click"]);
		assert_eq!(delegator.handler_count("click"), 1);
	}

	#[rstest]
	fn test_installed_events_are_append_only() {
		let delegator = EventDelegator::new();
		let node = Node::element("input");
		let remove = delegator.add("input", &node, Function::new("noop", |_| Ok(Value::Undefined)));
		remove.run();
		assert_eq!(delegator.installed_events(), vec!["input".to_string()]);
		assert!(!delegator.dispatch(&Event::new("input", &node)));
	}

	#[rstest]
	fn test_event_members() {
		let node = Node::element("input");
		let event = Event::new("keydown", &node).with_detail("key", "Enter");
		let value = Value::Event(event.clone());
		assert_eq!(value.get_member("key").unwrap(), Value::from("Enter"));
		value.get_member("preventDefault").unwrap().call(&[]).unwrap();
		assert!(event.default_prevented());
	}
}
