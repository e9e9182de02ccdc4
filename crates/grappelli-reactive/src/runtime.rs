//! Reactive Runtime
//!
//! This module provides the core reactive runtime for managing Signal dependencies,
//! the observer stack, and ownership scopes for Effects.
//!
//! ## Architecture
//!
//! 1. **Observer Stack**: Tracks the currently executing Effect, Memo, or untracked scope
//! 2. **Dependency Tracking**: Records an edge whenever `Signal::get()` runs under an observer
//! 3. **Synchronous Notification**: A write notifies a snapshot of the subscriber list,
//!    taken before any subscriber runs
//! 4. **Ownership**: Effects created while an owner is active are disposed together with it
//!
//! ## Example
//!
//! ```ignore
//! use grappelli_reactive::{Effect, Signal};
//!
//! let count = Signal::new(0);
//!
//! let _effect = Effect::new({
//!     let count = count.clone();
//!     move || println!("Count is: {}", count.get())
//! });
//!
//! // Runs the effect again before `set` returns
//! count.set(42);
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use std::collections::BTreeMap;

use crate::cleanup::Owner;

/// Unique identifier for reactive nodes (Signals, Effects, Memos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// Type of reactive node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// A Signal node (source of reactivity)
	Signal,
	/// An Effect node (side effect that runs when dependencies change)
	Effect,
	/// A Memo node (cached computation)
	Memo,
	/// An untracked scope. Reads under it are not recorded anywhere.
	Untracked,
}

/// Observer represents a currently executing Effect, Memo, or untracked scope
#[derive(Debug, Clone, Copy)]
pub struct Observer {
	/// Unique identifier for this observer
	pub id: NodeId,
	/// Type of this observer
	pub node_type: NodeType,
}

impl Observer {
	/// Creates an observer for the given node.
	pub fn new(id: NodeId, node_type: NodeType) -> Self {
		Self { id, node_type }
	}
}

/// Dependency graph node
#[derive(Debug, Default)]
pub(crate) struct DependencyNode {
	/// IDs of nodes that depend on this node, in subscription order
	pub(crate) subscribers: Vec<NodeId>,
	/// IDs of nodes this node depends on
	pub(crate) dependencies: Vec<NodeId>,
}

/// Reactive runtime
///
/// Manages the dependency graph, the observer stack, and the owner stack.
/// It lives in thread-local storage, so each thread gets its own graph.
pub struct Runtime {
	/// Observer stack for tracking currently executing effects
	observer_stack: RefCell<Vec<Observer>>,
	/// Owner stack; effects created while an owner is on top attach to it
	owner_stack: RefCell<Vec<Owner>>,
	/// Dependency graph: NodeId -> DependencyNode
	pub(crate) dependency_graph: RefCell<BTreeMap<NodeId, DependencyNode>>,
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			owner_stack: RefCell::new(Vec::new()),
			dependency_graph: RefCell::new(BTreeMap::new()),
		}
	}

	/// Get the current observer (the currently executing Effect or Memo)
	///
	/// Returns `None` inside an untracked scope as well as outside any observer.
	pub fn current_observer(&self) -> Option<NodeId> {
		self.observer_stack
			.borrow()
			.last()
			.filter(|observer| observer.node_type != NodeType::Untracked)
			.map(|observer| observer.id)
	}

	/// Push an observer onto the stack
	///
	/// This should be called when starting to execute an Effect or Memo.
	pub fn push_observer(&self, observer: Observer) {
		self.observer_stack.borrow_mut().push(observer);
	}

	/// Pop an observer from the stack
	///
	/// This should be called when finishing execution of an Effect or Memo.
	pub fn pop_observer(&self) -> Option<Observer> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Depth of the observer stack
	pub fn observer_depth(&self) -> usize {
		self.observer_stack.borrow().len()
	}

	pub(crate) fn push_owner(&self, owner: Owner) {
		self.owner_stack.borrow_mut().push(owner);
	}

	pub(crate) fn pop_owner(&self) -> Option<Owner> {
		self.owner_stack.borrow_mut().pop()
	}

	pub(crate) fn current_owner(&self) -> Option<Owner> {
		self.owner_stack.borrow().last().cloned()
	}

	/// Track a dependency between the current observer and a signal
	///
	/// This is called automatically when Signal::get() is invoked.
	///
	/// # Arguments
	///
	/// * `signal_id` - ID of the Signal being accessed
	pub fn track_dependency(&self, signal_id: NodeId) {
		if let Some(observer_id) = self.current_observer() {
			let mut graph = self.dependency_graph.borrow_mut();

			// signal -> observer edge
			let signal_node = graph.entry(signal_id).or_default();
			if !signal_node.subscribers.contains(&observer_id) {
				signal_node.subscribers.push(observer_id);
			}

			// observer -> signal edge
			let observer_node = graph.entry(observer_id).or_default();
			if !observer_node.dependencies.contains(&signal_id) {
				observer_node.dependencies.push(signal_id);
			}
		}
	}

	/// Snapshot of the subscribers of a node, in subscription order
	pub(crate) fn subscribers_of(&self, node_id: NodeId) -> Vec<NodeId> {
		self.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.subscribers.clone())
			.unwrap_or_default()
	}

	/// Notify that a Signal has changed
	///
	/// Every subscriber in the snapshot taken here runs exactly once, in
	/// subscription order, before this call returns. Subscribers added or
	/// removed while the pass is running do not affect it.
	///
	/// # Arguments
	///
	/// * `signal_id` - ID of the Signal that changed
	pub fn notify_signal_change(&self, signal_id: NodeId) {
		let snapshot = self.subscribers_of(signal_id);

		for subscriber_id in snapshot {
			crate::effect::Effect::execute_effect(subscriber_id);
		}
	}

	/// Clear dependencies for a node
	///
	/// This should be called before re-executing an Effect/Memo to clear old dependencies.
	///
	/// # Arguments
	///
	/// * `node_id` - ID of the node whose dependencies should be cleared
	pub fn clear_dependencies(&self, node_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();

		let dependencies = match graph.get_mut(&node_id) {
			Some(node) => core::mem::take(&mut node.dependencies),
			None => return,
		};

		for dep_id in dependencies {
			if let Some(dep_node) = graph.get_mut(&dep_id) {
				dep_node.subscribers.retain(|&id| id != node_id);
			}
		}
	}

	/// Remove a node from the dependency graph
	///
	/// This should be called when a Signal/Effect/Memo is dropped or disposed.
	///
	/// # Arguments
	///
	/// * `node_id` - ID of the node to remove
	pub fn remove_node(&self, node_id: NodeId) {
		self.clear_dependencies(node_id);
		self.dependency_graph.borrow_mut().remove(&node_id);
	}

	/// Check if a node exists in the dependency graph (for testing)
	pub fn has_node(&self, node_id: NodeId) -> bool {
		self.dependency_graph.borrow().contains_key(&node_id)
	}

	/// Get the number of subscribers for a node (for testing)
	pub fn subscriber_count(&self, node_id: NodeId) -> usize {
		self.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.subscribers.len())
			.unwrap_or(0)
	}

	/// Get the number of dependencies of a node (for testing)
	pub fn dependency_count(&self, node_id: NodeId) -> usize {
		self.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.dependencies.len())
			.unwrap_or(0)
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

// Thread-local runtime instance
//
// In WASM, there is only one thread, so this effectively provides a global runtime.
// On native platforms, each thread gets its own runtime instance.
thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Get a reference to the thread's runtime
///
/// # Example
///
/// ```ignore
/// use grappelli_reactive::runtime::with_runtime;
///
/// with_runtime(|rt| {
///     rt.track_dependency(signal_id);
/// });
/// ```
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Try to access the runtime (safe version for Drop implementations)
///
/// Returns None if the thread-local storage has been destroyed.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}

/// Pops the observer (and optionally the owner) pushed for one execution.
///
/// Held across user code so the stacks stay balanced if that code panics.
pub(crate) struct ExecutionGuard {
	pops_owner: bool,
}

impl ExecutionGuard {
	pub(crate) fn enter(observer: Observer, owner: Option<Owner>) -> Self {
		with_runtime(|rt| {
			rt.push_observer(observer);
			let pops_owner = match owner {
				Some(owner) => {
					rt.push_owner(owner);
					true
				}
				None => false,
			};
			Self { pops_owner }
		})
	}
}

impl Drop for ExecutionGuard {
	fn drop(&mut self) {
		let pops_owner = self.pops_owner;
		let _ = try_with_runtime(|rt| {
			rt.pop_observer();
			if pops_owner {
				rt.pop_owner();
			}
		});
	}
}

/// Runs `f` without tracking any signal read inside it.
///
/// ```ignore
/// let value = untrack(|| count.get());
/// ```
pub fn untrack<F, R>(f: F) -> R
where
	F: FnOnce() -> R,
{
	let _guard = ExecutionGuard::enter(Observer::new(NodeId::new(), NodeType::Untracked), None);
	f()
}
