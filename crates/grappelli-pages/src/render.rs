//! The render context threaded through instantiation.
//!
//! Instead of process-wide lifecycle and context stacks, every instantiation
//! receives a [`RenderContext`] naming its application root, its own lifecycle
//! frame, its context chain, and the chain of component ancestors above it.
//! Child components and blocks derive a new context from their parent's; the
//! parent's is never mutated, which keeps instantiation reentrant.

use core::cell::{Cell, RefCell};
use core::fmt;

use std::collections::HashMap;
use std::rc::Rc;

use grappelli_reactive::IntoCleanup;

use crate::component::Component;
use crate::config::RuntimeConfig;
use crate::context::{ContextChain, MountContext};
use crate::error::{EvalError, LifecycleError, RenderError, RenderResult};
use crate::events::EventDelegator;
use crate::expr::{CompiledExpr, compile_cached};
use crate::lifecycle::LifecycleFrame;
use crate::scope::Scope;
use crate::template::Template;
use crate::value::Value;
use crate::{debug_log, error_log};

/// State shared by everything rendered under one application root.
pub(crate) struct RootState {
	pub(crate) config: RuntimeConfig,
	/// Whether the root has been attached to the document
	pub(crate) attached: Cell<bool>,
	pending: RefCell<Vec<Rc<LifecycleFrame>>>,
	batch_depth: Cell<usize>,
	pub(crate) events: EventDelegator,
	pub(crate) components: RefCell<HashMap<String, Component>>,
}

impl RootState {
	pub(crate) fn new(config: RuntimeConfig) -> Rc<Self> {
		Rc::new(Self {
			config,
			attached: Cell::new(false),
			pending: RefCell::new(Vec::new()),
			batch_depth: Cell::new(0),
			events: EventDelegator::new(),
			components: RefCell::new(HashMap::new()),
		})
	}

	/// Runs mount callbacks of every pending frame, in scheduling order.
	fn flush_pending(&self) {
		loop {
			let frames = core::mem::take(&mut *self.pending.borrow_mut());
			if frames.is_empty() {
				break;
			}
			debug_log!(frames = frames.len(), "flushing pending mount callbacks");
			for frame in frames {
				frame.flush_mounts();
			}
		}
	}

	#[cfg(test)]
	pub(crate) fn pending_frames(&self) -> usize {
		self.pending.borrow().len()
	}
}

/// Groups the mount scheduling of one insertion.
///
/// Frames scheduled while a batch is open are queued; committing the
/// outermost batch flushes them once the root is attached. Dropping a batch
/// without committing discards the frames it queued.
pub(crate) struct MountBatch {
	root: Rc<RootState>,
	mark: usize,
	committed: bool,
}

impl MountBatch {
	pub(crate) fn begin(root: &Rc<RootState>) -> Self {
		root.batch_depth.set(root.batch_depth.get() + 1);
		Self {
			root: root.clone(),
			mark: root.pending.borrow().len(),
			committed: false,
		}
	}

	pub(crate) fn commit(mut self) {
		self.committed = true;
	}
}

impl Drop for MountBatch {
	fn drop(&mut self) {
		if !self.committed {
			self.root.pending.borrow_mut().truncate(self.mark);
		}
		let depth = self.root.batch_depth.get().saturating_sub(1);
		self.root.batch_depth.set(depth);
		if depth == 0 && self.root.attached.get() {
			self.root.flush_pending();
		}
	}
}

#[derive(Clone, Default)]
struct Ancestors(Option<Rc<AncestorLink>>);

struct AncestorLink {
	id: usize,
	name: Rc<str>,
	parent: Ancestors,
}

impl Ancestors {
	fn push(&self, component: &Component) -> Self {
		Self(Some(Rc::new(AncestorLink {
			id: component.id(),
			name: Rc::from(component.name()),
			parent: self.clone(),
		})))
	}

	fn contains(&self, id: usize) -> bool {
		let mut link = self.0.as_ref();
		while let Some(current) = link {
			if current.id == id {
				return true;
			}
			link = current.parent.0.as_ref();
		}
		false
	}

	/// Names from the outermost ancestor inward.
	fn names(&self) -> Vec<String> {
		let mut names = Vec::new();
		let mut link = self.0.as_ref();
		while let Some(current) = link {
			names.push(current.name.to_string());
			link = current.parent.0.as_ref();
		}
		names.reverse();
		names
	}
}

/// Content passed to a component for its `<slot>`.
pub(crate) struct SlotContent {
	pub(crate) template: Rc<Template>,
	pub(crate) scope: Scope,
	pub(crate) cx: RenderContext,
}

/// Explicit lifecycle and context state for one instantiation.
///
/// Component setup functions receive one to register lifecycle callbacks and
/// to read or write context values.
#[derive(Clone)]
pub struct RenderContext {
	root: Rc<RootState>,
	frame: Rc<LifecycleFrame>,
	context: ContextChain,
	ancestors: Ancestors,
	slot: Option<Rc<SlotContent>>,
}

impl RenderContext {
	/// Top-level context of an application root.
	pub(crate) fn root(root: Rc<RootState>) -> Self {
		Self {
			root,
			frame: Rc::new(LifecycleFrame::new()),
			context: ContextChain::new().push_new(),
			ancestors: Ancestors::default(),
			slot: None,
		}
	}

	/// Registers a callback to run once the content is in the document.
	///
	/// A returned [`Cleanup`](grappelli_reactive::Cleanup) runs on unmount.
	/// The callback resolves context against this instantiation's chain.
	///
	/// # Errors
	///
	/// [`LifecycleError::NoActiveFrame`] once instantiation has finished.
	pub fn on_mount<F, R>(&self, callback: F) -> Result<(), LifecycleError>
	where
		F: FnOnce(&MountContext) -> R + 'static,
		R: IntoCleanup,
	{
		self.frame.add_mount(self.context.clone(), callback)
	}

	/// Registers a callback to run when the content is torn down.
	///
	/// # Errors
	///
	/// [`LifecycleError::NoActiveFrame`] once instantiation has finished.
	pub fn on_unmount<F>(&self, callback: F) -> Result<(), LifecycleError>
	where
		F: FnOnce() + 'static,
	{
		self.frame.add_unmount(callback)
	}

	/// Writes a context value visible to this component and its descendants.
	///
	/// # Errors
	///
	/// [`LifecycleError::NoActiveFrame`] once instantiation has finished.
	pub fn set_context(&self, key: &str, value: impl Into<Value>) -> Result<(), LifecycleError> {
		if !self.frame.is_open() || !self.context.set(key, value) {
			return Err(LifecycleError::NoActiveFrame {
				operation: "set_context",
			});
		}
		Ok(())
	}

	/// Reads a context value, innermost first; `undefined` when absent.
	pub fn get_context(&self, key: &str) -> Value {
		self.context.get(key).unwrap_or_default()
	}

	/// Same frame, with a fresh innermost context map.
	pub fn push_new_context(&self) -> Self {
		Self {
			context: self.context.push_new(),
			..self.clone()
		}
	}

	/// The event table of the application root.
	pub fn events(&self) -> &EventDelegator {
		&self.root.events
	}

	/// Configuration of the application root.
	pub fn config(&self) -> &RuntimeConfig {
		&self.root.config
	}

	/// Names of the components enclosing this instantiation, outermost first.
	pub fn component_path(&self) -> Vec<String> {
		self.ancestors.names()
	}

	pub(crate) fn root_state(&self) -> &Rc<RootState> {
		&self.root
	}

	pub(crate) fn frame(&self) -> &Rc<LifecycleFrame> {
		&self.frame
	}

	pub(crate) fn slot(&self) -> Option<&Rc<SlotContent>> {
		self.slot.as_ref()
	}

	/// Context for block content: own frame and context map, same ancestors.
	pub(crate) fn block_context(&self) -> Self {
		Self {
			frame: Rc::new(LifecycleFrame::new()),
			context: self.context.push_new(),
			..self.clone()
		}
	}

	/// Context for a child component, failing on a cyclic reference.
	pub(crate) fn enter_component(
		&self,
		component: &Component,
		slot: Option<SlotContent>,
	) -> RenderResult<Self> {
		if self.ancestors.contains(component.id()) {
			let mut chain = self.ancestors.names();
			chain.push(component.name().to_string());
			return Err(RenderError::CyclicComponent { chain });
		}
		Ok(Self {
			root: self.root.clone(),
			frame: Rc::new(LifecycleFrame::new()),
			context: self.context.push_new(),
			ancestors: self.ancestors.push(component),
			slot: slot.map(Rc::new),
		})
	}

	/// Closes the frame to further registrations.
	pub(crate) fn seal(&self) {
		self.frame.seal();
	}

	/// Queues this frame's mount callbacks, or runs them now when the root is
	/// attached and no insertion is in progress.
	pub(crate) fn schedule_mount(&self) {
		if self.root.attached.get() && self.root.batch_depth.get() == 0 {
			self.frame.flush_mounts();
		} else {
			self.root.pending.borrow_mut().push(self.frame.clone());
		}
	}

	pub(crate) fn component(&self, name: &str) -> Option<Component> {
		self.root.components.borrow().get(name).cloned()
	}

	/// Compiles a binding expression against the scope's keys.
	pub(crate) fn compile(&self, expression: &str, scope: &Scope) -> RenderResult<CompiledExpr> {
		compile_cached(expression, scope.keys()).map_err(|source| RenderError::Expression {
			expression: expression.to_string(),
			source,
		})
	}

	pub(crate) fn reporter(&self) -> ErrorReporter {
		ErrorReporter {
			enabled: self.root.config.log_evaluation_errors,
		}
	}
}

impl fmt::Debug for RenderContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderContext")
			.field("frame", &self.frame)
			.field("context", &self.context)
			.field("components", &self.ancestors.names())
			.finish()
	}
}

/// Logs evaluation errors raised inside binding effects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ErrorReporter {
	enabled: bool,
}

impl ErrorReporter {
	pub(crate) fn report(&self, expression: &CompiledExpr, error: &EvalError) {
		if self.enabled {
			error_log!(
				expression = expression.source(),
				context_keys = %expression.keys().join(", "),
				"binding evaluation failed: {}",
				error
			);
		}
	}
}
