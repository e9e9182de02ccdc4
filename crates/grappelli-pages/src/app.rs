//! Application root.
//!
//! An [`App`] owns what would otherwise be process-wide: the component
//! registry, the delegated event table, the "attached to the document" flag
//! and the queue of mount callbacks waiting for that attachment.

use core::fmt;

use std::rc::Rc;

use crate::blocks::{render_component, render_content};
use crate::component::Component;
use crate::config::RuntimeConfig;
use crate::dom::Node;
use crate::error::{RenderError, RenderResult};
use crate::events::{Event, EventDelegator};
use crate::expr;
use crate::info_log;
use crate::render::{MountBatch, RenderContext, RootState};
use crate::scope::Scope;
use crate::template::{Rendered, Template};

/// One application root.
pub struct App {
	root: Rc<RootState>,
}

impl App {
	/// Creates a root with `config`.
	pub fn new(config: RuntimeConfig) -> Self {
		expr::set_cache_warn_threshold(config.cache.expression_warn_threshold);
		Self {
			root: RootState::new(config),
		}
	}

	/// Registers a component under its name, replacing any previous one.
	pub fn register(&self, component: Component) -> &Self {
		self.root
			.components
			.borrow_mut()
			.insert(component.name().to_string(), component);
		self
	}

	/// Looks a registered component up.
	pub fn component(&self, name: &str) -> Option<Component> {
		self.root.components.borrow().get(name).cloned()
	}

	/// Runtime configuration.
	pub fn config(&self) -> &RuntimeConfig {
		&self.root.config
	}

	/// Delegated event table.
	pub fn events(&self) -> &EventDelegator {
		&self.root.events
	}

	/// Whether something has been mounted into the document.
	pub fn is_attached(&self) -> bool {
		self.root.attached.get()
	}

	/// Mounts the component registered as `name` at the end of `target`.
	///
	/// # Errors
	///
	/// [`RenderError::UnknownComponent`] or any instantiation error.
	pub fn mount(&self, name: &str, props: Scope, target: &Node) -> RenderResult<Mounted> {
		let component = self
			.component(name)
			.ok_or_else(|| RenderError::UnknownComponent(name.to_string()))?;
		self.mount_component(&component, props, target)
	}

	/// Mounts `component` at the end of `target`.
	///
	/// # Errors
	///
	/// Any instantiation error; nothing is inserted in that case.
	pub fn mount_component(&self, component: &Component, props: Scope, target: &Node) -> RenderResult<Mounted> {
		let batch = MountBatch::begin(&self.root);
		let cx = RenderContext::root(self.root.clone());
		let rendered = render_component(component, &props, None, &cx, target, None)?;
		self.attach(batch);
		info_log!(component = component.name(), "mounted");
		Ok(Mounted { rendered })
	}

	/// Mounts a bare template against `scope` at the end of `target`.
	///
	/// # Errors
	///
	/// Any instantiation error; nothing is inserted in that case.
	pub fn mount_template(&self, template: &Rc<Template>, scope: &Scope, target: &Node) -> RenderResult<Mounted> {
		let batch = MountBatch::begin(&self.root);
		let anchor = Node::comment("");
		target.append_child(&anchor);
		let cx = RenderContext::root(self.root.clone());
		let rendered = match render_content(template, scope, &cx, &anchor) {
			Ok(rendered) => rendered,
			Err(err) => {
				anchor.remove();
				return Err(err);
			}
		};
		anchor.remove();
		self.attach(batch);
		Ok(Mounted { rendered })
	}

	/// Marks the root attached and flushes every queued mount callback.
	fn attach(&self, batch: MountBatch) {
		self.root.attached.set(true);
		batch.commit();
	}

	/// Dispatches a synthetic event through the delegated handlers.
	pub fn dispatch(&self, event: &Event) -> bool {
		self.root.events.dispatch(event)
	}
}

impl Default for App {
	fn default() -> Self {
		Self::new(RuntimeConfig::default())
	}
}

impl fmt::Debug for App {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("attached", &self.root.attached.get())
			.field("components", &self.root.components.borrow().len())
			.field("config", &self.root.config)
			.finish()
	}
}

/// A mounted tree.
#[derive(Debug)]
pub struct Mounted {
	rendered: Rendered,
}

impl Mounted {
	/// The mounted range.
	pub fn rendered(&self) -> &Rendered {
		&self.rendered
	}

	/// Serialized content, comments omitted.
	pub fn to_html(&self) -> String {
		self.rendered.to_html()
	}

	/// Runs every unmount callback and removes the nodes.
	pub fn unmount(&self) {
		self.rendered.dispose();
	}
}
