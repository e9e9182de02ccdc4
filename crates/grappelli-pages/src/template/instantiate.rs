//! Wiring a cloned master fragment to a scope.

use core::cell::RefCell;
use core::fmt;

use std::rc::Rc;

use grappelli_reactive::{Cleanup, Disposer, Effect, Signal, on_cleanup, untrack, untracked_effect};

use crate::blocks;
use crate::dom::{Node, collect_range, remove_range};
use crate::error::{EvalError, RenderError, RenderResult, TemplateError};
use crate::expr::CompiledExpr;
use crate::render::{ErrorReporter, RenderContext};
use crate::scope::Scope;
use crate::template::Template;
use crate::template::descriptor::{BindingDescriptor, BindingKind, TextPart};
use crate::value::{Function, Value};
use crate::{debug_log, error_log};

/// An instantiated template: a node range plus the teardown that owns it.
///
/// Disposal runs, in order: the bindings' effects and nested blocks, the
/// registered teardown hooks (lifecycle unmount callbacks), and finally the
/// removal of the range from its parent. Disposal is idempotent.
pub struct Rendered {
	fragment: Node,
	start: Node,
	end: Node,
	hooks: Rc<RefCell<Vec<Cleanup>>>,
	disposer: Disposer,
}

impl Rendered {
	fn new(fragment: Node, start: Node, end: Node, scope: Disposer) -> Self {
		let hooks: Rc<RefCell<Vec<Cleanup>>> = Rc::default();
		let disposer = {
			let (hooks, start, end) = (hooks.clone(), start.clone(), end.clone());
			Disposer::new(move || {
				scope.dispose();
				let pending = core::mem::take(&mut *hooks.borrow_mut());
				for hook in pending {
					hook.run();
				}
				remove_range(&start, &end);
			})
		};
		Self {
			fragment,
			start,
			end,
			hooks,
			disposer,
		}
	}

	/// Opening boundary comment.
	pub fn start(&self) -> &Node {
		&self.start
	}

	/// Closing boundary comment.
	pub fn end(&self) -> &Node {
		&self.end
	}

	/// Every node of the range, boundaries included.
	pub fn nodes(&self) -> Vec<Node> {
		collect_range(&self.start, &self.end)
	}

	/// Moves the range under `parent`, before `reference` (or at the end).
	pub fn insert_before(&self, parent: &Node, reference: Option<&Node>) {
		let detached = self
			.start
			.parent()
			.is_some_and(|current| current.ptr_eq(&self.fragment));
		if detached {
			parent.insert_before(&self.fragment, reference);
		} else {
			for node in self.nodes() {
				parent.insert_before(&node, reference);
			}
		}
	}

	/// Adds a step run after the bindings are torn down and before the range
	/// is removed. Runs immediately when already disposed.
	pub fn on_teardown(&self, hook: Cleanup) {
		if self.disposer.is_disposed() {
			hook.run();
		} else {
			self.hooks.borrow_mut().push(hook);
		}
	}

	/// Tears the instance down.
	pub fn dispose(&self) {
		self.disposer.dispose();
	}

	/// Whether [`Rendered::dispose`] has run.
	pub fn is_disposed(&self) -> bool {
		self.disposer.is_disposed()
	}

	/// Shareable handle to the teardown.
	pub fn disposer(&self) -> Disposer {
		self.disposer.clone()
	}

	/// Serializes the range without comments.
	pub fn to_html(&self) -> String {
		self.nodes().iter().map(Node::to_html).collect()
	}
}

impl fmt::Debug for Rendered {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Rendered")
			.field("html", &self.to_html())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

pub(super) fn instantiate(
	template: &Rc<Template>,
	scope: &Scope,
	cx: &RenderContext,
) -> RenderResult<Rendered> {
	let fragment = template.master().clone_deep();

	// Resolve every path before any wiring inserts nodes into the clone
	let targets = template
		.bindings()
		.iter()
		.map(|binding| {
			fragment
				.resolve_path(&binding.path)
				.ok_or_else(|| TemplateError::UnresolvedPath {
					path: binding.path.clone(),
				})
		})
		.collect::<Result<Vec<_>, _>>()?;
	let (Some(start), Some(end)) = (fragment.first_child(), fragment.last_child()) else {
		return Err(TemplateError::UnresolvedPath { path: Vec::new() }.into());
	};

	if cx.config().trace_templates {
		debug_log!(
			bindings = targets.len(),
			context_keys = %scope.keys().join(", "),
			"instantiating template"
		);
	}

	let (wired, owner) = untracked_effect(|| -> RenderResult<()> {
		for (binding, target) in template.bindings().iter().zip(&targets) {
			wire(binding, target, scope, cx)?;
		}
		Ok(())
	});
	if let Err(err) = wired {
		owner.dispose();
		return Err(err);
	}

	Ok(Rendered::new(fragment, start, end, owner))
}

fn wire(binding: &BindingDescriptor, node: &Node, scope: &Scope, cx: &RenderContext) -> RenderResult<()> {
	match &binding.kind {
		BindingKind::Text { expression } => {
			let expr = cx.compile(expression, scope)?;
			bind_text(node.clone(), expr, scope.clone(), cx.reporter());
		}
		BindingKind::Attribute { name, parts } => {
			let parts = parts
				.iter()
				.map(|part| match part {
					TextPart::Static(text) => Ok(Part::Static(text.clone())),
					TextPart::Dynamic(expression) => cx.compile(expression, scope).map(Part::Dynamic),
				})
				.collect::<RenderResult<Vec<_>>>()?;
			bind_attribute(node.clone(), name.clone(), parts, scope.clone(), cx.reporter());
		}
		BindingKind::Event { event, expression } => {
			let expr = cx.compile(expression, scope)?;
			bind_event(node.clone(), event.clone(), expr, scope.clone(), cx);
		}
		BindingKind::Bind {
			property,
			event,
			expression,
		} => {
			let expr = cx.compile(expression, scope)?;
			let target = expr.evaluate(scope).map_err(|source| RenderError::Evaluation {
				expression: expression.clone(),
				source,
			})?;
			let Value::Signal(signal) = target else {
				return Err(RenderError::BindTargetNotSignal {
					property: property.clone(),
					expression: expression.clone(),
				});
			};
			bind_two_way(node.clone(), property.clone(), event, signal, cx);
		}
		BindingKind::Action { name, argument } => {
			let Some(Value::Function(action)) = scope.get(name).cloned() else {
				return Err(RenderError::UnknownAction(name.clone()));
			};
			let argument = argument
				.as_deref()
				.map(|expression| cx.compile(expression, scope))
				.transpose()?;
			let (node, scope, reporter) = (node.clone(), scope.clone(), cx.reporter());
			cx.on_mount(move |_| {
				let arg = match &argument {
					Some(expr) => match untrack(|| expr.evaluate(&scope)) {
						Ok(value) => value,
						Err(err) => {
							reporter.report(expr, &err);
							Value::Undefined
						}
					},
					None => Value::Undefined,
				};
				match action.call(&[Value::Node(node), arg]) {
					Ok(Value::Function(teardown)) => Some(Cleanup::new(move || {
						if let Err(err) = teardown.call(&[]) {
							error_log!("action teardown failed: {}", err);
						}
					})),
					Ok(_) => None,
					Err(err) => {
						error_log!(action = action.name(), "action failed: {}", err);
						None
					}
				}
			})?;
		}
		BindingKind::Block(config) => {
			let anchor_start = Node::comment("");
			if let Some(parent) = node.parent() {
				parent.insert_before(&anchor_start, Some(node));
			}
			blocks::mount_block(config, &anchor_start, node, scope, cx)?;
		}
		BindingKind::Slot { fallback } => {
			blocks::mount_slot(fallback.as_ref(), node, scope, cx)?;
		}
	}
	Ok(())
}

fn bind_text(node: Node, expr: CompiledExpr, scope: Scope, reporter: ErrorReporter) {
	let mut last: Option<String> = None;
	Effect::new(move || match expr.evaluate(&scope) {
		Ok(value) => {
			let text = value.to_string();
			if last.as_deref() != Some(text.as_str()) {
				node.set_data(text.clone());
				last = Some(text);
			}
		}
		Err(err) => reporter.report(&expr, &err),
	});
}

enum Part {
	Static(String),
	Dynamic(CompiledExpr),
}

fn bind_attribute(node: Node, name: String, parts: Vec<Part>, scope: Scope, reporter: ErrorReporter) {
	let mut last: Option<String> = None;
	Effect::new(move || {
		let mut rendered = String::new();
		for part in &parts {
			match part {
				Part::Static(text) => rendered.push_str(text),
				Part::Dynamic(expr) => match expr.evaluate(&scope) {
					Ok(value) => rendered.push_str(&value.to_string()),
					Err(err) => {
						reporter.report(expr, &err);
						return;
					}
				},
			}
		}
		if last.as_deref() != Some(rendered.as_str()) {
			set_attribute(&node, &name, &rendered);
			last = Some(rendered);
		}
	});
}

/// Writes an attribute with the boolean and `value` conventions.
fn set_attribute(node: &Node, name: &str, value: &str) {
	if name == "value" {
		node.set_property("value", Value::from(value));
	}
	match value {
		"false" | "" => node.remove_attribute(name),
		"true" => node.set_attribute(name, ""),
		other => node.set_attribute(name, other),
	}
}

fn bind_event(node: Node, event: String, expr: CompiledExpr, scope: Scope, cx: &RenderContext) {
	let (events, reporter) = (cx.events().clone(), cx.reporter());
	Effect::new(move || match expr.evaluate(&scope) {
		Ok(Value::Function(handler)) => Some(events.add(&event, &node, handler)),
		Ok(Value::Undefined | Value::Null) => None,
		Ok(other) => {
			reporter.report(&expr, &EvalError::NotCallable(other.type_name().to_string()));
			None
		}
		Err(err) => {
			reporter.report(&expr, &err);
			None
		}
	});
}

fn bind_two_way(
	node: Node,
	property: String,
	event: &str,
	signal: Signal<Value>,
	cx: &RenderContext,
) {
	{
		let (node, property, signal) = (node.clone(), property.clone(), signal.clone());
		Effect::new(move || {
			let value = signal.get();
			let value = if property == "checked" {
				Value::Bool(value.is_truthy())
			} else {
				value
			};
			if node.property(&property).as_ref() != Some(&value) {
				node.set_property(&property, value);
			}
		});
	}

	let handler = {
		let node = node.clone();
		Function::new("bind", move |_| {
			signal.set(node.property(&property).unwrap_or_default());
			Ok(Value::Undefined)
		})
	};
	let remove = cx.events().add(event, &node, handler);
	on_cleanup(move || remove.run());
}
