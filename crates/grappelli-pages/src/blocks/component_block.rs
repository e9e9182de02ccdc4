use core::cell::RefCell;

use std::rc::Rc;

use grappelli_reactive::{Cleanup, Disposer, Effect, on_cleanup, untracked_effect};

use super::FirstRun;
use crate::component::Component;
use crate::debug_log;
use crate::dom::Node;
use crate::error::{RenderError, RenderResult};
use crate::expr::CompiledExpr;
use crate::render::{MountBatch, RenderContext, SlotContent};
use crate::scope::Scope;
use crate::template::{ComponentBlockConfig, PropValue, Rendered};
use crate::value::Value;

enum Prop {
	Static(Value),
	Expression(String, CompiledExpr),
}

/// The mounted instance plus the scope its setup ran in.
#[derive(Default)]
struct Instance(RefCell<Option<(Rendered, Disposer)>>);

impl Instance {
	fn clear(&self) {
		if let Some((rendered, setup)) = self.0.take() {
			rendered.dispose();
			setup.dispose();
		}
	}
}

/// Mounts a child component whose expression props follow their
/// dependencies. A prop change re-runs setup with the new values; reads made
/// by setup and the template do not.
pub(super) fn mount(
	config: &ComponentBlockConfig,
	end: &Node,
	scope: &Scope,
	cx: &RenderContext,
) -> RenderResult<()> {
	let component = cx
		.component(&config.name)
		.ok_or_else(|| RenderError::UnknownComponent(config.name.clone()))?;

	let props = config
		.props
		.iter()
		.map(|(name, prop)| {
			let prop = match prop {
				PropValue::Static(text) => Prop::Static(Value::from(text.as_str())),
				PropValue::Expression(expression) => {
					Prop::Expression(expression.clone(), cx.compile(expression, scope)?)
				}
			};
			Ok((name.clone(), prop))
		})
		.collect::<RenderResult<Vec<_>>>()?;

	let Some(parent) = end.parent() else {
		return Ok(());
	};

	let instance = Rc::new(Instance::default());
	let first_run = FirstRun::default();
	{
		let (instance, first_run) = (instance.clone(), first_run.clone());
		let (end, scope, cx) = (end.clone(), scope.clone(), cx.clone());
		let slot = config.slot.clone();
		Effect::new(move || {
			let mut values = Scope::new();
			for (name, prop) in &props {
				let value = match prop {
					Prop::Static(value) => value.clone(),
					Prop::Expression(expression, compiled) => match compiled.evaluate(&scope) {
						Ok(value) => value,
						Err(source) => {
							first_run.fail(
								"component",
								RenderError::Evaluation {
									expression: expression.clone(),
									source,
								},
							);
							return;
						}
					},
				};
				values = values.with(name, value);
			}

			instance.clear();
			let slot = slot.as_ref().map(|template| SlotContent {
				template: template.clone(),
				scope: scope.clone(),
				cx: cx.clone(),
			});
			let (rendered, setup) =
				untracked_effect(|| render_component(&component, &values, slot, &cx, &parent, Some(&end)));
			match rendered {
				Ok(rendered) => *instance.0.borrow_mut() = Some((rendered, setup)),
				Err(err) => {
					setup.dispose();
					first_run.fail("component", err);
				}
			}
		});
	}
	on_cleanup(move || instance.clear());
	first_run.finish()
}

/// Instantiates `component` under `parent_cx` and inserts it before
/// `reference`. Mount callbacks run once the component is in place.
pub(crate) fn render_component(
	component: &Component,
	props: &Scope,
	slot: Option<SlotContent>,
	parent_cx: &RenderContext,
	parent: &Node,
	reference: Option<&Node>,
) -> RenderResult<Rendered> {
	let batch = MountBatch::begin(parent_cx.root_state());
	let cx = parent_cx.enter_component(component, slot)?;
	let scope = component.setup(props, &cx)?;
	let rendered = component.template().instantiate(&scope, &cx)?;
	cx.seal();

	rendered.insert_before(parent, reference);
	let frame = cx.frame().clone();
	rendered.on_teardown(Cleanup::new(move || frame.unmount()));
	cx.schedule_mount();
	batch.commit();

	if cx.config().trace_templates {
		debug_log!(component = component.name(), path = ?cx.component_path(), "component rendered");
	}
	Ok(rendered)
}
