use core::cell::{Cell, RefCell};

use std::rc::Rc;

use grappelli_reactive::{Effect, on_cleanup};

use super::{FirstRun, render_content};
use crate::dom::Node;
use crate::error::RenderResult;
use crate::expr::CompiledExpr;
use crate::render::RenderContext;
use crate::scope::Scope;
use crate::template::{IfBlockConfig, Rendered, Template};

struct Segment {
	condition: Option<CompiledExpr>,
	content: Rc<Template>,
}

#[derive(Default)]
struct IfState {
	/// Selected segment; `None` before the first successful evaluation.
	selected: Cell<Option<Option<usize>>>,
	rendered: RefCell<Option<Rendered>>,
}

impl IfState {
	fn clear(&self) {
		if let Some(rendered) = self.rendered.take() {
			rendered.dispose();
		}
	}
}

pub(super) fn mount(config: &IfBlockConfig, end: &Node, scope: &Scope, cx: &RenderContext) -> RenderResult<()> {
	let segments = config
		.branches()
		.iter()
		.map(|branch| {
			Ok(Segment {
				condition: branch
					.condition
					.as_deref()
					.map(|condition| cx.compile(condition, scope))
					.transpose()?,
				content: branch.content.clone(),
			})
		})
		.collect::<RenderResult<Vec<_>>>()?;

	let state = Rc::new(IfState::default());
	let first_run = FirstRun::default();
	{
		let (state, first_run) = (state.clone(), first_run.clone());
		let (end, scope, cx, reporter) = (end.clone(), scope.clone(), cx.clone(), cx.reporter());
		Effect::new(move || {
			let mut selected = None;
			for (index, segment) in segments.iter().enumerate() {
				let truthy = match &segment.condition {
					None => true,
					Some(condition) => match condition.evaluate(&scope) {
						Ok(value) => value.is_truthy(),
						Err(err) => {
							reporter.report(condition, &err);
							return;
						}
					},
				};
				if truthy {
					selected = Some(index);
					break;
				}
			}

			if state.selected.get() == Some(selected) {
				return;
			}
			state.selected.set(Some(selected));
			state.clear();
			if let Some(index) = selected {
				match render_content(&segments[index].content, &scope, &cx, &end) {
					Ok(rendered) => *state.rendered.borrow_mut() = Some(rendered),
					Err(err) => first_run.fail("if", err),
				}
			}
		});
	}
	on_cleanup(move || state.clear());
	first_run.finish()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::RuntimeConfig;
	use crate::dom::Node;
	use crate::render::RootState;
	use crate::template::BlockTable;
	use crate::value::Value;
	use grappelli_reactive::Signal;
	use rstest::rstest;

	#[rstest]
	fn test_rerenders_only_on_segment_change() {
		let n = Signal::new(Value::from(5));
		let scope = Scope::new().with("n", n.clone());
		let then = Template::from_html("<b>big</b>", &BlockTable::new()).unwrap();
		let small = Template::from_html("<i>small</i>", &BlockTable::new()).unwrap();
		let config = IfBlockConfig::new("n() > 3", then).otherwise(small);

		let host = Node::element("div");
		let end = Node::comment("end");
		host.append_child(&end);
		let cx = RenderContext::root(RootState::new(RuntimeConfig::default()));
		let ((), owner) = grappelli_reactive::untracked_effect(|| mount(&config, &end, &scope, &cx).unwrap());

		assert_eq!(host.inner_html(), "<b>big</b>");
		let bold = host.first_child().unwrap().next_sibling().unwrap();

		n.set(Value::from(9));
		assert!(host.child(1).unwrap().ptr_eq(&bold));

		n.set(Value::from(1));
		assert_eq!(host.inner_html(), "<i>small</i>");

		owner.dispose();
		assert_eq!(host.child_count(), 1);
	}
}
