//! Promise block.
//!
//! Each evaluation of the source takes a new token. A settlement callback
//! only renders if its token is still the latest, so a slow promise that
//! settles after a newer one was awaited is ignored.

use core::cell::{Cell, RefCell};

use std::rc::Rc;

use grappelli_reactive::{Effect, on_cleanup};

use super::{FirstRun, render_content};
use crate::dom::Node;
use crate::error::RenderResult;
use crate::error_log;
use crate::promise::Settlement;
use crate::render::RenderContext;
use crate::scope::Scope;
use crate::template::{AwaitBlockConfig, AwaitBranch, Rendered, Template};
use crate::value::Value;

#[derive(Default)]
struct AwaitState {
	token: Cell<u64>,
	disposed: Cell<bool>,
	rendered: RefCell<Option<Rendered>>,
}

#[derive(Clone)]
struct Branches {
	config: Rc<AwaitBlockConfig>,
	scope: Scope,
	cx: RenderContext,
	end: Node,
	state: Rc<AwaitState>,
	first_run: FirstRun,
}

impl Branches {
	fn show(&self, content: Option<(&Rc<Template>, Scope)>) {
		if let Some(previous) = self.state.rendered.take() {
			previous.dispose();
		}
		let Some((template, scope)) = content else {
			return;
		};
		match render_content(template, &scope, &self.cx, &self.end) {
			Ok(rendered) => *self.state.rendered.borrow_mut() = Some(rendered),
			Err(err) => self.first_run.fail("await", err),
		}
	}

	fn branch_scope(&self, branch: &AwaitBranch, value: Value) -> Scope {
		match &branch.binding {
			Some(name) => self.scope.with(name, value),
			None => self.scope.clone(),
		}
	}

	fn show_pending(&self) {
		self.show(self.config.pending.as_ref().map(|t| (t, self.scope.clone())));
	}

	fn show_resolved(&self, value: Value) {
		self.show(
			self.config
				.then
				.as_ref()
				.map(|branch| (&branch.content, self.branch_scope(branch, value))),
		);
	}

	fn show_rejected(&self, reason: Value) {
		match &self.config.catch {
			Some(branch) => self.show(Some((&branch.content, self.branch_scope(branch, reason)))),
			None => {
				error_log!(
					source = self.config.source.as_str(),
					"unhandled rejection in await block: {}",
					reason
				);
				self.show(None);
			}
		}
	}

	fn settle(&self, settlement: &Settlement) {
		match settlement {
			Settlement::Resolved(value) => self.show_resolved(value.clone()),
			Settlement::Rejected(reason) => self.show_rejected(reason.clone()),
		}
	}
}

pub(super) fn mount(config: &AwaitBlockConfig, end: &Node, scope: &Scope, cx: &RenderContext) -> RenderResult<()> {
	let source = cx.compile(&config.source, scope)?;
	let branches = Branches {
		config: Rc::new(config.clone()),
		scope: scope.clone(),
		cx: cx.clone(),
		end: end.clone(),
		state: Rc::new(AwaitState::default()),
		first_run: FirstRun::default(),
	};
	let (state, first_run) = (branches.state.clone(), branches.first_run.clone());
	let reporter = cx.reporter();

	Effect::new(move || {
		let token = branches.state.token.get() + 1;
		branches.state.token.set(token);

		match source.evaluate(&branches.scope).map(|value| value.resolve()) {
			Ok(Value::Promise(promise)) => match promise.settlement() {
				Some(settlement) => branches.settle(&settlement),
				None => {
					branches.show_pending();
					let branches = branches.clone();
					promise.on_settle(move |settlement| {
						let state = &branches.state;
						if state.disposed.get() || state.token.get() != token {
							return;
						}
						branches.settle(settlement);
					});
				}
			},
			Ok(value) => branches.show_resolved(value),
			Err(err) => {
				reporter.report(&source, &err);
				if branches.config.catch.is_some() {
					branches.show_rejected(Value::from(err.to_string()));
				}
			}
		}
	});

	on_cleanup(move || {
		state.disposed.set(true);
		if let Some(rendered) = state.rendered.take() {
			rendered.dispose();
		}
	});
	first_run.finish()
}
