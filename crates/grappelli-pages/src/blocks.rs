//! Block reconcilers.
//!
//! Every block lives between two anchor comments in its parent's range and
//! renders content directly before its end anchor. A block is a reactive
//! consumer: one effect evaluates its source expression and swaps, reuses or
//! reorders content instances. Content is instantiated in untracked scopes,
//! so reads inside it never make the block's own effect re-run.

mod await_block;
mod component_block;
mod each;
mod if_block;

use core::cell::RefCell;

use std::rc::Rc;

use grappelli_reactive::Cleanup;

use crate::dom::Node;
use crate::error::{RenderError, RenderResult};
use crate::error_log;
use crate::render::{MountBatch, RenderContext};
use crate::scope::Scope;
use crate::template::{BlockConfig, Rendered, Template};

pub(crate) use component_block::render_component;

/// Wires the block configured by `config` between `start` and `end`.
pub(crate) fn mount_block(
	config: &Rc<BlockConfig>,
	start: &Node,
	end: &Node,
	scope: &Scope,
	cx: &RenderContext,
) -> RenderResult<()> {
	match &**config {
		BlockConfig::If(config) => if_block::mount(config, end, scope, cx),
		BlockConfig::Each(config) => each::mount(config, start, end, scope, cx),
		BlockConfig::Await(config) => await_block::mount(config, end, scope, cx),
		BlockConfig::Component(config) => component_block::mount(config, end, scope, cx),
	}
}

/// Renders the component's slot content, or the fallback, before `anchor`.
pub(crate) fn mount_slot(
	fallback: Option<&Rc<Template>>,
	anchor: &Node,
	scope: &Scope,
	cx: &RenderContext,
) -> RenderResult<()> {
	let rendered = match (cx.slot(), fallback) {
		(Some(slot), _) => Some(render_content(&slot.template, &slot.scope, &slot.cx, anchor)?),
		(None, Some(fallback)) => Some(render_content(fallback, scope, cx, anchor)?),
		(None, None) => None,
	};
	if let Some(rendered) = rendered {
		grappelli_reactive::on_cleanup(move || rendered.dispose());
	}
	Ok(())
}

/// Instantiates block content in its own lifecycle frame and inserts it
/// before `before`. Mount callbacks run once the content is in place.
pub(crate) fn render_content(
	template: &Rc<Template>,
	scope: &Scope,
	cx: &RenderContext,
	before: &Node,
) -> RenderResult<Rendered> {
	let batch = MountBatch::begin(cx.root_state());
	let content_cx = cx.block_context();
	let rendered = template.instantiate(scope, &content_cx)?;
	content_cx.seal();
	if let Some(parent) = before.parent() {
		rendered.insert_before(&parent, Some(before));
	}
	let frame = content_cx.frame().clone();
	rendered.on_teardown(Cleanup::new(move || frame.unmount()));
	content_cx.schedule_mount();
	batch.commit();
	Ok(rendered)
}

/// Holds the first-run error of a block effect.
///
/// Configuration errors raised while a block renders during its parent's
/// instantiation are handed back to the caller; later ones can only be
/// logged, since nothing is waiting for them.
#[derive(Clone, Default)]
pub(crate) struct FirstRun(Rc<RefCell<FirstRunState>>);

#[derive(Default)]
struct FirstRunState {
	done: bool,
	error: Option<RenderError>,
}

impl FirstRun {
	pub(crate) fn fail(&self, block: &str, error: RenderError) {
		let mut state = self.0.borrow_mut();
		if state.done {
			error_log!(block, "block update failed: {}", error);
		} else if state.error.is_none() {
			state.error = Some(error);
		}
	}

	/// Ends the first run, returning its error.
	pub(crate) fn finish(&self) -> RenderResult<()> {
		let mut state = self.0.borrow_mut();
		state.done = true;
		state.error.take().map_or(Ok(()), Err)
	}
}
