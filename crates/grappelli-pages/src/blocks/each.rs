//! Keyed list reconciliation.
//!
//! The block is either *empty* (optional empty-state content between its
//! anchors) or *populated* (one record per item, in order). On every source
//! change records are matched to items by position first and by key second;
//! a matched record is reused by writing its item and index signals in
//! place, unmatched items get fresh records, and unmatched records are torn
//! down. Finally a record's node range is moved only when its actual
//! predecessor differs from the expected one.

use core::cell::RefCell;

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use grappelli_reactive::{Effect, Signal, on_cleanup};

use super::{FirstRun, render_content};
use crate::dom::{Node, collect_range};
use crate::error::{EvalError, RenderResult};
use crate::expr::CompiledExpr;
use crate::render::{ErrorReporter, RenderContext};
use crate::scope::Scope;
use crate::template::{EachBlockConfig, ItemPattern, Rendered};
use crate::value::{KeyAtom, Value};
use crate::warn_log;

/// One rendered item.
struct Record {
	key: KeyAtom,
	item: Signal<Value>,
	index: Signal<Value>,
	rendered: Rendered,
}

#[derive(Default)]
struct EachState {
	records: RefCell<Vec<Record>>,
	empty: RefCell<Option<Rendered>>,
}

impl EachState {
	fn clear(&self) {
		for record in self.records.take() {
			record.rendered.dispose();
		}
		if let Some(empty) = self.empty.take() {
			empty.dispose();
		}
	}
}

struct Reconciler {
	config: EachBlockConfig,
	source: CompiledExpr,
	scope: Scope,
	cx: RenderContext,
	reporter: ErrorReporter,
	start: Node,
	end: Node,
	state: Rc<EachState>,
	first_run: FirstRun,
}

pub(super) fn mount(
	config: &EachBlockConfig,
	start: &Node,
	end: &Node,
	scope: &Scope,
	cx: &RenderContext,
) -> RenderResult<()> {
	let reconciler = Reconciler {
		config: config.clone(),
		source: cx.compile(&config.source, scope)?,
		scope: scope.clone(),
		cx: cx.clone(),
		reporter: cx.reporter(),
		start: start.clone(),
		end: end.clone(),
		state: Rc::new(EachState::default()),
		first_run: FirstRun::default(),
	};
	let (state, first_run) = (reconciler.state.clone(), reconciler.first_run.clone());

	Effect::new(move || match reconciler.items() {
		Ok(items) => reconciler.reconcile(items),
		Err(err) => reconciler.reporter.report(&reconciler.source, &err),
	});
	on_cleanup(move || state.clear());
	first_run.finish()
}

impl Reconciler {
	/// Evaluates the source; nullish counts as empty.
	fn items(&self) -> Result<Vec<Value>, EvalError> {
		match self.source.evaluate(&self.scope)?.resolve() {
			Value::Array(items) => Ok(items.to_vec()),
			Value::Undefined | Value::Null => Ok(Vec::new()),
			other => Err(EvalError::Type(format!(
				"each source must be an array, got {}",
				other.type_name()
			))),
		}
	}

	fn key_of(&self, item: &Value) -> KeyAtom {
		if self.config.key_fields.is_empty() {
			return item.identity_key();
		}
		KeyAtom::Composite(
			self.config
				.key_fields
				.iter()
				.map(|field| item.get_member(field).unwrap_or_default().identity_key())
				.collect(),
		)
	}

	fn reconcile(&self, items: Vec<Value>) {
		if items.is_empty() {
			self.show_empty();
			return;
		}
		if let Some(empty) = self.state.empty.take() {
			empty.dispose();
		}

		let keys: Vec<KeyAtom> = items.iter().map(|item| self.key_of(item)).collect();
		if self.cx.config().each.warn_duplicate_keys {
			let mut seen = HashSet::with_capacity(keys.len());
			for key in &keys {
				if !seen.insert(key) {
					warn_log!(
						source = self.source.source(),
						key = ?key,
						"duplicate key in each block; the earliest unused record wins"
					);
				}
			}
		}

		let mut previous: Vec<Option<Record>> =
			self.state.records.take().into_iter().map(Some).collect();
		let mut by_key: HashMap<KeyAtom, VecDeque<usize>> = HashMap::new();
		for (position, record) in previous.iter().enumerate() {
			if let Some(record) = record {
				by_key.entry(record.key.clone()).or_default().push_back(position);
			}
		}

		let mut next = Vec::with_capacity(items.len());
		for (index, (item, key)) in items.into_iter().zip(keys).enumerate() {
			let at_position = previous
				.get(index)
				.and_then(Option::as_ref)
				.is_some_and(|record| record.key == key);
			let matched = if at_position {
				Some(index)
			} else {
				earliest_unused(&mut by_key, &previous, &key)
			};

			match matched.and_then(|position| previous[position].take()) {
				Some(record) => {
					record.item.set(item);
					record.index.set(Value::from(index));
					next.push(record);
				}
				None => match self.create(item, key, index) {
					Ok(record) => next.push(record),
					Err(err) => self.first_run.fail("each", err),
				},
			}
		}

		for record in previous.into_iter().flatten() {
			record.rendered.dispose();
		}

		self.reorder(&next);
		*self.state.records.borrow_mut() = next;
	}

	fn create(&self, item: Value, key: KeyAtom, index: usize) -> RenderResult<Record> {
		let item = Signal::new(item);
		let index = Signal::new(Value::from(index));

		let mut scope = match &self.config.item {
			ItemPattern::Name(name) => self.scope.with(name, Value::accessor(name, item.clone())),
			ItemPattern::Fields(fields) => fields.iter().fold(self.scope.clone(), |scope, field| {
				let (item, name) = (item.clone(), field.clone());
				scope.with(
					field,
					Value::function(field, move |_| item.get().get_member(&name)),
				)
			}),
		};
		if let Some(name) = &self.config.index {
			scope = scope.with(name, Value::accessor(name, index.clone()));
		}

		let rendered = render_content(&self.config.content, &scope, &self.cx, &self.end)?;
		Ok(Record {
			key,
			item,
			index,
			rendered,
		})
	}

	fn show_empty(&self) {
		for record in self.state.records.take() {
			record.rendered.dispose();
		}
		let Some(content) = &self.config.empty else {
			return;
		};
		if self.state.empty.borrow().is_some() {
			return;
		}
		match render_content(content, &self.scope, &self.cx, &self.end) {
			Ok(rendered) => *self.state.empty.borrow_mut() = Some(rendered),
			Err(err) => self.first_run.fail("each", err),
		}
	}

	/// Moves record ranges whose predecessor is not the expected one.
	fn reorder(&self, records: &[Record]) {
		let Some(parent) = self.start.parent() else {
			return;
		};
		let mut expected = self.start.clone();
		for record in records {
			let (first, last) = (record.rendered.start(), record.rendered.end());
			let in_place = first
				.previous_sibling()
				.is_some_and(|actual| actual.ptr_eq(&expected));
			if !in_place {
				let reference = expected.next_sibling();
				for node in collect_range(first, last) {
					parent.insert_before(&node, reference.as_ref());
				}
			}
			expected = last.clone();
		}
	}
}

/// Earliest previous position still holding a record with `key`.
fn earliest_unused(
	by_key: &mut HashMap<KeyAtom, VecDeque<usize>>,
	previous: &[Option<Record>],
	key: &KeyAtom,
) -> Option<usize> {
	let queue = by_key.get_mut(key)?;
	while let Some(position) = queue.pop_front() {
		if previous[position].is_some() {
			return Some(position);
		}
	}
	None
}
