//! Cleanup functions, disposers, and ownership scopes.

use core::cell::RefCell;
use core::fmt;

use std::rc::Rc;

use crate::runtime::with_runtime;

/// A one-shot function run when an effect re-runs or is disposed.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
	/// Wraps a closure as a cleanup.
	pub fn new<F>(f: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self(Box::new(f))
	}

	/// Runs the cleanup, consuming it.
	pub fn run(self) {
		(self.0)();
	}
}

impl fmt::Debug for Cleanup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Cleanup")
	}
}

impl From<Disposer> for Cleanup {
	fn from(disposer: Disposer) -> Self {
		Cleanup::new(move || disposer.dispose())
	}
}

/// Values an effect body may return.
///
/// `()` means no cleanup; a [`Cleanup`] (or `Option<Cleanup>`) is stored and
/// invoked before the next run or on disposal.
pub trait IntoCleanup {
	/// Converts the value into an optional cleanup.
	fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
	fn into_cleanup(self) -> Option<Cleanup> {
		None
	}
}

impl IntoCleanup for Cleanup {
	fn into_cleanup(self) -> Option<Cleanup> {
		Some(self)
	}
}

impl IntoCleanup for Option<Cleanup> {
	fn into_cleanup(self) -> Option<Cleanup> {
		self
	}
}

impl IntoCleanup for Disposer {
	fn into_cleanup(self) -> Option<Cleanup> {
		Some(self.into())
	}
}

/// Idempotent handle that tears down an effect or a scope.
///
/// Cloning shares the handle; the first `dispose` call wins and later calls
/// are no-ops.
#[derive(Clone)]
pub struct Disposer(Rc<RefCell<Option<Cleanup>>>);

impl Disposer {
	/// Creates a disposer that runs `f` on first disposal.
	pub fn new<F>(f: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self(Rc::new(RefCell::new(Some(Cleanup::new(f)))))
	}

	/// Creates a disposer with nothing to do.
	pub fn noop() -> Self {
		Self(Rc::new(RefCell::new(None)))
	}

	/// Runs the teardown if it has not run yet.
	pub fn dispose(&self) {
		let cleanup = self.0.borrow_mut().take();
		if let Some(cleanup) = cleanup {
			cleanup.run();
		}
	}

	/// Whether the teardown has already run.
	pub fn is_disposed(&self) -> bool {
		self.0.borrow().is_none()
	}
}

impl fmt::Debug for Disposer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Disposer")
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

/// A set of cleanups owned by an effect or an untracked scope.
#[derive(Clone, Default)]
pub(crate) struct Owner(Rc<RefCell<Vec<Cleanup>>>);

impl Owner {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn push(&self, cleanup: Cleanup) {
		self.0.borrow_mut().push(cleanup);
	}

	/// Runs every owned cleanup in registration order.
	///
	/// Cleanups registered while this runs are drained too.
	pub(crate) fn dispose_all(&self) {
		loop {
			let owned = core::mem::take(&mut *self.0.borrow_mut());
			if owned.is_empty() {
				break;
			}
			for cleanup in owned {
				cleanup.run();
			}
		}
	}
}

/// Registers `f` with the current owner (running effect or untracked scope).
///
/// Returns `false` when no owner is active; `f` is dropped without running.
pub fn on_cleanup<F>(f: F) -> bool
where
	F: FnOnce() + 'static,
{
	match with_runtime(|rt| rt.current_owner()) {
		Some(owner) => {
			owner.push(Cleanup::new(f));
			true
		}
		None => false,
	}
}
