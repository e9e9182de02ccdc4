//! Mount and unmount callback sets.
//!
//! Every component and block instantiation gets its own [`LifecycleFrame`].
//! The frame accepts registrations while it is open (during instantiation)
//! and is sealed once instantiation finishes. Mount callbacks are flushed
//! when the content reaches the document; unmount callbacks run when the
//! content is torn down, each exactly once.

use core::cell::{Cell, RefCell};
use core::fmt;

use grappelli_reactive::{Cleanup, IntoCleanup};

use crate::context::{ContextChain, MountContext};
use crate::error::LifecycleError;

type MountCallback = Box<dyn FnOnce(&MountContext) -> Option<Cleanup>>;

/// Mount/unmount callbacks for one instantiation.
pub struct LifecycleFrame {
	open: Cell<bool>,
	disposed: Cell<bool>,
	mounts: RefCell<Vec<(ContextChain, MountCallback)>>,
	unmounts: RefCell<Vec<Cleanup>>,
}

impl LifecycleFrame {
	/// Creates an open frame.
	pub fn new() -> Self {
		Self {
			open: Cell::new(true),
			disposed: Cell::new(false),
			mounts: RefCell::new(Vec::new()),
			unmounts: RefCell::new(Vec::new()),
		}
	}

	/// Whether registrations are still accepted.
	pub fn is_open(&self) -> bool {
		self.open.get() && !self.disposed.get()
	}

	/// Whether [`LifecycleFrame::unmount`] has run.
	pub fn is_disposed(&self) -> bool {
		self.disposed.get()
	}

	/// Registers a mount callback bound to `chain`.
	///
	/// A value returned by the callback is kept as an unmount cleanup.
	pub fn add_mount<F, R>(&self, chain: ContextChain, callback: F) -> Result<(), LifecycleError>
	where
		F: FnOnce(&MountContext) -> R + 'static,
		R: IntoCleanup,
	{
		if !self.is_open() {
			return Err(LifecycleError::NoActiveFrame {
				operation: "on_mount",
			});
		}
		self.mounts
			.borrow_mut()
			.push((chain, Box::new(move |cx| callback(cx).into_cleanup())));
		Ok(())
	}

	/// Registers an unmount callback.
	pub fn add_unmount<F>(&self, callback: F) -> Result<(), LifecycleError>
	where
		F: FnOnce() + 'static,
	{
		if !self.is_open() {
			return Err(LifecycleError::NoActiveFrame {
				operation: "on_unmount",
			});
		}
		self.unmounts.borrow_mut().push(Cleanup::new(callback));
		Ok(())
	}

	/// Adds a teardown step regardless of the open state.
	pub(crate) fn push_cleanup(&self, cleanup: Cleanup) {
		if self.disposed.get() {
			cleanup.run();
		} else {
			self.unmounts.borrow_mut().push(cleanup);
		}
	}

	/// Stops accepting registrations.
	pub fn seal(&self) {
		self.open.set(false);
	}

	/// Number of mount callbacks not yet flushed.
	pub fn pending_mounts(&self) -> usize {
		self.mounts.borrow().len()
	}

	/// Runs pending mount callbacks in registration order.
	///
	/// Does nothing once the frame is disposed.
	pub fn flush_mounts(&self) {
		if self.disposed.get() {
			return;
		}
		let mounts = core::mem::take(&mut *self.mounts.borrow_mut());
		for (chain, callback) in mounts {
			if let Some(cleanup) = callback(&MountContext::new(chain)) {
				self.push_cleanup(cleanup);
			}
		}
	}

	/// Runs unmount callbacks in registration order and drops unflushed
	/// mount callbacks. Later calls do nothing.
	pub fn unmount(&self) {
		if self.disposed.replace(true) {
			return;
		}
		self.mounts.borrow_mut().clear();
		loop {
			let cleanups = core::mem::take(&mut *self.unmounts.borrow_mut());
			if cleanups.is_empty() {
				break;
			}
			for cleanup in cleanups {
				cleanup.run();
			}
		}
	}
}

impl Default for LifecycleFrame {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for LifecycleFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LifecycleFrame")
			.field("open", &self.open.get())
			.field("disposed", &self.disposed.get())
			.field("pending_mounts", &self.pending_mounts())
			.finish()
	}
}
