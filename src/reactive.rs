//! Fine-grained reactivity
//!
//! This module provides access to grappelli-reactive: signals hold state,
//! effects re-run when the signals they read change, and every effect is
//! owned by the scope that created it so a whole subtree can be disposed at
//! once.

pub use grappelli_reactive::*;
