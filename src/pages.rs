//! Templates, blocks, and components
//!
//! This module provides access to grappelli-pages.
//!
//! ## Architecture
//!
//! - **Templates**: compiled once into a master node tree plus binding descriptors
//! - **Blocks**: conditional, keyed list, await, and component blocks with their own reconcilers
//! - **Components**: a template plus a setup function, with lifecycle callbacks and context
//! - **App**: the root owning the component registry, event delegation, and the mount queue

pub use grappelli_pages::*;
