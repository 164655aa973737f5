//! Low-level objects the contexts are built from.

pub mod swapchain;
