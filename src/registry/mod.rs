// src/registry/mod.rs

//! The registry of managed commands.
//!
//! - [`entry`] defines [`ManagedCommand`] and the one-line text encoding used
//!   by the backing store.
//! - [`store`] reads and appends that store through a [`FileSystem`].
//!
//! [`FileSystem`]: crate::fs::FileSystem

pub mod entry;
pub mod store;

pub use entry::ManagedCommand;
pub use store::Registry;
