//! Item kinds and stacks
//!
//! An [`ItemStack`] is a count of one [`ItemKind`] plus optional tag data.
//! Two stacks can merge only when kind and tag are equal.

mod stack;

pub use stack::{ItemKind, ItemStack};
