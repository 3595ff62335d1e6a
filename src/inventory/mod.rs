//! Slotted storage and addressable ranges over it
//!
//! A [`SlotStore`] owns the stacks. A [`SlotRange`] is a non-owning window
//! (offset + length) onto a store; several ranges may alias the same store,
//! and every range operation takes the store explicitly.

pub mod range;
pub mod store;

pub use range::{InsertPolicy, SlotRange, SlotValidator};
pub use store::SlotStore;
