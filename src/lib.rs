//! Formicary - an ant-colony powered multi-purpose processing station
//!
//! A station emulates one of fourteen workstations depending on the item in
//! its command slot. Its speed comes from the colony living in its pen.
//! Items reach it through neighbour ports and leave it onto trails, a
//! directional conveyance network; the axe handler drives a bounded
//! tree-felling flood fill.

pub mod colony;
pub mod core;
pub mod felling;
pub mod inventory;
pub mod item;
pub mod port;
pub mod recipes;
pub mod station;
pub mod trail;
pub mod world;
