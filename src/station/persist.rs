//! Station snapshots
//!
//! Only durable state is saved: slots, flag bits, cycle counters, colony
//! counters and the composter level. Bindings, ports and filter occupancy
//! are rebuilt on load. Every field defaults, so older or partial snapshots
//! still load.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::inventory::SlotStore;
use crate::item::ItemStack;
use crate::station::layout::TOTAL_SLOTS;
use crate::station::state::StationFlags;
use crate::station::Station;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationSnapshot {
    pub slots: Vec<ItemStack>,
    pub flags: u16,
    pub progress: f32,
    pub max_progress: i32,
    pub growth_progress: u32,
    pub sugar_ticks: u32,
    pub fuel_left: u32,
    pub last_recipe_id: String,
    pub compost_level: u8,
}

impl StationSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Station {
    pub fn save(&self) -> StationSnapshot {
        StationSnapshot {
            slots: self.store.slots().to_vec(),
            flags: self.state.flags.bits(),
            progress: self.state.progress as f32,
            max_progress: self.state.max_progress,
            growth_progress: self.colony.growth_progress,
            sugar_ticks: self.colony.sugar_ticks,
            fuel_left: self.state.fuel_left,
            last_recipe_id: self.state.last_recipe_id.clone(),
            compost_level: self.state.compost_level,
        }
    }

    /// Load a snapshot. A recipe id the book no longer knows degrades to
    /// none; a running cycle continues with whatever command is installed.
    pub fn restore(&mut self, snapshot: StationSnapshot) {
        self.store = SlotStore::from_stacks(snapshot.slots, TOTAL_SLOTS);
        self.state.flags = StationFlags::from_bits_truncate(snapshot.flags);
        self.state.max_progress = snapshot.max_progress.max(0);
        let progress = snapshot.progress.round() as i32;
        self.state.progress = if self.state.max_progress > 0 {
            progress.min(self.state.max_progress)
        } else {
            progress.min(0)
        };
        self.state.fuel_left = snapshot.fuel_left;
        self.state.compost_level = snapshot.compost_level.min(super::handlers::COMPOST_FULL);

        self.state.last_recipe_id = snapshot.last_recipe_id;
        if !self.state.last_recipe_id.is_empty() && self.recipes.by_id(&self.state.last_recipe_id).is_none() {
            tracing::warn!(
                "Station at {:?} restored unknown recipe '{}', dropping it",
                self.pos,
                self.state.last_recipe_id
            );
            self.state.last_recipe_id.clear();
        }

        self.colony.growth_progress = snapshot.growth_progress;
        self.colony.sugar_ticks = snapshot.sugar_ticks;
        self.colony.refresh(&self.layout.pen, &self.store, &self.config);

        let command = self.layout.command.get(&self.store, 0);
        self.active_command = self.bindings.resolve(command).map(|_| command.id().to_string());
        self.refresh_occupancy();
        self.timer = 0;
        self.store.mark_dirty();
    }
}
