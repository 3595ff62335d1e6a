//! Slot layout of a station
//!
//! One backing store, six aliasing ranges:
//!
//! | range   | slots  |
//! |---------|--------|
//! | command | 0      |
//! | input   | 1-9    |
//! | output  | 10-18  |
//! | grid    | 19-27  |
//! | pen     | 28-30  |
//! | filter  | 31-39  |
//!
//! The grid doubles as the scratch range where reserved ingredients wait.
//! Filter slot `i` holds a one-item copy of the kind input slot `i` accepts.

use serde::{Deserialize, Serialize};

use crate::core::config::StationConfig;
use crate::inventory::SlotRange;
use crate::recipes::catalog::GRID_WIDTH;

pub const COMMAND_SLOT: usize = 0;
pub const INPUT_START: usize = 1;
pub const INPUT_SIZE: usize = 9;
pub const OUTPUT_START: usize = INPUT_START + INPUT_SIZE;
pub const OUTPUT_SIZE: usize = 9;
pub const GRID_START: usize = OUTPUT_START + OUTPUT_SIZE;
pub const GRID_SIZE: usize = GRID_WIDTH * GRID_WIDTH;
pub const PEN_START: usize = GRID_START + GRID_SIZE;
pub const PEN_SIZE: usize = 3;
pub const FILTER_START: usize = PEN_START + PEN_SIZE;
pub const FILTER_SIZE: usize = INPUT_SIZE;
pub const TOTAL_SLOTS: usize = FILTER_START + FILTER_SIZE;

/// Operator-addressable ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeId {
    Command,
    Input,
    Output,
    Grid,
    Pen,
    Filter,
}

/// The ranges of one station
#[derive(Debug, Clone)]
pub struct StationLayout {
    pub command: SlotRange,
    pub input: SlotRange,
    pub output: SlotRange,
    pub grid: SlotRange,
    pub pen: SlotRange,
    pub filter: SlotRange,
}

impl StationLayout {
    pub fn new(config: &StationConfig) -> Self {
        let population = config.population_item.clone();
        Self {
            command: SlotRange::new(COMMAND_SLOT, 1).with_max_stack(1),
            input: SlotRange::new(INPUT_START, INPUT_SIZE)
                .with_rows(3)
                .with_validator(|slot, stack, store| {
                    let filter = store.get(FILTER_START + slot);
                    filter.is_empty() || filter.kind() == stack.kind()
                }),
            output: SlotRange::new(OUTPUT_START, OUTPUT_SIZE).with_rows(3),
            grid: SlotRange::new(GRID_START, GRID_SIZE).with_rows(GRID_WIDTH),
            pen: SlotRange::new(PEN_START, PEN_SIZE).with_validator(move |_, stack, _| stack.is(&population)),
            filter: SlotRange::new(FILTER_START, FILTER_SIZE).with_rows(3).with_max_stack(1),
        }
    }

    pub fn range(&self, id: RangeId) -> &SlotRange {
        match id {
            RangeId::Command => &self.command,
            RangeId::Input => &self.input,
            RangeId::Output => &self.output,
            RangeId::Grid => &self.grid,
            RangeId::Pen => &self.pen,
            RangeId::Filter => &self.filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InsertPolicy, SlotStore};
    use crate::item::{ItemKind, ItemStack};

    #[test]
    fn test_ranges_tile_the_store() {
        let layout = StationLayout::new(&StationConfig::default());
        let total: usize = [
            &layout.command,
            &layout.input,
            &layout.output,
            &layout.grid,
            &layout.pen,
            &layout.filter,
        ]
        .iter()
        .map(|r| r.len())
        .sum();
        assert_eq!(total, TOTAL_SLOTS);
        assert_eq!(layout.grid.columns(), 3);
    }

    #[test]
    fn test_input_respects_filter_slot() {
        let layout = StationLayout::new(&StationConfig::default());
        let mut store = SlotStore::new(TOTAL_SLOTS);
        store.set(FILTER_START, ItemStack::new(ItemKind::named("minecraft:coal"), 1));

        let sand = ItemStack::new(ItemKind::named("minecraft:sand"), 4);
        let rest = layout.input.insert(&mut store, sand, InsertPolicy::default());
        assert!(rest.is_empty());
        assert!(layout.input.get(&store, 0).is_empty());
        assert!(layout.input.get(&store, 1).is("minecraft:sand"));
    }

    #[test]
    fn test_pen_only_takes_population() {
        let config = StationConfig::default();
        let layout = StationLayout::new(&config);
        let mut store = SlotStore::new(TOTAL_SLOTS);
        let sugar = ItemStack::new(ItemKind::named("minecraft:sugar"), 1);
        assert_eq!(layout.pen.insert(&mut store, sugar, InsertPolicy::default()).count(), 1);
        let ant = ItemStack::new(ItemKind::named(config.population_item.clone()), 1);
        assert!(layout.pen.insert(&mut store, ant, InsertPolicy::default()).is_empty());
    }
}
