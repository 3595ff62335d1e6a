//! Colony - the ant workforce that powers a station
//!
//! The population lives as items in the pen range. Each processing step the
//! colony recounts its ants, accumulates growth (three times faster while
//! sugared), spawns one ant when growth overflows, burns down the sugar boost
//! and derives the speed multiplier used by every handler.

use serde::{Deserialize, Serialize};

use crate::core::config::StationConfig;
use crate::inventory::{InsertPolicy, SlotRange, SlotStore};
use crate::item::{ItemKind, ItemStack};

/// Speed multiplier while sugared
const SUGAR_SPEEDUP: f32 = 2.0;

/// Growth multiplier while sugared
const SUGAR_GROWTH: u32 = 3;

/// Workforce state of one station
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    /// Population units currently in the pen
    #[serde(skip)]
    pub ant_count: u32,
    /// Growth accumulator, wraps at the configured latency
    pub growth_progress: u32,
    /// Remaining boost ticks
    pub sugar_ticks: u32,
    /// Derived processing speed
    #[serde(skip)]
    pub speed_multiplier: f32,
}

/// What happened to the colony during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColonyTick {
    /// A new ant was placed into the pen
    pub spawned: bool,
    /// One boost item was consumed
    pub sugar_consumed: bool,
}

impl Colony {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sugared(&self) -> bool {
        self.sugar_ticks > 0
    }

    /// Whether there is any workforce at all
    pub fn is_working(&self) -> bool {
        self.ant_count > 0
    }

    /// Total population units the pen can hold
    pub fn pen_capacity(pen: &SlotRange, config: &StationConfig) -> u32 {
        let ant = ItemStack::new(ItemKind::named(config.population_item.clone()), 1);
        pen.capacity_for(&ant)
    }

    /// Recount the pen and refresh the speed multiplier without advancing
    pub fn refresh(&mut self, pen: &SlotRange, store: &SlotStore, config: &StationConfig) {
        self.ant_count = pen.count_of(store, &config.population_item);
        self.speed_multiplier = self.compute_speed(Self::pen_capacity(pen, config), config);
    }

    fn compute_speed(&self, capacity: u32, config: &StationConfig) -> f32 {
        if capacity == 0 {
            return 0.0;
        }
        let boost = if self.is_sugared() { SUGAR_SPEEDUP } else { 1.0 };
        boost * (self.ant_count as f32 / capacity as f32) * config.global_speed_scale
    }

    /// Advance the colony by `interval` ticks
    ///
    /// `input` is where boost items are taken from. `processing_active`
    /// allows sugar consumption even when the pen is already full.
    pub fn tick(
        &mut self,
        interval: u32,
        pen: &SlotRange,
        input: &SlotRange,
        store: &mut SlotStore,
        config: &StationConfig,
        processing_active: bool,
    ) -> ColonyTick {
        let mut result = ColonyTick::default();
        let ant = ItemStack::new(ItemKind::named(config.population_item.clone()), 1);
        self.ant_count = pen.count_of(store, &config.population_item);

        // Growth
        if self.ant_count > 0 {
            let rate = if self.is_sugared() { SUGAR_GROWTH } else { 1 };
            self.growth_progress = self.growth_progress.saturating_add(interval * rate);
            if self.growth_progress >= config.growth_latency {
                self.growth_progress = 0;
                let rest = pen.insert(store, ant.clone(), InsertPolicy::default());
                result.spawned = rest.is_empty();
                if result.spawned {
                    self.ant_count += 1;
                    tracing::trace!("Colony grew to {} ants", self.ant_count);
                }
            }
        }

        // Boost countdown and refill
        self.sugar_ticks = self.sugar_ticks.saturating_sub(interval);
        if self.sugar_ticks == 0 {
            let pen_has_room = pen.insert(store, ant, InsertPolicy::default().simulated()).is_empty();
            if pen_has_room || processing_active {
                if let Some(slot) = input.find(store, &config.boost_item) {
                    let mut sugar = input.get(store, slot).clone();
                    sugar.shrink(1);
                    input.set(store, slot, sugar);
                    self.sugar_ticks = config.boost_duration;
                    result.sugar_consumed = true;
                }
            }
        }

        self.speed_multiplier = self.compute_speed(Self::pen_capacity(pen, config), config);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (StationConfig, SlotStore, SlotRange, SlotRange) {
        let config = StationConfig::default();
        let store = SlotStore::new(4);
        let pen = SlotRange::new(0, 2);
        let input = SlotRange::new(2, 2);
        (config, store, pen, input)
    }

    fn ants(config: &StationConfig, n: u32) -> ItemStack {
        ItemStack::new(ItemKind::named(config.population_item.clone()), n)
    }

    #[test]
    fn test_full_pen_sugared_speed() {
        let (config, mut store, pen, input) = setup();
        store.set(0, ants(&config, 64));
        store.set(1, ants(&config, 64));
        let mut colony = Colony { sugar_ticks: 100, ..Colony::default() };

        colony.tick(1, &pen, &input, &mut store, &config, false);
        assert!((colony.speed_multiplier - 2.0 * config.global_speed_scale).abs() < 1e-6);
    }

    #[test]
    fn test_no_ants_no_speed() {
        let (config, mut store, pen, input) = setup();
        let mut colony = Colony::new();
        colony.tick(4, &pen, &input, &mut store, &config, false);
        assert_eq!(colony.speed_multiplier, 0.0);
        assert!(!colony.is_working());
        assert_eq!(colony.growth_progress, 0);
    }

    #[test]
    fn test_growth_spawns_one_ant() {
        let (config, mut store, pen, input) = setup();
        store.set(0, ants(&config, 10));
        let mut colony = Colony { growth_progress: config.growth_latency - 1, ..Colony::default() };

        let result = colony.tick(4, &pen, &input, &mut store, &config, false);
        assert!(result.spawned);
        assert_eq!(colony.ant_count, 11);
        assert_eq!(colony.growth_progress, 0);
        assert_eq!(pen.count_of(&store, &config.population_item), 11);
    }

    #[test]
    fn test_sugar_consumed_and_growth_tripled() {
        let (config, mut store, pen, input) = setup();
        store.set(0, ants(&config, 10));
        store.set(2, ItemStack::new(ItemKind::named(config.boost_item.clone()), 2));
        let mut colony = Colony::new();

        let result = colony.tick(4, &pen, &input, &mut store, &config, false);
        assert!(result.sugar_consumed);
        assert_eq!(colony.sugar_ticks, config.boost_duration);
        assert_eq!(input.count_of(&store, &config.boost_item), 1);

        colony.tick(4, &pen, &input, &mut store, &config, false);
        assert_eq!(colony.growth_progress, 4 + 12);
    }

    #[test]
    fn test_full_idle_pen_saves_sugar() {
        let (config, mut store, pen, input) = setup();
        store.set(0, ants(&config, 64));
        store.set(1, ants(&config, 64));
        store.set(2, ItemStack::new(ItemKind::named(config.boost_item.clone()), 2));
        let mut colony = Colony::new();

        let result = colony.tick(4, &pen, &input, &mut store, &config, false);
        assert!(!result.sugar_consumed);

        let result = colony.tick(4, &pen, &input, &mut store, &config, true);
        assert!(result.sugar_consumed);
    }
}
