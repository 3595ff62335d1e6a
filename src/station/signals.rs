//! Outward redstone signals of a station

use crate::core::types::BlockPos;
use crate::inventory::{SlotRange, SlotStore};
use crate::world::World;

/// Comparator level for a range: 0 when empty, otherwise 1-15 by fill
pub fn comparator_level(range: &SlotRange, store: &SlotStore) -> u8 {
    if range.is_empty(store) {
        return 0;
    }
    let ratio = range.fill_ratio(store);
    (1.0 + ratio * 14.0).floor().clamp(1.0, 15.0) as u8
}

/// Comparator level plus the two blocked pulses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    comparator: u8,
    input_blocked: u32,
    output_blocked: u32,
    /// What neighbours were last told
    published: (u8, bool, bool),
}

impl Signals {
    pub fn comparator(&self) -> u8 {
        self.comparator
    }

    pub fn input_blocked(&self) -> bool {
        self.input_blocked > 0
    }

    pub fn output_blocked(&self) -> bool {
        self.output_blocked > 0
    }

    pub fn raise_input_blocked(&mut self, duration: u32) {
        self.input_blocked = duration.max(1);
    }

    pub fn raise_output_blocked(&mut self, duration: u32) {
        self.output_blocked = duration.max(1);
    }

    /// Count the pulses down by `elapsed` ticks
    pub fn decay(&mut self, elapsed: u32) {
        self.input_blocked = self.input_blocked.saturating_sub(elapsed);
        self.output_blocked = self.output_blocked.saturating_sub(elapsed);
    }

    pub fn set_comparator(&mut self, level: u8) {
        self.comparator = level.min(15);
    }

    /// Notify neighbours once if anything observable changed
    pub fn publish<W: World + ?Sized>(&mut self, world: &mut W, pos: BlockPos) -> bool {
        let current = (self.comparator, self.input_blocked(), self.output_blocked());
        if current == self.published {
            return false;
        }
        self.published = current;
        world.notify_neighbors(pos);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemKind, ItemStack};
    use crate::world::GridWorld;
    use glam::IVec3;

    #[test]
    fn test_comparator_levels() {
        let range = SlotRange::new(0, 2);
        let mut store = SlotStore::new(2);
        assert_eq!(comparator_level(&range, &store), 0);
        store.set(0, ItemStack::new(ItemKind::named("minecraft:stone"), 1));
        assert_eq!(comparator_level(&range, &store), 1);
        store.set(0, ItemStack::new(ItemKind::named("minecraft:stone"), 64));
        assert_eq!(comparator_level(&range, &store), 8);
        store.set(1, ItemStack::new(ItemKind::named("minecraft:stone"), 64));
        assert_eq!(comparator_level(&range, &store), 15);
    }

    #[test]
    fn test_pulse_notifies_once_per_change() {
        let mut world = GridWorld::new();
        let pos = IVec3::ZERO;
        let mut signals = Signals::default();
        assert!(!signals.publish(&mut world, pos));

        signals.raise_output_blocked(3);
        assert!(signals.publish(&mut world, pos));
        assert!(!signals.publish(&mut world, pos));

        signals.decay(2);
        assert!(signals.output_blocked());
        signals.decay(1);
        assert!(!signals.output_blocked());
        assert!(signals.publish(&mut world, pos));
        assert_eq!(world.notifications().len(), 2);
    }
}
