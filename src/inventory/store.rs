//! Backing store - fixed-size ordered array of stacks

use serde::{Deserialize, Serialize};

use crate::item::ItemStack;

static EMPTY_STACK: ItemStack = ItemStack::EMPTY;

/// Fixed-size slotted container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotStore {
    slots: Vec<ItemStack>,
    #[serde(skip)]
    dirty: bool,
}

impl SlotStore {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![ItemStack::empty(); size],
            dirty: false,
        }
    }

    /// Rebuild a store from persisted stacks, padding or truncating to `size`
    pub fn from_stacks(mut stacks: Vec<ItemStack>, size: usize) -> Self {
        stacks.resize(size, ItemStack::empty());
        Self {
            slots: stacks,
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(ItemStack::is_empty)
    }

    /// Stack at `index`; out of range reads as empty
    pub fn get(&self, index: usize) -> &ItemStack {
        self.slots.get(index).unwrap_or(&EMPTY_STACK)
    }

    pub fn set(&mut self, index: usize, stack: ItemStack) {
        debug_assert!(index < self.slots.len(), "slot {} out of range", index);
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack;
            self.dirty = true;
        }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut ItemStack> {
        self.dirty = true;
        self.slots.get_mut(index)
    }

    pub fn slots(&self) -> &[ItemStack] {
        &self.slots
    }

    /// Sum of all item counts in the store
    pub fn total_count(&self) -> u64 {
        self.slots.iter().map(|s| s.count() as u64).sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Return and reset the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Empty every slot, returning the non-empty stacks (the drop path)
    pub fn drain_all(&mut self) -> Vec<ItemStack> {
        let drained: Vec<ItemStack> = self
            .slots
            .iter_mut()
            .map(std::mem::take)
            .filter(|s| !s.is_empty())
            .collect();
        if !drained.is_empty() {
            self.dirty = true;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn test_out_of_range_reads_empty() {
        let store = SlotStore::new(2);
        assert!(store.get(5).is_empty());
    }

    #[test]
    fn test_drain_all_clears_and_marks_dirty() {
        let mut store = SlotStore::new(3);
        store.set(1, ItemStack::new(ItemKind::named("minecraft:stick"), 4));
        store.take_dirty();

        let drained = store.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(store.total_count(), 0);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_from_stacks_pads() {
        let store = SlotStore::from_stacks(vec![ItemStack::new(ItemKind::named("a:b"), 1)], 4);
        assert_eq!(store.len(), 4);
        assert_eq!(store.total_count(), 1);
    }
}
