//! Sided containers and their adaptation to the port operations

use crate::core::types::{BlockPos, Facing};
use crate::inventory::SlotStore;
use crate::item::ItemStack;

/// A container exposing different slots through different faces
pub trait SidedContainer {
    fn slots_for_face(&self, face: Facing) -> Vec<usize>;

    fn can_insert_through_face(&self, slot: usize, stack: &ItemStack, face: Facing) -> bool;

    fn can_extract_through_face(&self, slot: usize, stack: &ItemStack, face: Facing) -> bool;

    fn store(&self) -> &SlotStore;

    fn store_mut(&mut self) -> &mut SlotStore;

    fn position(&self) -> BlockPos;
}

/// Port view of a sided container through one face
pub struct SidedAdapter<'a> {
    container: &'a mut dyn SidedContainer,
    face: Facing,
}

impl<'a> SidedAdapter<'a> {
    pub fn new(container: &'a mut dyn SidedContainer, face: Facing) -> Self {
        Self { container, face }
    }

    pub fn allows_insertion(&self) -> bool {
        !self.container.slots_for_face(self.face).is_empty()
    }

    pub fn allows_extraction(&self) -> bool {
        !self.container.slots_for_face(self.face).is_empty()
    }

    pub fn owner(&self) -> BlockPos {
        self.container.position()
    }

    pub fn is_storage_empty(&self) -> bool {
        let store = self.container.store();
        self.container
            .slots_for_face(self.face)
            .into_iter()
            .all(|slot| store.get(slot).is_empty())
    }

    /// Distinct kinds extractable through this face
    pub fn offered(&self) -> Vec<ItemStack> {
        let store = self.container.store();
        let extractable: Vec<&ItemStack> = self
            .container
            .slots_for_face(self.face)
            .into_iter()
            .map(|slot| (slot, store.get(slot)))
            .filter(|(slot, stack)| self.container.can_extract_through_face(*slot, stack, self.face))
            .map(|(_, stack)| stack)
            .collect();
        super::distinct_kinds(extractable)
    }

    /// Top up matching stacks, then fill empty slots, in face slot order
    pub fn insert(&mut self, stack: ItemStack, simulate: bool) -> ItemStack {
        let slots = self.container.slots_for_face(self.face);
        let limit = stack.max_stack();
        let mut remaining = stack.count();

        for fill_empty in [false, true] {
            for &slot in &slots {
                if remaining == 0 {
                    break;
                }
                if !self.container.can_insert_through_face(slot, &stack, self.face) {
                    continue;
                }
                let existing = self.container.store().get(slot).clone();
                let placed = if !fill_empty && existing.can_stack_with(&stack) {
                    let amount = limit.saturating_sub(existing.count()).min(remaining);
                    existing.copy_with_count(existing.count() + amount)
                } else if fill_empty && existing.is_empty() {
                    stack.copy_with_count(limit.min(remaining))
                } else {
                    continue;
                };
                let amount = placed.count() - existing.count();
                if amount == 0 {
                    continue;
                }
                remaining -= amount;
                if !simulate {
                    self.container.store_mut().set(slot, placed);
                }
            }
        }
        stack.copy_with_count(remaining)
    }

    /// Extract from the first extractable slot matching `template`
    pub fn extract(&mut self, template: &ItemStack, count: u32, simulate: bool) -> ItemStack {
        for slot in self.container.slots_for_face(self.face) {
            let existing = self.container.store().get(slot).clone();
            if existing.is_empty() {
                continue;
            }
            if !template.is_empty() && !existing.can_stack_with(template) {
                continue;
            }
            if !self.container.can_extract_through_face(slot, &existing, self.face) {
                continue;
            }
            let taken = count.min(existing.count());
            if !simulate {
                self.container
                    .store_mut()
                    .set(slot, existing.copy_with_count(existing.count() - taken));
            }
            return existing.copy_with_count(taken);
        }
        ItemStack::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use glam::IVec3;

    /// Furnace-like: top face feeds slot 0, bottom face drains slot 1
    struct Kiln {
        store: SlotStore,
    }

    impl SidedContainer for Kiln {
        fn slots_for_face(&self, face: Facing) -> Vec<usize> {
            match face {
                Facing::Up => vec![0],
                Facing::Down => vec![1],
                _ => vec![],
            }
        }

        fn can_insert_through_face(&self, slot: usize, _stack: &ItemStack, _face: Facing) -> bool {
            slot == 0
        }

        fn can_extract_through_face(&self, slot: usize, _stack: &ItemStack, _face: Facing) -> bool {
            slot == 1
        }

        fn store(&self) -> &SlotStore {
            &self.store
        }

        fn store_mut(&mut self) -> &mut SlotStore {
            &mut self.store
        }

        fn position(&self) -> BlockPos {
            IVec3::ZERO
        }
    }

    #[test]
    fn test_sided_insert_respects_face() {
        let mut kiln = Kiln { store: SlotStore::new(2) };
        let ore = ItemStack::new(ItemKind::named("minecraft:iron_ore"), 5);

        let rest = SidedAdapter::new(&mut kiln, Facing::North).insert(ore.clone(), false);
        assert_eq!(rest.count(), 5);

        let rest = SidedAdapter::new(&mut kiln, Facing::Up).insert(ore, false);
        assert!(rest.is_empty());
        assert_eq!(kiln.store.get(0).count(), 5);
    }

    #[test]
    fn test_sided_extract_simulate() {
        let mut kiln = Kiln { store: SlotStore::new(2) };
        kiln.store.set(1, ItemStack::new(ItemKind::named("minecraft:iron_ingot"), 3));

        let mut adapter = SidedAdapter::new(&mut kiln, Facing::Down);
        let peek = adapter.extract(&ItemStack::empty(), 2, true);
        assert_eq!(peek.count(), 2);
        let taken = adapter.extract(&ItemStack::empty(), 2, false);
        assert_eq!(taken.count(), 2);
        assert_eq!(kiln.store.get(1).count(), 1);
    }
}
