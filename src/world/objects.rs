//! Free item entity storage and queries

use std::collections::BTreeMap;

use glam::Vec3;

use crate::core::types::{block_of, BlockPos, EntityId};
use crate::item::ItemStack;
use crate::world::block::ItemEntity;

/// Storage for all free item entities, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct ItemEntities {
    entities: BTreeMap<EntityId, ItemEntity>,
    next_id: u64,
}

impl ItemEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an entity at rest
    pub fn spawn(&mut self, position: Vec3, stack: ItemStack) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(
            id,
            ItemEntity {
                id,
                stack,
                position,
                velocity: Vec3::ZERO,
                on_ground: false,
            },
        );
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&ItemEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut ItemEntity> {
        self.entities.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<ItemEntity> {
        self.entities.remove(&id)
    }

    /// Entities whose position lies inside cell `pos`
    pub fn in_cell(&self, pos: BlockPos) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| block_of(e.position) == pos)
            .map(|e| e.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ItemEntity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Total item count over all entities of the given id
    pub fn count_of(&self, id: &str) -> u32 {
        self.entities
            .values()
            .filter(|e| e.stack.is(id))
            .map(|e| e.stack.count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use glam::IVec3;

    #[test]
    fn test_spawn_and_find_in_cell() {
        let mut items = ItemEntities::new();
        let id = items.spawn(Vec3::new(2.5, 1.1, 3.5), ItemStack::new(ItemKind::named("minecraft:stick"), 2));
        items.spawn(Vec3::new(9.5, 1.1, 3.5), ItemStack::new(ItemKind::named("minecraft:stick"), 1));

        assert_eq!(items.in_cell(IVec3::new(2, 1, 3)), vec![id]);
        assert_eq!(items.count_of("minecraft:stick"), 3);
    }

    #[test]
    fn test_remove_entity() {
        let mut items = ItemEntities::new();
        let id = items.spawn(Vec3::ZERO, ItemStack::new(ItemKind::named("minecraft:stick"), 1));
        assert!(items.remove(id).is_some());
        assert!(items.get(id).is_none());
        assert!(items.is_empty());
    }
}
