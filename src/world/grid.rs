//! Sparse in-memory world
//!
//! Cells, occupants, creatures and item entities live in hash maps keyed by
//! position or id. Unset cells read as air.

use std::collections::BTreeMap;

use ahash::AHashMap;
use glam::Vec3;

use crate::core::types::{block_of, BlockPos, EntityId, Facing, Tick};
use crate::inventory::{InsertPolicy, SlotRange, SlotStore};
use crate::item::{ItemKind, ItemStack};
use crate::port::{distinct_kinds, ItemHandler, PortProvider, SidedContainer};
use crate::station::Station;
use crate::trail::{TrailNetwork, TRAIL_HEIGHT};
use crate::world::block::{Block, Creature, ItemEntity, Material};
use crate::world::objects::ItemEntities;
use crate::world::World;

const GRAVITY: f32 = 0.04;
const TERMINAL_VELOCITY: f32 = 0.9;
const GROUND_FRICTION: f32 = 0.6;
/// Work ticks per unit of hardness, bare handed
const BREAK_TICKS_PER_HARDNESS: f32 = 30.0;
const TOOL_SPEEDUP: f32 = 6.0;
/// Honey level at which a hive can be harvested
const HIVE_FULL: u8 = 5;

/// Plain storage block exposing all its slots on every face
#[derive(Debug, Clone)]
pub struct Chest {
    pub store: SlotStore,
    position: BlockPos,
}

impl Chest {
    pub fn new(position: BlockPos, size: usize) -> Self {
        Self {
            store: SlotStore::new(size),
            position,
        }
    }

    fn range(&self) -> SlotRange {
        SlotRange::new(0, self.store.len())
    }

    pub fn count_of(&self, id: &str) -> u32 {
        self.range().count_of(&self.store, id)
    }
}

impl ItemHandler for Chest {
    fn insert(&mut self, stack: ItemStack, simulate: bool) -> ItemStack {
        let policy = if simulate {
            InsertPolicy::default().simulated()
        } else {
            InsertPolicy::default()
        };
        self.range().insert(&mut self.store, stack, policy)
    }

    fn extract(&mut self, template: &ItemStack, count: u32, simulate: bool) -> ItemStack {
        let range = self.range();
        let template = if template.is_empty() {
            match range.iter(&self.store).find(|s| !s.is_empty()) {
                Some(first) => first.clone(),
                None => return ItemStack::empty(),
            }
        } else {
            template.clone()
        };
        if simulate {
            let available = range.available(&self.store, &template);
            return template.copy_with_count(available.min(count).min(template.max_stack()));
        }
        range.extract_matching(&mut self.store, &template, count.min(template.max_stack()))
    }

    fn is_storage_empty(&self) -> bool {
        self.range().is_empty(&self.store)
    }

    fn offered(&self) -> Vec<ItemStack> {
        distinct_kinds(self.range().iter(&self.store))
    }

    fn owner(&self) -> Option<BlockPos> {
        Some(self.position)
    }
}

/// Block entity occupying a cell
pub enum Occupant {
    Chest(Chest),
    Sided(Box<dyn SidedContainer + Send>),
    Station(Box<Station>),
}

/// Sparse reference world
#[derive(Default)]
pub struct GridWorld {
    blocks: AHashMap<BlockPos, Block>,
    occupants: AHashMap<BlockPos, Occupant>,
    items: ItemEntities,
    creatures: BTreeMap<EntityId, Creature>,
    next_creature: u64,
    redstone: AHashMap<BlockPos, u8>,
    frames: AHashMap<(BlockPos, Facing), ItemStack>,
    fishing_table: Vec<(ItemStack, f32)>,
    trails: TrailNetwork,
    pending_updates: Vec<BlockPos>,
    notifications: Vec<BlockPos>,
    time: Tick,
}

impl GridWorld {
    pub fn new() -> Self {
        Self {
            fishing_table: vec![
                (ItemStack::new(ItemKind::named("minecraft:cod"), 1), 0.6),
                (ItemStack::new(ItemKind::named("minecraft:salmon"), 1), 0.25),
                (ItemStack::new(ItemKind::named("minecraft:pufferfish"), 1), 0.13),
                (ItemStack::new(ItemKind::named("minecraft:tropical_fish"), 1), 0.02),
            ],
            ..Self::default()
        }
    }

    /// Lay a square of solid floor centred on `center`
    pub fn with_floor(mut self, center: BlockPos, radius: i32) -> Self {
        for x in -radius..=radius {
            for z in -radius..=radius {
                self.blocks
                    .insert(center + BlockPos::new(x, 0, z), Block::solid("minecraft:stone"));
            }
        }
        self
    }

    pub fn items(&self) -> &ItemEntities {
        &self.items
    }

    /// Positions passed to `notify_neighbors`, oldest first
    pub fn notifications(&self) -> &[BlockPos] {
        &self.notifications
    }

    pub fn set_redstone(&mut self, pos: BlockPos, level: u8) {
        if level == 0 {
            self.redstone.remove(&pos);
        } else {
            self.redstone.insert(pos, level.min(15));
        }
        self.pending_updates.push(pos);
    }

    pub fn set_frame(&mut self, pos: BlockPos, face: Facing, stack: ItemStack) {
        self.frames.insert((pos, face), stack);
    }

    pub fn add_creature(&mut self, species: &str, position: Vec3, food: &str) -> EntityId {
        self.next_creature += 1;
        let id = EntityId(self.next_creature);
        self.creatures.insert(
            id,
            Creature {
                id,
                species: species.to_string(),
                position,
                is_baby: false,
                food: food.to_string(),
                shearable: species == "minecraft:sheep",
            },
        );
        id
    }

    pub fn creature(&self, id: EntityId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    pub fn add_chest(&mut self, pos: BlockPos, size: usize) {
        self.blocks.insert(pos, Block::new("minecraft:chest", Material::Machine, 2.5));
        self.occupants.insert(pos, Occupant::Chest(Chest::new(pos, size)));
        self.pending_updates.push(pos);
    }

    pub fn chest(&self, pos: BlockPos) -> Option<&Chest> {
        match self.occupants.get(&pos) {
            Some(Occupant::Chest(chest)) => Some(chest),
            _ => None,
        }
    }

    pub fn chest_mut(&mut self, pos: BlockPos) -> Option<&mut Chest> {
        match self.occupants.get_mut(&pos) {
            Some(Occupant::Chest(chest)) => Some(chest),
            _ => None,
        }
    }

    pub fn add_sided(&mut self, container: Box<dyn SidedContainer + Send>) {
        let pos = container.position();
        self.blocks.insert(pos, Block::new("minecraft:furnace", Material::Machine, 3.5));
        self.occupants.insert(pos, Occupant::Sided(container));
        self.pending_updates.push(pos);
    }

    pub fn add_station(&mut self, station: Station) {
        let pos = station.position();
        self.blocks.insert(pos, Block::new("formicary:station", Material::Machine, 3.0));
        self.occupants.insert(pos, Occupant::Station(Box::new(station)));
        self.pending_updates.push(pos);
    }

    pub fn station(&self, pos: BlockPos) -> Option<&Station> {
        match self.occupants.get(&pos) {
            Some(Occupant::Station(station)) => Some(station),
            _ => None,
        }
    }

    pub fn station_mut(&mut self, pos: BlockPos) -> Option<&mut Station> {
        match self.occupants.get_mut(&pos) {
            Some(Occupant::Station(station)) => Some(station),
            _ => None,
        }
    }

    pub fn trails(&self) -> &TrailNetwork {
        &self.trails
    }

    /// Lay a trail cell and refresh the links around it
    pub fn place_trail(&mut self, pos: BlockPos, facing: Facing, waterlogged: bool) {
        let mut trails = std::mem::take(&mut self.trails);
        trails.place(self, pos, facing, waterlogged);
        self.trails = trails;
    }

    pub fn remove_trail(&mut self, pos: BlockPos) {
        let mut trails = std::mem::take(&mut self.trails);
        trails.remove(self, pos);
        self.trails = trails;
    }

    /// Advance the whole world by one tick: stations, then trails, then
    /// item entity motion
    pub fn tick(&mut self) {
        self.time += 1;

        let mut positions: Vec<BlockPos> = self
            .occupants
            .iter()
            .filter(|(_, o)| matches!(o, Occupant::Station(_)))
            .map(|(pos, _)| *pos)
            .collect();
        positions.sort_by_key(|p| (p.x, p.y, p.z));
        for pos in positions {
            // Out of the map while it runs, so it can never resolve itself
            if let Some(Occupant::Station(mut station)) = self.occupants.remove(&pos) {
                station.tick(self);
                self.occupants.insert(pos, Occupant::Station(station));
            }
        }

        let mut trails = std::mem::take(&mut self.trails);
        for pos in std::mem::take(&mut self.pending_updates) {
            trails.neighbor_changed(self, pos);
        }
        trails.tick(self);
        self.trails = trails;

        self.step_items();
    }

    fn resting_height(&self, cell: BlockPos) -> Option<f32> {
        if self.is_trail(cell) {
            Some(cell.y as f32 + TRAIL_HEIGHT)
        } else if self.is_solid(cell - Facing::Up.offset()) {
            Some(cell.y as f32)
        } else {
            None
        }
    }

    /// Gravity, collision and ground friction for every item entity
    fn step_items(&mut self) {
        let ids: Vec<EntityId> = self.items.iter().map(|e| e.id).collect();
        for id in ids {
            let Some(entity) = self.items.get(id) else {
                continue;
            };
            let (position, mut velocity) = (entity.position, entity.velocity);
            let cell = block_of(position);
            if self.is_solid(cell) {
                if let Some(e) = self.items.get_mut(id) {
                    e.position.y = (cell.y + 1) as f32;
                    e.velocity = Vec3::ZERO;
                    e.on_ground = true;
                }
                continue;
            }

            velocity.y = (velocity.y - GRAVITY).max(-TERMINAL_VELOCITY);
            let mut next = position + velocity;
            if self.is_solid(block_of(Vec3::new(next.x, position.y, position.z))) {
                next.x = position.x;
                velocity.x = 0.0;
            }
            if self.is_solid(block_of(Vec3::new(next.x, position.y, next.z))) {
                next.z = position.z;
                velocity.z = 0.0;
            }

            let mut on_ground = false;
            if let Some(rest) = self.resting_height(cell) {
                if next.y <= rest {
                    next.y = rest;
                    velocity.y = 0.0;
                    on_ground = true;
                }
            }
            let landed = block_of(next);
            if !on_ground && velocity.y < 0.0 && self.is_solid(landed) {
                next.y = (landed.y + 1) as f32;
                velocity.y = 0.0;
                on_ground = true;
            }
            if on_ground && !self.is_trail(block_of(next)) {
                velocity.x *= GROUND_FRICTION;
                velocity.z *= GROUND_FRICTION;
            }

            if let Some(e) = self.items.get_mut(id) {
                e.position = next;
                e.velocity = velocity;
                e.on_ground = on_ground;
            }
        }
    }

    fn cow_at(&self, pos: BlockPos) -> bool {
        self.creatures
            .values()
            .any(|c| c.species == "minecraft:cow" && !c.is_baby && block_of(c.position) == pos)
    }

    fn shearable_creature_at(&self, pos: BlockPos) -> Option<EntityId> {
        self.creatures
            .values()
            .find(|c| c.shearable && !c.is_baby && block_of(c.position) == pos)
            .map(|c| c.id)
    }
}

impl PortProvider for GridWorld {
    fn has_capability(&self, pos: BlockPos, _face: Facing) -> bool {
        matches!(
            self.occupants.get(&pos),
            Some(Occupant::Chest(_)) | Some(Occupant::Station(_))
        )
    }

    fn capability(&mut self, pos: BlockPos, _face: Facing) -> Option<&mut dyn ItemHandler> {
        match self.occupants.get_mut(&pos) {
            Some(Occupant::Chest(chest)) => Some(chest),
            Some(Occupant::Station(station)) => Some(station.as_mut()),
            _ => None,
        }
    }

    fn sided_container(&mut self, pos: BlockPos) -> Option<&mut dyn SidedContainer> {
        match self.occupants.get_mut(&pos) {
            Some(Occupant::Sided(container)) => Some(container.as_mut()),
            _ => None,
        }
    }
}

impl World for GridWorld {
    fn time(&self) -> Tick {
        self.time
    }

    fn block(&self, pos: BlockPos) -> Block {
        self.blocks.get(&pos).cloned().unwrap_or_else(Block::air)
    }

    fn set_block(&mut self, pos: BlockPos, block: Block) {
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
        self.pending_updates.push(pos);
    }

    fn destroy_block(&mut self, pos: BlockPos) -> Vec<ItemStack> {
        let Some(block) = self.blocks.remove(&pos) else {
            return Vec::new();
        };
        let mut drops = block.drops();
        match self.occupants.remove(&pos) {
            Some(Occupant::Chest(mut chest)) => drops.extend(chest.store.drain_all()),
            Some(Occupant::Sided(mut container)) => drops.extend(container.store_mut().drain_all()),
            Some(Occupant::Station(mut station)) => drops.extend(station.on_removed()),
            None => {}
        }
        self.trails.forget(pos);
        self.pending_updates.push(pos);
        drops
    }

    fn break_time(&self, pos: BlockPos, tool: &ItemStack) -> Option<u32> {
        let block = self.blocks.get(&pos)?;
        if block.hardness < 0.0 || block.is_air() {
            return None;
        }
        let mut ticks = block.hardness * BREAK_TICKS_PER_HARDNESS;
        let suited = match block.material {
            Material::Ore | Material::Solid => tool.id().ends_with("_pickaxe"),
            Material::Log => tool.id().ends_with("_axe"),
            _ => false,
        };
        if suited {
            ticks /= TOOL_SPEEDUP;
        }
        Some((ticks.ceil() as u32).max(1))
    }

    fn place_item(&mut self, pos: BlockPos, stack: &ItemStack) -> bool {
        if stack.is_empty() || self.blocks.contains_key(&pos) {
            return false;
        }
        let block = if stack.id().ends_with("_sapling") {
            Block::new(stack.id().to_string(), Material::Sapling, 0.0)
        } else {
            Block::new(stack.id().to_string(), Material::Solid, 1.5)
        };
        self.set_block(pos, block);
        true
    }

    fn is_fertilizable(&self, pos: BlockPos) -> bool {
        match self.blocks.get(&pos).map(|b| b.material) {
            Some(Material::Crop { age, max_age }) => age < max_age,
            Some(Material::Sapling) => true,
            _ => false,
        }
    }

    fn fertilize(&mut self, pos: BlockPos) -> bool {
        let Some(block) = self.blocks.get(&pos).cloned() else {
            return false;
        };
        match block.material {
            Material::Crop { age, max_age } if age < max_age => {
                let mut grown = block;
                grown.material = Material::Crop {
                    age: (age + 2).min(max_age),
                    max_age,
                };
                self.set_block(pos, grown);
                true
            }
            Material::Sapling => {
                let wood = block.id.replace("_sapling", "_log");
                let leaves = block.id.replace("_sapling", "_leaves");
                self.set_block(pos, Block::log(wood));
                if !self.blocks.contains_key(&(pos + Facing::Up.offset())) {
                    self.set_block(pos + Facing::Up.offset(), Block::leaves(leaves));
                }
                true
            }
            _ => false,
        }
    }

    fn harvest(&mut self, pos: BlockPos, replant: bool) -> Option<Vec<ItemStack>> {
        let block = self.blocks.get(&pos)?.clone();
        let Material::Crop { age, max_age } = block.material else {
            return None;
        };
        if age < max_age {
            return None;
        }
        let drops = block.drops();
        if replant {
            let mut young = block;
            young.material = Material::Crop { age: 0, max_age };
            self.set_block(pos, young);
        } else {
            self.set_block(pos, Block::air());
        }
        Some(drops)
    }

    fn can_shear(&self, pos: BlockPos) -> bool {
        match self.blocks.get(&pos).map(|b| b.material) {
            Some(Material::Shearable) | Some(Material::Vine) => true,
            Some(Material::Beehive { honey }) => honey >= HIVE_FULL,
            _ => self.shearable_creature_at(pos).is_some(),
        }
    }

    fn shear(&mut self, pos: BlockPos) -> Option<Vec<ItemStack>> {
        if let Some(block) = self.blocks.get(&pos).cloned() {
            match block.material {
                Material::Shearable | Material::Vine => {
                    self.set_block(pos, Block::air());
                    return Some(vec![ItemStack::new(ItemKind::named(block.id), 1)]);
                }
                Material::Beehive { honey } if honey >= HIVE_FULL => {
                    let mut emptied = block;
                    emptied.material = Material::Beehive { honey: 0 };
                    self.set_block(pos, emptied);
                    return Some(vec![ItemStack::new(ItemKind::named("minecraft:honeycomb"), 3)]);
                }
                _ => {}
            }
        }
        let id = self.shearable_creature_at(pos)?;
        let sheep = self.creatures.get_mut(&id)?;
        sheep.shearable = false;
        Some(vec![ItemStack::new(ItemKind::named("minecraft:white_wool"), 2)])
    }

    fn fluid_source(&self, pos: BlockPos) -> Option<ItemStack> {
        let filled = match self.blocks.get(&pos).map(|b| b.material) {
            Some(Material::Water { source: true }) => "minecraft:water_bucket",
            Some(Material::Lava { source: true }) => "minecraft:lava_bucket",
            _ if self.cow_at(pos) => "minecraft:milk_bucket",
            _ => return None,
        };
        Some(ItemStack::new(ItemKind::new(filled, 1), 1))
    }

    fn drain_fluid(&mut self, pos: BlockPos) -> bool {
        match self.blocks.get(&pos).map(|b| b.material) {
            Some(Material::Water { source: true }) | Some(Material::Lava { source: true }) => {
                self.set_block(pos, Block::air());
                true
            }
            _ => self.cow_at(pos),
        }
    }

    fn fishing_loot(&self, roll: f32) -> ItemStack {
        let total: f32 = self.fishing_table.iter().map(|(_, w)| w).sum();
        let mut target = roll.clamp(0.0, 1.0) * total;
        for (stack, weight) in &self.fishing_table {
            if target < *weight {
                return stack.clone();
            }
            target -= weight;
        }
        self.fishing_table
            .last()
            .map(|(stack, _)| stack.clone())
            .unwrap_or_default()
    }

    fn creatures_near(&self, center: Vec3, radius: f32) -> Vec<Creature> {
        self.creatures
            .values()
            .filter(|c| c.position.distance(center) <= radius)
            .cloned()
            .collect()
    }

    fn breed(&mut self, a: EntityId, b: EntityId) -> bool {
        let (Some(first), Some(second)) = (self.creatures.get(&a), self.creatures.get(&b)) else {
            return false;
        };
        if a == b || first.is_baby || second.is_baby || first.species != second.species {
            return false;
        }
        let mut baby = first.clone();
        self.next_creature += 1;
        baby.id = EntityId(self.next_creature);
        baby.is_baby = true;
        baby.position = (first.position + second.position) * 0.5;
        self.creatures.insert(baby.id, baby);
        true
    }

    fn redstone_power(&self, pos: BlockPos) -> u8 {
        self.redstone.get(&pos).copied().unwrap_or(0)
    }

    fn has_full_face(&self, pos: BlockPos, _face: Facing) -> bool {
        self.occupants.contains_key(&pos) || self.block(pos).material.is_full_cube()
    }

    fn frame_filter(&self, pos: BlockPos, face: Facing) -> Option<ItemStack> {
        self.frames.get(&(pos, face)).cloned()
    }

    fn spawn_item(&mut self, position: Vec3, stack: ItemStack) -> EntityId {
        self.items.spawn(position, stack)
    }

    fn items_in(&self, pos: BlockPos) -> Vec<EntityId> {
        self.items.in_cell(pos)
    }

    fn item_entity(&self, id: EntityId) -> Option<&ItemEntity> {
        self.items.get(id)
    }

    fn item_entity_mut(&mut self, id: EntityId) -> Option<&mut ItemEntity> {
        self.items.get_mut(id)
    }

    fn remove_item_entity(&mut self, id: EntityId) -> Option<ItemEntity> {
        self.items.remove(id)
    }

    fn notify_neighbors(&mut self, pos: BlockPos) {
        self.notifications.push(pos);
        self.pending_updates.push(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ItemPort;
    use glam::IVec3;

    fn stack(id: &str, n: u32) -> ItemStack {
        ItemStack::new(ItemKind::named(id.to_string()), n)
    }

    #[test]
    fn test_unset_cell_is_air() {
        let world = GridWorld::new();
        assert!(world.block(IVec3::new(4, 5, 6)).is_air());
        assert!(!world.is_solid(IVec3::new(4, 5, 6)));
    }

    #[test]
    fn test_chest_port_resolves_as_capability() {
        let mut world = GridWorld::new();
        let pos = IVec3::new(1, 0, 0);
        world.add_chest(pos, 9);
        let mut port = ItemPort::resolve(&mut world, pos, Facing::West, None);
        assert!(matches!(port, ItemPort::Handler(_)));
        assert!(port.insert(stack("minecraft:stick", 5), false).is_empty());
        assert_eq!(world.chest(pos).map(|c| c.count_of("minecraft:stick")), Some(5));
    }

    #[test]
    fn test_port_never_resolves_requester() {
        let mut world = GridWorld::new();
        let pos = IVec3::new(1, 0, 0);
        world.add_chest(pos, 9);
        let port = ItemPort::resolve(&mut world, pos, Facing::West, Some(pos));
        assert!(!port.is_present());
    }

    #[test]
    fn test_destroying_chest_drops_contents() {
        let mut world = GridWorld::new();
        let pos = IVec3::ZERO;
        world.add_chest(pos, 9);
        if let Some(chest) = world.chest_mut(pos) {
            chest.store.set(0, stack("minecraft:coal", 7));
        }
        let drops = world.destroy_block(pos);
        assert!(drops.iter().any(|s| s.is("minecraft:coal") && s.count() == 7));
        assert!(world.chest(pos).is_none());
    }

    #[test]
    fn test_harvest_replants() {
        let mut world = GridWorld::new();
        let pos = IVec3::ZERO;
        world.set_block(pos, Block::crop("minecraft:wheat", ItemKind::named("minecraft:wheat"), 7, 7));
        let drops = world.harvest(pos, true).unwrap_or_default();
        assert_eq!(drops.len(), 1);
        assert!(matches!(world.block(pos).material, Material::Crop { age: 0, .. }));
        assert!(world.harvest(pos, true).is_none());
    }

    #[test]
    fn test_pickaxe_breaks_faster() {
        let mut world = GridWorld::new();
        let pos = IVec3::ZERO;
        world.set_block(pos, Block::solid("minecraft:stone"));
        let bare = world.break_time(pos, &ItemStack::empty());
        let tooled = world.break_time(pos, &stack("minecraft:iron_pickaxe", 1));
        assert!(tooled < bare);
        world.set_block(pos, Block::bedrock());
        assert_eq!(world.break_time(pos, &ItemStack::empty()), None);
    }

    #[test]
    fn test_items_fall_onto_floor() {
        let mut world = GridWorld::new().with_floor(IVec3::ZERO, 1);
        let id = world.spawn_item(Vec3::new(0.5, 3.0, 0.5), stack("minecraft:stick", 1));
        for _ in 0..40 {
            world.tick();
        }
        let entity = world.item_entity(id).cloned();
        assert!(entity.as_ref().is_some_and(|e| e.on_ground));
        assert_eq!(entity.map(|e| block_of(e.position)), Some(IVec3::new(0, 1, 0)));
    }

    #[test]
    fn test_breed_spawns_baby() {
        let mut world = GridWorld::new();
        let a = world.add_creature("minecraft:cow", Vec3::new(0.5, 1.0, 0.5), "minecraft:wheat");
        let b = world.add_creature("minecraft:cow", Vec3::new(1.5, 1.0, 0.5), "minecraft:wheat");
        assert!(world.breed(a, b));
        assert_eq!(world.creature_count(), 3);
        assert!(!world.breed(a, a));
    }
}
