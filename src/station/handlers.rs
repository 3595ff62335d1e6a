//! World-facing handlers
//!
//! Single-shot handlers re-check feasibility against the world on every
//! step and only touch it once the cycle is complete. An infeasible step
//! parks the station in the short retry cooldown.

use rand::Rng;

use crate::core::types::{block_center, BlockPos, Facing};
use crate::felling::{fell_tree, is_trunk, FellingOptions};
use crate::inventory::InsertPolicy;
use crate::item::{ItemKind, ItemStack};
use crate::station::command::Handler;
use crate::station::state::{Phase, StationFlags};
use crate::station::Station;
use crate::world::{Creature, Material, World};

/// Compost level at which a result item is produced
pub const COMPOST_FULL: u8 = 7;

const SHEARS_TIME: f32 = 40.0;
const HOE_TIME: f32 = 30.0;
const AXE_TIME: f32 = 20.0;
const DISPENSER_TIME: f32 = 20.0;
const FISHING_TIME: f32 = 100.0;
const BONE_MEAL_TIME: f32 = 20.0;
const ANIMAL_FEED_TIME: f32 = 40.0;
const COMPOSTER_TIME: f32 = 20.0;
const HOPPER_TIME: f32 = 8.0;
const BUCKET_TIME: f32 = 40.0;

/// How a finished cycle ended
enum Outcome {
    Done,
    /// Output could not take the result; try again next step
    Hold,
    /// Finished, then rest for this many ticks
    Cooldown(i32),
}

impl Station {
    /// Cycle length for a world handler at the current colony speed
    fn reluctant_time(&self, handler: &Handler, base: f32) -> i32 {
        let (lo, hi) = handler.reluctance_bounds();
        let speed = self.colony.speed_multiplier;
        let factor = if speed > 0.0 { (1.0 / speed).clamp(lo, hi) } else { hi };
        ((base * factor).ceil() as i32).max(1)
    }

    /// The work target and its four horizontal neighbours
    fn adjacent_cells(&self) -> Vec<BlockPos> {
        let target = self.work_target();
        let mut cells = vec![target];
        cells.extend(Facing::HORIZONTAL.iter().map(|f| f.step(target)));
        cells
    }

    /// Square of cells around the work target, on its layer
    fn cells_within(&self, radius: i32) -> Vec<BlockPos> {
        let target = self.work_target();
        let mut cells = Vec::new();
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                cells.push(target + BlockPos::new(dx, 0, dz));
            }
        }
        cells
    }

    /// Cube of cells around the work target
    fn volume_within(&self, radius: i32) -> Vec<BlockPos> {
        let target = self.work_target();
        let mut cells = Vec::new();
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    cells.push(target + BlockPos::new(dx, dy, dz));
                }
            }
        }
        cells
    }

    fn command_stack(&self) -> ItemStack {
        self.layout.command.get(&self.store, 0).clone()
    }

    /// Whether the handler eats input items (as opposed to acting on the world)
    fn consumes_input(handler: &Handler) -> bool {
        matches!(
            handler,
            Handler::Dispenser { .. }
                | Handler::BoneMeal { .. }
                | Handler::AnimalFeed { .. }
                | Handler::Composter { .. }
                | Handler::Hopper
        )
    }

    pub(crate) fn run_single_shot<W: World + ?Sized>(&mut self, world: &mut W, handler: &Handler, interval: u32) {
        if self.retry_step(interval) {
            return;
        }
        if !self.feasible(world, handler) {
            let flag = if Self::consumes_input(handler) {
                StationFlags::NO_INGREDIENTS
            } else {
                StationFlags::NO_RECIPE
            };
            self.state.flags.insert(flag);
            self.state.retry();
            tracing::trace!("Station at {:?} has nothing to do for {}", self.pos, handler.name());
            return;
        }
        match self.state.phase() {
            Phase::Idle => {
                let base = self.base_time(world, handler);
                self.state.max_progress = self.reluctant_time(handler, base);
                self.state.progress = 0;
            }
            Phase::Accumulating => self.advance(interval),
            Phase::Done => match self.commit(world, handler) {
                Outcome::Done => self.state.reset_cycle(),
                Outcome::Hold => self.signals.raise_output_blocked(self.config.pulse_duration),
                Outcome::Cooldown(ticks) => {
                    self.state.reset_cycle();
                    self.state.progress = -ticks.max(1);
                }
            },
            Phase::Retrying => {}
        }
    }

    fn base_time<W: World + ?Sized>(&self, world: &W, handler: &Handler) -> f32 {
        match handler {
            Handler::Shears => SHEARS_TIME,
            Handler::Hoe { .. } => HOE_TIME,
            Handler::Pickaxe { .. } => world
                .break_time(self.work_target(), &self.command_stack())
                .unwrap_or(1) as f32,
            Handler::Axe => AXE_TIME,
            Handler::Dispenser { .. } => DISPENSER_TIME,
            Handler::FishingRod => FISHING_TIME,
            Handler::BoneMeal { .. } => BONE_MEAL_TIME,
            Handler::AnimalFeed { .. } => ANIMAL_FEED_TIME,
            Handler::Composter { speed_factor } => {
                COMPOSTER_TIME / if *speed_factor > 0.0 { *speed_factor } else { 1.0 }
            }
            Handler::Hopper => HOPPER_TIME,
            _ => BUCKET_TIME,
        }
    }

    fn feasible<W: World + ?Sized>(&self, world: &W, handler: &Handler) -> bool {
        let target = self.work_target();
        match handler {
            Handler::Shears => self.adjacent_cells().into_iter().any(|p| world.can_shear(p)),
            Handler::Hoe { radius, .. } => self
                .cells_within(*radius)
                .into_iter()
                .any(|p| is_ripe(world, p)),
            Handler::Pickaxe { .. } => {
                !world.block(target).is_air() && world.break_time(target, &self.command_stack()).is_some()
            }
            Handler::Axe => is_trunk(world, target),
            Handler::Dispenser { allow_list } => {
                world.block(target).is_air() && self.placeable(allow_list).is_some()
            }
            Handler::FishingRod => self.adjacent_cells().into_iter().any(|p| world.is_open_water(p)),
            Handler::BoneMeal { radius, fertilizer, .. } => {
                self.layout.input.contains(&self.store, fertilizer)
                    && self
                        .volume_within(*radius)
                        .into_iter()
                        .any(|p| world.is_fertilizable(p))
            }
            Handler::AnimalFeed { radius, population_cap, .. } => {
                self.breeding_pair(world, *radius, *population_cap).is_some()
            }
            Handler::Composter { .. } => {
                self.state.compost_level >= COMPOST_FULL || self.compostable_slot().is_some()
            }
            Handler::Hopper => {
                !world.items_in(target).is_empty() || !self.layout.input.is_empty(&self.store)
            }
            _ => false,
        }
    }

    fn commit<W: World + ?Sized>(&mut self, world: &mut W, handler: &Handler) -> Outcome {
        let target = self.work_target();
        match handler {
            Handler::Shears => {
                let cell = self.adjacent_cells().into_iter().find(|p| world.can_shear(*p));
                if let Some(drops) = cell.and_then(|p| world.shear(p)) {
                    self.route_products(world, drops);
                }
                Outcome::Done
            }
            Handler::Hoe { radius, fertilizer } => {
                let cell = self.cells_within(*radius).into_iter().find(|p| is_ripe(world, *p));
                let Some(cell) = cell else {
                    return Outcome::Done;
                };
                if let Some(drops) = world.harvest(cell, true) {
                    self.route_products(world, drops);
                }
                if let Some(slot) = self.layout.input.find(&self.store, fertilizer) {
                    if world.fertilize(cell) {
                        self.consume_one(slot);
                    }
                }
                Outcome::Done
            }
            Handler::Pickaxe {
                drop_probability,
                ore_drops,
            } => {
                let block = world.block(target);
                let mut drops = world.destroy_block(target);
                if block.material == Material::Ore && !ore_drops.is_empty() && self.rng.gen::<f32>() < *drop_probability {
                    let pick = self.rng.gen_range(0..ore_drops.len());
                    drops.push(ItemStack::new(ItemKind::named(ore_drops[pick].clone()), 1));
                }
                tracing::debug!("Station at {:?} broke {} ({} drops)", self.pos, block.id, drops.len());
                self.route_products(world, drops);
                Outcome::Done
            }
            Handler::Axe => {
                let mut drops = Vec::new();
                let report = fell_tree(world, target, FellingOptions::default(), |_, _, stack| {
                    drops.push(stack)
                });
                tracing::debug!(
                    "Station at {:?} felled {} logs and {} leaves, resting {} ticks",
                    self.pos,
                    report.trunk,
                    report.canopy,
                    report.cost
                );
                self.route_products(world, drops);
                Outcome::Cooldown(report.cost as i32)
            }
            Handler::Dispenser { allow_list } => {
                let Some(slot) = self.placeable(allow_list) else {
                    return Outcome::Done;
                };
                let item = self.layout.input.get(&self.store, slot).copy_with_count(1);
                if world.place_item(target, &item) {
                    self.consume_one(slot);
                }
                Outcome::Done
            }
            Handler::FishingRod => {
                let roll = self.rng.gen::<f32>();
                let loot = world.fishing_loot(roll);
                if !loot.is_empty() {
                    self.route_products(world, vec![loot]);
                }
                Outcome::Done
            }
            Handler::BoneMeal {
                radius,
                batch,
                fertilizer,
            } => {
                let mut applied = 0;
                for cell in self.volume_within(*radius) {
                    if applied >= *batch {
                        break;
                    }
                    let Some(slot) = self.layout.input.find(&self.store, fertilizer) else {
                        break;
                    };
                    if world.is_fertilizable(cell) && world.fertilize(cell) {
                        self.consume_one(slot);
                        applied += 1;
                    }
                }
                tracing::trace!("Station at {:?} fertilized {} cells", self.pos, applied);
                Outcome::Done
            }
            Handler::AnimalFeed {
                radius,
                population_cap,
                cooldown,
            } => {
                let Some((a, b)) = self.breeding_pair(world, *radius, *population_cap) else {
                    return Outcome::Done;
                };
                if world.breed(a.id, b.id) {
                    let food = self.command_stack();
                    self.layout.input.extract_matching(&mut self.store, &food, 2);
                    let now = world.time();
                    self.cooldowns.insert(a.id, now, *cooldown);
                    self.cooldowns.insert(b.id, now, *cooldown);
                    tracing::debug!("Station at {:?} bred two {}", self.pos, a.species);
                }
                Outcome::Done
            }
            Handler::Composter { .. } => self.compost(),
            Handler::Hopper => self.hop(world),
            _ => Outcome::Done,
        }
    }

    fn consume_one(&mut self, slot: usize) {
        let mut stack = self.layout.input.get(&self.store, slot).clone();
        stack.shrink(1);
        self.layout.input.set(&mut self.store, slot, stack);
    }

    /// First input slot holding an allow-listed item
    fn placeable(&self, allow_list: &[String]) -> Option<usize> {
        self.layout
            .input
            .iter(&self.store)
            .position(|s| !s.is_empty() && allow_list.iter().any(|id| s.is(id)))
    }

    fn compostable_slot(&self) -> Option<usize> {
        self.layout
            .input
            .iter(&self.store)
            .position(|s| !s.is_empty() && self.recipes.compost_chance(s).is_some())
    }

    /// Two adults of one species near the target, neither resting, fed with
    /// the command item, while the area is below its population cap
    fn breeding_pair<W: World + ?Sized>(&self, world: &W, radius: f32, cap: usize) -> Option<(Creature, Creature)> {
        let food = self.command_stack();
        if food.is_empty() || self.layout.input.count_of(&self.store, food.id()) < 2 {
            return None;
        }
        let creatures = world.creatures_near(block_center(self.work_target()), radius);
        if creatures.len() >= cap {
            return None;
        }
        let now = world.time();
        let mut ready: Vec<&Creature> = creatures
            .iter()
            .filter(|c| !c.is_baby && c.food == food.id() && !self.cooldowns.is_cooling(c.id, now))
            .collect();
        ready.sort_by_key(|c| c.id);
        for (i, first) in ready.iter().enumerate() {
            if let Some(second) = ready[i + 1..].iter().find(|c| c.species == first.species) {
                return Some(((*first).clone(), (*second).clone()));
            }
        }
        None
    }

    fn compost(&mut self) -> Outcome {
        if self.state.compost_level >= COMPOST_FULL {
            return self.empty_composter();
        }
        let Some(slot) = self.compostable_slot() else {
            return Outcome::Done;
        };
        let item = self.layout.input.get(&self.store, slot).clone();
        let chance = self.recipes.compost_chance(&item).unwrap_or(0.0);
        self.consume_one(slot);
        if self.rng.gen::<f32>() < chance {
            self.state.compost_level += 1;
            tracing::trace!("Station at {:?} compost level {}", self.pos, self.state.compost_level);
            if self.state.compost_level >= COMPOST_FULL {
                self.empty_composter();
            }
        }
        Outcome::Done
    }

    fn empty_composter(&mut self) -> Outcome {
        let result = ItemStack::new(ItemKind::named(self.config.compost_result_item.clone()), 1);
        let rest = self.layout.output.insert(&mut self.store, result, InsertPolicy::default());
        if !rest.is_empty() {
            return Outcome::Hold;
        }
        self.state.compost_level = 0;
        Outcome::Done
    }

    /// Collect loose items above the station, then move one input stack on
    fn hop<W: World + ?Sized>(&mut self, world: &mut W) -> Outcome {
        let mut collected = false;
        for id in world.items_in(self.work_target()) {
            let Some(entity) = world.item_entity(id) else {
                continue;
            };
            let stack = entity.stack.clone();
            let rest = self.layout.input.insert(&mut self.store, stack.clone(), InsertPolicy::default());
            if rest.count() == stack.count() {
                continue;
            }
            collected = true;
            if rest.is_empty() {
                world.remove_item_entity(id);
            } else if let Some(entity) = world.item_entity_mut(id) {
                entity.stack = rest;
            }
        }

        let input = self.layout.input.clone();
        let moved = (0..input.len())
            .find(|i| !input.get(&self.store, *i).is_empty())
            .map(|i| input.move_slot(&mut self.store, i, &self.layout.output))
            .unwrap_or(false);
        if moved || collected {
            Outcome::Done
        } else {
            Outcome::Hold
        }
    }

    pub(crate) fn run_bucket<W: World + ?Sized>(&mut self, world: &mut W, empty_item: &str, interval: u32) {
        if self.retry_step(interval) {
            return;
        }
        let source = self.adjacent_cells().into_iter().find(|p| world.fluid_source(*p).is_some());
        match self.state.phase() {
            Phase::Idle if self.state.has(StationFlags::POWERED) => {}
            Phase::Idle => {
                let Some(slot) = self.layout.input.find(&self.store, empty_item) else {
                    self.state.flags.insert(StationFlags::NO_INGREDIENTS);
                    self.state.retry();
                    return;
                };
                if source.is_none() {
                    self.state.flags.insert(StationFlags::NO_RECIPE);
                    self.state.retry();
                    return;
                }
                let bucket = self.layout.input.get(&self.store, slot).copy_with_count(1);
                let rest = self.layout.grid.insert(&mut self.store, bucket, InsertPolicy::default());
                if !rest.is_empty() {
                    self.signals.raise_output_blocked(self.config.pulse_duration);
                    return;
                }
                self.consume_one(slot);
                let handler = Handler::Bucket {
                    empty_item: empty_item.to_string(),
                };
                self.state.max_progress = self.reluctant_time(&handler, BUCKET_TIME);
                self.state.progress = 0;
                self.store.mark_dirty();
            }
            Phase::Accumulating => self.advance(interval),
            Phase::Done => {
                let filled = source.and_then(|p| world.fluid_source(p).map(|stack| (p, stack)));
                let Some((cell, filled)) = filled else {
                    self.state.flags.insert(StationFlags::NO_RECIPE);
                    self.state.retry();
                    return;
                };
                let mut staged = self.store.clone();
                let bucket = ItemStack::new(ItemKind::named(empty_item.to_string()), 1);
                if self.layout.grid.extract_matching(&mut staged, &bucket, 1).is_empty() {
                    self.state.retry();
                    return;
                }
                if !self.emit(&mut staged, vec![filled]) {
                    self.signals.raise_output_blocked(self.config.pulse_duration);
                    return;
                }
                if !world.drain_fluid(cell) {
                    self.state.retry();
                    return;
                }
                self.store = staged;
                self.store.mark_dirty();
                self.state.reset_cycle();
                tracing::debug!("Station at {:?} filled a bucket at {:?}", self.pos, cell);
            }
            Phase::Retrying => {}
        }
    }
}

/// A crop ready for harvest
fn is_ripe<W: World + ?Sized>(world: &W, pos: BlockPos) -> bool {
    matches!(world.block(pos).material, Material::Crop { age, max_age } if age >= max_age)
}
