//! Cycle protocols
//!
//! Two-phase (furnace family, brewing, grindstone):
//! - phase A picks a primary ingredient not reserved as fuel, banks enough
//!   fuel from the other input stacks, stages the ingredients into scratch
//!   and commits a cycle;
//! - phase B turns the staged ingredients into the result and moves result
//!   plus leftovers to output in one step, holding at the boundary while the
//!   output cannot take everything.
//!
//! Crafting stages the exact grid placement instead and re-derives the
//! result from the grid when the cycle finishes.

use std::sync::Arc;

use crate::inventory::{InsertPolicy, SlotStore};
use crate::item::ItemStack;
use crate::recipes::{Recipe, RecipeCategory};
use crate::station::state::{Phase, StationFlags};
use crate::station::Station;

/// Fixed crafting overhead in ticks
const CRAFT_BASE_TIME: u32 = 60;
/// Crafting ticks per staged item
const CRAFT_TIME_PER_ITEM: u32 = 4;

/// Fuel a cycle of `time` ticks needs at the given speed multiplier
pub fn fuel_needed(time: u32, speed: f32) -> u32 {
    ((1.0 + speed.max(0.0)) * time as f32).ceil() as u32
}

/// Cycle length after a category speed factor
pub fn scaled_time(time: u32, speed_factor: f32) -> i32 {
    let factor = if speed_factor > 0.0 { speed_factor } else { 1.0 };
    ((time as f32 / factor).ceil() as i32).max(1)
}

impl Station {
    /// Count a retry cooldown down. Returns true while still cooling; on
    /// reaching zero the scratch range is flushed and the caller may start
    /// a new cycle.
    pub(crate) fn retry_step(&mut self, interval: u32) -> bool {
        if self.state.progress >= 0 {
            return false;
        }
        self.state.progress = (self.state.progress + interval as i32).min(0);
        if self.state.progress < 0 {
            return true;
        }
        self.state.flags.remove(StationFlags::FAILURES);
        self.flush_scratch();
        false
    }

    /// Advance a running cycle. Redstone power holds a cycle that has not
    /// really started yet; new cycles are not started while powered.
    pub(crate) fn advance(&mut self, interval: u32) {
        let progress = self.state.progress;
        if progress <= 1 && self.state.has(StationFlags::POWERED) {
            return;
        }
        let step = ((1.0 + self.colony.speed_multiplier) * interval as f32).round() as i32;
        self.state.progress = (progress + step.max(interval as i32)).min(self.state.max_progress);
    }

    /// Put every product into `staged`'s output; false if anything is left
    pub(crate) fn emit(&self, staged: &mut SlotStore, products: Vec<ItemStack>) -> bool {
        products.into_iter().all(|product| {
            self.layout
                .output
                .insert(staged, product, InsertPolicy::default())
                .is_empty()
        })
    }

    fn inputs(&self) -> Vec<ItemStack> {
        self.layout.input.stacks(&self.store).to_vec()
    }

    /// Flag why no cycle could start from `inputs`
    fn flag_no_match(&mut self, category: RecipeCategory, inputs: &[ItemStack]) {
        let recipes = Arc::clone(&self.recipes);
        let known = inputs
            .iter()
            .any(|s| !s.is_empty() && recipes.is_ingredient(category, s));
        let flag = if known {
            StationFlags::NO_INGREDIENTS
        } else {
            StationFlags::NO_RECIPE
        };
        self.state.flags.insert(flag);
    }

    pub(crate) fn run_two_phase(&mut self, category: RecipeCategory, fueled: bool, speed_factor: f32, interval: u32) {
        if self.retry_step(interval) {
            return;
        }
        match self.state.phase() {
            Phase::Idle if self.state.has(StationFlags::POWERED) => {}
            Phase::Idle => self.start_recipe(category, fueled, speed_factor),
            Phase::Accumulating => self.advance(interval),
            Phase::Done => self.finish_recipe(),
            Phase::Retrying => {}
        }
    }

    /// Phase A
    fn start_recipe(&mut self, category: RecipeCategory, fueled: bool, speed_factor: f32) {
        let inputs = self.inputs();
        if inputs.iter().all(ItemStack::is_empty) {
            self.state.flags.insert(StationFlags::NO_INGREDIENTS);
            return;
        }
        let recipes = Arc::clone(&self.recipes);
        let mut candidates = recipes.lookup(category, &inputs);
        if candidates.is_empty() {
            self.flag_no_match(category, &inputs);
            return;
        }
        let locked = self.state.last_recipe_id.clone();
        candidates.sort_by_key(|r| r.id != locked);

        let fuel_category = category.fuel_category();
        let speed = self.colony.speed_multiplier;
        let mut chosen: Option<(&Recipe, u32)> = None;
        for recipe in candidates {
            let needed = if fueled { fuel_needed(recipe.time, speed) } else { 0 };
            let primary = recipe
                .primary()
                .and_then(|ingredient| inputs.iter().find(|s| !s.is_empty() && ingredient.matches(s)));
            let Some(primary) = primary else {
                continue;
            };
            // A fuel-valued primary is only usable if something else can burn
            if fueled && self.state.fuel_left < needed && recipes.fuel(fuel_category, primary).is_some() {
                let other_fuel = inputs
                    .iter()
                    .any(|s| !s.is_empty() && !recipe.uses(s) && recipes.fuel(fuel_category, s).is_some());
                if !other_fuel {
                    continue;
                }
            }
            chosen = Some((recipe, needed));
            break;
        }
        let Some((recipe, needed)) = chosen else {
            self.state.flags.insert(StationFlags::NO_INGREDIENTS);
            return;
        };

        if self.state.fuel_left < needed {
            let before = self.state.fuel_left;
            self.gather_fuel(recipe, fuel_category, needed);
            if self.state.fuel_left < needed {
                self.state.flags.insert(StationFlags::NO_FUEL);
                if self.state.fuel_left != before {
                    self.store.mark_dirty();
                }
                tracing::trace!(
                    "Station at {:?} short of fuel for {}: {}/{}",
                    self.pos,
                    recipe.id,
                    self.state.fuel_left,
                    needed
                );
                return;
            }
        }

        let cells = recipe.ingredients.iter().filter(|i| !i.is_blank()).count();
        if self.layout.grid.free_slots(&self.store) < cells {
            self.signals.raise_output_blocked(self.config.pulse_duration);
            return;
        }
        self.stage_ingredients(recipe);

        self.state.fuel_left -= needed;
        self.state.max_progress = scaled_time(recipe.time, speed_factor);
        self.state.progress = 0;
        self.state.last_recipe_id = recipe.id.clone();
        self.state.flags.remove(StationFlags::FAILURES);
        self.store.mark_dirty();
        tracing::debug!(
            "Station at {:?} started {} ({} ticks, {} fuel banked)",
            self.pos,
            recipe.id,
            self.state.max_progress,
            self.state.fuel_left
        );
    }

    /// Burn non-ingredient input stacks, one unit at a time, until `needed`
    /// fuel is banked or the input is exhausted
    fn gather_fuel(&mut self, recipe: &Recipe, fuel_category: RecipeCategory, needed: u32) {
        let recipes = Arc::clone(&self.recipes);
        let input = self.layout.input.clone();
        for index in 0..input.len() {
            while self.state.fuel_left < needed {
                let stack = input.get(&self.store, index).clone();
                if stack.is_empty() || recipe.uses(&stack) {
                    break;
                }
                let Some(fuel) = recipes.fuel(fuel_category, &stack) else {
                    break;
                };
                if !fuel.byproduct.is_empty() && !self.can_hold(&fuel.byproduct) {
                    break;
                }
                let mut rest = stack;
                rest.shrink(1);
                input.set(&mut self.store, index, rest);
                self.state.fuel_left += fuel.burn;
                if !fuel.byproduct.is_empty() {
                    self.stash(fuel.byproduct);
                }
            }
            if self.state.fuel_left >= needed {
                break;
            }
        }
    }

    /// Whether output or scratch can take `stack`
    fn can_hold(&mut self, stack: &ItemStack) -> bool {
        let probe = InsertPolicy::default().simulated();
        self.layout.output.insert(&mut self.store, stack.clone(), probe).is_empty()
            || self.layout.grid.insert(&mut self.store, stack.clone(), probe).is_empty()
    }

    /// Byproduct to output, else staged in scratch
    fn stash(&mut self, stack: ItemStack) {
        let rest = self.layout.output.insert(&mut self.store, stack, InsertPolicy::default());
        let rest = self.layout.grid.insert(&mut self.store, rest, InsertPolicy::default());
        debug_assert!(rest.is_empty(), "byproduct checked before burning");
    }

    /// Move every ingredient of `recipe` from input into scratch
    fn stage_ingredients(&mut self, recipe: &Recipe) {
        let input = self.layout.input.clone();
        let grid = self.layout.grid.clone();
        for ingredient in recipe.ingredients.iter().filter(|i| !i.is_blank()) {
            let mut remaining = ingredient.count.max(1);
            while remaining > 0 {
                let template = input
                    .iter(&self.store)
                    .find(|s| !s.is_empty() && ingredient.matches(s))
                    .cloned();
                let Some(template) = template else {
                    break;
                };
                let taken = input.extract_matching(&mut self.store, &template, remaining);
                if taken.is_empty() {
                    break;
                }
                remaining -= taken.count();
                let rest = grid.insert(&mut self.store, taken, InsertPolicy::default());
                let rest = input.insert(&mut self.store, rest, InsertPolicy::default());
                debug_assert!(rest.is_empty(), "staged items must fit back");
            }
        }
    }

    /// Phase B
    fn finish_recipe(&mut self) {
        let recipes = Arc::clone(&self.recipes);
        let Some(recipe) = recipes.by_id(&self.state.last_recipe_id) else {
            tracing::debug!(
                "Station at {:?} lost recipe '{}', returning staged items",
                self.pos,
                self.state.last_recipe_id
            );
            self.state.last_recipe_id.clear();
            self.state.flags.insert(StationFlags::NO_RECIPE);
            self.state.reset_cycle();
            self.flush_scratch();
            return;
        };

        let mut staged = self.store.clone();
        let grid = self.layout.grid.clone();
        for ingredient in recipe.ingredients.iter().filter(|i| !i.is_blank()) {
            let mut remaining = ingredient.count.max(1);
            while remaining > 0 {
                let template = grid
                    .iter(&staged)
                    .find(|s| !s.is_empty() && ingredient.matches(s))
                    .cloned();
                let Some(template) = template else {
                    break;
                };
                remaining -= grid.extract_matching(&mut staged, &template, remaining).count();
            }
            if remaining > 0 {
                // Someone took staged items; start over
                self.state.retry();
                return;
            }
        }

        let mut products = vec![recipe.result.clone()];
        products.extend(recipe.byproducts.iter().cloned());
        products.extend(grid.clear(&mut staged));
        if !self.emit(&mut staged, products) {
            self.signals.raise_output_blocked(self.config.pulse_duration);
            return;
        }
        self.store = staged;
        self.store.mark_dirty();
        self.state.reset_cycle();
        tracing::debug!("Station at {:?} finished {}", self.pos, recipe.id);
    }

    pub(crate) fn run_crafting(&mut self, speed_factor: f32, interval: u32) {
        if self.retry_step(interval) {
            return;
        }
        match self.state.phase() {
            Phase::Idle if self.state.has(StationFlags::POWERED) => {}
            Phase::Idle => self.start_crafting(speed_factor),
            Phase::Accumulating => self.advance(interval),
            Phase::Done => self.finish_crafting(),
            Phase::Retrying => {}
        }
    }

    fn start_crafting(&mut self, speed_factor: f32) {
        if !self.layout.grid.is_empty(&self.store) && !self.flush_scratch() {
            self.signals.raise_output_blocked(self.config.pulse_duration);
            return;
        }
        let inputs = self.inputs();
        if inputs.iter().all(ItemStack::is_empty) {
            self.state.flags.insert(StationFlags::NO_INGREDIENTS);
            return;
        }
        let recipes = Arc::clone(&self.recipes);
        let mut candidates = recipes.lookup(RecipeCategory::Crafting, &inputs);
        let locked = self.state.last_recipe_id.clone();
        candidates.sort_by_key(|r| r.id != locked);
        let Some(recipe) = candidates.first().copied() else {
            self.flag_no_match(RecipeCategory::Crafting, &inputs);
            return;
        };

        let input = self.layout.input.clone();
        let grid = self.layout.grid.clone();
        let width = grid.columns();
        for (i, ingredient) in recipe.ingredients.iter().enumerate() {
            if ingredient.is_blank() {
                continue;
            }
            let cell = if recipe.is_shaped() {
                (i / recipe.width) * width + i % recipe.width
            } else {
                i
            };
            let template = input
                .iter(&self.store)
                .find(|s| !s.is_empty() && ingredient.matches(s))
                .cloned();
            if let Some(template) = template {
                let taken = input.extract_matching(&mut self.store, &template, 1);
                grid.set(&mut self.store, cell, taken);
            }
        }

        let staged = grid.total_count(&self.store);
        self.state.max_progress = scaled_time(CRAFT_BASE_TIME + CRAFT_TIME_PER_ITEM * staged, speed_factor);
        self.state.progress = 0;
        self.state.last_recipe_id = recipe.id.clone();
        self.state.flags.remove(StationFlags::FAILURES);
        self.store.mark_dirty();
        tracing::debug!(
            "Station at {:?} laid out {} ({} items, {} ticks)",
            self.pos,
            recipe.id,
            staged,
            self.state.max_progress
        );
    }

    fn finish_crafting(&mut self) {
        let recipes = Arc::clone(&self.recipes);
        let grid_stacks = self.layout.grid.stacks(&self.store).to_vec();
        let Some(recipe) = recipes.craft(&grid_stacks) else {
            tracing::debug!("Station at {:?} grid no longer forms a recipe", self.pos);
            self.state.flags.insert(StationFlags::NO_RECIPE);
            self.state.retry();
            return;
        };

        let mut staged = self.store.clone();
        self.layout.grid.clear(&mut staged);
        let mut products = vec![recipe.result.clone()];
        products.extend(recipe.byproducts.iter().cloned());
        if !self.emit(&mut staged, products) {
            self.signals.raise_output_blocked(self.config.pulse_duration);
            return;
        }
        self.store = staged;
        self.store.mark_dirty();
        self.state.last_recipe_id = recipe.id.clone();
        self.state.reset_cycle();
        tracing::debug!("Station at {:?} crafted {}", self.pos, recipe.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuel_needed_scales_with_speed() {
        assert_eq!(fuel_needed(200, 0.0), 200);
        assert_eq!(fuel_needed(200, 1.0), 400);
        assert_eq!(fuel_needed(200, 0.5), 300);
    }

    #[test]
    fn test_scaled_time() {
        assert_eq!(scaled_time(200, 1.0), 200);
        assert_eq!(scaled_time(200, 2.0), 100);
        assert_eq!(scaled_time(3, 2.0), 2);
        assert_eq!(scaled_time(0, 1.0), 1);
    }
}
