//! Item movement at the station boundary: output flush, input pull and
//! passthrough of items the active handler has no use for

use std::sync::Arc;

use crate::item::ItemStack;
use crate::port::ItemPort;
use crate::recipes::RecipeCategory;
use crate::station::command::Handler;
use crate::station::Station;
use crate::world::World;

impl Station {
    /// Whether `handler` could ever use `stack` from the input
    pub(crate) fn consumes(&self, handler: &Handler, stack: &ItemStack) -> bool {
        let recipes = &self.recipes;
        match handler {
            Handler::Crafting { .. } => recipes.is_ingredient(RecipeCategory::Crafting, stack),
            Handler::Furnace { category, .. } => {
                recipes.is_ingredient(*category, stack) || recipes.fuel(category.fuel_category(), stack).is_some()
            }
            Handler::Brewing { .. } => {
                recipes.is_ingredient(RecipeCategory::Brewing, stack)
                    || recipes
                        .fuel(RecipeCategory::Brewing.fuel_category(), stack)
                        .is_some()
            }
            Handler::Grindstone { .. } => recipes.is_ingredient(RecipeCategory::Grindstone, stack),
            Handler::Composter { .. } => recipes.compost_chance(stack).is_some(),
            Handler::Bucket { empty_item } => stack.is(empty_item),
            Handler::Dispenser { allow_list } => allow_list.iter().any(|id| stack.is(id)),
            Handler::BoneMeal { fertilizer, .. } | Handler::Hoe { fertilizer, .. } => stack.is(fertilizer),
            Handler::AnimalFeed { .. } => stack.is(self.layout.command.get(&self.store, 0).id()),
            Handler::Hopper => true,
            Handler::Shears | Handler::Pickaxe { .. } | Handler::Axe | Handler::FishingRod => false,
        }
    }

    /// Move one input stack the handler cannot use to output
    pub(crate) fn passthrough(&mut self, handler: Option<&Handler>) {
        let recipes = Arc::clone(&self.recipes);
        let reserved = recipes.by_id(&self.state.last_recipe_id);
        let input = self.layout.input.clone();
        for index in 0..input.len() {
            let stack = input.get(&self.store, index).clone();
            if stack.is_empty() || stack.is(&self.config.boost_item) || stack.is(&self.config.population_item) {
                continue;
            }
            if reserved.is_some_and(|recipe| recipe.uses(&stack)) {
                continue;
            }
            if handler.is_some_and(|h| self.consumes(h, &stack)) {
                continue;
            }
            if input.move_slot(&mut self.store, index, &self.layout.output) {
                tracing::trace!("Station at {:?} passed {} through", self.pos, stack.id());
                return;
            }
        }
    }

    /// Push output through the front port, or drop it onto an empty trail
    pub(crate) fn flush_output<W: World + ?Sized>(&mut self, world: &mut W) {
        let output = self.layout.output.clone();
        if output.is_empty(&self.store) {
            return;
        }
        let front = self.front();
        let mut port = ItemPort::resolve(&mut *world, front, self.facing.opposite(), Some(self.pos));
        if port.is_present() {
            let mut blocked = false;
            for index in 0..output.len() {
                let stack = output.take(&mut self.store, index);
                if stack.is_empty() {
                    continue;
                }
                let rest = port.insert(stack, false);
                blocked |= !rest.is_empty();
                output.set(&mut self.store, index, rest);
            }
            if blocked {
                self.signals.raise_output_blocked(self.config.pulse_duration);
            }
            return;
        }
        drop(port);

        if world.is_trail(front) && world.items_in(front).is_empty() {
            let first = (0..output.len()).find(|i| !output.get(&self.store, *i).is_empty());
            if let Some(index) = first {
                let stack = output.take(&mut self.store, index);
                tracing::trace!("Station at {:?} put {} x{} on the trail", self.pos, stack.id(), stack.count());
                world.spawn_item(self.trail_spawn_point(), stack);
            }
        }
    }

    /// Pull up to `input_pull_amount` items through the back port
    pub(crate) fn pull_input<W: World + ?Sized>(&mut self, world: &mut W) {
        let amount = self.config.input_pull_amount.max(1);
        let mut port = ItemPort::resolve(&mut *world, self.back(), self.facing, Some(self.pos));
        if !port.is_present() || !port.allows_extraction() {
            return;
        }
        let mut templates = port.offered();
        if templates.is_empty() {
            templates.push(ItemStack::empty());
        }
        let mut pick = None;
        let mut refused = false;
        for template in templates {
            let probe = port.extract(&template, amount, true);
            if probe.is_empty() {
                continue;
            }
            let fits = probe.count() - self.accept(probe.clone(), true).count();
            if fits > 0 {
                pick = Some((probe, fits));
                break;
            }
            refused = true;
        }
        let Some((probe, fits)) = pick else {
            if refused {
                self.signals.raise_input_blocked(self.config.pulse_duration);
            }
            return;
        };
        let taken = port.extract(&probe, fits, false);
        let rest = self.accept(taken, false);
        let rest = port.insert(rest, false);
        drop(port);
        if !rest.is_empty() {
            self.route_products(world, vec![rest]);
        }
    }
}
