//! Station - the colony-powered multi-purpose processing engine
//!
//! The item in the command slot selects one [`Handler`]. Every processing
//! step runs, in order:
//!
//! 1. colony growth, sugar and speed
//! 2. output flush through the front port (or onto a trail)
//! 3. cancellation check (command removed or swapped)
//! 4. the handler, unless there are no ants
//! 5. passthrough of items the handler cannot use
//! 6. input pull through the back port
//! 7. insertion filter capture
//! 8. comparator update
//!
//! Freshly produced output is therefore never re-consumed in the same step.

pub mod command;
pub mod cooldown;
mod handlers;
pub mod layout;
mod passthrough;
pub mod persist;
mod protocol;
pub mod signals;
pub mod state;

pub use command::{CommandBindings, Handler};
pub use handlers::COMPOST_FULL;
pub use cooldown::CooldownMap;
pub use layout::{RangeId, StationLayout, TOTAL_SLOTS};
pub use persist::StationSnapshot;
pub use signals::{comparator_level, Signals};
pub use state::{Phase, ProcessState, StationFlags, RETRY_COOLDOWN};

use std::sync::Arc;

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::colony::Colony;
use crate::core::config::StationConfig;
use crate::core::error::Result;
use crate::core::types::{block_center, BlockPos, Facing};
use crate::inventory::{InsertPolicy, SlotRange, SlotStore};
use crate::item::ItemStack;
use crate::port::ItemHandler;
use crate::recipes::{RecipeBook, RecipeCategory};
use crate::world::World;

/// Recipe book shared between stations
pub type SharedRecipes = Arc<dyn RecipeBook + Send + Sync>;

fn seed_for(pos: BlockPos) -> u64 {
    (pos.x as i64 as u64).wrapping_mul(73_856_093)
        ^ (pos.y as i64 as u64).wrapping_mul(19_349_663)
        ^ (pos.z as i64 as u64).wrapping_mul(83_492_791)
}

/// One station block entity
pub struct Station {
    pos: BlockPos,
    facing: Facing,
    config: Arc<StationConfig>,
    recipes: SharedRecipes,
    bindings: Arc<CommandBindings>,
    layout: StationLayout,
    store: SlotStore,
    colony: Colony,
    state: ProcessState,
    signals: Signals,
    cooldowns: CooldownMap,
    rng: ChaCha8Rng,
    /// World ticks until the next processing step
    timer: u32,
    steps: u64,
    /// Input slot occupancy at the last filter capture
    occupancy: Vec<bool>,
    /// Command item id the running cycle belongs to
    active_command: Option<String>,
}

impl Station {
    /// Create a station with bindings built from `config`
    pub fn new(pos: BlockPos, facing: Facing, config: Arc<StationConfig>, recipes: SharedRecipes) -> Result<Self> {
        let bindings = Arc::new(CommandBindings::from_config(&config)?);
        Ok(Self::with_bindings(pos, facing, config, recipes, bindings))
    }

    pub fn with_bindings(
        pos: BlockPos,
        facing: Facing,
        config: Arc<StationConfig>,
        recipes: SharedRecipes,
        bindings: Arc<CommandBindings>,
    ) -> Self {
        Self {
            pos,
            facing,
            layout: StationLayout::new(&config),
            store: SlotStore::new(TOTAL_SLOTS),
            colony: Colony::new(),
            state: ProcessState::default(),
            signals: Signals::default(),
            cooldowns: CooldownMap::new(config.cooldown_capacity),
            rng: ChaCha8Rng::seed_from_u64(seed_for(pos)),
            timer: 0,
            steps: 0,
            occupancy: vec![false; layout::INPUT_SIZE],
            active_command: None,
            config,
            recipes,
            bindings,
        }
    }

    /// Reseed the random source (drop chances, compost, fishing)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn position(&self) -> BlockPos {
        self.pos
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    pub fn layout(&self) -> &StationLayout {
        &self.layout
    }

    pub fn colony(&self) -> &Colony {
        &self.colony
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn cooldowns(&self) -> &CooldownMap {
        &self.cooldowns
    }

    pub fn has_flag(&self, flag: StationFlags) -> bool {
        self.state.has(flag)
    }

    pub fn stack(&self, range: RangeId, index: usize) -> &ItemStack {
        self.layout.range(range).get(&self.store, index)
    }

    /// Items of `id` held in `range`
    pub fn count_in(&self, range: RangeId, id: &str) -> u32 {
        self.layout.range(range).count_of(&self.store, id)
    }

    /// The handler the command slot currently selects
    pub fn handler(&self) -> Option<&Handler> {
        self.bindings.resolve(self.layout.command.get(&self.store, 0))
    }

    /// Cell the world handlers act on
    pub fn work_target(&self) -> BlockPos {
        Facing::Up.step(self.pos)
    }

    /// Output side
    pub fn front(&self) -> BlockPos {
        self.facing.step(self.pos)
    }

    /// Input side
    pub fn back(&self) -> BlockPos {
        self.facing.opposite().step(self.pos)
    }

    /// Advance by one world tick; processing runs every `tick_interval` ticks
    pub fn tick<W: World + ?Sized>(&mut self, world: &mut W) {
        self.signals.decay(1);
        self.check_cancellation();
        if self.timer == 0 {
            let interval = self.config.tick_interval.max(1);
            self.timer = interval - 1;
            self.process(world, interval);
        } else {
            self.timer -= 1;
        }
        self.signals.publish(world, self.pos);
    }

    /// Run one processing step covering `interval` world ticks
    pub fn process<W: World + ?Sized>(&mut self, world: &mut W, interval: u32) {
        self.steps += 1;

        let processing = self.state.max_progress > 0;
        self.colony.tick(
            interval,
            &self.layout.pen,
            &self.layout.input,
            &mut self.store,
            &self.config,
            processing,
        );
        self.state.flags.set(StationFlags::SUGARED, self.colony.is_sugared());
        self.state.flags.set(StationFlags::POWERED, world.redstone_power(self.pos) > 0);

        self.flush_output(world);
        self.check_cancellation();

        let bindings = Arc::clone(&self.bindings);
        let handler = bindings.resolve(self.layout.command.get(&self.store, 0));
        self.state.flags.set(StationFlags::NO_ANTS, !self.colony.is_working());
        if let Some(handler) = handler {
            if self.colony.is_working() {
                self.run_handler(world, handler, interval);
            } else if self.state.progress > 0 {
                self.state.progress = (self.state.progress - interval as i32).max(0);
            }
        }

        let every = self.config.passthrough_interval.max(1) as u64;
        if self.steps % every == 0 && !self.state.has(StationFlags::NO_PASSTHROUGH) {
            self.passthrough(handler);
        }

        self.pull_input(world);
        self.capture_filters();
        self.signals
            .set_comparator(comparator_level(&self.layout.output, &self.store));
    }

    /// Single dispatch point for the active handler
    fn run_handler<W: World + ?Sized>(&mut self, world: &mut W, handler: &Handler, interval: u32) {
        if self.state.phase() != Phase::Retrying {
            self.state.flags.remove(StationFlags::FAILURES);
        }
        match handler {
            Handler::Crafting { speed_factor } => self.run_crafting(*speed_factor, interval),
            Handler::Furnace { category, speed_factor } => {
                self.run_two_phase(*category, true, *speed_factor, interval)
            }
            Handler::Brewing { speed_factor } => {
                self.run_two_phase(RecipeCategory::Brewing, true, *speed_factor, interval)
            }
            Handler::Grindstone { speed_factor } => {
                self.run_two_phase(RecipeCategory::Grindstone, false, *speed_factor, interval)
            }
            Handler::Bucket { empty_item } => self.run_bucket(world, empty_item, interval),
            Handler::Composter { .. }
            | Handler::Shears
            | Handler::Dispenser { .. }
            | Handler::FishingRod
            | Handler::BoneMeal { .. }
            | Handler::Hoe { .. }
            | Handler::Pickaxe { .. }
            | Handler::Axe
            | Handler::Hopper
            | Handler::AnimalFeed { .. } => self.run_single_shot(world, handler, interval),
        }
    }

    fn has_reserved_work(&self) -> bool {
        self.state.progress != 0
            || self.state.max_progress != 0
            || self.state.fuel_left > 0
            || !self.layout.grid.is_empty(&self.store)
    }

    /// Abandon the running cycle when the command item was removed or
    /// swapped for one selecting a different handler
    fn check_cancellation(&mut self) {
        let command = self.layout.command.get(&self.store, 0);
        let current = self
            .bindings
            .resolve(command)
            .map(|_| command.id().to_string());
        let changed = current != self.active_command;
        if (changed || current.is_none()) && self.has_reserved_work() {
            self.cancel();
        }
        self.active_command = current;
    }

    /// Give back everything reserved and return to idle
    pub fn cancel(&mut self) {
        let had_progress = self.state.progress;
        self.flush_scratch();
        self.state.reset_cycle();
        self.state.fuel_left = 0;
        self.state.last_recipe_id.clear();
        self.state.flags.remove(StationFlags::FAILURES);
        self.store.mark_dirty();
        tracing::debug!("Station at {:?} cancelled cycle at progress {}", self.pos, had_progress);
    }

    /// Move scratch items to output, then input; whatever fits nowhere stays
    pub(crate) fn flush_scratch(&mut self) -> bool {
        let grid = &self.layout.grid;
        for index in 0..grid.len() {
            let stack = grid.take(&mut self.store, index);
            if stack.is_empty() {
                continue;
            }
            let rest = self.layout.output.insert(&mut self.store, stack, InsertPolicy::default());
            let rest = self.layout.input.insert(&mut self.store, rest, InsertPolicy::default());
            grid.set(&mut self.store, index, rest);
        }
        grid.is_empty(&self.store)
    }

    /// Where loose products go: input first, the ground above otherwise
    pub(crate) fn route_products<W: World + ?Sized>(&mut self, world: &mut W, stacks: Vec<ItemStack>) {
        let drop_at = block_center(self.work_target());
        for stack in stacks {
            let rest = self.layout.input.insert(&mut self.store, stack, InsertPolicy::default());
            if !rest.is_empty() {
                world.spawn_item(drop_at, rest);
            }
        }
    }

    /// Snapshot input occupancy and capture filters for slots that just
    /// became occupied
    pub(crate) fn capture_filters(&mut self) {
        let filtered = self.state.has(StationFlags::FILTERED_INSERT);
        for index in 0..self.layout.input.len() {
            let stack = self.layout.input.get(&self.store, index).clone();
            let occupied = !stack.is_empty();
            let was_occupied = self.occupancy.get(index).copied().unwrap_or(false);
            if filtered && occupied && !was_occupied && self.layout.filter.get(&self.store, index).is_empty() {
                self.layout.filter.set(&mut self.store, index, stack.copy_with_count(1));
                tracing::trace!("Station at {:?} locked input slot {} to {}", self.pos, index, stack.id());
            }
            if let Some(slot) = self.occupancy.get_mut(index) {
                *slot = occupied;
            }
        }
    }

    fn refresh_occupancy(&mut self) {
        for index in 0..self.layout.input.len() {
            let occupied = !self.layout.input.get(&self.store, index).is_empty();
            if let Some(slot) = self.occupancy.get_mut(index) {
                *slot = occupied;
            }
        }
    }

    // Operator commands

    /// Switch insertion-filter mode; returns the new state. Disabling it
    /// forgets every captured filter.
    pub fn toggle_filtered_insertion(&mut self) -> bool {
        self.state.flags.toggle(StationFlags::FILTERED_INSERT);
        let enabled = self.state.has(StationFlags::FILTERED_INSERT);
        if enabled {
            self.refresh_occupancy();
        } else {
            self.layout.filter.clear(&mut self.store);
        }
        enabled
    }

    /// Switch passthrough; returns whether it is now enabled
    pub fn toggle_passthrough(&mut self) -> bool {
        self.state.flags.toggle(StationFlags::NO_PASSTHROUGH);
        !self.state.has(StationFlags::NO_PASSTHROUGH)
    }

    /// Replace a slot. Refused when the range's validator rejects the stack
    /// or it exceeds the slot limit.
    pub fn set_slot(&mut self, range: RangeId, index: usize, stack: ItemStack) -> bool {
        let target: SlotRange = self.layout.range(range).clone();
        if index >= target.len() {
            return false;
        }
        if !stack.is_empty() && (!target.accepts(index, &stack, &self.store) || stack.count() > target.slot_limit(&stack)) {
            return false;
        }
        target.set(&mut self.store, index, stack);
        self.capture_filters();
        true
    }

    /// Remove and return a slot's stack
    pub fn take_slot(&mut self, range: RangeId, index: usize) -> ItemStack {
        let target: SlotRange = self.layout.range(range).clone();
        let stack = target.take(&mut self.store, index);
        self.capture_filters();
        stack
    }

    /// Insert as a player would: ants go to the pen, everything else into
    /// the input (filters respected). Returns the remainder.
    pub fn insert_manual(&mut self, stack: ItemStack) -> ItemStack {
        let rest = self.accept(stack, false);
        self.capture_filters();
        rest
    }

    fn accept(&mut self, stack: ItemStack, simulate: bool) -> ItemStack {
        let policy = if simulate {
            InsertPolicy::default().simulated()
        } else {
            InsertPolicy::default()
        };
        let stack = if stack.is(&self.config.population_item) {
            self.layout.pen.insert(&mut self.store, stack, policy)
        } else {
            stack
        };
        self.layout.input.insert(&mut self.store, stack, policy)
    }

    /// Block removed: every real item goes to the drop list
    pub fn on_removed(&mut self) -> Vec<ItemStack> {
        self.layout.filter.clear(&mut self.store);
        let drops = self.store.drain_all();
        self.state = ProcessState::default();
        self.colony = Colony::new();
        self.cooldowns.clear();
        tracing::debug!("Station at {:?} removed, dropping {} stacks", self.pos, drops.len());
        drops
    }

    pub(crate) fn trail_spawn_point(&self) -> Vec3 {
        let front = self.front();
        Vec3::new(
            front.x as f32 + 0.5,
            front.y as f32 + crate::trail::TRAIL_HEIGHT,
            front.z as f32 + 0.5,
        )
    }
}

/// Neighbours see the station as input on the way in and output on the way
/// out
impl ItemHandler for Station {
    fn insert(&mut self, stack: ItemStack, simulate: bool) -> ItemStack {
        let rest = self.accept(stack, simulate);
        if !simulate {
            self.capture_filters();
        }
        rest
    }

    fn extract(&mut self, template: &ItemStack, count: u32, simulate: bool) -> ItemStack {
        let output = &self.layout.output;
        let template = if template.is_empty() {
            match output.iter(&self.store).find(|s| !s.is_empty()) {
                Some(first) => first.clone(),
                None => return ItemStack::empty(),
            }
        } else {
            template.clone()
        };
        let count = count.min(template.max_stack());
        if simulate {
            return template.copy_with_count(output.available(&self.store, &template).min(count));
        }
        output.extract_matching(&mut self.store, &template, count)
    }

    fn is_storage_empty(&self) -> bool {
        self.layout.output.is_empty(&self.store)
    }

    fn offered(&self) -> Vec<ItemStack> {
        crate::port::distinct_kinds(self.layout.output.iter(&self.store))
    }

    fn owner(&self) -> Option<BlockPos> {
        Some(self.pos)
    }
}
