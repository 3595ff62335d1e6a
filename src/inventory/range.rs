//! Slot ranges - addressable views over a region of a [`SlotStore`]
//!
//! Insertion fills matching stacks first (most remaining room first), then
//! empty slots, optionally preferring empties next to slots that already hold
//! the same kind. Extraction either scans by amount or matches a template,
//! consuming the smallest partial stacks first. All operations conserve the
//! total item count of the store: whatever is not placed is handed back.

use std::fmt;
use std::sync::Arc;

use crate::inventory::store::SlotStore;
use crate::item::ItemStack;

/// Slot acceptance predicate: (range-relative slot, candidate stack, store)
pub type SlotValidator = Arc<dyn Fn(usize, &ItemStack, &SlotStore) -> bool + Send + Sync>;

/// How [`SlotRange::insert`] may place items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertPolicy {
    /// Only top up existing stacks, never occupy empty slots
    pub fillup_only: bool,
    /// Prefer empty slots next to slots already holding the kind
    pub group_stacks: bool,
    /// Place at most this many items
    pub limit: Option<u32>,
    /// Compute the remainder without mutating the store
    pub simulate: bool,
}

impl InsertPolicy {
    pub fn fillup() -> Self {
        Self {
            fillup_only: true,
            ..Self::default()
        }
    }

    pub fn grouped() -> Self {
        Self {
            group_stacks: true,
            ..Self::default()
        }
    }

    pub fn simulated(mut self) -> Self {
        self.simulate = true;
        self
    }

    pub fn limited(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Window onto a contiguous region of a slot store
#[derive(Clone)]
pub struct SlotRange {
    offset: usize,
    len: usize,
    rows: usize,
    max_stack: Option<u32>,
    validator: Option<SlotValidator>,
}

impl fmt::Debug for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRange")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("rows", &self.rows)
            .field("max_stack", &self.max_stack)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

impl SlotRange {
    pub fn new(offset: usize, len: usize) -> Self {
        Self {
            offset,
            len,
            rows: 1,
            max_stack: None,
            validator: None,
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows.max(1);
        self
    }

    /// Cap every slot of this range below the kind's own limit
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = Some(max_stack.max(1));
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(usize, &ItemStack, &SlotStore) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_zero_sized(&self) -> bool {
        self.len == 0
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.len / self.rows
    }

    /// Store index of range-relative slot `index`
    pub fn slot(&self, index: usize) -> usize {
        self.offset + index
    }

    /// Whether store index `store_index` lies inside this range
    pub fn covers(&self, store_index: usize) -> bool {
        store_index >= self.offset && store_index < self.offset + self.len
    }

    /// Per-slot limit for `stack` in this range
    pub fn slot_limit(&self, stack: &ItemStack) -> u32 {
        match self.max_stack {
            Some(cap) => cap.min(stack.max_stack()),
            None => stack.max_stack(),
        }
    }

    /// Capacity of the whole range for items of `stack`'s kind
    pub fn capacity_for(&self, stack: &ItemStack) -> u32 {
        self.slot_limit(stack) * self.len as u32
    }

    pub fn accepts(&self, index: usize, stack: &ItemStack, store: &SlotStore) -> bool {
        match &self.validator {
            Some(validator) => validator(index, stack, store),
            None => true,
        }
    }

    pub fn get<'a>(&self, store: &'a SlotStore, index: usize) -> &'a ItemStack {
        if index < self.len {
            store.get(self.slot(index))
        } else {
            store.get(usize::MAX)
        }
    }

    pub fn set(&self, store: &mut SlotStore, index: usize, stack: ItemStack) {
        if index < self.len {
            store.set(self.slot(index), stack);
        }
    }

    /// Take the whole stack out of a slot
    pub fn take(&self, store: &mut SlotStore, index: usize) -> ItemStack {
        let stack = self.get(store, index).clone();
        if !stack.is_empty() {
            self.set(store, index, ItemStack::empty());
        }
        stack
    }

    pub fn stacks<'a>(&self, store: &'a SlotStore) -> &'a [ItemStack] {
        let end = (self.offset + self.len).min(store.len());
        &store.slots()[self.offset.min(end)..end]
    }

    pub fn iter<'a>(&self, store: &'a SlotStore) -> impl Iterator<Item = &'a ItemStack> + 'a {
        self.stacks(store).iter()
    }

    pub fn is_empty(&self, store: &SlotStore) -> bool {
        self.iter(store).all(ItemStack::is_empty)
    }

    /// Every slot occupied and at its limit
    pub fn is_full(&self, store: &SlotStore) -> bool {
        self.iter(store)
            .all(|s| !s.is_empty() && s.count() >= self.slot_limit(s))
    }

    pub fn free_slots(&self, store: &SlotStore) -> usize {
        self.iter(store).filter(|s| s.is_empty()).count()
    }

    pub fn total_count(&self, store: &SlotStore) -> u32 {
        self.iter(store).map(ItemStack::count).sum()
    }

    /// Number of items with the given id
    pub fn count_of(&self, store: &SlotStore, id: &str) -> u32 {
        self.iter(store).filter(|s| s.is(id)).map(ItemStack::count).sum()
    }

    pub fn contains(&self, store: &SlotStore, id: &str) -> bool {
        self.iter(store).any(|s| s.is(id))
    }

    /// First slot holding the given id
    pub fn find(&self, store: &SlotStore, id: &str) -> Option<usize> {
        self.iter(store).position(|s| s.is(id))
    }

    /// Average fill of the slots relative to their limits, in [0, 1]
    pub fn fill_ratio(&self, store: &SlotStore) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .iter(store)
            .filter(|s| !s.is_empty())
            .map(|s| s.count() as f32 / self.slot_limit(s) as f32)
            .sum();
        (sum / self.len as f32).min(1.0)
    }

    /// Empty every slot of the range, returning the removed stacks
    pub fn clear(&self, store: &mut SlotStore) -> Vec<ItemStack> {
        (0..self.len)
            .map(|i| self.take(store, i))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Insert `stack`, returning what could not be placed
    pub fn insert(&self, store: &mut SlotStore, stack: ItemStack, policy: InsertPolicy) -> ItemStack {
        if stack.is_empty() || self.len == 0 {
            return stack;
        }
        let (plan, remaining) = self.plan_insert(store, &stack, policy);
        if !policy.simulate && !plan.is_empty() {
            for (index, amount) in plan {
                let slot = self.slot(index);
                if store.get(slot).is_empty() {
                    store.set(slot, stack.copy_with_count(amount));
                } else if let Some(existing) = store.get_mut(slot) {
                    existing.grow(amount);
                }
            }
        }
        stack.copy_with_count(remaining)
    }

    /// Work out where `stack` would go: (slot, amount) pairs plus the
    /// unplaced count. Read-only.
    fn plan_insert(&self, store: &SlotStore, stack: &ItemStack, policy: InsertPolicy) -> (Vec<(usize, u32)>, u32) {
        let total = stack.count();
        let mut remaining = policy.limit.map_or(total, |l| l.min(total));
        let withheld = total - remaining;
        let limit = self.slot_limit(stack);
        let mut plan = Vec::new();

        // 1. top up stacks of the same kind, most room first
        let mut partials: Vec<(usize, u32)> = (0..self.len)
            .filter_map(|i| {
                let existing = self.get(store, i);
                if !existing.can_stack_with(stack) || !self.accepts(i, stack, store) {
                    return None;
                }
                let room = limit.saturating_sub(existing.count());
                (room > 0).then_some((i, room))
            })
            .collect();
        partials.sort_by(|a, b| b.1.cmp(&a.1));
        for (index, room) in partials {
            if remaining == 0 {
                break;
            }
            let amount = room.min(remaining);
            plan.push((index, amount));
            remaining -= amount;
        }

        if remaining == 0 || policy.fillup_only {
            return (plan, remaining + withheld);
        }

        // 2./3. empty slots, next to the same kind first when grouping
        let mut empties: Vec<usize> = (0..self.len)
            .filter(|&i| self.get(store, i).is_empty() && self.accepts(i, stack, store))
            .collect();
        if policy.group_stacks {
            let holders: Vec<usize> = (0..self.len)
                .filter(|&i| self.get(store, i).can_stack_with(stack))
                .collect();
            if !holders.is_empty() {
                empties.sort_by_key(|&i| {
                    let distance = holders.iter().map(|&h| h.abs_diff(i)).min().unwrap_or(usize::MAX);
                    (distance, i)
                });
            }
        }
        for index in empties {
            if remaining == 0 {
                break;
            }
            let amount = limit.min(remaining);
            plan.push((index, amount));
            remaining -= amount;
        }
        (plan, remaining + withheld)
    }

    /// Extract up to `amount` items of the first non-empty kind found,
    /// accumulating from later identical stacks
    pub fn extract(&self, store: &mut SlotStore, amount: u32) -> ItemStack {
        let mut out = ItemStack::empty();
        if amount == 0 {
            return out;
        }
        for index in 0..self.len {
            let slot = self.slot(index);
            let existing = store.get(slot);
            if existing.is_empty() {
                continue;
            }
            if out.is_empty() {
                let wanted = amount.min(existing.max_stack());
                if let Some(source) = store.get_mut(slot) {
                    out = source.split(wanted);
                }
            } else if existing.can_stack_with(&out) {
                let wanted = amount.min(out.max_stack()) - out.count();
                if let Some(source) = store.get_mut(slot) {
                    let taken = source.split(wanted);
                    out.grow(taken.count());
                }
            }
            if !out.is_empty() && out.count() >= amount.min(out.max_stack()) {
                break;
            }
        }
        out
    }

    /// Extract up to `amount` items stacking with `template`, draining the
    /// smallest stacks first
    pub fn extract_matching(&self, store: &mut SlotStore, template: &ItemStack, amount: u32) -> ItemStack {
        if template.is_empty() || amount == 0 {
            return ItemStack::empty();
        }
        let mut candidates: Vec<usize> = (0..self.len)
            .filter(|&i| self.get(store, i).can_stack_with(template))
            .collect();
        candidates.sort_by_key(|&i| self.get(store, i).count());

        let mut taken_total = 0;
        for index in candidates {
            if taken_total >= amount {
                break;
            }
            if let Some(source) = store.get_mut(self.slot(index)) {
                taken_total += source.split(amount - taken_total).count();
            }
        }
        template.copy_with_count(taken_total)
    }

    /// Count of items stacking with `template` that could be extracted
    pub fn available(&self, store: &SlotStore, template: &ItemStack) -> u32 {
        self.iter(store)
            .filter(|s| s.can_stack_with(template))
            .map(ItemStack::count)
            .sum()
    }

    /// Move the stack in `index` into `target`; leftovers stay in place.
    /// Returns whether anything moved.
    pub fn move_slot(&self, store: &mut SlotStore, index: usize, target: &SlotRange) -> bool {
        if index >= self.len || target.covers(self.slot(index)) {
            return false;
        }
        let stack = self.take(store, index);
        if stack.is_empty() {
            return false;
        }
        let moved_from = stack.count();
        let remainder = target.insert(store, stack, InsertPolicy::default());
        let changed = remainder.count() != moved_from;
        self.set(store, index, remainder);
        if changed {
            store.mark_dirty();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    fn coal(n: u32) -> ItemStack {
        ItemStack::new(ItemKind::named("minecraft:coal"), n)
    }

    fn iron(n: u32) -> ItemStack {
        ItemStack::new(ItemKind::named("minecraft:iron_ore"), n)
    }

    #[test]
    fn test_insert_empty_is_noop() {
        let mut store = SlotStore::new(4);
        let range = SlotRange::new(0, 4);
        let rest = range.insert(&mut store, ItemStack::empty(), InsertPolicy::default());
        assert!(rest.is_empty());
        assert!(!store.is_dirty());
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn test_fillup_first() {
        let mut store = SlotStore::new(2);
        let range = SlotRange::new(0, 2);
        store.set(1, coal(60));

        let rest = range.insert(&mut store, coal(10), InsertPolicy::default());
        assert!(rest.is_empty());
        assert_eq!(store.get(1).count(), 64);
        assert_eq!(store.get(0).count(), 6);
    }

    #[test]
    fn test_most_room_filled_first() {
        let mut store = SlotStore::new(3);
        let range = SlotRange::new(0, 3);
        store.set(0, coal(60));
        store.set(2, coal(10));

        range.insert(&mut store, coal(5), InsertPolicy::fillup());
        assert_eq!(store.get(2).count(), 15);
        assert_eq!(store.get(0).count(), 60);
    }

    #[test]
    fn test_fillup_only_never_uses_empty_slot() {
        let mut store = SlotStore::new(2);
        let range = SlotRange::new(0, 2);
        let rest = range.insert(&mut store, coal(3), InsertPolicy::fillup());
        assert_eq!(rest.count(), 3);
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn test_grouping_prefers_adjacent_empty() {
        let mut store = SlotStore::new(6);
        let range = SlotRange::new(0, 6);
        store.set(0, iron(1));
        store.set(4, coal(64));

        range.insert(&mut store, coal(10), InsertPolicy::grouped());
        assert!(store.get(3).is("minecraft:coal"));
        assert!(store.get(1).is_empty());
    }

    #[test]
    fn test_validator_rejects() {
        let mut store = SlotStore::new(2);
        let range = SlotRange::new(0, 2).with_validator(|slot, _, _| slot == 1);
        range.insert(&mut store, coal(3), InsertPolicy::default());
        assert!(store.get(0).is_empty());
        assert_eq!(store.get(1).count(), 3);
    }

    #[test]
    fn test_max_stack_override() {
        let mut store = SlotStore::new(2);
        let range = SlotRange::new(0, 2).with_max_stack(1);
        let rest = range.insert(&mut store, coal(5), InsertPolicy::default());
        assert_eq!(rest.count(), 3);
        assert_eq!(store.get(0).count(), 1);
    }

    #[test]
    fn test_simulate_does_not_mutate() {
        let mut store = SlotStore::new(1);
        let range = SlotRange::new(0, 1);
        let rest = range.insert(&mut store, coal(70), InsertPolicy::default().simulated());
        assert_eq!(rest.count(), 6);
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn test_limit_withholds_items() {
        let mut store = SlotStore::new(2);
        let range = SlotRange::new(0, 2);
        let rest = range.insert(&mut store, coal(10), InsertPolicy::default().limited(4));
        assert_eq!(rest.count(), 6);
        assert_eq!(store.total_count(), 4);
    }

    #[test]
    fn test_extract_accumulates_identical() {
        let mut store = SlotStore::new(4);
        let range = SlotRange::new(0, 4);
        store.set(0, coal(2));
        store.set(1, iron(5));
        store.set(2, coal(3));

        let out = range.extract(&mut store, 4);
        assert!(out.is("minecraft:coal"));
        assert_eq!(out.count(), 4);
        assert!(store.get(0).is_empty());
        assert_eq!(store.get(2).count(), 1);
        assert_eq!(store.get(1).count(), 5);
    }

    #[test]
    fn test_extract_matching_smallest_first() {
        let mut store = SlotStore::new(3);
        let range = SlotRange::new(0, 3);
        store.set(0, coal(20));
        store.set(1, coal(2));
        store.set(2, coal(7));

        let out = range.extract_matching(&mut store, &coal(1), 5);
        assert_eq!(out.count(), 5);
        assert!(store.get(1).is_empty());
        assert_eq!(store.get(2).count(), 4);
        assert_eq!(store.get(0).count(), 20);
    }

    #[test]
    fn test_move_slot_between_aliasing_ranges() {
        let mut store = SlotStore::new(4);
        let input = SlotRange::new(0, 2);
        let output = SlotRange::new(2, 2);
        store.set(0, coal(64));
        store.set(2, coal(60));
        store.set(3, iron(64));

        assert!(input.move_slot(&mut store, 0, &output));
        assert_eq!(store.get(2).count(), 64);
        assert_eq!(store.get(0).count(), 60);
        assert_eq!(store.total_count(), 60 + 64 + 64);

        assert!(!input.move_slot(&mut store, 1, &output));
    }

    #[test]
    fn test_fill_ratio() {
        let mut store = SlotStore::new(2);
        let range = SlotRange::new(0, 2);
        store.set(0, coal(32));
        assert!((range.fill_ratio(&store) - 0.25).abs() < 1e-6);
    }
}
