//! Item ports - resolved insertion/extraction capability of a neighbour
//!
//! A port is resolved per call from a (position, face) pair. Occupants either
//! expose an [`ItemHandler`] capability directly, or a [`SidedContainer`]
//! that is adapted on the fly. When neither exists the port is `Absent` and
//! every operation quietly does nothing, so callers never distinguish
//! "nothing there" from "not interactive".

pub mod sided;

pub use sided::{SidedAdapter, SidedContainer};

use crate::core::types::{BlockPos, Facing};
use crate::item::ItemStack;

/// Insertion/extraction capability of a block occupant
pub trait ItemHandler {
    fn allows_insertion(&self) -> bool {
        true
    }

    fn allows_extraction(&self) -> bool {
        true
    }

    /// Insert `stack`, returning the remainder. `simulate` must not mutate.
    fn insert(&mut self, stack: ItemStack, simulate: bool) -> ItemStack;

    /// Extract up to `count` items matching `template` (empty template
    /// matches anything). `simulate` must not mutate.
    fn extract(&mut self, template: &ItemStack, count: u32, simulate: bool) -> ItemStack;

    fn is_storage_empty(&self) -> bool;

    /// One template per distinct kind available for extraction, in slot
    /// order. Handlers that cannot list their contents return nothing and
    /// are only probed with an empty template.
    fn offered(&self) -> Vec<ItemStack> {
        Vec::new()
    }

    fn owner(&self) -> Option<BlockPos> {
        None
    }
}

/// Source of ports, implemented by worlds
pub trait PortProvider {
    /// Whether the occupant at `pos` exposes a handler on `face`
    fn has_capability(&self, pos: BlockPos, face: Facing) -> bool;

    fn capability(&mut self, pos: BlockPos, face: Facing) -> Option<&mut dyn ItemHandler>;

    fn sided_container(&mut self, pos: BlockPos) -> Option<&mut dyn SidedContainer>;
}

/// A resolved port
pub enum ItemPort<'a> {
    Handler(&'a mut dyn ItemHandler),
    Sided(SidedAdapter<'a>),
    Absent,
}

impl<'a> ItemPort<'a> {
    /// Resolve the port of the occupant at `pos`, accessed through its `face`.
    ///
    /// A requester never gets a port onto its own position.
    pub fn resolve<P>(provider: &'a mut P, pos: BlockPos, face: Facing, requester: Option<BlockPos>) -> ItemPort<'a>
    where
        P: PortProvider + ?Sized,
    {
        if requester == Some(pos) {
            return ItemPort::Absent;
        }
        if provider.has_capability(pos, face) {
            return match provider.capability(pos, face) {
                Some(handler) => ItemPort::Handler(handler),
                None => ItemPort::Absent,
            };
        }
        match provider.sided_container(pos) {
            Some(container) => ItemPort::Sided(SidedAdapter::new(container, face)),
            None => ItemPort::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, ItemPort::Absent)
    }

    pub fn allows_insertion(&self) -> bool {
        match self {
            ItemPort::Handler(h) => h.allows_insertion(),
            ItemPort::Sided(s) => s.allows_insertion(),
            ItemPort::Absent => false,
        }
    }

    pub fn allows_extraction(&self) -> bool {
        match self {
            ItemPort::Handler(h) => h.allows_extraction(),
            ItemPort::Sided(s) => s.allows_extraction(),
            ItemPort::Absent => false,
        }
    }

    /// Insert `stack`; an absent port hands everything back
    pub fn insert(&mut self, stack: ItemStack, simulate: bool) -> ItemStack {
        if stack.is_empty() {
            return stack;
        }
        match self {
            ItemPort::Handler(h) if h.allows_insertion() => h.insert(stack, simulate),
            ItemPort::Sided(s) => s.insert(stack, simulate),
            _ => stack,
        }
    }

    pub fn extract(&mut self, template: &ItemStack, count: u32, simulate: bool) -> ItemStack {
        if count == 0 {
            return ItemStack::empty();
        }
        match self {
            ItemPort::Handler(h) if h.allows_extraction() => h.extract(template, count, simulate),
            ItemPort::Sided(s) => s.extract(template, count, simulate),
            _ => ItemStack::empty(),
        }
    }

    pub fn is_storage_empty(&self) -> bool {
        match self {
            ItemPort::Handler(h) => h.is_storage_empty(),
            ItemPort::Sided(s) => s.is_storage_empty(),
            ItemPort::Absent => true,
        }
    }

    pub fn offered(&self) -> Vec<ItemStack> {
        match self {
            ItemPort::Handler(h) if h.allows_extraction() => h.offered(),
            ItemPort::Sided(s) => s.offered(),
            _ => Vec::new(),
        }
    }

    pub fn owner(&self) -> Option<BlockPos> {
        match self {
            ItemPort::Handler(h) => h.owner(),
            ItemPort::Sided(s) => Some(s.owner()),
            ItemPort::Absent => None,
        }
    }
}

/// Single-item templates for each distinct kind among `stacks`
pub fn distinct_kinds<'a>(stacks: impl IntoIterator<Item = &'a ItemStack>) -> Vec<ItemStack> {
    let mut kinds: Vec<ItemStack> = Vec::new();
    for stack in stacks {
        if !stack.is_empty() && !kinds.iter().any(|k| k.can_stack_with(stack)) {
            kinds.push(stack.copy_with_count(1));
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InsertPolicy, SlotRange, SlotStore};
    use crate::item::ItemKind;
    use ahash::AHashMap;
    use glam::IVec3;

    struct Bin {
        store: SlotStore,
        pos: BlockPos,
    }

    impl ItemHandler for Bin {
        fn insert(&mut self, stack: ItemStack, simulate: bool) -> ItemStack {
            let policy = if simulate { InsertPolicy::default().simulated() } else { InsertPolicy::default() };
            SlotRange::new(0, self.store.len()).insert(&mut self.store, stack, policy)
        }

        fn extract(&mut self, _template: &ItemStack, count: u32, _simulate: bool) -> ItemStack {
            SlotRange::new(0, self.store.len()).extract(&mut self.store, count)
        }

        fn is_storage_empty(&self) -> bool {
            self.store.is_empty()
        }

        fn owner(&self) -> Option<BlockPos> {
            Some(self.pos)
        }
    }

    #[derive(Default)]
    struct Provider {
        bins: AHashMap<BlockPos, Bin>,
    }

    impl PortProvider for Provider {
        fn has_capability(&self, pos: BlockPos, _face: Facing) -> bool {
            self.bins.contains_key(&pos)
        }

        fn capability(&mut self, pos: BlockPos, _face: Facing) -> Option<&mut dyn ItemHandler> {
            self.bins.get_mut(&pos).map(|b| b as &mut dyn ItemHandler)
        }

        fn sided_container(&mut self, _pos: BlockPos) -> Option<&mut dyn SidedContainer> {
            None
        }
    }

    fn stick(n: u32) -> ItemStack {
        ItemStack::new(ItemKind::named("minecraft:stick"), n)
    }

    #[test]
    fn test_absent_port_noops() {
        let mut provider = Provider::default();
        let mut port = ItemPort::resolve(&mut provider, IVec3::ZERO, Facing::Up, None);
        assert!(!port.is_present());
        assert_eq!(port.insert(stick(3), false).count(), 3);
        assert!(port.extract(&ItemStack::empty(), 3, false).is_empty());
        assert!(port.is_storage_empty());
    }

    #[test]
    fn test_handler_resolved_and_used() {
        let mut provider = Provider::default();
        let pos = IVec3::new(1, 0, 0);
        provider.bins.insert(pos, Bin { store: SlotStore::new(1), pos });

        let mut port = ItemPort::resolve(&mut provider, pos, Facing::West, Some(IVec3::ZERO));
        assert_eq!(port.owner(), Some(pos));
        assert!(port.insert(stick(70), false).count() == 6);
        assert!(!port.is_storage_empty());
    }

    #[test]
    fn test_self_resolution_is_absent() {
        let mut provider = Provider::default();
        let pos = IVec3::new(4, 4, 4);
        provider.bins.insert(pos, Bin { store: SlotStore::new(1), pos });
        let port = ItemPort::resolve(&mut provider, pos, Facing::Up, Some(pos));
        assert!(!port.is_present());
    }

    #[test]
    fn test_distinct_kinds_keeps_slot_order() {
        let sand = ItemStack::new(ItemKind::named("minecraft:sand"), 5);
        let stacks = [stick(3), ItemStack::empty(), sand.clone(), stick(9)];
        let kinds = distinct_kinds(stacks.iter());
        assert_eq!(kinds.len(), 2);
        assert!(kinds[0].is("minecraft:stick") && kinds[0].count() == 1);
        assert!(kinds[1].is("minecraft:sand"));
    }
}
