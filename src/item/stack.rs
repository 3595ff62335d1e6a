use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default stack limit for kinds that do not say otherwise
pub const DEFAULT_MAX_STACK: u32 = 64;

/// Kind of an item, identified by its id
///
/// Equality and hashing only look at the id. The max stack size travels with
/// the kind so slot operations never need a registry lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemKind {
    id: Cow<'static, str>,
    #[serde(default = "default_max_stack")]
    max_stack: u32,
}

fn default_max_stack() -> u32 {
    DEFAULT_MAX_STACK
}

impl ItemKind {
    /// The kind of an empty stack
    pub const AIR: ItemKind = ItemKind {
        id: Cow::Borrowed("minecraft:air"),
        max_stack: DEFAULT_MAX_STACK,
    };

    pub fn new(id: impl Into<Cow<'static, str>>, max_stack: u32) -> Self {
        Self {
            id: id.into(),
            max_stack: max_stack.max(1),
        }
    }

    /// Kind with the default stack limit
    pub fn named(id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(id, DEFAULT_MAX_STACK)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn is_air(&self) -> bool {
        self.id == ItemKind::AIR.id
    }
}

impl PartialEq for ItemKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ItemKind {}

impl Hash for ItemKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A stack of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    kind: ItemKind,
    count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<Value>,
}

impl Default for ItemStack {
    fn default() -> Self {
        Self::empty()
    }
}

impl ItemStack {
    pub const EMPTY: ItemStack = ItemStack {
        kind: ItemKind::AIR,
        count: 0,
        tag: None,
    };

    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Create a stack; a zero count or air kind yields the empty stack
    pub fn new(kind: ItemKind, count: u32) -> Self {
        let mut stack = Self {
            kind,
            count,
            tag: None,
        };
        stack.normalize();
        stack
    }

    pub fn with_tag(mut self, tag: Value) -> Self {
        if !self.is_empty() {
            self.tag = Some(tag);
        }
        self
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn id(&self) -> &str {
        self.kind.id()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn tag(&self) -> Option<&Value> {
        self.tag.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn max_stack(&self) -> u32 {
        self.kind.max_stack()
    }

    pub fn is(&self, id: &str) -> bool {
        !self.is_empty() && self.kind.id() == id
    }

    /// Same kind and same tag, so the two can share a slot
    pub fn can_stack_with(&self, other: &ItemStack) -> bool {
        !self.is_empty() && !other.is_empty() && self.kind == other.kind && self.tag == other.tag
    }

    /// Copy of this stack with a different count
    pub fn copy_with_count(&self, count: u32) -> ItemStack {
        let mut copy = self.clone();
        copy.count = count;
        copy.normalize();
        copy
    }

    /// Split off up to `amount` items into a new stack
    pub fn split(&mut self, amount: u32) -> ItemStack {
        let taken = amount.min(self.count);
        let out = self.copy_with_count(taken);
        self.shrink(taken);
        out
    }

    pub fn grow(&mut self, amount: u32) {
        self.count = self.count.saturating_add(amount);
    }

    pub fn shrink(&mut self, amount: u32) {
        self.count = self.count.saturating_sub(amount);
        self.normalize();
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.count == 0 || self.kind.is_air() {
            self.kind = ItemKind::AIR;
            self.count = 0;
            self.tag = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zero_count_is_empty() {
        let stack = ItemStack::new(ItemKind::named("minecraft:coal"), 0);
        assert!(stack.is_empty());
        assert!(stack.kind().is_air());
    }

    #[test]
    fn test_split_empties_source() {
        let mut stack = ItemStack::new(ItemKind::named("minecraft:coal"), 5);
        let part = stack.split(8);
        assert_eq!(part.count(), 5);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_tag_blocks_stacking() {
        let plain = ItemStack::new(ItemKind::named("minecraft:iron_sword"), 1);
        let named = plain.clone().with_tag(json!({"name": "Stinger"}));
        assert!(!plain.can_stack_with(&named));
        assert!(named.can_stack_with(&named.clone()));
    }

    #[test]
    fn test_kind_equality_ignores_limit() {
        assert_eq!(ItemKind::new("minecraft:egg", 16), ItemKind::named("minecraft:egg"));
    }
}
