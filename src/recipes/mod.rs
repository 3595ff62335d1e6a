//! Recipe and fuel lookups
//!
//! The engine only talks to the [`RecipeBook`] trait. [`RecipeCatalog`] is
//! the in-memory implementation, loadable from TOML.

pub mod catalog;

pub use catalog::RecipeCatalog;

use serde::{Deserialize, Serialize};

use crate::item::ItemStack;

/// Processing category a recipe belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeCategory {
    Crafting,
    Smelting,
    Blasting,
    Smoking,
    Brewing,
    Grindstone,
    Composting,
}

impl RecipeCategory {
    /// Furnace family categories share one fuel table
    pub fn fuel_category(self) -> RecipeCategory {
        match self {
            RecipeCategory::Blasting | RecipeCategory::Smoking => RecipeCategory::Smelting,
            other => other,
        }
    }

    pub fn parse(name: &str) -> Option<RecipeCategory> {
        match name.to_lowercase().as_str() {
            "crafting" => Some(RecipeCategory::Crafting),
            "smelting" => Some(RecipeCategory::Smelting),
            "blasting" => Some(RecipeCategory::Blasting),
            "smoking" => Some(RecipeCategory::Smoking),
            "brewing" => Some(RecipeCategory::Brewing),
            "grindstone" => Some(RecipeCategory::Grindstone),
            "composting" => Some(RecipeCategory::Composting),
            _ => None,
        }
    }
}

/// One ingredient slot: any of `items`, `count` units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub items: Vec<String>,
    pub count: u32,
    /// Only stacks carrying tag data qualify (enchanted or named items)
    #[serde(default)]
    pub require_tag: bool,
}

impl Ingredient {
    pub fn of(id: &str, count: u32) -> Self {
        Self {
            items: vec![id.to_string()],
            count,
            require_tag: false,
        }
    }

    /// A blank cell in a shaped pattern
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.items.is_empty()
    }

    pub fn matches(&self, stack: &ItemStack) -> bool {
        if stack.is_empty() {
            return self.is_blank();
        }
        if self.require_tag && stack.tag().is_none() {
            return false;
        }
        self.items.iter().any(|id| id == stack.id())
    }
}

/// A processing recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    /// Unique identifier
    pub id: String,
    pub category: RecipeCategory,
    /// Crafting: row-major cells of a `width` x `height` pattern (blank
    /// cells allowed), or a shapeless list when `width` is 0.
    /// Other categories: the primary ingredient first.
    pub ingredients: Vec<Ingredient>,
    pub width: usize,
    pub height: usize,
    pub result: ItemStack,
    /// Extra outputs, e.g. containers left behind
    pub byproducts: Vec<ItemStack>,
    /// Nominal processing time in ticks
    pub time: u32,
}

impl Recipe {
    pub fn is_shaped(&self) -> bool {
        self.width > 0
    }

    /// Primary ingredient (first non-blank)
    pub fn primary(&self) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| !i.is_blank())
    }

    /// Whether `inputs` hold enough items for every ingredient, allocating
    /// greedily so one stack is not counted twice
    pub fn satisfiable(&self, inputs: &[ItemStack]) -> bool {
        let mut left: Vec<u32> = inputs.iter().map(ItemStack::count).collect();
        for ingredient in self.ingredients.iter().filter(|i| !i.is_blank()) {
            let mut needed = ingredient.count.max(1);
            for (stack, available) in inputs.iter().zip(left.iter_mut()) {
                if needed == 0 {
                    break;
                }
                if *available > 0 && ingredient.matches(stack) {
                    let take = needed.min(*available);
                    *available -= take;
                    needed -= take;
                }
            }
            if needed > 0 {
                return false;
            }
        }
        true
    }

    /// Whether any ingredient accepts `stack`
    pub fn uses(&self, stack: &ItemStack) -> bool {
        self.ingredients.iter().any(|i| !i.is_blank() && i.matches(stack))
    }

    /// Exact match against a square crafting grid
    pub fn matches_grid(&self, grid: &[ItemStack], grid_width: usize) -> bool {
        if self.category != RecipeCategory::Crafting || grid_width == 0 {
            return false;
        }
        if !self.is_shaped() {
            let mut cells: Vec<&ItemStack> = grid.iter().filter(|s| !s.is_empty()).collect();
            if cells.iter().any(|s| s.count() != 1) {
                return false;
            }
            for ingredient in &self.ingredients {
                match cells.iter().position(|s| ingredient.matches(s)) {
                    Some(index) => {
                        cells.swap_remove(index);
                    }
                    None => return false,
                }
            }
            return cells.is_empty();
        }

        let grid_height = grid.len() / grid_width;
        let occupied: Vec<(usize, usize)> = grid
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .map(|(i, _)| (i % grid_width, i / grid_width))
            .collect();
        let Some(min_x) = occupied.iter().map(|c| c.0).min() else {
            return false;
        };
        let min_y = occupied.iter().map(|c| c.1).min().unwrap_or(0);
        if min_x + self.width > grid_width || min_y + self.height > grid_height {
            return false;
        }
        for y in 0..grid_height {
            for x in 0..grid_width {
                let cell = &grid[y * grid_width + x];
                let inside = x >= min_x && x < min_x + self.width && y >= min_y && y < min_y + self.height;
                if !inside {
                    if !cell.is_empty() {
                        return false;
                    }
                    continue;
                }
                let ingredient = &self.ingredients[(y - min_y) * self.width + (x - min_x)];
                if !ingredient.matches(cell) || (!cell.is_empty() && cell.count() != 1) {
                    return false;
                }
            }
        }
        true
    }
}

/// Burn value of one fuel unit and what it leaves behind
#[derive(Debug, Clone, PartialEq)]
pub struct Fuel {
    pub burn: u32,
    pub byproduct: ItemStack,
}

/// Recipe/fuel lookup collaborator
///
/// Lookups never fail; an unknown input simply yields no match.
pub trait RecipeBook {
    /// Recipes of `category` satisfiable from `inputs`, in catalog order
    fn lookup(&self, category: RecipeCategory, inputs: &[ItemStack]) -> Vec<&Recipe>;

    fn by_id(&self, id: &str) -> Option<&Recipe>;

    /// The crafting recipe exactly matching a 3x3 grid
    fn craft(&self, grid: &[ItemStack]) -> Option<&Recipe>;

    fn fuel(&self, category: RecipeCategory, stack: &ItemStack) -> Option<Fuel>;

    /// Chance in [0, 1] that composting one unit raises the compost level
    fn compost_chance(&self, stack: &ItemStack) -> Option<f32>;

    /// Whether any recipe of `category` uses `stack`
    fn is_ingredient(&self, category: RecipeCategory, stack: &ItemStack) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    fn planks(n: u32) -> ItemStack {
        ItemStack::new(ItemKind::named("minecraft:oak_planks"), n)
    }

    fn stick_recipe() -> Recipe {
        Recipe {
            id: "sticks".into(),
            category: RecipeCategory::Crafting,
            ingredients: vec![Ingredient::of("minecraft:oak_planks", 1), Ingredient::of("minecraft:oak_planks", 1)],
            width: 1,
            height: 2,
            result: ItemStack::new(ItemKind::named("minecraft:stick"), 4),
            byproducts: vec![],
            time: 0,
        }
    }

    #[test]
    fn test_satisfiable_counts_once() {
        let recipe = stick_recipe();
        assert!(recipe.satisfiable(&[planks(2)]));
        assert!(!recipe.satisfiable(&[planks(1)]));
        assert!(recipe.satisfiable(&[planks(1), planks(1)]));
    }

    #[test]
    fn test_shaped_grid_any_offset() {
        let recipe = stick_recipe();
        let mut grid = vec![ItemStack::empty(); 9];
        grid[2] = planks(1);
        grid[5] = planks(1);
        assert!(recipe.matches_grid(&grid, 3));

        grid[0] = planks(1);
        assert!(!recipe.matches_grid(&grid, 3));
    }

    #[test]
    fn test_require_tag() {
        let ingredient = Ingredient { require_tag: true, ..Ingredient::of("minecraft:iron_sword", 1) };
        let sword = ItemStack::new(ItemKind::new("minecraft:iron_sword", 1), 1);
        assert!(!ingredient.matches(&sword));
        assert!(ingredient.matches(&sword.with_tag(serde_json::json!({"enchanted": true}))));
    }
}
