//! Recipe catalog - in-memory recipe, fuel and compost tables
//!
//! Recipes are kept in insertion order; lookups return matches in that order,
//! so earlier entries win ties.

use ahash::AHashMap;
use serde::Deserialize;

use crate::core::error::{Result, StationError};
use crate::item::{ItemKind, ItemStack};
use crate::recipes::{Fuel, Ingredient, Recipe, RecipeBook, RecipeCategory};

/// Side length of the crafting grid
pub const GRID_WIDTH: usize = 3;

#[derive(Debug, Clone)]
struct FuelEntry {
    category: RecipeCategory,
    burn: u32,
    byproduct: ItemStack,
}

/// Catalog of all available recipes, fuels and compostables
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    fuels: AHashMap<String, FuelEntry>,
    compost: AHashMap<String, f32>,
}

impl RecipeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in recipes covering every category
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let item = |id: &'static str, n: u32| ItemStack::new(ItemKind::named(id), n);

        // Furnace family
        catalog.add(Recipe {
            id: "smelt_iron_ore".into(),
            category: RecipeCategory::Smelting,
            ingredients: vec![Ingredient::of("minecraft:iron_ore", 1)],
            width: 0,
            height: 0,
            result: item("minecraft:iron_ingot", 1),
            byproducts: vec![],
            time: 200,
        });
        catalog.add(Recipe {
            id: "smelt_sand".into(),
            category: RecipeCategory::Smelting,
            ingredients: vec![Ingredient::of("minecraft:sand", 1)],
            width: 0,
            height: 0,
            result: item("minecraft:glass", 1),
            byproducts: vec![],
            time: 200,
        });
        catalog.add(Recipe {
            id: "smelt_oak_log".into(),
            category: RecipeCategory::Smelting,
            ingredients: vec![Ingredient::of("minecraft:oak_log", 1)],
            width: 0,
            height: 0,
            result: item("minecraft:charcoal", 1),
            byproducts: vec![],
            time: 200,
        });
        catalog.add(Recipe {
            id: "blast_iron_ore".into(),
            category: RecipeCategory::Blasting,
            ingredients: vec![Ingredient::of("minecraft:iron_ore", 1)],
            width: 0,
            height: 0,
            result: item("minecraft:iron_ingot", 1),
            byproducts: vec![],
            time: 200,
        });
        catalog.add(Recipe {
            id: "smoke_beef".into(),
            category: RecipeCategory::Smoking,
            ingredients: vec![Ingredient::of("minecraft:beef", 1)],
            width: 0,
            height: 0,
            result: item("minecraft:cooked_beef", 1),
            byproducts: vec![],
            time: 200,
        });

        // Crafting
        catalog.add(Recipe {
            id: "oak_planks".into(),
            category: RecipeCategory::Crafting,
            ingredients: vec![Ingredient::of("minecraft:oak_log", 1)],
            width: 0,
            height: 0,
            result: item("minecraft:oak_planks", 4),
            byproducts: vec![],
            time: 0,
        });
        catalog.add(Recipe {
            id: "sticks".into(),
            category: RecipeCategory::Crafting,
            ingredients: vec![
                Ingredient::of("minecraft:oak_planks", 1),
                Ingredient::of("minecraft:oak_planks", 1),
            ],
            width: 1,
            height: 2,
            result: item("minecraft:stick", 4),
            byproducts: vec![],
            time: 0,
        });
        catalog.add(Recipe {
            id: "crafting_table".into(),
            category: RecipeCategory::Crafting,
            ingredients: vec![Ingredient::of("minecraft:oak_planks", 1); 4],
            width: 2,
            height: 2,
            result: item("minecraft:crafting_table", 1),
            byproducts: vec![],
            time: 0,
        });
        catalog.add(Recipe {
            id: "cake_batter".into(),
            category: RecipeCategory::Crafting,
            ingredients: vec![
                Ingredient::of("minecraft:milk_bucket", 1),
                Ingredient::of("minecraft:sugar", 1),
                Ingredient::of("minecraft:egg", 1),
            ],
            width: 0,
            height: 0,
            result: item("formicary:batter", 1),
            byproducts: vec![ItemStack::new(ItemKind::new("minecraft:bucket", 16), 1)],
            time: 0,
        });

        // Brewing
        catalog.add(Recipe {
            id: "awkward_potion".into(),
            category: RecipeCategory::Brewing,
            ingredients: vec![
                Ingredient::of("minecraft:nether_wart", 1),
                Ingredient::of("minecraft:water_bottle", 3),
            ],
            width: 0,
            height: 0,
            result: ItemStack::new(ItemKind::new("minecraft:awkward_potion", 1), 3),
            byproducts: vec![],
            time: 400,
        });

        // Grindstone
        catalog.add(Recipe {
            id: "grind_iron_sword".into(),
            category: RecipeCategory::Grindstone,
            ingredients: vec![Ingredient {
                require_tag: true,
                ..Ingredient::of("minecraft:iron_sword", 1)
            }],
            width: 0,
            height: 0,
            result: ItemStack::new(ItemKind::new("minecraft:iron_sword", 1), 1),
            byproducts: vec![],
            time: 100,
        });

        catalog.add_fuel("minecraft:coal", RecipeCategory::Smelting, 1600, ItemStack::empty());
        catalog.add_fuel("minecraft:charcoal", RecipeCategory::Smelting, 1600, ItemStack::empty());
        catalog.add_fuel("minecraft:oak_log", RecipeCategory::Smelting, 300, ItemStack::empty());
        catalog.add_fuel("minecraft:oak_planks", RecipeCategory::Smelting, 300, ItemStack::empty());
        catalog.add_fuel(
            "minecraft:lava_bucket",
            RecipeCategory::Smelting,
            20000,
            ItemStack::new(ItemKind::new("minecraft:bucket", 16), 1),
        );
        catalog.add_fuel("minecraft:blaze_powder", RecipeCategory::Brewing, 8000, ItemStack::empty());

        catalog.add_compostable("minecraft:wheat_seeds", 0.3);
        catalog.add_compostable("minecraft:oak_leaves", 0.3);
        catalog.add_compostable("minecraft:wheat", 0.65);
        catalog.add_compostable("minecraft:apple", 0.65);
        catalog.add_compostable("minecraft:pumpkin_pie", 1.0);

        catalog
    }

    /// Add a recipe to the catalog
    pub fn add(&mut self, recipe: Recipe) {
        self.recipes.push(recipe);
    }

    pub fn add_fuel(&mut self, id: &str, category: RecipeCategory, burn: u32, byproduct: ItemStack) {
        self.fuels.insert(
            id.to_string(),
            FuelEntry {
                category: category.fuel_category(),
                burn,
                byproduct,
            },
        );
    }

    pub fn add_compostable(&mut self, id: &str, chance: f32) {
        self.compost.insert(id.to_string(), chance.clamp(0.0, 1.0));
    }

    /// Get all recipes
    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a catalog from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let data: TomlCatalog = toml::from_str(content)?;

        let mut catalog = Self::new();
        for recipe in data.recipes {
            catalog.add(recipe.into_recipe()?);
        }
        for fuel in data.fuels {
            let category = parse_category(&fuel.category)?;
            let byproduct = fuel.byproduct.map(TomlStack::into_stack).unwrap_or_default();
            catalog.add_fuel(&fuel.item, category, fuel.burn, byproduct);
        }
        for entry in data.compost {
            catalog.add_compostable(&entry.item, entry.chance);
        }
        Ok(catalog)
    }
}

impl RecipeBook for RecipeCatalog {
    fn lookup(&self, category: RecipeCategory, inputs: &[ItemStack]) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.category == category && r.satisfiable(inputs))
            .collect()
    }

    fn by_id(&self, id: &str) -> Option<&Recipe> {
        if id.is_empty() {
            return None;
        }
        self.recipes.iter().find(|r| r.id == id)
    }

    fn craft(&self, grid: &[ItemStack]) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.matches_grid(grid, GRID_WIDTH))
    }

    fn fuel(&self, category: RecipeCategory, stack: &ItemStack) -> Option<Fuel> {
        if stack.is_empty() {
            return None;
        }
        let entry = self.fuels.get(stack.id())?;
        (entry.category == category.fuel_category()).then(|| Fuel {
            burn: entry.burn,
            byproduct: entry.byproduct.clone(),
        })
    }

    fn compost_chance(&self, stack: &ItemStack) -> Option<f32> {
        if stack.is_empty() {
            return None;
        }
        self.compost.get(stack.id()).copied()
    }

    fn is_ingredient(&self, category: RecipeCategory, stack: &ItemStack) -> bool {
        self.recipes
            .iter()
            .any(|r| r.category == category && r.uses(stack))
    }
}

fn parse_category(name: &str) -> Result<RecipeCategory> {
    RecipeCategory::parse(name)
        .ok_or_else(|| StationError::RecipeError(format!("unknown category '{}'", name)))
}

/// TOML representation of a catalog file
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    recipes: Vec<TomlRecipe>,
    #[serde(default)]
    fuels: Vec<TomlFuel>,
    #[serde(default)]
    compost: Vec<TomlCompost>,
}

/// TOML representation of a single recipe
#[derive(Debug, Deserialize)]
struct TomlRecipe {
    id: String,
    category: String,
    /// Shaped crafting rows, one character per cell, space = blank
    #[serde(default)]
    pattern: Vec<String>,
    /// Pattern character -> accepted item ids
    #[serde(default)]
    key: AHashMap<String, Vec<String>>,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
    result: TomlStack,
    #[serde(default)]
    byproducts: Vec<TomlStack>,
    #[serde(default)]
    time: u32,
}

/// TOML representation of an item amount
#[derive(Debug, Deserialize)]
struct TomlStack {
    item: String,
    #[serde(default = "one")]
    count: u32,
    max_stack: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlFuel {
    item: String,
    burn: u32,
    #[serde(default = "smelting")]
    category: String,
    byproduct: Option<TomlStack>,
}

#[derive(Debug, Deserialize)]
struct TomlCompost {
    item: String,
    chance: f32,
}

fn one() -> u32 {
    1
}

fn smelting() -> String {
    "smelting".into()
}

impl TomlStack {
    fn into_stack(self) -> ItemStack {
        let kind = match self.max_stack {
            Some(max) => ItemKind::new(self.item, max),
            None => ItemKind::named(self.item),
        };
        ItemStack::new(kind, self.count)
    }
}

impl TomlRecipe {
    fn into_recipe(self) -> Result<Recipe> {
        let category = parse_category(&self.category)?;

        let (ingredients, width, height) = if self.pattern.is_empty() {
            (self.ingredients, 0, 0)
        } else {
            let height = self.pattern.len();
            let width = self.pattern.iter().map(|row| row.chars().count()).max().unwrap_or(0);
            if width > GRID_WIDTH || height > GRID_WIDTH {
                return Err(StationError::RecipeError(format!(
                    "recipe '{}': pattern exceeds {}x{}",
                    self.id, GRID_WIDTH, GRID_WIDTH
                )));
            }
            let mut cells = Vec::with_capacity(width * height);
            for row in &self.pattern {
                let mut chars: Vec<char> = row.chars().collect();
                chars.resize(width, ' ');
                for c in chars {
                    if c == ' ' {
                        cells.push(Ingredient::blank());
                        continue;
                    }
                    let items = self.key.get(&c.to_string()).ok_or_else(|| {
                        StationError::RecipeError(format!("recipe '{}': key '{}' undefined", self.id, c))
                    })?;
                    cells.push(Ingredient {
                        items: items.clone(),
                        count: 1,
                        require_tag: false,
                    });
                }
            }
            (cells, width, height)
        };

        if ingredients.iter().all(Ingredient::is_blank) {
            return Err(StationError::RecipeError(format!("recipe '{}' has no ingredients", self.id)));
        }

        Ok(Recipe {
            id: self.id,
            category,
            ingredients,
            width,
            height,
            result: self.result.into_stack(),
            byproducts: self.byproducts.into_iter().map(TomlStack::into_stack).collect(),
            time: self.time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_catalog() {
        let catalog = RecipeCatalog::parse_toml(
            r#"
            [[recipes]]
            id = "torch"
            category = "crafting"
            pattern = ["C", "S"]
            key = { C = ["minecraft:coal", "minecraft:charcoal"], S = ["minecraft:stick"] }
            result = { item = "minecraft:torch", count = 4 }

            [[recipes]]
            id = "smelt_gold"
            category = "smelting"
            ingredients = [{ items = ["minecraft:gold_ore"], count = 1 }]
            result = { item = "minecraft:gold_ingot" }
            time = 200

            [[fuels]]
            item = "minecraft:coal"
            burn = 1600

            [[compost]]
            item = "minecraft:kelp"
            chance = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(catalog.all().len(), 2);
        let torch = catalog.by_id("torch").unwrap();
        assert_eq!((torch.width, torch.height), (1, 2));

        let coal = ItemStack::new(ItemKind::named("minecraft:coal"), 1);
        assert_eq!(catalog.fuel(RecipeCategory::Blasting, &coal).map(|f| f.burn), Some(1600));
        assert!(catalog.fuel(RecipeCategory::Brewing, &coal).is_none());
        let kelp = ItemStack::new(ItemKind::named("minecraft:kelp"), 1);
        assert_eq!(catalog.compost_chance(&kelp), Some(0.3));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let err = RecipeCatalog::parse_toml(
            r#"
            [[recipes]]
            id = "x"
            category = "juggling"
            ingredients = [{ items = ["a:b"], count = 1 }]
            result = { item = "a:c" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, StationError::RecipeError(_)));
    }

    #[test]
    fn test_lookup_only_satisfiable() {
        let catalog = RecipeCatalog::with_defaults();
        let ore = ItemStack::new(ItemKind::named("minecraft:iron_ore"), 1);
        let matches = catalog.lookup(RecipeCategory::Smelting, &[ore]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "smelt_iron_ore");
        assert!(catalog.lookup(RecipeCategory::Smelting, &[]).is_empty());
    }

    #[test]
    fn test_craft_grid() {
        let catalog = RecipeCatalog::with_defaults();
        let mut grid = vec![ItemStack::empty(); 9];
        grid[4] = ItemStack::new(ItemKind::named("minecraft:oak_log"), 1);
        assert_eq!(catalog.craft(&grid).map(|r| r.id.as_str()), Some("oak_planks"));
    }
}
