//! Command item bindings
//!
//! The item in the command slot selects exactly one [`Handler`]. Bindings
//! are an explicit value built from configuration, never a global registry.

use ahash::AHashMap;

use crate::core::config::StationConfig;
use crate::core::error::{Result, StationError};
use crate::core::types::Tick;
use crate::item::ItemStack;
use crate::recipes::RecipeCategory;

/// Processing strategy of a station, each variant carrying its own settings
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    Crafting { speed_factor: f32 },
    /// Furnace, blast furnace or smoker
    Furnace { category: RecipeCategory, speed_factor: f32 },
    Composter { speed_factor: f32 },
    Shears,
    Brewing { speed_factor: f32 },
    Grindstone { speed_factor: f32 },
    Dispenser { allow_list: Vec<String> },
    Bucket { empty_item: String },
    FishingRod,
    BoneMeal { radius: i32, batch: u32, fertilizer: String },
    Hoe { radius: i32, fertilizer: String },
    Pickaxe { drop_probability: f32, ore_drops: Vec<String> },
    Axe,
    Hopper,
    AnimalFeed { radius: f32, population_cap: usize, cooldown: Tick },
}

impl Handler {
    /// Build the handler for a configured category name
    pub fn from_category(name: &str, config: &StationConfig) -> Option<Handler> {
        let factors = &config.speed_factors;
        let handler = match name {
            "crafting" => Handler::Crafting {
                speed_factor: factors.crafting,
            },
            "furnace" | "smelting" => Handler::Furnace {
                category: RecipeCategory::Smelting,
                speed_factor: factors.smelting,
            },
            "blast_furnace" | "blasting" => Handler::Furnace {
                category: RecipeCategory::Blasting,
                speed_factor: factors.blasting,
            },
            "smoker" | "smoking" => Handler::Furnace {
                category: RecipeCategory::Smoking,
                speed_factor: factors.smoking,
            },
            "composter" | "composting" => Handler::Composter {
                speed_factor: factors.composting,
            },
            "shears" => Handler::Shears,
            "brewing" => Handler::Brewing {
                speed_factor: factors.brewing,
            },
            "grindstone" => Handler::Grindstone {
                speed_factor: factors.grindstone,
            },
            "dispenser" => Handler::Dispenser {
                allow_list: config.dispenser_allow_list.clone(),
            },
            "bucket" => Handler::Bucket {
                empty_item: config.empty_bucket_item.clone(),
            },
            "fishing" | "fishing_rod" => Handler::FishingRod,
            "bone_meal" => Handler::BoneMeal {
                radius: config.fertilize_radius,
                batch: config.fertilize_batch,
                fertilizer: config.fertilizer_item.clone(),
            },
            "hoe" => Handler::Hoe {
                radius: config.farm_radius,
                fertilizer: config.fertilizer_item.clone(),
            },
            "pickaxe" => Handler::Pickaxe {
                drop_probability: config.drop_probability,
                ore_drops: config.ore_drops.clone(),
            },
            "axe" => Handler::Axe,
            "hopper" => Handler::Hopper,
            "animal_feed" => Handler::AnimalFeed {
                radius: config.animal_radius,
                population_cap: config.animal_population_cap,
                cooldown: config.breeding_cooldown,
            },
            _ => return None,
        };
        Some(handler)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Handler::Crafting { .. } => "crafting",
            Handler::Furnace { category, .. } => match category {
                RecipeCategory::Blasting => "blast_furnace",
                RecipeCategory::Smoking => "smoker",
                _ => "furnace",
            },
            Handler::Composter { .. } => "composter",
            Handler::Shears => "shears",
            Handler::Brewing { .. } => "brewing",
            Handler::Grindstone { .. } => "grindstone",
            Handler::Dispenser { .. } => "dispenser",
            Handler::Bucket { .. } => "bucket",
            Handler::FishingRod => "fishing",
            Handler::BoneMeal { .. } => "bone_meal",
            Handler::Hoe { .. } => "hoe",
            Handler::Pickaxe { .. } => "pickaxe",
            Handler::Axe => "axe",
            Handler::Hopper => "hopper",
            Handler::AnimalFeed { .. } => "animal_feed",
        }
    }

    /// Reluctance clamp `[min, max]` applied to `1 / speed` for world handlers
    pub fn reluctance_bounds(&self) -> (f32, f32) {
        match self {
            Handler::Pickaxe { .. } => (0.25, 4.0),
            Handler::Dispenser { .. } => (0.5, 2.0),
            Handler::Hopper => (0.25, 2.0),
            _ => (0.5, 4.0),
        }
    }
}

/// Item id to handler table
#[derive(Debug, Clone, Default)]
pub struct CommandBindings {
    handlers: AHashMap<String, Handler>,
}

impl CommandBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every binding named in the config
    pub fn from_config(config: &StationConfig) -> Result<Self> {
        let mut bindings = Self::new();
        for (item, category) in &config.bindings {
            let handler = Handler::from_category(category, config).ok_or_else(|| StationError::InvalidBinding {
                item: item.clone(),
                category: category.clone(),
            })?;
            bindings.bind(item, handler);
        }
        Ok(bindings)
    }

    pub fn bind(&mut self, item: &str, handler: Handler) {
        self.handlers.insert(item.to_string(), handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler selected by a command stack
    pub fn resolve(&self, command: &ItemStack) -> Option<&Handler> {
        if command.is_empty() {
            return None;
        }
        self.handlers.get(command.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn test_default_bindings_cover_every_station() {
        let bindings = CommandBindings::from_config(&StationConfig::default()).unwrap();
        assert_eq!(bindings.len(), 17);
        let furnace = ItemStack::new(ItemKind::named("minecraft:blast_furnace"), 1);
        assert!(matches!(
            bindings.resolve(&furnace),
            Some(Handler::Furnace {
                category: RecipeCategory::Blasting,
                ..
            })
        ));
        assert!(bindings.resolve(&ItemStack::empty()).is_none());
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut config = StationConfig::default();
        config
            .bindings
            .insert("minecraft:stick".into(), "juggling".into());
        let err = CommandBindings::from_config(&config).unwrap_err();
        assert!(matches!(err, StationError::InvalidBinding { ref category, .. } if category == "juggling"));
    }

    #[test]
    fn test_handler_carries_configured_radius() {
        let config = StationConfig {
            farm_radius: 5,
            ..StationConfig::default()
        };
        assert_eq!(
            Handler::from_category("hoe", &config),
            Some(Handler::Hoe {
                radius: 5,
                fertilizer: "minecraft:bone_meal".into()
            })
        );
    }
}
