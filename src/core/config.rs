//! Station configuration with documented constants
//!
//! Every tunable of the engine lives here. A config is loaded once (usually
//! from TOML), validated, and then shared read-only with all stations through
//! an `Arc`. Nothing re-reads it during a tick.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StationError};
use crate::recipes::RecipeCategory;

/// Per-category processing speed factors
///
/// A factor divides the nominal recipe time: 2.0 finishes a cycle in half the
/// ticks. Fuel demand is not affected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedFactors {
    pub crafting: f32,
    pub smelting: f32,
    pub blasting: f32,
    pub smoking: f32,
    pub brewing: f32,
    pub grindstone: f32,
    pub composting: f32,
}

impl Default for SpeedFactors {
    fn default() -> Self {
        Self {
            crafting: 1.0,
            smelting: 1.0,
            blasting: 2.0,
            smoking: 2.0,
            brewing: 1.0,
            grindstone: 1.0,
            composting: 1.0,
        }
    }
}

impl SpeedFactors {
    pub fn get(&self, category: RecipeCategory) -> f32 {
        match category {
            RecipeCategory::Crafting => self.crafting,
            RecipeCategory::Smelting => self.smelting,
            RecipeCategory::Blasting => self.blasting,
            RecipeCategory::Smoking => self.smoking,
            RecipeCategory::Brewing => self.brewing,
            RecipeCategory::Grindstone => self.grindstone,
            RecipeCategory::Composting => self.composting,
        }
    }
}

/// Configuration for stations and their colonies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    // === TICKING ===
    /// World ticks between two processing steps of a station
    ///
    /// Every duration below that is counted "per step" advances by this
    /// interval, so changing it changes granularity, not pacing.
    pub tick_interval: u32,

    /// Processing steps between two passthrough scans
    pub passthrough_interval: u32,

    /// Maximum number of items pulled from the input port per step
    pub input_pull_amount: u32,

    /// Ticks an input-blocked / output-blocked pulse stays raised
    pub pulse_duration: u32,

    // === COLONY ===
    /// Item id of the population unit kept in the pen
    pub population_item: String,

    /// Item id of the boost item consumed from the input range
    pub boost_item: String,

    /// Ticks one boost item keeps the colony sugared
    pub boost_duration: u32,

    /// Growth accumulator threshold for spawning one population unit
    ///
    /// Growth advances three times faster while sugared.
    pub growth_latency: u32,

    /// Scales the colony speed multiplier globally
    pub global_speed_scale: f32,

    // === PROCESSING ===
    pub speed_factors: SpeedFactors,

    /// Command item id -> handler category name
    pub bindings: AHashMap<String, String>,

    /// Item ids the dispenser handler is allowed to place
    pub dispenser_allow_list: Vec<String>,

    /// Item id of the empty container used by the bucket handler
    pub empty_bucket_item: String,

    /// Item id produced by the composter when it fills up
    pub compost_result_item: String,

    /// Item id consumed by the hoe and bone meal handlers to fertilize
    pub fertilizer_item: String,

    // === WORLD WORK ===
    /// Chance for a bonus ore drop when the pickaxe handler breaks a cell
    ///
    /// Shipped default is 3%. The configured value is authoritative; set it
    /// to 0 to disable bonus drops entirely.
    pub drop_probability: f32,

    /// Bonus drops rolled with `drop_probability`
    pub ore_drops: Vec<String>,

    /// Horizontal radius the hoe handler scans for mature crops
    pub farm_radius: i32,

    /// Horizontal radius of the bone meal scan volume
    pub fertilize_radius: i32,

    /// Fertilize at most this many cells per bone meal cycle
    pub fertilize_batch: u32,

    /// Radius around the station searched for breedable creatures
    pub animal_radius: f32,

    /// No breeding when this many creatures are already nearby
    pub animal_population_cap: usize,

    /// Ticks a creature must wait before it can be paired again
    pub breeding_cooldown: u64,

    /// Maximum tracked breeding cooldowns before eviction
    pub cooldown_capacity: usize,
}

impl Default for StationConfig {
    fn default() -> Self {
        let bindings = [
            ("minecraft:crafting_table", "crafting"),
            ("minecraft:furnace", "furnace"),
            ("minecraft:blast_furnace", "blast_furnace"),
            ("minecraft:smoker", "smoker"),
            ("minecraft:composter", "composter"),
            ("minecraft:shears", "shears"),
            ("minecraft:brewing_stand", "brewing"),
            ("minecraft:grindstone", "grindstone"),
            ("minecraft:dispenser", "dispenser"),
            ("minecraft:bucket", "bucket"),
            ("minecraft:fishing_rod", "fishing"),
            ("minecraft:bone_meal", "bone_meal"),
            ("minecraft:iron_hoe", "hoe"),
            ("minecraft:iron_pickaxe", "pickaxe"),
            ("minecraft:iron_axe", "axe"),
            ("minecraft:hopper", "hopper"),
            ("minecraft:wheat", "animal_feed"),
        ]
        .into_iter()
        .map(|(item, category)| (item.to_string(), category.to_string()))
        .collect();

        Self {
            tick_interval: 4,
            passthrough_interval: 4,
            input_pull_amount: 8,
            pulse_duration: 20,

            population_item: "formicary:ant".into(),
            boost_item: "minecraft:sugar".into(),
            boost_duration: 600,
            growth_latency: 1200,
            global_speed_scale: 1.0,

            speed_factors: SpeedFactors::default(),
            bindings,
            dispenser_allow_list: vec![
                "minecraft:oak_sapling".into(),
                "minecraft:birch_sapling".into(),
                "minecraft:torch".into(),
                "minecraft:cobblestone".into(),
            ],
            empty_bucket_item: "minecraft:bucket".into(),
            compost_result_item: "minecraft:bone_meal".into(),
            fertilizer_item: "minecraft:bone_meal".into(),

            drop_probability: 0.03,
            ore_drops: vec!["minecraft:raw_iron".into(), "minecraft:coal".into()],
            farm_radius: 2,
            fertilize_radius: 2,
            fertilize_batch: 4,
            animal_radius: 4.0,
            animal_population_cap: 16,
            breeding_cooldown: 6000,
            cooldown_capacity: 128,
        }
    }
}

impl StationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; absent keys keep their defaults
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: StationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval == 0 {
            return Err(StationError::InvalidConfig("tick_interval must be at least 1".into()));
        }
        if self.growth_latency == 0 {
            return Err(StationError::InvalidConfig("growth_latency must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(StationError::InvalidConfig(format!(
                "drop_probability ({}) must lie in [0, 1]",
                self.drop_probability
            )));
        }
        if self.global_speed_scale <= 0.0 {
            return Err(StationError::InvalidConfig("global_speed_scale must be positive".into()));
        }
        let factors = &self.speed_factors;
        let all = [
            factors.crafting,
            factors.smelting,
            factors.blasting,
            factors.smoking,
            factors.brewing,
            factors.grindstone,
            factors.composting,
        ];
        if all.iter().any(|f| *f <= 0.0) {
            return Err(StationError::InvalidConfig("speed factors must be positive".into()));
        }
        if self.population_item.is_empty() || self.boost_item.is_empty() {
            return Err(StationError::InvalidConfig("population and boost items must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StationConfig::parse_toml(
            r#"
            tick_interval = 2
            drop_probability = 0.0

            [speed_factors]
            smelting = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_interval, 2);
        assert_eq!(config.drop_probability, 0.0);
        assert_eq!(config.speed_factors.smelting, 1.5);
        assert_eq!(config.speed_factors.blasting, 2.0);
        assert_eq!(config.boost_duration, 600);
        assert_eq!(config.bindings.get("minecraft:furnace").map(String::as_str), Some("furnace"));
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let err = StationConfig::parse_toml("drop_probability = 1.5").unwrap_err();
        assert!(matches!(err, StationError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(StationConfig::parse_toml("tick_interval = 0").is_err());
    }
}
