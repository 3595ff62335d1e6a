//! Cells, creatures and free item entities

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::{EntityId, Facing};
use crate::item::{ItemKind, ItemStack};

/// Coarse classification of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    Air,
    Solid,
    Ore,
    Log,
    Leaves,
    Vine,
    Sapling,
    Crop { age: u8, max_age: u8 },
    Water { source: bool },
    Lava { source: bool },
    /// Grass, ferns and other plants harvested with shears
    Shearable,
    /// Bee nest; harvestable when honey reaches 5
    Beehive { honey: u8 },
    /// Floor conveyance cell
    Trail { facing: Facing },
    /// Block entity with an inventory (chest, station)
    Machine,
}

impl Material {
    /// Occupies the full cell volume
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            Material::Solid | Material::Ore | Material::Log | Material::Leaves | Material::Machine | Material::Beehive { .. }
        )
    }

    /// Presents full faces on every side
    pub fn is_full_cube(self) -> bool {
        matches!(
            self,
            Material::Solid | Material::Ore | Material::Log | Material::Machine | Material::Beehive { .. }
        )
    }
}

/// A world cell: type id, material and optional tag data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub material: Material,
    /// Ticks of work per unit of hardness are applied by the world; negative
    /// means unbreakable
    pub hardness: f32,
    /// What breaking this cell yields; `None` drops the block itself
    pub drop: Option<ItemKind>,
    #[serde(default)]
    pub tag: Option<Value>,
}

impl Block {
    pub fn new(id: impl Into<String>, material: Material, hardness: f32) -> Self {
        Self {
            id: id.into(),
            material,
            hardness,
            drop: None,
            tag: None,
        }
    }

    pub fn air() -> Self {
        Self::new("minecraft:air", Material::Air, 0.0)
    }

    pub fn solid(id: impl Into<String>) -> Self {
        Self::new(id, Material::Solid, 1.5)
    }

    pub fn ore(id: impl Into<String>, drop: ItemKind) -> Self {
        Self {
            drop: Some(drop),
            ..Self::new(id, Material::Ore, 3.0)
        }
    }

    pub fn log(id: impl Into<String>) -> Self {
        Self::new(id, Material::Log, 2.0)
    }

    pub fn leaves(id: impl Into<String>) -> Self {
        Self::new(id, Material::Leaves, 0.2)
    }

    pub fn crop(id: impl Into<String>, produce: ItemKind, age: u8, max_age: u8) -> Self {
        Self {
            drop: Some(produce),
            ..Self::new(id, Material::Crop { age, max_age }, 0.0)
        }
    }

    pub fn water_source() -> Self {
        Self::new("minecraft:water", Material::Water { source: true }, -1.0)
    }

    pub fn lava_source() -> Self {
        Self::new("minecraft:lava", Material::Lava { source: true }, -1.0)
    }

    pub fn bedrock() -> Self {
        Self::new("minecraft:bedrock", Material::Solid, -1.0)
    }

    pub fn is_air(&self) -> bool {
        self.material == Material::Air
    }

    /// Items produced when the cell is destroyed
    pub fn drops(&self) -> Vec<ItemStack> {
        match self.material {
            Material::Air | Material::Water { .. } | Material::Lava { .. } | Material::Leaves | Material::Vine => {
                Vec::new()
            }
            Material::Crop { age, max_age } if age < max_age => Vec::new(),
            _ => {
                let kind = self.drop.clone().unwrap_or_else(|| ItemKind::named(self.id.clone()));
                vec![ItemStack::new(kind, 1)]
            }
        }
    }
}

/// A living creature the animal handlers can interact with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub id: EntityId,
    pub species: String,
    pub position: Vec3,
    pub is_baby: bool,
    /// Item id that makes this creature breed
    pub food: String,
    /// Has wool (or similar) that shears can take
    pub shearable: bool,
}

/// A free item lying or moving in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntity {
    pub id: EntityId,
    pub stack: ItemStack,
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ore_drops_override() {
        let block = Block::ore("minecraft:iron_ore", ItemKind::named("minecraft:raw_iron"));
        let drops = block.drops();
        assert_eq!(drops.len(), 1);
        assert!(drops[0].is("minecraft:raw_iron"));
    }

    #[test]
    fn test_immature_crop_drops_nothing() {
        let crop = Block::crop("minecraft:wheat", ItemKind::named("minecraft:wheat"), 3, 7);
        assert!(crop.drops().is_empty());
    }

    #[test]
    fn test_leaves_are_solid_but_not_full() {
        assert!(Material::Leaves.is_solid());
        assert!(!Material::Leaves.is_full_cube());
    }
}
