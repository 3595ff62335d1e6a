//! Core type definitions used throughout the codebase

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Block coordinate in the world grid
pub type BlockPos = IVec3;

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Unique identifier for free item entities and creatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// One of the six block faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Facing {
    pub const ALL: [Facing; 6] = [
        Facing::Down,
        Facing::Up,
        Facing::North,
        Facing::South,
        Facing::West,
        Facing::East,
    ];

    pub const HORIZONTAL: [Facing; 4] = [Facing::North, Facing::East, Facing::South, Facing::West];

    /// Unit offset towards this face
    pub fn offset(self) -> IVec3 {
        match self {
            Facing::Down => IVec3::new(0, -1, 0),
            Facing::Up => IVec3::new(0, 1, 0),
            Facing::North => IVec3::new(0, 0, -1),
            Facing::South => IVec3::new(0, 0, 1),
            Facing::West => IVec3::new(-1, 0, 0),
            Facing::East => IVec3::new(1, 0, 0),
        }
    }

    /// Offset as a float vector, for entity motion
    pub fn unit(self) -> Vec3 {
        self.offset().as_vec3()
    }

    pub fn opposite(self) -> Facing {
        match self {
            Facing::Down => Facing::Up,
            Facing::Up => Facing::Down,
            Facing::North => Facing::South,
            Facing::South => Facing::North,
            Facing::West => Facing::East,
            Facing::East => Facing::West,
        }
    }

    pub fn is_horizontal(self) -> bool {
        !matches!(self, Facing::Up | Facing::Down)
    }

    /// Rotate clockwise around the vertical axis (seen from above)
    ///
    /// Vertical faces are returned unchanged.
    pub fn clockwise(self) -> Facing {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
            other => other,
        }
    }

    pub fn counter_clockwise(self) -> Facing {
        match self {
            Facing::North => Facing::West,
            Facing::West => Facing::South,
            Facing::South => Facing::East,
            Facing::East => Facing::North,
            other => other,
        }
    }

    /// Left-hand side when looking along this facing
    pub fn left(self) -> Facing {
        self.counter_clockwise()
    }

    /// Right-hand side when looking along this facing
    pub fn right(self) -> Facing {
        self.clockwise()
    }

    /// Neighbour position of `pos` on this face
    pub fn step(self, pos: BlockPos) -> BlockPos {
        pos + self.offset()
    }
}

/// The eight lateral neighbours of a cell, used by flood fills
pub const LATERAL_RING: [IVec3; 8] = [
    IVec3::new(-1, 0, -1),
    IVec3::new(0, 0, -1),
    IVec3::new(1, 0, -1),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 1),
    IVec3::new(0, 0, 1),
    IVec3::new(1, 0, 1),
];

/// Centre of a block in continuous coordinates
pub fn block_center(pos: BlockPos) -> Vec3 {
    pos.as_vec3() + Vec3::splat(0.5)
}

/// Block containing a continuous position
pub fn block_of(position: Vec3) -> BlockPos {
    position.floor().as_ivec3()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for f in Facing::ALL {
            assert_eq!(f.opposite().opposite(), f);
            assert_eq!(f.offset() + f.opposite().offset(), IVec3::ZERO);
        }
    }

    #[test]
    fn test_left_right_of_north() {
        assert_eq!(Facing::North.left(), Facing::West);
        assert_eq!(Facing::North.right(), Facing::East);
        assert_eq!(Facing::Up.left(), Facing::Up);
    }

    #[test]
    fn test_block_of_negative_coordinates() {
        assert_eq!(block_of(Vec3::new(-0.5, 0.2, 1.9)), IVec3::new(-1, 0, 1));
        assert_eq!(block_of(block_center(IVec3::new(3, -2, 7))), IVec3::new(3, -2, 7));
    }
}
