//! Item motion along a trail cell

use glam::Vec3;

use crate::core::types::{block_center, BlockPos, EntityId, Facing};
use crate::port::ItemPort;
use crate::trail::{trail_facing, TrailCell, TRAIL_HEIGHT};
use crate::world::World;

/// Cruise speed in blocks per tick
pub const TRAIL_SPEED: f32 = 0.12;
/// Fraction of the gap to the cruise speed closed per tick
const ACCELERATION: f32 = 0.5;
const CENTERING: f32 = 0.25;
/// Upward velocity while climbing, before gravity
const CLIMB_LIFT: f32 = 0.16;
const WATER_DRAG: f32 = 0.8;
/// Share of a segment after which the next port is tried
pub const INSERT_AT: f32 = 0.7;
/// Items higher than this above the cell floor are not resting on it
const REST_TOLERANCE: f32 = 0.1;

/// Speed scale for entering `next` while moving along `dir`
fn flow_factor<W: World + ?Sized>(world: &W, next: BlockPos, dir: Facing) -> f32 {
    match trail_facing(world, next) {
        Some(f) if f == dir => 1.0,
        Some(f) if f == dir.opposite() => 0.5,
        Some(_) => 0.75,
        None => 1.0,
    }
}

/// How far along `dir` a position is inside `cell`, in [0, 1]
pub fn segment_progress(position: Vec3, cell: BlockPos, dir: Facing) -> f32 {
    (position - block_center(cell)).dot(dir.unit()) + 0.5
}

/// Direction a resting item on `cell` is driven in, if any
fn drive_direction<W: World + ?Sized>(world: &W, pos: BlockPos, cell: &TrailCell, entity: EntityId) -> Option<Facing> {
    let links = cell.links;
    let stack = world.item_entity(entity).map(|e| e.stack.clone())?;

    let sides = [(cell.facing.left(), links.left), (cell.facing.right(), links.right)];
    for (side, linked) in sides {
        if !linked {
            continue;
        }
        if let Some(filter) = world.frame_filter(pos, side) {
            if !filter.is_empty() && filter.kind() == stack.kind() {
                return Some(side);
            }
        }
    }
    if links.diverted {
        return sides.iter().find(|(_, linked)| *linked).map(|(side, _)| *side);
    }
    (links.front || links.up).then_some(cell.facing)
}

/// Try to hand an entity's stack to the port at `target`
fn try_insert<W: World + ?Sized>(world: &mut W, from: BlockPos, target: BlockPos, face: Facing, entity: EntityId) {
    let Some(stack) = world.item_entity(entity).map(|e| e.stack.clone()) else {
        return;
    };
    let remainder = {
        let mut port = ItemPort::resolve(world, target, face, Some(from));
        if !port.is_present() || !port.allows_insertion() {
            return;
        }
        port.insert(stack.clone(), false)
    };
    if remainder.is_empty() {
        world.remove_item_entity(entity);
        tracing::trace!("Trail at {:?} delivered {} x{} to {:?}", from, stack.id(), stack.count(), target);
    } else if remainder.count() < stack.count() {
        if let Some(e) = world.item_entity_mut(entity) {
            e.stack = remainder;
        }
    }
}

/// Push the items on one cell
///
/// `climb_column` also drives the items rising through the cell above a
/// climbing trail.
pub fn tick_cell<W: World + ?Sized>(world: &mut W, pos: BlockPos, cell: &TrailCell, climb_column: bool) {
    let floor = pos.y as f32 + TRAIL_HEIGHT;
    let above = Facing::Up.step(pos);
    let mut entities: Vec<(EntityId, bool)> = world.items_in(pos).into_iter().map(|id| (id, false)).collect();
    if climb_column {
        entities.extend(world.items_in(above).into_iter().map(|id| (id, true)));
    }

    for (id, in_column) in entities {
        let Some(entity) = world.item_entity(id).cloned() else {
            continue;
        };
        let Some(dir) = drive_direction(world, pos, cell, id) else {
            continue;
        };
        let progress = segment_progress(entity.position, pos, dir);
        let climbing = cell.links.up && dir == cell.facing;
        // Lifted items leave the floor but stay driven until they clear the wall
        let lifting = climbing && (in_column || progress >= 0.5);
        let resting = entity.on_ground || entity.position.y - floor < REST_TOLERANCE;
        if !resting && !lifting {
            continue;
        }

        let axis = dir.unit();
        let next = dir.step(pos);
        let mut speed = TRAIL_SPEED * flow_factor(world, next, dir);
        if cell.waterlogged {
            speed *= WATER_DRAG;
        }

        let mut velocity = entity.velocity;
        let along = velocity.dot(axis);
        let driven = along + (speed - along) * ACCELERATION;
        let lateral_axis = dir.right().unit();
        let lateral = if dir == cell.facing {
            let offset = (entity.position - block_center(pos)).dot(lateral_axis);
            -offset * CENTERING
        } else {
            velocity.dot(lateral_axis) * 0.5
        };
        let vertical = velocity.y;
        velocity = axis * driven + lateral_axis * lateral + Vec3::Y * vertical;

        if lifting {
            velocity.y = CLIMB_LIFT;
        }

        if let Some(e) = world.item_entity_mut(id) {
            e.velocity = velocity;
        }

        if climbing {
            let climbed = entity.position.y - floor;
            let summit = Facing::Up.step(next);
            if climbed >= INSERT_AT && !world.is_trail(summit) {
                try_insert(world, pos, summit, dir.opposite(), id);
            }
        } else if progress >= INSERT_AT && !world.is_trail(next) {
            try_insert(world, pos, next, dir.opposite(), id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    #[test]
    fn test_segment_progress_along_axes() {
        let cell = IVec3::new(2, 1, 2);
        let p = Vec3::new(2.9, 1.1, 2.5);
        assert!((segment_progress(p, cell, Facing::East) - 0.9).abs() < 1e-5);
        assert!((segment_progress(p, cell, Facing::West) - 0.1).abs() < 1e-5);
        assert!((segment_progress(p, cell, Facing::North) - 0.5).abs() < 1e-5);
    }
}
