//! Waypoint following. Pathfinding proper is out of scope; characters walk
//! greedily towards each waypoint in turn.

use tracing::{debug, trace};

use crate::character::{Character, CharacterTable};
use crate::coord::HexCoord;

pub fn set_waypoints(c: &mut Character, waypoints: Vec<HexCoord>) {
    if c.is_busy() {
        debug!(target: "prospect_core.movement", id = %c.id, "character is busy, ignoring waypoints");
        return;
    }
    c.waypoints = waypoints.into();
    // Waypoints equal to the current position are reached immediately.
    while c.waypoints.front() == Some(&c.position) {
        c.waypoints.pop_front();
    }
}

fn step_character(c: &mut Character, speed: u32) {
    for _ in 0..speed {
        let Some(target) = c.waypoints.front().copied() else {
            break;
        };
        c.position = c.position.step_towards(&target);
        if c.position == target {
            c.waypoints.pop_front();
        }
    }
    trace!(target: "prospect_core.movement", id = %c.id, position = %c.position, "moved");
}

/// Advances every moving character that is not busy.
pub fn process_all(characters: &mut CharacterTable, speed: u32) {
    for c in characters.iter_mut() {
        if c.is_busy() || !c.is_moving() {
            continue;
        }
        step_character(c, speed);
    }
}
