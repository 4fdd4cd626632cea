//! Per-tick player contact detection
//!
//! Players are grouped by zone and every pair inside a zone is tested with an
//! axis-aligned box overlap. The scan is quadratic in players per zone; a
//! spatial grid would slot in behind [`detect_collisions`] without changing
//! its output.

use crate::players::PlayerStore;
use shared::check_collision;
use std::collections::{HashMap, HashSet};

/// Returns the names of all players touching another player in the same zone.
pub fn detect_collisions(players: &PlayerStore) -> HashSet<String> {
    let mut by_zone: HashMap<&str, Vec<(&str, (f32, f32))>> = HashMap::new();
    for player in players.iter() {
        by_zone
            .entry(player.zone.as_str())
            .or_default()
            .push((player.name.as_str(), player.position()));
    }

    let mut colliding = HashSet::new();
    for members in by_zone.values() {
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (a, a_pos) = members[i];
                let (b, b_pos) = members[j];
                if check_collision(a_pos, b_pos) {
                    colliding.insert(a.to_string());
                    colliding.insert(b.to_string());
                }
            }
        }
    }
    colliding
}
