//! Authoritative per-player records keyed by player name

use log::info;
use shared::{ItemKind, PlayerView, MAX_HEALTH};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub name: String,
    pub zone: String,
    pub x: f32,
    pub y: f32,
    pub inventory: Option<ItemKind>,
    pub health: i32,
    /// Portal tests are skipped until this instant has passed.
    pub portal_cooldown: Option<Instant>,
}

impl PlayerState {
    pub fn new(name: &str, zone: &str, x: f32, y: f32) -> Self {
        Self {
            name: name.to_string(),
            zone: zone.to_string(),
            x,
            y,
            inventory: None,
            health: MAX_HEALTH,
            portal_cooldown: None,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn portal_ready(&self, now: Instant) -> bool {
        self.portal_cooldown.map_or(true, |until| now >= until)
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            zone: self.zone.clone(),
            x: self.x,
            y: self.y,
            health: self.health,
            item: self.inventory.clone(),
        }
    }
}

/// All live players. Insertion, lookup and removal by name.
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: HashMap<String, PlayerState>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh record, replacing any previous one under the same name.
    pub fn spawn(&mut self, name: &str, zone: &str, x: f32, y: f32) -> &PlayerState {
        let player = PlayerState::new(name, zone, x, y);
        info!("Spawned player {} in {} at ({}, {})", name, zone, x, y);
        self.players.insert(name.to_string(), player);
        &self.players[name]
    }

    pub fn remove(&mut self, name: &str) -> Option<PlayerState> {
        let removed = self.players.remove(name);
        if removed.is_some() {
            info!("Removed player {}", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&PlayerState> {
        self.players.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PlayerState> {
        self.players.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
