//! Authoritative world state and the command processor that mutates it

use crate::catalog::{CatalogError, ZoneCatalog};
use crate::ground_items::GroundItemPool;
use crate::players::PlayerStore;
use log::{debug, error, info};
use shared::{clamp_to_board, Command, ServerFrame, PICKUP_RANGE, PORTAL_COOLDOWN};
use std::time::Instant;

#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    pub catalog: ZoneCatalog,
    pub items: GroundItemPool,
    pub players: PlayerStore,
    home_zone: String,
}

impl GameState {
    /// Creates the world, seeding ground items from the catalog. The home zone
    /// must exist in the catalog.
    pub fn new(catalog: ZoneCatalog, home_zone: &str) -> Result<Self, CatalogError> {
        catalog.zone(home_zone)?;
        let items = GroundItemPool::seeded(&catalog);

        Ok(Self {
            tick: 0,
            catalog,
            items,
            players: PlayerStore::new(),
            home_zone: home_zone.to_string(),
        })
    }

    pub fn home_zone(&self) -> &str {
        &self.home_zone
    }

    /// Makes sure a player record exists for `name`, creating it at the home
    /// zone's spawn if needed. Returns the description of the player's zone.
    pub fn join(&mut self, name: &str) -> Option<ServerFrame> {
        if !self.players.contains(name) {
            let spawn = match self.catalog.zone(&self.home_zone) {
                Ok(zone) => zone.spawn,
                Err(e) => {
                    error!("Cannot spawn {}: {}", name, e);
                    return None;
                }
            };
            let (x, y) = clamp_to_board(spawn.x, spawn.y);
            self.players.spawn(name, &self.home_zone, x, y);
        }

        let player = self.players.get(name)?;
        match self.catalog.zone(&player.zone) {
            Ok(zone) => Some(ServerFrame::MapData(zone.clone())),
            Err(e) => {
                error!("Player {} is in an unknown zone: {}", name, e);
                None
            }
        }
    }

    pub fn leave(&mut self, name: &str) {
        self.players.remove(name);
    }

    /// Applies one command on behalf of `name` and returns the replies owed to
    /// the issuing connection.
    pub fn apply_command(&mut self, name: &str, command: Command, now: Instant) -> Vec<ServerFrame> {
        match command {
            Command::Move { dx, dy } => self.apply_move(name, dx, dy, now),
            Command::TogglePickup => self.toggle_pickup(name),
            Command::Use => self.use_item(name),
        }
    }

    fn apply_move(&mut self, name: &str, dx: f32, dy: f32, now: Instant) -> Vec<ServerFrame> {
        if !dx.is_finite() || !dy.is_finite() {
            debug!("Ignoring non-finite move from {}", name);
            return Vec::new();
        }
        let Some(player) = self.players.get_mut(name) else {
            return Vec::new();
        };

        let (x, y) = clamp_to_board(player.x + dx, player.y + dy);
        player.x = x;
        player.y = y;

        if !player.portal_ready(now) {
            return Vec::new();
        }

        let zone = match self.catalog.zone(&player.zone) {
            Ok(zone) => zone,
            Err(e) => {
                error!("Player {} is in an unknown zone: {}", name, e);
                return Vec::new();
            }
        };
        let Some(portal) = zone.portals.iter().find(|portal| portal.contains(x, y)) else {
            return Vec::new();
        };
        let target = match self.catalog.zone(&portal.target) {
            Ok(target) => target,
            Err(e) => {
                error!("Portal in {} is broken: {}", zone.name, e);
                return Vec::new();
            }
        };

        let (exit_x, exit_y) = clamp_to_board(portal.exit_x, portal.exit_y);
        info!(
            "Player {} crossed from {} to {} at ({}, {})",
            name, player.zone, target.name, exit_x, exit_y
        );
        player.zone = target.name.clone();
        player.x = exit_x;
        player.y = exit_y;
        player.portal_cooldown = Some(now + PORTAL_COOLDOWN);

        vec![
            ServerFrame::MapData(target.clone()),
            ServerFrame::Teleport {
                x: exit_x,
                y: exit_y,
            },
        ]
    }

    fn toggle_pickup(&mut self, name: &str) -> Vec<ServerFrame> {
        let Some(player) = self.players.get_mut(name) else {
            return Vec::new();
        };

        if let Some(kind) = player.inventory.take() {
            let id = self.items.add_item(&player.zone, kind, player.x, player.y);
            debug!("Player {} dropped item {} in {}", name, id, player.zone);
            return vec![ServerFrame::DropResult { success: true }];
        }

        match self
            .items
            .remove_nearest(&player.zone, player.x, player.y, PICKUP_RANGE)
        {
            Some(item) => {
                debug!("Player {} picked up item {} ({})", name, item.id, item.kind);
                player.inventory = Some(item.kind.clone());
                vec![ServerFrame::PickupResult {
                    success: true,
                    item: Some(item),
                }]
            }
            None => vec![ServerFrame::PickupResult {
                success: false,
                item: None,
            }],
        }
    }

    fn use_item(&mut self, name: &str) -> Vec<ServerFrame> {
        let Some(player) = self.players.get_mut(name) else {
            return Vec::new();
        };
        let Some(kind) = player.inventory.take() else {
            return Vec::new();
        };

        player.health = kind.apply_to_health(player.health);
        debug!("Player {} used {}, health now {}", name, kind, player.health);
        vec![ServerFrame::UseResult {
            health: player.health,
        }]
    }
}
