//! # Zone Sync Server Library
//!
//! This library provides the authoritative server for a zoned multiplayer
//! world. It owns the canonical state of every player, applies client
//! commands, and streams zone-scoped snapshots to every connection at a fixed
//! tick rate.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Player position, inventory and health live only on the server. Clients
//! send movement deltas and actions; the server clamps, applies and reports
//! the outcome.
//!
//! ### Zones and Portals
//! The world is split into named zones loaded once at startup. Portals are
//! rectangles that move a player into another zone, with a short cooldown so
//! a player standing on an exit is not bounced straight back.
//!
//! ### Items
//! Each zone has a pool of ground items. Picking up removes the nearest item
//! within reach; dropping mints a new item at the player's feet; using an
//! item applies its effect to health.
//!
//! ### State Broadcasting
//! Once per tick every connection receives the players, collision flags and
//! ground items of its own zone. Delivery is best-effort.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! One task owns the session registry and the game state. Connection tasks
//! only decode frames and forward events over a channel, so a command and a
//! tick never observe each other half-applied, and every snapshot within a
//! tick reflects the same moment.
//!
//! ### WebSocket Transport
//! Clients connect to `/ws/{player}` and exchange JSON text frames. Inbound
//! frames are decoded into a tagged [`shared::Command`] at the boundary;
//! anything else is dropped silently.
//!
//! ## Module Organization
//!
//! - `catalog`: immutable zone definitions and their validation
//! - `ground_items`: per-zone item pools
//! - `players`: per-player records
//! - `sessions`: connection to player bindings and outbound queues
//! - `game`: world state and the command processor
//! - `collision`: per-tick contact detection
//! - `broadcast`: snapshot assembly and delivery
//! - `network`: socket handling and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::catalog::ZoneCatalog;
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8000",
//!         ServerConfig::default(),
//!         ZoneCatalog::default_world()?,
//!     )
//!     .await?;
//!
//!     // Accepts connections, applies commands and broadcasts at 20Hz
//!     // until shut down through a `ServerHandle`.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod catalog;
pub mod collision;
pub mod game;
pub mod ground_items;
pub mod network;
pub mod players;
pub mod sessions;
