//! Session registry binding live connections to player identities
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Connection lifecycle (bind on handshake, unbind on teardown)
//! - Outbound delivery to a connection's writer task
//! - Capacity management and point-in-time listings for the broadcaster
//!
//! The registry never touches player records. The server pairs every
//! `unbind` with the matching player cleanup in the same step.

use log::{debug, info, warn};
use shared::Outbound;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionId = u32;

/// Messages a writer may fall behind by before further ones are dropped
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// A live connection and the player it speaks for
#[derive(Debug)]
pub struct Session {
    /// Connection identifier assigned by the acceptor
    pub id: ConnectionId,
    /// Player identity supplied in the handshake path
    pub player: String,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// When the session was bound
    pub connected_at: Instant,
    /// Queue drained by the connection's writer task
    sender: mpsc::Sender<Outbound>,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        player: &str,
        addr: SocketAddr,
        sender: mpsc::Sender<Outbound>,
    ) -> Self {
        Self {
            id,
            player: player.to_string(),
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a message for delivery. Returns false if the writer is gone or
    /// too far behind to take more.
    pub fn send(&self, message: Outbound) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue for connection {} is full, dropping", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Manages all bound sessions
///
/// Several connections may bind the same player name; they then share one
/// player record and the last command applied wins.
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    max_clients: usize,
}

impl SessionRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a session. Returns false if the server is at capacity or the
    /// connection id is already bound.
    pub fn bind(&mut self, session: Session) -> bool {
        if self.sessions.len() >= self.max_clients {
            warn!(
                "Refusing {} from {}: server full ({} sessions)",
                session.player, session.addr, self.max_clients
            );
            return false;
        }
        if self.sessions.contains_key(&session.id) {
            warn!("Connection {} is already bound", session.id);
            return false;
        }

        info!(
            "Connection {} from {} bound to player {}",
            session.id, session.addr, session.player
        );
        self.sessions.insert(session.id, session);
        true
    }

    /// Removes a session and returns it, or None if it was never bound.
    pub fn unbind(&mut self, id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        info!(
            "Connection {} ({}) unbound after {:.1}s",
            id,
            session.player,
            session.connected_at.elapsed().as_secs_f32()
        );
        Some(session)
    }

    pub fn identity_of(&self, id: ConnectionId) -> Option<&str> {
        self.sessions.get(&id).map(|s| s.player.as_str())
    }

    /// True while any session is bound to `player`.
    pub fn is_player_bound(&self, player: &str) -> bool {
        self.sessions.values().any(|s| s.player == player)
    }

    /// Point-in-time list of (connection, player) pairs, ordered by connection id.
    pub fn connections_snapshot(&self) -> Vec<(ConnectionId, String)> {
        let mut pairs: Vec<(ConnectionId, String)> = self
            .sessions
            .values()
            .map(|s| (s.id, s.player.clone()))
            .collect();
        pairs.sort_by_key(|(id, _)| *id);
        pairs
    }

    /// Best-effort delivery to one connection.
    pub fn send(&self, id: ConnectionId, message: Outbound) -> bool {
        self.sessions
            .get(&id)
            .map_or(false, |session| session.send(message))
    }

    /// Returns the number of bound sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are bound
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
