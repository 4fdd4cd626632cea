//! Server network layer: WebSocket sessions feeding the world actor loop
//!
//! Every connection gets a reader task and a writer task. Readers decode
//! frames into [`Command`]s and forward them to the main loop; writers drain a
//! per-connection queue onto the socket. The main loop owns the session
//! registry and the game state, so commands and ticks never interleave.

use crate::broadcast::{broadcast_tick, tick_period};
use crate::catalog::ZoneCatalog;
use crate::game::GameState;
use crate::sessions::{ConnectionId, Session, SessionRegistry, OUTBOUND_QUEUE_CAPACITY};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use percent_encoding::percent_decode_str;
use shared::{Command, Outbound, DEFAULT_TICK_RATE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

/// Events sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        id: ConnectionId,
        player: String,
        addr: SocketAddr,
        sender: mpsc::Sender<Outbound>,
    },
    Command {
        id: ConnectionId,
        command: Command,
    },
    Disconnected {
        id: ConnectionId,
    },
    Shutdown,
}

/// Runtime settings for [`Server`]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub max_clients: usize,
    pub home_zone: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_clients: 64,
            home_zone: "town".to_string(),
        }
    }
}

/// Cloneable handle for stopping a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        let _ = self.server_tx.send(ServerMessage::Shutdown);
    }
}

/// Emits `Disconnected` when a connection task ends, however it ends.
struct SessionGuard {
    id: ConnectionId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self
            .server_tx
            .send(ServerMessage::Disconnected { id: self.id });
    }
}

/// Main server coordinating sessions and world state
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    acceptor: Option<JoinHandle<()>>,
    sessions: SessionRegistry,
    game_state: GameState,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: ServerConfig,
        catalog: ZoneCatalog,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let game_state = GameState::new(catalog, &config.home_zone)?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}/ws/{{player}}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            acceptor: None,
            sessions: SessionRegistry::new(config.max_clients),
            game_state,
            tick_duration: tick_period(config.tick_rate),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Spawns the task accepting TCP connections and upgrading them
    fn spawn_acceptor(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = self.listener.take().ok_or("server is already running")?;
        let server_tx = self.server_tx.clone();

        self.acceptor = Some(tokio::spawn(async move {
            let mut next_id: ConnectionId = 1;
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let id = next_id;
                        next_id = next_id.wrapping_add(1);
                        tokio::spawn(handle_connection(stream, addr, id, server_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
        Ok(())
    }

    /// Applies one event to the registry and world. Returns false on shutdown.
    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Connected {
                id,
                player,
                addr,
                sender,
            } => {
                if !self.sessions.bind(Session::new(id, &player, addr, sender)) {
                    // Dropping the session closes its writer, which closes the socket.
                    return true;
                }
                if let Some(frame) = self.game_state.join(&player) {
                    self.sessions.send(id, Outbound::Frame(frame));
                }
            }
            ServerMessage::Command { id, command } => {
                let Some(player) = self.sessions.identity_of(id).map(str::to_string) else {
                    return true;
                };
                let now = std::time::Instant::now();
                for frame in self.game_state.apply_command(&player, command, now) {
                    self.sessions.send(id, Outbound::Frame(frame));
                }
            }
            ServerMessage::Disconnected { id } => self.disconnect(id),
            ServerMessage::Shutdown => return false,
        }
        true
    }

    /// Unbinds a connection and removes its player once no other session
    /// speaks for it.
    fn disconnect(&mut self, id: ConnectionId) {
        if let Some(session) = self.sessions.unbind(id) {
            if !self.sessions.is_player_bound(&session.player) {
                self.game_state.leave(&session.player);
            }
        }
    }

    fn run_tick(&mut self) {
        self.game_state.tick += 1;
        let queued = broadcast_tick(&self.game_state, &self.sessions);

        if self.game_state.tick % 100 == 0 && !self.sessions.is_empty() {
            debug!(
                "Tick {}: {} sessions, {} players, {} snapshots queued",
                self.game_state.tick,
                self.sessions.len(),
                self.game_state.players.len(),
                queued
            );
        }
    }

    /// Main server loop: applies events as they arrive and broadcasts once
    /// per tick until shut down.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor()?;

        // Rescheduled after each tick's work, so the period is work + tick_duration.
        let tick = sleep(self.tick_duration);
        tokio::pin!(tick);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => {
                            if !self.handle_message(message) {
                                info!("Server shutting down");
                                break;
                            }
                        }
                        None => break,
                    }
                },

                _ = &mut tick => {
                    self.run_tick();
                    tick.as_mut().reset(tokio::time::Instant::now() + self.tick_duration);
                },
            }
        }

        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
        }
        Ok(())
    }
}

/// Extracts the percent-decoded player name from a `/ws/{player}` request path.
pub fn player_name_from_path(path: &str) -> Option<String> {
    let segment = path.strip_prefix("/ws/")?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    let name = percent_decode_str(segment).decode_utf8().ok()?;
    Some(name.into_owned())
}

/// Runs one connection from handshake to teardown.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let mut player = None;
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match player_name_from_path(request.uri().path()) {
            Some(name) => {
                player = Some(name);
                Ok(response)
            }
            None => {
                let mut rejection = ErrorResponse::new(Some("expected /ws/{player}".to_string()));
                *rejection.status_mut() = StatusCode::NOT_FOUND;
                Err(rejection)
            }
        }
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let Some(player) = player else {
        return;
    };

    let (mut sink, mut stream) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE_CAPACITY);

    if server_tx
        .send(ServerMessage::Connected {
            id,
            player,
            addr,
            sender: tx,
        })
        .is_err()
    {
        return;
    }
    let guard = SessionGuard {
        id,
        server_tx: server_tx.clone(),
    };

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode message for connection {}: {}", id, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match Command::decode(&text) {
                Some(command) => {
                    if server_tx.send(ServerMessage::Command { id, command }).is_err() {
                        break;
                    }
                }
                None => debug!("Ignoring malformed message from connection {}", id),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} dropped: {}", id, e);
                break;
            }
        }
    }

    drop(guard);
    let _ = writer.await;
}
