//! Headless bot that wanders a zone, picks things up and eats them.

use clap::Parser;
use env_logger::Env;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use shared::{Command, Outbound, ServerFrame};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8000")]
    server: String,
    /// Player name to connect as
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// Moves sent per second
    #[clap(short, long, default_value = "10")]
    rate: u32,
    /// Largest step per move on each axis
    #[clap(long, default_value = "8.0")]
    step: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let url = format!("ws://{}/ws/{}", args.server, args.name);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    info!("Connected to {} as {}", url, args.name);

    let (mut sink, mut stream) = ws_stream.split();
    let mut ticker = interval(Duration::from_millis(1000 / u64::from(args.rate.max(1))));
    let mut steps: u64 = 0;
    let mut rng = rand::thread_rng();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                steps += 1;
                let command = if steps % 40 == 0 {
                    Command::Use
                } else if steps % 20 == 0 {
                    Command::TogglePickup
                } else {
                    Command::Move {
                        dx: rng.gen_range(-args.step..=args.step),
                        dy: rng.gen_range(-args.step..=args.step),
                    }
                };
                sink.send(Message::Text(command.encode())).await?;
            },

            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Connection error: {}", e);
                        break;
                    }
                };

                match serde_json::from_str::<Outbound>(&text) {
                    Ok(Outbound::Frame(ServerFrame::MapData(zone))) => {
                        info!("Entered {} ({} portals)", zone.name, zone.portals.len());
                    }
                    Ok(Outbound::Frame(ServerFrame::Teleport { x, y })) => {
                        info!("Teleported to ({:.1}, {:.1})", x, y);
                    }
                    Ok(Outbound::Frame(frame)) => info!("Reply: {:?}", frame),
                    Ok(Outbound::Snapshot(snapshot)) => {
                        if steps % 50 == 0 {
                            debug!(
                                "Snapshot: {} players, {} colliding, {} items",
                                snapshot.players.len(),
                                snapshot.colliding.len(),
                                snapshot.ground_items.len()
                            );
                        }
                    }
                    Err(e) => warn!("Unreadable server message: {}", e),
                }
            },
        }
    }

    Ok(())
}
