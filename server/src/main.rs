use clap::Parser;
use env_logger::Env;
use log::info;
use server::catalog::ZoneCatalog;
use server::network::{Server, ServerConfig};
use shared::DEFAULT_TICK_RATE;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8000")]
    port: u16,
    /// Snapshot broadcasts per second
    #[clap(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,
    /// Maximum number of concurrent sessions
    #[clap(short, long, default_value = "64")]
    max_clients: usize,
    /// Directory of zone definition files; the built-in world is used if omitted
    #[clap(short, long)]
    zones: Option<PathBuf>,
    /// Zone where new players spawn
    #[clap(long, default_value = "town")]
    home_zone: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let catalog = match &args.zones {
        Some(dir) => ZoneCatalog::load_dir(dir)?,
        None => {
            info!("No zone directory given, using the built-in world");
            ZoneCatalog::default_world()?
        }
    };

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        home_zone: args.home_zone,
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config, catalog).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
