use clap::Parser;
use log::{error, info};
use server::config::{DEFAULT_MAX_PLAYERS, DEFAULT_PORT};
use server::{Server, ServerConfig};
use shared::{WorldBounds, WORLD_HEIGHT, WORLD_WIDTH};
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// World width in grid units
    #[arg(long, default_value_t = WORLD_WIDTH as u32)]
    world_width: u32,

    /// World height in grid units
    #[arg(long, default_value_t = WORLD_HEIGHT as u32)]
    world_height: u32,

    /// Maximum number of simultaneously active players
    #[arg(short, long, default_value_t = DEFAULT_MAX_PLAYERS)]
    max_players: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            world: WorldBounds::new(args.world_width, args.world_height),
            max_players: args.max_players,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());

    let mut server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
