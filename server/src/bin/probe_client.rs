//! Scripted client for poking a running arena server by hand.
//!
//! Joins under a name, prints the roster, walks in random directions for a
//! few steps while printing every event it sees, then leaves.

use clap::Parser;
use log::{info, warn};
use rand::seq::SliceRandom;
use shared::protocol::leave_request;
use shared::{Direction, JoinRequest, MoveRequest, ServerEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:54000")]
    server: SocketAddr,

    /// Display name to join with
    #[arg(short, long, default_value = "probe")]
    name: String,

    /// Number of random moves to send before leaving
    #[arg(short, long, default_value_t = 10)]
    moves: usize,

    /// Delay between moves in milliseconds
    #[arg(short, long, default_value_t = 250)]
    interval: u64,
}

/// Prints server events until none arrive for `quiet`.
async fn drain_events(socket: &UdpSocket, quiet: Duration) -> std::io::Result<()> {
    let mut buf = [0u8; 2048];
    while let Ok(received) = timeout(quiet, socket.recv_from(&mut buf)).await {
        let (len, _) = received?;
        match ServerEvent::decode(&buf[..len]) {
            Ok(ServerEvent::Roster(players)) => {
                info!("Roster ({} players):", players.len());
                for player in players {
                    info!(
                        "  {} {:?} at ({}, {}) facing {:?}",
                        player.id, player.name, player.position.x, player.position.y, player.facing
                    );
                }
            }
            Ok(event) => info!("Event: {:?}", event),
            Err(e) => warn!("Undecodable datagram: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Probe bound to {}", socket.local_addr()?);

    info!("Joining {} as {:?}", args.server, args.name);
    socket
        .send_to(&JoinRequest::new(args.name.as_str()).encode(), args.server)
        .await?;
    drain_events(&socket, Duration::from_millis(500)).await?;

    let mut rng = rand::thread_rng();
    for _ in 0..args.moves {
        let direction = *Direction::ALL.choose(&mut rng).unwrap_or(&Direction::North);
        info!("Moving {:?}", direction);
        socket
            .send_to(&MoveRequest::new(direction).encode(), args.server)
            .await?;
        drain_events(&socket, Duration::from_millis(args.interval)).await?;
        sleep(Duration::from_millis(10)).await;
    }

    socket.send_to(&leave_request(), args.server).await?;
    info!("Left the arena");

    Ok(())
}
