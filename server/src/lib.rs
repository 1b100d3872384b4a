//! # Arena Server Library
//!
//! Authoritative session server for the tank arena. It keeps the roster of
//! connected players, applies their movement requests and replicates joins,
//! leaves and moves to every connected client over UDP.
//!
//! ## Core Responsibilities
//!
//! ### Roster Authority
//! The server is the only place player identities are assigned. Ids are
//! handed out from a counter and released slots are reused before the
//! counter grows, so a long-running server does not accumulate dead ids.
//!
//! ### Movement
//! Clients send a compass direction, never a position. The server steps the
//! player one unit and clamps the result to the world, so a client cannot
//! place itself outside the arena.
//!
//! ### Replication
//! A joining client receives the full roster in one datagram; everyone else
//! receives a single join event. Moves are echoed to all players including
//! the mover, which doubles as confirmation.
//!
//! ## Architecture Design
//!
//! ### Single Dispatch Loop
//! A receive task forwards raw datagrams over a channel to one loop that
//! owns the registry. Each datagram is decoded, applied and fully delivered
//! before the next one is taken, so no request ever observes another one
//! half-applied.
//!
//! ### Fire-and-Forget Transport
//! There are no acknowledgements, retries or error replies. Undecodable
//! datagrams and requests from unknown endpoints are dropped silently, and a
//! failed send to one peer does not hold up the rest of a broadcast.
//!
//! ### No Session Expiry
//! A client that vanishes without sending `PlayerLeft` keeps its slot until
//! the process exits.
//!
//! ## Module Organization
//!
//! - `registry`: slot storage, id allocation and endpoint lookup
//! - `dispatcher`: request-kind routing and per-request handlers
//! - `replication`: outbound fan-out and the transport seam
//! - `network`: socket ownership, receive task and the main loop
//! - `config` / `error`: server settings and the error taxonomy
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(ServerConfig::default()).await?;
//!
//!     // Runs until the process is terminated
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod network;
pub mod registry;
pub mod replication;

pub use config::ServerConfig;
pub use error::{PlayerKey, ServerError};
pub use network::Server;
pub use registry::{PlayerRecord, Registry};
pub use replication::{DeliveryReport, Outbox, Transport};
