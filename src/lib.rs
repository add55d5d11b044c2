//! # leaseline
//!
//! A lease-allocation server speaking a line-oriented, DHCP-style protocol
//! over UDP datagrams.
//!
//! ## Features
//!
//! - Full allocation sequence: DISCOVER, OFFER, REQUEST, ACKNOWLEDGE, DECLINE
//! - Lease renewal, release, and administrative listing
//! - Fixed address pool derived from a network identifier and subnet mask
//! - Lazy expiry: expired leases are rebound on demand, never swept
//! - Stale-offer rejection: a REQUEST must match the stored lease terms exactly
//! - Async/await with Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use leaseline::{Config, LeaseServer};
//!
//! #[tokio::main]
//! async fn main() -> leaseline::Result<()> {
//!     let config = Config::load_or_create("config.json")?;
//!     let server = LeaseServer::new(config).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`Config`] - Server configuration (network, mask, lease duration, port)
//! - [`LeaseServer`] - UDP loop that parses messages and sends replies
//! - [`Leases`] - The lease state machine and allocation policy
//! - [`AddressPool`] - The precomputed set of assignable addresses
//! - [`Request`] / [`Response`] - Wire message parsing and encoding

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod lease;
pub mod message;
pub mod pool;
pub mod server;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use lease::{Lease, Leases, Outcome};
pub use message::{Request, Response};
pub use pool::AddressPool;
pub use server::LeaseServer;
