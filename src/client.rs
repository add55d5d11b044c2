//! One-shot client helpers for exercising a running server.
//!
//! These back the `list-leases`, `acquire`, and `flood` subcommands: an
//! administrative lease dump, a scripted offer/request handshake, and a
//! starvation load generator that hogs addresses under fabricated hardware
//! addresses.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::lease::Lease;
use crate::message::{self, MAX_DATAGRAM_SIZE, Request, Response};

/// How long to wait for a server reply before giving up.
const REPLY_TIMEOUT_SECS: u64 = 5;

async fn exchange(socket: &UdpSocket, server: SocketAddr, request: &Request) -> Result<String> {
    socket.send_to(request.encode().as_bytes(), server).await?;

    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
    let received = tokio::time::timeout(
        Duration::from_secs(REPLY_TIMEOUT_SECS),
        socket.recv_from(&mut buffer),
    )
    .await;

    match received {
        Ok(Ok((size, _))) => Ok(String::from_utf8_lossy(&buffer[..size]).into_owned()),
        Ok(Err(error)) => Err(error.into()),
        Err(_) => Err(Error::NoResponse),
    }
}

/// Fetches the server's lease table.
pub async fn query_leases(server: SocketAddr) -> Result<Vec<Lease>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let reply = exchange(&socket, server, &Request::List).await?;
    message::parse_lease_list(&reply)
}

/// Runs the discover/offer/request/acknowledge handshake and returns the
/// confirmed lease terms as (address, expiry timestamp).
///
/// A server that already holds a valid lease for `mac_address` skips the
/// offer and acknowledges directly.
pub async fn acquire(server: SocketAddr, mac_address: &str) -> Result<(Ipv4Addr, i64)> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;

    let discover = Request::Discover {
        mac_address: mac_address.to_string(),
        ip_address: Ipv4Addr::UNSPECIFIED,
        timestamp: 0,
    };
    let reply = exchange(&socket, server, &discover).await?;

    match Response::parse(&reply)? {
        Response::Offer {
            ip_address,
            timestamp,
            ..
        } => {
            info!("offered {}, requesting", ip_address);
            let request = Request::Request {
                mac_address: mac_address.to_string(),
                ip_address,
                timestamp,
            };
            let reply = exchange(&socket, server, &request).await?;
            match Response::parse(&reply)? {
                Response::Acknowledge {
                    ip_address,
                    timestamp,
                    ..
                } => Ok((ip_address, timestamp)),
                Response::Decline { reason } => Err(Error::Declined(reason)),
                other => Err(Error::InvalidMessage(format!(
                    "unexpected reply to REQUEST: {other:?}"
                ))),
            }
        }
        Response::Acknowledge {
            ip_address,
            timestamp,
            ..
        } => Ok((ip_address, timestamp)),
        Response::Decline { reason } => Err(Error::Declined(reason)),
        other => Err(Error::InvalidMessage(format!(
            "unexpected reply to DISCOVER: {other:?}"
        ))),
    }
}

/// Floods the server with DISCOVER messages under fabricated hardware
/// addresses and returns how many drew an offer.
///
/// Each message waits for its reply, so the count reflects the server's
/// actual pool state. This is the load generator for the pool-exhaustion
/// path: once every address is hogged, the remainder come back declined.
pub async fn flood(server: SocketAddr, count: usize) -> Result<usize> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let mut hogged = 0;

    for index in 0..count {
        let discover = Request::Discover {
            mac_address: fabricated_mac(index),
            ip_address: Ipv4Addr::UNSPECIFIED,
            timestamp: 0,
        };
        let reply = exchange(&socket, server, &discover).await?;

        match Response::parse(&reply)? {
            Response::Offer { ip_address, .. } => {
                hogged += 1;
                info!("[{}] hogging {}", index, ip_address);
            }
            Response::Decline { reason } => {
                warn!("[{}] declined: {}", index, reason);
            }
            other => {
                return Err(Error::InvalidMessage(format!(
                    "unexpected reply to DISCOVER: {other:?}"
                )));
            }
        }
    }

    Ok(hogged)
}

/// Locally-administered MAC for flood traffic, derived from the index so
/// runs are reproducible.
fn fabricated_mac(index: usize) -> String {
    format!(
        "02:00:00:00:{:02x}:{:02x}",
        (index >> 8) & 0xff,
        index & 0xff
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::LeaseServer;

    async fn spawn_server(config: Config) -> SocketAddr {
        let server = LeaseServer::new(config).await.unwrap();
        let addr = SocketAddr::new(
            Ipv4Addr::LOCALHOST.into(),
            server.local_addr().unwrap().port(),
        );
        tokio::spawn(async move { server.run().await });
        addr
    }

    fn test_config() -> Config {
        Config {
            network_id: Ipv4Addr::new(192, 168, 45, 0),
            subnet_mask: Ipv4Addr::new(255, 255, 255, 240),
            lease_duration_seconds: 3600,
            port: 0,
        }
    }

    #[test]
    fn test_fabricated_macs_are_distinct() {
        assert_eq!(fabricated_mac(0), "02:00:00:00:00:00");
        assert_eq!(fabricated_mac(0x1ff), "02:00:00:00:01:ff");
        assert_ne!(fabricated_mac(1), fabricated_mac(256));
    }

    #[tokio::test]
    async fn test_acquire_completes_handshake() {
        let server = spawn_server(test_config()).await;

        let (ip, timestamp) = acquire(server, "aa:bb:cc:dd:ee:ff").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 168, 45, 1));
        assert!(timestamp > 0);

        let leases = query_leases(server).await.unwrap();
        assert_eq!(leases.len(), 1);
        assert!(leases[0].acknowledged);

        // Acquiring again while the lease is valid is idempotent.
        let (ip_again, _) = acquire(server, "aa:bb:cc:dd:ee:ff").await.unwrap();
        assert_eq!(ip_again, ip);
    }

    #[tokio::test]
    async fn test_flood_hogs_the_pool_then_gets_declined() {
        let server = spawn_server(test_config()).await;

        let hogged = flood(server, 14).await.unwrap();
        assert_eq!(hogged, 14);

        // The pool is gone: a legitimate claimant is starved out.
        let result = acquire(server, "aa:bb:cc:dd:ee:ff").await;
        assert!(matches!(result, Err(Error::Declined(_))));

        let leases = query_leases(server).await.unwrap();
        assert_eq!(leases.len(), 14);
        assert!(leases.iter().all(|lease| !lease.acknowledged));
    }
}
