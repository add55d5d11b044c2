use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lease::{Leases, Outcome};
use crate::message::{MAX_DATAGRAM_SIZE, Request, Response};

/// How long one receive call waits before the loop goes back to waiting.
/// An idle network is not an error.
const RECV_TIMEOUT_SECS: u64 = 60;

pub struct LeaseServer {
    config: Arc<Config>,
    leases: Arc<Leases>,
    socket: Arc<UdpSocket>,
}

impl LeaseServer {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let leases = Arc::new(Leases::new(&config)?);

        let socket = UdpSocket::bind(("0.0.0.0", config.port))
            .await
            .map_err(|error| {
                Error::Socket(format!("failed to bind port {}: {}", config.port, error))
            })?;

        info!("lease server starting on port {}", config.port);
        info!(
            "network {} mask {} ({} assignable addresses, {}s leases)",
            config.network_base(),
            config.subnet_mask,
            leases.capacity().await,
            config.lease_duration_seconds
        );

        Ok(Self {
            config,
            leases,
            socket: Arc::new(socket),
        })
    }

    /// The bound local address. Useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn leases(&self) -> &Leases {
        &self.leases
    }

    pub async fn run(&self) -> Result<()> {
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

        info!("server ready to receive messages");

        loop {
            let received = tokio::time::timeout(
                Duration::from_secs(RECV_TIMEOUT_SECS),
                self.socket.recv_from(&mut buffer),
            )
            .await;

            match received {
                Ok(Ok((size, source))) => {
                    let data = buffer[..size].to_vec();
                    let leases = Arc::clone(&self.leases);
                    let socket = Arc::clone(&self.socket);

                    tokio::spawn(async move {
                        let handler = MessageHandler { leases, socket };
                        if let Err(error) = handler.handle_message(&data, source).await {
                            warn!("dropping message from {}: {}", source, error);
                        }
                    });
                }
                Ok(Err(error)) => {
                    warn!("error receiving datagram: {}", error);
                }
                Err(_) => {
                    debug!("no messages for {}s, still waiting", RECV_TIMEOUT_SECS);
                }
            }
        }
    }
}

struct MessageHandler {
    leases: Arc<Leases>,
    socket: Arc<UdpSocket>,
}

impl MessageHandler {
    /// Parses one datagram, applies the lease decision, and sends the reply.
    ///
    /// All acceptance/rejection policy lives in [`Leases`]; this method only
    /// maps events to operations and outcomes to wire messages. Any error
    /// bubbles up to the caller, which logs and drops — the server never
    /// answers a message it could not parse.
    async fn handle_message(&self, data: &[u8], source: SocketAddr) -> Result<()> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidMessage("datagram is not UTF-8".to_string()))?;
        let request = Request::parse(text)?;

        info!("{} from {}", request.kind(), source);

        let reply = match &request {
            Request::Discover { mac_address, .. } => {
                Some(self.decide(self.leases.discover(mac_address).await))
            }
            Request::Request {
                mac_address,
                ip_address,
                timestamp,
            } => Some(self.decide(
                self.leases
                    .request(mac_address, *ip_address, *timestamp)
                    .await,
            )),
            Request::Renew { mac_address, .. } => {
                Some(self.decide(self.leases.renew(mac_address).await))
            }
            Request::Release { mac_address, .. } => {
                self.leases.release(mac_address).await;
                info!("released lease for {}", mac_address);
                None
            }
            Request::List => Some(Response::LeaseList(self.leases.list().await)),
        };

        if let Some(reply) = reply {
            self.socket
                .send_to(reply.encode().as_bytes(), source)
                .await?;
        }

        Ok(())
    }

    fn decide(&self, outcome: Outcome) -> Response {
        match outcome {
            Outcome::Offer(lease) => {
                info!(
                    "OFFER {} to {} (expires {})",
                    lease.ip_address, lease.mac_address, lease.expires_at
                );
                Response::offer(&lease)
            }
            Outcome::Acknowledge(lease) => {
                info!("ACKNOWLEDGE {} to {}", lease.ip_address, lease.mac_address);
                Response::acknowledge(&lease)
            }
            Outcome::Decline(reason) => {
                warn!("DECLINE: {}", reason);
                Response::Decline { reason }
            }
        }
    }
}
