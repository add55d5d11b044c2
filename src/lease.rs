//! Lease state machine and allocation decisions.
//!
//! This module owns every decision the server makes: which address a
//! claimant gets, whether a REQUEST confirms or gets declined, and when an
//! expired lease is rebound to someone else. The transport layer only
//! forwards events and serializes whatever [`Outcome`] comes back, so the
//! policy here is testable without a socket.
//!
//! Leases are never removed. A released or expired lease keeps its slot and
//! sequence number until a later claimant rebinds it; reclamation is
//! entirely lazy and happens only when a slot is needed.
//!
//! # Thread Safety
//!
//! All state sits behind one [`RwLock`]. Every mutating operation takes the
//! write half, so concurrent packet handlers cannot interleave allocation
//! decisions, and [`list`](Leases::list) snapshots under the read half.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::pool::AddressPool;

/// A time-bounded, exclusive binding between a claimant and an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Position in creation order, starting at 1. Stable across rebinding.
    pub sequence: u64,

    /// Hardware address identifying the claimant.
    pub mac_address: String,

    /// The pool address bound to this lease.
    pub ip_address: Ipv4Addr,

    /// Unix timestamp at which the lease becomes reclaimable.
    ///
    /// Kept in wire form (seconds) because REQUEST compares the client's
    /// claimed timestamp against this value for exact equality.
    pub expires_at: i64,

    /// True once the offer/request/acknowledge handshake has completed.
    pub acknowledged: bool,
}

impl Lease {
    /// Returns true if the lease is reclaimable at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Seconds remaining until expiry, or 0 if already expired.
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }
}

/// The decision produced for one inbound protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Propose lease terms to the claimant.
    Offer(Lease),
    /// Confirm lease terms to the claimant.
    Acknowledge(Lease),
    /// Reject the event, with a reason for the client.
    Decline(String),
}

#[derive(Debug)]
struct LeaseTable {
    pool: AddressPool,
    /// Every lease ever created, in creation order. Never shrinks.
    leases: Vec<Lease>,
    /// Claimant MAC to index in `leases`. Rewritten on rebinding.
    by_mac: HashMap<String, usize>,
}

/// Lease manager: owns the address pool and the lease collection.
pub struct Leases {
    state: RwLock<LeaseTable>,
    lease_duration: i64,
    clock: Arc<dyn Clock>,
}

impl Leases {
    /// Creates a lease manager for the configured subnet, on the wall clock.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new), but with an explicit time source.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let pool = AddressPool::build(config.network_id, config.subnet_mask)?;

        Ok(Self {
            state: RwLock::new(LeaseTable {
                pool,
                leases: Vec::new(),
                by_mac: HashMap::new(),
            }),
            lease_duration: i64::from(config.lease_duration_seconds),
            clock,
        })
    }

    /// Number of assignable addresses in the pool.
    pub async fn capacity(&self) -> usize {
        self.state.read().await.pool.capacity()
    }

    /// Handles a DISCOVER event.
    ///
    /// A claimant with an expired lease gets it renewed in place and
    /// re-offered. A claimant whose lease is still valid is acknowledged
    /// directly. An unknown claimant goes through allocation, which may
    /// offer a fresh slot, rebind an expired lease, or decline when the
    /// pool has no room left.
    pub async fn discover(&self, mac_address: &str) -> Outcome {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        if let Some(&index) = state.by_mac.get(mac_address) {
            let lease = &mut state.leases[index];
            if lease.is_expired(now) {
                lease.expires_at = now + self.lease_duration;
                return Outcome::Offer(lease.clone());
            }
            return Outcome::Acknowledge(lease.clone());
        }

        self.allocate(&mut state, mac_address, now)
    }

    /// Handles a REQUEST event carrying the terms the client believes in.
    ///
    /// The claimed address and timestamp must match the stored lease
    /// exactly: a client acting on a stale offer (for instance after its
    /// lease expired and was rebound to another claimant) is declined
    /// rather than silently confirmed.
    pub async fn request(
        &self,
        mac_address: &str,
        ip_address: Ipv4Addr,
        timestamp: i64,
    ) -> Outcome {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let Some(&index) = state.by_mac.get(mac_address) else {
            return Outcome::Decline("no lease for this client".to_string());
        };

        let lease = &mut state.leases[index];
        if lease.ip_address != ip_address {
            return Outcome::Decline("requested address does not match lease".to_string());
        }
        if lease.is_expired(now) {
            return Outcome::Decline("lease has expired".to_string());
        }
        if lease.expires_at != timestamp {
            return Outcome::Decline("stale offer timestamp".to_string());
        }

        lease.acknowledged = true;
        Outcome::Acknowledge(lease.clone())
    }

    /// Handles a RENEW event.
    ///
    /// A known claimant gets its expiry pushed out and is acknowledged.
    /// An unknown claimant falls through to a fresh allocation attempt,
    /// so a renew that raced a rebinding degrades to acquisition instead
    /// of producing a distinct error.
    pub async fn renew(&self, mac_address: &str) -> Outcome {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        if let Some(&index) = state.by_mac.get(mac_address) {
            let lease = &mut state.leases[index];
            lease.expires_at = now + self.lease_duration;
            lease.acknowledged = true;
            return Outcome::Acknowledge(lease.clone());
        }

        self.allocate(&mut state, mac_address, now)
    }

    /// Handles a RELEASE event. Fire-and-forget: produces no response.
    ///
    /// Forces the lease expiry to "now", which makes the slot immediately
    /// eligible for rebinding. Releasing an unknown claimant is a no-op.
    pub async fn release(&self, mac_address: &str) {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        if let Some(&index) = state.by_mac.get(mac_address) {
            let lease = &mut state.leases[index];
            lease.expires_at = now;
            lease.acknowledged = false;
        }
    }

    /// Returns a snapshot of every lease in creation order.
    pub async fn list(&self) -> Vec<Lease> {
        self.state.read().await.leases.clone()
    }

    /// Binds an unknown claimant: a fresh pool slot if one remains,
    /// otherwise the first expired lease is rebound, otherwise Decline.
    fn allocate(&self, state: &mut LeaseTable, mac_address: &str, now: i64) -> Outcome {
        if let Some(ip_address) = state.pool.allocate() {
            let lease = Lease {
                sequence: state.leases.len() as u64 + 1,
                mac_address: mac_address.to_string(),
                ip_address,
                expires_at: now + self.lease_duration,
                acknowledged: false,
            };
            state.by_mac.insert(mac_address.to_string(), state.leases.len());
            state.leases.push(lease.clone());
            return Outcome::Offer(lease);
        }

        let expired = state
            .leases
            .iter()
            .position(|lease| lease.is_expired(now));

        match expired {
            Some(index) => {
                let previous = state.leases[index].mac_address.clone();
                state.by_mac.remove(&previous);
                state.by_mac.insert(mac_address.to_string(), index);

                let lease = &mut state.leases[index];
                lease.mac_address = mac_address.to_string();
                lease.expires_at = now + self.lease_duration;
                lease.acknowledged = false;
                Outcome::Offer(lease.clone())
            }
            None => Outcome::Decline("address pool exhausted".to_string()),
        }
    }
}
