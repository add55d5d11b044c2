//! Address pool construction and slot tracking.
//!
//! The pool is the finite, precomputed set of assignable addresses for one
//! configured subnet: every host address in ascending numeric order, minus
//! the network address and the broadcast address. It is built once at
//! startup and the address sequence never changes afterwards.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// The fixed set of assignable addresses for one subnet.
///
/// Slots are handed out lowest-first and claimed permanently: a slot is
/// never returned to the pool, because address reuse happens at the lease
/// layer by rebinding an expired lease to a new claimant.
#[derive(Debug)]
pub struct AddressPool {
    addresses: Vec<Ipv4Addr>,
    assigned: Vec<bool>,
}

impl AddressPool {
    /// Builds the pool for the given network identifier and subnet mask.
    ///
    /// The network identifier is masked first, so host bits in the
    /// configured value are ignored. The resulting pool holds
    /// 2^(host bits) − 2 addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the mask leaves no assignable
    /// host addresses (prefix length 31 or 32).
    pub fn build(network_id: Ipv4Addr, subnet_mask: Ipv4Addr) -> Result<Self> {
        let mask = u32::from(subnet_mask);
        let network = u32::from(network_id) & mask;

        // !mask is the broadcast offset: 2^(host bits) - 1.
        let broadcast_offset = !mask;
        if broadcast_offset < 2 {
            return Err(Error::InvalidConfig(format!(
                "subnet mask {subnet_mask} leaves no assignable host addresses"
            )));
        }

        let addresses: Vec<Ipv4Addr> = (1..broadcast_offset)
            .map(|offset| Ipv4Addr::from(network + offset))
            .collect();
        let assigned = vec![false; addresses.len()];

        Ok(Self { addresses, assigned })
    }

    /// Number of assignable addresses in the pool.
    pub fn capacity(&self) -> usize {
        self.addresses.len()
    }

    /// True once every slot has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.assigned.iter().all(|taken| *taken)
    }

    /// Claims the lowest free slot and returns its address.
    pub fn allocate(&mut self) -> Option<Ipv4Addr> {
        let slot = self.assigned.iter().position(|taken| !taken)?;
        self.assigned[slot] = true;
        Some(self.addresses[slot])
    }

    /// The addresses in pool order.
    pub fn addresses(&self) -> &[Ipv4Addr] {
        &self.addresses
    }
}
