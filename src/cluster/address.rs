//! Address allocation for nodes and pods
//!
//! Each kind of resource draws from its own pool. The first allocation
//! returns the pool's base address and every following one bumps the
//! numeric suffix by one. The sequence only ever moves forward, so an
//! address is never handed out twice even after the resource holding it
//! was removed.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::controller::ControllerError;

/// Base address of the node pool
pub const NODE_ADDRESS_BASE: Ipv4Addr = Ipv4Addr::new(127, 0, 1, 0);

/// Base address of the pod pool
pub const POD_ADDRESS_BASE: Ipv4Addr = Ipv4Addr::new(127, 0, 2, 0);

/// Default number of addresses in each pool
pub const DEFAULT_POOL_CAPACITY: u32 = 256;

/// Sequential allocator over a contiguous IPv4 range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressAllocator {
    /// Human-readable pool name used in errors ("node", "pod")
    kind: String,

    /// First address of the pool
    base: Ipv4Addr,

    /// Number of addresses the pool may hand out
    capacity: u32,

    /// Offset of the next address to hand out
    next: u32,
}

impl AddressAllocator {
    /// Create an allocator starting at `base`
    pub fn new(kind: impl Into<String>, base: Ipv4Addr, capacity: u32) -> Self {
        Self {
            kind: kind.into(),
            base,
            capacity,
            next: 0,
        }
    }

    /// Allocator for node addresses (127.0.1.x)
    pub fn for_nodes(capacity: u32) -> Self {
        Self::new("node", NODE_ADDRESS_BASE, capacity)
    }

    /// Allocator for pod addresses (127.0.2.x)
    pub fn for_pods(capacity: u32) -> Self {
        Self::new("pod", POD_ADDRESS_BASE, capacity)
    }

    /// Return the address the next `commit` will consume.
    ///
    /// Calling `peek` repeatedly without committing returns the same address.
    pub fn peek(&self) -> Result<Ipv4Addr, ControllerError> {
        if self.next >= self.capacity {
            return Err(ControllerError::AddressExhausted(self.kind.clone()));
        }

        u32::from(self.base)
            .checked_add(self.next)
            .map(Ipv4Addr::from)
            .ok_or_else(|| ControllerError::AddressExhausted(self.kind.clone()))
    }

    /// Peek and advance in one step
    pub fn allocate(&mut self) -> Result<Ipv4Addr, ControllerError> {
        let address = self.peek()?;
        self.commit();
        Ok(address)
    }

    /// Mark the peeked address as used
    pub fn commit(&mut self) {
        self.next += 1;
    }

    /// Number of addresses handed out so far
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
