//! Per-project advisory leases

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: u64,
    expires_at: Instant,
}

/// At most one live lease per key. A lease that outlives its TTL (for
/// example because its holder hung) may be taken over by the next caller.
#[derive(Debug, Clone)]
pub struct LeaseTable {
    leases: Arc<DashMap<String, Lease>>,
    next_token: Arc<AtomicU64>,
    ttl: Duration,
}

impl LeaseTable {
    pub fn new(ttl: Duration) -> Self {
        LeaseTable {
            leases: Arc::new(DashMap::new()),
            next_token: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take the lease for `key`, or `None` while someone else holds a live one.
    pub fn try_acquire(&self, key: &str) -> Option<LeaseGuard> {
        let now = Instant::now();
        let lease = Lease {
            token: self.next_token.fetch_add(1, Ordering::Relaxed),
            expires_at: now + self.ttl,
        };

        match self.leases.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if held.get().expires_at > now {
                    return None;
                }
                tracing::warn!("Taking over expired lease for {}", key);
                held.insert(lease);
            }
            Entry::Vacant(free) => {
                free.insert(lease);
            }
        }

        Some(LeaseGuard {
            leases: Arc::clone(&self.leases),
            key: key.to_string(),
            token: lease.token,
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.leases
            .get(key)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }
}

/// Releases the lease when dropped, unless it has since been taken over.
#[derive(Debug)]
pub struct LeaseGuard {
    leases: Arc<DashMap<String, Lease>>,
    key: String,
    token: u64,
}

impl LeaseGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.leases
            .remove_if(&self.key, |_, lease| lease.token == self.token);
    }
}
