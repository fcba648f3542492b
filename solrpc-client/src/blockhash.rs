//! Cache of recently fetched blockhashes

use std::collections::BTreeMap;
use std::time::Duration;

use solrpc_base::Hash;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::types::LatestBlockhash;

/// Number of blockhashes remembered for expiry lookups
const RETAINED_BLOCKHASHES: usize = 64;

#[derive(Debug, Clone)]
struct CachedBlockhash {
    blockhash: LatestBlockhash,
    fetched_at: Instant,
    used: bool,
}

/// Recently fetched blockhashes, keyed by the slot they were read at
///
/// A blockhash is handed out again only while it is younger than the TTL.
/// Older entries are kept (up to a fixed count) so the expiry height of a
/// transaction's blockhash can be looked up without a round trip.
#[derive(Debug)]
pub struct BlockhashCache {
    ttl: Duration,
    entries: Mutex<BTreeMap<u64, CachedBlockhash>>,
}

impl BlockhashCache {
    /// Create a cache; a zero TTL never serves cached blockhashes
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record a blockhash read at `slot`
    pub async fn insert(&self, slot: u64, blockhash: LatestBlockhash) {
        let mut entries = self.entries.lock().await;
        entries
            .entry(slot)
            .and_modify(|cached| {
                if cached.blockhash.blockhash != blockhash.blockhash {
                    cached.blockhash = blockhash;
                    cached.used = false;
                }
            })
            .or_insert(CachedBlockhash {
                blockhash,
                fetched_at: Instant::now(),
                used: false,
            });
        while entries.len() > RETAINED_BLOCKHASHES {
            entries.pop_first();
        }
    }

    fn is_fresh(&self, cached: &CachedBlockhash) -> bool {
        cached.fetched_at.elapsed() < self.ttl
    }

    /// The newest blockhash younger than the TTL
    pub async fn latest(&self) -> Option<LatestBlockhash> {
        let entries = self.entries.lock().await;
        entries
            .values()
            .next_back()
            .filter(|cached| self.is_fresh(cached))
            .map(|cached| cached.blockhash)
    }

    /// The newest fresh blockhash no transaction was sent with yet
    ///
    /// Identical transactions signed over the same blockhash share a
    /// signature, so callers sending repeats should use this.
    pub async fn latest_unused(&self) -> Option<LatestBlockhash> {
        let entries = self.entries.lock().await;
        entries
            .values()
            .rev()
            .take_while(|cached| self.is_fresh(cached))
            .find(|cached| !cached.used)
            .map(|cached| cached.blockhash)
    }

    /// Remember that a transaction was sent with `blockhash`
    pub async fn mark_used(&self, blockhash: &Hash) {
        let mut entries = self.entries.lock().await;
        for cached in entries.values_mut() {
            if cached.blockhash.blockhash == *blockhash {
                cached.used = true;
            }
        }
    }

    /// The expiry height of a remembered blockhash, fresh or not
    pub async fn last_valid_block_height(&self, blockhash: &Hash) -> Option<u64> {
        let entries = self.entries.lock().await;
        entries
            .values()
            .rev()
            .find(|cached| cached.blockhash.blockhash == *blockhash)
            .map(|cached| cached.blockhash.last_valid_block_height)
    }

    /// Number of remembered blockhashes
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no blockhash is remembered
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
