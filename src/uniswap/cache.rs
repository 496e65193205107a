use alloy::primitives::Address;
use moka::sync::Cache;

use super::fee::FeeTier;

/// Keys of the contract addresses worth remembering between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// V1 exchange of a token.
    Exchange(Address),
    /// V3 pool of a token pair, tokens sorted.
    Pool(Address, Address, FeeTier),
    /// Wrapped native token known to the router.
    WrappedNative,
}

impl LookupKey {
    pub fn pool(a: Address, b: Address, fee: FeeTier) -> Self {
        if a < b {
            Self::Pool(a, b, fee)
        } else {
            Self::Pool(b, a, fee)
        }
    }
}

/// Size-bounded cache of address lookups owned by one client.
///
/// Only deployment addresses are stored here; prices, balances and ticks
/// change every block and are always read fresh.
#[derive(Clone)]
pub struct LookupCache {
    entries: Cache<LookupKey, Address>,
}

impl LookupCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub fn get(&self, key: &LookupKey) -> Option<Address> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: LookupKey, address: Address) {
        self.entries.insert(key, address);
    }

    pub fn invalidate(&self, key: &LookupKey) {
        self.entries.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Returns the cached address or resolves, caches and returns it.
    ///
    /// Failed resolutions are not cached.
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: LookupKey, resolve: F) -> Result<Address, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Address, E>>,
    {
        if let Some(address) = self.get(&key) {
            return Ok(address);
        }
        let address = resolve().await?;
        self.insert(key, address);
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_pool_key_ignores_token_order() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        assert_eq!(
            LookupKey::pool(a, b, FeeTier::Tier500),
            LookupKey::pool(b, a, FeeTier::Tier500)
        );
        assert_ne!(
            LookupKey::pool(a, b, FeeTier::Tier500),
            LookupKey::pool(a, b, FeeTier::Tier3000)
        );
    }

    #[tokio::test]
    async fn test_resolver_runs_once_per_key() {
        let cache = LookupCache::new(16);
        let key = LookupKey::Exchange(Address::repeat_byte(7));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let resolved: Result<_, ()> = cache
                .get_or_try_insert(key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Address::repeat_byte(9))
                })
                .await;
            assert_eq!(resolved, Ok(Address::repeat_byte(9)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = LookupCache::new(16);
        let key = LookupKey::WrappedNative;

        let failed: Result<Address, &str> = cache.get_or_try_insert(key, || async { Err("boom") }).await;
        assert_eq!(failed, Err("boom"));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn test_invalidate_all_clears_entries() {
        let cache = LookupCache::new(16);
        let key = LookupKey::Exchange(Address::repeat_byte(3));
        cache.insert(key, Address::repeat_byte(4));
        assert!(cache.get(&key).is_some());

        cache.invalidate_all();
        assert_eq!(cache.get(&key), None);
    }
}
