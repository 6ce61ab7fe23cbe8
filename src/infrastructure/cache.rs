//! 投影缓存：账户快照，按账户ID存储并维护 凭证簇 -> 账户 索引
//! 容量满时按插入顺序淘汰
//!
//! 每个账户有一个失效代数（generation）。读取方在访问 Engine 之前记下代数，
//! 写回时代数已变化说明期间发生过失效，快照直接丢弃不入缓存。
//! 临界区内没有 await，失效可以在任意 async 上下文中同步完成。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ProjectionConfig;
use crate::domain::Account;

#[derive(Default)]
struct CacheState {
    accounts: HashMap<String, Arc<Account>>,
    cluster_index: HashMap<String, String>,
    insertion_order: VecDeque<String>,
    generations: HashMap<String, u64>,
}

impl CacheState {
    fn generation(&self, account_id: &str) -> u64 {
        self.generations.get(account_id).copied().unwrap_or(0)
    }

    fn remove_account(&mut self, account_id: &str) -> bool {
        let Some(account) = self.accounts.remove(account_id) else {
            return false;
        };
        for cluster in &account.clusters {
            self.cluster_index.remove(&cluster.id);
        }
        self.insertion_order.retain(|id| id != account_id);
        true
    }

    /// 失效：代数加一并移除快照（无论快照是否存在）
    fn invalidate(&mut self, account_id: &str) -> bool {
        *self.generations.entry(account_id.to_string()).or_insert(0) += 1;
        self.remove_account(account_id)
    }
}

pub struct ProjectionCache {
    enabled: bool,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl ProjectionCache {
    pub fn new(config: &ProjectionConfig) -> Self {
        Self {
            enabled: config.cache_enabled,
            capacity: config.cache_capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(&ProjectionConfig {
            cache_enabled: false,
            cache_capacity: 1,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // 临界区不会 panic 到一半，中毒后状态仍然一致
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 当前失效代数，在读取 Engine 之前调用
    pub fn generation(&self, account_id: &str) -> u64 {
        self.lock().generation(account_id)
    }

    pub fn get(&self, account_id: &str) -> Option<Arc<Account>> {
        if !self.enabled {
            return None;
        }
        self.lock().accounts.get(account_id).cloned()
    }

    /// 存入快照并返回共享引用。
    /// 缓存关闭，或自 `generation` 读取以来该账户已失效时，只包装不存储
    pub fn put(&self, account: Account, generation: u64) -> Arc<Account> {
        let account = Arc::new(account);
        if !self.enabled {
            return account;
        }

        let mut state = self.lock();
        if state.generation(&account.id) != generation {
            tracing::debug!(account_id = %account.id, "Snapshot invalidated while loading, not cached");
            return account;
        }

        state.remove_account(&account.id);

        while state.accounts.len() >= self.capacity {
            let Some(oldest) = state.insertion_order.front().cloned() else {
                break;
            };
            state.remove_account(&oldest);
        }

        for cluster in &account.clusters {
            state
                .cluster_index
                .insert(cluster.id.clone(), account.id.clone());
        }
        state.insertion_order.push_back(account.id.clone());
        state.accounts.insert(account.id.clone(), account.clone());
        account
    }

    pub fn invalidate_account(&self, account_id: &str) -> bool {
        let removed = self.lock().invalidate(account_id);
        if removed {
            tracing::debug!(account_id = %account_id, "Projection cache invalidated");
        }
        removed
    }

    /// 使包含该凭证簇的账户快照失效
    pub fn invalidate_cluster(&self, cluster_id: &str) -> bool {
        let mut state = self.lock();
        let Some(account_id) = state.cluster_index.get(cluster_id).cloned() else {
            return false;
        };
        let removed = state.invalidate(&account_id);
        if removed {
            tracing::debug!(cluster_id = %cluster_id, account_id = %account_id, "Projection cache invalidated");
        }
        removed
    }

    /// 凭证簇新增绑定后调用。快照早于该簇创建时不在索引中，退回按账户失效
    pub fn invalidate_binding(&self, cluster_id: &str, account_id: &str) {
        if !self.invalidate_cluster(cluster_id) {
            self.invalidate_account(account_id);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AddressRole, CredentialCluster};

    fn account(id: &str, cluster_id: &str) -> Account {
        let secret = k256::SecretKey::random(&mut rand::thread_rng());
        let mut account = Account::new(id, id);
        account.clusters.push(CredentialCluster::from_public_key(
            cluster_id.to_string(),
            id.to_string(),
            AddressRole::Wallet,
            None,
            &secret.public_key(),
        ));
        account
    }

    fn enabled(capacity: usize) -> ProjectionCache {
        ProjectionCache::new(&ProjectionConfig {
            cache_enabled: true,
            cache_capacity: capacity,
        })
    }

    fn put_fresh(cache: &ProjectionCache, account: Account) -> Arc<Account> {
        let generation = cache.generation(&account.id);
        cache.put(account, generation)
    }

    #[test]
    fn test_invalidate_by_cluster() {
        let cache = enabled(4);
        put_fresh(&cache, account("a1", "c1"));
        put_fresh(&cache, account("a2", "c2"));

        assert!(cache.invalidate_cluster("c1"));
        assert!(cache.get("a1").is_none());
        assert!(cache.get("a2").is_some());
        assert!(!cache.invalidate_cluster("c1"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = enabled(2);
        put_fresh(&cache, account("a1", "c1"));
        put_fresh(&cache, account("a2", "c2"));
        put_fresh(&cache, account("a3", "c3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a1").is_none());
        assert!(!cache.invalidate_cluster("c1"));
        assert!(cache.get("a3").is_some());
    }

    #[test]
    fn test_put_after_invalidation_is_dropped() {
        let cache = enabled(4);
        let generation = cache.generation("a1");

        // 读取期间发生绑定，此时缓存里还没有快照
        assert!(!cache.invalidate_account("a1"));
        let stale = cache.put(account("a1", "c1"), generation);

        assert_eq!(stale.id, "a1");
        assert!(cache.get("a1").is_none());

        put_fresh(&cache, account("a1", "c1"));
        assert!(cache.get("a1").is_some());
    }

    #[test]
    fn test_invalidate_binding_falls_back_to_account() {
        let cache = enabled(4);
        put_fresh(&cache, account("a1", "c1"));

        cache.invalidate_binding("c-new", "a1");

        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ProjectionCache::disabled();
        put_fresh(&cache, account("a1", "c1"));
        assert!(cache.get("a1").is_none());
        assert!(cache.is_empty());
    }
}
