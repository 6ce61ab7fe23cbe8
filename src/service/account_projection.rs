//! 账户投影服务
//!
//! 在纯函数读模型之上加一层按账户的快照缓存；绑定/连接事件使缓存失效

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{self, Account, Address, Dapp, Favicon};
use crate::error::AppResult;
use crate::infrastructure::cache::ProjectionCache;
use crate::infrastructure::event_bus::{DomainEvent, EventHandler};
use crate::repository::Engine;

pub struct AccountProjectionService {
    engine: Arc<dyn Engine>,
    cache: Arc<ProjectionCache>,
}

impl AccountProjectionService {
    pub fn new(engine: Arc<dyn Engine>, cache: Arc<ProjectionCache>) -> Self {
        Self { engine, cache }
    }

    /// 账户快照（缓存命中时不访问 Engine）
    pub async fn snapshot(&self, account_id: &str) -> AppResult<Arc<Account>> {
        if let Some(account) = self.cache.get(account_id) {
            return Ok(account);
        }
        // 先记代数再读取，读取期间的失效会让这份快照不入缓存
        let generation = self.cache.generation(account_id);
        let account = self.engine.fetch_account(account_id).await?;
        Ok(self.cache.put(account, generation))
    }

    pub async fn wallets(&self, account_id: &str) -> AppResult<Vec<Address>> {
        let account = self.snapshot(account_id).await?;
        Ok(domain::wallets(&account).into_iter().cloned().collect())
    }

    pub async fn listed_dapps(&self, account_id: &str, query: &str) -> AppResult<Vec<Dapp>> {
        let account = self.snapshot(account_id).await?;
        Ok(domain::listed_dapps(&account, query)
            .into_iter()
            .cloned()
            .collect())
    }

    /// 优先使用 Engine 的搜索建议，不支持或失败时退回本地过滤。
    /// 结果总是账户 dapp 列表的子序列。
    pub async fn search_dapps(&self, account_id: &str, query: &str) -> AppResult<Vec<Dapp>> {
        if query.is_empty() {
            return self.listed_dapps(account_id, query).await;
        }

        let suggestions = match self
            .engine
            .get_dapp_search_suggestions(account_id, query)
            .await
        {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::warn!(account_id = %account_id, error = %e, "Dapp search suggestions failed, filtering locally");
                None
            }
        };

        let Some(suggestions) = suggestions else {
            return self.listed_dapps(account_id, query).await;
        };

        let ids: HashSet<&str> = suggestions.iter().map(|d| d.id.as_str()).collect();
        let account = self.snapshot(account_id).await?;
        Ok(account
            .dapps
            .iter()
            .filter(|d| ids.contains(d.id.as_str()))
            .cloned()
            .collect())
    }

    pub fn favicon(dapp: &Dapp) -> Favicon {
        domain::favicon_with_fallback(dapp.favicon.as_deref())
    }
}

/// 绑定/连接事件发生后使对应账户快照失效
pub struct ProjectionInvalidationHandler {
    cache: Arc<ProjectionCache>,
}

impl ProjectionInvalidationHandler {
    pub fn new(cache: Arc<ProjectionCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for ProjectionInvalidationHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        match event {
            DomainEvent::ChainBound {
                account_id,
                cluster_id,
                ..
            } => self.cache.invalidate_binding(cluster_id, account_id),
            DomainEvent::DappConnected { account_id, .. }
            | DomainEvent::DappDisconnected { account_id, .. } => {
                self.cache.invalidate_account(account_id);
            }
        }
        Ok(())
    }

    fn event_types(&self) -> Vec<&'static str> {
        vec!["ChainBound", "DappConnected", "DappDisconnected"]
    }
}
