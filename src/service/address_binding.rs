//! 地址绑定协议
//!
//! 为凭证簇添加一条链：
//! 1. 校验链属于该簇协议族的兼容集合
//! 2. 已绑定则原样返回已有地址（幂等）
//! 3. 由 Engine 原子地分配并注册地址
//! 4. Engine 返回后立即同步失效投影缓存（中间没有 await，调用方取消也不会漏掉）
//! 5. 并发绑定冲突时返回胜出的地址
//! 6. 发布 ChainBound 事件

use std::sync::Arc;

use crate::domain::{Address, ChainId};
use crate::error::{AppError, AppErrorCode, AppResult};
use crate::infrastructure::cache::ProjectionCache;
use crate::infrastructure::event_bus::{DomainEvent, EventBus};
use crate::repository::Engine;
use crate::service::chain_registry_service::ChainRegistryService;

pub struct AddressBindingService {
    engine: Arc<dyn Engine>,
    chains: ChainRegistryService,
    events: Arc<dyn EventBus>,
    cache: Arc<ProjectionCache>,
}

impl AddressBindingService {
    pub fn new(
        engine: Arc<dyn Engine>,
        events: Arc<dyn EventBus>,
        cache: Arc<ProjectionCache>,
    ) -> Self {
        Self {
            chains: ChainRegistryService::new(engine.clone()),
            engine,
            events,
            cache,
        }
    }

    pub async fn bind_chain(&self, cluster_id: &str, chain_id: ChainId) -> AppResult<Address> {
        let cluster = self.engine.fetch_cluster(cluster_id).await?;
        let compatible = self.chains.compatible_chains(&cluster).await?;
        if !compatible.contains(chain_id) {
            tracing::warn!(cluster_id = %cluster_id, chain_id, "Rejected bind for incompatible chain");
            return Err(AppError::unsupported_chain(chain_id));
        }

        if let Some(existing) = cluster.address_for_chain(chain_id) {
            tracing::debug!(cluster_id = %cluster_id, chain_id, address_id = %existing.id, "Chain already bound");
            return Ok(existing.clone());
        }

        let written = self.engine.add_eth_chain(cluster_id, chain_id).await;
        let committed = match &written {
            Ok(_) => true,
            Err(e) => e.code == AppErrorCode::BindingConflict,
        };
        if committed {
            self.cache.invalidate_binding(cluster_id, &cluster.account_id);
        }

        let address = match written {
            Ok(address) => {
                tracing::info!(cluster_id = %cluster_id, chain_id, address_id = %address.id, "Chain bound");
                address
            }
            Err(e) if e.code == AppErrorCode::BindingConflict => {
                let winner = self.resolve_conflict(cluster_id, chain_id).await?;
                tracing::warn!(cluster_id = %cluster_id, chain_id, address_id = %winner.id, "Concurrent bind won, returning existing address");
                winner
            }
            Err(e) => {
                tracing::error!(cluster_id = %cluster_id, chain_id, error = %e, "Engine failed to bind chain");
                return Err(e);
            }
        };

        let event = DomainEvent::ChainBound {
            account_id: cluster.account_id.clone(),
            cluster_id: cluster_id.to_string(),
            chain_id,
            address_id: address.id.clone(),
        };
        if let Err(e) = self.events.publish(event).await {
            tracing::error!(error = ?e, cluster_id = %cluster_id, "Failed to publish ChainBound");
        }

        Ok(address)
    }

    /// 绑定凭证簇的第一条候选链（按显示名称排序）；全部已绑定时返回第一个已有地址
    pub async fn bind_default_chain(&self, cluster_id: &str) -> AppResult<Address> {
        let cluster = self.engine.fetch_cluster(cluster_id).await?;
        let compatible = self.chains.compatible_chains(&cluster).await?;

        let Some(chain_id) = compatible.candidates().next().map(|c| c.chain_id) else {
            return cluster.addresses().first().cloned().ok_or_else(|| {
                AppError::internal(format!("Cluster {} has no bindable chain", cluster_id))
            });
        };
        self.bind_chain(cluster_id, chain_id).await
    }

    /// "添加链"界面入口：未选择链属于调用方错误，记录日志后不做任何操作
    pub async fn add_selected_chain(
        &self,
        address_id: &str,
        selected: Option<ChainId>,
    ) -> AppResult<Option<Address>> {
        let Some(chain_id) = selected else {
            tracing::warn!(address_id = %address_id, "No chain selected, ignoring add chain request");
            return Ok(None);
        };

        let address = self.engine.fetch_address(address_id).await?;
        self.bind_chain(&address.cluster_id, chain_id).await.map(Some)
    }

    async fn resolve_conflict(&self, cluster_id: &str, chain_id: ChainId) -> AppResult<Address> {
        let cluster = self.engine.fetch_cluster(cluster_id).await?;
        cluster
            .address_for_chain(chain_id)
            .cloned()
            .ok_or_else(|| {
                AppError::internal(format!(
                    "Binding conflict reported for chain {} but no address is visible",
                    chain_id
                ))
            })
    }
}
