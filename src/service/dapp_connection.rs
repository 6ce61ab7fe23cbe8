//! Dapp 连接服务
//!
//! 连接/断开经由 Engine 串行写入，同链连接为替换语义。
//! 写入成功后同步失效账户快照，再发布事件

use std::sync::Arc;

use crate::domain::{ChainId, Dapp};
use crate::error::AppResult;
use crate::infrastructure::cache::ProjectionCache;
use crate::infrastructure::event_bus::{DomainEvent, EventBus};
use crate::repository::Engine;

pub struct DappConnectionService {
    engine: Arc<dyn Engine>,
    events: Arc<dyn EventBus>,
    cache: Arc<ProjectionCache>,
}

impl DappConnectionService {
    pub fn new(
        engine: Arc<dyn Engine>,
        events: Arc<dyn EventBus>,
        cache: Arc<ProjectionCache>,
    ) -> Self {
        Self {
            engine,
            events,
            cache,
        }
    }

    pub async fn connect(&self, account_id: &str, dapp: Dapp, address_id: &str) -> AppResult<Dapp> {
        let dapp = self.engine.connect_dapp(account_id, dapp, address_id).await?;
        self.cache.invalidate_account(account_id);

        let chain_id = dapp
            .addresses()
            .iter()
            .find(|a| a.id == address_id)
            .map(|a| a.chain_id);
        tracing::info!(account_id = %account_id, dapp_id = %dapp.id, address_id = %address_id, "Dapp connected");

        if let Some(chain_id) = chain_id {
            self.publish(DomainEvent::DappConnected {
                account_id: account_id.to_string(),
                dapp_id: dapp.id.clone(),
                chain_id,
                address_id: address_id.to_string(),
            })
            .await;
        }

        Ok(dapp)
    }

    /// 以页面 URL 识别 dapp 并连接
    pub async fn connect_url(&self, account_id: &str, url: &str, address_id: &str) -> AppResult<Dapp> {
        let dapp = Dapp::from_url(url)?;
        self.connect(account_id, dapp, address_id).await
    }

    pub async fn disconnect(&self, account_id: &str, dapp_id: &str, chain_id: ChainId) -> AppResult<Dapp> {
        let dapp = self
            .engine
            .disconnect_dapp(account_id, dapp_id, chain_id)
            .await?;
        self.cache.invalidate_account(account_id);
        tracing::info!(account_id = %account_id, dapp_id = %dapp_id, chain_id, "Dapp disconnected");

        self.publish(DomainEvent::DappDisconnected {
            account_id: account_id.to_string(),
            dapp_id: dapp_id.to_string(),
            chain_id,
        })
        .await;

        Ok(dapp)
    }

    async fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.events.publish(event).await {
            tracing::error!(error = ?e, "Failed to publish dapp event");
        }
    }
}
