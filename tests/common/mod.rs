//! 测试辅助模块
//! 提供可编排行为的 Engine 包装器与账户/dapp 固定数据

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use walletcore::config::{Config, EngineConfig, LoggingConfig, ProjectionConfig};
use walletcore::domain::{
    Account, Address, AddressRole, Chain, ChainId, ChainRegistry, CredentialCluster, Dapp,
    ProtocolFamily,
};
use walletcore::error::{AppError, AppResult};
use walletcore::infrastructure::event_bus::{DomainEvent, EventBus, EventEnvelope, EventHandler};
use walletcore::repository::{Engine, InMemoryEngine};
use walletcore::AppState;

/// 包装 InMemoryEngine：模拟并发胜出者、慢写入、搜索索引故障
pub struct ScriptedEngine {
    pub inner: Arc<InMemoryEngine>,
    /// 下一次 add_eth_chain 先由另一个写入者完成，再向调用方报告冲突
    pub race_next_bind: AtomicBool,
    pub fail_suggestions: AtomicBool,
    pub bind_delay: Option<Duration>,
    /// fetch_account 读到数据后再等待，返回的是旧快照
    pub fetch_delay: Option<Duration>,
    pub add_calls: AtomicUsize,
    pub fetch_account_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(inner: Arc<InMemoryEngine>) -> Self {
        Self {
            inner,
            race_next_bind: AtomicBool::new(false),
            fail_suggestions: AtomicBool::new(false),
            bind_delay: None,
            fetch_delay: None,
            add_calls: AtomicUsize::new(0),
            fetch_account_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bind_delay(mut self, delay: Duration) -> Self {
        self.bind_delay = Some(delay);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn list_chains(&self, family: ProtocolFamily) -> AppResult<Vec<Chain>> {
        self.inner.list_chains(family).await
    }

    async fn fetch_account(&self, account_id: &str) -> AppResult<Account> {
        self.fetch_account_calls.fetch_add(1, Ordering::SeqCst);
        let account = self.inner.fetch_account(account_id).await?;
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(account)
    }

    async fn fetch_cluster(&self, cluster_id: &str) -> AppResult<CredentialCluster> {
        self.inner.fetch_cluster(cluster_id).await
    }

    async fn fetch_address(&self, address_id: &str) -> AppResult<Address> {
        self.inner.fetch_address(address_id).await
    }

    async fn add_eth_chain(&self, cluster_id: &str, chain_id: ChainId) -> AppResult<Address> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.bind_delay {
            tokio::time::sleep(delay).await;
        }
        if self.race_next_bind.swap(false, Ordering::SeqCst) {
            self.inner.add_eth_chain(cluster_id, chain_id).await?;
            return Err(AppError::binding_conflict(cluster_id, chain_id));
        }
        self.inner.add_eth_chain(cluster_id, chain_id).await
    }

    async fn connect_dapp(&self, account_id: &str, dapp: Dapp, address_id: &str) -> AppResult<Dapp> {
        self.inner.connect_dapp(account_id, dapp, address_id).await
    }

    async fn disconnect_dapp(
        &self,
        account_id: &str,
        dapp_id: &str,
        chain_id: ChainId,
    ) -> AppResult<Dapp> {
        self.inner.disconnect_dapp(account_id, dapp_id, chain_id).await
    }

    async fn get_dapp_search_suggestions(
        &self,
        account_id: &str,
        query: &str,
    ) -> AppResult<Option<Vec<Dapp>>> {
        if self.fail_suggestions.load(Ordering::SeqCst) {
            return Err(AppError::engine_unavailable("search index offline"));
        }
        self.inner.get_dapp_search_suggestions(account_id, query).await
    }
}

/// 发布很慢的事件总线，用于在 publish 期间取消调用方
pub struct SlowEventBus {
    pub delay: Duration,
}

#[async_trait]
impl EventBus for SlowEventBus {
    async fn publish(&self, _event: DomainEvent) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn subscribe(&self, _handler: Arc<dyn EventHandler>) {}

    async fn get_event_history(&self, _limit: usize) -> Vec<EventEnvelope> {
        Vec::new()
    }
}

pub struct Fixture {
    pub state: AppState,
    pub inner: Arc<InMemoryEngine>,
    pub engine: Arc<ScriptedEngine>,
    pub account_id: String,
    pub wallet_cluster: CredentialCluster,
}

pub fn test_config() -> Config {
    Config {
        logging: LoggingConfig {
            level: "debug".into(),
            format: "text".into(),
        },
        engine: EngineConfig {
            include_testnets: false,
            disabled_chains: vec![],
        },
        projection: ProjectionConfig {
            cache_enabled: true,
            cache_capacity: 16,
        },
    }
}

/// 只有 Ethereum 和 Polygon 的目录
pub fn ethereum_polygon_registry() -> ChainRegistry {
    let mut registry = ChainRegistry::empty();
    registry.register(Chain::evm(1, "Ethereum"));
    registry.register(Chain::evm(137, "Polygon"));
    registry
}

pub async fn setup() -> Fixture {
    setup_with(ChainRegistry::from_config(&test_config().engine), |engine| engine).await
}

/// EVM 账户 + 一个尚未绑定任何链的钱包凭证簇
pub async fn setup_with(
    registry: ChainRegistry,
    customize: impl FnOnce(ScriptedEngine) -> ScriptedEngine,
) -> Fixture {
    let inner = Arc::new(InMemoryEngine::new(registry));
    let engine = Arc::new(customize(ScriptedEngine::new(inner.clone())));

    let account = inner.create_account("Main").await;
    let wallet_cluster = inner
        .create_cluster(&account.id, AddressRole::Wallet, None)
        .await
        .expect("create wallet cluster");

    let state = AppState::new(test_config(), engine.clone()).await;

    Fixture {
        state,
        inner,
        engine,
        account_id: account.id,
        wallet_cluster,
    }
}

impl Fixture {
    /// 新建 dapp 专用凭证簇并依次绑定给定链
    pub async fn dapp_cluster(&self, dapp_id: &str, chains: &[ChainId]) -> Vec<Address> {
        let cluster = self
            .inner
            .create_cluster(&self.account_id, AddressRole::DappScoped, Some(dapp_id))
            .await
            .expect("create dapp cluster");

        let mut addresses = Vec::new();
        for chain_id in chains {
            let address = self
                .state
                .binding
                .bind_chain(&cluster.id, *chain_id)
                .await
                .expect("bind dapp chain");
            addresses.push(address);
        }
        addresses
    }

    /// uniswap.org (Ethereum, Polygon)、sushi.com (Polygon)、opensea.io (Ethereum)
    pub async fn connect_sample_dapps(&self) {
        let uniswap = self.dapp_cluster("uniswap.org", &[1, 137]).await;
        let sushi = self.dapp_cluster("sushi.com", &[137]).await;
        let opensea = self.dapp_cluster("opensea.io", &[1]).await;

        for (id, addresses) in [
            ("uniswap.org", uniswap),
            ("sushi.com", sushi),
            ("opensea.io", opensea),
        ] {
            for address in addresses {
                self.state
                    .dapps
                    .connect(&self.account_id, sample_dapp(id), &address.id)
                    .await
                    .expect("connect dapp");
            }
        }
    }
}

pub fn sample_dapp(id: &str) -> Dapp {
    Dapp::new(id, id, format!("https://{}", id))
}
