// Engine 数据访问层
//
// Engine 是密钥与持久化的唯一写入方，负责串行化同一凭证簇/同一 dapp 上的并发写入。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    listed_dapps, Account, Address, AddressRole, Chain, ChainId, ChainRegistry,
    CredentialCluster, Dapp, ProtocolFamily,
};
use crate::error::{AppError, AppResult};
use crate::utils::address_validator;

// ============ Engine Trait ============

#[async_trait]
pub trait Engine: Send + Sync {
    /// 协议族下的链目录
    async fn list_chains(&self, family: ProtocolFamily) -> AppResult<Vec<Chain>>;

    async fn fetch_account(&self, account_id: &str) -> AppResult<Account>;

    async fn fetch_cluster(&self, cluster_id: &str) -> AppResult<CredentialCluster>;

    async fn fetch_address(&self, address_id: &str) -> AppResult<Address>;

    /// 为凭证簇绑定新链。地址的分配与注册是一个事务：
    /// 失败时读者看不到任何新地址；已绑定时返回已有地址。
    /// 检测到并发写入先完成时返回 `BindingConflict`。
    async fn add_eth_chain(&self, cluster_id: &str, chain_id: ChainId) -> AppResult<Address>;

    /// 连接 dapp（账户中不存在时以 `dapp` 为模板新建），同链替换
    async fn connect_dapp(&self, account_id: &str, dapp: Dapp, address_id: &str) -> AppResult<Dapp>;

    async fn disconnect_dapp(&self, account_id: &str, dapp_id: &str, chain_id: ChainId) -> AppResult<Dapp>;

    /// 可选的搜索加速；返回 `None` 表示不支持
    async fn get_dapp_search_suggestions(
        &self,
        _account_id: &str,
        _query: &str,
    ) -> AppResult<Option<Vec<Dapp>>> {
        Ok(None)
    }
}

// ============ 内存实现 ============

#[derive(Default)]
struct EngineState {
    accounts: HashMap<String, Account>,
    /// cluster_id -> account_id
    cluster_owner: HashMap<String, String>,
}

impl EngineState {
    fn account_of_cluster_mut(&mut self, cluster_id: &str) -> AppResult<&mut Account> {
        let account_id = self
            .cluster_owner
            .get(cluster_id)
            .ok_or_else(|| AppError::cluster_not_found(cluster_id))?;
        self.accounts
            .get_mut(account_id)
            .ok_or_else(|| AppError::internal(format!("Dangling cluster owner for {}", cluster_id)))
    }
}

pub struct InMemoryEngine {
    registry: ChainRegistry,
    state: RwLock<EngineState>,
    /// 接下来 N 次写入在提交前失败（EngineUnavailable）
    pending_write_failures: AtomicUsize,
}

impl InMemoryEngine {
    pub fn new(registry: ChainRegistry) -> Self {
        Self {
            registry,
            state: RwLock::new(EngineState::default()),
            pending_write_failures: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub async fn create_account(&self, name: &str) -> Account {
        let account = Account::new(Uuid::new_v4().to_string(), name);
        let mut state = self.state.write().await;
        state.accounts.insert(account.id.clone(), account.clone());
        tracing::info!(account_id = %account.id, "Account created");
        account
    }

    /// 生成新密钥并创建凭证簇（不绑定任何链）
    pub async fn create_cluster(
        &self,
        account_id: &str,
        role: AddressRole,
        dapp_id: Option<&str>,
    ) -> AppResult<CredentialCluster> {
        let secret = k256::SecretKey::random(&mut rand::thread_rng());
        let cluster = CredentialCluster::from_public_key(
            Uuid::new_v4().to_string(),
            account_id.to_string(),
            role,
            dapp_id.map(str::to_string),
            &secret.public_key(),
        );

        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| AppError::account_not_found(account_id))?;
        account.clusters.push(cluster.clone());
        state
            .cluster_owner
            .insert(cluster.id.clone(), account_id.to_string());

        Ok(cluster)
    }

    /// 故障注入
    pub fn fail_next_writes(&self, count: usize) {
        self.pending_write_failures.store(count, Ordering::SeqCst);
    }

    fn take_write_failure(&self) -> bool {
        self.pending_write_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new(ChainRegistry::new())
    }
}

#[async_trait]
impl Engine for InMemoryEngine {
    async fn list_chains(&self, family: ProtocolFamily) -> AppResult<Vec<Chain>> {
        Ok(self
            .registry
            .get_by_family(family)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn fetch_account(&self, account_id: &str) -> AppResult<Account> {
        let state = self.state.read().await;
        state
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| AppError::account_not_found(account_id))
    }

    async fn fetch_cluster(&self, cluster_id: &str) -> AppResult<CredentialCluster> {
        let state = self.state.read().await;
        state
            .cluster_owner
            .get(cluster_id)
            .and_then(|account_id| state.accounts.get(account_id))
            .and_then(|account| account.cluster(cluster_id))
            .cloned()
            .ok_or_else(|| AppError::cluster_not_found(cluster_id))
    }

    async fn fetch_address(&self, address_id: &str) -> AppResult<Address> {
        let state = self.state.read().await;
        state
            .accounts
            .values()
            .find_map(|account| account.find_address(address_id))
            .cloned()
            .ok_or_else(|| AppError::address_not_found(address_id))
    }

    async fn add_eth_chain(&self, cluster_id: &str, chain_id: ChainId) -> AppResult<Address> {
        let mut state = self.state.write().await;
        let account = state.account_of_cluster_mut(cluster_id)?;
        let cluster = account
            .cluster_mut(cluster_id)
            .ok_or_else(|| AppError::cluster_not_found(cluster_id))?;

        if let Some(existing) = cluster.address_for_chain(chain_id) {
            return Ok(existing.clone());
        }

        let chain = self
            .registry
            .get_by_chain_id(chain_id)
            .filter(|c| c.family == cluster.family)
            .ok_or_else(|| AppError::unsupported_chain(chain_id))?;

        // 在副本上分配并注册，提交前失败则原状态不变
        let mut staged = cluster.clone();
        let address = staged.register(staged.allocate_address(chain)).clone();

        if self.take_write_failure() {
            tracing::error!(cluster_id = %cluster_id, chain_id, "Engine write failed before commit");
            return Err(AppError::engine_unavailable(format!(
                "Failed to persist address for chain {}",
                chain_id
            )));
        }

        *cluster = staged;

        // dapp 专用簇的新链同时出现在该 dapp 的连接中（同一次写入）
        if let Some(dapp_id) = cluster.dapp_id.clone() {
            if let Some(dapp) = account.dapp_mut(&dapp_id) {
                dapp.connect(address.clone());
                tracing::debug!(dapp_id = %dapp_id, chain_id, "Dapp connection follows new binding");
            }
        }

        Ok(address)
    }

    async fn connect_dapp(&self, account_id: &str, dapp: Dapp, address_id: &str) -> AppResult<Dapp> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| AppError::account_not_found(account_id))?;

        let address = account
            .find_address(address_id)
            .cloned()
            .ok_or_else(|| AppError::address_not_found(address_id))?;
        address_validator::validate_checksum_address(&address.address)?;

        if self.take_write_failure() {
            return Err(AppError::engine_unavailable(format!(
                "Failed to persist connection for dapp {}",
                dapp.id
            )));
        }

        let index = match account.dapps.iter().position(|d| d.id == dapp.id) {
            Some(index) => index,
            None => {
                account.dapps.push(dapp);
                account.dapps.len() - 1
            }
        };
        let stored = &mut account.dapps[index];
        stored.connect(address);
        Ok(stored.clone())
    }

    async fn disconnect_dapp(&self, account_id: &str, dapp_id: &str, chain_id: ChainId) -> AppResult<Dapp> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| AppError::account_not_found(account_id))?;

        if self.take_write_failure() {
            return Err(AppError::engine_unavailable(format!(
                "Failed to persist disconnect for dapp {}",
                dapp_id
            )));
        }

        let dapp = account
            .dapp_mut(dapp_id)
            .ok_or_else(|| AppError::dapp_not_found(dapp_id))?;
        dapp.disconnect(chain_id);
        Ok(dapp.clone())
    }

    async fn get_dapp_search_suggestions(
        &self,
        account_id: &str,
        query: &str,
    ) -> AppResult<Option<Vec<Dapp>>> {
        let state = self.state.read().await;
        let account = state
            .accounts
            .get(account_id)
            .ok_or_else(|| AppError::account_not_found(account_id))?;
        Ok(Some(listed_dapps(account, query).into_iter().cloned().collect()))
    }
}
