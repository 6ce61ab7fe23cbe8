//! 链注册表服务
//!
//! 列出与地址协议族兼容的链，区分"可添加"与"已绑定"

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::domain::{Chain, ChainId, CredentialCluster};
use crate::error::{AppError, AppResult};
use crate::repository::Engine;

/// 兼容链列表（按显示名称排序）
///
/// 可多次调用 [`CompatibleChains::candidates`] 重新遍历，遍历是惰性的
#[derive(Debug, Clone)]
pub struct CompatibleChains {
    chains: Vec<Chain>,
    bound: BTreeSet<ChainId>,
}

impl CompatibleChains {
    /// 全部兼容链（含已绑定）
    pub fn all(&self) -> &[Chain] {
        &self.chains
    }

    /// "添加链"候选：排除已绑定的链
    pub fn candidates(&self) -> Candidates<'_> {
        Candidates {
            inner: self.chains.iter(),
            bound: &self.bound,
        }
    }

    pub fn is_bound(&self, chain_id: ChainId) -> bool {
        self.bound.contains(&chain_id)
    }

    pub fn contains(&self, chain_id: ChainId) -> bool {
        self.chains.iter().any(|c| c.chain_id == chain_id)
    }
}

impl<'a> IntoIterator for &'a CompatibleChains {
    type Item = &'a Chain;
    type IntoIter = Candidates<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates()
    }
}

pub struct Candidates<'a> {
    inner: std::slice::Iter<'a, Chain>,
    bound: &'a BTreeSet<ChainId>,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = &'a Chain;

    fn next(&mut self) -> Option<Self::Item> {
        let bound = self.bound;
        self.inner.find(|c| !bound.contains(&c.chain_id))
    }
}

#[derive(Clone)]
pub struct ChainRegistryService {
    engine: Arc<dyn Engine>,
}

impl ChainRegistryService {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// 地址所属凭证簇的兼容链
    pub async fn list_compatible_chains(&self, address_id: &str) -> AppResult<CompatibleChains> {
        let address = self.engine.fetch_address(address_id).await?;
        self.list_compatible_chains_for_cluster(&address.cluster_id)
            .await
    }

    pub async fn list_compatible_chains_for_cluster(
        &self,
        cluster_id: &str,
    ) -> AppResult<CompatibleChains> {
        let cluster = self.engine.fetch_cluster(cluster_id).await?;
        self.compatible_chains(&cluster).await
    }

    /// "添加链"选择器使用的列表
    pub async fn list_eth_chains(&self, address_id: &str) -> AppResult<Vec<Chain>> {
        let compatible = self.list_compatible_chains(address_id).await?;
        Ok(compatible.candidates().cloned().collect())
    }

    /// 凭证簇已绑定的链，取目录中的 `Chain`；
    /// 已从目录移除的链按地址上记录的名称还原
    pub async fn list_bound_chains(&self, cluster_id: &str) -> AppResult<BTreeSet<Chain>> {
        let cluster = self.engine.fetch_cluster(cluster_id).await?;
        if cluster.addresses().is_empty() {
            return Ok(BTreeSet::new());
        }

        let catalog: HashMap<ChainId, Chain> = self
            .engine
            .list_chains(cluster.family)
            .await?
            .into_iter()
            .map(|c| (c.chain_id, c))
            .collect();

        Ok(cluster
            .addresses()
            .iter()
            .map(|a| match catalog.get(&a.chain_id) {
                Some(chain) => chain.clone(),
                None => {
                    tracing::warn!(cluster_id = %cluster_id, chain_id = a.chain_id, "Bound chain missing from catalog");
                    Chain {
                        chain_id: a.chain_id,
                        display_name: a.chain_display_name.clone(),
                        family: cluster.family,
                        is_testnet: false,
                    }
                }
            })
            .collect())
    }

    pub(crate) async fn compatible_chains(
        &self,
        cluster: &CredentialCluster,
    ) -> AppResult<CompatibleChains> {
        let mut chains = self.engine.list_chains(cluster.family).await?;
        chains.retain(|c| c.family == cluster.family);

        if chains.is_empty() {
            tracing::error!(cluster_id = %cluster.id, family = %cluster.family, "No chains configured for protocol family");
            return Err(AppError::unsupported_family(cluster.family));
        }

        chains.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then(a.chain_id.cmp(&b.chain_id))
        });
        chains.dedup_by_key(|c| c.chain_id);

        Ok(CompatibleChains {
            chains,
            bound: cluster.bound_chain_ids(),
        })
    }
}
