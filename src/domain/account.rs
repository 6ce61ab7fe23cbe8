//! 账户领域模型
//!
//! 账户独占其凭证簇（钱包地址）与 dapp 连接，删除账户时一起删除

use serde::{Deserialize, Serialize};

use crate::domain::address::{Address, AddressRole, CredentialCluster};
use crate::domain::chain_config::ChainId;
use crate::domain::dapp::Dapp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// 按创建顺序
    pub clusters: Vec<CredentialCluster>,
    /// 按连接顺序
    pub dapps: Vec<Dapp>,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            clusters: Vec::new(),
            dapps: Vec::new(),
        }
    }

    pub fn cluster(&self, cluster_id: &str) -> Option<&CredentialCluster> {
        self.clusters.iter().find(|c| c.id == cluster_id)
    }

    pub fn cluster_mut(&mut self, cluster_id: &str) -> Option<&mut CredentialCluster> {
        self.clusters.iter_mut().find(|c| c.id == cluster_id)
    }

    /// 钱包角色的地址，按簇创建顺序再按绑定顺序
    pub fn wallet_addresses(&self) -> impl Iterator<Item = &Address> {
        self.clusters
            .iter()
            .filter(|c| c.role == AddressRole::Wallet)
            .flat_map(|c| c.addresses().iter())
    }

    /// 账户在某条链上的钱包地址（假设每个账户每条链一个钱包地址）
    pub fn fetch_wallet_for_chain(&self, chain_id: ChainId) -> Option<&Address> {
        self.wallet_addresses().find(|a| a.chain_id == chain_id)
    }

    pub fn find_address(&self, address_id: &str) -> Option<&Address> {
        self.clusters.iter().find_map(|c| c.find_address(address_id))
    }

    pub fn dapp(&self, dapp_id: &str) -> Option<&Dapp> {
        self.dapps.iter().find(|d| d.id == dapp_id)
    }

    pub fn dapp_mut(&mut self, dapp_id: &str) -> Option<&mut Dapp> {
        self.dapps.iter_mut().find(|d| d.id == dapp_id)
    }
}
