//! 地址与凭证簇领域模型
//!
//! 一个凭证簇（credential cluster）= 一把密钥在多条链上的地址集合。
//! 不变量：同一凭证簇内每个 chain_id 至多一个 Address。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::chain_config::{Chain, ChainId, ProtocolFamily};
use crate::utils::address_validator;
use crate::utils::time_utils;

/// 地址角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressRole {
    /// 账户钱包地址
    Wallet,
    /// 为某个 dapp 单独创建的地址
    DappScoped,
}

/// 链绑定地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// 确定性ID，见 [`AddressEntity::deterministic_id`]
    pub id: String,
    pub cluster_id: String,
    pub chain_id: ChainId,
    pub chain_display_name: String,
    /// EIP-55 checksum 地址
    pub address: String,
    pub role: AddressRole,
    pub created_at: String,
}

/// 地址的唯一列：(凭证簇, 链)
#[derive(Debug, Clone, Copy)]
pub struct AddressEntity<'a> {
    pub cluster_id: &'a str,
    pub chain_id: ChainId,
}

impl<'a> AddressEntity<'a> {
    const ENTITY_NAME: &'static str = "address";

    pub fn new(cluster_id: &'a str, chain_id: ChainId) -> Self {
        Self {
            cluster_id,
            chain_id,
        }
    }

    /// 由唯一列派生的确定性ID，重复绑定同一条链得到同一个ID
    pub fn deterministic_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Self::ENTITY_NAME.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.cluster_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.chain_id.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// 凭证簇：按链持有地址，按创建顺序保存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialCluster {
    pub id: String,
    pub account_id: String,
    pub family: ProtocolFamily,
    pub role: AddressRole,
    /// DappScoped 簇所属的 dapp
    pub dapp_id: Option<String>,
    /// 未压缩 SEC1 公钥 (hex)
    pub public_key: String,
    /// 该密钥在 EVM 链上的 checksum 地址
    pub checksum_address: String,
    addresses: Vec<Address>,
    pub created_at: String,
}

impl CredentialCluster {
    pub fn from_public_key(
        id: String,
        account_id: String,
        role: AddressRole,
        dapp_id: Option<String>,
        public_key: &k256::PublicKey,
    ) -> Self {
        use k256::elliptic_curve::sec1::ToEncodedPoint;

        let encoded = public_key.to_encoded_point(false);
        Self {
            id,
            account_id,
            family: ProtocolFamily::Evm,
            role,
            dapp_id,
            public_key: hex::encode(encoded.as_bytes()),
            checksum_address: address_validator::public_key_to_checksum_address(public_key),
            addresses: Vec::new(),
            created_at: time_utils::rfc3339_timestamp(),
        }
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn address_for_chain(&self, chain_id: ChainId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.chain_id == chain_id)
    }

    pub fn find_address(&self, address_id: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == address_id)
    }

    pub fn bound_chain_ids(&self) -> BTreeSet<ChainId> {
        self.addresses.iter().map(|a| a.chain_id).collect()
    }

    /// 分配一个新地址记录，不注册到簇中
    pub fn allocate_address(&self, chain: &Chain) -> Address {
        Address {
            id: AddressEntity::new(&self.id, chain.chain_id).deterministic_id(),
            cluster_id: self.id.clone(),
            chain_id: chain.chain_id,
            chain_display_name: chain.display_name.clone(),
            address: self.checksum_address.clone(),
            role: self.role,
            created_at: time_utils::rfc3339_timestamp(),
        }
    }

    /// 注册地址。该链已绑定时不做任何修改并返回已有地址
    pub fn register(&mut self, address: Address) -> &Address {
        match self
            .addresses
            .iter()
            .position(|a| a.chain_id == address.chain_id)
        {
            Some(index) => &self.addresses[index],
            None => {
                self.addresses.push(address);
                &self.addresses[self.addresses.len() - 1]
            }
        }
    }
}
