//! Dapp 连接模型
//!
//! 不变量：一个 dapp 在每条链上至多连接一个地址。
//! Dapp 只持有绑定关系，不持有密钥材料。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::address::Address;
use crate::domain::chain_config::ChainId;
use crate::error::{AppError, AppResult};
use crate::utils::{string_utils, time_utils};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dapp {
    /// 由来源派生的ID
    pub id: String,
    /// 来源或可注册域名
    pub human_identifier: String,
    pub url: String,
    addresses: Vec<Address>,
    pub last_used: Option<String>,
    #[serde(default)]
    pub favicon: Option<Vec<u8>>,
}

impl Dapp {
    pub fn new(id: impl Into<String>, human_identifier: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            human_identifier: human_identifier.into(),
            url: url.into(),
            addresses: Vec::new(),
            last_used: None,
            favicon: None,
        }
    }

    /// 从页面 URL 创建 dapp，ID 取自 host
    pub fn from_url(raw_url: &str) -> AppResult<Self> {
        let url = Url::parse(raw_url)
            .map_err(|e| AppError::invalid_parameter(format!("Invalid dapp url {}: {}", raw_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::invalid_parameter(format!("Dapp url has no host: {}", raw_url)))?
            .to_ascii_lowercase();

        Ok(Self::new(host.clone(), host, url.origin().ascii_serialization()))
    }

    pub fn with_favicon(mut self, favicon: Option<Vec<u8>>) -> Self {
        self.favicon = favicon;
        self
    }

    pub fn display_name(&self) -> &str {
        &self.human_identifier
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn address_for_chain(&self, chain_id: ChainId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.chain_id == chain_id)
    }

    /// 连接地址；该链已有连接时替换（重连语义），不追加
    ///
    /// 返回被替换掉的旧地址
    pub fn connect(&mut self, address: Address) -> Option<Address> {
        self.last_used = Some(time_utils::rfc3339_timestamp());

        match self
            .addresses
            .iter_mut()
            .find(|a| a.chain_id == address.chain_id)
        {
            Some(existing) => Some(std::mem::replace(existing, address)),
            None => {
                self.addresses.push(address);
                None
            }
        }
    }

    /// 断开某条链的连接；移除最后一个连接也保留 dapp 记录和 last_used
    pub fn disconnect(&mut self, chain_id: ChainId) -> Option<Address> {
        let index = self.addresses.iter().position(|a| a.chain_id == chain_id)?;
        Some(self.addresses.remove(index))
    }

    /// 按链显示名称分组，仅用于展示
    pub fn addresses_by_chain(&self) -> BTreeMap<String, Vec<Address>> {
        let mut result: BTreeMap<String, Vec<Address>> = BTreeMap::new();
        for address in &self.addresses {
            result
                .entry(address.chain_display_name.clone())
                .or_default()
                .push(address.clone());
        }
        result
    }

    /// 搜索匹配
    pub fn matches(&self, search: &str) -> bool {
        string_utils::localized_case_insensitive_contains(self.display_name(), search)
    }
}
