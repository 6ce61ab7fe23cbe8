//! 多链配置模块
//!
//! 定义钱包可绑定的区块链及其协议族（参考数据，不属于任何账户）

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// EIP-155 链 ID
pub type ChainId = u64;

/// 协议族：同一协议族内的链共享同一把密钥派生出的地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFamily {
    /// EVM 兼容链 (Ethereum, Polygon, BSC, Arbitrum, Optimism, Avalanche)
    Evm,
    /// ed25519 系列 (Solana 等)，当前目录中没有可绑定的链
    Ed25519,
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolFamily::Evm => f.write_str("evm"),
            ProtocolFamily::Ed25519 => f.write_str("ed25519"),
        }
    }
}

/// 链（不可变参考数据）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chain {
    pub chain_id: ChainId,
    pub display_name: String,
    pub family: ProtocolFamily,
    #[serde(default)]
    pub is_testnet: bool,
}

impl Chain {
    pub fn evm(chain_id: ChainId, display_name: &str) -> Self {
        Self {
            chain_id,
            display_name: display_name.to_string(),
            family: ProtocolFamily::Evm,
            is_testnet: false,
        }
    }

    pub fn evm_testnet(chain_id: ChainId, display_name: &str) -> Self {
        Self {
            is_testnet: true,
            ..Self::evm(chain_id, display_name)
        }
    }
}

/// 链配置注册表
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    configs: HashMap<ChainId, Chain>,
}

impl ChainRegistry {
    /// 创建预配置的注册表（主网 + 测试网）
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_default_chains();
        registry
    }

    pub fn empty() -> Self {
        Self {
            configs: HashMap::new(),
        }
    }

    /// 按 Engine 配置裁剪默认目录
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.configs.retain(|chain_id, chain| {
            (config.include_testnets || !chain.is_testnet)
                && !config.disabled_chains.contains(chain_id)
        });
        registry
    }

    fn register_default_chains(&mut self) {
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // EVM 主网
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        self.register(Chain::evm(1, "Ethereum"));
        self.register(Chain::evm(10, "Optimism"));
        self.register(Chain::evm(56, "BNB Smart Chain"));
        self.register(Chain::evm(137, "Polygon"));
        self.register(Chain::evm(42161, "Arbitrum One"));
        self.register(Chain::evm(43114, "Avalanche C-Chain"));

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // EVM 测试网
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        self.register(Chain::evm_testnet(11155111, "Ethereum Sepolia"));
        self.register(Chain::evm_testnet(80002, "Polygon Amoy"));
    }

    /// 注册链配置（相同 chain_id 覆盖旧值）
    pub fn register(&mut self, chain: Chain) {
        self.configs.insert(chain.chain_id, chain);
    }

    pub fn get_by_chain_id(&self, chain_id: ChainId) -> Option<&Chain> {
        self.configs.get(&chain_id)
    }

    /// 协议族内的所有链，按显示名称排序
    pub fn get_by_family(&self, family: ProtocolFamily) -> Vec<&Chain> {
        let mut chains: Vec<&Chain> = self
            .configs
            .values()
            .filter(|c| c.family == family)
            .collect();
        sort_by_display_name(&mut chains);
        chains
    }

    pub fn is_compatible(&self, family: ProtocolFamily, chain_id: ChainId) -> bool {
        self.get_by_chain_id(chain_id)
            .map(|c| c.family == family)
            .unwrap_or(false)
    }

    /// 列出所有支持的链
    pub fn list_all(&self) -> Vec<&Chain> {
        let mut chains: Vec<&Chain> = self.configs.values().collect();
        sort_by_display_name(&mut chains);
        chains
    }

    /// 验证链配置完整性
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (chain_id, chain) in &self.configs {
            if chain.display_name.trim().is_empty() {
                errors.push(format!("Chain {} has empty display name", chain_id));
            }
            if *chain_id == 0 && chain.family == ProtocolFamily::Evm {
                errors.push(format!(
                    "Chain {} has invalid EIP-155 chain_id: 0",
                    chain.display_name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn sort_by_display_name(chains: &mut [&Chain]) {
    chains.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then(a.chain_id.cmp(&b.chain_id))
    });
}
