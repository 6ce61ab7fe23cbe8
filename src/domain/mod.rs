//! Domain 模块
//!
//! 地址/链绑定模型：链参考数据、凭证簇、dapp 连接、账户投影

pub mod account;
pub mod address;
pub mod chain_config;
pub mod dapp;
pub mod projection;

// 重新导出常用类型
pub use account::Account;
pub use address::{Address, AddressEntity, AddressRole, CredentialCluster};
pub use chain_config::{Chain, ChainId, ChainRegistry, ProtocolFamily};
pub use dapp::Dapp;
pub use projection::{favicon_with_fallback, listed_dapps, wallets, Favicon, FALLBACK_FAVICON_SYMBOL};
