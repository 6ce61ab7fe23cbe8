//! walletcore - 多链钱包地址/链绑定模型
//!
//! 一把密钥对应一个凭证簇，凭证簇在每条链上至多一个地址；
//! dapp 在每条链上至多连接一个地址。

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod repository;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode, AppResult};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{Account, Address, AddressRole, Chain, ChainId, ChainRegistry, Dapp, ProtocolFamily},
        error::{AppError, AppErrorCode, AppResult},
        repository::{Engine, InMemoryEngine},
    };
}
