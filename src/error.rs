//! 统一错误类型
//!
//! 模型与服务层的所有失败路径都返回 `AppError`，不允许 panic

use std::fmt;

use crate::domain::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    // 链注册表
    UnsupportedFamily,
    UnsupportedChain,

    // Engine
    EngineUnavailable,
    BindingConflict,

    // 资源不存在
    ClusterNotFound,
    AddressNotFound,
    AccountNotFound,
    DappNotFound,

    // 参数
    InvalidAddress,
    InvalidParameter,
    Internal,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::UnsupportedFamily => "unsupported_family",
            AppErrorCode::UnsupportedChain => "unsupported_chain",
            AppErrorCode::EngineUnavailable => "engine_unavailable",
            AppErrorCode::BindingConflict => "binding_conflict",
            AppErrorCode::ClusterNotFound => "cluster_not_found",
            AppErrorCode::AddressNotFound => "address_not_found",
            AppErrorCode::AccountNotFound => "account_not_found",
            AppErrorCode::DappNotFound => "dapp_not_found",
            AppErrorCode::InvalidAddress => "invalid_address",
            AppErrorCode::InvalidParameter => "invalid_parameter",
            AppErrorCode::Internal => "internal",
        }
    }

    /// 仅 Engine 暂时不可用时允许调用方重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppErrorCode::EngineUnavailable)
    }
}

impl fmt::Display for AppErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub trace_id: Option<String>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(code: AppErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            trace_id: None,
        }
    }

    pub fn unsupported_family(family: impl fmt::Display) -> Self {
        Self::new(
            AppErrorCode::UnsupportedFamily,
            format!("No chains are configured for protocol family {}", family),
        )
    }

    pub fn unsupported_chain(chain_id: ChainId) -> Self {
        Self::new(
            AppErrorCode::UnsupportedChain,
            format!("Chain {} is not compatible with this address", chain_id),
        )
    }

    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::EngineUnavailable, msg)
    }

    pub fn binding_conflict(cluster_id: &str, chain_id: ChainId) -> Self {
        Self::new(
            AppErrorCode::BindingConflict,
            format!(
                "A concurrent bind of chain {} for cluster {} completed first",
                chain_id, cluster_id
            ),
        )
    }

    pub fn cluster_not_found(cluster_id: &str) -> Self {
        Self::new(
            AppErrorCode::ClusterNotFound,
            format!("Credential cluster not found: {}", cluster_id),
        )
    }

    pub fn address_not_found(address_id: &str) -> Self {
        Self::new(
            AppErrorCode::AddressNotFound,
            format!("Address not found: {}", address_id),
        )
    }

    pub fn account_not_found(account_id: &str) -> Self {
        Self::new(
            AppErrorCode::AccountNotFound,
            format!("Account not found: {}", account_id),
        )
    }

    pub fn dapp_not_found(dapp_id: &str) -> Self {
        Self::new(
            AppErrorCode::DappNotFound,
            format!("Dapp not found: {}", dapp_id),
        )
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidAddress, msg)
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidParameter, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, msg)
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}
