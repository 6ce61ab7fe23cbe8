//! 时间工具模块

use chrono::{SecondsFormat, Utc};

/// 当前时间的 RFC3339 时间戳（UTC，秒精度）
pub fn rfc3339_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
