//! 字符串工具模块

/// 大小写不敏感的包含判断（Unicode 完整小写映射）
///
/// 空的 `needle` 总是匹配
pub fn localized_case_insensitive_contains(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
