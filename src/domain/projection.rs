//! 账户投影（纯函数读模型）
//!
//! 不修改账户状态，相同输入总是得到相同输出

use image::GenericImageView;

use crate::domain::account::Account;
use crate::domain::address::Address;
use crate::domain::dapp::Dapp;

/// 图标缺失或解码失败时使用的固定占位符
pub const FALLBACK_FAVICON_SYMBOL: &str = "app";

/// 解码后的 dapp 图标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Favicon {
    Image {
        width: u32,
        height: u32,
        /// RGBA8 像素
        rgba: Vec<u8>,
    },
    /// 系统图标名
    Fallback(&'static str),
}

impl Favicon {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Favicon::Fallback(_))
    }
}

/// 搜索过滤：空查询返回全部，否则返回显示名称匹配的子序列（保持原顺序）
pub fn listed_dapps<'a>(account: &'a Account, query: &str) -> Vec<&'a Dapp> {
    if query.is_empty() {
        return account.dapps.iter().collect();
    }
    account.dapps.iter().filter(|d| d.matches(query)).collect()
}

/// 账户钱包地址，按创建顺序，每个链绑定一项
pub fn wallets(account: &Account) -> Vec<&Address> {
    account.wallet_addresses().collect()
}

/// 解码图标，失败或缺失时返回固定占位符，从不返回错误
pub fn favicon_with_fallback(raw_icon: Option<&[u8]>) -> Favicon {
    let Some(bytes) = raw_icon else {
        return Favicon::Fallback(FALLBACK_FAVICON_SYMBOL);
    };

    match image::load_from_memory(bytes) {
        Ok(img) => {
            let (width, height) = img.dimensions();
            Favicon::Image {
                width,
                height,
                rgba: img.to_rgba8().into_raw(),
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, len = bytes.len(), "Favicon decode failed, using fallback");
            Favicon::Fallback(FALLBACK_FAVICON_SYMBOL)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn account_with_dapps(ids: &[&str]) -> Account {
        let mut account = Account::new("account-1", "Main");
        for id in ids {
            account
                .dapps
                .push(Dapp::new(*id, *id, format!("https://{}", id)));
        }
        account
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_empty_query_returns_all_in_order() {
        let account = account_with_dapps(&["uniswap.org", "sushi.com", "opensea.io"]);
        let ids: Vec<&str> = listed_dapps(&account, "").iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["uniswap.org", "sushi.com", "opensea.io"]);
    }

    #[test]
    fn test_search_uni() {
        let account = account_with_dapps(&["uniswap.org", "sushi.com", "opensea.io"]);
        let ids: Vec<&str> = listed_dapps(&account, "uni").iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["uniswap.org"]);
    }

    #[test]
    fn test_search_is_ordered_subsequence_and_stable() {
        let account = account_with_dapps(&["aave.com", "sushi.com", "dhedge.org", "opensea.io"]);
        let first: Vec<&str> = listed_dapps(&account, "E").iter().map(|d| d.id.as_str()).collect();
        let second: Vec<&str> = listed_dapps(&account, "E").iter().map(|d| d.id.as_str()).collect();

        assert_eq!(first, vec!["aave.com", "dhedge.org", "opensea.io"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_favicon_absent_uses_fallback() {
        assert_eq!(favicon_with_fallback(None), Favicon::Fallback(FALLBACK_FAVICON_SYMBOL));
    }

    #[test]
    fn test_favicon_garbage_uses_fallback() {
        let garbage = [0u8, 1, 2, 3, 4, 5];
        assert!(favicon_with_fallback(Some(&garbage)).is_fallback());
        assert!(favicon_with_fallback(Some(&[])).is_fallback());
    }

    #[test]
    fn test_favicon_png_decodes() {
        let bytes = png_bytes(2, 3);
        match favicon_with_fallback(Some(&bytes)) {
            Favicon::Image { width, height, rgba } => {
                assert_eq!((width, height), (2, 3));
                assert_eq!(rgba.len(), 2 * 3 * 4);
            }
            Favicon::Fallback(_) => panic!("expected decoded image"),
        }
    }
}
