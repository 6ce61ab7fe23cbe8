//! 地址验证模块
//!
//! EIP-55 checksum 地址的生成与校验
//! https://eips.ethereum.org/EIPS/eip-55

use sha3::{Digest, Keccak256};

use crate::error::{AppError, AppResult};

/// 由 secp256k1 公钥派生 EIP-55 checksum 地址
pub fn public_key_to_checksum_address(public_key: &k256::PublicKey) -> String {
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    let encoded = public_key.to_encoded_point(false); // 未压缩格式
    let hash = Keccak256::digest(&encoded.as_bytes()[1..]); // 去掉 0x04 前缀
    to_checksum(&hex::encode(&hash[12..])) // 取后 20 字节
}

/// 对 40 位小写 hex 应用 EIP-55 大小写
fn to_checksum(addr_lower: &str) -> String {
    let hash = Keccak256::digest(addr_lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, ch) in addr_lower.chars().enumerate() {
        let hash_byte = hash[i / 2];
        let hash_nibble = if i % 2 == 0 {
            hash_byte >> 4
        } else {
            hash_byte & 0x0f
        };

        if ch.is_ascii_alphabetic() && hash_nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// 要求严格的 checksum 地址（全小写也会被拒绝）
pub fn validate_checksum_address(address: &str) -> AppResult<()> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| AppError::invalid_address("This doesn't look like an Ethereum address."))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::invalid_address(
            "This doesn't look like an Ethereum address.",
        ));
    }

    if to_checksum(&hex_part.to_ascii_lowercase()) != address {
        return Err(AppError::invalid_address(
            "A checksum address is required here.",
        ));
    }

    Ok(())
}
