//! Conversions between address strings and [`Address`].

use std::str::FromStr;

use alloy::primitives::Address;

use super::token_registry::TokenRegistry;
use super::{UniswapError, UniswapResult};

/// Parses a `0x`-prefixed 40 hex digit address, in any letter case.
pub fn parse(input: &str) -> UniswapResult<Address> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| UniswapError::InvalidAddress(input.to_string()))?;

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(UniswapError::InvalidAddress(input.to_string()));
    }

    Address::from_str(hex).map_err(|_| UniswapError::InvalidAddress(input.to_string()))
}

/// Parses an address, falling back to a symbol lookup in `registry`.
pub fn resolve(input: &str, registry: &TokenRegistry) -> UniswapResult<Address> {
    match parse(input) {
        Ok(address) => Ok(address),
        Err(err) => registry.lookup(input.trim()).ok_or(err),
    }
}

/// Renders the EIP-55 mixed-case checksum form.
pub fn format(address: Address) -> String {
    address.to_checksum(None)
}

/// Case-insensitive comparison of two address strings.
pub fn equals(a: &str, b: &str) -> UniswapResult<bool> {
    Ok(parse(a)? == parse(b)?)
}
