//! Conversions between the human-readable amounts of tool arguments and the
//! integer units the client works with.

use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;

use super::ServiceResult;
use super::error::ServiceError;

/// Parse a human-readable amount into the token's smallest unit.
///
/// # Arguments
/// * `amount` - Amount as a decimal string (e.g., "1.5" for 1.5 ETH)
/// * `decimals` - Number of decimal places of the token
///
/// # Examples
/// - "1" with 18 decimals -> 1000000000000000000 (1 ETH in wei)
/// - "100.5" with 6 decimals -> 100500000
///
/// Integers too large for a `Decimal` are taken as already being in the
/// smallest unit.
pub fn parse_amount(amount: &str, decimals: u8) -> ServiceResult<U256> {
    let amount = amount.trim();
    let Ok(value) = Decimal::from_str(amount) else {
        return U256::from_str(amount)
            .map_err(|e| ServiceError::InvalidAmount(format!("{amount}: {e}")));
    };

    if value.is_sign_negative() || value.is_zero() {
        return Err(ServiceError::InvalidAmount(format!(
            "{amount}: amount must be positive"
        )));
    }

    let value = value.normalize();
    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(ServiceError::InvalidAmount(format!(
            "{amount}: at most {decimals} decimal places are supported"
        )));
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let exponent = U256::from(u32::from(decimals) - scale);
    mantissa
        .checked_mul(U256::from(10).pow(exponent))
        .ok_or_else(|| ServiceError::InvalidAmount(format!("{amount}: amount is too large")))
}

/// Format a balance from the smallest unit, trailing zeros removed.
pub fn format_balance(balance: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = balance / divisor;
    let remainder = balance % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }
    let padded = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    format!("{whole}.{}", padded.trim_end_matches('0'))
}

/// Converts a slippage tolerance given in percent ("0.5" for 0.5%) to a fraction.
pub fn parse_slippage_percent(percent: &str) -> ServiceResult<Decimal> {
    let value = Decimal::from_str(percent.trim())
        .map_err(|e| ServiceError::InvalidArgument(format!("Invalid slippage {percent}: {e}")))?;
    Ok(value / Decimal::ONE_HUNDRED)
}

/// Renders a fraction as a percentage with four decimals.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.4}", fraction * 100.0)
}
