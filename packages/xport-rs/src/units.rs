//! Input parsing for amounts, fees, integers and addresses
//!
//! Token amounts and native fees are both entered in 18-decimal units
//! ("ether" style) and converted to base units here. Anything that does not
//! parse is a `BridgeError::Validation` naming the offending field.

use alloy::primitives::{utils::format_units, Address, U256};
use std::str::FromStr;

use crate::error::BridgeError;

/// Decimals used for both token amounts and native-currency fees
pub const AMOUNT_DECIMALS: u8 = 18;

/// Parse a non-negative decimal string into base units
///
/// Accepts `"10"`, `"0.5"`, `".5"` and `"10."`. Rejects signs, exponents,
/// separators and more fractional digits than `decimals`.
pub fn parse_decimal_units(field: &str, input: &str, decimals: u8) -> Result<U256, BridgeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BridgeError::validation(field, "value is required"));
    }

    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(BridgeError::validation(field, "not a number"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::validation(
            field,
            format!("'{}' is not a non-negative decimal number", input),
        ));
    }
    if frac.len() > decimals as usize {
        return Err(BridgeError::validation(
            field,
            format!("at most {} decimal places are supported", decimals),
        ));
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(decimals as usize - frac.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10)
        .map_err(|_| BridgeError::validation(field, "value is out of range"))
}

/// Parse an 18-decimal token amount
pub fn parse_amount(field: &str, input: &str) -> Result<U256, BridgeError> {
    parse_decimal_units(field, input, AMOUNT_DECIMALS)
}

/// Parse a non-negative integer (gas limits, lengths, chain ids)
pub fn parse_integer(field: &str, input: &str) -> Result<U256, BridgeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BridgeError::validation(field, "value is required"));
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::validation(
            field,
            format!("'{}' is not a non-negative integer", input),
        ));
    }
    U256::from_str_radix(input, 10).map_err(|_| BridgeError::validation(field, "value is out of range"))
}

/// Parse a 20-byte hex address (both supported chains share this format)
pub fn parse_address(field: &str, input: &str) -> Result<Address, BridgeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BridgeError::validation(field, "address is required"));
    }
    let hex_part = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| BridgeError::validation(field, "address must start with 0x"))?;
    if hex_part.len() != 40 {
        return Err(BridgeError::validation(
            field,
            format!("address must be 20 bytes, got {} hex chars", hex_part.len()),
        ));
    }
    Address::from_str(input).map_err(|e| BridgeError::validation(field, e.to_string()))
}

/// Format base units with 18 decimals, trimming trailing zeros
pub fn format_amount(raw: U256) -> String {
    let formatted = format_units(raw, AMOUNT_DECIMALS).unwrap_or_else(|_| raw.to_string());
    trim_decimal(&formatted)
}

fn trim_decimal(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEI: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_parse_whole_amount() {
        assert_eq!(parse_amount("amount", "10").unwrap(), U256::from(10 * WEI));
    }

    #[test]
    fn test_parse_fractional_amount() {
        assert_eq!(
            parse_amount("fee", "0.01").unwrap(),
            U256::from(10_000_000_000_000_000u128)
        );
        assert_eq!(parse_amount("fee", ".5").unwrap(), U256::from(WEI / 2));
        assert_eq!(parse_amount("fee", "2.").unwrap(), U256::from(2 * WEI));
        assert_eq!(parse_amount("fee", "0").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "-1", "1e18", "1,000", ".", "1.2.3", " + 1"] {
            let err = parse_amount("amount", bad).unwrap_err();
            assert!(matches!(err, BridgeError::Validation { .. }), "{bad}");
        }
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        assert!(parse_decimal_units("amount", "1.001", 2).is_err());
        assert_eq!(
            parse_decimal_units("amount", "1.01", 2).unwrap(),
            U256::from(101u64)
        );
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("gas", "400000").unwrap(), U256::from(400_000u64));
        assert!(parse_integer("gas", "4.5").is_err());
        assert!(parse_integer("gas", "-4").is_err());
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address("to", "0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(addr, Address::with_last_byte(1));
        assert!(parse_address("to", "0x1234").is_err());
        assert!(parse_address("to", "0000000000000000000000000000000000000001").is_err());
        assert!(parse_address("to", "0xZZ00000000000000000000000000000000000001").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::from(10 * WEI)), "10");
        assert_eq!(format_amount(U256::from(WEI / 100)), "0.01");
        assert_eq!(format_amount(U256::ZERO), "0");
    }
}
