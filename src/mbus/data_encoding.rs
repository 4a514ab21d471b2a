//! # M-Bus Data Encodings
//!
//! This module provides functions for decoding the primitive data types used
//! in M-Bus data records: packed BCD, little-endian integers and the type F
//! (CP32) date-and-time encoding. Multi-byte fields are transmitted least
//! significant byte first.

use crate::error::DecodeError;
use chrono::NaiveDate;

/// Decodes a packed BCD value, least significant byte first.
///
/// Each byte carries two decimal digits, low nibble first. Non-decimal
/// nibbles are rejected.
pub fn decode_bcd(data: &[u8]) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for &byte in data.iter().rev() {
        let tens = byte >> 4;
        let ones = byte & 0x0F;
        if tens > 9 || ones > 9 {
            return Err(DecodeError::InvalidBcd);
        }
        value = value * 100 + (tens as u64) * 10 + ones as u64;
    }
    Ok(value)
}

/// Decodes an unsigned little-endian integer of up to 8 bytes.
pub fn decode_le_uint(data: &[u8]) -> u64 {
    data.iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, &byte)| acc | ((byte as u64) << (i * 8)))
}

/// Decodes an M-Bus type F (Compound CP32) date and time into an ISO-8601
/// string, e.g. `2018-03-20T17:50:00`.
pub fn decode_cp32_datetime(data: &[u8]) -> Result<String, DecodeError> {
    if data.len() != 4 {
        return Err(DecodeError::InvalidDateTime);
    }
    // Bit 7 of the first byte marks the time as invalid.
    if data[0] & 0x80 != 0 {
        return Err(DecodeError::InvalidDateTime);
    }

    let minute = u32::from(data[0] & 0x3F);
    let hour = u32::from(data[1] & 0x1F);
    let day = u32::from(data[2] & 0x1F);
    let month = u32::from(data[3] & 0x0F);
    let year = 2000 + i32::from(((data[2] & 0xE0) >> 5) | ((data[3] & 0xF0) >> 1));

    let datetime = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or(DecodeError::InvalidDateTime)?;

    Ok(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Decodes an M-Bus string: ASCII bytes transmitted in reverse order.
pub fn decode_str(data: &[u8]) -> String {
    data.iter().rev().map(|&b| b as char).collect()
}
