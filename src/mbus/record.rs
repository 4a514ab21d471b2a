//! # M-Bus Variable Data Record Walk
//!
//! Walks a container body into an ordered sequence of data records. Each
//! record is `[DIF] [DIFE...] [VIF] [VIFE...] [data]`; the DIF data field
//! nibble selects the data encoding and length, the value information block
//! selects the semantic descriptor, unit and scaling.

use crate::error::DecodeError;
use crate::mbus::data_encoding::{decode_bcd, decode_cp32_datetime, decode_le_uint, decode_str};
use crate::mbus::vif::{lookup_primary_vif, lookup_vife_fd, Descriptor, VifInfo};
use nom::{bytes::complete::take, number::complete::be_u8, IResult};

/// DIF mask for the data field nibble.
const DIF_MASK_DATA: u8 = 0x0F;
/// DIF mask for the function field.
const DIF_MASK_FUNCTION: u8 = 0x30;
/// DIF mask for the storage number LSB.
const DIF_MASK_STORAGE_LSB: u8 = 0x40;
/// Extension bit in DIF/DIFE and VIF/VIFE bytes.
const EXTENSION_BIT: u8 = 0x80;
/// DIFE masks for storage number, tariff and sub-device bits.
const DIFE_MASK_STORAGE: u8 = 0x0F;
const DIFE_MASK_TARIFF: u8 = 0x30;
const DIFE_MASK_DEVICE: u8 = 0x40;
/// Idle filler DIF, skipped between records.
const DIF_IDLE_FILLER: u8 = 0x2F;
/// DIFs opening a manufacturer-specific data block; the rest of the buffer
/// is opaque to the generic walk.
const DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;
const DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;
/// Linear VIFE extension prefixes.
const VIF_EXTENSION_FD: u8 = 0xFD;
const VIF_EXTENSION_FB: u8 = 0xFB;

/// The decoded value carried by a data record.
#[derive(Debug, Clone, PartialEq)]
pub enum MBusRecordValue {
    Numeric(f64),
    Text(String),
}

/// A single decoded M-Bus data record.
#[derive(Debug, Clone)]
pub struct MBusRecord {
    /// Semantic tag for the measured quantity.
    pub descriptor: Descriptor,
    /// Decoded and scaled value.
    pub value: MBusRecordValue,
    /// Unit as reported by the value information tables. `Some("")` for
    /// descriptors without a physical unit, `None` for unknown codes.
    pub unit: Option<&'static str>,
    /// Raw data bytes of the record, for byte-level reinterpretation.
    pub data: Vec<u8>,
    /// Tariff number from the DIFE chain. Disambiguation only.
    pub tariff: u8,
    /// Sub-device number from the DIFE chain. Disambiguation only.
    pub sub_device: u8,
    /// Storage number from the DIF/DIFE chain. Disambiguation only.
    pub memory_address: u32,
}

struct RecordParts<'a> {
    dif: u8,
    storage: u32,
    tariff: u8,
    sub_device: u8,
    info: VifInfo,
    data: &'a [u8],
}

/// Walks the container body into an ordered list of records.
///
/// Record order is preserved; idle filler bytes are skipped and a
/// manufacturer-specific block terminates the walk (its content is opaque).
pub fn parse_records(input: &[u8]) -> Result<Vec<MBusRecord>, DecodeError> {
    let mut records = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() {
        let dif = remaining[0];
        if dif == DIF_IDLE_FILLER {
            remaining = &remaining[1..];
            continue;
        }
        if dif == DIF_MANUFACTURER_SPECIFIC || dif == DIF_MORE_RECORDS_FOLLOW {
            break;
        }

        let (rest, record) = parse_record(remaining)?;
        remaining = rest;
        records.push(record);
    }

    Ok(records)
}

/// Parses one record: header via nom, then value decode.
fn parse_record(input: &[u8]) -> Result<(&[u8], MBusRecord), DecodeError> {
    let (remaining, parts) = parse_record_inner(input)
        .map_err(|err| DecodeError::RecordParse(format!("{err:?}")))?;

    let data_field = parts.dif & DIF_MASK_DATA;
    let (descriptor, unit, value) = if data_field == 0x08 {
        // Selection for readout: no data, the record conveys the DIF
        // function field itself.
        (
            Descriptor::FunctionField,
            Some(""),
            MBusRecordValue::Text(function_field_name(parts.dif).to_string()),
        )
    } else {
        let value = decode_record_value(data_field, parts.data, &parts.info)?;
        (parts.info.descriptor, parts.info.unit, value)
    };

    Ok((
        remaining,
        MBusRecord {
            descriptor,
            value,
            unit,
            data: parts.data.to_vec(),
            tariff: parts.tariff,
            sub_device: parts.sub_device,
            memory_address: parts.storage,
        },
    ))
}

fn parse_record_inner(input: &[u8]) -> IResult<&[u8], RecordParts<'_>> {
    let (mut input, dif) = be_u8(input)?;

    let mut storage = ((dif & DIF_MASK_STORAGE_LSB) >> 6) as u32;
    let mut tariff = 0u8;
    let mut sub_device = 0u8;

    // DIFE chain: storage, tariff and sub-device bits accumulate per byte.
    let mut extension = dif & EXTENSION_BIT != 0;
    let mut index = 0u32;
    while extension {
        let (rest, dife) = be_u8(input)?;
        input = rest;
        if index < 8 {
            storage |= ((dife & DIFE_MASK_STORAGE) as u32) << (1 + 4 * index);
            sub_device |= ((dife & DIFE_MASK_DEVICE) >> 6) << index;
        }
        if index < 4 {
            tariff |= ((dife & DIFE_MASK_TARIFF) >> 4) << (2 * index);
        }
        extension = dife & EXTENSION_BIT != 0;
        index += 1;
    }

    let (input, vif) = be_u8(input)?;
    let (input, info) = match vif {
        VIF_EXTENSION_FD => {
            let (input, code) = be_u8(input)?;
            let (input, ()) = skip_vife_chain(input, code)?;
            (input, lookup_vife_fd(code))
        }
        VIF_EXTENSION_FB => {
            let (input, code) = be_u8(input)?;
            let (input, ()) = skip_vife_chain(input, code)?;
            (
                input,
                VifInfo {
                    descriptor: Descriptor::UnknownVife(code & !EXTENSION_BIT),
                    unit: None,
                    exponent: 0,
                },
            )
        }
        _ => {
            let (input, ()) = skip_vife_chain(input, vif)?;
            (input, lookup_primary_vif(vif))
        }
    };

    let data_field = dif & DIF_MASK_DATA;
    let (input, data) = if data_field == 0x0D {
        // Variable length: an LVAR byte precedes the data.
        let (input, lvar) = be_u8(input)?;
        take(lvar as usize)(input)?
    } else {
        let length = dif_data_length(data_field).ok_or(nom::Err::Error(
            nom::error::Error::new(input, nom::error::ErrorKind::LengthValue),
        ))?;
        take(length)(input)?
    };

    Ok((
        input,
        RecordParts {
            dif,
            storage,
            tariff,
            sub_device,
            info,
            data,
        },
    ))
}

/// Skips qualifying VIFE bytes while the extension bit is set.
fn skip_vife_chain(mut input: &[u8], mut last: u8) -> IResult<&[u8], ()> {
    while last & EXTENSION_BIT != 0 {
        let (rest, vife) = be_u8(input)?;
        input = rest;
        last = vife;
    }
    Ok((input, ()))
}

/// Data length for a DIF data field nibble. `None` for nibbles the generic
/// walk cannot represent.
fn dif_data_length(data_field: u8) -> Option<usize> {
    match data_field {
        0x00 => Some(0),
        0x01 => Some(1),
        0x02 => Some(2),
        0x03 => Some(3),
        0x04 => Some(4),
        0x05 => Some(4), // 32-bit real
        0x06 => Some(6),
        0x07 => Some(8),
        0x08 => Some(0), // selection for readout
        0x09 => Some(1),
        0x0A => Some(2),
        0x0B => Some(3),
        0x0C => Some(4),
        0x0E => Some(6),
        _ => None,
    }
}

fn decode_record_value(
    data_field: u8,
    data: &[u8],
    info: &VifInfo,
) -> Result<MBusRecordValue, DecodeError> {
    if info.descriptor == Descriptor::DateTime {
        return Ok(MBusRecordValue::Text(decode_cp32_datetime(data)?));
    }

    let value = match data_field {
        0x00 => MBusRecordValue::Numeric(0.0),
        0x01..=0x04 | 0x06 | 0x07 => {
            MBusRecordValue::Numeric(scale(decode_le_uint(data) as f64, info.exponent))
        }
        0x05 => {
            let bits = [data[0], data[1], data[2], data[3]];
            MBusRecordValue::Numeric(scale(f32::from_le_bytes(bits) as f64, info.exponent))
        }
        0x09..=0x0C | 0x0E => {
            MBusRecordValue::Numeric(scale(decode_bcd(data)? as f64, info.exponent))
        }
        0x0D => MBusRecordValue::Text(decode_str(data)),
        other => {
            return Err(DecodeError::RecordParse(format!(
                "unsupported data field 0x{other:02X}"
            )))
        }
    };
    Ok(value)
}

/// Applies the decimal scaling exponent. Negative exponents divide so the
/// result stays the nearest representable value of the exact quotient.
fn scale(value: f64, exponent: i8) -> f64 {
    match exponent {
        0 => value,
        e if e > 0 => value * 10f64.powi(e as i32),
        e => value / 10f64.powi(-(e as i32)),
    }
}

fn function_field_name(dif: u8) -> &'static str {
    match dif & DIF_MASK_FUNCTION {
        0x00 => "Instantaneous value",
        0x10 => "Maximum value",
        0x20 => "Minimum value",
        _ => "Value during error state",
    }
}
