//! Elvaco CMi4110 heat meter decoder
//!
//! The CMi4110 is an MCM module mounted in Landis+Gyr UH50 heat meters. Its
//! uplink carries a one-byte payload-style discriminator followed by
//! standard M-Bus data records. Decoding walks the records, interprets each
//! record's semantic descriptor and merges the derived fields into a single
//! flat reading.

use crate::decoder::{FieldMeta, FieldValue, PayloadDecoder, Reading, UplinkMeta};
use crate::error::DecodeError;
use crate::mbus::record::{parse_records, MBusRecord, MBusRecordValue};
use crate::mbus::Descriptor;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// UH50 error flag word. Bit layout per the meter manual, least
    /// significant bit first: F0..F9 fault codes, then two warning notes.
    /// Bits 12..=15 carry no documented meaning.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ErrorFlags: u16 {
        const FLOW_MEASUREMENT_FAULT    = 1 << 0; // F0
        const SUPPLY_SENSOR_INTERRUPTED = 1 << 1; // F1
        const RETURN_SENSOR_INTERRUPTED = 1 << 2; // F2
        const TEMPERATURE_ELECTRONICS   = 1 << 3; // F3
        const SUPPLY_VOLTAGE_FAULT      = 1 << 4; // F4
        const SUPPLY_SENSOR_SHORTED     = 1 << 5; // F5
        const RETURN_SENSOR_SHORTED     = 1 << 6; // F6
        const INTERNAL_MEMORY_FAULT     = 1 << 7; // F7
        const FAULT_PERSISTENT          = 1 << 8; // F8
        const ELECTRONICS_FAULT         = 1 << 9; // F9
        const FLOW_ABOVE_RANGE          = 1 << 10;
        const RETURN_ABOVE_SUPPLY       = 1 << 11;
    }
}

/// Diagnostic text per named flag, wording from the UH50 manual.
const ERROR_FLAG_TEXTS: [(ErrorFlags, &str); 12] = [
    (
        ErrorFlags::FLOW_MEASUREMENT_FAULT,
        "F0: Fehler bei der Durchflussmessung (z.B. Luft im Messrohr)",
    ),
    (
        ErrorFlags::SUPPLY_SENSOR_INTERRUPTED,
        "F1: Unterbrechung am Vorlauffühler",
    ),
    (
        ErrorFlags::RETURN_SENSOR_INTERRUPTED,
        "F2: Unterbrechung am Rücklauffühler",
    ),
    (
        ErrorFlags::TEMPERATURE_ELECTRONICS,
        "F3: Elektronik für die Temperaturauswertung defekt",
    ),
    (
        ErrorFlags::SUPPLY_VOLTAGE_FAULT,
        "F4: Problem mit der Spannungsversorgung, Batterie leer",
    ),
    (
        ErrorFlags::SUPPLY_SENSOR_SHORTED,
        "F5: Kurzschluss am Vorlauffühler",
    ),
    (
        ErrorFlags::RETURN_SENSOR_SHORTED,
        "F6: Kurzschluss am Rücklauffühler",
    ),
    (
        ErrorFlags::INTERNAL_MEMORY_FAULT,
        "F7: Störung im internen Speicher",
    ),
    (
        ErrorFlags::FAULT_PERSISTENT,
        "F8: Fehler F1, F2, F3, F5 oder F6 steht länger als 8 Stunden an",
    ),
    (
        ErrorFlags::ELECTRONICS_FAULT,
        "F9: Fehler in der Elektronik",
    ),
    (
        ErrorFlags::FLOW_ABOVE_RANGE,
        "Hinweis: Durchfluss oberhalb des Messbereichs",
    ),
    (
        ErrorFlags::RETURN_ABOVE_SUPPLY,
        "Hinweis: Rücklauftemperatur höher als Vorlauftemperatur",
    ),
];

/// Trailing vendor error block `01 FD 17 XX` some firmware variants append.
/// The generic record walk would misread it, so it is stripped up front.
const TRAILING_ERROR_BLOCK: [u8; 3] = [0x01, 0xFD, 0x17];

/// Fixed alternate key the default extension mirrors the kWh energy
/// register under.
pub const HEAT_ENERGY_KEY: &str = "heat_energy";

/// Display metadata for the fields this decoder can emit.
pub const FIELD_METADATA: &[FieldMeta] = &[
    FieldMeta { field: "energy", label: "Heat energy", unit: "kWh" },
    FieldMeta { field: "heat_energy", label: "Heat energy (mirror register)", unit: "kWh" },
    FieldMeta { field: "volume", label: "Volume", unit: "m³" },
    FieldMeta { field: "power", label: "Power", unit: "W" },
    FieldMeta { field: "flow", label: "Flow", unit: "m³/h" },
    FieldMeta { field: "supply_temperature", label: "Supply temperature", unit: "°C" },
    FieldMeta { field: "return_temperature", label: "Return temperature", unit: "°C" },
    FieldMeta { field: "fabrication_block", label: "Meter number", unit: "MeterID" },
    FieldMeta { field: "error_codes", label: "Error state", unit: "" },
    FieldMeta { field: "error", label: "Error text", unit: "" },
    FieldMeta { field: "datetime", label: "Meter clock", unit: "" },
    FieldMeta { field: "function_field", label: "Value function", unit: "" },
    FieldMeta { field: "payload_style", label: "Telegram style", unit: "" },
];

/// Post-processing hook applied to every successfully decoded reading.
///
/// Implementations may add or override fields before the reading is
/// returned to the caller.
pub trait ReadingExtension: Send + Sync + std::fmt::Debug {
    fn extend(&self, reading: &mut Reading);
}

/// Default extension: mirrors the energy register under [`HEAT_ENERGY_KEY`]
/// when it is reported in kWh.
#[derive(Debug, Clone, Copy, Default)]
pub struct KwhEnergyMirror;

impl ReadingExtension for KwhEnergyMirror {
    fn extend(&self, reading: &mut Reading) {
        let is_kwh =
            matches!(reading.get("energy_unit"), Some(FieldValue::Text(unit)) if unit == "kWh");
        if !is_kwh {
            return;
        }
        if let Some(energy) = reading.get("energy").cloned() {
            reading.insert(HEAT_ENERGY_KEY.to_string(), energy);
        }
    }
}

/// Elvaco CMi4110 decoder.
#[derive(Debug, Clone)]
pub struct Cmi4110Decoder {
    extension: Arc<dyn ReadingExtension>,
}

impl Default for Cmi4110Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Cmi4110Decoder {
    pub fn new() -> Self {
        Self {
            extension: Arc::new(KwhEnergyMirror),
        }
    }

    /// Create a decoder with a custom reading extension.
    pub fn with_extension(extension: Arc<dyn ReadingExtension>) -> Self {
        Self { extension }
    }

    fn decode_reading(&self, payload: &[u8]) -> Result<Reading, DecodeError> {
        let payload = strip_trailing_error_block(payload);
        if payload.len() < 2 {
            return Err(DecodeError::InvalidLength {
                expected: 2,
                actual: payload.len(),
            });
        }

        let payload_style = payload[0];

        let records = parse_records(&payload[1..])?;
        let records = filter_unknown_records(records);

        let mut reading = Reading::new();
        for record in &records {
            // Later records win on key collision.
            reading.extend(interpret_record(record)?);
        }
        reading.insert(
            "payload_style".to_string(),
            FieldValue::Int(payload_style as i64),
        );

        self.extension.extend(&mut reading);
        Ok(reading)
    }
}

impl PayloadDecoder for Cmi4110Decoder {
    fn decode(&self, payload: &[u8], _meta: &UplinkMeta) -> Result<Vec<Reading>, DecodeError> {
        Ok(vec![self.decode_reading(payload)?])
    }

    fn decoder_type(&self) -> &str {
        "Elvaco-CMi4110"
    }

    fn field_metadata(&self) -> &'static [FieldMeta] {
        FIELD_METADATA
    }

    fn clone_box(&self) -> Box<dyn PayloadDecoder> {
        Box::new(self.clone())
    }
}

/// Strips the trailing vendor error block when present.
fn strip_trailing_error_block(payload: &[u8]) -> &[u8] {
    if payload.len() >= 4 && payload[payload.len() - 4..payload.len() - 1] == TRAILING_ERROR_BLOCK {
        &payload[..payload.len() - 4]
    } else {
        payload
    }
}

/// Drops records the record walk could not attach semantics to.
///
/// The record vocabulary spells the prefix "unkown_" (sic); both that
/// spelling and "unknown_" are matched so the filter tracks the vocabulary
/// rather than correcting it.
fn filter_unknown_records(records: Vec<MBusRecord>) -> Vec<MBusRecord> {
    records
        .into_iter()
        .filter(|record| {
            let name = record.descriptor.field_name();
            !(name.starts_with("unkown_") || name.starts_with("unknown_"))
        })
        .collect()
}

/// Interprets one record into its derived output fields.
fn interpret_record(record: &MBusRecord) -> Result<Vec<(String, FieldValue)>, DecodeError> {
    let mut bag = Vec::with_capacity(2);

    match record.descriptor {
        Descriptor::ErrorCodes => {
            let raw = numeric_value(record)? as u64;
            bag.push(("error_codes".to_string(), FieldValue::Int(raw.min(1) as i64)));
            bag.push((
                "error".to_string(),
                FieldValue::Text(decode_error_flags(&record.data)?),
            ));
        }
        Descriptor::FabricationBlock => {
            let value = numeric_value(record)?;
            bag.push((
                "fabrication_block".to_string(),
                FieldValue::Int(value as i64),
            ));
            bag.push((
                "fabrication_block_unit".to_string(),
                FieldValue::Text("MeterID".to_string()),
            ));
        }
        Descriptor::Energy if record.unit == Some("Wh") => {
            let kwh = round3(numeric_value(record)? / 1000.0);
            bag.push(("energy".to_string(), FieldValue::Float(kwh)));
            bag.push(("energy_unit".to_string(), FieldValue::Text("kWh".to_string())));
        }
        _ => {
            let unit = record.unit.ok_or_else(|| {
                DecodeError::MissingUnit(record.descriptor.field_name().into_owned())
            })?;
            let value = match &record.value {
                MBusRecordValue::Numeric(v) => FieldValue::Float(*v),
                MBusRecordValue::Text(s) => FieldValue::Text(s.clone()),
            };
            bag.push((record.descriptor.field_name().into_owned(), value));
            bag.push((
                record.descriptor.unit_field_name().into_owned(),
                FieldValue::Text(unit.to_string()),
            ));
        }
    }

    Ok(bag)
}

/// Decodes the raw error flag bytes into a `;`-joined diagnostic string.
///
/// Accepts the 2-byte flag word, or a single byte from device variants that
/// omit the high byte. Active conditions are listed in ascending bit
/// significance; the undocumented high bits are reported generically.
pub fn decode_error_flags(data: &[u8]) -> Result<String, DecodeError> {
    let word = match data.len() {
        1 => data[0] as u16,
        2 => u16::from_le_bytes([data[0], data[1]]),
        n => return Err(DecodeError::ErrorFlagWidth(n)),
    };

    let flags = ErrorFlags::from_bits_retain(word);
    let mut messages: Vec<String> = ERROR_FLAG_TEXTS
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, text)| (*text).to_string())
        .collect();
    for bit in 12..16 {
        if word & (1 << bit) != 0 {
            messages.push(format!("Error bit {bit} set"));
        }
    }

    Ok(messages.join(";"))
}

fn numeric_value(record: &MBusRecord) -> Result<f64, DecodeError> {
    match &record.value {
        MBusRecordValue::Numeric(v) => Ok(*v),
        MBusRecordValue::Text(_) => Err(DecodeError::InvalidData {
            offset: 0,
            reason: format!(
                "expected numeric value for {}",
                record.descriptor.field_name()
            ),
        }),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload_hex: &str) -> Reading {
        let payload = hex::decode(payload_hex).unwrap();
        let decoder = Cmi4110Decoder::new();
        let mut readings = decoder.decode(&payload, &UplinkMeta::default()).unwrap();
        assert_eq!(readings.len(), 1);
        readings.pop().unwrap()
    }

    #[test]
    fn test_standard_telegram() {
        let reading = decode(
            "000C06384612000C14059753000B2D5201000B3B5706000A5A05030A5E05010C7889478268046D3231542302FD170000",
        );

        assert_eq!(reading["energy"], FieldValue::Float(124638.0));
        assert_eq!(reading["energy_unit"], FieldValue::Text("kWh".to_string()));
        assert_eq!(reading["heat_energy"], FieldValue::Float(124638.0));
        assert_eq!(reading["volume"], FieldValue::Float(5397.05));
        assert_eq!(reading["volume_unit"], FieldValue::Text("m³".to_string()));
        assert_eq!(reading["power"], FieldValue::Float(15200.0));
        assert_eq!(reading["flow"], FieldValue::Float(0.657));
        assert_eq!(reading["supply_temperature"], FieldValue::Float(30.5));
        assert_eq!(reading["return_temperature"], FieldValue::Float(10.5));
        assert_eq!(reading["fabrication_block"], FieldValue::Int(68824789));
        assert_eq!(
            reading["fabrication_block_unit"],
            FieldValue::Text("MeterID".to_string())
        );
        assert_eq!(
            reading["datetime"],
            FieldValue::Text("2018-03-20T17:50:00".to_string())
        );
        assert_eq!(reading["error_codes"], FieldValue::Int(0));
        assert_eq!(reading["error"], FieldValue::Text(String::new()));
        assert_eq!(reading["payload_style"], FieldValue::Int(0));
    }

    #[test]
    fn test_telegram_with_errors() {
        let reading = decode("000C06150110000C782791206802FD170600");

        assert_eq!(reading["energy"], FieldValue::Float(100115.0));
        assert_eq!(reading["fabrication_block"], FieldValue::Int(68209127));
        assert_eq!(reading["error_codes"], FieldValue::Int(1));
        assert_eq!(
            reading["error"],
            FieldValue::Text(
                "F1: Unterbrechung am Vorlauffühler;F2: Unterbrechung am Rücklauffühler"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_error_flags_empty() {
        assert_eq!(decode_error_flags(&[0x00, 0x00]).unwrap(), "");
    }

    #[test]
    fn test_error_flags_single_byte_variant() {
        let text = decode_error_flags(&[0x01]).unwrap();
        assert_eq!(
            text,
            "F0: Fehler bei der Durchflussmessung (z.B. Luft im Messrohr)"
        );
    }

    #[test]
    fn test_error_flags_generic_high_bit() {
        // bit 12 only
        assert_eq!(
            decode_error_flags(&[0x00, 0x10]).unwrap(),
            "Error bit 12 set"
        );
    }

    #[test]
    fn test_error_flags_all_named_bits_ascending() {
        let text = decode_error_flags(&[0xFF, 0x0F]).unwrap();
        let parts: Vec<&str> = text.split(';').collect();
        assert_eq!(parts.len(), 12);
        assert!(parts[0].starts_with("F0:"));
        assert!(parts[9].starts_with("F9:"));
        assert!(parts[10].starts_with("Hinweis:"));
        assert!(!text.starts_with(';'));
        assert!(!text.ends_with(';'));
    }

    #[test]
    fn test_error_flags_clamp_to_one() {
        // no error record at all: no error fields
        let reading = decode("000C0615011000");
        assert!(reading.get("error_codes").is_none());

        // flag word 0x8000: undocumented bit, error_codes still clamps to 1
        let reading = decode("000C061501100002FD170080");
        assert_eq!(reading["error_codes"], FieldValue::Int(1));
        assert_eq!(reading["error"], FieldValue::Text("Error bit 15 set".to_string()));
    }

    #[test]
    fn test_error_flags_invalid_width() {
        assert!(matches!(
            decode_error_flags(&[0x00, 0x00, 0x00]),
            Err(DecodeError::ErrorFlagWidth(3))
        ));
    }

    #[test]
    fn test_trailing_error_block_is_stripped() {
        let with_block = decode("000C061501100001FD17AB");
        let without_block = decode("000C0615011000");
        assert_eq!(with_block, without_block);
    }

    #[test]
    fn test_unknown_records_are_filtered() {
        // second record carries VIF 0x6E (H.C.A. units), which is not part
        // of the vocabulary
        let reading = decode("000C06150110000A6E0500");
        assert_eq!(reading["energy"], FieldValue::Float(100115.0));
        assert!(reading.keys().all(|key| !key.starts_with("unkown_")));
        assert!(reading.keys().all(|key| !key.starts_with("unknown_")));
    }

    #[test]
    fn test_later_records_win_on_collision() {
        // two energy records, the second one wins
        let reading = decode("000C06150110000C0638461200");
        assert_eq!(reading["energy"], FieldValue::Float(124638.0));
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let decoder = Cmi4110Decoder::new();
        assert!(decoder.decode(&[], &UplinkMeta::default()).is_err());
        assert!(decoder.decode(&[0x00], &UplinkMeta::default()).is_err());
    }

    #[test]
    fn test_custom_extension_overrides_default() {
        #[derive(Debug)]
        struct Tagger;
        impl ReadingExtension for Tagger {
            fn extend(&self, reading: &mut Reading) {
                reading.insert("site".to_string(), FieldValue::Text("plant-7".to_string()));
            }
        }

        let decoder = Cmi4110Decoder::with_extension(Arc::new(Tagger));
        let payload = hex::decode("000C0615011000").unwrap();
        let readings = decoder.decode(&payload, &UplinkMeta::default()).unwrap();
        assert_eq!(
            readings[0]["site"],
            FieldValue::Text("plant-7".to_string())
        );
        // the default kWh mirror is replaced
        assert!(readings[0].get(HEAT_ENERGY_KEY).is_none());
    }

    #[test]
    fn test_kwh_mirror_requires_kwh_unit() {
        let mut reading = Reading::new();
        reading.insert("energy".to_string(), FieldValue::Float(1.0));
        reading.insert("energy_unit".to_string(), FieldValue::Text("J".to_string()));
        KwhEnergyMirror.extend(&mut reading);
        assert!(reading.get(HEAT_ENERGY_KEY).is_none());
    }
}
