//! Electricity meter pulse bridge decoder

use crate::decoder::{helpers, FieldMeta, FieldValue, PayloadDecoder, Reading, UplinkMeta};
use crate::error::DecodeError;

/// Display metadata for the fields this decoder can emit.
pub const FIELD_METADATA: &[FieldMeta] = &[
    FieldMeta { field: "energy", label: "Active energy", unit: "kWh" },
    FieldMeta { field: "power", label: "Active power", unit: "W" },
    FieldMeta { field: "power_failure", label: "Power failure", unit: "" },
    FieldMeta { field: "reverse_energy", label: "Reverse energy", unit: "" },
];

/// Electricity meter decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElectricityMeterDecoder;

impl PayloadDecoder for ElectricityMeterDecoder {
    fn decode(&self, payload: &[u8], _meta: &UplinkMeta) -> Result<Vec<Reading>, DecodeError> {
        // Payload layout:
        // [0]: format version, 0x01
        // [1-4]: total active energy in Wh, little-endian
        // [5-6]: active power in W, little-endian
        // [7]: status (bit 0: power failure, bit 1: reverse energy)
        if payload.len() < 8 {
            return Err(DecodeError::InvalidLength {
                expected: 8,
                actual: payload.len(),
            });
        }
        if payload[0] != 0x01 {
            return Err(DecodeError::UnsupportedVersion(payload[0]));
        }

        let energy_wh = helpers::read_le_uint(payload, 1, 4)?;
        let power_w = helpers::read_le_uint(payload, 5, 2)?;
        let status = payload[7];

        let energy_kwh = (energy_wh as f64 / 1000.0 * 1000.0).round() / 1000.0;

        let mut reading = Reading::new();
        reading.insert("energy".to_string(), FieldValue::Float(energy_kwh));
        reading.insert("energy_unit".to_string(), FieldValue::Text("kWh".to_string()));
        reading.insert("power".to_string(), FieldValue::Float(power_w as f64));
        reading.insert("power_unit".to_string(), FieldValue::Text("W".to_string()));
        reading.insert(
            "power_failure".to_string(),
            FieldValue::Int((status & 0x01) as i64),
        );
        reading.insert(
            "reverse_energy".to_string(),
            FieldValue::Int(((status & 0x02) >> 1) as i64),
        );

        Ok(vec![reading])
    }

    fn decoder_type(&self) -> &str {
        "ElectricityMeter"
    }

    fn field_metadata(&self) -> &'static [FieldMeta] {
        FIELD_METADATA
    }

    fn clone_box(&self) -> Box<dyn PayloadDecoder> {
        Box::new(*self)
    }
}
