//! Magnetic door/window contact sensor decoder

use crate::decoder::{helpers, FieldMeta, FieldValue, PayloadDecoder, Reading, UplinkMeta};
use crate::error::DecodeError;

/// Display metadata for the fields this decoder can emit.
pub const FIELD_METADATA: &[FieldMeta] = &[
    FieldMeta { field: "door_open", label: "Door open", unit: "" },
    FieldMeta { field: "tamper", label: "Tamper alarm", unit: "" },
    FieldMeta { field: "open_count", label: "Open counter", unit: "" },
    FieldMeta { field: "battery", label: "Battery voltage", unit: "V" },
];

/// Magnetic contact sensor decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoorSensorDecoder;

impl PayloadDecoder for DoorSensorDecoder {
    fn decode(&self, payload: &[u8], _meta: &UplinkMeta) -> Result<Vec<Reading>, DecodeError> {
        // Payload layout:
        // [0]: status (bit 0: contact open, bit 1: tamper)
        // [1-3]: open counter, little-endian
        // [4-5]: battery voltage in mV, little-endian
        if payload.len() < 6 {
            return Err(DecodeError::InvalidLength {
                expected: 6,
                actual: payload.len(),
            });
        }

        let status = payload[0];
        let open_count = helpers::read_le_uint(payload, 1, 3)?;
        let battery_mv = helpers::read_le_uint(payload, 4, 2)?;

        let mut reading = Reading::new();
        reading.insert(
            "door_open".to_string(),
            FieldValue::Int((status & 0x01) as i64),
        );
        reading.insert(
            "tamper".to_string(),
            FieldValue::Int(((status & 0x02) >> 1) as i64),
        );
        reading.insert("open_count".to_string(), FieldValue::Int(open_count as i64));
        reading.insert(
            "battery".to_string(),
            FieldValue::Float(battery_mv as f64 / 1000.0),
        );
        reading.insert("battery_unit".to_string(), FieldValue::Text("V".to_string()));

        Ok(vec![reading])
    }

    fn decoder_type(&self) -> &str {
        "DoorSensor"
    }

    fn field_metadata(&self) -> &'static [FieldMeta] {
        FIELD_METADATA
    }

    fn clone_box(&self) -> Box<dyn PayloadDecoder> {
        Box::new(*self)
    }
}
