//! PIR motion/occupancy sensor decoder

use crate::decoder::{helpers, FieldMeta, FieldValue, PayloadDecoder, Reading, UplinkMeta};
use crate::error::DecodeError;

/// Display metadata for the fields this decoder can emit.
pub const FIELD_METADATA: &[FieldMeta] = &[
    FieldMeta { field: "motion", label: "Motion detected", unit: "" },
    FieldMeta { field: "event_count", label: "Motion events", unit: "" },
    FieldMeta { field: "occupancy_time", label: "Occupancy time", unit: "min" },
    FieldMeta { field: "battery", label: "Battery voltage", unit: "V" },
];

/// PIR motion sensor decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionSensorDecoder;

impl PayloadDecoder for MotionSensorDecoder {
    fn decode(&self, payload: &[u8], _meta: &UplinkMeta) -> Result<Vec<Reading>, DecodeError> {
        // Payload layout:
        // [0]: event flags (bit 0: motion currently detected)
        // [1-2]: event counter since power-up, little-endian
        // [3-4]: accumulated occupancy in minutes, little-endian
        // [5-6]: battery voltage in mV, little-endian
        if payload.len() < 7 {
            return Err(DecodeError::InvalidLength {
                expected: 7,
                actual: payload.len(),
            });
        }

        let flags = payload[0];
        let event_count = helpers::read_le_uint(payload, 1, 2)?;
        let occupancy_minutes = helpers::read_le_uint(payload, 3, 2)?;
        let battery_mv = helpers::read_le_uint(payload, 5, 2)?;

        let mut reading = Reading::new();
        reading.insert("motion".to_string(), FieldValue::Int((flags & 0x01) as i64));
        reading.insert(
            "event_count".to_string(),
            FieldValue::Int(event_count as i64),
        );
        reading.insert(
            "occupancy_time".to_string(),
            FieldValue::Float(occupancy_minutes as f64),
        );
        reading.insert(
            "occupancy_time_unit".to_string(),
            FieldValue::Text("min".to_string()),
        );
        reading.insert(
            "battery".to_string(),
            FieldValue::Float(battery_mv as f64 / 1000.0),
        );
        reading.insert("battery_unit".to_string(), FieldValue::Text("V".to_string()));

        Ok(vec![reading])
    }

    fn decoder_type(&self) -> &str {
        "MotionSensor"
    }

    fn field_metadata(&self) -> &'static [FieldMeta] {
        FIELD_METADATA
    }

    fn clone_box(&self) -> Box<dyn PayloadDecoder> {
        Box::new(*self)
    }
}
