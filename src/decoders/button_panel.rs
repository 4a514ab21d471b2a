//! Wireless button panel decoder

use crate::decoder::{helpers, FieldMeta, FieldValue, PayloadDecoder, Reading, UplinkMeta};
use crate::error::DecodeError;

/// Press kinds the panel firmware reports.
const PRESS_KINDS: &[(u8, &str)] = &[(0x01, "single"), (0x02, "double"), (0x03, "long")];

/// Display metadata for the fields this decoder can emit.
pub const FIELD_METADATA: &[FieldMeta] = &[
    FieldMeta { field: "button", label: "Button number", unit: "" },
    FieldMeta { field: "press_type", label: "Press type", unit: "" },
    FieldMeta { field: "battery", label: "Battery voltage", unit: "V" },
];

/// Button panel decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonPanelDecoder;

impl PayloadDecoder for ButtonPanelDecoder {
    fn decode(&self, payload: &[u8], _meta: &UplinkMeta) -> Result<Vec<Reading>, DecodeError> {
        // Payload layout:
        // [0]: button index, 1-based
        // [1]: press kind (0x01 single, 0x02 double, 0x03 long)
        // [2-3]: battery voltage in mV, little-endian
        if payload.len() < 4 {
            return Err(DecodeError::InvalidLength {
                expected: 4,
                actual: payload.len(),
            });
        }

        let button = payload[0];
        let press_kind = PRESS_KINDS
            .iter()
            .find(|(code, _)| *code == payload[1])
            .map(|(_, name)| *name)
            .ok_or_else(|| DecodeError::InvalidData {
                offset: 1,
                reason: format!("unknown press kind 0x{:02X}", payload[1]),
            })?;
        let battery_mv = helpers::read_le_uint(payload, 2, 2)?;

        let mut reading = Reading::new();
        reading.insert("button".to_string(), FieldValue::Int(button as i64));
        reading.insert(
            "press_type".to_string(),
            FieldValue::Text(press_kind.to_string()),
        );
        reading.insert(
            "battery".to_string(),
            FieldValue::Float(battery_mv as f64 / 1000.0),
        );
        reading.insert("battery_unit".to_string(), FieldValue::Text("V".to_string()));

        Ok(vec![reading])
    }

    fn decoder_type(&self) -> &str {
        "ButtonPanel"
    }

    fn field_metadata(&self) -> &'static [FieldMeta] {
        FIELD_METADATA
    }

    fn clone_box(&self) -> Box<dyn PayloadDecoder> {
        Box::new(*self)
    }
}
