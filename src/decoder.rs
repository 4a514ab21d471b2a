//! Payload decoder framework for LoRaWAN sensor devices
//!
//! This module provides the decoder trait shared by all device decoders and a
//! registry that maps device types to decoders. The registry's entry point is
//! tolerant: undecodable uplinks are logged and yield an empty result, they
//! never propagate an error to the host integration.

use crate::error::DecodeError;
use crate::logging::log_warn;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Metadata the host integration supplies with each uplink.
#[derive(Debug, Clone, Default)]
pub struct UplinkMeta {
    /// LoRaWAN frame port, when the network server reports one. Used for
    /// diagnostics only.
    pub f_port: Option<u8>,
}

/// A single scalar value in a decoded reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A decoded reading: a flat mapping from field name to scalar value.
pub type Reading = BTreeMap<String, FieldValue>;

/// Static description of an output field, for UI and reporting purposes.
/// Independent of the decode logic itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub field: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
}

/// Trait for implementing device payload decoders.
pub trait PayloadDecoder: Send + Sync + std::fmt::Debug {
    /// Decode an uplink payload into zero or more readings.
    fn decode(&self, payload: &[u8], meta: &UplinkMeta) -> Result<Vec<Reading>, DecodeError>;

    /// Get the name/type of this decoder.
    fn decoder_type(&self) -> &str;

    /// Check if this decoder can handle the given payload.
    fn can_decode(&self, payload: &[u8], meta: &UplinkMeta) -> bool {
        // Default: try to decode and see if it works
        self.decode(payload, meta).is_ok()
    }

    /// Field name / display label / unit table for the fields this decoder
    /// can emit.
    fn field_metadata(&self) -> &'static [FieldMeta] {
        &[]
    }

    /// Clone the decoder into a boxed trait object.
    fn clone_box(&self) -> Box<dyn PayloadDecoder>;
}

/// Registry of payload decoders, keyed by device type.
pub struct DecoderRegistry {
    decoders: HashMap<String, Box<dyn PayloadDecoder>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Create a registry with all built-in device decoders registered.
    pub fn with_defaults() -> Self {
        use crate::decoders::{
            ButtonPanelDecoder, Cmi4110Decoder, DoorSensorDecoder, ElectricityMeterDecoder,
            MotionSensorDecoder,
        };

        let mut registry = Self::new();
        registry.register("cmi4110", Box::new(Cmi4110Decoder::new()));
        registry.register("door-sensor", Box::new(DoorSensorDecoder));
        registry.register("motion-sensor", Box::new(MotionSensorDecoder));
        registry.register("button-panel", Box::new(ButtonPanelDecoder));
        registry.register("electricity-meter", Box::new(ElectricityMeterDecoder));
        registry
    }

    /// Register a decoder for a device type.
    pub fn register(&mut self, device_type: &str, decoder: Box<dyn PayloadDecoder>) {
        self.decoders.insert(device_type.to_string(), decoder);
    }

    /// Look up the decoder for a device type.
    pub fn get(&self, device_type: &str) -> Option<&dyn PayloadDecoder> {
        self.decoders.get(device_type).map(|d| d.as_ref())
    }

    /// Decode an uplink from a device.
    ///
    /// This is the tolerant entry point for host integrations: an unknown
    /// device type or an undecodable payload is logged together with the raw
    /// bytes and frame port, and yields an empty result.
    pub fn decode_uplink(&self, device_type: &str, payload: &[u8], meta: &UplinkMeta) -> Vec<Reading> {
        let Some(decoder) = self.decoders.get(device_type) else {
            log_warn(&format!("No decoder registered for device type {device_type:?}"));
            return Vec::new();
        };

        match decoder.decode(payload, meta) {
            Ok(readings) => readings,
            Err(err) => {
                log_warn(&format!(
                    "{}: undecodable payload {} (f_port {:?}): {err}",
                    decoder.decoder_type(),
                    hex::encode(payload),
                    meta.f_port,
                ));
                Vec::new()
            }
        }
    }
}

/// Helper functions for common decoding operations
pub mod helpers {
    use super::*;

    /// Extract a little-endian integer from bytes
    pub fn read_le_uint(data: &[u8], offset: usize, size: usize) -> Result<u64, DecodeError> {
        if offset + size > data.len() {
            return Err(DecodeError::InvalidLength {
                expected: offset + size,
                actual: data.len(),
            });
        }

        let mut value = 0u64;
        for i in 0..size {
            value |= (data[offset + i] as u64) << (i * 8);
        }
        Ok(value)
    }

    /// Extract a big-endian integer from bytes
    pub fn read_be_uint(data: &[u8], offset: usize, size: usize) -> Result<u64, DecodeError> {
        if offset + size > data.len() {
            return Err(DecodeError::InvalidLength {
                expected: offset + size,
                actual: data.len(),
            });
        }

        let mut value = 0u64;
        for i in 0..size {
            value = (value << 8) | data[offset + i] as u64;
        }
        Ok(value)
    }
}
