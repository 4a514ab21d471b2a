//! # lora-decoders - Decoders for LoRaWAN Sensor Uplink Payloads
//!
//! The lora-decoders crate translates the raw binary payloads emitted by
//! LoRaWAN-connected IoT sensors into structured key-value readings. Each
//! decoder is self-contained: it pattern-matches a fixed or variant binary
//! layout, extracts bit and byte fields, applies scaling and lookup-table
//! translation, and returns a flat mapping of named measurements with units.
//!
//! ## Features
//!
//! - Decode Elvaco CMi4110 heat meter telegrams (M-Bus data records over
//!   LoRaWAN), including the UH50 error flag word
//! - Decode simple fixed-offset devices: door/window contacts, PIR motion
//!   sensors, button panels and electricity meters
//! - Registry of decoders keyed by device type, with a tolerant entry point
//!   that logs undecodable uplinks and returns an empty result
//! - Pluggable post-processing of readings via `ReadingExtension`
//! - Static field metadata tables for UI and reporting
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust
//! use lora_decoders::{DecoderRegistry, UplinkMeta};
//!
//! let registry = DecoderRegistry::with_defaults();
//! let payload = hex::decode("000C06150110000C782791206802FD170600").unwrap();
//! let readings = registry.decode_uplink(
//!     "cmi4110",
//!     &payload,
//!     &UplinkMeta { f_port: Some(2) },
//! );
//! assert_eq!(readings.len(), 1);
//! ```

pub mod decoder;
pub mod decoders;
pub mod error;
pub mod logging;
pub mod mbus;

pub use crate::error::DecodeError;
pub use crate::logging::{init_logger, log_info};

// Decoder framework
pub use decoder::{
    DecoderRegistry, FieldMeta, FieldValue, PayloadDecoder, Reading, UplinkMeta,
};

// Device decoders
pub use decoders::cmi4110::{
    decode_error_flags, Cmi4110Decoder, ErrorFlags, KwhEnergyMirror, ReadingExtension,
    HEAT_ENERGY_KEY,
};
pub use decoders::{
    ButtonPanelDecoder, DoorSensorDecoder, ElectricityMeterDecoder, MotionSensorDecoder,
};

// M-Bus record container
pub use mbus::{parse_records, Descriptor, MBusRecord, MBusRecordValue};
