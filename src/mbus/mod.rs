//! # M-Bus Data Record Container
//!
//! Generic support for the EN 13757-3 variable data record format that
//! M-Bus based meter modules transmit over LoRaWAN: the record walk
//! (DIB/VIB headers plus data), the value information lookup tables and the
//! primitive data encodings (BCD, little-endian integers, CP32 date/time).

pub mod data_encoding;
pub mod record;
pub mod vif;

pub use record::{parse_records, MBusRecord, MBusRecordValue};
pub use vif::Descriptor;
