//! Decoder implementations for the supported LoRaWAN sensor devices

// Simple fixed-offset decoders
pub mod button_panel;
pub mod door_sensor;
pub mod electricity_meter;
pub mod motion_sensor;

// M-Bus record based meter decoders
pub mod cmi4110;

pub use button_panel::ButtonPanelDecoder;
pub use cmi4110::Cmi4110Decoder;
pub use door_sensor::DoorSensorDecoder;
pub use electricity_meter::ElectricityMeterDecoder;
pub use motion_sensor::MotionSensorDecoder;
