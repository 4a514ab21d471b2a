//! # Value Information Lookup Tables
//!
//! Maps VIF and VIFE codes (EN 13757-3) to a semantic descriptor, the
//! reported unit string and the decimal scaling exponent. The tables are
//! restricted to the codes the supported meter modules emit; every other
//! code maps to an unknown descriptor that downstream decoders filter out.

use std::borrow::Cow;

/// Semantic tag identifying what a data record measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Energy,
    Volume,
    Power,
    Flow,
    SupplyTemperature,
    ReturnTemperature,
    FabricationBlock,
    ErrorCodes,
    DateTime,
    FunctionField,
    /// Primary VIF code without a table entry.
    UnknownVif(u8),
    /// Linear VIFE extension code without a table entry.
    UnknownVife(u8),
}

impl Descriptor {
    /// Canonical output field name for this descriptor.
    ///
    /// Unknown codes render with the record vocabulary's literal
    /// "unkown_" prefix (sic); the spelling is part of the vocabulary and
    /// is matched as-is by the record filter.
    pub fn field_name(&self) -> Cow<'static, str> {
        match self {
            Descriptor::Energy => Cow::Borrowed("energy"),
            Descriptor::Volume => Cow::Borrowed("volume"),
            Descriptor::Power => Cow::Borrowed("power"),
            Descriptor::Flow => Cow::Borrowed("flow"),
            Descriptor::SupplyTemperature => Cow::Borrowed("supply_temperature"),
            Descriptor::ReturnTemperature => Cow::Borrowed("return_temperature"),
            Descriptor::FabricationBlock => Cow::Borrowed("fabrication_block"),
            Descriptor::ErrorCodes => Cow::Borrowed("error_codes"),
            Descriptor::DateTime => Cow::Borrowed("datetime"),
            Descriptor::FunctionField => Cow::Borrowed("function_field"),
            Descriptor::UnknownVif(vif) => Cow::Owned(format!("unkown_vif_0x{vif:02x}")),
            Descriptor::UnknownVife(code) => Cow::Owned(format!("unkown_vife_0x{code:02x}")),
        }
    }

    /// Paired unit-label field name for this descriptor.
    ///
    /// The pairs for the closed set of known descriptors are fixed at
    /// compile time; unknown descriptors never reach the output.
    pub fn unit_field_name(&self) -> Cow<'static, str> {
        match self {
            Descriptor::Energy => Cow::Borrowed("energy_unit"),
            Descriptor::Volume => Cow::Borrowed("volume_unit"),
            Descriptor::Power => Cow::Borrowed("power_unit"),
            Descriptor::Flow => Cow::Borrowed("flow_unit"),
            Descriptor::SupplyTemperature => Cow::Borrowed("supply_temperature_unit"),
            Descriptor::ReturnTemperature => Cow::Borrowed("return_temperature_unit"),
            Descriptor::FabricationBlock => Cow::Borrowed("fabrication_block_unit"),
            Descriptor::ErrorCodes => Cow::Borrowed("error_codes_unit"),
            Descriptor::DateTime => Cow::Borrowed("datetime_unit"),
            Descriptor::FunctionField => Cow::Borrowed("function_field_unit"),
            _ => Cow::Owned(format!("{}_unit", self.field_name())),
        }
    }
}

/// Value information for a VIF code.
#[derive(Debug, Clone, Copy)]
pub struct VifInfo {
    pub descriptor: Descriptor,
    /// Unit as reported by the container format. `Some("")` for descriptors
    /// without a physical unit; `None` only for unknown codes.
    pub unit: Option<&'static str>,
    /// Decimal scaling exponent applied to the raw value.
    pub exponent: i8,
}

/// Looks up a primary VIF code (extension bit masked off).
pub fn lookup_primary_vif(vif: u8) -> VifInfo {
    let code = vif & 0x7F;
    let nnn = (code & 0x07) as i8;
    match code {
        // E000 0nnn: Energy 10^(nnn-3) Wh
        0x00..=0x07 => VifInfo {
            descriptor: Descriptor::Energy,
            unit: Some("Wh"),
            exponent: nnn - 3,
        },
        // E000 1nnn: Energy 10^nnn J
        0x08..=0x0F => VifInfo {
            descriptor: Descriptor::Energy,
            unit: Some("J"),
            exponent: nnn,
        },
        // E001 0nnn: Volume 10^(nnn-6) m³
        0x10..=0x17 => VifInfo {
            descriptor: Descriptor::Volume,
            unit: Some("m³"),
            exponent: nnn - 6,
        },
        // E010 1nnn: Power 10^(nnn-3) W
        0x28..=0x2F => VifInfo {
            descriptor: Descriptor::Power,
            unit: Some("W"),
            exponent: nnn - 3,
        },
        // E011 1nnn: Volume flow 10^(nnn-6) m³/h
        0x38..=0x3F => VifInfo {
            descriptor: Descriptor::Flow,
            unit: Some("m³/h"),
            exponent: nnn - 6,
        },
        // E101 10nn: Flow temperature 10^(nn-3) °C
        0x58..=0x5B => VifInfo {
            descriptor: Descriptor::SupplyTemperature,
            unit: Some("°C"),
            exponent: (code & 0x03) as i8 - 3,
        },
        // E101 11nn: Return temperature 10^(nn-3) °C
        0x5C..=0x5F => VifInfo {
            descriptor: Descriptor::ReturnTemperature,
            unit: Some("°C"),
            exponent: (code & 0x03) as i8 - 3,
        },
        // E110 1101: Time point, type F date and time
        0x6D => VifInfo {
            descriptor: Descriptor::DateTime,
            unit: Some(""),
            exponent: 0,
        },
        // E111 1000: Fabrication number
        0x78 => VifInfo {
            descriptor: Descriptor::FabricationBlock,
            unit: Some(""),
            exponent: 0,
        },
        _ => VifInfo {
            descriptor: Descriptor::UnknownVif(code),
            unit: None,
            exponent: 0,
        },
    }
}

/// Looks up a linear VIFE extension code (0xFD prefix).
pub fn lookup_vife_fd(code: u8) -> VifInfo {
    let code = code & 0x7F;
    match code {
        // E001 0111: Error flags, binary
        0x17 => VifInfo {
            descriptor: Descriptor::ErrorCodes,
            unit: Some(""),
            exponent: 0,
        },
        _ => VifInfo {
            descriptor: Descriptor::UnknownVife(code),
            unit: None,
            exponent: 0,
        },
    }
}
