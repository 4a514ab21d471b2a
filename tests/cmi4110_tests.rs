//! Integration tests for the Elvaco CMi4110 heat meter decoder

use lora_decoders::{
    decode_error_flags, Cmi4110Decoder, DecoderRegistry, FieldValue, PayloadDecoder, Reading,
    UplinkMeta,
};
use proptest::prelude::*;

fn decode_hex(payload_hex: &str) -> Vec<Reading> {
    let payload = hex::decode(payload_hex).unwrap();
    DecoderRegistry::with_defaults().decode_uplink("cmi4110", &payload, &UplinkMeta::default())
}

#[test]
fn test_standard_telegram_end_to_end() {
    let readings = decode_hex(
        "000C06384612000C14059753000B2D5201000B3B5706000A5A05030A5E05010C7889478268046D3231542302FD170000",
    );
    assert_eq!(readings.len(), 1);
    let reading = &readings[0];

    assert_eq!(reading["energy"], FieldValue::Float(124638.0));
    assert_eq!(reading["energy_unit"], FieldValue::Text("kWh".to_string()));
    assert_eq!(reading["heat_energy"], FieldValue::Float(124638.0));
    assert_eq!(reading["volume"], FieldValue::Float(5397.05));
    assert_eq!(reading["flow"], FieldValue::Float(0.657));
    assert_eq!(reading["supply_temperature"], FieldValue::Float(30.5));
    assert_eq!(reading["return_temperature"], FieldValue::Float(10.5));
    assert_eq!(reading["fabrication_block"], FieldValue::Int(68824789));
    assert_eq!(reading["error_codes"], FieldValue::Int(0));
    assert_eq!(reading["error"], FieldValue::Text(String::new()));
    assert_eq!(reading["payload_style"], FieldValue::Int(0));
}

#[test]
fn test_error_telegram_end_to_end() {
    let readings = decode_hex("000C06150110000C782791206802FD170600");
    assert_eq!(readings.len(), 1);
    let reading = &readings[0];

    assert_eq!(reading["energy"], FieldValue::Float(100115.0));
    assert_eq!(reading["fabrication_block"], FieldValue::Int(68209127));
    assert_eq!(reading["error_codes"], FieldValue::Int(1));

    let error = reading["error"].as_str().unwrap();
    let parts: Vec<&str> = error.split(';').collect();
    assert_eq!(parts.len(), 2);
    assert!(parts[0].starts_with("F1:"));
    assert!(parts[1].starts_with("F2:"));
}

#[test]
fn test_trailing_error_block_equivalence() {
    // the trailing `01 FD 17 XX` block must be consumed, not parsed as a
    // data record and not fail the decode
    let with_block = decode_hex("000C06384612000C140597530001FD17C7");
    let without_block = decode_hex("000C06384612000C1405975300");
    assert_eq!(with_block, without_block);
    assert_eq!(with_block.len(), 1);
}

#[test]
fn test_unknown_descriptors_never_reach_output() {
    // VIF 0x6E (H.C.A. units) is outside the vocabulary
    let readings = decode_hex("000C06150110000A6E0500");
    assert_eq!(readings.len(), 1);
    for key in readings[0].keys() {
        assert!(!key.starts_with("unkown_"), "leaked key: {key}");
        assert!(!key.starts_with("unknown_"), "leaked key: {key}");
    }
}

#[test]
fn test_unparseable_inputs_yield_empty_result() {
    // empty buffer
    assert!(decode_hex("").is_empty());
    // style byte only
    assert!(decode_hex("00").is_empty());
    // leading structure that is not a data record walk
    assert!(decode_hex("004F00").is_empty());
    // truncated record
    assert!(decode_hex("000C0638").is_empty());
}

#[test]
fn test_unknown_device_type_yields_empty_result() {
    let registry = DecoderRegistry::with_defaults();
    let readings = registry.decode_uplink("no-such-device", &[0x00], &UplinkMeta::default());
    assert!(readings.is_empty());
}

#[test]
fn test_error_bit_12_only() {
    assert_eq!(decode_error_flags(&[0x00, 0x10]).unwrap(), "Error bit 12 set");
}

#[test]
fn test_all_named_bits_join_in_ascending_order() {
    let text = decode_error_flags(&[0xFF, 0x0F]).unwrap();
    let parts: Vec<&str> = text.split(';').collect();
    assert_eq!(parts.len(), 12);
    for (index, part) in parts.iter().take(10).enumerate() {
        assert!(
            part.starts_with(&format!("F{index}:")),
            "bit {index} out of order: {part}"
        );
    }
    assert!(!text.starts_with(';'));
    assert!(!text.ends_with(';'));
}

#[test]
fn test_decoder_metadata_and_clone() {
    let decoder = Cmi4110Decoder::new();
    assert_eq!(decoder.decoder_type(), "Elvaco-CMi4110");
    assert!(decoder
        .field_metadata()
        .iter()
        .any(|meta| meta.field == "energy" && meta.unit == "kWh"));

    let cloned = decoder.clone_box();
    let payload = hex::decode("000C0615011000").unwrap();
    assert!(cloned.decode(&payload, &UplinkMeta::default()).is_ok());
}

proptest! {
    #[test]
    fn prop_error_text_empty_iff_no_bits(word in 0u16..) {
        let bytes = word.to_le_bytes();
        let text = decode_error_flags(&bytes).unwrap();
        prop_assert_eq!(text.is_empty(), word == 0);
    }

    #[test]
    fn prop_error_codes_clamp_to_boolean(word in 0u16..) {
        let bytes = word.to_le_bytes();
        let payload_hex = format!("000C061501100002FD17{:02X}{:02X}", bytes[0], bytes[1]);
        let payload = hex::decode(payload_hex).unwrap();
        let decoder = Cmi4110Decoder::new();
        let readings = decoder.decode(&payload, &UplinkMeta::default()).unwrap();
        let error_codes = readings[0]["error_codes"].as_i64().unwrap();
        prop_assert!(error_codes == 0 || error_codes == 1);
        prop_assert_eq!(error_codes == 1, word != 0);
    }
}
