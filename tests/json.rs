//! Json to Tron tests

use tron::{BuildError, DecodeOptions, DocumentType, Int64Mode, Tron, TronBuf, TronError, Value};

fn assert_round_trip(input: &str, expected: &str) {
    let tron = TronBuf::parse(input).unwrap();
    assert_eq!(tron.format(false).unwrap(), expected);
    assert_eq!(tron.to_json(DecodeOptions::new()).unwrap(), expected);
}

#[test]
fn test_scalar() {
    assert_round_trip("null", "null");
    assert_round_trip("true", "true");
    assert_round_trip("-12", "-12");
    assert_round_trip("0.125", "0.125");
    assert_round_trip("\"abc\"", "\"abc\"");
    assert_round_trip("\"b64:AAEC\"", "\"b64:AAEC\"");
    // unpadded base64 is accepted and written back padded
    assert_round_trip("\"b64:AQI\"", "\"b64:AQI=\"");
    // not base64, stays a string
    assert_round_trip("\"b64:***\"", "\"b64:***\"");

    let tron = TronBuf::parse("9223372036854775807").unwrap();
    assert_eq!(tron.document_type().unwrap(), DocumentType::Scalar);
    assert_eq!(tron.decode().unwrap(), Value::Int64(i64::MAX));

    let tron = TronBuf::parse("9223372036854775808").unwrap();
    assert_eq!(tron.decode().unwrap(), Value::Float64(9223372036854775808.0));

    let tron = TronBuf::parse("\"b64:AQI=\"").unwrap();
    assert_eq!(tron.decode().unwrap(), Value::Binary(vec![1, 2]));
}

#[test]
fn test_composite() {
    let input = r#"{"name": "tron", "tags": ["a", "b"], "nested": {"x": [1, [2, [3]]], "y": {}}, "none": null}"#;
    let expected = r#"{"name":"tron","nested":{"x":[1,[2,[3]]],"y":{}},"none":null,"tags":["a","b"]}"#;
    assert_round_trip(input, expected);

    let tron = TronBuf::parse("[]").unwrap();
    assert_eq!(tron.document_type().unwrap(), DocumentType::Tree);
    assert_eq!(tron.format(false).unwrap(), "[]");

    let array: Vec<String> = (0..100).map(|i| i.to_string()).collect();
    let input = format!("[{}]", array.join(","));
    assert_round_trip(&input, &input);
}

#[test]
fn test_parse_to() {
    let mut bytes = Vec::with_capacity(64);
    let tron = Tron::parse_to(&mut bytes, r#"{"k": "v"}"#).unwrap();
    assert_eq!(tron.format(false).unwrap(), r#"{"k":"v"}"#);

    // test from used vec
    let tron = Tron::parse_to(&mut bytes, "[true]").unwrap();
    assert_eq!(tron.format(false).unwrap(), "[true]");
}

#[test]
fn test_to_json_int64_mode() {
    let tron = TronBuf::parse("[9007199254740992]").unwrap();
    let native = DecodeOptions::new().int64_mode(Int64Mode::PreferNative);
    assert!(matches!(tron.to_json(native), Err(TronError::IntegerOutOfRange(9007199254740992))));
    assert_eq!(tron.to_json(DecodeOptions::new()).unwrap(), "[9007199254740992]");
}

#[test]
fn test_pretty() {
    let tron = TronBuf::parse(r#"{"a": [1, true]}"#).unwrap();
    assert_eq!(tron.format(true).unwrap(), "{\n  \"a\": [\n    1,\n    true\n  ]\n}");
}

#[test]
fn test_parse_errors() {
    assert!(matches!(TronBuf::parse("{\"a\": }"), Err(BuildError::JsonError(_))));
    assert!(TronBuf::parse("1e999").is_err());

    // serde_json stops at the same depth as the encoder
    let deep = format!("{}{}", "[".repeat(129), "]".repeat(129));
    assert!(TronBuf::parse(deep).is_err());
    let deep = format!("{}{}", "[".repeat(127), "]".repeat(127));
    assert!(TronBuf::parse(deep).unwrap().decode().is_ok());
}
