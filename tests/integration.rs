//! Integration tests: parse catalogs, encode/decode, validation, tolerance,
//! and the batch envelope, end to end.

use adminmsg::{
    decode_batch, encode_batch, parse_schemas, Codec, CodecError, MessageValue, OnError,
    SchemaRegistry, Value,
};

const GET_COS: &str = r#"
struct CosSelector {
	value: text;
}

message GetCosRequest {
	cos: optional<CosSelector>;
}
"#;

const ALL_KINDS: &str = r#"
struct Attr {
	@n: string;
	value: optional<text>;
}

message ModifyAccountRequest {
	@id: string;
	@quota: optional<int>;
	@active: optional<bool>;
	description: optional<string>;
	a: optional<list<Attr>>;
}
"#;

fn codec_for(src: &str) -> Codec {
    let mut registry = SchemaRegistry::new();
    registry
        .register_all(parse_schemas(src).expect("parse"))
        .expect("register");
    Codec::new(registry).expect("codec")
}

fn demo_codec() -> Codec {
    codec_for(include_str!("../demos/admin.msgs"))
}

// ==================== Example scenario ====================

#[test]
fn get_cos_scenario() {
    let codec = codec_for(GET_COS);
    let value = MessageValue::new().with(
        "cos",
        Value::Msg(MessageValue::new().with("value", Value::str("default"))),
    );

    let bytes = codec.encode("GetCosRequest", None, &value).expect("encode");
    assert_eq!(bytes, b"<GetCosRequest><cos>default</cos></GetCosRequest>");

    let empty = codec
        .encode("GetCosRequest", None, &MessageValue::new())
        .expect("encode empty");
    assert_eq!(empty, b"<GetCosRequest/>");

    let decoded = codec.decode("GetCosRequest", None, &bytes).expect("decode");
    assert_eq!(decoded, value);

    let tolerant = codec
        .decode(
            "GetCosRequest",
            None,
            b"<GetCosRequest><bogus>1</bogus></GetCosRequest>",
        )
        .expect("decode with unknown child");
    assert!(tolerant.is_empty());
}

// ==================== Round trip and determinism ====================

#[test]
fn round_trip_all_field_kinds() {
    let codec = codec_for(ALL_KINDS);
    let attr = |n: &str, v: &str| {
        Value::Msg(
            MessageValue::new()
                .with("n", Value::str(n))
                .with("value", Value::str(v)),
        )
    };
    let value = MessageValue::new()
        .with("id", Value::str("a-42"))
        .with("quota", Value::Int(10240))
        .with("active", Value::Bool(true))
        .with("description", Value::str("primary account"))
        .with(
            "a",
            Value::List(vec![
                attr("displayName", "Eve Adams"),
                attr("zimbraMailQuota", "0"),
            ]),
        );

    let bytes = codec.encode("ModifyAccountRequest", None, &value).expect("encode");
    let decoded = codec.decode("ModifyAccountRequest", None, &bytes).expect("decode");
    assert_eq!(decoded, value);
}

#[test]
fn encode_is_deterministic() {
    let codec = codec_for(ALL_KINDS);
    // Two separately built (and therefore differently ordered) maps.
    let a = MessageValue::new()
        .with("id", Value::str("x"))
        .with("active", Value::Bool(false))
        .with("quota", Value::Int(1));
    let b = MessageValue::new()
        .with("quota", Value::Int(1))
        .with("active", Value::Bool(false))
        .with("id", Value::str("x"));
    let one = codec.encode("ModifyAccountRequest", None, &a).expect("encode");
    let two = codec.encode("ModifyAccountRequest", None, &b).expect("encode");
    assert_eq!(one, two);
    assert_eq!(one, codec.encode("ModifyAccountRequest", None, &a).expect("encode again"));
}

#[test]
fn decode_accepts_any_document_order() {
    let codec = codec_for(ALL_KINDS);
    let shuffled = b"<ModifyAccountRequest quota=\"1\" id=\"x\"><a n=\"k\"/><description>d</description><a n=\"k2\"/></ModifyAccountRequest>";
    let decoded = codec
        .decode("ModifyAccountRequest", None, shuffled)
        .expect("decode");
    assert_eq!(decoded.get_str("description"), Some("d"));
    let attrs = decoded.get_list("a").expect("list");
    assert_eq!(attrs.len(), 2);
    // Document order preserved within the list.
    assert_eq!(attrs[0].as_msg().and_then(|m| m.get_str("n")), Some("k"));
    assert_eq!(attrs[1].as_msg().and_then(|m| m.get_str("n")), Some("k2"));
}

#[test]
fn escaping_round_trips() {
    let codec = codec_for(ALL_KINDS);
    let value = MessageValue::new()
        .with("id", Value::str("<&\"'>"))
        .with("description", Value::str("a < b & c > d"));
    let bytes = codec.encode("ModifyAccountRequest", None, &value).expect("encode");
    let text = String::from_utf8(bytes.clone()).expect("utf8");
    assert!(!text.contains("a < b"));
    let decoded = codec.decode("ModifyAccountRequest", None, &bytes).expect("decode");
    assert_eq!(decoded, value);
}

// ==================== Required fields ====================

#[test]
fn missing_required_field_on_encode() {
    let codec = codec_for(ALL_KINDS);
    let err = codec
        .encode("ModifyAccountRequest", None, &MessageValue::new())
        .expect_err("missing id");
    assert!(matches!(err, CodecError::MissingRequiredField(f) if f == "id"));
}

#[test]
fn missing_required_field_on_decode() {
    let codec = codec_for(ALL_KINDS);
    let err = codec
        .decode("ModifyAccountRequest", None, b"<ModifyAccountRequest quota=\"5\"/>")
        .expect_err("missing id");
    assert!(matches!(err, CodecError::MissingRequiredField(f) if f == "id"));
}

#[test]
fn required_list_needs_at_least_one_item() {
    let src = "message GetAllConfigResponse {\n\ta: list<string>;\n}\n";
    let codec = codec_for(src);
    let err = codec
        .decode("GetAllConfigResponse", None, b"<GetAllConfigResponse/>")
        .expect_err("empty list");
    assert!(matches!(err, CodecError::MissingRequiredField(f) if f == "a"));

    let err = codec
        .encode(
            "GetAllConfigResponse",
            None,
            &MessageValue::new().with("a", Value::List(vec![])),
        )
        .expect_err("empty list on encode");
    assert!(matches!(err, CodecError::MissingRequiredField(_)));
}

// ==================== Tolerance and compatibility ====================

#[test]
fn unknown_fields_are_discarded() {
    let codec = codec_for(ALL_KINDS);
    let known = codec
        .decode("ModifyAccountRequest", None, b"<ModifyAccountRequest id=\"x\"/>")
        .expect("decode");
    let with_extras = codec
        .decode(
            "ModifyAccountRequest",
            None,
            b"<ModifyAccountRequest id=\"x\" futureFlag=\"1\"><futureChild limit=\"9\">soon</futureChild></ModifyAccountRequest>",
        )
        .expect("decode with extras");
    assert_eq!(with_extras, known);
}

#[test]
fn boolean_compatibility_shim() {
    let codec = codec_for(ALL_KINDS);
    for (wire, expected) in [
        ("1", true),
        ("0", false),
        ("true", true),
        ("TRUE", true),
        ("false", false),
        ("FaLsE", false),
    ] {
        let src = format!("<ModifyAccountRequest id=\"x\" active=\"{}\"/>", wire);
        let decoded = codec
            .decode("ModifyAccountRequest", None, src.as_bytes())
            .expect("decode");
        assert_eq!(decoded.get_bool("active"), Some(expected), "wire {:?}", wire);
    }

    let value = MessageValue::new()
        .with("id", Value::str("x"))
        .with("active", Value::Bool(true));
    let bytes = codec.encode("ModifyAccountRequest", None, &value).expect("encode");
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("active=\"1\""), "got {}", text);
    assert!(!text.contains("true"));
}

#[test]
fn bad_scalars_are_rejected() {
    let codec = codec_for(ALL_KINDS);
    let err = codec
        .decode(
            "ModifyAccountRequest",
            None,
            b"<ModifyAccountRequest id=\"x\" quota=\"lots\"/>",
        )
        .expect_err("bad int");
    assert!(matches!(err, CodecError::UnsupportedScalarFormat { field, .. } if field == "quota"));

    let err = codec
        .decode(
            "ModifyAccountRequest",
            None,
            b"<ModifyAccountRequest id=\"x\" active=\"yes\"/>",
        )
        .expect_err("bad bool");
    assert!(matches!(err, CodecError::UnsupportedScalarFormat { field, .. } if field == "active"));
}

#[test]
fn malformed_input_is_rejected() {
    let codec = codec_for(ALL_KINDS);
    for src in [
        &b"<ModifyAccountRequest id=\"x\">"[..],
        b"<ModifyAccountRequest id=x/>",
        b"not xml at all",
        b"",
        b"\xff\xfe",
    ] {
        assert!(
            matches!(
                codec.decode("ModifyAccountRequest", None, src),
                Err(CodecError::MalformedInput(_))
            ),
            "should reject {:?}",
            src
        );
    }
}

// ==================== Defaults and emit_empty ====================

#[test]
fn defaults_materialize_on_decode() {
    let codec = demo_codec();
    let ns = Some("urn:mailadmin");
    let decoded = codec
        .decode("GetQuotaUsageRequest", ns, b"<GetQuotaUsageRequest/>")
        .expect("decode");
    assert_eq!(decoded.get_i64("limit"), Some(25));
    assert_eq!(decoded.get_i64("offset"), Some(0));
    // No default declared, stays absent.
    assert!(decoded.get("sortAscending").is_none());
}

#[test]
fn emit_empty_controls_blank_strings() {
    let src = r#"
message SetPasswordRequest {
	@id: string;
	newPassword: optional<string> [emit_empty];
	note: optional<string>;
}
"#;
    let codec = codec_for(src);
    let value = MessageValue::new()
        .with("id", Value::str("a-1"))
        .with("newPassword", Value::str(""))
        .with("note", Value::str(""));
    let bytes = codec.encode("SetPasswordRequest", None, &value).expect("encode");
    assert_eq!(
        bytes,
        b"<SetPasswordRequest id=\"a-1\"><newPassword/></SetPasswordRequest>"
    );
}

// ==================== Demo catalog and namespaces ====================

#[test]
fn demo_catalog_registers_and_serves() {
    let codec = demo_codec();
    let ns = Some("urn:mailadmin");

    let account = |name: &str, id: &str, used: i64, limit: i64| {
        Value::Msg(
            MessageValue::new()
                .with("name", Value::str(name))
                .with("id", Value::str(id))
                .with("used", Value::Int(used))
                .with("limit", Value::Int(limit)),
        )
    };
    let response = MessageValue::new()
        .with("more", Value::Bool(false))
        .with("searchTotal", Value::Int(2))
        .with(
            "account",
            Value::List(vec![
                account("eve@example.com", "a-1", 1024, 10240),
                account("bob@example.com", "a-2", 0, 10240),
            ]),
        );

    let bytes = codec.encode("GetQuotaUsageResponse", ns, &response).expect("encode");
    let text = String::from_utf8(bytes.clone()).expect("utf8");
    assert!(text.starts_with("<GetQuotaUsageResponse xmlns=\"urn:mailadmin\""));

    let decoded = codec.decode("GetQuotaUsageResponse", ns, &bytes).expect("decode");
    assert_eq!(decoded, response);
}

#[test]
fn namespace_mismatch_is_a_root_mismatch() {
    let codec = demo_codec();
    let err = codec
        .decode(
            "NoOpRequest",
            Some("urn:mailadmin"),
            b"<NoOpRequest xmlns=\"urn:other\"/>",
        )
        .expect_err("wrong namespace");
    assert!(matches!(err, CodecError::RootMismatch { .. }));

    // Without an explicit wire namespace the element is accepted.
    codec
        .decode("NoOpRequest", Some("urn:mailadmin"), b"<NoOpRequest/>")
        .expect("inherited namespace");
}

#[test]
fn selector_text_round_trips_through_demo_catalog() {
    let codec = demo_codec();
    let ns = Some("urn:mailadmin");
    let request = MessageValue::new()
        .with("applyCos", Value::Bool(false))
        .with(
            "account",
            Value::Msg(
                MessageValue::new()
                    .with("by", Value::str("id"))
                    .with("value", Value::str("a-42")),
            ),
        );
    let bytes = codec.encode("GetAccountRequest", ns, &request).expect("encode");
    let text = String::from_utf8(bytes.clone()).expect("utf8");
    assert!(text.contains("<account by=\"id\">a-42</account>"), "got {}", text);
    let decoded = codec.decode("GetAccountRequest", ns, &bytes).expect("decode");
    assert_eq!(decoded, request);
}

// ==================== Batch envelope ====================

#[test]
fn batch_round_trip_with_demo_catalog() {
    let codec = demo_codec();
    let ns = Some("urn:mailadmin");
    let delete = MessageValue::new().with("id", Value::str("a-9"));
    let noop = MessageValue::new();
    let bytes = encode_batch(
        &codec,
        ns,
        &[("DeleteAccountRequest", &delete), ("NoOpRequest", &noop)],
        OnError::Stop,
    )
    .expect("encode batch");

    let result = decode_batch(&codec, &bytes).expect("decode batch");
    assert_eq!(result.messages.len(), 2);
    assert!(result.failed.is_empty());
    assert_eq!(result.messages[0].value.get_str("id"), Some("a-9"));
}
