//! Decoder fuzz target: arbitrary bytes through the XML reader and the codec.
//! Neither may panic; every failure must come back as a typed error.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use adminmsg::{parse_schemas, Codec, SchemaRegistry};

    let mut registry = SchemaRegistry::new();
    registry
        .register_all(
            parse_schemas(
                "struct Attr { @n: string; value: optional<text>; }\n\
                 message ModifyAccountRequest { @id: string; @quota: optional<int>; a: optional<list<Attr>>; }",
            )
            .unwrap(),
        )
        .unwrap();
    let codec = Codec::new(registry).unwrap();
    let _ = codec.decode("ModifyAccountRequest", None, data);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
