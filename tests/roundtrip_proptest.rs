//! Property tests for serialization.
//!
//! Literal values written into a record serialize to bytes that parse back to
//! the same values, and `encoded_len` always agrees with `serialize`.

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use recordkit::fields::{Flag, Integer, RawBytes, Text, VarUInt};
use recordkit::{DefaultValue, Endian, FieldOptions, Schema, SchemaBuilder, Value};

fn schema() -> Arc<Schema> {
    let mut builder = Schema::builder("Sample");
    builder.field("id", Integer::u32(Endian::Little), DefaultValue::None, FieldOptions::new());
    builder.field("delta", Integer::i64(Endian::Big), DefaultValue::None, FieldOptions::new());
    builder.field("seen", Flag, DefaultValue::None, FieldOptions::new());
    builder
        .section("meta", None, FieldOptions::new(), |meta| {
            meta.field("count", VarUInt, DefaultValue::None, FieldOptions::new());
            meta.field(
                "label_len",
                Integer::u8(),
                SchemaBuilder::bind(|scope| Ok(Value::U64(scope.encoded_len("label")? as u64))),
                FieldOptions::new(),
            );
            meta.field("label", Text, DefaultValue::None, FieldOptions::new().length_field("label_len"));
            Ok(())
        })
        .unwrap();
    builder.field("tail", RawBytes, DefaultValue::None, FieldOptions::new().remaining());
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn prop_literal_round_trip(
        id in any::<u32>(),
        delta in any::<i64>(),
        seen in any::<bool>(),
        count in any::<u64>(),
        label in "[a-z]{0,40}",
        tail in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let schema = schema();
        let mut record = schema.instantiate().unwrap();
        record.set("id", id).unwrap();
        record.set("delta", delta).unwrap();
        record.set("seen", seen).unwrap();
        record.set("meta.count", count).unwrap();
        record.set("meta.label", label.clone()).unwrap();
        record.set("tail", tail.clone()).unwrap();

        let bytes = record.serialize().unwrap();
        prop_assert_eq!(record.encoded_len().unwrap(), bytes.len());

        let mut input = bytes.clone();
        let parsed = schema.parse(&mut input).unwrap();
        prop_assert!(input.is_empty());
        prop_assert_eq!(parsed.get("id"), Some(&Value::U32(id)));
        prop_assert_eq!(parsed.get("delta"), Some(&Value::I64(delta)));
        prop_assert_eq!(parsed.get("seen"), Some(&Value::Bool(seen)));
        prop_assert_eq!(parsed.get("meta.count"), Some(&Value::U64(count)));
        prop_assert_eq!(parsed.get("meta.label"), Some(&Value::String(label)));
        prop_assert_eq!(parsed.get("tail"), Some(&Value::Bytes(Bytes::from(tail))));
        prop_assert_eq!(parsed.serialize().unwrap(), bytes);
    }

    #[test]
    fn prop_encoded_len_matches_serialize(raw in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut record = schema().instantiate().unwrap();
        record.set("tail", raw).unwrap();
        let bytes = record.serialize().unwrap();
        prop_assert_eq!(record.encoded_len().unwrap(), bytes.len());
        prop_assert_eq!(record.section("meta").unwrap().encoded_len().unwrap(), 2);
    }
}
