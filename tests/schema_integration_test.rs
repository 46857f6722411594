use std::sync::Arc;

use recordkit::fields::{Integer, RawBytes, Text};
use recordkit::{
    DefaultValue, Endian, Error, FieldKind, FieldOptions, RegistryBuilder, Schema, SchemaBuilder, Slot, Value,
    ValuePrototype,
};

/// Redeclaring a field keeps one entry at the original position with the new default.
#[test]
fn test_redeclared_field_keeps_position() {
    let mut builder = Schema::builder("Point");
    builder.field("x", Integer::i32(Endian::Big), DefaultValue::None, FieldOptions::new());
    builder.field("y", Integer::i32(Endian::Big), DefaultValue::None, FieldOptions::new());
    let slot = builder.field("x", Integer::i32(Endian::Big), 7i32, FieldOptions::new());
    assert_eq!(slot, Slot::Replaced(0));

    let schema = builder.build().unwrap();
    assert_eq!(schema.field_names(), vec!["x", "y"]);
    assert_eq!(schema.len(), 2);

    let record = schema.instantiate().unwrap();
    assert_eq!(record.get("x"), Some(&Value::I32(7)));
    assert_eq!(record.serialize().unwrap().as_ref(), &[0, 0, 0, 7, 0, 0, 0, 0]);
}

/// Changing a derived descriptor never shows through to the base.
#[test]
fn test_derived_descriptors_are_independent() {
    let mut builder = Schema::builder("Base");
    builder.field("kind", Integer::u8(), 1u8, FieldOptions::new());
    builder.field("seq", Integer::u32(Endian::Big), SchemaBuilder::counter("seq", 100, 1, true), FieldOptions::new());
    builder
        .section("meta", None, FieldOptions::new(), |meta| {
            meta.field("flags", Integer::u8(), 0u8, FieldOptions::new());
            Ok(())
        })
        .unwrap();
    builder.shadow_field("note", Text, "base", FieldOptions::new());
    let base = builder.build().unwrap();

    let mut derived = base.derive("Derived").unwrap();
    derived.descriptor_mut("kind").unwrap().set_default(2u8);
    derived.descriptor_mut("note").unwrap().set_default("derived");
    derived.field("extra", RawBytes, DefaultValue::None, FieldOptions::new().remaining());
    let derived = derived.build().unwrap();

    // counters fork: drawing from the derived schema leaves the base sequence alone
    let d1 = derived.instantiate().unwrap();
    let d2 = derived.instantiate().unwrap();
    let b1 = base.instantiate().unwrap();
    assert_eq!(d1.get("seq"), Some(&Value::I64(100)));
    assert_eq!(d2.get("seq"), Some(&Value::I64(101)));
    assert_eq!(b1.get("seq"), Some(&Value::I64(100)));

    assert_eq!(b1.get("kind"), Some(&Value::U8(1)));
    assert_eq!(d1.get("kind"), Some(&Value::U8(2)));
    assert_eq!(b1.shadow("note").unwrap().value(), Some(&Value::from("base")));
    assert_eq!(d1.shadow("note").unwrap().value(), Some(&Value::from("derived")));
    assert_eq!(base.field_names(), vec!["kind", "seq", "meta"]);
    assert_eq!(derived.field_names(), vec!["kind", "seq", "meta", "extra"]);

    // nested schemas are copied, not shared
    let nested = |schema: &Arc<Schema>| match schema.descriptor("meta").unwrap().kind() {
        FieldKind::Nested(nested) => Arc::clone(nested),
        other => panic!("unexpected kind {:?}", other),
    };
    assert!(!Arc::ptr_eq(&nested(&base), &nested(&derived)));
    assert_eq!(nested(&derived).name(), "Base::Meta");
}

#[derive(Debug)]
struct Handle(u8);

impl ValuePrototype for Handle {
    fn create(&self) -> recordkit::Result<Value> {
        Ok(Value::U8(self.0))
    }

    fn try_fork(&self) -> Option<Arc<dyn ValuePrototype>> {
        None
    }
}

#[test]
fn test_uncopyable_default_fails_derivation() {
    let mut builder = Schema::builder("Holder");
    let handle: Arc<dyn ValuePrototype> = Arc::new(Handle(9));
    builder.field("h", Integer::u8(), handle, FieldOptions::new());
    let schema = builder.build().unwrap();
    assert_eq!(schema.instantiate().unwrap().get("h"), Some(&Value::U8(9)));

    match schema.derive("Copy") {
        Err(Error::DescriptorCloneFailure { schema, field }) => {
            assert_eq!(schema, "Copy");
            assert_eq!(field, "h");
        }
        other => panic!("unexpected: {:?}", other.map(|b| b.name().to_string())),
    }
}

#[test]
fn test_registry_tracks_derivations() {
    let mut registry = RegistryBuilder::new();
    let mut message = Schema::builder("Message");
    message.field("kind", Integer::u8(), 0u8, FieldOptions::new());
    registry.define(message).unwrap();

    for name in ["Hello", "Goodbye"] {
        let mut derived = registry.derive("Message", name).unwrap();
        derived.field("body", Text, DefaultValue::None, FieldOptions::new().remaining());
        registry.define(derived).unwrap();
    }
    let registry = registry.freeze();

    assert_eq!(registry.derived_types("Message"), &["Hello".to_string(), "Goodbye".to_string()]);
    assert!(registry.derived_types("Hello").is_empty());
    assert_eq!(registry.get("Hello").unwrap().base(), Some("Message"));
}
