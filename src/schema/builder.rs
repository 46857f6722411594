// Schema definition and inheritance
//
// A SchemaBuilder collects field descriptors in declaration order and is
// frozen into an immutable Schema. `Schema::derive` starts a new builder from
// deep copies of an existing schema's descriptors.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::actions::{ActionArg, ActionDescriptor, ActionType};
use crate::codec::types::Value;
use crate::internal::error::{Error, Result};
use crate::schema::descriptor::{FieldDescriptor, FieldKind, FieldOptions};
use crate::schema::order::{OrderedMap, Slot};
use crate::tree::{Record, Scope};
use crate::values::{Binding, BoundFields, Counter, DefaultValue};

/// Immutable, ordered description of a record layout.
#[derive(Debug)]
pub struct Schema {
    name: String,
    base: Option<String>,
    order: OrderedMap<FieldDescriptor>,
    shadow: OrderedMap<FieldDescriptor>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the schema this one was derived from.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Serialized field descriptors, in order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.order.iter()
    }

    pub fn shadow_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.shadow.iter()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.order.names().collect()
    }

    /// Descriptor by name; serialized fields first, then shadow fields.
    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.order.get(name).or_else(|| self.shadow.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Starts a schema that inherits every descriptor of this one. The
    /// copies are independent: changing them never affects this schema.
    pub fn derive(&self, name: impl Into<String>) -> Result<SchemaBuilder> {
        let name = name.into();
        let order = clone_list(&self.order, &name)?;
        let shadow = clone_list(&self.shadow, &name)?;
        debug!(base = %self.name, derived = %name, fields = order.len(), "derived schema");
        Ok(SchemaBuilder {
            name,
            base: Some(self.name.clone()),
            order,
            shadow,
        })
    }

    /// Independent copy under the same name, used for sections of a
    /// derived schema.
    pub(crate) fn fork(&self) -> Result<Arc<Schema>> {
        Ok(Arc::new(Schema {
            name: self.name.clone(),
            base: self.base.clone(),
            order: clone_list(&self.order, &self.name)?,
            shadow: clone_list(&self.shadow, &self.name)?,
        }))
    }

    /// Builds and initializes a root record.
    pub fn instantiate(self: &Arc<Self>) -> Result<Record> {
        Record::build(self)
    }

    /// Builds a root record and fills it from `input`, consuming what it reads.
    pub fn parse(self: &Arc<Self>, input: &mut Bytes) -> Result<Record> {
        let mut record = Record::build(self)?;
        record.parse(input)?;
        Ok(record)
    }
}

fn clone_list(list: &OrderedMap<FieldDescriptor>, owner: &str) -> Result<OrderedMap<FieldDescriptor>> {
    let mut copy = OrderedMap::new();
    for descriptor in list {
        copy.insert_or_replace(descriptor.deep_clone(owner)?);
    }
    Ok(copy)
}

/// Mutable schema under definition.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    base: Option<String>,
    order: OrderedMap<FieldDescriptor>,
    shadow: OrderedMap<FieldDescriptor>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            order: OrderedMap::new(),
            shadow: OrderedMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Declares a serialized field. Redeclaring a name replaces the earlier
    /// descriptor at its original position.
    pub fn field(
        &mut self,
        name: &str,
        kind: impl Into<FieldKind>,
        default: impl Into<DefaultValue>,
        options: FieldOptions,
    ) -> Slot {
        let descriptor = FieldDescriptor::new(self.name.clone(), name, kind.into(), default.into(), options);
        let slot = self.order.insert_or_replace(descriptor);
        if let Slot::Replaced(position) = slot {
            debug!(schema = %self.name, field = name, position, "redeclared field");
        }
        slot
    }

    /// Declares a field that is instantiated with the record but never
    /// serialized or parsed.
    pub fn shadow_field(
        &mut self,
        name: &str,
        kind: impl Into<FieldKind>,
        default: impl Into<DefaultValue>,
        options: FieldOptions,
    ) -> Slot {
        let descriptor = FieldDescriptor::new(self.name.clone(), name, kind.into(), default.into(), options);
        self.shadow.insert_or_replace(descriptor)
    }

    /// Declares a section. The nested schema is named `<Owner>::<Name>` and
    /// `configure` declares its fields.
    pub fn section<F>(
        &mut self,
        name: &str,
        action: Option<ActionDescriptor>,
        options: FieldOptions,
        configure: F,
    ) -> Result<Slot>
    where
        F: FnOnce(&mut SchemaBuilder) -> Result<()>,
    {
        let mut nested = SchemaBuilder::new(format!("{}::{}", self.name, capitalize(name)));
        configure(&mut nested)?;
        let schema = nested.build()?;
        let options = match action {
            Some(action) => options.action(action),
            None => options,
        };
        Ok(self.field(name, schema, DefaultValue::None, options))
    }

    /// Action prototype for a section; nothing is constructed yet.
    pub fn action(action_type: Arc<dyn ActionType>, args: Vec<ActionArg>) -> ActionDescriptor {
        ActionDescriptor::new(action_type, args)
    }

    /// Default computed from the enclosing record and its ancestors.
    pub fn bind<F>(f: F) -> DefaultValue
    where
        F: Fn(&Scope<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        DefaultValue::Bound(Binding::single(f))
    }

    /// Default computed from named fields; `fields` maps alias to field path.
    pub fn bind_fields<F>(f: F, fields: &[(&str, &str)]) -> DefaultValue
    where
        F: Fn(&BoundFields<'_, '_>) -> Result<Value> + Send + Sync + 'static,
    {
        DefaultValue::Bound(Binding::multi(f, fields))
    }

    pub fn counter(name: impl Into<String>, start: i64, step: i64, replace_on_reuse: bool) -> DefaultValue {
        DefaultValue::Counter(Counter::new(name, start, step, replace_on_reuse))
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.order.get(name).or_else(|| self.shadow.get(name))
    }

    pub fn descriptor_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        match self.order.get_mut(name) {
            Some(descriptor) => Some(descriptor),
            None => self.shadow.get_mut(name),
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.order.names().collect()
    }

    /// Validates every descriptor and freezes the schema.
    pub fn build(self) -> Result<Arc<Schema>> {
        if self.name.is_empty() {
            return Err(Error::SchemaError("Schema name is empty".to_string()));
        }
        for descriptor in self.order.iter().chain(self.shadow.iter()) {
            descriptor.validate()?;
        }
        debug!(
            schema = %self.name,
            fields = self.order.len(),
            shadow = self.shadow.len(),
            "defined schema"
        );
        Ok(Arc::new(Schema {
            name: self.name,
            base: self.base,
            order: self.order,
            shadow: self.shadow,
        }))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Endian;
    use crate::fields::{Integer, RawBytes};

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let mut builder = Schema::builder("Point");
        builder.field("x", Integer::i32(Endian::Big), DefaultValue::None, FieldOptions::new());
        builder.field("y", Integer::i32(Endian::Big), DefaultValue::None, FieldOptions::new());
        let slot = builder.field("x", Integer::i16(Endian::Big), 5i16, FieldOptions::new());
        assert_eq!(slot, Slot::Replaced(0));

        let schema = builder.build().unwrap();
        assert_eq!(schema.field_names(), vec!["x", "y"]);
        assert_eq!(schema.descriptor("x").unwrap().kind().name(), "Int16");
    }

    #[test]
    fn test_section_naming() {
        let mut builder = Schema::builder("Frame");
        builder
            .section("header", None, FieldOptions::new(), |h| {
                h.field("kind", Integer::u8(), DefaultValue::None, FieldOptions::new());
                Ok(())
            })
            .unwrap();
        let schema = builder.build().unwrap();
        match schema.descriptor("header").unwrap().kind() {
            FieldKind::Nested(nested) => assert_eq!(nested.name(), "Frame::Header"),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_derive_is_independent() {
        let mut builder = Schema::builder("Base");
        builder.field("a", Integer::u8(), 1u8, FieldOptions::new());
        let base = builder.build().unwrap();

        let mut derived = base.derive("Derived").unwrap();
        derived.descriptor_mut("a").unwrap().set_default(2u8);
        derived.field("b", RawBytes, DefaultValue::None, FieldOptions::new().remaining());
        let derived = derived.build().unwrap();

        assert_eq!(derived.base(), Some("Base"));
        assert_eq!(derived.field_names(), vec!["a", "b"]);
        assert_eq!(derived.descriptor("a").unwrap().owner(), "Derived");
        assert_eq!(base.field_names(), vec!["a"]);
        assert_eq!(base.descriptor("a").unwrap().default().literal(), Some(&Value::U8(1)));
    }

    #[test]
    fn test_build_rejects_invalid_descriptors() {
        let mut builder = Schema::builder("Bad");
        builder.field("", Integer::u8(), DefaultValue::None, FieldOptions::new());
        assert!(matches!(builder.build(), Err(Error::InvalidDescriptor { .. })));

        let nested = Schema::builder("Inner").build().unwrap();
        let mut builder = Schema::builder("Bad");
        builder.field("items", nested, DefaultValue::None, FieldOptions::new().multi());
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("header"), "Header");
        assert_eq!(capitalize(""), "");
    }
}
