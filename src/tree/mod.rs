// Field trees
//
// A Record is one instantiated schema: an ordered list of concrete fields
// (plus the shadow fields), each holding a value, a list of values, or a
// nested section. Records are built by `build`, written by `serialize` and
// filled from bytes by `parse`.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::actions::Action;
use crate::codec::types::Value;
use crate::fields::FieldType;
use crate::internal::error::{Error, Result};
use crate::schema::descriptor::{FieldDescriptor, FieldKind};
use crate::schema::order::{Named, OrderedMap};
use crate::schema::Schema;
use crate::values::Binding;

pub mod build;
pub mod inspect;
pub mod parse;
pub mod path;
pub mod scope;
pub mod serialize;

pub use self::parse::{ParseOptions, MAX_NESTING_DEPTH};
pub use self::path::FieldPath;
pub use self::scope::Scope;

/// One instantiated schema.
#[derive(Debug)]
pub struct Record {
    pub(crate) schema: Arc<Schema>,
    pub(crate) path: FieldPath,
    pub(crate) parent: Option<FieldPath>,
    pub(crate) fields: OrderedMap<Field>,
    pub(crate) shadow: OrderedMap<Field>,
    pub(crate) raw: Option<Bytes>,
    pub(crate) initialized: bool,
}

/// A concrete field of one record.
#[derive(Debug)]
pub struct Field {
    pub(crate) descriptor: FieldDescriptor,
    pub(crate) parent: Option<FieldPath>,
    pub(crate) binding: Option<Binding>,
    pub(crate) present: bool,
    pub(crate) content: FieldContent,
}

#[derive(Debug)]
pub enum FieldContent {
    Value(Value),
    /// Multi-valued field.
    Values(Vec<Value>),
    Section(Box<Section>),
}

/// A nested record together with the action attached to it.
#[derive(Debug)]
pub struct Section {
    pub(crate) record: Record,
    pub(crate) action: Option<Box<dyn Action>>,
}

impl Named for Field {
    fn name(&self) -> &str {
        self.descriptor.name()
    }
}

impl Record {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Name of the schema this record instantiates.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn parent(&self) -> Option<&FieldPath> {
        self.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Serialized fields, in declared order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.names().collect()
    }

    pub fn shadow(&self, name: &str) -> Option<&Field> {
        self.shadow.get(name)
    }

    pub fn shadow_fields(&self) -> impl Iterator<Item = &Field> {
        self.shadow.iter()
    }

    /// Field by dotted path, descending through sections.
    pub fn lookup(&self, path: &str) -> Option<&Field> {
        let mut segments = path.split('.');
        let mut field = self.field(segments.next()?)?;
        for segment in segments {
            field = field.section()?.field(segment)?;
        }
        Some(field)
    }

    fn lookup_mut(&mut self, path: &str) -> Option<&mut Field> {
        let mut segments = path.split('.');
        let mut field = self.fields.get_mut(segments.next()?)?;
        for segment in segments {
            field = field.section_mut()?.fields.get_mut(segment)?;
        }
        Some(field)
    }

    /// Single value of a present field, by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.lookup(path).filter(|f| f.is_present()).and_then(Field::value)
    }

    /// Values of a present multi-valued field, by dotted path.
    pub fn values(&self, path: &str) -> Option<&[Value]> {
        self.lookup(path).filter(|f| f.is_present()).and_then(Field::values)
    }

    pub fn is_present(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(Field::is_present)
    }

    pub fn section(&self, path: &str) -> Option<&Record> {
        self.lookup(path).and_then(Field::section)
    }

    pub fn section_mut(&mut self, path: &str) -> Option<&mut Record> {
        self.lookup_mut(path).and_then(Field::section_mut)
    }

    /// Action attached to the section at `path`.
    pub fn action(&self, path: &str) -> Option<&dyn Action> {
        self.lookup(path).and_then(Field::action)
    }

    /// Assigns a literal value. A bound field stops tracking its binding
    /// until the record is reset.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = self
            .lookup_mut(path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.check_value(&value)?;
        match &mut field.content {
            FieldContent::Value(slot) => *slot = value,
            FieldContent::Values(items) => {
                items.clear();
                items.push(value);
            }
            // sections fail the value check
            FieldContent::Section(_) => {}
        }
        field.binding = None;
        field.present = true;
        Ok(())
    }

    /// Appends a value to a multi-valued field.
    pub fn push(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = self
            .lookup_mut(path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.check_value(&value)?;
        match &mut field.content {
            FieldContent::Values(items) => items.push(value),
            _ => {
                return Err(Error::SchemaError(format!(
                    "Field '{}' is not multi-valued",
                    path
                )))
            }
        }
        field.present = true;
        Ok(())
    }

    /// Marks a field absent; it is then skipped by serialization.
    pub fn clear(&mut self, path: &str) -> Result<()> {
        let field = self
            .lookup_mut(path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        field.present = false;
        Ok(())
    }

    /// Literal bytes emitted in place of this record's fields.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    pub fn set_raw(&mut self, raw: impl Into<Bytes>) {
        self.raw = Some(raw.into());
    }

    pub fn clear_raw(&mut self) {
        self.raw = None;
    }
}

impl Field {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Path of the record holding this field.
    pub fn parent(&self) -> Option<&FieldPath> {
        self.parent.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Whether the value is still computed from its binding.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn content(&self) -> &FieldContent {
        &self.content
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            FieldContent::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&[Value]> {
        match &self.content {
            FieldContent::Values(items) => Some(items),
            _ => None,
        }
    }

    pub fn section(&self) -> Option<&Record> {
        match &self.content {
            FieldContent::Section(s) => Some(&s.record),
            _ => None,
        }
    }

    pub fn section_mut(&mut self) -> Option<&mut Record> {
        match &mut self.content {
            FieldContent::Section(s) => Some(&mut s.record),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&dyn Action> {
        match &self.content {
            FieldContent::Section(s) => s.action.as_deref(),
            _ => None,
        }
    }

    /// Full path of this field, used in error messages.
    pub fn path(&self) -> String {
        match &self.parent {
            Some(parent) if !parent.is_root() => format!("{}.{}", parent, self.name()),
            _ => self.name().to_string(),
        }
    }

    pub(crate) fn primitive(&self) -> Result<&Arc<dyn FieldType>> {
        match self.descriptor.kind() {
            FieldKind::Primitive(ty) => Ok(ty),
            FieldKind::Nested(schema) => Err(Error::SchemaError(format!(
                "Field '{}' is a section of schema '{}'",
                self.path(),
                schema.name()
            ))),
        }
    }

    /// Rejects values the field type cannot encode.
    fn check_value(&self, value: &Value) -> Result<()> {
        self.primitive()?.encode(value, &mut BytesMut::new())
    }
}

impl Section {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn action(&self) -> Option<&dyn Action> {
        self.action.as_deref()
    }

    /// Moves the section under `parent`. The nested record, every field below
    /// it and the attached action follow.
    pub(crate) fn set_parent(&mut self, parent: FieldPath, name: &str) {
        let path = parent.child(name);
        if let Some(action) = self.action.as_mut() {
            action.set_parent(Some(parent.clone()));
        }
        self.record.reparent(Some(parent), path);
    }
}
