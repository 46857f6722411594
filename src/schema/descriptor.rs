// Field descriptors
//
// A descriptor is the declarative prototype of one field: its name, its kind
// (a primitive field type or a nested schema), its default value prototype
// and its options. Field instances are built from descriptors; derived
// schemas receive deep copies of them.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use bytes::Bytes;

use crate::actions::ActionDescriptor;
use crate::codec::types::Value;
use crate::fields::{FieldType, ReadLength};
use crate::internal::error::{Error, Result};
use crate::schema::order::Named;
use crate::schema::Schema;
use crate::tree::Scope;
use crate::values::DefaultValue;

/// What a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Primitive(Arc<dyn FieldType>),
    /// A section: one instance of the nested schema.
    Nested(Arc<Schema>),
}

impl FieldKind {
    pub fn name(&self) -> &str {
        match self {
            FieldKind::Primitive(ty) => ty.name(),
            FieldKind::Nested(schema) => schema.name(),
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, FieldKind::Nested(_))
    }
}

impl From<Arc<Schema>> for FieldKind {
    fn from(schema: Arc<Schema>) -> Self {
        FieldKind::Nested(schema)
    }
}

impl From<Arc<dyn FieldType>> for FieldKind {
    fn from(ty: Arc<dyn FieldType>) -> Self {
        FieldKind::Primitive(ty)
    }
}

macro_rules! impl_primitive_kind {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldKind {
                fn from(ty: $ty) -> Self {
                    FieldKind::Primitive(Arc::new(ty))
                }
            }
        )*
    };
}

impl_primitive_kind!(
    crate::fields::Integer,
    crate::fields::Flag,
    crate::fields::RawBytes,
    crate::fields::Text,
    crate::fields::VarUInt,
);

bitflags! {
    /// Field flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u8 {
        /// Field holds a list of values, parsed until its span is used up.
        const MULTI = 0b01;
        /// Field may be missing from the input.
        const OPTIONAL = 0b10;
    }
}

/// Where a field's byte length comes from when parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthSource {
    Fixed(usize),
    /// Value of an earlier field in scope (name or dotted path).
    Field(String),
    /// Everything left in the input.
    Remaining,
}

/// Options of a field declaration.
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub flags: FieldFlags,
    pub length: Option<LengthSource>,
    /// Action attached to a section.
    pub action: Option<ActionDescriptor>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multi(mut self) -> Self {
        self.flags |= FieldFlags::MULTI;
        self
    }

    pub fn optional(mut self) -> Self {
        self.flags |= FieldFlags::OPTIONAL;
        self
    }

    pub fn length(mut self, length: LengthSource) -> Self {
        self.length = Some(length);
        self
    }

    pub fn fixed(self, len: usize) -> Self {
        self.length(LengthSource::Fixed(len))
    }

    pub fn length_field(self, name: impl Into<String>) -> Self {
        self.length(LengthSource::Field(name.into()))
    }

    pub fn remaining(self) -> Self {
        self.length(LengthSource::Remaining)
    }

    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.action = Some(action);
        self
    }

    pub fn is_multi(&self) -> bool {
        self.flags.contains(FieldFlags::MULTI)
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(FieldFlags::OPTIONAL)
    }

    fn deep_clone(&self) -> Option<Self> {
        let action = match &self.action {
            Some(action) => Some(action.deep_clone()?),
            None => None,
        };
        Some(Self {
            flags: self.flags,
            length: self.length.clone(),
            action,
        })
    }
}

/// Declarative prototype of one field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    default: DefaultValue,
    options: FieldOptions,
    owner: String,
}

impl Named for FieldDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl FieldDescriptor {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        kind: FieldKind,
        default: DefaultValue,
        options: FieldOptions,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            options,
            owner: owner.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default(&self) -> &DefaultValue {
        &self.default
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    /// Name of the schema the descriptor belongs to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn set_default(&mut self, default: impl Into<DefaultValue>) {
        self.default = default.into();
    }

    pub fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    /// Independent copy owned by `owner`. Counters are forked, nested schemas
    /// are copied, and a custom prototype that cannot be copied is an error.
    pub fn deep_clone(&self, owner: &str) -> Result<Self> {
        let failure = || Error::DescriptorCloneFailure {
            schema: owner.to_string(),
            field: self.name.clone(),
        };
        let default = self.default.deep_clone().ok_or_else(failure)?;
        let options = self.options.deep_clone().ok_or_else(failure)?;
        let kind = match &self.kind {
            FieldKind::Primitive(ty) => FieldKind::Primitive(Arc::clone(ty)),
            FieldKind::Nested(schema) => FieldKind::Nested(schema.fork()?),
        };
        Ok(Self {
            name: self.name.clone(),
            kind,
            default,
            options,
            owner: owner.to_string(),
        })
    }

    /// Value a field of type `ty` starts from before its default applies.
    /// Empty bytes and text are zero-filled to a fixed length.
    pub fn zero_value(&self, ty: &dyn FieldType) -> Value {
        let n = match self.options.length {
            Some(LengthSource::Fixed(n)) if !self.options.is_multi() => n,
            _ => return ty.zero_value(),
        };
        match ty.zero_value() {
            Value::Bytes(b) if b.is_empty() => Value::Bytes(Bytes::from(vec![0u8; n])),
            Value::String(s) if s.is_empty() => Value::String("\0".repeat(n)),
            zero => zero,
        }
    }

    /// Bytes the field (or, for multi-valued fields, its whole span) takes
    /// from `remaining`.
    pub fn required_byte_count(&self, scope: &Scope<'_>, remaining: &[u8]) -> Result<ReadLength> {
        match &self.options.length {
            Some(LengthSource::Fixed(n)) => Ok(ReadLength::Exact(*n)),
            Some(LengthSource::Remaining) => Ok(ReadLength::Exact(remaining.len())),
            Some(LengthSource::Field(name)) => {
                let value = scope.value(name)?;
                let len = value.as_u64().ok_or_else(|| {
                    Error::BindingError(format!(
                        "Length field '{}' of '{}' holds {} instead of an unsigned integer",
                        name, self.name, value
                    ))
                })?;
                let len = usize::try_from(len).map_err(|_| Error::ValueOutOfRange {
                    type_name: "usize".to_string(),
                    value: len.to_string(),
                })?;
                Ok(ReadLength::Exact(len))
            }
            None => match &self.kind {
                FieldKind::Primitive(_) if self.options.is_multi() => Ok(ReadLength::Exact(remaining.len())),
                FieldKind::Primitive(ty) => Ok(ty.required_byte_count(remaining)),
                FieldKind::Nested(_) => Ok(ReadLength::Indeterminate),
            },
        }
    }

    /// Checks that a field can be instantiated from this descriptor.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::InvalidDescriptor {
                schema: self.owner.clone(),
                field: self.name.clone(),
                reason: reason.to_string(),
            })
        };
        if self.name.is_empty() {
            return invalid("field name is empty");
        }
        if self.name.contains('.') {
            return invalid("field name contains '.'");
        }
        if let Some(LengthSource::Fixed(0)) = self.options.length {
            return invalid("fixed length is zero");
        }
        match &self.kind {
            FieldKind::Nested(_) => {
                if self.options.is_multi() {
                    return invalid("sections cannot be multi-valued");
                }
                if !self.default.is_none() {
                    return invalid("sections cannot have a default value");
                }
            }
            FieldKind::Primitive(ty) => {
                if self.options.action.is_some() {
                    return invalid("actions attach to sections only");
                }
                if let Some(value) = self.default.literal() {
                    if let Err(e) = ty.encode(value, &mut bytes::BytesMut::new()) {
                        return invalid(&format!("default does not encode as {}: {}", ty.name(), e));
                    }
                }
                if let Some(LengthSource::Fixed(n)) = self.options.length {
                    // bound and counter defaults are checked when written
                    let seeded = match (&self.default, self.options.is_multi()) {
                        (DefaultValue::Literal(value), _) => value.clone(),
                        (DefaultValue::None, false) => self.zero_value(ty.as_ref()),
                        (DefaultValue::None, true) => {
                            return invalid("fixed-length multi-valued field needs a literal default")
                        }
                        _ => return Ok(()),
                    };
                    match ty.encoded_len(&seeded) {
                        Ok(len) if len == n => {}
                        Ok(len) => {
                            return invalid(&format!("default encodes to {} bytes instead of the fixed {}", len, n))
                        }
                        Err(e) => return invalid(&format!("default does not encode as {}: {}", ty.name(), e)),
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind.name())?;
        if self.options.is_multi() {
            write!(f, "[]")?;
        }
        if self.options.is_optional() {
            write!(f, "?")?;
        }
        Ok(())
    }
}
