// recordkit library entry point
//
// Declarative, hierarchical binary record formats. A Schema describes an
// ordered list of fields once; each message is a Record built from it that
// serializes itself to bytes or parses bytes into its fields.

pub mod actions;
pub mod codec;
pub mod fields;
pub mod internal;
pub mod schema;
pub mod tree;
pub mod values;

pub use crate::actions::{Action, ActionArg, ActionContext, ActionDescriptor, ActionType};
pub use crate::codec::{Endian, Value, ValueType};
pub use crate::fields::{FieldType, ReadLength};
pub use crate::internal::error::{Error, Result};
pub use crate::schema::registry;
pub use crate::schema::{
    FieldDescriptor, FieldFlags, FieldKind, FieldOptions, LengthSource, Registry, RegistryBuilder, Schema,
    SchemaBuilder, Slot,
};
pub use crate::tree::{Field, FieldContent, FieldPath, ParseOptions, Record, Scope, Section};
pub use crate::values::{Binding, BoundFields, Counter, DefaultValue, ValuePrototype};
