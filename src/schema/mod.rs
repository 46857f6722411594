// Schema module for recordkit
//
// This module provides schema definition and inheritance:
//
// 1. Field descriptors, options and flags
// 2. Ordered, name-indexed descriptor lists
// 3. Schema builders and single-level derivation
// 4. A registry of named schemas behind a one-time barrier

pub use self::builder::{Schema, SchemaBuilder};
pub use self::descriptor::{FieldDescriptor, FieldFlags, FieldKind, FieldOptions, LengthSource};
pub use self::order::{Named, OrderedMap, Slot};
pub use self::registry::{Registry, RegistryBuilder};

pub mod builder;
pub mod descriptor;
pub mod order;
pub mod registry;
