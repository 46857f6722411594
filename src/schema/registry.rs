// Schema registry
//
// Schemas are defined into a RegistryBuilder, which records every derivation.
// Freezing it produces a read-only Registry. One registry can be published
// process-wide; readers never observe it half-defined.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::internal::error::{Error, Result};
use crate::schema::{Schema, SchemaBuilder};

static GLOBAL: OnceCell<Registry> = OnceCell::new();

/// Registry under definition.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: HashMap<String, Arc<Schema>>,
    order: Vec<String>,
    derived: HashMap<String, Vec<String>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and registers a schema. A derived schema's base must already
    /// be registered; the derivation is recorded.
    pub fn define(&mut self, builder: SchemaBuilder) -> Result<Arc<Schema>> {
        if self.schemas.contains_key(builder.name()) {
            return Err(Error::RegistryError(format!(
                "Schema '{}' is already defined",
                builder.name()
            )));
        }
        if let Some(base) = builder.base() {
            if !self.schemas.contains_key(base) {
                return Err(Error::RegistryError(format!(
                    "Base schema '{}' of '{}' is not defined",
                    base,
                    builder.name()
                )));
            }
        }
        let schema = builder.build()?;
        if let Some(base) = schema.base() {
            self.derived
                .entry(base.to_string())
                .or_default()
                .push(schema.name().to_string());
        }
        debug!(schema = %schema.name(), base = ?schema.base(), "registered schema");
        self.order.push(schema.name().to_string());
        self.schemas.insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Starts a builder inheriting from the registered schema `base`.
    pub fn derive(&self, base: &str, name: impl Into<String>) -> Result<SchemaBuilder> {
        self.get(base)
            .ok_or_else(|| Error::RegistryError(format!("Unknown schema '{}'", base)))?
            .derive(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    pub fn freeze(self) -> Registry {
        Registry {
            schemas: self.schemas,
            order: self.order,
            derived: self.derived,
        }
    }
}

/// Frozen set of named schemas.
#[derive(Debug)]
pub struct Registry {
    schemas: HashMap<String, Arc<Schema>>,
    order: Vec<String>,
    derived: HashMap<String, Vec<String>>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Schema names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Schemas derived directly from `name`, in definition order.
    pub fn derived_types(&self, name: &str) -> &[String] {
        self.derived.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every schema derived from `name`, directly or transitively.
    pub fn descendants(&self, name: &str) -> Vec<&str> {
        let mut found = Vec::new();
        let mut pending = vec![name];
        while let Some(current) = pending.pop() {
            for child in self.derived_types(current) {
                found.push(child.as_str());
                pending.push(child.as_str());
            }
        }
        found
    }
}

/// Publishes `registry` process-wide. Fails if one is already installed.
pub fn install(registry: Registry) -> Result<&'static Registry> {
    GLOBAL
        .set(registry)
        .map_err(|_| Error::RegistryError("A global registry is already installed".to_string()))?;
    global()
}

/// The installed registry.
pub fn global() -> Result<&'static Registry> {
    GLOBAL
        .get()
        .ok_or_else(|| Error::RegistryError("No global registry installed".to_string()))
}

/// The installed registry, defining it with `define` on first use. Callers
/// racing on first use block until the winner has finished.
pub fn global_or_init<F>(define: F) -> Result<&'static Registry>
where
    F: FnOnce(&mut RegistryBuilder) -> Result<()>,
{
    GLOBAL.get_or_try_init(|| {
        let mut builder = RegistryBuilder::new();
        define(&mut builder)?;
        Ok(builder.freeze())
    })
}
