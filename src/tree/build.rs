// Instance tree construction
//
// Building is two-phase. `construct` instantiates every descriptor, creates
// defaults and nested sections, and sets every parent path. Only then does
// the parent-less root run a single top-down initialization pass, resolving
// bound values and initializing actions. Nested records never start a pass
// of their own.

use std::mem;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::internal::error::{Error, Result};
use crate::schema::descriptor::{FieldDescriptor, FieldKind};
use crate::schema::order::OrderedMap;
use crate::schema::Schema;
use crate::tree::{Field, FieldContent, FieldPath, Record, Scope, Section};

impl Record {
    /// Builds and initializes a root record of `schema`.
    pub fn build(schema: &Arc<Schema>) -> Result<Record> {
        let mut record = Self::construct(schema, None, FieldPath::root())?;
        record.initialize()?;
        Ok(record)
    }

    /// Builds a detached record as if it were the section `name` of the
    /// record at `parent`. It stays uninitialized until grafted.
    pub fn build_nested(schema: &Arc<Schema>, parent: FieldPath, name: &str) -> Result<Record> {
        let path = parent.child(name);
        Self::construct(schema, Some(parent), path)
    }

    pub(crate) fn construct(schema: &Arc<Schema>, parent: Option<FieldPath>, path: FieldPath) -> Result<Record> {
        let fields = instantiate_list(schema.fields(), &path)?;
        let shadow = instantiate_list(schema.shadow_fields(), &path)?;
        trace!(schema = %schema.name(), path = %path, "constructed record");
        Ok(Record {
            schema: Arc::clone(schema),
            path,
            parent,
            fields,
            shadow,
            raw: None,
            initialized: false,
        })
    }

    /// Runs the initialization pass. Only a root record may start it, and it
    /// runs at most once.
    pub fn initialize(&mut self) -> Result<()> {
        if !self.is_root() {
            return Err(Error::SchemaError(format!(
                "Record '{}' at {} has a parent and cannot start initialization",
                self.name(),
                self.path
            )));
        }
        if self.initialized {
            return Ok(());
        }
        self.initialize_in(None, true)?;
        debug!(schema = %self.name(), "initialized record tree");
        Ok(())
    }

    /// Resolves bindings top-down; with `run_actions` section actions are
    /// initialized too.
    pub(crate) fn initialize_in(&mut self, parent: Option<&Scope<'_>>, run_actions: bool) -> Result<()> {
        initialize_list(&mut self.fields, parent, run_actions)?;
        let main = Scope::new(self.fields.as_slice(), parent);
        initialize_list(&mut self.shadow, Some(&main), run_actions)?;
        self.initialized = true;
        Ok(())
    }

    /// Restores the freshly built state: defaults and bindings come back,
    /// every field is present again and raw overrides are dropped. Counters
    /// that replace on reuse draw a new number. Actions are not run again.
    pub fn reset(&mut self) -> Result<()> {
        self.reseed()?;
        if self.is_root() && self.initialized {
            self.initialize_in(None, false)?;
        }
        debug!(schema = %self.name(), "reset record");
        Ok(())
    }

    fn reseed(&mut self) -> Result<()> {
        self.raw = None;
        for field in self.fields.as_mut_slice().iter_mut().chain(self.shadow.as_mut_slice()) {
            field.reseed()?;
        }
        Ok(())
    }

    /// Moves this record (and everything below it) to `path` under `parent`.
    pub(crate) fn reparent(&mut self, parent: Option<FieldPath>, path: FieldPath) {
        for field in self.fields.as_mut_slice().iter_mut().chain(self.shadow.as_mut_slice()) {
            field.parent = Some(path.clone());
            let Field { descriptor, content, .. } = field;
            if let FieldContent::Section(section) = content {
                section.set_parent(path.clone(), descriptor.name());
            }
        }
        self.parent = parent;
        self.path = path;
    }

    /// Replaces the nested record of the section at `path` with `record`,
    /// which must be a detached record of the section's schema. The new
    /// subtree is re-parented and, when this tree is already initialized,
    /// initialized once in place. Returns the record it replaced.
    pub fn graft(&mut self, path: &str, record: Record) -> Result<Record> {
        if !self.is_root() {
            return Err(Error::SchemaError(format!(
                "Graft into '{}' must start at the root record",
                path
            )));
        }
        if record.initialized {
            return Err(Error::SchemaError(format!(
                "Cannot graft initialized record '{}' into '{}'",
                record.name(),
                path
            )));
        }
        let segments: Vec<&str> = path.split('.').collect();
        let run = self.initialized;
        let old = self.graft_at(&segments, None, record, run, path)?;
        debug!(section = path, "grafted record");
        Ok(old)
    }

    fn graft_at(
        &mut self,
        segments: &[&str],
        parent: Option<&Scope<'_>>,
        mut record: Record,
        run: bool,
        full_path: &str,
    ) -> Result<Record> {
        let unknown = || Error::UnknownField(full_path.to_string());
        let (head, rest) = segments.split_first().ok_or_else(unknown)?;
        let position = self.fields.position(head).ok_or_else(unknown)?;
        let holder = self.path.clone();
        let (before, tail) = self.fields.as_mut_slice().split_at_mut(position);
        let (field, after) = tail.split_first_mut().ok_or_else(unknown)?;
        let scope = Scope::split(before, after, parent);
        let section = match &mut field.content {
            FieldContent::Section(section) => section,
            _ => {
                return Err(Error::SchemaError(format!(
                    "Field '{}' is not a section",
                    field.descriptor.name()
                )))
            }
        };
        if !rest.is_empty() {
            return section.record.graft_at(rest, Some(&scope), record, run, full_path);
        }
        if record.schema.name() != section.record.schema.name() {
            return Err(Error::SchemaError(format!(
                "Section '{}' holds '{}', not '{}'",
                full_path,
                section.record.schema.name(),
                record.schema.name()
            )));
        }
        let child = holder.child(head);
        record.reparent(Some(holder), child);
        if run {
            record.initialize_in(Some(&scope), true)?;
        }
        Ok(mem::replace(&mut section.record, record))
    }
}

fn instantiate_list<'d>(
    descriptors: impl Iterator<Item = &'d FieldDescriptor>,
    parent: &FieldPath,
) -> Result<OrderedMap<Field>> {
    let mut fields = OrderedMap::new();
    for descriptor in descriptors {
        fields.insert_or_replace(Field::instantiate(descriptor, parent)?);
    }
    Ok(fields)
}

/// Initializes each field with a scope holding its siblings and the
/// enclosing levels.
fn initialize_list(fields: &mut OrderedMap<Field>, parent: Option<&Scope<'_>>, run_actions: bool) -> Result<()> {
    let entries = fields.as_mut_slice();
    for i in 0..entries.len() {
        let (before, tail) = entries.split_at_mut(i);
        if let Some((field, after)) = tail.split_first_mut() {
            let scope = Scope::split(before, after, parent);
            field.initialize(&scope, run_actions)?;
        }
    }
    Ok(())
}

impl Field {
    /// Instantiates a field of the record at `parent`.
    pub(crate) fn instantiate(descriptor: &FieldDescriptor, parent: &FieldPath) -> Result<Field> {
        let descriptor = descriptor.clone();
        let content = match descriptor.kind() {
            FieldKind::Nested(schema) => {
                let record = Record::construct(schema, Some(parent.clone()), parent.child(descriptor.name()))?;
                let action = match &descriptor.options().action {
                    Some(action) => {
                        let mut action = action.instantiate()?;
                        action.set_parent(Some(parent.clone()));
                        Some(action)
                    }
                    None => None,
                };
                FieldContent::Section(Box::new(Section { record, action }))
            }
            FieldKind::Primitive(ty) => {
                if descriptor.options().is_multi() {
                    let items = match descriptor.default() {
                        d if d.is_none() || d.binding().is_some() => Vec::new(),
                        d => vec![d.seed(descriptor.zero_value(ty.as_ref()))?],
                    };
                    FieldContent::Values(items)
                } else {
                    FieldContent::Value(descriptor.default().seed(descriptor.zero_value(ty.as_ref()))?)
                }
            }
        };
        trace!(field = descriptor.name(), parent = %parent, "instantiated field");
        Ok(Field {
            binding: descriptor.default().binding().cloned(),
            descriptor,
            parent: Some(parent.clone()),
            present: true,
            content,
        })
    }

    fn initialize(&mut self, scope: &Scope<'_>, run_actions: bool) -> Result<()> {
        if let Some(binding) = &self.binding {
            let value = binding.resolve(scope)?;
            trace!(field = self.descriptor.name(), %value, "resolved binding");
            match &mut self.content {
                FieldContent::Value(slot) => *slot = value,
                FieldContent::Values(items) => *items = vec![value],
                FieldContent::Section(_) => {}
            }
        }
        if let FieldContent::Section(section) = &mut self.content {
            if run_actions {
                if let Some(action) = section.action.as_mut() {
                    action.initialize(scope)?;
                }
            }
            section.record.initialize_in(Some(scope), run_actions)?;
        }
        Ok(())
    }

    /// Back to the state right after instantiation.
    fn reseed(&mut self) -> Result<()> {
        let default = self.descriptor.default();
        self.binding = default.binding().cloned();
        self.present = true;
        // counters that are not replaced on reuse keep the number they drew
        let keep = default.counter().is_some_and(|c| !c.replace_on_reuse());
        match &mut self.content {
            FieldContent::Section(section) => section.record.reseed()?,
            FieldContent::Value(slot) => {
                if !keep {
                    *slot = match self.descriptor.kind() {
                        FieldKind::Primitive(ty) => default.seed(self.descriptor.zero_value(ty.as_ref()))?,
                        FieldKind::Nested(_) => return Ok(()),
                    };
                }
            }
            FieldContent::Values(items) => {
                if !keep {
                    items.clear();
                    if let FieldKind::Primitive(ty) = self.descriptor.kind() {
                        if !default.is_none() && default.binding().is_none() {
                            items.push(default.seed(self.descriptor.zero_value(ty.as_ref()))?);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
