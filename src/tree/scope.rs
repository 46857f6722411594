use bytes::{Bytes, BytesMut};

use crate::codec::types::Value;
use crate::internal::error::{Error, Result};
use crate::tree::Field;

/// Read-only view of the fields visible from one position in a field tree:
/// the sibling fields of the current record, then each enclosing record's
/// fields up to the root.
///
/// The view never holds the field it is built for: while a field is being
/// initialized or serialized its scope is every sibling except itself, and
/// during parsing it holds only the siblings already parsed.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    segments: Vec<&'a [Field]>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(fields: &'a [Field], parent: Option<&'a Scope<'a>>) -> Self {
        Self {
            segments: vec![fields],
            parent,
        }
    }

    pub(crate) fn split(before: &'a [Field], after: &'a [Field], parent: Option<&'a Scope<'a>>) -> Self {
        Self {
            segments: vec![before, after],
            parent,
        }
    }

    /// Scope of `fields[index]`: its siblings on both sides.
    pub(crate) fn around(fields: &'a [Field], index: usize, parent: Option<&'a Scope<'a>>) -> Self {
        Self::split(&fields[..index], &fields[index + 1..], parent)
    }

    /// This level without `field`.
    fn excluding(&self, field: &Field) -> Scope<'a> {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        for &segment in &self.segments {
            match segment.iter().position(|f| std::ptr::eq(f, field)) {
                Some(i) => {
                    segments.push(&segment[..i]);
                    segments.push(&segment[i + 1..]);
                }
                None => segments.push(segment),
            }
        }
        Scope {
            segments,
            parent: self.parent,
        }
    }

    pub fn parent(&self) -> Option<&'a Scope<'a>> {
        self.parent
    }

    /// Fields of this level, in order.
    pub fn local_fields(&self) -> impl Iterator<Item = &'a Field> + '_ {
        self.segments.iter().copied().flat_map(<[Field]>::iter)
    }

    fn local(&self, name: &str) -> Option<&'a Field> {
        self.local_fields().find(|field| field.name() == name)
    }

    /// Finds the first path segment here or in an enclosing level and
    /// returns the field with the scope it lives in.
    fn locate<'s>(&'s self, name: &str) -> Option<(&'a Field, &'s Scope<'a>)> {
        let mut scope: &'s Scope<'a> = self;
        loop {
            if let Some(field) = scope.local(name) {
                return Some((field, scope));
            }
            scope = scope.parent?;
        }
    }

    /// Field by name or dotted path (`header.len`). The first segment is
    /// looked up from the innermost level outwards, later segments descend
    /// into sections.
    pub fn field(&self, path: &str) -> Option<&'a Field> {
        let mut segments = path.split('.');
        let (mut field, _) = self.locate(segments.next()?)?;
        for segment in segments {
            field = field.section()?.field(segment)?;
        }
        Some(field)
    }

    /// Single value of a present field.
    pub fn value(&self, path: &str) -> Result<&'a Value> {
        let field = self
            .field(path)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        if !field.is_present() {
            return Err(Error::BindingError(format!("Field '{}' is absent", path)));
        }
        field
            .value()
            .ok_or_else(|| Error::BindingError(format!("Field '{}' does not hold a single value", path)))
    }

    /// Encoded length of a field, computed in that field's own scope.
    pub fn encoded_len(&self, path: &str) -> Result<usize> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let (field, scope) = self
            .locate(first)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        let rest: Vec<&str> = segments.collect();
        Self::nested_len(field, &scope.excluding(field), &rest, path)
    }

    /// Descends `rest` from `field`, whose own scope is `scope`.
    fn nested_len(field: &Field, scope: &Scope<'_>, rest: &[&str], path: &str) -> Result<usize> {
        match rest.split_first() {
            None => field.encoded_len_in(scope),
            Some((head, tail)) => {
                let (fields, index) = Self::child(field, head, path)?;
                let inner = Scope::around(fields, index, Some(scope));
                Self::nested_len(&fields[index], &inner, tail, path)
            }
        }
    }

    fn child<'f>(field: &'f Field, name: &str, path: &str) -> Result<(&'f [Field], usize)> {
        let fields = field
            .section()
            .ok_or_else(|| Error::UnknownField(path.to_string()))?
            .fields
            .as_slice();
        let index = fields
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        Ok((fields, index))
    }

    /// Serialized bytes of a field, computed in that field's own scope.
    pub fn serialize(&self, path: &str) -> Result<Bytes> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let (field, scope) = self
            .locate(first)
            .ok_or_else(|| Error::UnknownField(path.to_string()))?;
        let rest: Vec<&str> = segments.collect();
        let mut out = BytesMut::new();
        Self::nested_write(field, &scope.excluding(field), &rest, path, &mut out)?;
        Ok(out.freeze())
    }

    fn nested_write(field: &Field, scope: &Scope<'_>, rest: &[&str], path: &str, out: &mut BytesMut) -> Result<()> {
        match rest.split_first() {
            None => {
                if field.is_present() {
                    field.write_to(out, scope)?;
                }
                Ok(())
            }
            Some((head, tail)) => {
                let (fields, index) = Self::child(field, head, path)?;
                let inner = Scope::around(fields, index, Some(scope));
                Self::nested_write(&fields[index], &inner, tail, path, out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::types::Value;
    use crate::fields::{Integer, RawBytes};
    use crate::internal::error::Error;
    use crate::schema::{FieldOptions, Schema, SchemaBuilder};

    #[test]
    fn test_lookup_walks_outwards_and_down() {
        let mut builder = Schema::builder("Outer");
        builder.field("base", Integer::u8(), 4u8, FieldOptions::new());
        builder
            .section("inner", None, FieldOptions::new(), |inner| {
                inner.field(
                    "sum",
                    Integer::u8(),
                    SchemaBuilder::bind(|scope| {
                        let base = scope.value("base")?.as_u64().unwrap_or(0);
                        let next = scope.value("tail.v")?.as_u64().unwrap_or(0);
                        Ok(Value::U64(base + next))
                    }),
                    FieldOptions::new(),
                );
                Ok(())
            })
            .unwrap();
        builder
            .section("tail", None, FieldOptions::new(), |tail| {
                tail.field("v", Integer::u8(), 3u8, FieldOptions::new());
                tail.field("blob", RawBytes, vec![1u8, 2, 3], FieldOptions::new().remaining());
                Ok(())
            })
            .unwrap();
        builder.field(
            "blob_len",
            Integer::u8(),
            SchemaBuilder::bind(|scope| Ok(Value::U64(scope.encoded_len("tail.blob")? as u64))),
            FieldOptions::new(),
        );
        let schema = builder.build().unwrap();
        let record = schema.instantiate().unwrap();

        assert_eq!(record.get("inner.sum"), Some(&Value::U64(7)));
        assert_eq!(record.get("blob_len"), Some(&Value::U64(3)));
    }

    #[test]
    fn test_unknown_binding_target() {
        let mut builder = Schema::builder("Lonely");
        builder.field(
            "x",
            Integer::u8(),
            SchemaBuilder::bind(|scope| scope.value("nowhere").cloned()),
            FieldOptions::new(),
        );
        let schema = builder.build().unwrap();
        assert!(matches!(schema.instantiate(), Err(Error::UnknownField(_))));
    }
}
