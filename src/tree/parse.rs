// Parser
//
// Fields are parsed in declared order from one shared input cursor. Each
// field asks its descriptor how many bytes it needs, splits exactly that many
// off the cursor and decodes them. A field can only see the siblings parsed
// before it and the enclosing records.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::fields::ReadLength;
use crate::internal::error::{Error, Result};
use crate::schema::descriptor::FieldKind;
use crate::tree::{Field, FieldContent, Record, Scope};

/// Maximum nesting depth of sections while parsing.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest section level accepted before parsing fails.
    pub max_depth: usize,
    /// Whether a section with an explicit length must consume all of it.
    pub strict_sections: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            strict_sections: true,
        }
    }
}

impl Record {
    /// Fills the record from `input`, consuming the bytes it reads. Whatever
    /// the record does not need is left in `input`.
    pub fn parse(&mut self, input: &mut Bytes) -> Result<()> {
        self.parse_with(input, &ParseOptions::default())
    }

    pub fn parse_with(&mut self, input: &mut Bytes, options: &ParseOptions) -> Result<()> {
        let available = input.len();
        self.parse_in(input, None, options, 0)?;
        debug!(schema = %self.name(), consumed = available - input.len(), "parsed record");
        Ok(())
    }

    pub(crate) fn parse_in(
        &mut self,
        input: &mut Bytes,
        parent: Option<&Scope<'_>>,
        options: &ParseOptions,
        depth: usize,
    ) -> Result<()> {
        if depth > options.max_depth {
            return Err(Error::NestingTooDeep(options.max_depth));
        }
        self.raw = None;
        let entries = self.fields.as_mut_slice();
        for i in 0..entries.len() {
            let (before, tail) = entries.split_at_mut(i);
            if let Some(field) = tail.first_mut() {
                let scope = Scope::new(before, parent);
                field.parse(input, &scope, options, depth)?;
            }
        }
        Ok(())
    }
}

/// Splits `n` bytes off the cursor.
fn take(input: &mut Bytes, n: usize, field: &str) -> Result<Bytes> {
    if n > input.len() {
        return Err(Error::ParseUnderflow {
            field: field.to_string(),
            needed: n,
            available: input.len(),
        });
    }
    Ok(input.split_to(n))
}

impl Field {
    fn parse(&mut self, input: &mut Bytes, scope: &Scope<'_>, options: &ParseOptions, depth: usize) -> Result<()> {
        let optional = self.descriptor.options().is_optional();
        if optional && input.is_empty() {
            debug!(field = %self.path(), "optional field absent at end of input");
            self.present = false;
            return Ok(());
        }
        let checkpoint = input.clone();
        match self.parse_content(input, scope, options, depth) {
            Ok(()) => {
                self.present = true;
                // parsed values are literal until the record is reset
                self.binding = None;
                Ok(())
            }
            Err(e) if optional && !e.is_fatal() => {
                debug!(field = %self.path(), error = %e, "optional field absent");
                *input = checkpoint;
                self.present = false;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn span(&self, input: &mut Bytes, scope: &Scope<'_>, path: &str) -> Result<Bytes> {
        match self.descriptor.required_byte_count(scope, input.as_ref())? {
            ReadLength::Exact(n) => take(input, n, path),
            ReadLength::Indeterminate => Err(Error::ParseLengthIndeterminate {
                field: path.to_string(),
            }),
        }
    }

    fn parse_content(&mut self, input: &mut Bytes, scope: &Scope<'_>, options: &ParseOptions, depth: usize) -> Result<()> {
        let path = self.path();
        let has_length = self.descriptor.options().length.is_some();
        let ty = match self.descriptor.kind() {
            FieldKind::Primitive(ty) => Some(ty.clone()),
            FieldKind::Nested(_) => None,
        };
        let mut span = if has_length || ty.is_some() {
            Some(self.span(input, scope, &path)?)
        } else {
            None
        };

        match (&mut self.content, ty) {
            (FieldContent::Section(section), _) => match span.as_mut() {
                None => section.record.parse_in(input, Some(scope), options, depth + 1),
                Some(slice) => {
                    section.record.parse_in(slice, Some(scope), options, depth + 1)?;
                    if options.strict_sections && !slice.is_empty() {
                        return Err(Error::CodecError(format!(
                            "Section '{}' left {} of its bytes unparsed",
                            path,
                            slice.len()
                        )));
                    }
                    Ok(())
                }
            },
            (FieldContent::Value(slot), Some(ty)) => {
                let raw = span.unwrap_or_default();
                *slot = ty.decode(raw)?;
                trace!(field = %path, value = %slot, "parsed field");
                Ok(())
            }
            (FieldContent::Values(items), Some(ty)) => {
                let mut span = span.unwrap_or_default();
                items.clear();
                while !span.is_empty() {
                    let n = match ty.required_byte_count(&span) {
                        ReadLength::Exact(0) => {
                            return Err(Error::CodecError(format!("Field '{}' has a zero-length item", path)))
                        }
                        ReadLength::Exact(n) => n,
                        ReadLength::Indeterminate => {
                            return Err(Error::ParseLengthIndeterminate { field: path })
                        }
                    };
                    let raw = take(&mut span, n, &path)?;
                    items.push(ty.decode(raw)?);
                }
                trace!(field = %path, count = items.len(), "parsed field");
                Ok(())
            }
            (_, None) => Err(Error::SchemaError(format!("Field '{}' has no field type", path))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::types::Value;
    use crate::codec::Endian;
    use crate::fields::{Integer, RawBytes, Text, VarUInt};
    use crate::schema::{FieldOptions, Schema};
    use crate::values::DefaultValue;

    #[test]
    fn test_take_underflow() {
        let mut input = Bytes::from_static(&[1, 2]);
        match take(&mut input, 3, "body") {
            Err(Error::ParseUnderflow { field, needed, available }) => {
                assert_eq!(field, "body");
                assert_eq!(needed, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn test_indeterminate_required_field() {
        let mut builder = Schema::builder("Blob");
        builder.field("data", RawBytes, DefaultValue::None, FieldOptions::new());
        let schema = builder.build().unwrap();
        let mut input = Bytes::from_static(&[1, 2, 3]);
        assert!(matches!(
            schema.parse(&mut input),
            Err(Error::ParseLengthIndeterminate { .. })
        ));
    }

    #[test]
    fn test_multi_valued_until_exhausted() {
        let mut builder = Schema::builder("List");
        builder.field("count", Integer::u8(), DefaultValue::None, FieldOptions::new());
        builder.field("ids", VarUInt, DefaultValue::None, FieldOptions::new().multi());
        let schema = builder.build().unwrap();

        let mut input = Bytes::from_static(&[2, 0x01, 0xac, 0x02, 0x7f]);
        let record = schema.parse(&mut input).unwrap();
        assert_eq!(
            record.values("ids").unwrap(),
            &[Value::U64(1), Value::U64(300), Value::U64(127)]
        );
        assert!(input.is_empty());
    }

    #[test]
    fn test_optional_decode_failure_restores_cursor() {
        let mut builder = Schema::builder("Greeting");
        builder.field("tag", Integer::u8(), DefaultValue::None, FieldOptions::new());
        builder.field("name", Text, DefaultValue::None, FieldOptions::new().fixed(2).optional());
        let schema = builder.build().unwrap();

        let mut input = Bytes::from_static(&[7, 0xff, 0xfe]);
        let record = schema.parse(&mut input).unwrap();
        assert!(!record.is_present("name"));
        assert_eq!(input.as_ref(), &[0xff, 0xfe]);
    }

    #[test]
    fn test_optional_indeterminate_length_restores_cursor() {
        let mut builder = Schema::builder("Counted");
        builder.field("tag", Integer::u8(), DefaultValue::None, FieldOptions::new());
        builder.field("seq", VarUInt, DefaultValue::None, FieldOptions::new().optional());
        let schema = builder.build().unwrap();

        // a varint with no terminating byte
        let mut input = Bytes::from_static(&[7, 0x80]);
        let record = schema.parse(&mut input).unwrap();
        assert_eq!(record.get("tag"), Some(&Value::U8(7)));
        assert!(!record.is_present("seq"));
        assert_eq!(input.as_ref(), &[0x80]);
        assert_eq!(record.serialize().unwrap().as_ref(), &[7]);
    }

    #[test]
    fn test_nesting_depth_limit() {
        let mut builder = Schema::builder("Outer");
        builder
            .section("inner", None, FieldOptions::new(), |inner| {
                inner.field("v", Integer::u16(Endian::Big), DefaultValue::None, FieldOptions::new());
                Ok(())
            })
            .unwrap();
        let schema = builder.build().unwrap();
        let mut record = schema.instantiate().unwrap();

        let shallow = ParseOptions {
            max_depth: 0,
            ..ParseOptions::default()
        };
        let mut input = Bytes::from_static(&[0, 1]);
        assert!(matches!(
            record.parse_with(&mut input, &shallow),
            Err(Error::NestingTooDeep(0))
        ));

        let mut input = Bytes::from_static(&[0, 1]);
        record.parse(&mut input).unwrap();
        assert_eq!(record.get("inner.v"), Some(&Value::U16(1)));
    }
}
