// Serializer
//
// A record serializes to its raw override when one is set, otherwise to the
// concatenation of its present fields in declared order. Shadow fields are
// never written. Bound fields are resolved again against the current tree.

use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::types::Value;
use crate::internal::error::{Error, Result};
use crate::schema::descriptor::LengthSource;
use crate::tree::{Field, FieldContent, Record, Scope};

impl Record {
    pub fn serialize(&self) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(self.encoded_len()?);
        self.write_in(&mut out, None)?;
        Ok(out.freeze())
    }

    /// Number of bytes `serialize` produces.
    pub fn encoded_len(&self) -> Result<usize> {
        self.len_in(None)
    }

    pub(crate) fn write_in(&self, out: &mut BytesMut, parent: Option<&Scope<'_>>) -> Result<()> {
        if let Some(raw) = &self.raw {
            out.put_slice(raw);
            return Ok(());
        }
        let fields = self.fields.as_slice();
        for (i, field) in fields.iter().enumerate().filter(|(_, f)| f.present) {
            field.write_to(out, &Scope::around(fields, i, parent))?;
        }
        Ok(())
    }

    pub(crate) fn len_in(&self, parent: Option<&Scope<'_>>) -> Result<usize> {
        if let Some(raw) = &self.raw {
            return Ok(raw.len());
        }
        let fields = self.fields.as_slice();
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| field.encoded_len_in(&Scope::around(fields, i, parent)))
            .sum()
    }
}

impl Field {
    /// The value to write: the binding's current result, or the stored value.
    fn effective<'f>(&'f self, value: &'f Value, scope: &Scope<'_>) -> Result<Cow<'f, Value>> {
        match &self.binding {
            Some(binding) => binding.resolve(scope).map(Cow::Owned),
            None => Ok(Cow::Borrowed(value)),
        }
    }

    /// Appends this field's encoding. `scope` holds the field's siblings and
    /// the enclosing levels.
    pub(crate) fn write_to(&self, out: &mut BytesMut, scope: &Scope<'_>) -> Result<()> {
        let start = out.len();
        match &self.content {
            FieldContent::Value(value) => {
                let value = self.effective(value, scope)?;
                self.primitive()?.encode(&value, out)?;
            }
            FieldContent::Values(items) => {
                let ty = self.primitive()?;
                for item in items {
                    ty.encode(item, out)?;
                }
            }
            FieldContent::Section(section) => section.record.write_in(out, Some(scope))?,
        }
        self.check_fixed(out.len() - start)
    }

    /// Encoded length of this field; zero when absent.
    pub(crate) fn encoded_len_in(&self, scope: &Scope<'_>) -> Result<usize> {
        if !self.present {
            return Ok(0);
        }
        let len = match &self.content {
            FieldContent::Value(value) => {
                let value = self.effective(value, scope)?;
                self.primitive()?.encoded_len(&value)?
            }
            FieldContent::Values(items) => {
                let ty = self.primitive()?;
                items.iter().map(|item| ty.encoded_len(item)).sum::<Result<usize>>()?
            }
            FieldContent::Section(section) => section.record.len_in(Some(scope))?,
        };
        self.check_fixed(len)?;
        Ok(len)
    }

    fn check_fixed(&self, written: usize) -> Result<()> {
        match &self.descriptor.options().length {
            Some(LengthSource::Fixed(n)) if *n != written => Err(Error::CodecError(format!(
                "Field '{}' has a fixed length of {} bytes but encodes to {}",
                self.path(),
                n,
                written
            ))),
            _ => Ok(()),
        }
    }
}
