// Depth-bounded introspection of field trees.
//
// Depth 0 lists every field, depth 1 is `#<Name>`, depth 2 the bare name and
// anything deeper prints nothing.

use std::fmt;

use crate::codec::types::Value;
use crate::tree::{Field, FieldContent, Record, Section};

impl Record {
    pub fn inspect(&self, depth: usize) -> String {
        match depth {
            0 => {
                let fields: Vec<String> = self.fields.iter().map(|f| f.inspect(0)).collect();
                match &self.raw {
                    Some(raw) => format!("#<{} raw=0x{}>", self.name(), hex::encode(raw)),
                    None => format!("#<{} {}>", self.name(), fields.join(", ")),
                }
            }
            1 => format!("#<{}>", self.name()),
            2 => self.name().to_string(),
            _ => String::new(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect(0))
    }
}

impl Field {
    /// `name=value` at depth 0, the name at depth 1.
    pub fn inspect(&self, depth: usize) -> String {
        match depth {
            0 if !self.present => format!("{}=<absent>", self.name()),
            0 => {
                let shown = match &self.content {
                    FieldContent::Value(value) => value.to_string(),
                    FieldContent::Values(items) => {
                        let items: Vec<String> = items.iter().map(Value::to_string).collect();
                        format!("[{}]", items.join(", "))
                    }
                    FieldContent::Section(section) => section.inspect(1),
                };
                format!("{}={}", self.name(), shown)
            }
            1 => self.name().to_string(),
            _ => String::new(),
        }
    }
}

impl Section {
    /// The nested record at `depth`, followed by its action one level deeper.
    pub fn inspect(&self, depth: usize) -> String {
        let record = self.record.inspect(depth);
        match self.action.as_ref().map(|a| a.inspect(depth + 1)) {
            Some(action) if !action.is_empty() => format!("{} {}", record, action),
            _ => record,
        }
    }
}
