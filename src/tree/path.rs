use std::fmt;

/// Structural position of a record in its field tree: the field names from
/// the root down. The root record sits at the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        FieldPath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let root = FieldPath::root();
        let header = root.child("header");
        let flags = header.child("flags");
        assert!(root.is_root());
        assert_eq!(root.to_string(), "<root>");
        assert_eq!(flags.to_string(), "header.flags");
        assert_eq!(flags.depth(), 2);
        assert_eq!(header.segments(), &["header".to_string()]);
    }
}
