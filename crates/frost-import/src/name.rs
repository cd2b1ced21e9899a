//! Fully-qualified module names.

use std::fmt;

use crate::error::ImportError;

/// A validated dotted module name such as `pkg.sub.mod`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName {
    full: String,
    /// Byte offset of the leaf within `full`
    leaf_start: usize,
}

impl ModuleName {
    /// Parse a dotted name. Empty names and empty segments are rejected.
    pub fn parse(name: &str) -> Result<Self, ImportError> {
        if name.is_empty() || name.split('.').any(|segment| segment.is_empty()) {
            return Err(ImportError::InvalidName(name.to_string()));
        }
        let leaf_start = name.rfind('.').map(|i| i + 1).unwrap_or(0);
        Ok(Self {
            full: name.to_string(),
            leaf_start,
        })
    }

    /// The whole dotted name.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The last component.
    pub fn leaf(&self) -> &str {
        &self.full[self.leaf_start..]
    }

    /// The dotted parent package name, if any.
    pub fn parent(&self) -> Option<&str> {
        if self.leaf_start == 0 {
            None
        } else {
            Some(&self.full[..self.leaf_start - 1])
        }
    }

    /// Components preceding the leaf.
    pub fn parent_segments(&self) -> Vec<&str> {
        self.parent()
            .map(|parent| parent.split('.').collect())
            .unwrap_or_default()
    }

    /// Whether the name has a parent package.
    pub fn is_dotted(&self) -> bool {
        self.leaf_start != 0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_name() {
        let name = ModuleName::parse("types").unwrap();
        assert_eq!(name.leaf(), "types");
        assert_eq!(name.parent(), None);
        assert!(name.parent_segments().is_empty());
        assert!(!name.is_dotted());
    }

    #[test]
    fn test_nested_name() {
        let name = ModuleName::parse("pkg.sub.mod").unwrap();
        assert_eq!(name.leaf(), "mod");
        assert_eq!(name.parent(), Some("pkg.sub"));
        assert_eq!(name.parent_segments(), vec!["pkg", "sub"]);
        assert!(name.is_dotted());
        assert_eq!(name.to_string(), "pkg.sub.mod");
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["", ".", "pkg.", ".mod", "a..b"] {
            assert!(
                matches!(ModuleName::parse(bad), Err(ImportError::InvalidName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
