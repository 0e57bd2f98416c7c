use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a [`ValuePath`]: an array position or a struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PathEntry {
    Index(i32),
    Name(String),
}

/// Addresses a value nested inside another value, starting at the outermost container.
pub type ValuePath = Vec<PathEntry>;

impl From<i32> for PathEntry {
    fn from(index: i32) -> Self {
        PathEntry::Index(index)
    }
}

impl From<&str> for PathEntry {
    fn from(name: &str) -> Self {
        PathEntry::Name(name.to_owned())
    }
}

impl From<String> for PathEntry {
    fn from(name: String) -> Self {
        PathEntry::Name(name)
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathEntry::Index(index) => write!(f, "[{index}]"),
            PathEntry::Name(name) => write!(f, ".{name}"),
        }
    }
}

/// Renders a path as `.name[0].first`; the empty path renders as `.`.
pub fn display(path: &[PathEntry]) -> String {
    if path.is_empty() {
        return ".".to_owned();
    }
    path.iter().map(PathEntry::to_string).collect()
}
