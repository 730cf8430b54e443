//! Core types for taskweave

use std::fmt;

use serde::{Deserialize, Serialize};

/// One element of a run request or of an alias body.
///
/// A reference is either the name of a registered task or a nested, ordered
/// group of further references. In configuration files and JSON a string is a
/// name and an array is a group, so `["lint", ["test", "build"]]` is a group
/// holding a name and a nested group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskRef {
    /// A task name
    Name(String),
    /// An ordered group of references
    Group(Vec<TaskRef>),
}

impl TaskRef {
    /// Create a name reference
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create a group reference from anything convertible into references
    pub fn group<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskRef>,
    {
        Self::Group(items.into_iter().map(Into::into).collect())
    }

    /// The task name, if this is a name reference
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Group(_) => None,
        }
    }

    /// The group members, if this is a group reference
    pub fn as_group(&self) -> Option<&[TaskRef]> {
        match self {
            Self::Name(_) => None,
            Self::Group(items) => Some(items),
        }
    }

    /// An empty name or an empty group
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Name(name) => name.is_empty(),
            Self::Group(items) => items.is_empty(),
        }
    }

    /// Every task name mentioned by this reference, depth-first, in order
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Name(name) => out.push(name),
            Self::Group(items) => {
                for item in items {
                    item.collect_names(out);
                }
            }
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Group(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for TaskRef {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl<T: Into<TaskRef>> From<Vec<T>> for TaskRef {
    fn from(items: Vec<T>) -> Self {
        Self::group(items)
    }
}

impl<T: Into<TaskRef>, const N: usize> From<[T; N]> for TaskRef {
    fn from(items: [T; N]) -> Self {
        Self::group(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested() {
        let reference = TaskRef::group([
            TaskRef::name("series1"),
            TaskRef::group(["parallel1", "parallel2"]),
            TaskRef::name("series2"),
        ]);
        assert_eq!(
            reference.to_string(),
            "[series1, [parallel1, parallel2], series2]"
        );
    }

    #[test]
    fn test_deserialize_untagged() {
        let reference: TaskRef = serde_json::from_str(r#"["a", ["b", "c"]]"#).unwrap();
        assert_eq!(
            reference,
            TaskRef::group([TaskRef::name("a"), TaskRef::group(["b", "c"])])
        );

        let single: TaskRef = serde_json::from_str(r#""build""#).unwrap();
        assert_eq!(single, TaskRef::name("build"));
    }

    #[test]
    fn test_serialize_roundtrips_shape() {
        let reference = TaskRef::group([TaskRef::name("a"), TaskRef::group(["b"])]);
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, r#"["a",["b"]]"#);
    }

    #[test]
    fn test_is_empty() {
        assert!(TaskRef::name("").is_empty());
        assert!(TaskRef::Group(Vec::new()).is_empty());
        assert!(!TaskRef::name("x").is_empty());
        assert!(!TaskRef::group([TaskRef::Group(Vec::new())]).is_empty());
    }

    #[test]
    fn test_names_depth_first() {
        let reference = TaskRef::group([
            TaskRef::name("a"),
            TaskRef::group([TaskRef::group(["b", "c"]), TaskRef::name("d")]),
        ]);
        assert_eq!(reference.names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_accessors() {
        let name = TaskRef::from("lint");
        assert_eq!(name.as_name(), Some("lint"));
        assert!(name.as_group().is_none());

        let group = TaskRef::from(vec!["a", "b"]);
        assert!(group.as_name().is_none());
        assert_eq!(group.as_group().map(|g| g.len()), Some(2));
    }
}
