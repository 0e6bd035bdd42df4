// Hierarchical object keys
use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Separator between key components
pub const SEPARATOR: char = '/';

/// Validated, immutable address of one stored object
///
/// Keys look like `topic/partition/segment-id/file-type`. Every component is
/// non-empty and never `.` or `..`, so a key always maps to a path strictly
/// below the backend root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap a `/`-separated key
    pub fn new(value: impl Into<String>) -> StorageResult<Self> {
        let value = value.into();
        validate(&value)?;
        Ok(ObjectKey(value))
    }

    /// Build a key from its components
    pub fn from_components<I, S>(components: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = components
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(joined)
    }

    /// Append one component, returning the longer key
    pub fn join(&self, component: &str) -> StorageResult<Self> {
        Self::new(format!("{}{}{}", self.0, SEPARATOR, component))
    }

    /// Components in order
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Last component, the object's own name
    pub fn name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Number of components, always at least one
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// The joined key value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative filesystem path using the platform separator
    pub fn to_relative_path(&self) -> PathBuf {
        self.components().collect()
    }
}

fn validate(value: &str) -> StorageResult<()> {
    let invalid = |reason| StorageError::InvalidKey {
        key: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("key is empty"));
    }

    for component in value.split(SEPARATOR) {
        match component {
            "" => return Err(invalid("empty component")),
            "." | ".." => return Err(invalid("relative component")),
            c if c.contains('\0') => return Err(invalid("NUL byte in component")),
            _ => {}
        }
    }

    Ok(())
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectKey {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = StorageError;

    fn try_from(value: String) -> StorageResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ObjectKey {
    type Error = StorageError;

    fn try_from(value: &str) -> StorageResult<Self> {
        Self::new(value)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ObjectKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectKey::new(s).map_err(serde::de::Error::custom)
    }
}
