//! Common types used throughout Lockerbox.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Separator between remote path segments.
pub const PATH_SEPARATOR: char = '/';

/// Identifier of a conversation, as assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(String);

impl ChatId {
    /// Create a new ChatId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "ChatId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A path inside the signed-in user's remote file tree.
///
/// The empty segment sequence denotes the root. Segments never contain the
/// separator and are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RemotePath {
    components: Vec<String>,
}

impl RemotePath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Create a path from string components.
    ///
    /// # Errors
    /// - Returns error if any component is empty or contains a separator
    pub fn from_components(components: Vec<String>) -> crate::Result<Self> {
        for comp in &components {
            validate_component(comp)?;
        }
        Ok(Self { components })
    }

    /// Parse a path string into a RemotePath.
    ///
    /// Leading and trailing separators are ignored, so `"a/b"`, `"/a/b"` and
    /// `"/a/b/"` all parse to the same path.
    pub fn parse(path: &str) -> crate::Result<Self> {
        let path = path.trim_matches(PATH_SEPARATOR);
        if path.is_empty() {
            return Ok(Self::root());
        }

        let components: Vec<String> = path.split(PATH_SEPARATOR).map(String::from).collect();
        Self::from_components(components)
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            let mut components = self.components.clone();
            components.pop();
            Some(Self { components })
        }
    }

    /// Get the file/directory name (last component).
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Join this path with a child component.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        validate_component(child)?;
        let mut components = self.components.clone();
        components.push(child.to_string());
        Ok(Self { components })
    }

    /// Keep only the first `len` segments.
    ///
    /// A `len` at or beyond the current depth leaves the path unchanged.
    pub fn truncated(&self, len: usize) -> Self {
        let mut components = self.components.clone();
        components.truncate(len);
        Self { components }
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Convert to an absolute string representation (`/` for the root).
    pub fn to_string_path(&self) -> String {
        if self.is_root() {
            PATH_SEPARATOR.to_string()
        } else {
            format!("/{}", self.components.join("/"))
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}

fn validate_component(comp: &str) -> crate::Result<()> {
    if comp.is_empty() {
        return Err(crate::Error::InvalidInput(
            "Path component cannot be empty".to_string(),
        ));
    }
    if comp.contains(PATH_SEPARATOR) || comp.contains('\\') {
        return Err(crate::Error::InvalidInput(format!(
            "Path component '{}' cannot contain separators",
            comp
        )));
    }
    Ok(())
}

/// Make a user-typed destination absolute.
///
/// Prefixes exactly one separator when the input lacks one; input that is
/// already absolute is returned as is.
pub fn absolute_path(input: &str) -> String {
    if input.starts_with(PATH_SEPARATOR) {
        input.to_string()
    } else {
        format!("{}{}", PATH_SEPARATOR, input)
    }
}

/// Password or other secret text that zeroizes on drop.
#[derive(Clone, Default, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveString(String);

impl SensitiveString {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the secret text.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SensitiveString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq for SensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chat_id_creation() {
        let id = ChatId::new("5f0c").unwrap();
        assert_eq!(id.as_str(), "5f0c");
    }

    #[test]
    fn test_chat_id_empty_fails() {
        assert!(ChatId::new("").is_err());
    }

    #[test]
    fn test_remote_path_root() {
        let path = RemotePath::root();
        assert!(path.is_root());
        assert_eq!(path.to_string_path(), "/");
        assert_eq!(RemotePath::parse("").unwrap(), path);
        assert_eq!(RemotePath::parse("/").unwrap(), path);
    }

    #[test]
    fn test_remote_path_parse() {
        let path = RemotePath::parse("docs/2020/taxes/").unwrap();
        assert_eq!(path.components(), &["docs", "2020", "taxes"]);
        assert_eq!(path.to_string_path(), "/docs/2020/taxes");
    }

    #[test]
    fn test_remote_path_rejects_empty_segment() {
        assert!(RemotePath::parse("/docs//taxes").is_err());
    }

    #[test]
    fn test_remote_path_join_rejects_separator() {
        assert!(RemotePath::root().join("a/b").is_err());
        assert!(RemotePath::root().join("").is_err());
    }

    #[test]
    fn test_remote_path_truncated() {
        let path = RemotePath::parse("/a/b/c").unwrap();
        assert_eq!(path.truncated(1).to_string_path(), "/a");
        assert!(path.truncated(0).is_root());
        assert_eq!(path.truncated(9), path);
    }

    #[test]
    fn test_remote_path_parent_and_name() {
        let path = RemotePath::parse("/a/b").unwrap();
        assert_eq!(path.name(), Some("b"));
        assert_eq!(path.parent().unwrap().to_string_path(), "/a");
        assert!(RemotePath::root().parent().is_none());
    }

    #[test]
    fn test_sensitive_string_redacted() {
        let secret = SensitiveString::new("Hunter2!");
        assert_eq!(format!("{:?}", secret), "SensitiveString([REDACTED])");
        assert_eq!(secret.expose(), "Hunter2!");
    }

    proptest! {
        #[test]
        fn absolute_path_has_exactly_one_leading_separator(input in "[a-z/]{0,12}") {
            let out = absolute_path(&input);
            prop_assert!(out.starts_with('/'));
            if input.starts_with('/') {
                prop_assert_eq!(out, input);
            } else {
                prop_assert_eq!(&out[1..], input.as_str());
            }
        }

        #[test]
        fn parse_round_trips_display(segments in proptest::collection::vec("[a-zA-Z0-9._-]{1,8}", 0..5)) {
            let path = RemotePath::from_components(segments).unwrap();
            let reparsed = RemotePath::parse(&path.to_string_path()).unwrap();
            prop_assert_eq!(reparsed, path);
        }
    }
}
