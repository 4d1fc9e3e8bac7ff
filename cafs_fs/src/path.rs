//! Canonical namespace paths.
//!
//! A canonical path is absolute, uses `/` as separator, has no empty, `.`
//! or `..` segments and no trailing slash. The root is `/`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path {0:?} is not absolute")]
    NotAbsolute(String),
    #[error("path {0:?} contains a `.` or `..` segment")]
    DotSegment(String),
    #[error("path contains a NUL byte")]
    NulByte,
    #[error("name {0:?} is not a single path segment")]
    InvalidName(String),
}

/// An absolute, canonical path in the namespace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NsPath(String);

impl NsPath {
    pub fn root() -> Self {
        NsPath("/".to_owned())
    }

    /// Canonicalizes `input`.
    ///
    /// Repeated slashes collapse and a trailing slash is dropped, so
    /// `//a///b/` becomes `/a/b`. Relative input and dot segments are
    /// rejected rather than resolved.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }
        if input.contains('\0') {
            return Err(PathError::NulByte);
        }
        if !input.starts_with('/') {
            return Err(PathError::NotAbsolute(input.to_owned()));
        }

        let mut canonical = String::with_capacity(input.len());
        for segment in input.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(PathError::DotSegment(input.to_owned()));
            }
            canonical.push('/');
            canonical.push_str(segment);
        }
        if canonical.is_empty() {
            return Ok(Self::root());
        }
        Ok(NsPath(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The containing directory. The root is its own parent.
    pub fn parent(&self) -> NsPath {
        match self.0.rfind('/') {
            Some(0) | None => Self::root(),
            Some(idx) => NsPath(self.0[..idx].to_owned()),
        }
    }

    /// Last segment; empty for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    /// Appends a single segment.
    pub fn join(&self, name: &str) -> Result<NsPath, PathError> {
        if name.is_empty() || name.contains('/') {
            return Err(PathError::InvalidName(name.to_owned()));
        }
        if name == "." || name == ".." {
            return Err(PathError::DotSegment(name.to_owned()));
        }
        if name.contains('\0') {
            return Err(PathError::NulByte);
        }
        if self.is_root() {
            Ok(NsPath(format!("/{name}")))
        } else {
            Ok(NsPath(format!("{}/{name}", self.0)))
        }
    }

    /// Number of segments; zero for the root.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }
}

impl fmt::Debug for NsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NsPath({:?})", self.0)
    }
}

impl fmt::Display for NsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NsPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NsPath::parse(s)
    }
}

impl AsRef<str> for NsPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NsPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NsPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NsPath::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> NsPath {
        NsPath::parse(s).unwrap()
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(p("/").as_str(), "/");
        assert_eq!(p("///").as_str(), "/");
        assert_eq!(p("/a/b").as_str(), "/a/b");
        assert_eq!(p("/a/b/").as_str(), "/a/b");
        assert_eq!(p("//a///b//").as_str(), "/a/b");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(NsPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            NsPath::parse("a/b"),
            Err(PathError::NotAbsolute(_))
        ));
        assert!(matches!(
            NsPath::parse("/a/../b"),
            Err(PathError::DotSegment(_))
        ));
        assert!(matches!(NsPath::parse("/a/./b"), Err(PathError::DotSegment(_))));
        assert_eq!(NsPath::parse("/a\0b"), Err(PathError::NulByte));
    }

    #[test]
    fn dots_inside_names_are_fine() {
        assert_eq!(p("/a/.hidden/b..c").as_str(), "/a/.hidden/b..c");
    }

    #[test]
    fn parent_and_name() {
        assert_eq!(p("/").parent(), NsPath::root());
        assert_eq!(p("/").name(), "");
        assert_eq!(p("/projects").parent(), NsPath::root());
        assert_eq!(p("/projects").name(), "projects");
        assert_eq!(p("/projects/hello.txt").parent(), p("/projects"));
        assert_eq!(p("/projects/hello.txt").name(), "hello.txt");
    }

    #[test]
    fn join_single_segment() {
        assert_eq!(NsPath::root().join("a").unwrap(), p("/a"));
        assert_eq!(p("/a").join("b").unwrap(), p("/a/b"));
        assert!(p("/a").join("b/c").is_err());
        assert!(p("/a").join("").is_err());
        assert!(p("/a").join("..").is_err());
    }

    #[test]
    fn depth_counts_segments() {
        assert_eq!(NsPath::root().depth(), 0);
        assert_eq!(p("/a").depth(), 1);
        assert_eq!(p("/a/b/c").depth(), 3);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut paths = vec![p("/b"), p("/a/z"), p("/a")];
        paths.sort();
        assert_eq!(paths, vec![p("/a"), p("/a/z"), p("/b")]);
    }
}
