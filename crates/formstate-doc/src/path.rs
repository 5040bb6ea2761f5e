#![forbid(unsafe_code)]

//! Dotted field paths.
//!
//! UI bindings address document locations with opaque strings such as
//! `contacts.2.email`. A [`Path`] is that string parsed once into a segment
//! list so the hot paths (cascade, reindexing, document access) never split
//! strings repeatedly.
//!
//! # Parsing rules
//!
//! - The empty string is the document root.
//! - A segment made only of ASCII digits, without a leading zero (or exactly
//!   `"0"`), becomes [`Seg::Index`]. Everything else, including empty
//!   segments produced by `"a..b"`, becomes [`Seg::Key`].
//! - Parsing never fails and `Path::parse(s).to_string() == s`.
//!
//! Whether an index segment means "array slot" or "object key with a
//! numeric name" is decided by the container it is applied to, not by the
//! path. See [`crate::access`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single segment in a field path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key.
    Key(String),
    /// Array index (or numeric object key, depending on the container).
    Index(usize),
}

impl Seg {
    /// Parse one dotted-path segment.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match parse_index(raw) {
            Some(i) => Seg::Index(i),
            None => Seg::Key(raw.to_owned()),
        }
    }

    /// The index, if this is an index segment.
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Index(i) => Some(*i),
            Seg::Key(_) => None,
        }
    }

    /// The key an object container would use for this segment.
    #[must_use]
    pub fn object_key(&self) -> String {
        match self {
            Seg::Key(k) => k.clone(),
            Seg::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => f.write_str(k),
            Seg::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    let bytes = raw.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    raw.parse().ok()
}

/// A parsed dotted path. The empty path is the document root.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The root path.
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted path string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::root();
        }
        Self(raw.split('.').map(Seg::parse).collect())
    }

    #[inline]
    #[must_use]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Append a segment (builder style).
    #[must_use]
    pub fn child(mut self, seg: impl Into<Seg>) -> Self {
        self.0.push(seg.into());
        self
    }

    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Path without its last segment; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Strict ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (0..self.0.len()).rev().map(|n| Path(self.0[..n].to_vec()))
    }

    /// True if `self` equals `other` or is one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// If `self` lies strictly below `base` and the segment right after
    /// `base` is an index, return that index.
    ///
    /// `items.3.name` under `items` yields `Some(3)`; `items` itself yields
    /// `None`.
    #[must_use]
    pub fn index_under(&self, base: &Path) -> Option<usize> {
        if !base.is_prefix_of(self) {
            return None;
        }
        self.0.get(base.len()).and_then(Seg::as_index)
    }

    /// Copy of this path with the segment right after `base` replaced by
    /// `index`. The caller guarantees `base` is a strict prefix.
    #[must_use]
    pub fn with_index_under(&self, base: &Path, index: usize) -> Path {
        let mut segments = self.0.clone();
        segments[base.len()] = Seg::Index(index);
        Path(segments)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(raw: &str) -> Self {
        Path::parse(raw)
    }
}

impl From<&String> for Path {
    fn from(raw: &String) -> Self {
        Path::parse(raw)
    }
}

impl From<String> for Path {
    fn from(raw: String) -> Self {
        Path::parse(&raw)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`Path`] from mixed key/index segments.
///
/// ```
/// use formstate_doc::path;
///
/// let p = path!("contacts", 2, "email");
/// assert_eq!(p.to_string(), "contacts.2.email");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}
