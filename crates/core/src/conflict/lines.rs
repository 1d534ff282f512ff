//! Line sequences used as the unit of comparison by the merge engine.

use std::ops::{Deref, Range};

/// An immutable, ordered sequence of lines borrowed from file content.
///
/// Content is split on `'\n'` only, so a trailing newline yields a trailing
/// empty line and `join("\n")` reproduces the original text exactly. An
/// absent file is represented by [`LineSequence::empty`], which has zero
/// lines; an empty file has one empty line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSequence<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineSequence<'a> {
    /// Split `content` into lines.
    pub fn from_content(content: &'a str) -> Self {
        Self {
            lines: content.split('\n').collect(),
        }
    }

    /// Lines of an optional file; absent content has no lines.
    pub fn from_optional(content: Option<&'a str>) -> Self {
        content.map(Self::from_content).unwrap_or_default()
    }

    /// The zero-line sequence.
    pub fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Borrow a sub-range of lines.
    pub fn slice(&self, range: Range<usize>) -> &[&'a str] {
        &self.lines[range]
    }

    /// Copy a sub-range of lines into owned strings.
    pub fn to_owned_lines(&self, range: Range<usize>) -> Vec<String> {
        owned(self.slice(range))
    }
}

impl<'a> Deref for LineSequence<'a> {
    type Target = [&'a str];

    fn deref(&self) -> &Self::Target {
        &self.lines
    }
}

impl<'a> From<Vec<&'a str>> for LineSequence<'a> {
    fn from(lines: Vec<&'a str>) -> Self {
        Self { lines }
    }
}

/// Convert borrowed lines to owned ones.
pub(crate) fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| (*l).to_string()).collect()
}
