//! File-order manifests.
//!
//! A manifest lists member names one per line, indented four spaces per
//! nesting level. The members of a nested container follow its name,
//! enclosed in `{` and `}` lines:
//!
//! ```text
//! char_a.pac
//! {
//!     char_a_00.hip
//!     char_a_01.hip
//! }
//! effects.hpl
//! ```

use std::fmt::Write as _;
use std::path::Path;

use crate::Result;

/// Name given to the implicit top-level node of a parsed manifest.
pub const ROOT_NAME: &str = ":root:";

/// A member name and the order of its own members.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileOrder {
    pub name: String,
    pub children: Vec<FileOrder>,
}

impl FileOrder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(name: impl Into<String>, children: Vec<FileOrder>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Parse manifest text. Blank lines and stray closing braces are ignored.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines().map(str::trim);
        Self::with_children(ROOT_NAME, parse_level(&mut lines, false))
    }

    /// Read a manifest file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Render the members of this node as manifest text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_level(&mut out, 0);
        }
        out
    }

    /// Write the manifest to a file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    fn write_level(&self, out: &mut String, depth: usize) {
        let indent = depth * 4;
        let _ = writeln!(out, "{:indent$}{}", "", self.name);
        if !self.children.is_empty() {
            let _ = writeln!(out, "{:indent$}{{", "");
            for child in &self.children {
                child.write_level(out, depth + 1);
            }
            let _ = writeln!(out, "{:indent$}}}", "");
        }
    }

    /// Position of a member in this node's child list.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }

    /// Child manifest for a member.
    pub fn child(&self, name: &str) -> Option<&FileOrder> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Stable-sort items by their position in this manifest.
    ///
    /// Items the manifest does not mention keep their relative order and
    /// come first.
    pub fn sort<T>(&self, items: &mut [T], name: impl Fn(&T) -> &str) {
        items.sort_by_key(|item| self.position(name(item)));
    }
}

fn parse_level<'a>(lines: &mut impl Iterator<Item = &'a str>, nested: bool) -> Vec<FileOrder> {
    let mut level: Vec<FileOrder> = Vec::new();
    while let Some(line) = lines.next() {
        match line {
            "" => {}
            "{" => {
                let children = parse_level(lines, true);
                match level.last_mut() {
                    Some(parent) => parent.children = children,
                    None => tracing::warn!("file order opens a block with no parent entry"),
                }
            }
            "}" if nested => break,
            "}" => {}
            name => level.push(FileOrder::new(name)),
        }
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
char_a.pac
{
    char_a_00.hip
    inner.pac
    {
        deep.hpl
    }
}
effects.hpl
";

    #[test]
    fn test_parse_nested() {
        let order = FileOrder::parse(MANIFEST);
        assert_eq!(order.name, ROOT_NAME);
        assert_eq!(order.children.len(), 2);

        let pac = order.child("char_a.pac").unwrap();
        assert_eq!(pac.children.len(), 2);
        assert_eq!(pac.children[1].children[0].name, "deep.hpl");
        assert!(order.child("effects.hpl").unwrap().children.is_empty());
    }

    #[test]
    fn test_text_roundtrip() {
        let order = FileOrder::parse(MANIFEST);
        assert_eq!(order.to_text(), MANIFEST);
        assert_eq!(FileOrder::parse(&order.to_text()), order);
    }

    #[test]
    fn test_sort_missing_first() {
        let order = FileOrder::parse("b\nc\na\n");
        let mut names = vec!["a", "x", "b", "c", "y"];
        order.sort(&mut names, |n| *n);
        assert_eq!(names, ["x", "y", "b", "c", "a"]);
    }

    #[test]
    fn test_tolerant_parse() {
        let order = FileOrder::parse("}\n{\n  a  \n}\n\nb\r\n");
        let names: Vec<_> = order.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn test_file_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.txt");
        let order = FileOrder::parse(MANIFEST);
        order.write(&path).unwrap();
        assert_eq!(FileOrder::read(&path).unwrap(), order);
    }
}
