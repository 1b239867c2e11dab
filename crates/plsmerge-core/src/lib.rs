use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

pub const PLS_NAMESPACE: &str = "http://www.w3.org/2005/01/pronunciation-lexicon";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Bound to the `xml` prefix by definition, never declared.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Version of the JSON listing emitted by `scan`.
pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// Errors raised by the library crates. They travel inside `eyre::Report`
/// and can be recovered with `downcast_ref::<PlsError>()`.
#[derive(Debug, Error)]
pub enum PlsError {
    #[error("cannot list lexicon directory {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize lexicon: {0}")]
    Serialize(String),
}

impl PlsError {
    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        PlsError::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        PlsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Namespace-resolved element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualName {
    /// `None` when the name is not in any namespace.
    pub namespace: Option<String>,
    pub local: String,
}

impl QualName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }

    pub fn pls(local: &str) -> Self {
        Self::new(Some(PLS_NAMESPACE), local)
    }

    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// A namespace declaration as written in the source (`xmlns` / `xmlns:p`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// Empty for the default namespace.
    pub prefix: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QualName,
    pub attributes: Vec<Attribute>,
    /// Declarations written on this element. Not part of the element's
    /// identity for comparisons between documents, see [`Element::same_content`].
    pub namespaces: Vec<NsDecl>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: QualName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Structural equality ignoring where namespace declarations were written.
    pub fn same_content(&self, other: &Element) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|pair| match pair {
                    (Node::Element(a), Node::Element(b)) => a.same_content(b),
                    (Node::Text(a), Node::Text(b)) => a == b,
                    _ => false,
                })
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// One parsed `.pls` file.
#[derive(Debug, Clone)]
pub struct LexiconDocument {
    pub path: PathBuf,
    pub root: Element,
}

/// Result of merging one or more lexicon documents: the first document's
/// root element (without children) followed by every entry of every file.
#[derive(Debug, Clone)]
pub struct MergedLexicon {
    pub root: Element,
    pub entries: Vec<Element>,
    pub sources: Vec<PathBuf>,
}

impl MergedLexicon {
    /// Rebuild a plain element tree with the entries as root children.
    pub fn to_element(&self) -> Element {
        let mut root = self.root.clone();
        root.children = self.entries.iter().cloned().map(Node::Element).collect();
        root
    }
}

/// Flat lexeme record used by listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexemeUnit {
    pub graphemes: Vec<String>,
    pub phoneme: Option<String>,
    pub alias: Option<String>,
    /// File the lexeme was read from
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(local: &str, text: &str) -> Element {
        let mut e = Element::new(QualName::pls(local));
        e.children.push(Node::Text(text.into()));
        e
    }

    #[test]
    fn same_content_ignores_namespace_declarations() {
        let mut a = leaf("grapheme", "cat");
        let b = a.clone();
        a.namespaces.push(NsDecl {
            prefix: String::new(),
            uri: PLS_NAMESPACE.into(),
        });
        assert!(a.same_content(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn text_concatenates_descendants() {
        let mut lexeme = Element::new(QualName::pls("lexeme"));
        lexeme.children.push(Node::Element(leaf("grapheme", "cat")));
        lexeme.children.push(Node::Element(leaf("phoneme", "k ae t")));
        assert_eq!(lexeme.text(), "catk ae t");
        assert_eq!(lexeme.child_elements().count(), 2);
    }
}
