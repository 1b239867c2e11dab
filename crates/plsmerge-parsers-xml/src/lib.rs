use plsmerge_core::{
    Attribute, Element, LexiconDocument, Node, NsDecl, PlsError, QualName, Result, PLS_NAMESPACE,
    XML_NAMESPACE,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const LEXICON_EXTENSION: &str = "pls";

/// List `.pls` files directly inside `dir`, sorted by file name.
pub fn discover_lexicons(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PlsError::Discovery {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        }
        .into());
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PlsError::Discovery {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LEXICON_EXTENSION))
        {
            out.push(path.to_path_buf());
        }
    }

    tracing::debug!(event = "lexicons_discovered", dir = %dir.display(), count = out.len());
    Ok(out)
}

/// Read and parse one lexicon file.
pub fn read_lexicon(path: &Path) -> Result<LexiconDocument> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            PlsError::parse(path, "file is not valid UTF-8")
        } else {
            PlsError::io(path, e)
        }
    })?;
    parse_lexicon(&text, path)
}

/// Parse lexicon text; `path` is only used for error reporting.
pub fn parse_lexicon(xml: &str, path: &Path) -> Result<LexiconDocument> {
    let root = parse_tree(xml).map_err(|msg| PlsError::parse(path, msg))?;
    let ns_ok = matches!(root.name.namespace.as_deref(), None | Some(PLS_NAMESPACE));
    if root.name.local != "lexicon" || !ns_ok {
        return Err(PlsError::parse(
            path,
            format!(
                "expected <lexicon> root element, found <{}> in namespace {:?}",
                root.name.local, root.name.namespace
            ),
        )
        .into());
    }
    Ok(LexiconDocument {
        path: path.to_path_buf(),
        root,
    })
}

/// Build an element tree. Comments, processing instructions and the doctype
/// are dropped, and so is whitespace-only text between sibling elements. A
/// leaf element keeps its text even when it is only whitespace.
pub fn parse_tree(xml: &str) -> std::result::Result<Element, String> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let line_starts = line_starts_of(xml);
    let at = |pos: usize, msg: String| format!("line {}: {msg}", byte_pos_to_line(pos, &line_starts));

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| at(reader.buffer_position() as usize, e.to_string()))?;
        let pos = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => {
                let el = open_element(&reader, &e).map_err(|m| at(pos, m))?;
                if stack.is_empty() && root.is_some() {
                    return Err(at(pos, "more than one root element".into()));
                }
                stack.push(el);
            }
            Event::Empty(e) => {
                let el = open_element(&reader, &e).map_err(|m| at(pos, m))?;
                attach(&mut stack, &mut root, el).map_err(|m| at(pos, m))?;
            }
            Event::End(_) => {
                let mut el = stack
                    .pop()
                    .ok_or_else(|| at(pos, "closing tag without opening tag".into()))?;
                drop_layout_whitespace(&mut el);
                attach(&mut stack, &mut root, el).map_err(|m| at(pos, m))?;
            }
            Event::Text(t) => {
                let s = t.unescape().map_err(|e| at(pos, e.to_string()))?;
                push_text(&mut stack, &s).map_err(|m| at(pos, m))?;
            }
            Event::CData(c) => {
                let s = String::from_utf8(c.into_inner().into_owned())
                    .map_err(|e| at(pos, e.to_string()))?;
                push_text(&mut stack, &s).map_err(|m| at(pos, m))?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name.local));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
) -> std::result::Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err("more than one root element".into());
    }
    *root = Some(el);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> std::result::Result<(), String> {
    let Some(parent) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err("text outside of the root element".into());
    };
    // text + CDATA next to each other form one node
    if let Some(Node::Text(prev)) = parent.children.last_mut() {
        prev.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
    Ok(())
}

/// Indentation between child elements is layout, not content.
fn drop_layout_whitespace(el: &mut Element) {
    if el.child_elements().next().is_some() {
        el.children
            .retain(|c| !matches!(c, Node::Text(t) if t.trim().is_empty()));
    }
}

fn open_element<R>(reader: &NsReader<R>, start: &BytesStart) -> std::result::Result<Element, String> {
    let (ns, local) = reader.resolve_element(start.name());
    let mut el = Element::new(QualName {
        namespace: bound_namespace(ns)?,
        local: utf8(local.as_ref())?,
    });

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        let key = attr.key.as_ref();
        if key == b"xmlns" {
            el.namespaces.push(NsDecl {
                prefix: String::new(),
                uri: value,
            });
            continue;
        }
        if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            el.namespaces.push(NsDecl {
                prefix: utf8(prefix)?,
                uri: value,
            });
            continue;
        }
        if let Some(local) = key.strip_prefix(b"xml:") {
            el.attributes.push(Attribute {
                name: QualName {
                    namespace: Some(XML_NAMESPACE.to_string()),
                    local: utf8(local)?,
                },
                value,
            });
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        el.attributes.push(Attribute {
            name: QualName {
                namespace: bound_namespace(ns)?,
                local: utf8(local.as_ref())?,
            },
            value,
        });
    }
    Ok(el)
}

fn bound_namespace(ns: ResolveResult) -> std::result::Result<Option<String>, String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) if uri.is_empty() => Ok(None),
        ResolveResult::Bound(Namespace(uri)) => utf8(uri).map(Some),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(format!(
            "namespace prefix `{}` is not declared",
            String::from_utf8_lossy(&prefix)
        )),
    }
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

/// Byte offsets where each line starts.
fn line_starts_of(text: &str) -> Vec<usize> {
    let mut starts = Vec::with_capacity(256);
    starts.push(0);
    for (i, b) in text.as_bytes().iter().enumerate() {
        if *b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line number of a byte position.
fn byte_pos_to_line(pos: usize, starts: &[usize]) -> usize {
    starts.partition_point(|&s| s <= pos).max(1)
}
