use plsmerge_core::{
    Element, MergedLexicon, Node, PlsError, QualName, Result, PLS_NAMESPACE, XML_NAMESPACE,
    XSI_NAMESPACE,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::{HashMap, HashSet};

/// Prefix bindings handed to the serializer. Registered URIs always get
/// their prefix; the empty prefix means the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMap {
    bindings: Vec<(String, String)>,
}

impl NamespaceMap {
    /// No registrations at all.
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// PLS as the default namespace, `xsi` for schema-instance.
    pub fn pls() -> Self {
        let mut map = Self::empty();
        map.register("", PLS_NAMESPACE);
        map.register("xsi", XSI_NAMESPACE);
        map
    }

    /// Bind `prefix` to `uri`, dropping any earlier binding of either.
    pub fn register(&mut self, prefix: &str, uri: &str) -> &mut Self {
        self.bindings.retain(|(p, u)| p != prefix && u != uri);
        self.bindings.push((prefix.to_string(), uri.to_string()));
        self
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }
}

impl Default for NamespaceMap {
    fn default() -> Self {
        Self::pls()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`
    pub declaration: bool,
    /// Indent nested elements by this many spaces; single line when `None`.
    pub indent: Option<usize>,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            declaration: true,
            indent: None,
        }
    }
}

/// Render a merged lexicon as UTF-8 XML text.
pub fn serialize(merged: &MergedLexicon, ns: &NamespaceMap, opts: &XmlOptions) -> Result<String> {
    serialize_element(&merged.to_element(), ns, opts)
}

/// Render any element tree. All namespace declarations go on `root`.
pub fn serialize_element(root: &Element, ns: &NamespaceMap, opts: &XmlOptions) -> Result<String> {
    let scope = Scope::plan(root, ns);

    let mut w = match opts.indent {
        Some(n) if n > 0 => Writer::new_with_indent(Vec::new(), b' ', n),
        _ => Writer::new(Vec::new()),
    };

    if opts.declaration {
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    }
    write_element(&mut w, root, &scope, true, scope.default_declared())?;

    String::from_utf8(w.into_inner())
        .map_err(|e| PlsError::Serialize(format!("output is not UTF-8: {e}")).into())
}

/// Prefix for every namespace URI used in a tree, in declaration order.
struct Scope {
    decls: Vec<(String, String)>,
    by_uri: HashMap<String, String>,
}

impl Scope {
    fn plan(root: &Element, ns: &NamespaceMap) -> Self {
        let mut uris: Vec<String> = Vec::new();
        let mut source_prefix: HashMap<String, String> = HashMap::new();
        for decl in &root.namespaces {
            push_unique(&mut uris, &decl.uri);
        }
        collect(root, &mut uris, &mut source_prefix);
        uris.retain(|u| !u.is_empty() && u != XML_NAMESPACE);

        // the root cannot sit in "no namespace" under a default declaration
        let default_allowed = root.name.namespace.is_some();
        let usable = |p: &str| default_allowed || !p.is_empty();

        let mut by_uri: HashMap<String, String> = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        for uri in &uris {
            if let Some(p) = ns.prefix_for(uri).filter(|p| usable(p)) {
                taken.insert(p.to_string());
                by_uri.insert(uri.clone(), p.to_string());
            }
        }
        let mut auto = 0usize;
        for uri in &uris {
            if by_uri.contains_key(uri) {
                continue;
            }
            let prefix = match source_prefix.get(uri) {
                Some(p) if usable(p) && !taken.contains(p) && !p.starts_with("xml") => p.clone(),
                _ => loop {
                    let candidate = format!("ns{auto}");
                    auto += 1;
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            taken.insert(prefix.clone());
            by_uri.insert(uri.clone(), prefix);
        }

        let decls = uris
            .iter()
            .map(|u| (by_uri[u].clone(), u.clone()))
            .collect();
        Self { decls, by_uri }
    }

    fn default_declared(&self) -> bool {
        self.decls.iter().any(|(p, _)| p.is_empty())
    }

    fn element_name(&self, name: &QualName) -> String {
        match name.namespace.as_deref() {
            None => name.local.clone(),
            Some(uri) => self.qualify(uri, &name.local),
        }
    }

    fn attribute_name(&self, name: &QualName) -> Result<String> {
        match name.namespace.as_deref() {
            None => Ok(name.local.clone()),
            Some(XML_NAMESPACE) => Ok(format!("xml:{}", name.local)),
            Some(uri) => match self.by_uri.get(uri).map(String::as_str) {
                Some("") => Err(PlsError::Serialize(format!(
                    "attribute `{}` in namespace {uri} needs a non-empty prefix",
                    name.local
                ))
                .into()),
                _ => Ok(self.qualify(uri, &name.local)),
            },
        }
    }

    fn qualify(&self, uri: &str, local: &str) -> String {
        if uri == XML_NAMESPACE {
            return format!("xml:{local}");
        }
        match self.by_uri.get(uri).map(String::as_str) {
            Some("") | None => local.to_string(),
            Some(p) => format!("{p}:{local}"),
        }
    }
}

fn push_unique(uris: &mut Vec<String>, uri: &str) {
    if !uris.iter().any(|u| u == uri) {
        uris.push(uri.to_string());
    }
}

fn collect(el: &Element, uris: &mut Vec<String>, source_prefix: &mut HashMap<String, String>) {
    for decl in &el.namespaces {
        source_prefix
            .entry(decl.uri.clone())
            .or_insert_with(|| decl.prefix.clone());
    }
    if let Some(uri) = &el.name.namespace {
        push_unique(uris, uri);
    }
    for attr in &el.attributes {
        if let Some(uri) = &attr.name.namespace {
            push_unique(uris, uri);
        }
    }
    for child in el.child_elements() {
        collect(child, uris, source_prefix);
    }
}

fn write_element(
    w: &mut Writer<Vec<u8>>,
    el: &Element,
    scope: &Scope,
    is_root: bool,
    default_in_scope: bool,
) -> Result<()> {
    let name = scope.element_name(&el.name);
    let mut start = BytesStart::new(name.as_str());

    if is_root {
        for (prefix, uri) in &scope.decls {
            if prefix.is_empty() {
                start.push_attribute(("xmlns", uri.as_str()));
            } else {
                start.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
            }
        }
    }
    let mut default_in_scope = default_in_scope;
    if el.name.namespace.is_none() && default_in_scope {
        start.push_attribute(("xmlns", ""));
        default_in_scope = false;
    }
    if let Some(uri) = el.name.namespace.as_deref() {
        // back under the default namespace after an `xmlns=""` reset
        if !default_in_scope && scope.by_uri.get(uri).is_some_and(|p| p.is_empty()) {
            start.push_attribute(("xmlns", uri));
            default_in_scope = true;
        }
    }
    for attr in &el.attributes {
        let key = scope.attribute_name(&attr.name)?;
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if el.children.is_empty() {
        w.write_event(Event::Empty(start))?;
        return Ok(());
    }

    w.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(w, e, scope, false, default_in_scope)?,
            Node::Text(t) => w.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    w.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plsmerge_core::{Attribute, NsDecl};
    use plsmerge_parsers_xml::parse_lexicon;
    use std::path::{Path, PathBuf};

    fn text_el(name: QualName, text: &str) -> Element {
        let mut e = Element::new(name);
        e.children.push(Node::Text(text.into()));
        e
    }

    fn lexeme(grapheme: &str, phoneme: &str) -> Element {
        let mut e = Element::new(QualName::pls("lexeme"));
        e.children
            .push(Node::Element(text_el(QualName::pls("grapheme"), grapheme)));
        e.children
            .push(Node::Element(text_el(QualName::pls("phoneme"), phoneme)));
        e
    }

    fn pls_root() -> Element {
        let mut root = Element::new(QualName::pls("lexicon"));
        root.namespaces = vec![
            NsDecl {
                prefix: String::new(),
                uri: PLS_NAMESPACE.into(),
            },
            NsDecl {
                prefix: "xsi".into(),
                uri: XSI_NAMESPACE.into(),
            },
        ];
        root.attributes = vec![
            Attribute {
                name: QualName::new(None, "version"),
                value: "1.0".into(),
            },
            Attribute {
                name: QualName::new(Some(XSI_NAMESPACE), "schemaLocation"),
                value: "x".into(),
            },
            Attribute {
                name: QualName::new(Some(XML_NAMESPACE), "lang"),
                value: "en-US".into(),
            },
        ];
        root
    }

    fn merged(entries: Vec<Element>) -> MergedLexicon {
        MergedLexicon {
            root: pls_root(),
            entries,
            sources: vec![PathBuf::from("a.pls")],
        }
    }

    #[test]
    fn canonical_prefixes_single_line() {
        let xml = serialize(
            &merged(vec![lexeme("cat", "k ae t")]),
            &NamespaceMap::pls(),
            &XmlOptions::default(),
        )
        .unwrap();
        insta::assert_snapshot!(xml, @r#"<?xml version="1.0" encoding="UTF-8"?><lexicon xmlns="http://www.w3.org/2005/01/pronunciation-lexicon" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" version="1.0" xsi:schemaLocation="x" xml:lang="en-US"><lexeme><grapheme>cat</grapheme><phoneme>k ae t</phoneme></lexeme></lexicon>"#);
    }

    #[test]
    fn ipa_text_is_written_verbatim() {
        let xml = serialize(
            &merged(vec![lexeme("Y'shtola", "jiː ʃˈtoʊlə")]),
            &NamespaceMap::pls(),
            &XmlOptions::default(),
        )
        .unwrap();
        assert!(xml.contains("jiː ʃˈtoʊlə"));
        assert!(!xml.contains("&#"));
    }

    #[test]
    fn unregistered_namespaces_fall_back_to_source_then_auto_prefixes() {
        let mut m = merged(vec![lexeme("a", "b")]);
        m.root.namespaces.push(NsDecl {
            prefix: "ext".into(),
            uri: "urn:ext".into(),
        });
        m.root.attributes.push(Attribute {
            name: QualName::new(Some("urn:ext"), "flag"),
            value: "1".into(),
        });
        m.entries[0].attributes.push(Attribute {
            name: QualName::new(Some("urn:other"), "role"),
            value: "r".into(),
        });

        let xml = serialize(&m, &NamespaceMap::pls(), &XmlOptions::default()).unwrap();
        assert!(xml.contains(r#"xmlns:ext="urn:ext""#), "{xml}");
        assert!(xml.contains(r#"ext:flag="1""#), "{xml}");
        assert!(xml.contains(r#"xmlns:ns0="urn:other""#), "{xml}");
        assert!(xml.contains(r#"<lexeme ns0:role="r">"#), "{xml}");
    }

    #[test]
    fn without_registration_source_prefixes_are_kept() {
        let xml = serialize(
            &merged(vec![lexeme("a", "b")]),
            &NamespaceMap::empty(),
            &XmlOptions::default(),
        )
        .unwrap();
        assert!(xml.contains(r#"<lexicon xmlns="http://www.w3.org/2005/01/pronunciation-lexicon""#));
        assert!(!xml.contains("ns0"));
    }

    #[test]
    fn registered_prefix_wins_over_source_prefix() {
        let mut map = NamespaceMap::pls();
        map.register("pls", PLS_NAMESPACE);
        let xml = serialize(&merged(vec![lexeme("a", "b")]), &map, &XmlOptions::default()).unwrap();
        assert!(xml.contains("<pls:lexicon xmlns:pls="), "{xml}");
        assert!(xml.contains("<pls:grapheme>a</pls:grapheme>"), "{xml}");
    }

    #[test]
    fn element_without_namespace_resets_default() {
        let mut plain = Element::new(QualName::new(None, "lexeme"));
        plain
            .children
            .push(Node::Element(text_el(QualName::new(None, "grapheme"), "dog")));
        let xml = serialize(&merged(vec![plain]), &NamespaceMap::pls(), &XmlOptions::default())
            .unwrap();
        assert!(xml.contains(r#"<lexeme xmlns=""><grapheme>dog</grapheme></lexeme>"#), "{xml}");
    }

    #[test]
    fn default_namespace_is_restored_below_a_reset() {
        let mut plain = Element::new(QualName::new(None, "lexeme"));
        plain
            .children
            .push(Node::Element(text_el(QualName::pls("grapheme"), "dog")));
        plain
            .children
            .push(Node::Element(text_el(QualName::pls("phoneme"), "d ao g")));
        let m = merged(vec![plain]);

        let xml = serialize(&m, &NamespaceMap::pls(), &XmlOptions::default()).unwrap();
        assert!(
            xml.contains(&format!(r#"<lexeme xmlns=""><grapheme xmlns="{PLS_NAMESPACE}">dog</grapheme>"#)),
            "{xml}"
        );

        let doc = parse_lexicon(&xml, Path::new("out.pls")).unwrap();
        let back = doc.root.child_elements().next().unwrap();
        let grapheme = back.child_elements().next().unwrap();
        assert_eq!(grapheme.name.namespace.as_deref(), Some(PLS_NAMESPACE));
        assert!(back.same_content(&m.entries[0]));
    }

    #[test]
    fn output_reparses_to_same_entries() {
        let m = merged(vec![lexeme("cat", "k ae t"), lexeme("a<b", "x & y")]);
        let opts = XmlOptions {
            declaration: true,
            indent: Some(2),
        };
        let xml = serialize(&m, &NamespaceMap::pls(), &opts).unwrap();
        let doc = parse_lexicon(&xml, Path::new("out.pls")).unwrap();
        let entries: Vec<_> = doc.root.child_elements().collect();
        assert_eq!(entries.len(), 2);
        for (a, b) in entries.iter().zip(&m.entries) {
            assert!(a.same_content(b));
        }
        assert_eq!(doc.root.attributes, m.root.attributes);
    }

    #[test]
    fn attribute_in_default_namespace_is_rejected() {
        let mut m = merged(vec![lexeme("a", "b")]);
        m.entries[0].attributes.push(Attribute {
            name: QualName::pls("role"),
            value: "x".into(),
        });
        let err = serialize(&m, &NamespaceMap::pls(), &XmlOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlsError>(),
            Some(PlsError::Serialize(_))
        ));
    }
}
