//! Lexeme extraction and SSML rendering.
//!
//! A [`Lexicon`] is the flattened grapheme → phoneme / alias view of one PLS
//! document. A [`LexiconSet`] applies several of them, in registration order,
//! to a plain text and wraps the result in a `<speak>` element.

use plsmerge_core::{Element, LexemeUnit, LexiconDocument, Result};
use quick_xml::escape::partial_escape;
use std::path::Path;

pub const SSML_NAMESPACE: &str = "http://www.w3.org/2001/10/synthesis";

/// One `<lexeme>` as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub graphemes: Vec<String>,
    pub phoneme: Option<String>,
    pub alias: Option<String>,
}

/// All `<lexeme>` elements under `root`, in document order. Lookup uses the
/// root's own namespace, so unqualified documents work as well.
pub fn lexemes(root: &Element) -> Vec<Lexeme> {
    let ns = root.name.namespace.as_deref();
    let mut out = Vec::new();
    collect_lexemes(root, ns, &mut out);
    out
}

fn collect_lexemes(el: &Element, ns: Option<&str>, out: &mut Vec<Lexeme>) {
    for child in el.child_elements() {
        if child.name.is(ns, "lexeme") {
            out.push(Lexeme {
                graphemes: child
                    .child_elements()
                    .filter(|c| c.name.is(ns, "grapheme"))
                    .map(Element::text)
                    .collect(),
                phoneme: first_text(child, ns, "phoneme"),
                alias: first_text(child, ns, "alias"),
            });
        }
        collect_lexemes(child, ns, out);
    }
}

fn first_text(el: &Element, ns: Option<&str>, local: &str) -> Option<String> {
    el.child_elements()
        .find(|c| c.name.is(ns, local))
        .map(Element::text)
}

/// Flatten a document into listing rows.
pub fn lexeme_units(doc: &LexiconDocument) -> Vec<LexemeUnit> {
    lexemes(&doc.root)
        .into_iter()
        .map(|l| LexemeUnit {
            graphemes: l.graphemes,
            phoneme: l.phoneme,
            alias: l.alias,
            path: doc.path.clone(),
        })
        .collect()
}

/// Speech engines reject a few ASCII stand-ins that lexicon authors use.
pub fn normalize_phoneme(phoneme: &str) -> String {
    phoneme.replace(':', "ː").replace([' ', '-'], "")
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub url: String,
    /// grapheme → alias, in insertion order
    aliases: Vec<(String, String)>,
    /// grapheme → normalized phoneme, in insertion order
    phonemes: Vec<(String, String)>,
}

impl Lexicon {
    pub fn load(path: &Path) -> Result<Self> {
        let doc = plsmerge_parsers_xml::read_lexicon(path)?;
        Ok(Self::from_document(&doc))
    }

    pub fn from_document(doc: &LexiconDocument) -> Self {
        Self::from_lexemes(doc.path.display().to_string(), lexemes(&doc.root))
    }

    /// Lexemes without graphemes are skipped; a later grapheme replaces an
    /// earlier one.
    pub fn from_lexemes(url: String, lexemes: Vec<Lexeme>) -> Self {
        let mut lexicon = Self {
            url,
            ..Self::default()
        };
        for lexeme in lexemes {
            let phoneme = lexeme.phoneme.as_deref().map(normalize_phoneme);
            for grapheme in &lexeme.graphemes {
                if let Some(p) = &phoneme {
                    upsert(&mut lexicon.phonemes, grapheme, p);
                }
                if let Some(a) = &lexeme.alias {
                    upsert(&mut lexicon.aliases, grapheme, a);
                }
            }
        }
        lexicon
    }

    pub fn phoneme(&self, grapheme: &str) -> Option<&str> {
        lookup(&self.phonemes, grapheme)
    }

    pub fn alias(&self, grapheme: &str) -> Option<&str> {
        lookup(&self.aliases, grapheme)
    }

    pub fn len(&self) -> usize {
        self.phonemes.len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest grapheme first so that "Thancred" wins over "Than".
    fn phonemes_longest_first(&self) -> Vec<&(String, String)> {
        let mut v: Vec<_> = self.phonemes.iter().collect();
        v.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        v
    }
}

fn upsert(map: &mut Vec<(String, String)>, key: &str, value: &str) {
    map.retain(|(k, _)| k != key);
    map.push((key.to_string(), value.to_string()));
}

fn lookup<'a>(map: &'a [(String, String)], key: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Clone, Default)]
pub struct LexiconSet {
    lexicons: Vec<Lexicon>,
}

impl LexiconSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same url twice replaces the older lexicon.
    pub fn add(&mut self, lexicon: Lexicon) {
        self.remove(&lexicon.url);
        tracing::debug!(event = "lexicon_added", url = %lexicon.url, entries = lexicon.len());
        self.lexicons.push(lexicon);
    }

    pub fn remove(&mut self, url: &str) {
        self.lexicons.retain(|l| l.url != url);
    }

    pub fn len(&self) -> usize {
        self.lexicons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicons.is_empty()
    }

    /// Substitute aliases and wrap known graphemes in `<phoneme>` tags.
    /// The input is treated as plain text and escaped first.
    pub fn make_ssml(&self, text: &str, lang: &str) -> String {
        let mut text = partial_escape(text).into_owned();
        for lexicon in &self.lexicons {
            for (grapheme, alias) in &lexicon.aliases {
                text = text.replace(&*partial_escape(grapheme), &partial_escape(alias));
            }
            for (grapheme, phoneme) in lexicon.phonemes_longest_first() {
                let readable: String = grapheme.chars().filter(|c| *c != '\'' && *c != '"').collect();
                let node = format!(
                    "<phoneme {}>{}</phoneme>",
                    ph_attribute(phoneme),
                    partial_escape(&readable)
                );
                text = replace_grapheme(&text, &partial_escape(grapheme), &node);
            }
        }
        format!(
            "<speak version=\"1.0\" xmlns=\"{SSML_NAMESPACE}\" xml:lang=\"{}\">{text}</speak>",
            partial_escape(lang)
        )
    }
}

/// `ph="..."`, or `ph='...'` when the phoneme holds a double quote.
fn ph_attribute(phoneme: &str) -> String {
    let value = partial_escape(phoneme);
    if phoneme.contains('"') {
        format!("ph='{}'", value.replace('\'', "&apos;"))
    } else {
        format!("ph=\"{value}\"")
    }
}

/// Replace `old` with `new`, left to right, but stop at the first
/// occurrence that sits inside an element body closed later on (i.e. one
/// that was already wrapped).
pub fn replace_grapheme(text: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(old) {
        if inside_wrapped(rest, idx) {
            break;
        }
        out.push_str(&rest[..idx]);
        out.push_str(new);
        rest = &rest[idx + old.len()..];
    }
    out.push_str(rest);
    out
}

const OPEN_TAG: u8 = 1;
const CLOSE_TAG: u8 = 2;

/// True when, scanning right from `idx`, a closing tag shows up before an
/// opening one.
fn inside_wrapped(text: &str, idx: usize) -> bool {
    let tags = tag_markers(text.as_bytes());
    for &m in &tags[idx..] {
        match m {
            OPEN_TAG => return false,
            CLOSE_TAG => return true,
            _ => {}
        }
    }
    false
}

/// Mark every byte that belongs to a tag: `<a ...>` as OPEN_TAG, `</a>` as
/// CLOSE_TAG, everything else 0.
fn tag_markers(bytes: &[u8]) -> Vec<u8> {
    let mut tags = vec![0u8; bytes.len()];
    let mut cur = OPEN_TAG;
    let mut in_tag = false;
    let mut after_lt = false;
    for (i, &b) in bytes.iter().enumerate() {
        if after_lt {
            after_lt = false;
            cur = if b == b'/' { CLOSE_TAG } else { OPEN_TAG };
            tags[i - 1] = cur;
        }
        if in_tag {
            tags[i] = cur;
        }
        if !in_tag && b == b'<' {
            in_tag = true;
            after_lt = true;
            tags[i] = cur;
        }
        if b == b'>' {
            in_tag = false;
            tags[i] = cur;
        }
    }
    tags
}
