use crate::Result;
use plsmerge_core::LexemeUnit;
use std::path::Path;

/// Lexemes of every `.pls` file in `dir`, file by file in sorted order.
pub fn scan_units(dir: &Path) -> Result<Vec<LexemeUnit>> {
    let mut out = Vec::new();
    for path in plsmerge_parsers_xml::discover_lexicons(dir)? {
        let doc = plsmerge_parsers_xml::read_lexicon(&path)?;
        out.extend(plsmerge_ssml::lexeme_units(&doc));
    }
    tracing::debug!(event = "scan_done", dir = %dir.display(), units = out.len());
    Ok(out)
}
