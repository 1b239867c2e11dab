use color_eyre::eyre::Result;
use plsmerge_core::LexemeUnit;
use std::io::Write;

/// Several graphemes of one lexeme share a cell, joined by this.
pub const GRAPHEME_SEPARATOR: &str = "|";

pub fn write_csv<W: Write>(writer: W, units: &[LexemeUnit], lang: Option<&str>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    // lang column only when a language is given
    match lang {
        Some(_) => wtr.write_record(["lang", "grapheme", "phoneme", "alias", "path"])?,
        None => wtr.write_record(["grapheme", "phoneme", "alias", "path"])?,
    }

    for u in units {
        let graphemes = u.graphemes.join(GRAPHEME_SEPARATOR);
        let phoneme = u.phoneme.as_deref().unwrap_or("");
        let alias = u.alias.as_deref().unwrap_or("");
        let path_str = u.path.to_string_lossy();
        let path_str: &str = &path_str;

        match lang {
            Some(l) => wtr.write_record([l, graphemes.as_str(), phoneme, alias, path_str])?,
            None => wtr.write_record([graphemes.as_str(), phoneme, alias, path_str])?,
        }
    }

    wtr.flush()?;
    Ok(())
}
