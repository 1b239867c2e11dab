use crate::Result;
use plsmerge_core::{Element, LexiconDocument, MergedLexicon, Node, PlsError};
use plsmerge_export_xml::{NamespaceMap, XmlOptions};
use std::path::{Path, PathBuf};

/// Everything one merge run needs.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub source_dir: PathBuf,
    pub output_path: PathBuf,
    pub namespaces: NamespaceMap,
    pub xml: XmlOptions,
    /// Merge and serialize, but leave the output file alone.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub files: Vec<PathBuf>,
    pub entries: usize,
    pub output: PathBuf,
    pub written: bool,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// The directory held no lexicon files; nothing was serialized or written.
    Empty,
    Merged(MergeSummary),
}

/// Fold documents into one lexicon. The first document provides the root
/// element; every following one only contributes its entries.
pub fn merge_documents<I>(docs: I) -> Option<MergedLexicon>
where
    I: IntoIterator<Item = LexiconDocument>,
{
    docs.into_iter().fold(None, |acc, doc| Some(append(acc, doc)))
}

fn append(acc: Option<MergedLexicon>, doc: LexiconDocument) -> MergedLexicon {
    let LexiconDocument { path, mut root } = doc;
    let mut entries: Vec<Element> = std::mem::take(&mut root.children)
        .into_iter()
        .filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
        .collect();
    match acc {
        None => {
            tracing::trace!(event = "merge_first", path = %path.display(), entries = entries.len());
            MergedLexicon {
                root,
                entries,
                sources: vec![path],
            }
        }
        Some(mut merged) => {
            tracing::trace!(event = "merge_append", path = %path.display(), entries = entries.len());
            merged.entries.append(&mut entries);
            merged.sources.push(path);
            merged
        }
    }
}

/// Parse `files` in the given order and merge them. Stops at the first
/// file that cannot be read or parsed.
pub fn merge_files(files: &[PathBuf]) -> Result<Option<MergedLexicon>> {
    files.iter().try_fold(None, |acc, path| {
        let doc = plsmerge_parsers_xml::read_lexicon(path)?;
        Ok(Some(append(acc, doc)))
    })
}

/// Merge every `.pls` file of `dir` in file-name order.
pub fn merge_dir(dir: &Path) -> Result<Option<MergedLexicon>> {
    let files = plsmerge_parsers_xml::discover_lexicons(dir)?;
    tracing::info!(event = "merge_files_found", dir = %dir.display(), count = files.len());
    merge_files(&files)
}

/// Write `text` to `dest`, replacing whatever is there.
pub fn write_output(dest: &Path, text: &str) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PlsError::io(parent, e))?;
    }
    std::fs::write(dest, text).map_err(|e| PlsError::io(dest, e))?;
    Ok(())
}

/// Drop `output` from `files`. Paths are compared canonicalized; an output
/// that does not exist yet cannot be among them.
fn without_output(files: Vec<PathBuf>, output: &Path) -> Vec<PathBuf> {
    let Ok(output) = std::fs::canonicalize(output) else {
        return files;
    };
    files
        .into_iter()
        .filter(|f| {
            let same = std::fs::canonicalize(f).is_ok_and(|c| c == output);
            if same {
                tracing::info!(event = "merge_skip_output", path = %f.display());
            }
            !same
        })
        .collect()
}

/// Merge, serialize and (unless dry-run) write. The output file is only
/// touched after the whole merge succeeded, and is never read as a source.
pub fn run_merge(req: &MergeRequest) -> Result<MergeOutcome> {
    let files = plsmerge_parsers_xml::discover_lexicons(&req.source_dir)?;
    let files = without_output(files, &req.output_path);
    tracing::info!(event = "merge_files_found", dir = %req.source_dir.display(), count = files.len());
    let Some(merged) = merge_files(&files)? else {
        tracing::warn!(event = "merge_empty", dir = %req.source_dir.display());
        return Ok(MergeOutcome::Empty);
    };

    let text = plsmerge_export_xml::serialize(&merged, &req.namespaces, &req.xml)?;
    tracing::debug!(event = "merge_serialized", bytes = text.len(), xml = %text);

    if !req.dry_run {
        write_output(&req.output_path, &text)?;
        tracing::info!(event = "merge_written", path = %req.output_path.display(), entries = merged.entries.len());
    }

    Ok(MergeOutcome::Merged(MergeSummary {
        files: merged.sources,
        entries: merged.entries.len(),
        output: req.output_path.clone(),
        written: !req.dry_run,
        text,
    }))
}
