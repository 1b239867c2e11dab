//! High-level orchestration layer over lower-level crates.
//! Intentionally thin: exposes stable functions used by the CLI.

pub mod merge;
pub mod scan;

pub use merge::{
    merge_dir, merge_documents, merge_files, run_merge, write_output, MergeOutcome, MergeRequest,
    MergeSummary,
};
pub use plsmerge_core::{LexemeUnit, MergedLexicon, PlsError, Result};
pub use scan::scan_units;
