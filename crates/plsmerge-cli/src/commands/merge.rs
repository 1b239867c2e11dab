use plsmerge_config::PlsMergeConfig;
use plsmerge_export_xml::{NamespaceMap, XmlOptions};
use plsmerge_services::{MergeOutcome, MergeRequest};
use std::path::PathBuf;

#[allow(clippy::too_many_arguments)]
pub fn run_merge(
    cfg: &PlsMergeConfig,
    source_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    indent: Option<usize>,
    no_declaration: bool,
    namespaces: Vec<String>,
    print: bool,
    dry_run: bool,
) -> color_eyre::Result<()> {
    tracing::debug!(
        event = "merge_args",
        source_dir = ?source_dir,
        out = ?out,
        indent = ?indent,
        no_declaration = no_declaration,
        namespaces = ?namespaces,
        print = print,
        dry_run = dry_run
    );

    let merge_cfg = cfg.merge.clone().unwrap_or_default();
    let req = MergeRequest {
        source_dir: source_dir.unwrap_or_else(|| cfg.source_dir()),
        output_path: out.unwrap_or_else(|| cfg.output_path()),
        namespaces: namespace_map(cfg, &namespaces)?,
        xml: XmlOptions {
            declaration: !no_declaration && merge_cfg.xml_declaration.unwrap_or(true),
            indent: indent.or(merge_cfg.indent),
        },
        dry_run,
    };

    let summary = match plsmerge_services::run_merge(&req)? {
        MergeOutcome::Empty => {
            ui_warn!(
                "no .pls files in {}; nothing written",
                req.source_dir.display()
            );
            return Ok(());
        }
        MergeOutcome::Merged(summary) => summary,
    };

    if print {
        println!("{}", summary.text);
    }

    if dry_run {
        ui_info!(
            "DRY-RUN: would write {} entries from {} files to {}",
            summary.entries,
            summary.files.len(),
            summary.output.display()
        );
    } else if print {
        ui_info!(
            "merged {} entries from {} files into {}",
            summary.entries,
            summary.files.len(),
            summary.output.display()
        );
    } else {
        ui_ok!(
            "merged {} entries from {} files into {}",
            summary.entries,
            summary.files.len(),
            summary.output.display()
        );
    }
    Ok(())
}

/// PLS defaults, then `[namespaces]` from the config, then `--namespace`.
fn namespace_map(cfg: &PlsMergeConfig, cli: &[String]) -> color_eyre::Result<NamespaceMap> {
    let mut map = NamespaceMap::pls();
    if let Some(extra) = &cfg.namespaces {
        for (prefix, uri) in extra {
            map.register(prefix, uri);
        }
    }
    for binding in cli {
        let Some((prefix, uri)) = binding.split_once('=') else {
            color_eyre::eyre::bail!("--namespace expects PREFIX=URI, got `{binding}`");
        };
        map.register(prefix.trim(), uri.trim());
    }
    Ok(map)
}
