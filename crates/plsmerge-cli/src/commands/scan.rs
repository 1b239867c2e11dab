use plsmerge_config::PlsMergeConfig;
use std::io::IsTerminal;
use std::path::PathBuf;

pub fn run_scan(
    cfg: &PlsMergeConfig,
    source_dir: Option<PathBuf>,
    format: String,
    out: Option<PathBuf>,
    lang: Option<String>,
) -> color_eyre::Result<()> {
    let dir = source_dir.unwrap_or_else(|| cfg.source_dir());
    tracing::debug!(event = "scan_args", dir = ?dir, format = %format, out = ?out, lang = ?lang);

    let units = plsmerge_services::scan_units(&dir)?;
    tracing::info!(event = "scan_units", dir = %dir.display(), count = units.len());

    match format.as_str() {
        "csv" => {
            if let Some(path) = out {
                let file = std::fs::File::create(&path)?;
                plsmerge_export_csv::write_csv(file, &units, lang.as_deref())?;
                ui_info!("CSV saved to {}", path.display());
            } else {
                if std::io::stdout().is_terminal() {
                    ui_info!("{} lexemes in {}", units.len(), dir.display());
                }
                let stdout = std::io::stdout();
                plsmerge_export_csv::write_csv(stdout.lock(), &units, lang.as_deref())?;
            }
        }
        "json" => {
            #[derive(serde::Serialize)]
            struct JsonUnit<'a> {
                schema_version: u32,
                graphemes: &'a [String],
                phoneme: Option<&'a str>,
                alias: Option<&'a str>,
                path: String,
            }
            let items: Vec<JsonUnit<'_>> = units
                .iter()
                .map(|u| JsonUnit {
                    schema_version: plsmerge_core::OUTPUT_SCHEMA_VERSION,
                    graphemes: &u.graphemes,
                    phoneme: u.phoneme.as_deref(),
                    alias: u.alias.as_deref(),
                    path: u.path.display().to_string(),
                })
                .collect();

            if let Some(path) = out {
                let file = std::fs::File::create(&path)?;
                serde_json::to_writer_pretty(file, &items)?;
                ui_info!("JSON saved to {}", path.display());
            } else {
                serde_json::to_writer(std::io::stdout().lock(), &items)?;
            }
        }
        other => color_eyre::eyre::bail!("unsupported format `{other}`"),
    }
    Ok(())
}
