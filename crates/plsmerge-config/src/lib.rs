use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "plsmerge.toml";
pub const DEFAULT_SOURCE_DIR: &str = "lexicons";
pub const DEFAULT_OUTPUT_PATH: &str = "merge.pls";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlsMergeConfig {
    pub merge: Option<MergeCfg>,
    /// Extra prefix registrations, `prefix = "uri"`. An empty key means the
    /// default namespace.
    pub namespaces: Option<BTreeMap<String, String>>,
    pub ssml: Option<SsmlCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeCfg {
    pub source_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub indent: Option<usize>,
    pub xml_declaration: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SsmlCfg {
    pub lang: Option<String>,
}

impl PlsMergeConfig {
    pub fn source_dir(&self) -> PathBuf {
        self.merge
            .as_ref()
            .and_then(|m| m.source_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR))
    }

    pub fn output_path(&self) -> PathBuf {
        self.merge
            .as_ref()
            .and_then(|m| m.output_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Search order: CWD/plsmerge.toml, then $CONFIG_DIR/plsmerge/plsmerge.toml.
/// Earlier files win field by field; missing files are skipped.
pub fn load_config() -> Result<PlsMergeConfig, ConfigError> {
    let mut candidates = Vec::new();
    if let Ok(p) = std::env::current_dir() {
        candidates.push(p.join(CONFIG_FILE));
    }
    if let Some(base) = dirs::config_dir() {
        candidates.push(base.join("plsmerge").join(CONFIG_FILE));
    }
    load_from(&candidates)
}

pub fn load_from(paths: &[PathBuf]) -> Result<PlsMergeConfig, ConfigError> {
    let mut merged = PlsMergeConfig::default();
    for path in paths {
        if let Some(cfg) = read_file(path)? {
            tracing::debug!(event = "config_loaded", path = %path.display());
            merged = merge(merged, cfg);
        }
    }
    Ok(merged)
}

fn read_file(path: &Path) -> Result<Option<PlsMergeConfig>, ConfigError> {
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str::<PlsMergeConfig>(&s)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn merge(mut a: PlsMergeConfig, b: PlsMergeConfig) -> PlsMergeConfig {
    a.merge = merge_opt(a.merge, b.merge, merge_merge);
    a.ssml = merge_opt(a.ssml, b.ssml, merge_ssml);
    a.namespaces = merge_opt(a.namespaces, b.namespaces, |mut a, b| {
        for (k, v) in b {
            a.entry(k).or_insert(v);
        }
        a
    });
    a
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_merge(mut a: MergeCfg, b: MergeCfg) -> MergeCfg {
    if a.source_dir.is_none() {
        a.source_dir = b.source_dir;
    }
    if a.output_path.is_none() {
        a.output_path = b.output_path;
    }
    if a.indent.is_none() {
        a.indent = b.indent;
    }
    if a.xml_declaration.is_none() {
        a.xml_declaration = b.xml_declaration;
    }
    a
}

fn merge_ssml(mut a: SsmlCfg, b: SsmlCfg) -> SsmlCfg {
    if a.lang.is_none() {
        a.lang = b.lang;
    }
    a
}
