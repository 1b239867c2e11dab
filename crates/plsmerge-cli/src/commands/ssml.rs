use plsmerge_config::PlsMergeConfig;
use plsmerge_ssml::{Lexicon, LexiconSet};
use std::io::Read;
use std::path::PathBuf;

pub const DEFAULT_LANG: &str = "en-US";

pub fn run_ssml(
    cfg: &PlsMergeConfig,
    lexicons: Vec<PathBuf>,
    lang: Option<String>,
    text: Option<String>,
) -> color_eyre::Result<()> {
    tracing::debug!(event = "ssml_args", lexicons = ?lexicons, lang = ?lang, text = ?text);

    let mut set = LexiconSet::new();
    for arg in lexicons {
        let files = if arg.is_dir() {
            plsmerge_parsers_xml::discover_lexicons(&arg)?
        } else {
            vec![arg]
        };
        for file in files {
            set.add(Lexicon::load(&file)?);
        }
    }
    if set.is_empty() {
        ui_warn!("no lexicons loaded; text is passed through unchanged");
    }

    let lang = lang
        .or_else(|| cfg.ssml.as_ref().and_then(|s| s.lang.clone()))
        .unwrap_or_else(|| DEFAULT_LANG.to_string());
    let text = match text {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    println!("{}", set.make_ssml(&text, &lang));
    Ok(())
}
